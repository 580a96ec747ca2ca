#![doc = r#"
Rendering of the `.mpcpattern` on-disk format.

The device consumes a JSON-shaped UTF-8 text file with a fixed layout: CRLF
line endings, 4/8/12-space indentation, and three "type 1" format-marker
events ahead of any notes. Field order and the literal marker values are
part of the format. Velocity strings are emitted verbatim, never re-parsed
as numbers, so the builder's truncated precision survives to disk.
"#]

use super::{LENGTH_SENTINEL, Pattern, PatternEvent};
use std::fmt::Write;

/// The three fixed format-marker events, as their `"1"` and `"2"` field
/// values. Everything else on a marker line is constant.
const MARKERS: [(u8, &str); 3] = [(0, "0.0"), (32, "0.0"), (130, "0.787401556968689")];

impl Pattern {
    /// Render the pattern as UTF-8 `.mpcpattern` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.render().into_bytes()
    }

    /// Render the pattern as the textual `.mpcpattern` document.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("{\r\n");
        out.push_str("    \"pattern\": {\r\n");
        let _ = write!(out, "        \"length\": {LENGTH_SENTINEL},\r\n");
        out.push_str("        \"events\": [\r\n");

        let total = MARKERS.len() + self.events().len();
        let mut emitted = 0;
        for (pitch, velocity) in MARKERS {
            emitted += 1;
            let _ = write!(
                out,
                "            {{ \"type\": 1, \"time\": 0, \"len\": 0, \"1\": {pitch}, \"2\": \"{velocity}\", \"3\": 0, \"mod\": 0, \"modVal\": \"0.0\" }}{}\r\n",
                separator(emitted, total),
            );
        }
        for event in self.events() {
            emitted += 1;
            let PatternEvent {
                time,
                len,
                pitch,
                velocity,
            } = event;
            let _ = write!(
                out,
                "            {{ \"type\": 2, \"time\": {time}, \"len\": {len}, \"1\": {pitch}, \"2\": \"{velocity}\", \"3\": 0, \"mod\": 0, \"modVal\": 0.5 }}{}\r\n",
                separator(emitted, total),
            );
        }

        out.push_str("        ]\r\n");
        out.push_str("    }\r\n");
        out.push_str("}\r\n");
        out
    }
}

const fn separator(emitted: usize, total: usize) -> &'static str {
    if emitted < total { "," } else { "" }
}
