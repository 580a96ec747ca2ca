#![doc = r#"
Convert Standard MIDI Files into the MPC pattern format.

# Overview

The crate is a pure, synchronous pipeline over in-memory bytes:

```text
raw bytes
   -> chunk reader        (MThd / MTrk / skipped foreign chunks)
   -> header decoder      (format, track count, tick rate)
   -> track event decoder (running status, note pairing, metadata)
   -> MidiDocument        (header + ordered tracks of closed notes)
   -> pattern builder     (range filter, rebase, rescale to 960 ticks/quarter)
   -> pattern serializer  (.mpcpattern text, CRLF, fixed marker events)
```

Only note-on/note-off events survive into conversion output; controllers,
pitch bend, and program changes are read just far enough to extract
best-effort track and instrument names. Conversion is tick-domain only and
tempo-agnostic: the detected BPM on a [`MidiDocument`] is display metadata.

File I/O, timeline UI, and playback are the caller's concern — the crate
takes a byte buffer and hands back bytes to save.

# Example

```rust
use mpcpattern::prelude::*;

// A format-0 file at 480 ticks per quarter note with one C4 note.
let mut file = vec![
    0x4D, 0x54, 0x68, 0x64, 0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0,
];
file.extend([
    0x4D, 0x54, 0x72, 0x6B, 0, 0, 0, 13,
    0x00, 0x90, 60, 100, // note on at tick 0
    0x83, 0x60, 0x80, 60, 0, // note off 480 ticks later
    0x00, 0xFF, 0x2F, 0x00, // end of track
]);

let doc = MidiDocument::parse(&file)?;
let note = doc.track(0).unwrap().notes()[0];
assert_eq!((note.pitch, note.start, note.duration), (60, 0, 480));

let bytes = convert_track(&doc, 0, Some(TickRange::new(0, 480)))?;
assert!(bytes.starts_with(b"{\r\n"));
# Ok::<(), Box<dyn std::error::Error>>(())
```
"#]
#![warn(missing_docs)]

pub mod error;
pub mod file;
pub mod pattern;
pub mod reader;
pub mod track;
pub mod vlq;

pub use error::{ConvertError, ParseError};
pub use file::MidiDocument;

/// Common imports.
pub mod prelude {
    pub use crate::error::{ConvertError, ParseError};
    pub use crate::file::{FileHeader, FormatType, MidiDocument};
    pub use crate::pattern::{
        Pattern, PatternEvent, TARGET_TICK_RATE, TickRange, build_pattern, convert_track,
        pattern_file_name, velocity_string,
    };
    pub use crate::track::{DecodeOptions, Note, OverlapPolicy, Track};
}
