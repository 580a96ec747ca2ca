#![doc = r#"
The decoded track model.

A track is an ordered list of closed note intervals plus the metadata the
surrounding application displays: a name, a primary channel, and a
best-effort instrument. Notes are stored in off-event resolution order, not
start-time order; callers must not assume sortedness.
"#]

mod decoder;
pub use decoder::*;

pub mod gm;

#[doc = r#"
A closed note interval.

Start and duration are absolute ticks at the file's source tick rate. A
duration of zero is valid: it marks a note whose matching off event
coincided with its on event, or never arrived before end of track.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Note {
    /// MIDI note number, `0..=127`.
    pub pitch: u8,
    /// `1..=127`. A velocity of zero signals note-off and is never stored.
    pub velocity: u8,
    /// Absolute start tick, relative to file start.
    pub start: u64,
    /// Length in ticks.
    pub duration: u64,
    /// Channel the note sounded on, `0..=15`.
    pub channel: u8,
}

impl Note {
    /// The exclusive end of the `[start, end)` interval.
    pub const fn end(&self) -> u64 {
        self.start + self.duration
    }
}

/// One decoded `MTrk` chunk.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    pub(crate) notes: Vec<Note>,
    pub(crate) name: Option<String>,
    pub(crate) instrument: Option<String>,
    pub(crate) program: Option<u8>,
    pub(crate) channel: u8,
}

impl Track {
    /// The closed notes, in off-event resolution order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// The track-name meta text, sanitized.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The program number (`0..=127`) active on the primary channel, if a
    /// program change was seen.
    pub const fn program(&self) -> Option<u8> {
        self.program
    }

    /// The primary channel: the channel of the first program change, or the
    /// channel with the most note-ons (ties to the lowest number).
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// The instrument name. Explicit instrument-name meta text wins;
    /// otherwise the primary channel's program number is mapped through the
    /// General MIDI table.
    pub fn instrument_name(&self) -> Option<&str> {
        self.instrument
            .as_deref()
            .or_else(|| self.program.map(gm::instrument_name))
    }

    /// True if decoding produced at least one note.
    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    /// The full `[min start, max end)` span of the track's notes: the
    /// default selection when a caller provides none.
    pub fn note_span(&self) -> Option<(u64, u64)> {
        let first = self.notes.first()?;
        let mut span = (first.start, first.end());
        for note in &self.notes[1..] {
            span.0 = span.0.min(note.start);
            span.1 = span.1.max(note.end());
        }
        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn note(start: u64, duration: u64) -> Note {
        Note {
            pitch: 60,
            velocity: 100,
            start,
            duration,
            channel: 0,
        }
    }

    #[test]
    fn note_span_covers_unsorted_notes() {
        let track = Track {
            notes: vec![note(480, 240), note(0, 120), note(100, 1000)],
            ..Track::default()
        };
        assert_eq!(track.note_span(), Some((0, 1100)));
    }

    #[test]
    fn empty_track_has_no_span() {
        assert_eq!(Track::default().note_span(), None);
        assert!(!Track::default().has_notes());
    }

    #[test]
    fn instrument_meta_text_wins_over_program() {
        let track = Track {
            instrument: Some("Big Lead".into()),
            program: Some(0),
            ..Track::default()
        };
        assert_eq!(track.instrument_name(), Some("Big Lead"));
    }

    #[test]
    fn program_falls_back_to_general_midi() {
        let track = Track {
            program: Some(40),
            ..Track::default()
        };
        assert_eq!(track.instrument_name(), Some("Violin"));
        assert_eq!(Track::default().instrument_name(), None);
    }
}
