#![doc = r#"
Error taxonomy for parsing and conversion.

Parse failures abort the whole document load. Conversion failures are scoped
to a single export request and never invalidate an already-loaded document.
Dropped off-events, skipped unknown events, and mid-event truncation inside
one track are tolerances, not errors; they are logged and absorbed.
"#]

use crate::reader::ReadError;
use thiserror::Error;

/// Fatal failures while decoding a MIDI file.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer is empty or does not begin with an `MThd` chunk.
    #[error("not a standard MIDI file: {0}")]
    InvalidMidiFile(&'static str),

    /// The `MThd` body is too short, carries an unknown format, or resolves
    /// to a non-positive tick rate. Also raised when fewer than eight bytes
    /// remain at a chunk boundary.
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),

    /// The buffer ended before a declared length was satisfied at the top
    /// level, or a variable-length quantity failed to terminate within four
    /// bytes.
    #[error("truncated stream at byte {position}")]
    TruncatedStream {
        /// Offset at which the stream gave out.
        position: usize,
    },
}

impl From<ReadError> for ParseError {
    fn from(err: ReadError) -> Self {
        Self::TruncatedStream {
            position: err.position(),
        }
    }
}

/// Failures while converting one track to a pattern.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConvertError {
    /// The requested track index has no corresponding decoded track.
    #[error("no track at index {index} (document has {track_count})")]
    UnresolvedTrack {
        /// The zero-based index that was requested.
        index: usize,
        /// How many tracks the document actually holds.
        track_count: usize,
    },

    /// The selected range overlaps no notes; a pattern would carry no
    /// note events.
    #[error("selection [{start}, {end}) contains no notes")]
    EmptySelection {
        /// Inclusive start of the selection, in source ticks.
        start: u64,
        /// Exclusive end of the selection, in source ticks.
        end: u64,
    },
}
