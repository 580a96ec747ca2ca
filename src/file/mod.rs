#![doc = r#"
The decoded document: header plus tracks, parsed once from a byte buffer.
"#]

mod chunk;
pub use chunk::*;

mod header;
pub use header::*;

use crate::{
    error::ParseError,
    reader::Reader,
    track::{DecodeOptions, Track, TrackDecoder},
};
use tracing::{debug, warn};

#[doc = r#"
A parsed Standard MIDI File.

Construction is a single pass over an in-memory buffer; the result is
immutable apart from the display-only tempo annotation. Parsing is pure and
synchronous: no I/O, no shared state, and every call is independently
reentrant given its own buffer.

# Example

```rust
use mpcpattern::MidiDocument;

let mut file = vec![
    0x4D, 0x54, 0x68, 0x64, 0, 0, 0, 6, // MThd
    0, 0, 0, 1, 0x01, 0xE0, // format 0, 1 track, 480 ticks/quarter
];
file.extend([
    0x4D, 0x54, 0x72, 0x6B, 0, 0, 0, 13, // MTrk, 13 bytes
    0x00, 0x90, 60, 100, // note on, C4, velocity 100
    0x83, 0x60, 0x80, 60, 0, // note off 480 ticks later
    0x00, 0xFF, 0x2F, 0x00, // end of track
]);

let doc = MidiDocument::parse(&file)?;
assert_eq!(doc.header().tick_rate(), 480);
assert_eq!(doc.track(0).unwrap().notes().len(), 1);
# Ok::<(), mpcpattern::ParseError>(())
```
"#]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiDocument {
    header: FileHeader,
    tracks: Vec<Track>,
    bpm: Option<f64>,
}

impl MidiDocument {
    /// Parse a complete MIDI file with default decode options.
    ///
    /// # Errors
    /// [`ParseError::InvalidMidiFile`] for an empty buffer or a leading
    /// chunk that is not `MThd`; [`ParseError::MalformedHeader`] and
    /// [`ParseError::TruncatedStream`] per the chunk and header decoders.
    /// Mid-event truncation inside a single track is tolerated and yields a
    /// partial track instead of failing the document.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with(bytes, DecodeOptions::default())
    }

    /// Parse with explicit decode options.
    pub fn parse_with(bytes: &[u8], options: DecodeOptions) -> Result<Self, ParseError> {
        if bytes.is_empty() {
            return Err(ParseError::InvalidMidiFile("empty buffer"));
        }
        let mut reader = Reader::new(bytes);

        let first = Chunk::read(&mut reader)?;
        if !first.is_header() {
            return Err(ParseError::InvalidMidiFile("first chunk is not MThd"));
        }
        let header = FileHeader::decode(first.body())?;

        let mut tracks = Vec::with_capacity(usize::from(header.declared_tracks()));
        let mut bpm = None;
        while !reader.is_empty() {
            let chunk = Chunk::read(&mut reader)?;
            if !chunk.is_track() {
                // Unknown tags are skipped by length, not rejected.
                debug!(tag = ?chunk.tag(), len = chunk.body().len(), "skipping non-track chunk");
                continue;
            }
            let decoded = TrackDecoder::decode(chunk.body(), options)?;
            if bpm.is_none() {
                bpm = decoded
                    .tempo_mpqn
                    .map(|mpqn| 60_000_000.0 / f64::from(mpqn));
            }
            tracks.push(decoded.track);
        }

        if tracks.len() != usize::from(header.declared_tracks()) {
            warn!(
                declared = header.declared_tracks(),
                found = tracks.len(),
                "track count differs from header"
            );
        }

        Ok(Self {
            header,
            tracks,
            bpm,
        })
    }

    /// The decoded header.
    pub const fn header(&self) -> &FileHeader {
        &self.header
    }

    /// All decoded tracks, in file order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// One track by zero-based file-order index.
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Detected tempo in beats per minute, for display only. Tick-domain
    /// conversion never consults it.
    pub const fn bpm(&self) -> Option<f64> {
        self.bpm
    }

    /// Override the display tempo, e.g. from an external detector.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = Some(bpm);
    }

    /// Tracks that would produce a pattern, yielded as
    /// `(export number, file index, track)`. Export numbers are 1-based and
    /// count only tracks that contain notes, in file order, matching the
    /// `<base>_Track_<n>.mpcpattern` filename convention.
    pub fn pattern_tracks(&self) -> impl Iterator<Item = (usize, usize, &Track)> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.has_notes())
            .zip(1..)
            .map(|((index, track), number)| (number, index, track))
    }
}
