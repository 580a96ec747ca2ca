#![doc = r#"
Tick-domain resampling and pattern construction.

A pattern is a derived, ephemeral value built per export request: notes are
filtered to a tick range, rebased to a new origin, rescaled from the file's
tick rate to the fixed 960-tick device rate, and serialized. It owns no
document state and is discarded after serialization.
"#]

mod serialize;
pub use serialize::*;

use crate::{error::ConvertError, file::MidiDocument, track::Track};
use tracing::warn;

/// The device's fixed pattern resolution, in ticks per quarter note.
pub const TARGET_TICK_RATE: u32 = 960;

/// Sentinel pattern length meaning "host-controlled / unbounded".
pub const LENGTH_SENTINEL: i64 = i64::MAX;

/// Velocity strings are cut (never rounded) at this many characters, parity
/// with the legacy device output.
pub const VELOCITY_STRING_MAX: usize = 17;

/// A half-open selection `[start, end)` in source ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickRange {
    /// Inclusive start tick.
    pub start: u64,
    /// Exclusive end tick.
    pub end: u64,
}

impl TickRange {
    /// A selection from `start` (inclusive) to `end` (exclusive).
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
}

/// One note event in device ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternEvent {
    /// Start in target ticks, relative to the export origin. Negative when
    /// a note begins before the origin but overlaps the selection.
    pub time: i64,
    /// Duration in target ticks.
    pub len: i64,
    /// MIDI note number, `0..=127`.
    pub pitch: u8,
    /// `velocity / 127` rendered as a decimal string, already truncated.
    pub velocity: String,
}

/// An ordered event list ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pattern {
    events: Vec<PatternEvent>,
}

impl Pattern {
    /// Wrap an event list.
    pub fn new(events: Vec<PatternEvent>) -> Self {
        Self { events }
    }

    /// The note events, in resolution order.
    pub fn events(&self) -> &[PatternEvent] {
        &self.events
    }
}

/// Filter, rebase, and rescale one track's notes into a [`Pattern`].
///
/// A note is selected when its `[start, end)` interval strictly overlaps
/// `range`; partially overlapping notes are taken whole, with no clipping
/// at the boundaries. `origin` is subtracted from each start before
/// rescaling. Start and duration round independently, so `time + len` may
/// differ by one tick from rounding their sum — the device format behaves
/// the same way.
///
/// Event order follows the track's note resolution order; starts that run
/// backwards in time are logged, never corrected.
///
/// # Errors
/// [`ConvertError::EmptySelection`] if no note overlaps the range.
pub fn build_pattern(
    track: &Track,
    range: TickRange,
    origin: u64,
    source_tick_rate: u32,
) -> Result<Pattern, ConvertError> {
    let mut events = Vec::new();
    let mut previous_time = i64::MIN;
    for note in track.notes() {
        if !(note.start < range.end && note.end() > range.start) {
            continue;
        }
        let rebased = note.start as i64 - origin as i64;
        let time = rescale(rebased, source_tick_rate);
        let len = rescale(note.duration as i64, source_tick_rate);
        if time < previous_time {
            warn!(time, previous_time, "pattern event starts before its predecessor");
        }
        previous_time = time;
        events.push(PatternEvent {
            time,
            len,
            pitch: note.pitch,
            velocity: velocity_string(note.velocity),
        });
    }
    if events.is_empty() {
        return Err(ConvertError::EmptySelection {
            start: range.start,
            end: range.end,
        });
    }
    Ok(Pattern::new(events))
}

/// Rescale a source tick count to the 960-tick device rate.
fn rescale(tick: i64, source_tick_rate: u32) -> i64 {
    (f64::from(TARGET_TICK_RATE) * tick as f64 / f64::from(source_tick_rate)).round() as i64
}

/// Render `velocity / 127` as a decimal string, truncated to at most
/// [`VELOCITY_STRING_MAX`] characters. Truncation, not rounding: the device
/// ecosystem's own output shortens precision this way.
pub fn velocity_string(velocity: u8) -> String {
    let mut s = format!("{}", f64::from(velocity) / 127.0);
    s.truncate(VELOCITY_STRING_MAX);
    s
}

/// Convert one track of a document into `.mpcpattern` bytes.
///
/// `range` defaults to the track's full note span, and the export origin is
/// the range start, so patterns begin at time zero.
///
/// # Errors
/// [`ConvertError::UnresolvedTrack`] for an out-of-bounds index;
/// [`ConvertError::EmptySelection`] when nothing overlaps the range (a
/// track with no notes always ends up here). A failed conversion leaves the
/// document untouched.
pub fn convert_track(
    document: &MidiDocument,
    track_index: usize,
    range: Option<TickRange>,
) -> Result<Vec<u8>, ConvertError> {
    let track = document
        .track(track_index)
        .ok_or(ConvertError::UnresolvedTrack {
            index: track_index,
            track_count: document.tracks().len(),
        })?;
    let range = range.unwrap_or_else(|| {
        let (start, end) = track.note_span().unwrap_or((0, 0));
        TickRange::new(start, end)
    });
    let pattern = build_pattern(track, range, range.start, document.header().tick_rate())?;
    Ok(pattern.to_bytes())
}

/// Suggested output name: `<base>_Track_<number>.mpcpattern`, where
/// `number` is the 1-based position among the document's tracks that
/// contain notes.
pub fn pattern_file_name(base: &str, track_number: usize) -> String {
    format!("{base}_Track_{track_number}.mpcpattern")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Note;
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

    fn track_of(notes: Vec<Note>) -> Track {
        Track {
            notes,
            ..Track::default()
        }
    }

    #[test]
    fn rescales_start_and_duration_independently() {
        let track = track_of(vec![note(480, 240)]);
        let pattern = build_pattern(&track, TickRange::new(0, 1000), 0, 480).unwrap();
        assert_eq!(pattern.events()[0].time, 960);
        assert_eq!(pattern.events()[0].len, 480);
    }

    #[test]
    fn overlap_is_strict_at_the_boundary() {
        let track = track_of(vec![note(100, 50)]); // interval [100, 150)
        // Overlap at [140, 150): included whole, no clipping.
        let pattern = build_pattern(&track, TickRange::new(140, 200), 140, 480).unwrap();
        assert_eq!(pattern.events().len(), 1);
        assert_eq!(pattern.events()[0].len, 100); // 50 ticks at 480 -> 100 at 960
        // Touching the boundary only: excluded.
        let err = build_pattern(&track, TickRange::new(150, 200), 150, 480).unwrap_err();
        assert_eq!(err, ConvertError::EmptySelection { start: 150, end: 200 });
    }

    #[test]
    fn rebasing_can_go_negative() {
        let track = track_of(vec![note(100, 50)]);
        let pattern = build_pattern(&track, TickRange::new(120, 200), 120, 480).unwrap();
        assert_eq!(pattern.events()[0].time, -40); // (100 - 120) * 2
    }

    #[test]
    fn resolution_order_is_preserved_even_out_of_time_order() {
        let track = track_of(vec![note(480, 10), note(0, 10)]);
        let pattern = build_pattern(&track, TickRange::new(0, 1000), 0, 480).unwrap();
        assert_eq!(pattern.events()[0].time, 960);
        assert_eq!(pattern.events()[1].time, 0);
    }

    #[test]
    fn empty_track_is_an_empty_selection() {
        let err = build_pattern(&track_of(vec![]), TickRange::new(0, 100), 0, 480).unwrap_err();
        assert_eq!(err, ConvertError::EmptySelection { start: 0, end: 100 });
    }

    #[test]
    fn velocity_strings_truncate_without_rounding() {
        assert_eq!(velocity_string(100), "0.787401574803149");
        assert_eq!(velocity_string(127), "1");
        let one = velocity_string(1);
        assert!(one.starts_with("0.00787401574803"));
        for v in 1..=127u8 {
            assert!(velocity_string(v).len() <= VELOCITY_STRING_MAX);
        }
    }

    #[test]
    fn file_name_convention() {
        assert_eq!(
            pattern_file_name("MySong", 2),
            "MySong_Track_2.mpcpattern"
        );
    }
}
