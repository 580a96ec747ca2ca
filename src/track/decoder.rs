#![doc = r#"
The track event state machine.

Walks one `MTrk` body, tracking running status across events and pairing
note-on/note-off bytes into closed [`Note`] intervals keyed by
(channel, pitch). The decoder is deliberately tolerant: a track that runs
out of bytes mid-event keeps everything decoded so far, orphan off-events
are dropped, and unknown status bytes abandon the remainder of the track
with a warning. The one unrecoverable condition is a variable-length
quantity that fails to terminate, which poisons every later offset and
propagates as [`ParseError::TruncatedStream`].
"#]

use crate::{
    error::ParseError,
    reader::{ReadError, Reader},
    track::{Note, Track},
};
use tracing::warn;

/// How to track a second note-on arriving for a (channel, pitch) pair that
/// already has an unmatched note-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Keep a single pending slot per key; a second on-event replaces the
    /// first, which then never closes. This is what the legacy device
    /// tooling does.
    #[default]
    Replace,
    /// Queue pendings per key and close the oldest first on each off-event.
    Fifo,
}

/// Options threaded through a whole document decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Policy for overlapping same-key note-ons.
    pub overlap: OverlapPolicy,
}

/// An unmatched note-on.
#[derive(Debug, Clone, Copy)]
struct Pending {
    channel: u8,
    pitch: u8,
    velocity: u8,
    start: u64,
}

/// What a single decode iteration asks the loop to do next.
enum Step {
    Continue,
    Stop,
}

#[derive(Debug)]
pub(crate) struct DecodedTrack {
    pub(crate) track: Track,
    /// Microseconds per quarter note from the track's first Set Tempo event.
    pub(crate) tempo_mpqn: Option<u32>,
}

/// Running decode state for a single track.
pub(crate) struct TrackDecoder<'a> {
    reader: Reader<'a>,
    options: DecodeOptions,
    /// The latched status byte reused when an event omits its own.
    running_status: Option<u8>,
    /// Absolute tick counter; delta-times only ever move it forward.
    now: u64,
    /// Unmatched note-ons in arrival order, so FIFO matching and end-of-track
    /// force-closing are both deterministic.
    pending: Vec<Pending>,
    notes: Vec<Note>,
    note_ons_per_channel: [u32; 16],
    programs: [Option<u8>; 16],
    first_program_channel: Option<u8>,
    name: Option<String>,
    instrument: Option<String>,
    tempo_mpqn: Option<u32>,
}

impl<'a> TrackDecoder<'a> {
    /// Decode one `MTrk` body into a [`Track`].
    ///
    /// # Errors
    /// Only [`ParseError::TruncatedStream`], and only for a variable-length
    /// quantity exceeding four bytes. Every other defect yields a partial
    /// track.
    pub(crate) fn decode(body: &'a [u8], options: DecodeOptions) -> Result<DecodedTrack, ParseError> {
        let mut decoder = TrackDecoder {
            reader: Reader::new(body),
            options,
            running_status: None,
            now: 0,
            pending: Vec::new(),
            notes: Vec::new(),
            note_ons_per_channel: [0; 16],
            programs: [None; 16],
            first_program_channel: None,
            name: None,
            instrument: None,
            tempo_mpqn: None,
        };
        decoder.run()?;
        Ok(decoder.finish())
    }

    fn run(&mut self) -> Result<(), ParseError> {
        loop {
            match self.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Stop) => return Ok(()),
                Err(err) if err.is_vlq_overflow() => return Err(err.into()),
                Err(err) => {
                    // Simple truncation of a trailing event: keep the notes
                    // decoded so far instead of failing the document.
                    warn!(
                        position = err.position(),
                        "track truncated mid-event, keeping partial decode"
                    );
                    return Ok(());
                }
            }
        }
    }

    fn step(&mut self) -> Result<Step, ReadError> {
        if self.reader.is_empty() {
            return Ok(Step::Stop);
        }
        let delta = self.reader.read_vlq()?;
        self.now += u64::from(delta);

        // Running status: a clear high bit means the status byte was omitted
        // and the previous one carries over; the byte just inspected is the
        // first data byte.
        let status = match self.reader.peek_u8()? {
            byte if byte & 0x80 != 0 => {
                self.reader.skip(1)?;
                if byte < 0xF0 {
                    self.running_status = Some(byte);
                }
                byte
            }
            _ => match self.running_status {
                Some(status) => status,
                None => {
                    warn!(
                        position = self.reader.position(),
                        "data byte with no running status, abandoning track"
                    );
                    return Ok(Step::Stop);
                }
            },
        };

        let channel = status & 0x0F;
        match status & 0xF0 {
            0x90 => {
                let pitch = self.reader.read_u8()? & 0x7F;
                let velocity = self.reader.read_u8()? & 0x7F;
                // A note-on with velocity zero is semantically a note-off.
                if velocity == 0 {
                    self.close_note(channel, pitch);
                } else {
                    self.open_note(channel, pitch, velocity);
                }
            }
            0x80 => {
                let pitch = self.reader.read_u8()? & 0x7F;
                let _release_velocity = self.reader.read_u8()?;
                self.close_note(channel, pitch);
            }
            0xC0 => {
                let program = self.reader.read_u8()? & 0x7F;
                self.programs[channel as usize] = Some(program);
                if self.first_program_channel.is_none() {
                    self.first_program_channel = Some(channel);
                }
            }
            // Two-data-byte voice events with no bearing on conversion.
            0xA0 | 0xB0 | 0xE0 => self.reader.skip(2)?,
            // Channel pressure carries a single data byte.
            0xD0 => self.reader.skip(1)?,
            0xF0 => return self.system_event(status),
            _ => unreachable!("status bytes always have the high bit set"),
        }
        Ok(Step::Continue)
    }

    fn system_event(&mut self, status: u8) -> Result<Step, ReadError> {
        match status {
            0xFF => self.meta_event(),
            // SysEx: a length-prefixed payload, skipped whole.
            0xF0 | 0xF7 => {
                let length = self.reader.read_vlq()? as usize;
                self.reader.skip(length)?;
                Ok(Step::Continue)
            }
            _ => {
                warn!(
                    status,
                    position = self.reader.position(),
                    "unrecognized status byte, abandoning track"
                );
                Ok(Step::Stop)
            }
        }
    }

    fn meta_event(&mut self) -> Result<Step, ReadError> {
        let meta_type = self.reader.read_u8()?;
        let length = self.reader.read_vlq()? as usize;
        let payload = self.reader.read_bytes(length)?;
        match meta_type {
            // Track name.
            0x03 => {
                if self.name.is_none() {
                    self.name = sanitize_text(payload);
                }
            }
            // Instrument name.
            0x04 => {
                if self.instrument.is_none() {
                    self.instrument = sanitize_text(payload);
                }
            }
            // Set Tempo: 24-bit microseconds per quarter note, kept for the
            // document's display BPM only.
            0x51 if payload.len() >= 3 => {
                let mpqn = u32::from_be_bytes([0, payload[0], payload[1], payload[2]]);
                if self.tempo_mpqn.is_none() && mpqn > 0 {
                    self.tempo_mpqn = Some(mpqn);
                }
            }
            // End of track.
            0x2F => return Ok(Step::Stop),
            _ => {}
        }
        Ok(Step::Continue)
    }

    fn open_note(&mut self, channel: u8, pitch: u8, velocity: u8) {
        self.note_ons_per_channel[channel as usize] += 1;
        let slot = Pending {
            channel,
            pitch,
            velocity,
            start: self.now,
        };
        match self.options.overlap {
            OverlapPolicy::Replace => {
                if let Some(existing) = self
                    .pending
                    .iter_mut()
                    .find(|p| p.channel == channel && p.pitch == pitch)
                {
                    warn!(
                        channel,
                        pitch, "overlapping note-on replaces unmatched pending note"
                    );
                    *existing = slot;
                } else {
                    self.pending.push(slot);
                }
            }
            OverlapPolicy::Fifo => self.pending.push(slot),
        }
    }

    fn close_note(&mut self, channel: u8, pitch: u8) {
        // Oldest unmatched on-event wins.
        let Some(index) = self
            .pending
            .iter()
            .position(|p| p.channel == channel && p.pitch == pitch)
        else {
            warn!(
                channel,
                pitch,
                tick = self.now,
                "note-off with no pending note-on, dropping"
            );
            return;
        };
        let pending = self.pending.remove(index);
        self.notes.push(Note {
            pitch: pending.pitch,
            velocity: pending.velocity,
            start: pending.start,
            duration: self.now - pending.start,
            channel: pending.channel,
        });
    }

    fn finish(mut self) -> DecodedTrack {
        // Anything still pending never saw its off event; close it with zero
        // duration so no open interval leaks into downstream range filters.
        for pending in std::mem::take(&mut self.pending) {
            warn!(
                channel = pending.channel,
                pitch = pending.pitch,
                "note-on unmatched at end of track, force-closing"
            );
            self.notes.push(Note {
                pitch: pending.pitch,
                velocity: pending.velocity,
                start: pending.start,
                duration: 0,
                channel: pending.channel,
            });
        }

        let channel = self.primary_channel();
        DecodedTrack {
            track: Track {
                notes: self.notes,
                name: self.name,
                instrument: self.instrument,
                program: self.programs[channel as usize],
                channel,
            },
            tempo_mpqn: self.tempo_mpqn,
        }
    }

    fn primary_channel(&self) -> u8 {
        if let Some(channel) = self.first_program_channel {
            return channel;
        }
        // Busiest channel; ties go to the lowest number.
        let mut best = 0u8;
        for (channel, &count) in self.note_ons_per_channel.iter().enumerate() {
            if count > self.note_ons_per_channel[best as usize] {
                best = channel as u8;
            }
        }
        best
    }
}

/// Decode meta-event text: UTF-8 when valid, raw byte-to-character mapping
/// otherwise. Control characters become spaces, whitespace runs collapse to
/// one space, and the result is trimmed. Returns `None` when nothing
/// printable remains.
pub(crate) fn sanitize_text(bytes: &[u8]) -> Option<String> {
    let raw: String = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    };
    let mut out = String::with_capacity(raw.len());
    let mut in_space = true;
    for ch in raw.chars() {
        let ch = if ch.is_control() { ' ' } else { ch };
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(body: &[u8]) -> Track {
        TrackDecoder::decode(body, DecodeOptions::default())
            .unwrap()
            .track
    }

    fn decode_fifo(body: &[u8]) -> Track {
        let options = DecodeOptions {
            overlap: OverlapPolicy::Fifo,
        };
        TrackDecoder::decode(body, options).unwrap().track
    }

    #[test]
    fn pairs_note_on_and_off() {
        let body = [
            0x00, 0x90, 60, 100, // on, tick 0
            0x81, 0x40, 0x80, 60, 0, // off, 192 ticks later
            0x00, 0xFF, 0x2F, 0x00, // end of track
        ];
        let track = decode(&body);
        assert_eq!(
            track.notes(),
            &[Note {
                pitch: 60,
                velocity: 100,
                start: 0,
                duration: 192,
                channel: 0,
            }]
        );
    }

    #[test]
    fn running_status_carries_across_events() {
        // One explicit note-on status, then two more events without one.
        let body = [
            0x00, 0x90, 60, 100, // explicit status
            0x10, 62, 100, // running status note-on
            0x10, 60, 0, // running status, velocity 0 = off
            0x10, 62, 0, 0x00, 0xFF, 0x2F, 0x00,
        ];
        let track = decode(&body);
        assert_eq!(track.notes().len(), 2);
        assert_eq!(track.notes()[0].pitch, 60);
        assert_eq!(track.notes()[0].duration, 32);
        assert_eq!(track.notes()[1].pitch, 62);
        assert_eq!(track.notes()[1].start, 16);
        assert_eq!(track.notes()[1].duration, 32);
    }

    #[test]
    fn velocity_zero_note_on_never_stores_a_note() {
        let body = [0x00, 0x90, 60, 0, 0x00, 0xFF, 0x2F, 0x00];
        let track = decode(&body);
        assert!(track.notes().is_empty());
    }

    #[test]
    fn orphan_note_off_is_dropped() {
        let body = [0x00, 0x80, 60, 64, 0x00, 0xFF, 0x2F, 0x00];
        let track = decode(&body);
        assert!(track.notes().is_empty());
    }

    #[test]
    fn unmatched_note_on_is_force_closed_with_zero_duration() {
        let body = [0x00, 0x90, 60, 100, 0x60, 0xFF, 0x2F, 0x00];
        let track = decode(&body);
        assert_eq!(track.notes().len(), 1);
        assert_eq!(track.notes()[0].start, 0);
        assert_eq!(track.notes()[0].duration, 0);
    }

    #[test]
    fn same_pitch_different_channels_pair_independently() {
        let body = [
            0x00, 0x90, 60, 100, // channel 0 on
            0x00, 0x91, 60, 90, // channel 1 on
            0x10, 0x81, 60, 0, // channel 1 off at 16
            0x10, 0x80, 60, 0, // channel 0 off at 32
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let track = decode(&body);
        assert_eq!(track.notes().len(), 2);
        assert_eq!((track.notes()[0].channel, track.notes()[0].duration), (1, 16));
        assert_eq!((track.notes()[1].channel, track.notes()[1].duration), (0, 32));
    }

    #[test]
    fn overlap_replace_keeps_a_single_slot() {
        let body = [
            0x00, 0x90, 60, 100, // first on at 0
            0x10, 0x90, 60, 90, // overlapping on at 16 replaces it
            0x10, 0x80, 60, 0, // off at 32
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let track = decode(&body);
        // Only the replacement closes; the first on-event is lost.
        assert_eq!(track.notes().len(), 1);
        assert_eq!(track.notes()[0].velocity, 90);
        assert_eq!(track.notes()[0].start, 16);
        assert_eq!(track.notes()[0].duration, 16);
    }

    #[test]
    fn overlap_fifo_closes_oldest_first() {
        let body = [
            0x00, 0x90, 60, 100, // first on at 0
            0x10, 0x90, 60, 90, // second on at 16
            0x10, 0x80, 60, 0, // off at 32 closes the first
            0x10, 0x80, 60, 0, // off at 48 closes the second
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let track = decode_fifo(&body);
        assert_eq!(track.notes().len(), 2);
        assert_eq!((track.notes()[0].velocity, track.notes()[0].start), (100, 0));
        assert_eq!(track.notes()[0].duration, 32);
        assert_eq!((track.notes()[1].velocity, track.notes()[1].start), (90, 16));
        assert_eq!(track.notes()[1].duration, 32);
    }

    #[test]
    fn truncation_mid_event_keeps_partial_track() {
        let body = [
            0x00, 0x90, 60, 100, 0x20, 0x80, 60, 0, // one full note
            0x00, 0x90, 64, // note-on cut off after the pitch byte
        ];
        let track = decode(&body);
        assert_eq!(track.notes().len(), 1);
        assert_eq!(track.notes()[0].pitch, 60);
    }

    #[test]
    fn vlq_overflow_is_a_hard_failure() {
        let body = [0xFF, 0xFF, 0xFF, 0xFF, 0x90, 60, 100];
        let err = TrackDecoder::decode(&body, DecodeOptions::default()).unwrap_err();
        assert_eq!(err, ParseError::TruncatedStream { position: 0 });
    }

    #[test]
    fn unknown_status_abandons_the_rest_of_the_track() {
        let body = [
            0x00, 0x90, 60, 100, 0x20, 0x80, 60, 0, // one full note
            0x00, 0xF2, 0x01, 0x02, // song position pointer: not handled
            0x00, 0x90, 64, 100, // never reached
        ];
        let track = decode(&body);
        assert_eq!(track.notes().len(), 1);
    }

    #[test]
    fn meta_names_are_sanitized_and_first_wins() {
        let body = [
            0x00, 0xFF, 0x03, 0x0C, b' ', b'L', b'e', b'a', b'd', 0x00, b' ', b' ', b'V', b'o',
            b'x', b' ', // "  Lead\0  Vox " -> "Lead Vox"
            0x00, 0xFF, 0x03, 0x05, b'o', b't', b'h', b'e', b'r', // ignored
            0x00, 0xFF, 0x04, 0x04, b'M', b'o', b'o', b'g', 0x00, 0xFF, 0x2F, 0x00,
        ];
        let track = decode(&body);
        assert_eq!(track.name(), Some("Lead Vox"));
        assert_eq!(track.instrument_name(), Some("Moog"));
    }

    #[test]
    fn program_change_pins_the_primary_channel() {
        let body = [
            0x00, 0xC5, 33, // program 33 on channel 5
            0x00, 0x90, 60, 100, // plenty of notes on channel 0
            0x10, 0x80, 60, 0, 0x00, 0x90, 62, 100, 0x10, 0x80, 62, 0, 0x00, 0xFF, 0x2F, 0x00,
        ];
        let track = decode(&body);
        assert_eq!(track.channel(), 5);
        assert_eq!(track.program(), Some(33));
        assert_eq!(track.instrument_name(), Some("Electric Bass (finger)"));
    }

    #[test]
    fn busiest_channel_wins_without_program_changes() {
        let body = [
            0x00, 0x93, 60, 100, // one note-on on channel 3
            0x00, 0x91, 62, 100, // two on channel 1
            0x00, 0x91, 64, 100, 0x10, 0x83, 60, 0, 0x00, 0x81, 62, 0, 0x00, 0x81, 64, 0, 0x00,
            0xFF, 0x2F, 0x00,
        ];
        let track = decode(&body);
        assert_eq!(track.channel(), 1);
        assert_eq!(track.program(), None);
    }

    #[test]
    fn first_tempo_event_is_captured() {
        let body = [
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // 500000 us/qn = 120 bpm
            0x00, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, // later tempo ignored
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let decoded = TrackDecoder::decode(&body, DecodeOptions::default()).unwrap();
        assert_eq!(decoded.tempo_mpqn, Some(500_000));
    }

    #[test]
    fn sanitize_text_rules() {
        assert_eq!(sanitize_text(b"  Grand\tPiano \n"), Some("Grand Piano".into()));
        assert_eq!(sanitize_text(b"\x00\x01\x02"), None);
        assert_eq!(sanitize_text(b""), None);
        // Invalid UTF-8 falls back to byte-to-character mapping.
        assert_eq!(sanitize_text(&[0xC3, 0x28]), Some("\u{C3}(".into()));
    }
}
