use crate::error::ParseError;
use num_enum::TryFromPrimitive;

#[doc = r#"
The decoded `MThd` body.

# Layout

The header body is always six bytes: a format word, a declared track count,
and a division word, all big-endian.

The division word selects one of two timing schemes. With the high bit clear
the whole 16-bit value is ticks per quarter note. With the high bit set the
upper byte is a negative SMPTE frame rate (two's complement: `0xE8` means
24 fps) and the lower byte is ticks per frame; the effective tick rate is
their product. Conversion is tick-domain only, so both schemes collapse into
a single positive tick rate here.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileHeader {
    format: FormatType,
    declared_tracks: u16,
    tick_rate: u32,
}

/// How the tracks of a file relate to each other (the SMF format word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum FormatType {
    /// Format 0: a single multi-channel track
    SingleMultiChannel = 0,
    /// Format 1: simultaneous tracks of one song
    Simultaneous = 1,
    /// Format 2: sequentially independent patterns
    SequentiallyIndependent = 2,
}

impl FileHeader {
    /// Decode the six-byte `MThd` body.
    ///
    /// # Errors
    /// [`ParseError::MalformedHeader`] if the body is shorter than six
    /// bytes, the format word is not 0, 1, or 2, or the division resolves
    /// to a non-positive tick rate.
    pub fn decode(body: &[u8]) -> Result<Self, ParseError> {
        if body.len() < 6 {
            return Err(ParseError::MalformedHeader("body shorter than 6 bytes"));
        }
        let format = u16::from_be_bytes([body[0], body[1]]);
        let declared_tracks = u16::from_be_bytes([body[2], body[3]]);
        let division = u16::from_be_bytes([body[4], body[5]]);

        let format = FormatType::try_from(format)
            .map_err(|_| ParseError::MalformedHeader("unknown format"))?;
        let tick_rate = resolve_division(division)?;

        Ok(Self {
            format,
            declared_tracks,
            tick_rate,
        })
    }

    /// The file's format type.
    pub const fn format(&self) -> FormatType {
        self.format
    }

    /// The track count the header claims. Decoding trusts the chunks that
    /// are actually present, not this value.
    pub const fn declared_tracks(&self) -> u16 {
        self.declared_tracks
    }

    /// Ticks per quarter note, with SMPTE division already resolved.
    pub const fn tick_rate(&self) -> u32 {
        self.tick_rate
    }
}

/// Resolve the division word into a single positive tick rate.
fn resolve_division(division: u16) -> Result<u32, ParseError> {
    let rate = if division & 0x8000 != 0 {
        // SMPTE: negative frames/second in the high byte, ticks/frame low.
        let frames_per_second = -i32::from((division >> 8) as u8 as i8);
        let ticks_per_frame = i32::from(division & 0x00FF);
        frames_per_second * ticks_per_frame
    } else {
        i32::from(division)
    };
    if rate <= 0 {
        return Err(ParseError::MalformedHeader("non-positive tick rate"));
    }
    Ok(rate as u32)
}
