#![doc = r#"
MIDI variable-length quantities.

Delta-times and meta-event lengths in a Standard MIDI File are stored as
variable-length quantities: big-endian, seven value bits per byte, with the
high bit of every byte except the last set as a continuation flag. The
largest representable value is `0x0FFF_FFFF`, four bytes; a fifth
continuation byte is a hard format violation, not mere truncation.
"#]

use crate::reader::{ReadError, ReadResult};

/// Largest value a four-byte variable-length quantity can hold.
pub const MAX: u32 = 0x0FFF_FFFF;

/// Decode one variable-length quantity starting at `offset`.
///
/// Returns the value and the number of bytes consumed (`1..=4`).
///
/// # Errors
/// [`ReadError::VlqOverflow`] if four bytes are consumed without the
/// continuation bit clearing, [`ReadError::OutOfBounds`] if the buffer ends
/// before the quantity terminates.
pub fn decode(bytes: &[u8], offset: usize) -> ReadResult<(u32, usize)> {
    let mut value: u32 = 0;
    for i in 0..4 {
        let Some(&byte) = bytes.get(offset + i) else {
            return Err(ReadError::OutOfBounds {
                position: bytes.len(),
            });
        };
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(ReadError::VlqOverflow { position: offset })
}

/// Encode `value` as a minimal-length variable-length quantity.
///
/// Values above [`MAX`] are masked to 28 bits, the most a decoder could
/// ever hand back.
pub fn encode(value: u32) -> Vec<u8> {
    let value = value & MAX;
    let mut out = Vec::with_capacity(4);
    let mut started = false;
    for shift in [21u32, 14, 7] {
        let septet = ((value >> shift) & 0x7F) as u8;
        if started || septet != 0 {
            out.push(septet | 0x80);
            started = true;
        }
    }
    out.push((value & 0x7F) as u8);
    out
}
