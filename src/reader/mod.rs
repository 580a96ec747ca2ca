#![doc = r#"
A bounds-checked cursor over an in-memory byte buffer.

All multi-byte integers in a Standard MIDI File are big-endian. Every read
is checked against the end of the buffer and reports the position at which
it ran out, so decode failures can be located in the source bytes.
"#]

mod error;
pub use error::*;

use crate::vlq;

/// A byte cursor with a tracked position.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    /// Wrap a byte slice.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Current offset into the buffer.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// True once every byte has been consumed.
    pub const fn is_empty(&self) -> bool {
        self.position >= self.bytes.len()
    }

    const fn oob(&self) -> ReadError {
        ReadError::OutOfBounds {
            position: self.bytes.len(),
        }
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        let Some(&byte) = self.bytes.get(self.position) else {
            return Err(self.oob());
        };
        self.position += 1;
        Ok(byte)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> ReadResult<u8> {
        match self.bytes.get(self.position) {
            Some(&byte) => Ok(byte),
            None => Err(self.oob()),
        }
    }

    /// Read a big-endian `u16`.
    pub fn read_u16_be(&mut self) -> ReadResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32_be(&mut self) -> ReadResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Read exactly `len` bytes as a sub-slice of the buffer.
    pub fn read_bytes(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        let end = match self.position.checked_add(len) {
            Some(end) => end,
            None => return Err(self.oob()),
        };
        let Some(slice) = self.bytes.get(self.position..end) else {
            return Err(self.oob());
        };
        self.position = end;
        Ok(slice)
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Advance the cursor by `len` bytes.
    pub fn skip(&mut self, len: usize) -> ReadResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Decode a variable-length quantity at the cursor.
    pub fn read_vlq(&mut self) -> ReadResult<u32> {
        let (value, consumed) = vlq::decode(self.bytes, self.position)?;
        self.position += consumed;
        Ok(value)
    }
}
