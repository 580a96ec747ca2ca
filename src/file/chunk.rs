use crate::{error::ParseError, reader::Reader};

#[doc = r#"
Top-level chunk structure of a Standard MIDI File.

A file is a sequence of chunks, each a 4-character ASCII tag followed by a
big-endian 32-bit byte length and exactly that many body bytes. Only `MThd`
and `MTrk` are decoded; any other tag is skipped by its declared length,
which keeps files carrying proprietary chunks loadable.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    tag: [u8; 4],
    body: &'a [u8],
}

/// Tag of the mandatory first chunk.
pub const HEADER_TAG: [u8; 4] = *b"MThd";
/// Tag of a track chunk.
pub const TRACK_TAG: [u8; 4] = *b"MTrk";

impl<'a> Chunk<'a> {
    /// Read the chunk starting at the reader's cursor.
    ///
    /// # Errors
    /// [`ParseError::MalformedHeader`] if fewer than eight bytes remain for
    /// the tag and length, [`ParseError::TruncatedStream`] if the declared
    /// body length overruns the buffer.
    pub fn read(reader: &mut Reader<'a>) -> Result<Self, ParseError> {
        if reader.remaining() < 8 {
            return Err(ParseError::MalformedHeader(
                "chunk header shorter than 8 bytes",
            ));
        }
        let tag: [u8; 4] = reader.read_array()?;
        let length = reader.read_u32_be()? as usize;
        let body = reader.read_bytes(length)?;
        Ok(Self { tag, body })
    }

    /// The 4-character ASCII tag.
    pub const fn tag(&self) -> [u8; 4] {
        self.tag
    }

    /// The length-bounded chunk body.
    pub const fn body(&self) -> &'a [u8] {
        self.body
    }

    /// True for the `MThd` header chunk.
    pub const fn is_header(&self) -> bool {
        matches!(self.tag, HEADER_TAG)
    }

    /// True for an `MTrk` track chunk.
    pub const fn is_track(&self) -> bool {
        matches!(self.tag, TRACK_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_tag_length_and_body() {
        let bytes = [
            b'M', b'T', b'r', b'k', 0x00, 0x00, 0x00, 0x03, 0xAA, 0xBB, 0xCC, 0xDD,
        ];
        let mut reader = Reader::new(&bytes);
        let chunk = Chunk::read(&mut reader).unwrap();
        assert!(chunk.is_track());
        assert!(!chunk.is_header());
        assert_eq!(chunk.body(), &[0xAA, 0xBB, 0xCC]);
        // The byte after the declared length is left for the next chunk.
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn short_chunk_header_is_malformed() {
        let bytes = [b'M', b'T', b'r', b'k', 0x00, 0x00, 0x00];
        let mut reader = Reader::new(&bytes);
        assert_eq!(
            Chunk::read(&mut reader).unwrap_err(),
            ParseError::MalformedHeader("chunk header shorter than 8 bytes"),
        );
    }

    #[test]
    fn overlong_declared_length_is_truncation() {
        let bytes = [b'M', b'T', b'r', b'k', 0x00, 0x00, 0x00, 0x08, 0xAA];
        let mut reader = Reader::new(&bytes);
        assert_eq!(
            Chunk::read(&mut reader).unwrap_err(),
            ParseError::TruncatedStream { position: 9 },
        );
    }

    #[test]
    fn foreign_tags_are_readable() {
        let bytes = [b'X', b'F', b'I', b'L', 0x00, 0x00, 0x00, 0x00];
        let mut reader = Reader::new(&bytes);
        let chunk = Chunk::read(&mut reader).unwrap();
        assert!(!chunk.is_header());
        assert!(!chunk.is_track());
        assert_eq!(chunk.tag(), *b"XFIL");
        assert!(chunk.body().is_empty());
    }
}
