use thiserror::Error;

#[doc = r#"
Errors produced while walking raw bytes.

These stay internal to the decode pipeline. At the public boundary they
surface as [`ParseError::TruncatedStream`](crate::ParseError::TruncatedStream);
the distinction between the two kinds matters only to the track decoder,
which tolerates plain truncation but not a malformed length encoding.
"#]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// A read ran past the end of the buffer (or of a chunk's bounded view).
    #[error("read out of bounds at byte {position}")]
    OutOfBounds {
        /// Offset of the end of the buffer that was overrun.
        position: usize,
    },
    /// A variable-length quantity failed to terminate within four bytes.
    #[error("variable-length quantity at byte {position} exceeds four bytes")]
    VlqOverflow {
        /// Offset of the first byte of the quantity.
        position: usize,
    },
}

impl ReadError {
    /// Position at which the error was detected.
    pub const fn position(&self) -> usize {
        match self {
            Self::OutOfBounds { position } | Self::VlqOverflow { position } => *position,
        }
    }

    /// True for the unrecoverable length-encoding failure.
    pub const fn is_vlq_overflow(&self) -> bool {
        matches!(self, Self::VlqOverflow { .. })
    }
}

/// The read result type (see [`ReadError`]).
pub type ReadResult<T> = Result<T, ReadError>;
