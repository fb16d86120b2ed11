//! Error types for OxiXZ operations.
//!
//! Every failure in the streaming layer is reported through [`OxiXzError`]:
//! configuration mistakes are caught before a codec engine exists, engine
//! failures carry the numeric reason reported by the engine, and lifecycle
//! violations (writing after `finish`, closing twice) are reported as
//! [`OxiXzError::InvalidState`].

use crate::traits::StreamState;
use std::fmt;
use std::io;
use thiserror::Error;

/// Reason reported by a codec engine when it refuses to continue.
///
/// The numeric values returned by [`CodecErrorKind::code`] match liblzma's
/// `lzma_ret` codes so they can be correlated with `xz` tooling output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecErrorKind {
    /// The input stream has no integrity check.
    NoCheck,
    /// The integrity check type cannot be verified by this engine.
    UnsupportedCheck,
    /// The engine could not allocate memory.
    Mem,
    /// Decoding needs more memory than the configured limit.
    MemLimit,
    /// The input is not in a recognized container format.
    Format,
    /// Invalid or unsupported filter options.
    Options,
    /// Compressed data is corrupt.
    Data,
    /// No progress is possible: the input ended before the stream did, or
    /// no input was ever supplied.
    Buffer,
    /// Engine misuse (a bug in the caller of the engine).
    Program,
}

impl CodecErrorKind {
    /// Numeric reason code (liblzma `lzma_ret` value).
    pub fn code(self) -> u32 {
        match self {
            Self::NoCheck => 2,
            Self::UnsupportedCheck => 3,
            Self::Mem => 5,
            Self::MemLimit => 6,
            Self::Format => 7,
            Self::Options => 8,
            Self::Data => 9,
            Self::Buffer => 10,
            Self::Program => 11,
        }
    }

    /// Look up a kind from its numeric reason code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            2 => Some(Self::NoCheck),
            3 => Some(Self::UnsupportedCheck),
            5 => Some(Self::Mem),
            6 => Some(Self::MemLimit),
            7 => Some(Self::Format),
            8 => Some(Self::Options),
            9 => Some(Self::Data),
            10 => Some(Self::Buffer),
            11 => Some(Self::Program),
            _ => None,
        }
    }
}

impl fmt::Display for CodecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoCheck => "stream has no integrity check",
            Self::UnsupportedCheck => "unsupported integrity check",
            Self::Mem => "cannot allocate memory",
            Self::MemLimit => "memory usage limit reached",
            Self::Format => "file format not recognized",
            Self::Options => "invalid or unsupported options",
            Self::Data => "compressed data is corrupt",
            Self::Buffer => "unexpected end of input",
            Self::Program => "programming error",
        };
        f.write_str(text)
    }
}

/// The main error type for OxiXZ operations.
#[derive(Debug, Error)]
pub enum OxiXzError {
    /// I/O error from the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid filter or parameter configuration.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the rejected setting.
        message: String,
    },

    /// The codec engine reported a failure status.
    #[error("Codec error: {kind} (status {})", .kind.code())]
    Codec {
        /// Reason reported by the engine.
        kind: CodecErrorKind,
    },

    /// Neither the `.xz` nor the `.lzma` container was recognized.
    #[error("Unsupported format: input is neither an .xz nor a .lzma stream")]
    UnsupportedFormat,

    /// Operation attempted in a lifecycle state that forbids it.
    #[error("Invalid state: cannot {operation} a {state} stream")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State the stream was in.
        state: StreamState,
    },
}

/// Result type alias for OxiXZ operations.
pub type Result<T> = std::result::Result<T, OxiXzError>;

impl OxiXzError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a codec error.
    pub fn codec(kind: CodecErrorKind) -> Self {
        Self::Codec { kind }
    }

    /// Create an invalid state error.
    pub fn invalid_state(operation: &'static str, state: StreamState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Codec failure kind, if this is a codec error.
    pub fn codec_kind(&self) -> Option<CodecErrorKind> {
        match self {
            Self::Codec { kind } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this is the buffer/underflow kind of codec error.
    pub fn is_buffer_error(&self) -> bool {
        self.codec_kind() == Some(CodecErrorKind::Buffer)
    }
}

impl From<OxiXzError> for io::Error {
    fn from(err: OxiXzError) -> Self {
        match err {
            OxiXzError::Io(e) => e,
            OxiXzError::Config { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            OxiXzError::Codec {
                kind: CodecErrorKind::Buffer,
            } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            OxiXzError::Codec { .. } | OxiXzError::UnsupportedFormat => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
            OxiXzError::InvalidState { .. } => io::Error::other(err),
        }
    }
}
