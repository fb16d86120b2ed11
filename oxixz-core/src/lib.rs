//! # OxiXZ Core
//!
//! Core components shared by the OxiXZ crates:
//!
//! - [`traits`]: the codec engine call contract and stream lifecycle state
//! - [`crc`]: CRC-32 and CRC-64 checksum helpers
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ CLI                                                     │
//! │     oxixz compress / decompress / test / info           │
//! ├─────────────────────────────────────────────────────────┤
//! │ Streams (oxixz-lzma)                                    │
//! │     Encoder, Decoder, AutoDecoder, one-shot helpers     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Engine (oxixz-lzma)                                     │
//! │     liblzma behind the CodecEngine trait                │
//! ├─────────────────────────────────────────────────────────┤
//! │ Core (this crate)                                       │
//! │     CodecEngine, StreamState, CRC, OxiXzError           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxixz_core::crc::{Crc64, crc32};
//!
//! assert_eq!(crc32(b"123456789", 0), 0xCBF43926);
//!
//! let mut crc = Crc64::new();
//! crc.update(b"123456789");
//! assert_eq!(crc.value(), 0x995DC9BBDF1939FA);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod crc;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use crc::{Crc32, Crc64, crc32, crc64};
pub use error::{CodecErrorKind, OxiXzError, Result};
pub use traits::{Action, CodecEngine, Progress, Status, StreamState};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::crc::{Crc32, Crc64};
    pub use crate::error::{CodecErrorKind, OxiXzError, Result};
    pub use crate::traits::{Action, CodecEngine, Progress, Status, StreamState};
}
