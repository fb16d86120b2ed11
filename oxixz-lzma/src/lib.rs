//! # OxiXZ LZMA
//!
//! Streaming `.xz` / `.lzma` / raw LZMA compression on top of liblzma.
//!
//! ## Streams
//!
//! - [`Encoder`]: push-style. Feed bytes with `write`, end the stream with
//!   `finish`; compressed output goes to any [`std::io::Write`] sink.
//! - [`Decoder`]: pull-style. `read_chunk` / `read_into` pull compressed
//!   bytes from any [`std::io::Read`] source on demand.
//! - [`AutoDecoder`]: a decoder that accepts both `.xz` and `.lzma`.
//!
//! Both ends drive a [`CodecEngine`](oxixz_core::CodecEngine);
//! [`LzmaStream`] is the liblzma implementation.
//!
//! ## Usage
//!
//! ```rust
//! use oxixz_lzma::{AutoDecoder, DecoderLimits, Encoder};
//!
//! let mut encoder = Encoder::new(Vec::new(), 6)?;
//! encoder.write(b"Hello, ")?;
//! encoder.write(b"World!")?;
//! let compressed = encoder.into_inner()?;
//!
//! let mut decoder = AutoDecoder::new(&compressed[..], DecoderLimits::default())?;
//! assert_eq!(decoder.read_all()?, b"Hello, World!");
//! # Ok::<(), oxixz_core::OxiXzError>(())
//! ```
//!
//! ### One-shot
//!
//! ```rust
//! use oxixz_lzma::{decode, encode};
//!
//! let compressed = encode(b"one shot", 1)?;
//! assert_eq!(decode(&compressed)?, b"one shot");
//! # Ok::<(), oxixz_core::OxiXzError>(())
//! ```
//!
//! ## Filter chains
//!
//! A [`FilterChain`] holds up to four filters: optional delta stages
//! followed by one LZMA1 or LZMA2 filter. Raw streams accept either
//! compression filter, `.xz` streams require LZMA2 and `.lzma` streams take
//! bare [`LzmaOptions`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod filter;
pub mod format;
pub mod oneshot;
pub mod options;

#[cfg(test)]
mod testing;

// Re-exports
pub use decoder::{AutoDecoder, Decoder, DecoderLimits, DecoderMode};
pub use encoder::Encoder;
pub use engine::{LzmaStream, StreamKind};
pub use filter::{Filter, FilterChain, MAX_FILTERS};
pub use format::{
    AloneHeader, Check, ContainerFormat, LZMA_ALONE_HEADER_SIZE, StreamHeader, XZ_HEADER_SIZE,
    XZ_MAGIC, block_buffer_bound, stream_buffer_bound,
};
pub use oneshot::{
    decode, decode_lzma_alone, decode_raw, decode_xz, encode, encode_lzma_alone, encode_raw,
    encode_with,
};
pub use options::{LzmaOptions, MatchFinder, Mode, PRESET_DEFAULT, PRESET_EXTREME};

/// Size of the staging buffers used by encoders and decoders (256 KiB).
pub const BLOCK_SIZE: usize = 256 * 1024;
