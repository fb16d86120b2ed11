//! Command implementations for OxiXZ CLI.

pub mod compress;
pub mod crc;
pub mod decompress;
pub mod info;

pub use compress::{CompressOptions, cmd_compress};
pub use crc::cmd_crc;
pub use decompress::{DecompressOptions, cmd_decompress};
pub use info::cmd_info;
pub use test::cmd_test;

use clap::ValueEnum;
use oxixz_lzma::{Check, Filter, FilterChain, LzmaOptions};

/// Container written by `compress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncodeFormat {
    /// .xz stream
    Xz,
    /// Legacy .lzma stream
    Lzma,
    /// Raw LZMA2 stream, no container
    Raw,
}

impl EncodeFormat {
    /// Default file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xz => "xz",
            Self::Lzma => "lzma",
            Self::Raw => "raw",
        }
    }
}

/// Container expected by `decompress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecodeFormat {
    /// Detect .xz or .lzma
    Auto,
    /// .xz stream
    Xz,
    /// Legacy .lzma stream
    Lzma,
    /// Raw LZMA2 stream, no container
    Raw,
}

/// Integrity check for .xz output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckArg {
    /// No check
    None,
    /// CRC-32
    Crc32,
    /// CRC-64
    Crc64,
    /// SHA-256
    Sha256,
}

impl From<CheckArg> for Check {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::None => Check::None,
            CheckArg::Crc32 => Check::Crc32,
            CheckArg::Crc64 => Check::Crc64,
            CheckArg::Sha256 => Check::Sha256,
        }
    }
}

/// LZMA options for `preset`, extreme variant if requested.
pub fn lzma_options(preset: u32, extreme: bool) -> oxixz_core::Result<LzmaOptions> {
    if extreme {
        LzmaOptions::extreme(preset)
    } else {
        LzmaOptions::new(preset)
    }
}

/// Chain for xz and raw streams: optional delta, then LZMA2.
pub fn filter_chain(
    preset: u32,
    extreme: bool,
    delta: Option<u32>,
) -> oxixz_core::Result<FilterChain> {
    let mut filters = Vec::with_capacity(2);
    if let Some(distance) = delta {
        filters.push(Filter::delta(distance)?);
    }
    filters.push(Filter::lzma2(lzma_options(preset, extreme)?)?);
    FilterChain::new(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_chain() {
        assert_eq!(filter_chain(6, false, None).unwrap().len(), 1);
        assert_eq!(filter_chain(1, true, Some(4)).unwrap().len(), 2);
        assert!(filter_chain(10, false, None).is_err());
        assert!(filter_chain(6, false, Some(0)).is_err());
    }

    #[test]
    fn test_check_conversion() {
        assert_eq!(Check::from(CheckArg::Sha256), Check::Sha256);
        assert_eq!(Check::from(CheckArg::None), Check::None);
    }
}
