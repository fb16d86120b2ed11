//! Container detection, integrity checks and size bounds.
//!
//! Container layouts:
//! - `.xz`: `FD 37 7A 58 5A 00` magic, 2 flag bytes, CRC-32 of the flags.
//! - `.lzma` (LZMA_Alone): properties byte, little-endian u32 dictionary
//!   size, little-endian u64 uncompressed size (`u64::MAX` = unknown).

use oxixz_core::crc::Crc32;
use oxixz_core::error::{CodecErrorKind, OxiXzError, Result};
use std::fmt;

/// XZ magic bytes.
pub const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
/// Size of the `.xz` stream header.
pub const XZ_HEADER_SIZE: usize = 12;
/// Size of the LZMA_Alone header.
pub const LZMA_ALONE_HEADER_SIZE: usize = 13;

/// Largest uncompressed size an LZMA_Alone header may declare before it is
/// considered implausible (256 GiB).
const LZMA_ALONE_SIZE_MAX: u64 = 1 << 38;

/// Integrity check stored in an `.xz` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Check {
    /// No check.
    None = 0x00,
    /// CRC-32.
    Crc32 = 0x01,
    /// CRC-64.
    #[default]
    Crc64 = 0x04,
    /// SHA-256.
    Sha256 = 0x0A,
}

impl Check {
    /// Create from check ID.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Crc32),
            0x04 => Some(Self::Crc64),
            0x0A => Some(Self::Sha256),
            _ => None,
        }
    }

    /// Check ID as stored in stream flags.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Size of the check field in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Crc32 => 4,
            Self::Crc64 => 8,
            Self::Sha256 => 32,
        }
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Crc32 => "crc32",
            Self::Crc64 => "crc64",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detected compressed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// `.xz` stream.
    Xz,
    /// Legacy `.lzma` stream.
    LzmaAlone,
    /// Neither container recognized.
    Unknown,
}

impl ContainerFormat {
    /// Detect the container from the first bytes of a stream.
    ///
    /// `.xz` needs its 6 magic bytes. `.lzma` has no magic, so the 13-byte
    /// header is accepted only if it is plausible: a properties byte below
    /// 225, a dictionary size of `2^n`, `2^n + 2^(n-1)` or `u32::MAX`, and an
    /// uncompressed size that is unknown or below 256 GiB.
    pub fn from_magic(data: &[u8]) -> Self {
        if data.len() >= XZ_MAGIC.len() && data[..XZ_MAGIC.len()] == XZ_MAGIC {
            return Self::Xz;
        }
        if data.len() >= LZMA_ALONE_HEADER_SIZE && is_plausible_alone_header(data) {
            return Self::LzmaAlone;
        }
        Self::Unknown
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xz => "xz",
            Self::LzmaAlone => "lzma",
            Self::Unknown => "",
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Xz => "XZ",
            Self::LzmaAlone => "LZMA",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_plausible_alone_header(data: &[u8]) -> bool {
    // lc/lp/pb packed as (pb * 5 + lp) * 9 + lc.
    if data[0] >= 9 * 5 * 5 {
        return false;
    }

    let dict = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
    if dict != u32::MAX && !is_pow2_plus_half(dict) {
        return false;
    }

    let mut size = [0u8; 8];
    size.copy_from_slice(&data[5..13]);
    let size = u64::from_le_bytes(size);
    size == u64::MAX || size < LZMA_ALONE_SIZE_MAX
}

fn is_pow2_plus_half(dict: u32) -> bool {
    if dict == 0 {
        return false;
    }
    dict.is_power_of_two() || {
        let high = 1u32 << (31 - dict.leading_zeros());
        high > 1 && dict == high | (high >> 1)
    }
}

/// Parsed `.xz` stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Integrity check used by the stream's blocks.
    pub check: Check,
}

impl StreamHeader {
    /// Parse and verify the 12-byte stream header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < XZ_HEADER_SIZE || data[..XZ_MAGIC.len()] != XZ_MAGIC {
            return Err(OxiXzError::UnsupportedFormat);
        }

        let flags = [data[6], data[7]];
        let stored = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        // Same kinds liblzma reports for these bytes.
        if Crc32::compute(&flags) != stored || flags[0] != 0 || flags[1] & 0xF0 != 0 {
            return Err(OxiXzError::codec(CodecErrorKind::Data));
        }

        let check = Check::from_id(flags[1])
            .ok_or_else(|| OxiXzError::codec(CodecErrorKind::UnsupportedCheck))?;
        Ok(Self { check })
    }
}

/// Parsed LZMA_Alone header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AloneHeader {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
    /// Dictionary size.
    pub dict_size: u32,
    /// Declared uncompressed size, if known.
    pub uncompressed_size: Option<u64>,
}

impl AloneHeader {
    /// Parse a 13-byte LZMA_Alone header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < LZMA_ALONE_HEADER_SIZE || !is_plausible_alone_header(data) {
            return Err(OxiXzError::UnsupportedFormat);
        }

        let props = u32::from(data[0]);
        let dict_size = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
        let mut size = [0u8; 8];
        size.copy_from_slice(&data[5..13]);
        let size = u64::from_le_bytes(size);

        Ok(Self {
            lc: props % 9,
            lp: (props / 9) % 5,
            pb: props / 45,
            dict_size,
            uncompressed_size: (size != u64::MAX).then_some(size),
        })
    }
}

/// Largest uncompressed chunk in an LZMA2 stream.
const LZMA2_CHUNK_MAX: u64 = 1 << 16;
/// Per-chunk header overhead for uncompressed LZMA2 chunks.
const LZMA2_CHUNK_HEADER: u64 = 3;
/// Block header, padding and largest check.
const BLOCK_HEADERS_BOUND: u64 = 92;
/// Stream header, footer and single-record index.
const STREAM_HEADERS_BOUND: u64 = 48;

fn lzma2_bound(size: u64) -> Option<u64> {
    let chunks = size.div_ceil(LZMA2_CHUNK_MAX);
    size.checked_add(chunks.checked_mul(LZMA2_CHUNK_HEADER)?)?
        .checked_add(1)
}

/// Worst-case size of a single `.xz` block holding `size` bytes.
///
/// Returns `None` on overflow.
pub fn block_buffer_bound(size: usize) -> Option<usize> {
    let bound = lzma2_bound(size as u64)?;
    let bound = bound.checked_add(3)? & !3;
    usize::try_from(bound.checked_add(BLOCK_HEADERS_BOUND)?).ok()
}

/// Worst-case size of a single-block `.xz` stream holding `size` bytes.
///
/// Returns `None` on overflow.
pub fn stream_buffer_bound(size: usize) -> Option<usize> {
    block_buffer_bound(size)?.checked_add(STREAM_HEADERS_BOUND as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alone_header(props: u8, dict: u32, size: u64) -> Vec<u8> {
        let mut header = vec![props];
        header.extend_from_slice(&dict.to_le_bytes());
        header.extend_from_slice(&size.to_le_bytes());
        header
    }

    #[test]
    fn test_check_ids() {
        for check in [Check::None, Check::Crc32, Check::Crc64, Check::Sha256] {
            assert_eq!(Check::from_id(check.id()), Some(check));
        }
        assert_eq!(Check::from_id(2), None);
        assert_eq!(Check::default(), Check::Crc64);
        assert_eq!(Check::Sha256.size(), 32);
    }

    #[test]
    fn test_detect_xz() {
        let mut data = XZ_MAGIC.to_vec();
        data.extend_from_slice(&[0, 4]);
        assert_eq!(ContainerFormat::from_magic(&data), ContainerFormat::Xz);
        assert_eq!(ContainerFormat::from_magic(&XZ_MAGIC[..5]), ContainerFormat::Unknown);
    }

    #[test]
    fn test_detect_alone() {
        let header = alone_header(0x5D, 1 << 23, u64::MAX);
        assert_eq!(ContainerFormat::from_magic(&header), ContainerFormat::LzmaAlone);

        let header = alone_header(0x5D, 3 << 20, 1000);
        assert_eq!(ContainerFormat::from_magic(&header), ContainerFormat::LzmaAlone);

        let header = alone_header(0x5D, u32::MAX, 0);
        assert_eq!(ContainerFormat::from_magic(&header), ContainerFormat::LzmaAlone);
    }

    #[test]
    fn test_reject_implausible_alone() {
        assert_eq!(
            ContainerFormat::from_magic(&alone_header(225, 1 << 23, 0)),
            ContainerFormat::Unknown
        );
        assert_eq!(
            ContainerFormat::from_magic(&alone_header(0x5D, 1_000_000, 0)),
            ContainerFormat::Unknown
        );
        assert_eq!(
            ContainerFormat::from_magic(&alone_header(0x5D, 1 << 23, 1 << 40)),
            ContainerFormat::Unknown
        );
        assert_eq!(ContainerFormat::from_magic(b"plain text here"), ContainerFormat::Unknown);
    }

    #[test]
    fn test_alone_header_parse() {
        let header = AloneHeader::parse(&alone_header(0x5D, 1 << 16, 42)).unwrap();
        assert_eq!((header.lc, header.lp, header.pb), (3, 0, 2));
        assert_eq!(header.dict_size, 1 << 16);
        assert_eq!(header.uncompressed_size, Some(42));

        let header = AloneHeader::parse(&alone_header(0, 1 << 16, u64::MAX)).unwrap();
        assert_eq!(header.uncompressed_size, None);
    }

    #[test]
    fn test_stream_header_parse() {
        let flags = [0u8, Check::Crc32.id()];
        let mut data = XZ_MAGIC.to_vec();
        data.extend_from_slice(&flags);
        data.extend_from_slice(&Crc32::compute(&flags).to_le_bytes());
        assert_eq!(StreamHeader::parse(&data).unwrap().check, Check::Crc32);

        let mut bad_crc = data.clone();
        bad_crc[11] ^= 0xFF;
        let err = StreamHeader::parse(&bad_crc).unwrap_err();
        assert_eq!(err.codec_kind(), Some(CodecErrorKind::Data));

        let mut reserved = XZ_MAGIC.to_vec();
        let flags = [0x01u8, Check::Crc32.id()];
        reserved.extend_from_slice(&flags);
        reserved.extend_from_slice(&Crc32::compute(&flags).to_le_bytes());
        let err = StreamHeader::parse(&reserved).unwrap_err();
        assert_eq!(err.codec_kind(), Some(CodecErrorKind::Data));

        let mut unknown = XZ_MAGIC.to_vec();
        let flags = [0u8, 0x05];
        unknown.extend_from_slice(&flags);
        unknown.extend_from_slice(&Crc32::compute(&flags).to_le_bytes());
        let err = StreamHeader::parse(&unknown).unwrap_err();
        assert_eq!(err.codec_kind(), Some(CodecErrorKind::UnsupportedCheck));
        assert!(matches!(
            StreamHeader::parse(b"not xz at all"),
            Err(OxiXzError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_buffer_bounds() {
        assert_eq!(block_buffer_bound(0), Some(4 + 92));
        assert_eq!(stream_buffer_bound(0), Some(4 + 92 + 48));

        let n = 1 << 20;
        let bound = stream_buffer_bound(n).unwrap();
        assert!(bound > n);
        assert!(bound < n + n / 100 + 256);
        assert!(block_buffer_bound(usize::MAX).is_none());
    }
}
