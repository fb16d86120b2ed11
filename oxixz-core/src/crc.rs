//! CRC (Cyclic Redundancy Check) helpers.
//!
//! Both checksums used by the XZ container are provided:
//!
//! - **CRC-32 (ISO 3309)**: block and stream header checks
//! - **CRC-64/ECMA-182**: the default integrity check of `.xz` streams
//!
//! The free functions [`crc32`] and [`crc64`] follow liblzma's chaining
//! convention: the `seed` argument is the CRC of everything processed so far
//! (`0` to start), so `crc32(b, crc32(a, 0)) == crc32(a ++ b, 0)`.
//!
//! ## Performance
//!
//! Inputs of 16 bytes or more are processed with the "slicing-by-8"
//! technique: eight lookup tables let the loop fold eight bytes per step.
//! Shorter inputs use the single-table byte loop.

use std::fmt;

const CRC32_POLY: u32 = 0xEDB88320;
const CRC64_POLY: u64 = 0xC96C5795D7870F42;

/// Minimum input length for the slicing-by-8 path.
const SLICE_THRESHOLD: usize = 16;

const fn crc32_tables() -> [[u32; 256]; 8] {
    let mut tables = [[0u32; 256]; 8];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC32_POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 8 {
        let mut i = 0;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }
    tables
}

const fn crc64_tables() -> [[u64; 256]; 8] {
    let mut tables = [[0u64; 256]; 8];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u64;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC64_POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 8 {
        let mut i = 0;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }
    tables
}

static CRC32_TABLES: [[u32; 256]; 8] = crc32_tables();
static CRC64_TABLES: [[u64; 256]; 8] = crc64_tables();

/// Fold `data` into a raw (pre-inverted) CRC-32 register.
fn crc32_raw(mut crc: u32, data: &[u8]) -> u32 {
    let t = &CRC32_TABLES;
    let mut rest = data;

    if data.len() >= SLICE_THRESHOLD {
        let mut chunks = data.chunks_exact(8);
        for chunk in &mut chunks {
            let lo = crc ^ u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            crc = t[7][(lo & 0xFF) as usize]
                ^ t[6][((lo >> 8) & 0xFF) as usize]
                ^ t[5][((lo >> 16) & 0xFF) as usize]
                ^ t[4][(lo >> 24) as usize]
                ^ t[3][chunk[4] as usize]
                ^ t[2][chunk[5] as usize]
                ^ t[1][chunk[6] as usize]
                ^ t[0][chunk[7] as usize];
        }
        rest = chunks.remainder();
    }

    for &byte in rest {
        crc = t[0][((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}

/// Fold `data` into a raw (pre-inverted) CRC-64 register.
fn crc64_raw(mut crc: u64, data: &[u8]) -> u64 {
    let t = &CRC64_TABLES;
    let mut rest = data;

    if data.len() >= SLICE_THRESHOLD {
        let mut chunks = data.chunks_exact(8);
        for chunk in &mut chunks {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            let x = crc ^ u64::from_le_bytes(word);
            crc = t[7][(x & 0xFF) as usize]
                ^ t[6][((x >> 8) & 0xFF) as usize]
                ^ t[5][((x >> 16) & 0xFF) as usize]
                ^ t[4][((x >> 24) & 0xFF) as usize]
                ^ t[3][((x >> 32) & 0xFF) as usize]
                ^ t[2][((x >> 40) & 0xFF) as usize]
                ^ t[1][((x >> 48) & 0xFF) as usize]
                ^ t[0][(x >> 56) as usize];
        }
        rest = chunks.remainder();
    }

    for &byte in rest {
        crc = t[0][((crc ^ byte as u64) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}

/// Compute CRC-32 of `data`, continuing from `seed`.
///
/// ```
/// use oxixz_core::crc::crc32;
///
/// assert_eq!(crc32(b"123456789", 0), 0xCBF43926);
/// assert_eq!(crc32(b"6789", crc32(b"12345", 0)), 0xCBF43926);
/// ```
#[inline]
pub fn crc32(data: &[u8], seed: u32) -> u32 {
    !crc32_raw(!seed, data)
}

/// Compute CRC-64/ECMA-182 of `data`, continuing from `seed`.
///
/// ```
/// use oxixz_core::crc::crc64;
///
/// assert_eq!(crc64(b"123456789", 0), 0x995DC9BBDF1939FA);
/// ```
#[inline]
pub fn crc64(data: &[u8], seed: u64) -> u64 {
    !crc64_raw(!seed, data)
}

/// Incremental CRC-32 accumulator.
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value / final XOR: 0xFFFFFFFF
///
/// # Example
///
/// ```
/// use oxixz_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ").update(b"World!");
/// assert_eq!(crc.value(), 0xEC4AC3D0);
/// assert_eq!(crc.hexdigest(), "ec4ac3d0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crc32 {
    state: u32,
    seed: u32,
}

impl Crc32 {
    /// Create an accumulator starting from zero.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create an accumulator that continues from a previous CRC value.
    pub fn with_seed(seed: u32) -> Self {
        Self { state: seed, seed }
    }

    /// Fold more data into the checksum.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.state = crc32(data, self.state);
        self
    }

    /// Current checksum value.
    pub fn value(&self) -> u32 {
        self.state
    }

    /// Seed the accumulator was created with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Current checksum as big-endian bytes.
    pub fn digest(&self) -> [u8; 4] {
        self.state.to_be_bytes()
    }

    /// Current checksum as lowercase hex.
    pub fn hexdigest(&self) -> String {
        format!("{:08x}", self.state)
    }

    /// Restore the accumulator to its seed.
    pub fn reset(&mut self) -> &mut Self {
        self.state = self.seed;
        self
    }

    /// Compute CRC-32 for a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        crc32(data, 0)
    }
}

impl fmt::Display for Crc32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.state)
    }
}

/// Incremental CRC-64/ECMA-182 accumulator (the XZ check).
///
/// - Polynomial: 0x42F0E1EBA9EA3693 (reflected: 0xC96C5795D7870F42)
/// - Initial value / final XOR: 0xFFFFFFFFFFFFFFFF
///
/// # Example
///
/// ```
/// use oxixz_core::crc::Crc64;
///
/// let mut crc = Crc64::new();
/// crc.update(b"12345").update(b"6789");
/// assert_eq!(crc.value(), 0x995DC9BBDF1939FA);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crc64 {
    state: u64,
    seed: u64,
}

impl Crc64 {
    /// Create an accumulator starting from zero.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create an accumulator that continues from a previous CRC value.
    pub fn with_seed(seed: u64) -> Self {
        Self { state: seed, seed }
    }

    /// Fold more data into the checksum.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.state = crc64(data, self.state);
        self
    }

    /// Current checksum value.
    pub fn value(&self) -> u64 {
        self.state
    }

    /// Seed the accumulator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current checksum as big-endian bytes.
    pub fn digest(&self) -> [u8; 8] {
        self.state.to_be_bytes()
    }

    /// Current checksum as lowercase hex.
    pub fn hexdigest(&self) -> String {
        format!("{:016x}", self.state)
    }

    /// Restore the accumulator to its seed.
    pub fn reset(&mut self) -> &mut Self {
        self.state = self.seed;
        self
    }

    /// Compute CRC-64 for a slice in one call.
    pub fn compute(data: &[u8]) -> u64 {
        crc64(data, 0)
    }
}

impl fmt::Display for Crc64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.state)
    }
}
