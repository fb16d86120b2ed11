//! LZMA1/LZMA2 filter options.
//!
//! An [`LzmaOptions`] value starts from a compression preset (0-9, optionally
//! *extreme*) which expands to the full parameter set, then individual fields
//! may be overridden with the `with_*` builder methods.
//!
//! ```
//! use oxixz_lzma::{LzmaOptions, Mode};
//!
//! let opts = LzmaOptions::new(6)?
//!     .with_dict_size(1 << 20)
//!     .with_mode(Mode::Fast);
//! assert_eq!(opts.dict_size(), 1 << 20);
//! assert_eq!(opts.literal_context_bits(), 3);
//! # Ok::<(), oxixz_core::OxiXzError>(())
//! ```

use oxixz_core::error::{OxiXzError, Result};
use std::fmt;

/// Default compression preset.
pub const PRESET_DEFAULT: u32 = 6;
/// Mask selecting the level bits of a preset value.
pub const PRESET_LEVEL_MASK: u32 = 0x1F;
/// Flag requesting the slower "extreme" variant of a preset.
pub const PRESET_EXTREME: u32 = 0x8000_0000;

/// Smallest dictionary accepted by the encoder.
pub const DICT_SIZE_MIN: u32 = 4096;
/// Largest dictionary accepted by the encoder (1.5 GiB).
pub const DICT_SIZE_MAX: u32 = (1 << 30) + (1 << 29);
/// Maximum of `lc`, `lp`, and (for LZMA2) `lc + lp`.
pub const LCLP_MAX: u32 = 4;
/// Maximum of `pb`.
pub const PB_MAX: u32 = 4;
/// Smallest `nice_len`.
pub const NICE_LEN_MIN: u32 = 2;
/// Largest `nice_len`.
pub const NICE_LEN_MAX: u32 = 273;

/// Dictionary size exponents per preset level.
const DICT_POW2: [u8; 10] = [18, 20, 21, 22, 22, 23, 23, 24, 25, 26];
/// Match finder search depth for the fast presets 0-3.
const FAST_DEPTHS: [u32; 4] = [4, 8, 24, 48];

/// Encoder mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fast mode: hash chain match finders, cheap parsing.
    Fast,
    /// Normal mode: binary tree match finders, optimal parsing.
    Normal,
}

/// Match finder used by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFinder {
    /// Hash chain, 2- and 3-byte hashing.
    HashChain3,
    /// Hash chain, 2-, 3- and 4-byte hashing.
    HashChain4,
    /// Binary tree, 2-byte hashing.
    BinaryTree2,
    /// Binary tree, 2- and 3-byte hashing.
    BinaryTree3,
    /// Binary tree, 2-, 3- and 4-byte hashing.
    BinaryTree4,
}

impl MatchFinder {
    /// Minimum `nice_len` this match finder can work with.
    pub fn min_nice_len(self) -> u32 {
        match self {
            Self::BinaryTree2 => 2,
            Self::HashChain3 | Self::BinaryTree3 => 3,
            Self::HashChain4 | Self::BinaryTree4 => 4,
        }
    }
}

/// Options for an LZMA1 or LZMA2 filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LzmaOptions {
    preset: u32,
    extreme: bool,
    dict_size: u32,
    lc: u32,
    lp: u32,
    pb: u32,
    mode: Mode,
    nice_len: u32,
    match_finder: MatchFinder,
    depth: u32,
}

impl LzmaOptions {
    /// Expand preset `level` (0-9) to a full parameter set.
    pub fn new(level: u32) -> Result<Self> {
        Self::expand(level, false)
    }

    /// Expand the extreme variant of preset `level` (0-9).
    pub fn extreme(level: u32) -> Result<Self> {
        Self::expand(level, true)
    }

    /// Expand a liblzma-style preset value (level, optionally OR'd with
    /// [`PRESET_EXTREME`]).
    pub fn from_preset(preset: u32) -> Result<Self> {
        let unknown = preset & !PRESET_LEVEL_MASK & !PRESET_EXTREME;
        if unknown != 0 {
            return Err(OxiXzError::config(format!(
                "unknown preset flag bits {:#010x}",
                unknown
            )));
        }
        Self::expand(preset & PRESET_LEVEL_MASK, preset & PRESET_EXTREME != 0)
    }

    fn expand(level: u32, extreme: bool) -> Result<Self> {
        if level > 9 {
            return Err(OxiXzError::config(format!(
                "preset level {} out of range 0..=9",
                level
            )));
        }

        let mut opts = Self {
            preset: level,
            extreme,
            dict_size: 1 << DICT_POW2[level as usize],
            lc: 3,
            lp: 0,
            pb: 2,
            mode: Mode::Normal,
            nice_len: 64,
            match_finder: MatchFinder::BinaryTree4,
            depth: 0,
        };

        if level <= 3 {
            opts.mode = Mode::Fast;
            opts.match_finder = if level == 0 {
                MatchFinder::HashChain3
            } else {
                MatchFinder::HashChain4
            };
            opts.nice_len = if level <= 1 { 128 } else { 273 };
            opts.depth = FAST_DEPTHS[level as usize];
        } else {
            opts.nice_len = match level {
                4 => 16,
                5 => 32,
                _ => 64,
            };
        }

        if extreme {
            opts.mode = Mode::Normal;
            opts.match_finder = MatchFinder::BinaryTree4;
            if level == 3 || level == 5 {
                opts.nice_len = 192;
                opts.depth = 0;
            } else {
                opts.nice_len = 273;
                opts.depth = 512;
            }
        }

        Ok(opts)
    }

    /// Override the dictionary size in bytes.
    pub fn with_dict_size(mut self, dict_size: u32) -> Self {
        self.dict_size = dict_size;
        self
    }

    /// Override the number of literal context bits (`lc`).
    pub fn with_literal_context_bits(mut self, lc: u32) -> Self {
        self.lc = lc;
        self
    }

    /// Override the number of literal position bits (`lp`).
    pub fn with_literal_position_bits(mut self, lp: u32) -> Self {
        self.lp = lp;
        self
    }

    /// Override the number of position bits (`pb`).
    pub fn with_position_bits(mut self, pb: u32) -> Self {
        self.pb = pb;
        self
    }

    /// Override the encoder mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the "nice" match length.
    pub fn with_nice_len(mut self, nice_len: u32) -> Self {
        self.nice_len = nice_len;
        self
    }

    /// Override the match finder.
    pub fn with_match_finder(mut self, match_finder: MatchFinder) -> Self {
        self.match_finder = match_finder;
        self
    }

    /// Override the match finder search depth (0 = automatic).
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Preset level the defaults were expanded from.
    pub fn preset(&self) -> u32 {
        self.preset
    }

    /// Whether the extreme variant of the preset was used.
    pub fn is_extreme(&self) -> bool {
        self.extreme
    }

    /// liblzma preset value (level plus flags).
    pub fn preset_flags(&self) -> u32 {
        if self.extreme {
            self.preset | PRESET_EXTREME
        } else {
            self.preset
        }
    }

    /// Dictionary size in bytes.
    pub fn dict_size(&self) -> u32 {
        self.dict_size
    }

    /// Literal context bits.
    pub fn literal_context_bits(&self) -> u32 {
        self.lc
    }

    /// Literal position bits.
    pub fn literal_position_bits(&self) -> u32 {
        self.lp
    }

    /// Position bits.
    pub fn position_bits(&self) -> u32 {
        self.pb
    }

    /// Encoder mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Nice match length.
    pub fn nice_len(&self) -> u32 {
        self.nice_len
    }

    /// Match finder.
    pub fn match_finder(&self) -> MatchFinder {
        self.match_finder
    }

    /// Match finder search depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Check every field against the encoder's accepted ranges.
    ///
    /// LZMA2 additionally limits `lc + lp` to [`LCLP_MAX`].
    pub fn validate(&self, lzma2: bool) -> Result<()> {
        if !(DICT_SIZE_MIN..=DICT_SIZE_MAX).contains(&self.dict_size) {
            return Err(OxiXzError::config(format!(
                "dictionary size {} out of range {}..={}",
                self.dict_size, DICT_SIZE_MIN, DICT_SIZE_MAX
            )));
        }
        if self.lc > LCLP_MAX {
            return Err(OxiXzError::config(format!("lc {} exceeds {}", self.lc, LCLP_MAX)));
        }
        if self.lp > LCLP_MAX {
            return Err(OxiXzError::config(format!("lp {} exceeds {}", self.lp, LCLP_MAX)));
        }
        if lzma2 && self.lc + self.lp > LCLP_MAX {
            return Err(OxiXzError::config(format!(
                "lc + lp = {} exceeds {} for LZMA2",
                self.lc + self.lp,
                LCLP_MAX
            )));
        }
        if self.pb > PB_MAX {
            return Err(OxiXzError::config(format!("pb {} exceeds {}", self.pb, PB_MAX)));
        }
        let min_nice = self.match_finder.min_nice_len().max(NICE_LEN_MIN);
        if !(min_nice..=NICE_LEN_MAX).contains(&self.nice_len) {
            return Err(OxiXzError::config(format!(
                "nice_len {} out of range {}..={} for {:?}",
                self.nice_len, min_nice, NICE_LEN_MAX, self.match_finder
            )));
        }
        Ok(())
    }
}

impl Default for LzmaOptions {
    fn default() -> Self {
        // Level 6 is always in range.
        match Self::new(PRESET_DEFAULT) {
            Ok(opts) => opts,
            Err(_) => unreachable!("default preset is valid"),
        }
    }
}

impl fmt::Display for LzmaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "preset={}{} dict={} lc={} lp={} pb={} mode={:?} nice={} mf={:?} depth={}",
            self.preset,
            if self.extreme { "e" } else { "" },
            self.dict_size,
            self.lc,
            self.lp,
            self.pb,
            self.mode,
            self.nice_len,
            self.match_finder,
            self.depth
        )
    }
}
