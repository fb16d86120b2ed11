//! Filter chain descriptors.
//!
//! A chain lists up to [`MAX_FILTERS`] filters applied in order on encode.
//! Non-final entries are preprocessing filters (delta); the final entry is
//! the LZMA1 or LZMA2 compression filter.

use crate::options::LzmaOptions;
use oxixz_core::error::{OxiXzError, Result};
use std::fmt;

/// Maximum number of filters in a chain.
pub const MAX_FILTERS: usize = 4;
/// Smallest delta distance.
pub const DELTA_DIST_MIN: u32 = 1;
/// Largest delta distance.
pub const DELTA_DIST_MAX: u32 = 256;

/// A single filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Byte-wise delta filter with the given distance.
    Delta {
        /// Distance in bytes (1-256).
        distance: u32,
    },
    /// LZMA1 compression, as used by `.lzma` files and raw LZMA1 streams.
    Lzma1(LzmaOptions),
    /// LZMA2 compression, as used inside `.xz` blocks.
    Lzma2(LzmaOptions),
}

impl Filter {
    /// Delta filter; `distance` must be in `1..=256`.
    pub fn delta(distance: u32) -> Result<Self> {
        if !(DELTA_DIST_MIN..=DELTA_DIST_MAX).contains(&distance) {
            return Err(OxiXzError::config(format!(
                "delta distance {} out of range {}..={}",
                distance, DELTA_DIST_MIN, DELTA_DIST_MAX
            )));
        }
        Ok(Self::Delta { distance })
    }

    /// LZMA1 filter after validating `options`.
    pub fn lzma1(options: LzmaOptions) -> Result<Self> {
        options.validate(false)?;
        Ok(Self::Lzma1(options))
    }

    /// LZMA2 filter after validating `options`.
    pub fn lzma2(options: LzmaOptions) -> Result<Self> {
        options.validate(true)?;
        Ok(Self::Lzma2(options))
    }

    /// Whether this is a compression filter.
    pub fn is_compression(&self) -> bool {
        matches!(self, Self::Lzma1(_) | Self::Lzma2(_))
    }

    /// Options of a compression filter.
    pub fn lzma_options(&self) -> Option<&LzmaOptions> {
        match self {
            Self::Lzma1(opts) | Self::Lzma2(opts) => Some(opts),
            Self::Delta { .. } => None,
        }
    }

    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Delta { .. } => "delta",
            Self::Lzma1(_) => "lzma1",
            Self::Lzma2(_) => "lzma2",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delta { distance } => write!(f, "delta(dist={})", distance),
            Self::Lzma1(opts) => write!(f, "lzma1({})", opts),
            Self::Lzma2(opts) => write!(f, "lzma2({})", opts),
        }
    }
}

/// Ordered, validated filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    /// Build a chain.
    ///
    /// The chain must hold 1 to [`MAX_FILTERS`] entries, end in a
    /// compression filter, and contain no other compression filter.
    pub fn new(filters: Vec<Filter>) -> Result<Self> {
        if filters.is_empty() {
            return Err(OxiXzError::config("filter chain is empty"));
        }
        if filters.len() > MAX_FILTERS {
            return Err(OxiXzError::config(format!(
                "filter chain has {} entries, at most {} allowed",
                filters.len(),
                MAX_FILTERS
            )));
        }

        let last = filters.len() - 1;
        for (i, filter) in filters.iter().enumerate() {
            match (i == last, filter.is_compression()) {
                (true, false) => {
                    return Err(OxiXzError::config(format!(
                        "filter chain must end in lzma1 or lzma2, found {}",
                        filter.name()
                    )));
                }
                (false, true) => {
                    return Err(OxiXzError::config(format!(
                        "{} may only appear as the last filter (found at position {})",
                        filter.name(),
                        i
                    )));
                }
                _ => {}
            }
        }

        Ok(Self { filters })
    }

    /// Single LZMA2 filter expanded from `preset`.
    pub fn preset(preset: u32) -> Result<Self> {
        Self::new(vec![Filter::lzma2(LzmaOptions::new(preset)?)?])
    }

    /// Filters in application order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Always false; a valid chain has at least one filter.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// The final compression filter.
    pub fn compression(&self) -> &Filter {
        // Non-empty by construction.
        &self.filters[self.filters.len() - 1]
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", filter)?;
        }
        Ok(())
    }
}
