//! One-shot helpers over in-memory slices.
//!
//! Each helper builds a stream, runs it to completion and returns the whole
//! output.

use crate::decoder::{AutoDecoder, Decoder, DecoderLimits};
use crate::encoder::Encoder;
use crate::filter::FilterChain;
use crate::format::{Check, stream_buffer_bound};
use crate::options::LzmaOptions;
use oxixz_core::error::Result;

fn output_for(len: usize) -> Vec<u8> {
    Vec::with_capacity(stream_buffer_bound(len).unwrap_or(len))
}

/// Compress `data` into an `.xz` stream at `preset` with a CRC-64 check.
pub fn encode(data: &[u8], preset: u32) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(output_for(data.len()), preset)?;
    encoder.write(data)?;
    encoder.into_inner()
}

/// Compress `data` into an `.xz` stream with an explicit chain and check.
pub fn encode_with(data: &[u8], chain: &FilterChain, check: Check) -> Result<Vec<u8>> {
    let mut encoder = Encoder::xz(output_for(data.len()), chain, check)?;
    encoder.write(data)?;
    encoder.into_inner()
}

/// Compress `data` into a raw stream.
pub fn encode_raw(data: &[u8], chain: &FilterChain) -> Result<Vec<u8>> {
    let mut encoder = Encoder::raw(output_for(data.len()), chain)?;
    encoder.write(data)?;
    encoder.into_inner()
}

/// Compress `data` into a legacy `.lzma` stream.
pub fn encode_lzma_alone(data: &[u8], options: &LzmaOptions) -> Result<Vec<u8>> {
    let mut encoder = Encoder::lzma_alone(output_for(data.len()), options)?;
    encoder.write(data)?;
    encoder.into_inner()
}

/// Decompress an `.xz` or `.lzma` stream.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    AutoDecoder::new(data, DecoderLimits::default())?.read_all()
}

/// Decompress an `.xz` stream.
pub fn decode_xz(data: &[u8], limits: DecoderLimits) -> Result<Vec<u8>> {
    Decoder::xz(data, limits)?.read_all()
}

/// Decompress a raw stream encoded with `chain`.
pub fn decode_raw(data: &[u8], chain: &FilterChain) -> Result<Vec<u8>> {
    Decoder::raw(data, chain)?.read_all()
}

/// Decompress a legacy `.lzma` stream.
pub fn decode_lzma_alone(data: &[u8], memlimit: u64) -> Result<Vec<u8>> {
    Decoder::lzma_alone(data, memlimit)?.read_all()
}
