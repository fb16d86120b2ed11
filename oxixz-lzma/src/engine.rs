//! liblzma codec engine.
//!
//! [`LzmaStream`] owns one liblzma stream (through the `liblzma` crate) and
//! implements [`CodecEngine`]. The whole filter chain, delta stages included,
//! is handed to liblzma.

use crate::filter::{Filter, FilterChain};
use crate::format::Check;
use crate::options::{LzmaOptions, MatchFinder, Mode};
use liblzma::stream;
use oxixz_core::error::{CodecErrorKind, OxiXzError, Result};
use oxixz_core::traits::{Action, CodecEngine, Progress, Status};
use std::fmt;

/// What a [`LzmaStream`] was configured to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// `.xz` encoder.
    XzEncoder,
    /// `.lzma` encoder.
    LzmaAloneEncoder,
    /// Raw filter chain encoder.
    RawEncoder,
    /// `.xz` decoder.
    XzDecoder,
    /// `.lzma` decoder.
    LzmaAloneDecoder,
    /// Raw filter chain decoder.
    RawDecoder,
    /// Decoder accepting `.xz` or `.lzma`.
    AutoDecoder,
}

impl StreamKind {
    /// Whether the stream compresses.
    pub fn is_encoder(self) -> bool {
        matches!(
            self,
            Self::XzEncoder | Self::LzmaAloneEncoder | Self::RawEncoder
        )
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::XzEncoder => "xz encoder",
            Self::LzmaAloneEncoder => "lzma encoder",
            Self::RawEncoder => "raw encoder",
            Self::XzDecoder => "xz decoder",
            Self::LzmaAloneDecoder => "lzma decoder",
            Self::RawDecoder => "raw decoder",
            Self::AutoDecoder => "auto decoder",
        })
    }
}

/// One liblzma stream.
pub struct LzmaStream {
    inner: stream::Stream,
    kind: StreamKind,
    total_in: u64,
    total_out: u64,
}

impl LzmaStream {
    fn from_stream(inner: stream::Stream, kind: StreamKind) -> Self {
        log::debug!("initialized liblzma {}", kind);
        Self {
            inner,
            kind,
            total_in: 0,
            total_out: 0,
        }
    }

    /// `.xz` encoder for `chain`, storing `check` per block.
    ///
    /// The `.xz` container requires the chain to end in LZMA2.
    pub fn xz_encoder(chain: &FilterChain, check: Check) -> Result<Self> {
        if !matches!(chain.compression(), Filter::Lzma2(_)) {
            return Err(OxiXzError::config(format!(
                "xz streams must end in lzma2, got [{}]",
                chain
            )));
        }
        let filters = to_xz_filters(chain)?;
        let inner = stream::Stream::new_stream_encoder(&filters, to_xz_check(check))
            .map_err(map_error)?;
        Ok(Self::from_stream(inner, StreamKind::XzEncoder))
    }

    /// `.lzma` encoder.
    pub fn lzma_alone_encoder(options: &LzmaOptions) -> Result<Self> {
        options.validate(false)?;
        let inner =
            stream::Stream::new_lzma_encoder(&to_xz_options(options)?).map_err(map_error)?;
        Ok(Self::from_stream(inner, StreamKind::LzmaAloneEncoder))
    }

    /// Raw encoder for `chain`; the output has no container.
    pub fn raw_encoder(chain: &FilterChain) -> Result<Self> {
        let filters = to_xz_filters(chain)?;
        let inner = stream::Stream::new_raw_encoder(&filters).map_err(map_error)?;
        Ok(Self::from_stream(inner, StreamKind::RawEncoder))
    }

    /// `.xz` decoder.
    pub fn xz_decoder(memlimit: u64, flags: u32) -> Result<Self> {
        let inner = stream::Stream::new_stream_decoder(memlimit, flags).map_err(map_error)?;
        Ok(Self::from_stream(inner, StreamKind::XzDecoder))
    }

    /// `.lzma` decoder.
    pub fn lzma_alone_decoder(memlimit: u64) -> Result<Self> {
        let inner = stream::Stream::new_lzma_decoder(memlimit).map_err(map_error)?;
        Ok(Self::from_stream(inner, StreamKind::LzmaAloneDecoder))
    }

    /// Raw decoder; `chain` must match the one used to encode.
    pub fn raw_decoder(chain: &FilterChain) -> Result<Self> {
        let filters = to_xz_filters(chain)?;
        let inner = stream::Stream::new_raw_decoder(&filters).map_err(map_error)?;
        Ok(Self::from_stream(inner, StreamKind::RawDecoder))
    }

    /// Decoder that detects `.xz` or `.lzma` from the first bytes.
    pub fn auto_decoder(memlimit: u64, flags: u32) -> Result<Self> {
        let inner = stream::Stream::new_auto_decoder(memlimit, flags).map_err(map_error)?;
        Ok(Self::from_stream(inner, StreamKind::AutoDecoder))
    }

    /// What this stream was configured to do.
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Current decoder memory limit.
    pub fn memlimit(&self) -> u64 {
        self.inner.memlimit()
    }

    /// Change the decoder memory limit.
    pub fn set_memlimit(&mut self, memlimit: u64) -> Result<()> {
        self.inner.set_memlimit(memlimit).map_err(map_error)
    }

    fn map_failure(&self, err: stream::Error) -> OxiXzError {
        let err = map_error(err);
        if self.kind == StreamKind::AutoDecoder
            && err.codec_kind() == Some(CodecErrorKind::Format)
        {
            return OxiXzError::UnsupportedFormat;
        }
        err
    }
}

impl CodecEngine for LzmaStream {
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<Progress> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let status = match self.inner.process(input, output, to_xz_action(action)) {
            Ok(status) => map_status(status)?,
            // Raised only when the caller asked for them; decoding can go on.
            Err(stream::Error::NoCheck) => {
                log::warn!("{}: stream has no integrity check", self.kind);
                Status::Ok
            }
            Err(stream::Error::UnsupportedCheck) => {
                log::warn!("{}: integrity check cannot be verified", self.kind);
                Status::Ok
            }
            Err(e) => return Err(self.map_failure(e)),
        };
        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;

        self.total_in += consumed as u64;
        self.total_out += produced as u64;
        Ok(Progress::new(consumed, produced, status))
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}

impl fmt::Debug for LzmaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LzmaStream")
            .field("kind", &self.kind)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish_non_exhaustive()
    }
}

/// Fails a drive loop after two consecutive calls without progress.
#[derive(Debug, Default)]
pub(crate) struct StallGuard {
    misses: u8,
}

impl StallGuard {
    pub(crate) fn observe(&mut self, progress: &Progress) -> Result<()> {
        if progress.made_progress() || progress.is_stream_end() {
            self.misses = 0;
            return Ok(());
        }
        self.misses += 1;
        if self.misses >= 2 {
            return Err(OxiXzError::codec(CodecErrorKind::Buffer));
        }
        Ok(())
    }
}

/// liblzma filter list for `chain`, in chain order.
fn to_xz_filters(chain: &FilterChain) -> Result<stream::Filters> {
    let mut filters = stream::Filters::new();
    for filter in chain.filters() {
        match filter {
            Filter::Delta { distance } => {
                // Delta properties byte is the distance minus one.
                let props = [(distance - 1) as u8];
                filters.delta_properties(&props).map_err(map_error)?;
            }
            Filter::Lzma1(opts) => {
                filters.lzma1(&to_xz_options(opts)?);
            }
            Filter::Lzma2(opts) => {
                filters.lzma2(&to_xz_options(opts)?);
            }
        }
    }
    Ok(filters)
}

fn to_xz_options(opts: &LzmaOptions) -> Result<stream::LzmaOptions> {
    let mut out = stream::LzmaOptions::new_preset(opts.preset_flags()).map_err(map_error)?;
    out.dict_size(opts.dict_size())
        .literal_context_bits(opts.literal_context_bits())
        .literal_position_bits(opts.literal_position_bits())
        .position_bits(opts.position_bits())
        .mode(match opts.mode() {
            Mode::Fast => stream::Mode::Fast,
            Mode::Normal => stream::Mode::Normal,
        })
        .nice_len(opts.nice_len())
        .match_finder(match opts.match_finder() {
            MatchFinder::HashChain3 => stream::MatchFinder::HashChain3,
            MatchFinder::HashChain4 => stream::MatchFinder::HashChain4,
            MatchFinder::BinaryTree2 => stream::MatchFinder::BinaryTree2,
            MatchFinder::BinaryTree3 => stream::MatchFinder::BinaryTree3,
            MatchFinder::BinaryTree4 => stream::MatchFinder::BinaryTree4,
        })
        .depth(opts.depth());
    Ok(out)
}

fn to_xz_check(check: Check) -> stream::Check {
    match check {
        Check::None => stream::Check::None,
        Check::Crc32 => stream::Check::Crc32,
        Check::Crc64 => stream::Check::Crc64,
        Check::Sha256 => stream::Check::Sha256,
    }
}

fn to_xz_action(action: Action) -> stream::Action {
    match action {
        Action::Run => stream::Action::Run,
        Action::Finish => stream::Action::Finish,
    }
}

fn map_status(status: stream::Status) -> Result<Status> {
    match status {
        stream::Status::Ok | stream::Status::GetCheck => Ok(Status::Ok),
        stream::Status::StreamEnd => Ok(Status::StreamEnd),
        // LZMA_BUF_ERROR (no progress possible) arrives as MemNeeded.
        stream::Status::MemNeeded => Err(OxiXzError::codec(CodecErrorKind::Buffer)),
    }
}

fn map_error(err: stream::Error) -> OxiXzError {
    let kind = match err {
        stream::Error::Data => CodecErrorKind::Data,
        stream::Error::Options => CodecErrorKind::Options,
        stream::Error::Format => CodecErrorKind::Format,
        stream::Error::MemLimit => CodecErrorKind::MemLimit,
        stream::Error::Mem => CodecErrorKind::Mem,
        stream::Error::NoCheck => CodecErrorKind::NoCheck,
        stream::Error::UnsupportedCheck => CodecErrorKind::UnsupportedCheck,
        stream::Error::Program => CodecErrorKind::Program,
    };
    OxiXzError::codec(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(engine: &mut LzmaStream, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; 1024];
        let mut pos = 0;
        while pos < input.len() {
            let p = engine.code(&input[pos..], &mut buf, Action::Run).unwrap();
            pos += p.consumed;
            out.extend_from_slice(&buf[..p.produced]);
            if p.is_stream_end() {
                return out;
            }
        }
        loop {
            let p = engine.code(&[], &mut buf, Action::Finish).unwrap();
            out.extend_from_slice(&buf[..p.produced]);
            if p.is_stream_end() {
                return out;
            }
        }
    }

    #[test]
    fn test_xz_delta_chain_round_trip() {
        let chain = FilterChain::new(vec![
            Filter::delta(2).unwrap(),
            Filter::lzma2(LzmaOptions::new(6).unwrap()).unwrap(),
        ])
        .unwrap();
        let input: Vec<u8> = (0..4000u16).flat_map(|i| i.to_le_bytes()).collect();

        let compressed = run(&mut LzmaStream::xz_encoder(&chain, Check::Crc64).unwrap(), &input);
        assert_eq!(&compressed[..6], &crate::format::XZ_MAGIC);
        let restored = run(&mut LzmaStream::xz_decoder(u64::MAX, 0).unwrap(), &compressed);
        assert_eq!(restored, input);
    }

    #[test]
    fn test_xz_rejects_lzma1() {
        let lzma1 =
            FilterChain::new(vec![Filter::lzma1(LzmaOptions::new(1).unwrap()).unwrap()]).unwrap();
        assert!(LzmaStream::xz_encoder(&lzma1, Check::Crc64).is_err());
    }

    #[test]
    fn test_xz_engine_counters() {
        let chain = FilterChain::preset(1).unwrap();
        let mut engine = LzmaStream::xz_encoder(&chain, Check::Crc32).unwrap();
        assert_eq!(engine.kind(), StreamKind::XzEncoder);

        let compressed = run(&mut engine, b"counter test counter test");
        assert_eq!(engine.total_in(), 25);
        assert_eq!(engine.total_out(), compressed.len() as u64);
        assert_eq!(&compressed[..6], &crate::format::XZ_MAGIC);
    }

    #[test]
    fn test_raw_delta_round_trip() {
        let chain = FilterChain::new(vec![
            Filter::delta(4).unwrap(),
            Filter::lzma2(LzmaOptions::new(2).unwrap()).unwrap(),
        ])
        .unwrap();
        let input: Vec<u8> = (0..5000u32).flat_map(|i| i.to_le_bytes()).collect();

        let compressed = run(&mut LzmaStream::raw_encoder(&chain).unwrap(), &input);
        let restored = run(&mut LzmaStream::raw_decoder(&chain).unwrap(), &compressed);
        assert_eq!(restored, input);
    }

    #[test]
    fn test_auto_decoder_rejects_garbage() {
        let mut engine = LzmaStream::auto_decoder(u64::MAX, 0).unwrap();
        let mut out = [0u8; 64];
        let err = engine
            .code(&[0xFF; 32], &mut out, Action::Run)
            .unwrap_err();
        assert!(matches!(err, OxiXzError::UnsupportedFormat));
    }

    #[test]
    fn test_xz_decoder_reports_format_error() {
        let mut engine = LzmaStream::xz_decoder(u64::MAX, 0).unwrap();
        let mut out = [0u8; 64];
        let err = engine
            .code(b"definitely not compressed data", &mut out, Action::Run)
            .unwrap_err();
        assert_eq!(err.codec_kind(), Some(CodecErrorKind::Format));
    }

    #[test]
    fn test_lzma_alone_engine() {
        let opts = LzmaOptions::new(0).unwrap();
        let mut engine = LzmaStream::lzma_alone_encoder(&opts).unwrap();
        let compressed = run(&mut engine, b"alone alone alone");
        assert_eq!(
            crate::format::ContainerFormat::from_magic(&compressed),
            crate::format::ContainerFormat::LzmaAlone
        );

        let mut decoder = LzmaStream::lzma_alone_decoder(u64::MAX).unwrap();
        assert_eq!(run(&mut decoder, &compressed), b"alone alone alone");
    }
}
