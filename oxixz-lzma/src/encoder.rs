//! Push-style streaming encoder.
//!
//! An [`Encoder`] owns a codec engine and a sink. Every `write` runs the
//! engine until the whole input slice is consumed and appends whatever it
//! produced to the sink. `finish` drains the engine and writes the stream
//! trailer; a stream that was never finished is not valid.

use crate::BLOCK_SIZE;
use crate::engine::{LzmaStream, StallGuard};
use crate::filter::FilterChain;
use crate::format::Check;
use crate::options::LzmaOptions;
use oxixz_core::error::{OxiXzError, Result};
use oxixz_core::traits::{Action, CodecEngine, Progress, StreamState};
use std::fmt;
use std::io::{self, Write};

/// Streaming compressor writing to `W`.
///
/// # Example
///
/// ```rust
/// use oxixz_lzma::{Check, Encoder, FilterChain};
///
/// let chain = FilterChain::preset(1)?;
/// let mut encoder = Encoder::xz(Vec::new(), &chain, Check::Crc32)?;
/// encoder.write(b"streamed in pieces, ")?;
/// encoder.write(b"compressed as one stream")?;
/// encoder.finish()?;
/// assert!(encoder.is_finished());
/// assert_eq!(encoder.total_in(), 44);
/// # Ok::<(), oxixz_core::OxiXzError>(())
/// ```
pub struct Encoder<W: Write, E: CodecEngine = LzmaStream> {
    /// Taken only by `into_inner`.
    sink: Option<W>,
    engine: Option<E>,
    buf: Vec<u8>,
    state: StreamState,
    total_in: u64,
    total_out: u64,
}

// ============================================================================
// liblzma constructors
// ============================================================================

impl<W: Write> Encoder<W> {
    /// `.xz` encoder with a single LZMA2 filter at `preset` (0-9) and a
    /// CRC-64 check.
    pub fn new(sink: W, preset: u32) -> Result<Self> {
        Self::xz(sink, &FilterChain::preset(preset)?, Check::Crc64)
    }

    /// `.xz` encoder for `chain` with the given integrity check.
    pub fn xz(sink: W, chain: &FilterChain, check: Check) -> Result<Self> {
        Ok(Self::with_engine(sink, LzmaStream::xz_encoder(chain, check)?))
    }

    /// Raw encoder; the output carries no container or check.
    pub fn raw(sink: W, chain: &FilterChain) -> Result<Self> {
        Ok(Self::with_engine(sink, LzmaStream::raw_encoder(chain)?))
    }

    /// Legacy `.lzma` encoder.
    pub fn lzma_alone(sink: W, options: &LzmaOptions) -> Result<Self> {
        Ok(Self::with_engine(sink, LzmaStream::lzma_alone_encoder(options)?))
    }
}

// ============================================================================
// Stream operations
// ============================================================================

impl<W: Write, E: CodecEngine> Encoder<W, E> {
    /// Encoder driving an arbitrary engine.
    pub fn with_engine(sink: W, engine: E) -> Self {
        Self {
            sink: Some(sink),
            engine: Some(engine),
            buf: vec![0u8; BLOCK_SIZE],
            state: StreamState::Open,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Compress `data`, appending any output to the sink.
    ///
    /// Returns the number of bytes consumed, which is always `data.len()`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.encode_all(data)
    }

    /// End the stream: flush the engine, write the trailer and flush the
    /// sink.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_open("finish")?;

        let mut guard = StallGuard::default();
        loop {
            let progress = self.step(&[], Action::Finish)?;
            if progress.is_stream_end() {
                break;
            }
            guard.observe(&progress)?;
        }

        self.state = StreamState::Finished;
        self.sink_mut().flush()?;
        log::debug!(
            "encoder finished: {} bytes in, {} bytes out",
            self.total_in,
            self.total_out
        );
        Ok(())
    }

    /// Finish the stream if still open, then release the engine.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            StreamState::Closed => return Err(OxiXzError::invalid_state("close", self.state)),
            StreamState::Open => self.finish()?,
            StreamState::Finished => {}
        }
        self.engine = None;
        self.state = StreamState::Closed;
        Ok(())
    }

    /// Finish the stream if still open and return the sink.
    pub fn into_inner(mut self) -> Result<W> {
        if self.state.is_open() {
            self.finish()?;
        }
        self.engine = None;
        self.state = StreamState::Closed;
        match self.sink.take() {
            Some(sink) => Ok(sink),
            None => unreachable!("sink is only taken by into_inner"),
        }
    }

    /// Reference to the sink.
    pub fn get_ref(&self) -> &W {
        match &self.sink {
            Some(sink) => sink,
            None => unreachable!("sink is only taken by into_inner"),
        }
    }

    /// Mutable reference to the sink.
    ///
    /// Writing to the sink directly while the stream is open corrupts it.
    pub fn get_mut(&mut self) -> &mut W {
        self.sink_mut()
    }

    /// Uncompressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Compressed bytes written to the sink so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Whether `finish` has completed.
    pub fn is_finished(&self) -> bool {
        !self.state.is_open()
    }

    fn sink_mut(&mut self) -> &mut W {
        match &mut self.sink {
            Some(sink) => sink,
            None => unreachable!("sink is only taken by into_inner"),
        }
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(OxiXzError::invalid_state(operation, self.state))
        }
    }

    fn encode_all(&mut self, data: &[u8]) -> Result<usize> {
        self.ensure_open("write")?;

        let mut pos = 0;
        let mut guard = StallGuard::default();
        while pos < data.len() {
            let progress = self.step(&data[pos..], Action::Run)?;
            pos += progress.consumed;
            guard.observe(&progress)?;
        }
        Ok(data.len())
    }

    /// One engine call; produced bytes go straight to the sink.
    fn step(&mut self, input: &[u8], action: Action) -> Result<Progress> {
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Err(OxiXzError::invalid_state("encode", self.state)),
        };
        let progress = engine.code(input, &mut self.buf, action)?;
        log::trace!(
            "encode {:?}: consumed {} produced {} status {:?}",
            action,
            progress.consumed,
            progress.produced,
            progress.status
        );

        if progress.produced > 0 {
            let produced = progress.produced;
            match &mut self.sink {
                Some(sink) => sink.write_all(&self.buf[..produced])?,
                None => unreachable!("sink is only taken by into_inner"),
            }
        }
        self.total_in += progress.consumed as u64;
        self.total_out += progress.produced as u64;
        Ok(progress)
    }
}

impl<W: Write, E: CodecEngine> Write for Encoder<W, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encode_all(buf).map_err(io::Error::from)
    }

    /// Flushes the sink only; the engine keeps its buffered input.
    fn flush(&mut self) -> io::Result<()> {
        self.sink_mut().flush()
    }
}

impl<W: Write, E: CodecEngine> Drop for Encoder<W, E> {
    fn drop(&mut self) {
        if self.sink.is_some() && self.state.is_open() {
            if let Err(e) = self.finish() {
                log::warn!("failed to finish dropped encoder: {}", e);
            }
        }
    }
}

impl<W: Write, E: CodecEngine> fmt::Debug for Encoder<W, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("state", &self.state)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CopyEngine, FailingEngine, StuckEngine};
    use oxixz_core::error::CodecErrorKind;

    #[test]
    fn test_write_then_finish() {
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::new().with_trailer(b"END"));
        assert_eq!(encoder.write(b"hello ").unwrap(), 6);
        assert_eq!(encoder.write(b"world").unwrap(), 5);
        encoder.finish().unwrap();

        assert_eq!(encoder.get_ref(), b"hello worldEND");
        assert_eq!(encoder.total_in(), 11);
        assert_eq!(encoder.total_out(), 14);
        assert_eq!(encoder.state(), StreamState::Finished);
    }

    #[test]
    fn test_trickle_engine_consumes_everything() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::trickle(7));
        assert_eq!(encoder.write(&data).unwrap(), 1000);
        let out = encoder.into_inner().unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_empty_write() {
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::new());
        assert_eq!(encoder.write(&[]).unwrap(), 0);
        assert_eq!(encoder.total_in(), 0);
        assert_eq!(encoder.engine.as_ref().unwrap().calls, 0);
    }

    #[test]
    fn test_write_after_finish() {
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::new());
        encoder.finish().unwrap();
        let err = encoder.write(b"late").unwrap_err();
        assert!(matches!(
            err,
            OxiXzError::InvalidState {
                operation: "write",
                state: StreamState::Finished
            }
        ));
    }

    #[test]
    fn test_double_finish() {
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::new());
        encoder.finish().unwrap();
        assert!(matches!(
            encoder.finish(),
            Err(OxiXzError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_close_finishes_and_rejects_second_close() {
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::new().with_trailer(b"!"));
        encoder.write(b"abc").unwrap();
        encoder.close().unwrap();
        assert_eq!(encoder.get_ref(), b"abc!");
        assert!(encoder.state().is_closed());

        let err = encoder.close().unwrap_err();
        assert!(matches!(
            err,
            OxiXzError::InvalidState {
                operation: "close",
                state: StreamState::Closed
            }
        ));
        assert!(encoder.write(b"x").is_err());
    }

    #[test]
    fn test_close_after_finish() {
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::new());
        encoder.finish().unwrap();
        encoder.close().unwrap();
        assert_eq!(encoder.state(), StreamState::Closed);
    }

    #[test]
    fn test_drop_finishes_open_stream() {
        let mut sink = Vec::new();
        {
            let mut encoder =
                Encoder::with_engine(&mut sink, CopyEngine::new().with_trailer(b"<eof>"));
            encoder.write(b"data").unwrap();
        }
        assert_eq!(sink, b"data<eof>");
    }

    #[test]
    fn test_stall_guard() {
        let mut encoder = Encoder::with_engine(Vec::new(), StuckEngine);
        let err = encoder.write(b"never consumed").unwrap_err();
        assert!(err.is_buffer_error());

        let mut encoder = Encoder::with_engine(Vec::new(), StuckEngine);
        assert!(encoder.finish().unwrap_err().is_buffer_error());
        assert!(encoder.close().is_err());
    }

    #[test]
    fn test_engine_failure_propagates() {
        let mut encoder = Encoder::with_engine(Vec::new(), FailingEngine(CodecErrorKind::Mem));
        let err = encoder.write(b"x").unwrap_err();
        assert_eq!(err.codec_kind(), Some(CodecErrorKind::Mem));
    }

    #[test]
    fn test_io_write_impl() {
        let mut encoder = Encoder::with_engine(Vec::new(), CopyEngine::trickle(3));
        let mut source = &b"copied through std::io::copy"[..];
        let copied = io::copy(&mut source, &mut encoder).unwrap();
        assert_eq!(copied, 28);
        Write::flush(&mut encoder).unwrap();
        assert_eq!(encoder.into_inner().unwrap(), b"copied through std::io::copy");
    }

    #[test]
    fn test_io_write_maps_errors() {
        let mut encoder = Encoder::with_engine(Vec::new(), FailingEngine(CodecErrorKind::Data));
        let err = Write::write(&mut encoder, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
