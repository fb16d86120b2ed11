//! Pull-style streaming decoder.
//!
//! A [`Decoder`] owns a codec engine, a compressed source and two staging
//! buffers. Reads are served from the output staging buffer; when it runs
//! dry the decoder pulls up to [`BLOCK_SIZE`] compressed bytes from the
//! source and runs the engine until it yields output or the stream ends.
//! Once the engine reports end of stream nothing past it is returned and
//! any trailing source bytes are ignored.

use crate::BLOCK_SIZE;
use crate::engine::{LzmaStream, StallGuard};
use crate::filter::FilterChain;
use oxixz_core::error::{CodecErrorKind, OxiXzError, Result};
use oxixz_core::traits::{Action, CodecEngine, StreamState};
use std::fmt;
use std::io::{self, Read};
use std::ops::{Deref, DerefMut};

/// Report streams that carry no integrity check.
pub const TELL_NO_CHECK: u32 = 0x01;
/// Report streams whose check type liblzma cannot verify.
pub const TELL_UNSUPPORTED_CHECK: u32 = 0x02;
/// Report the check type as soon as it is known.
pub const TELL_ANY_CHECK: u32 = 0x04;
/// Decode concatenated `.xz` streams as one.
pub const CONCATENATED: u32 = 0x08;
/// Skip integrity check verification.
pub const IGNORE_CHECK: u32 = 0x10;

/// Resource limits and flags for container decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    /// Memory limit in bytes; `u64::MAX` disables it.
    pub memlimit: u64,
    /// Decoder flags (`TELL_*`, [`CONCATENATED`], [`IGNORE_CHECK`]).
    pub flags: u32,
}

impl DecoderLimits {
    /// No memory limit, no flags.
    pub fn new() -> Self {
        Self {
            memlimit: u64::MAX,
            flags: 0,
        }
    }

    /// Set the memory limit.
    pub fn with_memlimit(mut self, memlimit: u64) -> Self {
        self.memlimit = memlimit;
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// What a decoder expects on its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderMode {
    /// Raw filter chain output.
    Raw,
    /// `.xz` stream.
    Xz,
    /// Legacy `.lzma` stream.
    LzmaAlone,
    /// `.xz` or `.lzma`, detected from the first bytes.
    Auto,
    /// Caller-supplied engine.
    Custom,
}

/// Streaming decompressor reading from `R`.
///
/// # Example
///
/// ```rust
/// use oxixz_lzma::{Decoder, DecoderLimits, encode};
///
/// let compressed = encode(b"pulled on demand", 3)?;
/// let mut decoder = Decoder::xz(&compressed[..], DecoderLimits::default())?;
///
/// let mut out = Vec::new();
/// while let Some(chunk) = decoder.read_chunk(4)? {
///     assert!(chunk.len() <= 4);
///     out.extend_from_slice(&chunk);
/// }
/// assert_eq!(out, b"pulled on demand");
/// assert!(decoder.is_eof());
/// # Ok::<(), oxixz_core::OxiXzError>(())
/// ```
pub struct Decoder<R: Read, E: CodecEngine = LzmaStream> {
    source: R,
    engine: Option<E>,
    mode: DecoderMode,
    state: StreamState,
    in_buf: Vec<u8>,
    in_pos: usize,
    in_len: usize,
    out_buf: Vec<u8>,
    out_pos: usize,
    out_len: usize,
    source_done: bool,
    source_seen_data: bool,
    total_in: u64,
    total_out: u64,
}

// ============================================================================
// liblzma constructors
// ============================================================================

impl<R: Read> Decoder<R> {
    /// `.xz` decoder.
    pub fn xz(source: R, limits: DecoderLimits) -> Result<Self> {
        let engine = LzmaStream::xz_decoder(limits.memlimit, limits.flags)?;
        Ok(Self::build(source, engine, DecoderMode::Xz))
    }

    /// Raw decoder; `chain` must match the chain the data was encoded with.
    pub fn raw(source: R, chain: &FilterChain) -> Result<Self> {
        Ok(Self::build(
            source,
            LzmaStream::raw_decoder(chain)?,
            DecoderMode::Raw,
        ))
    }

    /// Legacy `.lzma` decoder.
    pub fn lzma_alone(source: R, memlimit: u64) -> Result<Self> {
        Ok(Self::build(
            source,
            LzmaStream::lzma_alone_decoder(memlimit)?,
            DecoderMode::LzmaAlone,
        ))
    }

    /// Decoder accepting `.xz` or `.lzma`.
    pub fn auto(source: R, limits: DecoderLimits) -> Result<Self> {
        let engine = LzmaStream::auto_decoder(limits.memlimit, limits.flags)?;
        Ok(Self::build(source, engine, DecoderMode::Auto))
    }
}

// ============================================================================
// Stream operations
// ============================================================================

impl<R: Read, E: CodecEngine> Decoder<R, E> {
    /// Decoder driving an arbitrary engine.
    pub fn with_engine(source: R, engine: E) -> Self {
        Self::build(source, engine, DecoderMode::Custom)
    }

    fn build(source: R, engine: E, mode: DecoderMode) -> Self {
        log::debug!("decoder created in {:?} mode", mode);
        Self {
            source,
            engine: Some(engine),
            mode,
            state: StreamState::Open,
            in_buf: vec![0u8; BLOCK_SIZE],
            in_pos: 0,
            in_len: 0,
            out_buf: vec![0u8; BLOCK_SIZE],
            out_pos: 0,
            out_len: 0,
            source_done: false,
            source_seen_data: false,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Read up to `max_bytes` decompressed bytes.
    ///
    /// Keeps running the engine until `max_bytes` are gathered or the stream
    /// ends, so only the last chunk is short. Returns `None` once the stream
    /// is exhausted. `max_bytes == 0` yields an empty chunk without running
    /// the engine.
    pub fn read_chunk(&mut self, max_bytes: usize) -> Result<Option<Vec<u8>>> {
        self.ensure_not_closed("read")?;
        if max_bytes == 0 {
            return Ok(Some(Vec::new()));
        }

        let mut chunk = Vec::new();
        while chunk.len() < max_bytes && self.ensure_staged()? {
            let n = (max_bytes - chunk.len()).min(self.out_len - self.out_pos);
            chunk.extend_from_slice(&self.out_buf[self.out_pos..self.out_pos + n]);
            self.out_pos += n;
        }
        Ok((!chunk.is_empty()).then_some(chunk))
    }

    /// Read decompressed bytes into `buf`; `0` means end of stream.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_not_closed("read")?;
        if buf.is_empty() || !self.ensure_staged()? {
            return Ok(0);
        }

        let n = buf.len().min(self.out_len - self.out_pos);
        buf[..n].copy_from_slice(&self.out_buf[self.out_pos..self.out_pos + n]);
        self.out_pos += n;
        Ok(n)
    }

    /// Read everything up to the end of the stream.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.read_chunk(BLOCK_SIZE)? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// Whether the stream ended and every staged byte was returned.
    pub fn is_eof(&self) -> bool {
        !self.state.is_open() && self.out_pos == self.out_len
    }

    /// Release the engine and discard staged data.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_not_closed("close")?;
        self.engine = None;
        self.in_pos = 0;
        self.in_len = 0;
        self.out_pos = 0;
        self.out_len = 0;
        self.state = StreamState::Closed;
        Ok(())
    }

    /// Reference to the source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Mutable reference to the source.
    ///
    /// Reading from the source directly while the stream is open corrupts it.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Return the source. Compressed bytes already staged are lost.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Compressed bytes consumed by the engine so far.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Decoding mode.
    pub fn mode(&self) -> DecoderMode {
        self.mode
    }

    fn ensure_not_closed(&self, operation: &'static str) -> Result<()> {
        if self.state.is_closed() {
            Err(OxiXzError::invalid_state(operation, self.state))
        } else {
            Ok(())
        }
    }

    /// Make sure output is staged; `false` means end of stream.
    fn ensure_staged(&mut self) -> Result<bool> {
        if self.out_pos == self.out_len && self.state.is_open() {
            self.fetch()?;
        }
        Ok(self.out_pos < self.out_len)
    }

    /// Run the engine until it stages output or the stream ends.
    fn fetch(&mut self) -> Result<()> {
        self.out_pos = 0;
        self.out_len = 0;
        let mut guard = StallGuard::default();

        while self.out_len == 0 && self.state.is_open() {
            if self.in_pos == self.in_len && !self.source_done {
                self.refill()?;
            }

            let action = if self.source_done && self.in_pos == self.in_len {
                if !self.source_seen_data {
                    return Err(OxiXzError::codec(CodecErrorKind::Buffer));
                }
                Action::Finish
            } else {
                Action::Run
            };

            let engine = match self.engine.as_mut() {
                Some(engine) => engine,
                None => return Err(OxiXzError::invalid_state("read", self.state)),
            };
            let progress = engine.code(
                &self.in_buf[self.in_pos..self.in_len],
                &mut self.out_buf,
                action,
            )?;
            log::trace!(
                "decode {:?}: consumed {} produced {} status {:?}",
                action,
                progress.consumed,
                progress.produced,
                progress.status
            );

            self.in_pos += progress.consumed;
            self.out_len = progress.produced;
            self.total_in += progress.consumed as u64;
            self.total_out += progress.produced as u64;

            if progress.is_stream_end() {
                self.state = StreamState::Finished;
                log::debug!(
                    "decoder finished: {} bytes in, {} bytes out",
                    self.total_in,
                    self.total_out
                );
            } else if action == Action::Finish || progress.consumed == 0 {
                // Only count calls that could not be helped by more input.
                guard.observe(&progress)?;
            }
        }
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        loop {
            match self.source.read(&mut self.in_buf) {
                Ok(0) => {
                    self.source_done = true;
                    self.in_pos = 0;
                    self.in_len = 0;
                    return Ok(());
                }
                Ok(n) => {
                    self.source_seen_data = true;
                    self.in_pos = 0;
                    self.in_len = n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read, E: CodecEngine> Read for Decoder<R, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::from)
    }
}

impl<R: Read, E: CodecEngine> fmt::Debug for Decoder<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AutoDecoder
// ============================================================================

/// Decoder that accepts both `.xz` and `.lzma` input.
///
/// Dereferences to [`Decoder`], so every read operation is available. Input
/// that is neither container fails with
/// [`OxiXzError::UnsupportedFormat`].
#[derive(Debug)]
pub struct AutoDecoder<R: Read>(Decoder<R>);

impl<R: Read> AutoDecoder<R> {
    /// Create an auto-detecting decoder.
    pub fn new(source: R, limits: DecoderLimits) -> Result<Self> {
        Decoder::auto(source, limits).map(Self)
    }

    /// Unwrap into the underlying decoder.
    pub fn into_decoder(self) -> Decoder<R> {
        self.0
    }

    /// Return the source.
    pub fn into_inner(self) -> R {
        self.0.into_inner()
    }
}

impl<R: Read> Deref for AutoDecoder<R> {
    type Target = Decoder<R>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<R: Read> DerefMut for AutoDecoder<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<R: Read> Read for AutoDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CopyEngine, FailingEngine, StuckEngine};

    /// Source that returns at most `step` bytes per read and an
    /// `Interrupted` error before each one.
    struct ChoppyReader<'a> {
        data: &'a [u8],
        step: usize,
        interrupt: bool,
    }

    impl Read for ChoppyReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_read_chunk_respects_max() {
        let mut decoder = Decoder::with_engine(&b"abcdefghij"[..], CopyEngine::new());
        assert_eq!(decoder.mode(), DecoderMode::Custom);
        assert_eq!(decoder.read_chunk(4).unwrap().unwrap(), b"abcd");
        assert_eq!(decoder.read_chunk(4).unwrap().unwrap(), b"efgh");
        assert_eq!(decoder.read_chunk(4).unwrap().unwrap(), b"ij");
        assert_eq!(decoder.read_chunk(4).unwrap(), None);
        assert!(decoder.is_eof());
        assert_eq!(decoder.read_chunk(4).unwrap(), None);
    }

    #[test]
    fn test_read_chunk_spans_engine_calls() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut decoder = Decoder::with_engine(&data[..], CopyEngine::trickle(64));
        let first = decoder.read_chunk(300).unwrap().unwrap();
        assert_eq!(first, &data[..300]);
        assert_eq!(decoder.engine.as_ref().unwrap().calls, 5);

        let rest = decoder.read_chunk(5000).unwrap().unwrap();
        assert_eq!(rest, &data[300..]);
        assert!(decoder.is_eof());
        assert_eq!(decoder.read_chunk(1).unwrap(), None);
    }

    #[test]
    fn test_zero_max_does_not_touch_engine() {
        let mut decoder = Decoder::with_engine(&b"abc"[..], CopyEngine::new());
        assert_eq!(decoder.read_chunk(0).unwrap(), Some(Vec::new()));
        assert_eq!(decoder.total_in(), 0);
        assert_eq!(decoder.engine.as_ref().unwrap().calls, 0);
        assert_eq!(decoder.read_chunk(1).unwrap().unwrap(), b"a");
        assert_eq!(decoder.engine.as_ref().unwrap().calls, 1);

        let mut failing = Decoder::with_engine(&b"abc"[..], FailingEngine(CodecErrorKind::Data));
        assert_eq!(failing.read_chunk(0).unwrap(), Some(Vec::new()));
        assert!(failing.read_chunk(1).is_err());
    }

    #[test]
    fn test_stops_at_stream_end() {
        let engine = CopyEngine::new().ending_after(5);
        let mut decoder = Decoder::with_engine(&b"12345trailing"[..], engine);
        assert_eq!(decoder.read_all().unwrap(), b"12345");
        assert_eq!(decoder.state(), StreamState::Finished);
        assert_eq!(decoder.total_in(), 5);
    }

    #[test]
    fn test_empty_source_is_buffer_error() {
        let mut decoder = Decoder::with_engine(&b""[..], CopyEngine::new());
        let err = decoder.read_chunk(16).unwrap_err();
        assert!(err.is_buffer_error());
    }

    #[test]
    fn test_choppy_source() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let source = ChoppyReader {
            data: &data,
            step: 333,
            interrupt: false,
        };
        let mut decoder = Decoder::with_engine(source, CopyEngine::trickle(100));
        assert_eq!(decoder.read_all().unwrap(), data);
    }

    #[test]
    fn test_close_lifecycle() {
        let mut decoder = Decoder::with_engine(&b"abc"[..], CopyEngine::new());
        assert_eq!(decoder.read_chunk(1).unwrap().unwrap(), b"a");
        decoder.close().unwrap();
        assert!(decoder.is_eof());

        assert!(matches!(
            decoder.read_chunk(1),
            Err(OxiXzError::InvalidState {
                operation: "read",
                state: StreamState::Closed
            })
        ));
        assert!(matches!(
            decoder.close(),
            Err(OxiXzError::InvalidState {
                operation: "close",
                ..
            })
        ));
    }

    #[test]
    fn test_stuck_engine_fails() {
        let mut decoder = Decoder::with_engine(&b"abc"[..], StuckEngine);
        assert!(decoder.read_all().unwrap_err().is_buffer_error());
    }

    #[test]
    fn test_read_impl() {
        let mut decoder = Decoder::with_engine(&b"via std::io::Read"[..], CopyEngine::trickle(2));
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        assert_eq!(out, "via std::io::Read");
    }

    #[test]
    fn test_read_into() {
        let mut decoder = Decoder::with_engine(&b"xyz"[..], CopyEngine::new());
        let mut buf = [0u8; 2];
        assert_eq!(decoder.read_into(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"xy");
        assert_eq!(decoder.read_into(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'z');
        assert_eq!(decoder.read_into(&mut buf).unwrap(), 0);
        assert_eq!(decoder.read_into(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_limits_builder() {
        let limits = DecoderLimits::default()
            .with_memlimit(1 << 20)
            .with_flags(CONCATENATED | IGNORE_CHECK);
        assert_eq!(limits.memlimit, 1 << 20);
        assert_eq!(limits.flags, 0x18);
        assert_eq!(DecoderLimits::new().memlimit, u64::MAX);
    }
}
