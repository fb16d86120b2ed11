//! Codec engine call contract and stream lifecycle types.
//!
//! The streaming adapters never talk to a compression library directly.
//! They drive a [`CodecEngine`]: a stateful object that takes an input
//! slice, an output slice and an [`Action`], and reports how much it
//! consumed and produced. Any engine honouring this contract can sit under
//! an encoder or decoder.

use crate::error::Result;
use std::fmt;

/// Action requested from a codec engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Process input; more input may follow.
    #[default]
    Run,
    /// No more input will arrive; flush and validate trailing state.
    Finish,
}

/// Non-error status returned by a codec engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made (possibly none); call again to continue.
    Ok,
    /// All output for the stream has been produced.
    StreamEnd,
}

/// Result of a single engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes consumed from the input slice.
    pub consumed: usize,
    /// Bytes written to the output slice.
    pub produced: usize,
    /// Engine status after the call.
    pub status: Status,
}

impl Progress {
    /// Create a progress report.
    pub fn new(consumed: usize, produced: usize, status: Status) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }

    /// Whether the call consumed or produced anything.
    pub fn made_progress(&self) -> bool {
        self.consumed > 0 || self.produced > 0
    }

    /// Whether the engine reported end of stream.
    pub fn is_stream_end(&self) -> bool {
        self.status == Status::StreamEnd
    }
}

/// A stateful compression or decompression engine.
///
/// # Contract
///
/// - `code` consumes as much of `input` as it can and produces as much
///   output as fits in `output`. Either may be zero.
/// - Callers re-invoke with the remaining input and a drained output
///   buffer until the status they wait for is reached.
/// - `Action::Finish` with an empty `input` means no more input will ever
///   arrive; the engine flushes (encoders) or validates trailing state
///   (decoders) and eventually returns [`Status::StreamEnd`].
/// - Failures are reported as [`OxiXzError::Codec`](crate::OxiXzError::Codec)
///   and are not recoverable.
pub trait CodecEngine {
    /// Run one engine step.
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<Progress>;

    /// Total bytes consumed since construction.
    fn total_in(&self) -> u64;

    /// Total bytes produced since construction.
    fn total_out(&self) -> u64;
}

impl<E: CodecEngine + ?Sized> CodecEngine for Box<E> {
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<Progress> {
        (**self).code(input, output, action)
    }

    fn total_in(&self) -> u64 {
        (**self).total_in()
    }

    fn total_out(&self) -> u64 {
        (**self).total_out()
    }
}

impl<E: CodecEngine + ?Sized> CodecEngine for &mut E {
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<Progress> {
        (**self).code(input, output, action)
    }

    fn total_in(&self) -> u64 {
        (**self).total_in()
    }

    fn total_out(&self) -> u64 {
        (**self).total_out()
    }
}

/// Lifecycle state of an encoder or decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Accepting writes (encoder) or ready to read (decoder).
    #[default]
    Open,
    /// End of stream reached; the engine may still be held.
    Finished,
    /// Engine released; no further operations are permitted.
    Closed,
}

impl StreamState {
    /// Whether the stream is still open.
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Whether the stream has been closed.
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Finished => "finished",
            Self::Closed => "closed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingEngine {
        total_in: u64,
        total_out: u64,
    }

    impl CodecEngine for CountingEngine {
        fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<Progress> {
            let n = input.len().min(output.len());
            output[..n].copy_from_slice(&input[..n]);
            self.total_in += n as u64;
            self.total_out += n as u64;
            let status = if action == Action::Finish && n == input.len() {
                Status::StreamEnd
            } else {
                Status::Ok
            };
            Ok(Progress::new(n, n, status))
        }

        fn total_in(&self) -> u64 {
            self.total_in
        }

        fn total_out(&self) -> u64 {
            self.total_out
        }
    }

    #[test]
    fn test_action_default() {
        assert_eq!(Action::default(), Action::Run);
    }

    #[test]
    fn test_progress_flags() {
        assert!(!Progress::new(0, 0, Status::Ok).made_progress());
        assert!(Progress::new(1, 0, Status::Ok).made_progress());
        assert!(Progress::new(0, 3, Status::StreamEnd).is_stream_end());
    }

    #[test]
    fn test_boxed_engine_forwards() {
        let mut engine: Box<dyn CodecEngine> = Box::new(CountingEngine {
            total_in: 0,
            total_out: 0,
        });
        let mut out = [0u8; 4];
        let progress = engine.code(b"abcdef", &mut out, Action::Run).unwrap();
        assert_eq!(progress, Progress::new(4, 4, Status::Ok));
        assert_eq!(&out, b"abcd");
        assert_eq!(engine.total_in(), 4);
        assert_eq!(engine.total_out(), 4);
    }

    #[test]
    fn test_stream_state_display() {
        assert_eq!(StreamState::default(), StreamState::Open);
        assert_eq!(StreamState::Finished.to_string(), "finished");
        assert!(StreamState::Closed.is_closed());
        assert!(StreamState::Open.is_open());
    }
}
