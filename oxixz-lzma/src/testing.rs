//! Scripted engines for exercising the stream adapters.

use oxixz_core::error::{CodecErrorKind, OxiXzError, Result};
use oxixz_core::traits::{Action, CodecEngine, Progress, Status};

/// Copies input to output, at most `per_call` bytes per call.
///
/// On `Finish` it appends `trailer` and then reports end of stream. With
/// `end_after` set it reports end of stream during `Run` once that many
/// bytes were consumed, ignoring the rest.
pub struct CopyEngine {
    pub per_call: usize,
    pub trailer: Vec<u8>,
    pub end_after: Option<u64>,
    pub calls: usize,
    trailer_pos: usize,
    ended: bool,
    total_in: u64,
    total_out: u64,
}

impl CopyEngine {
    pub fn new() -> Self {
        Self {
            per_call: usize::MAX,
            trailer: Vec::new(),
            end_after: None,
            calls: 0,
            trailer_pos: 0,
            ended: false,
            total_in: 0,
            total_out: 0,
        }
    }

    pub fn trickle(per_call: usize) -> Self {
        Self {
            per_call,
            ..Self::new()
        }
    }

    pub fn with_trailer(mut self, trailer: &[u8]) -> Self {
        self.trailer = trailer.to_vec();
        self
    }

    pub fn ending_after(mut self, bytes: u64) -> Self {
        self.end_after = Some(bytes);
        self
    }
}

impl CodecEngine for CopyEngine {
    fn code(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<Progress> {
        self.calls += 1;
        if self.ended {
            return Ok(Progress::new(0, 0, Status::StreamEnd));
        }

        let mut limit = input.len().min(output.len()).min(self.per_call);
        if let Some(end) = self.end_after {
            limit = limit.min((end - self.total_in) as usize);
        }
        output[..limit].copy_from_slice(&input[..limit]);
        self.total_in += limit as u64;
        let mut produced = limit;

        if self.end_after == Some(self.total_in) {
            self.ended = true;
        } else if action == Action::Finish && limit == input.len() {
            let rest = &self.trailer[self.trailer_pos..];
            let n = rest.len().min(output.len() - produced);
            output[produced..produced + n].copy_from_slice(&rest[..n]);
            self.trailer_pos += n;
            produced += n;
            self.ended = self.trailer_pos == self.trailer.len();
        }

        self.total_out += produced as u64;
        let status = if self.ended { Status::StreamEnd } else { Status::Ok };
        Ok(Progress::new(limit, produced, status))
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}

/// Never consumes or produces anything.
pub struct StuckEngine;

impl CodecEngine for StuckEngine {
    fn code(&mut self, _input: &[u8], _output: &mut [u8], _action: Action) -> Result<Progress> {
        Ok(Progress::new(0, 0, Status::Ok))
    }

    fn total_in(&self) -> u64 {
        0
    }

    fn total_out(&self) -> u64 {
        0
    }
}

/// Fails every call with `kind`.
pub struct FailingEngine(pub CodecErrorKind);

impl CodecEngine for FailingEngine {
    fn code(&mut self, _input: &[u8], _output: &mut [u8], _action: Action) -> Result<Progress> {
        Err(OxiXzError::codec(self.0))
    }

    fn total_in(&self) -> u64 {
        0
    }

    fn total_out(&self) -> u64 {
        0
    }
}
