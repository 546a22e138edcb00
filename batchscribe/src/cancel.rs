use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const STOP_AFTER_CURRENT: u8 = 1;
const STOP_IMMEDIATE: u8 = 2;

/// Cancellation state for one run. Escalates monotonically:
/// `Running → StopAfterCurrent → StopImmediate`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    Running,
    /// The current job finishes and its outputs are written; no further
    /// jobs start.
    StopAfterCurrent,
    /// The run aborts at the next checkpoint; the in-flight job is
    /// abandoned without writing partial outputs.
    StopImmediate,
}

impl CancelState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => CancelState::Running,
            STOP_AFTER_CURRENT => CancelState::StopAfterCurrent,
            _ => CancelState::StopImmediate,
        }
    }
}

/// Shared cancellation flag, written by the signaling side (UI, signal
/// handler) and polled by the orchestrator at its checkpoints.
///
/// A single atomic word; no lock needed since escalation is monotonic.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CancelState {
        CancelState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Request the next escalation level and return the resulting state.
    ///
    /// First call: stop after the current file. Second call: stop
    /// immediately. Further calls are no-ops.
    pub fn request_stop(&self) -> CancelState {
        let result = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (raw < STOP_IMMEDIATE).then_some(raw + 1)
            });
        match result {
            Ok(prev) => CancelState::from_raw(prev + 1),
            Err(_) => CancelState::StopImmediate,
        }
    }

    /// Jump straight to `StopImmediate` (e.g. the hosting process is
    /// shutting down). Never regresses an existing escalation.
    pub fn force_immediate(&self) {
        self.state.fetch_max(STOP_IMMEDIATE, Ordering::AcqRel);
    }

    pub fn stop_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) >= STOP_AFTER_CURRENT
    }

    pub fn immediate(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOP_IMMEDIATE
    }
}
