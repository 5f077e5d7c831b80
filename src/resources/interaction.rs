//! The user interaction channel.
//!
//! The user is always available, so interaction requests never wait. When an
//! interaction completes, the next event of the process is flagged as
//! interactive; if that event is a core request it will wait in the
//! interactive queue.

use crate::process::LifecycleState;
use crate::resources::{RequestOutcome, StepContext};
use crate::trace::TraceRecord;
use crate::types::{ProcessHandle, SimTime};

/// Unconstrained TTY resource.
#[derive(Debug, Default)]
pub struct InteractionChannel {
    in_progress: usize,
}

impl InteractionChannel {
    /// Creates an idle channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of interactions currently in progress.
    pub fn in_progress(&self) -> usize {
        self.in_progress
    }

    /// Starts an interaction of `duration`. Always granted.
    pub fn request(
        &mut self,
        ctx: &mut StepContext<'_>,
        handle: ProcessHandle,
        duration: SimTime,
    ) -> RequestOutcome {
        let process = &mut ctx.processes[handle];
        let time = process.current_time;
        process.current_time += duration;
        process.state = LifecycleState::Blocked;
        process.auto_requeue = true;
        let release_at = process.current_time;

        self.in_progress += 1;
        ctx.stats.record_interaction();
        ctx.trace.push(TraceRecord::InteractionStarted {
            pid: process.pid,
            time,
            completes_at: release_at,
        });
        RequestOutcome::Granted { release_at }
    }

    /// Completes the interaction of `handle`.
    ///
    /// # Panics
    ///
    /// Panics if no interaction is in progress.
    pub fn release(&mut self, ctx: &mut StepContext<'_>, handle: ProcessHandle) {
        let process = &mut ctx.processes[handle];
        assert!(
            self.in_progress > 0,
            "process {} completed an interaction that never started",
            process.pid
        );
        self.in_progress -= 1;

        ctx.trace.push(TraceRecord::InteractionCompleted {
            pid: process.pid,
            time: process.current_time,
        });
        if let Some(next) = process.next_event_mut() {
            next.interactive = true;
        }
    }
}
