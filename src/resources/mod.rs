//! Contended resources and their scheduling policies.
//!
//! Each resource manager owns its own state and wait queues and is the only
//! code that mutates them. Managers see the rest of the run through a
//! [`StepContext`], which lends them the process arena, the statistics and the
//! trace of the step in progress.
//!
//! # Managers
//!
//! - [`CorePool`] - identical cores with an interactive and a
//!   non-interactive wait queue; interactive waiters always go first
//! - [`StorageDevice`] - a single SSD with one FIFO wait queue
//! - [`InteractionChannel`] - the user; never queues, and marks the next core
//!   request of a process as interactive

pub mod core_pool;
pub mod interaction;
pub mod storage;

pub use core_pool::{CorePool, QueueClass};
pub use interaction::InteractionChannel;
pub use storage::StorageDevice;

use crate::process::ProcessTable;
use crate::stats::StatsAggregator;
use crate::trace::TraceRecord;
use crate::types::SimTime;

/// Borrowed run state handed to a resource manager for one call.
pub struct StepContext<'a> {
    /// All processes of the run
    pub processes: &'a mut ProcessTable,
    /// Run-wide counters
    pub stats: &'a mut StatsAggregator,
    /// Records of the step in progress
    pub trace: &'a mut Vec<TraceRecord>,
}

/// Result of a resource request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The resource was granted and is held until `release_at`.
    Granted { release_at: SimTime },
    /// The process waits in a queue that now holds `depth` processes.
    Queued { depth: usize },
}

impl RequestOutcome {
    /// True if the request was granted.
    pub fn is_granted(self) -> bool {
        matches!(self, RequestOutcome::Granted { .. })
    }
}
