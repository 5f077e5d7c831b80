//! Structured trace of a simulation run.
//!
//! Every driver step produces a [`StepTrace`] holding the [`TraceRecord`]s
//! emitted while the step ran. Records are data only; turning them into text
//! or JSON is the job of a [`TraceSink`](crate::render::TraceSink).

use serde::{Deserialize, Serialize};

use crate::process::ProcessTableSnapshot;
use crate::resources::QueueClass;
use crate::types::{Pid, SimTime};

/// One observable state transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceRecord {
    /// A process asks for a core.
    CoreRequested {
        pid: Pid,
        time: SimTime,
        duration: SimTime,
    },
    /// A core was granted and will be released at `release_at`.
    CoreGranted { pid: Pid, release_at: SimTime },
    /// No core was free; the process waits in a core queue.
    CoreDeferred {
        pid: Pid,
        class: QueueClass,
        depth: usize,
    },
    /// A process finished its core event.
    CoreReleased { pid: Pid, time: SimTime },
    /// A process asks for the SSD.
    StorageRequested {
        pid: Pid,
        time: SimTime,
        duration: SimTime,
    },
    /// The SSD was granted and will be released at `release_at`.
    StorageGranted { pid: Pid, release_at: SimTime },
    /// The SSD was busy; the process waits in the SSD queue.
    StorageDeferred { pid: Pid, depth: usize },
    /// A process finished its SSD event.
    StorageReleased { pid: Pid, time: SimTime },
    /// A process starts talking to the user.
    InteractionStarted {
        pid: Pid,
        time: SimTime,
        completes_at: SimTime,
    },
    /// A process finished talking to the user.
    InteractionCompleted { pid: Pid, time: SimTime },
    /// First appearance of a process.
    Arrival {
        pid: Pid,
        time: SimTime,
        table: ProcessTableSnapshot,
    },
    /// A process exhausted its program.
    Termination {
        pid: Pid,
        time: SimTime,
        table: ProcessTableSnapshot,
    },
}

impl TraceRecord {
    /// The process the record is about.
    pub fn pid(&self) -> Pid {
        match self {
            TraceRecord::CoreRequested { pid, .. }
            | TraceRecord::CoreGranted { pid, .. }
            | TraceRecord::CoreDeferred { pid, .. }
            | TraceRecord::CoreReleased { pid, .. }
            | TraceRecord::StorageRequested { pid, .. }
            | TraceRecord::StorageGranted { pid, .. }
            | TraceRecord::StorageDeferred { pid, .. }
            | TraceRecord::StorageReleased { pid, .. }
            | TraceRecord::InteractionStarted { pid, .. }
            | TraceRecord::InteractionCompleted { pid, .. }
            | TraceRecord::Arrival { pid, .. }
            | TraceRecord::Termination { pid, .. } => *pid,
        }
    }
}

/// Everything that happened in one driver step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTrace {
    /// 1-based step number
    pub step: u64,
    /// The process that was driven
    pub pid: Pid,
    /// Simulated time at which it was popped
    pub time: SimTime,
    /// Records in emission order
    pub records: Vec<TraceRecord>,
    /// Whether the driven process terminated in this step
    pub terminated: bool,
    /// Whether the timeline was empty after the step
    pub timeline_drained: bool,
}
