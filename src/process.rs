//! Process runtime state and the process arena.
//!
//! Every process of a workload gets one [`Process`] entry in the
//! [`ProcessTable`]. Entries are created once, before the simulation starts,
//! and are never removed, so a [`ProcessHandle`] stays valid for the whole run.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::types::{Pid, ProcessHandle, SimTime};
use crate::workload::Workload;

/// Lifecycle state of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Not yet driven for the first time
    Unarrived,
    /// Waiting for a resource, or between two events
    Ready,
    /// Holding a core
    Running,
    /// Holding the SSD or talking to the user
    Blocked,
    /// Program exhausted
    Terminated,
}

impl LifecycleState {
    /// Returns the upper-case label used in process listings.
    pub fn label(self) -> &'static str {
        match self {
            LifecycleState::Unarrived => "N/A",
            LifecycleState::Ready => "READY",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Blocked => "BLOCKED",
            LifecycleState::Terminated => "TERMINATED",
        }
    }

    /// True while the process holds a resource.
    pub fn is_busy(self) -> bool {
        matches!(self, LifecycleState::Running | LifecycleState::Blocked)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runtime state of one simulated process.
#[derive(Clone, Debug)]
pub struct Process {
    /// Identifier from the input
    pub pid: Pid,
    /// Ordered resource requests
    pub program: Vec<Event>,
    /// Index of the next event to execute
    pub cursor: usize,
    /// This process's simulated clock
    pub current_time: SimTime,
    /// Lifecycle state
    pub state: LifecycleState,
    /// Whether the arrival has been processed
    pub has_arrived: bool,
    /// Set by the last request: true if granted, false if parked in a wait queue
    pub auto_requeue: bool,
    /// Set once the process has been shown as terminated in a listing
    reported: bool,
}

impl Process {
    /// Creates a process that arrives at `start`.
    pub fn new(pid: Pid, start: SimTime, program: Vec<Event>) -> Self {
        Self {
            pid,
            program,
            cursor: 0,
            current_time: start,
            state: LifecycleState::Unarrived,
            has_arrived: false,
            auto_requeue: true,
            reported: false,
        }
    }

    /// The next event to execute, if any.
    pub fn next_event(&self) -> Option<&Event> {
        self.program.get(self.cursor)
    }

    /// The next event to execute, mutably.
    pub fn next_event_mut(&mut self) -> Option<&mut Event> {
        self.program.get_mut(self.cursor)
    }

    /// The event issued most recently (the one at `cursor - 1`).
    pub fn last_issued(&self) -> Option<&Event> {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.program.get(index))
    }

    /// True once every event has been issued.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.program.len()
    }
}

/// One line of a process listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatus {
    /// Process identifier
    pub pid: Pid,
    /// State at the time of the listing
    pub state: LifecycleState,
}

/// The active processes at an arrival or termination boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTableSnapshot {
    /// Listed processes, in load order
    pub entries: Vec<ProcessStatus>,
}

impl ProcessTableSnapshot {
    /// True if no process is listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Index-stable arena of all processes of a run.
#[derive(Clone, Debug, Default)]
pub struct ProcessTable {
    processes: Vec<Process>,
}

impl ProcessTable {
    /// Builds the arena from a workload, in load order.
    pub fn from_workload(workload: &Workload) -> Self {
        let processes = workload
            .processes
            .iter()
            .map(|spec| Process::new(spec.pid, spec.start, spec.events.clone()))
            .collect();
        Self { processes }
    }

    /// Number of processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// True if the table holds no process.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Returns a process by handle.
    pub fn get(&self, handle: ProcessHandle) -> Option<&Process> {
        self.processes.get(handle.index())
    }

    /// Iterates over all handles in load order.
    pub fn handles(&self) -> impl Iterator<Item = ProcessHandle> {
        (0..self.processes.len()).map(ProcessHandle::new)
    }

    /// Iterates over all processes in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    /// Finds the handle of a process by its id.
    pub fn find(&self, pid: Pid) -> Option<ProcessHandle> {
        self.processes
            .iter()
            .position(|p| p.pid == pid)
            .map(ProcessHandle::new)
    }

    /// Number of terminated processes.
    pub fn terminated_count(&self) -> usize {
        self.processes
            .iter()
            .filter(|p| p.state == LifecycleState::Terminated)
            .count()
    }

    /// Lists the arrived processes that have not been reported terminated yet.
    ///
    /// A terminated process shows up in exactly one listing; taking the
    /// snapshot marks it as reported.
    pub fn snapshot(&mut self) -> ProcessTableSnapshot {
        let mut entries = Vec::new();
        for process in &mut self.processes {
            if process.reported || process.state == LifecycleState::Unarrived {
                continue;
            }
            entries.push(ProcessStatus {
                pid: process.pid,
                state: process.state,
            });
            if process.state == LifecycleState::Terminated {
                process.reported = true;
            }
        }
        ProcessTableSnapshot { entries }
    }
}

impl Index<ProcessHandle> for ProcessTable {
    type Output = Process;

    fn index(&self, handle: ProcessHandle) -> &Process {
        &self.processes[handle.index()]
    }
}

impl IndexMut<ProcessHandle> for ProcessTable {
    fn index_mut(&mut self, handle: ProcessHandle) -> &mut Process {
        &mut self.processes[handle.index()]
    }
}
