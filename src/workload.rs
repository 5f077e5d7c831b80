//! Workload definitions.
//!
//! A workload is what a simulation run consumes: the number of cores and one
//! program per process. Workloads come from the text loader
//! ([`crate::loader`]) or from a YAML/JSON configuration ([`crate::config`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;
use crate::types::{Pid, SimTime};

/// Errors found while validating a workload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("workload must have at least one core")]
    ZeroCores,

    #[error("workload has no processes")]
    NoProcesses,

    #[error("duplicate process id: {0}")]
    DuplicatePid(Pid),

    #[error("process {0} has an empty program")]
    EmptyProgram(Pid),

    #[error("latest start plus total event duration exceeds the simulated time range")]
    TimeOverflow,
}

/// Result type for workload validation.
pub type WorkloadResult<T> = Result<T, WorkloadError>;

/// The program of one process and the time it arrives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Process identifier
    pub pid: Pid,
    /// Arrival time
    #[serde(default)]
    pub start: SimTime,
    /// Ordered resource requests
    pub events: Vec<Event>,
}

impl ProcessSpec {
    /// Creates a new process description.
    pub fn new(pid: Pid, start: SimTime, events: Vec<Event>) -> Self {
        Self { pid, start, events }
    }
}

/// Core count plus all process programs of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    /// Number of identical cores
    pub cores: usize,
    /// Processes in load order
    #[serde(default)]
    pub processes: Vec<ProcessSpec>,
}

impl Workload {
    /// Creates an empty workload with the given core count.
    pub fn new(cores: usize) -> Self {
        Self {
            cores,
            processes: Vec::new(),
        }
    }

    /// Appends a process.
    pub fn with_process(mut self, pid: Pid, start: SimTime, events: Vec<Event>) -> Self {
        self.processes.push(ProcessSpec::new(pid, start, events));
        self
    }

    /// Returns a copy of this workload with a different core count.
    pub fn with_cores(&self, cores: usize) -> Self {
        Self {
            cores,
            processes: self.processes.clone(),
        }
    }

    /// Total number of events over all programs.
    pub fn event_count(&self) -> usize {
        self.processes.iter().map(|p| p.events.len()).sum()
    }

    /// Checks the workload before a simulation is built from it.
    pub fn validate(&self) -> WorkloadResult<()> {
        if self.cores == 0 {
            return Err(WorkloadError::ZeroCores);
        }
        if self.processes.is_empty() {
            return Err(WorkloadError::NoProcesses);
        }

        let mut pids = HashSet::new();
        for process in &self.processes {
            if !pids.insert(process.pid) {
                return Err(WorkloadError::DuplicatePid(process.pid));
            }
            if process.events.is_empty() {
                return Err(WorkloadError::EmptyProgram(process.pid));
            }
            if process.events.iter().any(|e| e.duration == 0) {
                tracing::warn!("Process {} has zero-duration events", process.pid);
            }
        }

        self.time_horizon().ok_or(WorkloadError::TimeOverflow)?;
        Ok(())
    }

    /// Latest start plus the duration of every event in the workload.
    ///
    /// No process clock and no busy-time total of a run can exceed this.
    /// Returns `None` if it does not fit in [`SimTime`].
    pub fn time_horizon(&self) -> Option<SimTime> {
        let latest_start = self.processes.iter().map(|p| p.start).max().unwrap_or(0);
        self.processes
            .iter()
            .flat_map(|p| p.events.iter())
            .try_fold(latest_start, |total, e| total.checked_add(e.duration))
    }
}
