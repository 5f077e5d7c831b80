//! Core type definitions for the simulator.
//!
//! This module defines the fundamental types shared by the engine, the
//! resource managers and the loaders.

use serde::{Deserialize, Serialize};

/// Simulated time unit (milliseconds in the rendered trace).
///
/// Process clocks, event durations and the makespan all share this
/// representation.
pub type SimTime = u64;

/// Identifier of a simulated process, as given in the input.
pub type Pid = u32;

/// Stable handle of a process inside the [`ProcessTable`](crate::process::ProcessTable).
///
/// Handles are plain indices into an arena that is fully built before the
/// first handle is issued, so they stay valid for the whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessHandle(usize);

impl ProcessHandle {
    /// Creates a handle from an arena index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index of this handle.
    pub fn index(self) -> usize {
        self.0
    }
}
