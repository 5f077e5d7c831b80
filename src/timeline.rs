//! The global event timeline.
//!
//! The timeline holds every process that has a pending event and always
//! yields the one with the smallest simulated time. Equal times are resolved
//! by an explicit [`TieBreak`] and, after that, by insertion order, so a run
//! is fully reproducible.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Pid, ProcessHandle, SimTime};

/// How the timeline orders processes that share a simulated time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// First inserted, first popped
    #[default]
    Fifo,
    /// Lowest process id first, then insertion order
    Pid,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::Fifo => f.write_str("fifo"),
            TieBreak::Pid => f.write_str("pid"),
        }
    }
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fifo" => Ok(TieBreak::Fifo),
            "pid" => Ok(TieBreak::Pid),
            other => Err(format!("unknown tie-break rule: {}", other)),
        }
    }
}

/// Heap key: time, tie-break key, insertion sequence.
type Entry = Reverse<(SimTime, u64, u64, ProcessHandle)>;

/// Priority structure over process handles ordered by simulated time.
#[derive(Debug, Default)]
pub struct EventTimeline {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    tie_break: TieBreak,
}

impl EventTimeline {
    /// Creates an empty timeline with FIFO tie-breaking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty timeline with the given tie-break rule.
    pub fn with_tie_break(tie_break: TieBreak) -> Self {
        Self {
            tie_break,
            ..Self::default()
        }
    }

    /// Returns the tie-break rule.
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Schedules `handle` at `time`.
    pub fn push(&mut self, handle: ProcessHandle, pid: Pid, time: SimTime) {
        let key = match self.tie_break {
            TieBreak::Fifo => 0,
            TieBreak::Pid => u64::from(pid),
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((time, key, seq, handle)));
    }

    /// Removes and returns the next due process and its time.
    pub fn pop(&mut self) -> Option<(ProcessHandle, SimTime)> {
        self.heap
            .pop()
            .map(|Reverse((time, _, _, handle))| (handle, time))
    }

    /// Time of the next due process.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse((time, ..))| *time)
    }

    /// True if `handle` is scheduled.
    pub fn contains(&self, handle: ProcessHandle) -> bool {
        self.heap.iter().any(|Reverse((.., h))| *h == handle)
    }

    /// Number of scheduled processes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(index: usize) -> ProcessHandle {
        ProcessHandle::new(index)
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut timeline = EventTimeline::new();
        timeline.push(h(0), 1, 30);
        timeline.push(h(1), 2, 10);
        timeline.push(h(2), 3, 20);

        assert_eq!(timeline.peek_time(), Some(10));
        assert_eq!(timeline.pop(), Some((h(1), 10)));
        assert_eq!(timeline.pop(), Some((h(2), 20)));
        assert_eq!(timeline.pop(), Some((h(0), 30)));
        assert_eq!(timeline.pop(), None);
    }

    #[test]
    fn test_fifo_ties() {
        let mut timeline = EventTimeline::new();
        timeline.push(h(2), 9, 5);
        timeline.push(h(0), 1, 5);
        timeline.push(h(1), 4, 5);

        assert_eq!(timeline.pop(), Some((h(2), 5)));
        assert_eq!(timeline.pop(), Some((h(0), 5)));
        assert_eq!(timeline.pop(), Some((h(1), 5)));
    }

    #[test]
    fn test_pid_ties() {
        let mut timeline = EventTimeline::with_tie_break(TieBreak::Pid);
        timeline.push(h(2), 9, 5);
        timeline.push(h(0), 1, 5);
        timeline.push(h(1), 4, 5);
        timeline.push(h(3), 0, 6);

        assert_eq!(timeline.pop(), Some((h(0), 5)));
        assert_eq!(timeline.pop(), Some((h(1), 5)));
        assert_eq!(timeline.pop(), Some((h(2), 5)));
        assert_eq!(timeline.pop(), Some((h(3), 6)));
    }

    #[test]
    fn test_contains_and_len() {
        let mut timeline = EventTimeline::new();
        assert!(timeline.is_empty());

        timeline.push(h(4), 4, 0);
        assert!(timeline.contains(h(4)));
        assert!(!timeline.contains(h(5)));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_tie_break_parsing() {
        assert_eq!("fifo".parse::<TieBreak>(), Ok(TieBreak::Fifo));
        assert_eq!("PID".parse::<TieBreak>(), Ok(TieBreak::Pid));
        assert!("random".parse::<TieBreak>().is_err());
        assert_eq!(TieBreak::Pid.to_string(), "pid");
    }
}
