//! The storage device.
//!
//! A single SSD that is either free or busy, with one FIFO wait queue.
//! Interactive processes get no special treatment here.

use std::collections::VecDeque;

use crate::process::LifecycleState;
use crate::resources::{RequestOutcome, StepContext};
use crate::trace::TraceRecord;
use crate::types::{ProcessHandle, SimTime};

/// The single SSD and its wait queue.
#[derive(Debug, Default)]
pub struct StorageDevice {
    busy: bool,
    queue: VecDeque<ProcessHandle>,
}

impl StorageDevice {
    /// Creates a free device with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while some process holds the SSD.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Number of waiting processes.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// True if `handle` waits for the SSD.
    pub fn is_waiting(&self, handle: ProcessHandle) -> bool {
        self.queue.contains(&handle)
    }

    /// Asks for the SSD for `duration`.
    pub fn request(
        &mut self,
        ctx: &mut StepContext<'_>,
        handle: ProcessHandle,
        duration: SimTime,
    ) -> RequestOutcome {
        let process = &mut ctx.processes[handle];
        let pid = process.pid;
        ctx.trace.push(TraceRecord::StorageRequested {
            pid,
            time: process.current_time,
            duration,
        });

        if !self.busy {
            self.busy = true;
            process.current_time += duration;
            process.state = LifecycleState::Blocked;
            process.auto_requeue = true;
            let release_at = process.current_time;

            ctx.stats.record_storage(duration);
            ctx.trace.push(TraceRecord::StorageGranted { pid, release_at });
            tracing::trace!(pid, release_at, "ssd granted");
            RequestOutcome::Granted { release_at }
        } else {
            process.auto_requeue = false;
            process.state = LifecycleState::Ready;
            self.queue.push_back(handle);
            let depth = self.queue.len();

            ctx.trace.push(TraceRecord::StorageDeferred { pid, depth });
            tracing::trace!(pid, depth, "ssd request deferred");
            RequestOutcome::Queued { depth }
        }
    }

    /// Gives back the SSD held by `handle` and admits the next waiter.
    ///
    /// # Panics
    ///
    /// Panics if the SSD is not busy, or if a waiter has no pending event.
    pub fn release(
        &mut self,
        ctx: &mut StepContext<'_>,
        handle: ProcessHandle,
    ) -> Option<ProcessHandle> {
        let (pid, now) = {
            let process = &ctx.processes[handle];
            (process.pid, process.current_time)
        };
        assert!(self.busy, "process {} released the SSD while it was free", pid);
        self.busy = false;
        ctx.trace.push(TraceRecord::StorageReleased { pid, time: now });

        let admitted = self.queue.pop_front();
        if let Some(next) = admitted {
            let waiter = &mut ctx.processes[next];
            waiter.current_time = now;
            let Some(pending) = waiter.last_issued() else {
                panic!("process {} waits for the SSD without an SSD event", waiter.pid);
            };
            let duration = pending.duration;

            let outcome = self.request(ctx, next, duration);
            assert!(outcome.is_granted(), "admitted waiter was not granted the SSD");
        }

        ctx.processes[handle].state = LifecycleState::Ready;
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::process::ProcessTable;
    use crate::stats::StatsAggregator;
    use crate::workload::Workload;

    fn h(index: usize) -> ProcessHandle {
        ProcessHandle::new(index)
    }

    fn table(count: u32) -> ProcessTable {
        let mut workload = Workload::new(1);
        for pid in 0..count {
            workload = workload.with_process(pid, 0, vec![Event::storage(6)]);
        }
        let mut table = ProcessTable::from_workload(&workload);
        for handle in table.handles().collect::<Vec<_>>() {
            table[handle].cursor = 1;
        }
        table
    }

    #[test]
    fn test_fifo_admission() {
        let mut processes = table(3);
        let mut stats = StatsAggregator::new();
        let mut trace = Vec::new();
        let mut ctx = StepContext {
            processes: &mut processes,
            stats: &mut stats,
            trace: &mut trace,
        };
        let mut ssd = StorageDevice::new();

        assert!(ssd.request(&mut ctx, h(0), 6).is_granted());
        assert_eq!(ssd.request(&mut ctx, h(1), 6), RequestOutcome::Queued { depth: 1 });
        assert_eq!(ssd.request(&mut ctx, h(2), 6), RequestOutcome::Queued { depth: 2 });
        assert!(ssd.is_waiting(h(1)));

        assert_eq!(ssd.release(&mut ctx, h(0)), Some(h(1)));
        assert!(ssd.is_busy());
        assert_eq!(ssd.queue_len(), 1);
        assert_eq!(ctx.processes[h(1)].current_time, 12);
        assert_eq!(ctx.processes[h(1)].state, LifecycleState::Blocked);
        assert_eq!(ctx.processes[h(0)].state, LifecycleState::Ready);

        drop(ctx);
        assert_eq!(stats.storage_accesses, 2);
        assert_eq!(stats.storage_busy_time, 12);
    }

    #[test]
    fn test_release_frees_device() {
        let mut processes = table(1);
        let mut stats = StatsAggregator::new();
        let mut trace = Vec::new();
        let mut ctx = StepContext {
            processes: &mut processes,
            stats: &mut stats,
            trace: &mut trace,
        };
        let mut ssd = StorageDevice::new();

        ssd.request(&mut ctx, h(0), 6);
        assert_eq!(ssd.release(&mut ctx, h(0)), None);
        assert!(!ssd.is_busy());
    }

    #[test]
    #[should_panic(expected = "released the SSD")]
    fn test_release_of_free_device_panics() {
        let mut processes = table(1);
        let mut stats = StatsAggregator::new();
        let mut trace = Vec::new();
        let mut ctx = StepContext {
            processes: &mut processes,
            stats: &mut stats,
            trace: &mut trace,
        };
        StorageDevice::new().release(&mut ctx, h(0));
    }
}
