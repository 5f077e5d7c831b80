//! The core pool.
//!
//! `total` identical cores are handed out first come, first served. When no
//! core is free the requester waits in one of two FIFO queues. On release the
//! interactive queue is always drained before the non-interactive one, even
//! if that starves non-interactive work.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::process::LifecycleState;
use crate::resources::{RequestOutcome, StepContext};
use crate::trace::TraceRecord;
use crate::types::{ProcessHandle, SimTime};

/// The two wait classes of the core pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueClass {
    /// Waiting after a user interaction; admitted first
    Interactive,
    /// Everything else
    NonInteractive,
}

impl QueueClass {
    /// Maps an event's interactive flag to its wait class.
    pub fn from_interactive(interactive: bool) -> Self {
        if interactive {
            QueueClass::Interactive
        } else {
            QueueClass::NonInteractive
        }
    }

    /// Short queue name used in the text trace.
    pub fn queue_name(self) -> &'static str {
        match self {
            QueueClass::Interactive => "I",
            QueueClass::NonInteractive => "NI",
        }
    }
}

impl fmt::Display for QueueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.queue_name())
    }
}

/// A fixed number of interchangeable cores and their wait queues.
#[derive(Debug)]
pub struct CorePool {
    total: usize,
    free: usize,
    interactive: VecDeque<ProcessHandle>,
    non_interactive: VecDeque<ProcessHandle>,
}

impl CorePool {
    /// Creates a pool with `total` free cores.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            free: total,
            interactive: VecDeque::new(),
            non_interactive: VecDeque::new(),
        }
    }

    /// Number of cores in the pool.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of free cores.
    pub fn free(&self) -> usize {
        self.free
    }

    /// Number of busy cores.
    pub fn busy(&self) -> usize {
        self.total - self.free
    }

    /// Number of processes waiting in the given class.
    pub fn queue_len(&self, class: QueueClass) -> usize {
        self.queue(class).len()
    }

    /// Processes waiting in the given class, head first.
    pub fn waiting(&self, class: QueueClass) -> impl Iterator<Item = ProcessHandle> + '_ {
        self.queue(class).iter().copied()
    }

    /// The class `handle` is waiting in, if it is waiting at all.
    pub fn queue_of(&self, handle: ProcessHandle) -> Option<QueueClass> {
        [QueueClass::Interactive, QueueClass::NonInteractive]
            .into_iter()
            .find(|&class| self.queue(class).contains(&handle))
    }

    fn queue(&self, class: QueueClass) -> &VecDeque<ProcessHandle> {
        match class {
            QueueClass::Interactive => &self.interactive,
            QueueClass::NonInteractive => &self.non_interactive,
        }
    }

    fn queue_mut(&mut self, class: QueueClass) -> &mut VecDeque<ProcessHandle> {
        match class {
            QueueClass::Interactive => &mut self.interactive,
            QueueClass::NonInteractive => &mut self.non_interactive,
        }
    }

    /// Asks for a core for `duration`.
    ///
    /// On a grant the process runs from its current time and its clock moves
    /// to the release time. Otherwise it is parked in the `class` queue and
    /// must not be put back on the timeline by the caller.
    pub fn request(
        &mut self,
        ctx: &mut StepContext<'_>,
        handle: ProcessHandle,
        duration: SimTime,
        class: QueueClass,
    ) -> RequestOutcome {
        let process = &mut ctx.processes[handle];
        let pid = process.pid;
        ctx.trace.push(TraceRecord::CoreRequested {
            pid,
            time: process.current_time,
            duration,
        });

        if self.free > 0 {
            self.free -= 1;
            process.current_time += duration;
            process.state = LifecycleState::Running;
            process.auto_requeue = true;
            let release_at = process.current_time;

            ctx.stats.record_core(duration);
            ctx.trace.push(TraceRecord::CoreGranted { pid, release_at });
            tracing::trace!(pid, release_at, free = self.free, "core granted");
            RequestOutcome::Granted { release_at }
        } else {
            process.auto_requeue = false;
            process.state = LifecycleState::Ready;

            let queue = self.queue_mut(class);
            queue.push_back(handle);
            let depth = queue.len();

            ctx.trace.push(TraceRecord::CoreDeferred { pid, class, depth });
            tracing::trace!(pid, %class, depth, "core request deferred");
            RequestOutcome::Queued { depth }
        }
    }

    /// Gives back the core held by `handle`.
    ///
    /// If anyone is waiting, the head of the interactive queue (or, if that
    /// is empty, of the non-interactive queue) takes the core at the
    /// releaser's completion time. The admitted process is returned so the
    /// caller can put it back on the timeline.
    ///
    /// # Panics
    ///
    /// Panics if no core is busy, or if a waiter has no pending core event.
    pub fn release(
        &mut self,
        ctx: &mut StepContext<'_>,
        handle: ProcessHandle,
    ) -> Option<ProcessHandle> {
        let (pid, now) = {
            let process = &ctx.processes[handle];
            (process.pid, process.current_time)
        };
        assert!(
            self.free < self.total,
            "process {} released a core while all {} cores are free",
            pid,
            self.total
        );
        self.free += 1;
        ctx.trace.push(TraceRecord::CoreReleased { pid, time: now });

        let admitted = match self.interactive.pop_front() {
            Some(next) => Some((next, QueueClass::Interactive)),
            None => self
                .non_interactive
                .pop_front()
                .map(|next| (next, QueueClass::NonInteractive)),
        };

        if let Some((next, class)) = admitted {
            let waiter = &mut ctx.processes[next];
            waiter.current_time = now;
            let Some(pending) = waiter.last_issued() else {
                panic!("process {} waits for a core without a core event", waiter.pid);
            };
            let duration = pending.duration;

            let outcome = self.request(ctx, next, duration, class);
            assert!(outcome.is_granted(), "admitted waiter was not granted a core");
        }

        ctx.processes[handle].state = LifecycleState::Ready;
        admitted.map(|(next, _)| next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::process::ProcessTable;
    use crate::stats::StatsAggregator;
    use crate::workload::Workload;

    struct Fixture {
        processes: ProcessTable,
        stats: StatsAggregator,
        trace: Vec<TraceRecord>,
    }

    impl Fixture {
        fn new(count: u32) -> Self {
            let mut workload = Workload::new(1);
            for pid in 0..count {
                workload = workload.with_process(pid, 0, vec![Event::core(5)]);
            }
            Self {
                processes: ProcessTable::from_workload(&workload),
                stats: StatsAggregator::new(),
                trace: Vec::new(),
            }
        }

        fn ctx(&mut self) -> StepContext<'_> {
            StepContext {
                processes: &mut self.processes,
                stats: &mut self.stats,
                trace: &mut self.trace,
            }
        }

        /// Marks the first event as issued, as the driver does after a request.
        fn issue(&mut self, handle: ProcessHandle) {
            self.processes[handle].cursor = 1;
        }
    }

    fn h(index: usize) -> ProcessHandle {
        ProcessHandle::new(index)
    }

    #[test]
    fn test_grant_when_free() {
        let mut fx = Fixture::new(1);
        let mut pool = CorePool::new(2);

        let outcome = pool.request(&mut fx.ctx(), h(0), 5, QueueClass::NonInteractive);

        assert_eq!(outcome, RequestOutcome::Granted { release_at: 5 });
        assert_eq!(pool.free(), 1);
        assert_eq!(pool.busy(), 1);
        assert_eq!(fx.processes[h(0)].state, LifecycleState::Running);
        assert!(fx.processes[h(0)].auto_requeue);
        assert_eq!(fx.stats.core_busy_time, 5);
    }

    #[test]
    fn test_queue_when_busy() {
        let mut fx = Fixture::new(3);
        let mut pool = CorePool::new(1);

        pool.request(&mut fx.ctx(), h(0), 5, QueueClass::NonInteractive);
        let second = pool.request(&mut fx.ctx(), h(1), 5, QueueClass::NonInteractive);
        let third = pool.request(&mut fx.ctx(), h(2), 5, QueueClass::Interactive);

        assert_eq!(second, RequestOutcome::Queued { depth: 1 });
        assert_eq!(third, RequestOutcome::Queued { depth: 1 });
        assert_eq!(pool.free(), 0);
        assert_eq!(pool.queue_of(h(1)), Some(QueueClass::NonInteractive));
        assert_eq!(pool.queue_of(h(2)), Some(QueueClass::Interactive));
        assert_eq!(pool.queue_of(h(0)), None);
        assert!(!fx.processes[h(1)].auto_requeue);
        assert_eq!(fx.processes[h(1)].state, LifecycleState::Ready);
        assert_eq!(fx.processes[h(1)].current_time, 0);
        assert_eq!(fx.stats.core_busy_time, 5);
    }

    #[test]
    fn test_release_prefers_interactive() {
        let mut fx = Fixture::new(3);
        let mut pool = CorePool::new(1);

        fx.issue(h(0));
        pool.request(&mut fx.ctx(), h(0), 5, QueueClass::NonInteractive);
        fx.issue(h(1));
        pool.request(&mut fx.ctx(), h(1), 5, QueueClass::NonInteractive);
        fx.issue(h(2));
        pool.request(&mut fx.ctx(), h(2), 5, QueueClass::Interactive);

        let admitted = pool.release(&mut fx.ctx(), h(0));

        assert_eq!(admitted, Some(h(2)));
        assert_eq!(fx.processes[h(2)].state, LifecycleState::Running);
        assert_eq!(fx.processes[h(2)].current_time, 10);
        assert_eq!(fx.processes[h(0)].state, LifecycleState::Ready);
        assert_eq!(pool.free(), 0);
        assert_eq!(pool.queue_len(QueueClass::Interactive), 0);
        assert_eq!(pool.queue_len(QueueClass::NonInteractive), 1);
    }

    #[test]
    fn test_release_without_waiters() {
        let mut fx = Fixture::new(1);
        let mut pool = CorePool::new(1);

        fx.issue(h(0));
        pool.request(&mut fx.ctx(), h(0), 5, QueueClass::NonInteractive);
        let admitted = pool.release(&mut fx.ctx(), h(0));

        assert_eq!(admitted, None);
        assert_eq!(pool.free(), 1);
        assert_eq!(
            fx.trace.last(),
            Some(&TraceRecord::CoreReleased { pid: 0, time: 5 })
        );
    }

    #[test]
    #[should_panic(expected = "released a core")]
    fn test_double_release_panics() {
        let mut fx = Fixture::new(1);
        let mut pool = CorePool::new(1);
        pool.release(&mut fx.ctx(), h(0));
    }

    #[test]
    fn test_trace_records() {
        let mut fx = Fixture::new(2);
        let mut pool = CorePool::new(1);

        pool.request(&mut fx.ctx(), h(0), 5, QueueClass::NonInteractive);
        pool.request(&mut fx.ctx(), h(1), 5, QueueClass::NonInteractive);

        assert_eq!(
            fx.trace,
            vec![
                TraceRecord::CoreRequested { pid: 0, time: 0, duration: 5 },
                TraceRecord::CoreGranted { pid: 0, release_at: 5 },
                TraceRecord::CoreRequested { pid: 1, time: 0, duration: 5 },
                TraceRecord::CoreDeferred {
                    pid: 1,
                    class: QueueClass::NonInteractive,
                    depth: 1,
                },
            ]
        );
    }
}
