//! The simulation driver.
//!
//! [`Simulator`] owns the whole run: the process arena, the event timeline,
//! the three resource managers and the statistics. Each call to
//! [`Simulator::step`] pops the next due process and drives it through one
//! transition:
//!
//! 1. release the resource of the event that just finished
//! 2. process the arrival, on the first appearance
//! 3. terminate the process if its program is exhausted
//! 4. otherwise issue the next event's request
//! 5. put the process back on the timeline if the request was granted
//!
//! Processes whose request was deferred sit in a wait queue until the
//! resource's release admits them.

use crate::event::EventKind;
use crate::process::{LifecycleState, ProcessTable};
use crate::render::TraceSink;
use crate::resources::{CorePool, InteractionChannel, QueueClass, StepContext, StorageDevice};
use crate::stats::{SimulationSummary, StatsAggregator};
use crate::timeline::{EventTimeline, TieBreak};
use crate::trace::{StepTrace, TraceRecord};
use crate::types::{Pid, ProcessHandle, SimTime};
use crate::workload::{Workload, WorkloadResult};

/// Where a process currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessLocation {
    /// Scheduled on the event timeline
    Timeline,
    /// Waiting for a core in the given class
    CoreQueue(QueueClass),
    /// Waiting for the SSD
    StorageQueue,
    /// Program finished
    Terminated,
}

/// The discrete-event scheduling simulator.
///
/// # Example
///
/// ```
/// use procsim::{Event, Simulator, Workload};
///
/// let workload = Workload::new(1)
///     .with_process(0, 0, vec![Event::core(5)])
///     .with_process(1, 0, vec![Event::core(5)]);
///
/// let mut sim = Simulator::new(&workload).unwrap();
/// let summary = sim.run();
///
/// assert_eq!(summary.makespan, 10);
/// assert_eq!(summary.completed_processes, 2);
/// ```
#[derive(Debug)]
pub struct Simulator {
    processes: ProcessTable,
    timeline: EventTimeline,
    cores: CorePool,
    storage: StorageDevice,
    tty: InteractionChannel,
    stats: StatsAggregator,
    steps: u64,
}

impl Simulator {
    /// Validates `workload` and builds a simulator with FIFO tie-breaking.
    pub fn new(workload: &Workload) -> WorkloadResult<Self> {
        Self::with_tie_break(workload, TieBreak::default())
    }

    /// Validates `workload` and builds a simulator with the given tie-break.
    ///
    /// Every process is scheduled at its start time, in load order.
    pub fn with_tie_break(workload: &Workload, tie_break: TieBreak) -> WorkloadResult<Self> {
        workload.validate()?;

        let processes = ProcessTable::from_workload(workload);
        let mut timeline = EventTimeline::with_tie_break(tie_break);
        for handle in processes.handles() {
            let process = &processes[handle];
            timeline.push(handle, process.pid, process.current_time);
        }

        tracing::debug!(
            cores = workload.cores,
            processes = processes.len(),
            %tie_break,
            "simulator initialized"
        );

        Ok(Self {
            processes,
            timeline,
            cores: CorePool::new(workload.cores),
            storage: StorageDevice::new(),
            tty: InteractionChannel::new(),
            stats: StatsAggregator::new(),
            steps: 0,
        })
    }

    /// True once every process has terminated.
    pub fn is_finished(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Simulated time of the next due process.
    pub fn next_time(&self) -> Option<SimTime> {
        self.timeline.peek_time()
    }

    /// Number of steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The process arena.
    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// The core pool.
    pub fn core_pool(&self) -> &CorePool {
        &self.cores
    }

    /// The storage device.
    pub fn storage(&self) -> &StorageDevice {
        &self.storage
    }

    /// The run's counters.
    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    /// Where the process with handle `handle` currently lives.
    ///
    /// Returns `None` if the process is nowhere, which never happens in a
    /// consistent run.
    pub fn location(&self, handle: ProcessHandle) -> Option<ProcessLocation> {
        let process = self.processes.get(handle)?;
        if process.state == LifecycleState::Terminated {
            return Some(ProcessLocation::Terminated);
        }
        if self.timeline.contains(handle) {
            return Some(ProcessLocation::Timeline);
        }
        if let Some(class) = self.cores.queue_of(handle) {
            return Some(ProcessLocation::CoreQueue(class));
        }
        if self.storage.is_waiting(handle) {
            return Some(ProcessLocation::StorageQueue);
        }
        None
    }

    /// Number of places that currently hold `handle`: the timeline, each
    /// wait queue, and the terminated set. Always 1 in a consistent run.
    pub fn membership_count(&self, handle: ProcessHandle) -> usize {
        let terminated = self
            .processes
            .get(handle)
            .is_some_and(|p| p.state == LifecycleState::Terminated);

        [
            self.timeline.contains(handle),
            self.cores.queue_of(handle).is_some(),
            self.storage.is_waiting(handle),
            terminated,
        ]
        .into_iter()
        .filter(|&member| member)
        .count()
    }

    /// Executes one driver step.
    ///
    /// Returns `None` when the timeline is empty and the run is over.
    pub fn step(&mut self) -> Option<StepTrace> {
        let (handle, time) = self.timeline.pop()?;
        self.steps += 1;

        let mut records = Vec::new();
        let mut ctx = StepContext {
            processes: &mut self.processes,
            stats: &mut self.stats,
            trace: &mut records,
        };
        let pid = ctx.processes[handle].pid;
        tracing::debug!(step = self.steps, pid, time, "driving process");

        // Completion of the event that just finished.
        if ctx.processes[handle].state.is_busy() {
            let Some(finished) = ctx.processes[handle].last_issued().copied() else {
                panic!("process {} is busy without an issued event", pid);
            };
            let admitted = match finished.kind {
                EventKind::Core => self.cores.release(&mut ctx, handle),
                EventKind::Storage => self.storage.release(&mut ctx, handle),
                EventKind::Interact => {
                    self.tty.release(&mut ctx, handle);
                    None
                }
            };
            if let Some(next) = admitted {
                let waiter = &ctx.processes[next];
                self.timeline.push(next, waiter.pid, waiter.current_time);
            }
        }

        // First appearance.
        if !ctx.processes[handle].has_arrived {
            let table = ctx.processes.snapshot();
            ctx.trace.push(TraceRecord::Arrival { pid, time, table });
            let process = &mut ctx.processes[handle];
            process.state = LifecycleState::Ready;
            process.has_arrived = true;
        }

        if ctx.processes[handle].is_exhausted() {
            let process = &mut ctx.processes[handle];
            process.state = LifecycleState::Terminated;
            process.auto_requeue = false;
            let end = process.current_time;

            ctx.stats.record_termination(end);
            let table = ctx.processes.snapshot();
            ctx.trace.push(TraceRecord::Termination {
                pid,
                time: end,
                table,
            });
            tracing::debug!(pid, time = end, "process terminated");

            return Some(self.finish_step(pid, time, records, true));
        }

        let process = &ctx.processes[handle];
        let Some(&event) = process.next_event() else {
            panic!("process {} has no event at cursor {}", pid, process.cursor);
        };
        match event.kind {
            EventKind::Core => {
                let class = QueueClass::from_interactive(event.interactive);
                self.cores.request(&mut ctx, handle, event.duration, class);
            }
            EventKind::Storage => {
                self.storage.request(&mut ctx, handle, event.duration);
            }
            EventKind::Interact => {
                self.tty.request(&mut ctx, handle, event.duration);
            }
        }

        let process = &mut ctx.processes[handle];
        process.cursor += 1;
        if process.auto_requeue {
            self.timeline.push(handle, process.pid, process.current_time);
        }

        Some(self.finish_step(pid, time, records, false))
    }

    fn finish_step(
        &self,
        pid: Pid,
        time: SimTime,
        records: Vec<TraceRecord>,
        terminated: bool,
    ) -> StepTrace {
        StepTrace {
            step: self.steps,
            pid,
            time,
            records,
            terminated,
            timeline_drained: self.timeline.is_empty(),
        }
    }

    /// Runs until every process has terminated and returns the summary.
    pub fn run(&mut self) -> SimulationSummary {
        while self.step().is_some() {}
        self.log_finish();
        self.summary()
    }

    /// Runs to completion, feeding every step and the summary to `sink`.
    pub fn run_with<S: TraceSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> std::io::Result<SimulationSummary> {
        while let Some(step) = self.step() {
            sink.on_step(&step)?;
        }
        self.log_finish();
        let summary = self.summary();
        sink.finish(&summary)?;
        Ok(summary)
    }

    fn log_finish(&self) {
        tracing::info!(
            steps = self.steps,
            makespan = self.stats.makespan,
            storage_accesses = self.stats.storage_accesses,
            "simulation finished"
        );
    }

    /// Final figures of the run so far.
    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary::from_aggregator(
            &self.stats,
            self.cores.total(),
            self.processes.terminated_count(),
            self.steps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn h(index: usize) -> ProcessHandle {
        ProcessHandle::new(index)
    }

    #[test]
    fn test_simulator_creation() {
        let workload = Workload::new(2).with_process(1, 0, vec![Event::core(3)]);
        let sim = Simulator::new(&workload).unwrap();

        assert_eq!(sim.core_pool().total(), 2);
        assert_eq!(sim.next_time(), Some(0));
        assert_eq!(sim.location(h(0)), Some(ProcessLocation::Timeline));
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_invalid_workload_rejected() {
        assert!(Simulator::new(&Workload::new(0)).is_err());
    }

    #[test]
    fn test_first_step_arrives_and_requests() {
        let workload = Workload::new(1).with_process(4, 7, vec![Event::core(3)]);
        let mut sim = Simulator::new(&workload).unwrap();

        let step = sim.step().unwrap();

        assert_eq!(step.step, 1);
        assert_eq!(step.pid, 4);
        assert_eq!(step.time, 7);
        assert!(!step.terminated);
        assert!(matches!(step.records[0], TraceRecord::Arrival { pid: 4, time: 7, .. }));
        assert_eq!(
            step.records[1],
            TraceRecord::CoreRequested { pid: 4, time: 7, duration: 3 }
        );
        assert_eq!(sim.processes()[h(0)].state, LifecycleState::Running);
        assert_eq!(sim.processes()[h(0)].cursor, 1);
        assert_eq!(sim.next_time(), Some(10));
    }

    #[test]
    fn test_termination_step() {
        let workload = Workload::new(1).with_process(4, 0, vec![Event::storage(2)]);
        let mut sim = Simulator::new(&workload).unwrap();

        sim.step();
        let last = sim.step().unwrap();

        assert!(last.terminated);
        assert!(last.timeline_drained);
        assert_eq!(sim.location(h(0)), Some(ProcessLocation::Terminated));
        assert!(sim.step().is_none());
        assert_eq!(sim.stats().makespan, 2);
    }

    #[test]
    fn test_waiter_location() {
        let workload = Workload::new(1)
            .with_process(1, 0, vec![Event::core(5)])
            .with_process(2, 0, vec![Event::core(5)]);
        let mut sim = Simulator::new(&workload).unwrap();

        sim.step();
        sim.step();

        assert_eq!(
            sim.location(h(1)),
            Some(ProcessLocation::CoreQueue(QueueClass::NonInteractive))
        );
        assert_eq!(sim.location(h(0)), Some(ProcessLocation::Timeline));
        assert_eq!(sim.membership_count(h(0)), 1);
        assert_eq!(sim.membership_count(h(1)), 1);
    }

    #[test]
    fn test_run_summary() {
        let workload = Workload::new(2)
            .with_process(1, 0, vec![Event::core(4), Event::storage(2)])
            .with_process(2, 1, vec![Event::core(4)]);
        let mut sim = Simulator::new(&workload).unwrap();

        let summary = sim.run();

        assert!(sim.is_finished());
        assert_eq!(summary.makespan, 6);
        assert_eq!(summary.completed_processes, 2);
        assert_eq!(summary.storage_accesses, 1);
        assert_eq!(summary.core_busy_time, 8);
        assert_eq!(summary.cores, 2);
    }
}
