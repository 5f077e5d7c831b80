//! Statistics collection and export.
//!
//! The [`StatsAggregator`] is owned by the simulator and updated by the
//! resource managers while the run progresses. At the end of a run it is
//! turned into a [`SimulationSummary`], which can be exported as the classic
//! text block, JSON or CSV.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::types::SimTime;

/// Running counters of one simulation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsAggregator {
    /// Sum of all granted core durations
    pub core_busy_time: SimTime,
    /// Sum of all granted SSD durations
    pub storage_busy_time: SimTime,
    /// Number of granted SSD requests
    pub storage_accesses: u64,
    /// Number of granted core requests
    pub core_grants: u64,
    /// Number of user interactions
    pub interactions: u64,
    /// Time of the last termination
    pub makespan: SimTime,
}

impl StatsAggregator {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for a granted core request.
    pub fn record_core(&mut self, duration: SimTime) {
        self.core_busy_time += duration;
        self.core_grants += 1;
    }

    /// Accounts for a granted SSD request.
    pub fn record_storage(&mut self, duration: SimTime) {
        self.storage_busy_time += duration;
        self.storage_accesses += 1;
    }

    /// Accounts for a user interaction.
    pub fn record_interaction(&mut self) {
        self.interactions += 1;
    }

    /// Records a termination at `time`.
    ///
    /// Terminations are driven in time order, so this only ever moves the
    /// makespan forward.
    pub fn record_termination(&mut self, time: SimTime) {
        debug_assert!(time >= self.makespan, "termination out of time order");
        self.makespan = self.makespan.max(time);
    }

    /// `core_busy_time / makespan`: average number of busy cores.
    pub fn average_busy_cores(&self) -> f64 {
        ratio(self.core_busy_time, self.makespan)
    }

    /// `storage_busy_time / makespan`.
    pub fn storage_utilization(&self) -> f64 {
        ratio(self.storage_busy_time, self.makespan)
    }
}

fn ratio(busy: SimTime, makespan: SimTime) -> f64 {
    if makespan == 0 {
        0.0
    } else {
        busy as f64 / makespan as f64
    }
}

/// Final figures of a simulation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Time at which the last process terminated
    pub makespan: SimTime,
    /// Number of processes that terminated
    pub completed_processes: usize,
    /// Number of granted SSD requests
    pub storage_accesses: u64,
    /// `core_busy_time / makespan`
    pub average_busy_cores: f64,
    /// `storage_busy_time / makespan`
    pub storage_utilization: f64,
    /// Number of cores in the pool
    pub cores: usize,
    /// Sum of granted core durations
    pub core_busy_time: SimTime,
    /// Sum of granted SSD durations
    pub storage_busy_time: SimTime,
    /// Number of user interactions
    pub interactions: u64,
    /// Number of driver steps executed
    pub steps: u64,
}

impl SimulationSummary {
    /// Builds a summary from the run's counters.
    pub fn from_aggregator(
        stats: &StatsAggregator,
        cores: usize,
        completed_processes: usize,
        steps: u64,
    ) -> Self {
        Self {
            makespan: stats.makespan,
            completed_processes,
            storage_accesses: stats.storage_accesses,
            average_busy_cores: stats.average_busy_cores(),
            storage_utilization: stats.storage_utilization(),
            cores,
            core_busy_time: stats.core_busy_time,
            storage_busy_time: stats.storage_busy_time,
            interactions: stats.interactions,
            steps,
        }
    }

    /// Exports the summary to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports the summary to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports the summary as `metric,value` CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");
        csv.push_str(&format!("makespan,{}\n", self.makespan));
        csv.push_str(&format!("completed_processes,{}\n", self.completed_processes));
        csv.push_str(&format!("storage_accesses,{}\n", self.storage_accesses));
        csv.push_str(&format!("average_busy_cores,{:.6}\n", self.average_busy_cores));
        csv.push_str(&format!("storage_utilization,{:.6}\n", self.storage_utilization));
        csv.push_str(&format!("cores,{}\n", self.cores));
        csv.push_str(&format!("core_busy_time,{}\n", self.core_busy_time));
        csv.push_str(&format!("storage_busy_time,{}\n", self.storage_busy_time));
        csv.push_str(&format!("interactions,{}\n", self.interactions));
        csv.push_str(&format!("steps,{}\n", self.steps));

        csv
    }

    /// Exports the summary as CSV to a file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Writes the classic summary block.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        w.write_all(self.summary().as_bytes())
    }

    /// Returns the classic summary block as a string.
    pub fn summary(&self) -> String {
        let mut text = String::new();

        text.push_str("================SUMMARY================\n");
        text.push_str(&format!("Total elapsed time: {} ms\n", self.makespan));
        text.push_str(&format!(
            "Number of completed processes: {}\n",
            self.completed_processes
        ));
        text.push_str(&format!(
            "Total number of SSD accesses: {}\n",
            self.storage_accesses
        ));
        text.push_str(&format!(
            "Average number of busy cores: {:.6}\n",
            self.average_busy_cores
        ));
        text.push_str(&format!("SSD utilization: {:.6}\n", self.storage_utilization));

        text
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}
