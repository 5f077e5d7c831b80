//! Core-count sweeps.
//!
//! A sweep runs one workload several times, once per core count, and reports
//! the summary of each run. The runs share nothing, so with the `parallel`
//! feature they are spread over rayon's thread pool.
//!
//! # Feature Flag
//!
//! Parallel execution requires the `parallel` feature:
//! ```toml
//! [dependencies]
//! procsim = { version = "0.1", features = ["parallel"] }
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use serde::{Deserialize, Serialize};

use crate::engine::Simulator;
use crate::stats::SimulationSummary;
use crate::timeline::TieBreak;
use crate::workload::{Workload, WorkloadResult};

/// Result of one run of a sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Core count of this run
    pub cores: usize,
    /// Summary of this run
    pub summary: SimulationSummary,
}

/// Runs `workload` once per entry of `core_counts`.
///
/// Results come back in the order of `core_counts`. Every workload variant is
/// validated before any run starts.
pub fn sweep_cores(
    workload: &Workload,
    core_counts: &[usize],
    tie_break: TieBreak,
) -> WorkloadResult<Vec<SweepPoint>> {
    let variants = core_counts
        .iter()
        .map(|&cores| {
            let variant = workload.with_cores(cores);
            variant.validate()?;
            Ok(variant)
        })
        .collect::<WorkloadResult<Vec<_>>>()?;

    tracing::debug!(runs = variants.len(), "starting core sweep");

    #[cfg(feature = "parallel")]
    let points: WorkloadResult<Vec<SweepPoint>> = variants
        .par_iter()
        .map(|v| run_point(v, tie_break))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let points: WorkloadResult<Vec<SweepPoint>> = variants
        .iter()
        .map(|v| run_point(v, tie_break))
        .collect();

    points
}

fn run_point(workload: &Workload, tie_break: TieBreak) -> WorkloadResult<SweepPoint> {
    let mut sim = Simulator::with_tie_break(workload, tie_break)?;
    let summary = sim.run();
    Ok(SweepPoint {
        cores: workload.cores,
        summary,
    })
}

/// Exports sweep results as CSV, one row per core count.
pub fn sweep_to_csv(points: &[SweepPoint]) -> String {
    let mut csv = String::new();

    csv.push_str("cores,makespan,average_busy_cores,storage_utilization,storage_accesses\n");
    for point in points {
        csv.push_str(&format!(
            "{},{},{:.6},{:.6},{}\n",
            point.cores,
            point.summary.makespan,
            point.summary.average_busy_cores,
            point.summary.storage_utilization,
            point.summary.storage_accesses,
        ));
    }

    csv
}
