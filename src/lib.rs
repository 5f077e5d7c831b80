//! # procsim
//!
//! A discrete-event simulator of operating-system process scheduling over a
//! small set of contended resources: a pool of identical cores, a single SSD
//! and an always-available user (TTY).
//!
//! ## Model
//!
//! - **Programs**: every process replays a fixed list of resource requests
//!   (`CORE`, `SSD`, `TTY`), each with a duration.
//! - **Event timeline**: the driver always advances the process with the
//!   smallest simulated clock; ties are broken deterministically.
//! - **Cores**: when none is free the process waits in the interactive or the
//!   non-interactive queue. Interactive waiters are always admitted first.
//! - **SSD**: one device, one FIFO queue.
//! - **TTY**: never queues; finishing an interaction makes the next core
//!   request of the process interactive.
//! - **No preemption**: a granted resource is held for its full duration.
//!
//! ## Features
//!
//! - `parallel` - Run core-count sweeps on rayon's thread pool
//!
//! ## Quick Start
//!
//! ```rust
//! use procsim::{parse_workload, Simulator, TraceLog};
//!
//! let workload = parse_workload(
//!     "NCORES 1\nSTART 0\nPID 1\nCORE 10\nSTART 0\nPID 2\nTTY 3\nCORE 4\nEND\n",
//! )
//! .unwrap();
//!
//! let mut sim = Simulator::new(&workload).unwrap();
//! let mut log = TraceLog::new();
//! let summary = sim.run_with(&mut log).unwrap();
//!
//! assert_eq!(summary.makespan, 14);
//! assert_eq!(summary.completed_processes, 2);
//! println!("{}", log.to_text());
//! println!("{}", summary.summary());
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use procsim::config::SimConfig;
//!
//! let config = SimConfig::from_yaml_file("run.yaml")?;
//! // ... build a Simulator from config.workload
//! ```

pub mod types;
pub mod event;
pub mod workload;
pub mod process;
pub mod timeline;
pub mod trace;
pub mod resources;
pub mod engine;
pub mod stats;
pub mod render;
pub mod loader;
pub mod config;
pub mod sweep;

// Re-export commonly used types
pub use types::{Pid, ProcessHandle, SimTime};
pub use event::{Event, EventKind};
pub use workload::{ProcessSpec, Workload, WorkloadError};
pub use process::{LifecycleState, Process, ProcessTable, ProcessTableSnapshot};
pub use timeline::{EventTimeline, TieBreak};
pub use trace::{StepTrace, TraceRecord};
pub use resources::{CorePool, InteractionChannel, QueueClass, StorageDevice};
pub use engine::{ProcessLocation, Simulator};
pub use stats::{SimulationSummary, StatsAggregator, Timer};
pub use render::{JsonTraceWriter, NullSink, TextTraceWriter, TraceLog, TraceSink};
pub use loader::{load_workload_file, parse_workload, LoadError};
pub use config::{ConfigError, SimConfig, SimConfigBuilder, StatsFormat, TraceFormat};
pub use sweep::{sweep_cores, SweepPoint};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// takes precedence over `level`.
///
/// # Example
///
/// ```rust,ignore
/// procsim::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
