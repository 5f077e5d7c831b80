//! Loader for the line-oriented workload format.
//!
//! # Format
//!
//! ```text
//! NCORES 2
//! START 0
//! PID 1
//! CORE 10
//! SSD 2
//! TTY 5
//! CORE 3
//! START 4
//! PID 2
//! CORE 8
//! END
//! ```
//!
//! Every line is a keyword followed by a non-negative integer. `START`
//! opens a new process that arrives at the given time; the events that follow
//! belong to it until the next `START`. `END` (or the end of the input)
//! closes the workload. Blank lines are ignored.

use std::path::Path;

use thiserror::Error;

use crate::event::{Event, EventKind};
use crate::types::{Pid, SimTime};
use crate::workload::{ProcessSpec, Workload, WorkloadError};

/// Errors that can occur while loading a workload.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: unknown keyword `{keyword}`")]
    UnknownKeyword { line: usize, keyword: String },

    #[error("line {line}: missing value after `{keyword}`")]
    MissingValue { line: usize, keyword: String },

    #[error("line {line}: invalid value `{value}`, expected a non-negative integer")]
    InvalidValue { line: usize, value: String },

    #[error("line {line}: unexpected trailing input `{rest}`")]
    TrailingInput { line: usize, rest: String },

    #[error("line {line}: `{keyword}` before any START")]
    OutsideProcess { line: usize, keyword: String },

    #[error("line {line}: process started here has no PID")]
    MissingPid { line: usize },

    #[error("line {line}: PID given twice for the same process")]
    DuplicatePidLine { line: usize },

    #[error("line {line}: NCORES given twice")]
    DuplicateCores { line: usize },

    #[error("missing NCORES")]
    MissingCores,

    #[error("invalid workload: {0}")]
    Workload(#[from] WorkloadError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A process being assembled by the parser.
struct PendingProcess {
    start_line: usize,
    start: SimTime,
    pid: Option<Pid>,
    events: Vec<Event>,
}

impl PendingProcess {
    fn finish(self) -> LoadResult<ProcessSpec> {
        let pid = self.pid.ok_or(LoadError::MissingPid {
            line: self.start_line,
        })?;
        Ok(ProcessSpec::new(pid, self.start, self.events))
    }
}

/// Parses a workload from text and validates it.
pub fn parse_workload(input: &str) -> LoadResult<Workload> {
    let mut cores = None;
    let mut processes = Vec::new();
    let mut current: Option<PendingProcess> = None;

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        if keyword == "END" {
            break;
        }

        let value = tokens.next().ok_or_else(|| LoadError::MissingValue {
            line,
            keyword: keyword.to_string(),
        })?;
        let rest: Vec<&str> = tokens.collect();
        if !rest.is_empty() {
            return Err(LoadError::TrailingInput {
                line,
                rest: rest.join(" "),
            });
        }
        let value: u64 = value.parse().map_err(|_| LoadError::InvalidValue {
            line,
            value: value.to_string(),
        })?;

        match keyword {
            "NCORES" => {
                if cores.is_some() {
                    return Err(LoadError::DuplicateCores { line });
                }
                cores = Some(to_usize(value, line)?);
            }
            "START" => {
                if let Some(done) = current.take() {
                    processes.push(done.finish()?);
                }
                current = Some(PendingProcess {
                    start_line: line,
                    start: value,
                    pid: None,
                    events: Vec::new(),
                });
            }
            "PID" => {
                let process = current.as_mut().ok_or_else(|| LoadError::OutsideProcess {
                    line,
                    keyword: keyword.to_string(),
                })?;
                if process.pid.is_some() {
                    return Err(LoadError::DuplicatePidLine { line });
                }
                let pid = Pid::try_from(value).map_err(|_| LoadError::InvalidValue {
                    line,
                    value: value.to_string(),
                })?;
                process.pid = Some(pid);
            }
            other => {
                let kind: EventKind = other.parse().map_err(|_| LoadError::UnknownKeyword {
                    line,
                    keyword: other.to_string(),
                })?;
                let process = current.as_mut().ok_or_else(|| LoadError::OutsideProcess {
                    line,
                    keyword: other.to_string(),
                })?;
                process.events.push(Event::new(kind, value));
            }
        }
    }

    if let Some(done) = current.take() {
        processes.push(done.finish()?);
    }

    let workload = Workload {
        cores: cores.ok_or(LoadError::MissingCores)?,
        processes,
    };
    workload.validate()?;

    tracing::debug!(
        cores = workload.cores,
        processes = workload.processes.len(),
        events = workload.event_count(),
        "workload loaded"
    );
    Ok(workload)
}

/// Reads and parses a workload file.
pub fn load_workload_file<P: AsRef<Path>>(path: P) -> LoadResult<Workload> {
    let content = std::fs::read_to_string(path)?;
    parse_workload(&content)
}

fn to_usize(value: u64, line: usize) -> LoadResult<usize> {
    usize::try_from(value).map_err(|_| LoadError::InvalidValue {
        line,
        value: value.to_string(),
    })
}
