//! Configuration system for the simulator.
//!
//! This module provides YAML/JSON configuration file support for describing
//! how a run is performed and, optionally, the workload itself.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! simulation:
//!   log_level: info
//!   tie_break: fifo
//!   trace_format: text
//!   stats_format: text
//!
//! workload:
//!   cores: 2
//!   processes:
//!     - pid: 1
//!       start: 0
//!       events:
//!         - { kind: CORE, duration: 10 }
//!         - { kind: SSD, duration: 2 }
//!     - pid: 2
//!       start: 4
//!       events:
//!         - { kind: TTY, duration: 5 }
//!         - { kind: CORE, duration: 3 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::event::Event;
use crate::timeline::TieBreak;
use crate::types::{Pid, SimTime};
use crate::workload::{Workload, WorkloadError};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid workload: {0}")]
    Workload(#[from] WorkloadError),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// How step traces are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// Classic human-readable lines
    #[default]
    Text,
    /// One JSON object per step
    Json,
    /// No step trace, summary only
    None,
}

/// How the final summary is written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    /// Classic summary block
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
    /// `metric,value` lines
    Csv,
}

/// Run parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ordering of processes due at the same time
    #[serde(default)]
    pub tie_break: TieBreak,

    /// Step trace output
    #[serde(default)]
    pub trace_format: TraceFormat,

    /// Summary output
    #[serde(default)]
    pub stats_format: StatsFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tie_break: TieBreak::default(),
            trace_format: TraceFormat::default(),
            stats_format: StatsFormat::default(),
        }
    }
}

/// Complete simulator configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Run parameters
    #[serde(default)]
    pub simulation: SimulationParams,

    /// Embedded workload, if the configuration carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<Workload>,
}

impl SimConfig {
    /// Creates a default configuration without a workload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let level = self.simulation.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown log level: {}",
                self.simulation.log_level
            )));
        }

        if let Some(workload) = &self.workload {
            workload.validate()?;
        }

        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating SimConfig programmatically.
#[derive(Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.simulation.log_level = level.into();
        self
    }

    /// Sets the tie-break rule.
    pub fn tie_break(mut self, tie_break: TieBreak) -> Self {
        self.config.simulation.tie_break = tie_break;
        self
    }

    /// Sets the step trace format.
    pub fn trace_format(mut self, format: TraceFormat) -> Self {
        self.config.simulation.trace_format = format;
        self
    }

    /// Sets the summary format.
    pub fn stats_format(mut self, format: StatsFormat) -> Self {
        self.config.simulation.stats_format = format;
        self
    }

    /// Sets the core count, creating the embedded workload if needed.
    pub fn cores(mut self, cores: usize) -> Self {
        self.config
            .workload
            .get_or_insert_with(|| Workload::new(cores))
            .cores = cores;
        self
    }

    /// Adds a process to the embedded workload.
    ///
    /// The workload starts with one core unless [`cores`](Self::cores) is set.
    pub fn add_process(mut self, pid: Pid, start: SimTime, events: Vec<Event>) -> Self {
        let workload = self.config.workload.take().unwrap_or_else(|| Workload::new(1));
        self.config.workload = Some(workload.with_process(pid, start, events));
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<SimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
