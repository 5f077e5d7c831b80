//! Event definitions for the simulator.
//!
//! An event is one resource request in a process program: which resource is
//! needed and for how long. Programs are recorded ahead of time and replayed
//! by the driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::SimTime;

/// The resource an event asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// One of the interchangeable processing cores.
    #[serde(rename = "CORE")]
    Core,
    /// The single storage device.
    #[serde(rename = "SSD", alias = "STORAGE")]
    Storage,
    /// The user interaction channel.
    #[serde(rename = "TTY", alias = "INTERACT")]
    Interact,
}

impl EventKind {
    /// Returns the keyword used for this kind in input files.
    pub fn keyword(self) -> &'static str {
        match self {
            EventKind::Core => "CORE",
            EventKind::Storage => "SSD",
            EventKind::Interact => "TTY",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Returned when a keyword does not name an event kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CORE" => Ok(EventKind::Core),
            "SSD" | "STORAGE" => Ok(EventKind::Storage),
            "TTY" | "INTERACT" => Ok(EventKind::Interact),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// One resource request in a process program.
///
/// `interactive` only matters for core events. It starts out false and is
/// set by the interaction channel when the preceding TTY event completes,
/// which moves the core request into the priority wait queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The requested resource
    pub kind: EventKind,
    /// How long the resource is held once granted
    pub duration: SimTime,
    /// Whether a core request waits in the interactive queue
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interactive: bool,
}

impl Event {
    /// Creates a new non-interactive event.
    pub fn new(kind: EventKind, duration: SimTime) -> Self {
        Self {
            kind,
            duration,
            interactive: false,
        }
    }

    /// Creates a core event.
    pub fn core(duration: SimTime) -> Self {
        Self::new(EventKind::Core, duration)
    }

    /// Creates a storage event.
    pub fn storage(duration: SimTime) -> Self {
        Self::new(EventKind::Storage, duration)
    }

    /// Creates a user interaction event.
    pub fn interact(duration: SimTime) -> Self {
        Self::new(EventKind::Interact, duration)
    }
}
