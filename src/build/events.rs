//! Build event types for JSON output.
//!
//! Both graph walkers record what happened to every step and action in an
//! [`EventLog`]. Each entry carries a sequence number, so "A finished
//! before B started" is a comparison of two integers. The same events are
//! printed one JSON object per line with `--message-format=json`.
//!
//! # Event Types
//!
//! - `step-finished` / `step-failed` / `step-skipped`: build graph steps
//! - `action-started` / `action-finished` / `action-failed` /
//!   `action-skipped`: execution graph actions
//! - `build-finished`: build completed (success or failure)

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;

/// A build event emitted during the build process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    #[serde(rename = "step-finished")]
    StepFinished { label: String },

    #[serde(rename = "step-failed")]
    StepFailed { label: String, message: String },

    /// A step never ran because something it depends on failed.
    #[serde(rename = "step-skipped")]
    StepSkipped { label: String },

    #[serde(rename = "action-started")]
    ActionStarted { id: usize, mnemonic: String },

    #[serde(rename = "action-finished")]
    ActionFinished {
        id: usize,
        mnemonic: String,
        outputs: Vec<PathBuf>,
    },

    #[serde(rename = "action-failed")]
    ActionFailed {
        id: usize,
        mnemonic: String,
        message: String,
    },

    #[serde(rename = "action-skipped")]
    ActionSkipped { id: usize, mnemonic: String },

    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        duration_ms: u64,
        actions_run: usize,
    },
}

impl BuildEvent {
    pub fn finished(success: bool, duration_ms: u64, actions_run: usize) -> Self {
        BuildEvent::BuildFinished {
            success,
            duration_ms,
            actions_run,
        }
    }

    /// The action this event is about, if any.
    pub fn action_id(&self) -> Option<usize> {
        match self {
            BuildEvent::ActionStarted { id, .. }
            | BuildEvent::ActionFinished { id, .. }
            | BuildEvent::ActionFailed { id, .. }
            | BuildEvent::ActionSkipped { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// One recorded event.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    pub seq: u64,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub event: BuildEvent,
}

impl LoggedEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Append-only, totally ordered record of build events.
#[derive(Debug)]
pub struct EventLog {
    start: Instant,
    entries: Mutex<Vec<LoggedEvent>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        EventLog {
            start: Instant::now(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Record `event` and return its sequence number.
    pub fn push(&self, event: BuildEvent) -> u64 {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = entries.len() as u64;
        entries.push(LoggedEvent {
            seq,
            elapsed_ms: self.start.elapsed().as_millis() as u64,
            event,
        });
        seq
    }

    pub fn snapshot(&self) -> Vec<LoggedEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_entries(self) -> Vec<LoggedEvent> {
        self.entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Sequence number of the first entry matching `pred`.
pub fn position(events: &[LoggedEvent], pred: impl Fn(&BuildEvent) -> bool) -> Option<u64> {
    events.iter().find(|e| pred(&e.event)).map(|e| e.seq)
}
