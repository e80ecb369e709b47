//! Status reporting seam.
//!
//! The runner never writes to the terminal itself; it emits [`Status`] events
//! and the binary decides how to render them.

use std::sync::Mutex;

use devsetup_types::{ScriptExit, ScriptUrl};

/// Progress and outcome events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Banner,
    Downloading { url: ScriptUrl },
    Downloaded { bytes: usize },
    RefusedRoot,
    DownloadFailed { reason: String },
    ScriptFailed { exit: ScriptExit },
    Cancelled,
    Unexpected { reason: String },
}

pub trait Reporter: Send + Sync {
    fn report(&self, status: Status);
}

/// Keeps events in memory so callers can inspect them afterwards.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Status>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Status> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, status: Status) {
        match self.events.lock() {
            Ok(mut events) => events.push(status),
            Err(poisoned) => poisoned.into_inner().push(status),
        }
    }
}
