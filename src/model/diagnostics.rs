//! Per-binding diagnostic channel.
//!
//! Failures never cross the host lifecycle boundary. They are recorded here,
//! in a bounded buffer the host can inspect, and mirrored to `tracing`.

use super::error::ControllerError;
use super::identifiers::ContainerId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Which part of the failure taxonomy a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    /// The container could not be bound.
    Binding,
    /// The sentinel could not be placed.
    Attachment,
    /// The visibility observer could not be started.
    Subscription,
    /// An emitted request failed to reach the host.
    Dispatch,
}

impl From<&ControllerError> for DiagnosticCategory {
    fn from(err: &ControllerError) -> Self {
        match err {
            ControllerError::Binding(_) => Self::Binding,
            ControllerError::Attachment(_) => Self::Attachment,
            ControllerError::Subscription(_) => Self::Subscription,
            ControllerError::Dispatch(_) => Self::Dispatch,
        }
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Container the failure belongs to.
    pub container: ContainerId,
    /// Failure class.
    pub category: DiagnosticCategory,
    /// Rendered error message.
    pub message: String,
    /// When the failure was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Ring buffer of diagnostics; the oldest entry is dropped when full.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
    dropped: usize,
}

impl DiagnosticLog {
    /// Create a log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            dropped: 0,
        }
    }

    /// Record an error against a container and mirror it to `tracing`.
    pub fn record(&mut self, container: &ContainerId, err: &ControllerError) {
        tracing::warn!(container = %container, error = %err, "binding diagnostic");
        self.push(Diagnostic {
            container: container.clone(),
            category: err.into(),
            message: err.to_string(),
            recorded_at: Utc::now(),
        });
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(diagnostic);
    }

    /// Move every entry of `other` into this log, oldest first.
    ///
    /// Entries `other` already evicted count towards [`DiagnosticLog::dropped`].
    pub fn absorb(&mut self, other: DiagnosticLog) {
        self.dropped += other.dropped;
        for diagnostic in other.entries {
            self.push(diagnostic);
        }
    }

    /// Entries in recording order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded (or everything was evicted).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries evicted because the log was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Retained entries in `category`.
    pub fn count(&self, category: DiagnosticCategory) -> usize {
        self.entries.iter().filter(|d| d.category == category).count()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(256)
    }
}
