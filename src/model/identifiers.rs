//! Core identifier newtypes with smart constructors.
//!
//! String identifiers validate non-empty input at construction time.
//! Numeric handles are minted by their owners and never parsed from input.

use serde::Serialize;
use std::fmt;

/// DOM id of a container element bound to a controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Smart constructor: validates a non-empty, whitespace-free id
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidContainerId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidContainerId::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(InvalidContainerId::Whitespace(raw));
        }
        Ok(Self(raw))
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id of one emitted "load more" request within a binding.
///
/// Tickets increase monotonically per binding, so a failure report can be
/// matched against the request that is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Numeric value of the ticket.
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ===== Error Types =====

/// Why a string was rejected as a container id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidContainerId {
    /// The id was the empty string.
    #[error("Container ID cannot be empty")]
    Empty,
    /// The id contained whitespace.
    #[error("Container ID cannot contain whitespace: {0:?}")]
    Whitespace(String),
}

// ===== Tests =====
