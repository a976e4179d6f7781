//! Container identity: which kind of scrollable region a binding controls.

use super::identifiers::ContainerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the top-level result stream when no kind discriminator is present.
pub const RESULTS_CONTAINER_ID: &str = "search_results";

/// Kind of container a binding is attached to.
///
/// The kind decides where the sentinel goes, which root the observer uses,
/// and how the outbound event name is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Top-level result list scrolled by the page viewport.
    /// The container itself receives the sentinel.
    #[serde(rename = "results")]
    ResultStream,

    /// Filter menu with its own scrollbar.
    /// The sentinel goes into the nested list element.
    #[serde(rename = "filter")]
    FilterList,
}

impl ContainerKind {
    /// Parse the `kind` discriminator carried by container elements.
    pub fn from_discriminator(raw: &str) -> Option<Self> {
        match raw.trim() {
            "results" => Some(Self::ResultStream),
            "filter" => Some(Self::FilterList),
            _ => None,
        }
    }

    /// The discriminator string for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResultStream => "results",
            Self::FilterList => "filter",
        }
    }

    /// Resolve the kind from an optional discriminator, falling back to the id.
    ///
    /// An unrecognized discriminator is treated like a missing one.
    pub fn infer(id: &ContainerId, discriminator: Option<&str>) -> Self {
        if let Some(kind) = discriminator.and_then(Self::from_discriminator) {
            return kind;
        }
        if id.as_str() == RESULTS_CONTAINER_ID {
            Self::ResultStream
        } else {
            Self::FilterList
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one controller instance.
///
/// Both fields are fixed for the binding's lifetime. The loading flag is not
/// stored here: it belongs to the host and is read fresh on every check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerBinding {
    id: ContainerId,
    kind: ContainerKind,
}

impl ContainerBinding {
    /// Pair a validated id with its classification.
    pub fn new(id: ContainerId, kind: ContainerKind) -> Self {
        Self { id, kind }
    }

    /// DOM id of the bound container.
    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Whether the container pages a filter list or the result stream.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }
}
