//! Outbound event naming.
//!
//! The name pushed to the host is a pure function of the container's kind
//! and id. Nothing else feeds into it.

use super::container::ContainerKind;
use super::identifiers::ContainerId;
use std::fmt;

/// Event requested by every result-stream binding.
///
/// Module-scoped so the host routes it to the search view's handler.
pub const RESULTS_EVENT: &str = "Bonfire.PanDoRa.Web.SearchLive:load_more_search_results";

/// Verb prefixed to filter-list event names.
pub const FILTER_EVENT_PREFIX: &str = "load_more_";

/// Suffix stripped from filter-list container ids.
pub const FILTER_CONTAINER_SUFFIX: &str = "-container";

/// Name of a "load more" event sent to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventName(String);

impl EventName {
    /// Derive the event name for a container.
    ///
    /// - `ResultStream` → [`RESULTS_EVENT`]
    /// - `FilterList` with id `X-container` → `load_more_X`
    /// - `FilterList` with any other id → `load_more_<id>`
    pub fn for_container(kind: ContainerKind, id: &ContainerId) -> Self {
        match kind {
            ContainerKind::ResultStream => Self(RESULTS_EVENT.to_string()),
            ContainerKind::FilterList => {
                let stem = id
                    .as_str()
                    .strip_suffix(FILTER_CONTAINER_SUFFIX)
                    .filter(|stem| !stem.is_empty())
                    .unwrap_or(id.as_str());
                Self(format!("{FILTER_EVENT_PREFIX}{stem}"))
            }
        }
    }

    /// The event name as pushed to the host.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
