//! Per-binding behavior knobs, resolved from configuration.

use crate::model::container::ContainerKind;
use crate::model::margin::RootMargin;
use crate::observer::FirstIntersectionPolicy;
use serde::{Deserialize, Serialize};

/// Where result-stream sentinels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentinelPlacement {
    /// Every binding creates its own marker.
    #[default]
    PerContainer,
    /// Result streams share one well-known marker, moved into whichever
    /// result container is mounted. Filter lists still get their own.
    Shared,
}

/// Margin pre-triggering result streams (page viewport root).
pub const DEFAULT_RESULTS_MARGIN: RootMargin = RootMargin::top_px(100);

/// Margin pre-triggering filter lists (nested list root).
pub const DEFAULT_FILTER_MARGIN: RootMargin = RootMargin::top_px(10);

/// Behavior shared by every binding of a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Whether the first callback after mount may emit.
    pub first_intersection: FirstIntersectionPolicy,
    /// Where result-stream sentinels come from.
    pub sentinel_placement: SentinelPlacement,
    /// Container attribute carrying the host's loading flag.
    pub loading_attribute: String,
    /// Container attribute carrying the `results` / `filter` discriminator.
    pub kind_attribute: String,
    /// Visible fraction that counts as intersecting.
    pub threshold: f64,
    /// Root margin for result streams.
    pub results_margin: RootMargin,
    /// Root margin for filter lists.
    pub filter_margin: RootMargin,
    /// Diagnostics kept per binding before the oldest is dropped.
    pub diagnostic_capacity: usize,
}

impl ControllerSettings {
    /// Root margin used for a container of `kind`.
    pub fn margin_for(&self, kind: ContainerKind) -> RootMargin {
        match kind {
            ContainerKind::ResultStream => self.results_margin,
            ContainerKind::FilterList => self.filter_margin,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            first_intersection: FirstIntersectionPolicy::Suppress,
            sentinel_placement: SentinelPlacement::PerContainer,
            loading_attribute: "data-loading".to_string(),
            kind_attribute: "data-kind".to_string(),
            threshold: 0.0,
            results_margin: DEFAULT_RESULTS_MARGIN,
            filter_margin: DEFAULT_FILTER_MARGIN,
            diagnostic_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pre_trigger_results_further_than_filters() {
        let settings = ControllerSettings::default();
        assert_eq!(
            settings.margin_for(ContainerKind::ResultStream).to_string(),
            "100px 0px 0px 0px"
        );
        assert_eq!(
            settings.margin_for(ContainerKind::FilterList).to_string(),
            "10px 0px 0px 0px"
        );
    }

    #[test]
    fn placement_deserializes_kebab_case() {
        let placement: SentinelPlacement = serde_json::from_str("\"per-container\"").unwrap();
        assert_eq!(placement, SentinelPlacement::PerContainer);
        let placement: SentinelPlacement = serde_json::from_str("\"shared\"").unwrap();
        assert_eq!(placement, SentinelPlacement::Shared);
    }
}
