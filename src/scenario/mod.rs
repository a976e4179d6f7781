//! Scenario files: a page layout plus a script of host events.
//!
//! Scenarios are JSON so they can be written by hand or captured from a
//! browser session and replayed headlessly:
//!
//! ```json
//! {
//!   "name": "filter paging",
//!   "containers": [{ "id": "genre-container", "kind": "filter", "items": 20 }],
//!   "steps": [
//!     { "step": "mount", "container": "genre-container" },
//!     { "step": "intersect", "container": "genre-container", "visible": true }
//!   ]
//! }
//! ```

use crate::model::container::ContainerKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod runner;

pub use runner::{Report, TraceEvent, TraceKind};

fn default_items() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_reason() -> String {
    "connection lost".to_string()
}

/// A container present in the document before the first step.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
    /// DOM id of the container element.
    pub id: String,
    /// Written to the kind attribute; omit it to exercise id-based inference.
    #[serde(default)]
    pub kind: Option<ContainerKind>,
    /// Items rendered initially.
    #[serde(default = "default_items")]
    pub items: usize,
    /// Initial value of the loading attribute.
    #[serde(default)]
    pub loading: bool,
}

/// One host event.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Run the mount hook for a container.
    Mount {
        /// Target container id.
        container: String,
    },
    /// Deliver an intersection callback for the container's sentinel.
    Intersect {
        /// Target container id.
        container: String,
        /// Whether the sentinel is reported as intersecting.
        #[serde(default = "default_true")]
        visible: bool,
    },
    /// Change the host's loading flag without re-rendering.
    SetLoading {
        /// Target container id.
        container: String,
        /// New loading flag.
        loading: bool,
    },
    /// Replace the container's items, dropping anything appended to the list.
    Render {
        /// Target container id.
        container: String,
        /// Item count after the re-render.
        items: usize,
    },
    /// Run the post-update hook.
    Update {
        /// Target container id.
        container: String,
    },
    /// Make the next pushed event fail synchronously.
    FailNextDispatch {
        /// Transport error message.
        #[serde(default = "default_reason")]
        reason: String,
    },
    /// Report an asynchronous transport failure for the container's latest request.
    DispatchFailed {
        /// Target container id.
        container: String,
        /// Transport error message.
        #[serde(default = "default_reason")]
        reason: String,
    },
    /// Run the destroy hook.
    Destroy {
        /// Target container id.
        container: String,
    },
    /// Toggle whether the intersection API can hand out subscriptions.
    ApiUnavailable {
        /// `false` restores the API.
        #[serde(default = "default_true")]
        unavailable: bool,
    },
}

/// A page layout and the host events replayed against it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Label echoed in the report.
    #[serde(default)]
    pub name: Option<String>,
    /// Containers rendered before the first step.
    pub containers: Vec<ContainerSpec>,
    /// Host events, in order.
    pub steps: Vec<Step>,
}

/// Reasons a scenario cannot be loaded.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file could not be read.
    #[error("Failed to read scenario {path:?}: {source}")]
    Read {
        /// Scenario path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid scenario document.
    #[error("Invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two containers share an id.
    #[error("Duplicate container id {0:?}")]
    DuplicateContainer(String),

    /// A step names a container the layout does not declare.
    #[error("Step {step} refers to unknown container {container:?}")]
    UnknownContainer {
        /// One-based step number.
        step: usize,
        /// The unknown id.
        container: String,
    },
}

impl Scenario {
    /// Parse and validate a scenario.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read, parse and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &self.containers {
            if !seen.insert(spec.id.as_str()) {
                return Err(ScenarioError::DuplicateContainer(spec.id.clone()));
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(container) = step.container() {
                if !seen.contains(container) {
                    return Err(ScenarioError::UnknownContainer {
                        step: index + 1,
                        container: container.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Step {
    /// Container the step targets, if any.
    pub fn container(&self) -> Option<&str> {
        match self {
            Step::Mount { container }
            | Step::Intersect { container, .. }
            | Step::SetLoading { container, .. }
            | Step::Render { container, .. }
            | Step::Update { container }
            | Step::DispatchFailed { container, .. }
            | Step::Destroy { container } => Some(container),
            Step::FailNextDispatch { .. } | Step::ApiUnavailable { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps_with_defaults() {
        let scenario = Scenario::from_json(
            r#"{
                "containers": [{ "id": "genre-container", "kind": "filter" }],
                "steps": [
                    { "step": "mount", "container": "genre-container" },
                    { "step": "intersect", "container": "genre-container" },
                    { "step": "fail_next_dispatch" },
                    { "step": "api_unavailable" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.containers[0].items, 10);
        assert_eq!(scenario.containers[0].kind, Some(ContainerKind::FilterList));
        assert_eq!(
            scenario.steps[1],
            Step::Intersect {
                container: "genre-container".to_string(),
                visible: true
            }
        );
        assert_eq!(
            scenario.steps[2],
            Step::FailNextDispatch {
                reason: "connection lost".to_string()
            }
        );
        assert_eq!(scenario.steps[3], Step::ApiUnavailable { unavailable: true });
    }

    #[test]
    fn unknown_container_is_rejected() {
        let err = Scenario::from_json(
            r#"{
                "containers": [],
                "steps": [{ "step": "update", "container": "ghost" }]
            }"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ScenarioError::UnknownContainer { step: 1, ref container } if container == "ghost"
        ));
    }

    #[test]
    fn duplicate_container_is_rejected() {
        let err = Scenario::from_json(
            r#"{
                "containers": [{ "id": "a" }, { "id": "a" }],
                "steps": []
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::DuplicateContainer(_)));
    }

    #[test]
    fn unknown_step_is_a_parse_error() {
        let err = Scenario::from_json(r#"{ "containers": [], "steps": [{ "step": "scroll" }] }"#)
            .unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }
}
