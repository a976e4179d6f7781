//! Sentinel manager: the invisible marker at the end of a container's content.
//!
//! The manager owns exactly one marker node per binding (or borrows the
//! shared one) and keeps it as the last child of the target list. Every call
//! re-resolves the target list from the container node it is given; nothing
//! but the marker's own handle survives between hooks.

use crate::dom::{Dom, NodeId, Selector};
use crate::model::container::ContainerKind;
use crate::model::error::AttachmentError;
use crate::model::identifiers::ContainerId;
use crate::state::settings::SentinelPlacement;

/// Class carried by every marker.
pub const SENTINEL_CLASS: &str = "loading-sentinel";
/// Id of the marker shared by result streams in [`SentinelPlacement::Shared`] mode.
pub const SHARED_SENTINEL_ID: &str = "infinite-scroll-sentinel";
/// Class of the loading indicator inside the marker.
pub const LOADER_CLASS: &str = "loader";
/// Class that hides the loading indicator.
pub const HIDDEN_CLASS: &str = "hidden";

/// Tag of the nested list inside a filter-list container.
pub const FILTER_LIST_TAG: &str = "ul";
/// Class of the nested list inside a filter-list container.
pub const FILTER_LIST_CLASS: &str = "menu";

/// The nested list inside a filter-list container: `ul.menu`.
pub fn filter_list_selector() -> Selector {
    Selector::tag_class(FILTER_LIST_TAG, FILTER_LIST_CLASS)
}

/// Attribute telling the host's DOM patcher to leave the marker alone.
pub const IGNORE_UPDATES_ATTRIBUTE: (&str, &str) = ("phx-update", "ignore");

/// Zero-footprint styling that also pins the marker to the end in flex lists.
const SENTINEL_STYLE: [(&str, &str); 6] = [
    ("height", "auto"),
    ("width", "100%"),
    ("list-style", "none"),
    ("padding", "0"),
    ("margin", "0"),
    ("order", "9999"),
];

/// Makes a filter list a positioned flex column so `order` applies.
const FILTER_LIST_STYLE: [(&str, &str); 3] = [
    ("position", "relative"),
    ("display", "flex"),
    ("flex-direction", "column"),
];

/// What [`SentinelManager::attach`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// A new marker was created and appended.
    Created,
    /// The shared marker was found in the document and moved here.
    Adopted,
    /// The marker had been dropped from the list and was appended again.
    Reattached,
    /// The marker was in the list but not last; it was moved to the end.
    Moved,
    /// Nothing to do.
    AlreadyPresent,
}

/// Owns a binding's sentinel and loading indicator nodes.
#[derive(Debug, Clone)]
pub struct SentinelManager {
    kind: ContainerKind,
    placement: SentinelPlacement,
    node: Option<NodeId>,
    indicator: Option<NodeId>,
}

impl SentinelManager {
    /// Manager with no nodes created yet.
    pub fn new(kind: ContainerKind, placement: SentinelPlacement) -> Self {
        Self {
            kind,
            placement,
            node: None,
            indicator: None,
        }
    }

    fn uses_shared(&self) -> bool {
        self.placement == SentinelPlacement::Shared && self.kind == ContainerKind::ResultStream
    }

    /// The sentinel, once created.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Locate the list that receives the marker.
    pub fn target_list(
        dom: &dyn Dom,
        container: NodeId,
        id: &ContainerId,
        kind: ContainerKind,
    ) -> Result<NodeId, AttachmentError> {
        match kind {
            ContainerKind::ResultStream => Ok(container),
            ContainerKind::FilterList => {
                let selector = filter_list_selector();
                dom.query_selector(container, &selector).ok_or_else(|| {
                    AttachmentError::TargetListMissing {
                        container: id.clone(),
                        selector: selector.to_string(),
                    }
                })
            }
        }
    }

    /// Place the marker as the last child of the container's target list.
    ///
    /// Idempotent: when the marker is already last, nothing changes.
    pub fn attach(
        &mut self,
        dom: &mut dyn Dom,
        container: NodeId,
        id: &ContainerId,
    ) -> Result<AttachOutcome, AttachmentError> {
        let target = Self::target_list(dom, container, id, self.kind)?;

        if self.kind == ContainerKind::FilterList {
            for (property, value) in FILTER_LIST_STYLE {
                dom.set_style(target, property, value);
            }
        }

        let (node, fresh) = self.resolve_node(dom, target);
        self.remove_strays(dom, target, node);

        if dom.last_child(target) == Some(node) {
            return Ok(fresh.unwrap_or(AttachOutcome::AlreadyPresent));
        }
        let outcome = match fresh {
            Some(fresh) => fresh,
            None if dom.contains(target, node) => AttachOutcome::Moved,
            None => AttachOutcome::Reattached,
        };

        dom.append_child(target, node)
            .map_err(|err| AttachmentError::Rejected {
                container: id.clone(),
                reason: err.to_string(),
            })?;
        tracing::debug!(container = %id, ?outcome, sentinel = %node, "sentinel attached");
        Ok(outcome)
    }

    /// Current marker, creating or adopting one if the binding has none yet.
    fn resolve_node(&mut self, dom: &mut dyn Dom, target: NodeId) -> (NodeId, Option<AttachOutcome>) {
        if let Some(node) = self.node {
            return (node, None);
        }

        if self.uses_shared() {
            if let Some(existing) = dom.element_by_id(SHARED_SENTINEL_ID) {
                self.node = Some(existing);
                self.indicator = dom.query_selector(existing, &Selector::class(LOADER_CLASS));
                return (existing, Some(AttachOutcome::Adopted));
            }
        }

        let node = self.create(dom, target);
        (node, Some(AttachOutcome::Created))
    }

    fn create(&mut self, dom: &mut dyn Dom, target: NodeId) -> NodeId {
        // The marker must be a valid child of the list it lands in.
        let tag = match dom.tag_name(target).as_deref() {
            Some("ul") | Some("ol") => "li",
            _ => "div",
        };

        let node = dom.create_element(tag);
        dom.set_class(node, SENTINEL_CLASS, true);
        dom.set_attribute(node, IGNORE_UPDATES_ATTRIBUTE.0, IGNORE_UPDATES_ATTRIBUTE.1);
        if self.uses_shared() {
            dom.set_attribute(node, "id", SHARED_SENTINEL_ID);
        }
        for (property, value) in SENTINEL_STYLE {
            dom.set_style(node, property, value);
        }

        let indicator = dom.create_element("div");
        dom.set_class(indicator, LOADER_CLASS, true);
        dom.set_class(indicator, HIDDEN_CLASS, true);
        // Both nodes were just created, so the append cannot form a cycle.
        let _ = dom.append_child(node, indicator);

        self.node = Some(node);
        self.indicator = Some(indicator);
        node
    }

    /// Drop any other marker left directly in the list so at most one remains.
    /// Markers of nested containers are not ours to touch.
    fn remove_strays(&self, dom: &mut dyn Dom, target: NodeId, keep: NodeId) {
        let strays: Vec<NodeId> = dom
            .query_selector_all(target, &Selector::class(SENTINEL_CLASS))
            .into_iter()
            .filter(|&n| n != keep && dom.parent(n) == Some(target))
            .collect();
        for stray in strays {
            tracing::debug!(sentinel = %stray, "removing stray sentinel");
            dom.remove(stray);
        }
    }

    /// Whether the marker is the last child of the container's target list.
    pub fn is_in_place(&self, dom: &dyn Dom, container: NodeId, id: &ContainerId) -> bool {
        let Some(node) = self.node else {
            return false;
        };
        Self::target_list(dom, container, id, self.kind)
            .map(|target| dom.last_child(target) == Some(node))
            .unwrap_or(false)
    }

    /// Show or hide the loading indicator inside the marker.
    pub fn set_indicator(&self, dom: &mut dyn Dom, visible: bool) {
        if let Some(indicator) = self.indicator {
            dom.set_class(indicator, HIDDEN_CLASS, !visible);
        }
    }

    /// Remove the marker from the document. Returns whether it was attached.
    pub fn detach(&mut self, dom: &mut dyn Dom) -> bool {
        let Some(node) = self.node else {
            return false;
        };
        if dom.parent(node).is_none() {
            return false;
        }
        dom.remove(node);
        tracing::debug!(sentinel = %node, "sentinel detached");
        true
    }
}

#[cfg(test)]
#[path = "sentinel_tests.rs"]
mod tests;
