//! In-memory host: document, intersection API and event channel in one place.
//!
//! Used by scenario replay, benchmarks and tests to drive bindings without a
//! browser.

use crate::dom::{Dom, MemoryDom, NodeId, Selector};
use crate::host::RecordingHost;
use crate::model::container::ContainerKind;
use crate::observer::{IntersectionEntry, RecordingIntersectionApi, SubscriptionId};
use crate::state::lifecycle::Ports;
use crate::state::sentinel::{
    filter_list_selector, FILTER_LIST_CLASS, FILTER_LIST_TAG, SENTINEL_CLASS,
};
use crate::state::settings::ControllerSettings;

/// Test page: an in-memory document plus recording doubles for the observer and host.
#[derive(Debug, Clone)]
pub struct Harness {
    /// The page document.
    pub dom: MemoryDom,
    /// Intersection API double.
    pub observer: RecordingIntersectionApi,
    /// Host event channel double.
    pub host: RecordingHost,
    loading_attribute: String,
    kind_attribute: String,
}

impl Harness {
    /// Harness using the default attribute names.
    pub fn new() -> Self {
        Self::with_settings(&ControllerSettings::default())
    }

    /// Harness whose markup helpers use the attribute names in `settings`.
    pub fn with_settings(settings: &ControllerSettings) -> Self {
        Self {
            dom: MemoryDom::new(),
            observer: RecordingIntersectionApi::new(),
            host: RecordingHost::new(),
            loading_attribute: settings.loading_attribute.clone(),
            kind_attribute: settings.kind_attribute.clone(),
        }
    }

    /// Borrow all three collaborators for one hook call.
    pub fn ports(&mut self) -> Ports<'_> {
        Ports::new(&mut self.dom, &mut self.observer, &mut self.host)
    }

    /// Add a container to the body.
    ///
    /// A filter list renders as `div#id > ul.menu > li*items`, a result
    /// stream as `div#id > div*items`.
    pub fn add_container(&mut self, id: &str, kind: ContainerKind, items: usize) -> NodeId {
        let container = self.add_unlabelled_container(id, kind, items);
        self.dom
            .set_attribute(container, &self.kind_attribute, kind.as_str());
        container
    }

    /// Same markup as [`Harness::add_container`] without the kind attribute,
    /// leaving the kind to be inferred from the id.
    pub fn add_unlabelled_container(&mut self, id: &str, kind: ContainerKind, items: usize) -> NodeId {
        let body = self.dom.body();
        let container = self.dom.create_child(body, "div", Some(id));
        match kind {
            ContainerKind::ResultStream => {
                self.dom.replace_children(container, "div", items);
            }
            ContainerKind::FilterList => {
                let list = self.dom.create_child(container, FILTER_LIST_TAG, None);
                self.dom.set_class(list, FILTER_LIST_CLASS, true);
                self.dom.replace_children(list, "li", items);
            }
        }
        container
    }

    /// Container element with DOM id `id`.
    pub fn container(&self, id: &str) -> Option<NodeId> {
        self.dom.element_by_id(id)
    }

    /// The node whose children are the container's items.
    pub fn content_list(&self, container: NodeId) -> NodeId {
        self.dom
            .query_selector(container, &filter_list_selector())
            .unwrap_or(container)
    }

    /// Replace the container's items wholesale, as a host re-render would.
    ///
    /// Returns `None` if no container has this id.
    pub fn render(&mut self, id: &str, items: usize) -> Option<NodeId> {
        let container = self.container(id)?;
        let list = self.content_list(container);
        let tag = if list == container { "div" } else { "li" };
        self.dom.replace_children(list, tag, items);
        Some(container)
    }

    /// Set the host's loading attribute on the container with this id.
    pub fn set_loading(&mut self, id: &str, loading: bool) -> Option<NodeId> {
        let container = self.container(id)?;
        let value = if loading { "true" } else { "false" };
        self.dom
            .set_attribute(container, &self.loading_attribute, value);
        Some(container)
    }

    /// Sentinels inside the container with this id.
    pub fn sentinel_count(&self, id: &str) -> usize {
        self.container(id)
            .map(|c| self.dom.count_matching(c, &Selector::class(SENTINEL_CLASS)))
            .unwrap_or(0)
    }

    /// Callback batch reporting the sentinel observed by `subscription`.
    pub fn entries(&self, subscription: SubscriptionId, visible: bool) -> Vec<IntersectionEntry> {
        self.observer
            .observed(subscription)
            .map(|o| IntersectionEntry {
                target: o.target,
                is_intersecting: visible,
            })
            .into_iter()
            .collect()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
