//! Registry of live bindings, keyed by container id.
//!
//! The host talks to the registry, not to individual bindings: it routes
//! mount/update/destroy by container, intersection callbacks by subscription
//! and transport failures by container plus ticket.

use crate::dom::{Dom, NodeId};
use crate::model::container::ContainerKind;
use crate::model::diagnostics::{Diagnostic, DiagnosticLog};
use crate::model::error::{BindingError, DispatchError};
use crate::model::identifiers::{ContainerId, RequestTicket};
use crate::observer::{IntersectionEntry, SubscriptionId};
use crate::state::lifecycle::{InfiniteScroll, IntersectionOutcome, Ports, ResyncReport};
use crate::state::settings::{ControllerSettings, SentinelPlacement};
use std::collections::BTreeMap;

/// Result of [`BindingRegistry::mount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// A new binding was created.
    Mounted(ContainerId),
    /// A binding already existed for this id and was torn down first.
    Replaced(ContainerId),
    /// The element could not be bound; nothing was created.
    Rejected(BindingError),
}

/// Every live binding on the page, plus what destroyed ones left behind.
#[derive(Debug, Clone)]
pub struct BindingRegistry {
    settings: ControllerSettings,
    bindings: BTreeMap<ContainerId, InfiniteScroll>,
    /// Diagnostics of destroyed bindings.
    retired: DiagnosticLog,
}

impl BindingRegistry {
    /// Empty registry; every binding it mounts uses `settings`.
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            retired: DiagnosticLog::new(settings.diagnostic_capacity),
            settings,
            bindings: BTreeMap::new(),
        }
    }

    /// Settings applied to new bindings.
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Mount hook for `element`.
    ///
    /// Re-mounting an id destroys the previous binding first. With a shared
    /// sentinel, only one result stream may own the marker, so any other
    /// result-stream binding is destroyed as well.
    pub fn mount(&mut self, ports: &mut Ports<'_>, element: NodeId) -> MountOutcome {
        let binding = match InfiniteScroll::identify(ports.dom, element, &self.settings) {
            Ok(binding) => binding,
            Err(err) => {
                tracing::warn!(%element, error = %err, "container not bound");
                return MountOutcome::Rejected(err);
            }
        };
        let id = binding.id().clone();

        let replaced = self.destroy(ports, &id);
        if self.settings.sentinel_placement == SentinelPlacement::Shared
            && binding.kind() == ContainerKind::ResultStream
        {
            let owners: Vec<ContainerId> = self
                .bindings
                .values()
                .filter(|b| b.kind() == ContainerKind::ResultStream)
                .map(|b| b.id().clone())
                .collect();
            for owner in owners {
                tracing::debug!(previous = %owner, next = %id, "shared sentinel changes owner");
                self.destroy(ports, &owner);
            }
        }

        match InfiniteScroll::mount(ports, element, &self.settings) {
            Ok(scroll) => {
                self.bindings.insert(id.clone(), scroll);
            }
            Err(err) => {
                tracing::warn!(container = %id, error = %err, "container not bound");
                return MountOutcome::Rejected(err);
            }
        }

        if replaced {
            MountOutcome::Replaced(id)
        } else {
            MountOutcome::Mounted(id)
        }
    }

    /// Post-update hook for `element`. `None` if the element is not bound.
    pub fn post_update(&mut self, ports: &mut Ports<'_>, element: NodeId) -> Option<ResyncReport> {
        let id = Self::element_id(ports.dom, element)?;
        let binding = self.bindings.get_mut(&id)?;
        Some(binding.post_update(ports, element))
    }

    /// Destroy hook. Returns whether a live binding was torn down.
    ///
    /// The binding's diagnostics outlive it in [`BindingRegistry::retired_diagnostics`].
    pub fn destroy(&mut self, ports: &mut Ports<'_>, id: &ContainerId) -> bool {
        let Some(binding) = self.bindings.remove(id) else {
            return false;
        };
        self.retire(ports, binding)
    }

    /// Tear down every binding, e.g. when the host page unloads.
    pub fn destroy_all(&mut self, ports: &mut Ports<'_>) -> usize {
        let mut destroyed = 0;
        for binding in std::mem::take(&mut self.bindings).into_values() {
            if self.retire(ports, binding) {
                destroyed += 1;
            }
        }
        destroyed
    }

    fn retire(&mut self, ports: &mut Ports<'_>, mut binding: InfiniteScroll) -> bool {
        let destroyed = binding.destroy(ports);
        self.retired.absorb(binding.into_diagnostics());
        destroyed
    }

    /// Route an intersection callback to the binding owning `subscription`.
    ///
    /// Callbacks for released subscriptions find no owner and are dropped.
    pub fn handle_intersection(
        &mut self,
        ports: &mut Ports<'_>,
        subscription: SubscriptionId,
        entries: &[IntersectionEntry],
    ) -> Option<(ContainerId, IntersectionOutcome)> {
        let Some(binding) = self
            .bindings
            .values_mut()
            .find(|b| b.subscription() == Some(subscription))
        else {
            tracing::trace!(%subscription, "callback for released subscription dropped");
            return None;
        };
        let outcome = binding.handle_intersection(ports, subscription, entries);
        Some((binding.id().clone(), outcome))
    }

    /// Report an asynchronous transport failure for request `ticket`.
    pub fn dispatch_failed(
        &mut self,
        ports: &mut Ports<'_>,
        id: &ContainerId,
        ticket: RequestTicket,
        err: DispatchError,
    ) -> bool {
        match self.bindings.get_mut(id) {
            Some(binding) => binding.dispatch_failed(ports, ticket, err),
            None => {
                tracing::debug!(container = %id, %ticket, "failure for unbound container ignored");
                false
            }
        }
    }

    /// Diagnostics left behind by destroyed bindings, oldest first.
    pub fn retired_diagnostics(&self) -> &DiagnosticLog {
        &self.retired
    }

    /// Every diagnostic still held: destroyed bindings first, then live
    /// bindings in container order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.retired
            .iter()
            .chain(self.bindings.values().flat_map(|b| b.diagnostics().iter()))
    }

    /// Live binding for `id`.
    pub fn get(&self, id: &ContainerId) -> Option<&InfiniteScroll> {
        self.bindings.get(id)
    }

    /// Live bindings in container order.
    pub fn iter(&self) -> impl Iterator<Item = &InfiniteScroll> {
        self.bindings.values()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no binding is live.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn element_id(dom: &dyn Dom, element: NodeId) -> Option<ContainerId> {
        dom.attribute(element, "id")
            .and_then(|raw| ContainerId::new(raw).ok())
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use crate::observer::FirstIntersectionPolicy;

    fn settings(placement: SentinelPlacement) -> ControllerSettings {
        ControllerSettings {
            first_intersection: FirstIntersectionPolicy::Deliver,
            sentinel_placement: placement,
            ..ControllerSettings::default()
        }
    }

    fn cid(s: &str) -> ContainerId {
        ContainerId::new(s).unwrap()
    }

    fn fire(h: &mut Harness, registry: &mut BindingRegistry, id: &str) -> Option<IntersectionOutcome> {
        let sub = registry.get(&cid(id))?.subscription()?;
        let entries = h.entries(sub, true);
        registry
            .handle_intersection(&mut h.ports(), sub, &entries)
            .map(|(_, outcome)| outcome)
    }

    #[test]
    fn independent_bindings_do_not_share_gates() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::new(settings(SentinelPlacement::PerContainer));
        let genre = h.add_container("genre-container", ContainerKind::FilterList, 3);
        let year = h.add_container("year-container", ContainerKind::FilterList, 3);
        registry.mount(&mut h.ports(), genre);
        registry.mount(&mut h.ports(), year);

        fire(&mut h, &mut registry, "genre-container");
        let outcome = fire(&mut h, &mut registry, "year-container");

        assert!(matches!(outcome, Some(IntersectionOutcome::Emitted { .. })));
        assert_eq!(h.host.events_for(&cid("genre-container")), vec!["load_more_genre"]);
        assert_eq!(h.host.events_for(&cid("year-container")), vec!["load_more_year"]);
    }

    #[test]
    fn remount_replaces_previous_binding() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::new(settings(SentinelPlacement::PerContainer));
        let genre = h.add_container("genre-container", ContainerKind::FilterList, 3);

        assert_eq!(
            registry.mount(&mut h.ports(), genre),
            MountOutcome::Mounted(cid("genre-container"))
        );
        assert_eq!(
            registry.mount(&mut h.ports(), genre),
            MountOutcome::Replaced(cid("genre-container"))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(h.observer.active_count(), 1);
        assert_eq!(h.sentinel_count("genre-container"), 1);
    }

    #[test]
    fn element_without_id_is_rejected() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::default();
        let body = h.dom.body();
        let anonymous = h.dom.create_child(body, "div", None);

        assert_eq!(
            registry.mount(&mut h.ports(), anonymous),
            MountOutcome::Rejected(BindingError::MissingId)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn callbacks_after_destroy_are_dropped() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::new(settings(SentinelPlacement::PerContainer));
        let genre = h.add_container("genre-container", ContainerKind::FilterList, 3);
        registry.mount(&mut h.ports(), genre);
        let sub = registry.get(&cid("genre-container")).unwrap().subscription().unwrap();
        let entries = h.entries(sub, true);

        assert!(registry.destroy(&mut h.ports(), &cid("genre-container")));
        assert!(!registry.destroy(&mut h.ports(), &cid("genre-container")));

        assert_eq!(registry.handle_intersection(&mut h.ports(), sub, &entries), None);
        assert!(h.host.pushed().is_empty());
    }

    #[test]
    fn shared_sentinel_moves_to_newest_result_stream() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::new(settings(SentinelPlacement::Shared));
        let first = h.add_container("search_results", ContainerKind::ResultStream, 2);
        let second = h.add_container("archive_results", ContainerKind::ResultStream, 2);

        registry.mount(&mut h.ports(), first);
        registry.mount(&mut h.ports(), second);

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&cid("archive_results")).is_some());
        assert_eq!(h.sentinel_count("search_results"), 0);
        assert_eq!(h.sentinel_count("archive_results"), 1);
        assert_eq!(h.observer.active_count(), 1);
    }

    #[test]
    fn destroy_all_tears_down_every_binding() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::new(settings(SentinelPlacement::PerContainer));
        let genre = h.add_container("genre-container", ContainerKind::FilterList, 1);
        let results = h.add_container("search_results", ContainerKind::ResultStream, 1);
        registry.mount(&mut h.ports(), genre);
        registry.mount(&mut h.ports(), results);

        assert_eq!(registry.destroy_all(&mut h.ports()), 2);
        assert!(registry.is_empty());
        assert_eq!(h.observer.active_count(), 0);
    }

    #[test]
    fn update_for_unbound_element_is_ignored() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::default();
        let genre = h.add_container("genre-container", ContainerKind::FilterList, 1);

        assert_eq!(registry.post_update(&mut h.ports(), genre), None);
    }

    #[test]
    fn diagnostics_survive_destroy() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::new(settings(SentinelPlacement::PerContainer));
        let genre = h.add_container("genre-container", ContainerKind::FilterList, 1);
        registry.mount(&mut h.ports(), genre);
        h.host.fail_next("socket closed");
        assert!(matches!(
            fire(&mut h, &mut registry, "genre-container"),
            Some(IntersectionOutcome::DispatchFailed { .. })
        ));

        registry.destroy(&mut h.ports(), &cid("genre-container"));

        assert_eq!(registry.retired_diagnostics().len(), 1);
        let kept: Vec<_> = registry.diagnostics().collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].container, cid("genre-container"));
        assert_eq!(kept[0].category, crate::model::DiagnosticCategory::Dispatch);
    }

    #[test]
    fn remount_keeps_previous_diagnostics() {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::new(settings(SentinelPlacement::PerContainer));
        let genre = h.add_container("genre-container", ContainerKind::FilterList, 1);
        registry.mount(&mut h.ports(), genre);
        h.host.fail_next("socket closed");
        fire(&mut h, &mut registry, "genre-container");

        registry.mount(&mut h.ports(), genre);

        assert_eq!(registry.diagnostics().count(), 1);
        assert!(registry.get(&cid("genre-container")).unwrap().diagnostics().is_empty());
    }
}
