//! Acceptance tests for re-renders, teardown and degraded bindings.

use crate::dom::Dom;
use crate::harness::Harness;
use crate::model::{ContainerId, ContainerKind, DiagnosticCategory, DispatchError};
use crate::state::sentinel::SHARED_SENTINEL_ID;
use crate::state::{
    AttachOutcome, BindingRegistry, ControllerSettings, IntersectionOutcome, LifecycleState,
    SentinelPlacement, Suppression,
};

fn cid(id: &str) -> ContainerId {
    ContainerId::new(id).expect("valid container id")
}

fn fire(h: &mut Harness, registry: &mut BindingRegistry, id: &str) -> Option<IntersectionOutcome> {
    let sub = registry.get(&cid(id))?.subscription()?;
    let entries = h.entries(sub, true);
    registry
        .handle_intersection(&mut h.ports(), sub, &entries)
        .map(|(_, outcome)| outcome)
}

#[test]
fn rerender_restores_sentinel_as_last_child() {
    // GIVEN: A mounted filter list
    let mut h = Harness::new();
    let mut registry = BindingRegistry::default();
    let element = h.add_container("genre-container", ContainerKind::FilterList, 4);
    registry.mount(&mut h.ports(), element);

    // WHEN: The host replaces the list content and runs the update hook twice
    h.render("genre-container", 12);
    assert_eq!(h.sentinel_count("genre-container"), 0);
    let first = registry.post_update(&mut h.ports(), element).unwrap();
    let second = registry.post_update(&mut h.ports(), element).unwrap();

    // THEN: The sentinel is back, last, and only once
    assert_eq!(first.attach, Some(AttachOutcome::Reattached));
    assert_eq!(second.attach, Some(AttachOutcome::AlreadyPresent));
    assert_eq!(h.sentinel_count("genre-container"), 1);
    let list = h.content_list(element);
    assert_eq!(
        h.dom.last_child(list),
        registry.get(&cid("genre-container")).unwrap().sentinel()
    );
}

#[test]
fn teardown_releases_subscription_exactly_once() {
    // GIVEN: Two mounted containers
    let mut h = Harness::new();
    let mut registry = BindingRegistry::default();
    let genre = h.add_container("genre-container", ContainerKind::FilterList, 2);
    let results = h.add_container("search_results", ContainerKind::ResultStream, 2);
    registry.mount(&mut h.ports(), genre);
    registry.mount(&mut h.ports(), results);
    assert_eq!(h.observer.active_count(), 2);

    // WHEN: One is destroyed twice
    assert!(registry.destroy(&mut h.ports(), &cid("genre-container")));
    assert!(!registry.destroy(&mut h.ports(), &cid("genre-container")));

    // THEN: Exactly one disconnect, the other binding untouched
    assert_eq!(h.observer.disconnect_calls(), 1);
    assert_eq!(h.observer.active_count(), 1);
    assert_eq!(h.sentinel_count("genre-container"), 0);
    assert_eq!(h.sentinel_count("search_results"), 1);
}

#[test]
fn failure_reported_after_teardown_changes_nothing() {
    // GIVEN: A binding with a request in flight that is then destroyed
    let mut h = Harness::new();
    let mut registry = BindingRegistry::default();
    let element = h.add_container("genre-container", ContainerKind::FilterList, 2);
    registry.mount(&mut h.ports(), element);
    fire(&mut h, &mut registry, "genre-container");
    let Some(IntersectionOutcome::Emitted { ticket, .. }) =
        fire(&mut h, &mut registry, "genre-container")
    else {
        panic!("second callback should emit");
    };
    registry.destroy(&mut h.ports(), &cid("genre-container"));
    let dom_before = format!("{:?}", h.dom);

    // WHEN: The transport failure arrives late
    let reset = registry.dispatch_failed(
        &mut h.ports(),
        &cid("genre-container"),
        ticket,
        DispatchError::Transport {
            event: "load_more_genre".to_string(),
            reason: "late".to_string(),
        },
    );

    // THEN: It is ignored and the document is untouched
    assert!(!reset);
    assert_eq!(format!("{:?}", h.dom), dom_before);
    assert_eq!(h.host.attempts(), 1);
}

#[test]
fn unavailable_observer_leaves_binding_inert() {
    // GIVEN: An environment without an intersection API
    let mut h = Harness::new();
    h.observer.set_unavailable(true);
    let mut registry = BindingRegistry::default();
    let element = h.add_container("search_results", ContainerKind::ResultStream, 3);

    // WHEN: The container mounts and the host keeps updating it
    registry.mount(&mut h.ports(), element);
    h.observer.set_unavailable(false);
    let report = registry.post_update(&mut h.ports(), element).unwrap();

    // THEN: The binding is degraded, reports why and never emits
    let binding = registry.get(&cid("search_results")).unwrap();
    assert_eq!(binding.state(), LifecycleState::Degraded);
    assert!(!report.ran);
    assert_eq!(binding.diagnostics().count(DiagnosticCategory::Subscription), 1);
    assert_eq!(fire(&mut h, &mut registry, "search_results"), None);
    assert!(h.host.pushed().is_empty());
}

#[test]
fn shared_sentinel_has_a_single_owner() {
    // GIVEN: Shared sentinel placement and one mounted result stream
    let mut h = Harness::new();
    let mut registry = BindingRegistry::new(ControllerSettings {
        sentinel_placement: SentinelPlacement::Shared,
        ..ControllerSettings::default()
    });
    let first = h.add_container("search_results", ContainerKind::ResultStream, 3);
    let filter = h.add_container("genre-container", ContainerKind::FilterList, 3);
    registry.mount(&mut h.ports(), first);
    registry.mount(&mut h.ports(), filter);
    let old_sub = registry.get(&cid("search_results")).unwrap().subscription().unwrap();

    // WHEN: A second result stream mounts
    let second = h.add_container("saved_results", ContainerKind::ResultStream, 3);
    registry.mount(&mut h.ports(), second);

    // THEN: The previous owner is torn down; filter lists are unaffected
    assert!(registry.get(&cid("search_results")).is_none());
    assert!(!h.observer.is_active(old_sub));
    assert!(registry.get(&cid("genre-container")).is_some());
    let shared = h.dom.element_by_id(SHARED_SENTINEL_ID).expect("shared sentinel present");
    assert_eq!(h.dom.parent(shared), Some(second));
    assert_eq!(h.sentinel_count("genre-container"), 1);
}

#[test]
fn container_removed_from_document_stops_emitting() {
    // GIVEN: A mounted result stream past its initial callback
    let mut h = Harness::new();
    let mut registry = BindingRegistry::default();
    let element = h.add_container("search_results", ContainerKind::ResultStream, 3);
    registry.mount(&mut h.ports(), element);
    fire(&mut h, &mut registry, "search_results");

    // WHEN: The host removes the container without running destroy
    h.dom.remove(element);

    // THEN: Callbacks are suppressed instead of emitting for a detached node
    assert_eq!(
        fire(&mut h, &mut registry, "search_results"),
        Some(IntersectionOutcome::Suppressed(Suppression::ContainerMissing))
    );
}
