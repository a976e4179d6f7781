//! Property-based tests for the emission invariants.
//!
//! A random script of host events is replayed against one binding. After
//! every step the observable state must agree with a tiny reference model:
//!
//! - an event is only pushed while no request is outstanding
//! - nothing is pushed while the host reports loading
//! - the container never holds more than one sentinel
//! - a failure report resets only the request it names

use crate::harness::Harness;
use crate::model::{ContainerId, ContainerKind, DispatchError, RequestTicket};
use crate::state::{BindingRegistry, IntersectionOutcome};
use proptest::prelude::*;

const ID: &str = "genre-container";

#[derive(Debug, Clone)]
enum Action {
    Intersect { visible: bool },
    SetLoading(bool),
    Rerender { items: usize },
    Update,
    FailLatest,
    FailNextPush,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => any::<bool>().prop_map(|visible| Action::Intersect { visible }),
        2 => any::<bool>().prop_map(Action::SetLoading),
        1 => (0usize..30).prop_map(|items| Action::Rerender { items }),
        2 => Just(Action::Update),
        1 => Just(Action::FailLatest),
        1 => Just(Action::FailNextPush),
    ]
}

fn arb_kind() -> impl Strategy<Value = ContainerKind> {
    prop_oneof![Just(ContainerKind::FilterList), Just(ContainerKind::ResultStream)]
}

fn cid() -> ContainerId {
    ContainerId::new(ID).expect("valid container id")
}

proptest! {
    #[test]
    fn at_most_one_request_outstanding(
        kind in arb_kind(),
        actions in prop::collection::vec(arb_action(), 1..60),
    ) {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::default();
        let element = h.add_container(ID, kind, 10);
        registry.mount(&mut h.ports(), element);

        let mut loading = false;
        let mut latest: Option<RequestTicket> = None;

        for action in actions {
            let was_pending = registry.get(&cid()).expect("bound").is_pending();
            let pushed_before = h.host.pushed().len();

            match action {
                Action::Intersect { visible } => {
                    let sub = registry.get(&cid()).and_then(|b| b.subscription());
                    prop_assert!(sub.is_some(), "mounted binding must be observing");
                    let sub = sub.unwrap();
                    let entries = h.entries(sub, visible);
                    let outcome = registry.handle_intersection(&mut h.ports(), sub, &entries);
                    if let Some((_, IntersectionOutcome::Emitted { ticket, .. })) = outcome {
                        prop_assert!(!was_pending, "emitted while a request was outstanding");
                        prop_assert!(!loading, "emitted while the host was loading");
                        prop_assert!(visible, "emitted for an invisible sentinel");
                        latest = Some(ticket);
                    }
                }
                Action::SetLoading(value) => {
                    loading = value;
                    h.set_loading(ID, value);
                }
                Action::Rerender { items } => {
                    h.render(ID, items);
                }
                Action::Update => {
                    let report = registry.post_update(&mut h.ports(), element);
                    prop_assert!(report.is_some_and(|r| r.ran));
                    prop_assert_eq!(h.sentinel_count(ID), 1);
                    let pending = registry.get(&cid()).expect("bound").is_pending();
                    if !loading {
                        prop_assert!(!pending, "idle host update must reopen the gate");
                    } else {
                        prop_assert_eq!(pending, was_pending);
                    }
                }
                Action::FailLatest => {
                    if let Some(ticket) = latest {
                        let current = registry.get(&cid()).expect("bound").pending_ticket();
                        let reset = registry.dispatch_failed(
                            &mut h.ports(),
                            &cid(),
                            ticket,
                            DispatchError::Transport {
                                event: "load_more".to_string(),
                                reason: "proptest".to_string(),
                            },
                        );
                        prop_assert_eq!(reset, current == Some(ticket));
                    }
                }
                Action::FailNextPush => h.host.fail_next("proptest"),
            }

            prop_assert!(h.host.pushed().len() <= pushed_before + 1);
            prop_assert!(h.sentinel_count(ID) <= 1);
        }
    }

    #[test]
    fn destroy_tears_down_exactly_once(repeats in 1usize..5) {
        let mut h = Harness::new();
        let mut registry = BindingRegistry::default();
        let element = h.add_container(ID, ContainerKind::FilterList, 3);
        registry.mount(&mut h.ports(), element);

        let torn_down = (0..repeats)
            .filter(|_| registry.destroy(&mut h.ports(), &cid()))
            .count();

        prop_assert_eq!(torn_down, 1);
        prop_assert_eq!(h.observer.disconnect_calls(), 1);
        prop_assert_eq!(h.sentinel_count(ID), 0);
    }
}
