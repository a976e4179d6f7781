//! Intersection API double that records every call.

use super::{IntersectionApi, ObserverOptions, SubscriptionId};
use crate::dom::NodeId;
use crate::model::error::SubscriptionError;
use std::collections::BTreeMap;

/// A subscription as seen by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedTarget {
    /// Observed node.
    pub target: NodeId,
    /// Options given to `observe`.
    pub options: ObserverOptions,
}

/// In-memory intersection API.
///
/// Hands out sequential subscription ids and keeps the set of live ones, so
/// tests can assert that bindings never leak or double-release a subscription.
#[derive(Debug, Clone, Default)]
pub struct RecordingIntersectionApi {
    next_id: u64,
    active: BTreeMap<SubscriptionId, ObservedTarget>,
    observe_calls: usize,
    disconnect_calls: usize,
    unavailable: bool,
}

impl RecordingIntersectionApi {
    /// An available API with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// An API whose `observe` always fails with [`SubscriptionError::Unavailable`].
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Toggle whether later `observe` calls fail.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Whether `subscription` is live.
    pub fn is_active(&self, subscription: SubscriptionId) -> bool {
        self.active.contains_key(&subscription)
    }

    /// Number of live subscriptions.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// What a live subscription watches.
    pub fn observed(&self, subscription: SubscriptionId) -> Option<&ObservedTarget> {
        self.active.get(&subscription)
    }

    /// Live subscriptions watching `target`.
    pub fn subscriptions_for(&self, target: NodeId) -> Vec<SubscriptionId> {
        self.active
            .iter()
            .filter(|(_, o)| o.target == target)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Total `observe` calls, failed ones included.
    pub fn observe_calls(&self) -> usize {
        self.observe_calls
    }

    /// Total `disconnect` calls.
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls
    }
}

impl IntersectionApi for RecordingIntersectionApi {
    fn observe(
        &mut self,
        target: NodeId,
        options: &ObserverOptions,
    ) -> Result<SubscriptionId, SubscriptionError> {
        self.observe_calls += 1;
        if self.unavailable {
            return Err(SubscriptionError::Unavailable);
        }
        if !(0.0..=1.0).contains(&options.threshold) {
            return Err(SubscriptionError::InvalidOptions {
                reason: format!("threshold {} outside [0, 1]", options.threshold),
            });
        }

        self.next_id += 1;
        let id = SubscriptionId::from_raw(self.next_id);
        self.active.insert(
            id,
            ObservedTarget {
                target,
                options: options.clone(),
            },
        );
        Ok(id)
    }

    fn disconnect(&mut self, subscription: SubscriptionId) {
        self.disconnect_calls += 1;
        self.active.remove(&subscription);
    }
}
