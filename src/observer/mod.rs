//! Visibility observer.
//!
//! Wraps one intersection subscription per binding. Callbacks are not
//! closures: the host delivers them back to the controller tagged with the
//! [`SubscriptionId`] they belong to, and [`VisibilityObserver::accept`]
//! decides whether each one counts.

use crate::dom::NodeId;
use crate::model::error::SubscriptionError;
use crate::model::margin::RootMargin;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod recording;

pub use recording::RecordingIntersectionApi;

/// Id of a live subscription, minted by the [`IntersectionApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wrap an id minted by an [`IntersectionApi`] implementation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The id as minted.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// Box the sentinel's intersection is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverRoot {
    /// The page viewport (main scrollbar).
    Viewport,
    /// A scrollable element. Required for nested lists, whose sentinel
    /// otherwise never intersects the viewport independently of the list.
    Element(NodeId),
}

/// Settings passed to [`IntersectionApi::observe`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    /// Box the sentinel is measured against.
    pub root: ObserverRoot,
    /// Visible fraction at which the sentinel counts as intersecting.
    pub threshold: f64,
    /// Growth applied to the root box.
    pub margin: RootMargin,
}

/// One entry of an intersection callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionEntry {
    /// Observed node.
    pub target: NodeId,
    /// Whether the node currently intersects the root.
    pub is_intersecting: bool,
}

/// Whether the first callback after mount is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstIntersectionPolicy {
    /// Ignore the first callback: it reports the initial layout, not scrolling.
    #[default]
    Suppress,
    /// Treat the first callback like any other.
    Deliver,
}

/// The host's intersection observer.
pub trait IntersectionApi {
    /// Start observing `target`. The returned id tags every later callback.
    fn observe(
        &mut self,
        target: NodeId,
        options: &ObserverOptions,
    ) -> Result<SubscriptionId, SubscriptionError>;

    /// Release a subscription. Unknown ids are ignored.
    fn disconnect(&mut self, subscription: SubscriptionId);
}

#[derive(Debug, Clone)]
struct ActiveSubscription {
    id: SubscriptionId,
    target: NodeId,
    options: ObserverOptions,
}

/// Why a callback did not produce a visibility reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Callback for a subscription that is not (or no longer) ours.
    ForeignSubscription,
    /// First callback after mount under [`FirstIntersectionPolicy::Suppress`].
    InitialCallback,
    /// Callback with no entry for the sentinel.
    NoEntry,
}

/// Holds the binding's single subscription.
#[derive(Debug, Clone)]
pub struct VisibilityObserver {
    active: Option<ActiveSubscription>,
    policy: FirstIntersectionPolicy,
    initial_pending: bool,
}

impl VisibilityObserver {
    /// Idle observer; nothing is watched until [`Self::start_watching`].
    pub fn new(policy: FirstIntersectionPolicy) -> Self {
        Self {
            active: None,
            policy,
            initial_pending: policy == FirstIntersectionPolicy::Suppress,
        }
    }

    /// Subscribe to `sentinel`, replacing any current subscription.
    ///
    /// The previous subscription is released first so at most one is ever
    /// active.
    pub fn start_watching(
        &mut self,
        api: &mut dyn IntersectionApi,
        sentinel: NodeId,
        options: ObserverOptions,
    ) -> Result<SubscriptionId, SubscriptionError> {
        self.stop_watching(api);
        let id = api.observe(sentinel, &options)?;
        tracing::debug!(subscription = %id, ?options, "observer started");
        self.active = Some(ActiveSubscription {
            id,
            target: sentinel,
            options,
        });
        Ok(id)
    }

    /// Release the subscription. Returns whether one was active.
    pub fn stop_watching(&mut self, api: &mut dyn IntersectionApi) -> bool {
        match self.active.take() {
            Some(sub) => {
                api.disconnect(sub.id);
                tracing::debug!(subscription = %sub.id, "observer stopped");
                true
            }
            None => false,
        }
    }

    /// Filter a callback down to the sentinel's visibility.
    ///
    /// The first accepted-subscription callback after construction is
    /// swallowed under the `Suppress` policy, whatever it reports.
    pub fn accept(
        &mut self,
        subscription: SubscriptionId,
        entries: &[IntersectionEntry],
    ) -> Result<bool, Rejected> {
        let active = match &self.active {
            Some(active) if active.id == subscription => active,
            _ => return Err(Rejected::ForeignSubscription),
        };

        if self.initial_pending {
            self.initial_pending = false;
            return Err(Rejected::InitialCallback);
        }

        entries
            .iter()
            .rev()
            .find(|e| e.target == active.target)
            .map(|e| e.is_intersecting)
            .ok_or(Rejected::NoEntry)
    }

    /// True while a subscription is held.
    pub fn is_watching(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the current subscription.
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Options the current subscription was started with.
    pub fn options(&self) -> Option<&ObserverOptions> {
        self.active.as_ref().map(|a| &a.options)
    }

    /// Node observed by the current subscription.
    pub fn target(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.target)
    }

    /// How the first callback is treated.
    pub fn policy(&self) -> FirstIntersectionPolicy {
        self.policy
    }
}
