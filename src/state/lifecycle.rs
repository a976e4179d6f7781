//! Lifecycle coordinator: one binding between a container and the host.
//!
//! # State machine
//!
//! ```text
//!   Mounted ──setup ok──▶ Active ◀──────┐
//!      │                    │           │ resync done
//!      │ observer failed    │ post_update
//!      ▼                    ▼           │
//!   Degraded ◀──observer── Resyncing ───┘
//!      │        failed
//!      └──────────────┬─────────────────── destroy (from any state)
//!                     ▼
//!                 Destroyed
//! ```
//!
//! Hooks never return errors to the host. Failures are recorded in the
//! binding's [`DiagnosticLog`] and the binding carries on, degraded if it must.

use crate::dom::{Dom, NodeId};
use crate::host::Host;
use crate::model::container::{ContainerBinding, ContainerKind};
use crate::model::diagnostics::DiagnosticLog;
use crate::model::error::{BindingError, ControllerError, DispatchError, SubscriptionError};
use crate::model::event_name::EventName;
use crate::model::identifiers::{ContainerId, RequestTicket};
use crate::model::margin::RootMargin;
use crate::observer::{
    IntersectionApi, IntersectionEntry, ObserverOptions, ObserverRoot, Rejected, SubscriptionId,
    VisibilityObserver,
};
use crate::state::gate::{GateDecision, GateState, RequestGate};
use crate::state::sentinel::{AttachOutcome, SentinelManager};
use crate::state::settings::ControllerSettings;
use serde::Serialize;
use serde_json::json;

/// Borrowed host collaborators for the duration of one hook.
pub struct Ports<'a> {
    /// The page document.
    pub dom: &'a mut dyn Dom,
    /// Source of visibility subscriptions.
    pub observer: &'a mut dyn IntersectionApi,
    /// Channel "load more" events are pushed through.
    pub host: &'a mut dyn Host,
}

impl<'a> Ports<'a> {
    /// Bundle the three collaborators.
    pub fn new(
        dom: &'a mut dyn Dom,
        observer: &'a mut dyn IntersectionApi,
        host: &'a mut dyn Host,
    ) -> Self {
        Self {
            dom,
            observer,
            host,
        }
    }
}

/// Where a binding is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Binding created, sentinel and observer not yet set up.
    Mounted,
    /// Observing; intersections may emit.
    Active,
    /// Re-synchronizing after a host update.
    Resyncing,
    /// Observer unavailable: mounted but permanently inert.
    Degraded,
    /// Torn down. Terminal.
    Destroyed,
}

impl LifecycleState {
    /// Lower-case name used in traces and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mounted => "mounted",
            Self::Active => "active",
            Self::Resyncing => "resyncing",
            Self::Degraded => "degraded",
            Self::Destroyed => "destroyed",
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Mounted, Active)
                | (Mounted, Degraded)
                | (Active, Resyncing)
                | (Resyncing, Active)
                | (Resyncing, Degraded)
                | (Mounted | Active | Resyncing | Degraded, Destroyed)
        )
    }
}

/// Why an intersection callback did not emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// The binding is not `Active`.
    Inactive,
    /// Callback for a subscription this binding no longer owns.
    ForeignSubscription,
    /// First callback after mount.
    InitialCallback,
    /// No entry for the sentinel in the batch.
    NoEntry,
    /// The sentinel left the viewport.
    NotIntersecting,
    /// The container is no longer in the document.
    ContainerMissing,
    /// A request from this binding is in flight.
    Pending(RequestTicket),
    /// The host reports a fetch in progress.
    Loading,
}

/// Result of handling one intersection callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntersectionOutcome {
    /// The host accepted a "load more" event.
    Emitted {
        /// Event pushed.
        event: EventName,
        /// Ticket now outstanding.
        ticket: RequestTicket,
    },
    /// Emission was attempted but the host refused it; the gate reset.
    DispatchFailed {
        /// Event that was refused.
        event: EventName,
        /// Ticket of the refused request.
        ticket: RequestTicket,
    },
    /// Nothing was pushed.
    Suppressed(Suppression),
}

/// What a post-update resync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResyncReport {
    /// Whether the resync ran at all (skipped when Degraded or Destroyed).
    pub ran: bool,
    /// Sentinel placement result, `None` if the target list was missing.
    pub attach: Option<AttachOutcome>,
    /// Whether the subscription had to be replaced.
    pub observer_restarted: bool,
    /// Whether the gate went back to idle.
    pub gate_reset: bool,
}

/// Controller instance for one mounted container.
#[derive(Debug, Clone)]
pub struct InfiniteScroll {
    binding: ContainerBinding,
    event: EventName,
    state: LifecycleState,
    sentinel: SentinelManager,
    observer: VisibilityObserver,
    gate: RequestGate,
    loading_attribute: String,
    threshold: f64,
    margin: RootMargin,
    diagnostics: DiagnosticLog,
}

impl InfiniteScroll {
    /// Read the binding identity from a container element.
    pub fn identify(
        dom: &dyn Dom,
        element: NodeId,
        settings: &ControllerSettings,
    ) -> Result<ContainerBinding, BindingError> {
        let raw = dom.attribute(element, "id").ok_or(BindingError::MissingId)?;
        let id = ContainerId::new(raw)?;
        let discriminator = dom.attribute(element, &settings.kind_attribute);
        let kind = ContainerKind::infer(&id, discriminator.as_deref());
        Ok(ContainerBinding::new(id, kind))
    }

    /// Mount hook: create the binding, attach the sentinel, start observing.
    ///
    /// Only an unusable container identity is returned as an error; every
    /// other failure is recorded and leaves a (possibly degraded) binding.
    pub fn mount(
        ports: &mut Ports<'_>,
        element: NodeId,
        settings: &ControllerSettings,
    ) -> Result<Self, BindingError> {
        let binding = Self::identify(ports.dom, element, settings)?;
        let mut this = Self {
            event: EventName::for_container(binding.kind(), binding.id()),
            sentinel: SentinelManager::new(binding.kind(), settings.sentinel_placement),
            observer: VisibilityObserver::new(settings.first_intersection),
            gate: RequestGate::new(),
            loading_attribute: settings.loading_attribute.clone(),
            threshold: settings.threshold,
            margin: settings.margin_for(binding.kind()),
            diagnostics: DiagnosticLog::new(settings.diagnostic_capacity),
            state: LifecycleState::Mounted,
            binding,
        };
        tracing::debug!(
            container = %this.id(),
            kind = %this.kind(),
            event = %this.event,
            "binding mounted"
        );

        if this.place_sentinel(ports, element).is_some() {
            if let Err(err) = this.sync_observer(ports, element) {
                this.record(err.into());
                this.transition(LifecycleState::Degraded);
                return Ok(this);
            }
        }
        this.transition(LifecycleState::Active);
        Ok(this)
    }

    /// Observer callback: decide whether this intersection emits.
    pub fn handle_intersection(
        &mut self,
        ports: &mut Ports<'_>,
        subscription: SubscriptionId,
        entries: &[IntersectionEntry],
    ) -> IntersectionOutcome {
        use IntersectionOutcome::Suppressed;

        if self.state != LifecycleState::Active {
            return Suppressed(Suppression::Inactive);
        }

        let visible = match self.observer.accept(subscription, entries) {
            Ok(visible) => visible,
            Err(Rejected::ForeignSubscription) => {
                return Suppressed(Suppression::ForeignSubscription)
            }
            Err(Rejected::InitialCallback) => {
                tracing::debug!(container = %self.id(), "initial intersection ignored");
                return Suppressed(Suppression::InitialCallback);
            }
            Err(Rejected::NoEntry) => return Suppressed(Suppression::NoEntry),
        };
        if !visible {
            return Suppressed(Suppression::NotIntersecting);
        }

        let Some(container) = ports.dom.element_by_id(self.id().as_str()) else {
            tracing::debug!(container = %self.id(), "container gone, intersection ignored");
            return Suppressed(Suppression::ContainerMissing);
        };
        let loading = self.read_loading(ports.dom, container);

        match self.gate.try_emit(loading) {
            GateDecision::SuppressedPending(ticket) => {
                tracing::trace!(container = %self.id(), %ticket, "request already pending");
                Suppressed(Suppression::Pending(ticket))
            }
            GateDecision::SuppressedLoading => {
                tracing::trace!(container = %self.id(), "host is loading");
                Suppressed(Suppression::Loading)
            }
            GateDecision::Emit(ticket) => self.dispatch(ports, ticket),
        }
    }

    fn dispatch(&mut self, ports: &mut Ports<'_>, ticket: RequestTicket) -> IntersectionOutcome {
        self.sentinel.set_indicator(ports.dom, true);
        let event = self.event.clone();

        match ports.host.push_event(self.binding.id(), &event, &json!({})) {
            Ok(()) => {
                tracing::info!(container = %self.id(), %event, %ticket, "load more requested");
                IntersectionOutcome::Emitted { event, ticket }
            }
            Err(err) => {
                self.recover_dispatch(ports.dom, ticket, err);
                IntersectionOutcome::DispatchFailed { event, ticket }
            }
        }
    }

    /// Asynchronous transport failure of request `ticket`.
    ///
    /// Ignored once destroyed, and for any ticket other than the pending one.
    /// Returns whether the gate reset.
    pub fn dispatch_failed(
        &mut self,
        ports: &mut Ports<'_>,
        ticket: RequestTicket,
        err: DispatchError,
    ) -> bool {
        if self.state == LifecycleState::Destroyed {
            tracing::debug!(container = %self.id(), %ticket, "failure after destroy ignored");
            return false;
        }
        if self.gate.pending_ticket() != Some(ticket) {
            tracing::debug!(container = %self.id(), %ticket, "stale failure ignored");
            return false;
        }
        self.recover_dispatch(ports.dom, ticket, err)
    }

    fn recover_dispatch(
        &mut self,
        dom: &mut dyn Dom,
        ticket: RequestTicket,
        err: DispatchError,
    ) -> bool {
        let reset = self.gate.dispatch_failed(ticket);
        self.sentinel.set_indicator(dom, false);
        self.record(err.into());
        reset
    }

    /// Post-update hook: the host re-rendered the container.
    pub fn post_update(&mut self, ports: &mut Ports<'_>, element: NodeId) -> ResyncReport {
        if !matches!(self.state, LifecycleState::Active) {
            tracing::debug!(container = %self.id(), state = ?self.state, "resync skipped");
            return ResyncReport::default();
        }
        self.transition(LifecycleState::Resyncing);

        let mut report = ResyncReport {
            ran: true,
            ..ResyncReport::default()
        };

        report.attach = self.place_sentinel(ports, element);
        if report.attach.is_some() {
            match self.sync_observer(ports, element) {
                Ok(restarted) => report.observer_restarted = restarted,
                Err(err) => {
                    self.record(err.into());
                    self.transition(LifecycleState::Degraded);
                    return report;
                }
            }
        }

        let loading = self.read_loading(ports.dom, element);
        if !loading {
            self.sentinel.set_indicator(ports.dom, false);
        }
        report.gate_reset = self.gate.host_updated(loading);

        self.transition(LifecycleState::Active);
        report
    }

    /// Teardown hook. Releases the subscription and detaches the sentinel.
    ///
    /// Returns `false` if the binding was already destroyed.
    pub fn destroy(&mut self, ports: &mut Ports<'_>) -> bool {
        if self.state == LifecycleState::Destroyed {
            return false;
        }
        self.observer.stop_watching(ports.observer);
        self.sentinel.detach(ports.dom);
        self.transition(LifecycleState::Destroyed);
        true
    }

    /// Attach the sentinel, recording a diagnostic on failure.
    fn place_sentinel(
        &mut self,
        ports: &mut Ports<'_>,
        element: NodeId,
    ) -> Option<AttachOutcome> {
        let id = self.binding.id().clone();
        match self.sentinel.attach(ports.dom, element, &id) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.record(err.into());
                None
            }
        }
    }

    /// Make sure the observer watches the sentinel against the current root.
    ///
    /// Returns whether a (re)subscription happened.
    fn sync_observer(
        &mut self,
        ports: &mut Ports<'_>,
        element: NodeId,
    ) -> Result<bool, SubscriptionError> {
        let Some(sentinel) = self.sentinel.node() else {
            return Ok(false);
        };
        let root = match self.kind() {
            ContainerKind::ResultStream => ObserverRoot::Viewport,
            ContainerKind::FilterList => {
                match SentinelManager::target_list(ports.dom, element, self.id(), self.kind()) {
                    Ok(list) => ObserverRoot::Element(list),
                    Err(err) => {
                        self.record(err.into());
                        return Ok(false);
                    }
                }
            }
        };
        let options = ObserverOptions {
            root,
            threshold: self.threshold,
            margin: self.margin,
        };

        let current = self.observer.options().map(|o| o.root);
        if current == Some(root) && self.observer.target() == Some(sentinel) {
            return Ok(false);
        }

        self.observer
            .start_watching(ports.observer, sentinel, options)
            .map(|_| true)
    }

    fn read_loading(&self, dom: &dyn Dom, container: NodeId) -> bool {
        dom.attribute(container, &self.loading_attribute)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn transition(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal lifecycle transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(container = %self.id(), from = ?self.state, to = ?next, "lifecycle");
        self.state = next;
    }

    fn record(&mut self, err: ControllerError) {
        let id = self.binding.id().clone();
        self.diagnostics.record(&id, &err);
    }

    /// Container id.
    pub fn id(&self) -> &ContainerId {
        self.binding.id()
    }

    /// Container kind.
    pub fn kind(&self) -> ContainerKind {
        self.binding.kind()
    }

    /// Identity fixed at mount.
    pub fn binding(&self) -> &ContainerBinding {
        &self.binding
    }

    /// Event this binding pushes.
    pub fn event_name(&self) -> &EventName {
        &self.event
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Current gate state.
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// True while a request is outstanding.
    pub fn is_pending(&self) -> bool {
        self.gate.is_pending()
    }

    /// Ticket of the outstanding request.
    pub fn pending_ticket(&self) -> Option<RequestTicket> {
        self.gate.pending_ticket()
    }

    /// Live subscription, `None` once degraded or destroyed.
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.observer.subscription()
    }

    /// The sentinel node, attached or not.
    pub fn sentinel(&self) -> Option<NodeId> {
        self.sentinel.node()
    }

    /// Failures recorded by this binding.
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Consume the binding, keeping only what it recorded.
    pub fn into_diagnostics(self) -> DiagnosticLog {
        self.diagnostics
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
