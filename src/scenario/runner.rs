//! Scenario replay against the in-memory host.

use super::{Scenario, Step};
use crate::harness::Harness;
use crate::model::container::ContainerKind;
use crate::model::diagnostics::Diagnostic;
use crate::model::error::DispatchError;
use crate::model::identifiers::{ContainerId, RequestTicket};
use crate::observer::SubscriptionId;
use crate::state::lifecycle::{IntersectionOutcome, LifecycleState, Suppression};
use crate::state::registry::{BindingRegistry, MountOutcome};
use crate::state::sentinel::AttachOutcome;
use crate::state::settings::ControllerSettings;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceKind {
    /// The mount hook created a binding.
    Mounted {
        /// State right after mount.
        state: LifecycleState,
    },
    /// The mount hook replaced an existing binding for the same id.
    Remounted {
        /// State right after mount.
        state: LifecycleState,
    },
    /// The mount hook refused the container.
    Rejected {
        /// Binding error message.
        reason: String,
    },
    /// A "load more" event reached the host.
    Emitted {
        /// Event name.
        name: String,
        /// Request ticket.
        ticket: u64,
    },
    /// The host refused the push synchronously.
    DispatchFailed {
        /// Event name.
        name: String,
        /// Ticket of the failed request.
        ticket: u64,
    },
    /// A callback did not lead to an emission.
    Suppressed {
        /// Why.
        reason: String,
    },
    /// Callback for a subscription no binding owns any more.
    CallbackDropped,
    /// No subscription has ever existed for the container.
    NotObserving,
    /// The post-update hook ran.
    Resynced {
        /// What happened to the sentinel.
        sentinel: Option<&'static str>,
        /// Whether the subscription was replaced.
        observer_restarted: bool,
        /// Whether the gate went back to idle.
        gate_reset: bool,
    },
    /// The post-update hook found an inert binding.
    ResyncSkipped,
    /// The step targeted a container with no binding.
    NotMounted,
    /// The destroy hook tore a binding down.
    Destroyed,
    /// The loading attribute changed.
    LoadingSet {
        /// New value.
        loading: bool,
    },
    /// The host re-rendered the container's items.
    Rendered {
        /// Item count after the re-render.
        items: usize,
    },
    /// An asynchronous failure was reported.
    FailureReported {
        /// Ticket named in the report.
        ticket: u64,
        /// Whether the report matched the outstanding request.
        gate_reset: bool,
    },
    /// A failure step found no request to fail.
    NoRequest,
    /// The next push is armed to fail.
    DispatchWillFail {
        /// Transport error message.
        reason: String,
    },
    /// The intersection API was toggled.
    ApiAvailability {
        /// Whether subscriptions can be created.
        available: bool,
    },
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kept = |changed: bool, yes: &'static str| if changed { yes } else { "kept" };
        match self {
            TraceKind::Mounted { state } => write!(f, "mounted ({})", state.as_str()),
            TraceKind::Remounted { state } => write!(f, "remounted ({})", state.as_str()),
            TraceKind::Rejected { reason } => write!(f, "rejected: {reason}"),
            TraceKind::Emitted { name, ticket } => write!(f, "emit {name} #{ticket}"),
            TraceKind::DispatchFailed { name, ticket } => {
                write!(f, "dispatch failed {name} #{ticket}")
            }
            TraceKind::Suppressed { reason } => write!(f, "suppressed ({reason})"),
            TraceKind::CallbackDropped => f.write_str("callback dropped"),
            TraceKind::NotObserving => f.write_str("not observing"),
            TraceKind::Resynced {
                sentinel,
                observer_restarted,
                gate_reset,
            } => write!(
                f,
                "resync sentinel={} observer={} gate={}",
                sentinel.unwrap_or("missing"),
                kept(*observer_restarted, "restarted"),
                kept(*gate_reset, "reset"),
            ),
            TraceKind::ResyncSkipped => f.write_str("resync skipped"),
            TraceKind::NotMounted => f.write_str("not mounted"),
            TraceKind::Destroyed => f.write_str("destroyed"),
            TraceKind::LoadingSet { loading } => write!(f, "loading={loading}"),
            TraceKind::Rendered { items } => write!(f, "rendered {items} items"),
            TraceKind::FailureReported { ticket, gate_reset } => {
                let effect = if *gate_reset { "gate reset" } else { "ignored" };
                write!(f, "failure #{ticket} {effect}")
            }
            TraceKind::NoRequest => f.write_str("no request to fail"),
            TraceKind::DispatchWillFail { reason } => write!(f, "next dispatch fails: {reason}"),
            TraceKind::ApiAvailability { available } => {
                let state = if *available { "available" } else { "unavailable" };
                write!(f, "observer api {state}")
            }
        }
    }
}

/// One line of the replay trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    /// 1-based step index.
    pub step: usize,
    /// Container the step targeted, `None` for page-wide steps.
    pub container: Option<String>,
    /// What happened.
    #[serde(flatten)]
    pub kind: TraceKind,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let container = self.container.as_deref().unwrap_or("-");
        write!(f, "{:02} {} {}", self.step, container, self.kind)
    }
}

/// Accepted events for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmissionCount {
    /// Container id.
    pub container: String,
    /// Events the host accepted.
    pub emitted: usize,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Scenario label.
    pub name: Option<String>,
    /// Trace, one entry per step.
    pub events: Vec<TraceEvent>,
    /// Accepted "load more" events per container, in declaration order.
    pub emissions: Vec<EmissionCount>,
    /// Diagnostics recorded during the replay, including those of destroyed bindings.
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Accepted events for `container`, zero if it never emitted.
    pub fn emitted(&self, container: &str) -> usize {
        self.emissions
            .iter()
            .find(|e| e.container == container)
            .map_or(0, |e| e.emitted)
    }

    /// One line per event plus a summary.
    pub fn render_lines(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&event.to_string());
            out.push('\n');
        }
        let summary = if self.emissions.is_empty() {
            "none".to_string()
        } else {
            self.emissions
                .iter()
                .map(|e| format!("{}={}", e.container, e.emitted))
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.push_str(&format!("emitted: {summary}\n"));
        out.push_str(&format!("diagnostics: {}\n", self.diagnostics.len()));
        out
    }

    /// Pretty-printed JSON form of the report.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn describe_suppression(reason: Suppression) -> String {
    match reason {
        Suppression::Inactive => "inactive".to_string(),
        Suppression::ForeignSubscription => "foreign subscription".to_string(),
        Suppression::InitialCallback => "initial callback".to_string(),
        Suppression::NoEntry => "no entry".to_string(),
        Suppression::NotIntersecting => "not intersecting".to_string(),
        Suppression::ContainerMissing => "container missing".to_string(),
        Suppression::Pending(ticket) => format!("pending {ticket}"),
        Suppression::Loading => "loading".to_string(),
    }
}

fn describe_attach(outcome: AttachOutcome) -> &'static str {
    match outcome {
        AttachOutcome::Created => "created",
        AttachOutcome::Adopted => "adopted",
        AttachOutcome::Reattached => "reattached",
        AttachOutcome::Moved => "moved",
        AttachOutcome::AlreadyPresent => "present",
    }
}

/// Replay state: the host, the registry and what the host remembers about it.
struct Replay {
    harness: Harness,
    registry: BindingRegistry,
    /// Last subscription seen per container. Kept after destroy so late
    /// callbacks can be delivered to a released subscription.
    subscriptions: HashMap<String, SubscriptionId>,
    /// Latest request per container, for `dispatch_failed` steps.
    tickets: HashMap<String, RequestTicket>,
}

impl Replay {
    fn new(settings: &ControllerSettings) -> Self {
        Self {
            harness: Harness::with_settings(settings),
            registry: BindingRegistry::new(settings.clone()),
            subscriptions: HashMap::new(),
            tickets: HashMap::new(),
        }
    }

    fn state_of(&self, id: &ContainerId) -> LifecycleState {
        self.registry
            .get(id)
            .map_or(LifecycleState::Destroyed, |b| b.state())
    }

    fn apply(&mut self, step: &Step) -> TraceKind {
        match step {
            Step::Mount { container } => {
                let Some(element) = self.harness.container(container) else {
                    return TraceKind::NotMounted;
                };
                let outcome = self.registry.mount(&mut self.harness.ports(), element);
                match outcome {
                    MountOutcome::Mounted(id) => TraceKind::Mounted {
                        state: self.state_of(&id),
                    },
                    MountOutcome::Replaced(id) => TraceKind::Remounted {
                        state: self.state_of(&id),
                    },
                    MountOutcome::Rejected(err) => TraceKind::Rejected {
                        reason: err.to_string(),
                    },
                }
            }
            Step::Intersect { container, visible } => {
                let Some(sub) = self.subscriptions.get(container).copied() else {
                    return TraceKind::NotObserving;
                };
                let entries = self.harness.entries(sub, *visible);
                let routed = self
                    .registry
                    .handle_intersection(&mut self.harness.ports(), sub, &entries);
                match routed {
                    None => TraceKind::CallbackDropped,
                    Some((_, IntersectionOutcome::Emitted { event, ticket })) => {
                        self.tickets.insert(container.clone(), ticket);
                        TraceKind::Emitted {
                            name: event.to_string(),
                            ticket: ticket.get(),
                        }
                    }
                    Some((_, IntersectionOutcome::DispatchFailed { event, ticket })) => {
                        self.tickets.insert(container.clone(), ticket);
                        TraceKind::DispatchFailed {
                            name: event.to_string(),
                            ticket: ticket.get(),
                        }
                    }
                    Some((_, IntersectionOutcome::Suppressed(reason))) => TraceKind::Suppressed {
                        reason: describe_suppression(reason),
                    },
                }
            }
            Step::SetLoading { container, loading } => {
                match self.harness.set_loading(container, *loading) {
                    Some(_) => TraceKind::LoadingSet { loading: *loading },
                    None => TraceKind::NotMounted,
                }
            }
            Step::Render { container, items } => match self.harness.render(container, *items) {
                Some(_) => TraceKind::Rendered { items: *items },
                None => TraceKind::NotMounted,
            },
            Step::Update { container } => {
                let Some(element) = self.harness.container(container) else {
                    return TraceKind::NotMounted;
                };
                match self.registry.post_update(&mut self.harness.ports(), element) {
                    Some(report) if report.ran => TraceKind::Resynced {
                        sentinel: report.attach.map(describe_attach),
                        observer_restarted: report.observer_restarted,
                        gate_reset: report.gate_reset,
                    },
                    Some(_) => TraceKind::ResyncSkipped,
                    None => TraceKind::NotMounted,
                }
            }
            Step::FailNextDispatch { reason } => {
                self.harness.host.fail_next(reason.clone());
                TraceKind::DispatchWillFail {
                    reason: reason.clone(),
                }
            }
            Step::DispatchFailed { container, reason } => {
                let Some(ticket) = self.tickets.get(container).copied() else {
                    return TraceKind::NoRequest;
                };
                let Ok(id) = ContainerId::new(container.as_str()) else {
                    return TraceKind::NotMounted;
                };
                let event = self
                    .registry
                    .get(&id)
                    .map(|b| b.event_name().to_string())
                    .unwrap_or_default();
                let err = DispatchError::Transport {
                    event,
                    reason: reason.clone(),
                };
                let gate_reset = self.registry.dispatch_failed(
                    &mut self.harness.ports(),
                    &id,
                    ticket,
                    err,
                );
                TraceKind::FailureReported {
                    ticket: ticket.get(),
                    gate_reset,
                }
            }
            Step::Destroy { container } => {
                let Ok(id) = ContainerId::new(container.as_str()) else {
                    return TraceKind::NotMounted;
                };
                if self.registry.destroy(&mut self.harness.ports(), &id) {
                    TraceKind::Destroyed
                } else {
                    TraceKind::NotMounted
                }
            }
            Step::ApiUnavailable { unavailable } => {
                self.harness.observer.set_unavailable(*unavailable);
                TraceKind::ApiAvailability {
                    available: !unavailable,
                }
            }
        }
    }

    fn remember_subscriptions(&mut self) {
        for binding in self.registry.iter() {
            if let Some(sub) = binding.subscription() {
                self.subscriptions
                    .insert(binding.id().as_str().to_string(), sub);
            }
        }
    }
}

/// Replay `scenario` with `settings` and collect the trace.
pub fn run(scenario: &Scenario, settings: &ControllerSettings) -> Report {
    let mut replay = Replay::new(settings);

    for spec in &scenario.containers {
        let kind = spec.kind.unwrap_or_else(|| {
            ContainerId::new(spec.id.as_str())
                .map(|id| ContainerKind::infer(&id, None))
                .unwrap_or(ContainerKind::FilterList)
        });
        if spec.kind.is_some() {
            replay.harness.add_container(&spec.id, kind, spec.items);
        } else {
            replay.harness.add_unlabelled_container(&spec.id, kind, spec.items);
        }
        if spec.loading {
            replay.harness.set_loading(&spec.id, true);
        }
    }

    let mut events = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let kind = replay.apply(step);
        replay.remember_subscriptions();
        tracing::debug!(step = index + 1, trace = %kind, "scenario step");
        events.push(TraceEvent {
            step: index + 1,
            container: step.container().map(str::to_string),
            kind,
        });
    }

    let emissions = scenario
        .containers
        .iter()
        .map(|spec| EmissionCount {
            container: spec.id.clone(),
            emitted: ContainerId::new(spec.id.as_str())
                .map(|id| replay.harness.host.events_for(&id).len())
                .unwrap_or(0),
        })
        .collect();

    let diagnostics = replay.registry.diagnostics().cloned().collect();

    Report {
        name: scenario.name.clone(),
        events,
        emissions,
        diagnostics,
    }
}
