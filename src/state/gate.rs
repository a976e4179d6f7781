//! Request gate: at most one "load more" request in flight per binding.
//!
//! # State machine
//!
//! ```text
//!            try_emit (loading = false)
//!   Idle ──────────────────────────────▶ Pending{ticket}
//!    ▲                                        │
//!    ├──── dispatch_failed(ticket) ───────────┤
//!    └──── host_updated(loading = false) ─────┘
//! ```
//!
//! The gate moves to `Pending` before the caller dispatches, so there is no
//! window in which a second intersection can observe `Idle` for a request
//! that is already on its way.

use crate::model::identifiers::RequestTicket;

/// Whether a binding has a request outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// No request in flight; the next qualifying intersection may emit.
    #[default]
    Idle,
    /// A request was dispatched and has not been answered yet.
    Pending {
        /// Ticket of the outstanding request.
        ticket: RequestTicket,
    },
}

/// Outcome of [`RequestGate::try_emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The caller must dispatch now; the gate is already `Pending`.
    Emit(RequestTicket),
    /// A request from this binding is still in flight.
    SuppressedPending(RequestTicket),
    /// The host reports a fetch in progress.
    SuppressedLoading,
}

/// Per-binding guard that admits one request at a time.
#[derive(Debug, Clone, Default)]
pub struct RequestGate {
    state: GateState,
    last_ticket: Option<RequestTicket>,
}

impl RequestGate {
    /// Creates an idle gate that has never issued a ticket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gate state.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// True while a request is outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, GateState::Pending { .. })
    }

    /// Ticket of the request in flight, if any.
    pub fn pending_ticket(&self) -> Option<RequestTicket> {
        match self.state {
            GateState::Pending { ticket } => Some(ticket),
            GateState::Idle => None,
        }
    }

    /// Decide whether a qualifying intersection may emit.
    ///
    /// `external_loading` must be read from the host right before the call.
    pub fn try_emit(&mut self, external_loading: bool) -> GateDecision {
        if let GateState::Pending { ticket } = self.state {
            return GateDecision::SuppressedPending(ticket);
        }
        if external_loading {
            return GateDecision::SuppressedLoading;
        }

        let ticket = self
            .last_ticket
            .map_or(RequestTicket::new(1), RequestTicket::next);
        self.last_ticket = Some(ticket);
        self.state = GateState::Pending { ticket };
        GateDecision::Emit(ticket)
    }

    /// Reset after the request identified by `ticket` failed.
    ///
    /// Reports for any other ticket are stale and change nothing.
    /// Returns whether the gate reset.
    pub fn dispatch_failed(&mut self, ticket: RequestTicket) -> bool {
        match self.state {
            GateState::Pending { ticket: current } if current == ticket => {
                self.state = GateState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Apply a host post-update. Resets only once loading has cleared.
    /// Returns whether the gate reset.
    pub fn host_updated(&mut self, external_loading: bool) -> bool {
        if external_loading || !self.is_pending() {
            return false;
        }
        self.state = GateState::Idle;
        true
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
