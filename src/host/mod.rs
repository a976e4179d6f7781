//! Outbound channel to the host.
//!
//! The controller only ever tells the host "load more". Fetching and
//! re-rendering are the host's business; it reports back through the
//! post-update hook.

use crate::model::error::DispatchError;
use crate::model::event_name::EventName;
use crate::model::identifiers::ContainerId;
use serde_json::Value;
use std::collections::VecDeque;

/// Host side of the event channel.
pub trait Host {
    /// Push `event` to the server-side handler owning `target`.
    ///
    /// Fire-and-forget: `Ok` means the host accepted the event for delivery,
    /// not that data arrived. Transport failures discovered later are reported
    /// back through the registry's `dispatch_failed`.
    fn push_event(
        &mut self,
        target: &ContainerId,
        event: &EventName,
        payload: &Value,
    ) -> Result<(), DispatchError>;
}

/// An event accepted by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct PushedEvent {
    /// Container the event was pushed to.
    pub target: ContainerId,
    /// Event name.
    pub event: EventName,
    /// Payload; always an empty object for "load more" requests.
    pub payload: Value,
}

/// Host double that records pushed events and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pushed: Vec<PushedEvent>,
    failures: VecDeque<String>,
    attempts: usize,
}

impl RecordingHost {
    /// A host that accepts every push.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next push fail with a transport error carrying `reason`.
    /// Queued failures are consumed in order.
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.failures.push_back(reason.into());
    }

    /// Accepted events, oldest first.
    pub fn pushed(&self) -> &[PushedEvent] {
        &self.pushed
    }

    /// Names of accepted events for `target`, oldest first.
    pub fn events_for(&self, target: &ContainerId) -> Vec<&str> {
        self.pushed
            .iter()
            .filter(|p| &p.target == target)
            .map(|p| p.event.as_str())
            .collect()
    }

    /// Push attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl Host for RecordingHost {
    fn push_event(
        &mut self,
        target: &ContainerId,
        event: &EventName,
        payload: &Value,
    ) -> Result<(), DispatchError> {
        self.attempts += 1;
        if let Some(reason) = self.failures.pop_front() {
            return Err(DispatchError::Transport {
                event: event.to_string(),
                reason,
            });
        }
        self.pushed.push(PushedEvent {
            target: target.clone(),
            event: event.clone(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
