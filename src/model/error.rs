//! Error types for the pagination controller.
//!
//! This module defines the failure taxonomy using `thiserror`. Every failure is
//! contained to a single binding: hooks never return these errors to the host.
//! They are converted into [`Diagnostic`](super::diagnostics::Diagnostic)
//! records and `tracing` events instead.
//!
//! # Error Hierarchy
//!
//! - [`ControllerError`] - Umbrella over the per-concern failures
//!   - [`BindingError`] - The container element has no usable identity
//!   - [`AttachmentError`] - The sentinel's target list could not be located
//!   - [`SubscriptionError`] - The intersection API refused to observe
//!   - [`DispatchError`] - The host failed to accept a "load more" request
//!
//! # Recovery Strategy
//!
//! - **Attachment**: non-fatal, retried on the next post-update resync
//! - **Subscription**: fatal to the binding, which degrades to a no-op
//! - **Dispatch**: recovered by resetting the gate so the next intersection retries
//! - **Binding**: the mount is refused, no binding exists afterwards

use super::identifiers::{ContainerId, InvalidContainerId};
use thiserror::Error;

/// Umbrella error for all binding-level failures.
///
/// Domain-specific errors convert into it via `From`, so internal helpers can
/// use `?` and the registry can classify the result in one place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The container could not be identified or classified.
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// Sentinel placement failed.
    #[error("Attachment failure: {0}")]
    Attachment(#[from] AttachmentError),

    /// The observer could not be set up.
    #[error("Subscription failure: {0}")]
    Subscription(#[from] SubscriptionError),

    /// The host rejected or lost a request.
    #[error("Dispatch failure: {0}")]
    Dispatch(#[from] DispatchError),
}

impl ControllerError {
    /// Whether the binding can no longer emit requests after this error.
    ///
    /// Subscription failures leave the binding permanently inert and identity
    /// failures prevent the binding from existing at all. Attachment and
    /// dispatch failures recover on their own.
    pub fn is_fatal_to_binding(&self) -> bool {
        matches!(self, Self::Binding(_) | Self::Subscription(_))
    }
}

/// The container element cannot be turned into a binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// The element has no `id` attribute.
    #[error("Container element has no id attribute")]
    MissingId,

    /// The `id` attribute is present but unusable.
    #[error("Container element has an invalid id: {0}")]
    InvalidId(#[from] InvalidContainerId),
}

/// The sentinel could not be placed.
///
/// Non-fatal: the binding stays mounted and retries on the next resync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    /// The container element itself is no longer in the document.
    #[error("Container {container} not found in document")]
    ContainerMissing {
        /// Id the container was looked up by.
        container: ContainerId,
    },

    /// The container exists but its nested content list does not.
    #[error("Target list {selector:?} not found in container {container}")]
    TargetListMissing {
        /// Container that was searched.
        container: ContainerId,
        /// Selector used to locate the list.
        selector: String,
    },

    /// The document refused the append (unknown node or hierarchy violation).
    #[error("Document rejected sentinel placement in {container}: {reason}")]
    Rejected {
        /// Container whose list was targeted.
        container: ContainerId,
        /// Reason reported by the document.
        reason: String,
    },
}

/// The intersection API could not provide a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// No intersection observer is available in this environment.
    #[error("Intersection observer API is unavailable")]
    Unavailable,

    /// The API rejected the requested options.
    #[error("Intersection observer rejected options: {reason}")]
    InvalidOptions {
        /// Reason reported by the API.
        reason: String,
    },
}

/// The host did not accept a pushed event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Transport-level failure (socket closed, server unreachable).
    #[error("Transport error while pushing {event}: {reason}")]
    Transport {
        /// Event that was being pushed.
        event: String,
        /// Reason reported by the transport.
        reason: String,
    },

    /// The host refused the event outright.
    #[error("Host rejected {event}: {reason}")]
    Rejected {
        /// Event that was refused.
        event: String,
        /// Reason reported by the host.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(s: &str) -> ContainerId {
        ContainerId::new(s).expect("valid container id")
    }

    #[test]
    fn attachment_error_names_selector_and_container() {
        let err = AttachmentError::TargetListMissing {
            container: container("genre-container"),
            selector: "ul.menu".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ul.menu"));
        assert!(msg.contains("genre-container"));
    }

    #[test]
    fn dispatch_error_display_names_event() {
        let err = DispatchError::Transport {
            event: "load_more_genre".to_string(),
            reason: "socket closed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transport error while pushing load_more_genre: socket closed"
        );
    }

    #[test]
    fn controller_error_from_each_concern() {
        let err: ControllerError = SubscriptionError::Unavailable.into();
        assert!(err.to_string().starts_with("Subscription failure"));

        let err: ControllerError = BindingError::MissingId.into();
        assert!(err.to_string().contains("no id attribute"));
    }

    #[test]
    fn binding_error_wraps_invalid_id() {
        let err: BindingError = InvalidContainerId::Empty.into();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn only_binding_and_subscription_errors_are_fatal() {
        let fatal: Vec<ControllerError> = vec![
            BindingError::MissingId.into(),
            SubscriptionError::Unavailable.into(),
        ];
        let recoverable: Vec<ControllerError> = vec![
            AttachmentError::ContainerMissing {
                container: container("x"),
            }
            .into(),
            DispatchError::Rejected {
                event: "load_more_x".to_string(),
                reason: "nope".to_string(),
            }
            .into(),
        ];

        assert!(fatal.iter().all(ControllerError::is_fatal_to_binding));
        assert!(!recoverable.iter().any(ControllerError::is_fatal_to_binding));
    }
}
