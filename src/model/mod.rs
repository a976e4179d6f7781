//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod container;
pub mod diagnostics;
pub mod error;
pub mod event_name;
pub mod identifiers;
pub mod margin;

// Re-export for convenience
pub use container::{ContainerBinding, ContainerKind, RESULTS_CONTAINER_ID};
pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticLog};
pub use error::{
    AttachmentError, BindingError, ControllerError, DispatchError, SubscriptionError,
};
pub use event_name::EventName;
pub use identifiers::{ContainerId, InvalidContainerId, RequestTicket};
pub use margin::{MarginLength, MarginParseError, RootMargin};
