//! Controller state machines.
//!
//! Nothing here touches a real browser: the document, intersection API and
//! event channel are reached through the traits in [`crate::dom`],
//! [`crate::observer`] and [`crate::host`].

pub mod gate;
pub mod lifecycle;
pub mod registry;
pub mod sentinel;
pub mod settings;

// Re-export for convenience
pub use gate::{GateDecision, GateState, RequestGate};
pub use lifecycle::{
    InfiniteScroll, IntersectionOutcome, LifecycleState, Ports, ResyncReport, Suppression,
};
pub use registry::{BindingRegistry, MountOutcome};
pub use sentinel::{AttachOutcome, SentinelManager};
pub use settings::{ControllerSettings, SentinelPlacement};
