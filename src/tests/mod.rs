//! Internal test modules - whitebox tests with crate access
//!
//! These drive [`BindingRegistry`](crate::state::BindingRegistry) through the
//! in-memory [`Harness`](crate::harness::Harness) and inspect binding state
//! that the host never sees.

// Harness-based acceptance tests
mod acceptance_lifecycle;

// Property-based invariants
mod paging_properties;
