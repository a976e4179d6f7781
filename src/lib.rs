//! loadmore
//!
//! Headless incremental-pagination controller. A sentinel marker sits at the
//! end of each paginated container; when it scrolls into view the controller
//! asks the host for the next page, at most once per outstanding request.
//!
//! Pure state machines live in [`state`]; the host document, intersection
//! observer and event channel are reached through the traits in [`dom`],
//! [`observer`] and [`host`].

pub mod config;
pub mod dom;
pub mod harness;
pub mod host;
pub mod logging;
pub mod model;
pub mod observer;
pub mod scenario;
pub mod state;

#[cfg(test)]
mod tests;
