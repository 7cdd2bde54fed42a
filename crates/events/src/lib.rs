//! In-process event plumbing for the dispatch engine.
//!
//! Lifecycle transitions and availability changes publish
//! [`PlatformEvent`]s here; delivery tasks (notification routing,
//! payment capture) subscribe independently.

pub mod bus;
pub mod names;

pub use bus::{EventBus, PlatformEvent};
