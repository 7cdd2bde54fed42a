//! Request handlers, one module per resource.

pub mod breakdown;
pub mod dispute;
pub mod mechanic;
