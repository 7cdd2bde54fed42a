//! Domain types and rules for the Wayside breakdown-dispatch engine.
//!
//! This crate is pure logic: no I/O, no async, no shared state. The
//! stateful pieces (stores, the geospatial index, the coordinator) live
//! in the other workspace crates and build on the types defined here.

pub mod breakdown;
pub mod dispute;
pub mod error;
pub mod geo;
pub mod mechanic;
pub mod pagination;
pub mod roles;
pub mod types;
