//! Authentication plumbing.
//!
//! Identity lives with an upstream service; this module only validates
//! the bearer tokens it issues (and can mint them for tests/tooling).

pub mod jwt;
