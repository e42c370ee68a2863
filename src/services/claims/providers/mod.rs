//! Builtin claim providers registered under `claims.*`.
//!
//! These stand in for lookups against billing/directory services; each one
//! accepts keyword arguments and returns a JSON value.
pub mod access;
pub mod group_category;
pub mod permissions;
pub mod quota;
