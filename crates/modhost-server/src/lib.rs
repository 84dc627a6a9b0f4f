//! modhost API server library.
//!
//! The binary in `main.rs` wires these modules together; they are
//! exposed as a library so integration tests can assemble the same
//! application in-process.

pub mod api;
pub mod config;
pub mod plugins;
