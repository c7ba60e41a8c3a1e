//! Crewdeck shared domain types.
//!
//! Pure domain logic with no I/O: core identifiers, the error taxonomy,
//! workflow modes, checkpoint classification, and activity kinds. Every
//! other crate in the workspace depends on this one.

pub mod activity;
pub mod checkpoint;
pub mod error;
pub mod search;
pub mod types;
pub mod workflow;
