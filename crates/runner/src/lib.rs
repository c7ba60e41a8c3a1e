//! Client library for the external crew-execution platform.
//!
//! The only component that talks to the platform. Provides the three
//! HTTP operations (kickoff, resume, cancel), webhook callback
//! configuration that must be re-attached on every call, kickoff input
//! assembly, and normalization of inbound webhook events into activity
//! records.

pub mod client;
pub mod config;
pub mod events;
pub mod inputs;

pub use client::{KickoffResponse, RunnerClient, RunnerError};
pub use config::RunnerConfig;
