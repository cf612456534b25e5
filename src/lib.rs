//! `synccraft` — a single-run image+audio transcription pipeline.
//!
//! This crate provides:
//! - Policy-driven chunk planning (deterministic partitions of a duration)
//! - A provider adapter contract with fixture-backed and network-backed implementations
//! - A sequential pipeline orchestrator with a configurable chunk-failure policy
//! - Filename templating and collision-safe artifact writing
//!
//! The library is designed to be driven by the bundled CLI or embedded in
//! other frontends, with an emphasis on deterministic plans, typed errors,
//! and minimal surprises.

// High-level API (most consumers should start here).
pub mod ctx;
pub mod pipeline;

// Chunk policy and planning.
pub mod chunk;

// Provider contract and built-in adapters.
pub mod provider;
pub mod providers;

// Output naming and persistence.
pub mod output;
pub mod template;

// Input validation and configuration.
pub mod config;
pub mod media;

// Error taxonomy and exit codes.
pub mod error;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use error::{Error, ExitCode, Result};
