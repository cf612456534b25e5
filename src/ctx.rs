//! The resolved, immutable run context.
//!
//! A `RunContext` is built once at the boundary — after configuration
//! precedence has been applied and inputs validated — and handed to the
//! pipeline as read-only input. The pipeline never mutates it.

use std::path::PathBuf;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::chunk::ChunkPolicy;
use crate::pipeline::FailurePolicy;
use crate::provider::ProviderKind;

/// Everything one end-to-end run needs, snapshotted up front.
///
/// This is *run-level configuration*, not CLI flags: the CLI (or any other
/// frontend) is responsible for mapping user input into this type so the
/// pipeline stays reusable outside of a CLI context.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Unique identifier for this invocation, kept in logs and diagnostics.
    pub run_id: String,

    /// Source image path, validated at construction.
    pub image: PathBuf,

    /// Source audio path, validated at construction.
    pub audio: PathBuf,

    /// Destination for the aggregate transcript.
    pub output: PathBuf,

    /// Optional filename template for per-chunk artifacts. `None` means only
    /// the aggregate transcript is written.
    pub chunk_template: Option<String>,

    /// Fully resolved chunking constraints. Internally consistent by
    /// construction; the pipeline may still clamp it to adapter limits.
    pub policy: ChunkPolicy,

    /// What to do when a chunk's provider call fails.
    pub failure_policy: FailurePolicy,

    /// Which adapter this run uses.
    pub provider: ProviderKind,

    /// Optional language hint forwarded to the provider.
    pub language: Option<String>,

    /// Optional prompt hint forwarded to the provider.
    pub prompt: Option<String>,

    /// Pass-through provider parameters, forwarded per request as-is.
    pub params: Map<String, Value>,
}

impl RunContext {
    /// Allocate a fresh run identifier.
    pub fn new_run_id() -> String {
        Uuid::new_v4().to_string()
    }
}
