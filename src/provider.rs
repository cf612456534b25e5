//! Provider adapter contract.
//!
//! An adapter translates provider-neutral generation requests into a specific
//! provider's calling convention. The orchestrator only ever sees this
//! contract, so pipeline logic stays provider-agnostic: the fixture-backed
//! adapter used in tests and the network-backed adapter must produce
//! byte-identical [`GenerationResult`] shapes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::chunk::AudioChunk;
use crate::{Error, Result};

/// Declared capabilities and limits of a provider.
///
/// Queried once before planning begins so the orchestrator can clamp the
/// chunk policy to the adapter's limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderLimits {
    /// Longest audio duration the provider accepts per request, when the
    /// provider declares one.
    pub max_audio_seconds: Option<u32>,
}

/// One provider invocation's worth of input.
///
/// Created per chunk by the orchestrator, passed once to the adapter by
/// reference, and discarded after the call returns. Adapters must not mutate
/// it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: PathBuf,
    pub audio: PathBuf,
    /// The time slice this request covers; `None` for a non-chunked run.
    pub chunk: Option<AudioChunk>,
    pub language: Option<String>,
    pub prompt: Option<String>,
    /// Pass-through provider parameters. Forwarded as-is; the pipeline never
    /// interprets individual keys.
    pub params: Map<String, Value>,
}

impl GenerationRequest {
    pub fn chunk_index(&self) -> Option<usize> {
        self.chunk.map(|chunk| chunk.index)
    }
}

/// One provider invocation's worth of output.
///
/// Produced by the adapter, owned transiently by the orchestrator until
/// aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub transcript: String,
    pub confidence: Option<f64>,
    /// The provider's full response payload, retained for diagnostics. The
    /// orchestrator never parses it.
    pub raw: Value,
}

impl GenerationResult {
    /// Decode a provider response payload into the shared result shape.
    ///
    /// Both adapters funnel their responses through here, which is what keeps
    /// their `GenerationResult` semantics identical. A payload without a
    /// string `transcript` field violates the adapter contract.
    pub fn from_payload(payload: Value, chunk_index: Option<usize>) -> Result<Self> {
        let transcript = payload
            .get("transcript")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::provider(
                    chunk_index,
                    "provider response missing 'transcript'.",
                    "the adapter contract requires a transcript field",
                    "ensure the provider response JSON includes a non-empty transcript value",
                )
            })?
            .to_owned();
        let confidence = payload.get("confidence").and_then(Value::as_f64);

        Ok(Self {
            transcript,
            confidence,
            raw: payload,
        })
    }
}

/// The pluggable transcription provider boundary.
///
/// `generate` is the sole execution entrypoint. Expected failure modes (bad
/// auth, network failure, malformed chunk) surface as typed [`Error::Provider`]
/// values, never as panics. An adapter may retry transient failures
/// internally, but the result it returns is final for that chunk: the
/// orchestrator never re-invokes a failed chunk.
pub trait ProviderAdapter {
    /// Declared limits, queried once before planning.
    fn limits(&self) -> ProviderLimits;

    /// Run one transcription request. Safe to call repeatedly for different
    /// chunks with no ordering requirements beyond the orchestrator's own.
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;
}

impl<T: ProviderAdapter + ?Sized> ProviderAdapter for Box<T> {
    fn limits(&self) -> ProviderLimits {
        (**self).limits()
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        (**self).generate(request)
    }
}

/// Which concrete adapter a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Fixture-backed adapter for reproducible runs and contract tests.
    Mock,
    /// Network-backed adapter.
    Omni,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Omni => "omni",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "omni" => Ok(Self::Omni),
            other => Err(Error::config(
                format!("unknown provider '{other}'."),
                "provider must name a built-in adapter",
                "set provider to one of: mock, omni",
            )),
        }
    }
}
