//! Network-backed provider adapter.
//!
//! One synchronous JSON POST per request. Authentication, transport failures,
//! and malformed response payloads all surface as typed provider errors so
//! the pipeline can apply its chunk-failure policy; nothing here panics for
//! an expected failure mode.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::provider::{GenerationRequest, GenerationResult, ProviderAdapter, ProviderLimits};
use crate::{Error, Result};

/// Connection settings for the network adapter.
#[derive(Debug, Clone)]
pub struct OmniConfig {
    /// Transcription endpoint URL.
    pub endpoint: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
    /// Provider-declared per-request audio limit, when known.
    pub max_audio_seconds: Option<u32>,
    /// Defaults merged under each request's own parameters (request wins).
    pub default_params: Map<String, Value>,
}

pub struct OmniProviderAdapter {
    client: reqwest::blocking::Client,
    config: OmniConfig,
}

impl OmniProviderAdapter {
    pub fn new(config: OmniConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("synccraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                Error::provider(
                    None,
                    "failed to build the HTTP client.",
                    err.to_string(),
                    "check the TLS backend available on this system",
                )
            })?;
        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_env).map_err(|_| {
            Error::provider(
                None,
                format!(
                    "missing provider credentials in ${}.",
                    self.config.api_key_env
                ),
                "the network adapter authenticates with a bearer token from the environment",
                format!("export {}=<your API key> and re-run", self.config.api_key_env),
            )
        })
    }
}

impl ProviderAdapter for OmniProviderAdapter {
    fn limits(&self) -> ProviderLimits {
        ProviderLimits {
            max_audio_seconds: self.config.max_audio_seconds,
        }
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let chunk_index = request.chunk_index();
        let api_key = self.api_key()?;
        let params = merged_params(&self.config.default_params, &request.params);

        let redacted_params = Value::Object(redacted(&params));
        debug!(
            endpoint = %self.config.endpoint,
            chunk = ?chunk_index,
            params = %redacted_params,
            "dispatching provider request"
        );

        let body = json!({
            "image": request.image.to_string_lossy(),
            "audio": request.audio.to_string_lossy(),
            "chunk": request.chunk.map(|chunk| json!({
                "index": chunk.index,
                "start_seconds": chunk.start_seconds,
                "end_seconds": chunk.end_seconds,
            })),
            "language": request.language.clone(),
            "prompt": request.prompt.clone(),
            "params": Value::Object(params),
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|err| {
                Error::provider(
                    chunk_index,
                    format!("request to {} failed.", self.config.endpoint),
                    err.to_string(),
                    "check network connectivity and the configured endpoint",
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(Error::provider(
                chunk_index,
                format!("provider returned HTTP {status}."),
                if detail.is_empty() {
                    "the provider rejected the request".to_owned()
                } else {
                    detail
                },
                "check credentials, quota, and the request parameters",
            ));
        }

        let payload: Value = response.json().map_err(|err| {
            Error::provider(
                chunk_index,
                "provider response was not valid JSON.",
                err.to_string(),
                "check the endpoint points at a transcription API",
            )
        })?;

        GenerationResult::from_payload(payload, chunk_index)
    }
}

/// Merge default parameters under request parameters; the request wins on
/// conflicting keys.
pub fn merged_params(defaults: &Map<String, Value>, request: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    for (key, value) in request {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

const REDACTED: &str = "***REDACTED***";

/// Replace secret-bearing parameter values for debug logging.
///
/// Keys containing `key`, `token`, `secret`, or `password` (at any nesting
/// depth) are masked; request identifiers stay visible.
pub fn redacted(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), redact_value(key, value)))
        .collect()
}

fn redact_value(key: &str, value: &Value) -> Value {
    let lowered = key.to_ascii_lowercase();
    let sensitive = ["key", "token", "secret", "password"]
        .iter()
        .any(|marker| lowered.contains(marker));
    if sensitive {
        return Value::String(REDACTED.to_owned());
    }
    match value {
        Value::Object(nested) => Value::Object(redacted(nested)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().expect("object literal").clone()
    }

    #[test]
    fn request_params_override_defaults() {
        let defaults = map(json!({"temperature": 0.2, "top_p": 0.95}));
        let request = map(json!({"temperature": 0.6, "vendor_knob": "raw-value"}));

        let merged = merged_params(&defaults, &request);

        assert_eq!(merged["temperature"], json!(0.6));
        assert_eq!(merged["top_p"], json!(0.95));
        assert_eq!(merged["vendor_knob"], json!("raw-value"));
    }

    #[test]
    fn redaction_masks_secrets_and_keeps_identifiers() {
        let params = map(json!({
            "request_id": "req-visible",
            "api_key": "super-secret",
            "nested": {"access_token": "nested-secret"},
        }));

        let safe = redacted(&params);

        assert_eq!(safe["request_id"], json!("req-visible"));
        assert_eq!(safe["api_key"], json!(REDACTED));
        assert_eq!(safe["nested"]["access_token"], json!(REDACTED));
        let rendered = Value::Object(safe).to_string();
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("nested-secret"));
    }

    #[test]
    fn adapter_reports_configured_limits() -> anyhow::Result<()> {
        let adapter = OmniProviderAdapter::new(OmniConfig {
            endpoint: "https://provider.invalid/v1/transcribe".to_owned(),
            api_key_env: "SYNCCRAFT_API_KEY".to_owned(),
            max_audio_seconds: Some(240),
            default_params: Map::new(),
        })?;

        assert_eq!(adapter.limits().max_audio_seconds, Some(240));
        Ok(())
    }
}
