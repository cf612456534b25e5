//! Fixture-backed provider adapter.
//!
//! Returns canned results from a local JSON payload file, keyed by request
//! shape: a top-level `transcript` applies to every request, and an optional
//! `chunks` array overrides results per chunk index. This is what makes
//! pipeline runs reproducible in contract and integration tests.
//!
//! Payload format:
//!
//! ```json
//! {
//!   "transcript": "hello world",
//!   "confidence": 0.9,
//!   "max_audio_seconds": 240,
//!   "chunks": [
//!     { "transcript": "chunk zero" },
//!     { "error": "simulated rejection" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::provider::{GenerationRequest, GenerationResult, ProviderAdapter, ProviderLimits};
use crate::{Error, Result};

#[derive(Debug)]
pub struct MockProviderAdapter {
    payload_file: PathBuf,
    payload: Value,
}

impl MockProviderAdapter {
    /// Load and validate a fixture payload.
    ///
    /// The schema is checked here, before any chunk execution, so a malformed
    /// fixture fails the run fast instead of mid-pipeline.
    pub fn new(payload_file: impl Into<PathBuf>) -> Result<Self> {
        let payload_file = payload_file.into();
        if !payload_file.exists() {
            return Err(Error::provider(
                None,
                format!(
                    "provider payload file not found: {}",
                    payload_file.display()
                ),
                "the mock adapter expects a JSON payload file",
                "create a JSON fixture with transcript/confidence fields and pass its path",
            ));
        }

        let content = fs::read_to_string(&payload_file).map_err(|err| {
            Error::provider(
                None,
                format!(
                    "could not read provider payload file: {}",
                    payload_file.display()
                ),
                err.to_string(),
                "make the payload file readable by the current user",
            )
        })?;
        let payload: Value = serde_json::from_str(&content).map_err(|err| {
            Error::provider(
                None,
                format!(
                    "provider payload file is not valid JSON: {}",
                    payload_file.display()
                ),
                err.to_string(),
                "fix the JSON syntax in the payload file",
            )
        })?;

        let adapter = Self {
            payload_file,
            payload,
        };
        adapter.validate_payload_schema()?;
        Ok(adapter)
    }

    /// Access the fixture path (kept for diagnostics).
    pub fn payload_file(&self) -> &Path {
        &self.payload_file
    }

    fn validate_payload_schema(&self) -> Result<()> {
        if !self.payload.is_object() {
            return Err(self.schema_error("the payload root must be a JSON object"));
        }

        let has_default = self.payload.get("transcript").is_some_and(Value::is_string);
        let chunks = self.payload.get("chunks");
        match chunks {
            None => {
                if !has_default {
                    return Err(self.schema_error(
                        "the payload needs a string 'transcript' or a 'chunks' array",
                    ));
                }
            }
            Some(Value::Array(entries)) => {
                for (index, entry) in entries.iter().enumerate() {
                    let ok = entry.get("transcript").is_some_and(Value::is_string)
                        || entry.get("error").is_some_and(Value::is_string);
                    if !ok {
                        return Err(self.schema_error(format!(
                            "chunks[{index}] needs a string 'transcript' or 'error' field"
                        )));
                    }
                }
            }
            Some(_) => {
                return Err(self.schema_error("'chunks' must be an array of chunk entries"));
            }
        }

        Ok(())
    }

    fn schema_error(&self, why: impl Into<String>) -> Error {
        Error::provider(
            None,
            format!(
                "provider payload has an invalid schema: {}",
                self.payload_file.display()
            ),
            why,
            "see the mock adapter payload format in the module documentation",
        )
    }

    /// Select the payload entry for a request: a `chunks` entry when one
    /// exists for the chunk index, the top-level payload otherwise.
    fn entry_for(&self, request: &GenerationRequest) -> Result<&Value> {
        let Some(index) = request.chunk_index() else {
            return Ok(&self.payload);
        };
        let Some(entries) = self.payload.get("chunks").and_then(Value::as_array) else {
            return Ok(&self.payload);
        };
        entries.get(index).ok_or_else(|| {
            Error::provider(
                Some(index),
                format!("fixture payload has no entry for chunk index {index}."),
                "the 'chunks' array is shorter than the chunk plan",
                "add an entry per planned chunk or drop the 'chunks' array",
            )
        })
    }
}

impl ProviderAdapter for MockProviderAdapter {
    fn limits(&self) -> ProviderLimits {
        let max_audio_seconds = self
            .payload
            .get("max_audio_seconds")
            .and_then(Value::as_u64)
            .map(|limit| limit as u32);
        ProviderLimits { max_audio_seconds }
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        if !request.audio.exists() {
            return Err(Error::provider(
                request.chunk_index(),
                format!("audio file not found: {}", request.audio.display()),
                "the adapter was given a path that does not exist",
                "provide an existing audio path",
            ));
        }

        let entry = self.entry_for(request)?;
        if let Some(message) = entry.get("error").and_then(Value::as_str) {
            return Err(Error::provider(
                request.chunk_index(),
                format!("fixture rejected the request: {message}"),
                "the payload entry for this chunk is a scripted failure",
                "remove the 'error' field from the fixture entry to make it succeed",
            ));
        }

        GenerationResult::from_payload(entry.clone(), request.chunk_index())
    }
}
