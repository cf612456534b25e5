//! Shared conformance checks for provider adapters.
//!
//! Any adapter must: expose queryable limits, return the shared
//! `GenerationResult` shape, be safe to call repeatedly with identical
//! results for identical requests, and surface typed provider errors for
//! expected failure modes.

use std::path::PathBuf;

use serde_json::json;

use synccraft::Error;
use synccraft::provider::{GenerationRequest, ProviderAdapter};
use synccraft::providers::mock::MockProviderAdapter;

fn request(audio: PathBuf) -> GenerationRequest {
    GenerationRequest {
        image: PathBuf::from("frame.png"),
        audio,
        chunk: None,
        language: None,
        prompt: None,
        params: serde_json::Map::new(),
    }
}

/// The conformance suite, runnable against any adapter.
fn assert_adapter_contract(adapter: &dyn ProviderAdapter, request: &GenerationRequest) {
    // Limits are queryable before any generation happens.
    let _ = adapter.limits();

    let first = adapter.generate(request).expect("generate succeeds");
    assert!(!first.transcript.is_empty());
    // The raw payload is retained for diagnostics alongside the parsed fields.
    assert!(first.raw.get("transcript").is_some());

    // Repeated calls with an identical request are safe and deterministic.
    let second = adapter.generate(request).expect("generate succeeds again");
    assert_eq!(first, second);
}

#[test]
fn mock_adapter_satisfies_the_contract() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let payload = dir.path().join("payload.json");
    std::fs::write(
        &payload,
        serde_json::to_string(&json!({"transcript": "hello world", "confidence": 0.9}))?,
    )?;
    let audio = dir.path().join("tone.wav");
    std::fs::write(&audio, b"wav")?;

    let adapter = MockProviderAdapter::new(payload)?;
    assert_adapter_contract(&adapter, &request(audio));

    let result = adapter.generate(&request(dir.path().join("tone.wav")))?;
    assert_eq!(result.transcript, "hello world");
    assert_eq!(result.confidence, Some(0.9));
    Ok(())
}

#[test]
fn mock_adapter_surfaces_typed_errors_with_remediation() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let payload = dir.path().join("bad.json");
    std::fs::write(&payload, "{}")?;

    let err = MockProviderAdapter::new(payload).unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert!(!err.remediation().is_empty());
    Ok(())
}

#[test]
fn mock_adapter_exposes_the_fixture_duration_limit() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let payload = dir.path().join("payload.json");
    std::fs::write(
        &payload,
        serde_json::to_string(&json!({"transcript": "hello world", "max_audio_seconds": 120}))?,
    )?;

    let adapter = MockProviderAdapter::new(payload)?;
    assert_eq!(adapter.limits().max_audio_seconds, Some(120));
    Ok(())
}

#[cfg(feature = "omni")]
mod omni {
    use super::*;
    use synccraft::providers::omni::{OmniConfig, OmniProviderAdapter};

    #[test]
    fn omni_adapter_exposes_configured_limits() -> anyhow::Result<()> {
        let adapter = OmniProviderAdapter::new(OmniConfig {
            endpoint: "https://provider.invalid/v1/transcribe".to_owned(),
            api_key_env: "SYNCCRAFT_CONTRACT_TEST_KEY".to_owned(),
            max_audio_seconds: Some(240),
            default_params: serde_json::Map::new(),
        })?;
        assert_eq!(adapter.limits().max_audio_seconds, Some(240));
        Ok(())
    }

    #[test]
    fn omni_adapter_fails_typed_when_credentials_are_missing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let audio = dir.path().join("tone.wav");
        std::fs::write(&audio, b"wav")?;

        let adapter = OmniProviderAdapter::new(OmniConfig {
            endpoint: "https://provider.invalid/v1/transcribe".to_owned(),
            // Deliberately unset variable: the adapter must fail with a typed
            // provider error, not a panic.
            api_key_env: "SYNCCRAFT_CONTRACT_TEST_UNSET_KEY".to_owned(),
            max_audio_seconds: None,
            default_params: serde_json::Map::new(),
        })?;

        let err = adapter.generate(&request(audio)).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
        assert!(err.remediation().contains("SYNCCRAFT_CONTRACT_TEST_UNSET_KEY"));
        Ok(())
    }
}
