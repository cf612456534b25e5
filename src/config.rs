//! Run configuration: YAML loading, precedence, and `RunContext` resolution.
//!
//! Precedence is built-in defaults < config file < CLI overrides (non-`None`
//! values only). Everything is validated here, before any provider call: by
//! the time a [`RunContext`] exists, paths are readable, the chunk policy is
//! internally consistent, and the output template renders cleanly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::chunk::ChunkPolicy;
use crate::ctx::RunContext;
use crate::media;
use crate::pipeline::FailurePolicy;
use crate::provider::{ProviderAdapter, ProviderKind};
use crate::providers::mock::MockProviderAdapter;
use crate::template::{self, TemplateValues};
use crate::{Error, Result};

/// Typed run settings as read from YAML. Unknown keys are rejected so a typo
/// in a config file fails loudly instead of being silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    /// Which adapter to use.
    pub provider: ProviderKind,

    /// JSON fixture path for the mock adapter.
    pub provider_payload: Option<PathBuf>,

    /// Destination for the aggregate transcript. Required for execution.
    pub output: Option<PathBuf>,

    /// Optional per-chunk artifact filename template.
    pub output_chunk_template: Option<String>,

    /// Optional language hint forwarded to the provider.
    pub language: Option<String>,

    /// Optional prompt hint forwarded to the provider.
    pub prompt: Option<String>,

    /// Pass-through provider parameters.
    pub params: Map<String, Value>,

    /// Chunk planning constraints.
    pub chunking: ChunkSettings,

    /// Network adapter settings.
    pub omni: OmniSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Omni,
            provider_payload: None,
            output: None,
            output_chunk_template: None,
            language: None,
            prompt: None,
            params: Map::new(),
            chunking: ChunkSettings::default(),
            omni: OmniSettings::default(),
        }
    }
}

/// Raw chunking knobs; turned into a validated [`ChunkPolicy`] at resolution.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ChunkSettings {
    pub target_seconds: u32,
    pub min_seconds: u32,
    pub max_seconds: u32,
    pub allow_single_chunk_fallback: bool,
    pub on_chunk_failure: FailurePolicy,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            target_seconds: 30,
            min_seconds: 10,
            max_seconds: 60,
            allow_single_chunk_fallback: true,
            on_chunk_failure: FailurePolicy::Stop,
        }
    }
}

/// Network adapter connection settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct OmniSettings {
    /// Transcription endpoint URL. Required when `provider: omni`.
    pub endpoint: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    /// Provider-declared per-request audio limit, when known.
    pub max_audio_seconds: Option<u32>,
    /// Adapter-level parameter defaults, merged under each request's params.
    pub default_params: Map<String, Value>,
}

impl Default for OmniSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key_env: "SYNCCRAFT_API_KEY".to_owned(),
            max_audio_seconds: None,
            default_params: Map::new(),
        }
    }
}

/// CLI-provided values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<ProviderKind>,
    pub output: Option<PathBuf>,
    pub language: Option<String>,
    pub on_chunk_failure: Option<FailurePolicy>,
}

impl Settings {
    /// Apply CLI overrides; `None` fields leave the file/default value alone.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(output) = overrides.output {
            self.output = Some(output);
        }
        if let Some(language) = overrides.language {
            self.language = Some(language);
        }
        if let Some(policy) = overrides.on_chunk_failure {
            self.chunking.on_chunk_failure = policy;
        }
        self
    }

    /// Construct the adapter this configuration selects.
    pub fn build_adapter(&self) -> Result<Box<dyn ProviderAdapter>> {
        match self.provider {
            ProviderKind::Mock => {
                let payload = self.provider_payload.as_ref().ok_or_else(|| {
                    Error::config(
                        "missing required config key: provider_payload.",
                        "a provider payload path is needed for mock transcription",
                        "add provider_payload: <json-file> to your config or use provider: omni",
                    )
                })?;
                Ok(Box::new(MockProviderAdapter::new(payload)?))
            }
            #[cfg(feature = "omni")]
            ProviderKind::Omni => {
                use crate::providers::omni::{OmniConfig, OmniProviderAdapter};
                Ok(Box::new(OmniProviderAdapter::new(OmniConfig {
                    endpoint: self.omni.endpoint.clone(),
                    api_key_env: self.omni.api_key_env.clone(),
                    max_audio_seconds: self.omni.max_audio_seconds,
                    default_params: self.omni.default_params.clone(),
                })?))
            }
            #[cfg(not(feature = "omni"))]
            ProviderKind::Omni => Err(Error::config(
                "this build does not include the omni adapter.",
                "the crate was compiled without the 'omni' feature",
                "rebuild with the omni feature or use provider: mock",
            )),
        }
    }
}

/// Read YAML settings from disk. An empty file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::config(
            format!("config file not found: {}", path.display()),
            "--config must point to a readable YAML file",
            "create the config file and provide its path to --config",
        ));
    }

    let content = fs::read_to_string(path).map_err(|err| {
        Error::config(
            format!("could not read config file: {}", path.display()),
            err.to_string(),
            "make the config file readable by the current user",
        )
    })?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(&content).map_err(|err| {
        Error::config(
            format!("invalid config file: {}", path.display()),
            err.to_string(),
            "use YAML mapping format with known keys, for example: output: transcript.txt",
        )
    })
}

/// Validate inputs and snapshot a [`RunContext`].
pub fn resolve_run_context(image: &Path, audio: &Path, settings: &Settings) -> Result<RunContext> {
    media::validate_image_path(image)?;
    media::validate_audio_path(audio)?;

    let output = settings.output.clone().ok_or_else(|| {
        Error::config(
            "missing required config key: output.",
            "an output destination is needed for transcript text",
            "add output: <transcript-file> to your config",
        )
    })?;

    if settings.provider == ProviderKind::Mock {
        let payload = settings.provider_payload.as_ref().ok_or_else(|| {
            Error::config(
                "missing required config key: provider_payload.",
                "a provider payload path is needed for mock transcription",
                "add provider_payload: <json-file> to your config or use provider: omni",
            )
        })?;
        if !payload.exists() {
            return Err(Error::config(
                format!("provider_payload not found: {}", payload.display()),
                "the provided path does not exist",
                "provide an existing file path for provider_payload",
            ));
        }
    }

    #[cfg(feature = "omni")]
    if settings.provider == ProviderKind::Omni && settings.omni.endpoint.trim().is_empty() {
        return Err(Error::config(
            "missing required config key: omni.endpoint.",
            "the network adapter needs a transcription endpoint URL",
            "add omni:\n  endpoint: <url> to your config",
        ));
    }

    if let Some(tpl) = &settings.output_chunk_template {
        validate_chunk_template(tpl)?;
    }

    let chunking = &settings.chunking;
    let policy = ChunkPolicy::new(
        chunking.target_seconds,
        chunking.min_seconds,
        chunking.max_seconds,
        chunking.allow_single_chunk_fallback,
    )?;

    Ok(RunContext {
        run_id: RunContext::new_run_id(),
        image: image.to_path_buf(),
        audio: audio.to_path_buf(),
        output,
        chunk_template: settings.output_chunk_template.clone(),
        policy,
        failure_policy: chunking.on_chunk_failure,
        provider: settings.provider,
        language: settings.language.clone(),
        prompt: settings.prompt.clone(),
        params: settings.params.clone(),
    })
}

/// Fail fast on an invalid chunk output template: render it against probe
/// values and check the result is a plain filename.
fn validate_chunk_template(tpl: &str) -> Result<()> {
    if tpl.trim().is_empty() {
        return Err(Error::config(
            "output_chunk_template must be a non-empty string.",
            "chunk output file naming requires a valid template",
            "set output_chunk_template to a string like '{stem}_{index:03}_{chunk_start}_{chunk_end}.{ext}'",
        ));
    }

    let probe = TemplateValues {
        stem: "audio",
        index: 0,
        ext: "txt",
        chunk_start: 0,
        chunk_end: 1,
    };
    let rendered = template::render_filename(tpl, &probe).map_err(|err| {
        Error::config(
            "output_chunk_template is invalid.",
            err.to_string(),
            "use only known tokens: {stem}, {index}, {ext}, {chunk_start}, {chunk_end}; \
             example '{stem}_{index:03}_{chunk_start}_{chunk_end}.{ext}'",
        )
    })?;
    template::ensure_plain_filename(&rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, content).expect("write config");
        path
    }

    fn media_fixture(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let image = dir.path().join("frame.png");
        let audio = dir.path().join("tone.wav");
        fs::write(&image, b"png").expect("write image");
        fs::write(&audio, b"wav").expect("write audio");
        (image, audio)
    }

    #[test]
    fn defaults_survive_an_empty_config_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_config(&dir, "");

        let settings = load_settings(&path)?;

        assert_eq!(settings.provider, ProviderKind::Omni);
        assert_eq!(settings.chunking, ChunkSettings::default());
        assert_eq!(settings.chunking.on_chunk_failure, FailurePolicy::Stop);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults_and_cli_overrides_both() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            &dir,
            "provider: mock\nprovider_payload: payload.json\noutput: out.txt\nlanguage: es\nchunking:\n  target_seconds: 20\n  on_chunk_failure: continue\n",
        );

        let settings = load_settings(&path)?.with_overrides(Overrides {
            language: Some("en".to_owned()),
            output: Some(PathBuf::from("cli-out.txt")),
            ..Overrides::default()
        });

        assert_eq!(settings.provider, ProviderKind::Mock);
        assert_eq!(settings.chunking.target_seconds, 20);
        assert_eq!(settings.chunking.on_chunk_failure, FailurePolicy::Continue);
        // CLI wins over the file.
        assert_eq!(settings.language.as_deref(), Some("en"));
        assert_eq!(settings.output, Some(PathBuf::from("cli-out.txt")));
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_config(&dir, "outptu: transcript.txt\n");

        let err = load_settings(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.why().contains("outptu"));
        Ok(())
    }

    #[test]
    fn missing_output_is_a_config_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (image, audio) = media_fixture(&dir);
        let settings = Settings {
            provider: ProviderKind::Mock,
            provider_payload: Some(dir.path().join("payload.json")),
            ..Settings::default()
        };
        fs::write(dir.path().join("payload.json"), "{\"transcript\": \"x\"}")?;

        let err = resolve_run_context(&image, &audio, &settings).unwrap_err();
        assert!(err.what().contains("output"));
        Ok(())
    }

    #[test]
    fn bad_chunk_template_fails_resolution_before_execution() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (image, audio) = media_fixture(&dir);
        fs::write(dir.path().join("payload.json"), "{\"transcript\": \"x\"}")?;
        let settings = Settings {
            provider: ProviderKind::Mock,
            provider_payload: Some(dir.path().join("payload.json")),
            output: Some(dir.path().join("out.txt")),
            output_chunk_template: Some("{stem}_{basename}.{ext}".to_owned()),
            ..Settings::default()
        };

        let err = resolve_run_context(&image, &audio, &settings).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.why().contains("basename"));
        Ok(())
    }

    #[test]
    fn traversal_in_chunk_template_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (image, audio) = media_fixture(&dir);
        fs::write(dir.path().join("payload.json"), "{\"transcript\": \"x\"}")?;
        let settings = Settings {
            provider: ProviderKind::Mock,
            provider_payload: Some(dir.path().join("payload.json")),
            output: Some(dir.path().join("out.txt")),
            output_chunk_template: Some("../{stem}.{ext}".to_owned()),
            ..Settings::default()
        };

        let err = resolve_run_context(&image, &audio, &settings).unwrap_err();
        assert!(err.what().contains("unsafe path"));
        Ok(())
    }

    #[test]
    fn inconsistent_chunk_bounds_fail_at_resolution() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (image, audio) = media_fixture(&dir);
        let mut settings = Settings {
            output: Some(dir.path().join("out.txt")),
            ..Settings::default()
        };
        settings.omni.endpoint = "https://provider.invalid/v1".to_owned();
        settings.chunking.min_seconds = 50;
        settings.chunking.target_seconds = 30;

        let err = resolve_run_context(&image, &audio, &settings).unwrap_err();
        assert!(matches!(
            err,
            Error::PolicyViolation {
                constraint: "min_seconds",
                ..
            }
        ));
        Ok(())
    }
}
