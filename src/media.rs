//! Media input validation and deterministic metadata extraction.
//!
//! SyncCraft does not decode or transcode audio. The only media
//! introspection it performs is reading the WAV header to learn the total
//! duration in whole seconds; chunk boundaries are expressed as time offsets
//! into that validated asset.

use std::path::Path;

use hound::WavReader;

use crate::{Error, Result};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];
const AUDIO_EXTENSIONS: &[&str] = &["wav"];

/// Validate that a media path exists, is a file, and carries an allowed
/// extension. Extension checks are deliberately deterministic (lowercased
/// suffix match), not content sniffing.
fn validate_media_path(path: &Path, field_name: &str, allowed: &[&str]) -> Result<()> {
    if !path.exists() {
        return Err(Error::invalid_input(
            format!("{field_name} not found: {}", path.display()),
            "the provided path does not exist",
            format!("provide an existing file path for {field_name}"),
        ));
    }
    if !path.is_file() {
        return Err(Error::invalid_input(
            format!("{field_name} must reference a file: {}", path.display()),
            "directories cannot be processed as media inputs",
            format!("point {field_name} to a media file"),
        ));
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !allowed.contains(&extension.as_str()) {
        let shown = if extension.is_empty() {
            "<none>".to_owned()
        } else {
            format!(".{extension}")
        };
        return Err(Error::invalid_input(
            format!("unsupported {field_name} format '{shown}'."),
            "media formats are validated before execution",
            format!("use one of the supported extensions: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

/// Validate the source image path and extension.
pub fn validate_image_path(path: &Path) -> Result<()> {
    validate_media_path(path, "image", IMAGE_EXTENSIONS)
}

/// Validate the source audio path and extension.
pub fn validate_audio_path(path: &Path) -> Result<()> {
    validate_media_path(path, "audio", AUDIO_EXTENSIONS)
}

/// Extract a WAV file's duration, floored to whole seconds.
pub fn wav_duration_seconds(path: &Path) -> Result<u32> {
    let reader = WavReader::open(path).map_err(|err| {
        Error::invalid_input(
            format!("unsupported or invalid WAV file: {}", path.display()),
            err.to_string(),
            "provide a valid .wav file containing fmt and data chunks",
        )
    })?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(Error::invalid_input(
            format!(
                "unsupported WAV file with zero sample rate: {}",
                path.display()
            ),
            "duration calculation requires a positive sample rate",
            "re-encode the audio as a valid PCM WAV file",
        ));
    }

    // `duration()` is the frame count per channel, so dividing by the sample
    // rate floors to whole seconds.
    Ok(reader.duration() / spec.sample_rate)
}
