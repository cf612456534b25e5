use std::path::PathBuf;

use thiserror::Error;

/// SyncCraft's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes used by the SyncCraft CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    Internal = 1,
    Config = 2,
    Validation = 3,
    Provider = 4,
    Processing = 5,
}

impl ExitCode {
    /// The numeric process status for this exit code.
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// SyncCraft's crate-wide error type.
///
/// Every variant carries the structured context an external formatter needs to
/// render a `what / why / how-to-fix` triad without re-deriving anything:
/// chunk indices, constraint names, placeholder names, and artifact paths are
/// attached where the failure happened.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad paths, zero duration, malformed request. Fatal, no retry.
    #[error("invalid input: {what}")]
    InvalidInput {
        what: String,
        why: String,
        remediation: String,
    },

    /// The chunk policy cannot be satisfied. Fatal; names the offending constraint.
    #[error("chunk policy violation on {constraint}: {what}")]
    PolicyViolation {
        constraint: &'static str,
        what: String,
        why: String,
        remediation: String,
    },

    /// Adapter-reported failure. Recoverability is governed by the configured
    /// chunk-failure policy; `chunk_index` is `None` for non-chunked calls.
    #[error("provider failure: {what}")]
    Provider {
        chunk_index: Option<usize>,
        what: String,
        why: String,
        remediation: String,
    },

    /// A filename template referenced an unsupported placeholder.
    #[error("template error: {what}")]
    Template {
        placeholder: String,
        what: String,
        why: String,
        remediation: String,
    },

    /// Output persistence failure. Fatal after computation; `artifact` records
    /// which path could not be written.
    #[error("output write failure for '{}': {what}", .artifact.display())]
    Io {
        artifact: PathBuf,
        what: String,
        why: String,
        remediation: String,
    },

    /// Invalid or missing configuration.
    #[error("configuration error: {what}")]
    Config {
        what: String,
        why: String,
        remediation: String,
    },

    /// Chunk execution or aggregation failure.
    #[error("processing failure: {what}")]
    Processing {
        what: String,
        why: String,
        remediation: String,
    },
}

impl Error {
    pub fn invalid_input(
        what: impl Into<String>,
        why: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            what: what.into(),
            why: why.into(),
            remediation: remediation.into(),
        }
    }

    pub fn policy_violation(
        constraint: &'static str,
        what: impl Into<String>,
        why: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::PolicyViolation {
            constraint,
            what: what.into(),
            why: why.into(),
            remediation: remediation.into(),
        }
    }

    pub fn provider(
        chunk_index: Option<usize>,
        what: impl Into<String>,
        why: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::Provider {
            chunk_index,
            what: what.into(),
            why: why.into(),
            remediation: remediation.into(),
        }
    }

    pub fn template(
        placeholder: impl Into<String>,
        what: impl Into<String>,
        why: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::Template {
            placeholder: placeholder.into(),
            what: what.into(),
            why: why.into(),
            remediation: remediation.into(),
        }
    }

    pub fn io(
        artifact: impl Into<PathBuf>,
        what: impl Into<String>,
        why: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::Io {
            artifact: artifact.into(),
            what: what.into(),
            why: why.into(),
            remediation: remediation.into(),
        }
    }

    pub fn config(
        what: impl Into<String>,
        why: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::Config {
            what: what.into(),
            why: why.into(),
            remediation: remediation.into(),
        }
    }

    pub fn processing(
        what: impl Into<String>,
        why: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::Processing {
            what: what.into(),
            why: why.into(),
            remediation: remediation.into(),
        }
    }

    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput { .. } | Self::PolicyViolation { .. } | Self::Template { .. } => {
                ExitCode::Validation
            }
            Self::Provider { .. } => ExitCode::Provider,
            Self::Io { .. } | Self::Processing { .. } => ExitCode::Processing,
            Self::Config { .. } => ExitCode::Config,
        }
    }

    /// The concise description of what failed.
    pub fn what(&self) -> &str {
        match self {
            Self::InvalidInput { what, .. }
            | Self::PolicyViolation { what, .. }
            | Self::Provider { what, .. }
            | Self::Template { what, .. }
            | Self::Io { what, .. }
            | Self::Config { what, .. }
            | Self::Processing { what, .. } => what,
        }
    }

    /// Why the failure happened.
    pub fn why(&self) -> &str {
        match self {
            Self::InvalidInput { why, .. }
            | Self::PolicyViolation { why, .. }
            | Self::Provider { why, .. }
            | Self::Template { why, .. }
            | Self::Io { why, .. }
            | Self::Config { why, .. }
            | Self::Processing { why, .. } => why,
        }
    }

    /// Immediate actionable remediation steps.
    pub fn remediation(&self) -> &str {
        match self {
            Self::InvalidInput { remediation, .. }
            | Self::PolicyViolation { remediation, .. }
            | Self::Provider { remediation, .. }
            | Self::Template { remediation, .. }
            | Self::Io { remediation, .. }
            | Self::Config { remediation, .. }
            | Self::Processing { remediation, .. } => remediation,
        }
    }

    /// The chunk this error is scoped to, when it is chunk-scoped.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::Provider { chunk_index, .. } => *chunk_index,
            _ => None,
        }
    }
}

/// Build the standardized three-part user-facing message.
pub fn format_user_error(what: &str, why: &str, how_to_fix: &str) -> String {
    format!("what: {what}; why: {why}; how-to-fix: {how_to_fix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_taxonomy_to_process_status() {
        assert_eq!(
            Error::invalid_input("a", "b", "c").exit_code().code(),
            ExitCode::Validation.code()
        );
        assert_eq!(
            Error::policy_violation("min_seconds", "a", "b", "c")
                .exit_code()
                .code(),
            3
        );
        assert_eq!(Error::config("a", "b", "c").exit_code().code(), 2);
        assert_eq!(Error::provider(Some(1), "a", "b", "c").exit_code().code(), 4);
        assert_eq!(Error::processing("a", "b", "c").exit_code().code(), 5);
        assert_eq!(Error::io("out.txt", "a", "b", "c").exit_code().code(), 5);
    }

    #[test]
    fn triad_accessors_expose_structured_context() {
        let err = Error::provider(Some(2), "chunk rejected", "bad auth", "check the API key");
        assert_eq!(err.chunk_index(), Some(2));
        assert_eq!(err.what(), "chunk rejected");
        assert_eq!(err.why(), "bad auth");
        assert_eq!(err.remediation(), "check the API key");
        assert_eq!(
            format_user_error(err.what(), err.why(), err.remediation()),
            "what: chunk rejected; why: bad auth; how-to-fix: check the API key"
        );
    }

    #[test]
    fn policy_violation_display_names_the_constraint() {
        let err = Error::policy_violation("min_seconds", "split too fine", "b", "c");
        assert!(err.to_string().contains("min_seconds"));
    }
}
