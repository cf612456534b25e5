//! The single-run pipeline orchestrator.
//!
//! This is an explicitly ordered, single-pass state machine:
//!
//! `Initialized → Planning → ExecutingChunks → Aggregating → Completed`,
//! with a terminal `Failed` state reachable from any step.
//!
//! Chunks are processed strictly in index order because aggregation must
//! present transcript text in chunk order and because the `stop` failure
//! policy must observe failures in order-correct sequence. The only
//! suspension point is the adapter call; the outcome accumulator is owned
//! exclusively by one `run` invocation.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::chunk::{self, AudioChunk};
use crate::ctx::RunContext;
use crate::media;
use crate::output::ArtifactWriter;
use crate::provider::{GenerationRequest, GenerationResult, ProviderAdapter};
use crate::template::{self, TemplateValues};
use crate::{Error, Result};

/// What to do when a chunk's provider call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abandon remaining chunks immediately and surface the first error.
    #[default]
    Stop,
    /// Record the failure, keep attempting later chunks, and report the
    /// failed set alongside the partial transcript.
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stop => "stop",
            Self::Continue => "continue",
        })
    }
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "continue" => Ok(Self::Continue),
            other => Err(Error::config(
                format!("on_chunk_failure must be one of: continue, stop (got '{other}')."),
                "an unsupported chunk failure handling policy was provided",
                "choose one of: continue, stop",
            )),
        }
    }
}

/// Orchestration phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Initialized,
    Planning,
    ExecutingChunks,
    Aggregating,
    Completed,
    Failed,
}

/// One chunk's recorded result.
#[derive(Debug)]
enum ChunkOutcome {
    Success(AudioChunk, GenerationResult),
    Failed(AudioChunk, Error),
}

/// The observable outcome of a run.
///
/// A `continue`-policy run with at least one failed chunk still carries the
/// partial transcript and the written artifact paths, but `failed_chunks` is
/// non-empty and the run must be reported as failed overall — partial success
/// is visible, never silently promoted to total success.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    /// Successful chunk transcripts joined with single newlines, in index order.
    pub transcript: String,
    pub chunk_count: usize,
    /// Indices of chunks whose provider call failed, in index order.
    pub failed_chunks: Vec<usize>,
    /// Artifact paths persisted by the writer, in write order.
    pub written: Vec<std::path::PathBuf>,
}

impl RunReport {
    /// Whether every chunk succeeded.
    pub fn is_complete_success(&self) -> bool {
        self.failed_chunks.is_empty()
    }
}

/// The pipeline orchestrator. Owns the adapter for the run's lifetime and
/// drives it one chunk at a time.
pub struct Pipeline<A> {
    adapter: A,
}

impl<A: ProviderAdapter> Pipeline<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// Access the configured adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Execute one end-to-end run.
    ///
    /// Fatal failures (invalid input, unsatisfiable policy, a chunk failure
    /// under `stop`, a write failure) return `Err`. A `continue`-policy run
    /// whose chunks partially failed returns `Ok` with a report the caller
    /// must inspect via [`RunReport::is_complete_success`].
    pub fn run(&self, ctx: &RunContext, writer: &mut dyn ArtifactWriter) -> Result<RunReport> {
        let mut state = RunState::Initialized;

        // Initialized → Planning: the run context must reference readable
        // media, and templates must be statically valid before any provider
        // spend.
        let total_seconds = match validate_run_inputs(ctx) {
            Ok(total_seconds) => total_seconds,
            Err(err) => {
                advance(&mut state, RunState::Failed, ctx);
                return Err(err);
            }
        };
        advance(&mut state, RunState::Planning, ctx);

        // Adapter limits take precedence over a larger user-configured
        // maximum, so clamp before planning.
        let limits = self.adapter.limits();
        let policy = match limits.max_audio_seconds {
            Some(limit) => ctx.policy.clamped_to(limit),
            None => ctx.policy,
        };
        let plan = match chunk::plan(total_seconds, &policy) {
            Ok(plan) => plan,
            Err(err) => {
                advance(&mut state, RunState::Failed, ctx);
                return Err(err);
            }
        };
        info!(
            run_id = %ctx.run_id,
            total_seconds,
            chunks = plan.chunks.len(),
            "chunk plan ready"
        );
        advance(&mut state, RunState::ExecutingChunks, ctx);

        let mut outcomes: Vec<ChunkOutcome> = Vec::with_capacity(plan.chunks.len());
        for audio_chunk in &plan.chunks {
            let request = GenerationRequest {
                image: ctx.image.clone(),
                audio: ctx.audio.clone(),
                chunk: Some(*audio_chunk),
                language: ctx.language.clone(),
                prompt: ctx.prompt.clone(),
                params: ctx.params.clone(),
            };
            debug!(
                run_id = %ctx.run_id,
                index = audio_chunk.index,
                start = audio_chunk.start_seconds,
                end = audio_chunk.end_seconds,
                "transcribing chunk"
            );

            match self.adapter.generate(&request) {
                Ok(result) => outcomes.push(ChunkOutcome::Success(*audio_chunk, result)),
                Err(err) => {
                    let err = chunk_scoped(err, audio_chunk.index);
                    warn!(
                        run_id = %ctx.run_id,
                        index = audio_chunk.index,
                        error = %err,
                        "chunk failed"
                    );
                    let abort = ctx.failure_policy == FailurePolicy::Stop;
                    outcomes.push(ChunkOutcome::Failed(*audio_chunk, err));
                    if abort {
                        advance(&mut state, RunState::Failed, ctx);
                        return Err(take_first_failure(outcomes));
                    }
                }
            }
        }
        advance(&mut state, RunState::Aggregating, ctx);

        let mut successes: Vec<(AudioChunk, GenerationResult)> = Vec::new();
        let mut failed_chunks: Vec<usize> = Vec::new();
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Success(audio_chunk, result) => successes.push((audio_chunk, result)),
                ChunkOutcome::Failed(audio_chunk, _) => failed_chunks.push(audio_chunk.index),
            }
        }
        if successes.is_empty() {
            advance(&mut state, RunState::Failed, ctx);
            return Err(Error::processing(
                "chunked transcription produced no successful chunks.",
                "all chunk requests failed",
                "check the provider configuration and chunk settings",
            ));
        }

        let transcript = successes
            .iter()
            .map(|(_, result)| result.transcript.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        // Aggregating → Completed: persistence failures are fatal here, but
        // they carry the artifact path so computed work is never silently lost.
        let written = match write_artifacts(ctx, writer, &transcript, &successes) {
            Ok(written) => written,
            Err(err) => {
                advance(&mut state, RunState::Failed, ctx);
                return Err(err);
            }
        };

        let final_state = if failed_chunks.is_empty() {
            RunState::Completed
        } else {
            RunState::Failed
        };
        advance(&mut state, final_state, ctx);

        Ok(RunReport {
            run_id: ctx.run_id.clone(),
            transcript,
            chunk_count: plan.chunks.len(),
            failed_chunks,
            written,
        })
    }
}

fn advance(state: &mut RunState, next: RunState, ctx: &RunContext) {
    debug!(run_id = %ctx.run_id, from = ?state, to = ?next, "pipeline state");
    *state = next;
}

/// Pre-flight checks for the `Initialized → Planning` transition. Returns the
/// validated audio duration.
fn validate_run_inputs(ctx: &RunContext) -> Result<u32> {
    media::validate_image_path(&ctx.image)?;
    media::validate_audio_path(&ctx.audio)?;
    if let Some(tpl) = &ctx.chunk_template {
        template::validate_template(tpl)?;
    }
    media::wav_duration_seconds(&ctx.audio)
}

/// Persist the aggregate transcript and, when a template is configured, one
/// artifact per successful chunk. Returns the written paths in write order.
fn write_artifacts(
    ctx: &RunContext,
    writer: &mut dyn ArtifactWriter,
    transcript: &str,
    successes: &[(AudioChunk, GenerationResult)],
) -> Result<Vec<std::path::PathBuf>> {
    let mut written = vec![writer.write_primary(transcript)?];
    if let Some(tpl) = &ctx.chunk_template {
        let stem = file_stem(&ctx.audio);
        let ext = output_extension(&ctx.output);
        for (audio_chunk, result) in successes {
            let values = TemplateValues {
                stem: &stem,
                index: audio_chunk.index,
                ext: &ext,
                chunk_start: audio_chunk.start_seconds,
                chunk_end: audio_chunk.end_seconds,
            };
            let filename = template::render_filename(tpl, &values)?;
            template::ensure_plain_filename(&filename)?;
            written.push(writer.write_chunk(&filename, &result.transcript)?);
        }
    }
    Ok(written)
}

/// Re-scope an adapter error to the chunk it failed on, preserving its triad.
fn chunk_scoped(err: Error, index: usize) -> Error {
    match err {
        Error::Provider {
            chunk_index,
            what,
            why,
            remediation,
        } => Error::Provider {
            chunk_index: chunk_index.or(Some(index)),
            what,
            why,
            remediation,
        },
        other => Error::provider(
            Some(index),
            other.what().to_owned(),
            other.why().to_owned(),
            other.remediation().to_owned(),
        ),
    }
}

/// Pull the first recorded failure out of the outcome list (used under `stop`,
/// where the failing chunk is always the last outcome recorded).
fn take_first_failure(outcomes: Vec<ChunkOutcome>) -> Error {
    for outcome in outcomes {
        if let ChunkOutcome::Failed(_, err) = outcome {
            return err;
        }
    }
    // Unreachable by construction; keep a typed error rather than panicking.
    Error::processing(
        "chunk execution aborted without a recorded failure.",
        "the stop policy fired but no failure outcome was found",
        "report this as a bug",
    )
}

fn file_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned())
}

fn output_extension(path: &std::path::Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "txt".to_owned())
}
