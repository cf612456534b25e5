// The SyncCraft CLI: validate inputs, run the transcription pipeline, and map
// the error taxonomy onto process exit codes.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use synccraft::config::{self, Overrides, Settings};
use synccraft::ctx::RunContext;
use synccraft::error::{ExitCode, format_user_error};
use synccraft::output::FsWriter;
use synccraft::pipeline::{FailurePolicy, Pipeline, RunReport};
use synccraft::provider::ProviderKind;

#[derive(Parser, Debug)]
#[command(name = "synccraft")]
#[command(version)]
#[command(about = "Transcribe an image+audio pair through a chunked provider pipeline")]
struct Args {
    /// Path to the source image file.
    image: PathBuf,

    /// Path to the source audio file.
    audio: PathBuf,

    /// Path to the YAML config file.
    #[arg(long)]
    config: PathBuf,

    /// Override the configured output path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the configured provider (mock, omni).
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Override the configured language hint.
    #[arg(long)]
    language: Option<String>,

    /// Override the chunk-failure policy (stop, continue).
    #[arg(long = "on-chunk-failure")]
    on_chunk_failure: Option<FailurePolicy>,

    /// Enable INFO logging.
    #[arg(long)]
    verbose: bool,

    /// Enable DEBUG logging.
    #[arg(long)]
    debug: bool,

    /// Validate inputs and print the execution summary without provider calls.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.debug {
        LevelFilter::DEBUG
    } else if args.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::ERROR
    };
    synccraft::logging::init(level);

    std::process::exit(run(&args));
}

fn run(args: &Args) -> i32 {
    match execute(args) {
        Ok(code) => code.code(),
        Err(err) => {
            eprintln!(
                "{}",
                format_user_error(err.what(), err.why(), err.remediation())
            );
            err.exit_code().code()
        }
    }
}

fn execute(args: &Args) -> synccraft::Result<ExitCode> {
    let started = Instant::now();

    let load_started = Instant::now();
    let settings = config::load_settings(&args.config)?.with_overrides(Overrides {
        provider: args.provider,
        output: args.output.clone(),
        language: args.language.clone(),
        on_chunk_failure: args.on_chunk_failure,
    });
    let ctx = config::resolve_run_context(&args.image, &args.audio, &settings)?;

    print_execution_summary(args, &settings, &ctx);
    emit_progress("loaded", "inputs and configuration validated");
    emit_timing_if_enabled(args, "loaded", load_started.elapsed().as_secs_f64());

    if args.dry_run {
        emit_progress("dry-run", "skipping provider calls");
        return Ok(ExitCode::Ok);
    }

    let process_started = Instant::now();
    emit_progress("processing", "starting transcription");
    let adapter = settings.build_adapter()?;
    let pipeline = Pipeline::new(adapter);
    let mut writer = FsWriter::new(&ctx.output);
    let report = pipeline.run(&ctx, &mut writer)?;
    emit_timing_if_enabled(args, "processing", process_started.elapsed().as_secs_f64());

    emit_progress(
        "saved",
        &format!("transcript saved to {}", ctx.output.display()),
    );
    emit_timing_if_enabled(args, "total", started.elapsed().as_secs_f64());

    if report.is_complete_success() {
        Ok(ExitCode::Ok)
    } else {
        report_partial_failure(&report);
        Ok(ExitCode::Processing)
    }
}

fn print_execution_summary(args: &Args, settings: &Settings, ctx: &RunContext) {
    println!("SyncCraft execution summary");
    println!("  image: {}", ctx.image.display());
    println!("  audio: {}", ctx.audio.display());
    println!("  config: {}", args.config.display());
    println!("  provider: {}", ctx.provider);
    if let Some(payload) = &settings.provider_payload {
        println!("  provider_payload: {}", payload.display());
    }
    println!("  output: {}", ctx.output.display());
}

/// Emit friendly human-readable progress events.
fn emit_progress(event: &str, detail: &str) {
    println!("progress: {event} - {detail}");
}

/// Emit timing events in verbose/debug modes.
fn emit_timing_if_enabled(args: &Args, phase: &str, elapsed_seconds: f64) {
    if args.verbose || args.debug {
        println!("timing: {phase}={elapsed_seconds:.3}s");
    }
}

/// A continue-policy run with failed chunks keeps its partial artifacts but
/// still exits non-zero; make the failed set visible.
fn report_partial_failure(report: &RunReport) {
    let indices = report
        .failed_chunks
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    eprintln!(
        "{}",
        format_user_error(
            &format!(
                "{} of {} chunks failed (indices: {indices}).",
                report.failed_chunks.len(),
                report.chunk_count
            ),
            "on_chunk_failure was set to continue, so the remaining chunks were still transcribed",
            "re-run after fixing the provider issue, or inspect the partial transcript",
        )
    );
}
