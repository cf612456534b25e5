use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize structured JSON logging.
///
/// `default` is the level used unless overridden by `SYNCCRAFT_LOG`.
/// Idempotent (safe to call multiple times).
pub fn init(default: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_env_var("SYNCCRAFT_LOG")
        .with_default_directive(default.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init();
}
