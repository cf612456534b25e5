/// Fixture-backed adapter for reproducible runs and contract tests.
pub mod mock;

/// Network-backed adapter.
#[cfg(feature = "omni")]
pub mod omni;
