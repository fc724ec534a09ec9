//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Installs the global JSON log subscriber. Level filtering follows
/// `RUST_LOG`, defaulting to `info`.
pub fn init_subscriber() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()?;
    Ok(())
}
