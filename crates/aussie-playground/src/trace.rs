use eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

/// Level configured via RUST_LOG, defaulting to warnings. Logs go to
/// stderr so they never mix with program output.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| eyre!("failed to initialize tracing: {error}"))
}
