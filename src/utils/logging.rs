use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Level comes from the CLI flags; RUST_LOG
/// directives still take precedence for targeted debugging.
pub fn init(verbose: bool, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("imgprobe={}", level).parse()?)
        .add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
