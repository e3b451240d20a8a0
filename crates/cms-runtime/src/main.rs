//! # DCMS Runtime
//!
//! Entry point: configure logging, start the bundle framework, read
//! lifecycle commands from stdin as JSON lines and shut down on Ctrl+C.
//!
//! ```text
//! $ echo '{"command":"bundle.install","bundle":"/webapp/userprofile"}' | cms-runtime
//! ```

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cms_runtime::{CmsRuntime, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level)?)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow!(e))?;

    let runtime = CmsRuntime::new(config)?;
    let commands = runtime.start().await?;
    runtime.attach_stdin(commands)?;

    info!("Runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
