use std::path::PathBuf;

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the background log writer alive; logs are flushed when dropped.
pub struct Guard(#[allow(dead_code)] WorkerGuard);

pub fn init_tracing(log_path: PathBuf) -> anyhow::Result<Guard> {
    let append = tracing_appender::rolling::daily(&log_path, "palaver.log");
    let (writer, guard) = tracing_appender::non_blocking(append);

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PALAVER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("palaver=debug")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_thread_ids(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(writer)
        .try_init()
        .map_err(|error| anyhow::anyhow!(error))?;

    debug!(path = %log_path.display(), "JSON logging system initialized successfully");
    Ok(Guard(guard))
}
