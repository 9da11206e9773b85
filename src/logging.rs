use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::common::constants::DEFAULT_LOG_DIR;

/// Initializes the logging system with both console and file output.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all(DEFAULT_LOG_DIR);

    // Non-blocking file appender with daily rotation
    let file_appender = tracing_appender::rolling::daily(DEFAULT_LOG_DIR, "scraper.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // JSON lines in the file so recurring date formats can be grepped per source
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise verbose for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mms_scraper=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // The guard must outlive the process for the file writer to flush
    std::mem::forget(guard);
}
