//! Tracing subscriber setup used by the binary.

use std::{env, sync::OnceLock};

use tracing::debug;
use tracing_appender::{
    non_blocking,
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{fmt, time::ChronoLocal, writer::MakeWriterExt},
};

const FILE_PREFIX: &str = "skillgate.log";

/// Flushes the file writer on shutdown. Only the first one installed is kept.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: stdout always, plus a daily rolling file
/// under `LOG_DIR` when set. A second call leaves the first subscriber in place.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(false)
        .with_level(true);

    let file = env::var("LOG_DIR").ok().and_then(|dir| file_writer(&dir));

    let (installed, guard) = match file {
        Some((writer, guard)) => {
            let stdout = std::io::stdout.with_max_level(tracing::Level::INFO);
            (builder.with_writer(stdout.and(writer)).try_init(), Some(guard))
        }
        None => (builder.try_init(), None),
    };

    if let Err(e) = installed {
        debug!(error = %e, "🪵 subscriber already installed");
    }
    if let Some(guard) = guard {
        keep_guard(guard);
    }

    tracing::info!("logger initialized");
}

fn file_writer(dir: &str) -> Option<(NonBlocking, WorkerGuard)> {
    let mut appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX);

    if let Some(n) = env::var("LOG_MAX_FILES").ok().and_then(|v| v.parse().ok()) {
        appender = appender.max_log_files(n);
    }

    match appender.build(dir) {
        Ok(appender) => Some(non_blocking(appender)),
        Err(e) => {
            eprintln!("failed to create log file in {dir}: {e}, logging to stdout only");
            None
        }
    }
}

/// Stores `guard` for the life of the process. Returns `false`, dropping it,
/// when an earlier guard is already held.
fn keep_guard(guard: WorkerGuard) -> bool {
    match LOG_GUARD.set(guard) {
        Ok(()) => true,
        Err(_) => {
            debug!("🪵 log file guard already held, dropping the new one");
            false
        }
    }
}
