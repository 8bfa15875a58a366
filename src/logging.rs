//! Run logging.
//!
//! Each batch run owns a [`RunLogger`]. While it is alive, every `tracing`
//! event emitted on the run's thread goes to stderr and, as one timestamped
//! line, to the run log in the destination directory. Dropping the logger
//! detaches it, so consecutive runs in one process never share a sink.
//!
//! `RUST_LOG` overrides the level chosen by the `--quiet` flag.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Logger scoped to one batch run.
pub struct RunLogger {
    path: PathBuf,
    _guard: DefaultGuard,
}

impl RunLogger {
    /// Opens (appending) the log file at `log_path` and installs the run's subscriber.
    ///
    /// With `quiet`, only errors are recorded.
    pub fn start(log_path: &Path, quiet: bool) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let level = if quiet { "error" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            );

        Ok(Self {
            path: log_path.to_path_buf(),
            _guard: tracing::subscriber::set_default(subscriber),
        })
    }

    /// Path of the run log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
