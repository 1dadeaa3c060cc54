use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Filter directives, e.g. `promption=debug`.
pub const LOG_ENV: &str = "PROMPTION_LOG";
/// When set, log lines are appended to this file instead of stderr.
pub const DEBUG_FILE_ENV: &str = "PROMPTION_DEBUG";

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

fn open_log_file(path: &Path) -> Result<Mutex<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Mutex::new(file))
}

fn init_error(err: impl std::fmt::Display) -> Error {
    Error::Io(std::io::Error::other(format!(
        "failed to install log subscriber: {err}"
    )))
}

/// Install the global subscriber.
///
/// With `PROMPTION_DEBUG` set, everything at `debug` and above goes to that
/// file. Otherwise warnings go to stderr, except in the terminal UI where
/// stderr belongs to the screen and nothing is installed.
pub fn init(interactive: bool) -> Result<()> {
    if let Some(path) = std::env::var_os(DEBUG_FILE_ENV).map(PathBuf::from) {
        let writer = open_log_file(&path)?;
        return tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            )
            .with(filter("debug"))
            .try_init()
            .map_err(init_error);
    }
    if interactive {
        return Ok(());
    }
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter("warn"))
        .try_init()
        .map_err(init_error)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        for line in ["one\n", "two\n"] {
            let file = open_log_file(&path).unwrap();
            file.lock().unwrap().write_all(line.as_bytes()).unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}
