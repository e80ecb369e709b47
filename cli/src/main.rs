//! devsetup - one-command developer environment bootstrap.
//!
//! Downloads the installation script, runs it with this terminal, and exits
//! with the script's own status.
//!
//! ```text
//! main() -> init_tracing() -> bootstrap() -> BootstrapRunner::run() -> ExitCode
//! ```
//!
//! Exit codes: the script's code when it runs, `130` on Ctrl+C, `1` for
//! anything else (root, download, staging, configuration).

mod console;

use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use devsetup_config::{DevsetupConfig, EnvOverrides};
use devsetup_engine::{
    BootstrapRunner, EXIT_FAILURE, HttpScriptSource, HttpSourceConfig, ManualInterrupt,
    Reporter, ResolvedConfig, RunnerSettings, Status, SystemPrivileges,
};

use crate::console::ConsoleReporter;

const DEFAULT_LOG_FILTER: &str = "info";
const LOG_FILE_NAME: &str = "devsetup.log";

/// Where logs ended up, and why earlier locations were passed over.
struct LogTarget {
    path: PathBuf,
    file: fs::File,
    rejected: Vec<String>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    // The installer owns the terminal; no log file means no logs.
    let Some(target) = open_log_target(log_file_candidates()) else {
        registry.init();
        return;
    };

    registry
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(target.file)))
        .init();
    tracing::info!(path = %target.path.display(), "Logging initialized");
    for reason in target.rejected {
        tracing::warn!("Skipped log location {reason}");
    }
}

fn open_log_target(candidates: impl IntoIterator<Item = PathBuf>) -> Option<LogTarget> {
    let mut rejected = Vec::new();
    for path in candidates {
        match open_append(&path) {
            Ok(file) => {
                return Some(LogTarget {
                    path,
                    file,
                    rejected,
                });
            }
            Err(e) => rejected.push(format!("{}: {e}", path.display())),
        }
    }
    None
}

fn open_append(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// `~/.devsetup/logs/devsetup.log`, then `./.devsetup/logs/devsetup.log`.
fn log_file_candidates() -> Vec<PathBuf> {
    let home = DevsetupConfig::path().and_then(|p| p.parent().map(Path::to_path_buf));
    home.into_iter()
        .chain([PathBuf::from(".devsetup")])
        .map(|dir| dir.join("logs").join(LOG_FILE_NAME))
        .collect()
}

#[cfg(unix)]
fn install_interrupt() -> io::Result<ManualInterrupt> {
    devsetup_engine::ctrl_c()
}

#[cfg(not(unix))]
fn install_interrupt() -> io::Result<ManualInterrupt> {
    Ok(ManualInterrupt::new())
}

async fn bootstrap(reporter: &dyn Reporter) -> Result<u8> {
    // Before anything else, so an early Ctrl+C still reaches the runner.
    let interrupt = install_interrupt().context("failed to install interrupt handler")?;

    let file_config = DevsetupConfig::load().context("failed to load configuration")?;
    let config = ResolvedConfig::resolve(file_config.as_ref(), &EnvOverrides::from_env())
        .context("invalid configuration")?;
    tracing::debug!(?config, "Resolved configuration");

    let source = HttpScriptSource::new(&HttpSourceConfig::from(&config))
        .context("failed to build HTTP client")?;

    let runner = BootstrapRunner::new(
        RunnerSettings::from(&config),
        &source,
        &SystemPrivileges,
        &interrupt,
        reporter,
    );

    let code = match runner.run().await {
        Ok(exit) => exit.exit_code(),
        Err(err) => err.exit_code(),
    };
    Ok(code)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let reporter = ConsoleReporter::stdout();
    match bootstrap(&reporter).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!("{err:#}");
            reporter.report(Status::Unexpected {
                reason: format!("{err:#}"),
            });
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_directory_log_is_the_last_resort() {
        let candidates = log_file_candidates();
        assert_eq!(
            candidates.last(),
            Some(&PathBuf::from(".devsetup/logs/devsetup.log"))
        );
    }

    #[test]
    fn unusable_locations_are_skipped_with_a_reason() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").expect("write blocker");

        let unusable = blocker.join("logs").join(LOG_FILE_NAME);
        let usable = dir.path().join("nested").join("logs").join(LOG_FILE_NAME);
        let target = open_log_target([unusable.clone(), usable.clone()]).expect("log target");

        assert_eq!(target.path, usable);
        assert!(usable.exists());
        assert_eq!(target.rejected.len(), 1);
        assert!(target.rejected[0].starts_with(&unusable.display().to_string()));
    }

    #[test]
    fn no_usable_location_disables_file_logging() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").expect("write blocker");

        assert!(open_log_target([blocker.join("devsetup.log")]).is_none());
    }
}
