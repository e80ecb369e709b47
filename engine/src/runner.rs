//! The bootstrap sequence: check → fetch → stage → execute → cleanup.

use std::error::Error;
use std::fmt::Write;
use std::path::PathBuf;
use std::time::Duration;

use devsetup_config::ResolvedConfig;
use devsetup_types::{ScriptExit, ScriptUrl};
use devsetup_utils::{StageOptions, StagedScript};

use crate::error::RunError;
use crate::fetch::ScriptSource;
use crate::interrupt::Interrupt;
use crate::privilege::PrivilegeProbe;
use crate::process::{self, Completion};
use crate::report::{Reporter, Status};

/// How long an interrupted script may take to exit before it is killed.
pub const DEFAULT_INTERRUPT_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub script_url: ScriptUrl,
    /// Absolute path of the interpreter for the staged script.
    pub shell: PathBuf,
    pub temp_dir: PathBuf,
    pub stage: StageOptions,
    pub interrupt_grace: Duration,
}

impl From<&ResolvedConfig> for RunnerSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            script_url: config.script_url.clone(),
            shell: config.shell.clone(),
            temp_dir: config.temp_dir.clone(),
            stage: StageOptions::default(),
            interrupt_grace: DEFAULT_INTERRUPT_GRACE,
        }
    }
}

/// Runs one bootstrap. Environment access comes in through the borrowed
/// capabilities so the sequence itself stays deterministic.
pub struct BootstrapRunner<'a> {
    settings: RunnerSettings,
    source: &'a dyn ScriptSource,
    privileges: &'a dyn PrivilegeProbe,
    interrupt: &'a dyn Interrupt,
    reporter: &'a dyn Reporter,
}

impl<'a> BootstrapRunner<'a> {
    pub fn new(
        settings: RunnerSettings,
        source: &'a dyn ScriptSource,
        privileges: &'a dyn PrivilegeProbe,
        interrupt: &'a dyn Interrupt,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            settings,
            source,
            privileges,
            interrupt,
            reporter,
        }
    }

    /// Run the sequence once.
    ///
    /// `Ok` only when the script exits with status 0. Every failure has
    /// already been reported when this returns, and the staged file is gone.
    pub async fn run(&self) -> Result<ScriptExit, RunError> {
        let result = self.run_inner().await;
        match &result {
            Ok(exit) => tracing::info!(%exit, "Bootstrap finished"),
            Err(err) => {
                tracing::warn!(exit_code = err.exit_code(), "Bootstrap failed: {err}");
                self.report_failure(err);
            }
        }
        result
    }

    async fn run_inner(&self) -> Result<ScriptExit, RunError> {
        if self.privileges.is_superuser() {
            return Err(RunError::Privilege {
                uid: self.privileges.effective_uid(),
            });
        }

        self.reporter.report(Status::Banner);
        self.reporter.report(Status::Downloading {
            url: self.settings.script_url.clone(),
        });

        let bytes = tokio::select! {
            biased;
            () = self.interrupt.wait() => return Err(RunError::UserCancelled),
            fetched = self.source.fetch(&self.settings.script_url) => fetched?,
        };
        self.reporter.report(Status::Downloaded { bytes: bytes.len() });

        let staged = StagedScript::stage_in(&self.settings.temp_dir, &bytes, self.settings.stage)
            .map_err(|source| RunError::Io {
                context: "failed to stage script in",
                path: self.settings.temp_dir.clone(),
                source,
            })?;

        let outcome = self.execute(&staged).await;
        staged.remove();

        let exit = outcome?;
        if exit.success() {
            Ok(exit)
        } else {
            Err(RunError::ChildProcess(exit))
        }
    }

    async fn execute(&self, staged: &StagedScript) -> Result<ScriptExit, RunError> {
        let guard = process::spawn_script(&self.settings.shell, staged.path()).map_err(|source| {
            RunError::Io {
                context: "failed to launch",
                path: self.settings.shell.clone(),
                source,
            }
        })?;

        let completion =
            process::wait_or_interrupt(guard, self.interrupt, self.settings.interrupt_grace)
                .await
                .map_err(|source| RunError::Io {
                    context: "failed waiting for",
                    path: staged.path().to_path_buf(),
                    source,
                })?;

        match completion {
            Completion::Exited(exit) => Ok(exit),
            Completion::Interrupted => Err(RunError::UserCancelled),
        }
    }

    fn report_failure(&self, err: &RunError) {
        let status = match err {
            RunError::Privilege { .. } => Status::RefusedRoot,
            RunError::Network(fetch) => Status::DownloadFailed {
                reason: error_chain(fetch),
            },
            RunError::Io { .. } => Status::Unexpected {
                reason: error_chain(err),
            },
            RunError::ChildProcess(exit) => Status::ScriptFailed { exit: *exit },
            RunError::UserCancelled => Status::Cancelled,
        };
        self.reporter.report(status);
    }
}

/// Render an error followed by its distinct sources.
fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            let _ = write!(out, ": {text}");
        }
        source = cause.source();
    }
    out
}
