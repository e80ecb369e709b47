//! Child process management for the staged script.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

use devsetup_types::ScriptExit;

use crate::interrupt::Interrupt;

/// RAII guard that kills the child process on drop.
///
/// The child shares our process group so it can read from the terminal, so
/// only the child itself is killed, never the group. Call `disarm()` once the
/// child has been reaped.
pub(crate) struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    pub(crate) fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    pub(crate) fn child_mut(&mut self) -> &mut Child {
        self.child.as_mut().expect("child present")
    }

    pub(crate) fn disarm(&mut self) {
        self.child = None;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        let _ = child.start_kill();
        let _ = child.try_wait();
    }
}

pub(crate) enum Completion {
    Exited(ScriptExit),
    Interrupted,
}

/// Start `<shell> <script>` with the terminal streams passed through.
pub(crate) fn spawn_script(shell: &Path, script: &Path) -> io::Result<ChildGuard> {
    let child = Command::new(shell)
        .arg(script)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()?;
    tracing::info!(pid = ?child.id(), shell = %shell.display(), "Spawned staged script");
    Ok(ChildGuard::new(child))
}

/// Wait for the child, or for an interrupt.
///
/// On interrupt the child gets `grace` to exit by itself (it normally sees
/// the same SIGINT from the terminal) before it is killed. Either way the
/// child is reaped before this returns. A child that exits while an
/// interrupt is pending counts as interrupted, whatever its status.
pub(crate) async fn wait_or_interrupt(
    mut guard: ChildGuard,
    interrupt: &dyn Interrupt,
    grace: Duration,
) -> io::Result<Completion> {
    tokio::select! {
        biased;

        () = interrupt.wait() => {
            let child = guard.child_mut();
            let reaped = match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::debug!(%status, "Staged script exited after interrupt");
                    true
                }
                Ok(Err(e)) => {
                    tracing::debug!("Waiting on interrupted script failed: {e}");
                    false
                }
                Err(_) => {
                    tracing::info!("Killing staged script after interrupt grace period");
                    false
                }
            };
            if !reaped && let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill staged script: {e}");
            }
            guard.disarm();
            Ok(Completion::Interrupted)
        }
        status = guard.child_mut().wait() => {
            let status = status?;
            guard.disarm();
            // The terminal delivers SIGINT to the child and to us together;
            // let the signal task run before trusting the exit status.
            tokio::task::yield_now().await;
            if interrupt.fired() {
                tracing::debug!(%status, "Staged script exited on interrupt");
                return Ok(Completion::Interrupted);
            }
            Ok(Completion::Exited(script_exit(status)))
        }
    }
}

fn script_exit(status: ExitStatus) -> ScriptExit {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    ScriptExit::from_parts(status.code(), signal)
}
