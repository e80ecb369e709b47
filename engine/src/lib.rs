//! Bootstrap runner for devsetup.
//!
//! Fetches the installation script, stages it as an executable temp file,
//! runs it with the caller's terminal, and removes the file on every exit
//! path.
//!
//! ```text
//! BootstrapRunner::run()
//!   PrivilegeProbe  -> refuse euid 0
//!   ScriptSource    -> bytes          (raced against Interrupt)
//!   StagedScript    -> /tmp/devsetup-XXXX.sh (0o755)
//!   <shell> <path>  -> ScriptExit     (raced against Interrupt)
//!   StagedScript::remove()
//! ```
//!
//! Everything that touches the environment (uid, signals, network, terminal)
//! is passed in as a capability so tests can substitute it.

mod error;
mod fetch;
mod interrupt;
mod privilege;
mod process;
mod report;
mod runner;

pub use error::{FetchError, RunError};
pub use fetch::{FetchFut, HttpScriptSource, HttpSourceConfig, ScriptSource};
#[cfg(unix)]
pub use interrupt::ctrl_c;
pub use interrupt::{Interrupt, InterruptFut, InterruptHandle, ManualInterrupt, NoInterrupt};
pub use privilege::{FixedUid, PrivilegeProbe, SystemPrivileges};
pub use report::{RecordingReporter, Reporter, Status};
pub use runner::{BootstrapRunner, DEFAULT_INTERRUPT_GRACE, RunnerSettings};

pub use devsetup_config::ResolvedConfig;
pub use devsetup_types::{EXIT_FAILURE, EXIT_USER_CANCELLED, ScriptExit, ScriptUrl};
