//! Error taxonomy for a bootstrap run.

use std::path::PathBuf;

use thiserror::Error;

use devsetup_types::{EXIT_FAILURE, EXIT_USER_CANCELLED, ScriptExit};

/// Why the script could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("server returned HTTP {status}")]
    Status { status: u16 },
    #[error("response exceeds size limit of {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
}

/// Terminal failure of a bootstrap run. None of these are retried.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("refusing to run as root (euid {uid})")]
    Privilege { uid: u32 },
    #[error("failed to download script: {0}")]
    Network(#[from] FetchError),
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("installation failed with {0}")]
    ChildProcess(ScriptExit),
    #[error("installation cancelled by user")]
    UserCancelled,
}

impl RunError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ChildProcess(exit) => match exit.exit_code() {
                0 => EXIT_FAILURE,
                code => code,
            },
            Self::UserCancelled => EXIT_USER_CANCELLED,
            Self::Privilege { .. } | Self::Network(_) | Self::Io { .. } => EXIT_FAILURE,
        }
    }
}
