//! Core domain types for devsetup.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)]

use std::fmt;

use thiserror::Error;
use url::Url;

/// Built-in location of the installation script.
pub const DEFAULT_SCRIPT_URL: &str =
    "https://raw.githubusercontent.com/one-command/dev-setup/main/devsetup.sh";

/// Exit code for download, staging, configuration, and unexpected failures.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for runs cancelled by the operator (128 + SIGINT).
pub const EXIT_USER_CANCELLED: u8 = 130;

// ============================================================================
// Script URL
// ============================================================================

/// Which URL schemes a [`ScriptUrl`] may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemePolicy {
    #[default]
    HttpsOnly,
    /// Also accept plain `http`. Only for local mirrors and tests.
    AllowInsecureHttp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptUrlError {
    #[error("script URL must not be empty")]
    Empty,
    #[error("failed to parse script URL: {0}")]
    Parse(String),
    #[error("scheme '{0}' not allowed; the script URL must use https")]
    Scheme(String),
    #[error("script URL has no host")]
    NoHost,
}

/// Validated location of the remote installation script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptUrl(Url);

impl ScriptUrl {
    pub fn parse(raw: &str, policy: SchemePolicy) -> Result<Self, ScriptUrlError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScriptUrlError::Empty);
        }

        let url = Url::parse(trimmed).map_err(|e| ScriptUrlError::Parse(e.to_string()))?;

        match (url.scheme(), policy) {
            ("https", _) | ("http", SchemePolicy::AllowInsecureHttp) => {}
            (scheme, _) => return Err(ScriptUrlError::Scheme(scheme.to_string())),
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(ScriptUrlError::NoHost);
        }

        Ok(Self(url))
    }

    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for ScriptUrl {
    fn default() -> Self {
        Self(Url::parse(DEFAULT_SCRIPT_URL).expect("DEFAULT_SCRIPT_URL must be a valid URL"))
    }
}

impl fmt::Display for ScriptUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

// ============================================================================
// Script Exit
// ============================================================================

/// How the staged script terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptExit {
    /// Normal termination with an exit code.
    Code(u8),
    /// Terminated by a signal before it could exit.
    Signal(i32),
}

impl ScriptExit {
    /// Build from the pieces a platform `ExitStatus` exposes.
    ///
    /// A missing code with a missing signal is treated as a generic failure.
    #[must_use]
    pub fn from_parts(code: Option<i32>, signal: Option<i32>) -> Self {
        match (code, signal) {
            (Some(code), _) => Self::Code((code & 0xff) as u8),
            (None, Some(signal)) => Self::Signal(signal),
            (None, None) => Self::Code(EXIT_FAILURE),
        }
    }

    #[must_use]
    pub fn success(self) -> bool {
        matches!(self, Self::Code(0))
    }

    /// Exit code the runner itself should terminate with.
    ///
    /// Signal terminations follow the shell convention of `128 + signal`.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Code(code) => code,
            Self::Signal(signal) => u8::try_from(128 + signal.clamp(0, 127)).unwrap_or(EXIT_FAILURE),
        }
    }
}

impl fmt::Display for ScriptExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}
