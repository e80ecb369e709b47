//! Configuration loading for devsetup.
//!
//! Settings come from three layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. `~/.devsetup/config.toml`
//! 3. `DEVSETUP_*` environment variables
//!
//! ```toml
//! [bootstrap]
//! script_url = "https://raw.githubusercontent.com/one-command/dev-setup/main/devsetup.sh"
//! shell = "/bin/bash"
//! timeout_seconds = 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

use devsetup_types::{DEFAULT_SCRIPT_URL, SchemePolicy, ScriptUrl, ScriptUrlError};

pub const DEFAULT_SHELL: &str = "/bin/bash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = concat!("devsetup/", env!("CARGO_PKG_VERSION"));

pub const ENV_SCRIPT_URL: &str = "DEVSETUP_SCRIPT_URL";
pub const ENV_SHELL: &str = "DEVSETUP_SHELL";
pub const ENV_ALLOW_INSECURE_HTTP: &str = "DEVSETUP_ALLOW_INSECURE_HTTP";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    ScriptUrl(#[from] ScriptUrlError),
    #[error("shell must be an absolute path, got '{0}'")]
    Shell(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct DevsetupConfig {
    pub bootstrap: Option<BootstrapConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BootstrapConfig {
    pub script_url: Option<String>,
    /// Interpreter used to run the staged script.
    pub shell: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_download_bytes: Option<u64>,
    pub user_agent: Option<String>,
    /// Directory for the staged script. Defaults to the system temp dir.
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub allow_insecure_http: bool,
}

impl DevsetupConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Load from an explicit path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".devsetup").join("config.toml"))
}

/// Expand `${VAR}` references. Unset variables expand to the empty string.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find("${") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[pos..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Environment overrides, captured once so resolution stays deterministic.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub script_url: Option<String>,
    pub shell: Option<String>,
    pub allow_insecure_http: Option<bool>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            script_url: non_empty_var(ENV_SCRIPT_URL),
            shell: non_empty_var(ENV_SHELL),
            allow_insecure_http: non_empty_var(ENV_ALLOW_INSECURE_HTTP)
                .map(|raw| is_truthy(&raw)),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Fully resolved settings for one bootstrap run.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub script_url: ScriptUrl,
    pub shell: PathBuf,
    pub timeout: Duration,
    pub max_download_bytes: u64,
    pub user_agent: String,
    pub temp_dir: PathBuf,
    pub allow_insecure_http: bool,
}

impl ResolvedConfig {
    pub fn resolve(
        config: Option<&DevsetupConfig>,
        overrides: &EnvOverrides,
    ) -> Result<Self, ConfigError> {
        let bootstrap = config.and_then(|c| c.bootstrap.as_ref());

        let allow_insecure = overrides
            .allow_insecure_http
            .unwrap_or_else(|| bootstrap.is_some_and(|b| b.allow_insecure_http));
        let policy = if allow_insecure {
            SchemePolicy::AllowInsecureHttp
        } else {
            SchemePolicy::HttpsOnly
        };

        let raw_url = overrides
            .script_url
            .clone()
            .or_else(|| bootstrap.and_then(|b| b.script_url.as_deref()).map(expand_env_vars))
            .unwrap_or_else(|| DEFAULT_SCRIPT_URL.to_string());
        let script_url = ScriptUrl::parse(&raw_url, policy)?;

        let shell = overrides
            .shell
            .clone()
            .or_else(|| bootstrap.and_then(|b| b.shell.as_deref()).map(expand_env_vars))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());
        let shell = PathBuf::from(shell.trim());
        if !shell.is_absolute() {
            return Err(ConfigError::Shell(shell.display().to_string()));
        }

        let timeout = Duration::from_secs(
            bootstrap
                .and_then(|b| b.timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECS)
                .max(1),
        );

        let max_download_bytes = bootstrap
            .and_then(|b| b.max_download_bytes)
            .unwrap_or(DEFAULT_MAX_DOWNLOAD_BYTES)
            .max(1);

        let user_agent = bootstrap
            .and_then(|b| b.user_agent.as_deref())
            .map(expand_env_vars)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let temp_dir = bootstrap
            .and_then(|b| b.temp_dir.clone())
            .unwrap_or_else(env::temp_dir);

        if allow_insecure {
            tracing::warn!("Plain http script URLs are allowed by configuration");
        }

        Ok(Self {
            script_url,
            shell,
            timeout,
            max_download_bytes,
            user_agent,
            temp_dir,
            allow_insecure_http: allow_insecure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> DevsetupConfig {
        toml::from_str(toml_src).expect("valid toml")
    }

    #[test]
    fn defaults_without_config() {
        let resolved = ResolvedConfig::resolve(None, &EnvOverrides::default()).expect("resolve");
        assert_eq!(resolved.script_url.as_str(), DEFAULT_SCRIPT_URL);
        assert_eq!(resolved.shell, PathBuf::from(DEFAULT_SHELL));
        assert_eq!(resolved.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(resolved.max_download_bytes, DEFAULT_MAX_DOWNLOAD_BYTES);
        assert!(resolved.user_agent.starts_with("devsetup/"));
    }

    #[test]
    fn file_values_are_used() {
        let config = parse(
            r#"
            [bootstrap]
            script_url = "https://mirror.example.com/setup.sh"
            shell = "/bin/sh"
            timeout_seconds = 5
            max_download_bytes = 1024
            user_agent = "custom/1.0"
            temp_dir = "/var/tmp"
            "#,
        );
        let resolved =
            ResolvedConfig::resolve(Some(&config), &EnvOverrides::default()).expect("resolve");
        assert_eq!(resolved.script_url.as_str(), "https://mirror.example.com/setup.sh");
        assert_eq!(resolved.shell, PathBuf::from("/bin/sh"));
        assert_eq!(resolved.timeout, Duration::from_secs(5));
        assert_eq!(resolved.max_download_bytes, 1024);
        assert_eq!(resolved.user_agent, "custom/1.0");
        assert_eq!(resolved.temp_dir, PathBuf::from("/var/tmp"));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let config = parse(
            r#"
            [bootstrap]
            script_url = "https://mirror.example.com/setup.sh"
            shell = "/bin/sh"
            "#,
        );
        let overrides = EnvOverrides {
            script_url: Some("https://other.example.com/x.sh".to_string()),
            shell: Some("/usr/bin/bash".to_string()),
            allow_insecure_http: None,
        };
        let resolved = ResolvedConfig::resolve(Some(&config), &overrides).expect("resolve");
        assert_eq!(resolved.script_url.as_str(), "https://other.example.com/x.sh");
        assert_eq!(resolved.shell, PathBuf::from("/usr/bin/bash"));
    }

    #[test]
    fn http_requires_override() {
        let config = parse(
            r#"
            [bootstrap]
            script_url = "http://127.0.0.1:8080/setup.sh"
            "#,
        );
        let err = ResolvedConfig::resolve(Some(&config), &EnvOverrides::default())
            .expect_err("http rejected");
        assert!(matches!(err, ConfigError::ScriptUrl(ScriptUrlError::Scheme(_))));

        let overrides = EnvOverrides {
            allow_insecure_http: Some(true),
            ..Default::default()
        };
        let resolved = ResolvedConfig::resolve(Some(&config), &overrides).expect("resolve");
        assert_eq!(resolved.script_url.as_url().scheme(), "http");
        assert!(resolved.allow_insecure_http);
    }

    #[test]
    fn env_can_revoke_file_insecure_opt_in() {
        let config = parse(
            r#"
            [bootstrap]
            script_url = "http://127.0.0.1:8080/setup.sh"
            allow_insecure_http = true
            "#,
        );
        let overrides = EnvOverrides {
            allow_insecure_http: Some(false),
            ..Default::default()
        };
        assert!(ResolvedConfig::resolve(Some(&config), &overrides).is_err());
    }

    #[test]
    fn relative_shell_rejected() {
        let overrides = EnvOverrides {
            shell: Some("bash".to_string()),
            ..Default::default()
        };
        let err = ResolvedConfig::resolve(None, &overrides).expect_err("relative shell");
        assert!(matches!(err, ConfigError::Shell(_)));
    }

    #[test]
    fn zero_limits_are_clamped() {
        let config = parse(
            r#"
            [bootstrap]
            timeout_seconds = 0
            max_download_bytes = 0
            "#,
        );
        let resolved =
            ResolvedConfig::resolve(Some(&config), &EnvOverrides::default()).expect("resolve");
        assert_eq!(resolved.timeout, Duration::from_secs(1));
        assert_eq!(resolved.max_download_bytes, 1);
    }

    #[test]
    fn load_from_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = DevsetupConfig::load_from(&dir.path().join("config.toml")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn load_from_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[bootstrap\nscript_url = ").expect("write");
        let err = DevsetupConfig::load_from(&path).expect_err("parse error");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_from_valid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[bootstrap]\nshell = \"/bin/sh\"\n").expect("write");
        let loaded = DevsetupConfig::load_from(&path).expect("load").expect("some");
        assert_eq!(
            loaded.bootstrap.and_then(|b| b.shell).as_deref(),
            Some("/bin/sh")
        );
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            env::set_var("DEVSETUP_TEST_EXPAND_VAR", "replaced");
        }
        assert_eq!(
            expand_env_vars("prefix ${DEVSETUP_TEST_EXPAND_VAR} suffix"),
            "prefix replaced suffix"
        );
        unsafe {
            env::remove_var("DEVSETUP_TEST_EXPAND_VAR");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        assert_eq!(
            expand_env_vars("before ${DEVSETUP_TEST_MISSING_VAR} after"),
            "before  after"
        );
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("test ${UNCLOSED"), "test ${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_var_name_dropped() {
        assert_eq!(expand_env_vars("test ${} more"), "test  more");
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" YeS "));
        assert!(is_truthy("TRUE"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("on"));
    }
}
