//! Terminal rendering of runner status events.

use std::io::{self, Stdout, Write};
use std::sync::Mutex;

use crossterm::style::Stylize;

use devsetup_engine::{Reporter, ScriptExit, Status};

const BANNER: [&str; 5] = [
    "╔════════════════════════════════════════╗",
    "║                                        ║",
    "║     🚀 One Command Dev Setup 🚀        ║",
    "║                                        ║",
    "╚════════════════════════════════════════╝",
];

/// Writes colored status lines, one event at a time.
pub struct ConsoleReporter<W> {
    out: Mutex<W>,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn render(out: &mut impl Write, status: &Status) -> io::Result<()> {
    match status {
        Status::Banner => {
            for line in BANNER {
                writeln!(out, "{}", line.cyan())?;
            }
            writeln!(out)?;
        }
        Status::Downloading { url } => {
            tracing::info!(%url, "Downloading installation script");
            writeln!(out, "{}", "Downloading installation script...".yellow())?;
        }
        Status::Downloaded { .. } => {
            writeln!(out, "{}", "✓ Script downloaded successfully!".green())?;
            writeln!(out)?;
        }
        Status::RefusedRoot => {
            writeln!(
                out,
                "{}",
                "✗ Please do not run this script as root or with sudo".red()
            )?;
            writeln!(
                out,
                "{}",
                "  The script will ask for sudo password when needed".yellow()
            )?;
        }
        Status::DownloadFailed { reason } => {
            writeln!(out, "{}", format!("✗ Failed to download script: {reason}").red())?;
            writeln!(
                out,
                "{}",
                "Please check your internet connection and try again.".yellow()
            )?;
        }
        Status::ScriptFailed { exit } => {
            let line = match exit {
                ScriptExit::Code(code) => {
                    format!("✗ Installation failed with error code {code}")
                }
                ScriptExit::Signal(signal) => {
                    format!("✗ Installation terminated by signal {signal}")
                }
            };
            writeln!(out, "{}", line.red())?;
        }
        Status::Cancelled => {
            writeln!(out)?;
            writeln!(out, "{}", "⚠️  Installation cancelled by user".yellow())?;
        }
        Status::Unexpected { reason } => {
            writeln!(out, "{}", format!("✗ Unexpected error: {reason}").red())?;
        }
    }
    out.flush()
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn report(&self, status: Status) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = render(&mut *out, &status) {
            tracing::debug!("Failed to write status to terminal: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use devsetup_engine::ScriptUrl;

    use super::*;

    fn rendered(events: Vec<Status>) -> String {
        let reporter = ConsoleReporter::new(Vec::new());
        for event in events {
            reporter.report(event);
        }
        String::from_utf8(reporter.into_inner()).expect("utf-8 output")
    }

    #[test]
    fn banner_and_progress() {
        let text = rendered(vec![
            Status::Banner,
            Status::Downloading {
                url: ScriptUrl::default(),
            },
            Status::Downloaded { bytes: 10 },
        ]);
        assert!(text.contains("One Command Dev Setup"));
        assert!(text.contains("Downloading installation script..."));
        assert!(text.contains("Script downloaded successfully!"));
    }

    #[test]
    fn root_refusal_explains_sudo() {
        let text = rendered(vec![Status::RefusedRoot]);
        assert!(text.contains("do not run this script as root"));
        assert!(text.contains("ask for sudo password"));
    }

    #[test]
    fn download_failure_includes_reason_and_hint() {
        let text = rendered(vec![Status::DownloadFailed {
            reason: "server returned HTTP 404".to_string(),
        }]);
        assert!(text.contains("Failed to download script: server returned HTTP 404"));
        assert!(text.contains("check your internet connection"));
    }

    #[test]
    fn script_failure_shows_code() {
        let text = rendered(vec![Status::ScriptFailed {
            exit: ScriptExit::Code(3),
        }]);
        assert!(text.contains("Installation failed with error code 3"));
    }

    #[test]
    fn cancellation_message() {
        let text = rendered(vec![Status::Cancelled]);
        assert!(text.starts_with('\n'));
        assert!(text.contains("Installation cancelled by user"));
    }
}
