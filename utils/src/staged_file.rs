//! Staged script files.
//!
//! Fetched bytes go into a uniquely named temp file that is marked executable
//! and deleted when the [`StagedScript`] is dropped or explicitly removed.
//! A failure partway through staging leaves nothing behind.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, TempPath};
use tracing::debug;

pub const STAGED_PREFIX: &str = "devsetup-";
pub const STAGED_SUFFIX: &str = ".sh";

/// Owner rwx, group/other rx.
pub const STAGED_MODE: u32 = 0o755;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncPolicy {
    SyncAll,
    SkipSync,
}

#[derive(Debug, Clone, Copy)]
pub struct StageOptions {
    /// File sync policy before the handle is closed.
    pub file_sync: FileSyncPolicy,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            file_sync: FileSyncPolicy::SyncAll,
        }
    }
}

/// An executable temp file holding a fetched script.
///
/// The write handle is closed once staging finishes, so the file can be
/// handed to an interpreter while this value keeps ownership of the path.
#[derive(Debug)]
pub struct StagedScript {
    path: TempPath,
}

impl StagedScript {
    /// Write `bytes` verbatim into a new file inside `dir`.
    pub fn stage_in(dir: &Path, bytes: &[u8], options: StageOptions) -> io::Result<Self> {
        let mut tmp = Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(STAGED_SUFFIX)
            .tempfile_in(dir)?;

        tmp.write_all(bytes)?;
        tmp.flush()?;
        if matches!(options.file_sync, FileSyncPolicy::SyncAll) {
            tmp.as_file().sync_all()?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(STAGED_MODE))?;
        }

        let path = tmp.into_temp_path();
        debug!(path = %path.display(), bytes = bytes.len(), "Staged script");
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. Failures are logged and swallowed.
    pub fn remove(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!(path = %shown, "Removed staged script"),
            Err(e) => debug!(path = %shown, "Failed to remove staged script (best-effort): {e}"),
        }
    }
}
