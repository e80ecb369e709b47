//! Shared infrastructure utilities for devsetup.
//!
//! - **`staged_file`**: Executable temp files that remove themselves on drop

pub mod staged_file;

pub use staged_file::{FileSyncPolicy, STAGED_MODE, StageOptions, StagedScript};
