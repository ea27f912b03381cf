use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Extension every archive written or read by `rx` carries.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Per-invocation settings, built once and shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct RunContext {
    root: PathBuf,
    output: PathBuf,
    recursive: bool,
    workers: NonZeroUsize,
}

impl RunContext {
    pub fn new(
        root: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        recursive: bool,
        workers: NonZeroUsize,
    ) -> Self {
        Self {
            root: root.into(),
            output: output.into(),
            recursive,
            workers,
        }
    }

    /// Directory the enumerator starts from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory archives (or extracted members) are written into.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }
}

/// True when `path` ends in `.zip` (case-sensitive, like the archives we write).
pub fn has_archive_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION)
}
