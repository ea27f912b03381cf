//! Errors reported while a run is in flight.
//!
//! None of these stop the pipeline: they are sent to the error sink, logged,
//! and the producer that hit them moves on to its next input.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use zip::result::ZipError;

/// A single failed operation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error walking {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Error reading directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading metadata of {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error creating archive {path}: {source}")]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not compressing {path}: {archive} was already written from another file in this run")]
    ArchiveCollision { path: PathBuf, archive: PathBuf },

    #[error("Error opening file {path}: {source}")]
    OpenSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error creating member {member} in {archive}: {source}")]
    AddMember {
        archive: PathBuf,
        member: String,
        #[source]
        source: ZipError,
    },

    #[error("Error compressing {path}: {source}")]
    Compress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error finalizing archive {path}: {source}")]
    Finalize {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("Error opening zip archive {path}: {source}")]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("Error reading member #{index} of {archive}: {source}")]
    ReadMember {
        archive: PathBuf,
        index: usize,
        #[source]
        source: ZipError,
    },

    #[error("Refusing to extract {member} from {archive}: path escapes the output directory")]
    UnsafeMemberPath { archive: PathBuf, member: String },

    #[error("Error creating directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error creating file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error inflating {member} into {path}: {source}")]
    Inflate {
        member: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error setting permissions on {path}: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Who hit the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Enumerator,
    /// Worker number, starting at 1.
    Worker(usize),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Enumerator => write!(f, "finder"),
            Origin::Worker(id) => write!(f, "worker {id:03}"),
        }
    }
}

/// What travels over the error channel.
#[derive(Debug)]
pub struct ErrorEvent {
    pub origin: Origin,
    pub error: PipelineError,
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.origin, self.error)
    }
}

impl std::error::Error for ErrorEvent {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
