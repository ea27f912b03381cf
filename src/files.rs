//! File discovery.
//!
//! Each finder starts a producer thread that streams paths into a rendezvous
//! channel, so workers can start on the first file while the walk is still
//! going. The channel closes when the producer returns.

use crate::error::PipelineError;
use crate::sink::Reporter;
use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};
use walkdir::WalkDir;

/// Signature shared by the two finders.
pub type FindFilesFn = fn(&Path, Reporter) -> anyhow::Result<FileSequence>;

/// Pick the finder for the requested walk mode.
pub fn finder(recursive: bool) -> FindFilesFn {
    if recursive {
        find_recursive
    } else {
        find_files_in_root_directory
    }
}

/// Single-pass stream of file paths. Every path goes to exactly one reader.
pub struct FileSequence {
    rx: Receiver<PathBuf>,
    producer: JoinHandle<usize>,
}

impl FileSequence {
    pub fn receiver(&self) -> &Receiver<PathBuf> {
        &self.rx
    }

    /// Drop the receiving end and wait for the producer.
    ///
    /// Returns how many paths were handed out. If readers stopped early the
    /// producer gives up on its next send.
    pub fn finish(self) -> usize {
        drop(self.rx);
        match self.producer.join() {
            Ok(sent) => sent,
            Err(_) => {
                error!("File finder thread panicked; the file count is unknown");
                0
            }
        }
    }
}

/// Lists the direct children of `root`, skipping directories and dotfiles.
pub fn find_files_in_root_directory(root: &Path, reporter: Reporter) -> anyhow::Result<FileSequence> {
    let root = root.to_path_buf();
    spawn_producer(move |tx| {
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(source) => {
                reporter.report(PipelineError::ReadDir { path: root, source });
                return 0;
            }
        };

        let mut sent = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    reporter.report(PipelineError::ReadDir {
                        path: root.clone(),
                        source,
                    });
                    continue;
                }
            };

            if entry.file_name().as_encoded_bytes().first() == Some(&b'.') {
                continue;
            }

            let path = entry.path();
            let is_file = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => resolves_to_file(&path, &reporter),
                Ok(ft) => ft.is_file(),
                Err(source) => {
                    reporter.report(PipelineError::Stat { path, source });
                    continue;
                }
            };
            if !is_file {
                continue;
            }

            if tx.send(path).is_err() {
                break;
            }
            sent += 1;
        }
        sent
    })
}

/// Walks the whole tree under `root`, reporting unreadable entries and moving on.
pub fn find_recursive(root: &Path, reporter: Reporter) -> anyhow::Result<FileSequence> {
    let root = root.to_path_buf();
    spawn_producer(move |tx| {
        let mut sent = 0;
        for entry in WalkDir::new(&root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    reporter.report(PipelineError::Walk { path, source });
                    continue;
                }
            };

            let ft = entry.file_type();
            let is_file = if ft.is_symlink() {
                resolves_to_file(entry.path(), &reporter)
            } else {
                ft.is_file()
            };
            if !is_file {
                continue;
            }

            if tx.send(entry.into_path()).is_err() {
                break;
            }
            sent += 1;
        }
        sent
    })
}

/// Follows a symlink; dangling links are reported.
fn resolves_to_file(path: &Path, reporter: &Reporter) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file(),
        Err(source) => {
            reporter.report(PipelineError::Stat {
                path: path.to_path_buf(),
                source,
            });
            false
        }
    }
}

fn spawn_producer<F>(walk: F) -> anyhow::Result<FileSequence>
where
    F: FnOnce(&Sender<PathBuf>) -> usize + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(0);
    let producer = thread::Builder::new()
        .name("rx-finder".into())
        .spawn(move || {
            let sent = walk(&tx);
            debug!(files = sent, "File search finished");
            sent
        })
        .context("Failed to start file finder thread")?;

    Ok(FileSequence { rx, producer })
}
