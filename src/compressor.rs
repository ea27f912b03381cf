use crate::context::{ARCHIVE_EXTENSION, RunContext};
use crate::error::PipelineError;
use crate::pool::{Outcome, Worker};
use crate::sink::Reporter;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// Past this a member needs zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

pub struct Stats {
    pub archive: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
}

/// `<output>/<file stem>.zip`
pub fn archive_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(ARCHIVE_EXTENSION);
    output_dir.join(name)
}

/// Write `input` into its own archive under `output_dir`, as a single member
/// named after the file. An existing archive of the same name is truncated.
///
/// If the source can't be read after the archive was created, the empty
/// archive file is left behind.
pub fn compress_single_file(input: &Path, output_dir: &Path) -> Result<Stats, PipelineError> {
    let archive_path = archive_path_for(input, output_dir);
    let member = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let archive = File::create(&archive_path).map_err(|source| PipelineError::CreateArchive {
        path: archive_path.clone(),
        source,
    })?;
    let mut input_file = File::open(input).map_err(|source| PipelineError::OpenSource {
        path: input.to_path_buf(),
        source,
    })?;
    let meta = input_file.metadata().map_err(|source| PipelineError::Stat {
        path: input.to_path_buf(),
        source,
    })?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(meta.len() >= ZIP64_THRESHOLD);
    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(meta.permissions().mode())
    };

    let mut zip = ZipWriter::new(archive);
    zip.start_file(member.as_str(), options)
        .map_err(|source| PipelineError::AddMember {
            archive: archive_path.clone(),
            member: member.clone(),
            source,
        })?;
    io::copy(&mut input_file, &mut zip).map_err(|source| PipelineError::Compress {
        path: input.to_path_buf(),
        source,
    })?;

    // The central directory is only written here; without it the archive is unreadable.
    let archive = zip.finish().map_err(|source| PipelineError::Finalize {
        path: archive_path.clone(),
        source,
    })?;
    let compressed_size = archive.metadata().map(|m| m.len()).unwrap_or(0);

    Ok(Stats {
        archive: archive_path,
        original_size: meta.len(),
        compressed_size,
    })
}

/// True when `archive` is `file` itself, e.g. `a.zip` seen by a run whose
/// output directory is the directory being compressed.
fn is_own_archive(file: &Path, archive: &Path) -> bool {
    match (fs::canonicalize(file), fs::canonicalize(archive)) {
        (Ok(file), Ok(archive)) => file == archive,
        _ => false,
    }
}

/// Packs every input file into `<output>/<stem>.zip`.
///
/// Archive names only keep the file stem, so two inputs can map to the same
/// archive (`a/x.rom` and `b/x.rom`, or `x.rom` and `x.bin`). The first one
/// claims it; later ones are reported instead of overwriting it.
#[derive(Default)]
pub struct Compressor {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&self, archive: &Path) -> bool {
        // A poisoned lock only means another worker panicked; the set is still usable.
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        claimed.insert(archive.to_path_buf())
    }
}

impl Worker for Compressor {
    fn process(&self, file: &Path, ctx: &RunContext, reporter: &Reporter) -> Outcome {
        let archive = archive_path_for(file, ctx.output());
        if is_own_archive(file, &archive) {
            debug!(file = %file.display(), "Skipping archive written by this run");
            return Outcome::Skipped;
        }
        if !self.claim(&archive) {
            reporter.report(PipelineError::ArchiveCollision {
                path: file.to_path_buf(),
                archive,
            });
            return Outcome::Failed;
        }

        info!(file = %file.display(), "Compressing");
        match compress_single_file(file, ctx.output()) {
            Ok(stats) => {
                debug!(
                    archive = %stats.archive.display(),
                    original = stats.original_size,
                    compressed = stats.compressed_size,
                    "Archive written"
                );
                Outcome::Done
            }
            Err(e) => {
                reporter.report(e);
                Outcome::Failed
            }
        }
    }
}
