use crate::context::{RunContext, has_archive_extension};
use crate::error::PipelineError;
use crate::pool::{Outcome, Worker};
use crate::sink::Reporter;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};
use zip::ZipArchive;
use zip::result::ZipError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Extracted {
    pub members: usize,
    pub failed: usize,
}

/// Unpack every member of `archive_path` under `output_dir`.
///
/// Members are handled independently: a member that can't be read or written
/// is passed to `on_error` and the rest are still extracted. Only failing to
/// open the archive itself is returned as an error. Member names that would
/// land outside `output_dir` (absolute, or climbing out with `..`) are
/// rejected.
pub fn extract_archive<F>(
    archive_path: &Path,
    output_dir: &Path,
    mut on_error: F,
) -> Result<Extracted, PipelineError>
where
    F: FnMut(PipelineError),
{
    let open_err = |source: ZipError| PipelineError::OpenArchive {
        path: archive_path.to_path_buf(),
        source,
    };
    let file = File::open(archive_path).map_err(|e| open_err(e.into()))?;
    let mut archive = ZipArchive::new(file).map_err(open_err)?;

    let mut result = Extracted::default();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(source) => {
                on_error(PipelineError::ReadMember {
                    archive: archive_path.to_path_buf(),
                    index,
                    source,
                });
                result.failed += 1;
                continue;
            }
        };

        let name = entry.name().to_owned();
        let Some(relative) = entry.enclosed_name() else {
            on_error(PipelineError::UnsafeMemberPath {
                archive: archive_path.to_path_buf(),
                member: name,
            });
            result.failed += 1;
            continue;
        };
        let dest = output_dir.join(relative);
        debug!(member = %name, dest = %dest.display(), "Extracting member");

        let written = if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(|source| PipelineError::CreateDir { path: dest, source })
        } else {
            let mode = entry.unix_mode();
            extract_member(&mut entry, &name, &dest, mode)
        };

        match written {
            Ok(()) => result.members += 1,
            Err(e) => {
                on_error(e);
                result.failed += 1;
            }
        }
    }

    Ok(result)
}

fn extract_member(
    entry: &mut impl Read,
    name: &str,
    dest: &Path,
    mode: Option<u32>,
) -> Result<(), PipelineError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| PipelineError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut open = OpenOptions::new();
    open.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            open.mode(mode & 0o7777);
        }
    }
    // A read-only file from an earlier extraction can't be truncated in place.
    let opened = match open.open(dest) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied && dest.is_file() => {
            make_writable(dest).and_then(|()| open.open(dest))
        }
        other => other,
    };
    let mut out = opened.map_err(|source| PipelineError::CreateFile {
        path: dest.to_path_buf(),
        source,
    })?;

    io::copy(entry, &mut out).map_err(|source| PipelineError::Inflate {
        member: name.to_owned(),
        path: dest.to_path_buf(),
        source,
    })?;

    // The creation mode is filtered by the umask, and ignored when the file
    // already existed.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            fs::set_permissions(dest, fs::Permissions::from_mode(mode & 0o7777)).map_err(|source| {
                PipelineError::Permissions {
                    path: dest.to_path_buf(),
                    source,
                }
            })?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

fn make_writable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() | 0o200);
    }
    #[cfg(not(unix))]
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
}

/// Unpacks every `.zip` input under the output directory.
pub struct Extractor;

impl Worker for Extractor {
    fn process(&self, file: &Path, ctx: &RunContext, reporter: &Reporter) -> Outcome {
        if !has_archive_extension(file) {
            return Outcome::Skipped;
        }

        info!(file = %file.display(), "Extracting");
        match extract_archive(file, ctx.output(), |e| reporter.report(e)) {
            Ok(Extracted { failed: 0, members }) => {
                debug!(members, "Archive extracted");
                Outcome::Done
            }
            Ok(_) => Outcome::Failed,
            Err(e) => {
                reporter.report(e);
                Outcome::Failed
            }
        }
    }
}
