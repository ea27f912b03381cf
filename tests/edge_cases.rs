use rx::PipelineError;
use rx::compressor::compress_single_file;
use rx::extractor::extract_archive;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn roundtrip(data: &[u8]) -> Vec<u8> {
    let dir = tempdir().unwrap();
    let input = dir.path().join("payload.bin");
    fs::write(&input, data).unwrap();
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();

    let stats = compress_single_file(&input, &out).unwrap();
    let extracted = dir.path().join("extracted");
    let mut errors = Vec::new();
    extract_archive(&stats.archive, &extracted, |e| errors.push(e)).unwrap();
    assert!(errors.is_empty(), "{errors:?}");
    fs::read(extracted.join("payload.bin")).unwrap()
}

fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn test_empty_file() {
    assert!(roundtrip(b"").is_empty());
}

#[test]
fn test_small_file() {
    assert_eq!(roundtrip(b"a"), b"a");
}

#[test]
fn test_non_utf8_file() {
    let data = [0, 159, 146, 150]; // Invalid UTF-8
    assert_eq!(roundtrip(&data), data);
}

#[test]
fn test_missing_source_reports_open_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone.rom");

    let err = compress_single_file(&missing, dir.path()).err().unwrap();
    assert!(matches!(err, PipelineError::OpenSource { .. }), "{err}");
    // The archive was created before the source was opened.
    assert!(dir.path().join("gone.zip").exists());
}

#[test]
fn test_uncreatable_archive_reports_create_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("a.rom");
    fs::write(&input, b"data").unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(out.join("a.zip")).unwrap();

    let err = compress_single_file(&input, &out).err().unwrap();
    assert!(matches!(err, PipelineError::CreateArchive { .. }), "{err}");
}

#[test]
fn test_corrupt_archive_fails_to_open() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("broken.zip");
    fs::write(&archive, b"this is not a zip archive").unwrap();

    let err = extract_archive(&archive, dir.path(), |_| {}).err().unwrap();
    assert!(matches!(err, PipelineError::OpenArchive { .. }), "{err}");
}

#[test]
fn test_traversal_members_are_rejected_others_extracted() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("evil.zip");
    write_zip(
        &archive,
        &[
            ("ok.txt", b"fine"),
            ("../evil.txt", b"nope"),
            ("/abs.txt", b"nope"),
            ("nested/ok2.txt", b"also fine"),
        ],
    );
    let dst = dir.path().join("dst");

    let mut errors = Vec::new();
    let result = extract_archive(&archive, &dst, |e| errors.push(e)).unwrap();

    assert_eq!(result.members, 2);
    assert_eq!(result.failed, 2);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| matches!(e, PipelineError::UnsafeMemberPath { .. })));
    assert_eq!(fs::read(dst.join("ok.txt")).unwrap(), b"fine");
    assert_eq!(fs::read(dst.join("nested/ok2.txt")).unwrap(), b"also fine");
    assert!(!dir.path().join("evil.txt").exists());
}

#[test]
fn test_unwritable_member_does_not_stop_the_rest() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("mixed.zip");
    write_zip(&archive, &[("blocked", b"x"), ("fine.txt", b"y")]);
    let dst = dir.path().join("dst");
    // A directory where the first member's file should go.
    fs::create_dir_all(dst.join("blocked")).unwrap();

    let mut errors = Vec::new();
    let result = extract_archive(&archive, &dst, |e| errors.push(e)).unwrap();

    assert_eq!(result.failed, 1);
    assert_eq!(result.members, 1);
    assert!(matches!(errors[0], PipelineError::CreateFile { .. }));
    assert_eq!(fs::read(dst.join("fine.txt")).unwrap(), b"y");
}

#[test]
fn test_directory_members_are_created() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("tree.zip");
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    zip.add_directory("empty/", SimpleFileOptions::default()).unwrap();
    zip.start_file("full/file.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"content").unwrap();
    zip.finish().unwrap();
    let dst = dir.path().join("dst");

    let result = extract_archive(&archive, &dst, |e| panic!("unexpected error: {e}")).unwrap();

    assert_eq!(result.members, 2);
    assert!(dst.join("empty").is_dir());
    assert_eq!(fs::read(dst.join("full/file.txt")).unwrap(), b"content");
}
