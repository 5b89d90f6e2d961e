//! Archive codec: extraction of possibly AES-encrypted ZIP archives and
//! repackaging of a directory tree into a new compressed archive.
//! Extraction tries the decryption-capable reader first and falls back to
//! the plain reader; only when both fail is the archive reported corrupt.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug)]
pub enum ArchiveError {
    Io(io::Error),
    Zip(ZipError),
    /// Both the decryption-aware and the plain reader failed.
    Corrupt(String),
    /// Entry name escapes the destination directory.
    UnsafeEntry(String),
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::Io(e) => write!(f, "archive IO error: {e}"),
            ArchiveError::Zip(e) => write!(f, "archive read error: {e}"),
            ArchiveError::Corrupt(reason) => write!(f, "archive corrupt: {reason}"),
            ArchiveError::UnsafeEntry(name) => write!(f, "unsafe archive entry: {name}"),
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        ArchiveError::Io(e)
    }
}

impl From<ZipError> for ArchiveError {
    fn from(e: ZipError) -> Self {
        ArchiveError::Zip(e)
    }
}

/// Extract `archive_path` into `dest_dir`, creating it if absent.
/// First attempt assumes password-less AES-capable encryption support;
/// any failure triggers a retry with the plain reader. Partial output may
/// remain on failure; the caller treats failure as fatal for the job.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(dest_dir)?;
    match extract_entries(archive_path, dest_dir, true) {
        Ok(()) => Ok(()),
        Err(first) => {
            debug!(error = %first, "decryption-aware extraction failed, retrying plain");
            extract_entries(archive_path, dest_dir, false).map_err(|second| {
                ArchiveError::Corrupt(format!("{first}; plain retry: {second}"))
            })
        }
    }
}

fn extract_entries(
    archive_path: &Path,
    dest_dir: &Path,
    with_decryption: bool,
) -> Result<(), ArchiveError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = open_entry(&mut archive, index, with_decryption)?;
        let rel: PathBuf = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
        let destination = dest_dir.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&destination)?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&destination)?;
        io::copy(&mut entry, &mut output)?;
    }
    Ok(())
}

fn open_entry<'a>(
    archive: &'a mut ZipArchive<File>,
    index: usize,
    with_decryption: bool,
) -> Result<zip::read::ZipFile<'a>, ArchiveError> {
    if with_decryption {
        // Probe with the plain reader; entries it cannot open (encrypted)
        // are retried with an empty password before giving up.
        let plain_ok = archive.by_index(index).is_ok();
        if !plain_ok {
            return match archive.by_index_decrypt(index, b"")? {
                Ok(entry) => Ok(entry),
                Err(_) => Err(ArchiveError::Zip(ZipError::UnsupportedArchive(
                    "encrypted entry rejected empty password",
                ))),
            };
        }
    }
    Ok(archive.by_index(index)?)
}

/// Walk `source_dir` recursively in sorted order and write every file into
/// a new deflate-compressed archive at `out_archive`, entry names being the
/// relative paths from `source_dir`.
pub fn repackage(source_dir: &Path, out_archive: &Path) -> Result<(), ArchiveError> {
    let file = File::create(out_archive)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    // Sorted walk keeps entry order stable for reproducible archives.
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| ArchiveError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
        let name = rel.to_string_lossy().replace('\\', "/");
        writer.start_file(name, options)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut writer)?;
    }
    writer.finish()?;
    Ok(())
}

/// Sorted member names (files only) of an archive, read with the plain
/// reader. Used to compare member sets in tests and logs.
pub fn member_names(archive_path: &Path) -> Result<Vec<String>, ArchiveError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip_archive(archive: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(archive).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default();
        for (path, contents) in entries {
            zip.start_file(*path, options).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extract_repackage_round_trip_preserves_members() {
        let temp = tempfile::tempdir().unwrap();
        let archive_path = temp.path().join("input.zip");
        write_zip_archive(
            &archive_path,
            &[
                ("subs/a.srt", b"1\n00:00:01,000 --> 00:00:02,000\nhi\n"),
                ("subs/b.str", b"greeting=Hello\n"),
                ("notes.txt", b"untouched"),
            ],
        );

        let extracted = temp.path().join("extracted");
        extract(&archive_path, &extracted).unwrap();
        assert!(extracted.join("subs/a.srt").is_file());
        assert_eq!(fs::read(extracted.join("notes.txt")).unwrap(), b"untouched");

        let repacked = temp.path().join("output.zip");
        repackage(&extracted, &repacked).unwrap();

        assert_eq!(
            member_names(&repacked).unwrap(),
            member_names(&archive_path).unwrap()
        );

        let round = temp.path().join("round");
        extract(&repacked, &round).unwrap();
        assert_eq!(
            fs::read(round.join("subs/a.srt")).unwrap(),
            fs::read(extracted.join("subs/a.srt")).unwrap()
        );
        assert_eq!(fs::read(round.join("notes.txt")).unwrap(), b"untouched");
    }

    #[test]
    fn garbage_input_reports_corrupt() {
        let temp = tempfile::tempdir().unwrap();
        let archive_path = temp.path().join("broken.zip");
        fs::write(&archive_path, b"this is not a zip archive").unwrap();

        let err = extract(&archive_path, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt(_)), "{err}");
    }

    #[test]
    fn extract_creates_missing_destination() {
        let temp = tempfile::tempdir().unwrap();
        let archive_path = temp.path().join("input.zip");
        write_zip_archive(&archive_path, &[("only.srt", b"x")]);

        let dest = temp.path().join("deep/nested/dest");
        extract(&archive_path, &dest).unwrap();
        assert!(dest.join("only.srt").is_file());
    }

    #[test]
    fn repackage_walks_in_sorted_order() {
        let temp = tempfile::tempdir().unwrap();
        let tree = temp.path().join("tree");
        fs::create_dir_all(tree.join("b")).unwrap();
        fs::write(tree.join("b/z.srt"), "z").unwrap();
        fs::write(tree.join("a.srt"), "a").unwrap();

        let out = temp.path().join("out.zip");
        repackage(&tree, &out).unwrap();
        assert_eq!(member_names(&out).unwrap(), vec!["a.srt", "b/z.srt"]);
    }
}
