//! `.mrpack` packing and unpacking
//!
//! A `.mrpack` is a zip archive holding `modrinth.index.json` at its root and
//! an optional `overrides/` tree.

use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// File extension of distributable packs
pub const PACK_EXTENSION: &str = "mrpack";

/// Extract an archive file into `dest`; returns the number of files written.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    extract_from(file, dest)
}

fn extract_from<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(reader)?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Entries that would land outside `dest` are skipped
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let output_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&output_path)?;
        io::copy(&mut entry, &mut outfile)?;
        written += 1;
    }

    tracing::debug!(dest = %dest.display(), files = written, "extracted archive");
    Ok(written)
}

/// Pack every file under `dir` into a zip archive at `out`.
///
/// Paths inside the archive are relative to `dir` and use `/` separators.
pub fn pack_directory(dir: &Path, out: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Err(Error::FilesystemConflict(format!(
            "cannot pack {}: not a directory",
            dir.display()
        )));
    }
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut zip = ZipWriter::new(File::create(out)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut packed = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, &mut zip)?;
            packed += 1;
        }
    }

    zip.finish()?.flush()?;
    tracing::debug!(out = %out.display(), files = packed, "packed directory");
    Ok(packed)
}
