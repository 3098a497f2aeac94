use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// Sibling archive path for `dir`: `reports/execution_1_x` -> `reports/execution_1_x.zip`.
pub fn archive_path(dir: &Path) -> PathBuf {
    let mut name = OsString::from(dir.as_os_str());
    name.push(".zip");
    PathBuf::from(name)
}

/// Pack everything under `dir` into a deflated zip next to it.
///
/// Entry names are relative to `dir` and use `/` separators, so the archive
/// unpacks to `results/...` and `html/...`. The directory itself is left in
/// place.
pub fn compress_dir(dir: &Path) -> Result<PathBuf, ArchiveError> {
    let dest = archive_path(dir);
    let file = File::create(&dest).map_err(|e| ArchiveError::Write {
        path: dest.clone(),
        source: e,
    })?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(file);
    let mut files = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
            continue;
        }

        zip.start_file(name, options)?;
        let mut source = File::open(path).map_err(|e| ArchiveError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        io::copy(&mut source, &mut zip).map_err(|e| ArchiveError::Write {
            path: dest.clone(),
            source: e,
        })?;
        files += 1;
    }

    zip.finish()?;
    let size = fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
    debug!(files, bytes = size, "archive written");
    info!(archive = %dest.display(), "report compressed");
    Ok(dest)
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
