//! Turn an input path into the ordered list of work units

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::IngestError;
use crate::state::{UnitMode, WorkUnit};

/// Number of directory entries inspected to decide whether a directory holds archives.
pub const SAMPLE_SIZE: usize = 10;

/// Default substring an archive file name must contain.
pub const DEFAULT_NAME_FILTER: &str = ".tar";

/// Whether a file name carries a TAR extension (plain or gzip-compressed).
pub fn is_tar_name(name: &str) -> bool {
    name.ends_with(".tar") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Entries of `dir` in listing order as (display name, real path).
///
/// The name may be lossy for non-UTF-8 file names; the path never is.
fn list_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, IngestError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    Ok(entries)
}

/// Resolve `input` into work units.
///
/// - TAR mode, directory: every entry whose name contains `name_filter`, in
///   listing order. Fails if none of the first [`SAMPLE_SIZE`] entries looks
///   like a TAR archive.
/// - TAR mode, file: exactly one unit; the extension must be a TAR one.
/// - Gzip-directory mode: the directory itself is the single unit, named
///   `<dirname>.tar`.
pub fn resolve(
    input: &Path,
    name_filter: &str,
    mode: UnitMode,
) -> Result<Vec<WorkUnit>, IngestError> {
    if !input.exists() {
        return Err(IngestError::Config(format!(
            "input directory or file does not exist: {}",
            input.display()
        )));
    }

    match mode {
        UnitMode::Tar if input.is_dir() => resolve_tar_dir(input, name_filter),
        UnitMode::Tar => resolve_tar_file(input),
        UnitMode::GzipDirectory => resolve_gzip_dir(input),
    }
}

fn resolve_tar_dir(dir: &Path, name_filter: &str) -> Result<Vec<WorkUnit>, IngestError> {
    let entries = list_entries(dir)?;
    if !entries.iter().take(SAMPLE_SIZE).any(|(n, _)| is_tar_name(n)) {
        return Err(IngestError::Config(format!(
            "input directory doesn't seem to contain TAR archives: {}",
            dir.display()
        )));
    }

    let units: Vec<WorkUnit> = entries
        .into_iter()
        .filter(|(n, _)| n.contains(name_filter))
        .map(|(n, path)| WorkUnit::new(n, path, UnitMode::Tar))
        .collect();
    log::info!(
        "Found {} archives matching \"{name_filter}\" in {}",
        units.len(),
        dir.display()
    );
    Ok(units)
}

fn resolve_tar_file(file: &Path) -> Result<Vec<WorkUnit>, IngestError> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_tar_name(&name) {
        return Err(IngestError::Config(format!(
            "input file must be a TAR archive: {}",
            file.display()
        )));
    }
    Ok(vec![WorkUnit::new(name, file, UnitMode::Tar)])
}

fn resolve_gzip_dir(dir: &Path) -> Result<Vec<WorkUnit>, IngestError> {
    if !dir.is_dir() {
        return Err(IngestError::Config(format!(
            "gzip mode expects a directory: {}",
            dir.display()
        )));
    }
    let base = dir
        .canonicalize()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IngestError::Config(format!("cannot name unit for {}", dir.display())))?;
    Ok(vec![WorkUnit::new(
        format!("{base}.tar"),
        dir,
        UnitMode::GzipDirectory,
    )])
}
