//! Append-only log of completed work units (`done.log`)
//!
//! One unit name per line, UTF-8. A name is written only after the unit's
//! whole pipeline succeeded, so a crash in between means the unit is simply
//! processed again on the next run.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

/// File name of the checkpoint log inside the output directory.
pub const CHECKPOINT_FILE: &str = "done.log";

/// Completed-unit log with an in-memory index for skip decisions.
#[derive(Debug)]
pub struct CheckpointLog {
    path: PathBuf,
    done: FxHashSet<String>,
}

impl CheckpointLog {
    /// Open the log in `output_dir`, loading previously completed names.
    pub fn open(output_dir: &Path) -> io::Result<Self> {
        let path = output_dir.join(CHECKPOINT_FILE);
        let done = load(&path)?;
        if !done.is_empty() {
            log::info!("{} units done in previous runs", done.len());
        }
        Ok(Self { path, done })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_done(&self, name: &str) -> bool {
        self.done.contains(name)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Durably record `name` as completed. Recording a name twice is a no-op.
    pub fn append(&mut self, name: &str) -> io::Result<()> {
        if self.done.contains(name) {
            log::debug!("{name}: already checkpointed");
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{name}")?;
        file.sync_data()?;
        self.done.insert(name.to_string());
        Ok(())
    }
}

/// Read the set of completed names; a missing log is an empty set.
pub fn load(path: &Path) -> io::Result<FxHashSet<String>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FxHashSet::default()),
        Err(e) => return Err(e),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Names in the order they were recorded (duplicates included).
pub fn entries(path: &Path) -> io::Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = CheckpointLog::open(dir.path()).unwrap();
        assert!(log.is_empty());
        assert!(!log.path().exists());
    }

    #[test]
    fn append_then_reopen() {
        let dir = TempDir::new().unwrap();
        let mut log = CheckpointLog::open(dir.path()).unwrap();
        log.append("a.tar").unwrap();
        log.append("b.tar").unwrap();
        assert!(log.is_done("a.tar"));

        let reopened = CheckpointLog::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.is_done("b.tar"));
        assert!(!reopened.is_done("c.tar"));
    }

    #[test]
    fn append_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut log = CheckpointLog::open(dir.path()).unwrap();
        log.append("a.tar").unwrap();
        log.append("a.tar").unwrap();
        assert_eq!(entries(log.path()).unwrap(), vec!["a.tar"]);
    }

    #[test]
    fn load_trims_and_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        fs::write(&path, "a.tar\n\n  b.tar \r\n").unwrap();
        let done = load(&path).unwrap();
        assert_eq!(done.len(), 2);
        assert!(done.contains("b.tar"));
    }
}
