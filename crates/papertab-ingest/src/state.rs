//! Work unit and per-unit state types

use std::fmt;
use std::path::PathBuf;

/// How a work unit's sources are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitMode {
    /// A TAR archive (optionally gzip-compressed) to extract
    Tar,
    /// A directory of per-paper gzip sources, used in place
    GzipDirectory,
}

impl UnitMode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::GzipDirectory => "gzip-directory",
        }
    }
}

impl fmt::Display for UnitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One archive (or stand-in directory) to push through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Checkpoint key and parse output name
    pub name: String,
    pub path: PathBuf,
    pub mode: UnitMode,
}

impl WorkUnit {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, mode: UnitMode) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            mode,
        }
    }
}

/// Where a unit currently is in `pending → staged → normalized → parsed → checkpointed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Staged,
    Normalized,
    Parsed,
    Checkpointed,
    Skipped,
    Failed,
}

impl UnitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Checkpointed | Self::Skipped | Self::Failed)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Staged => "staged",
            Self::Normalized => "normalized",
            Self::Parsed => "parsed",
            Self::Checkpointed => "checkpointed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names() {
        assert_eq!(UnitMode::Tar.to_string(), "tar");
        assert_eq!(UnitMode::GzipDirectory.to_string(), "gzip-directory");
    }

    #[test]
    fn terminal_states() {
        assert!(UnitState::Checkpointed.is_terminal());
        assert!(UnitState::Skipped.is_terminal());
        assert!(UnitState::Failed.is_terminal());
        assert!(!UnitState::Staged.is_terminal());
        assert!(!UnitState::Parsed.is_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(UnitState::Normalized.to_string(), "normalized");
        assert_eq!(UnitMode::GzipDirectory.to_string(), "gzip-directory");
    }
}
