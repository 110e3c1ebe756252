//! Error taxonomy for the ingestion pipeline

use std::path::PathBuf;

use papertab_core::Transient;

/// Failure while resolving, staging or processing a work unit.
///
/// Only [`IngestError::Io`] is transient: it is what the retry policy
/// waits out. Every other variant is final for the unit (or, for
/// `Config`, for the whole batch).
#[derive(Debug)]
pub enum IngestError {
    /// Bad input path or extension; aborts before any unit runs
    Config(String),
    /// Storage hiccup, recovered by retrying
    Io(std::io::Error),
    /// Input is not a readable archive of the expected type; unit is skipped
    InvalidArchive { path: PathBuf, reason: String },
    /// Archive passed the probe but its content could not be unpacked
    Extract { path: PathBuf, source: std::io::Error },
    /// External normalize or parse step failed
    Collaborator { stage: &'static str, message: String },
    /// The completed unit could not be recorded
    Checkpoint(std::io::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::InvalidArchive { path, reason } => {
                write!(f, "\"{}\" {reason}", path.display())
            }
            Self::Extract { path, source } => {
                write!(f, "failed to extract {}: {source}", path.display())
            }
            Self::Collaborator { stage, message } => write!(f, "{stage} failed: {message}"),
            Self::Checkpoint(e) => write!(f, "failed to write checkpoint: {e}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::Checkpoint(e) => Some(e),
            Self::Extract { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Transient for IngestError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl IngestError {
    pub fn invalid_archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidArchive {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn collaborator(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            stage,
            message: message.into(),
        }
    }

    /// Whether the unit should be skipped rather than counted as failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::InvalidArchive { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn only_io_is_transient() {
        assert!(IngestError::Io(std::io::Error::new(ErrorKind::TimedOut, "mount")).is_transient());
        assert!(!IngestError::Config("x".into()).is_transient());
        assert!(!IngestError::invalid_archive("a.tar", "is not a TAR archive").is_transient());
        assert!(!IngestError::collaborator("parse", "boom").is_transient());
        assert!(!IngestError::Checkpoint(std::io::Error::other("disk")).is_transient());
    }

    #[test]
    fn invalid_archive_is_a_skip() {
        assert!(IngestError::invalid_archive("a.tar", "nope").is_skip());
        assert!(!IngestError::collaborator("normalize", "nope").is_skip());
    }

    #[test]
    fn display_names_the_stage() {
        let err = IngestError::collaborator("normalize", "exit status 1");
        assert_eq!(err.to_string(), "normalize failed: exit status 1");
    }

    #[test]
    fn display_invalid_archive() {
        let err = IngestError::invalid_archive("in/x.tar", "is not a TAR archive");
        assert_eq!(err.to_string(), "\"in/x.tar\" is not a TAR archive");
    }
}
