//! Ingestion pipeline configuration

use std::path::PathBuf;

use papertab_core::RetryPolicy;

use crate::collaborator::ParseMode;
use crate::resolver::DEFAULT_NAME_FILTER;
use crate::state::UnitMode;

/// Runtime configuration for one batch
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of archives, single archive, or gzip source directory
    pub input: PathBuf,
    /// Parse output and `done.log` go here
    pub output_dir: PathBuf,
    /// Metadata store handed to the parser
    pub metadata_db: PathBuf,
    /// Substring archive file names must contain
    pub name_filter: String,
    pub mode: UnitMode,
    pub parse_mode: ParseMode,
    /// LaTeX toolchain installation for the full-text parser
    pub toolchain_dir: Option<PathBuf>,
    pub write_logs: bool,
    pub retry: RetryPolicy,
    /// Where staging areas are created (system temp dir if `None`)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            metadata_db: PathBuf::from("metadata.db"),
            name_filter: DEFAULT_NAME_FILTER.to_string(),
            mode: UnitMode::Tar,
            parse_mode: ParseMode::MetadataOnly,
            toolchain_dir: None,
            write_logs: true,
            retry: RetryPolicy::default(),
            scratch_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.name_filter, ".tar");
        assert_eq!(config.mode, UnitMode::Tar);
        assert_eq!(config.parse_mode, ParseMode::MetadataOnly);
        assert!(config.retry.max_attempts.is_none());
        assert!(config.toolchain_dir.is_none());
    }
}
