//! Curation run configuration

use std::path::PathBuf;

use crate::filter::{DEFAULT_FILTERS, DEFAULT_MARKER_GLYPH};
use crate::report::{DEFAULT_LINK_TEMPLATE, DEFAULT_PREVIEW_LIMIT};

#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed papers, `.jsonl` or `.jsonl.gz`
    pub input: PathBuf,
    /// Curated dataset (JSON Lines)
    pub output: PathBuf,
    /// Optional file the preview document is written to
    pub preview_path: Option<PathBuf>,
    pub preview_limit: usize,
    /// Named table predicates, applied in order
    pub filters: Vec<String>,
    /// Glyph used by a bare `marker` filter
    pub marker_glyph: String,
    /// Preview link, `{id}` is replaced by the paper id
    pub link_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("papers.jsonl"),
            output: PathBuf::from("curated.jsonl"),
            preview_path: None,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            filters: DEFAULT_FILTERS.iter().map(|s| s.to_string()).collect(),
            marker_glyph: DEFAULT_MARKER_GLYPH.to_string(),
            link_template: DEFAULT_LINK_TEMPLATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.preview_limit, 100);
        assert_eq!(config.filters, vec!["marker"]);
        assert_eq!(config.marker_glyph, "✗");
        assert!(config.preview_path.is_none());
    }
}
