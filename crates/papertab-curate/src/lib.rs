//! Table curation for parsed papers
//!
//! Papers come in as JSON Lines with their extracted tables. Every table is
//! parsed and normalized, kept only if it passes the configured predicate
//! chain, and deduplicated by structural identity across the whole input.
//! Survivors are written back as JSON Lines together with a short HTML
//! preview of the first papers.

pub mod config;
pub mod dedup;
pub mod filter;
pub mod markup;
pub mod record;
pub mod report;
pub mod runner;

pub use config::Config;
pub use dedup::{DedupRegistry, DedupStats, TableDeduplicator, TableIdentity, deduplicate};
pub use filter::{
    ContainsMarkerGlyph, DEFAULT_FILTERS, DEFAULT_MARKER_GLYPH, FilterChain, FilterStats, MinRows,
    TableFilter, TablePredicate, UnknownFilter,
};
pub use markup::{Fragment, MarkupError};
pub use record::{Paper, Table, TableMap};
pub use report::{CuratedReportWriter, DEFAULT_LINK_TEMPLATE, DEFAULT_PREVIEW_LIMIT, Report};
pub use runner::{Summary, curate, run};
