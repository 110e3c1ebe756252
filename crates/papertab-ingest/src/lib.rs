//! Papertab Ingest - resumable ingestion of LaTeX source archives
//!
//! Resolves a directory of TAR bundles (or a single bundle, or a gzip
//! source directory) into work units, stages each one into a scratch tree,
//! hands it to the external normalize and parse tools, and records the
//! unit in `done.log` once everything succeeded.
//!
//! # Example
//!
//! ```ignore
//! use papertab_ingest::{Config, IngestionPipeline};
//!
//! let pipeline = IngestionPipeline::new(config, normalizer, parser);
//! let summary = pipeline.run(&papertab_core::ProgressContext::new())?;
//! println!("{} files", summary.stats.files_seen);
//! ```

pub mod checkpoint;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod resolver;
pub mod runner;
pub mod stager;
pub mod state;

// Re-exports
pub use checkpoint::{CHECKPOINT_FILE, CheckpointLog};
pub use collaborator::{
    CommandNormalizer, CommandParser, ExternalCommand, Normalizer, ParseMode, ParseRequest,
    SourceFileInfo, SourceParser,
};
pub use config::Config;
pub use error::IngestError;
pub use runner::{IngestionPipeline, Summary, UnitReport};
pub use stager::{ArchiveStager, StageStats, StagedUnit, StagingArea};
pub use state::{UnitMode, UnitState, WorkUnit};
