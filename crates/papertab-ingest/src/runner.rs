//! Batch runner: resolve → stage → normalize → parse → checkpoint, per unit

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use papertab_core::ProgressContext;

use crate::checkpoint::CheckpointLog;
use crate::collaborator::{Normalizer, ParseRequest, SourceParser};
use crate::config::Config;
use crate::error::IngestError;
use crate::resolver;
use crate::stager::{ArchiveStager, StageStats};
use crate::state::{UnitState, WorkUnit};

/// Final state of one unit in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub name: String,
    pub state: UnitState,
}

/// Batch execution summary
#[derive(Debug)]
pub struct Summary {
    pub total_units: usize,
    pub completed_units: usize,
    pub skipped_units: usize,
    pub failed_units: usize,
    /// Files seen and rendered documents discarded, over every staged unit
    pub stats: StageStats,
    pub units: Vec<UnitReport>,
    pub elapsed: Duration,
}

/// Sequential ingestion pipeline over one input path.
///
/// A failing unit is logged and left out of the checkpoint log; the batch
/// carries on with the next unit. Only configuration errors abort the run.
pub struct IngestionPipeline<N, P> {
    config: Config,
    stager: ArchiveStager,
    normalizer: N,
    parser: P,
}

impl<N: Normalizer, P: SourceParser> IngestionPipeline<N, P> {
    pub fn new(config: Config, normalizer: N, parser: P) -> Self {
        let stager = ArchiveStager::new(config.retry, config.scratch_dir.clone());
        Self {
            config,
            stager,
            normalizer,
            parser,
        }
    }

    /// Process every pending unit of the configured input.
    pub fn run(&self, progress: &ProgressContext) -> Result<Summary> {
        let start = Instant::now();
        let config = &self.config;

        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                config.output_dir.display()
            )
        })?;
        let units = resolver::resolve(&config.input, &config.name_filter, config.mode)?;
        let mut checkpoint = CheckpointLog::open(&config.output_dir)
            .context("Failed to read checkpoint log")?;

        log::info!(
            "Processing {} units ({} parse)",
            units.len(),
            config.parse_mode
        );

        let total = units.len();
        let mut stats = StageStats::default();
        let mut reports = Vec::with_capacity(total);

        for (idx, unit) in units.iter().enumerate() {
            log::info!("{}/{} ({})", idx + 1, total, unit.name);

            let state = if checkpoint.is_done(&unit.name) {
                log::info!("{}: done in a previous run. skipping", unit.name);
                UnitState::Skipped
            } else {
                let pb = progress.unit_line(&unit.name);
                advance(&pb, unit, UnitState::Pending);
                let result = self.process_unit(unit, &mut checkpoint, &pb, &mut stats);
                pb.finish_and_clear();
                match result {
                    Ok(()) => UnitState::Checkpointed,
                    Err(e) if e.is_skip() => {
                        log::warn!("{}: {e}. skipping", unit.name);
                        UnitState::Skipped
                    }
                    Err(e) => {
                        log::error!("{}: {e}", unit.name);
                        UnitState::Failed
                    }
                }
            };
            debug_assert!(state.is_terminal());
            reports.push(UnitReport {
                name: unit.name.clone(),
                state,
            });
        }

        let count = |s: UnitState| reports.iter().filter(|r| r.state == s).count();
        let summary = Summary {
            total_units: total,
            completed_units: count(UnitState::Checkpointed),
            skipped_units: count(UnitState::Skipped),
            failed_units: count(UnitState::Failed),
            stats,
            units: reports,
            elapsed: start.elapsed(),
        };

        log::info!("=== Ingestion Summary ===");
        log::info!(
            "Units: {}/{} completed ({} skipped, {} failed)",
            summary.completed_units,
            summary.total_units,
            summary.skipped_units,
            summary.failed_units
        );
        log::info!("Time: {:.1}s", summary.elapsed.as_secs_f64());
        Ok(summary)
    }

    /// Drive one unit to `checkpointed`. The staging area is dropped on every exit path.
    fn process_unit(
        &self,
        unit: &WorkUnit,
        checkpoint: &mut CheckpointLog,
        pb: &ProgressBar,
        stats: &mut StageStats,
    ) -> Result<(), IngestError> {
        let config = &self.config;

        let staged = self.stager.stage(unit)?;
        *stats += staged.stats;
        advance(pb, unit, UnitState::Staged);

        let normalized = staged.area.normalized();
        let info = self
            .normalizer
            .normalize(&staged.source_tree, &normalized, config.write_logs)?;
        advance(pb, unit, UnitState::Normalized);

        self.parser.parse(&ParseRequest {
            normalized_tree: &normalized,
            output_dir: &config.output_dir,
            unit_name: &unit.name,
            source_file_info: &info,
            metadata_db: &config.metadata_db,
            mode: config.parse_mode,
            incremental: false,
            write_logs: config.write_logs,
            toolchain_dir: config.toolchain_dir.as_deref(),
        })?;
        advance(pb, unit, UnitState::Parsed);
        drop(staged);

        checkpoint
            .append(&unit.name)
            .map_err(IngestError::Checkpoint)?;
        advance(pb, unit, UnitState::Checkpointed);
        Ok(())
    }
}

fn advance(pb: &ProgressBar, unit: &WorkUnit, state: UnitState) {
    log::debug!("{}: {state}", unit.name);
    pb.set_message(state.to_string());
}
