//! Prepare subcommand - stage, normalize and parse LaTeX source archives

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use papertab_core::{SharedProgress, fmt_num};
use papertab_ingest::{
    CommandNormalizer, CommandParser, ExternalCommand, IngestionPipeline, ParseMode, UnitMode,
};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory of TAR archives, a single TAR archive, or (with --gz) a
    /// directory of gzipped sources
    pub input: PathBuf,

    /// Directory for parse output and done.log
    pub output_dir: PathBuf,

    /// Metadata database handed to the parser
    pub metadata_db: PathBuf,

    /// Parse full text instead of metadata only
    #[arg(long)]
    pub parse_fulltext: bool,

    /// LaTeX toolchain installation used by the full-text parser
    #[arg(long)]
    pub toolchain_dir: Option<PathBuf>,

    /// Treat the input directory as one unit of gzipped sources
    #[arg(long)]
    pub gz: bool,

    /// Substring archive file names must contain
    #[arg(short, long, default_value = papertab_ingest::resolver::DEFAULT_NAME_FILTER)]
    pub filter: String,

    /// Do not ask the collaborators to write log files
    #[arg(long)]
    pub no_logs: bool,

    /// Directory for staging areas (default: system temp dir)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Seconds to wait before retrying a failed I/O operation
    #[arg(long)]
    pub retry_delay: Option<u64>,

    /// Give up on an I/O operation after this many attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Normalize program (overrides config, split on whitespace)
    #[arg(long)]
    pub normalize_cmd: Option<String>,

    /// Parse program (overrides config, split on whitespace)
    #[arg(long)]
    pub parse_cmd: Option<String>,
}

fn command(stage: &str, argv: &[String]) -> Result<ExternalCommand> {
    ExternalCommand::from_argv(argv)
        .with_context(|| format!("No {stage} program configured"))
}

fn override_argv(flag: &Option<String>, configured: &[String]) -> Vec<String> {
    match flag {
        Some(cmd) => cmd.split_whitespace().map(str::to_string).collect(),
        None => configured.to_vec(),
    }
}

pub fn run(args: PrepareArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let parse_mode = if args.parse_fulltext {
        ParseMode::FullText
    } else {
        ParseMode::MetadataOnly
    };
    let mode = if args.gz {
        UnitMode::GzipDirectory
    } else {
        UnitMode::Tar
    };

    let mut retry = config.retry.policy();
    if let Some(secs) = args.retry_delay {
        retry.delay = Duration::from_secs(secs);
    }
    if args.max_attempts.is_some() {
        retry.max_attempts = args.max_attempts;
    }

    let collaborators = &config.collaborators;
    let normalizer = CommandNormalizer::new(command(
        "normalize",
        &override_argv(&args.normalize_cmd, &collaborators.normalize),
    )?);
    let parser = CommandParser::new(
        command(
            "parse",
            &override_argv(&args.parse_cmd, &collaborators.parse),
        )?,
        command(
            "full-text parse",
            &override_argv(&args.parse_cmd, &collaborators.parse_fulltext),
        )?,
    );

    let ingest_config = papertab_ingest::Config {
        input: args.input,
        output_dir: args.output_dir,
        metadata_db: args.metadata_db,
        name_filter: args.filter,
        mode,
        parse_mode,
        toolchain_dir: args.toolchain_dir,
        write_logs: !args.no_logs,
        retry,
        scratch_dir: args.scratch_dir.or_else(|| config.staging.scratch_dir.clone()),
    };

    log::info!("Preparing {} ({mode})", ingest_config.input.display());
    log::info!("  Output: {}", ingest_config.output_dir.display());
    log::info!("  Parse: {parse_mode}");

    let pipeline = IngestionPipeline::new(ingest_config, normalizer, parser);
    let summary = pipeline.run(progress)?;

    println!("{} files", summary.stats.files_seen);
    println!(
        "{} rendered documents discarded",
        summary.stats.rendered_discarded
    );

    print_summary(
        "Prepare",
        &[
            (
                "Units",
                format!(
                    "{}/{} ({} skipped, {} failed)",
                    summary.completed_units,
                    summary.total_units,
                    summary.skipped_units,
                    summary.failed_units
                ),
            ),
            ("Files", fmt_num(summary.stats.files_seen)),
            ("Discarded", fmt_num(summary.stats.rendered_discarded)),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    if summary.failed_units > 0 {
        log::warn!(
            "{} units failed; they will be retried on the next run",
            summary.failed_units
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_replaces_configured_argv() {
        let configured = vec!["normalize_arxiv_dump".to_string()];
        assert_eq!(
            override_argv(&Some("python -m norm".into()), &configured),
            vec!["python", "-m", "norm"]
        );
        assert_eq!(override_argv(&None, &configured), configured);
    }

    #[test]
    fn empty_argv_is_a_config_error() {
        assert!(command("parse", &[]).is_err());
    }
}
