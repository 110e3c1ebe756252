//! Curate subcommand - filter and deduplicate extracted tables

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use papertab_core::fmt_num;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CurateArgs {
    /// Parsed papers (.jsonl or .jsonl.gz)
    pub input: PathBuf,

    /// Curated dataset to write (JSON Lines)
    pub output: PathBuf,

    /// Number of papers shown in the preview
    #[arg(short = 'n', long)]
    pub preview_limit: Option<usize>,

    /// Table filter; repeat to chain (marker, marker:<glyph>, min-rows:<n>)
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,

    /// Write the HTML preview to this file
    #[arg(short, long)]
    pub preview: Option<PathBuf>,
}

pub fn run(args: CurateArgs, config: &Config) -> Result<()> {
    let defaults = &config.curate;
    let filters = if args.filters.is_empty() {
        defaults.filters.clone()
    } else {
        args.filters
    };

    let curate_config = papertab_curate::Config {
        input: args.input,
        output: args.output,
        preview_path: args.preview,
        preview_limit: args.preview_limit.unwrap_or(defaults.preview_limit),
        filters,
        marker_glyph: defaults.marker_glyph.clone(),
        link_template: defaults.link_template.clone(),
    };

    log::info!("Curating {}", curate_config.input.display());
    log::info!("  Output: {}", curate_config.output.display());

    let summary = papertab_curate::run(&curate_config)?;

    print_summary(
        "Curate",
        &[
            ("Papers read", fmt_num(summary.papers_read)),
            (
                "Tables accepted",
                format!(
                    "{}/{} ({} malformed)",
                    fmt_num(summary.filter.tables_accepted),
                    fmt_num(summary.filter.tables_in),
                    summary.filter.tables_malformed
                ),
            ),
            ("Duplicates removed", fmt_num(summary.dedup.duplicates)),
            (
                "Papers written",
                format!(
                    "{} ({} previewed)",
                    fmt_num(summary.report.papers_written),
                    summary.report.papers_previewed
                ),
            ),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );
    Ok(())
}
