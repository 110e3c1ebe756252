//! papertab - table dataset builder for LaTeX source dumps
//!
//! `prepare` turns archives of LaTeX sources into parsed paper records,
//! `curate` filters and deduplicates the tables found in them.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "papertab")]
#[command(about = "Build table datasets from LaTeX source archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./papertab.toml or ~/.config/papertab/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Stage, normalize and parse a batch of source archives
    Prepare(cmd::prepare::PrepareArgs),
    /// Filter and deduplicate extracted tables
    Curate(cmd::curate::CurateArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(papertab_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, the spinners show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    papertab_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Prepare(args) => cmd::prepare::run(args, &config, &progress),
        Command::Curate(args) => cmd::curate::run(args, &config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            let collaborators = &config.collaborators;
            table.add_row(vec!["Normalize", &collaborators.normalize.join(" ")]);
            table.add_row(vec!["Parse", &collaborators.parse.join(" ")]);
            table.add_row(vec![
                "Parse (full text)",
                &collaborators.parse_fulltext.join(" "),
            ]);
            table.add_row(vec![
                "Retry delay",
                &format!("{}s", config.retry.delay_secs),
            ]);
            table.add_row(vec![
                "Max attempts",
                &config
                    .retry
                    .max_attempts
                    .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
            ]);
            table.add_row(vec![
                "Scratch directory",
                &config.staging.scratch_dir.as_ref().map_or_else(
                    || "system temp".to_string(),
                    |p| p.display().to_string(),
                ),
            ]);
            table.add_row(vec![
                "Preview limit",
                &config.curate.preview_limit.to_string(),
            ]);
            table.add_row(vec!["Table filters", &config.curate.filters.join(", ")]);
            table.add_row(vec!["Marker glyph", &config.curate.marker_glyph]);
            table.add_row(vec!["Link template", &config.curate.link_template]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
