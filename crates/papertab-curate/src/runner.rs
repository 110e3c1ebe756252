//! Curation runner: read → filter → dedup → write

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

use crate::config::Config;
use crate::dedup::{self, DedupRegistry, DedupStats};
use crate::filter::{FilterChain, FilterStats, TableFilter};
use crate::record::Paper;
use crate::report::{CuratedReportWriter, Report};

/// Curation run summary
#[derive(Debug)]
pub struct Summary {
    pub papers_read: usize,
    pub filter: FilterStats,
    pub dedup: DedupStats,
    pub report: Report,
    pub elapsed: Duration,
}

/// Open a JSON Lines input, decompressing `.gz` files on the fly.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Read every paper record. Blank lines are skipped; a line that is not a
/// paper record aborts with its line number.
pub fn read_papers(reader: impl BufRead) -> Result<Vec<Paper>> {
    let mut papers = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let paper: Paper = serde_json::from_str(&line)
            .with_context(|| format!("Invalid paper record on line {}", idx + 1))?;
        papers.push(paper);
    }
    Ok(papers)
}

/// Filter, deduplicate and write an in-memory paper set.
pub fn curate<W: Write>(
    papers: Vec<Paper>,
    chain: FilterChain,
    writer: CuratedReportWriter<W>,
) -> io::Result<(FilterStats, DedupStats, Report)> {
    let filter = TableFilter::new(chain);
    let (filtered, filter_stats) = filter.filter_all(papers);
    let (deduped, _, dedup_stats) = dedup::deduplicate(filtered, DedupRegistry::new());

    let mut writer = writer;
    for paper in &deduped {
        writer.write_paper(paper)?;
    }
    let report = writer.finish()?;
    Ok((filter_stats, dedup_stats, report))
}

/// Run one curation pass over `config.input`.
pub fn run(config: &Config) -> Result<Summary> {
    let start = Instant::now();

    let chain = FilterChain::from_names(config.filters.as_slice(), &config.marker_glyph)?;
    log::info!("Table filters: {}", chain.names().join(", "));

    let papers = read_papers(open_input(&config.input)?)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;
    let papers_read = papers.len();
    log::info!("Read {papers_read} papers from {}", config.input.display());

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let out = File::create(&config.output)
        .with_context(|| format!("Failed to create {}", config.output.display()))?;
    let writer = CuratedReportWriter::new(
        BufWriter::new(out),
        config.preview_limit,
        config.link_template.clone(),
    );

    let (filter, dedup, report) = curate(papers, chain, writer)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    if let Some(path) = &config.preview_path {
        std::fs::write(path, &report.preview)
            .with_context(|| format!("Failed to write preview {}", path.display()))?;
        log::info!("Preview written to {}", path.display());
    }

    let summary = Summary {
        papers_read,
        filter,
        dedup,
        report,
        elapsed: start.elapsed(),
    };
    log_summary(&summary);
    Ok(summary)
}

fn log_summary(summary: &Summary) {
    log::info!(
        "Filter: {}/{} tables accepted ({} empty, {} malformed), {}/{} papers kept",
        summary.filter.tables_accepted,
        summary.filter.tables_in,
        summary.filter.tables_empty,
        summary.filter.tables_malformed,
        summary.filter.papers_kept,
        summary.filter.papers_in,
    );
    log::info!(
        "Dedup: {} duplicate tables removed, {} papers emptied",
        summary.dedup.duplicates,
        summary.dedup.papers_dropped,
    );
    log::info!(
        "Wrote {} papers ({} tables), {} previewed ({} bytes) in {:.1}s",
        summary.report.papers_written,
        summary.report.tables_written,
        summary.report.papers_previewed,
        summary.report.preview.len(),
        summary.elapsed.as_secs_f64(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_papers_skips_blank_lines() {
        let input = "{\"paper_id\":\"a\"}\n\n{\"paper_id\":\"b\"}\n";
        let papers = read_papers(input.as_bytes()).unwrap();
        assert_eq!(papers.len(), 2);
    }

    #[test]
    fn read_papers_reports_bad_line() {
        let input = "{\"paper_id\":\"a\"}\nnot json\n";
        let err = read_papers(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn unknown_filter_aborts_run() {
        let config = Config {
            filters: vec!["bogus".into()],
            ..Config::default()
        };
        assert!(run(&config).is_err());
    }
}
