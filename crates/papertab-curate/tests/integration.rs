//! End-to-end curation over JSON Lines files

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use papertab_curate::{Config, Paper, run};
use serde_json::json;
use tempfile::TempDir;

const MARKED: &str = "<table><row><cell>method</cell><cell>✗</cell></row></table>";
const PLAIN: &str = "<table><row><cell>1</cell><cell>2</cell><cell>3</cell></row></table>";

fn paper_line(id: &str, tables: &[(&str, &str)]) -> String {
    let tables: serde_json::Map<String, serde_json::Value> = tables
        .iter()
        .map(|(key, markup)| (key.to_string(), json!({ "table": markup })))
        .collect();
    json!({ "paper_id": id, "title": format!("Paper {id}"), "tables": tables }).to_string()
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_input(&self, name: &str, lines: &[String]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn config(&self, input: PathBuf) -> Config {
        Config {
            input,
            output: self.path("out/curated.jsonl"),
            ..Config::default()
        }
    }
}

fn read_output(path: &Path) -> Vec<Paper> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn ids(papers: &[Paper]) -> Vec<&str> {
    papers.iter().map(|p| p.paper_id.as_str()).collect()
}

#[test]
fn only_marked_tables_survive() {
    let fx = Fixture::new();
    let input = fx.write_input(
        "papers.jsonl",
        &[
            paper_line("A", &[("t1", PLAIN), ("t2", MARKED)]),
            paper_line("B", &[("t1", PLAIN)]),
        ],
    );
    let config = fx.config(input);
    let summary = run(&config).unwrap();

    let out = read_output(&config.output);
    assert_eq!(ids(&out), vec!["A"]);
    assert_eq!(out[0].tables.keys().collect::<Vec<_>>(), vec!["t2"]);
    assert_eq!(out[0].fields["title"], "Paper A");
    let html = out[0].tables.get("t2").unwrap().html_table.as_deref().unwrap();
    assert_eq!(html, "<table><tr><td>method</td><td>✗</td></tr></table>");

    assert_eq!(summary.papers_read, 2);
    assert_eq!(summary.filter.tables_accepted, 1);
    assert_eq!(summary.report.papers_written, 1);
}

#[test]
fn duplicate_table_kept_in_first_paper_only() {
    let fx = Fixture::new();
    let forward = fx.write_input(
        "forward.jsonl",
        &[paper_line("A", &[("t1", MARKED)]), paper_line("B", &[("t9", MARKED)])],
    );
    let config = fx.config(forward);
    let summary = run(&config).unwrap();
    assert_eq!(ids(&read_output(&config.output)), vec!["A"]);
    assert_eq!(summary.dedup.duplicates, 1);
    assert_eq!(summary.dedup.papers_dropped, 1);

    let reversed = fx.write_input(
        "reversed.jsonl",
        &[paper_line("B", &[("t9", MARKED)]), paper_line("A", &[("t1", MARKED)])],
    );
    let config = fx.config(reversed);
    run(&config).unwrap();
    assert_eq!(ids(&read_output(&config.output)), vec!["B"]);
}

#[test]
fn each_run_starts_with_a_fresh_registry() {
    let fx = Fixture::new();
    let input = fx.write_input("papers.jsonl", &[paper_line("A", &[("t1", MARKED)])]);
    let config = fx.config(input);
    run(&config).unwrap();
    let second = run(&config).unwrap();
    assert_eq!(second.report.papers_written, 1);
}

#[test]
fn preview_bounded_dataset_complete() {
    let fx = Fixture::new();
    let lines: Vec<String> = (0..150)
        .map(|i| {
            let markup = format!("<table><row><cell>{i}</cell><cell>✗</cell></row></table>");
            paper_line(&format!("2310.{i:05}"), &[("t1", markup.as_str())])
        })
        .collect();
    let input = fx.write_input("papers.jsonl", &lines);
    let config = Config {
        preview_path: Some(fx.path("preview.html")),
        ..fx.config(input)
    };
    let summary = run(&config).unwrap();

    assert_eq!(read_output(&config.output).len(), 150);
    assert_eq!(summary.report.papers_previewed, 100);

    let preview = fs::read_to_string(fx.path("preview.html")).unwrap();
    assert_eq!(preview, summary.report.preview);
    assert_eq!(preview.matches("<div>").count(), 100);
    assert!(preview.contains("https://arxiv.org/pdf/2310.00099.pdf"));
    assert!(!preview.contains("2310.00100"));
    assert!(preview.starts_with("<body>") && preview.ends_with("</body>"));
}

#[test]
fn gzip_input_is_read() {
    let fx = Fixture::new();
    let path = fx.path("papers.jsonl.gz");
    let mut enc = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
    writeln!(enc, "{}", paper_line("A", &[("t1", MARKED)])).unwrap();
    enc.finish().unwrap();

    let config = fx.config(path);
    let summary = run(&config).unwrap();
    assert_eq!(summary.report.papers_written, 1);
}

#[test]
fn configured_filters_replace_the_default() {
    let fx = Fixture::new();
    let two_rows = "<table><row><cell>a</cell></row><row><cell>b</cell></row></table>";
    let input = fx.write_input(
        "papers.jsonl",
        &[paper_line("A", &[("t1", two_rows)]), paper_line("B", &[("t1", MARKED)])],
    );
    let config = Config {
        filters: vec!["min-rows:2".into()],
        ..fx.config(input)
    };
    run(&config).unwrap();
    assert_eq!(ids(&read_output(&config.output)), vec!["A"]);
}

#[test]
fn missing_input_is_an_error() {
    let fx = Fixture::new();
    let config = fx.config(fx.path("nope.jsonl"));
    let err = run(&config).unwrap_err();
    assert!(format!("{err:#}").contains("nope.jsonl"));
    assert!(!config.output.exists());
}
