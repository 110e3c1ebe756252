//! TableFilter: parse, normalize and test every table of a paper

use std::fmt;

use crate::markup::Fragment;
use crate::record::{Paper, TableMap};

/// Default exclusion marker looked for by the `marker` predicate
pub const DEFAULT_MARKER_GLYPH: &str = "✗";

/// Filter set used when none is configured
pub const DEFAULT_FILTERS: &[&str] = &["marker"];

/// A boolean test over a normalized table document.
pub trait TablePredicate {
    fn name(&self) -> String;
    fn accepts(&self, table: &Fragment) -> bool;
}

/// Accepts tables whose flattened text contains the glyph.
#[derive(Debug, Clone)]
pub struct ContainsMarkerGlyph {
    glyph: String,
}

impl ContainsMarkerGlyph {
    pub fn new(glyph: impl Into<String>) -> Self {
        Self {
            glyph: glyph.into(),
        }
    }
}

impl Default for ContainsMarkerGlyph {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_GLYPH)
    }
}

impl TablePredicate for ContainsMarkerGlyph {
    fn name(&self) -> String {
        format!("marker:{}", self.glyph)
    }

    fn accepts(&self, table: &Fragment) -> bool {
        table.text().contains(&self.glyph)
    }
}

/// Accepts tables with at least `min` `tr` rows (after normalization).
#[derive(Debug, Clone, Copy)]
pub struct MinRows {
    min: usize,
}

impl MinRows {
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl TablePredicate for MinRows {
    fn name(&self) -> String {
        format!("min-rows:{}", self.min)
    }

    fn accepts(&self, table: &Fragment) -> bool {
        table.find_all("tr").len() >= self.min
    }
}

/// Unknown or malformed filter name in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFilter(pub String);

impl fmt::Display for UnknownFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown table filter '{}' (expected marker, marker:<glyph> or min-rows:<n>)",
            self.0
        )
    }
}

impl std::error::Error for UnknownFilter {}

/// Build a predicate from its configured name.
///
/// `marker` uses `default_glyph`; `marker:<glyph>` and `min-rows:<n>` carry
/// their own argument.
pub fn predicate_from_name(
    name: &str,
    default_glyph: &str,
) -> Result<Box<dyn TablePredicate>, UnknownFilter> {
    let unknown = || UnknownFilter(name.to_string());
    match name.split_once(':') {
        None if name == "marker" => Ok(Box::new(ContainsMarkerGlyph::new(default_glyph))),
        Some(("marker", glyph)) if !glyph.is_empty() => Ok(Box::new(ContainsMarkerGlyph::new(glyph))),
        Some(("min-rows", n)) => {
            let min = n.trim().parse().map_err(|_| unknown())?;
            Ok(Box::new(MinRows::new(min)))
        }
        _ => Err(unknown()),
    }
}

/// Ordered predicate chain; a table passes only if every predicate accepts.
#[derive(Default)]
pub struct FilterChain {
    predicates: Vec<Box<dyn TablePredicate>>,
}

impl FilterChain {
    pub fn new(predicates: Vec<Box<dyn TablePredicate>>) -> Self {
        Self { predicates }
    }

    pub fn from_names<S: AsRef<str>>(
        names: &[S],
        default_glyph: &str,
    ) -> Result<Self, UnknownFilter> {
        let predicates = names
            .iter()
            .map(|n| predicate_from_name(n.as_ref(), default_glyph))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { predicates })
    }

    /// The default chain: the marker predicate alone.
    pub fn marker() -> Self {
        Self::new(vec![Box::new(ContainsMarkerGlyph::default())])
    }

    pub fn names(&self) -> Vec<String> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    pub fn accepts(&self, table: &Fragment) -> bool {
        self.predicates.iter().all(|p| p.accepts(table))
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub papers_in: usize,
    pub papers_kept: usize,
    pub tables_in: usize,
    pub tables_accepted: usize,
    pub tables_empty: usize,
    pub tables_malformed: usize,
}

pub struct TableFilter {
    chain: FilterChain,
}

impl TableFilter {
    pub fn new(chain: FilterChain) -> Self {
        Self { chain }
    }

    /// Filter one paper. Accepted tables gain `html_table`; a paper left
    /// without tables is dropped.
    pub fn filter_paper(&self, paper: Paper, stats: &mut FilterStats) -> Option<Paper> {
        stats.papers_in += 1;
        let Paper {
            paper_id,
            fields,
            tables,
        } = paper;

        let mut kept = TableMap::new();
        for (key, mut table) in tables {
            stats.tables_in += 1;
            if table.table.trim().is_empty() {
                stats.tables_empty += 1;
                continue;
            }
            let doc = match Fragment::parse(&table.table) {
                Ok(doc) => doc.normalized(),
                Err(e) => {
                    log::warn!("{paper_id}/{key}: {e}");
                    stats.tables_malformed += 1;
                    continue;
                }
            };
            if self.chain.accepts(&doc) {
                table.html_table = Some(doc.render());
                kept.push(key, table);
                stats.tables_accepted += 1;
            }
        }

        if kept.is_empty() {
            return None;
        }
        stats.papers_kept += 1;
        Some(Paper {
            paper_id,
            fields,
            tables: kept,
        })
    }

    pub fn filter_all(&self, papers: impl IntoIterator<Item = Paper>) -> (Vec<Paper>, FilterStats) {
        let mut stats = FilterStats::default();
        let kept = papers
            .into_iter()
            .filter_map(|p| self.filter_paper(p, &mut stats))
            .collect();
        (kept, stats)
    }
}

impl Default for TableFilter {
    fn default() -> Self {
        Self::new(FilterChain::marker())
    }
}
