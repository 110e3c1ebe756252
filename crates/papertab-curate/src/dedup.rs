//! TableDeduplicator: drop later copies of tables already seen in this run

use std::fmt;

use rustc_hash::FxHashSet;

use crate::markup::{self, Element, Fragment, TABLE_TAG};
use crate::record::{Paper, TableMap};

/// Structural identity of a table: blake3 over its canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableIdentity(blake3::Hash);

impl TableIdentity {
    pub fn of(el: &Element) -> Self {
        Self(blake3::hash(markup::canonical_form(el).as_bytes()))
    }

    /// Identity of a rendered table, or `None` if the rendering no longer parses.
    pub fn of_rendering(rendering: &str) -> Option<Self> {
        Fragment::parse(rendering)
            .ok()
            .map(|doc| Self::of(&doc.root_table()))
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex()[..12])
    }
}

/// Identities seen so far in one curation run.
///
/// Registries from independent shards can be merged; the merged registry
/// is what a later pass over further shards should start from.
#[derive(Debug, Default, Clone)]
pub struct DedupRegistry {
    seen: FxHashSet<TableIdentity>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &TableIdentity) -> bool {
        self.seen.contains(id)
    }

    /// Returns false if the identity was already present.
    pub fn insert(&mut self, id: TableIdentity) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn merge(&mut self, other: DedupRegistry) {
        self.seen.extend(other.seen);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupStats {
    pub tables_in: usize,
    pub tables_kept: usize,
    pub duplicates: usize,
    pub unreadable: usize,
    pub papers_dropped: usize,
}

/// First-seen-wins deduplication over papers in stream order.
#[derive(Debug, Default)]
pub struct TableDeduplicator {
    registry: DedupRegistry,
    stats: DedupStats,
}

impl TableDeduplicator {
    pub fn new(registry: DedupRegistry) -> Self {
        Self {
            registry,
            stats: DedupStats::default(),
        }
    }

    pub fn stats(&self) -> DedupStats {
        self.stats
    }

    /// Remove tables whose identity is already registered. Kept tables
    /// register themselves and every nested table. A paper emptied by
    /// this step is dropped.
    pub fn dedup_paper(&mut self, paper: Paper) -> Option<Paper> {
        let Paper {
            paper_id,
            fields,
            tables,
        } = paper;

        let mut kept = TableMap::new();
        for (key, table) in tables {
            self.stats.tables_in += 1;
            let Some(rendering) = table.html_table.as_deref() else {
                self.stats.unreadable += 1;
                continue;
            };
            let doc = match Fragment::parse(rendering) {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("{paper_id}/{key}: {e}");
                    self.stats.unreadable += 1;
                    continue;
                }
            };
            let root = doc.root_table();
            let id = TableIdentity::of(&root);
            if self.registry.contains(&id) {
                log::debug!("{paper_id}/{key}: duplicate table {id}");
                self.stats.duplicates += 1;
                continue;
            }
            self.registry.insert(id);
            for nested in root.find_all(TABLE_TAG) {
                self.registry.insert(TableIdentity::of(nested));
            }
            kept.push(key, table);
            self.stats.tables_kept += 1;
        }

        if kept.is_empty() {
            self.stats.papers_dropped += 1;
            return None;
        }
        Some(Paper {
            paper_id,
            fields,
            tables: kept,
        })
    }

    pub fn into_registry(self) -> DedupRegistry {
        self.registry
    }
}

/// Deduplicate a stream of filtered papers, threading the registry through.
pub fn deduplicate(
    papers: impl IntoIterator<Item = Paper>,
    registry: DedupRegistry,
) -> (Vec<Paper>, DedupRegistry, DedupStats) {
    let mut dedup = TableDeduplicator::new(registry);
    let kept = papers
        .into_iter()
        .filter_map(|p| dedup.dedup_paper(p))
        .collect();
    let stats = dedup.stats();
    (kept, dedup.into_registry(), stats)
}
