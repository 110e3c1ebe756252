//! Paper records as emitted by the parse step (one JSON object per line)

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One extracted table. Unknown fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Raw table markup from the LaTeX parser (may be empty)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub table: String,
    /// Normalized markup, set once the table passed the filter chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_table: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Table {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            table: markup.into(),
            html_table: None,
            extra: Map::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Table key → table, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableMap(Vec<(String, Table)>);

impl TableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, table: Table) {
        self.0.push((key.into(), table));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Table> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.0.iter().map(|(k, t)| (k.as_str(), t))
    }
}

impl IntoIterator for TableMap {
    type Item = (String, Table);
    type IntoIter = std::vec::IntoIter<(String, Table)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Table)> for TableMap {
    fn from_iter<I: IntoIterator<Item = (String, Table)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for TableMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, table) in &self.0 {
            map.serialize_entry(key, table)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableMapVisitor)
    }
}

struct TableMapVisitor;

impl<'de> Visitor<'de> for TableMapVisitor {
    type Value = TableMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of table key to table")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TableMap, A::Error> {
        let mut tables = TableMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            // A table entry that is not a table object is dropped, not fatal.
            match serde_json::from_value::<Table>(value) {
                Ok(table) => tables.push(key, table),
                Err(e) => log::warn!("table {key}: unreadable entry: {e}"),
            }
        }
        Ok(tables)
    }
}

/// One parsed paper with its extracted tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_empty_tables")]
    pub tables: TableMap,
}

fn null_as_empty_tables<'de, D>(deserializer: D) -> Result<TableMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TableMap>::deserialize(deserializer)?.unwrap_or_default())
}

impl Paper {
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            fields: Map::new(),
            tables: TableMap::new(),
        }
    }

    pub fn with_table(mut self, key: impl Into<String>, table: Table) -> Self {
        self.tables.push(key, table);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_record_keeps_table_order_and_fields() {
        let line = r#"{"paper_id":"2310.00001","title":"T","tables":{"t2":{"table":"<table/>","caption":"c"},"t1":{"table":null}}}"#;
        let paper: Paper = serde_json::from_str(line).unwrap();
        assert_eq!(paper.paper_id, "2310.00001");
        assert_eq!(paper.fields["title"], "T");
        assert_eq!(paper.tables.keys().collect::<Vec<_>>(), vec!["t2", "t1"]);
        assert_eq!(paper.tables.get("t2").unwrap().extra["caption"], "c");
        assert_eq!(paper.tables.get("t1").unwrap().table, "");
    }

    #[test]
    fn missing_or_null_tables_is_empty() {
        let paper: Paper = serde_json::from_str(r#"{"paper_id":"x"}"#).unwrap();
        assert!(paper.tables.is_empty());
        let paper: Paper = serde_json::from_str(r#"{"paper_id":"x","tables":null}"#).unwrap();
        assert!(paper.tables.is_empty());
    }

    #[test]
    fn malformed_table_entry_is_dropped() {
        let line = r#"{"paper_id":"x","tables":{"bad":42,"good":{"table":"<table/>"}}}"#;
        let paper: Paper = serde_json::from_str(line).unwrap();
        assert_eq!(paper.tables.keys().collect::<Vec<_>>(), vec!["good"]);
    }

    #[test]
    fn serialized_record_puts_tables_last() {
        let mut paper = Paper::new("x");
        paper.fields.insert("title".into(), Value::from("T"));
        let mut table = Table::new("<table/>");
        table.html_table = Some("<table></table>".into());
        let paper = paper.with_table("t1", table);

        let json = serde_json::to_string(&paper).unwrap();
        assert_eq!(
            json,
            r#"{"paper_id":"x","title":"T","tables":{"t1":{"table":"<table/>","html_table":"<table></table>"}}}"#
        );
    }

    #[test]
    fn unfiltered_table_has_no_rendering_field() {
        let json = serde_json::to_string(&Table::new("<table/>")).unwrap();
        assert!(!json.contains("html_table"));
    }
}
