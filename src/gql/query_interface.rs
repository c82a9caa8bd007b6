use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::{macros::format_description, OffsetDateTime};

use crate::graph_utils::graph::EntityId;

pub const NODE_LOOKUP: &str = "MATCH (c) WHERE id(c) = $id RETURN c LIMIT 1";
pub const EDGE_LOOKUP: &str = "MATCH (c)-[r]-(d) WHERE id(r) = $id RETURN r LIMIT 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Relationship,
}

/// One node or relationship as returned by the store.
///
/// For relationships `labels` holds the single relationship type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: EntityKind,
    pub id: EntityId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
    // (start, end) node ids; relationships only
    #[serde(default)]
    pub endpoints: Option<(EntityId, EntityId)>,
}

impl Record {
    /// Short Cypher-ish form, `(3:Person)` or `-[7:KNOWS]-`.
    pub fn summary(&self) -> String {
        match self.kind {
            EntityKind::Node => format!("({}:{})", self.id, self.labels.join(":")),
            EntityKind::Relationship => format!("-[{}:{}]-", self.id, self.labels.join("|")),
        }
    }

    /// Key/value rows for the property panel, identity first.
    pub fn display_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![("<id>".to_string(), self.id.to_string())];
        let label_key = match self.kind {
            EntityKind::Node => "<labels>",
            EntityKind::Relationship => "<type>",
        };
        rows.push((label_key.to_string(), self.labels.join(", ")));
        for (k, v) in &self.properties {
            rows.push((k.clone(), value_text(v)));
        }
        rows
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One returned column value: a graph entity or anything else (`count(n)`, `n.name`).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Entity(Record),
    Scalar(Value),
}

impl Cell {
    pub fn text(&self) -> String {
        match self {
            Cell::Entity(r) => r.summary(),
            Cell::Scalar(v) => value_text(v),
        }
    }
}

/// One result row as (column, value) pairs in RETURN order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    pub cells: Vec<(String, Cell)>,
}

impl ResultRow {
    pub fn single(column: &str, cell: Cell) -> Self {
        Self { cells: vec![(column.to_string(), cell)] }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Record> {
        self.cells.iter().filter_map(|(_, c)| match c {
            Cell::Entity(r) => Some(r),
            Cell::Scalar(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub cypher: String,
    pub params: BTreeMap<String, Value>,
    // Set for id lookups so stores without a Cypher engine can answer them
    pub lookup_kind: Option<EntityKind>,
}

impl QueryRequest {
    pub fn cypher(text: impl Into<String>) -> Self {
        Self { cypher: text.into(), params: BTreeMap::new(), lookup_kind: None }
    }

    /// Single-row lookup of a node or relationship by internal id.
    pub fn lookup(kind: EntityKind, id: EntityId) -> Self {
        let cypher = match kind {
            EntityKind::Node => NODE_LOOKUP,
            EntityKind::Relationship => EDGE_LOOKUP,
        };
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), Value::from(id));
        Self { cypher: cypher.to_string(), params, lookup_kind: Some(kind) }
    }
}

/// Anything that can run Cypher and hand back nodes/relationships.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn run(&self, request: &QueryRequest) -> Result<Vec<ResultRow>>;
}

/// Names of the columns a statement returns, taken from its last RETURN clause.
///
/// `RETURN a, b.name AS name ORDER BY name LIMIT 5` yields `["a", "name"]`.
pub fn return_columns(cypher: &str) -> Vec<String> {
    // Editor text spans lines; keywords are matched on single spaces
    let collapsed = cypher.split_whitespace().collect::<Vec<_>>().join(" ");
    let upper = collapsed.to_ascii_uppercase();
    let Some(idx) = upper.rfind("RETURN ") else { return Vec::new() };
    let mut tail = &collapsed[idx + 7..];
    let tail_upper = &upper[idx + 7..];
    for stop in [" ORDER BY ", " SKIP ", " LIMIT ", ";"] {
        if let Some(end) = tail_upper.find(stop) {
            if end < tail.len() {
                tail = &tail[..end];
            }
        }
    }
    let tail = tail.trim();
    let tail = tail.strip_prefix("DISTINCT ").or_else(|| tail.strip_prefix("distinct ")).unwrap_or(tail);
    tail.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| {
            let up = c.to_ascii_uppercase();
            match up.rfind(" AS ") {
                Some(i) => c[i + 4..].trim().to_string(),
                None => c.to_string(),
            }
        })
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct QueryOutcome {
    pub rows: Vec<ResultRow>,
    // Distinct entities across all rows, first appearance first
    pub records: Vec<Record>,
    pub node_count: usize,
    pub relationship_count: usize,
}

impl QueryOutcome {
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        let mut records: Vec<Record> = Vec::new();
        for r in rows.iter().flat_map(|row| row.entities()) {
            if !records.iter().any(|seen| seen.kind == r.kind && seen.id == r.id) {
                records.push(r.clone());
            }
        }
        let node_count = records.iter().filter(|r| r.kind == EntityKind::Node).count();
        let relationship_count = records.len() - node_count;
        Self { rows, records, node_count, relationship_count }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column headers and cell text for the text result view.
    ///
    /// Headers follow the first row; a later row missing a column gets an
    /// empty cell.
    pub fn table(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let headers: Vec<String> = self
            .rows
            .first()
            .map(|r| r.cells.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default();
        let body = self
            .rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|h| row.cells.iter().find(|(k, _)| k == h).map(|(_, c)| c.text()).unwrap_or_default())
                    .collect()
            })
            .collect();
        (headers, body)
    }
}

fn log_path_for_now(dir: &Path) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]");
    let date = now.format(&fmt).unwrap_or_else(|_| "unknown".into());
    dir.join(format!("queries_{}.log", date))
}

fn log_query(dir: &Path, request: &QueryRequest, outcome: &Result<QueryOutcome>) {
    if let Err(e) = create_dir_all(dir) {
        log::warn!("cannot create query log dir {}: {}", dir.display(), e);
        return;
    }
    let path = log_path_for_now(dir);
    let now = OffsetDateTime::now_utc();
    let ts_fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let ts = now.format(&ts_fmt).unwrap_or_else(|_| "".into());
    let status = match outcome {
        Ok(o) => format!("OK rows={} nodes={} rels={}", o.rows.len(), o.node_count, o.relationship_count),
        Err(e) => format!("ERR {}", e),
    };
    let params = serde_json::to_string(&request.params).unwrap_or_default();
    let line = format!("{} | {} | params={}\n{}\n\n", ts, status, params, request.cypher.trim());
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = file.write_all(line.as_bytes());
    }
}

pub async fn execute_query(store: &dyn GraphStore, request: &QueryRequest) -> Result<QueryOutcome> {
    if request.cypher.trim().is_empty() {
        return Err(anyhow!("empty query"));
    }
    let rows = store.run(request).await?;
    Ok(QueryOutcome::from_rows(rows))
}

/// Run a query and append it, with its status, to the daily log in `log_dir`.
pub async fn execute_and_log(store: &dyn GraphStore, request: &QueryRequest, log_dir: Option<&Path>) -> Result<QueryOutcome> {
    let res = execute_query(store, request).await;
    match &res {
        Ok(o) => log::debug!("query ok: {} rows, {} entities", o.rows.len(), o.records.len()),
        Err(e) => log::error!("query failed: {:#}", e),
    }
    if let Some(dir) = log_dir {
        log_query(dir, request, &res);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_binds_single_id_param() {
        let q = QueryRequest::lookup(EntityKind::Relationship, 42);
        assert_eq!(q.cypher, EDGE_LOOKUP);
        assert_eq!(q.params.len(), 1);
        assert_eq!(q.params.get("id"), Some(&Value::from(42)));
    }

    #[test]
    fn return_columns_follow_aliases_and_stop_at_limit() {
        assert_eq!(return_columns(NODE_LOOKUP), vec!["c"]);
        assert_eq!(return_columns(EDGE_LOOKUP), vec!["r"]);
        assert_eq!(
            return_columns("MATCH (a)-[k]->(b) RETURN a, k AS rel, b ORDER BY a.name LIMIT 5"),
            vec!["a", "rel", "b"]
        );
        assert_eq!(return_columns("match (n) return distinct n;"), vec!["n"]);
        assert!(return_columns("CREATE (n:Person)").is_empty());
    }

    #[test]
    fn return_columns_read_multiline_editor_text() {
        assert_eq!(return_columns("MATCH (n)\nRETURN n\nLIMIT 5"), vec!["n"]);
        assert_eq!(return_columns("MATCH (n) RETURN\n  n"), vec!["n"]);
        assert_eq!(
            return_columns("MATCH (a)-[k]->(b)\r\nRETURN a,\n\tk   AS rel\nORDER BY\n a.name"),
            vec!["a", "rel"]
        );
    }

    fn node(id: i64) -> Record {
        Record { kind: EntityKind::Node, id, labels: vec!["Person".into()], properties: BTreeMap::new(), endpoints: None }
    }

    #[test]
    fn outcome_dedups_entities_and_keeps_scalar_rows() {
        let rows = vec![
            ResultRow { cells: vec![("n".into(), Cell::Entity(node(1))), ("n.name".into(), Cell::Scalar(Value::from("Ada")))] },
            ResultRow { cells: vec![("n".into(), Cell::Entity(node(1))), ("n.name".into(), Cell::Scalar(Value::from("Ada")))] },
        ];
        let o = QueryOutcome::from_rows(rows);
        assert_eq!(o.records.len(), 1);
        assert_eq!(o.node_count, 1);
        assert_eq!(o.relationship_count, 0);
        let (headers, body) = o.table();
        assert_eq!(headers, vec!["n", "n.name"]);
        assert_eq!(body[1], vec!["(1:Person)".to_string(), "Ada".to_string()]);
    }

    #[test]
    fn scalar_only_result_is_not_empty() {
        let o = QueryOutcome::from_rows(vec![ResultRow::single("count(n)", Cell::Scalar(Value::from(3)))]);
        assert!(!o.is_empty());
        assert!(o.records.is_empty());
        assert_eq!(o.table(), (vec!["count(n)".to_string()], vec![vec!["3".to_string()]]));
    }

    #[test]
    fn display_rows_put_identity_first() {
        let mut properties = BTreeMap::new();
        properties.insert("name".to_string(), Value::from("Ada"));
        properties.insert("age".to_string(), Value::from(36));
        let r = Record { kind: EntityKind::Node, id: 7, labels: vec!["Person".into()], properties, endpoints: None };
        let rows = r.display_rows();
        assert_eq!(rows[0], ("<id>".to_string(), "7".to_string()));
        assert_eq!(rows[1], ("<labels>".to_string(), "Person".to_string()));
        assert!(rows.contains(&("name".to_string(), "Ada".to_string())));
        assert!(rows.contains(&("age".to_string(), "36".to_string())));
    }
}
