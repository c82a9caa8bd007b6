//! Neo4j-backed `GraphStore` over the bolt protocol.

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{BoltType, ConfigBuilder, Graph, Node, Query, Relation, Row};
use serde_json::Value;
use std::collections::BTreeMap;

use super::query_interface::{return_columns, Cell, EntityKind, GraphStore, QueryRequest, Record, ResultRow};
use crate::persistence::settings::AppSettings;

#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Build the connection pool and ping it, so a bad uri or password fails here
    /// instead of on the first click.
    pub async fn connect(settings: &AppSettings, password: &str) -> Result<Self> {
        let config = ConfigBuilder::default()
            .uri(&settings.uri)
            .user(&settings.user)
            .password(password)
            .db(settings.database.as_str())
            .max_connections(4)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Neo4j is not responding to queries")?;

        log::info!("connected to {} as {}", settings.uri, settings.user);
        Ok(Self { graph })
    }
}

fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        Value::String(s) => s.clone().into(),
        other => other.to_string().into(),
    }
}

fn node_record(node: &Node) -> Record {
    let properties = node
        .keys()
        .into_iter()
        .filter_map(|k| node.get::<Value>(k).ok().map(|v| (k.to_string(), v)))
        .collect::<BTreeMap<_, _>>();
    Record {
        kind: EntityKind::Node,
        id: node.id(),
        labels: node.labels().iter().map(|l| l.to_string()).collect(),
        properties,
        endpoints: None,
    }
}

fn relation_record(rel: &Relation) -> Record {
    let properties = rel
        .keys()
        .into_iter()
        .filter_map(|k| rel.get::<Value>(k).ok().map(|v| (k.to_string(), v)))
        .collect::<BTreeMap<_, _>>();
    Record {
        kind: EntityKind::Relationship,
        id: rel.id(),
        labels: vec![rel.typ().to_string()],
        properties,
        endpoints: Some((rel.start_node_id(), rel.end_node_id())),
    }
}

// Non-entity columns (`count(n)`, `n.name`) are kept as scalars for the text view.
fn row_cells(row: &Row, columns: &[String]) -> ResultRow {
    let cells = columns
        .iter()
        .map(|col| {
            let cell = if let Ok(node) = row.get::<Node>(col) {
                Cell::Entity(node_record(&node))
            } else if let Ok(rel) = row.get::<Relation>(col) {
                Cell::Entity(relation_record(&rel))
            } else {
                Cell::Scalar(row.get::<Value>(col).unwrap_or(Value::Null))
            };
            (col.clone(), cell)
        })
        .collect();
    ResultRow { cells }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn run(&self, request: &QueryRequest) -> Result<Vec<ResultRow>> {
        let mut query = Query::new(request.cypher.clone());
        for (k, v) in &request.params {
            query = query.param(k, to_bolt(v));
        }
        let columns = return_columns(&request.cypher);

        let mut stream = self.graph.execute(query).await.context("Neo4j query failed")?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.context("Neo4j row stream failed")? {
            rows.push(row_cells(&row, &columns));
        }
        Ok(rows)
    }
}
