use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::RwLock;

use crate::gql::query_interface::{Cell, EntityKind, GraphStore, QueryRequest, Record, ResultRow};

// Basic type aliases for clarity
pub type EntityId = i64;
type Key = String;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<Key, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relationship {
    pub id: EntityId,
    pub from_node: EntityId,
    pub to_node: EntityId,
    pub rel_type: String,
    pub properties: BTreeMap<Key, Value>,
}

/// Small in-process graph used in debug mode and by tests.
///
/// Identifiers are handed out from one counter shared by nodes and
/// relationships, like internal ids in a real store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphDatabase {
    pub nodes: BTreeMap<EntityId, Node>,
    pub relationships: BTreeMap<EntityId, Relationship>,
    next_id: EntityId,
}

impl GraphDatabase {
    // Instantiate a new, empty graph database
    pub fn new() -> Self {
        Self::default()
    }

    /// A handful of people and a company, enough to click around in debug mode.
    pub fn sample() -> Self {
        let mut db = Self::new();
        let ada = db.add_node(&["Person"], props(&[("name", "Ada"), ("role", "Engineer")]));
        let bob = db.add_node(&["Person"], props(&[("name", "Bob"), ("role", "Designer")]));
        let acme = db.add_node(&["Company"], props(&[("name", "Acme")]));
        db.add_relationship(ada, acme, "WORKS_AT", props(&[("since", "2019")]));
        db.add_relationship(bob, acme, "WORKS_AT", props(&[("since", "2021")]));
        db.add_relationship(ada, bob, "KNOWS", BTreeMap::new());
        db
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // Add a node and return its new ID
    pub fn add_node(&mut self, labels: &[&str], properties: BTreeMap<Key, Value>) -> EntityId {
        let id = self.allocate_id();
        let labels = labels.iter().map(|l| l.to_string()).collect();
        self.nodes.insert(id, Node { id, labels, properties });
        id
    }

    // Add a relationship if both ends exist; returns the relationship ID
    pub fn add_relationship(
        &mut self,
        from_node: EntityId,
        to_node: EntityId,
        rel_type: &str,
        properties: BTreeMap<Key, Value>,
    ) -> Option<EntityId> {
        if self.nodes.contains_key(&from_node) && self.nodes.contains_key(&to_node) {
            let id = self.allocate_id();
            let relationship = Relationship { id, from_node, to_node, rel_type: rel_type.to_string(), properties };
            self.relationships.insert(id, relationship);
            Some(id)
        } else {
            None
        }
    }

    pub fn get_node(&self, id: EntityId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_relationship(&self, id: EntityId) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    pub fn remove_node(&mut self, id: EntityId) -> bool {
        if self.nodes.remove(&id).is_some() {
            // Cascade delete relationships involving this node
            self.relationships.retain(|_, r| r.from_node != id && r.to_node != id);
            true
        } else {
            false
        }
    }

    pub fn node_record(&self, id: EntityId) -> Option<Record> {
        self.get_node(id).map(|n| Record {
            kind: EntityKind::Node,
            id: n.id,
            labels: n.labels.clone(),
            properties: n.properties.clone(),
            endpoints: None,
        })
    }

    pub fn relationship_record(&self, id: EntityId) -> Option<Record> {
        self.get_relationship(id).map(|r| Record {
            kind: EntityKind::Relationship,
            id: r.id,
            labels: vec![r.rel_type.clone()],
            properties: r.properties.clone(),
            endpoints: Some((r.from_node, r.to_node)),
        })
    }
}

fn props(pairs: &[(&str, &str)]) -> BTreeMap<Key, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// `GraphStore` over a shared in-memory `GraphDatabase`.
///
/// Only understands id lookups (`QueryRequest::lookup`), a bare
/// `MATCH (n) RETURN n` / `MATCH ()-[r]-() RETURN r` scan and
/// `MATCH (n) RETURN count(n)`. Anything else is rejected, since there is no
/// Cypher engine behind it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    db: RwLock<GraphDatabase>,
}

impl InMemoryStore {
    pub fn new(db: GraphDatabase) -> Self {
        Self { db: RwLock::new(db) }
    }

    /// Mutate the underlying graph, e.g. to delete an entity between lookups.
    pub fn with_db<R>(&self, f: impl FnOnce(&mut GraphDatabase) -> R) -> anyhow::Result<R> {
        let mut db = self.db.write().map_err(|_| anyhow::anyhow!("in-memory graph lock poisoned"))?;
        Ok(f(&mut db))
    }
}

#[async_trait]
impl GraphStore for InMemoryStore {
    async fn run(&self, request: &QueryRequest) -> anyhow::Result<Vec<ResultRow>> {
        let db = self.db.read().map_err(|_| anyhow::anyhow!("in-memory graph lock poisoned"))?;
        if let Some(kind) = request.lookup_kind {
            let id = request
                .params
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow::anyhow!("lookup without integer `id` parameter"))?;
            let (column, found) = match kind {
                EntityKind::Node => ("c", db.node_record(id)),
                EntityKind::Relationship => ("r", db.relationship_record(id)),
            };
            return Ok(found.map(|r| ResultRow::single(column, Cell::Entity(r))).into_iter().collect());
        }

        let normalized = request.cypher.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let normalized = normalized.trim_end_matches(';').trim();
        let rows: Vec<ResultRow> = match normalized {
            "MATCH (N) RETURN N" => db
                .nodes
                .keys()
                .filter_map(|id| db.node_record(*id))
                .map(|r| ResultRow::single("n", Cell::Entity(r)))
                .collect(),
            "MATCH ()-[R]-() RETURN R" | "MATCH ()-[R]->() RETURN R" => db
                .relationships
                .keys()
                .filter_map(|id| db.relationship_record(*id))
                .map(|r| ResultRow::single("r", Cell::Entity(r)))
                .collect(),
            "MATCH (N) RETURN COUNT(N)" => {
                vec![ResultRow::single("count(n)", Cell::Scalar(Value::from(db.nodes.len())))]
            }
            _ => return Err(anyhow::anyhow!("unsupported statement for in-memory store: {}", request.cypher.trim())),
        };
        Ok(rows)
    }
}
