use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::gql::query_interface::{self, EntityKind, GraphStore, QueryRequest, Record};
use crate::graph_utils::graph::EntityId;

/// What the user clicked on the rendered graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMessage {
    Blank,
    Node(EntityId),
    Edge(EntityId),
}

impl SelectionMessage {
    /// Decode the JSON the rendering surface posts on a click.
    ///
    /// `{"nodeId": n}` wins over `{"edgeId": n}`. Anything that is not an
    /// object with an integer id under one of those keys is a blank click.
    pub fn parse(message: &str) -> Self {
        let value: Value = match serde_json::from_str(message) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("unreadable selection message {:?}: {}", message, e);
                return SelectionMessage::Blank;
            }
        };
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else { return SelectionMessage::Blank };
        if let Some(v) = obj.get("nodeId") {
            return v.as_i64().map(SelectionMessage::Node).unwrap_or_else(|| {
                log::debug!("non-integer nodeId {}", v);
                SelectionMessage::Blank
            });
        }
        if let Some(v) = obj.get("edgeId") {
            return v.as_i64().map(SelectionMessage::Edge).unwrap_or_else(|| {
                log::debug!("non-integer edgeId {}", v);
                SelectionMessage::Blank
            });
        }
        SelectionMessage::Blank
    }

    /// The JSON form, as the surface would post it.
    pub fn to_json(&self) -> String {
        match self {
            SelectionMessage::Blank => "{}".to_string(),
            SelectionMessage::Node(id) => serde_json::json!({ "nodeId": id }).to_string(),
            SelectionMessage::Edge(id) => serde_json::json!({ "edgeId": id }).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_node: Option<EntityId>,
    pub selected_edge: Option<EntityId>,
}

/// Apply a selection to the state and return the lookup to run, if any.
///
/// The state is updated before the lookup runs, so a failed lookup still
/// leaves the attempted id selected.
pub fn apply_selection(state: &mut SelectionState, message: SelectionMessage) -> Option<QueryRequest> {
    match message {
        SelectionMessage::Blank => None,
        SelectionMessage::Node(id) => {
            state.selected_node = Some(id);
            Some(QueryRequest::lookup(EntityKind::Node, id))
        }
        SelectionMessage::Edge(id) => {
            state.selected_edge = Some(id);
            Some(QueryRequest::lookup(EntityKind::Relationship, id))
        }
    }
}

/// Where lookup results end up.
pub trait PropertyDisplay: Send + Sync {
    /// `None` means the entity no longer exists; show "No information".
    fn show(&self, record: Option<Record>);

    /// The lookup failed; the shown properties should stay as they are.
    fn fail(&self, error: anyhow::Error);
}

/// Turns clicks on the rendered graph into property lookups.
///
/// Each lookup runs as its own task and nothing orders or cancels them: if
/// two clicks race, whichever lookup finishes last is what the display ends
/// up showing.
pub struct SelectionBridge {
    store: Arc<dyn GraphStore>,
    display: Arc<dyn PropertyDisplay>,
    runtime: Handle,
    query_log_dir: Option<PathBuf>,
    state: SelectionState,
}

impl SelectionBridge {
    pub fn new(store: Arc<dyn GraphStore>, display: Arc<dyn PropertyDisplay>, runtime: Handle) -> Self {
        Self { store, display, runtime, query_log_dir: None, state: SelectionState::default() }
    }

    pub fn with_query_log(mut self, dir: PathBuf) -> Self {
        self.query_log_dir = Some(dir);
        self
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Handle a raw message from the rendering surface.
    pub fn on_message(&mut self, message: &str) -> Option<JoinHandle<()>> {
        self.on_selection(SelectionMessage::parse(message))
    }

    /// Handle a decoded selection. Returns the spawned lookup, or `None` for a
    /// blank click.
    pub fn on_selection(&mut self, message: SelectionMessage) -> Option<JoinHandle<()>> {
        let request = apply_selection(&mut self.state, message)?;
        log::debug!("selection {:?} -> {}", message, request.cypher);

        let store = Arc::clone(&self.store);
        let display = Arc::clone(&self.display);
        let log_dir = self.query_log_dir.clone();
        Some(self.runtime.spawn(async move {
            match query_interface::execute_and_log(store.as_ref(), &request, log_dir.as_deref()).await {
                Ok(outcome) => display.show(outcome.records.into_iter().next()),
                Err(e) => display.fail(e.context(format!("lookup for {:?} failed", message))),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_distinguishes_node_edge_and_blank() {
        assert_eq!(SelectionMessage::parse(r#"{"nodeId": 12}"#), SelectionMessage::Node(12));
        assert_eq!(SelectionMessage::parse(r#"{"edgeId": 3}"#), SelectionMessage::Edge(3));
        assert_eq!(SelectionMessage::parse("{}"), SelectionMessage::Blank);
        assert_eq!(SelectionMessage::parse("null"), SelectionMessage::Blank);
    }

    #[test]
    fn parse_treats_malformed_ids_as_blank() {
        assert_eq!(SelectionMessage::parse(r#"{"nodeId": "12"}"#), SelectionMessage::Blank);
        assert_eq!(SelectionMessage::parse(r#"{"edgeId": 1.5}"#), SelectionMessage::Blank);
        assert_eq!(SelectionMessage::parse("not json"), SelectionMessage::Blank);
    }

    #[test]
    fn node_key_wins_when_both_present() {
        assert_eq!(SelectionMessage::parse(r#"{"edgeId": 4, "nodeId": 9}"#), SelectionMessage::Node(9));
    }

    #[test]
    fn to_json_matches_surface_shape() {
        for m in [SelectionMessage::Blank, SelectionMessage::Node(5), SelectionMessage::Edge(-1)] {
            assert_eq!(SelectionMessage::parse(&m.to_json()), m);
        }
    }

    #[test]
    fn apply_selection_tracks_node_and_edge_separately() {
        let mut state = SelectionState::default();
        let q = apply_selection(&mut state, SelectionMessage::Node(1)).expect("node lookup");
        assert_eq!(q.lookup_kind, Some(EntityKind::Node));
        apply_selection(&mut state, SelectionMessage::Edge(8));
        assert_eq!(state, SelectionState { selected_node: Some(1), selected_edge: Some(8) });

        assert!(apply_selection(&mut state, SelectionMessage::Blank).is_none());
        assert_eq!(state, SelectionState { selected_node: Some(1), selected_edge: Some(8) });
    }
}
