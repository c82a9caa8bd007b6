//! Result canvas: lays the entities of a query result out on a circle, paints
//! them, and maps clicks back to selection messages.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};

use crate::bridge::selection::SelectionMessage;
use crate::gql::query_interface::{EntityKind, Record};
use crate::graph_utils::graph::EntityId;

pub const NODE_RADIUS: f32 = 10.0;
// How close a click has to land to an edge to pick it
pub const EDGE_PICK_DISTANCE: f32 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub id: EntityId,
    pub pos: Pos2,
    pub caption: String,
    // Endpoint of a returned relationship that the result itself did not contain
    pub ghost: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedEdge {
    pub id: EntityId,
    pub from: Pos2,
    pub to: Pos2,
    pub caption: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphLayout {
    pub nodes: Vec<PlacedNode>,
    pub edges: Vec<PlacedEdge>,
}

/// Place the result's nodes evenly on a circle inside `rect`, and connect
/// relationships between their endpoints.
pub fn layout(records: &[Record], rect: Rect) -> GraphLayout {
    let mut order: Vec<(EntityId, String, bool)> = Vec::new();
    for r in records.iter().filter(|r| r.kind == EntityKind::Node) {
        order.push((r.id, r.labels.first().cloned().unwrap_or_default(), false));
    }
    for r in records.iter().filter(|r| r.kind == EntityKind::Relationship) {
        if let Some((from, to)) = r.endpoints {
            for id in [from, to] {
                if !order.iter().any(|(n, _, _)| *n == id) {
                    order.push((id, String::new(), true));
                }
            }
        }
    }

    let center = rect.center();
    let ring = (rect.width().min(rect.height()) * 0.5 - NODE_RADIUS * 3.0).max(0.0);
    let count = order.len();
    let mut positions: BTreeMap<EntityId, Pos2> = BTreeMap::new();
    let nodes: Vec<PlacedNode> = order
        .into_iter()
        .enumerate()
        .map(|(i, (id, label, ghost))| {
            let pos = if count == 1 {
                center
            } else {
                // Start at twelve o'clock
                let angle = TAU * i as f32 / count as f32 - TAU / 4.0;
                center + Vec2::new(angle.cos(), angle.sin()) * ring
            };
            positions.insert(id, pos);
            let caption = if label.is_empty() { id.to_string() } else { format!("{}:{}", id, label) };
            PlacedNode { id, pos, caption, ghost }
        })
        .collect();

    let edges = records
        .iter()
        .filter(|r| r.kind == EntityKind::Relationship)
        .filter_map(|r| {
            let (from, to) = r.endpoints?;
            Some(PlacedEdge {
                id: r.id,
                from: *positions.get(&from)?,
                to: *positions.get(&to)?,
                caption: r.labels.join("|"),
            })
        })
        .collect();

    GraphLayout { nodes, edges }
}

fn point_segment_distance(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ap = Vec2::new(p.x - a.x, p.y - a.y);
    let ab = Vec2::new(b.x - a.x, b.y - a.y);
    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 <= f32::EPSILON {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len2).clamp(0.0, 1.0);
    let proj = Pos2::new(a.x + ab.x * t, a.y + ab.y * t);
    ((p.x - proj.x).powi(2) + (p.y - proj.y).powi(2)).sqrt()
}

/// What a click at `pos` selects: the nearest node under the pointer, else the
/// nearest edge within pick distance, else blank canvas.
pub fn hit_test(layout: &GraphLayout, pos: Pos2) -> SelectionMessage {
    let mut best_d2 = f32::INFINITY;
    let mut hit = None;
    for n in &layout.nodes {
        let d2 = (n.pos - pos).length_sq();
        if d2 <= NODE_RADIUS * NODE_RADIUS && d2 < best_d2 {
            best_d2 = d2;
            hit = Some(SelectionMessage::Node(n.id));
        }
    }
    if let Some(hit) = hit {
        return hit;
    }

    let mut best_d = f32::INFINITY;
    for e in &layout.edges {
        let d = point_segment_distance(pos, e.from, e.to);
        if d <= EDGE_PICK_DISTANCE && d < best_d {
            best_d = d;
            hit = Some(SelectionMessage::Edge(e.id));
        }
    }
    hit.unwrap_or(SelectionMessage::Blank)
}

pub fn paint(painter: &egui::Painter, layout: &GraphLayout, highlighted: Option<SelectionMessage>) {
    let edge_stroke = Stroke { width: 1.5, color: Color32::from_rgba_premultiplied(200, 200, 200, 200) };
    let selected_stroke = Stroke { width: 3.0, color: Color32::from_rgb(255, 200, 80) };
    let font = egui::FontId::proportional(12.0);

    for e in &layout.edges {
        let stroke = if highlighted == Some(SelectionMessage::Edge(e.id)) { selected_stroke } else { edge_stroke };
        if (e.to - e.from).length() <= f32::EPSILON {
            // Self loop
            let c = e.from + Vec2::new(0.0, -NODE_RADIUS * 1.8);
            painter.circle_stroke(c, NODE_RADIUS, stroke);
        } else {
            painter.line_segment([e.from, e.to], stroke);
        }
        let mid = Pos2::new((e.from.x + e.to.x) * 0.5, (e.from.y + e.to.y) * 0.5);
        painter.text(mid, egui::Align2::CENTER_BOTTOM, &e.caption, font.clone(), Color32::LIGHT_GRAY);
    }

    for n in &layout.nodes {
        let is_selected = highlighted == Some(SelectionMessage::Node(n.id));
        let fill = if is_selected {
            Color32::from_rgb(80, 120, 255)
        } else if n.ghost {
            Color32::from_rgb(35, 35, 35)
        } else {
            Color32::from_rgb(60, 60, 60)
        };
        let stroke = if is_selected { Stroke::new(2.0, Color32::WHITE) } else { Stroke::new(1.5, Color32::DARK_GRAY) };
        painter.circle_filled(n.pos, NODE_RADIUS, fill);
        painter.circle_stroke(n.pos, NODE_RADIUS, stroke);
        painter.text(
            n.pos + Vec2::new(0.0, -NODE_RADIUS - 4.0),
            egui::Align2::CENTER_BOTTOM,
            &n.caption,
            font.clone(),
            if n.ghost { Color32::GRAY } else { Color32::WHITE },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::graph::GraphDatabase;

    fn canvas() -> Rect {
        Rect::from_min_size(Pos2::new(10.0, 10.0), Vec2::new(400.0, 400.0))
    }

    fn sample_records() -> Vec<Record> {
        let db = GraphDatabase::sample();
        let mut records: Vec<Record> = (0..3).filter_map(|id| db.node_record(id)).collect();
        records.extend((3..6).filter_map(|id| db.relationship_record(id)));
        records
    }

    #[test]
    fn single_node_sits_in_the_middle() {
        let db = GraphDatabase::sample();
        let records: Vec<Record> = db.node_record(0).into_iter().collect();
        let l = layout(&records, canvas());
        assert_eq!(l.nodes.len(), 1);
        assert_eq!(l.nodes[0].pos, canvas().center());
        assert!(l.edges.is_empty());
    }

    #[test]
    fn clicks_map_to_node_edge_and_blank_messages() {
        let l = layout(&sample_records(), canvas());
        assert_eq!(l.nodes.len(), 3);
        assert_eq!(l.edges.len(), 3);

        let ada = l.nodes.iter().find(|n| n.id == 0).map(|n| n.pos).unwrap();
        assert_eq!(hit_test(&l, ada + Vec2::new(3.0, -2.0)), SelectionMessage::Node(0));
        assert_eq!(SelectionMessage::Node(0).to_json(), r#"{"nodeId":0}"#);

        let knows = l.edges.iter().find(|e| e.id == 5).unwrap();
        let mid = Pos2::new((knows.from.x + knows.to.x) * 0.5, (knows.from.y + knows.to.y) * 0.5);
        assert_eq!(hit_test(&l, mid + Vec2::new(0.0, 2.0)), SelectionMessage::Edge(5));
        assert_eq!(SelectionMessage::Edge(5).to_json(), r#"{"edgeId":5}"#);

        assert_eq!(hit_test(&l, canvas().left_top() + Vec2::splat(1.0)), SelectionMessage::Blank);
        assert_eq!(SelectionMessage::Blank.to_json(), "{}");
    }

    #[test]
    fn relationship_only_result_draws_ghost_endpoints() {
        let db = GraphDatabase::sample();
        let records: Vec<Record> = db.relationship_record(5).into_iter().collect();
        let l = layout(&records, canvas());
        assert_eq!(l.nodes.len(), 2);
        assert!(l.nodes.iter().all(|n| n.ghost));
        assert_eq!(l.edges.len(), 1);
        assert_eq!(hit_test(&l, l.nodes[1].pos), SelectionMessage::Node(l.nodes[1].id));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(point_segment_distance(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(point_segment_distance(Pos2::new(13.0, 4.0), a, b), 5.0);
        assert_eq!(point_segment_distance(Pos2::new(3.0, 4.0), a, a), 5.0);
    }
}
