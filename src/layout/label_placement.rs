//! Label placement: every node and edge label gets a position that overlaps
//! nothing already on the canvas, or — when the canvas is genuinely too
//! crowded — the position with the least total overlap, reported through the
//! diagnostics sink.
//!
//! Node labels are placed before edge labels; later labels must avoid
//! earlier ones, so node labels get first pick.

use crate::config::LabelConfig;
use crate::diag::{DiagnosticsSink, LayoutEvent};
use crate::geometry::{Point, bezier_point};

use super::types::{BoundingBox, LayoutEdge, LayoutNode};

pub(super) struct LabelOptimizer<'a> {
    config: &'a LabelConfig,
}

impl<'a> LabelOptimizer<'a> {
    pub(super) fn new(config: &'a LabelConfig) -> Self {
        Self { config }
    }

    pub(super) fn optimize(
        &self,
        nodes: &mut [LayoutNode],
        edges: &mut [LayoutEdge],
        sink: &dyn DiagnosticsSink,
    ) {
        // Fixed obstacles: the node discs and a reserved square around every
        // edge's label anchor. The squares are a deliberate simplification —
        // labels keep clear of where edges get busy without a path-hull test.
        let mut occupied: Vec<BoundingBox> = Vec::with_capacity(nodes.len() + edges.len());
        for node in nodes.iter() {
            let r = self.config.node_radius;
            occupied.push(BoundingBox::centered((node.x, node.y), r * 2.0, r * 2.0));
        }
        for edge in edges.iter() {
            let side = self.config.edge_box_size;
            occupied.push(BoundingBox::centered(
                (edge.arrow.x, edge.arrow.y),
                side,
                side,
            ));
        }

        let mut node_order: Vec<usize> = (0..nodes.len()).collect();
        node_order.sort_by(|&a, &b| nodes[a].id.cmp(&nodes[b].id));
        for idx in node_order {
            let node = &nodes[idx];
            let size = self.label_size(&node.label);
            let candidates = self.node_candidates((node.x, node.y), size);
            let owner = node.id.to_string();
            nodes[idx].label_pos = self.pick(&owner, &candidates, size, &mut occupied, sink);
        }

        let mut edge_order: Vec<usize> = (0..edges.len()).collect();
        edge_order.sort_by(|&a, &b| edges[a].id.cmp(&edges[b].id));
        for idx in edge_order {
            let edge = &edges[idx];
            let size = self.label_size(&edge.label);
            let candidates = self.edge_candidates(edge, size);
            let owner = edge.id.to_string();
            edges[idx].label_pos = self.pick(&owner, &candidates, size, &mut occupied, sink);
        }
    }

    fn label_size(&self, text: &str) -> (f32, f32) {
        (
            text.chars().count() as f32 * self.config.char_width,
            self.config.line_height,
        )
    }

    /// Fixed candidate order: above, below, right, left of the node disc.
    fn node_candidates(&self, center: Point, size: (f32, f32)) -> Vec<Point> {
        let gap = self.config.node_radius + self.config.offset;
        vec![
            (center.0, center.1 - gap - size.1 / 2.0),
            (center.0, center.1 + gap + size.1 / 2.0),
            (center.0 + gap + size.0 / 2.0, center.1),
            (center.0 - gap - size.0 / 2.0, center.1),
        ]
    }

    /// Fixed candidate order: one side of the midpoint, the other side, then
    /// the preferred side of the start-third and end-third anchor points.
    ///
    /// Offsets run perpendicular to the edge's chord, not vertically; a fixed
    /// vertical offset slides along steep edges and lands labels on the
    /// endpoint discs. `reach` extends the gap by the label box's half-extent
    /// projected onto the chord normal, so every point of the box keeps at
    /// least `gap` of perpendicular clearance from the chord whatever the
    /// edge's angle.
    fn edge_candidates(&self, edge: &LayoutEdge, size: (f32, f32)) -> Vec<Point> {
        let gap = self.config.edge_box_size / 2.0 + self.config.offset;
        let (a, b) = (edge.start(), edge.end());
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len = (dx * dx + dy * dy).sqrt().max(1e-3);
        let normal = (-dy / len, dx / len);
        let reach = gap + size.0 / 2.0 * normal.0.abs() + size.1 / 2.0 * normal.1.abs();
        let offset = |anchor: Point, sign: f32| {
            (
                anchor.0 - sign * normal.0 * reach,
                anchor.1 - sign * normal.1 * reach,
            )
        };
        let mid = (edge.arrow.x, edge.arrow.y);
        vec![
            offset(mid, 1.0),
            offset(mid, -1.0),
            offset(path_point(&edge.points, 1.0 / 3.0), 1.0),
            offset(path_point(&edge.points, 2.0 / 3.0), 1.0),
        ]
    }

    /// First collision-free candidate wins; otherwise the candidate with the
    /// smallest summed overlap is used and the fallback is reported.
    fn pick(
        &self,
        owner: &str,
        candidates: &[Point],
        size: (f32, f32),
        occupied: &mut Vec<BoundingBox>,
        sink: &dyn DiagnosticsSink,
    ) -> Point {
        let mut fallback = candidates[0];
        let mut fallback_overlap = f32::MAX;
        for &candidate in candidates {
            let rect = BoundingBox::centered(candidate, size.0, size.1);
            let overlap: f32 = occupied
                .iter()
                .filter(|other| rect.intersects(other))
                .map(|other| rect.overlap_area(other))
                .sum();
            if overlap == 0.0 {
                occupied.push(rect);
                return candidate;
            }
            if overlap < fallback_overlap {
                fallback_overlap = overlap;
                fallback = candidate;
            }
        }
        sink.report(LayoutEvent::LabelFallback {
            owner: owner.to_string(),
            overlap_area: fallback_overlap,
        });
        occupied.push(BoundingBox::centered(fallback, size.0, size.1));
        fallback
    }
}

fn path_point(points: &[Point], t: f32) -> Point {
    match points {
        [a, c1, c2, b] => bezier_point(*a, *c1, *c2, *b, t),
        [a, b] => (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t),
        _ => points.first().copied().unwrap_or((0.0, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{NullSink, RecordingSink};
    use crate::graph::{BranchId, NodeId};
    use crate::layout::types::{ArrowPose, path_data};

    fn node(id: &str, x: f32, y: f32) -> LayoutNode {
        LayoutNode {
            id: NodeId::new(id),
            x,
            y,
            label: id.to_string(),
            label_pos: (0.0, 0.0),
        }
    }

    fn straight_edge(id: &str, from: &LayoutNode, to: &LayoutNode) -> LayoutEdge {
        let points = vec![(from.x, from.y), (to.x, to.y)];
        LayoutEdge {
            id: BranchId::new(id),
            from: from.id.clone(),
            to: to.id.clone(),
            path: path_data(&points),
            arrow: ArrowPose {
                x: (from.x + to.x) / 2.0,
                y: (from.y + to.y) / 2.0,
                angle: 0.0,
            },
            points,
            label: format!("{id} = 100 Ω"),
            label_pos: (0.0, 0.0),
            is_curved: false,
        }
    }

    #[test]
    fn labels_do_not_overlap_on_a_sparse_graph() {
        let config = LabelConfig::default();
        let mut nodes = vec![node("n1", 100.0, 100.0), node("n2", 400.0, 100.0)];
        let mut edges = vec![straight_edge("R1", &nodes[0], &nodes[1])];
        LabelOptimizer::new(&config).optimize(&mut nodes, &mut edges, &NullSink);

        let mut boxes: Vec<BoundingBox> = Vec::new();
        for label in nodes
            .iter()
            .map(|n| (n.label.as_str(), n.label_pos))
            .chain(edges.iter().map(|e| (e.label.as_str(), e.label_pos)))
        {
            let size = (
                label.0.chars().count() as f32 * config.char_width,
                config.line_height,
            );
            boxes.push(BoundingBox::centered(label.1, size.0, size.1));
        }
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                assert!(!boxes[i].intersects(&boxes[j]), "labels {i} and {j} overlap");
            }
        }
    }

    #[test]
    fn ring_edge_labels_clear_the_node_discs() {
        let config = LabelConfig::default();
        // Diamond ring: every edge is diagonal, the shape that slides
        // vertically-offset candidates onto the endpoint discs.
        let mut nodes = vec![
            node("n1", 160.0, 40.0),
            node("n2", 280.0, 160.0),
            node("n3", 160.0, 280.0),
            node("n4", 40.0, 160.0),
        ];
        let mut edges = vec![
            straight_edge("R1", &nodes[0], &nodes[1]),
            straight_edge("R2", &nodes[1], &nodes[2]),
            straight_edge("R3", &nodes[2], &nodes[3]),
            straight_edge("V1", &nodes[3], &nodes[0]),
        ];
        let sink = RecordingSink::new();
        LabelOptimizer::new(&config).optimize(&mut nodes, &mut edges, &sink);
        assert_eq!(sink.label_fallbacks(), 0);

        for edge in &edges {
            let size = (
                edge.label.chars().count() as f32 * config.char_width,
                config.line_height,
            );
            let rect = BoundingBox::centered(edge.label_pos, size.0, size.1);
            for node in &nodes {
                let r = config.node_radius;
                let disc = BoundingBox::centered((node.x, node.y), r * 2.0, r * 2.0);
                assert!(
                    !rect.intersects(&disc),
                    "label for {} overlaps node {}",
                    edge.id,
                    node.id
                );
            }
        }
    }

    #[test]
    fn impossible_placement_falls_back_with_diagnostic() {
        let mut config = LabelConfig::default();
        // Giant reserved squares swallow every candidate position.
        config.edge_box_size = 4000.0;
        let mut nodes = vec![node("n1", 100.0, 100.0), node("n2", 200.0, 100.0)];
        let mut edges = vec![straight_edge("R1", &nodes[0], &nodes[1])];
        let sink = RecordingSink::new();
        LabelOptimizer::new(&config).optimize(&mut nodes, &mut edges, &sink);
        assert!(sink.label_fallbacks() > 0);
    }

    #[test]
    fn node_labels_go_above_when_clear() {
        let config = LabelConfig::default();
        let mut nodes = vec![node("n1", 100.0, 100.0)];
        LabelOptimizer::new(&config).optimize(&mut nodes, &mut [], &NullSink);
        assert!(nodes[0].label_pos.1 < 100.0);
        assert_eq!(nodes[0].label_pos.0, 100.0);
    }
}
