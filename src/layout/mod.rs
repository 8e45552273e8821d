//! The layout pipeline: placement → routing → label optimization, run
//! strictly in that order with a bounded crowding-relief feedback loop
//! between the first two stages.

mod error;
mod label_placement;
mod placement;
mod routing;
pub(crate) mod types;

pub use error::LayoutError;
pub use types::{ArrowPose, BoundingBox, LayoutEdge, LayoutNode, RenderableGraph};

use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::diag::{DiagnosticsSink, NullSink};
use crate::graph::{AnalysisGraph, Branch, BranchKind, NodeId};

use label_placement::LabelOptimizer;
use placement::{NodePlacer, RestLengths};
use routing::{EdgeDraft, EdgeRouter, RoutedEdge};
use types::path_data;

/// Synchronous, single-shot layout engine. Holds configuration and the
/// diagnostics sink; every `layout` call works on private copies and shares
/// nothing, so independent invocations may run concurrently.
pub struct GraphLayoutEngine {
    config: LayoutConfig,
    sink: Box<dyn DiagnosticsSink>,
}

impl GraphLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            sink: Box::new(NullSink),
        }
    }

    pub fn with_diagnostics(config: LayoutConfig, sink: Box<dyn DiagnosticsSink>) -> Self {
        Self { config, sink }
    }

    pub fn layout(&self, graph: &AnalysisGraph) -> Result<RenderableGraph, LayoutError> {
        compute_layout(graph, &self.config, self.sink.as_ref())
    }
}

impl Default for GraphLayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

/// Run the full pipeline over `graph`.
///
/// The only error is malformed topology; every quality shortfall degrades
/// gracefully and surfaces through `sink` instead.
pub fn compute_layout(
    graph: &AnalysisGraph,
    config: &LayoutConfig,
    sink: &dyn DiagnosticsSink,
) -> Result<RenderableGraph, LayoutError> {
    validate(graph)?;

    // Stable node indexing: id order, so the whole pipeline is deterministic
    // regardless of input ordering.
    let mut node_ids: Vec<&NodeId> = graph.nodes.iter().map(|node| &node.id).collect();
    node_ids.sort();
    let index: HashMap<&NodeId, usize> = node_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx))
        .collect();

    // Current sources are controlled sources, not part of the passive
    // topology; they drop out here and never reach any stage.
    let branches: Vec<&Branch> = graph
        .branches
        .iter()
        .filter(|branch| branch.kind != BranchKind::CurrentSource)
        .collect();

    let links: Vec<(usize, usize)> = branches
        .iter()
        .map(|branch| (index[&branch.from], index[&branch.to]))
        .collect();
    let mut degrees = vec![0usize; node_ids.len()];
    for &(a, b) in &links {
        degrees[a] += 1;
        degrees[b] += 1;
    }
    let drafts: Vec<EdgeDraft> = branches
        .iter()
        .map(|branch| EdgeDraft {
            id: branch.id.clone(),
            from: index[&branch.from],
            to: index[&branch.to],
        })
        .collect();

    let viewport = (config.viewport_width, config.viewport_height);
    let placer = NodePlacer::new(&config.placement, viewport);

    // Placement and routing with crowding feedback: when routing finds a
    // packed node pair, its rest length grows and both stages re-run.
    let mut rest = RestLengths::default();
    let mut pass = 0usize;
    let (positions, routed) = loop {
        let positions = placer.place(node_ids.len(), &links, &degrees, &rest, sink);
        let router = EdgeRouter::new(&config.routing, &positions);
        let routed = router.route(&drafts, sink);
        if pass >= config.placement.max_relief_passes {
            break (positions, routed);
        }
        let crowded = router.crowded_pairs(&routed);
        if crowded.is_empty() {
            break (positions, routed);
        }
        for (a, b) in crowded {
            rest.grow(a, b, config.placement.crowding_growth);
        }
        pass += 1;
    };

    let mut nodes: Vec<LayoutNode> = node_ids
        .iter()
        .zip(positions.iter())
        .map(|(id, &(x, y))| LayoutNode {
            id: (*id).clone(),
            x,
            y,
            label: id.to_string(),
            label_pos: (0.0, 0.0),
        })
        .collect();
    let mut edges: Vec<LayoutEdge> = routed
        .iter()
        .zip(branches.iter())
        .map(|(edge, &branch)| build_edge(edge, branch, &node_ids))
        .collect();

    LabelOptimizer::new(&config.label).optimize(&mut nodes, &mut edges, sink);

    Ok(assemble(nodes, edges, config))
}

fn validate(graph: &AnalysisGraph) -> Result<(), LayoutError> {
    let mut seen_nodes: HashSet<&NodeId> = HashSet::new();
    for node in &graph.nodes {
        if !seen_nodes.insert(&node.id) {
            return Err(LayoutError::DuplicateNode(node.id.to_string()));
        }
    }
    let mut seen_branches = HashSet::new();
    for branch in &graph.branches {
        if !seen_branches.insert(&branch.id) {
            return Err(LayoutError::DuplicateBranch(branch.id.to_string()));
        }
        for endpoint in [&branch.from, &branch.to] {
            if !seen_nodes.contains(endpoint) {
                return Err(LayoutError::DanglingEndpoint {
                    branch: branch.id.to_string(),
                    node: endpoint.to_string(),
                });
            }
        }
        if branch.from == branch.to {
            return Err(LayoutError::SelfLoop {
                branch: branch.id.to_string(),
            });
        }
    }
    Ok(())
}

fn build_edge(edge: &RoutedEdge, branch: &Branch, node_ids: &[&NodeId]) -> LayoutEdge {
    LayoutEdge {
        id: branch.id.clone(),
        from: node_ids[edge.draft.from].clone(),
        to: node_ids[edge.draft.to].clone(),
        path: path_data(&edge.points),
        points: edge.points.clone(),
        arrow: edge.arrow,
        label: branch.display_label(),
        label_pos: (0.0, 0.0),
        is_curved: edge.is_curved,
    }
}

/// Shift everything into positive coordinates with a uniform margin and
/// compute the enclosing extents.
fn assemble(
    mut nodes: Vec<LayoutNode>,
    mut edges: Vec<LayoutEdge>,
    config: &LayoutConfig,
) -> RenderableGraph {
    let mut min = (f32::MAX, f32::MAX);
    let mut max = (f32::MIN, f32::MIN);
    let mut cover = |x: f32, y: f32| {
        min.0 = min.0.min(x);
        min.1 = min.1.min(y);
        max.0 = max.0.max(x);
        max.1 = max.1.max(y);
    };
    for node in &nodes {
        cover(node.x - config.label.node_radius, node.y - config.label.node_radius);
        cover(node.x + config.label.node_radius, node.y + config.label.node_radius);
        cover_label(&mut cover, node.label_pos, &node.label, config);
    }
    for edge in &edges {
        for &(x, y) in &edge.points {
            cover(x, y);
        }
        cover_label(&mut cover, edge.label_pos, &edge.label, config);
    }
    if min.0 > max.0 {
        return RenderableGraph {
            width: config.viewport_margin * 2.0,
            height: config.viewport_margin * 2.0,
            nodes,
            edges,
        };
    }

    let margin = config.viewport_margin;
    let shift = (margin - min.0, margin - min.1);
    for node in &mut nodes {
        node.x += shift.0;
        node.y += shift.1;
        node.label_pos.0 += shift.0;
        node.label_pos.1 += shift.1;
    }
    for edge in &mut edges {
        for point in &mut edge.points {
            point.0 += shift.0;
            point.1 += shift.1;
        }
        edge.arrow.x += shift.0;
        edge.arrow.y += shift.1;
        edge.label_pos.0 += shift.0;
        edge.label_pos.1 += shift.1;
        edge.path = path_data(&edge.points);
    }

    RenderableGraph {
        width: max.0 - min.0 + margin * 2.0,
        height: max.1 - min.1 + margin * 2.0,
        nodes,
        edges,
    }
}

fn cover_label(cover: &mut impl FnMut(f32, f32), pos: (f32, f32), text: &str, config: &LayoutConfig) {
    let w = text.chars().count() as f32 * config.label.char_width;
    let h = config.label.line_height;
    cover(pos.0 - w / 2.0, pos.1 - h / 2.0);
    cover(pos.0 + w / 2.0, pos.1 + h / 2.0);
}
