//! Edge routing: per branch, generate a small family of candidate paths
//! (straight, low arcs, high arc), score them against everything already on
//! the canvas, and keep the cheapest. Routing never fails; an edge that
//! scores over budget is still drawn and only reported.

use std::collections::HashMap;

use crate::config::RoutingConfig;
use crate::diag::{DiagnosticsSink, LayoutEvent};
use crate::geometry::{
    Point, bezier_point, bezier_tangent_angle, line_circle_intersection, line_intersection,
    point_polyline_distance,
};
use crate::graph::BranchId;

use super::types::ArrowPose;

/// Ignore polyline intersections closer than this to a candidate endpoint;
/// edges sharing a node always meet there.
const ENDPOINT_HIT_EPS: f32 = 10.0;
/// Positional tolerance when matching a mirror partner's endpoints.
const MIRROR_MATCH_EPS: f32 = 2.0;
/// Arc offsets of a mirror pair must agree in magnitude within this.
const MIRROR_OFFSET_EPS: f32 = 1e-3;
/// Foreign-path hits within clearance of a chord midpoint that mark the node
/// pair as crowded.
const CROWDING_MIN_HITS: usize = 2;
/// Parallel groups at or above this size always request crowding relief.
const CROWDING_PARALLEL_GROUP: usize = 3;

/// One branch to route: endpoints are node indices into the placement output.
#[derive(Debug, Clone)]
pub(super) struct EdgeDraft {
    pub(super) id: BranchId,
    pub(super) from: usize,
    pub(super) to: usize,
}

/// A routed branch, still index-based; the engine resolves ids and labels.
#[derive(Debug, Clone)]
pub(super) struct RoutedEdge {
    pub(super) draft: EdgeDraft,
    pub(super) points: Vec<Point>,
    pub(super) is_curved: bool,
    pub(super) arrow: ArrowPose,
    /// Signed perpendicular offset of the arc apex; 0 for straight edges.
    pub(super) arc_offset: f32,
}

#[derive(Debug, Clone)]
struct Candidate {
    points: Vec<Point>,
    arc_offset: f32,
    samples: Vec<Point>,
}

pub(super) struct EdgeRouter<'a> {
    config: &'a RoutingConfig,
    nodes: &'a [Point],
}

impl<'a> EdgeRouter<'a> {
    pub(super) fn new(config: &'a RoutingConfig, nodes: &'a [Point]) -> Self {
        Self { config, nodes }
    }

    /// Route every draft in order. Parallel groups (same unordered endpoint
    /// pair) bypass scoring and get the symmetric fan; everything else runs
    /// the candidate competition.
    pub(super) fn route(
        &self,
        drafts: &[EdgeDraft],
        sink: &dyn DiagnosticsSink,
    ) -> Vec<RoutedEdge> {
        let mut groups: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (idx, draft) in drafts.iter().enumerate() {
            let key = (draft.from.min(draft.to), draft.from.max(draft.to));
            groups.entry(key).or_default().push(idx);
        }

        let mut routed: Vec<Option<RoutedEdge>> = vec![None; drafts.len()];
        for (idx, draft) in drafts.iter().enumerate() {
            if routed[idx].is_some() {
                continue;
            }
            let key = (draft.from.min(draft.to), draft.from.max(draft.to));
            let group = &groups[&key];
            if group.len() >= 2 {
                for edge in self.route_parallel_group(drafts, group) {
                    let slot = edge.index;
                    routed[slot] = Some(edge.edge);
                }
            } else {
                let chosen = self.route_single(drafts, idx, &routed, sink);
                routed[idx] = Some(chosen);
            }
        }
        routed.into_iter().map(|edge| edge.expect("all routed")).collect()
    }

    /// Node pairs whose surroundings ended up packed: parallel fans of three
    /// or more, and chords with several foreign paths squeezing past their
    /// midpoint. The engine widens these pairs and re-runs.
    pub(super) fn crowded_pairs(&self, routed: &[RoutedEdge]) -> Vec<(usize, usize)> {
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for edge in routed {
            let key = (
                edge.draft.from.min(edge.draft.to),
                edge.draft.from.max(edge.draft.to),
            );
            *counts.entry(key).or_insert(0) += 1;
        }

        let mut crowded: Vec<(usize, usize)> = Vec::new();
        for (&(a, b), &count) in &counts {
            if count >= CROWDING_PARALLEL_GROUP {
                crowded.push((a, b));
                continue;
            }
            let midpoint = (
                (self.nodes[a].0 + self.nodes[b].0) / 2.0,
                (self.nodes[a].1 + self.nodes[b].1) / 2.0,
            );
            let mut hits = 0usize;
            for edge in routed {
                let foreign = edge.draft.from != a
                    && edge.draft.from != b
                    && edge.draft.to != a
                    && edge.draft.to != b;
                if !foreign {
                    continue;
                }
                let samples = self.flatten(&edge.points);
                if point_polyline_distance(midpoint, &samples) < self.config.clearance_threshold {
                    hits += 1;
                }
            }
            if hits >= CROWDING_MIN_HITS {
                crowded.push((a, b));
            }
        }
        crowded.sort_unstable();
        crowded
    }

    fn route_single(
        &self,
        drafts: &[EdgeDraft],
        idx: usize,
        routed: &[Option<RoutedEdge>],
        sink: &dyn DiagnosticsSink,
    ) -> RoutedEdge {
        let draft = &drafts[idx];
        let start = self.nodes[draft.from];
        let end = self.nodes[draft.to];

        // Preference order doubles as the tie-break: straight beats low arc
        // beats high arc because selection is strictly-less.
        let offsets = [
            0.0,
            self.config.low_arc_height,
            -self.config.low_arc_height,
            self.config.high_arc_height,
            -self.config.high_arc_height,
        ];
        let candidates: Vec<Candidate> = offsets
            .iter()
            .map(|&offset| self.make_candidate(start, end, offset))
            .collect();

        let mut best_idx = 0usize;
        let mut best_score = f32::MAX;
        for (candidate_idx, candidate) in candidates.iter().enumerate() {
            let score = self.score(candidate, draft, drafts, idx, routed);
            if score < best_score {
                best_score = score;
                best_idx = candidate_idx;
            }
        }
        if best_score > self.config.acceptable_score {
            sink.report(LayoutEvent::RouteOverBudget {
                edge: draft.id.to_string(),
                score: best_score,
            });
        }

        self.finish(draft.clone(), candidates[best_idx].clone())
    }

    /// Parallel-branch rule: no straight member; symmetric arcs fanning out
    /// from the chord with alternating sign at odd multiples of the low arc
    /// height (±h, ±3h, ±5h, …), so the first two of any group mirror each
    /// other exactly and neighboring arcs sit a uniform 2h apart.
    fn route_parallel_group(&self, drafts: &[EdgeDraft], group: &[usize]) -> Vec<IndexedEdge> {
        let mut members: Vec<usize> = group.to_vec();
        members.sort_by(|&a, &b| drafts[a].id.cmp(&drafts[b].id));

        let mut out = Vec::with_capacity(members.len());
        for (slot, &edge_idx) in members.iter().enumerate() {
            let draft = &drafts[edge_idx];
            let start = self.nodes[draft.from];
            let end = self.nodes[draft.to];
            let level = (2 * (slot / 2) + 1) as f32;
            let sign = if slot % 2 == 0 { 1.0 } else { -1.0 };
            // Offsets are computed against the canonical endpoint order so
            // opposite-direction parallel branches still fan symmetrically.
            let canonical = if draft.from <= draft.to { 1.0 } else { -1.0 };
            let offset = sign * canonical * self.config.low_arc_height * level;
            let candidate = self.make_candidate(start, end, offset);
            out.push(IndexedEdge {
                index: edge_idx,
                edge: self.finish(draft.clone(), candidate),
            });
        }
        out
    }

    fn make_candidate(&self, start: Point, end: Point, offset: f32) -> Candidate {
        if offset == 0.0 {
            return Candidate {
                points: vec![start, end],
                arc_offset: 0.0,
                samples: vec![start, end],
            };
        }
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let len = (dx * dx + dy * dy).sqrt().max(1e-3);
        let normal = (-dy / len, dx / len);
        let c1 = (
            start.0 + dx / 3.0 + normal.0 * offset,
            start.1 + dy / 3.0 + normal.1 * offset,
        );
        let c2 = (
            start.0 + dx * 2.0 / 3.0 + normal.0 * offset,
            start.1 + dy * 2.0 / 3.0 + normal.1 * offset,
        );
        let points = vec![start, c1, c2, end];
        let samples = self.flatten(&points);
        Candidate {
            points,
            arc_offset: offset,
            samples,
        }
    }

    fn flatten(&self, points: &[Point]) -> Vec<Point> {
        match points {
            [a, c1, c2, b] => {
                let samples = self.config.curve_samples.max(4);
                (0..=samples)
                    .map(|i| bezier_point(*a, *c1, *c2, *b, i as f32 / samples as f32))
                    .collect()
            }
            other => other.to_vec(),
        }
    }

    fn score(
        &self,
        candidate: &Candidate,
        draft: &EdgeDraft,
        drafts: &[EdgeDraft],
        idx: usize,
        routed: &[Option<RoutedEdge>],
    ) -> f32 {
        let cfg = self.config;
        let mut score = 0.0f32;

        // Fixed cost per node the path cuts through.
        for (node_idx, &node) in self.nodes.iter().enumerate() {
            if node_idx == draft.from || node_idx == draft.to {
                continue;
            }
            let mut hit = false;
            for segment in candidate.samples.windows(2) {
                if !line_circle_intersection(segment[0], segment[1], node, cfg.node_clearance_radius)
                    .is_empty()
                {
                    hit = true;
                    break;
                }
            }
            if hit {
                score += cfg.intersection_penalty;
            }
            let clearance =
                point_polyline_distance(node, &candidate.samples) - cfg.node_clearance_radius;
            score += self.proximity_penalty(clearance);
        }

        // Crossings with already-routed paths, and straight chords of edges
        // still waiting their turn.
        for (other_idx, other) in drafts.iter().enumerate() {
            if other_idx == idx {
                continue;
            }
            let shares_node = other.from == draft.from
                || other.from == draft.to
                || other.to == draft.from
                || other.to == draft.to;
            let other_samples: Vec<Point> = match &routed[other_idx] {
                Some(edge) => self.flatten(&edge.points),
                None => vec![self.nodes[other.from], self.nodes[other.to]],
            };
            score +=
                cfg.intersection_penalty * self.count_crossings(candidate, &other_samples) as f32;
            if !shares_node {
                let clearance = polyline_clearance(&candidate.samples, &other_samples);
                score += self.proximity_penalty(clearance);
            }
        }

        if candidate.arc_offset != 0.0 {
            score += cfg.curvature_penalty;
            if self.mirrors_partner(candidate, draft, routed) {
                score -= cfg.symmetry_bonus;
            }
        }
        score
    }

    fn proximity_penalty(&self, clearance: f32) -> f32 {
        let threshold = self.config.clearance_threshold;
        if clearance < threshold {
            self.config.proximity_penalty * (1.0 - clearance.max(0.0) / threshold)
        } else {
            0.0
        }
    }

    fn count_crossings(&self, candidate: &Candidate, other: &[Point]) -> usize {
        let start = candidate.samples[0];
        let end = candidate.samples[candidate.samples.len() - 1];
        let mut crossings = 0usize;
        for segment in candidate.samples.windows(2) {
            for other_segment in other.windows(2) {
                if let Some(hit) =
                    line_intersection(segment[0], segment[1], other_segment[0], other_segment[1])
                {
                    let near_endpoint = distance(hit, start) < ENDPOINT_HIT_EPS
                        || distance(hit, end) < ENDPOINT_HIT_EPS;
                    if !near_endpoint {
                        crossings += 1;
                    }
                }
            }
        }
        crossings
    }

    /// A candidate mirrors its partner when a routed edge spans positions
    /// reflected across the layout's vertical center axis (or the identical
    /// span) and bows by the same height in the opposite direction.
    fn mirrors_partner(
        &self,
        candidate: &Candidate,
        draft: &EdgeDraft,
        routed: &[Option<RoutedEdge>],
    ) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let axis = self.nodes.iter().map(|p| p.0).sum::<f32>() / self.nodes.len() as f32;
        let reflect = |p: Point| (2.0 * axis - p.0, p.1);
        let start = self.nodes[draft.from];
        let end = self.nodes[draft.to];

        for edge in routed.iter().flatten() {
            if edge.arc_offset == 0.0 {
                continue;
            }
            if (edge.arc_offset.abs() - candidate.arc_offset.abs()).abs() > MIRROR_OFFSET_EPS {
                continue;
            }
            let other_start = self.nodes[edge.draft.from];
            let other_end = self.nodes[edge.draft.to];
            let same_span = points_match(other_start, start) && points_match(other_end, end);
            let mirrored_span = (points_match(reflect(other_start), start)
                && points_match(reflect(other_end), end))
                || (points_match(reflect(other_start), end)
                    && points_match(reflect(other_end), start));
            if same_span && edge.arc_offset == -candidate.arc_offset {
                return true;
            }
            if mirrored_span && edge.arc_offset.signum() != candidate.arc_offset.signum() {
                return true;
            }
        }
        false
    }

    fn finish(&self, draft: EdgeDraft, candidate: Candidate) -> RoutedEdge {
        let arrow = match candidate.points.as_slice() {
            [a, c1, c2, b] => {
                let mid = bezier_point(*a, *c1, *c2, *b, 0.5);
                ArrowPose {
                    x: mid.0,
                    y: mid.1,
                    angle: bezier_tangent_angle(*a, *c1, *c2, *b, 0.5),
                }
            }
            [a, b] => ArrowPose {
                x: (a.0 + b.0) / 2.0,
                y: (a.1 + b.1) / 2.0,
                angle: (b.1 - a.1).atan2(b.0 - a.0),
            },
            _ => ArrowPose {
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            },
        };
        RoutedEdge {
            draft,
            is_curved: candidate.arc_offset != 0.0,
            points: candidate.points,
            arrow,
            arc_offset: candidate.arc_offset,
        }
    }
}

struct IndexedEdge {
    index: usize,
    edge: RoutedEdge,
}

fn distance(a: Point, b: Point) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn polyline_clearance(a: &[Point], b: &[Point]) -> f32 {
    let mut best = f32::MAX;
    for &point in a {
        best = best.min(point_polyline_distance(point, b));
    }
    for &point in b {
        best = best.min(point_polyline_distance(point, a));
    }
    best
}

fn points_match(a: Point, b: Point) -> bool {
    (a.0 - b.0).abs() < MIRROR_MATCH_EPS && (a.1 - b.1).abs() < MIRROR_MATCH_EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingConfig;
    use crate::diag::NullSink;

    fn draft(id: &str, from: usize, to: usize) -> EdgeDraft {
        EdgeDraft {
            id: BranchId::new(id),
            from,
            to,
        }
    }

    #[test]
    fn lone_edge_routes_straight() {
        let config = RoutingConfig::default();
        let nodes = [(0.0, 0.0), (200.0, 0.0)];
        let router = EdgeRouter::new(&config, &nodes);
        let routed = router.route(&[draft("b1", 0, 1)], &NullSink);
        assert_eq!(routed.len(), 1);
        assert!(!routed[0].is_curved);
        assert_eq!(routed[0].points, vec![(0.0, 0.0), (200.0, 0.0)]);
        assert_eq!(routed[0].arrow.x, 100.0);
        assert_eq!(routed[0].arrow.y, 0.0);
    }

    #[test]
    fn parallel_pair_bows_both_ways() {
        let config = RoutingConfig::default();
        let nodes = [(0.0, 0.0), (200.0, 0.0)];
        let router = EdgeRouter::new(&config, &nodes);
        let routed = router.route(&[draft("b1", 0, 1), draft("b2", 1, 0)], &NullSink);
        assert!(routed.iter().all(|edge| edge.is_curved));
        // Apexes must mirror geometrically across the shared chord (the
        // x-axis here), whichever direction each branch points.
        let apex_ys: Vec<f32> = routed
            .iter()
            .map(|edge| {
                let [a, c1, c2, b] = edge.points.as_slice() else {
                    panic!("expected cubic control polygon");
                };
                bezier_point(*a, *c1, *c2, *b, 0.5).1
            })
            .collect();
        assert!(
            (apex_ys[0] + apex_ys[1]).abs() < 1e-3,
            "apexes {apex_ys:?} not mirrored"
        );
    }

    #[test]
    fn parallel_fan_spaces_arcs_evenly() {
        let config = RoutingConfig::default();
        let nodes = [(0.0, 0.0), (200.0, 0.0)];
        let router = EdgeRouter::new(&config, &nodes);
        for count in [3usize, 4] {
            let drafts: Vec<EdgeDraft> =
                (1..=count).map(|i| draft(&format!("b{i}"), 0, 1)).collect();
            let routed = router.route(&drafts, &NullSink);
            let mut offsets: Vec<f32> = routed.iter().map(|edge| edge.arc_offset).collect();
            offsets.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert!(offsets.iter().all(|&offset| offset != 0.0));
            let gaps: Vec<f32> = offsets.windows(2).map(|pair| pair[1] - pair[0]).collect();
            for gap in &gaps {
                assert!(
                    (gap - gaps[0]).abs() < 1e-3,
                    "uneven fan gaps for {count} members: {gaps:?}"
                );
            }
        }
    }

    #[test]
    fn blocking_node_forces_an_arc() {
        let config = RoutingConfig::default();
        // Node 2 sits dead center on the straight chord.
        let nodes = [(0.0, 0.0), (200.0, 0.0), (100.0, 0.0)];
        let router = EdgeRouter::new(&config, &nodes);
        let routed = router.route(&[draft("b1", 0, 1)], &NullSink);
        assert!(routed[0].is_curved);
    }

    #[test]
    fn over_budget_route_is_reported_not_failed() {
        let mut config = RoutingConfig::default();
        config.acceptable_score = 0.5;
        let nodes = [(0.0, 0.0), (200.0, 0.0), (100.0, 4.0), (100.0, -4.0)];
        let router = EdgeRouter::new(&config, &nodes);
        let sink = crate::diag::RecordingSink::new();
        let routed = router.route(&[draft("b1", 0, 1)], &sink);
        assert_eq!(routed.len(), 1);
        assert!(sink
            .events()
            .iter()
            .any(|event| matches!(event, LayoutEvent::RouteOverBudget { .. })));
    }

    #[test]
    fn curved_arrow_sits_on_the_curve_midpoint() {
        let config = RoutingConfig::default();
        let nodes = [(0.0, 0.0), (200.0, 0.0)];
        let router = EdgeRouter::new(&config, &nodes);
        let routed = router.route(&[draft("b1", 0, 1), draft("b2", 0, 1)], &NullSink);
        for edge in &routed {
            let [a, c1, c2, b] = edge.points.as_slice() else {
                panic!("expected cubic control polygon");
            };
            let mid = bezier_point(*a, *c1, *c2, *b, 0.5);
            assert!((edge.arrow.x - mid.0).abs() < 1e-3);
            assert!((edge.arrow.y - mid.1).abs() < 1e-3);
        }
    }
}
