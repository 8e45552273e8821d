//! Node placement: a spring relaxation pass followed by the cleanup passes
//! (grid snap, axis alignment, mirror symmetry, star distribution, centering)
//! that turn a force layout into a textbook-looking schematic.

use std::collections::HashMap;
use std::f32::consts::TAU;

use crate::config::PlacementConfig;
use crate::diag::{DiagnosticsSink, LayoutEvent};
use crate::geometry::Point;

/// Minimum pair distance used when evaluating repulsion; closer pairs are
/// treated as being this far apart so the force stays bounded.
const REPULSION_MIN_DISTANCE: f32 = 12.0;
/// Largest displacement a single iteration may apply to one node.
const MAX_STEP: f32 = 40.0;
/// Seed circle never collapses below this radius.
const SEED_RADIUS_MIN: f32 = 60.0;
/// Two mirror-pair candidates must straddle the axis by at least this much.
const MIRROR_MIN_SPREAD: f32 = 1.0;

/// Rest-length multipliers per unordered node-index pair; raised by crowding
/// relief between engine passes. Missing pairs mean 1.0.
#[derive(Debug, Clone, Default)]
pub(super) struct RestLengths {
    multipliers: HashMap<(usize, usize), f32>,
}

impl RestLengths {
    pub(super) fn get(&self, a: usize, b: usize) -> f32 {
        let key = (a.min(b), a.max(b));
        self.multipliers.get(&key).copied().unwrap_or(1.0)
    }

    pub(super) fn grow(&mut self, a: usize, b: usize, factor: f32) {
        let key = (a.min(b), a.max(b));
        let entry = self.multipliers.entry(key).or_insert(1.0);
        *entry *= factor;
    }
}

pub(super) struct NodePlacer<'a> {
    config: &'a PlacementConfig,
    viewport: Point,
}

impl<'a> NodePlacer<'a> {
    pub(super) fn new(config: &'a PlacementConfig, viewport: Point) -> Self {
        Self { config, viewport }
    }

    /// Compute one position per node. `links` holds node-index pairs, one per
    /// surviving branch; `degrees` one entry per node. Never fails: a
    /// non-convergent relaxation keeps its last state and reports it.
    pub(super) fn place(
        &self,
        node_count: usize,
        links: &[(usize, usize)],
        degrees: &[usize],
        rest: &RestLengths,
        sink: &dyn DiagnosticsSink,
    ) -> Vec<Point> {
        if node_count == 0 {
            return Vec::new();
        }
        let center = (self.viewport.0 / 2.0, self.viewport.1 / 2.0);
        if node_count == 1 {
            return vec![center];
        }

        let mut positions = self.seed_circle(node_count, center);
        self.relax(&mut positions, links, degrees, rest, center, sink);
        self.snap_to_grid(&mut positions);
        self.align_axes(&mut positions);
        self.mirror_symmetry(&mut positions, links, degrees);
        self.distribute_stars(&mut positions, links, degrees, rest);
        self.center(&mut positions, center);
        positions
    }

    /// Deterministic seed: nodes in id order around a circle. No PRNG means
    /// the fixed-seed determinism requirement holds trivially.
    fn seed_circle(&self, node_count: usize, center: Point) -> Vec<Point> {
        let radius = (self.config.link_distance * node_count as f32 / TAU).max(SEED_RADIUS_MIN);
        (0..node_count)
            .map(|idx| {
                let angle = TAU * idx as f32 / node_count as f32;
                (
                    center.0 + radius * angle.cos(),
                    center.1 + radius * angle.sin(),
                )
            })
            .collect()
    }

    fn relax(
        &self,
        positions: &mut [Point],
        links: &[(usize, usize)],
        degrees: &[usize],
        rest: &RestLengths,
        center: Point,
        sink: &dyn DiagnosticsSink,
    ) {
        let cfg = self.config;
        let mut step = cfg.initial_step;
        let mut forces = vec![(0.0f32, 0.0f32); positions.len()];

        for iteration in 0..cfg.max_iterations {
            for force in forces.iter_mut() {
                *force = (0.0, 0.0);
            }

            // Spring force toward the per-pair rest length.
            for &(a, b) in links {
                let (dx, dy) = (
                    positions[b].0 - positions[a].0,
                    positions[b].1 - positions[a].1,
                );
                let dist = (dx * dx + dy * dy).sqrt().max(1e-3);
                let target = cfg.link_distance * rest.get(a, b);
                let pull = (dist - target) / dist * 0.5;
                forces[a].0 += dx * pull;
                forces[a].1 += dy * pull;
                forces[b].0 -= dx * pull;
                forces[b].1 -= dy * pull;
            }

            // Inverse-square many-body repulsion over all pairs.
            for i in 0..positions.len() {
                for j in (i + 1)..positions.len() {
                    let (dx, dy) = (
                        positions[i].0 - positions[j].0,
                        positions[i].1 - positions[j].1,
                    );
                    let dist = (dx * dx + dy * dy).sqrt().max(REPULSION_MIN_DISTANCE);
                    let push = cfg.repulsion_strength / (dist * dist);
                    let (ux, uy) = (dx / dist, dy / dist);
                    forces[i].0 += ux * push;
                    forces[i].1 += uy * push;
                    forces[j].0 -= ux * push;
                    forces[j].1 -= uy * push;
                }
            }

            // Viewport centering plus degree-weighted centroid attraction:
            // high-degree nodes migrate inward, which is what pulls hubs to
            // the middle of the finished drawing.
            let centroid = centroid(positions);
            for (idx, position) in positions.iter().enumerate() {
                forces[idx].0 += (center.0 - position.0) * cfg.center_strength;
                forces[idx].1 += (center.1 - position.1) * cfg.center_strength;
                let weight = cfg.degree_attraction * degrees[idx] as f32;
                forces[idx].0 += (centroid.0 - position.0) * weight;
                forces[idx].1 += (centroid.1 - position.1) * weight;
            }

            let mut residual = 0.0f32;
            for (position, force) in positions.iter_mut().zip(forces.iter()) {
                let mut dx = force.0 * step;
                let mut dy = force.1 * step;
                let magnitude = (dx * dx + dy * dy).sqrt();
                if magnitude > MAX_STEP {
                    let scale = MAX_STEP / magnitude;
                    dx *= scale;
                    dy *= scale;
                }
                position.0 += dx;
                position.1 += dy;
                residual = residual.max((dx * dx + dy * dy).sqrt());
            }
            step *= cfg.step_decay;

            if residual < cfg.convergence_eps {
                return;
            }
            if iteration + 1 == cfg.max_iterations {
                sink.report(LayoutEvent::PlacementNotConverged {
                    iterations: cfg.max_iterations,
                    residual,
                });
            }
        }
    }

    fn snap_to_grid(&self, positions: &mut [Point]) {
        let unit = self.config.snap_unit.max(1.0);
        for position in positions.iter_mut() {
            position.0 = (position.0 / unit).round() * unit;
            position.1 = (position.1 / unit).round() * unit;
        }
    }

    /// Collapse almost-shared rows and columns to exactly shared coordinates.
    fn align_axes(&self, positions: &mut [Point]) {
        let tolerance = self.config.align_tolerance;
        align_coordinate(positions, tolerance, Axis::X);
        align_coordinate(positions, tolerance, Axis::Y);
    }

    /// Reflect structurally equivalent node pairs across the layout's
    /// vertical center axis. Equivalence is a cheap signature (own degree +
    /// sorted neighbor degrees); only unambiguous two-node signature groups
    /// participate.
    fn mirror_symmetry(&self, positions: &mut [Point], links: &[(usize, usize)], degrees: &[usize]) {
        let mut neighbor_degrees: Vec<Vec<usize>> = vec![Vec::new(); positions.len()];
        for &(a, b) in links {
            neighbor_degrees[a].push(degrees[b]);
            neighbor_degrees[b].push(degrees[a]);
        }
        for list in neighbor_degrees.iter_mut() {
            list.sort_unstable();
        }

        let mut groups: HashMap<(usize, Vec<usize>), Vec<usize>> = HashMap::new();
        for idx in 0..positions.len() {
            groups
                .entry((degrees[idx], neighbor_degrees[idx].clone()))
                .or_default()
                .push(idx);
        }

        let axis = positions.iter().map(|p| p.0).sum::<f32>() / positions.len() as f32;
        let mut pairs: Vec<(usize, usize)> = groups
            .into_values()
            .filter(|group| group.len() == 2)
            .map(|group| (group[0], group[1]))
            .collect();
        pairs.sort_unstable();

        for (a, b) in pairs {
            let (left, right) = if positions[a].0 <= positions[b].0 {
                (a, b)
            } else {
                (b, a)
            };
            // Only fold pairs that already straddle the axis; anything else
            // is symmetric in topology but not in the relaxed drawing.
            if positions[left].0 + MIRROR_MIN_SPREAD >= axis
                || positions[right].0 - MIRROR_MIN_SPREAD <= axis
            {
                continue;
            }
            positions[right].0 = 2.0 * axis - positions[left].0;
            if (positions[right].1 - positions[left].1).abs() <= self.config.align_tolerance * 2.0 {
                positions[right].1 = positions[left].1;
            }
        }
    }

    /// Spread degree-1 leaves of a common hub at equal angular increments.
    fn distribute_stars(
        &self,
        positions: &mut [Point],
        links: &[(usize, usize)],
        degrees: &[usize],
        rest: &RestLengths,
    ) {
        let mut leaves_by_hub: HashMap<usize, Vec<usize>> = HashMap::new();
        for &(a, b) in links {
            if degrees[a] == 1 && degrees[b] > 1 {
                leaves_by_hub.entry(b).or_default().push(a);
            } else if degrees[b] == 1 && degrees[a] > 1 {
                leaves_by_hub.entry(a).or_default().push(b);
            }
        }

        let mut hubs: Vec<usize> = leaves_by_hub.keys().copied().collect();
        hubs.sort_unstable();
        for hub in hubs {
            let mut leaves = leaves_by_hub.remove(&hub).unwrap_or_default();
            if leaves.len() < 2 {
                continue;
            }
            leaves.sort_unstable();
            let hub_pos = positions[hub];
            let first = positions[leaves[0]];
            let base_angle = (first.1 - hub_pos.1).atan2(first.0 - hub_pos.0);
            let step = TAU / leaves.len() as f32;
            for (slot, &leaf) in leaves.iter().enumerate() {
                let radius = self.config.link_distance * rest.get(hub, leaf);
                let angle = base_angle + step * slot as f32;
                positions[leaf] = (
                    hub_pos.0 + radius * angle.cos(),
                    hub_pos.1 + radius * angle.sin(),
                );
            }
        }
    }

    fn center(&self, positions: &mut [Point], center: Point) {
        let mut min = (f32::MAX, f32::MAX);
        let mut max = (f32::MIN, f32::MIN);
        for position in positions.iter() {
            min.0 = min.0.min(position.0);
            min.1 = min.1.min(position.1);
            max.0 = max.0.max(position.0);
            max.1 = max.1.max(position.1);
        }
        let shift = (
            center.0 - (min.0 + max.0) / 2.0,
            center.1 - (min.1 + max.1) / 2.0,
        );
        for position in positions.iter_mut() {
            position.0 += shift.0;
            position.1 += shift.1;
        }
    }
}

fn centroid(positions: &[Point]) -> Point {
    let mut sum = (0.0f32, 0.0f32);
    for position in positions {
        sum.0 += position.0;
        sum.1 += position.1;
    }
    (
        sum.0 / positions.len() as f32,
        sum.1 / positions.len() as f32,
    )
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn get(self, point: Point) -> f32 {
        match self {
            Axis::X => point.0,
            Axis::Y => point.1,
        }
    }

    fn set(self, point: &mut Point, value: f32) {
        match self {
            Axis::X => point.0 = value,
            Axis::Y => point.1 = value,
        }
    }
}

/// Greedy 1D clustering: sorted coordinate values within `tolerance` of the
/// running cluster head collapse to the cluster mean.
fn align_coordinate(positions: &mut [Point], tolerance: f32, axis: Axis) {
    let mut order: Vec<usize> = (0..positions.len()).collect();
    order.sort_by(|&a, &b| {
        axis.get(positions[a])
            .partial_cmp(&axis.get(positions[b]))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut cluster: Vec<usize> = Vec::new();
    let mut cluster_head = f32::MIN;
    fn flush(cluster: &mut Vec<usize>, positions: &mut [Point], axis: Axis) {
        if cluster.len() > 1 {
            let mean = cluster
                .iter()
                .map(|&idx| axis.get(positions[idx]))
                .sum::<f32>()
                / cluster.len() as f32;
            for &idx in cluster.iter() {
                axis.set(&mut positions[idx], mean);
            }
        }
        cluster.clear();
    }

    for idx in order {
        let value = axis.get(positions[idx]);
        if cluster.is_empty() || (value - cluster_head).abs() <= tolerance {
            if cluster.is_empty() {
                cluster_head = value;
            }
            cluster.push(idx);
        } else {
            flush(&mut cluster, positions, axis);
            cluster_head = value;
            cluster.push(idx);
        }
    }
    flush(&mut cluster, positions, axis);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::NullSink;

    fn place(
        node_count: usize,
        links: &[(usize, usize)],
        config: &PlacementConfig,
    ) -> Vec<Point> {
        let mut degrees = vec![0usize; node_count];
        for &(a, b) in links {
            degrees[a] += 1;
            degrees[b] += 1;
        }
        NodePlacer::new(config, (800.0, 600.0)).place(
            node_count,
            links,
            &degrees,
            &RestLengths::default(),
            &NullSink,
        )
    }

    #[test]
    fn placement_is_deterministic() {
        let config = PlacementConfig::default();
        let links = [(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)];
        let a = place(4, &links, &config);
        let b = place(4, &links, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn every_node_gets_a_finite_position() {
        let config = PlacementConfig::default();
        let links = [(0, 1), (1, 2), (2, 0)];
        let positions = place(3, &links, &config);
        assert_eq!(positions.len(), 3);
        for (x, y) in positions {
            assert!(x.is_finite() && y.is_finite());
        }
    }

    #[test]
    fn star_leaves_sit_at_equal_angles() {
        let config = PlacementConfig::default();
        let links = [(0, 1), (0, 2), (0, 3), (0, 4)];
        let positions = place(5, &links, &config);
        let hub = positions[0];
        let mut angles: Vec<f32> = positions[1..]
            .iter()
            .map(|leaf| (leaf.1 - hub.1).atan2(leaf.0 - hub.0))
            .collect();
        angles.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for window in angles.windows(2) {
            let gap = (window[1] - window[0]).to_degrees();
            assert!((gap - 90.0).abs() < 10.0, "gap {gap} not ~90 degrees");
        }
    }

    #[test]
    fn signature_pairs_reflect_across_the_center_axis() {
        let config = PlacementConfig::default();
        let placer = NodePlacer::new(&config, (800.0, 600.0));
        // Path graph: the two ends share a signature, so do the two middles.
        let links = [(0, 1), (1, 2), (2, 3)];
        let degrees = [1, 2, 2, 1];
        let mut positions = vec![(0.0, 0.0), (100.0, 0.0), (210.0, 10.0), (320.0, 4.0)];
        placer.mirror_symmetry(&mut positions, &links, &degrees);

        let axis = 157.5; // mean x of the inputs
        assert_eq!(positions[3].0, 2.0 * axis - positions[0].0);
        assert_eq!(positions[2].0, 2.0 * axis - positions[1].0);
        // Near-equal heights collapse to the left partner's.
        assert_eq!(positions[3].1, positions[0].1);
        assert_eq!(positions[2].1, positions[1].1);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let mut config = PlacementConfig::default();
        config.max_iterations = 2;
        config.convergence_eps = 0.0;
        let sink = crate::diag::RecordingSink::new();
        let degrees = vec![1, 1];
        NodePlacer::new(&config, (800.0, 600.0)).place(
            2,
            &[(0, 1)],
            &degrees,
            &RestLengths::default(),
            &sink,
        );
        assert!(sink.events().iter().any(|event| matches!(
            event,
            LayoutEvent::PlacementNotConverged { iterations: 2, .. }
        )));
    }

    #[test]
    fn coordinates_align_within_tolerance() {
        let mut positions = vec![(100.0, 40.0), (108.0, 200.0), (300.0, 204.0)];
        align_coordinate(&mut positions, 12.0, Axis::X);
        assert_eq!(positions[0].0, positions[1].0);
        align_coordinate(&mut positions, 12.0, Axis::Y);
        assert_eq!(positions[1].1, positions[2].1);
    }
}
