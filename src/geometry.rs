//! Pure geometry helpers shared by routing and label placement.
//!
//! Every function is total over finite inputs: degenerate cases return
//! `None` / an empty vector / a clamped value instead of panicking.

pub type Point = (f32, f32);

const PARALLEL_EPS: f32 = 1e-6;

/// Intersection of segments `p1..p2` and `p3..p4`.
///
/// Returns `None` when the segments are parallel or collinear, or when the
/// parametric intersection falls outside either segment's `[0, 1]` range.
pub fn line_intersection(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<Point> {
    let d1 = (p2.0 - p1.0, p2.1 - p1.1);
    let d2 = (p4.0 - p3.0, p4.1 - p3.1);
    let denom = d1.0 * d2.1 - d1.1 * d2.0;
    if denom.abs() < PARALLEL_EPS {
        return None;
    }
    let q = (p3.0 - p1.0, p3.1 - p1.1);
    let t = (q.0 * d2.1 - q.1 * d2.0) / denom;
    let u = (q.0 * d1.1 - q.1 * d1.0) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some((p1.0 + d1.0 * t, p1.1 + d1.1 * t))
}

/// Intersections of segment `a..b` with the circle at `center`.
///
/// Returns 0, 1, or 2 points, ordered by the segment parameter. An empty
/// vector (never `None`) keeps call sites iterating without branching.
pub fn line_circle_intersection(a: Point, b: Point, center: Point, radius: f32) -> Vec<Point> {
    let d = (b.0 - a.0, b.1 - a.1);
    let f = (a.0 - center.0, a.1 - center.1);
    let qa = d.0 * d.0 + d.1 * d.1;
    if qa < PARALLEL_EPS {
        return Vec::new();
    }
    let qb = 2.0 * (f.0 * d.0 + f.1 * d.1);
    let qc = f.0 * f.0 + f.1 * f.1 - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return Vec::new();
    }
    let sqrt_disc = disc.sqrt();
    let mut out = Vec::new();
    for t in [(-qb - sqrt_disc) / (2.0 * qa), (-qb + sqrt_disc) / (2.0 * qa)] {
        if (0.0..=1.0).contains(&t) {
            let point = (a.0 + d.0 * t, a.1 + d.1 * t);
            if out.last() != Some(&point) {
                out.push(point);
            }
        }
    }
    out
}

/// Cubic Bezier position at parameter `t`.
pub fn bezier_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let s = 1.0 - t;
    let b0 = s * s * s;
    let b1 = 3.0 * s * s * t;
    let b2 = 3.0 * s * t * t;
    let b3 = t * t * t;
    (
        b0 * p0.0 + b1 * p1.0 + b2 * p2.0 + b3 * p3.0,
        b0 * p0.1 + b1 * p1.1 + b2 * p2.1 + b3 * p3.1,
    )
}

/// Tangent direction of a cubic Bezier at parameter `t`, in radians.
pub fn bezier_tangent_angle(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> f32 {
    let s = 1.0 - t;
    let dx = 3.0 * s * s * (p1.0 - p0.0) + 6.0 * s * t * (p2.0 - p1.0) + 3.0 * t * t * (p3.0 - p2.0);
    let dy = 3.0 * s * s * (p1.1 - p0.1) + 6.0 * s * t * (p2.1 - p1.1) + 3.0 * t * t * (p3.1 - p2.1);
    dy.atan2(dx)
}

/// Distance from `point` to segment `a..b`, clamped to the endpoints when the
/// perpendicular foot falls outside the segment.
pub fn point_segment_distance(point: Point, a: Point, b: Point) -> f32 {
    let d = (b.0 - a.0, b.1 - a.1);
    let len_sq = d.0 * d.0 + d.1 * d.1;
    let t = if len_sq < PARALLEL_EPS {
        0.0
    } else {
        (((point.0 - a.0) * d.0 + (point.1 - a.1) * d.1) / len_sq).clamp(0.0, 1.0)
    };
    let foot = (a.0 + d.0 * t, a.1 + d.1 * t);
    ((point.0 - foot.0).powi(2) + (point.1 - foot.1).powi(2)).sqrt()
}

/// Minimum distance between `point` and an open polyline.
pub fn point_polyline_distance(point: Point, points: &[Point]) -> f32 {
    let mut best = f32::MAX;
    for segment in points.windows(2) {
        best = best.min(point_segment_distance(point, segment[0], segment[1]));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4
    }

    #[test]
    fn crossing_segments_intersect() {
        let hit = line_intersection((0.0, 0.0), (10.0, 10.0), (0.0, 10.0), (10.0, 0.0));
        assert!(close(hit.unwrap(), (5.0, 5.0)));
    }

    #[test]
    fn line_intersection_is_symmetric() {
        let a = line_intersection((0.0, 0.0), (10.0, 4.0), (2.0, 8.0), (8.0, -2.0));
        let b = line_intersection((2.0, 8.0), (8.0, -2.0), (0.0, 0.0), (10.0, 4.0));
        assert!(close(a.unwrap(), b.unwrap()));
    }

    #[test]
    fn parallel_segments_miss() {
        assert!(line_intersection((0.0, 0.0), (10.0, 0.0), (0.0, 1.0), (10.0, 1.0)).is_none());
    }

    #[test]
    fn disjoint_segments_miss() {
        // Lines cross at (5,5) but the second segment stops short of it.
        assert!(line_intersection((0.0, 0.0), (10.0, 10.0), (0.0, 10.0), (4.0, 6.0)).is_none());
    }

    #[test]
    fn secant_chord_hits_circle_twice() {
        let hits = line_circle_intersection((-10.0, 0.0), (10.0, 0.0), (0.0, 0.0), 5.0);
        assert_eq!(hits.len(), 2);
        assert!(close(hits[0], (-5.0, 0.0)));
        assert!(close(hits[1], (5.0, 0.0)));
    }

    #[test]
    fn distant_segment_misses_circle() {
        let hits = line_circle_intersection((-10.0, 9.0), (10.0, 9.0), (0.0, 0.0), 5.0);
        assert!(hits.is_empty());
    }

    #[test]
    fn bezier_endpoints_match_control_points() {
        let (p0, p1, p2, p3) = ((0.0, 0.0), (10.0, 20.0), (30.0, 20.0), (40.0, 0.0));
        assert!(close(bezier_point(p0, p1, p2, p3, 0.0), p0));
        assert!(close(bezier_point(p0, p1, p2, p3, 1.0), p3));
    }

    #[test]
    fn symmetric_bezier_midpoint_tangent_is_flat() {
        let angle =
            bezier_tangent_angle((0.0, 0.0), (10.0, 20.0), (30.0, 20.0), (40.0, 0.0), 0.5);
        assert!(angle.abs() < 1e-4);
    }

    #[test]
    fn point_segment_distance_clamps_to_endpoints() {
        let d = point_segment_distance((-3.0, 4.0), (0.0, 0.0), (10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-4);
        let d = point_segment_distance((5.0, 4.0), (0.0, 0.0), (10.0, 0.0));
        assert!((d - 4.0).abs() < 1e-4);
    }
}
