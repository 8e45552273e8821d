use serde::Serialize;

use crate::geometry::Point;
use crate::graph::{BranchId, NodeId};

/// Axis-aligned box used for collision tests. Transient; never emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered(center: Point, width: f32, height: f32) -> Self {
        Self {
            x: center.0 - width / 2.0,
            y: center.1 - height / 2.0,
            width,
            height,
        }
    }

    /// Strict AABB overlap; touching edges (zero-area contact) do not count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    pub fn overlap_area(&self, other: &BoundingBox) -> f32 {
        let w = (self.x + self.width).min(other.x + other.width) - self.x.max(other.x);
        let h = (self.y + self.height).min(other.y + other.height) - self.y.max(other.y);
        if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
    }
}

/// Midpoint pose used to draw the branch's orientation arrow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowPose {
    pub x: f32,
    pub y: f32,
    /// Tangent angle at the curve midpoint, radians.
    pub angle: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutNode {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub label: String,
    /// Center of the label box; set by the label optimizer.
    pub label_pos: Point,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutEdge {
    pub id: BranchId,
    pub from: NodeId,
    pub to: NodeId,
    /// Control polygon: `[start, end]` for straight edges,
    /// `[start, c1, c2, end]` for cubic Beziers.
    pub points: Vec<Point>,
    /// Serialized SVG path data matching `points`.
    pub path: String,
    pub arrow: ArrowPose,
    pub label: String,
    /// Center of the label box; set by the label optimizer.
    pub label_pos: Point,
    pub is_curved: bool,
}

impl LayoutEdge {
    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }
}

/// Serialize a control polygon as SVG path data.
pub(crate) fn path_data(points: &[Point]) -> String {
    match points {
        [a, b] => format!("M {} {} L {} {}", a.0, a.1, b.0, b.1),
        [a, c1, c2, b] => format!(
            "M {} {} C {} {}, {} {}, {} {}",
            a.0, a.1, c1.0, c1.1, c2.0, c2.1, b.0, b.1
        ),
        _ => {
            let mut out = String::new();
            for (idx, point) in points.iter().enumerate() {
                let cmd = if idx == 0 { 'M' } else { 'L' };
                out.push_str(&format!("{}{} {} ", cmd, point.0, point.1));
            }
            out.trim_end().to_string()
        }
    }
}

/// Final product of the pipeline; the SVG renderer consumes this verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct RenderableGraph {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}
