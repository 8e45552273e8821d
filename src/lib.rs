pub mod config;
pub mod diag;
pub mod geometry;
pub mod graph;
pub mod layout;

pub use config::{LayoutConfig, load_config};
pub use diag::{DiagnosticsSink, LayoutEvent, LogSink, NullSink, RecordingSink};
pub use graph::{AnalysisGraph, Branch, BranchId, BranchKind, ElectricalNode, NodeId, SpanningTree};
pub use layout::{
    ArrowPose, BoundingBox, GraphLayoutEngine, LayoutEdge, LayoutError, LayoutNode,
    RenderableGraph, compute_layout,
};
