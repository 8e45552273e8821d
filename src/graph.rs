//! Input model for the layout pipeline.
//!
//! Produced by the circuit editor / analysis subsystem; read-only here.

use std::fmt;

use serde::Serialize;

/// Identifier of an electrical node (a junction in the circuit).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of a branch (a two-terminal component).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BranchId(String);

impl BranchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BranchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BranchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Resistor,
    VoltageSource,
    /// Controlled sources are not part of the passive topology graph; the
    /// engine drops these before placement and they never appear in outputs.
    CurrentSource,
}

#[derive(Debug, Clone)]
pub struct ElectricalNode {
    pub id: NodeId,
}

impl ElectricalNode {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub kind: BranchKind,
    pub value: f32,
    pub from: NodeId,
    pub to: NodeId,
}

impl Branch {
    pub fn new(
        id: impl Into<BranchId>,
        kind: BranchKind,
        value: f32,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            value,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Display string shown next to the routed edge, e.g. `R1 = 4.7 Ω`.
    pub fn display_label(&self) -> String {
        let unit = match self.kind {
            BranchKind::Resistor => "Ω",
            BranchKind::VoltageSource => "V",
            BranchKind::CurrentSource => "A",
        };
        format!("{} = {} {}", self.id, format_value(self.value), unit)
    }
}

fn format_value(value: f32) -> String {
    if value == value.trunc() && value.abs() < 1e6 {
        format!("{}", value as i64)
    } else {
        let mut text = format!("{value:.3}");
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
        text
    }
}

/// A spanning tree over the branch set. Read by the renderer for styling
/// (twig vs link strokes); the layout geometry ignores it.
#[derive(Debug, Clone)]
pub struct SpanningTree {
    pub id: String,
    pub twigs: Vec<BranchId>,
    pub links: Vec<BranchId>,
}

/// The abstract circuit graph handed to the layout engine.
#[derive(Debug, Clone, Default)]
pub struct AnalysisGraph {
    pub nodes: Vec<ElectricalNode>,
    pub branches: Vec<Branch>,
    pub selected_tree: Option<String>,
    pub trees: Vec<SpanningTree>,
}

impl AnalysisGraph {
    pub fn new(nodes: Vec<ElectricalNode>, branches: Vec<Branch>) -> Self {
        Self {
            nodes,
            branches,
            selected_tree: None,
            trees: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_label_trims_trailing_zeros() {
        let branch = Branch::new("R1", BranchKind::Resistor, 4.7, "n1", "n2");
        assert_eq!(branch.display_label(), "R1 = 4.7 Ω");
        let branch = Branch::new("V1", BranchKind::VoltageSource, 9.0, "n1", "n2");
        assert_eq!(branch.display_label(), "V1 = 9 V");
    }
}
