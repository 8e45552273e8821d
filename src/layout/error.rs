use thiserror::Error;

/// The one fatal condition: malformed input topology. Every quality-related
/// shortfall degrades gracefully instead (see `crate::diag`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("branch {branch} references missing node {node}")]
    DanglingEndpoint { branch: String, node: String },
    #[error("branch {branch} is a self-loop; two-terminal elements need distinct endpoints")]
    SelfLoop { branch: String },
    #[error("duplicate node id {0}")]
    DuplicateNode(String),
    #[error("duplicate branch id {0}")]
    DuplicateBranch(String),
}
