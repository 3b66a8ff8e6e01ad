//! Error types for permtree

use serde::Serialize;

/// The main error type for permtree operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("structure load failed: {0}")]
    StructureLoad(String),

    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("no permission structure available")]
    NoSnapshot,

    #[error("invalid config: {0}")]
    Config(String),

    #[error("store: {0}")]
    Store(String),

    #[error("store not initialized")]
    NotInitialized,

    #[error("store already initialized at {0}")]
    AlreadyInitialized(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for permtree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Convert any storage error to Error::Store
pub fn err<E: std::error::Error>(e: E) -> Error {
    Error::Store(e.to_string())
}

/// Why a reference could not be honoured against the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceIssue {
    /// The node id is not part of the snapshot
    UnknownNode,
    /// The node exists but does not declare the action
    UndeclaredAction,
    /// A flat permission id matched nothing
    UnknownPermission,
}

/// A dangling reference that was skipped instead of failing the whole operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnresolvedReference {
    pub reference: String,
    pub issue: ReferenceIssue,
}

impl UnresolvedReference {
    pub fn new(reference: impl Into<String>, issue: ReferenceIssue) -> Self {
        UnresolvedReference { reference: reference.into(), issue }
    }
}

impl std::fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.issue {
            ReferenceIssue::UnknownNode => "unknown node",
            ReferenceIssue::UndeclaredAction => "undeclared action",
            ReferenceIssue::UnknownPermission => "unknown permission",
        };
        write!(f, "{} ({})", self.reference, what)
    }
}
