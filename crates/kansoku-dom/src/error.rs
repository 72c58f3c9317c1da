use std::time::Duration;

use thiserror::Error;

use crate::document::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// A required element never appeared within the retry bound.
    #[error("{selector:?} not found after {attempts} attempts ({waited:?})")]
    NotFound {
        selector: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("wait for {selector:?} cancelled")]
    Cancelled { selector: String },

    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("unknown parent observer")]
    UnknownObserver,

    #[error("{child:?} can't be appended to {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}
