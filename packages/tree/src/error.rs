use crate::node::NodeId;
use thiserror::Error;

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node {0} does not exist")]
    MissingNode(NodeId),

    #[error("Node {0} cannot hold children")]
    NotAContainer(NodeId),

    #[error("Node {child} is already attached to {parent}")]
    AlreadyAttached { child: NodeId, parent: NodeId },

    #[error("Inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("The root node cannot be moved or removed")]
    RootImmovable,

    #[error("Index {index} out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("A root fragment can only be loaded as a whole tree")]
    NestedRoot,

    #[error("Broken link: {0}")]
    BrokenLink(String),

    #[error("Invalid tree JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        TreeError::Json(err.to_string())
    }
}
