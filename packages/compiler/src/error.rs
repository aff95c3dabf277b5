use crate::gateway::EvaluationError;
use loom_tree::{Position, TreeError};
use std::fmt;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Render an optional position for messages
pub(crate) fn at(position: &Option<Position>) -> String {
    match position {
        Some(p) => p.to_string(),
        None => "<generated>".to_string(),
    }
}

/// Ways the markup itself can be malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralKind {
    /// More than one conditional directive on a single element
    MultipleDirectives(Vec<String>),
    /// `elif` without a preceding `if`/`elif` element sibling
    OrphanElif,
    /// `else` without a preceding `if`/`elif` element sibling
    OrphanElse,
    /// A directive whose condition is empty
    EmptyCondition(String),
    /// A setup block containing elements
    InvalidSetupBlock,
}

impl fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralKind::MultipleDirectives(names) => {
                write!(f, "Multiple conditional directives ({})", names.join(", "))
            }
            StructuralKind::OrphanElif => {
                write!(f, "elif without a preceding if/elif sibling")
            }
            StructuralKind::OrphanElse => {
                write!(f, "else without a preceding if/elif sibling")
            }
            StructuralKind::EmptyCondition(name) => write!(f, "Empty condition in '{}'", name),
            StructuralKind::InvalidSetupBlock => {
                write!(f, "Setup blocks may only contain text")
            }
        }
    }
}

/// Errors that abort a compilation
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{kind} on <{tag}> at {}", at(.position))]
    Structural {
        kind: StructuralKind,
        tag: String,
        position: Option<Position>,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("Unterminated interpolation marker in {text:?} at {}", at(.position))]
    UnterminatedMarker {
        text: String,
        position: Option<Position>,
    },

    #[error("Component '{name}' not found at {}", at(.position))]
    ComponentNotFound {
        name: String,
        position: Option<Position>,
    },

    #[error("Invalid component '{name}': {message}")]
    InvalidComponent { name: String, message: String },

    #[error("Recursive component detected: {component}\nCall stack: {}\n{}", .call_stack.join(" → "), .hint.as_deref().unwrap_or_default())]
    RecursiveComponent {
        component: String,
        call_stack: Vec<String>,
        hint: Option<String>,
    },

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl CompileError {
    pub fn structural(kind: StructuralKind, tag: impl Into<String>, position: Option<Position>) -> Self {
        CompileError::Structural {
            kind,
            tag: tag.into(),
            position,
        }
    }

    pub fn invalid_component(name: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::InvalidComponent {
            name: name.into(),
            message: message.into(),
        }
    }
}
