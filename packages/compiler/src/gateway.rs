//! The single seam through which compilation passes reach the script engine.

use crate::error::at;
use loom_common::{Bindings, ScriptEngine, ScriptError, Value};
use loom_tree::Position;
use thiserror::Error;
use tracing::trace;

/// A script failure, tagged with the source fragment and where it came from
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to evaluate `{fragment}` at {}: {cause}", at(.position))]
pub struct EvaluationError {
    pub fragment: String,
    pub position: Option<Position>,
    #[source]
    pub cause: ScriptError,
}

#[derive(Clone, Copy)]
pub struct Gateway<'e> {
    engine: &'e dyn ScriptEngine,
}

impl<'e> Gateway<'e> {
    pub fn new(engine: &'e dyn ScriptEngine) -> Self {
        Self { engine }
    }

    /// Evaluate one expression fragment
    pub fn evaluate(
        &self,
        fragment: &str,
        bindings: &Bindings,
        position: Option<Position>,
    ) -> Result<Value, EvaluationError> {
        let source = fragment.trim();
        trace!(source, bindings = bindings.len(), "evaluate");
        self.engine
            .evaluate_expression(source, bindings)
            .map_err(|cause| EvaluationError {
                fragment: source.to_string(),
                position,
                cause,
            })
    }

    /// Execute a statement block, returning the resulting bindings and the
    /// last bound value
    pub fn execute(
        &self,
        fragment: &str,
        bindings: &Bindings,
        position: Option<Position>,
    ) -> Result<(Bindings, Value), EvaluationError> {
        let source = normalize_indent(fragment);
        trace!(source = %source, bindings = bindings.len(), "execute");
        self.engine
            .execute_block(&source, bindings)
            .map_err(|cause| EvaluationError {
                fragment: source.clone(),
                position,
                cause,
            })
    }

    /// Evaluate the value of a code attribute. Multi-statement sources run as
    /// a block whose last bound value is the result; bindings do not escape.
    pub fn evaluate_code(
        &self,
        fragment: &str,
        bindings: &Bindings,
        position: Option<Position>,
    ) -> Result<Value, EvaluationError> {
        if is_block(fragment) {
            self.execute(fragment, bindings, position)
                .map(|(_, last_bound)| last_bound)
        } else {
            self.evaluate(fragment, bindings, position)
        }
    }
}

/// Remove the indentation shared by every non-blank line, plus blank lines
/// at either end
pub fn normalize_indent(source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()).trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a fragment holds more than one statement: a `;` or line break
/// outside string literals
fn is_block(source: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in source.trim().chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            ';' | '\n' => return true,
            _ => {}
        }
    }
    false
}
