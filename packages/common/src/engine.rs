use crate::result::ScriptResult;
use crate::value::{Bindings, Value};

/// An external expression/statement language.
///
/// The compiler never interprets code itself; every `{…}` marker, directive
/// condition, loop source and setup block is handed to an implementation of
/// this trait together with the bindings visible at that point of the tree.
pub trait ScriptEngine {
    /// Evaluate a single expression against `bindings`.
    fn evaluate_expression(&self, source: &str, bindings: &Bindings) -> ScriptResult<Value>;

    /// Run a block of statements starting from `bindings`.
    ///
    /// Returns the bindings after execution and the value of the last name
    /// bound by the block (`Value::Null` when nothing was bound).
    fn execute_block(&self, source: &str, bindings: &Bindings) -> ScriptResult<(Bindings, Value)>;
}

impl<T: ScriptEngine + ?Sized> ScriptEngine for &T {
    fn evaluate_expression(&self, source: &str, bindings: &Bindings) -> ScriptResult<Value> {
        (**self).evaluate_expression(source, bindings)
    }

    fn execute_block(&self, source: &str, bindings: &Bindings) -> ScriptResult<(Bindings, Value)> {
        (**self).execute_block(source, bindings)
    }
}
