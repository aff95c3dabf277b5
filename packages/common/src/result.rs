use crate::error::ScriptError;

/// Result type returned by every `ScriptEngine` operation
pub type ScriptResult<T> = Result<T, ScriptError>;
