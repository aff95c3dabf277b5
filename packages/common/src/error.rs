use thiserror::Error;

/// Errors raised by a script engine while parsing or evaluating source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("Name '{name}' is not defined")]
    UnknownName { name: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Type error: {message}")]
    Type { message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{0}")]
    Custom(String),
}

impl ScriptError {
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ScriptError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ScriptError::Type {
            message: message.into(),
        }
    }
}

impl From<String> for ScriptError {
    fn from(s: String) -> Self {
        ScriptError::Custom(s)
    }
}

impl From<&str> for ScriptError {
    fn from(s: &str) -> Self {
        ScriptError::Custom(s.to_string())
    }
}
