//! # Loom Script
//!
//! A small expression language implementing [`loom_common::ScriptEngine`].
//!
//! It exists so the compiler can be exercised end to end without embedding a
//! general-purpose interpreter. Expressions cover literals, lists, objects,
//! member/index access, builtin calls, arithmetic, comparison, boolean logic
//! and `cond ? a : b`. Blocks are sequences of `name = expr` statements.
//!
//! ```rust,ignore
//! use loom_common::{Bindings, ScriptEngine};
//! use loom_script::Interpreter;
//!
//! let engine = Interpreter::new();
//! let value = engine.evaluate_expression("len(items) > 0", &Bindings::new())?;
//! ```

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use interpreter::Interpreter;
pub use parser::{parse_block, parse_expression};
