//! Shared vocabulary for the loom workspace: runtime values, binding maps and the
//! `ScriptEngine` seam through which the compiler talks to an expression language.

pub mod engine;
pub mod error;
pub mod result;
pub mod value;

pub use engine::*;
pub use error::*;
pub use result::*;
pub use value::*;
