//! # Loom Compiler
//!
//! Rewrites a markup tree carrying template directives into plain markup.
//!
//! ## Pipeline
//!
//! [`Compiler::compile`] clones the input tree, runs its setup blocks, then
//! visits every scope depth-first. A scope is an element (or the root) and
//! the steps only ever rewrite its direct children:
//!
//! 1. fragment wrappers are replaced by their children
//! 2. loops are expanded, or turned into fallbacks
//! 3. `if`/`elif`/`else` chains keep at most one branch
//! 4. `{…}` markers and code attributes are evaluated
//! 5. component call sites are replaced by their templates
//!
//! Bindings introduced by loops, wrappers and components live in the context
//! map of the element they apply to, so they are visible to its subtree only.
//! All evaluation goes through the [`Gateway`]; the compiler does not ship a
//! script language of its own.

mod assets;
pub mod cache;
pub mod compiler;
pub mod components;
pub mod conditionals;
pub mod config;
pub mod error;
pub mod expressions;
pub mod fragments;
pub mod gateway;
pub mod interpolation;
pub mod loops;
pub mod registry;
pub mod scoping;
mod setup;
pub mod step;
pub mod verify;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests_conditionals;

#[cfg(test)]
mod tests_loops;


#[cfg(test)]
mod tests_components;


pub use cache::{CachedAssets, ComponentCache};
pub use compiler::{Compilation, Compiler};
pub use config::{AssetPlacement, CompilerConfig, Directive};
pub use error::{CompileError, CompileResult, StructuralKind};
pub use gateway::{EvaluationError, Gateway};
pub use loops::{IterationSpec, LoopFailure};
pub use registry::{ComponentRegistry, ComponentTemplate};
pub use step::{PassContext, ScopedStep};
pub use verify::{find_residue, Residue};
