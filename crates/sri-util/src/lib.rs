//! sri-util - Core Utilities and Foundation Types
//!
//! This crate provides the foundation types shared by every phase of the
//! interpreter: source positions, the error taxonomy, and typed-index
//! containers used by the entity-component syntax tree.
//!
//! The interpreter pipeline is:
//!
//! ```text
//! Source Text
//!      |
//!      v
//!   [Lexer]  ──▶ Token Stream        (sri-lex)
//!      |
//!      v
//!   [Parser] ──▶ Entity-Component AST (sri-par)
//!      |
//!      v
//!  [Evaluator] ──▶ Value + stdout     (sri-eval)
//! ```
//!
//! Each phase reports failures through [`RubyError`], which the driver
//! converts to an exit code or a host-level error at the boundary.

pub mod error;
pub mod index;
pub mod span;

pub use error::{Result, RubyError};
pub use index::{Idx, IndexVec};
pub use span::Span;

// Re-export commonly used hash types
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
