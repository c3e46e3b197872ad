//! sri-eval - Tree-Walking Evaluator
//!
//! Walks the entity-component AST directly, single-threaded, with no
//! suspension points. The pieces:
//!
//! - [`value`] — the runtime value union. Arrays, hashes, instances, and
//!   class/module tables are shared mutable references (`Rc<RefCell<...>>`);
//!   everything else is value-copied.
//! - [`scope`] — snapshot scopes: entering a method or block clones the
//!   enclosing variable map, so inner assignment never rebinds an outer
//!   local, while shared containers stay shared through the copy.
//! - [`registry`] — built-in method resolution along the fixed ancestor
//!   chain `BasicObject → Object (+Kernel) → type`.
//! - [`interp`] — the walker itself, with `break`/`next`/`return` modeled
//!   as internal unwind values that loops and method frames consume.
//! - [`builtins`] — the per-type method surface (String, Array, Hash,
//!   Range, numerics, Symbol, Kernel, and the block-iterator set).
//!
//! Standard output is the only observable effect and flows through an
//! injected [`std::io::Write`] sink, so embedders and tests can capture it.

pub mod builtins;
pub mod interp;
pub mod registry;
pub mod scope;
pub mod value;

pub use interp::{Flow, Interpreter};
pub use scope::Scope;
pub use value::{Complex, Rational, Value};

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// An output sink whose contents can be read back after evaluation.
///
/// # Example
///
/// ```
/// use sri_eval::{Interpreter, SharedOutput};
///
/// let out = SharedOutput::new();
/// let mut interp = Interpreter::new(Box::new(out.clone()));
/// interp.eval_source("puts 1 + 2").unwrap();
/// assert_eq!(out.contents(), "3\n");
/// ```
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl io::Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
