//! The built-in library.
//!
//! Each submodule installs one receiver type's method surface into the
//! [`MethodRegistry`](crate::registry::MethodRegistry). Kernel is installed
//! as its own table and copied into Object by the registry, mirroring
//! Ruby's `include Kernel`. The block-iterator methods (`each`, `map`,
//! `select`, ...) live in [`enumerable`] and are dispatched before the
//! registry because they need the call-site block.

pub mod array;
pub mod enumerable;
pub mod hash;
pub mod kernel;
pub mod numeric;
pub mod object;
pub mod range;
pub mod string;
pub mod symbol;

use crate::registry::MethodRegistry;
use crate::value::Value;
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    object::install(registry);
    kernel::install(registry);
    numeric::install(registry);
    string::install(registry);
    array::install(registry);
    hash::install(registry);
    range::install(registry);
    symbol::install(registry);
}

/// Arity check shared by the built-ins.
pub(crate) fn expect_arity(method: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RubyError::Argument(format!(
            "{} requires exactly {} argument{} (given {})",
            method,
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        )))
    }
}
