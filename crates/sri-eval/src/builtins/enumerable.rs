//! Block-iterator methods.
//!
//! These run before registry dispatch because they need the call-site
//! block: `each`, `map`/`collect`, `select`/`filter`, `reject`,
//! `find`/`detect`, `any?`, `all?`, `reduce`/`inject`,
//! `each_with_index`, plus `times`/`upto` on integers. Enumerable
//! receivers are arrays, ranges, and hashes (iterated as `[key, value]`
//! pairs). Calling one without a block is an argument error.
//!
//! A `break v` inside the block halts the iteration and becomes the
//! method's value; `next v` supplies the block's value for that element.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::interp::{BlockOutcome, Interpreter};
use crate::value::{BlockDef, Value};
use sri_util::{Result, RubyError};

const SEQUENCE_METHODS: &[&str] = &[
    "each",
    "map",
    "collect",
    "select",
    "filter",
    "reject",
    "find",
    "detect",
    "any?",
    "all?",
    "reduce",
    "inject",
    "each_with_index",
];

const INTEGER_METHODS: &[&str] = &["times", "upto"];

/// Whether this receiver/name pair belongs to the block-iterator set.
pub(crate) fn is_iterator_method(recv: &Value, name: &str) -> bool {
    match recv {
        Value::Array(_) | Value::Range(_) | Value::Hash(_) => SEQUENCE_METHODS.contains(&name),
        Value::Integer(_) => INTEGER_METHODS.contains(&name),
        _ => false,
    }
}

/// Dispatch hook: `None` when the method is not an iterator for this
/// receiver, `Some(result)` otherwise.
pub(crate) fn call(
    interp: &mut Interpreter,
    recv: &Value,
    name: &str,
    args: &[Value],
    block: Option<&BlockDef>,
) -> Option<Result<Value>> {
    if !is_iterator_method(recv, name) {
        return None;
    }
    Some(run(interp, recv, name, args, block))
}

fn run(
    interp: &mut Interpreter,
    recv: &Value,
    name: &str,
    args: &[Value],
    block: Option<&BlockDef>,
) -> Result<Value> {
    let Some(block) = block else {
        return Err(RubyError::Argument(format!("no block given ({})", name)));
    };

    if let Value::Integer(n) = recv {
        return integer_iterate(interp, recv, n, name, args, block);
    }

    let items = interp.iterable_values(recv)?;
    match name {
        "each" => {
            for item in items {
                if let BlockOutcome::Stop(v) = interp.yield_to_block(block, &[item])? {
                    return Ok(v);
                }
            }
            Ok(recv.clone())
        }
        "map" | "collect" => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match interp.yield_to_block(block, &[item])? {
                    BlockOutcome::Value(v) => out.push(v),
                    BlockOutcome::Stop(v) => return Ok(v),
                }
            }
            Ok(Value::array(out))
        }
        "select" | "filter" => {
            let mut out = Vec::new();
            for item in items {
                match interp.yield_to_block(block, &[item.clone()])? {
                    BlockOutcome::Value(v) => {
                        if v.truthy() {
                            out.push(item);
                        }
                    }
                    BlockOutcome::Stop(v) => return Ok(v),
                }
            }
            Ok(Value::array(out))
        }
        "reject" => {
            let mut out = Vec::new();
            for item in items {
                match interp.yield_to_block(block, &[item.clone()])? {
                    BlockOutcome::Value(v) => {
                        if !v.truthy() {
                            out.push(item);
                        }
                    }
                    BlockOutcome::Stop(v) => return Ok(v),
                }
            }
            Ok(Value::array(out))
        }
        "find" | "detect" => {
            for item in items {
                match interp.yield_to_block(block, &[item.clone()])? {
                    BlockOutcome::Value(v) => {
                        if v.truthy() {
                            return Ok(item);
                        }
                    }
                    BlockOutcome::Stop(v) => return Ok(v),
                }
            }
            Ok(Value::Nil)
        }
        "any?" => {
            for item in items {
                match interp.yield_to_block(block, &[item])? {
                    BlockOutcome::Value(v) => {
                        if v.truthy() {
                            return Ok(Value::Bool(true));
                        }
                    }
                    BlockOutcome::Stop(v) => return Ok(v),
                }
            }
            Ok(Value::Bool(false))
        }
        "all?" => {
            for item in items {
                match interp.yield_to_block(block, &[item])? {
                    BlockOutcome::Value(v) => {
                        if !v.truthy() {
                            return Ok(Value::Bool(false));
                        }
                    }
                    BlockOutcome::Stop(v) => return Ok(v),
                }
            }
            Ok(Value::Bool(true))
        }
        "reduce" | "inject" => {
            let mut iter = items.into_iter();
            let mut acc = match args.first() {
                Some(init) => init.clone(),
                None => match iter.next() {
                    Some(first) => first,
                    None => return Ok(Value::Nil),
                },
            };
            for item in iter {
                match interp.yield_to_block(block, &[acc, item])? {
                    BlockOutcome::Value(v) => acc = v,
                    BlockOutcome::Stop(v) => return Ok(v),
                }
            }
            Ok(acc)
        }
        "each_with_index" => {
            for (i, item) in items.into_iter().enumerate() {
                let idx = Value::integer(i as i64);
                if let BlockOutcome::Stop(v) = interp.yield_to_block(block, &[item, idx])? {
                    return Ok(v);
                }
            }
            Ok(recv.clone())
        }
        _ => Err(RubyError::NoMethod {
            method: name.to_string(),
            receiver: recv.class_name(),
        }),
    }
}

fn integer_iterate(
    interp: &mut Interpreter,
    recv: &Value,
    n: &BigInt,
    name: &str,
    args: &[Value],
    block: &BlockDef,
) -> Result<Value> {
    match name {
        "times" => {
            let count = n.to_u64().unwrap_or(0);
            for i in 0..count {
                let arg = Value::Integer(BigInt::from(i));
                if let BlockOutcome::Stop(v) = interp.yield_to_block(block, &[arg])? {
                    return Ok(v);
                }
            }
            Ok(recv.clone())
        }
        "upto" => {
            let [Value::Integer(limit)] = args else {
                return Err(RubyError::Argument(
                    "upto requires exactly 1 argument".to_string(),
                ));
            };
            let mut i = n.clone();
            while i <= *limit {
                let arg = Value::Integer(i.clone());
                if let BlockOutcome::Stop(v) = interp.yield_to_block(block, &[arg])? {
                    return Ok(v);
                }
                i = i + 1;
            }
            Ok(recv.clone())
        }
        _ => Err(RubyError::NoMethod {
            method: name.to_string(),
            receiver: recv.class_name(),
        }),
    }
}
