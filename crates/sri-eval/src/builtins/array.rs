//! Array methods. Arrays are shared mutable, so mutators act through the
//! receiver's `Rc` and every alias observes the change.

use std::cmp::Ordering;

use crate::builtins::expect_arity;
use crate::interp::Interpreter;
use crate::registry::MethodRegistry;
use crate::value::Value;
use sri_par::BinOp;
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("Array", "length", length);
    registry.register("Array", "size", length);
    registry.register("Array", "count", length);
    registry.register("Array", "push", push);
    registry.register("Array", "<<", push);
    registry.register("Array", "pop", pop);
    registry.register("Array", "first", first);
    registry.register("Array", "last", last);
    registry.register("Array", "empty?", empty_p);
    registry.register("Array", "keys", keys);
    registry.register("Array", "values", values);
    registry.register("Array", "join", join);
    registry.register("Array", "reverse", reverse);
    registry.register("Array", "sort", sort);
    registry.register("Array", "sum", sum);
    registry.register("Array", "min", min);
    registry.register("Array", "max", max);
    registry.register("Array", "uniq", uniq);
    registry.register("Array", "include?", include_p);
    registry.register("Array", "to_a", to_a);
}

fn elements(recv: &Value, method: &str) -> Result<Vec<Value>> {
    match recv {
        Value::Array(a) => Ok(a.borrow().clone()),
        other => Err(RubyError::NoMethod {
            method: method.to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn length(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("length", args, 0)?;
    Ok(Value::integer(elements(recv, "length")?.len() as i64))
}

fn push(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    match recv {
        Value::Array(a) => {
            a.borrow_mut().extend(args.iter().cloned());
            Ok(recv.clone())
        }
        other => Err(RubyError::NoMethod {
            method: "push".to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn pop(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("pop", args, 0)?;
    match recv {
        Value::Array(a) => Ok(a.borrow_mut().pop().unwrap_or(Value::Nil)),
        other => Err(RubyError::NoMethod {
            method: "pop".to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn first(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("first", args, 0)?;
    Ok(elements(recv, "first")?.first().cloned().unwrap_or(Value::Nil))
}

fn last(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("last", args, 0)?;
    Ok(elements(recv, "last")?.last().cloned().unwrap_or(Value::Nil))
}

fn empty_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("empty?", args, 0)?;
    Ok(Value::Bool(elements(recv, "empty?")?.is_empty()))
}

/// The index view of an array: `[0, 1, ..., len-1]`.
fn keys(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("keys", args, 0)?;
    let len = elements(recv, "keys")?.len();
    Ok(Value::array(
        (0..len).map(|i| Value::integer(i as i64)).collect(),
    ))
}

fn values(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("values", args, 0)?;
    Ok(Value::array(elements(recv, "values")?))
}

fn join(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let sep = match args {
        [] => String::new(),
        [Value::Str(s)] => s.clone(),
        _ => return Err(RubyError::Type("join requires a String separator".to_string())),
    };
    let mut parts = Vec::new();
    for item in elements(recv, "join")? {
        parts.push(interp.value_to_s(&item)?);
    }
    Ok(Value::Str(parts.join(&sep)))
}

fn reverse(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("reverse", args, 0)?;
    let mut items = elements(recv, "reverse")?;
    items.reverse();
    Ok(Value::array(items))
}

fn sort(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("sort", args, 0)?;
    let mut items = elements(recv, "sort")?;
    let mut failure = None;
    items.sort_by(|a, b| match interp.compare_values(a, b) {
        Ok(ord) => ord,
        Err(e) => {
            failure.get_or_insert(e);
            Ordering::Equal
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(Value::array(items)),
    }
}

fn sum(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("sum", args, 0)?;
    let mut acc = Value::integer(0);
    for item in elements(recv, "sum")? {
        acc = interp.binary_op(BinOp::Add, acc, item)?;
    }
    Ok(acc)
}

fn min(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("min", args, 0)?;
    extremum(interp, recv, "min", Ordering::Less)
}

fn max(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("max", args, 0)?;
    extremum(interp, recv, "max", Ordering::Greater)
}

fn extremum(
    interp: &mut Interpreter,
    recv: &Value,
    method: &str,
    keep: Ordering,
) -> Result<Value> {
    let items = elements(recv, method)?;
    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(current) => {
                if interp.compare_values(&item, &current)? == keep {
                    item
                } else {
                    current
                }
            }
        });
    }
    Ok(best.unwrap_or(Value::Nil))
}

fn uniq(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("uniq", args, 0)?;
    let mut out: Vec<Value> = Vec::new();
    for item in elements(recv, "uniq")? {
        if !out.iter().any(|seen| seen.ruby_eq(&item)) {
            out.push(item);
        }
    }
    Ok(Value::array(out))
}

fn include_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("include?", args, 1)?;
    let found = elements(recv, "include?")?
        .iter()
        .any(|item| item.ruby_eq(&args[0]));
    Ok(Value::Bool(found))
}

fn to_a(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_a", args, 0)?;
    Ok(recv.clone())
}
