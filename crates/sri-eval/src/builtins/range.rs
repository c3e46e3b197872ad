//! Range methods. Integer ranges measure without enumerating; character
//! ranges enumerate to count.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::builtins::expect_arity;
use crate::interp::Interpreter;
use crate::registry::MethodRegistry;
use crate::value::{RangeValue, Value};
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("Range", "to_a", to_a);
    registry.register("Range", "count", size);
    registry.register("Range", "size", size);
    registry.register("Range", "include?", include_p);
    registry.register("Range", "first", first);
    registry.register("Range", "last", last);
    registry.register("Range", "sum", sum);
    registry.register("Range", "min", min);
    registry.register("Range", "max", max);
}

fn range_of<'a>(recv: &'a Value, method: &str) -> Result<&'a RangeValue> {
    match recv {
        Value::Range(r) => Ok(r),
        other => Err(RubyError::NoMethod {
            method: method.to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn to_a(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_a", args, 0)?;
    Ok(Value::array(interp.range_values(range_of(recv, "to_a")?)?))
}

fn size(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("size", args, 0)?;
    let r = range_of(recv, "size")?;
    if let (Value::Integer(a), Value::Integer(b)) = (&r.start, &r.end) {
        let span: BigInt = if r.inclusive { b - a + 1 } else { b - a };
        let span = if span.is_negative() {
            BigInt::zero()
        } else {
            span
        };
        return Ok(Value::Integer(span));
    }
    Ok(Value::integer(interp.range_values(r)?.len() as i64))
}

fn include_p(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("include?", args, 1)?;
    let r = range_of(recv, "include?")?;
    Ok(Value::Bool(interp.range_includes(r, &args[0])))
}

fn first(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("first", args, 0)?;
    Ok(range_of(recv, "first")?.start.clone())
}

fn last(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("last", args, 0)?;
    Ok(range_of(recv, "last")?.end.clone())
}

fn sum(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("sum", args, 0)?;
    let r = range_of(recv, "sum")?;
    let mut acc = Value::integer(0);
    for item in interp.range_values(r)? {
        acc = interp.binary_op(sri_par::BinOp::Add, acc, item)?;
    }
    Ok(acc)
}

fn min(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("min", args, 0)?;
    let r = range_of(recv, "min")?;
    Ok(interp
        .range_values(r)?
        .into_iter()
        .next()
        .unwrap_or(Value::Nil))
}

fn max(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("max", args, 0)?;
    let r = range_of(recv, "max")?;
    Ok(interp
        .range_values(r)?
        .into_iter()
        .last()
        .unwrap_or(Value::Nil))
}
