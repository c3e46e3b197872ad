//! Symbol methods.

use crate::builtins::expect_arity;
use crate::interp::Interpreter;
use crate::registry::MethodRegistry;
use crate::value::Value;
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("Symbol", "to_s", to_s);
    registry.register("Symbol", "id2name", to_s);
    registry.register("Symbol", "length", length);
    registry.register("Symbol", "size", length);
}

fn name_of<'a>(recv: &'a Value, method: &str) -> Result<&'a str> {
    match recv {
        Value::Symbol(s) => Ok(s),
        other => Err(RubyError::NoMethod {
            method: method.to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn to_s(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_s", args, 0)?;
    Ok(Value::Str(name_of(recv, "to_s")?.to_string()))
}

fn length(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("length", args, 0)?;
    Ok(Value::integer(
        name_of(recv, "length")?.chars().count() as i64
    ))
}
