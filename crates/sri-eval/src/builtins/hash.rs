//! Hash methods. Insertion order is preserved by the backing IndexMap,
//! so `keys` and `values` come back in the order pairs were added.

use crate::builtins::expect_arity;
use crate::interp::Interpreter;
use crate::registry::MethodRegistry;
use crate::value::{HashRef, Value};
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("Hash", "length", length);
    registry.register("Hash", "size", length);
    registry.register("Hash", "keys", keys);
    registry.register("Hash", "values", values);
    registry.register("Hash", "empty?", empty_p);
    registry.register("Hash", "key?", key_p);
    registry.register("Hash", "include?", key_p);
    registry.register("Hash", "member?", key_p);
    registry.register("Hash", "delete", delete);
    registry.register("Hash", "[]", index);
    registry.register("Hash", "to_a", to_a);
}

fn hash_of<'a>(recv: &'a Value, method: &str) -> Result<&'a HashRef> {
    match recv {
        Value::Hash(h) => Ok(h),
        other => Err(RubyError::NoMethod {
            method: method.to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn length(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("length", args, 0)?;
    Ok(Value::integer(hash_of(recv, "length")?.borrow().len() as i64))
}

fn keys(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("keys", args, 0)?;
    Ok(Value::array(
        hash_of(recv, "keys")?.borrow().keys().cloned().collect(),
    ))
}

fn values(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("values", args, 0)?;
    Ok(Value::array(
        hash_of(recv, "values")?.borrow().values().cloned().collect(),
    ))
}

fn empty_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("empty?", args, 0)?;
    Ok(Value::Bool(hash_of(recv, "empty?")?.borrow().is_empty()))
}

fn key_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("key?", args, 1)?;
    Ok(Value::Bool(
        hash_of(recv, "key?")?.borrow().contains_key(&args[0]),
    ))
}

/// Removes a key, returning the prior value (nil when absent).
fn delete(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("delete", args, 1)?;
    Ok(hash_of(recv, "delete")?
        .borrow_mut()
        .shift_remove(&args[0])
        .unwrap_or(Value::Nil))
}

fn index(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("[]", args, 1)?;
    Ok(hash_of(recv, "[]")?
        .borrow()
        .get(&args[0])
        .cloned()
        .unwrap_or(Value::Nil))
}

fn to_a(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_a", args, 0)?;
    Ok(Value::array(
        hash_of(recv, "to_a")?
            .borrow()
            .iter()
            .map(|(k, v)| Value::array(vec![k.clone(), v.clone()]))
            .collect(),
    ))
}
