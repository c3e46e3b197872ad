//! Methods every value responds to.

use std::rc::Rc;

use crate::builtins::expect_arity;
use crate::interp::Interpreter;
use crate::registry::MethodRegistry;
use crate::value::{Matcher, Value};
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("Object", "to_s", to_s);
    registry.register("Object", "inspect", inspect);
    registry.register("Object", "class", class);
    registry.register("Object", "==", eq);
    registry.register("Object", "!=", ne);
    registry.register("Object", "equal?", equal);
    registry.register("Object", "object_id", object_id);
    registry.register("Object", "nil?", nil_p);
    registry.register("Object", "respond_to?", respond_to);
    registry.register("Object", "is_a?", is_a);
    registry.register("Object", "kind_of?", is_a);
    registry.register("Object", "instance_of?", instance_of);
    registry.register("Object", "should", should);

    registry.register("BasicObject", "==", eq);
    registry.register("BasicObject", "equal?", equal);
    registry.register("BasicObject", "object_id", object_id);

    // nil's own protocol.
    registry.register("NilClass", "to_a", nil_to_a);
}

fn to_s(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_s", args, 0)?;
    Ok(Value::Str(interp.value_to_s(recv)?))
}

fn inspect(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("inspect", args, 0)?;
    Ok(Value::Str(interp.value_inspect(recv)?))
}

fn class(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("class", args, 0)?;
    Ok(interp.class_value_of(recv))
}

fn eq(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("==", args, 1)?;
    Ok(Value::Bool(recv.ruby_eq(&args[0])))
}

fn ne(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("!=", args, 1)?;
    Ok(Value::Bool(!recv.ruby_eq(&args[0])))
}

fn equal(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("equal?", args, 1)?;
    Ok(Value::Bool(recv.identity_eq(&args[0])))
}

fn object_id(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("object_id", args, 0)?;
    Ok(Value::Integer(recv.object_id()))
}

fn nil_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("nil?", args, 0)?;
    Ok(Value::Bool(matches!(recv, Value::Nil)))
}

fn respond_to(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("respond_to?", args, 1)?;
    let name = match &args[0] {
        Value::Symbol(s) | Value::Str(s) => s.clone(),
        other => {
            return Err(RubyError::Type(format!(
                "{} is not a symbol nor a string",
                other.default_inspect()
            )))
        }
    };
    Ok(Value::Bool(interp.responds_to(recv, &name)))
}

fn is_a(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("is_a?", args, 1)?;
    let name = match &args[0] {
        Value::Class(c) => c.borrow().name.clone(),
        Value::Module(m) => m.borrow().name.clone(),
        other => {
            return Err(RubyError::Type(format!(
                "class or module required, got {}",
                other.class_name()
            )))
        }
    };
    Ok(Value::Bool(interp.value_is_a(recv, &name)))
}

fn instance_of(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("instance_of?", args, 1)?;
    let name = match &args[0] {
        Value::Class(c) => c.borrow().name.clone(),
        other => {
            return Err(RubyError::Type(format!(
                "class required, got {}",
                other.class_name()
            )))
        }
    };
    Ok(Value::Bool(recv.class_name() == name))
}

/// `x.should` wraps the receiver; `x.should matcher` checks immediately.
fn should(interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    match args {
        [] => Ok(Value::Matcher(Rc::new(Matcher::Should(recv.clone())))),
        [Value::Matcher(m)] => crate::builtins::kernel::check_expectation(interp, recv, m),
        _ => Err(RubyError::Argument(
            "should expects a matcher".to_string(),
        )),
    }
}

fn nil_to_a(_interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_a", args, 0)?;
    Ok(Value::array(Vec::new()))
}
