//! Numeric methods and the Integer class methods.

use num_integer::{Integer as _, Roots};
use num_traits::{Signed, Zero};

use crate::builtins::expect_arity;
use crate::interp::Interpreter;
use crate::registry::MethodRegistry;
use crate::value::{format_float, Value};
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("Numeric", "zero?", zero_p);
    registry.register("Numeric", "positive?", positive_p);
    registry.register("Numeric", "negative?", negative_p);
    registry.register("Numeric", "integer?", integer_p);
    registry.register("Numeric", "real?", real_p);
    registry.register("Numeric", "abs", abs);

    registry.register("Integer", "even?", even_p);
    registry.register("Integer", "odd?", odd_p);

    registry.register("Float", "round", round);
    registry.register("Float", "floor", floor);
    registry.register("Float", "ceil", ceil);
    registry.register("Float", "to_s", float_to_s);
}

/// Class-level methods on the built-in numeric classes: `Integer.max`,
/// `Integer.sqrt`.
pub(crate) fn class_call(
    _interp: &mut Interpreter,
    class_name: &str,
    method: &str,
    args: &[Value],
) -> Option<Result<Value>> {
    if class_name != "Integer" {
        return None;
    }
    match method {
        "max" => Some(integer_max(args)),
        "sqrt" => Some(integer_sqrt(args)),
        _ => None,
    }
}

fn integer_max(args: &[Value]) -> Result<Value> {
    let [Value::Integer(a), Value::Integer(b)] = args else {
        return Err(RubyError::Argument(
            "Integer.max requires exactly 2 arguments".to_string(),
        ));
    };
    Ok(Value::Integer(a.max(b).clone()))
}

fn integer_sqrt(args: &[Value]) -> Result<Value> {
    let [arg] = args else {
        return Err(RubyError::Argument(
            "Integer.sqrt requires exactly 1 argument".to_string(),
        ));
    };
    let Value::Integer(n) = arg else {
        return Err(RubyError::Type(format!(
            "Integer.sqrt requires an Integer, got {}",
            arg.class_name()
        )));
    };
    if n.is_negative() {
        return Err(RubyError::Argument(
            "Integer.sqrt requires a non-negative argument".to_string(),
        ));
    }
    Ok(Value::Integer(n.sqrt()))
}

fn zero_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("zero?", args, 0)?;
    let zero = match recv {
        Value::Integer(n) => n.is_zero(),
        Value::Float(f) => *f == 0.0,
        Value::Rational(r) => r.is_zero(),
        Value::Complex(c) => c.re == 0.0 && c.im == 0.0,
        _ => false,
    };
    Ok(Value::Bool(zero))
}

fn positive_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("positive?", args, 0)?;
    signish(recv, "positive?").map(|s| Value::Bool(s > 0))
}

fn negative_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("negative?", args, 0)?;
    signish(recv, "negative?").map(|s| Value::Bool(s < 0))
}

fn signish(recv: &Value, method: &str) -> Result<i8> {
    match recv {
        Value::Integer(n) => Ok(if n.is_negative() {
            -1
        } else if n.is_zero() {
            0
        } else {
            1
        }),
        Value::Float(f) => Ok(if *f < 0.0 {
            -1
        } else if *f == 0.0 {
            0
        } else {
            1
        }),
        Value::Rational(r) => Ok(if r.numer().is_negative() {
            -1
        } else if r.is_zero() {
            0
        } else {
            1
        }),
        other => Err(RubyError::NoMethod {
            method: method.to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn integer_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("integer?", args, 0)?;
    Ok(Value::Bool(matches!(recv, Value::Integer(_))))
}

fn real_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("real?", args, 0)?;
    Ok(Value::Bool(!matches!(recv, Value::Complex(_))))
}

fn abs(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("abs", args, 0)?;
    match recv {
        Value::Integer(n) => Ok(Value::Integer(n.abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::Rational(r) => Ok(if r.numer().is_negative() {
            Value::Rational(r.neg())
        } else {
            Value::Rational(r.clone())
        }),
        other => Err(RubyError::NoMethod {
            method: "abs".to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn even_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("even?", args, 0)?;
    match recv {
        Value::Integer(n) => Ok(Value::Bool(n.is_even())),
        other => Err(RubyError::NoMethod {
            method: "even?".to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn odd_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("odd?", args, 0)?;
    match recv {
        Value::Integer(n) => Ok(Value::Bool(n.is_odd())),
        other => Err(RubyError::NoMethod {
            method: "odd?".to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn round(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("round", args, 0)?;
    float_unary(recv, "round", f64::round)
}

fn floor(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("floor", args, 0)?;
    float_unary(recv, "floor", f64::floor)
}

fn ceil(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("ceil", args, 0)?;
    float_unary(recv, "ceil", f64::ceil)
}

fn float_unary(recv: &Value, method: &str, f: fn(f64) -> f64) -> Result<Value> {
    match recv {
        Value::Float(x) => Ok(Value::integer(f(*x) as i64)),
        other => Err(RubyError::NoMethod {
            method: method.to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn float_to_s(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_s", args, 0)?;
    match recv {
        Value::Float(f) => Ok(Value::Str(format_float(*f))),
        other => Ok(Value::Str(other.default_to_s())),
    }
}
