//! Kernel: the methods mixed into Object.
//!
//! `puts` prints each argument on its own line, unwrapping arrays and
//! ranges; `p` prints `inspect` and returns its argument; `print` writes
//! without a newline and flushes; `eval` runs a string in an isolated
//! top-level scope. The `eq` / `be_*` helpers build the matcher values
//! consumed by `should`.

use std::rc::Rc;

use crate::builtins::expect_arity;
use crate::interp::Interpreter;
use crate::registry::MethodRegistry;
use crate::value::{Matcher, Value};
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("Kernel", "puts", puts);
    registry.register("Kernel", "p", p);
    registry.register("Kernel", "print", print);
    registry.register("Kernel", "eval", eval);
    registry.register("Kernel", "eq", eq_matcher);
    registry.register("Kernel", "be_true", be_true);
    registry.register("Kernel", "be_false", be_false);
    registry.register("Kernel", "be_nil", be_nil);
}

fn puts(interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        interp.write_out("\n")?;
    }
    for arg in args {
        interp.puts_value(arg)?;
    }
    Ok(Value::Nil)
}

fn p(interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    for arg in args {
        let text = interp.value_inspect(arg)?;
        interp.write_out(&text)?;
        interp.write_out("\n")?;
    }
    Ok(match args {
        [] => Value::Nil,
        [one] => one.clone(),
        many => Value::array(many.to_vec()),
    })
}

fn print(interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    for arg in args {
        let text = interp.value_to_s(arg)?;
        interp.write_out(&text)?;
    }
    interp.flush_out()?;
    Ok(Value::Nil)
}

fn eval(interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("eval", args, 1)?;
    match &args[0] {
        Value::Str(source) => interp.eval_isolated(source),
        other => Err(RubyError::Type(format!(
            "no implicit conversion of {} into String",
            other.class_name()
        ))),
    }
}

fn eq_matcher(_interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("eq", args, 1)?;
    Ok(Value::Matcher(Rc::new(Matcher::Eq(args[0].clone()))))
}

fn be_true(_interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("be_true", args, 0)?;
    Ok(Value::Matcher(Rc::new(Matcher::BeTrue)))
}

fn be_false(_interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("be_false", args, 0)?;
    Ok(Value::Matcher(Rc::new(Matcher::BeFalse)))
}

fn be_nil(_interp: &mut Interpreter, _recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("be_nil", args, 0)?;
    Ok(Value::Matcher(Rc::new(Matcher::BeNil)))
}

/// Applies a matcher to an actual value: `true` on success, an
/// AssertionFailure carrying expected/actual otherwise.
pub(crate) fn check_expectation(
    interp: &mut Interpreter,
    actual: &Value,
    matcher: &Matcher,
) -> Result<Value> {
    let (passed, expected) = match matcher {
        Matcher::Eq(expected) => (
            actual.ruby_eq(expected),
            interp.value_inspect(expected)?,
        ),
        Matcher::BeTrue => (matches!(actual, Value::Bool(true)), "true".to_string()),
        Matcher::BeFalse => (matches!(actual, Value::Bool(false)), "false".to_string()),
        Matcher::BeNil => (matches!(actual, Value::Nil), "nil".to_string()),
        Matcher::Should(_) => {
            return Err(RubyError::Argument("should expects a matcher".to_string()))
        }
    };
    if passed {
        Ok(Value::Bool(true))
    } else {
        Err(RubyError::AssertionFailure {
            expected,
            actual: interp.value_inspect(actual)?,
        })
    }
}
