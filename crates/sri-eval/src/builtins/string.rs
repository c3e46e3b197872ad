//! String methods.

use crate::builtins::expect_arity;
use crate::interp::{wrap_index, Interpreter};
use crate::registry::MethodRegistry;
use crate::value::{RangeValue, Value};
use num_traits::ToPrimitive;
use sri_util::{Result, RubyError};

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.register("String", "length", length);
    registry.register("String", "size", length);
    registry.register("String", "upcase", upcase);
    registry.register("String", "downcase", downcase);
    registry.register("String", "capitalize", capitalize);
    registry.register("String", "reverse", reverse);
    registry.register("String", "strip", strip);
    registry.register("String", "empty?", empty_p);
    registry.register("String", "start_with?", start_with);
    registry.register("String", "end_with?", end_with);
    registry.register("String", "include?", include_p);
    registry.register("String", "index", index);
    registry.register("String", "rindex", rindex);
    registry.register("String", "[]", slice);
    registry.register("String", "slice", slice);
    registry.register("String", "chomp", chomp);
    registry.register("String", "chop", chop);
    registry.register("String", "split", split);
    registry.register("String", "<=>", spaceship);
    registry.register("String", "chars", chars);
    registry.register("String", "to_sym", to_sym);
}

fn str_of<'a>(recv: &'a Value, method: &str) -> Result<&'a str> {
    match recv {
        Value::Str(s) => Ok(s),
        other => Err(RubyError::NoMethod {
            method: method.to_string(),
            receiver: other.class_name(),
        }),
    }
}

fn length(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("length", args, 0)?;
    Ok(Value::integer(str_of(recv, "length")?.chars().count() as i64))
}

fn upcase(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("upcase", args, 0)?;
    Ok(Value::Str(str_of(recv, "upcase")?.to_uppercase()))
}

fn downcase(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("downcase", args, 0)?;
    Ok(Value::Str(str_of(recv, "downcase")?.to_lowercase()))
}

fn capitalize(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("capitalize", args, 0)?;
    let s = str_of(recv, "capitalize")?;
    let mut chars = s.chars();
    let out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    Ok(Value::Str(out))
}

fn reverse(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("reverse", args, 0)?;
    Ok(Value::Str(str_of(recv, "reverse")?.chars().rev().collect()))
}

fn strip(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("strip", args, 0)?;
    Ok(Value::Str(str_of(recv, "strip")?.trim().to_string()))
}

fn empty_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("empty?", args, 0)?;
    Ok(Value::Bool(str_of(recv, "empty?")?.is_empty()))
}

fn str_arg<'a>(method: &str, args: &'a [Value]) -> Result<&'a str> {
    match args {
        [Value::Str(s)] => Ok(s),
        _ => Err(RubyError::Type(format!(
            "{} requires a String argument",
            method
        ))),
    }
}

fn start_with(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let s = str_of(recv, "start_with?")?;
    Ok(Value::Bool(s.starts_with(str_arg("start_with?", args)?)))
}

fn end_with(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let s = str_of(recv, "end_with?")?;
    Ok(Value::Bool(s.ends_with(str_arg("end_with?", args)?)))
}

fn include_p(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let s = str_of(recv, "include?")?;
    Ok(Value::Bool(s.contains(str_arg("include?", args)?)))
}

fn index(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let s = str_of(recv, "index")?;
    let needle = str_arg("index", args)?;
    Ok(match s.find(needle) {
        Some(byte_pos) => Value::integer(s[..byte_pos].chars().count() as i64),
        None => Value::Nil,
    })
}

fn rindex(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let s = str_of(recv, "rindex")?;
    let needle = str_arg("rindex", args)?;
    Ok(match s.rfind(needle) {
        Some(byte_pos) => Value::integer(s[..byte_pos].chars().count() as i64),
        None => Value::Nil,
    })
}

fn slice(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let s = str_of(recv, "slice")?;
    index_str(s, args)
}

/// Shared implementation of `s[...]` and `s.slice(...)`: a character
/// index (negative wraps), an index/length pair, or a range.
pub(crate) fn index_str(s: &str, indices: &[Value]) -> Result<Value> {
    let chars: Vec<char> = s.chars().collect();
    match indices {
        [Value::Integer(i)] => {
            let i = i
                .to_i64()
                .ok_or_else(|| RubyError::Type("index out of range".to_string()))?;
            Ok(wrap_index(i, chars.len())
                .map(|i| Value::Str(chars[i].to_string()))
                .unwrap_or(Value::Nil))
        }
        [Value::Integer(start), Value::Integer(len)] => {
            let start = start.to_i64().and_then(|i| wrap_index(i, chars.len() + 1));
            let len = len.to_usize().unwrap_or(0);
            Ok(match start {
                Some(start) => {
                    Value::Str(chars.iter().skip(start).take(len).collect::<String>())
                }
                None => Value::Nil,
            })
        }
        [Value::Range(r)] => index_str_range(&chars, r),
        _ => Err(RubyError::Type(
            "String index must be an Integer or a Range".to_string(),
        )),
    }
}

fn index_str_range(chars: &[char], r: &RangeValue) -> Result<Value> {
    let (Value::Integer(a), Value::Integer(b)) = (&r.start, &r.end) else {
        return Err(RubyError::Type("range indices must be integers".to_string()));
    };
    let a = a
        .to_i64()
        .ok_or_else(|| RubyError::Type("index out of range".to_string()))?;
    let b = b
        .to_i64()
        .ok_or_else(|| RubyError::Type("index out of range".to_string()))?;
    let Some(start) = wrap_index(a, chars.len() + 1) else {
        return Ok(Value::Nil);
    };
    let end = if b < 0 {
        match wrap_index(b, chars.len()) {
            Some(e) => e as i64,
            None => return Ok(Value::Str(String::new())),
        }
    } else {
        b.min(chars.len() as i64 - 1)
    };
    let end_excl = if r.inclusive { end + 1 } else { end };
    let count = (end_excl - start as i64).max(0) as usize;
    Ok(Value::Str(
        chars.iter().skip(start).take(count).collect::<String>(),
    ))
}

fn chomp(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("chomp", args, 0)?;
    let s = str_of(recv, "chomp")?;
    let out = s
        .strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .or_else(|| s.strip_suffix('\r'))
        .unwrap_or(s);
    Ok(Value::Str(out.to_string()))
}

fn chop(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("chop", args, 0)?;
    let s = str_of(recv, "chop")?;
    let mut chars: Vec<char> = s.chars().collect();
    chars.pop();
    Ok(Value::Str(chars.into_iter().collect()))
}

fn split(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    let s = str_of(recv, "split")?;
    let mut parts: Vec<Value> = match args {
        [] => s
            .split_whitespace()
            .map(|p| Value::Str(p.to_string()))
            .collect(),
        [Value::Str(sep)] => s.split(sep.as_str()).map(|p| Value::Str(p.to_string())).collect(),
        _ => {
            return Err(RubyError::Type(
                "split requires a String separator".to_string(),
            ))
        }
    };
    // Ruby drops trailing empty fields.
    while matches!(parts.last(), Some(Value::Str(s)) if s.is_empty()) {
        parts.pop();
    }
    Ok(Value::array(parts))
}

fn spaceship(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("<=>", args, 1)?;
    let s = str_of(recv, "<=>")?;
    match &args[0] {
        Value::Str(other) => Ok(Value::integer(match s.cmp(other.as_str()) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        })),
        _ => Ok(Value::Nil),
    }
}

fn chars(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("chars", args, 0)?;
    let s = str_of(recv, "chars")?;
    Ok(Value::array(
        s.chars().map(|c| Value::Str(c.to_string())).collect(),
    ))
}

fn to_sym(_interp: &mut Interpreter, recv: &Value, args: &[Value]) -> Result<Value> {
    expect_arity("to_sym", args, 0)?;
    Ok(Value::Symbol(str_of(recv, "to_sym")?.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_str_wraps_and_slices() {
        let s = "hello";
        assert!(index_str(s, &[Value::integer(0)])
            .unwrap()
            .ruby_eq(&Value::Str("h".into())));
        assert!(index_str(s, &[Value::integer(-1)])
            .unwrap()
            .ruby_eq(&Value::Str("o".into())));
        assert!(index_str(s, &[Value::integer(9)])
            .unwrap()
            .ruby_eq(&Value::Nil));
        assert!(index_str(s, &[Value::integer(1), Value::integer(3)])
            .unwrap()
            .ruby_eq(&Value::Str("ell".into())));
    }

    #[test]
    fn index_str_with_range() {
        let s = "hello";
        let range = Value::Range(Box::new(RangeValue {
            start: Value::integer(1),
            end: Value::integer(3),
            inclusive: true,
        }));
        assert!(index_str(s, &[range]).unwrap().ruby_eq(&Value::Str("ell".into())));
    }
}
