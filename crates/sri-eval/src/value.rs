//! Runtime value representation.
//!
//! [`Value`] is the discriminated union the evaluator computes with.
//! Containers (arrays, hashes), instances, and class/module tables are
//! shared mutable references: any number of variables may name the same
//! container, and mutation through one name is visible through all.
//! Everything else is copied on assignment.
//!
//! The `PartialEq`/`Hash` implementations on `Value` are the *strict*
//! identity used for hash keys (floats by bit pattern, instances by
//! pointer). The language-level `==`, with its numeric cross-type
//! coercions, is [`Value::ruby_eq`].

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{Signed, ToPrimitive, Zero};
use rustc_hash::FxHashMap;
use sri_par::{Ast, NodeId};

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type HashRef = Rc<RefCell<IndexMap<Value, Value>>>;
pub type ClassRef = Rc<RefCell<ClassData>>;
pub type ModuleRef = Rc<RefCell<ModuleData>>;
pub type InstanceRef = Rc<RefCell<InstanceData>>;

/// A Ruby value.
#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(BigInt),
    Float(f64),
    Rational(Rational),
    Complex(Complex),
    Symbol(String),
    Str(String),
    Array(ArrayRef),
    Hash(HashRef),
    Range(Box<RangeValue>),
    Class(ClassRef),
    Module(ModuleRef),
    Instance(InstanceRef),
    Method(Rc<MethodDef>),
    Matcher(Rc<Matcher>),
}

/// `start..end` / `start...end`.
#[derive(Clone, Debug)]
pub struct RangeValue {
    pub start: Value,
    pub end: Value,
    pub inclusive: bool,
}

/// A reduced rational number. The denominator is always positive and the
/// pair is kept in lowest terms, so structural equality is value equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rational {
    numer: BigInt,
    denom: BigInt,
}

impl Rational {
    /// Builds a rational in reduced form. The denominator must be nonzero;
    /// division operations check before calling.
    pub fn new(numer: BigInt, denom: BigInt) -> Self {
        debug_assert!(!denom.is_zero());
        let gcd = numer.gcd(&denom);
        let (mut numer, mut denom) = if gcd.is_zero() {
            (numer, denom)
        } else {
            (&numer / &gcd, &denom / &gcd)
        };
        if denom.is_negative() {
            numer = -numer;
            denom = -denom;
        }
        Self { numer, denom }
    }

    pub fn from_integer(n: BigInt) -> Self {
        Self {
            numer: n,
            denom: BigInt::from(1),
        }
    }

    pub fn numer(&self) -> &BigInt {
        &self.numer
    }

    pub fn denom(&self) -> &BigInt {
        &self.denom
    }

    pub fn is_zero(&self) -> bool {
        self.numer.is_zero()
    }

    pub fn add(&self, other: &Self) -> Self {
        Self::new(
            &self.numer * &other.denom + &other.numer * &self.denom,
            &self.denom * &other.denom,
        )
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self::new(
            &self.numer * &other.denom - &other.numer * &self.denom,
            &self.denom * &other.denom,
        )
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self::new(&self.numer * &other.numer, &self.denom * &other.denom)
    }

    /// Division; `other` must be nonzero.
    pub fn div(&self, other: &Self) -> Self {
        Self::new(&self.numer * &other.denom, &self.denom * &other.numer)
    }

    pub fn neg(&self) -> Self {
        Self {
            numer: -&self.numer,
            denom: self.denom.clone(),
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.numer.to_f64().unwrap_or(f64::NAN) / self.denom.to_f64().unwrap_or(f64::NAN)
    }
}

/// A complex number over f64 components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.re + other.re, self.im + other.im)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.re - other.re, self.im - other.im)
    }

    pub fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    pub fn div(self, other: Self) -> Self {
        let d = other.re * other.re + other.im * other.im;
        Self::new(
            (self.re * other.re + self.im * other.im) / d,
            (self.im * other.re - self.re * other.im) / d,
        )
    }

    pub fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }
}

/// A user-defined method. The body executes against the AST it was parsed
/// in — interpolation re-parses fragments into fresh trees, so the handle
/// must travel with the definition.
#[derive(Clone, Debug)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<NodeId>,
    pub ast: Rc<Ast>,
}

/// A block at a call site, packaged with its defining AST.
#[derive(Clone, Debug)]
pub struct BlockDef {
    pub params: Vec<String>,
    pub body: Vec<NodeId>,
    pub ast: Rc<Ast>,
}

/// An entry in a class or module method table.
#[derive(Clone, Debug)]
pub enum Callable {
    /// `def`-defined method.
    User(Rc<MethodDef>),

    /// Synthesized getter reading `@name`.
    AttrGetter(String),

    /// Synthesized setter writing `@name`.
    AttrSetter(String),
}

/// A class object: metadata plus the two method tables.
#[derive(Debug)]
pub struct ClassData {
    pub name: String,
    pub parent: Option<String>,
    pub instance_methods: IndexMap<String, Callable>,
    pub class_methods: IndexMap<String, Callable>,
    pub class_vars: FxHashMap<String, Value>,
}

impl ClassData {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            parent,
            instance_methods: IndexMap::new(),
            class_methods: IndexMap::new(),
            class_vars: FxHashMap::default(),
        }
    }
}

/// A module: a qualified name plus a method table.
#[derive(Debug)]
pub struct ModuleData {
    pub name: String,
    pub methods: IndexMap<String, Callable>,
}

impl ModuleData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: IndexMap::new(),
        }
    }
}

/// An object: class pointer plus its own instance-variable map.
#[derive(Debug)]
pub struct InstanceData {
    pub class: ClassRef,
    pub ivars: FxHashMap<String, Value>,
}

/// RSpec-style expectation values produced by `should` / `eq` / `be_*`.
#[derive(Clone, Debug)]
pub enum Matcher {
    /// `x.should` — wraps the actual value, waiting for `==` or a matcher.
    Should(Value),
    /// `eq(expected)`
    Eq(Value),
    BeTrue,
    BeFalse,
    BeNil,
}

impl Value {
    /// Builds a fresh shared array.
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Builds a fresh shared hash.
    pub fn hash_map(map: IndexMap<Value, Value>) -> Value {
        Value::Hash(Rc::new(RefCell::new(map)))
    }

    pub fn integer(n: i64) -> Value {
        Value::Integer(BigInt::from(n))
    }

    /// Ruby truthiness: only `nil` and `false` are falsy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// The name of the value's class, as `.class` reports it.
    pub fn class_name(&self) -> String {
        match self {
            Value::Nil => "NilClass".to_string(),
            Value::Bool(true) => "TrueClass".to_string(),
            Value::Bool(false) => "FalseClass".to_string(),
            Value::Integer(_) => "Integer".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Rational(_) => "Rational".to_string(),
            Value::Complex(_) => "Complex".to_string(),
            Value::Symbol(_) => "Symbol".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::Array(_) => "Array".to_string(),
            Value::Hash(_) => "Hash".to_string(),
            Value::Range(_) => "Range".to_string(),
            Value::Class(_) => "Class".to_string(),
            Value::Module(_) => "Module".to_string(),
            Value::Instance(i) => i.borrow().class.borrow().name.clone(),
            Value::Method(_) => "Method".to_string(),
            Value::Matcher(_) => "Matcher".to_string(),
        }
    }

    /// Converts to f64 where a numeric reading exists.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => n.to_f64(),
            Value::Float(f) => Some(*f),
            Value::Rational(r) => Some(r.to_f64()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Integer(_) | Value::Float(_) | Value::Rational(_) | Value::Complex(_)
        )
    }

    /// Language-level `==`: value equality with numeric coercion across
    /// Integer / Float / Rational.
    pub fn ruby_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Rational(a), Value::Rational(b)) => a == b,
            (Value::Complex(a), Value::Complex(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (a.to_f64(), b.to_f64()) {
                    (Some(x), Some(y)) => x == y,
                    // One side is complex
                    _ => match (a, b) {
                        (Value::Complex(c), other) | (other, Value::Complex(c)) => {
                            c.im == 0.0 && other.to_f64() == Some(c.re)
                        }
                        _ => false,
                    },
                }
            }
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.ruby_eq(y))
            }
            (Value::Hash(a), Value::Hash(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.ruby_eq(w)))
            }
            (Value::Range(a), Value::Range(b)) => {
                a.inclusive == b.inclusive && a.start.ruby_eq(&b.start) && a.end.ruby_eq(&b.end)
            }
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `equal?` — reference identity for containers, value identity for
    /// immediates.
    pub fn identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => self.ruby_eq(other),
        }
    }

    /// `object_id` — stable within a run. Small immediates use Ruby-like
    /// encodings; reference types use their address.
    pub fn object_id(&self) -> BigInt {
        match self {
            Value::Nil => BigInt::from(8),
            Value::Bool(false) => BigInt::from(0),
            Value::Bool(true) => BigInt::from(20),
            Value::Integer(n) => n.clone() * 2 + 1,
            Value::Array(a) => BigInt::from(Rc::as_ptr(a) as usize),
            Value::Hash(h) => BigInt::from(Rc::as_ptr(h) as usize),
            Value::Instance(i) => BigInt::from(Rc::as_ptr(i) as usize),
            Value::Class(c) => BigInt::from(Rc::as_ptr(c) as usize),
            Value::Module(m) => BigInt::from(Rc::as_ptr(m) as usize),
            other => {
                let mut hasher = rustc_hash::FxHasher::default();
                other.hash(&mut hasher);
                BigInt::from(hasher.finish())
            }
        }
    }

    /// Default `to_s` (no user-method dispatch; the interpreter layers
    /// that on for instances).
    pub fn default_to_s(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Rational(r) => format!("{}/{}", r.numer(), r.denom()),
            Value::Complex(c) => format_complex(*c),
            Value::Symbol(s) => s.clone(),
            Value::Str(s) => s.clone(),
            Value::Array(_) | Value::Hash(_) => self.default_inspect(),
            Value::Range(r) => format!(
                "{}{}{}",
                r.start.default_to_s(),
                if r.inclusive { ".." } else { "..." },
                r.end.default_to_s()
            ),
            Value::Class(c) => c.borrow().name.clone(),
            Value::Module(m) => m.borrow().name.clone(),
            Value::Instance(i) => format!("#<{}>", i.borrow().class.borrow().name),
            Value::Method(m) => format!("#<Method {}>", m.name),
            Value::Matcher(_) => "#<Matcher>".to_string(),
        }
    }

    /// Default `inspect`: strings quoted, symbols with their colon, arrays
    /// space-separated with bare symbols, hashes as `{k=>v, ...}`.
    pub fn default_inspect(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(s) => inspect_string(s),
            Value::Symbol(s) => format!(":{}", s),
            Value::Rational(r) => format!("({}/{})", r.numer(), r.denom()),
            Value::Complex(c) => format!("({})", format_complex(*c)),
            Value::Array(a) => {
                let parts: Vec<String> =
                    a.borrow().iter().map(Value::display_element).collect();
                format!("[{}]", parts.join(" "))
            }
            Value::Hash(h) => {
                let parts: Vec<String> = h
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}=>{}", k.display_element(), v.display_element()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            other => other.default_to_s(),
        }
    }

    /// Element formatting inside array/hash displays: strings quoted,
    /// symbols bare (no leading colon), everything else recursive.
    pub fn display_element(&self) -> String {
        match self {
            Value::Str(s) => inspect_string(s),
            Value::Symbol(s) => s.clone(),
            Value::Nil => "nil".to_string(),
            other => other.default_inspect(),
        }
    }
}

/// Strict hash-key equality: same variant, floats by bit pattern,
/// reference types by pointer, strings and immediates by value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Complex(a), Value::Complex(b)) => {
                a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits()
            }
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Rational(a), Value::Rational(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Range(a), Value::Range(b)) => {
                a.inclusive == b.inclusive && a.start == b.start && a.end == b.end
            }
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => Rc::ptr_eq(a, b),
            (Value::Matcher(a), Value::Matcher(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Rational(r) => {
                r.numer().hash(state);
                r.denom().hash(state);
            }
            Value::Complex(c) => {
                c.re.to_bits().hash(state);
                c.im.to_bits().hash(state);
            }
            Value::Symbol(s) | Value::Str(s) => s.hash(state),
            Value::Array(a) => {
                for v in a.borrow().iter() {
                    v.hash(state);
                }
            }
            Value::Hash(h) => h.borrow().len().hash(state),
            Value::Range(r) => {
                r.start.hash(state);
                r.end.hash(state);
                r.inclusive.hash(state);
            }
            Value::Class(c) => (Rc::as_ptr(c) as usize).hash(state),
            Value::Module(m) => (Rc::as_ptr(m) as usize).hash(state),
            Value::Instance(i) => (Rc::as_ptr(i) as usize).hash(state),
            Value::Method(m) => (Rc::as_ptr(m) as usize).hash(state),
            Value::Matcher(m) => (Rc::as_ptr(m) as usize).hash(state),
        }
    }
}

/// Ruby-style float formatting: integral values keep one decimal place.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// `3+4i` / `3-4i`, with integral components printed without decimals.
fn format_complex(c: Complex) -> String {
    fn part(f: f64) -> String {
        if f.fract() == 0.0 && f.abs() < 1e16 {
            format!("{}", f as i64)
        } else {
            format!("{}", f)
        }
    }
    if c.im.is_sign_negative() {
        format!("{}-{}i", part(c.re), part(-c.im))
    } else {
        format!("{}+{}i", part(c.re), part(c.im))
    }
}

fn inspect_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_ruby() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(Value::integer(0).truthy());
        assert!(Value::Str(String::new()).truthy());
    }

    #[test]
    fn numeric_equality_crosses_types() {
        assert!(Value::integer(1).ruby_eq(&Value::Float(1.0)));
        let half = Value::Rational(Rational::new(BigInt::from(1), BigInt::from(2)));
        assert!(half.ruby_eq(&Value::Float(0.5)));
        assert!(!Value::integer(1).ruby_eq(&Value::Float(1.5)));
    }

    #[test]
    fn rationals_reduce_on_construction() {
        let r = Rational::new(BigInt::from(15), BigInt::from(10));
        assert_eq!(r.numer(), &BigInt::from(3));
        assert_eq!(r.denom(), &BigInt::from(2));

        let neg = Rational::new(BigInt::from(3), BigInt::from(-6));
        assert_eq!(neg.numer(), &BigInt::from(-1));
        assert_eq!(neg.denom(), &BigInt::from(2));
    }

    #[test]
    fn shared_arrays_compare_by_contents() {
        let a = Value::array(vec![Value::integer(1), Value::integer(2)]);
        let b = Value::array(vec![Value::integer(1), Value::integer(2)]);
        assert!(a.ruby_eq(&b));
        assert!(!a.identity_eq(&b));
        assert!(a.identity_eq(&a.clone()));
    }

    #[test]
    fn float_formatting_keeps_one_decimal() {
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(f64::INFINITY), "Infinity");
    }

    #[test]
    fn array_inspect_is_space_separated_with_bare_symbols() {
        let arr = Value::array(vec![
            Value::integer(1),
            Value::Str("s".into()),
            Value::Symbol("sym".into()),
        ]);
        assert_eq!(arr.default_inspect(), "[1 \"s\" sym]");
    }

    #[test]
    fn hash_inspect_quotes_strings_and_bares_symbols() {
        let mut map = IndexMap::new();
        map.insert(Value::Symbol("a".into()), Value::integer(1));
        map.insert(Value::Str("k".into()), Value::integer(2));
        let h = Value::hash_map(map);
        assert_eq!(h.default_inspect(), "{a=>1, \"k\"=>2}");
    }

    #[test]
    fn complex_formatting_handles_signs() {
        assert_eq!(
            Value::Complex(Complex::new(3.0, 4.0)).default_to_s(),
            "3+4i"
        );
        assert_eq!(
            Value::Complex(Complex::new(0.0, -2.5)).default_to_s(),
            "0-2.5i"
        );
    }

    #[test]
    fn range_to_s_uses_dot_count() {
        let r = Value::Range(Box::new(RangeValue {
            start: Value::integer(1),
            end: Value::integer(5),
            inclusive: false,
        }));
        assert_eq!(r.default_to_s(), "1...5");
    }
}
