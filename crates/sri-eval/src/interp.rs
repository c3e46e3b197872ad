//! The tree walker.
//!
//! [`Interpreter::eval_node`] dispatches on node type. Expressions produce
//! a value; statements produce the last expression's value. `break`,
//! `next`, and `return` are modeled as [`Flow`] variants that unwind until
//! the nearest matching consumer: loops eat `Break`/`Next`, method frames
//! eat `Return`. `loop do ... break v end` yields `v`; the other loops
//! yield their last body value and discard the break value.
//!
//! Method dispatch at a call site tries, in order: class methods on class
//! receivers, user-defined instance methods, block-iterator methods on
//! enumerable receivers, registry built-ins along the ancestor chain, and
//! finally `new` on classes. The first hit wins; a miss is NoMethodError.

use std::cell::RefCell;
use std::io::Write;
use std::mem;
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use rustc_hash::FxHashMap;
use tracing::trace;

use sri_lex::lexer::{ESCAPED_NEWLINE, ESCAPED_SPACE, ESCAPED_TAB};
use sri_lex::StrPart;
use sri_par::{Ast, BinOp, Literal, NodeId, NodeType, ParsedProgram, Parser, UnOp};
use sri_util::{Result, RubyError};

use crate::builtins;
use crate::registry::{self, MethodRegistry};
use crate::scope::Scope;
use crate::value::{
    BlockDef, Callable, ClassData, ClassRef, Complex, InstanceData, Matcher, MethodDef,
    ModuleData, Rational, RangeValue, Value,
};

/// The result of evaluating one node: a plain value, or an unwinding
/// signal still looking for its consumer.
#[derive(Clone, Debug)]
pub enum Flow {
    Normal(Value),
    Break(Value),
    Next(Value),
    Return(Value),
}

impl Flow {
    /// Collapses the flow to its carried value; used at frame boundaries
    /// where every signal has been consumed.
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(v) | Flow::Break(v) | Flow::Next(v) | Flow::Return(v) => v,
        }
    }
}

/// Unwraps a `Flow::Normal` or propagates the signal to the caller.
macro_rules! value_of {
    ($interp:expr, $ast:expr, $id:expr) => {
        match $interp.eval_node($ast, $id)? {
            Flow::Normal(v) => v,
            other => return Ok(other),
        }
    };
}

/// Where `def` and `attr_*` land while a class or module body runs.
enum DefTarget {
    Class(ClassRef),
    Module(Rc<RefCell<ModuleData>>),
}

/// A block's verdict for one iteration, as the block-iterator built-ins
/// see it: a value for this element, or a demand to stop the whole
/// iteration with a final value.
pub(crate) enum BlockOutcome {
    Value(Value),
    Stop(Value),
}

/// The evaluator. One instance per program run; owns the scope, the
/// registry, and the output sink.
pub struct Interpreter {
    registry: MethodRegistry,
    pub(crate) scope: Scope,
    self_stack: Vec<Value>,
    def_stack: Vec<DefTarget>,
    out: Box<dyn Write>,
    builtin_classes: FxHashMap<String, Value>,
    base_scope: Scope,
}

impl Interpreter {
    /// Creates an interpreter writing to `out`, with the built-in class
    /// hierarchy seeded into the top-level scope.
    pub fn new(out: Box<dyn Write>) -> Self {
        let mut interp = Self {
            registry: MethodRegistry::with_builtins(),
            scope: Scope::new(),
            self_stack: Vec::new(),
            def_stack: Vec::new(),
            out,
            builtin_classes: FxHashMap::default(),
            base_scope: Scope::new(),
        };
        interp.seed_builtin_classes();
        interp.base_scope = interp.scope.clone();
        interp
    }

    /// Writes to stdout by default.
    pub fn with_stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn seed_builtin_classes(&mut self) {
        const HIERARCHY: &[(&str, Option<&str>)] = &[
            ("BasicObject", None),
            ("Object", Some("BasicObject")),
            ("Numeric", Some("Object")),
            ("Integer", Some("Numeric")),
            ("Float", Some("Numeric")),
            ("Rational", Some("Numeric")),
            ("Complex", Some("Numeric")),
            ("String", Some("Object")),
            ("Symbol", Some("Object")),
            ("Array", Some("Object")),
            ("Hash", Some("Object")),
            ("Range", Some("Object")),
            ("NilClass", Some("Object")),
            ("TrueClass", Some("Object")),
            ("FalseClass", Some("Object")),
        ];
        for (name, parent) in HIERARCHY {
            let class = Value::Class(Rc::new(RefCell::new(ClassData::new(
                *name,
                parent.map(|p| p.to_string()),
            ))));
            self.scope.define_class(name, class.clone());
            self.builtin_classes.insert(name.to_string(), class);
        }
        let kernel = Value::Module(Rc::new(RefCell::new(ModuleData::new("Kernel"))));
        self.scope.define_module("Kernel", kernel.clone());
        self.builtin_classes.insert("Kernel".to_string(), kernel);
    }

    /// Access to the top-level scope, for seeding host bindings.
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Parses and runs `source`; returns the final expression's value.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let program = Parser::parse(source)?;
        self.eval_program(program)
    }

    /// Runs an already-parsed program.
    pub fn eval_program(&mut self, program: ParsedProgram) -> Result<Value> {
        let ast = Rc::new(program.ast);
        let statements = ast.statements_of(program.root).cloned().unwrap_or_default();
        let mut last = Value::Nil;
        for stmt in statements {
            last = self.eval_node(&ast, stmt)?.into_value();
        }
        let _ = self.out.flush();
        Ok(last)
    }

    /// Lexes, parses, and evaluates a source fragment in the current
    /// scope. Interpolation and `eval` both come through here.
    pub(crate) fn eval_fragment(&mut self, source: &str) -> Result<Value> {
        trace!(fragment = source, "re-parsing fragment");
        let program = Parser::parse(source)?;
        let ast = Rc::new(program.ast);
        let statements = ast.statements_of(program.root).cloned().unwrap_or_default();
        Ok(self.eval_statements(&ast, &statements)?.into_value())
    }

    /// Runs a fragment in a fresh top-level scope (Kernel `eval`).
    pub(crate) fn eval_isolated(&mut self, source: &str) -> Result<Value> {
        let saved_scope = mem::replace(&mut self.scope, self.base_scope.clone());
        let saved_selves = mem::take(&mut self.self_stack);
        let result = self.eval_fragment(source);
        self.scope = saved_scope;
        self.self_stack = saved_selves;
        result
    }

    // =========================================================================
    // CORE WALK
    // =========================================================================

    pub(crate) fn eval_statements(&mut self, ast: &Rc<Ast>, stmts: &[NodeId]) -> Result<Flow> {
        let mut last = Value::Nil;
        for &stmt in stmts {
            match self.eval_node(ast, stmt)? {
                Flow::Normal(v) => last = v,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal(last))
    }

    pub(crate) fn eval_node(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        match ast.node_type(id) {
            NodeType::Program => {
                let stmts = ast.statements_of(id).cloned().unwrap_or_default();
                self.eval_statements(ast, &stmts)
            }

            // Literals
            NodeType::IntegerLit => match ast.value(id) {
                Some(Literal::Int(n)) => Ok(Flow::Normal(Value::Integer(n.clone()))),
                _ => Err(self.malformed(ast, id, "integer value")),
            },
            NodeType::FloatLit => match ast.value(id) {
                Some(Literal::Float(f)) => Ok(Flow::Normal(Value::Float(*f))),
                _ => Err(self.malformed(ast, id, "float value")),
            },
            NodeType::RationalLit => {
                let numer = ast
                    .numerator(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "numerator"))?;
                let denom = ast
                    .denominator(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "denominator"))?;
                if denom.is_zero() {
                    return Err(RubyError::ZeroDivision);
                }
                Ok(Flow::Normal(Value::Rational(Rational::new(numer, denom))))
            }
            NodeType::ComplexLit => {
                let re = ast.real(id).copied().unwrap_or(0.0);
                let im = ast.imaginary(id).copied().unwrap_or(0.0);
                Ok(Flow::Normal(Value::Complex(Complex::new(re, im))))
            }
            NodeType::StringLit => match ast.value(id) {
                Some(Literal::Str(s)) => Ok(Flow::Normal(Value::Str(s.clone()))),
                _ => Err(self.malformed(ast, id, "string value")),
            },
            NodeType::InterpolatedStringLit => {
                let parts = match ast.value(id) {
                    Some(Literal::StrParts(parts)) => parts.clone(),
                    _ => return Err(self.malformed(ast, id, "string parts")),
                };
                let mut text = String::new();
                for part in parts {
                    match part {
                        StrPart::Text(t) => text.push_str(&t),
                        StrPart::Expr(src) => {
                            let v = self.eval_fragment(&src)?;
                            text.push_str(&self.value_to_s(&v)?);
                        }
                    }
                }
                Ok(Flow::Normal(Value::Str(text)))
            }
            NodeType::SymbolLit => match ast.value(id) {
                Some(Literal::Symbol(s)) => Ok(Flow::Normal(Value::Symbol(s.clone()))),
                _ => Err(self.malformed(ast, id, "symbol value")),
            },
            NodeType::NilLit => Ok(Flow::Normal(Value::Nil)),
            NodeType::BoolLit => match ast.value(id) {
                Some(Literal::Bool(b)) => Ok(Flow::Normal(Value::Bool(*b))),
                _ => Err(self.malformed(ast, id, "bool value")),
            },
            NodeType::WordArrayLit => {
                let (words, interpolated) = match ast.value(id) {
                    Some(Literal::Words { words, interpolated }) => {
                        (words.clone(), *interpolated)
                    }
                    _ => return Err(self.malformed(ast, id, "word list")),
                };
                let mut elements = Vec::with_capacity(words.len());
                for word in words {
                    let restored = restore_word_escapes(&word);
                    let text = if interpolated {
                        self.interpolate_text(&restored)?
                    } else {
                        restored
                    };
                    elements.push(Value::Str(text));
                }
                Ok(Flow::Normal(Value::array(elements)))
            }
            NodeType::ArrayLit => {
                let nodes = ast.elements_of(id).cloned().unwrap_or_default();
                let mut elements = Vec::with_capacity(nodes.len());
                for node in nodes {
                    if ast.node_type(node) == NodeType::Splat {
                        let operand = ast
                            .expression(node)
                            .ok_or_else(|| self.malformed(ast, node, "splat operand"))?;
                        let v = value_of!(self, ast, operand);
                        elements.extend(self.splat_values(&v)?);
                    } else {
                        elements.push(value_of!(self, ast, node));
                    }
                }
                Ok(Flow::Normal(Value::array(elements)))
            }
            NodeType::HashLit => {
                let pairs = ast.pairs_of(id).cloned().unwrap_or_default();
                let mut map = IndexMap::with_capacity(pairs.len());
                for (k, v) in pairs {
                    let key = value_of!(self, ast, k);
                    let value = value_of!(self, ast, v);
                    map.insert(key, value);
                }
                Ok(Flow::Normal(Value::hash_map(map)))
            }
            NodeType::RangeLit => {
                let left = ast
                    .left(id)
                    .ok_or_else(|| self.malformed(ast, id, "range start"))?;
                let right = ast
                    .right(id)
                    .ok_or_else(|| self.malformed(ast, id, "range end"))?;
                let inclusive = matches!(ast.value(id), Some(Literal::Bool(true)));
                let start = value_of!(self, ast, left);
                let end = value_of!(self, ast, right);
                let numeric = start.is_numeric() && end.is_numeric();
                let chars = matches!((&start, &end), (Value::Str(_), Value::Str(_)));
                if !numeric && !chars {
                    return Err(RubyError::Type(format!(
                        "bad value for range: {}..{}",
                        start.class_name(),
                        end.class_name()
                    )));
                }
                Ok(Flow::Normal(Value::Range(Box::new(RangeValue {
                    start,
                    end,
                    inclusive,
                }))))
            }

            // Names
            NodeType::Identifier => {
                let name = ast
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "identifier name"))?;
                self.eval_identifier(&name).map(Flow::Normal)
            }
            NodeType::QualifiedName => {
                let qname = ast
                    .qualified_name(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "qualified name"))?;
                if let Some(v) = self.scope.get(&qname) {
                    return Ok(Flow::Normal(v));
                }
                if let Some(m) = self.scope.lookup_module(&qname) {
                    return Ok(Flow::Normal(m));
                }
                Err(RubyError::UninitializedConstant(qname))
            }
            NodeType::InstanceVar => {
                let name = ast
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "variable name"))?;
                self.read_instance_var(&name).map(Flow::Normal)
            }
            NodeType::ClassVar => {
                let name = ast
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "variable name"))?;
                self.read_class_var(&name).map(Flow::Normal)
            }
            NodeType::SelfExpr => Ok(Flow::Normal(
                self.current_self().unwrap_or(Value::Nil),
            )),

            // Operations
            NodeType::BinaryOp => self.eval_binary(ast, id),
            NodeType::UnaryOp => {
                let op = *ast
                    .unary_operator(id)
                    .ok_or_else(|| self.malformed(ast, id, "unary operator"))?;
                let operand_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "operand"))?;
                let operand = value_of!(self, ast, operand_id);
                self.unary_op(op, operand).map(Flow::Normal)
            }
            NodeType::Splat => {
                let operand = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "splat operand"))?;
                let v = value_of!(self, ast, operand);
                let values = self.splat_values(&v)?;
                Ok(Flow::Normal(Value::array(values)))
            }
            NodeType::Index => {
                let recv_id = ast
                    .receiver(id)
                    .ok_or_else(|| self.malformed(ast, id, "index receiver"))?;
                let recv = value_of!(self, ast, recv_id);
                let index_nodes = ast.arguments_of(id).cloned().unwrap_or_default();
                let mut indices = Vec::with_capacity(index_nodes.len());
                for node in index_nodes {
                    indices.push(value_of!(self, ast, node));
                }
                self.index_read(&recv, &indices).map(Flow::Normal)
            }
            NodeType::MethodCall => self.eval_method_call(ast, id),
            NodeType::Block => Err(self.malformed(ast, id, "free-standing block")),

            // Assignments
            NodeType::Assignment => {
                let name = ast
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "assignment target"))?;
                let value_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment value"))?;
                let value = value_of!(self, ast, value_id);
                self.assign_name(&name, value.clone());
                Ok(Flow::Normal(value))
            }
            NodeType::CompoundAssignment => {
                let name = ast
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "assignment target"))?;
                let op = *ast
                    .operator(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment operator"))?;
                let value_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment value"))?;
                let rhs = value_of!(self, ast, value_id);
                // Unbound names start from the operator's identity element.
                let current = self.scope.get(&name).unwrap_or(match op {
                    BinOp::Mul | BinOp::Div => Value::integer(1),
                    _ => Value::integer(0),
                });
                let value = self.binary_op(op, current, rhs)?;
                self.scope.set(name, value.clone());
                Ok(Flow::Normal(value))
            }
            NodeType::MultipleAssignment => {
                let names = ast
                    .variables_of(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "assignment targets"))?;
                let value_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment value"))?;
                let value = value_of!(self, ast, value_id);
                let items: Vec<Value> = match &value {
                    Value::Array(a) => a.borrow().clone(),
                    other => vec![other.clone()],
                };
                for (i, name) in names.iter().enumerate() {
                    self.scope
                        .set(name.clone(), items.get(i).cloned().unwrap_or(Value::Nil));
                }
                Ok(Flow::Normal(value))
            }
            NodeType::IndexAssignment => {
                let target_id = ast
                    .target_expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment target"))?;
                let index_id = ast
                    .index(id)
                    .ok_or_else(|| self.malformed(ast, id, "index"))?;
                let value_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment value"))?;
                let target = value_of!(self, ast, target_id);
                let index = value_of!(self, ast, index_id);
                let value = value_of!(self, ast, value_id);
                self.index_write(&target, index, value.clone())?;
                Ok(Flow::Normal(value))
            }
            NodeType::AttrAssignment => {
                let target_id = ast
                    .target_expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment target"))?;
                let name = ast
                    .name(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "attribute name"))?;
                let value_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment value"))?;
                let target = value_of!(self, ast, target_id);
                let value = value_of!(self, ast, value_id);
                self.call_method(&target, &format!("{}=", name), &[value.clone()])?;
                Ok(Flow::Normal(value))
            }
            NodeType::InstanceVarAssignment => {
                let name = ast
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "variable name"))?;
                let value_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment value"))?;
                let value = value_of!(self, ast, value_id);
                self.write_instance_var(&name, value.clone())?;
                Ok(Flow::Normal(value))
            }
            NodeType::ClassVarAssignment => {
                let name = ast
                    .variable(id)
                    .cloned()
                    .ok_or_else(|| self.malformed(ast, id, "variable name"))?;
                let value_id = ast
                    .expression(id)
                    .ok_or_else(|| self.malformed(ast, id, "assignment value"))?;
                let value = value_of!(self, ast, value_id);
                self.write_class_var(&name, value.clone())?;
                Ok(Flow::Normal(value))
            }

            // Definitions
            NodeType::MethodDefinition => self.eval_method_definition(ast, id, false),
            NodeType::SelfMethodDefinition => self.eval_method_definition(ast, id, true),
            NodeType::ClassDefinition => self.eval_class_definition(ast, id),
            NodeType::ModuleDefinition => self.eval_module_definition(ast, id),
            NodeType::AttrDeclaration => self.eval_attr_declaration(ast, id),

            // Control flow
            NodeType::If => {
                let cond_id = ast
                    .condition(id)
                    .ok_or_else(|| self.malformed(ast, id, "condition"))?;
                let cond = value_of!(self, ast, cond_id);
                if cond.truthy() {
                    let then = ast.then_branch(id).cloned().unwrap_or_default();
                    self.eval_statements(ast, &then)
                } else {
                    let els = ast.else_branch(id).cloned().unwrap_or_default();
                    self.eval_statements(ast, &els)
                }
            }
            NodeType::While => self.eval_while(ast, id, false),
            NodeType::Until => self.eval_while(ast, id, true),
            NodeType::For => self.eval_for(ast, id),
            NodeType::Loop => self.eval_loop(ast, id),
            NodeType::Case => self.eval_case(ast, id),
            NodeType::When => Err(self.malformed(ast, id, "free-standing when")),
            NodeType::Return => {
                let value = match ast.expression(id) {
                    Some(e) => value_of!(self, ast, e),
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            NodeType::Break => {
                let value = match ast.expression(id) {
                    Some(e) => value_of!(self, ast, e),
                    None => Value::Nil,
                };
                Ok(Flow::Break(value))
            }
            NodeType::Next => {
                let value = match ast.expression(id) {
                    Some(e) => value_of!(self, ast, e),
                    None => Value::Nil,
                };
                Ok(Flow::Next(value))
            }
        }
    }

    fn malformed(&self, ast: &Ast, id: NodeId, what: &str) -> RubyError {
        RubyError::Type(format!(
            "malformed syntax tree at {}: missing {}",
            ast.position(id),
            what
        ))
    }

    // =========================================================================
    // NAMES
    // =========================================================================

    fn eval_identifier(&mut self, name: &str) -> Result<Value> {
        if let Some(v) = self.scope.get(name) {
            return Ok(v);
        }

        // Bare method call on the implicit self.
        if let Some(Value::Instance(inst)) = self.current_self() {
            let class = inst.borrow().class.clone();
            if let Some(callable) = self.find_instance_method(&class, name) {
                let recv = Value::Instance(inst);
                return self.invoke_callable(&callable, &recv, &[]);
            }
        }

        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            if let Some(c) = self.scope.lookup_class(name) {
                return Ok(c);
            }
            if let Some(m) = self.scope.lookup_module(name) {
                return Ok(m);
            }
            return Err(RubyError::UninitializedConstant(name.to_string()));
        }

        if let Some(Value::Method(m)) = self.scope.lookup_method(name) {
            return self.call_user_method(&m, self.current_self(), &[]);
        }
        if let Some(f) = self.registry.lookup("Object", name) {
            let recv = self.current_self().unwrap_or(Value::Nil);
            return f(self, &recv, &[]);
        }
        Err(RubyError::UndefinedVariable(name.to_string()))
    }

    fn assign_name(&mut self, name: &str, value: Value) {
        // Constants defined in a module body are stored fully qualified.
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            if let Some(DefTarget::Module(m)) = self.def_stack.last() {
                let qualified = format!("{}::{}", m.borrow().name, name);
                self.scope.set(qualified, value);
                return;
            }
        }
        self.scope.set(name.to_string(), value);
    }

    fn read_instance_var(&self, name: &str) -> Result<Value> {
        match self.current_self() {
            Some(Value::Instance(inst)) => Ok(inst
                .borrow()
                .ivars
                .get(name)
                .cloned()
                .unwrap_or(Value::Nil)),
            _ => Err(RubyError::UndefinedVariable(format!("@{}", name))),
        }
    }

    fn write_instance_var(&mut self, name: &str, value: Value) -> Result<()> {
        match self.current_self() {
            Some(Value::Instance(inst)) => {
                inst.borrow_mut().ivars.insert(name.to_string(), value);
                Ok(())
            }
            _ => Err(RubyError::UndefinedVariable(format!("@{}", name))),
        }
    }

    fn class_var_target(&self) -> Option<ClassRef> {
        match self.current_self() {
            Some(Value::Instance(inst)) => return Some(inst.borrow().class.clone()),
            Some(Value::Class(c)) => return Some(c),
            _ => {}
        }
        for target in self.def_stack.iter().rev() {
            if let DefTarget::Class(c) = target {
                return Some(c.clone());
            }
        }
        None
    }

    fn read_class_var(&self, name: &str) -> Result<Value> {
        match self.class_var_target() {
            Some(class) => Ok(class
                .borrow()
                .class_vars
                .get(name)
                .cloned()
                .unwrap_or(Value::Nil)),
            None => Err(RubyError::UndefinedVariable(format!("@@{}", name))),
        }
    }

    fn write_class_var(&mut self, name: &str, value: Value) -> Result<()> {
        match self.class_var_target() {
            Some(class) => {
                class.borrow_mut().class_vars.insert(name.to_string(), value);
                Ok(())
            }
            None => Err(RubyError::UndefinedVariable(format!("@@{}", name))),
        }
    }

    pub(crate) fn current_self(&self) -> Option<Value> {
        self.self_stack.last().cloned()
    }

    // =========================================================================
    // CONTROL FLOW
    // =========================================================================

    fn eval_while(&mut self, ast: &Rc<Ast>, id: NodeId, invert: bool) -> Result<Flow> {
        let cond_id = ast
            .condition(id)
            .ok_or_else(|| self.malformed(ast, id, "condition"))?;
        let body = ast.body(id).cloned().unwrap_or_default();
        let mut last = Value::Nil;
        loop {
            let cond = value_of!(self, ast, cond_id);
            if cond.truthy() == invert {
                break;
            }
            match self.eval_statements(ast, &body)? {
                Flow::Normal(v) => last = v,
                // `while`/`until` discard the break value and yield the
                // last completed body value.
                Flow::Break(_) => break,
                Flow::Next(_) => continue,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn eval_loop(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let body = ast.body(id).cloned().unwrap_or_default();
        loop {
            match self.eval_statements(ast, &body)? {
                Flow::Normal(_) | Flow::Next(_) => continue,
                // `loop do ... break v end` yields v.
                Flow::Break(v) => return Ok(Flow::Normal(v)),
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
    }

    fn eval_for(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let names = ast
            .variables_of(id)
            .cloned()
            .ok_or_else(|| self.malformed(ast, id, "loop variables"))?;
        let iterable_id = ast
            .iterable(id)
            .ok_or_else(|| self.malformed(ast, id, "iterable"))?;
        let body = ast.body(id).cloned().unwrap_or_default();

        let iterable = value_of!(self, ast, iterable_id);
        let items = self.iterable_values(&iterable)?;

        let mut last = Value::Nil;
        for item in items {
            self.bind_for_variables(&names, &item);
            match self.eval_statements(ast, &body)? {
                Flow::Normal(v) => last = v,
                Flow::Break(_) => break,
                Flow::Next(_) => continue,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(last))
    }

    /// Destructures one element across the `for` variables. A `*name`
    /// entry collects the contiguous middle slice.
    fn bind_for_variables(&mut self, names: &[String], element: &Value) {
        if names.len() == 1 && !names[0].starts_with('*') {
            self.scope.set(names[0].clone(), element.clone());
            return;
        }
        let items: Vec<Value> = match element {
            Value::Array(a) => a.borrow().clone(),
            other => vec![other.clone()],
        };
        if let Some(splat_pos) = names.iter().position(|n| n.starts_with('*')) {
            let after = names.len() - splat_pos - 1;
            for (i, name) in names[..splat_pos].iter().enumerate() {
                self.scope
                    .set(name.clone(), items.get(i).cloned().unwrap_or(Value::Nil));
            }
            let middle_len = items.len().saturating_sub(splat_pos + after);
            let middle: Vec<Value> = items.iter().skip(splat_pos).take(middle_len).cloned().collect();
            self.scope
                .set(names[splat_pos][1..].to_string(), Value::array(middle));
            for (i, name) in names[splat_pos + 1..].iter().enumerate() {
                let idx = splat_pos + middle_len + i;
                self.scope
                    .set(name.clone(), items.get(idx).cloned().unwrap_or(Value::Nil));
            }
        } else {
            for (i, name) in names.iter().enumerate() {
                self.scope
                    .set(name.clone(), items.get(i).cloned().unwrap_or(Value::Nil));
            }
        }
    }

    fn eval_case(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let subject = match ast.expression(id) {
            Some(e) => Some(value_of!(self, ast, e)),
            None => None,
        };
        let whens = ast.when_clauses_of(id).cloned().unwrap_or_default();
        for when in whens {
            let conditions = ast.conditions_of(when).cloned().unwrap_or_default();
            for cond_id in conditions {
                let cond = value_of!(self, ast, cond_id);
                let matched = match &subject {
                    Some(subject) => self.case_eq(&cond, subject),
                    None => cond.truthy(),
                };
                if matched {
                    let stmts = ast.statements_of(when).cloned().unwrap_or_default();
                    return self.eval_statements(ast, &stmts);
                }
            }
        }
        let els = ast.else_clause(id).cloned().unwrap_or_default();
        self.eval_statements(ast, &els)
    }

    /// Case equality (`===`): classes match by type, ranges by inclusion,
    /// everything else structurally.
    pub(crate) fn case_eq(&mut self, pattern: &Value, value: &Value) -> bool {
        match pattern {
            Value::Class(c) => {
                let name = c.borrow().name.clone();
                self.value_is_a(value, &name)
            }
            Value::Range(r) => self.range_includes(r, value),
            _ => pattern.ruby_eq(value),
        }
    }

    pub(crate) fn value_is_a(&self, value: &Value, class_name: &str) -> bool {
        if class_name == "Kernel" {
            return !matches!(value, Value::Matcher(_));
        }
        if let Value::Instance(inst) = value {
            let mut current = Some(inst.borrow().class.clone());
            while let Some(c) = current {
                if c.borrow().name == class_name {
                    return true;
                }
                let parent = c.borrow().parent.clone();
                current = parent.and_then(|p| match self.scope.lookup_class(&p) {
                    Some(Value::Class(pc)) => Some(pc),
                    _ => None,
                });
            }
            return ["Object", "BasicObject"].contains(&class_name);
        }
        registry::ancestors(&value.class_name()).contains(&class_name)
    }

    // =========================================================================
    // DEFINITIONS
    // =========================================================================

    fn eval_method_definition(
        &mut self,
        ast: &Rc<Ast>,
        id: NodeId,
        on_self: bool,
    ) -> Result<Flow> {
        let name = ast
            .name(id)
            .cloned()
            .ok_or_else(|| self.malformed(ast, id, "method name"))?;
        let params = ast.parameters_of(id).cloned().unwrap_or_default();
        let body = ast.body(id).cloned().unwrap_or_default();
        trace!(method = %name, "defining method");

        let def = Rc::new(MethodDef {
            name: name.clone(),
            params,
            body,
            ast: ast.clone(),
        });
        match self.def_stack.last() {
            Some(DefTarget::Class(class)) => {
                let mut class = class.borrow_mut();
                if on_self {
                    class.class_methods.insert(name.clone(), Callable::User(def));
                } else {
                    class
                        .instance_methods
                        .insert(name.clone(), Callable::User(def));
                }
            }
            Some(DefTarget::Module(module)) => {
                module
                    .borrow_mut()
                    .methods
                    .insert(name.clone(), Callable::User(def));
            }
            None => {
                self.scope.define_method(&name, Value::Method(def));
            }
        }
        Ok(Flow::Normal(Value::Symbol(name)))
    }

    fn eval_class_definition(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let name = ast
            .name(id)
            .cloned()
            .ok_or_else(|| self.malformed(ast, id, "class name"))?;
        let parent = ast.variable(id).cloned();
        trace!(class = %name, parent = ?parent, "defining class");

        // Reopen an existing class, otherwise create one under Object.
        let class = match self.scope.lookup_class(&name) {
            Some(Value::Class(c)) => c,
            _ => {
                let parent = parent.or_else(|| Some("Object".to_string()));
                Rc::new(RefCell::new(ClassData::new(name.clone(), parent)))
            }
        };
        self.scope.define_class(&name, Value::Class(class.clone()));

        let body = ast.body(id).cloned().unwrap_or_default();
        self.def_stack.push(DefTarget::Class(class));
        let result = self.eval_statements(ast, &body);
        self.def_stack.pop();
        result?;
        Ok(Flow::Normal(Value::Nil))
    }

    fn eval_module_definition(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let parts = ast
            .parts_of(id)
            .cloned()
            .ok_or_else(|| self.malformed(ast, id, "module name"))?;
        // Auto-create missing parent modules: `module A::B` brings A into
        // existence as an empty module.
        let mut module = None;
        for depth in 1..=parts.len() {
            let qname = parts[..depth].join("::");
            let existing = match self.scope.lookup_module(&qname) {
                Some(Value::Module(m)) => m,
                _ => {
                    let fresh = Rc::new(RefCell::new(ModuleData::new(qname.clone())));
                    self.scope
                        .define_module(&qname, Value::Module(fresh.clone()));
                    fresh
                }
            };
            module = Some(existing);
        }
        let module = module.ok_or_else(|| self.malformed(ast, id, "module name"))?;
        trace!(module = %module.borrow().name, "defining module");

        let body = ast.body(id).cloned().unwrap_or_default();
        self.def_stack.push(DefTarget::Module(module));
        let result = self.eval_statements(ast, &body);
        self.def_stack.pop();
        result?;
        Ok(Flow::Normal(Value::Nil))
    }

    fn eval_attr_declaration(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let kind = ast
            .name(id)
            .cloned()
            .ok_or_else(|| self.malformed(ast, id, "attr kind"))?;
        let names = ast.variables_of(id).cloned().unwrap_or_default();
        let Some(DefTarget::Class(class)) = self.def_stack.last() else {
            return Err(RubyError::Type(format!(
                "attr_{} outside of class body",
                kind
            )));
        };
        let mut class = class.borrow_mut();
        for name in names {
            if kind == "accessor" || kind == "reader" {
                class
                    .instance_methods
                    .insert(name.clone(), Callable::AttrGetter(name.clone()));
            }
            if kind == "accessor" || kind == "writer" {
                class
                    .instance_methods
                    .insert(format!("{}=", name), Callable::AttrSetter(name.clone()));
            }
        }
        Ok(Flow::Normal(Value::Nil))
    }

    // =========================================================================
    // CALLS
    // =========================================================================

    fn eval_method_call(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let name = ast
            .name(id)
            .cloned()
            .ok_or_else(|| self.malformed(ast, id, "method name"))?;

        let mut args = Vec::new();
        for node in ast.arguments_of(id).cloned().unwrap_or_default() {
            if ast.node_type(node) == NodeType::Splat {
                let operand = ast
                    .expression(node)
                    .ok_or_else(|| self.malformed(ast, node, "splat operand"))?;
                let v = value_of!(self, ast, operand);
                args.extend(self.splat_values(&v)?);
            } else {
                args.push(value_of!(self, ast, node));
            }
        }

        let block = match ast.block(id) {
            Some(b) => Some(BlockDef {
                params: ast.block_params_of(b).cloned().unwrap_or_default(),
                body: ast.block_body(b).cloned().unwrap_or_default(),
                ast: ast.clone(),
            }),
            None => None,
        };

        let result = match ast.receiver(id) {
            None => self.call_function(&name, &args, block.as_ref()),
            Some(recv_id) => {
                let recv = value_of!(self, ast, recv_id);
                self.call_method_with_block(&recv, &name, &args, block.as_ref())
            }
        };
        result.map(Flow::Normal)
    }

    /// Receiverless call: implicit-self instance method, then user-defined
    /// top-level method, then Kernel built-in.
    fn call_function(
        &mut self,
        name: &str,
        args: &[Value],
        block: Option<&BlockDef>,
    ) -> Result<Value> {
        if let Some(Value::Instance(inst)) = self.current_self() {
            let class = inst.borrow().class.clone();
            if let Some(callable) = self.find_instance_method(&class, name) {
                let recv = Value::Instance(inst);
                return self.invoke_callable(&callable, &recv, args);
            }
        }
        if let Some(Value::Method(m)) = self.scope.lookup_method(name) {
            return self.call_user_method(&m, self.current_self(), args);
        }
        if let Some(f) = self.registry.lookup("Object", name) {
            let recv = self.current_self().unwrap_or(Value::Nil);
            return f(self, &recv, args);
        }
        let _ = block;
        Err(RubyError::NoMethod {
            method: name.to_string(),
            receiver: self
                .current_self()
                .map(|v| v.class_name())
                .unwrap_or_else(|| "main".to_string()),
        })
    }

    /// Dispatch for an explicit receiver, without a block.
    pub(crate) fn call_method(
        &mut self,
        recv: &Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value> {
        self.call_method_with_block(recv, name, args, None)
    }

    pub(crate) fn call_method_with_block(
        &mut self,
        recv: &Value,
        name: &str,
        args: &[Value],
        block: Option<&BlockDef>,
    ) -> Result<Value> {
        trace!(method = name, receiver = %recv.class_name(), "dispatch");

        // (a) class methods on a class receiver; module functions.
        if let Value::Class(class) = recv {
            if let Some(callable) = self.find_class_method(class, name) {
                return self.invoke_callable(&callable, recv, args);
            }
            let class_name = class.borrow().name.clone();
            if let Some(result) = builtins::numeric::class_call(self, &class_name, name, args) {
                return result;
            }
            if name == "new" {
                return self.instantiate(class.clone(), args);
            }
        }
        if let Value::Module(module) = recv {
            let found = module.borrow().methods.get(name).cloned();
            if let Some(callable) = found {
                return self.invoke_callable(&callable, recv, args);
            }
        }

        // (b) user-defined instance methods (and synthesized attrs).
        if let Value::Instance(inst) = recv {
            let class = inst.borrow().class.clone();
            if let Some(callable) = self.find_instance_method(&class, name) {
                return self.invoke_callable(&callable, recv, args);
            }
        }

        // (c) block-iterator methods on enumerable receivers.
        if let Some(result) = builtins::enumerable::call(self, recv, name, args, block) {
            return result;
        }

        // (d) built-ins along the ancestor chain.
        if let Some(f) = self.registry.lookup(&recv.class_name(), name) {
            return f(self, recv, args);
        }

        Err(RubyError::NoMethod {
            method: name.to_string(),
            receiver: recv.class_name(),
        })
    }

    fn find_instance_method(&self, class: &ClassRef, name: &str) -> Option<Callable> {
        let mut current = Some(class.clone());
        while let Some(c) = current {
            if let Some(m) = c.borrow().instance_methods.get(name) {
                return Some(m.clone());
            }
            let parent = c.borrow().parent.clone();
            current = parent.and_then(|p| match self.scope.lookup_class(&p) {
                Some(Value::Class(pc)) => Some(pc),
                _ => None,
            });
        }
        None
    }

    fn find_class_method(&self, class: &ClassRef, name: &str) -> Option<Callable> {
        let mut current = Some(class.clone());
        while let Some(c) = current {
            if let Some(m) = c.borrow().class_methods.get(name) {
                return Some(m.clone());
            }
            let parent = c.borrow().parent.clone();
            current = parent.and_then(|p| match self.scope.lookup_class(&p) {
                Some(Value::Class(pc)) => Some(pc),
                _ => None,
            });
        }
        None
    }

    fn invoke_callable(
        &mut self,
        callable: &Callable,
        recv: &Value,
        args: &[Value],
    ) -> Result<Value> {
        match callable {
            Callable::User(method) => {
                self.call_user_method(method, Some(recv.clone()), args)
            }
            Callable::AttrGetter(ivar) => match recv {
                Value::Instance(inst) => Ok(inst
                    .borrow()
                    .ivars
                    .get(ivar)
                    .cloned()
                    .unwrap_or(Value::Nil)),
                _ => Err(RubyError::Type("attribute read on non-instance".to_string())),
            },
            Callable::AttrSetter(ivar) => {
                let [value] = args else {
                    return Err(RubyError::Argument(format!(
                        "wrong number of arguments (given {}, expected 1)",
                        args.len()
                    )));
                };
                match recv {
                    Value::Instance(inst) => {
                        inst.borrow_mut()
                            .ivars
                            .insert(ivar.clone(), value.clone());
                        Ok(value.clone())
                    }
                    _ => Err(RubyError::Type(
                        "attribute write on non-instance".to_string(),
                    )),
                }
            }
        }
    }

    /// Runs a user method: child scope seeded from the caller's scope plus
    /// parameter bindings, `self` bound for instance calls, `return`
    /// consumed at this frame. The body runs against the AST it was
    /// defined in.
    fn call_user_method(
        &mut self,
        method: &Rc<MethodDef>,
        self_value: Option<Value>,
        args: &[Value],
    ) -> Result<Value> {
        if args.len() != method.params.len() {
            return Err(RubyError::Argument(format!(
                "wrong number of arguments (given {}, expected {})",
                args.len(),
                method.params.len()
            )));
        }
        let mut child = self.scope.child();
        for (param, arg) in method.params.iter().zip(args) {
            child.set(param.clone(), arg.clone());
        }
        let saved = mem::replace(&mut self.scope, child);
        let pushed = self_value.is_some();
        if let Some(sv) = self_value {
            self.self_stack.push(sv);
        }
        let outcome = self.eval_statements(&method.ast.clone(), &method.body);
        if pushed {
            self.self_stack.pop();
        }
        self.scope = saved;
        Ok(outcome?.into_value())
    }

    /// Runs a block: child scope seeded from the caller's scope, block
    /// parameters bound. The raw [`Flow`] comes back so iterating
    /// built-ins can react to `break`.
    pub(crate) fn call_block(&mut self, block: &BlockDef, args: &[Value]) -> Result<Flow> {
        let mut child = self.scope.child();
        if block.params.len() > 1 && args.len() == 1 {
            // `|k, v|` against a single pair destructures it.
            if let Value::Array(a) = &args[0] {
                let items = a.borrow().clone();
                for (i, param) in block.params.iter().enumerate() {
                    child.set(param.clone(), items.get(i).cloned().unwrap_or(Value::Nil));
                }
                return self.run_block_body(block, child);
            }
        }
        for (i, param) in block.params.iter().enumerate() {
            child.set(param.clone(), args.get(i).cloned().unwrap_or(Value::Nil));
        }
        self.run_block_body(block, child)
    }

    fn run_block_body(&mut self, block: &BlockDef, scope: Scope) -> Result<Flow> {
        let saved = mem::replace(&mut self.scope, scope);
        let result = self.eval_statements(&block.ast.clone(), &block.body);
        self.scope = saved;
        result
    }

    /// One block invocation as the iterator built-ins consume it: `next v`
    /// supplies this element's value, `break v` (or a stray `return`)
    /// halts the iteration with `v`.
    pub(crate) fn yield_to_block(
        &mut self,
        block: &BlockDef,
        args: &[Value],
    ) -> Result<BlockOutcome> {
        match self.call_block(block, args)? {
            Flow::Normal(v) | Flow::Next(v) => Ok(BlockOutcome::Value(v)),
            Flow::Break(v) | Flow::Return(v) => Ok(BlockOutcome::Stop(v)),
        }
    }

    /// `Cls.new(args)`: fresh instance-variable map, `initialize` run with
    /// `self` bound to the new instance, its return value discarded.
    fn instantiate(&mut self, class: ClassRef, args: &[Value]) -> Result<Value> {
        let instance = Value::Instance(Rc::new(RefCell::new(InstanceData {
            class: class.clone(),
            ivars: FxHashMap::default(),
        })));
        if let Some(init) = self.find_instance_method(&class, "initialize") {
            self.invoke_callable(&init, &instance, args)?;
        } else if !args.is_empty() {
            return Err(RubyError::Argument(format!(
                "wrong number of arguments (given {}, expected 0)",
                args.len()
            )));
        }
        Ok(instance)
    }

    // =========================================================================
    // OPERATORS
    // =========================================================================

    fn eval_binary(&mut self, ast: &Rc<Ast>, id: NodeId) -> Result<Flow> {
        let op = *ast
            .operator(id)
            .ok_or_else(|| self.malformed(ast, id, "operator"))?;
        let left_id = ast
            .left(id)
            .ok_or_else(|| self.malformed(ast, id, "left operand"))?;
        let right_id = ast
            .right(id)
            .ok_or_else(|| self.malformed(ast, id, "right operand"))?;

        // Short-circuit logic returns the deciding operand, Ruby-style.
        if matches!(op, BinOp::And | BinOp::Or) {
            let left = value_of!(self, ast, left_id);
            let take_right = match op {
                BinOp::And => left.truthy(),
                _ => !left.truthy(),
            };
            if !take_right {
                return Ok(Flow::Normal(left));
            }
            let right = value_of!(self, ast, right_id);
            return Ok(Flow::Normal(right));
        }

        let left = value_of!(self, ast, left_id);
        let right = value_of!(self, ast, right_id);
        self.binary_op(op, left, right).map(Flow::Normal)
    }

    pub(crate) fn binary_op(&mut self, op: BinOp, left: Value, right: Value) -> Result<Value> {
        // `x.should == y` lands here with a matcher on the left.
        if let (BinOp::Eq, Value::Matcher(m)) = (op, &left) {
            if let Matcher::Should(actual) = m.as_ref() {
                return builtins::kernel::check_expectation(
                    self,
                    actual,
                    &Matcher::Eq(right.clone()),
                );
            }
        }

        // User-defined numerics dispatch through their operator methods.
        if let Value::Instance(_) = &left {
            if op == BinOp::Eq || op == BinOp::Ne {
                let has_eq = match &left {
                    Value::Instance(i) => {
                        let class = i.borrow().class.clone();
                        self.find_instance_method(&class, "==").is_some()
                    }
                    _ => false,
                };
                if has_eq {
                    let result = self.call_method(&left, "==", &[right])?;
                    return Ok(match op {
                        BinOp::Ne => Value::Bool(!result.truthy()),
                        _ => result,
                    });
                }
                return Ok(Value::Bool(match op {
                    BinOp::Eq => left.ruby_eq(&right),
                    _ => !left.ruby_eq(&right),
                }));
            }
            return self.call_method(&left, op_name(op), &[right]);
        }

        match op {
            BinOp::Eq => Ok(Value::Bool(left.ruby_eq(&right))),
            BinOp::Ne => Ok(Value::Bool(!left.ruby_eq(&right))),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ord = self.compare_values(&left, &right)?;
                Ok(Value::Bool(match op {
                    BinOp::Lt => ord.is_lt(),
                    BinOp::Le => ord.is_le(),
                    BinOp::Gt => ord.is_gt(),
                    _ => ord.is_ge(),
                }))
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Shl => {
                self.arithmetic(op, left, right)
            }
            BinOp::And | BinOp::Or => unreachable!("short-circuit ops handled by eval_binary"),
        }
    }

    fn arithmetic(&mut self, op: BinOp, left: Value, right: Value) -> Result<Value> {
        use BinOp::*;

        // String concatenation stringifies a non-string partner.
        if op == Add {
            match (&left, &right) {
                (Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{}{}", a, b))),
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    let a = self.value_to_s(&left)?;
                    let b = self.value_to_s(&right)?;
                    return Ok(Value::Str(format!("{}{}", a, b)));
                }
                (Value::Array(a), Value::Array(b)) => {
                    let mut out = a.borrow().clone();
                    out.extend(b.borrow().iter().cloned());
                    return Ok(Value::array(out));
                }
                _ => {}
            }
        }
        if op == Mul {
            if let (Value::Str(s), Value::Integer(n)) = (&left, &right) {
                let count = n
                    .to_usize()
                    .ok_or_else(|| RubyError::Argument("negative argument".to_string()))?;
                return Ok(Value::Str(s.repeat(count)));
            }
        }
        if op == Shl {
            match (&left, &right) {
                (Value::Array(a), v) => {
                    a.borrow_mut().push(v.clone());
                    return Ok(left);
                }
                (Value::Integer(a), Value::Integer(b)) => {
                    let shift = b.to_usize().ok_or_else(|| {
                        RubyError::Argument("shift width out of range".to_string())
                    })?;
                    return Ok(Value::Integer(a.clone() << shift));
                }
                _ => {
                    return Err(RubyError::Type(format!(
                        "undefined operation: {} << {}",
                        left.class_name(),
                        right.class_name()
                    )))
                }
            }
        }

        match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => match op {
                Add => Ok(Value::Integer(a + b)),
                Sub => Ok(Value::Integer(a - b)),
                Mul => Ok(Value::Integer(a * b)),
                // Truncated toward zero, like the host.
                Div => {
                    if b.is_zero() {
                        Err(RubyError::ZeroDivision)
                    } else {
                        Ok(Value::Integer(a / b))
                    }
                }
                Mod => {
                    if b.is_zero() {
                        Err(RubyError::ZeroDivision)
                    } else {
                        Ok(Value::Integer(a % b))
                    }
                }
                _ => unreachable!(),
            },
            (Value::Complex(_), _) | (_, Value::Complex(_)) => {
                let a = self.to_complex(&left)?;
                let b = self.to_complex(&right)?;
                Ok(Value::Complex(match op {
                    Add => a.add(b),
                    Sub => a.sub(b),
                    Mul => a.mul(b),
                    Div => a.div(b),
                    _ => {
                        return Err(RubyError::Type(
                            "undefined operation on Complex".to_string(),
                        ))
                    }
                }))
            }
            (Value::Float(_), _) | (_, Value::Float(_)) => {
                let a = left.to_f64().ok_or_else(|| self.coerce_error(&left, op, &right))?;
                let b = right.to_f64().ok_or_else(|| self.coerce_error(&left, op, &right))?;
                Ok(Value::Float(match op {
                    Add => a + b,
                    Sub => a - b,
                    Mul => a * b,
                    Div => a / b,
                    Mod => a % b,
                    _ => unreachable!(),
                }))
            }
            (Value::Rational(_), _) | (_, Value::Rational(_)) => {
                let a = self.to_rational(&left).ok_or_else(|| self.coerce_error(&left, op, &right))?;
                let b = self.to_rational(&right).ok_or_else(|| self.coerce_error(&left, op, &right))?;
                match op {
                    Add => Ok(Value::Rational(a.add(&b))),
                    Sub => Ok(Value::Rational(a.sub(&b))),
                    Mul => Ok(Value::Rational(a.mul(&b))),
                    Div => {
                        if b.is_zero() {
                            Err(RubyError::ZeroDivision)
                        } else {
                            Ok(Value::Rational(a.div(&b)))
                        }
                    }
                    _ => Err(RubyError::Type(
                        "undefined operation on Rational".to_string(),
                    )),
                }
            }
            _ => Err(self.coerce_error(&left, op, &right)),
        }
    }

    fn coerce_error(&self, left: &Value, op: BinOp, right: &Value) -> RubyError {
        RubyError::Type(format!(
            "undefined operation: {} {} {}",
            left.class_name(),
            op_name(op),
            right.class_name()
        ))
    }

    fn to_complex(&self, v: &Value) -> Result<Complex> {
        match v {
            Value::Complex(c) => Ok(*c),
            other => other
                .to_f64()
                .map(|f| Complex::new(f, 0.0))
                .ok_or_else(|| {
                    RubyError::Type(format!("cannot coerce {} to Complex", other.class_name()))
                }),
        }
    }

    fn to_rational(&self, v: &Value) -> Option<Rational> {
        match v {
            Value::Rational(r) => Some(r.clone()),
            Value::Integer(n) => Some(Rational::from_integer(n.clone())),
            _ => None,
        }
    }

    pub(crate) fn compare_values(
        &mut self,
        left: &Value,
        right: &Value,
    ) -> Result<std::cmp::Ordering> {
        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (x, y) = (a.to_f64(), b.to_f64());
                match (x, y) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| {
                        RubyError::Type("comparison of Float with Float failed".to_string())
                    }),
                    _ => Err(RubyError::Type(format!(
                        "comparison of {} with {} failed",
                        a.class_name(),
                        b.class_name()
                    ))),
                }
            }
            _ => Err(RubyError::Type(format!(
                "comparison of {} with {} failed",
                left.class_name(),
                right.class_name()
            ))),
        }
    }

    fn unary_op(&mut self, op: UnOp, operand: Value) -> Result<Value> {
        match op {
            UnOp::Not => Ok(Value::Bool(!operand.truthy())),
            UnOp::Neg => match operand {
                Value::Integer(n) => Ok(Value::Integer(-n)),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Rational(r) => Ok(Value::Rational(r.neg())),
                Value::Complex(c) => Ok(Value::Complex(c.neg())),
                recv @ Value::Instance(_) => self.call_method(&recv, "-@", &[]),
                other => Err(RubyError::Type(format!(
                    "undefined operation: -{}",
                    other.class_name()
                ))),
            },
            UnOp::Pos => match operand {
                v @ (Value::Integer(_)
                | Value::Float(_)
                | Value::Rational(_)
                | Value::Complex(_)) => Ok(v),
                recv @ Value::Instance(_) => self.call_method(&recv, "+@", &[]),
                other => Err(RubyError::Type(format!(
                    "undefined operation: +{}",
                    other.class_name()
                ))),
            },
        }
    }

    // =========================================================================
    // INDEXING
    // =========================================================================

    pub(crate) fn index_read(&mut self, recv: &Value, indices: &[Value]) -> Result<Value> {
        match recv {
            Value::Array(a) => {
                let items = a.borrow();
                match indices {
                    [Value::Integer(i)] => {
                        let i = i
                            .to_i64()
                            .ok_or_else(|| RubyError::Type("index out of range".to_string()))?;
                        Ok(wrap_index(i, items.len())
                            .and_then(|i| items.get(i).cloned())
                            .unwrap_or(Value::Nil))
                    }
                    [Value::Range(r)] => {
                        let (start, len) = range_slice_bounds(r, items.len())?;
                        Ok(Value::array(
                            items.iter().skip(start).take(len).cloned().collect(),
                        ))
                    }
                    [Value::Integer(start), Value::Integer(len)] => {
                        let start = start.to_i64().and_then(|s| wrap_index(s, items.len()));
                        let len = len.to_usize().unwrap_or(0);
                        match start {
                            Some(s) => Ok(Value::array(
                                items.iter().skip(s).take(len).cloned().collect(),
                            )),
                            None => Ok(Value::Nil),
                        }
                    }
                    _ => Err(RubyError::Type("Array index must be integer".to_string())),
                }
            }
            Value::Hash(h) => match indices {
                [key] => Ok(h.borrow().get(key).cloned().unwrap_or(Value::Nil)),
                _ => Err(RubyError::Argument(
                    "wrong number of arguments for Hash#[]".to_string(),
                )),
            },
            Value::Str(s) => builtins::string::index_str(s, indices),
            recv @ Value::Instance(_) => self.call_method(recv, "[]", indices),
            other => Err(RubyError::Type(format!(
                "cannot index {}",
                other.class_name()
            ))),
        }
    }

    pub(crate) fn index_write(&mut self, recv: &Value, index: Value, value: Value) -> Result<()> {
        match recv {
            Value::Array(a) => {
                let mut items = a.borrow_mut();
                let i = match &index {
                    Value::Integer(i) => i
                        .to_i64()
                        .ok_or_else(|| RubyError::Type("index out of range".to_string()))?,
                    _ => return Err(RubyError::Type("Array index must be integer".to_string())),
                };
                let len = items.len();
                let target = if i < 0 {
                    wrap_index(i, len)
                        .ok_or_else(|| RubyError::Type(format!("index {} out of range", i)))?
                } else {
                    i as usize
                };
                // Writes past the end grow the array, padding with nil.
                while items.len() <= target {
                    items.push(Value::Nil);
                }
                items[target] = value;
                Ok(())
            }
            Value::Hash(h) => {
                h.borrow_mut().insert(index, value);
                Ok(())
            }
            recv @ Value::Instance(_) => {
                self.call_method(recv, "[]=", &[index, value])?;
                Ok(())
            }
            other => Err(RubyError::Type(format!(
                "cannot index {}",
                other.class_name()
            ))),
        }
    }

    // =========================================================================
    // VALUE SERVICES
    // =========================================================================

    /// `to_s` with user-method dispatch for instances.
    pub(crate) fn value_to_s(&mut self, v: &Value) -> Result<String> {
        if let Value::Instance(inst) = v {
            let class = inst.borrow().class.clone();
            if self.find_instance_method(&class, "to_s").is_some() {
                let s = self.call_method(v, "to_s", &[])?;
                if let Value::Str(s) = s {
                    return Ok(s);
                }
            }
        }
        Ok(v.default_to_s())
    }

    /// `inspect` with user-method dispatch for instances.
    pub(crate) fn value_inspect(&mut self, v: &Value) -> Result<String> {
        if let Value::Instance(inst) = v {
            let class = inst.borrow().class.clone();
            if self.find_instance_method(&class, "inspect").is_some() {
                let s = self.call_method(v, "inspect", &[])?;
                if let Value::Str(s) = s {
                    return Ok(s);
                }
            }
        }
        Ok(v.default_inspect())
    }

    /// The class object for a value, for `.class`.
    pub(crate) fn class_value_of(&self, v: &Value) -> Value {
        if let Value::Instance(inst) = v {
            return Value::Class(inst.borrow().class.clone());
        }
        let name = v.class_name();
        self.builtin_classes
            .get(&name)
            .cloned()
            .unwrap_or_else(|| {
                Value::Class(Rc::new(RefCell::new(ClassData::new(
                    name,
                    Some("Object".to_string()),
                ))))
            })
    }

    /// Whether dispatch would find `name` on this receiver.
    pub(crate) fn responds_to(&self, recv: &Value, name: &str) -> bool {
        match recv {
            Value::Instance(inst) => {
                let class = inst.borrow().class.clone();
                if self.find_instance_method(&class, name).is_some() {
                    return true;
                }
            }
            Value::Class(class) => {
                if self.find_class_method(class, name).is_some() || name == "new" {
                    return true;
                }
            }
            Value::Module(module) => {
                if module.borrow().methods.contains_key(name) {
                    return true;
                }
            }
            _ => {}
        }
        if builtins::enumerable::is_iterator_method(recv, name) {
            return true;
        }
        self.registry.lookup(&recv.class_name(), name).is_some()
    }

    /// Splat expansion: nil → nothing, arrays and ranges → elements,
    /// scalars → themselves.
    pub(crate) fn splat_values(&self, v: &Value) -> Result<Vec<Value>> {
        match v {
            Value::Nil => Ok(Vec::new()),
            Value::Array(a) => Ok(a.borrow().clone()),
            Value::Range(r) => self.range_values(r),
            other => Ok(vec![other.clone()]),
        }
    }

    /// The concrete element sequence of an iterable: arrays, ranges, and
    /// hashes (as `[key, value]` pairs).
    pub(crate) fn iterable_values(&self, v: &Value) -> Result<Vec<Value>> {
        match v {
            Value::Array(a) => Ok(a.borrow().clone()),
            Value::Range(r) => self.range_values(r),
            Value::Hash(h) => Ok(h
                .borrow()
                .iter()
                .map(|(k, v)| Value::array(vec![k.clone(), v.clone()]))
                .collect()),
            other => Err(RubyError::Type(format!(
                "cannot iterate {}",
                other.class_name()
            ))),
        }
    }

    /// Expands a range into its elements. Integer and single-character
    /// string endpoints enumerate; anything else is an error.
    pub(crate) fn range_values(&self, r: &RangeValue) -> Result<Vec<Value>> {
        match (&r.start, &r.end) {
            (Value::Integer(a), Value::Integer(b)) => {
                let mut out = Vec::new();
                let mut i = a.clone();
                loop {
                    let done = if r.inclusive { i > *b } else { i >= *b };
                    if done {
                        break;
                    }
                    out.push(Value::Integer(i.clone()));
                    i = i + 1;
                }
                Ok(out)
            }
            (Value::Str(a), Value::Str(b)) => {
                let (start, end) = match (single_char(a), single_char(b)) {
                    (Some(s), Some(e)) => (s, e),
                    _ => {
                        return Err(RubyError::Type(
                            "can't iterate over multi-character strings".to_string(),
                        ))
                    }
                };
                let mut out = Vec::new();
                let mut c = start as u32;
                let last = end as u32;
                while if r.inclusive { c <= last } else { c < last } {
                    if let Some(ch) = char::from_u32(c) {
                        out.push(Value::Str(ch.to_string()));
                    }
                    c += 1;
                }
                Ok(out)
            }
            _ => Err(RubyError::Type(format!(
                "can't iterate from {}",
                r.start.class_name()
            ))),
        }
    }

    /// Range membership without enumeration.
    pub(crate) fn range_includes(&self, r: &RangeValue, v: &Value) -> bool {
        match (&r.start, &r.end, v) {
            (Value::Integer(a), Value::Integer(b), Value::Integer(x)) => {
                x >= a && if r.inclusive { x <= b } else { x < b }
            }
            (start, end, x) if start.is_numeric() && end.is_numeric() && x.is_numeric() => {
                match (start.to_f64(), end.to_f64(), x.to_f64()) {
                    (Some(a), Some(b), Some(x)) => {
                        x >= a && if r.inclusive { x <= b } else { x < b }
                    }
                    _ => false,
                }
            }
            (Value::Str(a), Value::Str(b), Value::Str(x)) => {
                x.as_str() >= a.as_str()
                    && if r.inclusive {
                        x.as_str() <= b.as_str()
                    } else {
                        x.as_str() < b.as_str()
                    }
            }
            _ => false,
        }
    }

    /// Interpolates `#{...}` segments inside raw text (used for `%W`
    /// words; strings get their segments split during lexing).
    fn interpolate_text(&mut self, text: &str) -> Result<String> {
        let mut out = String::new();
        let mut rest = text;
        while let Some(pos) = rest.find("#{") {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 2..];
            let mut depth = 1usize;
            let mut end = None;
            for (i, c) in after.char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            let Some(end) = end else {
                return Err(RubyError::Type("unterminated interpolation".to_string()));
            };
            let value = self.eval_fragment(&after[..end])?;
            out.push_str(&self.value_to_s(&value)?);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    pub(crate) fn write_out(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| RubyError::Type(format!("write failed: {}", e)))
    }

    pub(crate) fn flush_out(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| RubyError::Type(format!("flush failed: {}", e)))
    }

    /// One `puts` argument: arrays and ranges unwrap to one line per
    /// element, nil prints an empty line, everything else prints `to_s`.
    pub(crate) fn puts_value(&mut self, v: &Value) -> Result<()> {
        match v {
            Value::Array(a) => {
                let items = a.borrow().clone();
                for item in items {
                    self.puts_value(&item)?;
                }
                Ok(())
            }
            Value::Range(r) => {
                for item in self.range_values(r)? {
                    self.puts_value(&item)?;
                }
                Ok(())
            }
            Value::Nil => self.write_out("\n"),
            other => {
                let s = self.value_to_s(other)?;
                self.write_out(&s)?;
                self.write_out("\n")
            }
        }
    }
}

fn op_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Shl => "<<",
    }
}

/// Negative indices count from the end; out of range is None.
pub(crate) fn wrap_index(i: i64, len: usize) -> Option<usize> {
    if i >= 0 {
        let i = i as usize;
        (i < len).then_some(i)
    } else {
        let back = i.unsigned_abs() as usize;
        len.checked_sub(back)
    }
}

/// Clamps a range to `[start, start+len)` bounds over a container.
fn range_slice_bounds(r: &RangeValue, len: usize) -> Result<(usize, usize)> {
    let (Value::Integer(a), Value::Integer(b)) = (&r.start, &r.end) else {
        return Err(RubyError::Type("range indices must be integers".to_string()));
    };
    let a = a
        .to_i64()
        .ok_or_else(|| RubyError::Type("index out of range".to_string()))?;
    let b = b
        .to_i64()
        .ok_or_else(|| RubyError::Type("index out of range".to_string()))?;
    let start = if a < 0 {
        wrap_index(a, len).unwrap_or(0)
    } else {
        a as usize
    };
    let end = if b < 0 {
        wrap_index(b, len).map(|e| e as i64).unwrap_or(-1)
    } else {
        b.min(len as i64)
    };
    let end_excl = if r.inclusive { end + 1 } else { end };
    let count = (end_excl - start as i64).max(0) as usize;
    Ok((start, count.min(len.saturating_sub(start))))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Rewrites the word-array escape sentinels back to real whitespace.
fn restore_word_escapes(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            ESCAPED_SPACE => ' ',
            ESCAPED_TAB => '\t',
            ESCAPED_NEWLINE => '\n',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedOutput;

    fn run(source: &str) -> (Result<Value>, String) {
        let out = SharedOutput::new();
        let mut interp = Interpreter::new(Box::new(out.clone()));
        let result = interp.eval_source(source);
        (result, out.contents())
    }

    fn eval_ok(source: &str) -> Value {
        let (result, _) = run(source);
        result.unwrap()
    }

    #[test]
    fn arithmetic_with_precedence() {
        assert!(eval_ok("1 + 2 * 3").ruby_eq(&Value::integer(7)));
        assert!(eval_ok("10 - 4 - 3").ruby_eq(&Value::integer(3)));
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        assert!(eval_ok("7 / 2").ruby_eq(&Value::integer(3)));
        assert!(eval_ok("-7 / 2").ruby_eq(&Value::integer(-3)));
        assert!(eval_ok("7.0 / 2").ruby_eq(&Value::Float(3.5)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let (result, _) = run("1 / 0");
        assert_eq!(result.unwrap_err(), RubyError::ZeroDivision);
    }

    #[test]
    fn short_circuit_returns_deciding_operand() {
        assert!(eval_ok("nil || 5").ruby_eq(&Value::integer(5)));
        assert!(eval_ok("false && x").ruby_eq(&Value::Bool(false)));
        assert!(eval_ok("1 and 2").ruby_eq(&Value::integer(2)));
    }

    #[test]
    fn compound_assignment_defaults() {
        assert!(eval_ok("x += 5\nx").ruby_eq(&Value::integer(5)));
        assert!(eval_ok("y *= 4\ny").ruby_eq(&Value::integer(4)));
    }

    #[test]
    fn string_plus_stringifies_mixed_operands() {
        assert!(eval_ok("\"n = \" + 3").ruby_eq(&Value::Str("n = 3".into())));
        assert!(eval_ok("1 + \"x\"").ruby_eq(&Value::Str("1x".into())));
    }

    #[test]
    fn interpolation_sees_current_scope() {
        let (_, out) = run("x = 6\nputs \"got #{x * 7}\"");
        assert_eq!(out, "got 42\n");
    }

    #[test]
    fn array_out_of_bounds_reads_nil_and_writes_grow() {
        let (_, out) = run("a = [1,2,3]\na[5] = 9\nputs a.length\nputs a[4].inspect");
        assert_eq!(out, "6\nnil\n");
    }

    #[test]
    fn negative_array_index_wraps() {
        assert!(eval_ok("[1,2,3][-1]").ruby_eq(&Value::integer(3)));
        assert!(eval_ok("[1,2,3][-4]").ruby_eq(&Value::Nil));
    }

    #[test]
    fn hash_round_trip_and_delete() {
        let (_, out) = run(concat!(
            "h = {a: 1, b: 2}\n",
            "h[:c] = 3\n",
            "puts h.keys.length\n",
            "puts h[:b]\n",
            "h.delete(:a)\n",
            "puts h.key?(:a)\n",
        ));
        assert_eq!(out, "3\n2\nfalse\n");
    }

    #[test]
    fn while_loop_consumes_break_and_discards_its_value() {
        let v = eval_ok("i = 0\nwhile i < 10\n  i += 1\n  break 99 if i == 3\n  i\nend");
        // The loop yields the last completed body value, not 99.
        assert!(v.ruby_eq(&Value::integer(2)));
    }

    #[test]
    fn loop_do_yields_the_break_value() {
        let v = eval_ok("i = 0\nloop do\n  i += 1\n  break i * 10 if i == 4\nend");
        assert!(v.ruby_eq(&Value::integer(40)));
    }

    #[test]
    fn until_runs_while_condition_is_false() {
        let (_, out) = run("i = 0\nuntil i == 3\n  puts i\n  i += 1\nend");
        assert_eq!(out, "0\n1\n2\n");
    }

    #[test]
    fn for_loop_destructures_with_splat() {
        let (_, out) = run(concat!(
            "for a, *mid, z in [[1, 2, 3, 4], [5, 6, 7, 8]]\n",
            "  puts a\n",
            "  puts mid.length\n",
            "  puts z\n",
            "end",
        ));
        assert_eq!(out, "1\n2\n4\n5\n2\n8\n");
    }

    #[test]
    fn method_definition_and_recursion() {
        let (_, out) = run(concat!(
            "def fact(n)\n",
            "  return 1 if n < 2\n",
            "  n * fact(n - 1)\n",
            "end\n",
            "puts fact(5)",
        ));
        assert_eq!(out, "120\n");
    }

    #[test]
    fn class_with_attr_accessor() {
        let (_, out) = run(concat!(
            "class Box\n",
            "  attr_accessor :v\n",
            "  def initialize(x)\n",
            "    @v = x\n",
            "  end\n",
            "end\n",
            "b = Box.new(7)\n",
            "b.v = b.v + 3\n",
            "puts b.v",
        ));
        assert_eq!(out, "10\n");
    }

    #[test]
    fn instance_methods_see_implicit_self() {
        let (_, out) = run(concat!(
            "class Rect\n",
            "  def initialize(w, h)\n",
            "    @w = w\n",
            "    @h = h\n",
            "  end\n",
            "  def w\n",
            "    @w\n",
            "  end\n",
            "  def h\n",
            "    @h\n",
            "  end\n",
            "  def area\n",
            "    w * h\n",
            "  end\n",
            "end\n",
            "puts Rect.new(3, 4).area",
        ));
        assert_eq!(out, "12\n");
    }

    #[test]
    fn inheritance_resolves_through_parent() {
        let (_, out) = run(concat!(
            "class Animal\n",
            "  def speak\n",
            "    \"...\"\n",
            "  end\n",
            "end\n",
            "class Dog < Animal\n",
            "end\n",
            "puts Dog.new.speak",
        ));
        assert_eq!(out, "...\n");
    }

    #[test]
    fn user_operator_methods_dispatch() {
        let (_, out) = run(concat!(
            "class Vec\n",
            "  attr_reader :x\n",
            "  def initialize(x)\n",
            "    @x = x\n",
            "  end\n",
            "  def +(other)\n",
            "    Vec.new(@x + other.x)\n",
            "  end\n",
            "end\n",
            "puts (Vec.new(2) + Vec.new(3)).x",
        ));
        assert_eq!(out, "5\n");
    }

    #[test]
    fn self_method_definitions_become_class_methods() {
        let (_, out) = run(concat!(
            "class Factory\n",
            "  def self.build\n",
            "    42\n",
            "  end\n",
            "end\n",
            "puts Factory.build",
        ));
        assert_eq!(out, "42\n");
    }

    #[test]
    fn modules_hold_functions_and_constants() {
        let (_, out) = run(concat!(
            "module Math2::Util\n",
            "  Scale = 10\n",
            "  def double(x)\n",
            "    x * 2\n",
            "  end\n",
            "end\n",
            "puts Math2::Util.double(21)\n",
            "puts Math2::Util::Scale",
        ));
        assert_eq!(out, "42\n10\n");
    }

    #[test]
    fn case_matches_classes_ranges_and_values() {
        let (_, out) = run(concat!(
            "def kind(x)\n",
            "  case x\n",
            "  when Integer\n",
            "    \"int\"\n",
            "  when 1..10\n",
            "    \"small\"\n",
            "  when \"s\"\n",
            "    \"str\"\n",
            "  else\n",
            "    \"other\"\n",
            "  end\n",
            "end\n",
            "puts kind(3)\n",
            "puts kind(\"s\")\n",
            "puts kind(2.5)\n",
            "puts kind(nil)",
        ));
        assert_eq!(out, "int\nstr\nsmall\nother\n");
    }

    #[test]
    fn blocks_snapshot_scope_but_share_containers() {
        let (_, out) = run(concat!(
            "x = 1\n",
            "acc = []\n",
            "[10, 20].each { |n| x = n\nacc << n }\n",
            "puts x\n",
            "puts acc.length",
        ));
        // x is unchanged outside the block; the shared array is not.
        assert_eq!(out, "1\n2\n");
    }

    #[test]
    fn select_then_each_chain() {
        let (_, out) = run("(1..5).select { |x| x.even? }.each { |x| puts x }");
        assert_eq!(out, "2\n4\n");
    }

    #[test]
    fn ranges_enumerate_and_measure() {
        let (_, out) = run(concat!(
            "puts (1..5).to_a.length\n",
            "puts (1...5).to_a.length\n",
            "puts (1..5).include?(5)\n",
            "puts (1...5).include?(5)\n",
            "puts ('a'..'e').to_a.length",
        ));
        assert_eq!(out, "5\n4\ntrue\nfalse\n5\n");
    }

    #[test]
    fn character_range_enumerates() {
        let (_, out) = run("('a'..'c').each { |c| puts c }");
        assert_eq!(out, "a\nb\nc\n");
    }

    #[test]
    fn puts_unwraps_arrays_and_prints_nil_as_blank() {
        let (_, out) = run("puts [1, 2, 3]\nputs nil");
        assert_eq!(out, "1\n2\n3\n\n");
    }

    #[test]
    fn multiple_assignment_destructures() {
        let (_, out) = run("a, b = 1, 2\nputs a\nputs b\nc, d = [3, 4]\nputs c\nputs d");
        assert_eq!(out, "1\n2\n3\n4\n");
    }

    #[test]
    fn splat_flattens_into_literals_and_calls() {
        let (_, out) = run("a = [2, 3]\nb = [1, *a, 4]\nputs b.length\nputs [*nil].length");
        assert_eq!(out, "4\n0\n");
    }

    #[test]
    fn undefined_variable_error_message() {
        let (result, _) = run("puts missing_thing");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Undefined variable: missing_thing"
        );
    }

    #[test]
    fn unknown_method_error_names_receiver_type() {
        let (result, _) = run("1.frobnicate");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Unknown method: frobnicate on Integer"
        );
    }

    #[test]
    fn word_arrays_restore_escapes() {
        let (_, out) = run("puts %w(a\\ b c).length\nputs %w(a\\ b c)[0]");
        assert_eq!(out, "2\na b\n");
    }

    #[test]
    fn interpolated_word_arrays_evaluate_fragments() {
        let (_, out) = run("n = 4\nputs %W(x#{n} y).length\nputs %W(x#{n} y)[0]");
        assert_eq!(out, "2\nx4\n");
    }

    #[test]
    fn rational_literals_reduce_and_format() {
        let (_, out) = run("puts 1.5r\nputs 3r + 1r");
        assert_eq!(out, "3/2\n4/1\n");
    }

    #[test]
    fn complex_arithmetic_formats() {
        let (_, out) = run("puts 2i * 2i\nputs 1 + 2i");
        assert_eq!(out, "-4+0i\n1+2i\n");
    }

    #[test]
    fn should_matchers_pass_and_fail() {
        let (result, _) = run("1.should == 1");
        assert!(result.is_ok());
        let (result, _) = run("1.should == 2");
        assert!(matches!(
            result.unwrap_err(),
            RubyError::AssertionFailure { .. }
        ));
        let (result, _) = run("nil.should be_nil");
        assert!(result.is_ok());
        let (result, _) = run("1.should eq(2)");
        assert!(matches!(
            result.unwrap_err(),
            RubyError::AssertionFailure { .. }
        ));
    }

    #[test]
    fn eval_runs_in_an_isolated_scope() {
        let (result, out) = run("x = 1\neval(\"y = 5\nputs y\")\nx");
        assert_eq!(out, "5\n");
        assert!(result.unwrap().ruby_eq(&Value::integer(1)));
        let (result, _) = run("eval(\"z = 2\")\nz");
        assert!(result.is_err());
    }

    #[test]
    fn postfix_if_guards_statement() {
        let (_, out) = run("puts 1 if true\nputs 2 if false\nputs 3");
        assert_eq!(out, "1\n3\n");
    }

    #[test]
    fn truthiness_only_nil_and_false_are_falsy() {
        let (_, out) = run("puts !nil\nputs !false\nputs !0\nputs !\"\"");
        assert_eq!(out, "true\ntrue\nfalse\nfalse\n");
    }
}
