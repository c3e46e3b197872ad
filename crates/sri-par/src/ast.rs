//! Entity-component AST store.
//!
//! A syntax node is an integer [`NodeId`]. Per-kind fields live in sparse
//! component tables keyed by the ID; only `node_type` and `position` are
//! dense because every node has them. Components are sparse per node kind —
//! a dense row per node would waste space and couple unrelated kinds.
//!
//! The store is append-only: the parser allocates IDs from a monotonic
//! counter and never frees them, and the tree is immutable after parsing.

use num_bigint::BigInt;
use rustc_hash::{FxHashMap, FxHashSet};
use sri_lex::StrPart;
use sri_util::{define_idx, IndexVec, Span};

define_idx!(NodeId);

/// Discriminates what a node means; the components it uses follow from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Program,

    // Literals
    IntegerLit,
    FloatLit,
    RationalLit,
    ComplexLit,
    StringLit,
    InterpolatedStringLit,
    SymbolLit,
    NilLit,
    BoolLit,
    ArrayLit,
    HashLit,
    WordArrayLit,
    RangeLit,

    // Names
    Identifier,
    InstanceVar,
    ClassVar,
    QualifiedName,
    SelfExpr,

    // Operations
    BinaryOp,
    UnaryOp,
    Splat,
    Index,
    MethodCall,
    Block,

    // Assignments
    Assignment,
    CompoundAssignment,
    MultipleAssignment,
    IndexAssignment,
    AttrAssignment,
    InstanceVarAssignment,
    ClassVarAssignment,

    // Definitions
    MethodDefinition,
    SelfMethodDefinition,
    ClassDefinition,
    ModuleDefinition,
    AttrDeclaration,

    // Control flow
    If,
    While,
    Until,
    For,
    Loop,
    Case,
    When,
    Return,
    Break,
    Next,
}

/// Binary operators (including the keyword forms of `&&`/`||`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Shl,
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Pos,
    Not,
}

/// Decoded literal payload for the `value` component.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(BigInt),
    Float(f64),
    Str(String),
    StrParts(Vec<StrPart>),
    Symbol(String),
    Bool(bool),
    Words { words: Vec<String>, interpolated: bool },
}

macro_rules! node_component {
    ($field:ident, $set:ident, $get:ident: NodeId) => {
        pub fn $set(&mut self, id: NodeId, value: NodeId) {
            self.$field.insert(id, value);
        }

        pub fn $get(&self, id: NodeId) -> Option<NodeId> {
            self.$field.get(&id).copied()
        }
    };
    ($field:ident, $set:ident, $get:ident: $ty:ty) => {
        pub fn $set(&mut self, id: NodeId, value: $ty) {
            self.$field.insert(id, value);
        }

        pub fn $get(&self, id: NodeId) -> Option<&$ty> {
            self.$field.get(&id)
        }
    };
}

/// The component store for one parsed program.
///
/// # Example
///
/// ```
/// use sri_par::ast::{Ast, NodeType};
/// use sri_util::Span;
///
/// let mut ast = Ast::new();
/// let lit = ast.new_node(NodeType::NilLit, Span::new(1, 1));
/// let root = ast.new_node(NodeType::Program, Span::new(1, 1));
/// ast.set_statements(root, vec![lit]);
/// assert_eq!(ast.find_root(), Some(root));
/// ```
#[derive(Debug, Default)]
pub struct Ast {
    node_types: IndexVec<NodeId, NodeType>,
    positions: IndexVec<NodeId, Span>,

    values: FxHashMap<NodeId, Literal>,
    operators: FxHashMap<NodeId, BinOp>,
    unary_operators: FxHashMap<NodeId, UnOp>,
    lefts: FxHashMap<NodeId, NodeId>,
    rights: FxHashMap<NodeId, NodeId>,
    variables_one: FxHashMap<NodeId, String>,
    names: FxHashMap<NodeId, String>,
    parameters: FxHashMap<NodeId, Vec<String>>,
    bodies: FxHashMap<NodeId, Vec<NodeId>>,
    receivers: FxHashMap<NodeId, NodeId>,
    arguments: FxHashMap<NodeId, Vec<NodeId>>,
    conditions_one: FxHashMap<NodeId, NodeId>,
    then_branches: FxHashMap<NodeId, Vec<NodeId>>,
    else_branches: FxHashMap<NodeId, Vec<NodeId>>,
    statements: FxHashMap<NodeId, Vec<NodeId>>,
    blocks: FxHashMap<NodeId, NodeId>,
    block_params: FxHashMap<NodeId, Vec<String>>,
    block_bodies: FxHashMap<NodeId, Vec<NodeId>>,
    indexes: FxHashMap<NodeId, NodeId>,
    elements: FxHashMap<NodeId, Vec<NodeId>>,
    pairs: FxHashMap<NodeId, Vec<(NodeId, NodeId)>>,
    parts: FxHashMap<NodeId, Vec<String>>,
    qualified_names: FxHashMap<NodeId, String>,
    when_clauses: FxHashMap<NodeId, Vec<NodeId>>,
    else_clauses: FxHashMap<NodeId, Vec<NodeId>>,
    expressions: FxHashMap<NodeId, NodeId>,
    conditions_many: FxHashMap<NodeId, Vec<NodeId>>,
    iterables: FxHashMap<NodeId, NodeId>,
    variables_many: FxHashMap<NodeId, Vec<String>>,
    target_expressions: FxHashMap<NodeId, NodeId>,
    numerators: FxHashMap<NodeId, BigInt>,
    denominators: FxHashMap<NodeId, BigInt>,
    reals: FxHashMap<NodeId, f64>,
    imaginaries: FxHashMap<NodeId, f64>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh node of the given type at the given position.
    pub fn new_node(&mut self, node_type: NodeType, position: Span) -> NodeId {
        let id = self.node_types.push(node_type);
        let pos_id = self.positions.push(position);
        debug_assert_eq!(id, pos_id);
        id
    }

    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.node_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_types.is_empty()
    }

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.node_types[id]
    }

    /// Changes a node's type in place. The parser uses this when a prefix
    /// turns out to be the target of an assignment (`x` → `x = v`), which
    /// keeps the store free of orphan nodes.
    pub fn retype(&mut self, id: NodeId, node_type: NodeType) {
        self.node_types[id] = node_type;
    }

    pub fn position(&self, id: NodeId) -> Span {
        self.positions[id]
    }

    node_component!(values, set_value, value: Literal);
    node_component!(operators, set_operator, operator: BinOp);
    node_component!(unary_operators, set_unary_operator, unary_operator: UnOp);
    node_component!(lefts, set_left, left: NodeId);
    node_component!(rights, set_right, right: NodeId);
    node_component!(variables_one, set_variable, variable: String);
    node_component!(names, set_name, name: String);
    node_component!(parameters, set_parameters, parameters_of: Vec<String>);
    node_component!(bodies, set_body, body: Vec<NodeId>);
    node_component!(receivers, set_receiver, receiver: NodeId);
    node_component!(arguments, set_arguments, arguments_of: Vec<NodeId>);
    node_component!(conditions_one, set_condition, condition: NodeId);
    node_component!(then_branches, set_then_branch, then_branch: Vec<NodeId>);
    node_component!(else_branches, set_else_branch, else_branch: Vec<NodeId>);
    node_component!(statements, set_statements, statements_of: Vec<NodeId>);
    node_component!(blocks, set_block, block: NodeId);
    node_component!(block_params, set_block_params, block_params_of: Vec<String>);
    node_component!(block_bodies, set_block_body, block_body: Vec<NodeId>);
    node_component!(indexes, set_index, index: NodeId);
    node_component!(elements, set_elements, elements_of: Vec<NodeId>);
    node_component!(pairs, set_pairs, pairs_of: Vec<(NodeId, NodeId)>);
    node_component!(parts, set_parts, parts_of: Vec<String>);
    node_component!(qualified_names, set_qualified_name, qualified_name: String);
    node_component!(when_clauses, set_when_clauses, when_clauses_of: Vec<NodeId>);
    node_component!(else_clauses, set_else_clause, else_clause: Vec<NodeId>);
    node_component!(expressions, set_expression, expression: NodeId);
    node_component!(conditions_many, set_conditions, conditions_of: Vec<NodeId>);
    node_component!(iterables, set_iterable, iterable: NodeId);
    node_component!(variables_many, set_variables, variables_of: Vec<String>);
    node_component!(target_expressions, set_target_expression, target_expression: NodeId);
    node_component!(numerators, set_numerator, numerator: BigInt);
    node_component!(denominators, set_denominator, denominator: BigInt);
    node_component!(reals, set_real, real: f64);
    node_component!(imaginaries, set_imaginary, imaginary: f64);

    /// Every node referenced from `id`'s components, in a fixed order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let singles = [
            self.left(id),
            self.right(id),
            self.receiver(id),
            self.condition(id),
            self.index(id),
            self.expression(id),
            self.iterable(id),
            self.target_expression(id),
            self.block(id),
        ];
        out.extend(singles.into_iter().flatten());

        let lists = [
            self.arguments_of(id),
            self.elements_of(id),
            self.statements_of(id),
            self.body(id),
            self.then_branch(id),
            self.else_branch(id),
            self.block_body(id),
            self.when_clauses_of(id),
            self.conditions_of(id),
            self.else_clause(id),
        ];
        for list in lists.into_iter().flatten() {
            out.extend(list.iter().copied());
        }

        if let Some(pairs) = self.pairs_of(id) {
            for (k, v) in pairs {
                out.push(*k);
                out.push(*v);
            }
        }
        out
    }

    /// Finds the root: the unique node no component references. When the
    /// store holds several unreferenced nodes, prefers `program` over
    /// `assignment` over `method_call` over `method_definition`, then the
    /// lowest ID.
    pub fn find_root(&self) -> Option<NodeId> {
        let mut referenced: FxHashSet<NodeId> = FxHashSet::default();
        for id in self.node_types.indices() {
            referenced.extend(self.children(id));
        }

        fn rank(ty: NodeType) -> u8 {
            match ty {
                NodeType::Program => 0,
                NodeType::Assignment => 1,
                NodeType::MethodCall => 2,
                NodeType::MethodDefinition => 3,
                _ => 4,
            }
        }

        self.node_types
            .indices()
            .filter(|id| !referenced.contains(id))
            .min_by_key(|id| (rank(self.node_type(*id)), id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let mut ast = Ast::new();
        let a = ast.new_node(NodeType::NilLit, Span::DUMMY);
        let b = ast.new_node(NodeType::NilLit, Span::DUMMY);
        assert!(a.0 < b.0);
        assert_eq!(ast.len(), 2);
    }

    #[test]
    fn components_are_sparse() {
        let mut ast = Ast::new();
        let id = ast.new_node(NodeType::Identifier, Span::new(1, 1));
        assert_eq!(ast.variable(id), None);
        ast.set_variable(id, "x".to_string());
        assert_eq!(ast.variable(id).map(String::as_str), Some("x"));
        assert_eq!(ast.left(id), None);
    }

    #[test]
    fn children_enumerates_every_reference() {
        let mut ast = Ast::new();
        let k = ast.new_node(NodeType::SymbolLit, Span::DUMMY);
        let v = ast.new_node(NodeType::IntegerLit, Span::DUMMY);
        let hash = ast.new_node(NodeType::HashLit, Span::DUMMY);
        ast.set_pairs(hash, vec![(k, v)]);
        assert_eq!(ast.children(hash), vec![k, v]);
    }

    #[test]
    fn root_is_the_unreferenced_node() {
        let mut ast = Ast::new();
        let lit = ast.new_node(NodeType::IntegerLit, Span::DUMMY);
        let root = ast.new_node(NodeType::Program, Span::DUMMY);
        ast.set_statements(root, vec![lit]);
        assert_eq!(ast.find_root(), Some(root));
    }

    #[test]
    fn root_tie_break_prefers_program() {
        let mut ast = Ast::new();
        let orphan_call = ast.new_node(NodeType::MethodCall, Span::DUMMY);
        let program = ast.new_node(NodeType::Program, Span::DUMMY);
        ast.set_statements(program, vec![]);
        let _ = orphan_call;
        assert_eq!(ast.find_root(), Some(program));
    }
}
