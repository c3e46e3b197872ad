//! Expression parsing via binding-power climbing.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `and`, `or` | Left |
//! | 2 | `\|\|` | Left |
//! | 3 | `&&` | Left |
//! | 4 | `=`, `+=`, `-=`, `*=`, `/=` | Right |
//! | 4.5 | `..`, `...` | Left |
//! | 5 | `==`, `!=` | Left |
//! | 6 | `<`, `<=`, `>`, `>=` | Left |
//! | 7 | `+`, `-` | Left |
//! | 8 | `*`, `/`, `%` | Left |
//!
//! Postfix chains (`.method(args) { block }`, `[index]`, `::Const`) bind
//! tighter than any operator and are folded left-associatively before the
//! climb sees the expression. `=` after an index or attribute chain is
//! recognized there and produces the dedicated assignment nodes; in the
//! climb itself `=` applies only to identifier-shaped prefixes.

use sri_lex::{Keyword, Op, TokenKind};
use sri_util::{Result, Span};

use crate::ast::{BinOp, Literal, NodeId, NodeType, UnOp};
use crate::Parser;

/// Binding power levels. Higher numbers bind tighter; left-associative
/// operators use `(n, n + 1)`, the right-associative assignments `(n, n)`.
pub mod bp {
    /// Minimum binding power (start of expression).
    pub const MIN: u8 = 0;

    /// Keyword logic: `and`, `or`.
    pub const KEYWORD_LOGIC: u8 = 2;

    /// Logical OR: `||`.
    pub const LOGICAL_OR: u8 = 4;

    /// Logical AND: `&&`.
    pub const LOGICAL_AND: u8 = 6;

    /// Assignment: `=`, `+=`, `-=`, `*=`, `/=` (right-associative).
    pub const ASSIGN: u8 = 8;

    /// Ranges: `..`, `...` (between assignment and equality).
    pub const RANGE: u8 = 9;

    /// Equality: `==`, `!=`.
    pub const EQUALITY: u8 = 11;

    /// Comparison: `<`, `<=`, `>`, `>=`.
    pub const COMPARISON: u8 = 13;

    /// Append / shift: `<<`.
    pub const SHIFT: u8 = 14;

    /// Additive: `+`, `-`.
    pub const ADDITIVE: u8 = 15;

    /// Multiplicative: `*`, `/`, `%`.
    pub const MULTIPLICATIVE: u8 = 17;
}

/// What an infix token does to its operands.
enum Infix {
    Bin(BinOp),
    Assign(Option<BinOp>),
    Range { inclusive: bool },
}

impl Parser {
    /// Main expression entry point.
    pub(crate) fn parse_expression(&mut self) -> Result<NodeId> {
        self.parse_expr_bp(bp::MIN)
    }

    /// Parse an expression consuming only operators with left binding power
    /// `>= min_bp`.
    pub(crate) fn parse_expr_bp(&mut self, min_bp: u8) -> Result<NodeId> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((lbp, rbp, infix)) = self.infix_binding_power() else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            let span = self.span();
            self.advance();
            self.skip_newlines();

            match infix {
                Infix::Bin(op) => {
                    let rhs = self.parse_expr_bp(rbp)?;
                    let node = self.ast.new_node(NodeType::BinaryOp, span);
                    self.ast.set_left(node, lhs);
                    self.ast.set_right(node, rhs);
                    self.ast.set_operator(node, op);
                    lhs = node;
                }
                Infix::Range { inclusive } => {
                    let rhs = self.parse_expr_bp(rbp)?;
                    let node = self.ast.new_node(NodeType::RangeLit, span);
                    self.ast.set_left(node, lhs);
                    self.ast.set_right(node, rhs);
                    self.ast.set_value(node, Literal::Bool(inclusive));
                    lhs = node;
                }
                Infix::Assign(compound) => {
                    let rhs = self.parse_expr_bp(bp::ASSIGN)?;
                    lhs = self.convert_to_assignment(lhs, compound, rhs)?;
                }
            }
        }
        Ok(lhs)
    }

    /// Retypes an identifier-shaped prefix into the matching assignment
    /// node. Index and attribute targets never reach here; the postfix
    /// chain claims their `=` first.
    fn convert_to_assignment(
        &mut self,
        target: NodeId,
        compound: Option<BinOp>,
        value: NodeId,
    ) -> Result<NodeId> {
        let node_type = match (self.ast.node_type(target), compound) {
            (NodeType::Identifier, None) => NodeType::Assignment,
            (NodeType::Identifier, Some(op)) => {
                self.ast.set_operator(target, op);
                NodeType::CompoundAssignment
            }
            (NodeType::InstanceVar, None) => NodeType::InstanceVarAssignment,
            (NodeType::ClassVar, None) => NodeType::ClassVarAssignment,
            _ => return Err(self.error("assignable expression")),
        };
        self.ast.retype(target, node_type);
        self.ast.set_expression(target, value);
        Ok(target)
    }

    fn infix_binding_power(&self) -> Option<(u8, u8, Infix)> {
        use bp::*;
        let (l, r, infix) = match &self.current().kind {
            TokenKind::Keyword(Keyword::And) => (KEYWORD_LOGIC, KEYWORD_LOGIC + 1, Infix::Bin(BinOp::And)),
            TokenKind::Keyword(Keyword::Or) => (KEYWORD_LOGIC, KEYWORD_LOGIC + 1, Infix::Bin(BinOp::Or)),
            TokenKind::Op(op) => match op {
                Op::OrOr => (LOGICAL_OR, LOGICAL_OR + 1, Infix::Bin(BinOp::Or)),
                Op::AndAnd => (LOGICAL_AND, LOGICAL_AND + 1, Infix::Bin(BinOp::And)),
                Op::Assign => (ASSIGN, ASSIGN, Infix::Assign(None)),
                Op::PlusAssign => (ASSIGN, ASSIGN, Infix::Assign(Some(BinOp::Add))),
                Op::MinusAssign => (ASSIGN, ASSIGN, Infix::Assign(Some(BinOp::Sub))),
                Op::StarAssign => (ASSIGN, ASSIGN, Infix::Assign(Some(BinOp::Mul))),
                Op::SlashAssign => (ASSIGN, ASSIGN, Infix::Assign(Some(BinOp::Div))),
                Op::DotDot => (RANGE, RANGE + 1, Infix::Range { inclusive: true }),
                Op::DotDotDot => (RANGE, RANGE + 1, Infix::Range { inclusive: false }),
                Op::EqEq => (EQUALITY, EQUALITY + 1, Infix::Bin(BinOp::Eq)),
                Op::NotEq => (EQUALITY, EQUALITY + 1, Infix::Bin(BinOp::Ne)),
                Op::Lt => (COMPARISON, COMPARISON + 1, Infix::Bin(BinOp::Lt)),
                Op::LtEq => (COMPARISON, COMPARISON + 1, Infix::Bin(BinOp::Le)),
                Op::Gt => (COMPARISON, COMPARISON + 1, Infix::Bin(BinOp::Gt)),
                Op::GtEq => (COMPARISON, COMPARISON + 1, Infix::Bin(BinOp::Ge)),
                Op::Shl => (SHIFT, SHIFT + 1, Infix::Bin(BinOp::Shl)),
                Op::Plus => (ADDITIVE, ADDITIVE + 1, Infix::Bin(BinOp::Add)),
                Op::Minus => (ADDITIVE, ADDITIVE + 1, Infix::Bin(BinOp::Sub)),
                Op::Star => (MULTIPLICATIVE, MULTIPLICATIVE + 1, Infix::Bin(BinOp::Mul)),
                Op::Slash => (MULTIPLICATIVE, MULTIPLICATIVE + 1, Infix::Bin(BinOp::Div)),
                Op::Percent => (MULTIPLICATIVE, MULTIPLICATIVE + 1, Infix::Bin(BinOp::Mod)),
                _ => return None,
            },
            _ => return None,
        };
        Some((l, r, infix))
    }

    // =========================================================================
    // PREFIX AND ATOMS
    // =========================================================================

    /// Unary `-`, `+`, `!`, `not`, and splat `*` applied to a postfixed atom.
    fn parse_prefix(&mut self) -> Result<NodeId> {
        let span = self.span();
        match self.current().kind.clone() {
            TokenKind::Op(Op::Minus) => {
                self.advance();
                self.unary(UnOp::Neg, span)
            }
            TokenKind::Op(Op::Plus) => {
                self.advance();
                self.unary(UnOp::Pos, span)
            }
            TokenKind::Op(Op::Bang) => {
                self.advance();
                self.unary(UnOp::Not, span)
            }
            TokenKind::Keyword(Keyword::Not) => {
                // `not` binds looser than `&&`/`||` but tighter than and/or.
                self.advance();
                let operand = self.parse_expr_bp(bp::LOGICAL_OR)?;
                let node = self.ast.new_node(NodeType::UnaryOp, span);
                self.ast.set_unary_operator(node, UnOp::Not);
                self.ast.set_expression(node, operand);
                Ok(node)
            }
            TokenKind::Op(Op::Star) => {
                self.advance();
                let operand = self.parse_prefix()?;
                let node = self.ast.new_node(NodeType::Splat, span);
                self.ast.set_expression(node, operand);
                Ok(node)
            }
            _ => {
                let atom = self.parse_atom()?;
                self.parse_postfix(atom)
            }
        }
    }

    fn unary(&mut self, op: UnOp, span: Span) -> Result<NodeId> {
        let operand = self.parse_prefix()?;
        let node = self.ast.new_node(NodeType::UnaryOp, span);
        self.ast.set_unary_operator(node, op);
        self.ast.set_expression(node, operand);
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<NodeId> {
        let span = self.span();
        let kind = self.current().kind.clone();
        match kind {
            TokenKind::Integer(n) => {
                self.advance();
                let node = self.ast.new_node(NodeType::IntegerLit, span);
                self.ast.set_value(node, Literal::Int(n));
                Ok(node)
            }
            TokenKind::Float(f) => {
                self.advance();
                let node = self.ast.new_node(NodeType::FloatLit, span);
                self.ast.set_value(node, Literal::Float(f));
                Ok(node)
            }
            TokenKind::Rational { numer, denom } => {
                self.advance();
                let node = self.ast.new_node(NodeType::RationalLit, span);
                self.ast.set_numerator(node, numer);
                self.ast.set_denominator(node, denom);
                Ok(node)
            }
            TokenKind::Complex(imag) => {
                self.advance();
                let node = self.ast.new_node(NodeType::ComplexLit, span);
                self.ast.set_real(node, 0.0);
                self.ast.set_imaginary(node, imag);
                Ok(node)
            }
            TokenKind::Str(s) => {
                self.advance();
                let node = self.ast.new_node(NodeType::StringLit, span);
                self.ast.set_value(node, Literal::Str(s));
                Ok(node)
            }
            TokenKind::InterpolatedStr(parts) => {
                self.advance();
                let node = self.ast.new_node(NodeType::InterpolatedStringLit, span);
                self.ast.set_value(node, Literal::StrParts(parts));
                Ok(node)
            }
            TokenKind::WordArray(words) => {
                self.advance();
                let node = self.ast.new_node(NodeType::WordArrayLit, span);
                self.ast.set_value(
                    node,
                    Literal::Words {
                        words,
                        interpolated: false,
                    },
                );
                Ok(node)
            }
            TokenKind::InterpolatedWordArray(words) => {
                self.advance();
                let node = self.ast.new_node(NodeType::WordArrayLit, span);
                self.ast.set_value(
                    node,
                    Literal::Words {
                        words,
                        interpolated: true,
                    },
                );
                Ok(node)
            }
            TokenKind::Symbol(name) => {
                self.advance();
                let node = self.ast.new_node(NodeType::SymbolLit, span);
                self.ast.set_value(node, Literal::Symbol(name));
                Ok(node)
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(self.ast.new_node(NodeType::NilLit, span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                let node = self.ast.new_node(NodeType::BoolLit, span);
                self.ast.set_value(node, Literal::Bool(true));
                Ok(node)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                let node = self.ast.new_node(NodeType::BoolLit, span);
                self.ast.set_value(node, Literal::Bool(false));
                Ok(node)
            }
            TokenKind::Keyword(Keyword::SelfKw) => {
                self.advance();
                Ok(self.ast.new_node(NodeType::SelfExpr, span))
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::Ident(name) => {
                self.advance();
                if self.check_op(Op::LParen) && self.adjacent() {
                    let arguments = self.parse_paren_args()?;
                    let node = self.ast.new_node(NodeType::MethodCall, span);
                    self.ast.set_name(node, name);
                    self.ast.set_arguments(node, arguments);
                    Ok(node)
                } else {
                    let node = self.ast.new_node(NodeType::Identifier, span);
                    self.ast.set_variable(node, name);
                    Ok(node)
                }
            }
            TokenKind::InstanceVar(name) => {
                self.advance();
                let node = self.ast.new_node(NodeType::InstanceVar, span);
                self.ast.set_variable(node, name);
                Ok(node)
            }
            TokenKind::ClassVar(name) => {
                self.advance();
                let node = self.ast.new_node(NodeType::ClassVar, span);
                self.ast.set_variable(node, name);
                Ok(node)
            }
            TokenKind::Op(Op::LParen) => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect_op(Op::RParen, ")")?;
                Ok(inner)
            }
            TokenKind::Op(Op::LBracket) => self.parse_array_literal(span),
            TokenKind::Op(Op::LBrace) => self.parse_hash_literal(span),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_array_literal(&mut self, span: Span) -> Result<NodeId> {
        self.advance();
        self.skip_newlines();
        let mut elements = Vec::new();
        while !self.check_op(Op::RBracket) {
            elements.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat_op(Op::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_op(Op::RBracket, "]")?;
        let node = self.ast.new_node(NodeType::ArrayLit, span);
        self.ast.set_elements(node, elements);
        Ok(node)
    }

    /// `{k => v, sym: v}` hash literal.
    fn parse_hash_literal(&mut self, span: Span) -> Result<NodeId> {
        self.advance();
        self.skip_newlines();
        let mut pairs = Vec::new();
        while !self.check_op(Op::RBrace) {
            let key = if let TokenKind::Ident(name) = self.current().kind.clone() {
                // `a: 1` shorthand for a symbol key.
                if self.peek(1).kind == TokenKind::Op(Op::Colon) {
                    let key_span = self.span();
                    self.advance();
                    self.advance();
                    let key = self.ast.new_node(NodeType::SymbolLit, key_span);
                    self.ast.set_value(key, Literal::Symbol(name));
                    key
                } else {
                    let key = self.parse_expression()?;
                    self.expect_op(Op::FatArrow, "=>")?;
                    key
                }
            } else {
                let key = self.parse_expression()?;
                self.expect_op(Op::FatArrow, "=>")?;
                key
            };
            self.skip_newlines();
            let value = self.parse_expression()?;
            pairs.push((key, value));
            self.skip_newlines();
            if !self.eat_op(Op::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_op(Op::RBrace, "}")?;
        let node = self.ast.new_node(NodeType::HashLit, span);
        self.ast.set_pairs(node, pairs);
        Ok(node)
    }

    // =========================================================================
    // POSTFIX CHAINS
    // =========================================================================

    /// Folds `.method(args) [block]`, `[index]`, and `::Const` chains onto
    /// `lhs`, left-associatively.
    fn parse_postfix(&mut self, mut lhs: NodeId) -> Result<NodeId> {
        loop {
            // A block attaches to the immediately preceding method call.
            if self.ast.node_type(lhs) == NodeType::MethodCall && self.ast.block(lhs).is_none() {
                if let Some(block) = self.maybe_parse_block()? {
                    self.ast.set_block(lhs, block);
                    continue;
                }
            }

            match self.current().kind.clone() {
                TokenKind::Op(Op::Dot) => {
                    let span = self.span();
                    self.advance();
                    let name = self.parse_method_call_name()?;

                    let explicit_parens = self.check_op(Op::LParen) && self.adjacent();
                    if explicit_parens {
                        let arguments = self.parse_paren_args()?;
                        let node = self.ast.new_node(NodeType::MethodCall, span);
                        self.ast.set_receiver(node, lhs);
                        self.ast.set_name(node, name);
                        self.ast.set_arguments(node, arguments);
                        lhs = node;
                        continue;
                    }

                    // `obj.attr = v` — a setter, not a call-then-assign.
                    if self.check_op(Op::Assign) {
                        self.advance();
                        self.skip_newlines();
                        let value = self.parse_expr_bp(bp::ASSIGN)?;
                        let node = self.ast.new_node(NodeType::AttrAssignment, span);
                        self.ast.set_target_expression(node, lhs);
                        self.ast.set_name(node, name);
                        self.ast.set_expression(node, value);
                        return Ok(node);
                    }

                    let arguments = if self.argument_starts_at(self.position) {
                        self.parse_command_args()?
                    } else {
                        Vec::new()
                    };
                    let node = self.ast.new_node(NodeType::MethodCall, span);
                    self.ast.set_receiver(node, lhs);
                    self.ast.set_name(node, name);
                    self.ast.set_arguments(node, arguments);
                    lhs = node;
                }

                TokenKind::Op(Op::LBracket) if self.adjacent() => {
                    let span = self.span();
                    self.advance();
                    self.skip_newlines();
                    let mut indices = vec![self.parse_expression()?];
                    while self.eat_op(Op::Comma) {
                        self.skip_newlines();
                        indices.push(self.parse_expression()?);
                    }
                    self.skip_newlines();
                    self.expect_op(Op::RBracket, "]")?;

                    if self.check_op(Op::Assign) {
                        // `a[i] = v`
                        self.advance();
                        self.skip_newlines();
                        let value = self.parse_expr_bp(bp::ASSIGN)?;
                        let node = self.ast.new_node(NodeType::IndexAssignment, span);
                        self.ast.set_target_expression(node, lhs);
                        self.ast.set_index(node, indices[0]);
                        self.ast.set_arguments(node, indices);
                        self.ast.set_expression(node, value);
                        return Ok(node);
                    }

                    let node = self.ast.new_node(NodeType::Index, span);
                    self.ast.set_receiver(node, lhs);
                    self.ast.set_index(node, indices[0]);
                    self.ast.set_arguments(node, indices);
                    lhs = node;
                }

                TokenKind::Op(Op::ColonColon) => {
                    self.advance();
                    let part = self.expect_ident()?;
                    match self.ast.node_type(lhs) {
                        NodeType::Identifier => {
                            let first = self
                                .ast
                                .variable(lhs)
                                .cloned()
                                .unwrap_or_default();
                            self.ast.retype(lhs, NodeType::QualifiedName);
                            let parts = vec![first, part];
                            self.ast.set_qualified_name(lhs, parts.join("::"));
                            self.ast.set_parts(lhs, parts);
                        }
                        NodeType::QualifiedName => {
                            let mut parts = self.ast.parts_of(lhs).cloned().unwrap_or_default();
                            parts.push(part);
                            self.ast.set_qualified_name(lhs, parts.join("::"));
                            self.ast.set_parts(lhs, parts);
                        }
                        _ => return Err(self.error("constant name")),
                    }
                }

                _ => break,
            }
        }
        Ok(lhs)
    }

    /// Method names after `.`: identifiers, plus the keywords every value
    /// responds to.
    fn parse_method_call_name(&mut self) -> Result<String> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::Keyword(Keyword::Class) => {
                self.advance();
                Ok("class".to_string())
            }
            _ => Err(self.error("method name")),
        }
    }

    fn parse_paren_args(&mut self) -> Result<Vec<NodeId>> {
        self.expect_op(Op::LParen, "(")?;
        let saved = self.no_do_block;
        self.no_do_block = false;
        let result = (|| {
            self.skip_newlines();
            let mut args = Vec::new();
            while !self.check_op(Op::RParen) {
                args.push(self.parse_expression()?);
                self.skip_newlines();
                if !self.eat_op(Op::Comma) {
                    break;
                }
                self.skip_newlines();
            }
            self.expect_op(Op::RParen, ")")?;
            Ok(args)
        })();
        self.no_do_block = saved;
        result
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    /// Parses `{ |params| body }` or `do |params| body end` if one starts
    /// here. A brace is a block only when the next significant token is
    /// `|`; otherwise it is a hash literal and stays unconsumed.
    fn maybe_parse_block(&mut self) -> Result<Option<NodeId>> {
        if self.check_op(Op::LBrace) && self.brace_starts_block() {
            let span = self.span();
            self.advance();
            self.skip_newlines();
            let params = self.parse_block_params()?;
            let body = self.parse_statements_until(|p| p.check_op(Op::RBrace))?;
            self.expect_op(Op::RBrace, "}")?;
            let node = self.ast.new_node(NodeType::Block, span);
            self.ast.set_block_params(node, params);
            self.ast.set_block_body(node, body);
            return Ok(Some(node));
        }
        if self.check_keyword(Keyword::Do) && !self.no_do_block {
            let span = self.span();
            self.advance();
            self.skip_newlines();
            let params = if self.check_op(Op::Pipe) {
                self.parse_block_params()?
            } else {
                Vec::new()
            };
            let body = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
            self.expect_keyword(Keyword::End, "end")?;
            let node = self.ast.new_node(NodeType::Block, span);
            self.ast.set_block_params(node, params);
            self.ast.set_block_body(node, body);
            return Ok(Some(node));
        }
        Ok(None)
    }

    fn brace_starts_block(&self) -> bool {
        let mut n = 1;
        while matches!(self.peek(n).kind, TokenKind::Newline) {
            n += 1;
        }
        self.peek(n).kind == TokenKind::Op(Op::Pipe)
    }

    fn parse_block_params(&mut self) -> Result<Vec<String>> {
        self.expect_op(Op::Pipe, "|")?;
        let mut params = Vec::new();
        while !self.check_op(Op::Pipe) {
            params.push(self.expect_ident()?);
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::Pipe, "|")?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParsedProgram, Parser};
    use num_bigint::BigInt;

    fn parse(source: &str) -> ParsedProgram {
        Parser::parse(source).unwrap()
    }

    fn first_statement(program: &ParsedProgram) -> NodeId {
        program.ast.statements_of(program.root).unwrap()[0]
    }

    fn parse_expr(source: &str) -> (ParsedProgram, NodeId) {
        let program = parse(source);
        let stmt = first_statement(&program);
        (program, stmt)
    }

    // =========================================================================
    // PRECEDENCE
    // =========================================================================

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (p, e) = parse_expr("1 + 2 * 3\n");
        assert_eq!(p.ast.node_type(e), NodeType::BinaryOp);
        assert_eq!(*p.ast.operator(e).unwrap(), BinOp::Add);
        let rhs = p.ast.right(e).unwrap();
        assert_eq!(*p.ast.operator(rhs).unwrap(), BinOp::Mul);
    }

    #[test]
    fn subtraction_is_left_associative() {
        let (p, e) = parse_expr("10 - 4 - 3\n");
        let lhs = p.ast.left(e).unwrap();
        assert_eq!(p.ast.node_type(lhs), NodeType::BinaryOp);
        assert_eq!(*p.ast.operator(lhs).unwrap(), BinOp::Sub);
    }

    #[test]
    fn comparison_binds_tighter_than_logic() {
        let (p, e) = parse_expr("a < 1 && b > 2\n");
        assert_eq!(*p.ast.operator(e).unwrap(), BinOp::And);
        assert_eq!(*p.ast.operator(p.ast.left(e).unwrap()).unwrap(), BinOp::Lt);
    }

    #[test]
    fn assignment_is_right_associative() {
        let (p, e) = parse_expr("a = b = 1\n");
        assert_eq!(p.ast.node_type(e), NodeType::Assignment);
        assert_eq!(p.ast.variable(e).unwrap(), "a");
        let inner = p.ast.expression(e).unwrap();
        assert_eq!(p.ast.node_type(inner), NodeType::Assignment);
        assert_eq!(p.ast.variable(inner).unwrap(), "b");
    }

    #[test]
    fn compound_assignment_records_operator() {
        let (p, e) = parse_expr("total += 2\n");
        assert_eq!(p.ast.node_type(e), NodeType::CompoundAssignment);
        assert_eq!(*p.ast.operator(e).unwrap(), BinOp::Add);
    }

    #[test]
    fn range_sits_between_assignment_and_equality() {
        let (p, e) = parse_expr("r = 1..5\n");
        assert_eq!(p.ast.node_type(e), NodeType::Assignment);
        let range = p.ast.expression(e).unwrap();
        assert_eq!(p.ast.node_type(range), NodeType::RangeLit);
        assert_eq!(*p.ast.value(range).unwrap(), Literal::Bool(true));
    }

    #[test]
    fn exclusive_range_is_marked() {
        let (p, e) = parse_expr("1...5\n");
        assert_eq!(*p.ast.value(e).unwrap(), Literal::Bool(false));
    }

    // =========================================================================
    // PREFIX AND LITERALS
    // =========================================================================

    #[test]
    fn unary_minus_wraps_postfix_chain() {
        let (p, e) = parse_expr("-x.abs\n");
        assert_eq!(p.ast.node_type(e), NodeType::UnaryOp);
        assert_eq!(*p.ast.unary_operator(e).unwrap(), UnOp::Neg);
        let operand = p.ast.expression(e).unwrap();
        assert_eq!(p.ast.node_type(operand), NodeType::MethodCall);
    }

    #[test]
    fn splat_in_array_literal() {
        let (p, e) = parse_expr("[1, *rest, 2]\n");
        let elements = p.ast.elements_of(e).unwrap();
        assert_eq!(p.ast.node_type(elements[1]), NodeType::Splat);
    }

    #[test]
    fn rational_literal_carries_parts() {
        let (p, e) = parse_expr("1.5r\n");
        assert_eq!(p.ast.node_type(e), NodeType::RationalLit);
        assert_eq!(*p.ast.numerator(e).unwrap(), BigInt::from(15));
        assert_eq!(*p.ast.denominator(e).unwrap(), BigInt::from(10));
    }

    #[test]
    fn complex_literal_has_zero_real_part() {
        let (p, e) = parse_expr("4i\n");
        assert_eq!(p.ast.node_type(e), NodeType::ComplexLit);
        assert_eq!(*p.ast.real(e).unwrap(), 0.0);
        assert_eq!(*p.ast.imaginary(e).unwrap(), 4.0);
    }

    #[test]
    fn hash_literal_with_symbol_shorthand() {
        let (p, e) = parse_expr("{a: 1, \"k\" => 2}\n");
        assert_eq!(p.ast.node_type(e), NodeType::HashLit);
        let pairs = p.ast.pairs_of(e).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(p.ast.node_type(pairs[0].0), NodeType::SymbolLit);
        assert_eq!(p.ast.node_type(pairs[1].0), NodeType::StringLit);
    }

    // =========================================================================
    // POSTFIX CHAINS
    // =========================================================================

    #[test]
    fn method_chain_is_left_associative() {
        let (p, e) = parse_expr("h.keys.length\n");
        assert_eq!(p.ast.node_type(e), NodeType::MethodCall);
        assert_eq!(p.ast.name(e).unwrap(), "length");
        let recv = p.ast.receiver(e).unwrap();
        assert_eq!(p.ast.name(recv).unwrap(), "keys");
    }

    #[test]
    fn indexing_then_method_call() {
        let (p, e) = parse_expr("a[4].inspect\n");
        assert_eq!(p.ast.name(e).unwrap(), "inspect");
        let recv = p.ast.receiver(e).unwrap();
        assert_eq!(p.ast.node_type(recv), NodeType::Index);
    }

    #[test]
    fn index_assignment_makes_its_own_node() {
        let (p, e) = parse_expr("a[5] = 9\n");
        assert_eq!(p.ast.node_type(e), NodeType::IndexAssignment);
        assert!(p.ast.target_expression(e).is_some());
        assert!(p.ast.expression(e).is_some());
    }

    #[test]
    fn setter_assignment_makes_its_own_node() {
        let (p, e) = parse_expr("b.v = b.v + 3\n");
        assert_eq!(p.ast.node_type(e), NodeType::AttrAssignment);
        assert_eq!(p.ast.name(e).unwrap(), "v");
        let value = p.ast.expression(e).unwrap();
        assert_eq!(p.ast.node_type(value), NodeType::BinaryOp);
    }

    #[test]
    fn instance_var_assignment() {
        let (p, e) = parse_expr("@v = 1\n");
        assert_eq!(p.ast.node_type(e), NodeType::InstanceVarAssignment);
        assert_eq!(p.ast.variable(e).unwrap(), "v");
    }

    #[test]
    fn qualified_name_collects_parts() {
        let (p, e) = parse_expr("A::B::C\n");
        assert_eq!(p.ast.node_type(e), NodeType::QualifiedName);
        assert_eq!(p.ast.qualified_name(e).unwrap(), "A::B::C");
        assert_eq!(p.ast.parts_of(e).unwrap(), &["A", "B", "C"]);
    }

    #[test]
    fn method_call_on_qualified_name() {
        let (p, e) = parse_expr("Math::Util.double(2)\n");
        assert_eq!(p.ast.node_type(e), NodeType::MethodCall);
        let recv = p.ast.receiver(e).unwrap();
        assert_eq!(p.ast.node_type(recv), NodeType::QualifiedName);
    }

    #[test]
    fn class_keyword_is_a_method_after_dot() {
        let (p, e) = parse_expr("x.class\n");
        assert_eq!(p.ast.node_type(e), NodeType::MethodCall);
        assert_eq!(p.ast.name(e).unwrap(), "class");
    }

    // =========================================================================
    // BLOCKS
    // =========================================================================

    #[test]
    fn brace_block_attaches_to_call() {
        let (p, e) = parse_expr("(1..5).select { |x| x.even? }\n");
        assert_eq!(p.ast.node_type(e), NodeType::MethodCall);
        let block = p.ast.block(e).unwrap();
        assert_eq!(p.ast.node_type(block), NodeType::Block);
        assert_eq!(p.ast.block_params_of(block).unwrap(), &["x"]);
    }

    #[test]
    fn chained_blocks_attach_to_their_own_calls() {
        let (p, e) = parse_expr("(1..5).select { |x| x.even? }.each { |x| puts x }\n");
        assert_eq!(p.ast.name(e).unwrap(), "each");
        assert!(p.ast.block(e).is_some());
        let select = p.ast.receiver(e).unwrap();
        assert_eq!(p.ast.name(select).unwrap(), "select");
        assert!(p.ast.block(select).is_some());
    }

    #[test]
    fn do_block_without_params() {
        let (p, e) = parse_expr("3.times do\n  puts 1\nend\n");
        assert_eq!(p.ast.name(e).unwrap(), "times");
        let block = p.ast.block(e).unwrap();
        assert!(p.ast.block_params_of(block).unwrap().is_empty());
    }

    #[test]
    fn brace_without_pipe_is_a_hash_not_a_block() {
        let (p, e) = parse_expr("{1 => 2}\n");
        assert_eq!(p.ast.node_type(e), NodeType::HashLit);
    }

    #[test]
    fn dot_call_accepts_command_args() {
        let (p, e) = parse_expr("x.should eq(1)\n");
        assert_eq!(p.ast.name(e).unwrap(), "should");
        let args = p.ast.arguments_of(e).unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(p.ast.name(args[0]).unwrap(), "eq");
    }
}
