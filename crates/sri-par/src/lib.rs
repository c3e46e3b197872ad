//! sri-par - Recursive-Descent Parser
//!
//! Builds the entity-component AST from the token stream. Statement
//! dispatch lives in `stmt.rs`; expressions use binding-power climbing in
//! `expr.rs`, with postfix chains (`.method(args) { block }`, `[index]`)
//! folded in left-associatively.
//!
//! Newlines and `;` terminate statements. Adjacency (did two tokens touch
//! in the source?) disambiguates the Ruby constructs that depend on
//! whitespace: `a[0]` indexes while `puts [0]` passes an array, and
//! `foo(x)` is a call while `foo (x)` is a command with a parenthesized
//! argument.

pub mod ast;
mod expr;
mod stmt;

pub use ast::{Ast, BinOp, Literal, NodeId, NodeType, UnOp};
pub use expr::bp;

use sri_lex::{Keyword, Lexer, Op, Token, TokenKind};
use sri_util::{Result, RubyError, Span};

/// A fully parsed program: the component store plus its root node.
#[derive(Debug)]
pub struct ParsedProgram {
    pub ast: Ast,
    pub root: NodeId,
}

/// The recursive-descent parser.
pub struct Parser {
    /// Token stream from the lexer, ending in `Eof`.
    tokens: Vec<Token>,

    /// Current position in the token stream.
    position: usize,

    /// The component store under construction.
    ast: Ast,

    /// Set while parsing a loop header, where `do` closes the header
    /// instead of opening a block.
    no_do_block: bool,
}

impl Parser {
    /// Lexes and parses `source` into a program.
    pub fn parse(source: &str) -> Result<ParsedProgram> {
        let tokens = Lexer::tokenize(source)?;
        let mut parser = Parser::from_tokens(tokens);
        let root = parser.parse_program()?;
        Ok(ParsedProgram {
            ast: parser.ast,
            root,
        })
    }

    /// Creates a parser over an existing token stream.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            position: 0,
            ast: Ast::new(),
            no_do_block: false,
        }
    }

    /// Parses an expression in a loop-header position, where a trailing
    /// `do` must be left for the loop itself.
    fn parse_loop_header_expression(&mut self) -> Result<NodeId> {
        let saved = self.no_do_block;
        self.no_do_block = true;
        let result = self.parse_expression();
        self.no_do_block = saved;
        result
    }

    /// Parses a sequence of statements up to end of input and wraps them in
    /// a `program` node.
    fn parse_program(&mut self) -> Result<NodeId> {
        let statements = self.parse_statements_until(|p| p.at_eof())?;
        let root = self.ast.new_node(NodeType::Program, Span::new(1, 1));
        self.ast.set_statements(root, statements);
        Ok(root)
    }

    // =========================================================================
    // TOKEN STREAM HELPERS
    // =========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek(&self, n: usize) -> &Token {
        let idx = (self.position + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn at_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    /// True at a statement terminator: newline, `;`, or end of input.
    fn at_terminator(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Newline | TokenKind::Op(Op::Semicolon) | TokenKind::Eof
        )
    }

    fn skip_terminators(&mut self) {
        while matches!(
            self.current().kind,
            TokenKind::Newline | TokenKind::Op(Op::Semicolon)
        ) {
            self.advance();
        }
    }

    /// Skips newlines only; used inside bracketed constructs where `;`
    /// would still be an error.
    fn skip_newlines(&mut self) {
        while matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    /// True if the token at `at` starts exactly where the previous token
    /// ended. `a[0]` is adjacent; `puts [0]` is not.
    fn adjacent_at(&self, at: usize) -> bool {
        if at == 0 || at >= self.tokens.len() {
            return false;
        }
        let prev = &self.tokens[at - 1];
        let here = &self.tokens[at];
        prev.span.line == here.span.line && prev.end_column() == here.span.column
    }

    /// True if the *current* token touches the one before it.
    fn adjacent(&self) -> bool {
        self.adjacent_at(self.position)
    }

    fn error(&self, expected: impl Into<String>) -> RubyError {
        RubyError::parse(expected, self.current().describe(), self.span())
    }

    fn check_op(&self, op: Op) -> bool {
        self.current().kind == TokenKind::Op(op)
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if self.check_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Op, expected: &str) -> Result<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        self.current().kind == TokenKind::Keyword(kw)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, expected: &str) -> Result<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("identifier")),
        }
    }

    /// Parses statements until `stop` matches, skipping blank lines. Hitting
    /// end of input without `stop` matching is a missing-`end` style error.
    fn parse_statements_until(&mut self, stop: impl Fn(&Self) -> bool) -> Result<Vec<NodeId>> {
        let mut statements = Vec::new();
        self.skip_terminators();
        while !stop(self) {
            if self.at_eof() {
                return Err(self.error("end"));
            }
            statements.push(self.parse_statement()?);
            if !self.at_terminator() && !stop(self) {
                return Err(self.error("newline"));
            }
            self.skip_terminators();
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sri_util::Idx;

    #[test]
    fn program_root_is_unreferenced() {
        let program = Parser::parse("x = 1\ny = x + 2\n").unwrap();
        assert_eq!(program.ast.find_root(), Some(program.root));
        assert_eq!(program.ast.node_type(program.root), NodeType::Program);
    }

    #[test]
    fn empty_source_parses_to_empty_program() {
        let program = Parser::parse("\n\n").unwrap();
        let stmts = program.ast.statements_of(program.root).unwrap();
        assert!(stmts.is_empty());
    }

    #[test]
    fn every_referenced_id_exists() {
        let program = Parser::parse("a = [1, 2]\nputs a[0]\n").unwrap();
        let ast = &program.ast;
        let mut stack = vec![program.root];
        while let Some(id) = stack.pop() {
            assert!(id.index() < ast.len());
            stack.extend(ast.children(id));
        }
    }

    #[test]
    fn missing_end_is_a_parse_error() {
        let err = Parser::parse("if x\n  1\n").unwrap_err();
        match err {
            RubyError::Parse { expected, .. } => assert_eq!(expected, "end"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
