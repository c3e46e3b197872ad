//! Statement parsing.
//!
//! Statement dispatch tries, in order: definitions (`class` / `def` /
//! `module`), the control-flow keywords, attr declarations, multiple
//! assignment, command calls (`puts 1 + 2` — an identifier followed by what
//! can only be an argument), and finally a plain expression. Assignment
//! forms other than these are recognized inside the expression grammar,
//! where `=` applies to identifier/`@ivar`/`@@cvar` prefixes and the
//! postfix chain converts `a[i] =` and `obj.attr =` into their own nodes.
//!
//! Every simple statement may carry a postfix `if` modifier.

use sri_lex::{Keyword, Op, TokenKind};
use sri_util::Result;

use crate::ast::{NodeId, NodeType};
use crate::Parser;

impl Parser {
    /// Parses one statement.
    pub(crate) fn parse_statement(&mut self) -> Result<NodeId> {
        let stmt = match self.current().kind.clone() {
            TokenKind::Keyword(Keyword::Class) => self.parse_class()?,
            TokenKind::Keyword(Keyword::Def) => self.parse_def()?,
            TokenKind::Keyword(Keyword::Module) => self.parse_module()?,
            TokenKind::Keyword(Keyword::If) => return self.parse_if(),
            TokenKind::Keyword(Keyword::While) => return self.parse_while(NodeType::While),
            TokenKind::Keyword(Keyword::Until) => return self.parse_while(NodeType::Until),
            TokenKind::Keyword(Keyword::For) => return self.parse_for(),
            TokenKind::Keyword(Keyword::Case) => return self.parse_case(),
            TokenKind::Keyword(Keyword::Loop) => return self.parse_loop(),
            TokenKind::Keyword(Keyword::Return) => self.parse_jump(NodeType::Return)?,
            TokenKind::Keyword(Keyword::Break) => self.parse_jump(NodeType::Break)?,
            TokenKind::Keyword(Keyword::Next) | TokenKind::Keyword(Keyword::Continue) => {
                self.parse_jump(NodeType::Next)?
            }
            TokenKind::Keyword(Keyword::AttrAccessor) => self.parse_attr_decl("accessor")?,
            TokenKind::Keyword(Keyword::AttrReader) => self.parse_attr_decl("reader")?,
            TokenKind::Keyword(Keyword::AttrWriter) => self.parse_attr_decl("writer")?,
            _ => self.parse_expression_statement()?,
        };

        // Postfix `if` modifier: `return 1 if n < 2`
        if self.check_keyword(Keyword::If) {
            let span = self.span();
            self.advance();
            let condition = self.parse_expression()?;
            let node = self.ast.new_node(NodeType::If, span);
            self.ast.set_condition(node, condition);
            self.ast.set_then_branch(node, vec![stmt]);
            return Ok(node);
        }
        Ok(stmt)
    }

    // =========================================================================
    // DEFINITIONS
    // =========================================================================

    /// `class Name [< Parent] ... end`
    fn parse_class(&mut self) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        let name = self.expect_ident()?;
        let node = self.ast.new_node(NodeType::ClassDefinition, span);
        self.ast.set_name(node, name);
        if self.eat_op(Op::Lt) {
            let parent = self.expect_ident()?;
            self.ast.set_variable(node, parent);
        }
        let body = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
        self.expect_keyword(Keyword::End, "end")?;
        self.ast.set_body(node, body);
        Ok(node)
    }

    /// `def name(params) ... end` or `def self.name(params) ... end`.
    ///
    /// Operator methods (`def +(other)`, `def <=(other)`, `def -@`) are
    /// accepted so user classes can participate in arithmetic dispatch.
    fn parse_def(&mut self) -> Result<NodeId> {
        let span = self.span();
        self.advance();

        let node_type = if self.check_keyword(Keyword::SelfKw)
            && self.peek(1).kind == TokenKind::Op(Op::Dot)
        {
            self.advance();
            self.advance();
            NodeType::SelfMethodDefinition
        } else {
            NodeType::MethodDefinition
        };

        let name = self.parse_method_def_name()?;
        let parameters = self.parse_def_parameters()?;
        let body = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
        self.expect_keyword(Keyword::End, "end")?;

        let node = self.ast.new_node(node_type, span);
        self.ast.set_name(node, name);
        self.ast.set_parameters(node, parameters);
        self.ast.set_body(node, body);
        Ok(node)
    }

    fn parse_method_def_name(&mut self) -> Result<String> {
        let name = match &self.current().kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Op(Op::Plus) => "+".to_string(),
            TokenKind::Op(Op::Minus) => "-".to_string(),
            TokenKind::Op(Op::Star) => "*".to_string(),
            TokenKind::Op(Op::Slash) => "/".to_string(),
            TokenKind::Op(Op::Percent) => "%".to_string(),
            TokenKind::Op(Op::Lt) => "<".to_string(),
            TokenKind::Op(Op::Gt) => ">".to_string(),
            TokenKind::Op(Op::LtEq) => "<=".to_string(),
            TokenKind::Op(Op::GtEq) => ">=".to_string(),
            TokenKind::Op(Op::EqEq) => "==".to_string(),
            TokenKind::Op(Op::NotEq) => "!=".to_string(),
            TokenKind::Op(Op::Shl) => "<<".to_string(),
            _ => return Err(self.error("method name")),
        };
        self.advance();
        Ok(name)
    }

    fn parse_def_parameters(&mut self) -> Result<Vec<String>> {
        let mut params = Vec::new();
        if self.eat_op(Op::LParen) {
            self.skip_newlines();
            while !self.check_op(Op::RParen) {
                params.push(self.expect_ident()?);
                self.skip_newlines();
                if !self.eat_op(Op::Comma) {
                    break;
                }
                self.skip_newlines();
            }
            self.expect_op(Op::RParen, ")")?;
        } else if matches!(self.current().kind, TokenKind::Ident(_)) {
            // Paren-less parameter list: `def foo a, b`
            loop {
                params.push(self.expect_ident()?);
                if !self.eat_op(Op::Comma) {
                    break;
                }
            }
        }
        Ok(params)
    }

    /// `module Q::R ... end` — nesting is expressed in the name itself;
    /// missing parents are created at evaluation time.
    fn parse_module(&mut self) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        let mut parts = vec![self.expect_ident()?];
        while self.eat_op(Op::ColonColon) {
            parts.push(self.expect_ident()?);
        }
        let node = self.ast.new_node(NodeType::ModuleDefinition, span);
        self.ast.set_qualified_name(node, parts.join("::"));
        self.ast.set_parts(node, parts);
        let body = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
        self.expect_keyword(Keyword::End, "end")?;
        self.ast.set_body(node, body);
        Ok(node)
    }

    /// `attr_accessor :a, :b` and friends. `kind` is the declaration
    /// flavor: "accessor", "reader", or "writer".
    fn parse_attr_decl(&mut self, kind: &str) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        let mut names = Vec::new();
        loop {
            match &self.current().kind {
                TokenKind::Symbol(name) | TokenKind::Ident(name) => {
                    names.push(name.clone());
                    self.advance();
                }
                _ => return Err(self.error("symbol")),
            }
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        let node = self.ast.new_node(NodeType::AttrDeclaration, span);
        self.ast.set_name(node, kind.to_string());
        self.ast.set_variables(node, names);
        Ok(node)
    }

    // =========================================================================
    // CONTROL FLOW
    // =========================================================================

    /// `if cond ... [elsif cond ...]* [else ...] end`
    fn parse_if(&mut self) -> Result<NodeId> {
        self.advance();
        self.parse_if_tail()
    }

    /// Parses from the condition onward. An `elsif` recurses, becoming a
    /// nested `if` in the else branch; only the innermost level consumes
    /// the shared `end`.
    fn parse_if_tail(&mut self) -> Result<NodeId> {
        let span = self.span();
        let condition = self.parse_expression()?;
        let then_branch = self.parse_statements_until(|p| {
            p.check_keyword(Keyword::Elsif)
                || p.check_keyword(Keyword::Else)
                || p.check_keyword(Keyword::End)
        })?;

        let node = self.ast.new_node(NodeType::If, span);
        self.ast.set_condition(node, condition);
        self.ast.set_then_branch(node, then_branch);

        if self.eat_keyword(Keyword::Elsif) {
            let nested = self.parse_if_tail()?;
            self.ast.set_else_branch(node, vec![nested]);
        } else {
            if self.eat_keyword(Keyword::Else) {
                let else_branch =
                    self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
                self.ast.set_else_branch(node, else_branch);
            }
            self.expect_keyword(Keyword::End, "end")?;
        }
        Ok(node)
    }

    /// `while cond ... end` / `until cond ... end`
    fn parse_while(&mut self, node_type: NodeType) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        let condition = self.parse_loop_header_expression()?;
        self.eat_keyword(Keyword::Do);
        let body = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
        self.expect_keyword(Keyword::End, "end")?;
        let node = self.ast.new_node(node_type, span);
        self.ast.set_condition(node, condition);
        self.ast.set_body(node, body);
        Ok(node)
    }

    /// `for x[, y, *rest] in iterable ... end`. Splat names are stored with
    /// a `*` prefix; the evaluator slices the middle out for them.
    fn parse_for(&mut self) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        let mut variables = Vec::new();
        loop {
            let splat = self.eat_op(Op::Star);
            let name = self.expect_ident()?;
            variables.push(if splat { format!("*{}", name) } else { name });
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_keyword(Keyword::In, "in")?;
        let iterable = self.parse_loop_header_expression()?;
        self.eat_keyword(Keyword::Do);
        let body = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
        self.expect_keyword(Keyword::End, "end")?;

        let node = self.ast.new_node(NodeType::For, span);
        self.ast.set_variables(node, variables);
        self.ast.set_iterable(node, iterable);
        self.ast.set_body(node, body);
        Ok(node)
    }

    /// `loop do ... end`
    fn parse_loop(&mut self) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        self.expect_keyword(Keyword::Do, "do")?;
        let body = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
        self.expect_keyword(Keyword::End, "end")?;
        let node = self.ast.new_node(NodeType::Loop, span);
        self.ast.set_body(node, body);
        Ok(node)
    }

    /// `case [subject] when v[, v]* ... [else ...] end`
    pub(crate) fn parse_case(&mut self) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        let node = self.ast.new_node(NodeType::Case, span);
        if !self.at_terminator() {
            let subject = self.parse_expression()?;
            self.ast.set_expression(node, subject);
        }
        self.skip_terminators();

        let mut whens = Vec::new();
        while self.check_keyword(Keyword::When) {
            let when_span = self.span();
            self.advance();
            let mut conditions = vec![self.parse_expression()?];
            while self.eat_op(Op::Comma) {
                conditions.push(self.parse_expression()?);
            }
            let statements = self.parse_statements_until(|p| {
                p.check_keyword(Keyword::When)
                    || p.check_keyword(Keyword::Else)
                    || p.check_keyword(Keyword::End)
            })?;
            let when = self.ast.new_node(NodeType::When, when_span);
            self.ast.set_conditions(when, conditions);
            self.ast.set_statements(when, statements);
            whens.push(when);
        }
        if whens.is_empty() {
            return Err(self.error("when"));
        }
        self.ast.set_when_clauses(node, whens);

        if self.eat_keyword(Keyword::Else) {
            let else_clause = self.parse_statements_until(|p| p.check_keyword(Keyword::End))?;
            self.ast.set_else_clause(node, else_clause);
        }
        self.expect_keyword(Keyword::End, "end")?;
        Ok(node)
    }

    /// `return` / `break` / `next` / `continue`, each with an optional value.
    fn parse_jump(&mut self, node_type: NodeType) -> Result<NodeId> {
        let span = self.span();
        self.advance();
        let node = self.ast.new_node(node_type, span);
        if !self.at_terminator()
            && !self.check_keyword(Keyword::If)
            && !self.check_keyword(Keyword::End)
            && !self.check_op(Op::RBrace)
        {
            let value = self.parse_expression()?;
            self.ast.set_expression(node, value);
        }
        Ok(node)
    }

    // =========================================================================
    // ASSIGNMENTS AND EXPRESSIONS
    // =========================================================================

    fn parse_expression_statement(&mut self) -> Result<NodeId> {
        if self.is_multiple_assignment() {
            return self.parse_multiple_assignment();
        }
        if self.looks_like_command() {
            return self.parse_command_call();
        }
        self.parse_expression()
    }

    /// `a, b = v` — detected by scanning `ident (, ident)+ =`.
    fn is_multiple_assignment(&self) -> bool {
        if !matches!(self.current().kind, TokenKind::Ident(_)) {
            return false;
        }
        let mut i = 1;
        let mut saw_comma = false;
        loop {
            match (&self.peek(i).kind, &self.peek(i + 1).kind) {
                (TokenKind::Op(Op::Comma), TokenKind::Ident(_)) => {
                    saw_comma = true;
                    i += 2;
                }
                (TokenKind::Op(Op::Assign), _) => return saw_comma,
                _ => return false,
            }
        }
    }

    fn parse_multiple_assignment(&mut self) -> Result<NodeId> {
        let span = self.span();
        let mut variables = vec![self.expect_ident()?];
        while self.eat_op(Op::Comma) {
            variables.push(self.expect_ident()?);
        }
        self.expect_op(Op::Assign, "=")?;

        let first = self.parse_expression()?;
        let value = if self.check_op(Op::Comma) {
            // `a, b = 1, 2` — gather the right side into an array literal.
            let mut elements = vec![first];
            while self.eat_op(Op::Comma) {
                elements.push(self.parse_expression()?);
            }
            let array = self.ast.new_node(NodeType::ArrayLit, span);
            self.ast.set_elements(array, elements);
            array
        } else {
            first
        };

        let node = self.ast.new_node(NodeType::MultipleAssignment, span);
        self.ast.set_variables(node, variables);
        self.ast.set_expression(node, value);
        Ok(node)
    }

    /// True when the statement reads as `ident argument...` — a method
    /// call without parentheses, like `puts 1 + 2` or `p x, y`.
    fn looks_like_command(&self) -> bool {
        if !matches!(self.current().kind, TokenKind::Ident(_)) {
            return false;
        }
        self.argument_starts_at(self.position + 1)
    }

    /// Could the token at `at` begin a paren-less argument list?
    pub(crate) fn argument_starts_at(&self, at: usize) -> bool {
        let tok = &self.tokens[at.min(self.tokens.len() - 1)];
        match &tok.kind {
            TokenKind::Integer(_)
            | TokenKind::Float(_)
            | TokenKind::Rational { .. }
            | TokenKind::Complex(_)
            | TokenKind::Str(_)
            | TokenKind::InterpolatedStr(_)
            | TokenKind::WordArray(_)
            | TokenKind::InterpolatedWordArray(_)
            | TokenKind::Symbol(_)
            | TokenKind::Ident(_)
            | TokenKind::InstanceVar(_)
            | TokenKind::ClassVar(_)
            | TokenKind::Keyword(Keyword::Nil)
            | TokenKind::Keyword(Keyword::True)
            | TokenKind::Keyword(Keyword::False)
            | TokenKind::Keyword(Keyword::SelfKw)
            | TokenKind::Keyword(Keyword::Not)
            | TokenKind::Op(Op::Bang) => true,

            // `puts [1, 2]` / `puts (x)`: bracket not glued to the name.
            TokenKind::Op(Op::LBracket) | TokenKind::Op(Op::LParen) => !self.adjacent_at(at),

            // `puts -1` / `foo *args`: the sign/splat touches its operand
            // but not the name.
            TokenKind::Op(Op::Minus) | TokenKind::Op(Op::Star) => {
                !self.adjacent_at(at)
                    && self.adjacent_at(at + 1)
                    && self.argument_starts_at(at + 1)
            }

            _ => false,
        }
    }

    fn parse_command_call(&mut self) -> Result<NodeId> {
        let span = self.span();
        let name = self.expect_ident()?;
        let arguments = self.parse_command_args()?;
        let node = self.ast.new_node(NodeType::MethodCall, span);
        self.ast.set_name(node, name);
        self.ast.set_arguments(node, arguments);
        Ok(node)
    }

    pub(crate) fn parse_command_args(&mut self) -> Result<Vec<NodeId>> {
        let mut args = vec![self.parse_expression()?];
        while self.eat_op(Op::Comma) {
            self.skip_newlines();
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParsedProgram, Parser};

    fn parse(source: &str) -> ParsedProgram {
        Parser::parse(source).unwrap()
    }

    fn statements(program: &ParsedProgram) -> Vec<NodeId> {
        program.ast.statements_of(program.root).unwrap().clone()
    }

    #[test]
    fn parses_method_definition() {
        let p = parse("def add(a, b)\n  a + b\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::MethodDefinition);
        assert_eq!(p.ast.name(stmt).unwrap(), "add");
        assert_eq!(p.ast.parameters_of(stmt).unwrap(), &["a", "b"]);
        assert_eq!(p.ast.body(stmt).unwrap().len(), 1);
    }

    #[test]
    fn parses_self_method_definition() {
        let p = parse("def self.build\n  1\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::SelfMethodDefinition);
        assert_eq!(p.ast.name(stmt).unwrap(), "build");
    }

    #[test]
    fn parses_operator_method_definition() {
        let p = parse("def +(other)\n  other\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.name(stmt).unwrap(), "+");
    }

    #[test]
    fn parses_class_with_parent() {
        let p = parse("class Dog < Animal\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::ClassDefinition);
        assert_eq!(p.ast.name(stmt).unwrap(), "Dog");
        assert_eq!(p.ast.variable(stmt).unwrap(), "Animal");
    }

    #[test]
    fn parses_module_with_qualified_name() {
        let p = parse("module Outer::Inner\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::ModuleDefinition);
        assert_eq!(p.ast.qualified_name(stmt).unwrap(), "Outer::Inner");
        assert_eq!(p.ast.parts_of(stmt).unwrap(), &["Outer", "Inner"]);
    }

    #[test]
    fn parses_attr_accessor() {
        let p = parse("attr_accessor :name, :age\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::AttrDeclaration);
        assert_eq!(p.ast.name(stmt).unwrap(), "accessor");
        assert_eq!(p.ast.variables_of(stmt).unwrap(), &["name", "age"]);
    }

    #[test]
    fn parses_if_elsif_else_chain() {
        let p = parse("if a\n 1\nelsif b\n 2\nelse\n 3\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::If);
        let else_branch = p.ast.else_branch(stmt).unwrap();
        assert_eq!(else_branch.len(), 1);
        let nested = else_branch[0];
        assert_eq!(p.ast.node_type(nested), NodeType::If);
        assert_eq!(p.ast.else_branch(nested).unwrap().len(), 1);
    }

    #[test]
    fn parses_postfix_if() {
        let p = parse("return 1 if n < 2\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::If);
        let then = p.ast.then_branch(stmt).unwrap();
        assert_eq!(p.ast.node_type(then[0]), NodeType::Return);
    }

    #[test]
    fn parses_for_with_splat_destructuring() {
        let p = parse("for a, *rest in [1, 2, 3]\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::For);
        assert_eq!(p.ast.variables_of(stmt).unwrap(), &["a", "*rest"]);
    }

    #[test]
    fn parses_loop_do() {
        let p = parse("loop do\n  break\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::Loop);
    }

    #[test]
    fn parses_case_with_when_lists() {
        let p = parse("case x\nwhen 1, 2\n 'low'\nelse\n 'high'\nend\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::Case);
        let whens = p.ast.when_clauses_of(stmt).unwrap();
        assert_eq!(whens.len(), 1);
        assert_eq!(p.ast.conditions_of(whens[0]).unwrap().len(), 2);
        assert!(p.ast.else_clause(stmt).is_some());
    }

    #[test]
    fn parses_multiple_assignment() {
        let p = parse("a, b = 1, 2\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::MultipleAssignment);
        assert_eq!(p.ast.variables_of(stmt).unwrap(), &["a", "b"]);
        let rhs = p.ast.expression(stmt).unwrap();
        assert_eq!(p.ast.node_type(rhs), NodeType::ArrayLit);
    }

    #[test]
    fn parses_command_call_with_complex_arg() {
        let p = parse("puts 1 + 2 * 3\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::MethodCall);
        assert_eq!(p.ast.name(stmt).unwrap(), "puts");
        assert_eq!(p.ast.arguments_of(stmt).unwrap().len(), 1);
    }

    #[test]
    fn command_call_with_array_argument_is_not_indexing() {
        let p = parse("puts [1, 2, 3]\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::MethodCall);
        let args = p.ast.arguments_of(stmt).unwrap();
        assert_eq!(p.ast.node_type(args[0]), NodeType::ArrayLit);
    }

    #[test]
    fn adjacent_bracket_is_indexing_not_command() {
        let p = parse("a[1]\n");
        let stmt = statements(&p)[0];
        assert_eq!(p.ast.node_type(stmt), NodeType::Index);
    }

    #[test]
    fn parses_break_with_value() {
        let p = parse("loop do\n  break 42\nend\n");
        let stmt = statements(&p)[0];
        let body = p.ast.body(stmt).unwrap();
        assert_eq!(p.ast.node_type(body[0]), NodeType::Break);
        assert!(p.ast.expression(body[0]).is_some());
    }
}
