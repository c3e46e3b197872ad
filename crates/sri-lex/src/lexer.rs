//! Main lexer implementation.
//!
//! The [`Lexer`] turns source text into [`Token`]s using a per-character
//! dispatch in [`Lexer::next_token`] and a family of `lex_*` helpers, one
//! per construct. Whitespace and `#` comments are skipped; newlines are
//! emitted as tokens because the parser uses them as statement terminators.

use num_bigint::BigInt;
use sri_util::{Result, RubyError, Span};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Op, StrPart, Token, TokenKind};

/// Sentinel standing in for an escaped space inside a word array.
pub const ESCAPED_SPACE: char = '\u{1}';

/// Sentinel standing in for an escaped tab inside a word array.
pub const ESCAPED_TAB: char = '\u{2}';

/// Sentinel standing in for an escaped newline inside a word array.
pub const ESCAPED_NEWLINE: char = '\u{3}';

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// The lexer for Ruby source.
///
/// # Example
///
/// ```
/// use sri_lex::{Lexer, TokenKind};
///
/// let tokens = Lexer::tokenize("x = 1").unwrap();
/// assert!(matches!(tokens[0].kind, TokenKind::Ident(_)));
/// assert!(matches!(tokens.last().unwrap().kind, TokenKind::Eof));
/// ```
pub struct Lexer<'a> {
    /// Character cursor for traversing source.
    cursor: Cursor<'a>,

    /// Start byte position of the current token.
    token_start: usize,

    /// Start line of the current token.
    token_start_line: u32,

    /// Start column of the current token.
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Lexes the entire source, returning the token sequence ending in
    /// [`TokenKind::Eof`]. Stops at the first lexical error.
    pub fn tokenize(source: &'a str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return Ok(self.make(TokenKind::Eof));
        }

        match self.cursor.current_char() {
            '\n' => {
                self.cursor.advance();
                Ok(self.make(TokenKind::Newline))
            }

            // Single-character delimiters
            '(' => self.single(Op::LParen),
            ')' => self.single(Op::RParen),
            '[' => self.single(Op::LBracket),
            ']' => self.single(Op::RBracket),
            '{' => self.single(Op::LBrace),
            '}' => self.single(Op::RBrace),
            ',' => self.single(Op::Comma),
            ';' => self.single(Op::Semicolon),

            // Multi-character operators
            '+' => self.lex_plus(),
            '-' => self.lex_minus(),
            '*' => self.lex_star(),
            '/' => self.lex_slash(),
            '%' => self.lex_percent(),
            '=' => self.lex_equals(),
            '!' => self.lex_bang(),
            '<' => self.lex_less(),
            '>' => self.lex_greater(),
            '&' => self.lex_ampersand(),
            '|' => self.lex_pipe(),
            ':' => self.lex_colon(),
            '.' => self.lex_dot(),

            // Literals and names
            '"' => self.lex_double_quoted(),
            '\'' => self.lex_single_quoted(),
            '@' => self.lex_at(),
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_ident_start(c) => Ok(self.lex_identifier()),

            c => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn span(&self) -> Span {
        Span::new(self.token_start_line, self.token_start_column)
    }

    fn make(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.cursor.slice_from(self.token_start), self.span())
    }

    fn single(&mut self, op: Op) -> Result<Token> {
        self.cursor.advance();
        Ok(self.make(TokenKind::Op(op)))
    }

    fn error(&self, message: impl Into<String>) -> RubyError {
        RubyError::lex(message, Span::new(self.cursor.line(), self.cursor.column()))
    }

    fn error_at_start(&self, message: impl Into<String>) -> RubyError {
        RubyError::lex(message, self.span())
    }

    /// Skips spaces, tabs, carriage returns, and `#` comments. Newlines are
    /// significant and stay put.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current_char() {
                ' ' | '\t' | '\r' => self.cursor.advance(),
                '#' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                }
                _ => return,
            }
        }
    }

    // =========================================================================
    // OPERATORS
    // =========================================================================

    fn lex_plus(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::PlusAssign)))
        } else if self.cursor.current_char() == '@' && !is_ident_start(self.cursor.peek_char(1)) {
            // The unary-plus method name, as in `def +@`.
            self.cursor.advance();
            Ok(self.make(TokenKind::Ident("+@".to_string())))
        } else {
            Ok(self.make(TokenKind::Op(Op::Plus)))
        }
    }

    fn lex_minus(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::MinusAssign)))
        } else if self.cursor.current_char() == '@' && !is_ident_start(self.cursor.peek_char(1)) {
            // The unary-minus method name, as in `def -@`.
            self.cursor.advance();
            Ok(self.make(TokenKind::Ident("-@".to_string())))
        } else {
            Ok(self.make(TokenKind::Op(Op::Minus)))
        }
    }

    fn lex_star(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::StarAssign)))
        } else {
            Ok(self.make(TokenKind::Op(Op::Star)))
        }
    }

    fn lex_slash(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::SlashAssign)))
        } else {
            Ok(self.make(TokenKind::Op(Op::Slash)))
        }
    }

    /// `%` is modulo unless it opens a `%w(...)` / `%W(...)` word array.
    fn lex_percent(&mut self) -> Result<Token> {
        let marker = self.cursor.peek_char(1);
        if marker == 'w' || marker == 'W' {
            let delim = self.cursor.peek_char(2);
            if delim != '\0' && !delim.is_ascii_alphanumeric() && !delim.is_whitespace() {
                return self.lex_word_array(marker == 'W');
            }
            // `% w` stays modulo, but `%w1(...)` is a malformed literal.
            if delim.is_ascii_alphanumeric() {
                return Err(self.error(format!("invalid %w delimiter '{}'", delim)));
            }
        }
        self.single(Op::Percent)
    }

    fn lex_equals(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::EqEq)))
        } else if self.cursor.eat('>') {
            Ok(self.make(TokenKind::Op(Op::FatArrow)))
        } else {
            Ok(self.make(TokenKind::Op(Op::Assign)))
        }
    }

    fn lex_bang(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::NotEq)))
        } else {
            Ok(self.make(TokenKind::Op(Op::Bang)))
        }
    }

    fn lex_less(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::LtEq)))
        } else if self.cursor.eat('<') {
            Ok(self.make(TokenKind::Op(Op::Shl)))
        } else {
            Ok(self.make(TokenKind::Op(Op::Lt)))
        }
    }

    fn lex_greater(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('=') {
            Ok(self.make(TokenKind::Op(Op::GtEq)))
        } else {
            Ok(self.make(TokenKind::Op(Op::Gt)))
        }
    }

    fn lex_ampersand(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('&') {
            Ok(self.make(TokenKind::Op(Op::AndAnd)))
        } else {
            Err(self.error_at_start("stray '&'"))
        }
    }

    fn lex_pipe(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat('|') {
            Ok(self.make(TokenKind::Op(Op::OrOr)))
        } else {
            Ok(self.make(TokenKind::Op(Op::Pipe)))
        }
    }

    /// `::`, `:symbol`, or a bare colon.
    fn lex_colon(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.eat(':') {
            return Ok(self.make(TokenKind::Op(Op::ColonColon)));
        }
        if is_ident_start(self.cursor.current_char()) {
            let start = self.cursor.position();
            self.consume_ident_chars();
            let name = self.cursor.slice_from(start).to_string();
            return Ok(self.make(TokenKind::Symbol(name)));
        }
        Ok(self.make(TokenKind::Op(Op::Colon)))
    }

    /// One-char lookahead splits `.` / `..` / `...`.
    fn lex_dot(&mut self) -> Result<Token> {
        self.cursor.advance();
        if self.cursor.current_char() != '.' {
            return Ok(self.make(TokenKind::Op(Op::Dot)));
        }
        self.cursor.advance();
        if self.cursor.eat('.') {
            Ok(self.make(TokenKind::Op(Op::DotDotDot)))
        } else {
            Ok(self.make(TokenKind::Op(Op::DotDot)))
        }
    }

    // =========================================================================
    // NAMES
    // =========================================================================

    /// Consumes identifier body characters plus an optional trailing `?` or
    /// `!`. A `!` is left alone when it begins `!=`.
    fn consume_ident_chars(&mut self) {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        match self.cursor.current_char() {
            '?' => self.cursor.advance(),
            '!' if self.cursor.peek_char(1) != '=' => self.cursor.advance(),
            _ => {}
        }
    }

    fn lex_identifier(&mut self) -> Token {
        self.consume_ident_chars();
        let text = self.cursor.slice_from(self.token_start);
        match keyword_from_ident(text) {
            Some(kw) => self.make(TokenKind::Keyword(kw)),
            None => self.make(TokenKind::Ident(text.to_string())),
        }
    }

    /// `@name` instance variables and `@@name` class variables.
    fn lex_at(&mut self) -> Result<Token> {
        self.cursor.advance();
        let class_var = self.cursor.eat('@');
        if !is_ident_start(self.cursor.current_char()) {
            return Err(self.error_at_start("expected identifier after '@'"));
        }
        let start = self.cursor.position();
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let name = self.cursor.slice_from(start).to_string();
        if class_var {
            Ok(self.make(TokenKind::ClassVar(name)))
        } else {
            Ok(self.make(TokenKind::InstanceVar(name)))
        }
    }

    // =========================================================================
    // NUMBERS
    // =========================================================================

    /// Lexes a number literal.
    ///
    /// Handles decimal, hexadecimal (`0x`), binary (`0b`), and octal
    /// (leading `0`) integers, digit-flanked underscores, floats with
    /// scientific notation, and the `r` / `i` suffixes.
    fn lex_number(&mut self) -> Result<Token> {
        if self.cursor.current_char() == '0' {
            match self.cursor.peek_char(1) {
                'x' | 'X' => {
                    self.cursor.advance();
                    self.cursor.advance();
                    return self.lex_radix_integer(16);
                }
                'b' | 'B' => {
                    self.cursor.advance();
                    self.cursor.advance();
                    return self.lex_radix_integer(2);
                }
                '0'..='7' | '_' => {
                    self.cursor.advance();
                    return self.lex_radix_integer(8);
                }
                '8' | '9' => return Err(self.error("invalid octal digit")),
                _ => {}
            }
        }

        self.consume_decimal_digits()?;

        let mut is_float = false;
        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            is_float = true;
            self.cursor.advance();
            self.consume_decimal_digits()?;
        }

        let mut has_exponent = false;
        let c = self.cursor.current_char();
        if c == 'e' || c == 'E' {
            let after = self.cursor.peek_char(1);
            let after_sign = self.cursor.peek_char(2);
            if after.is_ascii_digit() || ((after == '+' || after == '-') && after_sign.is_ascii_digit()) {
                is_float = true;
                has_exponent = true;
                self.cursor.advance();
                if self.cursor.current_char() == '+' || self.cursor.current_char() == '-' {
                    self.cursor.advance();
                }
                while self.cursor.current_char().is_ascii_digit() {
                    self.cursor.advance();
                }
            }
        }

        let body = self.cursor.slice_from(self.token_start).to_string();

        // Suffixes. Exponent forms take neither.
        if !has_exponent && self.cursor.current_char() == 'r' && !is_ident_continue(self.cursor.peek_char(1)) {
            self.cursor.advance();
            let (numer, denom) = self.rational_parts(&body)?;
            return Ok(self.make(TokenKind::Rational { numer, denom }));
        }
        if self.cursor.current_char() == 'i' && !is_ident_continue(self.cursor.peek_char(1)) {
            self.cursor.advance();
            let imag = self.parse_float(&body)?;
            return Ok(self.make(TokenKind::Complex(imag)));
        }

        if is_ident_start(self.cursor.current_char()) {
            return Err(self.error("trailing characters in number literal"));
        }

        if is_float {
            Ok(self.make(TokenKind::Float(self.parse_float(&body)?)))
        } else {
            let digits = body.replace('_', "");
            let value = BigInt::parse_bytes(digits.as_bytes(), 10)
                .ok_or_else(|| self.error_at_start("invalid integer literal"))?;
            Ok(self.make(TokenKind::Integer(value)))
        }
    }

    fn parse_float(&self, body: &str) -> Result<f64> {
        body.replace('_', "")
            .parse::<f64>()
            .map_err(|e| self.error_at_start(format!("invalid float literal: {}", e)))
    }

    /// Splits a decimal body into a numerator/denominator pair for the `r`
    /// suffix: `3` becomes 3/1, `1.5` becomes 15/10.
    fn rational_parts(&self, body: &str) -> Result<(BigInt, BigInt)> {
        let clean = body.replace('_', "");
        let (digits, scale) = match clean.split_once('.') {
            Some((int_part, frac_part)) => {
                (format!("{}{}", int_part, frac_part), frac_part.len() as u32)
            }
            None => (clean, 0),
        };
        let numer = BigInt::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| self.error_at_start("invalid rational literal"))?;
        let denom = BigInt::from(10u32).pow(scale);
        Ok((numer, denom))
    }

    /// Consumes `[0-9]` runs joined by digit-flanked underscores.
    fn consume_decimal_digits(&mut self) -> Result<()> {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
            if self.cursor.current_char() == '_' {
                if !self.cursor.peek_char(1).is_ascii_digit() {
                    return Err(self.error("underscore must be between digits"));
                }
                self.cursor.advance();
            }
        }
        Ok(())
    }

    /// Integer body after a base prefix (or the leading `0` of octal).
    fn lex_radix_integer(&mut self, radix: u32) -> Result<Token> {
        let digit_start = self.cursor.position();
        loop {
            let c = self.cursor.current_char();
            if c == '_' {
                if !self.cursor.peek_char(1).is_digit(radix) {
                    return Err(self.error("underscore must be between digits"));
                }
                self.cursor.advance();
            } else if c.is_digit(radix) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        if digit_start == self.cursor.position() {
            return Err(self.error(format!("no digits after base-{} prefix", radix)));
        }
        if is_ident_start(self.cursor.current_char()) || self.cursor.current_char().is_ascii_digit() {
            return Err(self.error("trailing characters in number literal"));
        }

        let digits = self.cursor.slice_from(digit_start).replace('_', "");
        let value = BigInt::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| self.error_at_start("invalid integer literal"))?;
        Ok(self.make(TokenKind::Integer(value)))
    }

    // =========================================================================
    // STRINGS
    // =========================================================================

    /// Single-quoted string: only `\\` and `\'` are escapes.
    fn lex_single_quoted(&mut self) -> Result<Token> {
        self.cursor.advance();
        let mut text = String::new();
        loop {
            match self.cursor.current_char() {
                '\0' if self.cursor.is_at_end() => {
                    return Err(self.error_at_start("unterminated string"));
                }
                '\'' => {
                    self.cursor.advance();
                    return Ok(self.make(TokenKind::Str(text)));
                }
                '\\' => {
                    self.cursor.advance();
                    match self.cursor.current_char() {
                        '\\' => text.push('\\'),
                        '\'' => text.push('\''),
                        other => {
                            text.push('\\');
                            text.push(other);
                        }
                    }
                    self.cursor.advance();
                }
                c => {
                    text.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    /// Double-quoted string with escapes; switches to an interpolated
    /// payload when a `#{` appears.
    fn lex_double_quoted(&mut self) -> Result<Token> {
        self.cursor.advance();
        let mut parts: Vec<StrPart> = Vec::new();
        let mut text = String::new();
        loop {
            match self.cursor.current_char() {
                '\0' if self.cursor.is_at_end() => {
                    return Err(self.error_at_start("unterminated string"));
                }
                '"' => {
                    self.cursor.advance();
                    if parts.is_empty() {
                        return Ok(self.make(TokenKind::Str(text)));
                    }
                    if !text.is_empty() {
                        parts.push(StrPart::Text(text));
                    }
                    return Ok(self.make(TokenKind::InterpolatedStr(parts)));
                }
                '\\' => {
                    self.cursor.advance();
                    let escaped = match self.cursor.current_char() {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        '\'' => '\'',
                        other => other,
                    };
                    text.push(escaped);
                    self.cursor.advance();
                }
                '#' if self.cursor.peek_char(1) == '{' => {
                    if !text.is_empty() {
                        parts.push(StrPart::Text(std::mem::take(&mut text)));
                    }
                    self.cursor.advance();
                    self.cursor.advance();
                    parts.push(StrPart::Expr(self.scan_interpolation()?));
                }
                c => {
                    text.push(c);
                    self.cursor.advance();
                }
            }
        }
    }

    /// Captures the source inside one `#{...}`, tracking brace nesting.
    fn scan_interpolation(&mut self) -> Result<String> {
        let mut depth = 1usize;
        let mut source = String::new();
        loop {
            if self.cursor.is_at_end() {
                return Err(self.error_at_start("unterminated interpolation"));
            }
            let c = self.cursor.current_char();
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.cursor.advance();
                        return Ok(source);
                    }
                }
                _ => {}
            }
            source.push(c);
            self.cursor.advance();
        }
    }

    // =========================================================================
    // WORD ARRAYS
    // =========================================================================

    /// `%w(...)` / `%W(...)`. The delimiter after the marker is paired for
    /// `([{<`, otherwise the same character closes the literal. Escaped
    /// space/tab/newline are kept as sentinel code points so they survive
    /// word splitting; the evaluator rewrites them.
    fn lex_word_array(&mut self, interpolated: bool) -> Result<Token> {
        self.cursor.advance(); // '%'
        self.cursor.advance(); // 'w' or 'W'
        let open = self.cursor.current_char();
        let close = match open {
            '(' => ')',
            '[' => ']',
            '{' => '}',
            '<' => '>',
            c => c,
        };
        self.cursor.advance();

        let mut words: Vec<String> = Vec::new();
        let mut word = String::new();
        loop {
            if self.cursor.is_at_end() {
                return Err(self.error_at_start("unterminated word array"));
            }
            let c = self.cursor.current_char();
            if c == close {
                self.cursor.advance();
                if !word.is_empty() {
                    words.push(word);
                }
                let kind = if interpolated {
                    TokenKind::InterpolatedWordArray(words)
                } else {
                    TokenKind::WordArray(words)
                };
                return Ok(self.make(kind));
            }
            if c.is_whitespace() {
                if !word.is_empty() {
                    words.push(std::mem::take(&mut word));
                }
                self.cursor.advance();
                continue;
            }
            if c == '\\' {
                self.cursor.advance();
                match self.cursor.current_char() {
                    ' ' => word.push(ESCAPED_SPACE),
                    't' => word.push(ESCAPED_TAB),
                    'n' | '\n' => word.push(ESCAPED_NEWLINE),
                    other => word.push(other),
                }
                self.cursor.advance();
                continue;
            }
            word.push(c);
            self.cursor.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Keyword;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn first(source: &str) -> TokenKind {
        kinds(source).remove(0)
    }

    fn int(n: i64) -> TokenKind {
        TokenKind::Integer(BigInt::from(n))
    }

    // =========================================================================
    // NUMBERS
    // =========================================================================

    #[test]
    fn lexes_decimal_integers() {
        assert_eq!(first("42"), int(42));
        assert_eq!(first("1_000_000"), int(1_000_000));
    }

    #[test]
    fn lexes_base_prefixed_integers() {
        assert_eq!(first("0xFF"), int(255));
        assert_eq!(first("0b1010"), int(10));
        assert_eq!(first("0755"), int(493));
        assert_eq!(first("0xDE_AD"), int(0xDEAD));
    }

    #[test]
    fn lexes_floats_and_exponents() {
        assert_eq!(first("3.14"), TokenKind::Float(3.14));
        assert_eq!(first("1e3"), TokenKind::Float(1000.0));
        assert_eq!(first("2.5e-2"), TokenKind::Float(0.025));
        assert_eq!(first("1E+2"), TokenKind::Float(100.0));
    }

    #[test]
    fn lexes_rational_and_imaginary_suffixes() {
        assert_eq!(
            first("3r"),
            TokenKind::Rational {
                numer: BigInt::from(3),
                denom: BigInt::from(1)
            }
        );
        assert_eq!(
            first("1.5r"),
            TokenKind::Rational {
                numer: BigInt::from(15),
                denom: BigInt::from(10)
            }
        );
        assert_eq!(first("4i"), TokenKind::Complex(4.0));
        assert_eq!(first("2.5i"), TokenKind::Complex(2.5));
    }

    #[test]
    fn dot_after_integer_is_not_a_fraction() {
        let toks = kinds("1..5");
        assert_eq!(toks[0], int(1));
        assert_eq!(toks[1], TokenKind::Op(Op::DotDot));
        assert_eq!(toks[2], int(5));
    }

    #[test]
    fn method_call_on_integer_literal() {
        let toks = kinds("5.times");
        assert_eq!(toks[0], int(5));
        assert_eq!(toks[1], TokenKind::Op(Op::Dot));
        assert_eq!(toks[2], TokenKind::Ident("times".into()));
    }

    #[test]
    fn rejects_bad_underscores() {
        assert!(Lexer::tokenize("1_").is_err());
        assert!(Lexer::tokenize("1__0").is_err());
    }

    #[test]
    fn rejects_empty_base_prefix() {
        assert!(Lexer::tokenize("0x").is_err());
        assert!(Lexer::tokenize("0b2").is_err());
    }

    // =========================================================================
    // STRINGS
    // =========================================================================

    #[test]
    fn lexes_single_quoted_strings() {
        assert_eq!(first(r"'a\'b'"), TokenKind::Str("a'b".into()));
        assert_eq!(first(r"'a\nb'"), TokenKind::Str("a\\nb".into()));
    }

    #[test]
    fn lexes_double_quoted_escapes() {
        assert_eq!(first("\"a\\tb\\n\""), TokenKind::Str("a\tb\n".into()));
    }

    #[test]
    fn interpolation_splits_into_parts() {
        let tok = first("\"x is #{x + 1}!\"");
        assert_eq!(
            tok,
            TokenKind::InterpolatedStr(vec![
                StrPart::Text("x is ".into()),
                StrPart::Expr("x + 1".into()),
                StrPart::Text("!".into()),
            ])
        );
    }

    #[test]
    fn interpolation_tracks_nested_braces() {
        let tok = first("\"#{ {1 => 2}.length }\"");
        assert_eq!(
            tok,
            TokenKind::InterpolatedStr(vec![StrPart::Expr(" {1 => 2}.length ".into())])
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(Lexer::tokenize("\"abc").is_err());
        assert!(Lexer::tokenize("\"#{1").is_err());
    }

    // =========================================================================
    // WORD ARRAYS, SYMBOLS, VARIABLES
    // =========================================================================

    #[test]
    fn lexes_word_arrays() {
        assert_eq!(
            first("%w(a b c)"),
            TokenKind::WordArray(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(
            first("%W[x #{y}]"),
            TokenKind::InterpolatedWordArray(vec!["x".into(), "#{y}".into()])
        );
        assert_eq!(
            first("%w!a b!"),
            TokenKind::WordArray(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn word_array_escapes_use_sentinels() {
        assert_eq!(
            first(r"%w(a\ b c)"),
            TokenKind::WordArray(vec![format!("a{}b", ESCAPED_SPACE), "c".into()])
        );
    }

    #[test]
    fn invalid_word_array_delimiter_is_an_error() {
        assert!(Lexer::tokenize("%w1 2 3)").is_err());
    }

    #[test]
    fn percent_is_still_modulo() {
        let toks = kinds("a % b");
        assert_eq!(toks[1], TokenKind::Op(Op::Percent));
    }

    #[test]
    fn lexes_symbols_and_bare_colon() {
        assert_eq!(first(":name"), TokenKind::Symbol("name".into()));
        assert_eq!(first(":empty?"), TokenKind::Symbol("empty?".into()));
        assert_eq!(first(": x"), TokenKind::Op(Op::Colon));
        assert_eq!(first("::"), TokenKind::Op(Op::ColonColon));
    }

    #[test]
    fn lexes_instance_and_class_variables() {
        assert_eq!(first("@count"), TokenKind::InstanceVar("count".into()));
        assert_eq!(first("@@total"), TokenKind::ClassVar("total".into()));
        assert!(Lexer::tokenize("@ x").is_err());
    }

    // =========================================================================
    // IDENTIFIERS AND OPERATORS
    // =========================================================================

    #[test]
    fn identifiers_may_end_in_question_or_bang() {
        assert_eq!(first("empty?"), TokenKind::Ident("empty?".into()));
        assert_eq!(first("save!"), TokenKind::Ident("save!".into()));
    }

    #[test]
    fn bang_equals_is_not_a_method_bang() {
        let toks = kinds("x != y");
        assert_eq!(toks[0], TokenKind::Ident("x".into()));
        assert_eq!(toks[1], TokenKind::Op(Op::NotEq));
    }

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(first("while"), TokenKind::Keyword(Keyword::While));
        assert_eq!(first("elsif"), TokenKind::Keyword(Keyword::Elsif));
    }

    #[test]
    fn lexes_compound_operators() {
        let toks = kinds("+= -= *= /= == != <= >= && || => .. ...");
        let expected = [
            Op::PlusAssign,
            Op::MinusAssign,
            Op::StarAssign,
            Op::SlashAssign,
            Op::EqEq,
            Op::NotEq,
            Op::LtEq,
            Op::GtEq,
            Op::AndAnd,
            Op::OrOr,
            Op::FatArrow,
            Op::DotDot,
            Op::DotDotDot,
        ];
        for (tok, op) in toks.iter().zip(expected) {
            assert_eq!(*tok, TokenKind::Op(op));
        }
    }

    #[test]
    fn stray_ampersand_is_an_error() {
        assert!(Lexer::tokenize("a & b").is_err());
    }

    #[test]
    fn unknown_character_reports_position() {
        let err = Lexer::tokenize("x = `").unwrap_err();
        match err {
            sri_util::RubyError::Lex { span, .. } => {
                assert_eq!(span.line, 1);
                assert_eq!(span.column, 5);
            }
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    // =========================================================================
    // NEWLINES AND COMMENTS
    // =========================================================================

    #[test]
    fn newlines_are_tokens_and_comments_are_not() {
        let toks = kinds("a # trailing\nb");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Lexing recognized constructs is total: any mix of identifiers,
        /// numbers, and simple punctuation either tokenizes or reports a
        /// positioned error, but never panics.
        #[test]
        fn lexer_never_panics_on_simple_ascii(s in "[a-z0-9_+*/()=<>.,; \n-]{0,64}") {
            let _ = Lexer::tokenize(&s);
        }

        /// Decimal integer literals round-trip through the lexer.
        #[test]
        fn integers_round_trip(n in 0u64..=u64::MAX) {
            let source = n.to_string();
            let tokens = Lexer::tokenize(&source).unwrap();
            prop_assert_eq!(&tokens[0].kind, &TokenKind::Integer(BigInt::from(n)));
        }
    }
}
