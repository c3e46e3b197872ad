//! sri-lex - Lexical Analyzer
//!
//! Transforms Ruby source text into a stream of tokens. The lexer is a
//! single pass over the source with one character of lookahead for the
//! `.` / `..` / `...` family and small bounded lookahead elsewhere.
//!
//! Beyond the usual identifier/operator fare, this lexer knows the Ruby
//! shapes the parser depends on:
//!
//! - number literals in every base, with underscores, scientific notation,
//!   and the `r` (rational) / `i` (imaginary) suffixes,
//! - double-quoted strings that switch to an interpolated payload when a
//!   `#{` appears (the expression source is captured unparsed),
//! - `%w(...)` / `%W(...)` word arrays with paired or same-character
//!   delimiters,
//! - `:symbol`, `@ivar`, `@@cvar`,
//! - newline tokens, which the parser treats as statement terminators.
//!
//! Any malformed construct aborts lexing with a positioned error; the
//! driver surfaces it and exits.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::{keyword_from_ident, Keyword, Op, StrPart, Token, TokenKind};
