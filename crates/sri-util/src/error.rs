//! Error taxonomy for the interpreter.
//!
//! Every phase reports failures through [`RubyError`]. Lexical and parse
//! errors carry the source position; runtime errors carry the names involved.
//! Control-flow unwinding (`break`/`next`/`return`) is *not* an error and
//! lives in the evaluator as its own enum.

use thiserror::Error;

use crate::span::Span;

/// All failures an interpreted program can provoke.
///
/// The interpreter never recovers locally from any of these; they propagate
/// to the `evaluate`/`eval_string` boundary, which converts them to exit
/// code 1 or a host error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RubyError {
    /// Lexical error: unterminated string, unknown character, bad literal.
    #[error("lex error at {span}: {message}")]
    Lex { message: String, span: Span },

    /// Syntax error with what the parser expected and what it found.
    #[error("parse error at {span}: expected {expected}, found {actual}")]
    Parse {
        expected: String,
        actual: String,
        span: Span,
    },

    /// A name lookup failed for a variable.
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    /// A name lookup failed for a constant (class or module).
    #[error("Uninitialized constant {0}")]
    UninitializedConstant(String),

    /// Method dispatch found no callable for the receiver.
    #[error("Unknown method: {method} on {receiver}")]
    NoMethod { method: String, receiver: String },

    /// An operand had the wrong type for an operation.
    #[error("{0}")]
    Type(String),

    /// A call had the wrong arity or argument shape.
    #[error("{0}")]
    Argument(String),

    /// Integer or rational division by zero.
    #[error("divided by 0")]
    ZeroDivision,

    /// A `.should` expectation did not hold.
    #[error("expected {expected}, got {actual}")]
    AssertionFailure { expected: String, actual: String },
}

impl RubyError {
    /// Shorthand for a lexical error at a position.
    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        RubyError::Lex {
            message: message.into(),
            span,
        }
    }

    /// Shorthand for a parse error at a position.
    pub fn parse(expected: impl Into<String>, actual: impl Into<String>, span: Span) -> Self {
        RubyError::Parse {
            expected: expected.into(),
            actual: actual.into(),
            span,
        }
    }
}

/// Result type alias used throughout the interpreter crates.
pub type Result<T> = std::result::Result<T, RubyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display_includes_position() {
        let err = RubyError::lex("unterminated string", Span::new(2, 7));
        assert_eq!(err.to_string(), "lex error at 2:7: unterminated string");
    }

    #[test]
    fn parse_error_display_names_expectation() {
        let err = RubyError::parse("end", "EOF", Span::new(9, 1));
        assert_eq!(err.to_string(), "parse error at 9:1: expected end, found EOF");
    }

    #[test]
    fn name_errors_match_surface_format() {
        assert_eq!(
            RubyError::UndefinedVariable("x".into()).to_string(),
            "Undefined variable: x"
        );
        assert_eq!(
            RubyError::UninitializedConstant("Foo".into()).to_string(),
            "Uninitialized constant Foo"
        );
    }

    #[test]
    fn no_method_display_names_receiver_type() {
        let err = RubyError::NoMethod {
            method: "frobnicate".into(),
            receiver: "Integer".into(),
        };
        assert_eq!(err.to_string(), "Unknown method: frobnicate on Integer");
    }
}
