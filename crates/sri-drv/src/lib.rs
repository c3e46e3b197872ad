//! sri-drv - Driver
//!
//! Orchestrates the pipeline — lex, parse, evaluate — and exposes the two
//! embedding entry points:
//!
//! - [`evaluate`]: run source against stdout, map success/failure to an
//!   exit code, never panic across the boundary.
//! - [`eval_string`]: run source and hand the final expression's value
//!   back to the host, with the interpreter's error attached on failure.
//!
//! Host programs can seed the initial scope through
//! [`EvalOptions::namespaces`]; names prefixed `class:` or `method:` carry
//! their usual namespace meaning.

use std::io::Write;

use anyhow::Context;
use tracing::debug;

use sri_eval::{Interpreter, SharedOutput, Value};

/// Options for [`eval_string`].
#[derive(Default)]
pub struct EvalOptions {
    /// Predefined top-level bindings seeded into the initial scope.
    pub namespaces: Vec<(String, Value)>,

    /// Allowlist of callable names. Accepted and recorded; not yet
    /// enforced.
    pub allow_methods: Option<Vec<String>>,

    /// Denylist of callable names. Accepted and recorded; not yet
    /// enforced.
    pub deny_methods: Option<Vec<String>>,
}

/// Runs `source` against stdout. Returns 0 on success; on failure writes
/// one diagnostic line to stderr and returns 1. Errors never propagate.
pub fn evaluate(source: &str) -> i32 {
    let mut interp = Interpreter::with_stdout();
    match interp.eval_source(source) {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}

/// Runs `source` and returns the final expression's value. Output goes to
/// stdout; failures surface as a host error carrying the interpreter's
/// message.
pub fn eval_string(source: &str, options: &EvalOptions) -> anyhow::Result<Value> {
    eval_string_to(source, options, Box::new(std::io::stdout()))
}

/// [`eval_string`] with an explicit output sink, for embedders and tests
/// that capture what the program prints.
pub fn eval_string_to(
    source: &str,
    options: &EvalOptions,
    out: Box<dyn Write>,
) -> anyhow::Result<Value> {
    if options.allow_methods.is_some() || options.deny_methods.is_some() {
        debug!("allow_methods/deny_methods are recorded but not enforced");
    }
    let mut interp = Interpreter::new(out);
    interp.scope_mut().seed(options.namespaces.clone());
    interp
        .eval_source(source)
        .context("evaluation failed")
}

/// Convenience wrapper: run source, capture output, return both.
pub fn eval_capturing(source: &str, options: &EvalOptions) -> (anyhow::Result<Value>, String) {
    let out = SharedOutput::new();
    let result = eval_string_to(source, options, Box::new(out.clone()));
    (result, out.contents())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_returns_zero_on_success() {
        assert_eq!(evaluate("1 + 1"), 0);
    }

    #[test]
    fn evaluate_returns_one_on_failure() {
        assert_eq!(evaluate("1 +"), 1);
        assert_eq!(evaluate("no_such_variable"), 1);
    }

    #[test]
    fn eval_string_returns_the_final_value() {
        let value = eval_string("2 * 21", &EvalOptions::default()).unwrap();
        assert!(value.ruby_eq(&Value::integer(42)));
    }

    #[test]
    fn eval_string_attaches_the_original_message() {
        let err = eval_string("boom", &EvalOptions::default()).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Undefined variable: boom"), "got: {}", chain);
    }

    #[test]
    fn namespaces_seed_the_initial_scope() {
        let options = EvalOptions {
            namespaces: vec![("answer".to_string(), Value::integer(42))],
            ..Default::default()
        };
        let (result, out) = eval_capturing("puts answer", &options);
        result.unwrap();
        assert_eq!(out, "42\n");
    }
}
