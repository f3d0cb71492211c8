// monkey-core - Shared test helpers
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

use monkey_core::{Environment, Object, eval_program};
use monkey_parser::Parser;

/// Parse and evaluate a source string in a fresh environment.
pub fn eval_str(source: &str) -> Object {
    let program = Parser::new(source)
        .parse_program()
        .unwrap_or_else(|errors| panic!("parser errors for {:?}: {:?}", source, errors));
    eval_program(&program, &Environment::new())
}

/// Assert an evaluation result against its display form.
pub fn assert_eval(source: &str, expected: &str) {
    assert_eq!(eval_str(source).to_string(), expected, "source: {}", source);
}
