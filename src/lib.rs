//! A tree-walking JavaScript evaluator.
//!
//! [`evaluate`] runs a source string against a fresh global environment;
//! [`Interpreter`] keeps one alive across evaluations, which is what the REPL
//! and the test [`harness`] use.

pub mod ast;
pub mod error;
pub mod harness;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod types;

pub use error::Error;
pub use interpreter::{Interpreter, inspect};
pub use types::JsValue;

/// Parses and evaluates `source`, returning the completion value of its last
/// statement. `bindings` are visible to the program and shadow host globals
/// of the same name.
pub fn evaluate<'a>(
    source: &str,
    bindings: impl IntoIterator<Item = (&'a str, JsValue)>,
) -> Result<JsValue, Error> {
    let mut interp = Interpreter::new();
    for (name, value) in bindings {
        interp.define_global(name, value);
    }
    interp.eval_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn evaluates_with_bindings() {
        let result = evaluate("x * 2 + 1", [("x", JsValue::Number(20.0))]).map(|v| inspect(&v));
        assert_eq!(result.ok().as_deref(), Some("41"));
    }

    #[test]
    fn bindings_shadow_host_globals() {
        let result = evaluate("Math", [("Math", JsValue::from("mine"))]).map(|v| inspect(&v));
        assert_eq!(result.ok().as_deref(), Some("\"mine\""));
    }

    #[test]
    fn uncaught_values_surface_as_errors() {
        let err = evaluate("throw new RangeError('out')", []).err();
        assert_eq!(err.map(|e| e.to_string()).as_deref(), Some("Uncaught RangeError: out"));
        assert!(matches!(evaluate("let = ;", []), Err(Error::Parse(_))));
    }
}
