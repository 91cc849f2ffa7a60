use crate::parser::ParseError;
use crate::types::JsValue;
use thiserror::Error;

/// Errors surfaced to the embedding host.
///
/// `Uncaught` carries a JavaScript value that escaped every `try`; the
/// remaining variants are structural failures that evaluated code can never
/// observe or recover from.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Uncaught {message}")]
    Uncaught { message: String, value: JsValue },

    #[error("unsupported node kind: {0}")]
    UnsupportedNodeKind(&'static str),

    #[error("malformed node: expected {expected}, got {found}")]
    MalformedNode {
        expected: &'static str,
        found: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True for parse errors raised at end of input, where a REPL should
    /// keep reading instead of reporting.
    pub fn is_incomplete_input(&self) -> bool {
        matches!(self, Error::Parse(e) if e.is_incomplete())
    }

    /// The thrown value, if this is an uncaught exception.
    pub fn thrown_value(&self) -> Option<&JsValue> {
        match self {
            Error::Uncaught { value, .. } => Some(value),
            _ => None,
        }
    }
}
