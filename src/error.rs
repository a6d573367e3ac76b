//! Error types for Quill
//!
//! One error enum per pipeline stage, unified under [`QuillError`]. Every
//! error is fatal to the run that raised it: nothing is retried, the first
//! failure propagates out to the driver.

use thiserror::Error;

/// Errors raised while tokenizing source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated block comment")]
    UnterminatedBlockComment,
}

/// Errors raised while parsing the token stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected {expected}, got '{found}'")]
    Expected { expected: String, found: String },

    #[error("undefined variable or function '{0}'")]
    UndefinedReference(String),

    #[error("unexpected token in expression: '{0}'")]
    UnexpectedToken(String),

    #[error("unknown statement: '{0}'")]
    UnknownStatement(String),

    #[error("invalid type '{0}'")]
    InvalidType(String),

    #[error("duplicate function name '{0}'")]
    DuplicateName(String),
}

/// Errors raised while executing a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("no 'main' function")]
    NoMain,

    #[error("stack underflow during '{0}'")]
    StackUnderflow(String),

    #[error("invalid argument '{0}' for 'push'")]
    InvalidLiteral(String),

    #[error("variable '{0}' not found")]
    UndefinedVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("cannot {op} {left} and {right}")]
    InvalidOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("'{context}' requires a bool, got {found}")]
    ExpectedBool {
        context: &'static str,
        found: &'static str,
    },

    #[error("'num_to_string' requires a number, got {0}")]
    ExpectedNumber(&'static str),

    #[error("cannot write output: {0}")]
    Output(String),

    #[error("cannot spawn extern process '{path}': {reason}")]
    ExternSpawn { path: String, reason: String },

    #[error("extern call timed out")]
    ExternTimeout,

    #[error("extern process failed: {0}")]
    ExternFailed(String),

    #[error("extern call produced no result")]
    ExternNoResult,

    #[error("malformed extern result: {0}")]
    ExternBadResult(String),
}

/// Errors raised while expanding imports.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("invalid import statement: {0}")]
    InvalidImport(String),

    #[error("imported file not found: {0}")]
    FileNotFound(String),

    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Any error a Quill pipeline stage can raise.
#[derive(Debug, Error)]
pub enum QuillError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("program document error: {0}")]
    Document(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for Quill operations
pub type Result<T> = std::result::Result<T, QuillError>;
