//! Quill - a small imperative scripting language
//!
//! Source is lowered straight to stack-machine instructions and executed by
//! a tree-walking interpreter; `extern` functions run as child processes
//! behind a JSON-over-argv protocol.

pub mod document;
pub mod error;
pub mod externs;
pub mod interpreter;
pub mod lexer;
pub mod op;
pub mod parser;
pub mod preprocessor;
pub mod program;
pub mod token;
pub mod value;

pub use error::{LexError, ParseError, PreprocessError, QuillError, Result, RuntimeError};
pub use interpreter::Interpreter;
pub use lexer::Lexer;
pub use op::Op;
pub use parser::Parser;
pub use program::{ExternFunction, Function, Param, Program, ValueType};
pub use value::Value;

/// Convenience function to run Quill source against standard output
pub fn run(source: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    run_with(source, &mut stdout)
}

/// Run Quill source and capture everything it prints
pub fn run_with_output(source: &str) -> Result<String> {
    let mut buffer = Vec::new();
    run_with(source, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn run_with(source: &str, output: &mut dyn std::io::Write) -> Result<()> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;

    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;

    let mut interpreter = Interpreter::new(program, output);
    interpreter.execute()?;
    Ok(())
}

/// Version of the Quill language
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
