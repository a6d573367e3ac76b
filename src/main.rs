//! Quill CLI
//!
//! Usage:
//!   quill run <file.ql>   - Execute a Quill program
//!   quill help            - Show help message

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::process;

use colored::Colorize;

use quill::document;
use quill::interpreter::Interpreter;
use quill::lexer::Lexer;
use quill::parser::Parser;
use quill::preprocessor::Preprocessor;
use quill::{QuillError, VERSION};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "run" => {
            if args.len() < 3 {
                eprintln!("{}: missing file argument", "error".red());
                eprintln!("Usage: quill run <file.ql>");
                process::exit(1);
            }
            run_file(&args[2]);
        }
        "help" | "--help" | "-h" => print_help(),
        "version" | "--version" | "-v" => println!("Quill {}", VERSION),
        _ => {
            // Assume it's a file
            if args[1].ends_with(".ql") {
                run_file(&args[1]);
            } else {
                eprintln!("{}: unknown command '{}'", "error".red(), args[1]);
                print_help();
                process::exit(1);
            }
        }
    }
}

fn print_help() {
    println!("{}", "Quill".cyan().bold());
    println!("A small imperative scripting language");
    println!("{} {}\n", "Version".cyan(), VERSION);
    println!("{}", "USAGE:".yellow());
    println!("  quill run <file.ql>   Execute a Quill program");
    println!("  quill help            Show this help message");
    println!("  quill version         Show version\n");
    println!("{}", "EXAMPLES:".yellow());
    println!("  quill run demos/hello.ql\n");
    println!("{}", "LANGUAGE FEATURES:".yellow());
    println!("  let x: num = 10;                      Variable declaration");
    println!("  fun add(a: num, b: num) -> num        Function definition");
    println!("  extern \"./bin\" f(x: num) -> num;      Out-of-process function");
    println!("  if / else, while, for                 Control flow");
    println!("  import math;                          Textual include of math.ql");
}

fn run_file(path: &str) {
    if let Err(e) = try_run_file(path) {
        eprintln!("{}: {}", "error".red(), e);
        process::exit(1);
    }
}

fn try_run_file(path: &str) -> Result<(), QuillError> {
    let source = fs::read_to_string(path)?;

    // Inline imports relative to the file being run
    let dir = Path::new(path).parent().unwrap_or_else(|| Path::new("."));
    let mut preprocessor = Preprocessor::new();
    let source = preprocessor.process(&source, dir)?;

    let mut lexer = Lexer::new(&source);
    let tokens = lexer.tokenize()?;

    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;

    // Round-trip through the on-disk document before executing
    let document_path = Path::new(path).with_extension("yaml");
    document::save(&program, &document_path)?;
    let program = document::load(&document_path)?;

    let mut stdout = io::stdout();
    let mut interpreter = Interpreter::new(program, &mut stdout);
    interpreter.execute()?;
    Ok(())
}
