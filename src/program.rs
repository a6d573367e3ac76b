//! Program model for Quill
//!
//! The parser's output and the interpreter's input: functions lowered to
//! instruction lists, plus extern declarations whose "body" is a child
//! process invocation. A program is immutable once parsed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::op::Op;

/// Declared parameter and return types. The interpreter is dynamically
/// typed; these drive extern-result decoding and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    String,
    Number,
    Bool,
    Void,
}

impl ValueType {
    /// Map a type token to its [`ValueType`].
    pub fn from_token(text: &str) -> Option<ValueType> {
        match text {
            "string" => Some(ValueType::String),
            "num" => Some(ValueType::Number),
            "bool" => Some(ValueType::Bool),
            "void" => Some(ValueType::Void),
            _ => None,
        }
    }

    /// The source spelling of the type.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "num",
            ValueType::Bool => "bool",
            ValueType::Void => "void",
        }
    }
}

/// A typed parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: ValueType,
}

/// A user-defined function lowered to instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: ValueType,
    pub ops: Vec<Op>,
    /// Names declared with `let`, collected while parsing the body.
    pub locals: HashSet<String>,
}

/// A function whose implementation is an out-of-process executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternFunction {
    /// Path of the executable to invoke.
    pub path: String,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: ValueType,
}

/// A parsed program: user functions plus extern declarations, keyed by
/// unique name across both collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
    pub externs: Vec<ExternFunction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user function, rejecting name collisions.
    pub fn add_function(&mut self, function: Function) -> Result<(), ParseError> {
        if self.is_defined(&function.name) {
            return Err(ParseError::DuplicateName(function.name));
        }
        self.functions.push(function);
        Ok(())
    }

    /// Add an extern declaration, rejecting name collisions.
    pub fn add_extern(&mut self, function: ExternFunction) -> Result<(), ParseError> {
        if self.is_defined(&function.name) {
            return Err(ParseError::DuplicateName(function.name));
        }
        self.externs.push(function);
        Ok(())
    }

    /// Look up a user function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Look up an extern declaration by name.
    pub fn extern_function(&self, name: &str) -> Option<&ExternFunction> {
        self.externs.iter().find(|f| f.name == name)
    }

    fn is_defined(&self, name: &str) -> bool {
        self.function(name).is_some() || self.extern_function(name).is_some()
    }
}
