//! Program document round-trip
//!
//! A parsed program persists as a YAML document, and the driver re-loads
//! the document before interpreting. The contract is structural identity:
//! same functions, same instructions, same nested lists.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::program::Program;

pub fn to_yaml(program: &Program) -> Result<String> {
    Ok(serde_yaml::to_string(program)?)
}

pub fn from_yaml(document: &str) -> Result<Program> {
    Ok(serde_yaml::from_str(document)?)
}

/// Write `program` as a YAML document at `path`.
pub fn save(program: &Program, path: &Path) -> Result<()> {
    fs::write(path, to_yaml(program)?)?;
    Ok(())
}

/// Load a program document from `path`.
pub fn load(path: &Path) -> Result<Program> {
    from_yaml(&fs::read_to_string(path)?)
}
