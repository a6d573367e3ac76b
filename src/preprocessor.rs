//! Textual import preprocessor for Quill
//!
//! Runs before the lexer: `import name;` lines are replaced by the contents
//! of `name.ql` resolved relative to the importing file, recursively. Each
//! file is inlined at most once per run, so diamond imports and cycles both
//! terminate.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PreprocessError;

/// File extension for Quill source modules.
pub const SOURCE_EXT: &str = "ql";

pub struct Preprocessor {
    /// Canonical paths already inlined.
    included: HashSet<PathBuf>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self {
            included: HashSet::new(),
        }
    }

    /// Expand all imports in `source`, resolving them relative to `dir`.
    pub fn process(&mut self, source: &str, dir: &Path) -> Result<String, PreprocessError> {
        let mut output = String::new();
        self.process_lines(source, dir, &mut output)?;
        Ok(output)
    }

    fn process_lines(
        &mut self,
        source: &str,
        dir: &Path,
        output: &mut String,
    ) -> Result<(), PreprocessError> {
        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("import ") {
                let name = import_name(trimmed)?;
                let path = dir.join(format!("{}.{}", name, SOURCE_EXT));
                self.process_file(&path, output)?;
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }
        Ok(())
    }

    fn process_file(&mut self, path: &Path, output: &mut String) -> Result<(), PreprocessError> {
        let canonical = path
            .canonicalize()
            .map_err(|_| PreprocessError::FileNotFound(path.display().to_string()))?;

        // Marked before recursing, so import cycles terminate.
        if !self.included.insert(canonical.clone()) {
            return Ok(());
        }

        let content = fs::read_to_string(&canonical).map_err(|source| PreprocessError::Io {
            path: canonical.display().to_string(),
            source,
        })?;

        let dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        self.process_lines(&content, &dir, output)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Expected form: `import math;`
fn import_name(line: &str) -> Result<&str, PreprocessError> {
    let parts: Vec<&str> = line
        .split(|c: char| c == ' ' || c == ';')
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        ["import", name] => Ok(name),
        _ => Err(PreprocessError::InvalidImport(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_plain_source_passes_through() {
        let dir = tempdir().unwrap();
        let mut pre = Preprocessor::new();
        let out = pre.process("fun main() -> void { }\n", dir.path()).unwrap();
        assert_eq!(out, "fun main() -> void { }\n");
    }

    #[test]
    fn test_import_is_inlined() {
        let dir = tempdir().unwrap();
        write(dir.path(), "math.ql", "fun double(x: num) -> num { return x * 2; }\n");

        let mut pre = Preprocessor::new();
        let out = pre
            .process("import math;\nfun main() -> void { }\n", dir.path())
            .unwrap();
        assert!(out.contains("fun double"));
        assert!(out.contains("fun main"));
        assert!(!out.contains("import"));
    }

    #[test]
    fn test_nested_imports() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ql", "import b;\nfun a() -> void { }\n");
        write(dir.path(), "b.ql", "fun b() -> void { }\n");

        let mut pre = Preprocessor::new();
        let out = pre.process("import a;\n", dir.path()).unwrap();
        assert!(out.contains("fun a"));
        assert!(out.contains("fun b"));
    }

    #[test]
    fn test_diamond_import_inlined_once() {
        let dir = tempdir().unwrap();
        write(dir.path(), "left.ql", "import shared;\nfun left() -> void { }\n");
        write(dir.path(), "right.ql", "import shared;\nfun right() -> void { }\n");
        write(dir.path(), "shared.ql", "fun shared() -> void { }\n");

        let mut pre = Preprocessor::new();
        let out = pre.process("import left;\nimport right;\n", dir.path()).unwrap();
        assert_eq!(out.matches("fun shared").count(), 1);
    }

    #[test]
    fn test_import_cycle_terminates() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ql", "import b;\nfun a() -> void { }\n");
        write(dir.path(), "b.ql", "import a;\nfun b() -> void { }\n");

        let mut pre = Preprocessor::new();
        let out = pre.process("import a;\n", dir.path()).unwrap();
        assert_eq!(out.matches("fun a").count(), 1);
        assert_eq!(out.matches("fun b").count(), 1);
    }

    #[test]
    fn test_missing_import() {
        let dir = tempdir().unwrap();
        let mut pre = Preprocessor::new();
        let err = pre.process("import ghost;\n", dir.path()).unwrap_err();
        assert!(matches!(err, PreprocessError::FileNotFound(_)));
    }

    #[test]
    fn test_malformed_import() {
        let dir = tempdir().unwrap();
        let mut pre = Preprocessor::new();
        let err = pre.process("import too many words;\n", dir.path()).unwrap_err();
        assert!(matches!(err, PreprocessError::InvalidImport(_)));
    }
}
