//! Call target resolution across an analyzed batch
//!
//! Scanning records every bare-identifier call, including calls to imported
//! or global functions. Resolution narrows `called_functions` to names that
//! are defined somewhere in the analyzed set.
//!
//! ## Limitations
//!
//! Resolution is by name only:
//! - Imports, scopes and shadowing are not consulted
//! - A name defined in any analyzed file resolves for every file
//! - Anonymous functions are never call targets

use crate::ast::{FunctionRecord, LineRange};
use crate::batch::FileFunctions;
use serde::Serialize;
use std::collections::HashMap;

/// One definition site of a named function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionLocation {
    pub path: String,
    pub name: String,
    pub line_range: LineRange,
}

/// Index of named functions across one or more analyzed files
#[derive(Debug, Clone, Default)]
pub struct FunctionIndex {
    by_name: HashMap<String, Vec<FunctionLocation>>,
}

impl FunctionIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every named record (at every nesting depth) of every file
    pub fn from_files(files: &[FileFunctions]) -> Self {
        let mut index = Self::new();
        for file in files {
            index.insert_records(&file.path, &file.functions);
        }
        index
    }

    /// Index the named records of one file
    pub fn insert_records(&mut self, path: &str, functions: &[FunctionRecord]) {
        for root in functions {
            root.walk(&mut |record, _| {
                if record.is_anonymous() {
                    return;
                }
                self.by_name
                    .entry(record.name.clone())
                    .or_default()
                    .push(FunctionLocation {
                        path: path.to_string(),
                        name: record.name.clone(),
                        line_range: record.line_range,
                    });
            });
        }
    }

    /// Whether `name` is defined anywhere in the index
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Every definition site of `name`, in insertion order
    pub fn lookup(&self, name: &str) -> &[FunctionLocation] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Keep only call targets defined in `index`, recursively
///
/// Idempotent: applying it twice with the same index changes nothing further.
pub fn resolve_calls(functions: &mut [FunctionRecord], index: &FunctionIndex) {
    for function in functions {
        function
            .called_functions
            .retain(|name| index.contains(name));
        resolve_calls(&mut function.inner_functions, index);
    }
}

/// Resolve every file of a batch against the batch's own definitions
///
/// Returns the index that was used.
pub fn resolve_batch(files: &mut [FileFunctions]) -> FunctionIndex {
    let index = FunctionIndex::from_files(files);
    for file in files.iter_mut() {
        resolve_calls(&mut file.functions, &index);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn file(path: &str, src: &str) -> FileFunctions {
        FileFunctions {
            path: path.to_string(),
            language: Language::TypeScript,
            functions: crate::analyze(src),
            diagnostics: Vec::new(),
        }
    }

    fn calls(f: &FunctionRecord) -> Vec<&str> {
        f.called_functions.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_index_contains_named_functions_at_every_depth() {
        let files = vec![file(
            "a.ts",
            "function outer() { function helper() {} const x = () => {}; }",
        )];
        let index = FunctionIndex::from_files(&files);
        assert!(index.contains("outer"));
        assert!(index.contains("helper"));
        assert!(!index.contains("anonymous"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_lookup_returns_every_definition() {
        let files = vec![
            file("a.ts", "function run() {}"),
            file("b.ts", "\n\nfunction run() {}"),
        ];
        let index = FunctionIndex::from_files(&files);
        let sites = index.lookup("run");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].path, "a.ts");
        assert_eq!(sites[1].path, "b.ts");
        assert_eq!(sites[1].line_range.start, 3);
        assert!(index.lookup("missing").is_empty());
    }

    #[test]
    fn test_resolve_drops_unknown_names_recursively() {
        let mut files = vec![
            file(
                "api.ts",
                r#"
function handler() {
  authenticate(() => {
    findOrder();
    connectToDatabase();
  });
}
"#,
            ),
            file("service.ts", "export function findOrder() {}"),
        ];
        let index = resolve_batch(&mut files);
        assert!(index.contains("findOrder"));

        let handler = &files[0].functions[0];
        assert_eq!(calls(handler), vec!["findOrder"]);
        assert_eq!(calls(&handler.inner_functions[0]), vec!["findOrder"]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut functions = crate::analyze("function a() { b(); c(); }\nfunction b() { a(); }");
        let index = {
            let mut index = FunctionIndex::new();
            index.insert_records("x.ts", &functions);
            index
        };

        resolve_calls(&mut functions, &index);
        let once = functions.clone();
        resolve_calls(&mut functions, &index);
        assert_eq!(functions, once);
        assert_eq!(calls(&functions[0]), vec!["b"]);
        assert_eq!(calls(&functions[1]), vec!["a"]);
    }

    #[test]
    fn test_resolve_with_empty_index_clears_calls() {
        let mut functions = crate::analyze("function a() { b(); }");
        resolve_calls(&mut functions, &FunctionIndex::new());
        assert!(functions[0].called_functions.is_empty());
    }
}
