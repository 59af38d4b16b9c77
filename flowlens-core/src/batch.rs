//! Batch analysis of in-memory source units
//!
//! Global invariants enforced:
//! - Output order matches input order
//! - Units are analyzed independently; no state is shared between them

use crate::ast::FunctionRecord;
use crate::language::Language;
use crate::parser::Diagnostic;
use crate::resolve;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default cap on the size of a file loaded from disk (1 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// A source unit to analyze: where it came from and its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub path: String,
    pub content: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        SourceUnit {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Language implied by the unit's path, if recognized
    pub fn language(&self) -> Option<Language> {
        Language::from_path(Path::new(&self.path))
    }
}

/// Function inventory of one source unit
#[derive(Debug, Clone, Serialize)]
pub struct FileFunctions {
    pub path: String,
    pub language: Language,
    pub functions: Vec<FunctionRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileFunctions {
    /// Number of records at every depth
    pub fn function_count(&self) -> usize {
        self.functions.iter().map(FunctionRecord::count).sum()
    }
}

/// Options for [`analyze_batch_with`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Language for units whose path has no recognized extension
    pub default_language: Language,
    /// Narrow call targets to functions defined in the batch
    pub resolve_calls: bool,
}

/// Analyze one unit
pub fn analyze_unit(unit: &SourceUnit, default_language: Language) -> FileFunctions {
    let language = unit.language().unwrap_or(default_language);
    let analysis = crate::analyze_detailed(&unit.content, language);
    debug!(
        path = %unit.path,
        language = language.name(),
        functions = analysis.functions.len(),
        diagnostics = analysis.diagnostics.len(),
        "analyzed unit"
    );
    FileFunctions {
        path: unit.path.clone(),
        language,
        functions: analysis.functions,
        diagnostics: analysis.diagnostics,
    }
}

/// Analyze every unit with default options, preserving input order
pub fn analyze_batch(units: &[SourceUnit]) -> Vec<FileFunctions> {
    analyze_batch_with(units, &BatchOptions::default(), |_| {})
}

/// Analyze every unit in parallel, preserving input order
///
/// `on_file` is called once per finished unit, from worker threads, in no
/// particular order.
pub fn analyze_batch_with<F>(
    units: &[SourceUnit],
    options: &BatchOptions,
    on_file: F,
) -> Vec<FileFunctions>
where
    F: Fn(&FileFunctions) + Sync,
{
    let mut files: Vec<FileFunctions> = units
        .par_iter()
        .map(|unit| {
            let file = analyze_unit(unit, options.default_language);
            on_file(&file);
            file
        })
        .collect();

    if options.resolve_calls {
        let index = resolve::resolve_batch(&mut files);
        debug!(names = index.len(), "resolved call targets against batch");
    }

    files
}

/// Units read from disk, and how many files had to be skipped
#[derive(Debug, Default)]
pub struct LoadedUnits {
    pub units: Vec<SourceUnit>,
    pub skipped: usize,
}

/// Read source files into units
///
/// Unit paths are made relative to `root` when possible and always use `/`
/// separators. Files that cannot be read, are not UTF-8, or exceed
/// `max_file_size` bytes are skipped with a warning.
pub fn load_units(paths: &[PathBuf], root: Option<&Path>, max_file_size: u64) -> LoadedUnits {
    let mut loaded = LoadedUnits::default();
    for path in paths {
        match read_unit(path, root, max_file_size) {
            Ok(unit) => loaded.units.push(unit),
            Err(e) => {
                warn!("skipping file {}: {:#}", path.display(), e);
                loaded.skipped += 1;
            }
        }
    }
    loaded
}

fn read_unit(path: &Path, root: Option<&Path>, max_file_size: u64) -> anyhow::Result<SourceUnit> {
    use anyhow::Context;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    if metadata.len() > max_file_size {
        anyhow::bail!(
            "file is {} bytes, larger than the {} byte limit",
            metadata.len(),
            max_file_size
        );
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let content = String::from_utf8(bytes).context("file is not valid UTF-8")?;

    Ok(SourceUnit::new(display_path(path, root), content))
}

/// Path relative to `root` (when it is a prefix) with forward slashes
pub fn display_path(path: &Path, root: Option<&Path>) -> String {
    let relative = root
        .and_then(|root| path.strip_prefix(root).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_batch_preserves_input_order() {
        let units: Vec<SourceUnit> = (0..32)
            .map(|i| SourceUnit::new(format!("f{}.ts", i), format!("function fn{}() {{}}", i)))
            .collect();
        let files = analyze_batch(&units);
        assert_eq!(files.len(), 32);
        for (i, file) in files.iter().enumerate() {
            assert_eq!(file.path, format!("f{}.ts", i));
            assert_eq!(file.functions[0].name, format!("fn{}", i));
        }
    }

    #[test]
    fn test_language_comes_from_path() {
        let units = vec![
            SourceUnit::new("a.tsx", "const A = () => <div />;"),
            SourceUnit::new("b.js", "function b() {}"),
            SourceUnit::new("no_extension", "function c(x: number) {}"),
        ];
        let files = analyze_batch(&units);
        assert_eq!(files[0].language, Language::TypeScriptReact);
        assert_eq!(files[1].language, Language::JavaScript);
        assert_eq!(files[2].language, Language::TypeScript);
        assert_eq!(files[2].functions[0].parameters[0].ty, "number");
        assert!(files[0].diagnostics.is_empty());
    }

    #[test]
    fn test_default_language_option() {
        let units = vec![SourceUnit::new("snippet", "const a = () => <b />;")];
        let options = BatchOptions {
            default_language: Language::JavaScriptReact,
            resolve_calls: false,
        };
        let files = analyze_batch_with(&units, &options, |_| {});
        assert_eq!(files[0].language, Language::JavaScriptReact);
        assert!(files[0].diagnostics.is_empty());
    }

    #[test]
    fn test_unparsable_unit_yields_empty_result() {
        let units = vec![
            SourceUnit::new("empty.ts", ""),
            SourceUnit::new("ok.ts", "function ok() {}"),
        ];
        let files = analyze_batch(&units);
        assert!(files[0].functions.is_empty());
        assert_eq!(files[0].diagnostics.len(), 1);
        assert_eq!(files[1].function_count(), 1);
    }

    #[test]
    fn test_resolve_option_narrows_calls() {
        let units = vec![
            SourceUnit::new("a.ts", "function a() { b(); external(); }"),
            SourceUnit::new("b.ts", "function b() {}"),
        ];
        let options = BatchOptions {
            resolve_calls: true,
            ..BatchOptions::default()
        };
        let files = analyze_batch_with(&units, &options, |_| {});
        let calls: Vec<&str> = files[0].functions[0]
            .called_functions
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(calls, vec!["b"]);
    }

    #[test]
    fn test_progress_callback_runs_once_per_unit() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let units: Vec<SourceUnit> = (0..10)
            .map(|i| SourceUnit::new(format!("f{}.ts", i), "function f() {}"))
            .collect();
        let seen = AtomicUsize::new(0);
        analyze_batch_with(&units, &BatchOptions::default(), |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(seen.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_load_units_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.ts");
        let big = dir.path().join("big.ts");
        let binary = dir.path().join("binary.ts");
        let missing = dir.path().join("missing.ts");
        fs::write(&good, "function good() {}").unwrap();
        fs::write(&big, "x".repeat(64)).unwrap();
        fs::write(&binary, [0xff_u8, 0xfe, 0x00, 0x01]).unwrap();

        let loaded = load_units(&[good, big, binary, missing], Some(dir.path()), 32);
        assert_eq!(loaded.units.len(), 1);
        assert_eq!(loaded.units[0].path, "good.ts");
        assert_eq!(loaded.skipped, 3);
    }

    #[test]
    fn test_display_path() {
        let root = Path::new("/repo");
        assert_eq!(
            display_path(Path::new("/repo/src/api.ts"), Some(root)),
            "src/api.ts"
        );
        assert_eq!(
            display_path(Path::new("/elsewhere/a.ts"), Some(root)),
            "/elsewhere/a.ts"
        );
        assert_eq!(display_path(Path::new("/repo"), Some(root)), "/repo");
        assert_eq!(display_path(Path::new("a.ts"), None), "a.ts");
    }
}
