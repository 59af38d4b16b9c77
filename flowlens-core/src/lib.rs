//! Flowlens core library - function inventory for TypeScript and JavaScript
//!
//! For every function-like construct in a source unit, Flowlens records its
//! name, parameters, return type, line range, exact source text, the
//! functions nested inside it, and the functions it calls by name.

// Global invariants enforced in this crate:
// - Analysis of one unit never depends on another unit
// - No global mutable state
// - Deterministic traversal order must be explicit
// - Syntax errors degrade results, they never abort analysis
// - Identical input yields byte-for-byte identical output

pub mod ast;
pub mod batch;
pub mod calls;
pub mod config;
pub mod discover;
pub mod language;
pub mod parser;
pub mod report;
pub mod resolve;

pub use ast::{FunctionRecord, LineRange, Parameter};
pub use batch::{analyze_batch, analyze_batch_with, BatchOptions, FileFunctions, SourceUnit};
pub use config::ResolvedConfig;
pub use language::Language;
pub use parser::{Diagnostic, DiagnosticKind, SyntaxTree};
pub use report::{render_json, render_text};
pub use resolve::{resolve_calls, FunctionIndex};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Function records of one unit together with its parse diagnostics
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub functions: Vec<FunctionRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Analyze TypeScript source text
///
/// Never fails: unparsable input yields an empty list and syntax errors
/// yield the records that could still be recovered.
pub fn analyze(source: &str) -> Vec<FunctionRecord> {
    analyze_with_language(source, Language::TypeScript)
}

/// Analyze source text with the grammar for `language`
pub fn analyze_with_language(source: &str, language: Language) -> Vec<FunctionRecord> {
    analyze_detailed(source, language).functions
}

/// Analyze source text, keeping the parse diagnostics
pub fn analyze_detailed(source: &str, language: Language) -> Analysis {
    let tree = SyntaxTree::parse(source, language);
    let functions = discover::extract_functions(&tree);
    Analysis {
        functions,
        diagnostics: tree.into_diagnostics(),
    }
}

/// Analyze every supported file at `path` (a file or a directory)
///
/// Reported paths are relative to `path` when it is a directory and always
/// use `/` separators. Files are returned in sorted path order.
pub fn analyze_path(path: &Path, config: &ResolvedConfig) -> Result<Vec<FileFunctions>> {
    analyze_path_with(path, config, |_| {})
}

/// [`analyze_path`] with a callback invoked once per finished file
pub fn analyze_path_with<F>(
    path: &Path,
    config: &ResolvedConfig,
    on_file: F,
) -> Result<Vec<FileFunctions>>
where
    F: Fn(&FileFunctions) + Sync,
{
    let units = load_path(path, config)?;
    let options = BatchOptions {
        default_language: config.default_language,
        resolve_calls: config.resolve_calls,
    };
    Ok(analyze_batch_with(&units, &options, on_file))
}

/// Collect, filter and read the source files at `path`
///
/// Include/exclude patterns are matched against paths relative to
/// `config.project_root` when `path` lies inside it, otherwise relative to
/// `path` itself.
pub fn load_path(path: &Path, config: &ResolvedConfig) -> Result<Vec<SourceUnit>> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }
    let root = path.is_dir().then_some(path);
    let pattern_root = config
        .project_root
        .as_deref()
        .filter(|project_root| path.starts_with(project_root))
        .or(root);

    let files: Vec<PathBuf> = collect_source_files(path)?
        .into_iter()
        .filter(|file| {
            let relative = batch::display_path(file, pattern_root);
            config.should_include(Path::new(&relative))
        })
        .collect();
    debug!(files = files.len(), root = %path.display(), "collected source files");

    let loaded = batch::load_units(&files, root, config.max_file_size);
    if loaded.skipped > 0 {
        warn!("Skipped {} file(s) that could not be read", loaded.skipped);
    }
    Ok(loaded.units)
}

/// Check if a file is a supported source file
fn is_supported_source_file(filename: &str) -> bool {
    // Skip TypeScript declaration files (.d.ts)
    if filename.ends_with(".d.ts") {
        return false;
    }

    Language::from_path(Path::new(filename)).is_some()
}

/// Collect all supported source files from a path (file or directory)
///
/// Supported languages and extensions:
/// - TypeScript: .ts, .mts, .cts (excludes .d.ts declaration files)
/// - TSX: .tsx, .mtsx, .ctsx
/// - JavaScript: .js, .mjs, .cjs
/// - JSX: .jsx, .mjsx, .cjsx
pub fn collect_source_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            if is_supported_source_file(filename) {
                files.push(path.to_path_buf());
            }
        }
    } else if path.is_dir() {
        collect_source_files_recursive(path, &mut files)?;
    }

    // Sort files for deterministic order
    files.sort();

    Ok(files)
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.')
        || name == "node_modules"
        || name == "dist"
        || name == "build"
        || name == "out"
        || name == "coverage"
        || name == "target"
}

/// Process one directory entry, pushing source files or recursing into dirs
fn process_dir_entry(path: PathBuf, metadata: std::fs::Metadata, files: &mut Vec<PathBuf>) -> Result<()> {
    use std::ffi::OsStr;

    if metadata.is_symlink() {
        return Ok(());
    }

    if metadata.is_dir() {
        if let Some(name) = path.file_name().and_then(|n: &OsStr| n.to_str()) {
            if is_skipped_dir(name) {
                return Ok(());
            }
        }
        collect_source_files_recursive(&path, files)?;
    } else if metadata.is_file() {
        if let Some(filename) = path.file_name().and_then(|n: &OsStr| n.to_str()) {
            if is_supported_source_file(filename) {
                files.push(path);
            }
        }
    }

    Ok(())
}

/// Recursively collect supported source files from a directory
fn collect_source_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry_result in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        process_dir_entry(path, metadata, files)?;
    }

    Ok(())
}
