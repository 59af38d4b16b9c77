//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::ast::FunctionRecord;
use crate::batch::FileFunctions;
use crate::parser::DiagnosticKind;
use std::fmt::Write;

/// Widest return type shown in text output before truncation
const MAX_TYPE_WIDTH: usize = 60;

/// Total function records at every nesting depth
pub fn count_functions(files: &[FileFunctions]) -> usize {
    files.iter().map(FileFunctions::function_count).sum()
}

/// Render results as an indented text tree
///
/// ```text
/// src/api.ts (TypeScript)
///   handler(req: Request): Promise<void>  [L3-L12]
///     calls: authenticate, findOrder
///     anonymous(user: User): void  [L4-L11]
/// ```
pub fn render_text(files: &[FileFunctions]) -> String {
    let mut output = String::new();

    for file in files {
        let _ = writeln!(output, "{} ({})", file.path, file.language);
        for diagnostic in &file.diagnostics {
            let label = match diagnostic.kind {
                DiagnosticKind::UnparsableInput => "unparsable",
                DiagnosticKind::MalformedRegion => "malformed",
            };
            let _ = writeln!(
                output,
                "  ! {} at L{}: {}",
                label, diagnostic.span.start_line, diagnostic.message
            );
        }
        if file.functions.is_empty() {
            output.push_str("  (no functions)\n");
        }
        for function in &file.functions {
            function.walk(&mut |record, depth| render_record(&mut output, record, depth + 1));
        }
    }

    output
}

fn render_record(output: &mut String, record: &FunctionRecord, depth: usize) {
    let indent = "  ".repeat(depth);
    let params = record
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect::<Vec<_>>()
        .join(", ");

    let _ = writeln!(
        output,
        "{}{}({}): {}  [L{}-L{}]",
        indent,
        record.name,
        params,
        truncate(&record.return_type, MAX_TYPE_WIDTH),
        record.line_range.start,
        record.line_range.end
    );

    if !record.called_functions.is_empty() {
        let calls = record
            .called_functions
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(output, "{}  calls: {}", indent, calls);
    }
}

/// Render results as JSON output
pub fn render_json(files: &[FileFunctions]) -> String {
    serde_json::to_string_pretty(files).unwrap_or_else(|_| "[]".to_string())
}

/// Truncate to `width` characters, marking the cut with `...`
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
