//! Error-tolerant syntax tree builder backed by tree-sitter
//!
//! Global invariants enforced:
//! - Building a tree never fails; unusable input yields an empty tree
//! - Local syntax errors are recorded as diagnostics, never propagated
//! - Node offsets always index into the borrowed source text

use crate::ast::FunctionKind;
use crate::language::{Language, LineIndex, SourceSpan};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

/// Category of a parse problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No usable tree could be built (empty, binary, or rejected input)
    UnparsableInput,
    /// A local syntax error the parser recovered from
    MalformedRegion,
}

/// A parse problem observed while building the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: SourceSpan,
    pub message: String,
}

/// Parsed source unit
///
/// Owns the tree-sitter tree (if any) and the line index of the unit, and
/// borrows the source text so that node text can be sliced without copying.
pub struct SyntaxTree<'src> {
    source: &'src str,
    language: Language,
    tree: Option<Tree>,
    lines: LineIndex,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> SyntaxTree<'src> {
    /// Parse `source` with the grammar for `language`
    pub fn parse(source: &'src str, language: Language) -> Self {
        let lines = LineIndex::new(source);
        let mut diagnostics = Vec::new();

        let tree = if source.trim().is_empty() {
            diagnostics.push(unparsable(&lines, source, "empty input"));
            None
        } else if source.contains('\0') {
            diagnostics.push(unparsable(&lines, source, "binary input"));
            None
        } else {
            match build_tree(source, language) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    diagnostics.push(unparsable(&lines, source, &format!("{:#}", e)));
                    None
                }
            }
        };

        if let Some(ref tree) = tree {
            collect_malformed_regions(tree.root_node(), &lines, &mut diagnostics);
        }

        for diagnostic in &diagnostics {
            debug!(
                kind = ?diagnostic.kind,
                line = diagnostic.span.start_line,
                "{}",
                diagnostic.message
            );
        }

        SyntaxTree {
            source,
            language,
            tree,
            lines,
            diagnostics,
        }
    }

    /// Root node, or `None` for an empty tree
    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(Tree::root_node)
    }

    /// Whether no usable tree was built
    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    /// Whether the parser had to recover from syntax errors
    pub fn has_errors(&self) -> bool {
        self.root().is_some_and(|root| root.has_error())
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the tree, keeping only its diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Literal source text of `node`
    pub fn text(&self, node: Node<'_>) -> &'src str {
        self.slice(node.start_byte(), node.end_byte())
    }

    /// Literal source text between two byte offsets
    ///
    /// Returns an empty string for ranges that are out of bounds or do not
    /// fall on character boundaries.
    pub fn slice(&self, start: usize, end: usize) -> &'src str {
        self.source.get(start..end).unwrap_or("")
    }

    /// 1-based line and 0-based column of a byte offset
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        self.lines.line_col(offset)
    }

    /// Span of `node` with line information
    pub fn span(&self, node: Node<'_>) -> SourceSpan {
        self.lines.span(node.start_byte(), node.end_byte())
    }
}

fn build_tree(source: &str, language: Language) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.grammar())
        .with_context(|| format!("Failed to set {} grammar", language))?;
    parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("Parser produced no tree for {} input", language))
}

fn unparsable(lines: &LineIndex, source: &str, message: &str) -> Diagnostic {
    Diagnostic {
        kind: DiagnosticKind::UnparsableInput,
        span: lines.span(0, source.len()),
        message: message.to_string(),
    }
}

/// Record the outermost ERROR and MISSING nodes below `node`
fn collect_malformed_regions(node: Node<'_>, lines: &LineIndex, out: &mut Vec<Diagnostic>) {
    if node.is_error() {
        out.push(Diagnostic {
            kind: DiagnosticKind::MalformedRegion,
            span: lines.span(node.start_byte(), node.end_byte()),
            message: "unexpected syntax".to_string(),
        });
        return;
    }
    if node.is_missing() {
        out.push(Diagnostic {
            kind: DiagnosticKind::MalformedRegion,
            span: lines.span(node.start_byte(), node.end_byte()),
            message: format!("missing `{}`", node.kind()),
        });
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_malformed_regions(child, lines, out);
    }
}

/// First direct child of `node` with the given kind
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|child| child.kind() == kind);
    result
}

/// Function kind of `node`; anonymous tokens such as the `function` keyword never match
pub fn function_kind(node: Node<'_>) -> Option<FunctionKind> {
    if !node.is_named() {
        return None;
    }
    FunctionKind::from_node_kind(node.kind())
}

/// First function-like node in pre-order below (and including) `node`
pub fn find_first_function(node: Node<'_>) -> Option<Node<'_>> {
    if function_kind(node).is_some() {
        return Some(node);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_first_function(child) {
            return Some(found);
        }
    }

    None
}
