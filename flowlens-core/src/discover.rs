//! Function discovery and record assembly
//!
//! Global invariants enforced:
//! - Pre-order traversal; records appear in source order at every level
//! - A function found inside another function's subtree is attached to the
//!   nearest enclosing function, never to the top-level list
//! - Only roots of the containment forest are returned
//!
//! Function-like constructs:
//! - Function declarations (including generators)
//! - Function expressions (including generators)
//! - Arrow functions
//!
//! Methods, class members, overload signatures and ambient declarations are
//! not records; traversal passes through them, so functions nested inside a
//! method body become top-level roots.

use crate::ast::{
    FunctionKind, FunctionRecord, LineRange, Parameter, ANONYMOUS, NO_RETURN_TYPE,
};
use crate::calls::scan_calls;
use crate::parser::{function_kind, SyntaxTree};
use tree_sitter::Node;

/// Extract the containment forest of function records from a parsed unit
///
/// An empty tree yields an empty list.
pub fn extract_functions(tree: &SyntaxTree<'_>) -> Vec<FunctionRecord> {
    let Some(root) = tree.root() else {
        return Vec::new();
    };

    let mut roots = Vec::new();
    // Records whose subtree is still being walked, innermost last
    let mut open: Vec<FunctionRecord> = Vec::new();

    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        let entered = function_kind(node);
        if let Some(kind) = entered {
            open.push(build_record(node, kind, tree));
        }

        if cursor.goto_first_child() {
            continue;
        }
        if entered.is_some() {
            close_innermost(&mut open, &mut roots);
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return roots;
            }
            if function_kind(cursor.node()).is_some() {
                close_innermost(&mut open, &mut roots);
            }
        }
    }
}

/// Attach the innermost open record to its enclosing record (or the roots)
fn close_innermost(open: &mut Vec<FunctionRecord>, roots: &mut Vec<FunctionRecord>) {
    if let Some(record) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.inner_functions.push(record),
            None => roots.push(record),
        }
    }
}

/// Build the record for one function-like node; `inner_functions` starts empty
fn build_record(node: Node<'_>, kind: FunctionKind, tree: &SyntaxTree<'_>) -> FunctionRecord {
    let exported = is_export_payload(node, kind);
    // `export default function name() {}` declares `name` whichever way the grammar parsed it
    let kind = if exported {
        FunctionKind::Declaration
    } else {
        kind
    };
    let start = if exported {
        node.parent().map_or(node.start_byte(), |parent| parent.start_byte())
    } else {
        node.start_byte()
    };
    let end = node.end_byte();
    let span = tree.lines().span(start, end);

    FunctionRecord {
        name: function_name(node, kind, tree),
        parameters: extract_parameters(node, tree),
        return_type: node
            .child_by_field_name("return_type")
            .and_then(|ann| annotation_text(ann, tree))
            .unwrap_or_else(|| NO_RETURN_TYPE.to_string()),
        line_range: LineRange::new(span.start_line, span.end_line),
        source_text: tree.slice(start, end).to_string(),
        inner_functions: Vec::new(),
        called_functions: scan_calls(node, tree.source()),
    }
}

/// Whether `node` is the declaration or default value of an `export` statement
///
/// The `export` / `export default` keywords then belong to the function's header.
fn is_export_payload(node: Node<'_>, kind: FunctionKind) -> bool {
    kind != FunctionKind::Arrow
        && node
            .parent()
            .is_some_and(|parent| parent.kind() == "export_statement")
}

fn function_name(node: Node<'_>, kind: FunctionKind, tree: &SyntaxTree<'_>) -> String {
    if !kind.carries_name() {
        return ANONYMOUS.to_string();
    }
    node.child_by_field_name("name")
        .map(|ident| tree.text(ident))
        .filter(|name| !name.is_empty())
        .map_or_else(|| ANONYMOUS.to_string(), str::to_string)
}

/// Parameters in declaration order
fn extract_parameters(node: Node<'_>, tree: &SyntaxTree<'_>) -> Vec<Parameter> {
    if let Some(params) = node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        let result = params
            .named_children(&mut cursor)
            .filter(|param| !param.is_extra() && param.kind() != "comment")
            .filter_map(|param| parameter(param, tree))
            .collect();
        return result;
    }

    // Arrow function with a single unparenthesized parameter: `x => x * 2`
    node.child_by_field_name("parameter")
        .map(|ident| vec![Parameter::new(tree.text(ident), None)])
        .unwrap_or_default()
}

fn parameter(param: Node<'_>, tree: &SyntaxTree<'_>) -> Option<Parameter> {
    let (name_node, ty) = match param.kind() {
        // TypeScript: `x`, `x?: T`, `...rest: T[]`, `{ a, b }: Props`, `x = 1`
        "required_parameter" | "optional_parameter" => (
            param.child_by_field_name("pattern").unwrap_or(param),
            param
                .child_by_field_name("type")
                .and_then(|ann| annotation_text(ann, tree)),
        ),
        // JavaScript: `x = 1`
        "assignment_pattern" => (param.child_by_field_name("left").unwrap_or(param), None),
        "ERROR" => return None,
        _ => (param, None),
    };

    let name = tree.text(name_node).trim();
    let name = name.strip_prefix("...").unwrap_or(name).trim_start();
    if name.is_empty() {
        return None;
    }
    Some(Parameter::new(name, ty))
}

/// Text of a `: T` annotation without the colon
fn annotation_text(annotation: Node<'_>, tree: &SyntaxTree<'_>) -> Option<String> {
    let text = tree.text(annotation).trim();
    let text = text.strip_prefix(':').unwrap_or(text).trim();
    (!text.is_empty()).then(|| text.to_string())
}
