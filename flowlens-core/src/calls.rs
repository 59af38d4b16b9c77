//! Call-site scanning
//!
//! Collects the names of functions invoked directly by a bare identifier
//! anywhere below a node. Nested function bodies are scanned as well, so a
//! call made inside a callback is visible from every enclosing function.
//!
//! Counted:
//! - `foo()`, `foo<T>()`, `foo?.()`
//!
//! Not counted:
//! - Member calls (`obj.foo()`, `obj["foo"]()`)
//! - Parenthesized or computed callees (`(foo)()`, `getFn()()` for the outer call)
//! - `super(...)`, dynamic `import(...)`, `new Foo()`
//! - Tagged templates (`` sql`...` ``)

use std::collections::BTreeSet;
use tree_sitter::Node;

/// Names of bare-identifier call targets in the subtree rooted at `node`
///
/// `source` must be the text the node was parsed from.
pub fn scan_calls(node: Node<'_>, source: &str) -> BTreeSet<String> {
    let mut calls = BTreeSet::new();

    // Iterative pre-order walk; the cursor cannot leave the subtree it starts on.
    let mut cursor = node.walk();
    loop {
        if let Some(name) = direct_callee(cursor.node(), source) {
            if !calls.contains(name) {
                calls.insert(name.to_string());
            }
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return calls;
            }
        }
    }
}

/// Callee name if `node` is a call expression whose callee is a bare identifier
fn direct_callee<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    if node.kind() != "call_expression" {
        return None;
    }
    if is_tagged_template(node) {
        return None;
    }

    let callee = node.child_by_field_name("function")?;
    if callee.kind() != "identifier" {
        return None;
    }

    source
        .get(callee.start_byte()..callee.end_byte())
        .filter(|name| !name.is_empty())
}

fn is_tagged_template(call: Node<'_>) -> bool {
    call.child_by_field_name("arguments")
        .is_some_and(|args| args.kind() == "template_string")
}
