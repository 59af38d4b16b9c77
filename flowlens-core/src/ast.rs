//! Function inventory data model
//!
//! Global invariants enforced:
//! - `line_range.start >= 1` and `line_range.end >= line_range.start`
//! - A child's line range lies inside its parent's line range
//! - Records are owned by exactly one parent (or by the top-level list)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name given to function-like constructs without a declared identifier
pub const ANONYMOUS: &str = "anonymous";

/// Type reported for a parameter without a type annotation
pub const UNTYPED: &str = "any";

/// Return type reported when no return type annotation is present
pub const NO_RETURN_TYPE: &str = "void";

/// Syntactic category of a function-like construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// `function name() {}` (including generators)
    Declaration,
    /// `function () {}` used as an expression (including generators)
    Expression,
    /// `() => {}` or `x => expr`
    Arrow,
}

impl FunctionKind {
    /// Classify a tree-sitter node kind
    ///
    /// Returns `None` for every node that is not a function-like construct.
    /// Methods, overload signatures and class members are not function records.
    pub fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "function_declaration" | "generator_function_declaration" => {
                Some(FunctionKind::Declaration)
            }
            "function_expression" | "generator_function" => {
                Some(FunctionKind::Expression)
            }
            "arrow_function" => Some(FunctionKind::Arrow),
            _ => None,
        }
    }

    /// Only declarations contribute their identifier as the record name
    pub fn carries_name(&self) -> bool {
        matches!(self, FunctionKind::Declaration)
    }
}

/// A declared parameter and its annotated type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Parameter {
    /// Create a parameter; a missing annotation becomes [`UNTYPED`]
    pub fn new(name: impl Into<String>, ty: Option<String>) -> Self {
        Parameter {
            name: name.into(),
            ty: ty.unwrap_or_else(|| UNTYPED.to_string()),
        }
    }
}

/// Inclusive, 1-based line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    /// Create a range, clamping so that `1 <= start <= end`
    pub fn new(start: u32, end: u32) -> Self {
        let start = start.max(1);
        LineRange {
            start,
            end: end.max(start),
        }
    }

    /// Check whether `other` lies within this range
    pub fn contains(&self, other: &LineRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Number of lines covered
    pub fn line_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// One function-like construct discovered in a source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub line_range: LineRange,
    pub source_text: String,
    pub inner_functions: Vec<FunctionRecord>,
    pub called_functions: BTreeSet<String>,
}

impl FunctionRecord {
    /// Whether this record carries the anonymous sentinel name
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS
    }

    /// Number of records in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self
            .inner_functions
            .iter()
            .map(FunctionRecord::count)
            .sum::<usize>()
    }

    /// Pre-order walk over this subtree; `depth` is 0 for `self`
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a FunctionRecord, usize)) {
        self.walk_at(0, f);
    }

    fn walk_at<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a FunctionRecord, usize)) {
        f(self, depth);
        for inner in &self.inner_functions {
            inner.walk_at(depth + 1, f);
        }
    }

    /// Whether `name` is a direct call target of this function
    pub fn calls(&self, name: &str) -> bool {
        self.called_functions.contains(name)
    }
}
