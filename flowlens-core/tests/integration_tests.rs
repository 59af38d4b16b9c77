//! Integration tests for function discovery on fixture files

use flowlens_core::{analyze_detailed, analyze_with_language, DiagnosticKind, FunctionRecord, Language};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

fn analyze_fixture(name: &str) -> Vec<FunctionRecord> {
    let language = Language::from_path(&fixture_path(name)).unwrap();
    analyze_with_language(&load_fixture(name), language)
}

fn calls(record: &FunctionRecord) -> Vec<&str> {
    record.called_functions.iter().map(String::as_str).collect()
}

fn param_pairs(record: &FunctionRecord) -> Vec<(&str, &str)> {
    record
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.ty.as_str()))
        .collect()
}

#[test]
fn test_payments_handler_is_the_only_root() {
    let functions = analyze_fixture("api/payments.ts");
    assert_eq!(functions.len(), 1);

    let handler = &functions[0];
    assert_eq!(handler.name, "handler");
    assert_eq!(
        param_pairs(handler),
        vec![("req", "VercelRequest"), ("res", "VercelResponse")]
    );
    assert_eq!(handler.return_type, "void");
    assert_eq!(handler.line_range.start, 23);
    assert_eq!(handler.line_range.end, 74);
    assert!(handler
        .source_text
        .starts_with("export default async function handler"));
    assert!(handler.source_text.ends_with('}'));
}

#[test]
fn test_payments_handler_calls() {
    let functions = analyze_fixture("api/payments.ts");
    assert_eq!(
        calls(&functions[0]),
        vec![
            "authenticateToken",
            "connectToDatabase",
            "createPaymentRecord",
            "createStripePaymentIntent",
            "findOrder",
            "updateOrderStatus",
            "validatePaymentInput",
        ]
    );
}

#[test]
fn test_payments_callback_is_the_only_inner_function() {
    let functions = analyze_fixture("api/payments.ts");
    let handler = &functions[0];
    assert_eq!(handler.inner_functions.len(), 1);

    let callback = &handler.inner_functions[0];
    assert_eq!(callback.name, "anonymous");
    assert!(callback.parameters.is_empty());
    assert_eq!(callback.return_type, "void");
    assert!(callback.inner_functions.is_empty());
    assert_eq!(
        calls(callback),
        vec![
            "connectToDatabase",
            "createPaymentRecord",
            "createStripePaymentIntent",
            "findOrder",
            "updateOrderStatus",
            "validatePaymentInput",
        ]
    );
    assert!(handler.line_range.contains(&callback.line_range));
    assert!(callback.source_text.starts_with("async () =>"));
}

#[test]
fn test_imported_names_are_not_inner_functions() {
    let functions = analyze_fixture("api/payments.ts");
    let mut names = Vec::new();
    functions[0].walk(&mut |record, _| names.push(record.name.as_str()));
    for imported in [
        "validatePaymentInput",
        "findOrder",
        "createStripePaymentIntent",
        "updateOrderStatus",
        "createPaymentRecord",
    ] {
        assert!(!names.contains(&imported), "{} is only imported", imported);
    }
}

#[test]
fn test_service_module_functions() {
    let functions = analyze_fixture("services/orders.ts");
    let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "findOrder",
            "updateOrderStatus",
            "logTransition",
            "anonymous",
            "sum"
        ]
    );

    let find_order = &functions[0];
    assert_eq!(find_order.return_type, "Promise<Order | null>");
    assert_eq!(param_pairs(find_order), vec![("db", "Db"), ("orderId", "string")]);
    assert!(find_order.called_functions.is_empty());
    assert!(find_order.source_text.starts_with("export async function findOrder"));

    assert_eq!(calls(&functions[1]), vec!["logTransition"]);
    assert!(functions[2].called_functions.is_empty());

    // `sum` is passed as a value, never called
    let summarize = &functions[3];
    assert_eq!(summarize.return_type, "number");
    assert_eq!(summarize.inner_functions.len(), 1);
    assert!(summarize.called_functions.is_empty());
}

#[test]
fn test_nested_callback_chain() {
    let functions = analyze_fixture("services/pipeline.ts");
    assert_eq!(functions.len(), 2);

    let pipeline = &functions[0];
    assert_eq!(pipeline.name, "runPipeline");
    assert_eq!(
        param_pairs(pipeline),
        vec![("steps", "string[]"), ("done", "(ok: boolean) => void")]
    );
    assert_eq!(pipeline.count(), 4);
    assert_eq!(
        calls(pipeline),
        vec!["done", "execute", "loadSteps", "report", "schedule"]
    );

    let on_loaded = &pipeline.inner_functions[0];
    assert_eq!(on_loaded.name, "anonymous");
    assert_eq!(param_pairs(on_loaded), vec![("loaded", "any")]);

    let scheduled = &on_loaded.inner_functions[0];
    assert!(scheduled.parameters.is_empty());

    let on_result = &scheduled.inner_functions[0];
    assert_eq!(param_pairs(on_result), vec![("result", "boolean")]);
    assert_eq!(calls(on_result), vec!["done", "report"]);
    assert!(on_result.inner_functions.is_empty());

    let mut depths = Vec::new();
    pipeline.walk(&mut |record, depth| depths.push((depth, record.line_range.start)));
    assert_eq!(depths, vec![(0, 1), (1, 2), (2, 3), (3, 4)]);

    assert_eq!(functions[1].name, "loadSteps");
    assert_eq!(calls(&functions[1]), vec!["cb"]);
}

#[test]
fn test_malformed_file_degrades_gracefully() {
    let analysis = analyze_detailed(&load_fixture("legacy/broken.ts"), Language::TypeScript);
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::MalformedRegion));

    let before = analysis
        .functions
        .iter()
        .find(|f| f.name == "before")
        .expect("function before the error should survive");
    assert_eq!(before.line_range.start, 1);
    assert!(before.calls("double"));

    for root in &analysis.functions {
        root.walk(&mut |record, _| {
            assert!(record.line_range.start >= 1);
            assert!(record.line_range.end >= record.line_range.start);
        });
    }
}

#[test]
fn test_javascript_file() {
    let functions = analyze_fixture("web/widgets.js");
    assert_eq!(functions.len(), 2);

    let create = &functions[0];
    assert_eq!(create.name, "createWidget");
    assert_eq!(param_pairs(create), vec![("name", "any"), ("options", "any")]);
    assert_eq!(calls(create), vec!["build", "notify", "register"]);
    assert_eq!(create.inner_functions.len(), 1);
    assert_eq!(param_pairs(&create.inner_functions[0]), vec![("event", "any")]);

    let destroy = &functions[1];
    assert_eq!(destroy.name, "anonymous");
    assert_eq!(
        param_pairs(destroy),
        vec![("widget", "any"), ("handlers", "any")]
    );
    assert_eq!(calls(destroy), vec!["handler", "release"]);
}

#[test]
fn test_jsx_component() {
    let functions = analyze_fixture("web/Greeting.jsx");
    assert_eq!(functions.len(), 1);

    let greeting = &functions[0];
    assert_eq!(greeting.name, "Greeting");
    assert_eq!(param_pairs(greeting), vec![("{ name }", "any")]);
    assert_eq!(calls(greeting), vec!["formatName", "track"]);
    assert_eq!(greeting.line_range.start, 1);
    assert_eq!(greeting.line_range.end, 4);
    assert!(greeting.source_text.starts_with("export function Greeting"));
    assert_eq!(calls(&greeting.inner_functions[0]), vec!["track"]);
}

#[test]
fn test_source_text_matches_line_range() {
    let source = load_fixture("services/orders.ts");
    let lines: Vec<&str> = source.lines().collect();
    let functions = analyze_with_language(&source, Language::TypeScript);
    for root in &functions {
        root.walk(&mut |record, _| {
            let first = lines[record.line_range.start as usize - 1];
            let text_first = record.source_text.lines().next().unwrap();
            assert!(first.contains(text_first.trim()));
            assert_eq!(
                record.source_text.lines().count() as u32,
                record.line_range.line_count()
            );
        });
    }
}
