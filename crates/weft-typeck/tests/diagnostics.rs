//! Rendering tests for checker diagnostics.

mod common;

use common::*;
use weft_ast::span::Span;
use weft_typeck::diagnostics::{render_diagnostic, DiagnosticOptions};
use weft_typeck::error::{Diagnostic, ErrorCategory, Severity};

#[test]
fn mismatch_reports_carry_their_code_and_message() {
    let body = block(vec![
        decl_stmt(var_d("a", bit(8), None)),
        decl_stmt(var_d("b", bit(16), None)),
        assign(path("a"), path("b")),
    ]);
    let c = control("c", vec![], vec![], body);
    let result = check_program(vec![c]);
    assert!(result.has_errors());

    let rendered = result.render_diagnostics(
        "control c() { bit<8> a; bit<16> b; a = b; }",
        "test.weft",
        &DiagnosticOptions::colorless(),
    );
    assert!(!rendered.is_empty());
    assert!(
        rendered.iter().any(|r| r.contains("E0001") && r.contains("cannot unify")),
        "got: {rendered:#?}"
    );
}

#[test]
fn warnings_render_with_a_warning_code() {
    let k = const_d(
        "k",
        bit(8),
        bin(weft_ast::ast::BinaryOp::Shl, wcst(8, 1), cst(9)),
    );
    let result = check_program(vec![k]);
    assert!(!result.has_errors());

    let rendered = result.render_diagnostics(
        "const bit<8> k = 8w1 << 9;",
        "test.weft",
        &DiagnosticOptions::colorless(),
    );
    assert!(
        rendered.iter().any(|r| r.contains("W0001") && r.contains("shifting")),
        "got: {rendered:#?}"
    );
}

#[test]
fn labels_point_at_the_reported_span() {
    let source = "bit<8> x = y;";
    let diagnostic = Diagnostic {
        severity: Severity::Error,
        category: Some(ErrorCategory::Capability),
        message: "expression cannot be the target of an assignment".into(),
        span: Span::new(11, 12),
    };
    let rendered = render_diagnostic(
        &diagnostic,
        source,
        "test.weft",
        &DiagnosticOptions::colorless(),
    );
    assert!(rendered.contains("E0003"), "got: {rendered}");
    assert!(
        rendered.contains("cannot be the target of an assignment"),
        "got: {rendered}"
    );
}
