//! Ariadne-based rendering for checker diagnostics.
//!
//! Renders [`Diagnostic`] values into formatted, labeled reports. Output
//! can be made colorless for deterministic test assertions.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::error::{Diagnostic, ErrorCategory, Severity};

/// Options controlling rendered output.
#[derive(Debug, Clone)]
pub struct DiagnosticOptions {
    pub color: bool,
}

impl DiagnosticOptions {
    /// Colorless output for deterministic test assertions.
    pub fn colorless() -> Self {
        DiagnosticOptions { color: false }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: true }
    }
}

/// Assign a stable code to each diagnostic.
fn code(diagnostic: &Diagnostic) -> &'static str {
    if diagnostic.severity == Severity::Warning {
        return "W0001";
    }
    match diagnostic.category {
        Some(ErrorCategory::TypeMismatch) => "E0001",
        Some(ErrorCategory::Arity) => "E0002",
        Some(ErrorCategory::Capability) => "E0003",
        Some(ErrorCategory::Context) => "E0004",
        Some(ErrorCategory::Inference) | None => "E0005",
    }
}

/// Render a diagnostic into a formatted report string.
pub fn render_diagnostic(
    diagnostic: &Diagnostic,
    source: &str,
    _filename: &str,
    options: &DiagnosticOptions,
) -> String {
    let config = Config::default().with_color(options.color);
    let source_len = source.len();

    // Clamp the span into source bounds; ariadne wants a non-empty range.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };
    let span = clamp(diagnostic.span.start as usize..diagnostic.span.end as usize);

    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let label_color = match diagnostic.severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    };

    let report = Report::build(kind, span.clone())
        .with_code(code(diagnostic))
        .with_message(&diagnostic.message)
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(&diagnostic.message)
                .with_color(label_color),
        )
        .finish();

    let mut buf = Vec::new();
    let cache = Source::from(source);
    report.write(cache, &mut buf).expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

/// Render every diagnostic in order.
pub fn render_all(
    diagnostics: &[Diagnostic],
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> Vec<String> {
    diagnostics
        .iter()
        .map(|d| render_diagnostic(d, source, filename, options))
        .collect()
}
