//! Diagnostic model and the checker's error sink.
//!
//! The checker reports at the nearest offending node and keeps going, so
//! one run can surface many diagnostics. Errors are counted; after a run
//! the caller inspects the count to decide whether to proceed to later
//! passes.

use std::fmt;

use weft_ast::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Coarse classification of a type error, one per failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Two types that should agree do not (assignment, operands, cases).
    TypeMismatch,
    /// Wrong number of arguments, type arguments, or tuple components; a
    /// non-generic type specialized.
    Arity,
    /// A required capability is missing: l-value, compile-time constant,
    /// direction or parameter-kind restrictions.
    Capability,
    /// A construct used in a context that forbids it.
    Context,
    /// The checker could not determine a type (unbound variable, unknown
    /// width, missing return type).
    Inference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Option<ErrorCategory>,
    pub message: String,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

/// Collects diagnostics for one checker run and counts errors.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_error(&mut self, span: Span, category: ErrorCategory, message: impl Into<String>) {
        self.errors += 1;
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: Some(category),
            message: message.into(),
            span,
        });
    }

    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: None,
            message: message.into(),
            span,
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
