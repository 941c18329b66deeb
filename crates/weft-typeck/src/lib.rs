//! Weft type checker: type inference for a data-plane language.
//!
//! This crate assigns a canonical type to every declaration and expression
//! of a resolved Weft program, verifies the language's semantic rules, and
//! rewrites the tree to make inferred information explicit (narrowed
//! integer literals, implicit casts).
//!
//! # Architecture
//!
//! - [`ty`]: semantic type representation
//! - [`typemap`]: the type registry (node → type, capability bits, interning)
//! - [`subst`]: type-variable substitutions and constant narrowing
//! - [`unify`]: equality constraints and the unifier
//! - [`canon`]: canonicalization, specialization, fresh-variable cloning
//! - [`infer`]: the post-order inference traversal
//! - [`builtins`]: synthesized built-in member types
//! - [`syntactic`]: syntactic equivalence (default-action checking)
//! - [`apply`]: optional re-attachment of types to cloned expressions
//! - [`error`] / [`diagnostics`]: diagnostic model and rendering

pub mod apply;
pub mod builtins;
pub mod canon;
pub mod diagnostics;
pub mod error;
pub mod infer;
pub mod subst;
pub mod syntactic;
pub mod ty;
pub mod typemap;
pub mod unify;

use rustc_hash::FxHashSet;
use weft_ast::ast::{NodeId, Program};
use weft_ast::refmap::ReferenceMap;
use weft_ast::walk::{self, Visit};

use crate::diagnostics::DiagnosticOptions;
use crate::error::{Diagnostic, Reporter, Severity};
use crate::infer::TypeInference;
use crate::typemap::TypeMap;

/// Configuration of the checking pipeline.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Assert that the traversal leaves the tree untouched. Used when
    /// re-checking an already-typed program.
    pub read_only: bool,
    /// After inference, re-clone expressions and re-attach their types
    /// (see [`apply::apply_types`]). The caller re-resolves names
    /// afterwards.
    pub update_expressions: bool,
}

/// The result of type checking a Weft program.
pub struct TypeckResult {
    /// The (possibly rewritten) program.
    pub program: Program,
    /// The populated type registry, consumed by downstream passes.
    pub typemap: TypeMap,
    /// Errors and warnings, in report order.
    pub diagnostics: Vec<Diagnostic>,
    errors: usize,
}

impl TypeckResult {
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Render every diagnostic as a formatted report string.
    pub fn render_diagnostics(
        &self,
        source: &str,
        filename: &str,
        options: &DiagnosticOptions,
    ) -> Vec<String> {
        diagnostics::render_all(&self.diagnostics, source, filename, options)
    }
}

/// Type-check a resolved program with a fresh registry.
pub fn check(program: Program, refmap: &ReferenceMap, options: &Options) -> TypeckResult {
    check_with(TypeMap::new(), program, refmap, options)
}

/// Type-check a resolved program against an existing registry. Nodes the
/// registry already covers are skipped, so feeding a previous run's output
/// back in is a no-op.
pub fn check_with(
    mut typemap: TypeMap,
    program: Program,
    refmap: &ReferenceMap,
    options: &Options,
) -> TypeckResult {
    let mut reporter = Reporter::new();
    let snapshot = options.read_only.then(|| program.clone());

    let mut inference = TypeInference::new(refmap, &mut typemap, &mut reporter);
    let mut program = inference.run(program);

    if let Some(original) = snapshot {
        assert!(
            program == original,
            "type inference mutated the tree in read-only mode"
        );
    }

    // Garbage-collect registry entries for nodes the rewrite dropped.
    struct Live(FxHashSet<NodeId>);
    impl Visit for Live {
        fn node(&mut self, id: NodeId) {
            self.0.insert(id);
        }
    }
    let mut live = Live(FxHashSet::default());
    walk::walk_program(&program, &mut live);
    typemap.update_map(&live.0);

    if options.update_expressions && !reporter.has_errors() {
        program = apply::apply_types(&mut typemap, program);
    }

    let errors = reporter.error_count();
    TypeckResult { program, typemap, diagnostics: reporter.into_diagnostics(), errors }
}
