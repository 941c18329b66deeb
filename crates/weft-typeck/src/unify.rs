//! Equality constraints and the unifier.
//!
//! A [`Constraints`] value is an ordered accumulator of constraints between
//! types; [`Constraints::solve`] unifies them and produces a
//! [`Substitution`], or `None` on contradiction. Callers add a plain
//! equality per assignment-like site, and a method-call constraint per call
//! site carrying per-argument capability information.

use log::trace;
use weft_ast::ast::Direction;
use weft_ast::span::Span;

use crate::error::{ErrorCategory, Reporter};
use crate::subst::{occurs, Substitution};
use crate::ty::{MethodType, Type, TypeVar};

/// Everything the unifier needs to know about one call argument.
#[derive(Debug, Clone)]
pub struct ArgInfo {
    pub ty: Type,
    pub is_left_value: bool,
    pub is_constant: bool,
    pub span: Span,
}

/// The shape of a call site: explicit type arguments, a fresh variable for
/// the (to be inferred) return type, and the argument descriptions.
#[derive(Debug, Clone)]
pub struct CallType {
    pub type_args: Vec<Type>,
    pub ret: TypeVar,
    pub args: Vec<ArgInfo>,
    pub span: Span,
}

#[derive(Debug, Clone)]
enum Constraint {
    Equality { dest: Type, src: Type },
    Call { method: Type, call: CallType },
}

/// An ordered accumulator of constraints.
#[derive(Debug, Default)]
pub struct Constraints {
    items: Vec<Constraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `src` to unify with `dest`.
    pub fn add_equality(&mut self, dest: Type, src: Type) {
        self.items.push(Constraint::Equality { dest, src });
    }

    /// Require `method` to accept the described call.
    pub fn add_call(&mut self, method: Type, call: CallType) {
        self.items.push(Constraint::Call { method, call });
    }

    /// Solve all constraints in order. On contradiction, reports a typed
    /// error at `span` when `report_errors` is set, and returns `None`
    /// either way (silent failure supports speculative unification).
    pub fn solve(self, span: Span, reporter: &mut Reporter, report_errors: bool) -> Option<Substitution> {
        let mut solver = Solver {
            subst: Substitution::new(),
            reporter,
            report: report_errors,
            span,
        };
        for constraint in self.items {
            let ok = match constraint {
                Constraint::Equality { dest, src } => solver.unify(&dest, &src),
                Constraint::Call { method, call } => solver.unify_call(&method, &call),
            };
            if !ok {
                return None;
            }
        }
        Some(solver.subst)
    }
}

struct Solver<'a> {
    subst: Substitution,
    reporter: &'a mut Reporter,
    report: bool,
    span: Span,
}

impl Solver<'_> {
    fn fail(&mut self, span: Span, category: ErrorCategory, message: String) -> bool {
        if self.report {
            self.reporter.type_error(span, category, message);
        }
        false
    }

    fn mismatch(&mut self, dest: &Type, src: &Type) -> bool {
        self.fail(
            self.span,
            ErrorCategory::TypeMismatch,
            format!("cannot unify {} with {}", src, dest),
        )
    }

    fn bind(&mut self, var: &TypeVar, ty: &Type) -> bool {
        if occurs(var.id, ty) {
            return self.fail(
                self.span,
                ErrorCategory::TypeMismatch,
                format!("cyclic type: {} occurs in {}", var.name, ty),
            );
        }
        trace!("binding {} to {}", var.name, ty);
        if self.subst.compose(var.id, ty.clone()) {
            true
        } else {
            self.mismatch(&Type::Var(var.clone()), ty)
        }
    }

    /// Unify two types, extending the substitution. Both sides are resolved
    /// through the current substitution first.
    fn unify(&mut self, dest: &Type, src: &Type) -> bool {
        let dest = self.subst.apply(dest);
        let src = self.subst.apply(src);

        // Reflexivity; this also makes any two width-unknown integer types
        // unify without a binding.
        if dest == src {
            return true;
        }

        match (&dest, &src) {
            (Type::Dontcare, _) | (_, Type::Dontcare) => true,

            (Type::Var(v) | Type::Param(v), other) | (other, Type::Var(v) | Type::Param(v)) => {
                self.bind(v, other)
            }

            // A width-unknown integer takes on any concrete bit type; the
            // binding is what later narrows the literal.
            (Type::InfInt(w), bits @ Type::Bits { .. })
            | (bits @ Type::Bits { .. }, Type::InfInt(w)) => {
                let var = TypeVar { id: w.0, name: "int".into() };
                self.bind(&var, bits)
            }

            (Type::SpecializedCanonical(s), other) | (other, Type::SpecializedCanonical(s)) => {
                // Clone to detach from the matched reference.
                let substituted = (*s.substituted).clone();
                let other = other.clone();
                self.unify(&substituted, &other)
            }

            (Type::Set(a), Type::Set(b)) => {
                let (a, b) = (a.clone(), b.clone());
                self.unify(&a, &b)
            }

            (Type::Stack(a), Type::Stack(b)) => {
                if let (Some(x), Some(y)) = (a.size, b.size) {
                    if x != y {
                        return self.mismatch(&dest, &src);
                    }
                }
                let (ae, be) = (a.element.clone(), b.element.clone());
                self.unify(&ae, &be)
            }

            (Type::Tuple(a), Type::Tuple(b)) => {
                if a.len() != b.len() {
                    return self.fail(
                        self.span,
                        ErrorCategory::Arity,
                        format!(
                            "tuples with {} and {} components cannot be unified",
                            a.len(),
                            b.len()
                        ),
                    );
                }
                let pairs: Vec<_> = a.iter().cloned().zip(b.iter().cloned()).collect();
                pairs.into_iter().all(|(x, y)| self.unify(&x, &y))
            }

            (Type::Method(a), Type::Method(b)) => {
                let (a, b) = (a.clone(), b.clone());
                self.unify_methods(&a, &b)
            }

            (Type::Action(a), Type::Action(b)) => {
                let (a, b) = (a.params.clone(), b.params.clone());
                self.unify_params(&a, &b)
            }

            (Type::Parser(a), Type::Parser(b))
            | (Type::Control(a), Type::Control(b))
            | (Type::Package(a), Type::Package(b)) => {
                let (ap, bp) = (a.params.clone(), b.params.clone());
                self.unify_params(&ap, &bp)
            }

            (Type::TypeOfType(a), Type::TypeOfType(b)) => {
                let (a, b) = ((**a).clone(), (**b).clone());
                self.unify(&a, &b)
            }

            _ => self.mismatch(&dest, &src),
        }
    }

    fn unify_params(&mut self, dest: &[crate::ty::Param], src: &[crate::ty::Param]) -> bool {
        if dest.len() != src.len() {
            return self.fail(
                self.span,
                ErrorCategory::Arity,
                format!("expected {} parameters, got {}", dest.len(), src.len()),
            );
        }
        for (d, s) in dest.iter().zip(src.iter()) {
            if d.direction != s.direction {
                return self.fail(
                    self.span,
                    ErrorCategory::TypeMismatch,
                    format!("parameter {} differs in direction", s.name),
                );
            }
            if !self.unify(&d.ty, &s.ty) {
                return false;
            }
        }
        true
    }

    fn unify_methods(&mut self, dest: &MethodType, src: &MethodType) -> bool {
        match (&dest.ret, &src.ret) {
            (None, None) => {}
            (Some(d), Some(s)) => {
                let (d, s) = ((**d).clone(), (**s).clone());
                if !self.unify(&d, &s) {
                    return false;
                }
            }
            _ => return self.mismatch(&Type::Method(dest.clone()), &Type::Method(src.clone())),
        }
        self.unify_params(&dest.params, &src.params)
    }

    /// Unify a method type against the shape of a call site.
    fn unify_call(&mut self, method: &Type, call: &CallType) -> bool {
        let method = self.subst.apply(method);
        let mt = match method.strip_specialized().clone() {
            Type::Method(mt) => mt,
            other => {
                return self.fail(
                    call.span,
                    ErrorCategory::TypeMismatch,
                    format!("{} cannot be called", other),
                );
            }
        };

        if !call.type_args.is_empty() {
            if mt.type_params.len() != call.type_args.len() {
                return self.fail(
                    call.span,
                    ErrorCategory::Arity,
                    format!(
                        "{} type parameter(s) expected, {} supplied",
                        mt.type_params.len(),
                        call.type_args.len()
                    ),
                );
            }
            for (param, arg) in mt.type_params.iter().zip(call.type_args.iter()) {
                if !self.bind(param, arg) {
                    return false;
                }
            }
        }

        if mt.params.len() != call.args.len() {
            return self.fail(
                call.span,
                ErrorCategory::Arity,
                format!("expected {} arguments, got {}", mt.params.len(), call.args.len()),
            );
        }

        for (param, arg) in mt.params.iter().zip(call.args.iter()) {
            if matches!(param.direction, Direction::Out | Direction::InOut) && !arg.is_left_value {
                return self.fail(
                    arg.span,
                    ErrorCategory::Capability,
                    format!("argument for {} parameter {} must be a left-value", param.direction, param.name),
                );
            }
            if !self.unify(&param.ty, &arg.ty) {
                return false;
            }
        }

        let ret = mt.ret.as_deref().cloned().unwrap_or(Type::Void);
        self.unify(&Type::Var(call.ret.clone()), &ret)
    }
}
