//! Type-variable substitutions and the constant-narrowing rewrite.
//!
//! A [`Substitution`] maps type-variable ids (inference variables, declared
//! type parameters, and the width variables of unsized integer literals) to
//! types. Solving a constraint set produces one; the registry accumulates
//! them; specialization and fresh-variable cloning are built on them.

use log::debug;
use rustc_hash::FxHashMap;
use weft_ast::ast::{BitWidth, ExprKind, Expression};

use crate::ty::{
    ActionType, MethodType, ObjectType, Param, SpecializedType, Type, TypeVar,
};
use crate::typemap::TypeMap;

/// A mapping from type-variable id to type. Composable and applicable to
/// any type tree.
#[derive(Debug, Default, Clone)]
pub struct Substitution {
    bindings: FxHashMap<u32, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this substitution binds nothing.
    pub fn is_identity(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The binding for a variable id, if any.
    pub fn get(&self, id: u32) -> Option<&Type> {
        self.bindings.get(&id)
    }

    /// The binding for a variable, if any.
    pub fn lookup(&self, var: &TypeVar) -> Option<&Type> {
        self.bindings.get(&var.id)
    }

    /// Record `id ↦ ty` without touching existing bindings. Fails if `id`
    /// is already bound to a different type.
    pub fn set_binding(&mut self, id: u32, ty: Type) -> bool {
        match self.bindings.get(&id) {
            Some(existing) => *existing == ty,
            None => {
                self.bindings.insert(id, ty);
                true
            }
        }
    }

    /// Extend with `id ↦ ty`, keeping the substitution idempotent: the
    /// right-hand side is first resolved through the current bindings, an
    /// occurs check rejects cyclic bindings, and existing right-hand sides
    /// are rewritten so no binding mentions `id` afterwards.
    pub fn compose(&mut self, id: u32, ty: Type) -> bool {
        let ty = self.apply(&ty);
        if occurs(id, &ty) {
            return false;
        }
        let mut single = Substitution::new();
        single.bindings.insert(id, ty.clone());
        for value in self.bindings.values_mut() {
            *value = single.apply(value);
        }
        self.bindings.insert(id, ty);
        true
    }

    /// Merge another substitution into this one; fails on a conflicting
    /// binding for the same variable.
    pub fn merge(&mut self, other: &Substitution) -> bool {
        for (&id, ty) in &other.bindings {
            match self.bindings.get(&id) {
                Some(existing) if existing != ty => return false,
                Some(_) => {}
                None => {
                    if !self.compose(id, ty.clone()) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Apply the substitution to a type, replacing every bound variable and
    /// resolving chains of variable-to-variable bindings.
    pub fn apply(&self, ty: &Type) -> Type {
        if self.bindings.is_empty() {
            return ty.clone();
        }
        match ty {
            Type::Var(v) | Type::Param(v) => match self.bindings.get(&v.id) {
                Some(bound) => self.apply(bound),
                None => ty.clone(),
            },
            Type::InfInt(w) => match self.bindings.get(&w.0) {
                Some(bound) => self.apply(bound),
                None => ty.clone(),
            },
            Type::Set(t) => Type::Set(Box::new(self.apply(t))),
            Type::Stack(s) => Type::Stack(crate::ty::StackType {
                element: Box::new(self.apply(&s.element)),
                size: s.size,
            }),
            Type::Tuple(ts) => Type::Tuple(ts.iter().map(|t| self.apply(t)).collect()),
            Type::Method(m) => Type::Method(self.apply_method(m)),
            Type::Action(a) => Type::Action(ActionType { params: self.apply_params(&a.params) }),
            Type::Parser(o) => Type::Parser(self.apply_object(o)),
            Type::Control(o) => Type::Control(self.apply_object(o)),
            Type::Package(o) => Type::Package(self.apply_object(o)),
            Type::Extern(e) => {
                let mut ext = e.clone();
                for m in &mut ext.methods {
                    m.ty = self.apply_method(&m.ty);
                }
                Type::Extern(ext)
            }
            Type::Specialized { base, args } => Type::Specialized {
                base: Box::new(self.apply(base)),
                args: args.iter().map(|a| self.apply(a)).collect(),
            },
            Type::SpecializedCanonical(s) => Type::SpecializedCanonical(SpecializedType {
                base: Box::new(self.apply(&s.base)),
                args: s.args.iter().map(|a| self.apply(a)).collect(),
                substituted: Box::new(self.apply(&s.substituted)),
            }),
            Type::TypeOfType(t) => Type::TypeOfType(Box::new(self.apply(t))),
            // Nominal and base types carry no substitutable structure.
            other => other.clone(),
        }
    }

    pub fn apply_method(&self, m: &MethodType) -> MethodType {
        MethodType {
            type_params: m.type_params.clone(),
            ret: m.ret.as_ref().map(|r| Box::new(self.apply(r))),
            params: self.apply_params(&m.params),
        }
    }

    fn apply_object(&self, o: &ObjectType) -> ObjectType {
        ObjectType {
            decl: o.decl,
            name: o.name.clone(),
            type_params: o.type_params.clone(),
            params: self.apply_params(&o.params),
            ctor_params: o.ctor_params.as_ref().map(|ps| self.apply_params(ps)),
        }
    }

    fn apply_params(&self, params: &[Param]) -> Vec<Param> {
        params
            .iter()
            .map(|p| Param {
                id: p.id,
                name: p.name.clone(),
                direction: p.direction,
                ty: self.apply(&p.ty),
            })
            .collect()
    }
}

/// Whether variable `id` occurs anywhere within `ty`.
pub fn occurs(id: u32, ty: &Type) -> bool {
    match ty {
        Type::Var(v) | Type::Param(v) => v.id == id,
        Type::InfInt(w) => w.0 == id,
        Type::Set(t) | Type::TypeOfType(t) => occurs(id, t),
        Type::Stack(s) => occurs(id, &s.element),
        Type::Tuple(ts) => ts.iter().any(|t| occurs(id, t)),
        Type::Method(m) => {
            m.ret.as_ref().is_some_and(|r| occurs(id, r))
                || m.params.iter().any(|p| occurs(id, &p.ty))
        }
        Type::Action(a) => a.params.iter().any(|p| occurs(id, &p.ty)),
        Type::Parser(o) | Type::Control(o) | Type::Package(o) => {
            o.params.iter().any(|p| occurs(id, &p.ty))
                || o.ctor_params
                    .as_ref()
                    .is_some_and(|ps| ps.iter().any(|p| occurs(id, &p.ty)))
        }
        Type::Extern(e) => e.methods.iter().any(|m| {
            m.ty.ret.as_ref().is_some_and(|r| occurs(id, r))
                || m.ty.params.iter().any(|p| occurs(id, &p.ty))
        }),
        Type::Specialized { base, args } => {
            occurs(id, base) || args.iter().any(|a| occurs(id, a))
        }
        Type::SpecializedCanonical(s) => {
            occurs(id, &s.base)
                || s.args.iter().any(|a| occurs(id, a))
                || occurs(id, &s.substituted)
        }
        _ => false,
    }
}

/// Rewrite an expression after a successful unification: every integer
/// literal whose recorded type is a variable bound to a concrete bit type
/// is replaced by a new literal carrying that type, marked constant.
/// Other expressions keep their registry entries untouched.
pub fn substitute_constants(subst: &Substitution, typemap: &mut TypeMap, expr: &mut Expression) {
    match &mut expr.kind {
        ExprKind::Constant { value, base, .. } => {
            let Some(ty) = typemap.get_type(expr.id) else { return };
            let Some(var_id) = ty.type_var_id() else { return };
            let Some(repl) = subst.get(var_id) else { return };
            let repl = subst.apply(repl);
            if let Type::Bits { size, signed } = repl {
                debug!("inferred type {} for literal {}", repl, value);
                let narrowed = Expression::new(
                    expr.span,
                    ExprKind::Constant {
                        value: *value,
                        base: *base,
                        width: Some(BitWidth { size, signed }),
                    },
                );
                typemap.set_type(narrowed.id, repl);
                typemap.set_compile_time_constant(narrowed.id);
                *expr = narrowed;
            }
        }
        ExprKind::BoolLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::Path(_)
        | ExprKind::Default
        | ExprKind::This => {}
        ExprKind::Member { base, .. } => substitute_constants(subst, typemap, base),
        ExprKind::Unary { operand, .. } => substitute_constants(subst, typemap, operand),
        ExprKind::Binary { left, right, .. } => {
            substitute_constants(subst, typemap, left);
            substitute_constants(subst, typemap, right);
        }
        ExprKind::Mux { condition, on_true, on_false } => {
            substitute_constants(subst, typemap, condition);
            substitute_constants(subst, typemap, on_true);
            substitute_constants(subst, typemap, on_false);
        }
        ExprKind::Cast { operand, .. } => substitute_constants(subst, typemap, operand),
        ExprKind::Slice { base, high, low } => {
            substitute_constants(subst, typemap, base);
            substitute_constants(subst, typemap, high);
            substitute_constants(subst, typemap, low);
        }
        ExprKind::Index { base, index } => {
            substitute_constants(subst, typemap, base);
            substitute_constants(subst, typemap, index);
        }
        ExprKind::List(items) => {
            for item in items {
                substitute_constants(subst, typemap, item);
            }
        }
        ExprKind::Call { callee, args, .. } => {
            substitute_constants(subst, typemap, callee);
            for arg in args {
                substitute_constants(subst, typemap, arg);
            }
        }
        ExprKind::ConstructorCall { args, .. } => {
            for arg in args {
                substitute_constants(subst, typemap, arg);
            }
        }
        ExprKind::Select { scrutinee, cases } => {
            for e in scrutinee {
                substitute_constants(subst, typemap, e);
            }
            for case in cases {
                substitute_constants(subst, typemap, &mut case.keyset);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ast::span::Span;

    #[test]
    fn apply_resolves_chains() {
        let a = TypeVar::fresh("A");
        let b = TypeVar::fresh("B");
        let mut subst = Substitution::new();
        assert!(subst.compose(a.id, Type::Var(b.clone())));
        assert!(subst.compose(b.id, Type::bits(8, false)));
        assert_eq!(subst.apply(&Type::Var(a)), Type::bits(8, false));
    }

    #[test]
    fn compose_rejects_cycles() {
        let a = TypeVar::fresh("A");
        let mut subst = Substitution::new();
        assert!(!subst.compose(a.id, Type::Tuple(vec![Type::Var(a.clone())])));
    }

    #[test]
    fn merge_detects_conflicts() {
        let a = TypeVar::fresh("A");
        let mut left = Substitution::new();
        left.compose(a.id, Type::bits(8, false));
        let mut right = Substitution::new();
        right.compose(a.id, Type::bits(16, false));
        assert!(!left.merge(&right));

        let mut same = Substitution::new();
        same.compose(a.id, Type::bits(8, false));
        assert!(same.merge(&Substitution::new()));
    }

    #[test]
    fn narrows_width_variable_literals() {
        let mut typemap = TypeMap::new();
        let mut expr = Expression::new(
            Span::synthesized(),
            ExprKind::Constant { value: 3, base: 10, width: None },
        );
        let inf = Type::inf_int();
        let width_id = inf.type_var_id().unwrap();
        typemap.set_type(expr.id, inf);
        typemap.set_compile_time_constant(expr.id);

        let mut subst = Substitution::new();
        subst.compose(width_id, Type::bits(32, false));
        substitute_constants(&subst, &mut typemap, &mut expr);

        match &expr.kind {
            ExprKind::Constant { width, .. } => {
                assert_eq!(*width, Some(BitWidth { size: 32, signed: false }));
            }
            other => panic!("expected a constant, got {other:?}"),
        }
        assert_eq!(typemap.get_type(expr.id), Some(&Type::bits(32, false)));
        assert!(typemap.is_compile_time_constant(expr.id));
    }
}
