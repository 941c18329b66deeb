//! Type canonicalization, generic specialization, and fresh-variable
//! cloning.
//!
//! Canonicalization rewrites a type into the unique internal form the rest
//! of the checker relies on: bit types, stacks, and tuples are interned,
//! sets are lifted out of tuple components, parameter lists are checked,
//! and specialized generics are replaced by a canonical pair of the generic
//! and its substituted body. Canonicalization is idempotent.

use log::debug;

use crate::error::ErrorCategory;
use crate::infer::TypeInference;
use crate::subst::Substitution;
use crate::ty::{
    ExternType, MethodType, ObjectType, Param, SpecializedType, StackType, StructType, Type,
    TypeVar,
};

impl TypeInference<'_> {
    /// Map a type to its canonical form. Returns `None` when the type is
    /// ill-formed; the error has already been reported.
    pub fn canonicalize(&mut self, ty: &Type) -> Option<Type> {
        match ty {
            Type::Bits { .. } => Some(self.typemap.get_canonical(ty.clone())),

            // Base singletons and already-canonical forms.
            Type::Varbits { .. }
            | Type::Boolean
            | Type::String
            | Type::InfInt(_)
            | Type::Dontcare
            | Type::State
            | Type::Void
            | Type::MatchKind
            | Type::Error(_)
            | Type::Enum(_)
            | Type::ActionEnum(_)
            | Type::Param(_)
            | Type::Var(_)
            | Type::Table(_)
            | Type::SpecializedCanonical(_) => Some(ty.clone()),

            Type::Action(_) => Some(ty.clone()),

            Type::Set(element) => {
                let canon = self.canonicalize(element)?;
                if canon == **element {
                    Some(ty.clone())
                } else {
                    Some(Type::Set(Box::new(canon)))
                }
            }

            Type::Stack(stack) => {
                let element = self.canonicalize(&stack.element)?;
                let canon = Type::Stack(StackType { element: Box::new(element), size: stack.size });
                Some(self.typemap.get_canonical(canon))
            }

            Type::Tuple(components) => {
                // A set component lifts over the whole tuple:
                // tuple<set<a>, b> is canonically set<tuple<a, b>>.
                let mut any_set = false;
                let mut fields = Vec::with_capacity(components.len());
                for component in components {
                    let component = match component {
                        Type::Set(inner) => {
                            any_set = true;
                            inner.as_ref()
                        }
                        other => other,
                    };
                    fields.push(self.canonicalize(component)?);
                }
                let canon = self.typemap.get_canonical(Type::Tuple(fields));
                if any_set {
                    Some(Type::Set(Box::new(canon)))
                } else {
                    Some(canon)
                }
            }

            Type::Parser(object) => {
                let object = self.canonicalize_object(object, true)?;
                Some(Type::Parser(object))
            }
            Type::Control(object) => {
                let object = self.canonicalize_object(object, true)?;
                Some(Type::Control(object))
            }
            Type::Package(object) => {
                let object = self.canonicalize_object(object, false)?;
                Some(Type::Package(object))
            }

            Type::Extern(ext) => {
                let mut methods = Vec::with_capacity(ext.methods.len());
                for method in &ext.methods {
                    let mut method = method.clone();
                    method.ty = self.canonicalize_method(&method.ty)?;
                    let duplicate = methods.iter().any(|m: &crate::ty::ExternMethod| {
                        m.name == method.name && m.ty.params.len() == method.ty.params.len()
                    });
                    if duplicate {
                        let span = self.current_span();
                        self.reporter.type_error(
                            span,
                            ErrorCategory::Arity,
                            format!(
                                "extern {} declares two methods named {} with {} arguments",
                                ext.name,
                                method.name,
                                method.ty.params.len()
                            ),
                        );
                        return None;
                    }
                    methods.push(method);
                }
                Some(Type::Extern(ExternType {
                    decl: ext.decl,
                    name: ext.name.clone(),
                    type_params: ext.type_params.clone(),
                    methods,
                }))
            }

            Type::Method(method) => Some(Type::Method(self.canonicalize_method(method)?)),

            Type::Struct(s) => Some(Type::Struct(self.canonicalize_fields(s)?)),
            Type::Header(s) => Some(Type::Header(self.canonicalize_fields(s)?)),
            Type::Union(s) => Some(Type::Union(self.canonicalize_fields(s)?)),

            Type::Specialized { base, args } => {
                let base = self.canonicalize(base)?;
                let span = self.current_span();
                let Some(type_params) = base.type_params() else {
                    self.reporter.type_error(
                        span,
                        ErrorCategory::Arity,
                        format!("type {} is not generic and cannot be specialized", base),
                    );
                    return None;
                };
                if type_params.len() != args.len() {
                    self.reporter.type_error(
                        span,
                        ErrorCategory::Arity,
                        format!(
                            "type {} has {} type parameter(s), but it is specialized with {}",
                            base,
                            type_params.len(),
                            args.len()
                        ),
                    );
                    return None;
                }
                let mut canon_args = Vec::with_capacity(args.len());
                for arg in args {
                    canon_args.push(self.canonicalize(arg)?);
                }
                let substituted = self.specialize(&base, &canon_args)?;
                Some(Type::SpecializedCanonical(SpecializedType {
                    base: Box::new(base),
                    args: canon_args,
                    substituted: Box::new(substituted),
                }))
            }

            Type::TypeOfType(_) => {
                unreachable!("a type-of-type never reaches canonicalization")
            }
        }
    }

    fn canonicalize_object(&mut self, object: &ObjectType, forbid_modules: bool) -> Option<ObjectType> {
        let params = self.canonicalize_params(&object.params)?;
        if forbid_modules && !self.check_parameters(&params, true) {
            return None;
        }
        let ctor_params = match &object.ctor_params {
            Some(ps) => Some(self.canonicalize_params(ps)?),
            None => None,
        };
        Some(ObjectType {
            decl: object.decl,
            name: object.name.clone(),
            type_params: object.type_params.clone(),
            params,
            ctor_params,
        })
    }

    fn canonicalize_method(&mut self, method: &MethodType) -> Option<MethodType> {
        let ret = match &method.ret {
            Some(r) => Some(Box::new(self.canonicalize(r)?)),
            None => None,
        };
        let params = self.canonicalize_params(&method.params)?;
        if !self.check_parameters(&params, false) {
            return None;
        }
        Some(MethodType { type_params: method.type_params.clone(), ret, params })
    }

    fn canonicalize_fields(&mut self, s: &StructType) -> Option<StructType> {
        let mut fields = Vec::with_capacity(s.fields.len());
        for field in &s.fields {
            let mut field = field.clone();
            field.ty = self.canonicalize(&field.ty)?;
            fields.push(field);
        }
        Some(StructType { decl: s.decl, name: s.name.clone(), fields })
    }

    pub(crate) fn canonicalize_params(&mut self, params: &[Param]) -> Option<Vec<Param>> {
        let mut out = Vec::with_capacity(params.len());
        for param in params {
            let mut param = param.clone();
            param.ty = self.canonicalize(&param.ty)?;
            out.push(param);
        }
        Some(out)
    }

    /// Enforce the parameter-kind restrictions: extern-typed parameters may
    /// not have a direction, and where `forbid_modules` is set, parsers,
    /// controls, and packages are not allowed as parameter types at all.
    pub(crate) fn check_parameters(&mut self, params: &[Param], forbid_modules: bool) -> bool {
        let span = self.current_span();
        for param in params {
            let ty = param.ty.strip_specialized();
            if param.direction != weft_ast::ast::Direction::None && matches!(ty, Type::Extern(_)) {
                self.reporter.type_error(
                    span,
                    ErrorCategory::Capability,
                    format!("parameter {} with an extern type cannot have a direction", param.name),
                );
                return false;
            }
            if forbid_modules
                && matches!(ty, Type::Parser(_) | Type::Control(_) | Type::Package(_))
            {
                self.reporter.type_error(
                    span,
                    ErrorCategory::Capability,
                    format!("parameter {} cannot have type {}", param.name, param.ty),
                );
                return false;
            }
        }
        true
    }

    /// Bind a generic's type parameters to concrete arguments, producing
    /// the substituted body. The result carries no type parameters.
    pub(crate) fn specialize(&mut self, generic: &Type, args: &[Type]) -> Option<Type> {
        let type_params = generic.type_params()?;
        let mut bindings = Substitution::new();
        for (param, arg) in type_params.iter().zip(args.iter()) {
            if !bindings.set_binding(param.id, arg.clone()) {
                return None;
            }
        }
        debug!("specializing {} with {} type argument(s)", generic, args.len());
        Some(with_type_params(bindings.apply(generic), Vec::new()))
    }

    /// Clone a generic type replacing every type parameter by a fresh
    /// inference variable. Applied at each polymorphic use site so that
    /// unifications at different call sites never alias.
    pub(crate) fn fresh_type_variables(&mut self, ty: &Type) -> Type {
        let Some(type_params) = ty.type_params() else {
            return ty.clone();
        };
        if type_params.is_empty() {
            return ty.clone();
        }
        let mut bindings = Substitution::new();
        let fresh: Vec<TypeVar> = type_params
            .iter()
            .map(|param| {
                let var = TypeVar::fresh(&param.name);
                bindings.set_binding(param.id, Type::Var(var.clone()));
                var
            })
            .collect();
        with_type_params(bindings.apply(ty), fresh)
    }
}

/// Replace the type-parameter list of a generic type.
fn with_type_params(ty: Type, type_params: Vec<TypeVar>) -> Type {
    match ty {
        Type::Method(mut m) => {
            m.type_params = type_params;
            Type::Method(m)
        }
        Type::Extern(mut e) => {
            e.type_params = type_params;
            Type::Extern(e)
        }
        Type::Parser(mut o) => {
            o.type_params = type_params;
            Type::Parser(o)
        }
        Type::Control(mut o) => {
            o.type_params = type_params;
            Type::Control(o)
        }
        Type::Package(mut o) => {
            o.type_params = type_params;
            Type::Package(o)
        }
        other => other,
    }
}
