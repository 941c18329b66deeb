//! The resolved-name map consumed by the type checker.
//!
//! Name resolution runs before type checking and records, for every
//! name-use site, the declaration the name binds to. The checker never
//! resolves names itself; it asks this map. Binding keys are the node ids
//! of the use sites (path expressions, named type references).

use rustc_hash::FxHashMap;

use crate::ast::{Direction, NodeId, Program};
use crate::walk::{self, Visit};

/// What kind of declaration a name resolved to.
///
/// The checker dispatches on this to decide l-value-ness, compile-time
/// constantness, and method freshening at use sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentKind {
    Constant,
    Variable,
    Parameter(Direction),
    Instance,
    /// An extern method prototype.
    Method,
    Function,
    Action,
    Table,
    /// A parser state.
    State,
    /// A type declaration (struct, header, enum, extern, typedef, …).
    Type,
    /// A declared type parameter.
    TypeParam,
    EnumMember,
    ErrorMember,
    MatchKindMember,
}

/// A resolved binding: the declaration's node id plus its kind and name.
#[derive(Debug, Clone, PartialEq)]
pub struct Referent {
    pub decl: NodeId,
    pub kind: ReferentKind,
    pub name: String,
}

/// Use-site node id → resolved declaration.
#[derive(Debug, Default, Clone)]
pub struct ReferenceMap {
    bindings: FxHashMap<NodeId, Referent>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the use site `use_site` refers to `referent`.
    pub fn bind(&mut self, use_site: NodeId, referent: Referent) {
        self.bindings.insert(use_site, referent);
    }

    /// Look up the declaration a use site refers to.
    pub fn get_declaration(&self, use_site: NodeId) -> Option<&Referent> {
        self.bindings.get(&use_site)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Check that every name-use site under `program` has a binding.
    ///
    /// Returns the unresolved `(id, name)` pairs; an empty result means the
    /// map is complete and inference may run.
    pub fn validate(&self, program: &Program) -> Result<(), Vec<(NodeId, String)>> {
        struct Check<'a> {
            map: &'a ReferenceMap,
            missing: Vec<(NodeId, String)>,
        }
        impl Visit for Check<'_> {
            fn name_use(&mut self, id: NodeId, name: &str) {
                if !self.map.bindings.contains_key(&id) {
                    self.missing.push((id, name.to_string()));
                }
            }
        }
        let mut check = Check { map: self, missing: Vec::new() };
        walk::walk_program(program, &mut check);
        if check.missing.is_empty() {
            Ok(())
        } else {
            Err(check.missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::span::Span;

    #[test]
    fn validate_reports_unbound_uses() {
        let sp = Span::synthesized();
        let init = Expression::new(sp, ExprKind::Path(Path::new("y")));
        let use_id = init.id;
        let decl = Declaration::new(
            sp,
            DeclKind::Constant {
                name: "x".into(),
                ty: TypeExpr::new(sp, TypeExprKind::Bits { size: 8, signed: false }),
                initializer: init,
            },
        );
        let program = Program::new(vec![decl]);

        let mut map = ReferenceMap::new();
        let missing = map.validate(&program).unwrap_err();
        assert_eq!(missing, vec![(use_id, "y".to_string())]);

        map.bind(
            use_id,
            Referent { decl: NodeId::fresh(), kind: ReferentKind::Constant, name: "y".into() },
        );
        assert!(map.validate(&program).is_ok());
    }
}
