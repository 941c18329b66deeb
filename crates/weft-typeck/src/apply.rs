//! Re-attach inferred types to freshly cloned expressions.
//!
//! Some callers need the typed tree to survive transforms that clone
//! expression nodes. This pass deep-clones every expression in the program
//! with fresh identity and copies each original node's registry entries
//! (type, l-value, compile-time constant) onto its clone. Running inference
//! again over the result changes nothing: every node already has a type.
//!
//! The reference map is keyed by node identity, so the caller re-runs name
//! resolution over the returned program before any pass that needs it.

use weft_ast::ast::Program;
use weft_ast::walk::for_each_expression_mut;

use crate::typemap::TypeMap;

/// Clone every expression tree in `program`, re-attaching the types the
/// registry recorded for the originals.
pub fn apply_types(typemap: &mut TypeMap, mut program: Program) -> Program {
    for_each_expression_mut(&mut program, &mut |expr| {
        let mut pairs = Vec::new();
        let clone = expr.deep_clone_with(&mut |old, new| pairs.push((old, new)));
        *expr = clone;
        for (old, new) in pairs {
            typemap.copy_entry(old, new);
        }
    });
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Type;
    use weft_ast::ast::{DeclKind, Declaration, ExprKind, Expression, Program, TypeExpr, TypeExprKind};
    use weft_ast::span::Span;

    #[test]
    fn clones_carry_the_original_types() {
        let sp = Span::synthesized();
        let init = Expression::new(sp, ExprKind::Constant { value: 7, base: 10, width: None });
        let init_id = init.id;
        let decl = Declaration::new(
            sp,
            DeclKind::Constant {
                name: "x".into(),
                ty: TypeExpr::new(sp, TypeExprKind::Bits { size: 8, signed: false }),
                initializer: init,
            },
        );
        let program = Program::new(vec![decl]);

        let mut typemap = TypeMap::new();
        typemap.set_type(init_id, Type::bits(8, false));
        typemap.set_compile_time_constant(init_id);

        let program = apply_types(&mut typemap, program);
        let DeclKind::Constant { initializer, .. } = &program.declarations[0].kind else {
            unreachable!()
        };
        assert_ne!(initializer.id, init_id);
        assert_eq!(typemap.get_type(initializer.id), Some(&Type::bits(8, false)));
        assert!(typemap.is_compile_time_constant(initializer.id));
    }
}
