//! Syntactic equivalence of expressions.
//!
//! Compares two expression trees for structural equality modulo node
//! identity: literals by value, names by the declaration they resolve to,
//! everything else pointwise. Used to check that a table's default action
//! repeats the argument prefix given in the actions list.

use weft_ast::ast::{ExprKind, Expression, TypeExpr, TypeExprKind};
use weft_ast::refmap::ReferenceMap;

pub struct SameExpression<'a> {
    refmap: &'a ReferenceMap,
}

impl<'a> SameExpression<'a> {
    pub fn new(refmap: &'a ReferenceMap) -> Self {
        SameExpression { refmap }
    }

    pub fn same_expression(&self, a: &Expression, b: &Expression) -> bool {
        match (&a.kind, &b.kind) {
            (
                ExprKind::Constant { value: va, base: ba, width: wa },
                ExprKind::Constant { value: vb, base: bb, width: wb },
            ) => va == vb && ba == bb && wa == wb,
            (ExprKind::BoolLiteral(x), ExprKind::BoolLiteral(y)) => x == y,
            (ExprKind::StringLiteral(x), ExprKind::StringLiteral(y)) => x == y,
            (ExprKind::Path(_), ExprKind::Path(_)) => {
                match (self.refmap.get_declaration(a.id), self.refmap.get_declaration(b.id)) {
                    (Some(ra), Some(rb)) => ra.decl == rb.decl,
                    _ => false,
                }
            }
            (
                ExprKind::Member { base: xa, member: ma },
                ExprKind::Member { base: xb, member: mb },
            ) => ma == mb && self.same_expression(xa, xb),
            (
                ExprKind::Unary { op: oa, operand: xa },
                ExprKind::Unary { op: ob, operand: xb },
            ) => oa == ob && self.same_expression(xa, xb),
            (
                ExprKind::Binary { op: oa, left: la, right: ra },
                ExprKind::Binary { op: ob, left: lb, right: rb },
            ) => oa == ob && self.same_expression(la, lb) && self.same_expression(ra, rb),
            (
                ExprKind::Mux { condition: ca, on_true: ta, on_false: fa },
                ExprKind::Mux { condition: cb, on_true: tb, on_false: fb },
            ) => {
                self.same_expression(ca, cb)
                    && self.same_expression(ta, tb)
                    && self.same_expression(fa, fb)
            }
            (
                ExprKind::Cast { target: ta, operand: xa },
                ExprKind::Cast { target: tb, operand: xb },
            ) => self.same_type_expr(ta, tb) && self.same_expression(xa, xb),
            (
                ExprKind::Slice { base: xa, high: ha, low: la },
                ExprKind::Slice { base: xb, high: hb, low: lb },
            ) => {
                self.same_expression(xa, xb)
                    && self.same_expression(ha, hb)
                    && self.same_expression(la, lb)
            }
            (
                ExprKind::Index { base: xa, index: ia },
                ExprKind::Index { base: xb, index: ib },
            ) => self.same_expression(xa, xb) && self.same_expression(ia, ib),
            (ExprKind::List(xs), ExprKind::List(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(x, y)| self.same_expression(x, y))
            }
            (
                ExprKind::Call { callee: ca, type_args: ta, args: aa },
                ExprKind::Call { callee: cb, type_args: tb, args: ab },
            ) => {
                self.same_expression(ca, cb)
                    && ta.len() == tb.len()
                    && ta.iter().zip(tb).all(|(x, y)| self.same_type_expr(x, y))
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| self.same_expression(x, y))
            }
            (ExprKind::Default, ExprKind::Default) => true,
            (ExprKind::This, ExprKind::This) => true,
            _ => false,
        }
    }

    fn same_type_expr(&self, a: &TypeExpr, b: &TypeExpr) -> bool {
        match (&a.kind, &b.kind) {
            (
                TypeExprKind::Bits { size: sa, signed: ga },
                TypeExprKind::Bits { size: sb, signed: gb },
            ) => sa == sb && ga == gb,
            (TypeExprKind::Varbits { size: sa }, TypeExprKind::Varbits { size: sb }) => sa == sb,
            (TypeExprKind::Bool, TypeExprKind::Bool)
            | (TypeExprKind::Int, TypeExprKind::Int)
            | (TypeExprKind::Void, TypeExprKind::Void)
            | (TypeExprKind::Dontcare, TypeExprKind::Dontcare) => true,
            (TypeExprKind::Name(_), TypeExprKind::Name(_)) => {
                match (self.refmap.get_declaration(a.id), self.refmap.get_declaration(b.id)) {
                    (Some(ra), Some(rb)) => ra.decl == rb.decl,
                    _ => false,
                }
            }
            (TypeExprKind::Tuple(xs), TypeExprKind::Tuple(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(x, y)| self.same_type_expr(x, y))
            }
            _ => false,
        }
    }
}
