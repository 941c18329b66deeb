//! Read-only traversal over the node model.
//!
//! Serves the two whole-tree queries the front-end needs: enumerating the
//! node ids currently alive under a root (registry garbage collection) and
//! enumerating name-use sites (reference-map validation).

use crate::ast::*;

/// Callbacks invoked while walking a tree. `node` fires once per node id;
/// `name_use` fires for every site whose id keys the reference map.
pub trait Visit {
    fn node(&mut self, _id: NodeId) {}
    fn name_use(&mut self, _id: NodeId, _name: &str) {}
}

pub fn walk_program(program: &Program, v: &mut impl Visit) {
    v.node(program.id);
    for decl in &program.declarations {
        walk_declaration(decl, v);
    }
}

pub fn walk_declaration(decl: &Declaration, v: &mut impl Visit) {
    v.node(decl.id);
    match &decl.kind {
        DeclKind::Constant { ty, initializer, .. } => {
            walk_type_expr(ty, v);
            walk_expression(initializer, v);
        }
        DeclKind::Variable { ty, initializer, .. } => {
            walk_type_expr(ty, v);
            if let Some(init) = initializer {
                walk_expression(init, v);
            }
        }
        DeclKind::Instance { ty, args, initializer, .. } => {
            walk_type_expr(ty, v);
            for arg in args {
                walk_expression(arg, v);
            }
            if let Some(decls) = initializer {
                for d in decls {
                    walk_declaration(d, v);
                }
            }
        }
        DeclKind::ParserType(o) | DeclKind::ControlType(o) | DeclKind::Package(o) => {
            walk_object_type(o, v);
        }
        DeclKind::Parser { object, ctor_params, locals, states } => {
            walk_object_type(object, v);
            for p in ctor_params {
                walk_parameter(p, v);
            }
            for d in locals {
                walk_declaration(d, v);
            }
            for s in states {
                v.node(s.id);
                for stmt in &s.statements {
                    walk_statement(stmt, v);
                }
                if let Some(t) = &s.transition {
                    walk_expression(t, v);
                }
            }
        }
        DeclKind::Control { object, ctor_params, locals, body } => {
            walk_object_type(object, v);
            for p in ctor_params {
                walk_parameter(p, v);
            }
            for d in locals {
                walk_declaration(d, v);
            }
            walk_statement(body, v);
        }
        DeclKind::Extern { type_params, methods, .. } => {
            for tp in type_params {
                v.node(tp.id);
            }
            for m in methods {
                walk_method_proto(m, v);
            }
        }
        DeclKind::ExternFunction(proto) => walk_method_proto(proto, v),
        DeclKind::Function { type_params, return_type, params, body, .. } => {
            for tp in type_params {
                v.node(tp.id);
            }
            walk_type_expr(return_type, v);
            for p in params {
                walk_parameter(p, v);
            }
            walk_statement(body, v);
        }
        DeclKind::Action { params, body, .. } => {
            for p in params {
                walk_parameter(p, v);
            }
            walk_statement(body, v);
        }
        DeclKind::Table { properties, .. } => {
            for prop in properties {
                v.node(prop.id);
                match &prop.value {
                    PropertyValue::Actions(refs) => {
                        for r in refs {
                            v.node(r.id);
                            walk_expression(&r.expression, v);
                        }
                    }
                    PropertyValue::Key(elems) => {
                        for k in elems {
                            v.node(k.id);
                            walk_expression(&k.expression, v);
                            walk_expression(&k.match_kind, v);
                        }
                    }
                    PropertyValue::Expression(e) => walk_expression(e, v),
                }
            }
        }
        DeclKind::Enum { members, .. }
        | DeclKind::Errors { members }
        | DeclKind::MatchKinds { members } => {
            for m in members {
                v.node(m.id);
            }
        }
        DeclKind::Struct { fields, .. }
        | DeclKind::Header { fields, .. }
        | DeclKind::HeaderUnion { fields, .. } => {
            for f in fields {
                v.node(f.id);
                for a in &f.annotations {
                    v.node(a.id);
                }
                walk_type_expr(&f.ty, v);
            }
        }
        DeclKind::Typedef { ty, .. } => walk_type_expr(ty, v),
    }
}

fn walk_method_proto(m: &MethodProto, v: &mut impl Visit) {
    v.node(m.id);
    for tp in &m.type_params {
        v.node(tp.id);
    }
    if let Some(rt) = &m.return_type {
        walk_type_expr(rt, v);
    }
    for p in &m.params {
        walk_parameter(p, v);
    }
}

fn walk_object_type(o: &ObjectType, v: &mut impl Visit) {
    v.node(o.id);
    for tp in &o.type_params {
        v.node(tp.id);
    }
    for p in &o.params {
        walk_parameter(p, v);
    }
}

fn walk_parameter(p: &Parameter, v: &mut impl Visit) {
    v.node(p.id);
    for a in &p.annotations {
        v.node(a.id);
    }
    walk_type_expr(&p.ty, v);
}

pub fn walk_statement(stmt: &Statement, v: &mut impl Visit) {
    v.node(stmt.id);
    match &stmt.kind {
        StmtKind::Block(stmts) => {
            for s in stmts {
                walk_statement(s, v);
            }
        }
        StmtKind::If { condition, then_branch, else_branch } => {
            walk_expression(condition, v);
            walk_statement(then_branch, v);
            if let Some(e) = else_branch {
                walk_statement(e, v);
            }
        }
        StmtKind::Switch { expression, cases } => {
            walk_expression(expression, v);
            for c in cases {
                v.node(c.id);
                walk_expression(&c.label, v);
                if let Some(b) = &c.body {
                    walk_statement(b, v);
                }
            }
        }
        StmtKind::Assignment { target, value } => {
            walk_expression(target, v);
            walk_expression(value, v);
        }
        StmtKind::Call(e) => walk_expression(e, v),
        StmtKind::Return(e) => {
            if let Some(e) = e {
                walk_expression(e, v);
            }
        }
        StmtKind::Declaration(d) => walk_declaration(d, v),
        StmtKind::Empty => {}
    }
}

pub fn walk_expression(expr: &Expression, v: &mut impl Visit) {
    v.node(expr.id);
    match &expr.kind {
        ExprKind::Constant { .. }
        | ExprKind::BoolLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::Default
        | ExprKind::This => {}
        ExprKind::Path(p) => v.name_use(expr.id, &p.name),
        ExprKind::Member { base, .. } => walk_expression(base, v),
        ExprKind::Unary { operand, .. } => walk_expression(operand, v),
        ExprKind::Binary { left, right, .. } => {
            walk_expression(left, v);
            walk_expression(right, v);
        }
        ExprKind::Mux { condition, on_true, on_false } => {
            walk_expression(condition, v);
            walk_expression(on_true, v);
            walk_expression(on_false, v);
        }
        ExprKind::Cast { target, operand } => {
            walk_type_expr(target, v);
            walk_expression(operand, v);
        }
        ExprKind::Slice { base, high, low } => {
            walk_expression(base, v);
            walk_expression(high, v);
            walk_expression(low, v);
        }
        ExprKind::Index { base, index } => {
            walk_expression(base, v);
            walk_expression(index, v);
        }
        ExprKind::List(items) => {
            for e in items {
                walk_expression(e, v);
            }
        }
        ExprKind::Call { callee, type_args, args } => {
            walk_expression(callee, v);
            for t in type_args {
                walk_type_expr(t, v);
            }
            for e in args {
                walk_expression(e, v);
            }
        }
        ExprKind::ConstructorCall { ty, args } => {
            walk_type_expr(ty, v);
            for e in args {
                walk_expression(e, v);
            }
        }
        ExprKind::Select { scrutinee, cases } => {
            for e in scrutinee {
                walk_expression(e, v);
            }
            for c in cases {
                v.node(c.id);
                walk_expression(&c.keyset, v);
                walk_expression(&c.state, v);
            }
        }
    }
}

pub fn walk_type_expr(ty: &TypeExpr, v: &mut impl Visit) {
    v.node(ty.id);
    match &ty.kind {
        TypeExprKind::Bits { .. }
        | TypeExprKind::Varbits { .. }
        | TypeExprKind::Bool
        | TypeExprKind::Int
        | TypeExprKind::Void
        | TypeExprKind::Dontcare => {}
        TypeExprKind::Name(p) => v.name_use(ty.id, &p.name),
        TypeExprKind::Specialized { base, args } => {
            v.name_use(ty.id, &base.name);
            for a in args {
                walk_type_expr(a, v);
            }
        }
        TypeExprKind::Tuple(items) => {
            for t in items {
                walk_type_expr(t, v);
            }
        }
        TypeExprKind::Stack { element, size } => {
            walk_type_expr(element, v);
            walk_expression(size, v);
        }
    }
}

/// Visit every top-level expression slot in the tree mutably. The callback
/// owns recursion into sub-expressions; this walk only finds the roots
/// (initializers, arguments, conditions, transitions, property values).
pub fn for_each_expression_mut(program: &mut Program, f: &mut impl FnMut(&mut Expression)) {
    for decl in &mut program.declarations {
        decl_expressions_mut(decl, f);
    }
}

fn decl_expressions_mut(decl: &mut Declaration, f: &mut impl FnMut(&mut Expression)) {
    match &mut decl.kind {
        DeclKind::Constant { initializer, .. } => f(initializer),
        DeclKind::Variable { initializer, .. } => {
            if let Some(init) = initializer {
                f(init);
            }
        }
        DeclKind::Instance { args, initializer, .. } => {
            for arg in args {
                f(arg);
            }
            if let Some(decls) = initializer {
                for d in decls {
                    decl_expressions_mut(d, f);
                }
            }
        }
        DeclKind::Parser { locals, states, .. } => {
            for d in locals {
                decl_expressions_mut(d, f);
            }
            for s in states {
                for stmt in &mut s.statements {
                    stmt_expressions_mut(stmt, f);
                }
                if let Some(t) = &mut s.transition {
                    f(t);
                }
            }
        }
        DeclKind::Control { locals, body, .. } => {
            for d in locals {
                decl_expressions_mut(d, f);
            }
            stmt_expressions_mut(body, f);
        }
        DeclKind::Function { body, .. } | DeclKind::Action { body, .. } => {
            stmt_expressions_mut(body, f);
        }
        DeclKind::Table { properties, .. } => {
            for prop in properties {
                match &mut prop.value {
                    PropertyValue::Actions(refs) => {
                        for r in refs {
                            f(&mut r.expression);
                        }
                    }
                    PropertyValue::Key(elems) => {
                        for k in elems {
                            f(&mut k.expression);
                            f(&mut k.match_kind);
                        }
                    }
                    PropertyValue::Expression(e) => f(e),
                }
            }
        }
        DeclKind::ParserType(_)
        | DeclKind::ControlType(_)
        | DeclKind::Package(_)
        | DeclKind::Extern { .. }
        | DeclKind::ExternFunction(_)
        | DeclKind::Enum { .. }
        | DeclKind::Errors { .. }
        | DeclKind::MatchKinds { .. }
        | DeclKind::Struct { .. }
        | DeclKind::Header { .. }
        | DeclKind::HeaderUnion { .. }
        | DeclKind::Typedef { .. } => {}
    }
}

fn stmt_expressions_mut(stmt: &mut Statement, f: &mut impl FnMut(&mut Expression)) {
    match &mut stmt.kind {
        StmtKind::Block(stmts) => {
            for s in stmts {
                stmt_expressions_mut(s, f);
            }
        }
        StmtKind::If { condition, then_branch, else_branch } => {
            f(condition);
            stmt_expressions_mut(then_branch, f);
            if let Some(e) = else_branch {
                stmt_expressions_mut(e, f);
            }
        }
        StmtKind::Switch { expression, cases } => {
            f(expression);
            for c in cases {
                f(&mut c.label);
                if let Some(b) = &mut c.body {
                    stmt_expressions_mut(b, f);
                }
            }
        }
        StmtKind::Assignment { target, value } => {
            f(target);
            f(value);
        }
        StmtKind::Call(e) => f(e),
        StmtKind::Return(e) => {
            if let Some(e) = e {
                f(e);
            }
        }
        StmtKind::Declaration(d) => decl_expressions_mut(d, f),
        StmtKind::Empty => {}
    }
}
