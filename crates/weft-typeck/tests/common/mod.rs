//! Shared test support: compact AST builders and a minimal name binder.
//!
//! The checker consumes a pre-populated reference map; in production that
//! map comes from the resolution pass. [`bind`] is a small stand-in with
//! the same scoping rules, enough to resolve the programs the tests build.

#![allow(dead_code)]

use rustc_hash::FxHashMap;
use weft_ast::ast::*;
use weft_ast::refmap::{Referent, ReferenceMap, ReferentKind};
use weft_ast::span::Span;
use weft_typeck::{check, Options, TypeckResult};

pub fn sp() -> Span {
    Span::synthesized()
}

// ── Type builders ──────────────────────────────────────────────────────

pub fn bit(size: u32) -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Bits { size, signed: false })
}

pub fn signed(size: u32) -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Bits { size, signed: true })
}

pub fn bool_ty() -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Bool)
}

pub fn void_ty() -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Void)
}

pub fn int_ty() -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Int)
}

pub fn name_ty(name: &str) -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Name(Path::new(name)))
}

pub fn tuple_ty(items: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Tuple(items))
}

pub fn stack_ty(element: TypeExpr, size: i128) -> TypeExpr {
    TypeExpr::new(
        sp(),
        TypeExprKind::Stack { element: Box::new(element), size: Box::new(cst(size)) },
    )
}

pub fn spec_ty(base: &str, args: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::new(sp(), TypeExprKind::Specialized { base: Path::new(base), args })
}

// ── Expression builders ────────────────────────────────────────────────

pub fn cst(value: i128) -> Expression {
    Expression::new(sp(), ExprKind::Constant { value, base: 10, width: None })
}

pub fn wcst(size: u32, value: i128) -> Expression {
    Expression::new(
        sp(),
        ExprKind::Constant { value, base: 10, width: Some(BitWidth { size, signed: false }) },
    )
}

pub fn btrue() -> Expression {
    Expression::new(sp(), ExprKind::BoolLiteral(true))
}

pub fn path(name: &str) -> Expression {
    Expression::new(sp(), ExprKind::Path(Path::new(name)))
}

pub fn member(base: Expression, name: &str) -> Expression {
    Expression::new(sp(), ExprKind::Member { base: Box::new(base), member: name.into() })
}

pub fn bin(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::new(
        sp(),
        ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
    )
}

pub fn un(op: UnaryOp, operand: Expression) -> Expression {
    Expression::new(sp(), ExprKind::Unary { op, operand: Box::new(operand) })
}

pub fn call(callee: Expression, args: Vec<Expression>) -> Expression {
    Expression::new(
        sp(),
        ExprKind::Call { callee: Box::new(callee), type_args: vec![], args },
    )
}

pub fn call_t(callee: Expression, type_args: Vec<TypeExpr>, args: Vec<Expression>) -> Expression {
    Expression::new(sp(), ExprKind::Call { callee: Box::new(callee), type_args, args })
}

pub fn ctor(ty: TypeExpr, args: Vec<Expression>) -> Expression {
    Expression::new(sp(), ExprKind::ConstructorCall { ty, args })
}

pub fn cast(target: TypeExpr, operand: Expression) -> Expression {
    Expression::new(sp(), ExprKind::Cast { target, operand: Box::new(operand) })
}

pub fn slice(base: Expression, high: i128, low: i128) -> Expression {
    Expression::new(
        sp(),
        ExprKind::Slice {
            base: Box::new(base),
            high: Box::new(cst(high)),
            low: Box::new(cst(low)),
        },
    )
}

pub fn index(base: Expression, i: Expression) -> Expression {
    Expression::new(sp(), ExprKind::Index { base: Box::new(base), index: Box::new(i) })
}

pub fn mux(condition: Expression, on_true: Expression, on_false: Expression) -> Expression {
    Expression::new(
        sp(),
        ExprKind::Mux {
            condition: Box::new(condition),
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
        },
    )
}

pub fn list(items: Vec<Expression>) -> Expression {
    Expression::new(sp(), ExprKind::List(items))
}

pub fn select(scrutinee: Vec<Expression>, cases: Vec<(Expression, &str)>) -> Expression {
    let cases = cases
        .into_iter()
        .map(|(keyset, state)| SelectCase {
            id: NodeId::fresh(),
            span: sp(),
            keyset,
            state: Box::new(path(state)),
        })
        .collect();
    Expression::new(sp(), ExprKind::Select { scrutinee, cases })
}

pub fn default_expr() -> Expression {
    Expression::new(sp(), ExprKind::Default)
}

pub fn this_expr() -> Expression {
    Expression::new(sp(), ExprKind::This)
}

// ── Statement builders ─────────────────────────────────────────────────

pub fn assign(target: Expression, value: Expression) -> Statement {
    Statement::new(sp(), StmtKind::Assignment { target, value })
}

pub fn block(stmts: Vec<Statement>) -> Statement {
    Statement::new(sp(), StmtKind::Block(stmts))
}

pub fn if_s(condition: Expression, then_branch: Statement) -> Statement {
    Statement::new(
        sp(),
        StmtKind::If { condition, then_branch: Box::new(then_branch), else_branch: None },
    )
}

pub fn switch_s(expression: Expression, cases: Vec<(Expression, Option<Statement>)>) -> Statement {
    let cases = cases
        .into_iter()
        .map(|(label, body)| SwitchCase { id: NodeId::fresh(), span: sp(), label, body })
        .collect();
    Statement::new(sp(), StmtKind::Switch { expression, cases })
}

pub fn ret(e: Option<Expression>) -> Statement {
    Statement::new(sp(), StmtKind::Return(e))
}

pub fn call_stmt(e: Expression) -> Statement {
    Statement::new(sp(), StmtKind::Call(e))
}

pub fn decl_stmt(d: Declaration) -> Statement {
    Statement::new(sp(), StmtKind::Declaration(Box::new(d)))
}

// ── Declaration builders ───────────────────────────────────────────────

pub fn param(direction: Direction, ty: TypeExpr, name: &str) -> Parameter {
    Parameter {
        id: NodeId::fresh(),
        span: sp(),
        annotations: vec![],
        direction,
        ty,
        name: name.into(),
    }
}

pub fn tparam(name: &str) -> TypeParam {
    TypeParam { id: NodeId::fresh(), span: sp(), name: name.into() }
}

pub fn const_d(name: &str, ty: TypeExpr, initializer: Expression) -> Declaration {
    Declaration::new(sp(), DeclKind::Constant { name: name.into(), ty, initializer })
}

pub fn var_d(name: &str, ty: TypeExpr, initializer: Option<Expression>) -> Declaration {
    Declaration::new(sp(), DeclKind::Variable { name: name.into(), ty, initializer })
}

pub fn instance(name: &str, ty: TypeExpr, args: Vec<Expression>) -> Declaration {
    Declaration::new(
        sp(),
        DeclKind::Instance { name: name.into(), ty, args, initializer: None },
    )
}

pub fn instance_init(
    name: &str,
    ty: TypeExpr,
    args: Vec<Expression>,
    initializer: Vec<Declaration>,
) -> Declaration {
    Declaration::new(
        sp(),
        DeclKind::Instance { name: name.into(), ty, args, initializer: Some(initializer) },
    )
}

fn object(name: &str, type_params: Vec<TypeParam>, params: Vec<Parameter>) -> ObjectType {
    ObjectType { id: NodeId::fresh(), span: sp(), name: name.into(), type_params, params }
}

pub fn parser_type(name: &str, params: Vec<Parameter>) -> Declaration {
    Declaration::new(sp(), DeclKind::ParserType(object(name, vec![], params)))
}

pub fn control_type(name: &str, params: Vec<Parameter>) -> Declaration {
    Declaration::new(sp(), DeclKind::ControlType(object(name, vec![], params)))
}

pub fn package_d(name: &str, params: Vec<Parameter>) -> Declaration {
    Declaration::new(sp(), DeclKind::Package(object(name, vec![], params)))
}

pub fn control(name: &str, params: Vec<Parameter>, locals: Vec<Declaration>, body: Statement) -> Declaration {
    Declaration::new(
        sp(),
        DeclKind::Control {
            object: object(name, vec![], params),
            ctor_params: vec![],
            locals,
            body,
        },
    )
}

pub fn parser(
    name: &str,
    params: Vec<Parameter>,
    locals: Vec<Declaration>,
    states: Vec<ParserState>,
) -> Declaration {
    Declaration::new(
        sp(),
        DeclKind::Parser {
            object: object(name, vec![], params),
            ctor_params: vec![],
            locals,
            states,
        },
    )
}

pub fn state(name: &str, statements: Vec<Statement>, transition: Option<Expression>) -> ParserState {
    ParserState { id: NodeId::fresh(), span: sp(), name: name.into(), statements, transition }
}

pub fn method_proto(name: &str, return_type: Option<TypeExpr>, params: Vec<Parameter>) -> MethodProto {
    MethodProto {
        id: NodeId::fresh(),
        span: sp(),
        name: name.into(),
        is_abstract: false,
        type_params: vec![],
        return_type,
        params,
    }
}

pub fn abstract_proto(name: &str, return_type: TypeExpr, params: Vec<Parameter>) -> MethodProto {
    MethodProto {
        id: NodeId::fresh(),
        span: sp(),
        name: name.into(),
        is_abstract: true,
        type_params: vec![],
        return_type: Some(return_type),
        params,
    }
}

pub fn extern_obj(name: &str, methods: Vec<MethodProto>) -> Declaration {
    Declaration::new(
        sp(),
        DeclKind::Extern { name: name.into(), type_params: vec![], methods },
    )
}

pub fn extern_func(
    name: &str,
    type_params: Vec<TypeParam>,
    return_type: TypeExpr,
    params: Vec<Parameter>,
) -> Declaration {
    Declaration::new(
        sp(),
        DeclKind::ExternFunction(MethodProto {
            id: NodeId::fresh(),
            span: sp(),
            name: name.into(),
            is_abstract: false,
            type_params,
            return_type: Some(return_type),
            params,
        }),
    )
}

pub fn function_d(
    name: &str,
    return_type: TypeExpr,
    params: Vec<Parameter>,
    body: Statement,
) -> Declaration {
    Declaration::new(
        sp(),
        DeclKind::Function {
            name: name.into(),
            type_params: vec![],
            return_type,
            params,
            body,
        },
    )
}

pub fn action_d(name: &str, params: Vec<Parameter>, body: Statement) -> Declaration {
    Declaration::new(sp(), DeclKind::Action { name: name.into(), params, body })
}

pub fn table_d(name: &str, properties: Vec<Property>) -> Declaration {
    Declaration::new(sp(), DeclKind::Table { name: name.into(), properties })
}

pub fn actions_prop(entries: Vec<Expression>) -> Property {
    let refs = entries
        .into_iter()
        .map(|expression| ActionRef { id: NodeId::fresh(), span: sp(), expression })
        .collect();
    Property {
        id: NodeId::fresh(),
        span: sp(),
        name: Property::ACTIONS.into(),
        value: PropertyValue::Actions(refs),
    }
}

pub fn key_prop(entries: Vec<(Expression, &str)>) -> Property {
    let elems = entries
        .into_iter()
        .map(|(expression, kind)| KeyElement {
            id: NodeId::fresh(),
            span: sp(),
            expression,
            match_kind: path(kind),
        })
        .collect();
    Property {
        id: NodeId::fresh(),
        span: sp(),
        name: Property::KEY.into(),
        value: PropertyValue::Key(elems),
    }
}

pub fn default_action_prop(e: Expression) -> Property {
    Property {
        id: NodeId::fresh(),
        span: sp(),
        name: Property::DEFAULT_ACTION.into(),
        value: PropertyValue::Expression(e),
    }
}

fn members(names: Vec<&str>) -> Vec<EnumMember> {
    names
        .into_iter()
        .map(|n| EnumMember { id: NodeId::fresh(), span: sp(), name: n.into() })
        .collect()
}

pub fn enum_d(name: &str, names: Vec<&str>) -> Declaration {
    Declaration::new(sp(), DeclKind::Enum { name: name.into(), members: members(names) })
}

pub fn errors_d(names: Vec<&str>) -> Declaration {
    Declaration::new(sp(), DeclKind::Errors { members: members(names) })
}

pub fn match_kinds_d(names: Vec<&str>) -> Declaration {
    Declaration::new(sp(), DeclKind::MatchKinds { members: members(names) })
}

fn fields(entries: Vec<(&str, TypeExpr)>) -> Vec<StructField> {
    entries
        .into_iter()
        .map(|(name, ty)| StructField {
            id: NodeId::fresh(),
            span: sp(),
            annotations: vec![],
            name: name.into(),
            ty,
        })
        .collect()
}

pub fn struct_d(name: &str, entries: Vec<(&str, TypeExpr)>) -> Declaration {
    Declaration::new(sp(), DeclKind::Struct { name: name.into(), fields: fields(entries) })
}

pub fn header_d(name: &str, entries: Vec<(&str, TypeExpr)>) -> Declaration {
    Declaration::new(sp(), DeclKind::Header { name: name.into(), fields: fields(entries) })
}

pub fn union_d(name: &str, entries: Vec<(&str, TypeExpr)>) -> Declaration {
    Declaration::new(sp(), DeclKind::HeaderUnion { name: name.into(), fields: fields(entries) })
}

pub fn typedef_d(name: &str, ty: TypeExpr) -> Declaration {
    Declaration::new(sp(), DeclKind::Typedef { name: name.into(), ty })
}

pub fn program(declarations: Vec<Declaration>) -> Program {
    Program::new(declarations)
}

// ── Name binding ───────────────────────────────────────────────────────

struct Binder {
    map: ReferenceMap,
    scopes: Vec<FxHashMap<String, Referent>>,
}

/// Resolve every name use in `program`, the way the upstream resolution
/// pass would, and return the populated reference map.
pub fn bind(program: &Program) -> ReferenceMap {
    let mut binder = Binder { map: ReferenceMap::new(), scopes: vec![FxHashMap::default()] };
    for d in &program.declarations {
        binder.declare(d);
    }
    for d in &program.declarations {
        binder.decl(d);
    }
    binder.map
}

impl Binder {
    fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn insert(&mut self, name: &str, referent: Referent) {
        self.scopes.last_mut().unwrap().insert(name.to_string(), referent);
    }

    fn lookup(&self, name: &str) -> Option<Referent> {
        self.scopes.iter().rev().find_map(|s| s.get(name)).cloned()
    }

    fn declare(&mut self, d: &Declaration) {
        let kind = match &d.kind {
            DeclKind::Constant { .. } => ReferentKind::Constant,
            DeclKind::Variable { .. } => ReferentKind::Variable,
            DeclKind::Instance { .. } => ReferentKind::Instance,
            DeclKind::ParserType(_)
            | DeclKind::ControlType(_)
            | DeclKind::Package(_)
            | DeclKind::Parser { .. }
            | DeclKind::Control { .. }
            | DeclKind::Extern { .. }
            | DeclKind::Enum { .. }
            | DeclKind::Struct { .. }
            | DeclKind::Header { .. }
            | DeclKind::HeaderUnion { .. }
            | DeclKind::Typedef { .. } => ReferentKind::Type,
            DeclKind::ExternFunction(_) => ReferentKind::Method,
            DeclKind::Function { .. } => ReferentKind::Function,
            DeclKind::Action { .. } => ReferentKind::Action,
            DeclKind::Table { .. } => ReferentKind::Table,
            DeclKind::Errors { .. } => {
                self.insert(
                    "error",
                    Referent { decl: d.id, kind: ReferentKind::Type, name: "error".into() },
                );
                return;
            }
            DeclKind::MatchKinds { members } => {
                for m in members {
                    self.insert(
                        &m.name,
                        Referent {
                            decl: m.id,
                            kind: ReferentKind::MatchKindMember,
                            name: m.name.clone(),
                        },
                    );
                }
                return;
            }
        };
        if let Some(name) = d.name() {
            let name = name.to_string();
            self.insert(&name, Referent { decl: d.id, kind, name: name.clone() });
        }
    }

    fn declare_params(&mut self, params: &[Parameter]) {
        for p in params {
            self.type_expr(&p.ty);
            self.insert(
                &p.name,
                Referent {
                    decl: p.id,
                    kind: ReferentKind::Parameter(p.direction),
                    name: p.name.clone(),
                },
            );
        }
    }

    fn declare_type_params(&mut self, type_params: &[TypeParam]) {
        for tp in type_params {
            self.insert(
                &tp.name,
                Referent { decl: tp.id, kind: ReferentKind::TypeParam, name: tp.name.clone() },
            );
        }
    }

    fn decl(&mut self, d: &Declaration) {
        match &d.kind {
            DeclKind::Constant { ty, initializer, .. } => {
                self.type_expr(ty);
                self.expr(initializer);
            }
            DeclKind::Variable { ty, initializer, .. } => {
                self.type_expr(ty);
                if let Some(init) = initializer {
                    self.expr(init);
                }
            }
            DeclKind::Instance { ty, args, initializer, .. } => {
                self.type_expr(ty);
                for a in args {
                    self.expr(a);
                }
                if let Some(decls) = initializer {
                    for f in decls {
                        self.decl(f);
                    }
                }
            }
            DeclKind::ParserType(o) | DeclKind::ControlType(o) | DeclKind::Package(o) => {
                self.push();
                self.declare_type_params(&o.type_params);
                self.declare_params(&o.params);
                self.pop();
            }
            DeclKind::Parser { object, ctor_params, locals, states } => {
                self.push();
                self.declare_type_params(&object.type_params);
                self.declare_params(&object.params);
                self.declare_params(ctor_params);
                for l in locals {
                    self.declare(l);
                }
                for s in states {
                    self.insert(
                        &s.name,
                        Referent { decl: s.id, kind: ReferentKind::State, name: s.name.clone() },
                    );
                }
                for l in locals {
                    self.decl(l);
                }
                for s in states {
                    for stmt in &s.statements {
                        self.stmt(stmt);
                    }
                    if let Some(t) = &s.transition {
                        self.expr(t);
                    }
                }
                self.pop();
            }
            DeclKind::Control { object, ctor_params, locals, body } => {
                self.push();
                self.declare_type_params(&object.type_params);
                self.declare_params(&object.params);
                self.declare_params(ctor_params);
                for l in locals {
                    self.declare(l);
                }
                for l in locals {
                    self.decl(l);
                }
                self.stmt(body);
                self.pop();
            }
            DeclKind::Extern { type_params, methods, .. } => {
                self.push();
                self.declare_type_params(type_params);
                for m in methods {
                    self.push();
                    self.declare_type_params(&m.type_params);
                    if let Some(rt) = &m.return_type {
                        self.type_expr(rt);
                    }
                    for p in &m.params {
                        self.type_expr(&p.ty);
                    }
                    self.pop();
                }
                self.pop();
            }
            DeclKind::ExternFunction(proto) => {
                self.push();
                self.declare_type_params(&proto.type_params);
                if let Some(rt) = &proto.return_type {
                    self.type_expr(rt);
                }
                for p in &proto.params {
                    self.type_expr(&p.ty);
                }
                self.pop();
            }
            DeclKind::Function { type_params, return_type, params, body, .. } => {
                self.push();
                self.declare_type_params(type_params);
                self.type_expr(return_type);
                self.declare_params(params);
                self.stmt(body);
                self.pop();
            }
            DeclKind::Action { params, body, .. } => {
                self.push();
                self.declare_params(params);
                self.stmt(body);
                self.pop();
            }
            DeclKind::Table { properties, .. } => {
                for prop in properties {
                    match &prop.value {
                        PropertyValue::Actions(refs) => {
                            for r in refs {
                                self.expr(&r.expression);
                            }
                        }
                        PropertyValue::Key(elems) => {
                            for k in elems {
                                self.expr(&k.expression);
                                self.expr(&k.match_kind);
                            }
                        }
                        PropertyValue::Expression(e) => self.expr(e),
                    }
                }
            }
            DeclKind::Enum { .. } | DeclKind::Errors { .. } | DeclKind::MatchKinds { .. } => {}
            DeclKind::Struct { fields, .. }
            | DeclKind::Header { fields, .. }
            | DeclKind::HeaderUnion { fields, .. } => {
                for f in fields {
                    self.type_expr(&f.ty);
                }
            }
            DeclKind::Typedef { ty, .. } => self.type_expr(ty),
        }
    }

    fn stmt(&mut self, s: &Statement) {
        match &s.kind {
            StmtKind::Block(stmts) => {
                self.push();
                for s in stmts {
                    if let StmtKind::Declaration(d) = &s.kind {
                        self.declare(d);
                        self.decl(d);
                    } else {
                        self.stmt(s);
                    }
                }
                self.pop();
            }
            StmtKind::If { condition, then_branch, else_branch } => {
                self.expr(condition);
                self.stmt(then_branch);
                if let Some(e) = else_branch {
                    self.stmt(e);
                }
            }
            StmtKind::Switch { expression, cases } => {
                self.expr(expression);
                for c in cases {
                    self.expr(&c.label);
                    if let Some(b) = &c.body {
                        self.stmt(b);
                    }
                }
            }
            StmtKind::Assignment { target, value } => {
                self.expr(target);
                self.expr(value);
            }
            StmtKind::Call(e) => self.expr(e),
            StmtKind::Return(e) => {
                if let Some(e) = e {
                    self.expr(e);
                }
            }
            StmtKind::Declaration(d) => {
                self.declare(d);
                self.decl(d);
            }
            StmtKind::Empty => {}
        }
    }

    fn expr(&mut self, e: &Expression) {
        match &e.kind {
            ExprKind::Path(p) => {
                if let Some(referent) = self.lookup(&p.name) {
                    self.map.bind(e.id, referent);
                }
            }
            ExprKind::Constant { .. }
            | ExprKind::BoolLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::Default
            | ExprKind::This => {}
            ExprKind::Member { base, .. } => self.expr(base),
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Mux { condition, on_true, on_false } => {
                self.expr(condition);
                self.expr(on_true);
                self.expr(on_false);
            }
            ExprKind::Cast { target, operand } => {
                self.type_expr(target);
                self.expr(operand);
            }
            ExprKind::Slice { base, high, low } => {
                self.expr(base);
                self.expr(high);
                self.expr(low);
            }
            ExprKind::Index { base, index } => {
                self.expr(base);
                self.expr(index);
            }
            ExprKind::List(items) => {
                for i in items {
                    self.expr(i);
                }
            }
            ExprKind::Call { callee, type_args, args } => {
                self.expr(callee);
                for t in type_args {
                    self.type_expr(t);
                }
                for a in args {
                    self.expr(a);
                }
            }
            ExprKind::ConstructorCall { ty, args } => {
                self.type_expr(ty);
                for a in args {
                    self.expr(a);
                }
            }
            ExprKind::Select { scrutinee, cases } => {
                for s in scrutinee {
                    self.expr(s);
                }
                for c in cases {
                    self.expr(&c.keyset);
                    self.expr(&c.state);
                }
            }
        }
    }

    fn type_expr(&mut self, t: &TypeExpr) {
        match &t.kind {
            TypeExprKind::Name(p) => {
                if let Some(referent) = self.lookup(&p.name) {
                    self.map.bind(t.id, referent);
                }
            }
            TypeExprKind::Specialized { base, args } => {
                if let Some(referent) = self.lookup(&base.name) {
                    self.map.bind(t.id, referent);
                }
                for a in args {
                    self.type_expr(a);
                }
            }
            TypeExprKind::Tuple(items) => {
                for i in items {
                    self.type_expr(i);
                }
            }
            TypeExprKind::Stack { element, size } => {
                self.type_expr(element);
                self.expr(size);
            }
            _ => {}
        }
    }
}

// ── Checking helpers ───────────────────────────────────────────────────

/// Bind and type-check a program built from `declarations`.
pub fn check_program(declarations: Vec<Declaration>) -> TypeckResult {
    let p = program(declarations);
    let map = bind(&p);
    check(p, &map, &Options::default())
}

pub fn assert_ok(result: &TypeckResult) {
    assert!(
        !result.has_errors(),
        "expected no type errors, got: {:#?}",
        result.diagnostics
    );
}

pub fn assert_error_containing(result: &TypeckResult, needle: &str) {
    assert!(
        result.diagnostics.iter().any(|d| d.message.contains(needle)),
        "expected an error containing {:?}, got: {:#?}",
        needle,
        result.diagnostics
    );
}
