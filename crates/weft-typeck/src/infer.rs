//! The type inference traversal.
//!
//! A strictly sequential post-order walk over the program that assigns a
//! canonical type to every declaration and expression, verifies the
//! semantic rules, and rewrites the tree to make inferred information
//! explicit: width-unknown integer literals are narrowed to sized bit
//! types, and implicit casts are inserted where an assignment admits one.
//!
//! Nodes that already carry a registry entry are skipped, so re-running
//! the traversal over an already-typed tree is a no-op and the walk
//! composes idempotently with other passes.

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use weft_ast::ast::{
    ActionRef, BinaryOp, BitWidth, Declaration, DeclKind, Direction, ExprKind, Expression,
    KeyElement, NodeId, ObjectType as AstObjectType, Parameter, ParserState, Path, Program,
    Property, PropertyValue, SelectCase, Statement, StmtKind, SwitchCase, TypeExpr, TypeExprKind,
    TypeParam, UnaryOp,
};
use weft_ast::refmap::{ReferenceMap, ReferentKind};
use weft_ast::span::Span;

use crate::builtins;
use crate::error::{ErrorCategory, Reporter};
use crate::subst::{substitute_constants, Substitution};
use crate::syntactic::SameExpression;
use crate::ty::{
    ActionType, EnumMemberRef, EnumType, ErrorType, ExternMethod, ExternType, Field, MethodType,
    ObjectType, Param, SpecializedType, StackType, StructType, TableType, Type, TypeVar,
};
use crate::typemap::TypeMap;
use crate::unify::{ArgInfo, CallType, Constraints};

/// What the traversal is currently inside of; consulted by the
/// context-sensitive rules.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Frame {
    Parser,
    Control,
    Action,
    Function(NodeId),
    Instance(NodeId),
    ActionsProperty,
}

/// Which kind of object type a declaration header introduces.
#[derive(Debug, Clone, Copy)]
enum ObjectKind {
    Parser,
    Control,
    Package,
}

pub struct TypeInference<'a> {
    pub(crate) refmap: &'a ReferenceMap,
    pub(crate) typemap: &'a mut TypeMap,
    pub(crate) reporter: &'a mut Reporter,
    /// Expected argument counts of the call expressions currently being
    /// visited; the top drives overload-by-arity resolution on extern
    /// receivers.
    method_arguments: Vec<usize>,
    frames: Vec<Frame>,
    span: Span,
}

impl<'a> TypeInference<'a> {
    pub fn new(refmap: &'a ReferenceMap, typemap: &'a mut TypeMap, reporter: &'a mut Reporter) -> Self {
        TypeInference {
            refmap,
            typemap,
            reporter,
            method_arguments: Vec::new(),
            frames: Vec::new(),
            span: Span::synthesized(),
        }
    }

    /// Run inference over a whole program, producing the rewritten tree.
    pub fn run(&mut self, program: Program) -> Program {
        if let Err(missing) = self.refmap.validate(&program) {
            for (_, name) in missing {
                self.reporter.type_error(
                    program.span,
                    ErrorCategory::Inference,
                    format!("name {} has not been resolved", name),
                );
            }
            return program;
        }
        debug!("type inference over {} top-level declaration(s)", program.declarations.len());
        let declarations = program
            .declarations
            .into_iter()
            .map(|d| self.declaration(d))
            .collect();
        Program { id: program.id, span: program.span, declarations }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.span
    }

    fn done(&self, node: NodeId) -> bool {
        self.typemap.contains(node)
    }

    fn get_type(&self, node: NodeId) -> Option<Type> {
        self.typemap.get_type(node).cloned()
    }

    fn error(&mut self, span: Span, category: ErrorCategory, message: String) {
        self.reporter.type_error(span, category, message);
    }

    fn in_parser(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Parser))
    }

    fn in_control(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Control))
    }

    fn in_action(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Action))
    }

    fn in_actions_list(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::ActionsProperty))
    }

    fn enclosing_function(&self) -> Option<NodeId> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Function(id) => Some(*id),
            _ => None,
        })
    }

    fn instance_context(&self) -> Option<NodeId> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Instance(id) => Some(*id),
            _ => None,
        })
    }

    /// Unify `src` into `dest`, recording solved bindings in the registry.
    fn unify_types(&mut self, span: Span, dest: &Type, src: &Type, report: bool) -> Option<Substitution> {
        if dest == src {
            return Some(Substitution::new());
        }
        let mut constraints = Constraints::new();
        constraints.add_equality(dest.clone(), src.clone());
        let tvs = constraints.solve(span, self.reporter, report)?;
        self.typemap.add_substitutions(&tvs);
        Some(tvs)
    }

    // ── Declarations ───────────────────────────────────────────────────

    fn declaration(&mut self, decl: Declaration) -> Declaration {
        let Declaration { id, span, kind } = decl;
        self.span = span;
        let kind = match kind {
            DeclKind::Constant { name, ty, initializer } => {
                self.constant_decl(id, span, name, ty, initializer)
            }
            DeclKind::Variable { name, ty, initializer } => {
                self.variable_decl(id, span, name, ty, initializer)
            }
            DeclKind::Instance { name, ty, args, initializer } => {
                self.instance_decl(id, span, name, ty, args, initializer)
            }
            DeclKind::ParserType(object) => {
                self.object_type_decl(id, &object, ObjectKind::Parser);
                DeclKind::ParserType(object)
            }
            DeclKind::ControlType(object) => {
                self.object_type_decl(id, &object, ObjectKind::Control);
                DeclKind::ControlType(object)
            }
            DeclKind::Package(object) => {
                self.object_type_decl(id, &object, ObjectKind::Package);
                DeclKind::Package(object)
            }
            DeclKind::Parser { object, ctor_params, locals, states } => {
                self.parser_decl(id, object, ctor_params, locals, states)
            }
            DeclKind::Control { object, ctor_params, locals, body } => {
                self.control_decl(id, object, ctor_params, locals, body)
            }
            DeclKind::Extern { name, type_params, methods } => {
                self.extern_decl(id, span, name, type_params, methods)
            }
            DeclKind::ExternFunction(proto) => {
                if !self.done(id) {
                    let tvs = self.declare_type_params(&proto.type_params);
                    let ret = match &proto.return_type {
                        Some(rt) => self.type_expr(rt),
                        None => Some(Type::Void),
                    };
                    let params = self.parameters(&proto.params);
                    if let (Some(ret), Some(params)) = (ret, params) {
                        let ty = Type::Method(MethodType {
                            type_params: tvs,
                            ret: Some(Box::new(ret)),
                            params,
                        });
                        if let Some(canon) = self.canonicalize(&ty) {
                            self.typemap.set_type(id, canon.clone());
                            if !self.done(proto.id) {
                                self.typemap.set_type(proto.id, canon);
                            }
                        }
                    }
                }
                DeclKind::ExternFunction(proto)
            }
            DeclKind::Function { name, type_params, return_type, params, body } => {
                self.function_decl(id, name, type_params, return_type, params, body)
            }
            DeclKind::Action { name, params, body } => self.action_decl(id, name, params, body),
            DeclKind::Table { name, properties } => self.table_decl(id, name, properties),
            DeclKind::Enum { name, members } => {
                if !self.done(id) {
                    let ty = Type::Enum(EnumType {
                        decl: id,
                        name: name.clone(),
                        members: member_refs(&members),
                    });
                    self.typemap.set_type(id, Type::TypeOfType(Box::new(ty.clone())));
                    for m in &members {
                        if !self.done(m.id) {
                            self.typemap.set_type(m.id, ty.clone());
                        }
                    }
                }
                DeclKind::Enum { name, members }
            }
            DeclKind::Errors { members } => {
                if !self.done(id) {
                    let ty = Type::Error(ErrorType { decl: id, members: member_refs(&members) });
                    self.typemap.set_type(id, Type::TypeOfType(Box::new(ty.clone())));
                    for m in &members {
                        if !self.done(m.id) {
                            self.typemap.set_type(m.id, ty.clone());
                        }
                    }
                }
                DeclKind::Errors { members }
            }
            DeclKind::MatchKinds { members } => {
                if !self.done(id) {
                    self.typemap.set_type(id, Type::TypeOfType(Box::new(Type::MatchKind)));
                    for m in &members {
                        if !self.done(m.id) {
                            self.typemap.set_type(m.id, Type::MatchKind);
                        }
                    }
                }
                DeclKind::MatchKinds { members }
            }
            DeclKind::Struct { name, fields } => {
                self.struct_like_decl(id, span, &name, &fields, StructVariant::Struct);
                DeclKind::Struct { name, fields }
            }
            DeclKind::Header { name, fields } => {
                self.struct_like_decl(id, span, &name, &fields, StructVariant::Header);
                DeclKind::Header { name, fields }
            }
            DeclKind::HeaderUnion { name, fields } => {
                self.struct_like_decl(id, span, &name, &fields, StructVariant::Union);
                DeclKind::HeaderUnion { name, fields }
            }
            DeclKind::Typedef { name, ty } => {
                if !self.done(id) {
                    if let Some(t) = self.type_expr(&ty) {
                        self.typemap.set_type(id, Type::TypeOfType(Box::new(t)));
                    }
                }
                DeclKind::Typedef { name, ty }
            }
        };
        Declaration { id, span, kind }
    }

    fn constant_decl(
        &mut self,
        id: NodeId,
        span: Span,
        name: String,
        ty: TypeExpr,
        initializer: Expression,
    ) -> DeclKind {
        let initializer = self.expression(initializer);
        if self.done(id) {
            return DeclKind::Constant { name, ty, initializer };
        }
        let Some(t) = self.type_expr(&ty) else {
            return DeclKind::Constant { name, ty, initializer };
        };
        if matches!(t.strip_specialized(), Type::Extern(_)) {
            self.error(
                span,
                ErrorCategory::Capability,
                format!("cannot declare constant {} of an extern type", name),
            );
        }
        if !self.typemap.is_compile_time_constant(initializer.id) {
            self.error(
                initializer.span,
                ErrorCategory::Capability,
                "cannot evaluate initializer to a compile-time constant".into(),
            );
        }
        let initializer = self.assignment(span, &t, initializer);
        self.typemap.set_type(id, t);
        DeclKind::Constant { name, ty, initializer }
    }

    fn variable_decl(
        &mut self,
        id: NodeId,
        span: Span,
        name: String,
        ty: TypeExpr,
        initializer: Option<Expression>,
    ) -> DeclKind {
        let initializer = initializer.map(|e| self.expression(e));
        if self.done(id) {
            return DeclKind::Variable { name, ty, initializer };
        }
        let Some(t) = self.type_expr(&ty) else {
            return DeclKind::Variable { name, ty, initializer };
        };
        if t.type_params().is_some_and(|tps| !tps.is_empty()) {
            self.error(
                span,
                ErrorCategory::Inference,
                format!("unspecified type parameters for {}", name),
            );
            return DeclKind::Variable { name, ty, initializer };
        }
        let initializer = initializer.map(|e| self.assignment(span, &t, e));
        self.typemap.set_type(id, t);
        DeclKind::Variable { name, ty, initializer }
    }

    fn instance_decl(
        &mut self,
        id: NodeId,
        span: Span,
        name: String,
        ty: TypeExpr,
        args: Vec<Expression>,
        initializer: Option<Vec<Declaration>>,
    ) -> DeclKind {
        if self.done(id) {
            return DeclKind::Instance { name, ty, args, initializer };
        }
        let mut args: Vec<Expression> = args.into_iter().map(|a| self.expression(a)).collect();
        let Some(t) = self.type_expr(&ty) else {
            return DeclKind::Instance { name, ty, args, initializer };
        };
        let simple = t.strip_specialized().clone();
        let mut initializer = initializer;
        match &simple {
            Type::Extern(ext) => {
                self.typemap.set_type(id, t.clone());
                // The initializer is checked with the instance in scope so
                // `this` can find it.
                initializer = initializer.map(|decls| {
                    self.frames.push(Frame::Instance(id));
                    let decls: Vec<Declaration> =
                        decls.into_iter().map(|d| self.declaration(d)).collect();
                    self.frames.pop();
                    decls
                });
                let ext = ext.clone();
                if self.check_abstract_methods(span, initializer.as_deref(), &ext) {
                    self.check_extern_constructor(span, &ext, &mut args);
                }
            }
            _ if simple.is_container() => {
                if initializer.is_some() {
                    self.error(
                        span,
                        ErrorCategory::Context,
                        "initializers are only allowed for extern instances".into(),
                    );
                }
                if let Some(inst_ty) = self.container_instantiation(span, &args, &simple) {
                    self.typemap.set_type(id, inst_ty);
                }
            }
            _ => {
                self.error(
                    span,
                    ErrorCategory::Context,
                    format!("cannot allocate objects of type {}", t),
                );
            }
        }
        DeclKind::Instance { name, ty, args, initializer }
    }

    fn object_type_decl(&mut self, id: NodeId, object: &AstObjectType, kind: ObjectKind) {
        if self.done(id) {
            return;
        }
        let type_params = self.declare_type_params(&object.type_params);
        let Some(params) = self.parameters(&object.params) else { return };
        let ty = match kind {
            ObjectKind::Parser => Type::Parser(ObjectType {
                decl: id,
                name: object.name.clone(),
                type_params,
                params,
                ctor_params: None,
            }),
            ObjectKind::Control => Type::Control(ObjectType {
                decl: id,
                name: object.name.clone(),
                type_params,
                params,
                ctor_params: None,
            }),
            ObjectKind::Package => Type::Package(ObjectType {
                decl: id,
                name: object.name.clone(),
                type_params,
                params: Vec::new(),
                ctor_params: Some(params),
            }),
        };
        let Some(canon) = self.canonicalize(&ty) else { return };
        if let Type::Package(pkg) = &canon {
            // Packages may be parameterized by parser and control types,
            // but not by their definitions.
            if let Some(ctor) = &pkg.ctor_params {
                for p in ctor {
                    if let Type::Parser(o) | Type::Control(o) = p.ty.strip_specialized() {
                        if o.ctor_params.is_some() {
                            self.reporter.type_error(
                                object.span,
                                ErrorCategory::Capability,
                                format!("invalid package parameter type for {}", p.name),
                            );
                        }
                    }
                }
            }
        }
        self.typemap.set_type(id, Type::TypeOfType(Box::new(canon.clone())));
        if object.id != id {
            self.typemap.set_type(object.id, Type::TypeOfType(Box::new(canon)));
        }
    }

    fn parser_decl(
        &mut self,
        id: NodeId,
        object: AstObjectType,
        ctor_params: Vec<Parameter>,
        locals: Vec<Declaration>,
        states: Vec<ParserState>,
    ) -> DeclKind {
        if self.done(id) {
            return DeclKind::Parser { object, ctor_params, locals, states };
        }
        let type_params = self.declare_type_params(&object.type_params);
        let apply_params = self.parameters(&object.params);
        let cparams = self.parameters(&ctor_params);
        if let (Some(apply_params), Some(cparams)) = (apply_params, cparams) {
            let ty = Type::Parser(ObjectType {
                decl: id,
                name: object.name.clone(),
                type_params,
                params: apply_params,
                ctor_params: Some(cparams),
            });
            if let Some(canon) = self.canonicalize(&ty) {
                self.typemap.set_type(id, Type::TypeOfType(Box::new(canon.clone())));
                self.typemap.set_type(object.id, Type::TypeOfType(Box::new(canon)));
            }
        }
        self.frames.push(Frame::Parser);
        let locals: Vec<Declaration> = locals.into_iter().map(|d| self.declaration(d)).collect();
        let states: Vec<ParserState> = states.into_iter().map(|s| self.parser_state(s)).collect();
        self.frames.pop();
        DeclKind::Parser { object, ctor_params, locals, states }
    }

    fn parser_state(&mut self, state: ParserState) -> ParserState {
        let statements: Vec<Statement> =
            state.statements.into_iter().map(|s| self.statement(s)).collect();
        let transition = state.transition.map(|e| self.expression(e));
        if !self.done(state.id) {
            self.typemap.set_type(state.id, Type::State);
        }
        ParserState { id: state.id, span: state.span, name: state.name, statements, transition }
    }

    fn control_decl(
        &mut self,
        id: NodeId,
        object: AstObjectType,
        ctor_params: Vec<Parameter>,
        locals: Vec<Declaration>,
        body: Statement,
    ) -> DeclKind {
        if self.done(id) {
            return DeclKind::Control { object, ctor_params, locals, body };
        }
        let type_params = self.declare_type_params(&object.type_params);
        let apply_params = self.parameters(&object.params);
        let cparams = self.parameters(&ctor_params);
        if let (Some(apply_params), Some(cparams)) = (apply_params, cparams) {
            let ty = Type::Control(ObjectType {
                decl: id,
                name: object.name.clone(),
                type_params,
                params: apply_params,
                ctor_params: Some(cparams),
            });
            if let Some(canon) = self.canonicalize(&ty) {
                self.typemap.set_type(id, Type::TypeOfType(Box::new(canon.clone())));
                self.typemap.set_type(object.id, Type::TypeOfType(Box::new(canon)));
            }
        }
        self.frames.push(Frame::Control);
        let locals: Vec<Declaration> = locals.into_iter().map(|d| self.declaration(d)).collect();
        let body = self.statement(body);
        self.frames.pop();
        DeclKind::Control { object, ctor_params, locals, body }
    }

    fn extern_decl(
        &mut self,
        id: NodeId,
        span: Span,
        name: String,
        type_params: Vec<TypeParam>,
        methods: Vec<weft_ast::ast::MethodProto>,
    ) -> DeclKind {
        if self.done(id) {
            return DeclKind::Extern { name, type_params, methods };
        }
        let tvs = self.declare_type_params(&type_params);
        let mut built = Vec::with_capacity(methods.len());
        let mut ok = true;
        for proto in &methods {
            let method_tvs = self.declare_type_params(&proto.type_params);
            let ret = match &proto.return_type {
                Some(rt) => match self.type_expr(rt) {
                    Some(t) => Some(Box::new(t)),
                    None => {
                        ok = false;
                        None
                    }
                },
                None => None,
            };
            match self.parameters(&proto.params) {
                Some(params) => {
                    let mt = MethodType { type_params: method_tvs, ret, params };
                    if !self.done(proto.id) {
                        self.typemap.set_type(proto.id, Type::Method(mt.clone()));
                    }
                    built.push(ExternMethod {
                        id: proto.id,
                        name: proto.name.clone(),
                        is_abstract: proto.is_abstract,
                        ty: mt,
                    });
                }
                None => ok = false,
            }
        }
        if ok {
            let ty = Type::Extern(ExternType {
                decl: id,
                name: name.clone(),
                type_params: tvs,
                methods: built,
            });
            if let Some(canon) = self.canonicalize(&ty) {
                if let Type::Extern(ext) = &canon {
                    for m in &ext.methods {
                        if m.name == ext.name && !m.ty.type_params.is_empty() {
                            self.reporter.type_error(
                                span,
                                ErrorCategory::Arity,
                                "constructors cannot have type parameters",
                            );
                        }
                    }
                }
                self.typemap.set_type(id, Type::TypeOfType(Box::new(canon)));
            }
        }
        DeclKind::Extern { name, type_params, methods }
    }

    fn function_decl(
        &mut self,
        id: NodeId,
        name: String,
        type_params: Vec<TypeParam>,
        return_type: TypeExpr,
        params: Vec<Parameter>,
        body: Statement,
    ) -> DeclKind {
        if self.done(id) {
            return DeclKind::Function { name, type_params, return_type, params, body };
        }
        let tvs = self.declare_type_params(&type_params);
        let ret = self.type_expr(&return_type);
        let ps = self.parameters(&params);
        if let (Some(ret), Some(ps)) = (ret, ps) {
            let ty = Type::Method(MethodType {
                type_params: tvs,
                ret: Some(Box::new(ret)),
                params: ps,
            });
            if let Some(canon) = self.canonicalize(&ty) {
                self.typemap.set_type(id, canon);
            }
        }
        self.frames.push(Frame::Function(id));
        let body = self.statement(body);
        self.frames.pop();
        DeclKind::Function { name, type_params, return_type, params, body }
    }

    fn action_decl(
        &mut self,
        id: NodeId,
        name: String,
        params: Vec<Parameter>,
        body: Statement,
    ) -> DeclKind {
        if self.done(id) {
            return DeclKind::Action { name, params, body };
        }
        if let Some(ps) = self.parameters(&params) {
            let mut found_directionless = false;
            for (ast_param, param) in params.iter().zip(&ps) {
                if matches!(param.ty.strip_specialized(), Type::Extern(_)) {
                    self.error(
                        ast_param.span,
                        ErrorCategory::Capability,
                        format!("action parameter {} cannot have an extern type", param.name),
                    );
                }
                if param.direction == Direction::None {
                    found_directionless = true;
                } else if found_directionless {
                    self.error(
                        ast_param.span,
                        ErrorCategory::Capability,
                        format!(
                            "direction-less action parameters have to be at the end, found {}",
                            param.name
                        ),
                    );
                }
            }
            self.typemap.set_type(id, Type::Action(ActionType { params: ps }));
        }
        self.frames.push(Frame::Action);
        let body = self.statement(body);
        self.frames.pop();
        DeclKind::Action { name, params, body }
    }

    fn table_decl(&mut self, id: NodeId, name: String, properties: Vec<Property>) -> DeclKind {
        if self.done(id) {
            return DeclKind::Table { name, properties };
        }
        let properties: Vec<Property> =
            properties.into_iter().map(|p| self.property(p)).collect();
        let mut actions = Vec::new();
        for prop in &properties {
            if let PropertyValue::Actions(refs) = &prop.value {
                for r in refs {
                    if let Some(referent) = self.action_ref_referent(&r.expression) {
                        actions.push(referent.name);
                    }
                }
            }
        }
        let table = TableType { decl: id, name: name.clone(), actions };
        self.check_default_action(&properties, &table);
        self.typemap.set_type(id, Type::Table(table));
        DeclKind::Table { name, properties }
    }

    fn property(&mut self, prop: Property) -> Property {
        let value = match prop.value {
            PropertyValue::Actions(refs) => {
                self.frames.push(Frame::ActionsProperty);
                let refs: Vec<ActionRef> = refs
                    .into_iter()
                    .map(|r| {
                        let expression = self.expression(r.expression);
                        if !self.done(r.id) {
                            if let Some(t) = self.get_type(expression.id) {
                                self.typemap.set_type(r.id, t);
                            }
                        }
                        ActionRef { id: r.id, span: r.span, expression }
                    })
                    .collect();
                self.frames.pop();
                PropertyValue::Actions(refs)
            }
            PropertyValue::Key(elems) => {
                let elems: Vec<KeyElement> = elems
                    .into_iter()
                    .map(|k| {
                        let expression = self.expression(k.expression);
                        let match_kind = self.expression(k.match_kind);
                        if let Some(kt) = self.get_type(expression.id) {
                            let scalar = matches!(
                                kt.strip_specialized(),
                                Type::Bits { .. } | Type::Enum(_) | Type::Error(_) | Type::Boolean
                            );
                            if !scalar {
                                self.error(
                                    expression.span,
                                    ErrorCategory::TypeMismatch,
                                    format!("key field type must be a scalar type, not {}", kt),
                                );
                            }
                        }
                        if let Some(mt) = self.get_type(match_kind.id) {
                            if mt != Type::MatchKind {
                                self.error(
                                    match_kind.span,
                                    ErrorCategory::TypeMismatch,
                                    "key match kind must be a match_kind value".into(),
                                );
                            }
                        }
                        KeyElement { id: k.id, span: k.span, expression, match_kind }
                    })
                    .collect();
                PropertyValue::Key(elems)
            }
            PropertyValue::Expression(e) => PropertyValue::Expression(self.expression(e)),
        };
        Property { id: prop.id, span: prop.span, name: prop.name, value }
    }

    /// The resolved declaration an actions-list entry names: either a bare
    /// path or the callee of a partial call.
    fn action_ref_referent(&self, expr: &Expression) -> Option<weft_ast::refmap::Referent> {
        match &expr.kind {
            ExprKind::Path(_) => self.refmap.get_declaration(expr.id).cloned(),
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Path(_) => self.refmap.get_declaration(callee.id).cloned(),
                _ => None,
            },
            _ => None,
        }
    }

    /// The `default_action` property must name an action from the `actions`
    /// list, with its bound data-plane arguments repeating the actions-list
    /// declaration verbatim.
    fn check_default_action(&mut self, properties: &[Property], table: &TableType) {
        let Some(prop) = properties.iter().find(|p| p.name == Property::DEFAULT_ACTION) else {
            return;
        };
        let PropertyValue::Expression(def) = &prop.value else {
            self.error(
                prop.span,
                ErrorCategory::TypeMismatch,
                format!("{} table property should be an action", Property::DEFAULT_ACTION),
            );
            return;
        };
        let Some(def_ty) = self.get_type(def.id) else { return };
        let Type::Action(at) = def_ty.strip_specialized() else {
            self.error(
                prop.span,
                ErrorCategory::TypeMismatch,
                format!("{} table property should be an action", Property::DEFAULT_ACTION),
            );
            return;
        };
        if !at.params.is_empty() {
            self.error(
                prop.span,
                ErrorCategory::Arity,
                format!("default action of table {} has unbound arguments", table.name),
            );
        }
        let actions = properties.iter().find_map(|p| match &p.value {
            PropertyValue::Actions(refs) if p.name == Property::ACTIONS => Some(refs),
            _ => None,
        });
        let Some(actions) = actions else {
            self.error(
                prop.span,
                ErrorCategory::Context,
                format!("table {} has a {} but no action list", table.name, Property::DEFAULT_ACTION),
            );
            return;
        };
        let ExprKind::Call { callee, args: def_args, .. } = &def.kind else {
            self.error(
                def.span,
                ErrorCategory::TypeMismatch,
                format!("{} table property should be an action call", Property::DEFAULT_ACTION),
            );
            return;
        };
        let Some(def_ref) = self.refmap.get_declaration(callee.id).cloned() else { return };
        let Some(element) = actions.iter().find(|r| {
            self.action_ref_referent(&r.expression)
                .is_some_and(|referent| referent.name == def_ref.name)
        }) else {
            self.error(
                def.span,
                ErrorCategory::Context,
                format!("{} is not present in the action list of table {}", def_ref.name, table.name),
            );
            return;
        };
        if let Some(elem_ref) = self.action_ref_referent(&element.expression) {
            if elem_ref.decl != def_ref.decl {
                self.error(
                    def.span,
                    ErrorCategory::Context,
                    format!("{} refers to a different action than the action list entry", def_ref.name),
                );
                return;
            }
        }
        let empty: Vec<Expression> = Vec::new();
        let list_args = match &element.expression.kind {
            ExprKind::Call { args, .. } => args,
            _ => &empty,
        };
        if list_args.len() > def_args.len() {
            self.error(
                def.span,
                ErrorCategory::Arity,
                format!("not enough arguments for the default action of table {}", table.name),
            );
            return;
        }
        let same = SameExpression::new(self.refmap);
        for (list_arg, def_arg) in list_args.iter().zip(def_args.iter()) {
            if !same.same_expression(list_arg, def_arg) {
                self.reporter.type_error(
                    def_arg.span,
                    ErrorCategory::TypeMismatch,
                    "default action argument does not match its declaration in the action list"
                        .to_string(),
                );
                return;
            }
        }
    }

    fn struct_like_decl(
        &mut self,
        id: NodeId,
        span: Span,
        name: &str,
        fields: &[weft_ast::ast::StructField],
        variant: StructVariant,
    ) {
        if self.done(id) {
            return;
        }
        let mut built = Vec::with_capacity(fields.len());
        for field in fields {
            let Some(t) = self.type_expr(&field.ty) else { return };
            if !self.done(field.id) {
                self.typemap.set_type(field.id, t.clone());
            }
            built.push(Field { id: field.id, name: field.name.clone(), ty: t });
        }
        let st = StructType { decl: id, name: name.to_string(), fields: built };
        let ty = match variant {
            StructVariant::Struct => Type::Struct(st),
            StructVariant::Header => Type::Header(st),
            StructVariant::Union => Type::Union(st),
        };
        let Some(canon) = self.canonicalize(&ty) else { return };
        self.validate_fields(span, &canon, variant);
        self.typemap.set_type(id, Type::TypeOfType(Box::new(canon)));
    }

    fn validate_fields(&mut self, span: Span, ty: &Type, variant: StructVariant) {
        let (Type::Struct(st) | Type::Header(st) | Type::Union(st)) = ty else { return };
        let allowed: fn(&Type) -> bool = match variant {
            StructVariant::Header => |t| matches!(t, Type::Bits { .. } | Type::Varbits { .. }),
            StructVariant::Struct => |t| {
                matches!(
                    t,
                    Type::Struct(_)
                        | Type::Bits { .. }
                        | Type::Header(_)
                        | Type::Union(_)
                        | Type::Enum(_)
                        | Type::Error(_)
                        | Type::Boolean
                        | Type::Stack(_)
                        | Type::ActionEnum(_)
                        | Type::Tuple(_)
                )
            },
            StructVariant::Union => |t| matches!(t, Type::Header(_)),
        };
        for field in &st.fields {
            if !allowed(&field.ty) {
                self.error(
                    span,
                    ErrorCategory::TypeMismatch,
                    format!("field {} of {} cannot have type {}", field.name, st.name, field.ty),
                );
                return;
            }
        }
    }

    fn declare_type_params(&mut self, type_params: &[TypeParam]) -> Vec<TypeVar> {
        type_params
            .iter()
            .map(|tp| {
                let var = TypeVar::from_decl(tp.id, &tp.name);
                if !self.done(tp.id) {
                    self.typemap
                        .set_type(tp.id, Type::TypeOfType(Box::new(Type::Param(var.clone()))));
                }
                var
            })
            .collect()
    }

    fn parameter(&mut self, param: &Parameter) -> Option<Param> {
        if let Some(t) = self.get_type(param.id) {
            return Some(Param {
                id: param.id,
                name: param.name.clone(),
                direction: param.direction,
                ty: t,
            });
        }
        let ty = self.type_expr(&param.ty)?;
        if ty.type_params().is_some_and(|tps| !tps.is_empty()) {
            self.error(
                param.span,
                ErrorCategory::Inference,
                format!("type parameters needed for {}", param.name),
            );
            return None;
        }
        self.typemap.set_type(param.id, ty.clone());
        Some(Param { id: param.id, name: param.name.clone(), direction: param.direction, ty })
    }

    fn parameters(&mut self, params: &[Parameter]) -> Option<Vec<Param>> {
        params.iter().map(|p| self.parameter(p)).collect()
    }

    // ── Surface types ──────────────────────────────────────────────────

    /// The canonical type a surface type expression denotes, recording a
    /// type-of-type entry on the node.
    pub fn type_expr(&mut self, t: &TypeExpr) -> Option<Type> {
        if let Some(existing) = self.typemap.get_type(t.id) {
            return match existing {
                Type::TypeOfType(inner) => Some((**inner).clone()),
                other => Some(other.clone()),
            };
        }
        let ty = self.convert_type_expr(t)?;
        let canon = self.canonicalize(&ty)?;
        self.typemap.set_type(t.id, Type::TypeOfType(Box::new(canon.clone())));
        Some(canon)
    }

    fn convert_type_expr(&mut self, t: &TypeExpr) -> Option<Type> {
        match &t.kind {
            TypeExprKind::Bits { size, signed } => Some(Type::Bits { size: *size, signed: *signed }),
            TypeExprKind::Varbits { size } => Some(Type::Varbits { size: *size }),
            TypeExprKind::Bool => Some(Type::Boolean),
            TypeExprKind::Int => Some(Type::inf_int()),
            TypeExprKind::Void => Some(Type::Void),
            TypeExprKind::Dontcare => Some(Type::Dontcare),
            TypeExprKind::Name(path) => self.resolve_type_name(t.id, t.span, &path.name),
            TypeExprKind::Specialized { base, args } => {
                let base_ty = self.resolve_type_name(t.id, t.span, &base.name)?;
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.type_expr(arg)?);
                }
                Some(Type::Specialized { base: Box::new(base_ty), args: arg_types })
            }
            TypeExprKind::Tuple(items) => {
                let mut components = Vec::with_capacity(items.len());
                for item in items {
                    components.push(self.type_expr(item)?);
                }
                Some(Type::Tuple(components))
            }
            TypeExprKind::Stack { element, size } => {
                let element = self.type_expr(element)?;
                let size_value = match &size.kind {
                    ExprKind::Constant { value, .. } if *value >= 0 => {
                        u32::try_from(*value).ok().or_else(|| {
                            self.reporter.type_error(
                                size.span,
                                ErrorCategory::Inference,
                                "header stack size is too large",
                            );
                            None
                        })
                    }
                    ExprKind::Constant { .. } => {
                        self.error(
                            size.span,
                            ErrorCategory::Inference,
                            "header stack size cannot be negative".into(),
                        );
                        None
                    }
                    _ => {
                        self.error(
                            size.span,
                            ErrorCategory::Inference,
                            "size of a header stack type should be a constant".into(),
                        );
                        None
                    }
                };
                let element_ok = matches!(
                    element.strip_specialized(),
                    Type::Header(_) | Type::Union(_) | Type::Param(_) | Type::Var(_)
                );
                if !element_ok {
                    self.error(
                        t.span,
                        ErrorCategory::TypeMismatch,
                        format!("header stack used with non-header type {}", element),
                    );
                }
                Some(Type::Stack(StackType { element: Box::new(element), size: size_value }))
            }
        }
    }

    fn resolve_type_name(&mut self, use_site: NodeId, span: Span, name: &str) -> Option<Type> {
        let referent = self.refmap.get_declaration(use_site)?.clone();
        match self.typemap.get_type(referent.decl) {
            Some(Type::TypeOfType(inner)) => Some((**inner).clone()),
            Some(other) => {
                let other = other.clone();
                self.error(
                    span,
                    ErrorCategory::Inference,
                    format!("{} does not denote a type (it has type {})", name, other),
                );
                None
            }
            None => {
                self.error(
                    span,
                    ErrorCategory::Inference,
                    format!("could not find type of {}", name),
                );
                None
            }
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn statement(&mut self, stmt: Statement) -> Statement {
        let Statement { id, span, kind } = stmt;
        self.span = span;
        let kind = match kind {
            StmtKind::Block(stmts) => {
                StmtKind::Block(stmts.into_iter().map(|s| self.statement(s)).collect())
            }
            StmtKind::If { condition, then_branch, else_branch } => {
                let condition = self.expression(condition);
                if let Some(t) = self.get_type(condition.id) {
                    if t != Type::Boolean {
                        self.error(
                            condition.span,
                            ErrorCategory::TypeMismatch,
                            format!("condition does not evaluate to a bool but to {}", t),
                        );
                    }
                }
                StmtKind::If {
                    condition,
                    then_branch: Box::new(self.statement(*then_branch)),
                    else_branch: else_branch.map(|e| Box::new(self.statement(*e))),
                }
            }
            StmtKind::Switch { expression, cases } => self.switch_statement(expression, cases),
            StmtKind::Assignment { target, value } => {
                let target = self.expression(target);
                let value = self.expression(value);
                match self.get_type(target.id) {
                    Some(lt) => {
                        if !self.typemap.is_left_value(target.id) {
                            self.error(
                                target.span,
                                ErrorCategory::Capability,
                                "expression cannot be the target of an assignment".into(),
                            );
                        }
                        let value = self.assignment(span, &lt, value);
                        StmtKind::Assignment { target, value }
                    }
                    None => StmtKind::Assignment { target, value },
                }
            }
            StmtKind::Call(e) => StmtKind::Call(self.expression(e)),
            StmtKind::Return(e) => self.return_statement(span, e),
            StmtKind::Declaration(d) => StmtKind::Declaration(Box::new(self.declaration(*d))),
            StmtKind::Empty => StmtKind::Empty,
        };
        Statement { id, span, kind }
    }

    fn switch_statement(&mut self, expression: Expression, cases: Vec<SwitchCase>) -> StmtKind {
        let expression = self.expression(expression);
        let action_enum = match self.get_type(expression.id) {
            Some(Type::ActionEnum(ae)) => Some(ae),
            Some(_) => {
                self.error(
                    expression.span,
                    ErrorCategory::Context,
                    "switch condition can only be produced by table.apply(...).action_run".into(),
                );
                None
            }
            None => None,
        };
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let cases = cases
            .into_iter()
            .map(|c| {
                let label = self.expression(c.label);
                if !matches!(label.kind, ExprKind::Default) {
                    if let Some(referent) = self.refmap.get_declaration(label.id).cloned() {
                        if !seen.insert(referent.name.clone()) {
                            self.error(
                                label.span,
                                ErrorCategory::Context,
                                format!("duplicate switch label {}", referent.name),
                            );
                        }
                        if let Some(ae) = &action_enum {
                            if !ae.contains(&referent.name) {
                                self.error(
                                    label.span,
                                    ErrorCategory::Context,
                                    format!("{} is not a legal label (action name)", referent.name),
                                );
                            }
                        }
                    }
                }
                let body = c.body.map(|b| self.statement(b));
                SwitchCase { id: c.id, span: c.span, label, body }
            })
            .collect();
        StmtKind::Switch { expression, cases }
    }

    fn return_statement(&mut self, span: Span, e: Option<Expression>) -> StmtKind {
        let e = e.map(|e| self.expression(e));
        let Some(function) = self.enclosing_function() else {
            if e.is_some() {
                self.error(
                    span,
                    ErrorCategory::Context,
                    "return with an expression can only be used in a function".into(),
                );
            }
            return StmtKind::Return(e);
        };
        let Some(Type::Method(mt)) = self.get_type(function) else {
            return StmtKind::Return(e);
        };
        let ret = mt.ret.expect("a function type always carries a return type");
        match (&*ret, e) {
            (Type::Void, Some(expr)) => {
                self.error(
                    span,
                    ErrorCategory::Context,
                    "return expression in a function returning void".into(),
                );
                StmtKind::Return(Some(expr))
            }
            (Type::Void, None) => StmtKind::Return(None),
            (other, None) => {
                self.error(
                    span,
                    ErrorCategory::TypeMismatch,
                    format!("return with no expression in a function returning {}", other),
                );
                StmtKind::Return(None)
            }
            (other, Some(expr)) => {
                let expr = self.assignment(span, other, expr);
                StmtKind::Return(Some(expr))
            }
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    pub fn expression(&mut self, e: Expression) -> Expression {
        if self.done(e.id) {
            return e;
        }
        let Expression { id, span, kind } = e;
        self.span = span;
        match kind {
            ExprKind::Constant { value, base, width } => {
                let ty = match width {
                    Some(w) => self
                        .typemap
                        .get_canonical(Type::Bits { size: w.size, signed: w.signed }),
                    None => Type::inf_int(),
                };
                self.typemap.set_type(id, ty);
                self.typemap.set_compile_time_constant(id);
                Expression { id, span, kind: ExprKind::Constant { value, base, width } }
            }
            ExprKind::BoolLiteral(b) => {
                self.typemap.set_type(id, Type::Boolean);
                self.typemap.set_compile_time_constant(id);
                Expression { id, span, kind: ExprKind::BoolLiteral(b) }
            }
            ExprKind::StringLiteral(s) => {
                self.typemap.set_type(id, Type::String);
                Expression { id, span, kind: ExprKind::StringLiteral(s) }
            }
            ExprKind::Path(path) => self.path_expression(id, span, path),
            ExprKind::Member { base, member } => {
                let base = self.expression(*base);
                self.member(id, span, base, member)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.expression(*operand);
                self.unary(id, span, op, operand)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.expression(*left);
                let right = self.expression(*right);
                let e = Expression {
                    id,
                    span,
                    kind: ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                };
                match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => self.binary_arith(e),
                    BinaryOp::Div | BinaryOp::Mod => self.uns_binary_arith(e),
                    BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => self.bitwise(e),
                    BinaryOp::Shl | BinaryOp::Shr => self.shift(e),
                    BinaryOp::And | BinaryOp::Or => self.binary_bool(e),
                    BinaryOp::Eq
                    | BinaryOp::Ne
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge => self.relation(e),
                    BinaryOp::Concat => self.concat(e),
                    BinaryOp::Range | BinaryOp::Mask => self.type_set(e),
                }
            }
            ExprKind::Mux { condition, on_true, on_false } => {
                let condition = self.expression(*condition);
                let on_true = self.expression(*on_true);
                let on_false = self.expression(*on_false);
                self.mux(id, span, condition, on_true, on_false)
            }
            ExprKind::Cast { target, operand } => {
                let operand = self.expression(*operand);
                self.cast(id, span, target, operand)
            }
            ExprKind::Slice { base, high, low } => {
                let base = self.expression(*base);
                let high = self.expression(*high);
                let low = self.expression(*low);
                self.slice(id, span, base, high, low)
            }
            ExprKind::Index { base, index } => {
                let base = self.expression(*base);
                let index = self.expression(*index);
                self.index(id, span, base, index)
            }
            ExprKind::List(items) => {
                let items: Vec<Expression> =
                    items.into_iter().map(|i| self.expression(i)).collect();
                self.list(id, span, items)
            }
            ExprKind::Call { callee, type_args, args } => {
                self.method_arguments.push(args.len());
                let callee = self.expression(*callee);
                let args: Vec<Expression> =
                    args.into_iter().map(|a| self.expression(a)).collect();
                self.method_arguments.pop();
                self.call(id, span, callee, type_args, args)
            }
            ExprKind::ConstructorCall { ty, args } => {
                let args: Vec<Expression> =
                    args.into_iter().map(|a| self.expression(a)).collect();
                self.constructor_call(id, span, ty, args)
            }
            ExprKind::Select { scrutinee, cases } => self.select(id, span, scrutinee, cases),
            ExprKind::Default => {
                self.typemap.set_type(id, Type::Dontcare);
                self.typemap.set_compile_time_constant(id);
                Expression { id, span, kind: ExprKind::Default }
            }
            ExprKind::This => {
                if self.enclosing_function().is_none() || self.instance_context().is_none() {
                    self.error(
                        span,
                        ErrorCategory::Context,
                        "this can only be used in the definition of an abstract method".into(),
                    );
                } else if let Some(instance) = self.instance_context() {
                    if let Some(t) = self.get_type(instance) {
                        self.typemap.set_type(id, t);
                    }
                }
                Expression { id, span, kind: ExprKind::This }
            }
        }
    }

    fn path_expression(&mut self, id: NodeId, span: Span, path: Path) -> Expression {
        let e = Expression { id, span, kind: ExprKind::Path(path) };
        let Some(referent) = self.refmap.get_declaration(id).cloned() else {
            return e;
        };
        let mut ty = None;
        match referent.kind {
            ReferentKind::State => ty = Some(Type::State),
            ReferentKind::Variable => self.typemap.set_left_value(id),
            ReferentKind::Parameter(direction) => match direction {
                Direction::InOut | Direction::Out => self.typemap.set_left_value(id),
                Direction::None => self.typemap.set_compile_time_constant(id),
                Direction::In => {}
            },
            ReferentKind::Constant | ReferentKind::Instance => {
                self.typemap.set_compile_time_constant(id)
            }
            ReferentKind::Method => {
                // Each method reference gets fresh type variables so
                // distinct call sites never share an inference variable.
                if let Some(t) = self.get_type(referent.decl) {
                    ty = Some(self.fresh_type_variables(&t));
                }
            }
            ReferentKind::Type | ReferentKind::TypeParam => {
                self.typemap.set_compile_time_constant(id)
            }
            _ => {}
        }
        let ty = ty.or_else(|| self.get_type(referent.decl));
        if let Some(t) = ty {
            self.typemap.set_type(id, t);
        }
        e
    }

    fn member(&mut self, id: NodeId, span: Span, base: Expression, member: String) -> Expression {
        let Some(base_ty) = self.get_type(base.id) else {
            return Expression { id, span, kind: ExprKind::Member { base: Box::new(base), member } };
        };
        let ty = base_ty.strip_specialized().clone();
        match &ty {
            Type::Extern(ext) => {
                match self.method_arguments.last().copied() {
                    None => {
                        // An extern member outside a call expression.
                        self.error(
                            span,
                            ErrorCategory::Context,
                            "methods can only be called".into(),
                        );
                    }
                    Some(argc) => match ext.method(&member, argc) {
                        Some(m) => {
                            let method_ty =
                                self.fresh_type_variables(&Type::Method(m.ty.clone()));
                            self.typemap.set_type(id, method_ty);
                            self.typemap.set_compile_time_constant(id);
                        }
                        None => self.error(
                            span,
                            ErrorCategory::Arity,
                            format!(
                                "extern {} does not have a method named {} with {} arguments",
                                ext.name, member, argc
                            ),
                        ),
                    },
                }
            }
            Type::Struct(st) | Type::Header(st) | Type::Union(st) => {
                if matches!(ty, Type::Header(_)) && member == builtins::IS_VALID {
                    if let Some(canon) = self.canonicalize(&builtins::header_is_valid()) {
                        self.typemap.set_type(id, canon);
                    }
                    return Expression {
                        id,
                        span,
                        kind: ExprKind::Member { base: Box::new(base), member },
                    };
                }
                if matches!(ty, Type::Header(_))
                    && (member == builtins::SET_VALID || member == builtins::SET_INVALID)
                {
                    if !self.typemap.is_left_value(base.id) {
                        self.error(
                            base.span,
                            ErrorCategory::Capability,
                            format!("{} must be applied to a left-value", member),
                        );
                    }
                    if let Some(canon) = self.canonicalize(&builtins::header_set_validity()) {
                        self.typemap.set_type(id, canon);
                    }
                    return Expression {
                        id,
                        span,
                        kind: ExprKind::Member { base: Box::new(base), member },
                    };
                }
                match st.field(&member) {
                    Some(field) => {
                        self.typemap.set_type(id, field.ty.clone());
                        if self.typemap.is_left_value(base.id) {
                            self.typemap.set_left_value(id);
                        }
                        if self.typemap.is_compile_time_constant(base.id) {
                            self.typemap.set_compile_time_constant(id);
                        }
                    }
                    None => self.error(
                        span,
                        ErrorCategory::Inference,
                        format!("{} does not have a field named {}", st.name, member),
                    ),
                }
            }
            Type::Stack(stack) => match member.as_str() {
                builtins::NEXT | builtins::LAST => {
                    if self.in_control() {
                        self.error(
                            span,
                            ErrorCategory::Context,
                            format!("{} for stacks cannot be used in a control", member),
                        );
                    }
                    self.typemap.set_type(id, (*stack.element).clone());
                    if member == builtins::NEXT && self.typemap.is_left_value(base.id) {
                        self.typemap.set_left_value(id);
                    }
                }
                builtins::SIZE => self.typemap.set_type(id, builtins::stack_size()),
                builtins::LAST_INDEX => self.typemap.set_type(id, builtins::stack_last_index()),
                builtins::PUSH_FRONT | builtins::POP_FRONT => {
                    if self.in_parser() {
                        self.error(
                            span,
                            ErrorCategory::Context,
                            format!("{} for stacks cannot be used in a parser", member),
                        );
                    }
                    if !self.typemap.is_left_value(base.id) {
                        self.error(
                            base.span,
                            ErrorCategory::Capability,
                            format!("{} must be applied to a left-value", member),
                        );
                    }
                    if let Some(canon) = self.canonicalize(&builtins::stack_resize()) {
                        self.typemap.set_type(id, canon);
                    }
                }
                _ => self.error(
                    span,
                    ErrorCategory::TypeMismatch,
                    format!("cannot extract member {} from a header stack", member),
                ),
            },
            Type::Parser(object) | Type::Control(object) if member == builtins::APPLY => {
                let apply = Type::Method(MethodType {
                    type_params: Vec::new(),
                    ret: Some(Box::new(Type::Void)),
                    params: object.params.clone(),
                });
                if let Some(canon) = self.canonicalize(&apply) {
                    self.typemap.set_type(id, canon);
                }
            }
            Type::Table(table) if member == builtins::APPLY => {
                self.typemap.set_type(id, builtins::table_apply(table));
            }
            Type::TypeOfType(inner) => match &**inner {
                Type::Enum(en) => {
                    if self.typemap.is_compile_time_constant(base.id) {
                        self.typemap.set_compile_time_constant(id);
                    }
                    self.member_of_declared(id, span, &base_ty, &en.members, &member, "enum tag");
                }
                Type::Error(er) => {
                    if self.typemap.is_compile_time_constant(base.id) {
                        self.typemap.set_compile_time_constant(id);
                    }
                    self.member_of_declared(id, span, &base_ty, &er.members, &member, "error");
                }
                _ => self.error(
                    span,
                    ErrorCategory::TypeMismatch,
                    format!("cannot extract member {} from type {}", member, inner),
                ),
            },
            _ => self.error(
                span,
                ErrorCategory::TypeMismatch,
                format!("cannot extract member {} from a value of type {}", member, ty),
            ),
        }
        Expression { id, span, kind: ExprKind::Member { base: Box::new(base), member } }
    }

    fn member_of_declared(
        &mut self,
        id: NodeId,
        span: Span,
        base_ty: &Type,
        members: &[EnumMemberRef],
        member: &str,
        what: &str,
    ) {
        match members.iter().find(|m| m.name == member) {
            Some(m) => {
                if let Some(t) = self.get_type(m.id) {
                    self.typemap.set_type(id, t);
                }
            }
            None => {
                self.error(
                    span,
                    ErrorCategory::Inference,
                    format!("{} is not a valid {}", member, what),
                );
                self.typemap.set_type(id, base_ty.clone());
            }
        }
    }

    fn unary(&mut self, id: NodeId, span: Span, op: UnaryOp, operand: Expression) -> Expression {
        if let Some(t) = self.get_type(operand.id) {
            match op {
                UnaryOp::Not => {
                    if t == Type::Boolean {
                        self.typemap.set_type(id, Type::Boolean);
                    } else {
                        self.error(
                            span,
                            ErrorCategory::TypeMismatch,
                            format!("cannot apply {} to a value of type {}", op.symbol(), t),
                        );
                    }
                }
                UnaryOp::Neg => match t {
                    Type::InfInt(_) | Type::Bits { .. } => self.typemap.set_type(id, t),
                    _ => self.error(
                        span,
                        ErrorCategory::TypeMismatch,
                        format!("cannot apply {} to a value of type {}", op.symbol(), t),
                    ),
                },
                UnaryOp::Cmpl => match t {
                    Type::InfInt(_) => self.error(
                        span,
                        ErrorCategory::Inference,
                        format!("{} cannot be applied to an operand with an unknown width", op.symbol()),
                    ),
                    Type::Bits { .. } => self.typemap.set_type(id, t),
                    _ => self.error(
                        span,
                        ErrorCategory::TypeMismatch,
                        format!("cannot apply {} to a value of type {}", op.symbol(), t),
                    ),
                },
            }
            if self.typemap.is_compile_time_constant(operand.id) {
                self.typemap.set_compile_time_constant(id);
            }
        }
        Expression { id, span, kind: ExprKind::Unary { op, operand: Box::new(operand) } }
    }

    /// Replace a width-unknown literal by a sized one of type `to`,
    /// registering the new node's type and constantness.
    fn narrow_constant(&mut self, expr: &mut Expression, to: &Type) {
        let Type::Bits { size, signed } = *to else { return };
        match expr.kind {
            ExprKind::Constant { value, base, .. } => {
                trace!("narrowing literal {} to {}", value, to);
                let narrowed = Expression::new(
                    expr.span,
                    ExprKind::Constant { value, base, width: Some(BitWidth { size, signed }) },
                );
                self.typemap.set_type(narrowed.id, to.clone());
                self.typemap.set_compile_time_constant(narrowed.id);
                *expr = narrowed;
            }
            _ => {
                self.error(
                    expr.span,
                    ErrorCategory::Inference,
                    "cannot infer a width for this operand".into(),
                );
            }
        }
    }

    fn operand_types(&mut self, e: &Expression) -> Option<(Type, Type)> {
        let ExprKind::Binary { left, right, .. } = &e.kind else {
            unreachable!("binary operator rules apply to binary expressions only")
        };
        let lt = self.get_type(left.id)?;
        let rt = self.get_type(right.id)?;
        Some((lt, rt))
    }

    fn set_binary_constant(&mut self, e: &Expression) {
        let ExprKind::Binary { left, right, .. } = &e.kind else { return };
        if self.typemap.is_compile_time_constant(left.id)
            && self.typemap.is_compile_time_constant(right.id)
        {
            self.typemap.set_compile_time_constant(e.id);
        }
    }

    fn binary_arith(&mut self, mut e: Expression) -> Expression {
        let Some((lt, rt)) = self.operand_types(&e) else { return e };
        let op_symbol = match &e.kind {
            ExprKind::Binary { op, .. } => op.symbol(),
            _ => unreachable!(),
        };
        let bl = lt.as_bits();
        let br = rt.as_bits();
        if bl.is_none() && !matches!(lt, Type::InfInt(_)) {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("{} cannot be applied to an operand of type {}", op_symbol, lt),
            );
            return e;
        }
        if br.is_none() && !matches!(rt, Type::InfInt(_)) {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("{} cannot be applied to an operand of type {}", op_symbol, rt),
            );
            return e;
        }
        let result = match (bl, br) {
            (Some((ls, lsg)), Some((rs, rsg))) => {
                if ls != rs {
                    self.error(
                        e.span,
                        ErrorCategory::TypeMismatch,
                        format!("cannot operate on values with different widths {} and {}", ls, rs),
                    );
                    return e;
                }
                if lsg != rsg {
                    self.error(
                        e.span,
                        ErrorCategory::TypeMismatch,
                        "cannot operate on values with different signs".into(),
                    );
                    return e;
                }
                lt.clone()
            }
            (None, Some(_)) => {
                let ExprKind::Binary { left, .. } = &mut e.kind else { unreachable!() };
                self.narrow_constant(left, &rt);
                rt.clone()
            }
            (Some(_), None) => {
                let ExprKind::Binary { right, .. } = &mut e.kind else { unreachable!() };
                self.narrow_constant(right, &lt);
                lt.clone()
            }
            (None, None) => lt.clone(),
        };
        self.typemap.set_type(e.id, result);
        self.set_binary_constant(&e);
        e
    }

    /// Division and modulo: defined only on unsigned values.
    fn uns_binary_arith(&mut self, e: Expression) -> Expression {
        let Some((lt, rt)) = self.operand_types(&e) else { return e };
        if matches!(lt, Type::Bits { signed: true, .. })
            || matches!(rt, Type::Bits { signed: true, .. })
        {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                "cannot operate on signed values".into(),
            );
            return e;
        }
        let negative_operand = match &e.kind {
            ExprKind::Binary { left, right, .. } => {
                [left, right].into_iter().find_map(|side| match side.kind {
                    ExprKind::Constant { value, .. } if value < 0 => Some(side.span),
                    _ => None,
                })
            }
            _ => unreachable!(),
        };
        if let Some(span) = negative_operand {
            self.error(span, ErrorCategory::TypeMismatch, "not defined on negative numbers".into());
            return e;
        }
        self.binary_arith(e)
    }

    fn bitwise(&mut self, mut e: Expression) -> Expression {
        let Some((lt, rt)) = self.operand_types(&e) else { return e };
        let op_symbol = match &e.kind {
            ExprKind::Binary { op, .. } => op.symbol(),
            _ => unreachable!(),
        };
        let bl = lt.as_bits();
        let br = rt.as_bits();
        if bl.is_none() && !matches!(lt, Type::InfInt(_)) {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("{} cannot be applied to an operand of type {}", op_symbol, lt),
            );
            return e;
        }
        if br.is_none() && !matches!(rt, Type::InfInt(_)) {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("{} cannot be applied to an operand of type {}", op_symbol, rt),
            );
            return e;
        }
        let result = match (bl, br) {
            (Some(_), Some(_)) => {
                if !TypeMap::equivalent(&lt, &rt) {
                    self.error(
                        e.span,
                        ErrorCategory::TypeMismatch,
                        format!("cannot operate on values with different types {} and {}", lt, rt),
                    );
                    return e;
                }
                lt.clone()
            }
            (None, Some(_)) => {
                let ExprKind::Binary { left, .. } = &mut e.kind else { unreachable!() };
                self.narrow_constant(left, &rt);
                rt.clone()
            }
            (Some(_), None) => {
                let ExprKind::Binary { right, .. } = &mut e.kind else { unreachable!() };
                self.narrow_constant(right, &lt);
                lt.clone()
            }
            (None, None) => lt.clone(),
        };
        self.typemap.set_type(e.id, result);
        self.set_binary_constant(&e);
        e
    }

    fn shift(&mut self, e: Expression) -> Expression {
        let Some((lt, rt)) = self.operand_types(&e) else { return e };
        let Some((lsize, _)) = lt.as_bits() else {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("left operand of a shift must be a bit type, not {}", lt),
            );
            return e;
        };
        let ExprKind::Binary { right, .. } = &e.kind else { unreachable!() };
        if let ExprKind::Constant { value, .. } = right.kind {
            if value < 0 {
                self.error(
                    e.span,
                    ErrorCategory::TypeMismatch,
                    format!("negative shift amount {}", value),
                );
                return e;
            }
            if value >= i128::from(lsize) {
                self.reporter.warning(
                    e.span,
                    format!("shifting a value with {} bits by {}", lsize, value),
                );
            }
        }
        if matches!(rt, Type::Bits { signed: true, .. }) {
            self.error(
                right.span,
                ErrorCategory::TypeMismatch,
                "shift amount must be an unsigned number".into(),
            );
            return e;
        }
        self.typemap.set_type(e.id, lt);
        self.set_binary_constant(&e);
        e
    }

    fn binary_bool(&mut self, e: Expression) -> Expression {
        let Some((lt, rt)) = self.operand_types(&e) else { return e };
        if lt != Type::Boolean || rt != Type::Boolean {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("not defined on {} and {}", lt, rt),
            );
            return e;
        }
        self.typemap.set_type(e.id, Type::Boolean);
        self.set_binary_constant(&e);
        e
    }

    fn is_base_type(ty: &Type) -> bool {
        matches!(
            ty,
            Type::Bits { .. }
                | Type::Varbits { .. }
                | Type::Boolean
                | Type::String
                | Type::InfInt(_)
        )
    }

    fn relation(&mut self, mut e: Expression) -> Expression {
        let Some((mut lt, mut rt)) = self.operand_types(&e) else { return e };
        let op = match &e.kind {
            ExprKind::Binary { op, .. } => *op,
            _ => unreachable!(),
        };
        if matches!(lt, Type::InfInt(_)) && rt.is_bits() {
            let ExprKind::Binary { left, .. } = &mut e.kind else { unreachable!() };
            self.narrow_constant(left, &rt);
            lt = rt.clone();
        } else if matches!(rt, Type::InfInt(_)) && lt.is_bits() {
            let ExprKind::Binary { right, .. } = &mut e.kind else { unreachable!() };
            self.narrow_constant(right, &lt);
            rt = lt.clone();
        }
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            // The base-vs-base branch is intentionally kept after the
            // general one, mirroring the two-rule definition of equality.
            let defined = (TypeMap::equivalent(&lt, &rt)
                && !matches!(lt, Type::Void | Type::Varbits { .. }))
                || (Self::is_base_type(&lt)
                    && Self::is_base_type(&rt)
                    && TypeMap::equivalent(&lt, &rt));
            if !defined {
                self.error(
                    e.span,
                    ErrorCategory::TypeMismatch,
                    format!("{} not defined on {} and {}", op.symbol(), lt, rt),
                );
                return e;
            }
        } else if !(lt.is_bits() && rt.is_bits() && lt == rt) {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("{} not defined on {} and {}", op.symbol(), lt, rt),
            );
            return e;
        }
        self.typemap.set_type(e.id, Type::Boolean);
        self.set_binary_constant(&e);
        e
    }

    fn concat(&mut self, e: Expression) -> Expression {
        let Some((lt, rt)) = self.operand_types(&e) else { return e };
        let ExprKind::Binary { left, right, .. } = &e.kind else { unreachable!() };
        if matches!(lt, Type::InfInt(_)) {
            self.error(
                left.span,
                ErrorCategory::Inference,
                "please specify a width for the operand of a concatenation".into(),
            );
            return e;
        }
        if matches!(rt, Type::InfInt(_)) {
            self.error(
                right.span,
                ErrorCategory::Inference,
                "please specify a width for the operand of a concatenation".into(),
            );
            return e;
        }
        let (Some((ls, lsg)), Some((rs, _))) = (lt.as_bits(), rt.as_bits()) else {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("concatenation not defined on {} and {}", lt, rt),
            );
            return e;
        };
        let result = Type::Bits { size: ls + rs, signed: lsg };
        if let Some(canon) = self.canonicalize(&result) {
            self.typemap.set_type(e.id, canon);
            self.set_binary_constant(&e);
        }
        e
    }

    /// Range and mask expressions produce a set over the operand type. When
    /// both operands are width-unknown they share one type, so a later
    /// unification narrows both at once.
    fn type_set(&mut self, mut e: Expression) -> Expression {
        let Some((lt, rt)) = self.operand_types(&e) else { return e };
        let op_symbol = match &e.kind {
            ExprKind::Binary { op, .. } => op.symbol(),
            _ => unreachable!(),
        };
        let bl = lt.as_bits();
        let br = rt.as_bits();
        if bl.is_none() && !matches!(lt, Type::InfInt(_)) {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("{} cannot be applied to an operand of type {}", op_symbol, lt),
            );
            return e;
        }
        if br.is_none() && !matches!(rt, Type::InfInt(_)) {
            self.error(
                e.span,
                ErrorCategory::TypeMismatch,
                format!("{} cannot be applied to an operand of type {}", op_symbol, rt),
            );
            return e;
        }
        let element = match (bl, br) {
            (Some(_), Some(_)) => {
                if !TypeMap::equivalent(&lt, &rt) {
                    self.error(
                        e.span,
                        ErrorCategory::TypeMismatch,
                        format!("cannot operate on values with different types {} and {}", lt, rt),
                    );
                    return e;
                }
                lt.clone()
            }
            (None, Some(_)) => {
                let ExprKind::Binary { left, .. } = &mut e.kind else { unreachable!() };
                self.narrow_constant(left, &rt);
                rt.clone()
            }
            (Some(_), None) => {
                let ExprKind::Binary { right, .. } = &mut e.kind else { unreachable!() };
                self.narrow_constant(right, &lt);
                lt.clone()
            }
            (None, None) => {
                let ExprKind::Binary { right, .. } = &e.kind else { unreachable!() };
                self.typemap.set_type(right.id, lt.clone());
                lt.clone()
            }
        };
        self.typemap.set_type(e.id, Type::Set(Box::new(element)));
        e
    }

    fn mux(
        &mut self,
        id: NodeId,
        span: Span,
        condition: Expression,
        mut on_true: Expression,
        mut on_false: Expression,
    ) -> Expression {
        let rebuild = |condition, on_true, on_false| Expression {
            id,
            span,
            kind: ExprKind::Mux {
                condition: Box::new(condition),
                on_true: Box::new(on_true),
                on_false: Box::new(on_false),
            },
        };
        let (Some(ct), Some(tt), Some(ft)) = (
            self.get_type(condition.id),
            self.get_type(on_true.id),
            self.get_type(on_false.id),
        ) else {
            return rebuild(condition, on_true, on_false);
        };
        if ct != Type::Boolean {
            self.error(
                condition.span,
                ErrorCategory::TypeMismatch,
                format!("selector must be bool, not {}", ct),
            );
            return rebuild(condition, on_true, on_false);
        }
        if matches!(tt, Type::InfInt(_)) && matches!(ft, Type::InfInt(_)) {
            self.error(
                span,
                ErrorCategory::Inference,
                "width must be specified for at least one of the alternatives".into(),
            );
            return rebuild(condition, on_true, on_false);
        }
        if let Some(tvs) = self.unify_types(span, &tt, &ft, true) {
            let mut result = tt;
            if !tvs.is_identity() {
                substitute_constants(&tvs, self.typemap, &mut on_true);
                substitute_constants(&tvs, self.typemap, &mut on_false);
                if let Some(t) = self.get_type(on_true.id) {
                    result = t;
                }
            }
            self.typemap.set_type(id, result);
            if self.typemap.is_compile_time_constant(condition.id)
                && self.typemap.is_compile_time_constant(on_true.id)
                && self.typemap.is_compile_time_constant(on_false.id)
            {
                self.typemap.set_compile_time_constant(id);
            }
        }
        rebuild(condition, on_true, on_false)
    }

    /// What an explicit cast admits: width changes of equal signedness,
    /// sign reinterpretation of equal width, and bit<1> ↔ bool.
    fn can_cast(&self, dest: &Type, src: &Type) -> bool {
        if dest == src {
            return true;
        }
        match (src, dest) {
            (Type::Bits { size: fs, signed: fsg }, Type::Bits { size: ts, signed: tsg }) => {
                fs == ts || fsg == tsg
            }
            (Type::Bits { size: 1, signed: false }, Type::Boolean) => true,
            (Type::Boolean, Type::Bits { size: 1, signed: false }) => true,
            _ => false,
        }
    }

    /// What assignment checking inserts silently: never a width change
    /// (assigning bit<16> to bit<8> is a type error, not a truncation).
    fn can_implicitly_cast(&self, dest: &Type, src: &Type) -> bool {
        match (src, dest) {
            (Type::Bits { size: fs, .. }, Type::Bits { size: ts, .. }) => fs == ts,
            (Type::Bits { size: 1, signed: false }, Type::Boolean) => true,
            (Type::Boolean, Type::Bits { size: 1, signed: false }) => true,
            _ => false,
        }
    }

    fn cast(&mut self, id: NodeId, span: Span, target: TypeExpr, operand: Expression) -> Expression {
        let Some(cast_ty) = self.type_expr(&target) else {
            return Expression {
                id,
                span,
                kind: ExprKind::Cast { target, operand: Box::new(operand) },
            };
        };
        let mut operand = operand;
        if let Some(mut src_ty) = self.get_type(operand.id) {
            if !self.can_cast(&cast_ty, &src_ty) {
                // Not directly castable; a substitution may still make the
                // operand fit (e.g. narrowing an unsized literal).
                operand = self.assignment(span, &cast_ty, operand);
                if let Some(t) = self.get_type(operand.id) {
                    src_ty = t;
                }
                if !self.can_cast(&cast_ty, &src_ty) && src_ty != cast_ty {
                    self.error(
                        span,
                        ErrorCategory::TypeMismatch,
                        format!("illegal cast from {} to {}", src_ty, cast_ty),
                    );
                }
            }
            self.typemap.set_type(id, cast_ty);
            if self.typemap.is_compile_time_constant(operand.id) {
                self.typemap.set_compile_time_constant(id);
            }
        }
        Expression { id, span, kind: ExprKind::Cast { target, operand: Box::new(operand) } }
    }

    fn slice(
        &mut self,
        id: NodeId,
        span: Span,
        base: Expression,
        high: Expression,
        low: Expression,
    ) -> Expression {
        let rebuild = |base, high, low| Expression {
            id,
            span,
            kind: ExprKind::Slice {
                base: Box::new(base),
                high: Box::new(high),
                low: Box::new(low),
            },
        };
        let Some(base_ty) = self.get_type(base.id) else { return rebuild(base, high, low) };
        let Some((size, signed)) = base_ty.as_bits() else {
            self.error(
                span,
                ErrorCategory::TypeMismatch,
                "bit extraction is only defined for bit types".into(),
            );
            return rebuild(base, high, low);
        };
        let (ExprKind::Constant { value: h, .. }, ExprKind::Constant { value: l, .. }) =
            (&high.kind, &low.kind)
        else {
            self.error(
                span,
                ErrorCategory::Capability,
                "bit index values must be constants".into(),
            );
            return rebuild(base, high, low);
        };
        let (h, l) = (*h, *l);
        if h < 0 || l < 0 {
            self.error(span, ErrorCategory::TypeMismatch, "negative bit index".into());
            return rebuild(base, high, low);
        }
        if h >= i128::from(size) || l >= i128::from(size) {
            self.error(
                span,
                ErrorCategory::TypeMismatch,
                format!("bit index greater than width {}", size),
            );
            return rebuild(base, high, low);
        }
        if l > h {
            self.error(
                span,
                ErrorCategory::TypeMismatch,
                format!("low index {} greater than high index {}", l, h),
            );
            return rebuild(base, high, low);
        }
        let result = Type::Bits { size: (h - l + 1) as u32, signed };
        if let Some(canon) = self.canonicalize(&result) {
            self.typemap.set_type(id, canon);
            if self.typemap.is_left_value(base.id) {
                self.typemap.set_left_value(id);
            }
            if self.typemap.is_compile_time_constant(base.id) {
                self.typemap.set_compile_time_constant(id);
            }
        }
        rebuild(base, high, low)
    }

    fn index(&mut self, id: NodeId, span: Span, base: Expression, index: Expression) -> Expression {
        let rebuild = |base, index| Expression {
            id,
            span,
            kind: ExprKind::Index { base: Box::new(base), index: Box::new(index) },
        };
        let (Some(base_ty), Some(index_ty)) =
            (self.get_type(base.id), self.get_type(index.id))
        else {
            return rebuild(base, index);
        };
        let Type::Stack(stack) = base_ty.strip_specialized() else {
            self.error(
                span,
                ErrorCategory::TypeMismatch,
                format!("array indexing applied to non-array type {}", base_ty),
            );
            return rebuild(base, index);
        };
        let index_is_constant = matches!(index.kind, ExprKind::Constant { .. });
        if !index_ty.is_bits() && !index_is_constant {
            self.error(
                index.span,
                ErrorCategory::TypeMismatch,
                format!("array index must be an integer, but it has type {}", index_ty),
            );
            return rebuild(base, index);
        }
        if self.typemap.is_left_value(base.id) {
            self.typemap.set_left_value(id);
        }
        if let ExprKind::Constant { value, .. } = index.kind {
            if value < 0 {
                self.error(index.span, ErrorCategory::TypeMismatch, "negative array index".into());
                return rebuild(base, index);
            }
            if let Some(stack_size) = stack.size {
                if value >= i128::from(stack_size) {
                    self.error(
                        index.span,
                        ErrorCategory::TypeMismatch,
                        format!("array index {} larger or equal to array size {}", value, stack_size),
                    );
                    return rebuild(base, index);
                }
            }
        }
        self.typemap.set_type(id, (*stack.element).clone());
        rebuild(base, index)
    }

    fn list(&mut self, id: NodeId, span: Span, items: Vec<Expression>) -> Expression {
        let mut constant = true;
        let mut components = Vec::with_capacity(items.len());
        for item in &items {
            if !self.typemap.is_compile_time_constant(item.id) {
                constant = false;
            }
            match self.get_type(item.id) {
                Some(t) => components.push(t),
                None => return Expression { id, span, kind: ExprKind::List(items) },
            }
        }
        if let Some(canon) = self.canonicalize(&Type::Tuple(components)) {
            self.typemap.set_type(id, canon);
            if constant {
                self.typemap.set_compile_time_constant(id);
            }
        }
        Expression { id, span, kind: ExprKind::List(items) }
    }

    fn call(
        &mut self,
        id: NodeId,
        span: Span,
        callee: Expression,
        type_args: Vec<TypeExpr>,
        mut args: Vec<Expression>,
    ) -> Expression {
        let Some(method_ty) = self.get_type(callee.id) else {
            return Expression {
                id,
                span,
                kind: ExprKind::Call { callee: Box::new(callee), type_args, args },
            };
        };
        if matches!(method_ty.strip_specialized(), Type::Action(_)) {
            let in_actions_list = self.in_actions_list();
            return self.action_call(id, span, callee, type_args, args, in_actions_list);
        }
        if !matches!(method_ty.strip_specialized(), Type::Method(_)) {
            self.error(span, ErrorCategory::TypeMismatch, format!("{} is not a method", method_ty));
            return Expression {
                id,
                span,
                kind: ExprKind::Call { callee: Box::new(callee), type_args, args },
            };
        }
        let mut infos = Vec::with_capacity(args.len());
        let mut resolved = true;
        for arg in &args {
            match self.get_type(arg.id) {
                Some(t) => infos.push(ArgInfo {
                    ty: t,
                    is_left_value: self.typemap.is_left_value(arg.id),
                    is_constant: self.typemap.is_compile_time_constant(arg.id),
                    span: arg.span,
                }),
                None => resolved = false,
            }
        }
        let mut targs = Vec::with_capacity(type_args.len());
        for t in &type_args {
            match self.type_expr(t) {
                Some(tt) => targs.push(tt),
                None => resolved = false,
            }
        }
        if resolved {
            let ret = TypeVar::fresh("R");
            let mut constraints = Constraints::new();
            constraints.add_call(
                method_ty,
                CallType { type_args: targs, ret: ret.clone(), args: infos, span },
            );
            if let Some(tvs) = constraints.solve(span, self.reporter, true) {
                self.typemap.add_substitutions(&tvs);
                match tvs.lookup(&ret).cloned() {
                    Some(ret_ty) => {
                        let ret_ty = tvs.apply(&ret_ty);
                        trace!("solved call with return type {}", ret_ty);
                        self.typemap.set_type(id, ret_ty);
                        for arg in &mut args {
                            substitute_constants(&tvs, self.typemap, arg);
                        }
                    }
                    None => {
                        self.error(
                            span,
                            ErrorCategory::Inference,
                            "cannot infer the return type of this call".into(),
                        );
                    }
                }
            }
        }
        // A table may not be applied from within an action body.
        if let ExprKind::Member { base, member } = &callee.kind {
            if member == builtins::APPLY
                && self
                    .get_type(base.id)
                    .is_some_and(|t| matches!(t.strip_specialized(), Type::Table(_)))
                && self.in_action()
            {
                self.error(
                    span,
                    ErrorCategory::Context,
                    "tables cannot be invoked from actions".into(),
                );
            }
        }
        Expression { id, span, kind: ExprKind::Call { callee: Box::new(callee), type_args, args } }
    }

    /// Calling an action with fewer arguments than it declares produces a
    /// new action over the unbound tail.
    fn action_call(
        &mut self,
        id: NodeId,
        span: Span,
        callee: Expression,
        type_args: Vec<TypeExpr>,
        mut args: Vec<Expression>,
        in_actions_list: bool,
    ) -> Expression {
        let Some(Type::Action(action)) =
            self.get_type(callee.id).map(|t| t.strip_specialized().clone())
        else {
            return Expression {
                id,
                span,
                kind: ExprKind::Call { callee: Box::new(callee), type_args, args },
            };
        };
        if !type_args.is_empty() {
            self.error(
                span,
                ErrorCategory::Arity,
                "cannot supply type parameters for an action invocation".into(),
            );
        }
        let mut constraints = Constraints::new();
        let mut remaining = Vec::new();
        let mut arg_iter = args.iter();
        for param in &action.params {
            match arg_iter.next() {
                None => {
                    remaining.push(param.clone());
                    if param.direction != Direction::None || !in_actions_list {
                        self.error(
                            span,
                            ErrorCategory::Arity,
                            format!("parameter {} must be bound", param.name),
                        );
                    }
                }
                Some(arg) => {
                    if let Some(arg_ty) = self.get_type(arg.id) {
                        constraints.add_equality(param.ty.clone(), arg_ty);
                    }
                    match param.direction {
                        Direction::None => {
                            if in_actions_list {
                                self.error(
                                    arg.span,
                                    ErrorCategory::Capability,
                                    format!(
                                        "parameter {} cannot be bound: it is set by the control plane",
                                        param.name
                                    ),
                                );
                            }
                        }
                        Direction::Out | Direction::InOut => {
                            if !self.typemap.is_left_value(arg.id) {
                                self.error(
                                    arg.span,
                                    ErrorCategory::Capability,
                                    "argument must be a left-value".into(),
                                );
                            }
                        }
                        Direction::In => {}
                    }
                }
            }
        }
        if arg_iter.next().is_some() {
            self.error(span, ErrorCategory::Arity, "too many arguments for action".into());
        }
        self.typemap.set_type(id, Type::Action(ActionType { params: remaining }));
        if let Some(tvs) = constraints.solve(span, self.reporter, true) {
            self.typemap.add_substitutions(&tvs);
            for arg in &mut args {
                substitute_constants(&tvs, self.typemap, arg);
            }
        }
        Expression { id, span, kind: ExprKind::Call { callee: Box::new(callee), type_args, args } }
    }

    fn constructor_call(
        &mut self,
        id: NodeId,
        span: Span,
        ty: TypeExpr,
        mut args: Vec<Expression>,
    ) -> Expression {
        if let Some(t) = self.type_expr(&ty) {
            let simple = t.strip_specialized().clone();
            match &simple {
                Type::Extern(ext) => {
                    let ext = ext.clone();
                    self.check_extern_constructor(span, &ext, &mut args);
                    self.typemap.set_type(id, t);
                }
                _ if simple.is_container() => {
                    if let Some(instance_ty) = self.container_instantiation(span, &args, &simple) {
                        let final_ty = match &t {
                            Type::SpecializedCanonical(s) => {
                                Type::SpecializedCanonical(SpecializedType {
                                    base: s.base.clone(),
                                    args: s.args.clone(),
                                    substituted: Box::new(instance_ty),
                                })
                            }
                            _ => instance_ty,
                        };
                        self.typemap.set_type(id, final_ty);
                    }
                }
                _ => {
                    self.error(
                        span,
                        ErrorCategory::Context,
                        format!("cannot invoke a constructor on type {}", t),
                    );
                }
            }
        }
        self.typemap.set_compile_time_constant(id);
        Expression { id, span, kind: ExprKind::ConstructorCall { ty, args } }
    }

    /// Check an extern constructor call: the constructor is found by arity,
    /// every argument must be a compile-time constant, and argument types
    /// unify with the (freshly cloned) parameter types.
    fn check_extern_constructor(
        &mut self,
        span: Span,
        ext: &ExternType,
        args: &mut [Expression],
    ) -> bool {
        if !ext.type_params.is_empty() {
            self.error(
                span,
                ErrorCategory::Arity,
                "type parameters must be supplied for the constructor".into(),
            );
            return false;
        }
        let Some(ctor) = ext.method(&ext.name, args.len()) else {
            self.error(
                span,
                ErrorCategory::Arity,
                format!("type {} has no constructor with {} arguments", ext.name, args.len()),
            );
            return false;
        };
        let method_ty = self.fresh_type_variables(&Type::Method(ctor.ty.clone()));
        let Type::Method(mt) = method_ty else {
            unreachable!("freshening a method type yields a method type")
        };
        for (param, arg) in mt.params.iter().zip(args.iter_mut()) {
            if !self.typemap.is_compile_time_constant(arg.id) {
                self.error(
                    arg.span,
                    ErrorCategory::Capability,
                    "cannot evaluate to a compile-time constant".into(),
                );
            }
            let Some(arg_ty) = self.get_type(arg.id) else { continue };
            let Some(tvs) = self.unify_types(span, &param.ty, &arg_ty, true) else {
                return false;
            };
            if !tvs.is_identity() {
                substitute_constants(&tvs, self.typemap, arg);
            }
        }
        true
    }

    /// Instantiate a parser, control, or package: fresh-clone its
    /// constructor, unify with the call shape, and return the solved
    /// instance type.
    fn container_instantiation(
        &mut self,
        span: Span,
        args: &[Expression],
        container: &Type,
    ) -> Option<Type> {
        let ctor = match container {
            Type::Parser(o) | Type::Control(o) | Type::Package(o) => MethodType {
                type_params: o.type_params.clone(),
                ret: Some(Box::new(container.clone())),
                params: o.ctor_params.clone()?,
            },
            _ => return None,
        };
        let fresh = self.fresh_type_variables(&Type::Method(ctor));
        let mut infos = Vec::with_capacity(args.len());
        for arg in args {
            if !self.typemap.is_compile_time_constant(arg.id) {
                self.error(
                    arg.span,
                    ErrorCategory::Capability,
                    "cannot evaluate to a compile-time constant".into(),
                );
            }
            let ty = self.get_type(arg.id)?;
            infos.push(ArgInfo { ty, is_left_value: true, is_constant: true, span: arg.span });
        }
        let ret = TypeVar::fresh("R");
        let mut constraints = Constraints::new();
        constraints.add_call(
            fresh,
            CallType { type_args: Vec::new(), ret: ret.clone(), args: infos, span },
        );
        let tvs = constraints.solve(span, self.reporter, true)?;
        self.typemap.add_substitutions(&tvs);
        let ret_ty = tvs
            .lookup(&ret)
            .cloned()
            .expect("constructor return type is bound after a successful solve");
        Some(tvs.apply(&ret_ty))
    }

    /// Every abstract method of the extern must be implemented by a
    /// non-generic function of identical type in the instance initializer.
    fn check_abstract_methods(
        &mut self,
        span: Span,
        initializer: Option<&[Declaration]>,
        ext: &ExternType,
    ) -> bool {
        let mut pending: FxHashMap<&str, &ExternMethod> = ext
            .methods
            .iter()
            .filter(|m| m.is_abstract)
            .map(|m| (m.name.as_str(), m))
            .collect();
        match (pending.is_empty(), initializer) {
            (true, None) => true,
            (true, Some(_)) => {
                self.error(
                    span,
                    ErrorCategory::Context,
                    format!("instance initializers are only allowed for externs with abstract methods, {} has none", ext.name),
                );
                false
            }
            (false, None) => {
                self.error(
                    span,
                    ErrorCategory::Inference,
                    format!("must declare abstract methods for {}", ext.name),
                );
                false
            }
            (false, Some(decls)) => {
                for decl in decls {
                    let DeclKind::Function { name, type_params, .. } = &decl.kind else {
                        continue;
                    };
                    if !type_params.is_empty() {
                        self.error(
                            decl.span,
                            ErrorCategory::Arity,
                            "abstract method implementations cannot be generic".into(),
                        );
                        return false;
                    }
                    let Some(function_ty) = self.get_type(decl.id) else { continue };
                    let Some(method) = pending.remove(name.as_str()) else {
                        self.error(
                            decl.span,
                            ErrorCategory::Inference,
                            format!("no matching abstract method named {} in {}", name, ext.name),
                        );
                        return false;
                    };
                    let method_ty = Type::Method(method.ty.clone());
                    let Some(tvs) = self.unify_types(decl.span, &method_ty, &function_ty, true)
                    else {
                        return false;
                    };
                    debug_assert!(
                        tvs.is_identity(),
                        "matching non-generic method types must not bind variables"
                    );
                }
                if let Some(missing) = pending.values().next() {
                    self.error(
                        span,
                        ErrorCategory::Inference,
                        format!("abstract method {} not implemented", missing.name),
                    );
                    return false;
                }
                true
            }
        }
    }

    fn select(
        &mut self,
        id: NodeId,
        span: Span,
        scrutinee: Vec<Expression>,
        cases: Vec<SelectCase>,
    ) -> Expression {
        let scrutinee: Vec<Expression> =
            scrutinee.into_iter().map(|e| self.expression(e)).collect();
        let mut components = Vec::with_capacity(scrutinee.len());
        let mut determined = true;
        for e in &scrutinee {
            match self.get_type(e.id) {
                Some(t) => {
                    if t.is_type_var() {
                        self.error(
                            e.span,
                            ErrorCategory::Inference,
                            "cannot infer a type for this select component".into(),
                        );
                        determined = false;
                    }
                    components.push(t);
                }
                None => determined = false,
            }
        }
        let cases: Vec<SelectCase> = cases
            .into_iter()
            .map(|c| {
                let keyset = self.expression(c.keyset);
                let state = self.expression(*c.state);
                if let Some(state_ty) = self.get_type(state.id) {
                    if state_ty != Type::State {
                        self.error(
                            state.span,
                            ErrorCategory::TypeMismatch,
                            "select case target must be a parser state".into(),
                        );
                    }
                }
                let keyset = if determined {
                    self.match_case(span, &components, keyset)
                } else {
                    keyset
                };
                SelectCase { id: c.id, span: c.span, keyset, state: Box::new(state) }
            })
            .collect();
        self.typemap.set_type(id, Type::State);
        Expression { id, span, kind: ExprKind::Select { scrutinee, cases } }
    }

    /// Unify one select-case keyset with the selector type, unwrapping a
    /// set and flattening the singleton tuple as needed.
    fn match_case(&mut self, span: Span, selector: &[Type], mut keyset: Expression) -> Expression {
        let case_ty = match self.get_type(keyset.id) {
            Some(Type::Set(inner)) => *inner,
            Some(other) => other,
            None => return keyset,
        };
        if matches!(case_ty, Type::Dontcare) {
            return keyset;
        }
        let selector_ty = if !matches!(case_ty, Type::Tuple(_)) {
            if selector.len() != 1 {
                self.error(
                    keyset.span,
                    ErrorCategory::TypeMismatch,
                    format!("keyset type {} does not match the select expression", case_ty),
                );
                return keyset;
            }
            selector[0].clone()
        } else {
            Type::Tuple(selector.to_vec())
        };
        let Some(tvs) = self.unify_types(span, &selector_ty, &case_ty, true) else {
            return keyset;
        };
        substitute_constants(&tvs, self.typemap, &mut keyset);
        keyset
    }

    // ── Assignment ─────────────────────────────────────────────────────

    /// Check that `src` can be assigned to a destination of type `dest`,
    /// inserting an implicit cast or narrowing unsized literals as needed.
    /// Returns the (possibly rewritten) source expression.
    fn assignment(&mut self, span: Span, dest: &Type, src: Expression) -> Expression {
        let Some(src_ty) = self.get_type(src.id) else { return src };
        if *dest == src_ty {
            return src;
        }
        if self.can_implicitly_cast(dest, &src_ty) {
            debug!("inserting implicit cast to {}", dest);
            let is_constant = self.typemap.is_compile_time_constant(src.id);
            let target = self.synthesized_type_expr(dest);
            let cast = Expression::new(
                src.span,
                ExprKind::Cast { target, operand: Box::new(src) },
            );
            self.typemap.set_type(cast.id, dest.clone());
            if is_constant {
                self.typemap.set_compile_time_constant(cast.id);
            }
            return cast;
        }
        let Some(tvs) = self.unify_types(span, dest, &src_ty, true) else {
            return src;
        };
        if tvs.is_identity() {
            return src;
        }
        let mut src = src;
        substitute_constants(&tvs, self.typemap, &mut src);
        src
    }

    /// A surface type node for an implicitly inserted cast. Implicit casts
    /// only ever target bit and bool types.
    fn synthesized_type_expr(&mut self, ty: &Type) -> TypeExpr {
        let kind = match ty {
            Type::Bits { size, signed } => TypeExprKind::Bits { size: *size, signed: *signed },
            Type::Boolean => TypeExprKind::Bool,
            _ => unreachable!("implicit casts only target bit and bool types"),
        };
        let node = TypeExpr::new(Span::synthesized(), kind);
        self.typemap.set_type(node.id, Type::TypeOfType(Box::new(ty.clone())));
        node
    }
}

#[derive(Debug, Clone, Copy)]
enum StructVariant {
    Struct,
    Header,
    Union,
}

fn member_refs(members: &[weft_ast::ast::EnumMember]) -> Vec<EnumMemberRef> {
    members
        .iter()
        .map(|m| EnumMemberRef { id: m.id, name: m.name.clone() })
        .collect()
}
