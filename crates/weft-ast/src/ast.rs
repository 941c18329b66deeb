//! The Weft IR node model.
//!
//! Programs are owned trees of value-shaped nodes. Every node carries a
//! [`NodeId`] allocated from a process-wide counter; identity is distinct
//! from structural equality (`PartialEq` compares whole values, ids
//! included). Passes that rewrite the tree build replacement nodes with
//! fresh ids and leave untouched nodes flowing through by move, so a
//! node's id is stable for as long as the node itself survives.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::span::Span;

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of an IR node, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Allocate a fresh, never-before-used id.
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameter passing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// No direction: compile-time bound or control-plane bound.
    None,
    In,
    Out,
    InOut,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::None => Ok(()),
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
            Direction::InOut => write!(f, "inout"),
        }
    }
}

/// A `@name`-style annotation attached to parameters and fields.
///
/// The checker carries annotations through rewrites but does not interpret
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
}

/// A name reference. Resolution is external: the use site's node id is the
/// key into the [`crate::refmap::ReferenceMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub name: String,
}

impl Path {
    pub fn new(name: impl Into<String>) -> Self {
        Path { name: name.into() }
    }
}

// ── Surface types ──────────────────────────────────────────────────────

/// An explicit bit-string width on an integer literal (`8w42`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitWidth {
    pub size: u32,
    pub signed: bool,
}

/// A type as written in the source.
///
/// Surface types are converted to semantic types by the checker; a
/// `Name` or `Specialized` base resolves through the reference map keyed
/// by the enclosing `TypeExpr`'s id.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeExprKind,
}

impl TypeExpr {
    pub fn new(span: Span, kind: TypeExprKind) -> Self {
        TypeExpr { id: NodeId::fresh(), span, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `bit<n>` / `int<n>`.
    Bits { size: u32, signed: bool },
    /// `varbit<n>`.
    Varbits { size: u32 },
    Bool,
    /// Width-unknown integer type, `int`.
    Int,
    Void,
    /// `_` in a type position.
    Dontcare,
    Name(Path),
    /// `Base<T1, …, Tn>`.
    Specialized { base: Path, args: Vec<TypeExpr> },
    Tuple(Vec<TypeExpr>),
    /// Header stack `T[size]`; the size expression must be constant.
    Stack { element: Box<TypeExpr>, size: Box<Expression> },
}

// ── Expressions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

impl Expression {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Expression { id: NodeId::fresh(), span, kind }
    }

    /// Deep-clone this expression with fresh identity everywhere,
    /// reporting each `(old, new)` id pair to `on_clone`.
    pub fn deep_clone_with(&self, on_clone: &mut impl FnMut(NodeId, NodeId)) -> Expression {
        let kind = match &self.kind {
            ExprKind::Constant { value, base, width } => {
                ExprKind::Constant { value: *value, base: *base, width: *width }
            }
            ExprKind::BoolLiteral(b) => ExprKind::BoolLiteral(*b),
            ExprKind::StringLiteral(s) => ExprKind::StringLiteral(s.clone()),
            ExprKind::Path(p) => ExprKind::Path(p.clone()),
            ExprKind::Member { base, member } => ExprKind::Member {
                base: Box::new(base.deep_clone_with(on_clone)),
                member: member.clone(),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(operand.deep_clone_with(on_clone)),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: Box::new(left.deep_clone_with(on_clone)),
                right: Box::new(right.deep_clone_with(on_clone)),
            },
            ExprKind::Mux { condition, on_true, on_false } => ExprKind::Mux {
                condition: Box::new(condition.deep_clone_with(on_clone)),
                on_true: Box::new(on_true.deep_clone_with(on_clone)),
                on_false: Box::new(on_false.deep_clone_with(on_clone)),
            },
            ExprKind::Cast { target, operand } => ExprKind::Cast {
                target: target.clone(),
                operand: Box::new(operand.deep_clone_with(on_clone)),
            },
            ExprKind::Slice { base, high, low } => ExprKind::Slice {
                base: Box::new(base.deep_clone_with(on_clone)),
                high: Box::new(high.deep_clone_with(on_clone)),
                low: Box::new(low.deep_clone_with(on_clone)),
            },
            ExprKind::Index { base, index } => ExprKind::Index {
                base: Box::new(base.deep_clone_with(on_clone)),
                index: Box::new(index.deep_clone_with(on_clone)),
            },
            ExprKind::List(items) => {
                ExprKind::List(items.iter().map(|e| e.deep_clone_with(on_clone)).collect())
            }
            ExprKind::Call { callee, type_args, args } => ExprKind::Call {
                callee: Box::new(callee.deep_clone_with(on_clone)),
                type_args: type_args.clone(),
                args: args.iter().map(|e| e.deep_clone_with(on_clone)).collect(),
            },
            ExprKind::ConstructorCall { ty, args } => ExprKind::ConstructorCall {
                ty: ty.clone(),
                args: args.iter().map(|e| e.deep_clone_with(on_clone)).collect(),
            },
            ExprKind::Select { scrutinee, cases } => ExprKind::Select {
                scrutinee: scrutinee.iter().map(|e| e.deep_clone_with(on_clone)).collect(),
                cases: cases
                    .iter()
                    .map(|c| {
                        let cloned = SelectCase {
                            id: NodeId::fresh(),
                            span: c.span,
                            keyset: c.keyset.deep_clone_with(on_clone),
                            state: Box::new(c.state.deep_clone_with(on_clone)),
                        };
                        on_clone(c.id, cloned.id);
                        cloned
                    })
                    .collect(),
            },
            ExprKind::Default => ExprKind::Default,
            ExprKind::This => ExprKind::This,
        };
        let clone = Expression { id: NodeId::fresh(), span: self.span, kind };
        on_clone(self.id, clone.id);
        clone
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal. `width` is present for sized literals (`8w42`) and
    /// filled in by the checker when an unsized literal is narrowed.
    Constant { value: i128, base: u32, width: Option<BitWidth> },
    BoolLiteral(bool),
    StringLiteral(String),
    Path(Path),
    Member { base: Box<Expression>, member: String },
    Unary { op: UnaryOp, operand: Box<Expression> },
    Binary { op: BinaryOp, left: Box<Expression>, right: Box<Expression> },
    Mux {
        condition: Box<Expression>,
        on_true: Box<Expression>,
        on_false: Box<Expression>,
    },
    Cast { target: TypeExpr, operand: Box<Expression> },
    /// Bit slice `base[high:low]`.
    Slice {
        base: Box<Expression>,
        high: Box<Expression>,
        low: Box<Expression>,
    },
    /// Header-stack indexing `base[index]`.
    Index { base: Box<Expression>, index: Box<Expression> },
    /// `{ e1, …, en }`.
    List(Vec<Expression>),
    Call {
        callee: Box<Expression>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expression>,
    },
    ConstructorCall { ty: TypeExpr, args: Vec<Expression> },
    Select { scrutinee: Vec<Expression>, cases: Vec<SelectCase> },
    /// `default` / `_` in a keyset or switch label.
    Default,
    /// The enclosing instance, inside an abstract-method implementation.
    This,
}

/// One arm of a `select` expression; `state` is a path to a parser state.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCase {
    pub id: NodeId,
    pub span: Span,
    pub keyset: Expression,
    pub state: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `~`
    Cmpl,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Cmpl => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    /// `++`
    Concat,
    /// `..` keyset range
    Range,
    /// `&&&` keyset mask
    Mask,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Concat => "++",
            BinaryOp::Range => "..",
            BinaryOp::Mask => "&&&",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

// ── Statements ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

impl Statement {
    pub fn new(span: Span, kind: StmtKind) -> Self {
        Statement { id: NodeId::fresh(), span, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Vec<Statement>),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    Switch { expression: Expression, cases: Vec<SwitchCase> },
    Assignment { target: Expression, value: Expression },
    /// An expression statement; the expression is a call.
    Call(Expression),
    Return(Option<Expression>),
    /// A local declaration (constant, variable, or instance).
    Declaration(Box<Declaration>),
    Empty,
}

/// One arm of a `switch`; `label` is a path to an action or `Default`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub id: NodeId,
    pub span: Span,
    pub label: Expression,
    pub body: Option<Statement>,
}

// ── Declarations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub id: NodeId,
    pub span: Span,
    pub annotations: Vec<Annotation>,
    pub direction: Direction,
    pub ty: TypeExpr,
    pub name: String,
}

/// A declared type parameter (`<T>`).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub id: NodeId,
    pub span: Span,
    pub annotations: Vec<Annotation>,
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
}

/// The header of a parser, control, or package type: name, type
/// parameters, and the (apply or constructor) parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Parameter>,
}

/// A method prototype inside an `extern` declaration. A prototype named
/// like the extern itself is a constructor and has no return type.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodProto {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub is_abstract: bool,
    pub type_params: Vec<TypeParam>,
    pub return_type: Option<TypeExpr>,
    pub params: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserState {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub statements: Vec<Statement>,
    /// `select(...)` expression or a direct path to the next state.
    pub transition: Option<Expression>,
}

/// A table property (`key`, `actions`, `default_action`, …).
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub const ACTIONS: &'static str = "actions";
    pub const KEY: &'static str = "key";
    pub const DEFAULT_ACTION: &'static str = "default_action";
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Actions(Vec<ActionRef>),
    Key(Vec<KeyElement>),
    Expression(Expression),
}

/// An entry in a table's `actions` list: a path or a partial call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRef {
    pub id: NodeId,
    pub span: Span,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyElement {
    pub id: NodeId,
    pub span: Span,
    pub expression: Expression,
    /// A path to a `match_kind` member.
    pub match_kind: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub id: NodeId,
    pub span: Span,
    pub kind: DeclKind,
}

impl Declaration {
    pub fn new(span: Span, kind: DeclKind) -> Self {
        Declaration { id: NodeId::fresh(), span, kind }
    }

    /// The declared name, if this declaration introduces one.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            DeclKind::Constant { name, .. }
            | DeclKind::Variable { name, .. }
            | DeclKind::Instance { name, .. }
            | DeclKind::Extern { name, .. }
            | DeclKind::Function { name, .. }
            | DeclKind::Action { name, .. }
            | DeclKind::Table { name, .. }
            | DeclKind::Enum { name, .. }
            | DeclKind::Struct { name, .. }
            | DeclKind::Header { name, .. }
            | DeclKind::HeaderUnion { name, .. }
            | DeclKind::Typedef { name, .. } => Some(name),
            DeclKind::ParserType(o) | DeclKind::ControlType(o) | DeclKind::Package(o) => {
                Some(&o.name)
            }
            DeclKind::Parser { object, .. } | DeclKind::Control { object, .. } => {
                Some(&object.name)
            }
            DeclKind::ExternFunction(proto) => Some(&proto.name),
            DeclKind::Errors { .. } | DeclKind::MatchKinds { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Constant {
        name: String,
        ty: TypeExpr,
        initializer: Expression,
    },
    Variable {
        name: String,
        ty: TypeExpr,
        initializer: Option<Expression>,
    },
    /// `Type(args) name;`: instantiation of an extern or container. The
    /// initializer block, when present, supplies abstract-method
    /// implementations as `Function` declarations.
    Instance {
        name: String,
        ty: TypeExpr,
        args: Vec<Expression>,
        initializer: Option<Vec<Declaration>>,
    },
    /// `parser Name<...>(...)` interface type.
    ParserType(ObjectType),
    /// `control Name<...>(...)` interface type.
    ControlType(ObjectType),
    /// `package Name<...>(...)`; the parameters are constructor parameters.
    Package(ObjectType),
    /// A parser definition: its interface, constructor parameters, local
    /// declarations, and states.
    Parser {
        object: ObjectType,
        ctor_params: Vec<Parameter>,
        locals: Vec<Declaration>,
        states: Vec<ParserState>,
    },
    /// A control definition.
    Control {
        object: ObjectType,
        ctor_params: Vec<Parameter>,
        locals: Vec<Declaration>,
        body: Statement,
    },
    Extern {
        name: String,
        type_params: Vec<TypeParam>,
        methods: Vec<MethodProto>,
    },
    /// A free-standing extern function declaration.
    ExternFunction(MethodProto),
    Function {
        name: String,
        type_params: Vec<TypeParam>,
        return_type: TypeExpr,
        params: Vec<Parameter>,
        body: Statement,
    },
    Action {
        name: String,
        params: Vec<Parameter>,
        body: Statement,
    },
    Table {
        name: String,
        properties: Vec<Property>,
    },
    Enum {
        name: String,
        members: Vec<EnumMember>,
    },
    /// `error { ... }`, declaring error constants.
    Errors { members: Vec<EnumMember> },
    /// `match_kind { ... }`.
    MatchKinds { members: Vec<EnumMember> },
    Struct {
        name: String,
        fields: Vec<StructField>,
    },
    Header {
        name: String,
        fields: Vec<StructField>,
    },
    HeaderUnion {
        name: String,
        fields: Vec<StructField>,
    },
    Typedef { name: String, ty: TypeExpr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub id: NodeId,
    pub span: Span,
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Program { id: NodeId::fresh(), span: Span::synthesized(), declarations }
    }
}
