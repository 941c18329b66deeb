//! Semantic type representation for the Weft type system.
//!
//! The checker converts surface type syntax into these values, canonicalizes
//! them, and records them in the type registry. Structural equality doubles
//! as the registry's equivalence relation: compound types compare by
//! structure, nominal types (struct-likes, enums, externs, tables, objects)
//! compare by the identity of their declaration, and width-unknown integer
//! types compare equal regardless of which literal they came from.

use std::fmt;
use std::hash::{Hash, Hasher};

use weft_ast::ast::{Direction, NodeId};

/// A substitutable type variable.
///
/// Declared type parameters and freshly-allocated inference variables share
/// one id space (node ids). The name is only for display; identity is the
/// id, which is what `PartialEq` and `Hash` use.
#[derive(Debug, Clone, Eq)]
pub struct TypeVar {
    pub id: u32,
    pub name: String,
}

impl TypeVar {
    /// A variable standing for a declared type parameter.
    pub fn from_decl(decl: NodeId, name: impl Into<String>) -> Self {
        TypeVar { id: decl.0, name: name.into() }
    }

    /// A fresh variable, never used before in this process.
    pub fn fresh(name: impl Into<String>) -> Self {
        TypeVar { id: NodeId::fresh().0, name: name.into() }
    }
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id // name intentionally excluded
    }
}

impl Hash for TypeVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state); // name intentionally excluded
    }
}

/// The width variable carried by a width-unknown integer type.
///
/// Any two width-unknown integer types are *equivalent* (equality ignores
/// the id), but each unsized literal gets its own id so the unifier can
/// bind exactly that literal's width and the constant rewrite can find it.
#[derive(Debug, Clone, Copy, Eq)]
pub struct WidthVar(pub u32);

impl WidthVar {
    pub fn fresh() -> Self {
        WidthVar(NodeId::fresh().0)
    }
}

impl PartialEq for WidthVar {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Hash for WidthVar {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// A parameter of a method, action, or object type.
///
/// Equality compares direction and type only: parameter names and the
/// declaring node do not affect whether two signatures are the same type.
#[derive(Debug, Clone, Eq)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub direction: Direction,
    pub ty: Type,
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.direction == other.direction && self.ty == other.ty
    }
}

impl Hash for Param {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.direction.hash(state);
        self.ty.hash(state);
    }
}

/// A field of a struct, header, or header union.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
}

/// A member of an enum or error declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumMemberRef {
    pub id: NodeId,
    pub name: String,
}

macro_rules! nominal_eq {
    ($ty:ident by $field:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.$field == other.$field
            }
        }
        impl Eq for $ty {}
        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.$field.hash(state);
            }
        }
    };
}

/// A struct, header, or header-union type. Nominal: compares by declaration.
#[derive(Debug, Clone)]
pub struct StructType {
    pub decl: NodeId,
    pub name: String,
    pub fields: Vec<Field>,
}

nominal_eq!(StructType by decl);

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// An enum type. Nominal.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub decl: NodeId,
    pub name: String,
    pub members: Vec<EnumMemberRef>,
}

nominal_eq!(EnumType by decl);

/// The program's error-constant type. Nominal per declaration.
#[derive(Debug, Clone)]
pub struct ErrorType {
    pub decl: NodeId,
    pub members: Vec<EnumMemberRef>,
}

nominal_eq!(ErrorType by decl);

/// The synthetic enum of a table's actions, produced by `apply().action_run`.
#[derive(Debug, Clone)]
pub struct ActionEnumType {
    pub table: NodeId,
    pub table_name: String,
    pub actions: Vec<String>,
}

nominal_eq!(ActionEnumType by table);

impl ActionEnumType {
    pub fn contains(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }
}

/// A header stack. The size is `None` while it is not yet known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackType {
    pub element: Box<Type>,
    pub size: Option<u32>,
}

/// A method signature. `ret` is `None` for constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
    pub type_params: Vec<TypeVar>,
    pub ret: Option<Box<Type>>,
    pub params: Vec<Param>,
}

/// An action signature: parameters only, never a return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionType {
    pub params: Vec<Param>,
}

/// A parser, control, or package type.
///
/// `params` is the apply-parameter list (empty for packages);
/// `ctor_params` is present for instantiable entities: parser and control
/// definitions, and packages. Nominal: compares by declaration.
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub decl: NodeId,
    pub name: String,
    pub type_params: Vec<TypeVar>,
    pub params: Vec<Param>,
    pub ctor_params: Option<Vec<Param>>,
}

nominal_eq!(ObjectType by decl);

/// A method of an extern type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternMethod {
    pub id: NodeId,
    pub name: String,
    pub is_abstract: bool,
    pub ty: MethodType,
}

/// An extern object type. Nominal.
#[derive(Debug, Clone)]
pub struct ExternType {
    pub decl: NodeId,
    pub name: String,
    pub type_params: Vec<TypeVar>,
    pub methods: Vec<ExternMethod>,
}

nominal_eq!(ExternType by decl);

impl ExternType {
    /// Overload resolution: methods are distinguished by name and arity.
    pub fn method(&self, name: &str, arity: usize) -> Option<&ExternMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.ty.params.len() == arity)
    }
}

/// The anonymous type of a table declaration. Nominal.
#[derive(Debug, Clone)]
pub struct TableType {
    pub decl: NodeId,
    pub name: String,
    pub actions: Vec<String>,
}

nominal_eq!(TableType by decl);

/// A specialized generic in canonical form: the generic declaration's type,
/// the canonical type arguments, and the fully substituted body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecializedType {
    pub base: Box<Type>,
    pub args: Vec<Type>,
    pub substituted: Box<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Fixed-width bit string; `signed` selects two's-complement integers.
    Bits { size: u32, signed: bool },
    /// Variable-length bit string with a maximum width.
    Varbits { size: u32 },
    Boolean,
    String,
    /// Width-unknown integer literal type.
    InfInt(WidthVar),
    Dontcare,
    /// Parser state tag.
    State,
    Void,
    MatchKind,
    Error(ErrorType),
    Enum(EnumType),
    ActionEnum(ActionEnumType),
    /// Pattern-set type, as produced by range and mask expressions.
    Set(Box<Type>),
    Stack(StackType),
    Tuple(Vec<Type>),
    Struct(StructType),
    Header(StructType),
    Union(StructType),
    /// A declared type parameter, awaiting specialization.
    Param(TypeVar),
    /// An inference variable, bound by the unifier.
    Var(TypeVar),
    Parser(ObjectType),
    Control(ObjectType),
    Package(ObjectType),
    Extern(ExternType),
    Method(MethodType),
    Action(ActionType),
    Table(TableType),
    /// Surface form of `Base<T1, …, Tn>`; canonicalizes to
    /// [`Type::SpecializedCanonical`].
    Specialized { base: Box<Type>, args: Vec<Type> },
    SpecializedCanonical(SpecializedType),
    /// The type of an expression that *denotes* a type rather than a value.
    TypeOfType(Box<Type>),
}

impl Type {
    pub fn bits(size: u32, signed: bool) -> Type {
        Type::Bits { size, signed }
    }

    pub fn inf_int() -> Type {
        Type::InfInt(WidthVar::fresh())
    }

    pub fn is_bits(&self) -> bool {
        matches!(self, Type::Bits { .. })
    }

    pub fn as_bits(&self) -> Option<(u32, bool)> {
        match self {
            Type::Bits { size, signed } => Some((*size, *signed)),
            _ => None,
        }
    }

    /// The substituted body of a canonical specialization, otherwise self.
    pub fn strip_specialized(&self) -> &Type {
        match self {
            Type::SpecializedCanonical(s) => &s.substituted,
            other => other,
        }
    }

    /// Whether values of this type can be constructed by instantiation.
    pub fn is_container(&self) -> bool {
        match self {
            Type::Parser(o) | Type::Control(o) | Type::Package(o) => o.ctor_params.is_some(),
            _ => false,
        }
    }

    /// The declared type parameters of a generic entity, if it has any.
    pub fn type_params(&self) -> Option<&[TypeVar]> {
        match self {
            Type::Method(m) => Some(&m.type_params),
            Type::Extern(e) => Some(&e.type_params),
            Type::Parser(o) | Type::Control(o) | Type::Package(o) => Some(&o.type_params),
            _ => None,
        }
    }

    /// Whether this is a substitutable variable (inference variable or
    /// width-unknown integer).
    pub fn is_type_var(&self) -> bool {
        matches!(self, Type::Var(_) | Type::Param(_) | Type::InfInt(_))
    }

    /// The id the unifier binds for this type, when it is a variable.
    pub fn type_var_id(&self) -> Option<u32> {
        match self {
            Type::Var(v) | Type::Param(v) => Some(v.id),
            Type::InfInt(w) => Some(w.0),
            _ => None,
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    write!(f, "(")?;
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match p.direction {
            Direction::None => {}
            d => write!(f, "{} ", d)?,
        }
        write!(f, "{} {}", p.ty, p.name)?;
    }
    write!(f, ")")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bits { size, signed } => {
                if *signed {
                    write!(f, "int<{}>", size)
                } else {
                    write!(f, "bit<{}>", size)
                }
            }
            Type::Varbits { size } => write!(f, "varbit<{}>", size),
            Type::Boolean => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::InfInt(_) => write!(f, "int"),
            Type::Dontcare => write!(f, "_"),
            Type::State => write!(f, "state"),
            Type::Void => write!(f, "void"),
            Type::MatchKind => write!(f, "match_kind"),
            Type::Error(_) => write!(f, "error"),
            Type::Enum(e) => write!(f, "{}", e.name),
            Type::ActionEnum(a) => write!(f, "actions of table {}", a.table_name),
            Type::Set(t) => write!(f, "set<{}>", t),
            Type::Stack(s) => match s.size {
                Some(n) => write!(f, "{}[{}]", s.element, n),
                None => write!(f, "{}[]", s.element),
            },
            Type::Tuple(ts) => {
                write!(f, "tuple<")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ">")
            }
            Type::Struct(s) | Type::Header(s) | Type::Union(s) => write!(f, "{}", s.name),
            Type::Param(v) | Type::Var(v) => write!(f, "{}", v.name),
            Type::Parser(o) | Type::Control(o) | Type::Package(o) => write!(f, "{}", o.name),
            Type::Extern(e) => write!(f, "{}", e.name),
            Type::Method(m) => {
                if !m.type_params.is_empty() {
                    write!(f, "<")?;
                    for (i, tp) in m.type_params.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", tp.name)?;
                    }
                    write!(f, ">")?;
                }
                write_params(f, &m.params)?;
                match &m.ret {
                    Some(r) => write!(f, " -> {}", r),
                    None => Ok(()),
                }
            }
            Type::Action(a) => {
                write!(f, "action")?;
                write_params(f, &a.params)
            }
            Type::Table(t) => write!(f, "table {}", t.name),
            Type::Specialized { base, args } | Type::SpecializedCanonical(SpecializedType { base, args, .. }) => {
                write!(f, "{}<", base)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ">")
            }
            Type::TypeOfType(t) => write!(f, "type {}", t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_display() {
        assert_eq!(Type::bits(32, false).to_string(), "bit<32>");
        assert_eq!(Type::bits(8, true).to_string(), "int<8>");
    }

    #[test]
    fn inf_int_equivalence_ignores_identity() {
        let a = Type::inf_int();
        let b = Type::inf_int();
        assert_eq!(a, b);
        assert_ne!(a.type_var_id(), b.type_var_id());
    }

    #[test]
    fn type_vars_compare_by_id() {
        let a = TypeVar::fresh("T");
        let b = TypeVar::fresh("T");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn struct_types_compare_by_declaration() {
        let decl = NodeId::fresh();
        let a = StructType { decl, name: "S".into(), fields: vec![] };
        let b = StructType {
            decl,
            name: "S".into(),
            fields: vec![Field { id: NodeId::fresh(), name: "f".into(), ty: Type::Boolean }],
        };
        assert_eq!(Type::Struct(a), Type::Struct(b));
    }
}
