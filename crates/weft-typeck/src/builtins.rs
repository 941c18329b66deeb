//! Built-in member types synthesized by the checker.
//!
//! Headers, header stacks, and tables expose members that no declaration
//! provides; their types are constructed here on demand.

use weft_ast::ast::{Direction, NodeId};

use crate::ty::{
    ActionEnumType, Field, MethodType, Param, StructType, TableType, Type,
};

/// Header validity members.
pub const IS_VALID: &str = "isValid";
pub const SET_VALID: &str = "setValid";
pub const SET_INVALID: &str = "setInvalid";

/// Stack members.
pub const NEXT: &str = "next";
pub const LAST: &str = "last";
pub const SIZE: &str = "size";
pub const LAST_INDEX: &str = "lastIndex";
pub const PUSH_FRONT: &str = "push_front";
pub const POP_FRONT: &str = "pop_front";

/// The apply member of parsers, controls, and tables.
pub const APPLY: &str = "apply";

/// Members of a table's apply result.
pub const HIT: &str = "hit";
pub const ACTION_RUN: &str = "action_run";

/// Width of the `size` stack member.
pub const STACK_SIZE_WIDTH: u32 = 32;

/// `isValid(): bool`
pub fn header_is_valid() -> Type {
    Type::Method(MethodType {
        type_params: vec![],
        ret: Some(Box::new(Type::Boolean)),
        params: vec![],
    })
}

/// `setValid(): void` / `setInvalid(): void`
pub fn header_set_validity() -> Type {
    Type::Method(MethodType {
        type_params: vec![],
        ret: Some(Box::new(Type::Void)),
        params: vec![],
    })
}

/// `push_front(count)` / `pop_front(count)`: one width-unknown integer
/// argument, no result.
pub fn stack_resize() -> Type {
    Type::Method(MethodType {
        type_params: vec![],
        ret: Some(Box::new(Type::Void)),
        params: vec![Param {
            id: NodeId::fresh(),
            name: "count".into(),
            direction: Direction::In,
            ty: Type::inf_int(),
        }],
    })
}

/// The type of `stack.size`.
pub fn stack_size() -> Type {
    Type::bits(STACK_SIZE_WIDTH, false)
}

/// The type of `stack.lastIndex`.
pub fn stack_last_index() -> Type {
    Type::bits(STACK_SIZE_WIDTH, true)
}

/// The synthesized result struct of applying a table: a `hit` flag and the
/// enum of actions that may have run. Shares the table's declaration
/// identity, so each table gets exactly one such type.
pub fn table_apply_result(table: &TableType) -> Type {
    Type::Struct(StructType {
        decl: table.decl,
        name: format!("{}_apply_result", table.name),
        fields: vec![
            Field { id: table.decl, name: HIT.into(), ty: Type::Boolean },
            Field {
                id: table.decl,
                name: ACTION_RUN.into(),
                ty: Type::ActionEnum(ActionEnumType {
                    table: table.decl,
                    table_name: table.name.clone(),
                    actions: table.actions.clone(),
                }),
            },
        ],
    })
}

/// The apply method of a table: no parameters, returns the apply result.
pub fn table_apply(table: &TableType) -> Type {
    Type::Method(MethodType {
        type_params: vec![],
        ret: Some(Box::new(table_apply_result(table))),
        params: vec![],
    })
}
