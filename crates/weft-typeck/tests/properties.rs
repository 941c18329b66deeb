//! Whole-pipeline properties: idempotence, canonicalization uniqueness and
//! stability, substitution soundness, and the read-only re-check.

mod common;

use common::*;
use weft_ast::ast::{BinaryOp, DeclKind, Direction};
use weft_ast::refmap::ReferenceMap;
use weft_ast::span::Span;
use weft_typeck::error::Reporter;
use weft_typeck::infer::TypeInference;
use weft_typeck::ty::{Type, TypeVar};
use weft_typeck::typemap::TypeMap;
use weft_typeck::unify::Constraints;
use weft_typeck::{check, check_with, Options};

fn sample_declarations() -> Vec<weft_ast::ast::Declaration> {
    let f = extern_func("f", vec![], bit(32), vec![param(Direction::In, bit(32), "x")]);
    let body = block(vec![assign(
        path("r"),
        bin(BinaryOp::Add, cst(3), call(path("f"), vec![wcst(32, 4)])),
    )]);
    let c = control("c", vec![param(Direction::InOut, bit(32), "r")], vec![], body);
    vec![f, c]
}

#[test]
fn rechecking_a_typed_program_is_a_no_op() {
    let result = check_program(sample_declarations());
    assert_ok(&result);

    let map = bind(&result.program);
    let before = result.program.clone();
    let entries_before = result.typemap.len();
    let second = check_with(
        result.typemap,
        result.program,
        &map,
        &Options { read_only: true, update_expressions: false },
    );
    assert!(!second.has_errors(), "got: {:#?}", second.diagnostics);
    assert_eq!(second.program, before);
    assert_eq!(second.typemap.len(), entries_before);
}

#[test]
fn applied_types_survive_a_recheck() {
    let p = program(sample_declarations());
    let map = bind(&p);
    let result = check(p, &map, &Options { read_only: false, update_expressions: true });
    assert!(!result.has_errors(), "got: {:#?}", result.diagnostics);

    // Every cloned expression root carries a type.
    let DeclKind::Control { body, .. } = &result.program.declarations[1].kind else { panic!() };
    let weft_ast::ast::StmtKind::Block(stmts) = &body.kind else { panic!() };
    let weft_ast::ast::StmtKind::Assignment { target, value } = &stmts[0].kind else { panic!() };
    assert!(result.typemap.get_type(target.id).is_some());
    assert_eq!(result.typemap.get_type(value.id), Some(&Type::bits(32, false)));

    // Feeding the output back through inference changes nothing.
    let map = bind(&result.program);
    let before = result.program.clone();
    let second = check_with(
        result.typemap,
        result.program,
        &map,
        &Options { read_only: true, update_expressions: false },
    );
    assert!(!second.has_errors(), "got: {:#?}", second.diagnostics);
    assert_eq!(second.program, before);
}

#[test]
fn structurally_equal_types_canonicalize_to_equal_representatives() {
    let a = typedef_d("A", tuple_ty(vec![bit(8), bool_ty()]));
    let b = typedef_d("B", tuple_ty(vec![bit(8), bool_ty()]));
    let a_id = a.id;
    let b_id = b.id;
    let result = check_program(vec![a, b]);
    assert_ok(&result);

    let (Some(Type::TypeOfType(ta)), Some(Type::TypeOfType(tb))) =
        (result.typemap.get_type(a_id), result.typemap.get_type(b_id))
    else {
        panic!("typedefs must denote types");
    };
    assert_eq!(ta, tb);
}

#[test]
fn canonicalization_is_stable_and_lifts_sets_out_of_tuples() {
    let map = ReferenceMap::new();
    let mut typemap = TypeMap::new();
    let mut reporter = Reporter::new();
    let mut inference = TypeInference::new(&map, &mut typemap, &mut reporter);

    let ty = Type::Tuple(vec![
        Type::Set(Box::new(Type::bits(8, false))),
        Type::bits(16, false),
    ]);
    let once = inference.canonicalize(&ty).expect("canonicalization succeeds");
    match &once {
        Type::Set(inner) => {
            assert_eq!(
                **inner,
                Type::Tuple(vec![Type::bits(8, false), Type::bits(16, false)])
            );
        }
        other => panic!("expected the set to lift over the tuple, got {other}"),
    }
    let twice = inference.canonicalize(&once).expect("canonicalization succeeds");
    assert_eq!(once, twice);
}

#[test]
fn solved_substitutions_equate_both_sides() {
    let var = TypeVar::fresh("T");
    let dest = Type::Tuple(vec![Type::Var(var), Type::bits(8, false)]);
    let src = Type::Tuple(vec![Type::bits(16, true), Type::bits(8, false)]);

    let mut constraints = Constraints::new();
    constraints.add_equality(dest.clone(), src.clone());
    let mut reporter = Reporter::new();
    let subst = constraints
        .solve(Span::synthesized(), &mut reporter, false)
        .expect("constraints are satisfiable");
    assert_eq!(subst.apply(&dest), subst.apply(&src));
}

#[test]
fn assignment_targets_are_left_values_in_the_output() {
    let result = check_program(sample_declarations());
    assert_ok(&result);
    let DeclKind::Control { body, .. } = &result.program.declarations[1].kind else { panic!() };
    let weft_ast::ast::StmtKind::Block(stmts) = &body.kind else { panic!() };
    let weft_ast::ast::StmtKind::Assignment { target, .. } = &stmts[0].kind else { panic!() };
    assert!(result.typemap.is_left_value(target.id));
}
