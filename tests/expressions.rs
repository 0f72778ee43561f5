use bumpalo::Bump;
use php_refactor_core::ast::{BinaryOp, Expr, ExprId, Stmt};
use php_refactor_core::parser::{parse_source, ParseOptions};

fn first_expr_stmt<'a>(statements: &'a [&'a Stmt<'a>]) -> ExprId<'a> {
    statements
        .iter()
        .find_map(|stmt| match **stmt {
            Stmt::Expression { expr, .. } => Some(expr),
            _ => None,
        })
        .expect("expected an expression statement")
}

#[test]
fn parses_binary_precedence() {
    let code = b"<?php 1 + 2 * 3;";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let expr = first_expr_stmt(program.statements);
    match *expr {
        Expr::Binary { op: BinaryOp::Plus, right, .. } => {
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
        }
        ref other => panic!("expected top-level addition, got {other:?}"),
    }
}

#[test]
fn parses_match_expression() {
    let code = b"<?php
$label = match (true) {
    $x > 0 => 'positive',
    $x < 0 => 'negative',
    default => 'zero',
};
";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let expr = first_expr_stmt(program.statements);
    let Expr::Assign { expr: inner, .. } = *expr else {
        panic!("expected an assignment, got {expr:?}");
    };
    let Expr::Match { arms, .. } = *inner else {
        panic!("expected a match expression, got {inner:?}");
    };
    assert_eq!(arms.len(), 3);
    assert!(arms[2].conditions.is_none(), "last arm should be the default");
}

#[test]
fn parses_arrow_function_closure_capture() {
    let code = b"<?php $add = fn($a) => $a + $base;";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let expr = first_expr_stmt(program.statements);
    let Expr::Assign { expr: inner, .. } = *expr else {
        panic!("expected an assignment, got {expr:?}");
    };
    assert!(matches!(*inner, Expr::ArrowFunction { .. }));
}

#[test]
fn parses_nullsafe_chain() {
    let code = b"<?php $user?->address?->city;";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let expr = first_expr_stmt(program.statements);
    assert!(matches!(*expr, Expr::NullsafePropertyFetch { .. }));
}

#[test]
fn exit_die_and_halt_compiler_all_parse_to_exit() {
    for code in [
        &b"<?php exit;"[..],
        &b"<?php exit(1);"[..],
        &b"<?php die('bye');"[..],
        &b"<?php __halt_compiler();"[..],
    ] {
        let arena = Bump::new();
        let program = parse_source(code, &arena, ParseOptions::default());
        assert!(program.errors.is_empty(), "unexpected errors for {code:?}: {:?}", program.errors);
        let expr = first_expr_stmt(program.statements);
        assert!(
            matches!(*expr, Expr::Exit { .. }),
            "expected Expr::Exit for {code:?}, got {expr:?}"
        );
    }
}
