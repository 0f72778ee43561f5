use bumpalo::Bump;
use php_refactor_core::ast::{Expr, ExprId, Stmt};
use php_refactor_core::lexer::token::TokenKind;
use php_refactor_core::lexer::{tokenize, LexOptions};
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
fn single_and_double_quoted_strings_are_distinguished_by_source_byte() {
    let code = b"<?php 'plain $x'; \"interpolated $x\";";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let Stmt::Expression { expr: first, .. } = *program.statements[0] else {
        unreachable!()
    };
    let Stmt::Expression { expr: second, .. } = *program.statements[1] else {
        unreachable!()
    };

    assert!(matches!(*first, Expr::String { .. }));
    match *second {
        Expr::TemplateString { raw, is_nowdoc, .. } => {
            assert!(!is_nowdoc);
            assert_eq!(raw[0], b'"');
        }
        ref other => panic!("expected a template string, got {other:?}"),
    }
}

#[test]
fn heredoc_body_is_carried_raw_without_interpolation_splitting() {
    let code = b"<?php
$msg = <<<EOT
hello $name
EOT;
";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let expr = first_expr_stmt(program.statements);
    let Expr::Assign { expr: inner, .. } = *expr else {
        panic!("expected an assignment, got {expr:?}");
    };
    match *inner {
        Expr::TemplateString { raw, is_nowdoc, .. } => {
            assert!(!is_nowdoc);
            assert_eq!(raw, b"hello $name\n");
        }
        ref other => panic!("expected a heredoc template string, got {other:?}"),
    }
}

#[test]
fn nowdoc_is_flagged_and_keeps_literal_dollar_sign() {
    let code = b"<?php
$msg = <<<'EOT'
hello $name
EOT;
";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let expr = first_expr_stmt(program.statements);
    let Expr::Assign { expr: inner, .. } = *expr else {
        panic!("expected an assignment, got {expr:?}");
    };
    match *inner {
        Expr::TemplateString { raw, is_nowdoc, .. } => {
            assert!(is_nowdoc);
            assert_eq!(raw, b"hello $name\n");
        }
        ref other => panic!("expected a nowdoc template string, got {other:?}"),
    }
}

#[test]
fn shell_exec_produces_raw_backtick_expression() {
    let code = b"<?php `ls -la`;";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let expr = first_expr_stmt(program.statements);
    match *expr {
        Expr::ShellExec { raw, .. } => assert_eq!(raw[0], b'`'),
        ref other => panic!("expected a shell-exec expression, got {other:?}"),
    }
}

#[test]
fn lexer_scans_heredoc_as_three_atomic_tokens() {
    let code = b"<?php
$x = <<<EOT
hello world
EOT;
";
    let tokens = tokenize(code, LexOptions::default());
    let kinds: Vec<TokenKind> = tokens
        .iter()
        .map(|t| t.kind)
        .filter(|k| !matches!(k, TokenKind::Whitespace | TokenKind::Newline))
        .collect();

    assert!(kinds.contains(&TokenKind::StartHeredoc));
    assert!(kinds.contains(&TokenKind::EncapsedAndWhitespace));
    assert!(kinds.contains(&TokenKind::EndHeredoc));

    let body = tokens
        .iter()
        .find(|t| t.kind == TokenKind::EncapsedAndWhitespace)
        .expect("expected an encapsed body token");
    assert_eq!(body.span.as_str(code), b"hello world\n");
}
