use bumpalo::Bump;
use php_refactor_core::ast::Stmt;
use php_refactor_core::parser::{parse_source, try_parse, ParseOptions};
use php_refactor_core::lexer::{tokenize, LexOptions};

#[test]
fn missing_semicolon_is_recorded_and_parsing_continues() {
    let code = b"<?php
    echo 1
    echo 2;
    ";
    let arena = Bump::new();
    let options = ParseOptions { error_recovery: true, ..ParseOptions::default() };
    let program = parse_source(code, &arena, options);

    assert!(!program.errors.is_empty(), "expected a missing-semicolon diagnostic");
    assert_eq!(
        program
            .statements
            .iter()
            .filter(|s| matches!(***s, Stmt::Echo { .. }))
            .count(),
        2,
        "both echo statements should still have parsed"
    );
}

#[test]
fn unclosed_brace_does_not_hang_the_parser() {
    let code = b"<?php
    if (true) {
        echo 1;
    echo 2;
    ";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    // Recovery must terminate (this test times out via the harness if it doesn't)
    // and record at least the unbalanced brace as a diagnostic.
    assert!(!program.errors.is_empty());
}

#[test]
fn try_parse_returns_first_error_without_recovery() {
    let code = b"<?php class {}";
    let arena = Bump::new();
    let tokens = tokenize(code, LexOptions::default());
    let result = try_parse(tokens, &arena, code);
    assert!(result.is_err(), "a missing class name should fail without recovery");
}

#[test]
fn well_formed_source_has_no_errors() {
    let code = b"<?php
    function add($a, $b) {
        return $a + $b;
    }
    echo add(1, 2);
    ";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);
}
