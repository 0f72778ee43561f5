use php_refactor_core::line_index::LineIndex;
use php_refactor_core::span::Span;

#[test]
fn line_col_round_trips_across_multiple_lines() {
    let code = b"line1\nline2\nline3";
    let index = LineIndex::new(code);

    assert_eq!(index.line_col(0), (0, 0));
    assert_eq!(index.line_col(5), (0, 5));
    assert_eq!(index.line_col(6), (1, 0));
    assert_eq!(index.line_col(11), (1, 5));
    assert_eq!(index.line_col(12), (2, 0));
    assert_eq!(index.line_col(17), (2, 5));
}

#[test]
fn offset_is_the_inverse_of_line_col() {
    let code = b"abc\ndef";
    let index = LineIndex::new(code);

    assert_eq!(index.offset(0, 0), Some(0));
    assert_eq!(index.offset(0, 3), Some(3));
    assert_eq!(index.offset(1, 0), Some(4));
    assert_eq!(index.offset(1, 3), Some(7));
    assert_eq!(index.offset(2, 0), None);
}

#[test]
fn lsp_range_covers_a_single_line_token() {
    let code = b"function foo() {}";
    let index = LineIndex::new(code);

    let span = Span::new(9, 12);
    let (start_line, start_col, end_line, end_col) = index.to_lsp_range(span);

    assert_eq!((start_line, start_col, end_line, end_col), (0, 9, 0, 12));
}

#[test]
fn source_span_is_one_based() {
    let code = b"<?php\necho 1;";
    let index = LineIndex::new(code);

    let span = Span::new(6, 10); // "echo"
    let source_span = index.source_span(span);

    assert_eq!(source_span.start.line, 2);
    assert_eq!(source_span.start.column, 1);
    assert_eq!(source_span.start.offset, 6);
}
