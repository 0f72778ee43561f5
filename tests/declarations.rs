use bumpalo::Bump;
use php_refactor_core::ast::{ClassMember, Stmt};
use php_refactor_core::parser::{parse_source, ParseOptions};

#[test]
fn parses_class_with_members() {
    let code = b"<?php
class Point {
    public float $x = 0.0;
    public float $y = 0.0;

    public function __construct(float $x, float $y) {
        $this->x = $x;
        $this->y = $y;
    }
}
";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let class = program
        .statements
        .iter()
        .find_map(|stmt| match **stmt {
            Stmt::Class { name, members, .. } => Some((name, members)),
            _ => None,
        })
        .expect("expected a class declaration");

    assert_eq!(class.0.span.as_str(code), b"Point");
    assert_eq!(class.1.len(), 3);
    assert!(matches!(class.1[0], ClassMember::Property { .. }));
    assert!(matches!(class.1[2], ClassMember::Method { .. }));
}

#[test]
fn parses_interface_and_enum() {
    let code = b"<?php
interface Shape {
    public function area(): float;
}

enum Suit: string {
    case Hearts = 'H';
    case Spades = 'S';
}
";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    assert!(program
        .statements
        .iter()
        .any(|stmt| matches!(**stmt, Stmt::Interface { .. })));

    let enum_members = program
        .statements
        .iter()
        .find_map(|stmt| match **stmt {
            Stmt::Enum { members, backed_type, .. } => {
                assert!(backed_type.is_some());
                Some(members)
            }
            _ => None,
        })
        .expect("expected an enum declaration");

    assert_eq!(enum_members.len(), 2);
    assert!(enum_members
        .iter()
        .all(|m| matches!(m, ClassMember::Case { .. })));
}

#[test]
fn parses_function_with_union_and_nullable_types() {
    let code = b"<?php
function format(int|string $value, ?array $opts): string {
    return (string) $value;
}
";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let func = program
        .statements
        .iter()
        .find_map(|stmt| match **stmt {
            Stmt::Function { name, params, .. } => Some((name, params)),
            _ => None,
        })
        .expect("expected a function declaration");

    assert_eq!(func.0.span.as_str(code), b"format");
    assert_eq!(func.1.len(), 2);
    assert!(func.1[0].ty.is_some());
    assert!(func.1[1].ty.is_some());
}

#[test]
fn parses_namespaced_class_with_trait_use() {
    let code = b"<?php
namespace App\\Model;

trait Greets {
    public function greet(): string {
        return 'hi';
    }
}

class Person {
    use Greets;

    public string $name;
}
";
    let arena = Bump::new();
    let program = parse_source(code, &arena, ParseOptions::default());
    assert!(program.errors.is_empty(), "unexpected errors: {:?}", program.errors);

    let ns_name = program
        .statements
        .iter()
        .find_map(|stmt| match **stmt {
            Stmt::Namespace { name: Some(name), .. } => Some(name),
            _ => None,
        })
        .expect("expected a namespace declaration");
    assert_eq!(ns_name.span.as_str(code), b"App\\Model");

    let class_members = program
        .statements
        .iter()
        .find_map(|stmt| match **stmt {
            Stmt::Class { name, members, .. } if name.span.as_str(code) == b"Person" => {
                Some(members)
            }
            _ => None,
        })
        .expect("expected the Person class");

    assert!(class_members
        .iter()
        .any(|m| matches!(m, ClassMember::TraitUse { .. })));
    assert!(class_members
        .iter()
        .any(|m| matches!(m, ClassMember::Property { .. })));
}
