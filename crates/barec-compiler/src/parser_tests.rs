use std::rc::Rc;

use indoc::indoc;

use super::ast::{Literal, Scalar, Schema, TypeKind};
use super::config::Config;
use super::error::{CompileError, ErrorKind};
use super::parser::parse;

fn parse_ok(src: &str) -> Rc<Schema> {
    parse(src, "test.bare", &Config::default()).expect("valid schema")
}

fn parse_with(src: &str, config: &Config) -> Rc<Schema> {
    parse(src, "test.bare", config).expect("valid schema")
}

fn parse_err(src: &str) -> CompileError {
    parse(src, "test.bare", &Config::default()).expect_err("invalid schema")
}

#[test]
fn scalar_alias() {
    let schema = parse_ok("type A u8");
    assert_eq!(schema.defs.len(), 1);
    let def = &schema.defs[0];
    assert_eq!(def.alias, "A");
    assert!(def.exported);
    assert!(matches!(def.ty.kind, TypeKind::Scalar(Scalar::U8)));
}

#[test]
fn string_is_an_alias_for_str() {
    let schema = parse_ok("type S string");
    assert!(matches!(schema.defs[0].ty.kind, TypeKind::Scalar(Scalar::Str)));
}

#[test]
fn struct_with_fields() {
    let schema = parse_ok(indoc! {"
        type Person struct {
            name: str
            age: u8
        }
    "});
    let TypeKind::Struct { fields, class } = &schema.defs[0].ty.kind else {
        panic!("expected a struct");
    };
    assert!(!class);
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "name");
    assert_eq!(fields[1].name, "age");
}

#[test]
fn doc_comment_attaches_to_declaration() {
    let schema = parse_ok("# A person.\ntype Person struct { name: str }");
    assert_eq!(schema.defs[0].doc.as_deref(), Some("A person."));
}

#[test]
fn enum_values_auto_increment() {
    let schema = parse_ok("type Gender enum { FEMALE FLUID MALE = 9 OTHER }");
    let TypeKind::Enum { members, .. } = &schema.defs[0].ty.kind else {
        panic!("expected an enum");
    };
    let values: Vec<u64> = members.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![0, 1, 9, 10]);
}

#[test]
fn enum_value_must_increase() {
    let err = parse_err("type E enum { A = 5 B = 3 }");
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(err.message.contains("strictly greater"));
}

#[test]
fn union_tags_auto_increment() {
    let schema = parse_ok("type U (u8 | str = 7 | data)");
    let TypeKind::Union { arms, .. } = &schema.defs[0].ty.kind else {
        panic!("expected a union");
    };
    let tags: Vec<u64> = arms.iter().map(|arm| arm.tag).collect();
    assert_eq!(tags, vec![0, 7, 8]);
}

#[test]
fn union_keyword_body() {
    let schema = parse_ok("type U union { u8 | str }");
    let TypeKind::Union { arms, .. } = &schema.defs[0].ty.kind else {
        panic!("expected a union");
    };
    assert_eq!(arms.len(), 2);
}

#[test]
fn duplicated_union_type_is_rejected() {
    let err = parse_err("type U (u8 | u8)");
    assert!(err.message.contains("duplicated type in union"));
}

#[test]
fn literal_union_arms() {
    let schema = parse_ok("type U (0 | true | u8)");
    let TypeKind::Union { arms, .. } = &schema.defs[0].ty.kind else {
        panic!("expected a union");
    };
    assert!(matches!(arms[0].ty.kind, TypeKind::Literal(Literal::Int(0))));
    assert!(matches!(arms[1].ty.kind, TypeKind::Literal(Literal::Bool(true))));
    assert!(matches!(arms[2].ty.kind, TypeKind::Scalar(Scalar::U8)));
}

#[test]
fn pedantic_requires_explicit_values() {
    let config = Config {
        pedantic: true,
        ..Config::default()
    };
    let err = parse("type E enum { A B }", "test.bare", &config).expect_err("missing value");
    assert!(err.message.contains("pedantic"));
    parse("type E enum { A = 0 B = 1 }", "test.bare", &config).expect("explicit values");
}

#[test]
fn legacy_declarations_are_gated() {
    let err = parse_err("enum Gender { MALE }");
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(err.message.contains("legacy"));

    let config = Config {
        legacy: true,
        ..Config::default()
    };
    let schema = parse_with("enum Gender { MALE }", &config);
    assert!(matches!(schema.defs[0].ty.kind, TypeKind::Enum { .. }));
}

#[test]
fn fixed_length_data() {
    let schema = parse_ok("type Hash data[32]");
    assert!(matches!(schema.defs[0].ty.kind, TypeKind::Data { len: Some(32) }));
}

#[test]
fn numeric_arrays_become_typed_arrays() {
    let schema = parse_ok("type A []u8");
    assert!(matches!(
        schema.defs[0].ty.kind,
        TypeKind::TypedArray {
            elem: Scalar::U8,
            len: None
        }
    ));

    let schema = parse_ok("type A [4]f32");
    assert!(matches!(
        schema.defs[0].ty.kind,
        TypeKind::TypedArray {
            elem: Scalar::F32,
            len: Some(4)
        }
    ));

    let schema = parse_ok("type A []str");
    assert!(matches!(schema.defs[0].ty.kind, TypeKind::List { .. }));
}

#[test]
fn generic_array_config_disables_typed_arrays() {
    let config = Config {
        use_generic_array: true,
        ..Config::default()
    };
    let schema = parse_with("type A []u8", &config);
    assert!(matches!(schema.defs[0].ty.kind, TypeKind::List { .. }));
}

#[test]
fn safe_int_config_swaps_scalars() {
    let config = Config {
        use_safe_int: true,
        ..Config::default()
    };
    let schema = parse_with("type A i64", &config);
    assert!(matches!(schema.defs[0].ty.kind, TypeKind::Scalar(Scalar::I64Safe)));
    let schema = parse_with("type A uint", &config);
    assert!(matches!(schema.defs[0].ty.kind, TypeKind::Scalar(Scalar::UintSafe)));
}

#[test]
fn map_key_must_look_scalar() {
    parse_ok("type M map[str]u8");
    parse_ok("type M map[Key]u8\ntype Key u8");
    let err = parse_err("type M map[data]u8");
    assert!(err.message.contains("map key"));
    let err = parse_err("type M map[void]u8");
    assert!(err.message.contains("void"));
}

#[test]
fn naming_conventions() {
    assert!(parse_err("type foo u8").message.contains("UpperCamelCase"));
    assert!(
        parse_err("type S struct { Name: str }")
            .message
            .contains("lowerCamelCase")
    );
    assert!(
        parse_err("type E enum { male }")
            .message
            .contains("UPPER_SNAKE_CASE")
    );
}

#[test]
fn duplicate_and_self_aliases_are_rejected() {
    assert!(
        parse_err("type A u8\ntype A u16")
            .message
            .contains("already defined")
    );
    assert!(parse_err("type A A").message.contains("aliases itself"));
}

#[test]
fn empty_schema_is_rejected() {
    let err = parse_err("");
    assert!(err.message.contains("empty"));
    let err = parse_err("# only a comment\n");
    assert!(err.message.contains("empty"));
}

#[test]
fn error_position_points_at_offender() {
    let err = parse_err("type A u8\ntype A u16");
    assert_eq!(err.line, 2);
    assert_eq!(err.col, 6);
}

#[test]
fn nested_composites_parse() {
    let schema = parse_ok(indoc! {"
        type Tree struct {
            children: []Tree
            payload: optional<map[str]set<u8>>
        }
    "});
    let TypeKind::Struct { fields, .. } = &schema.defs[0].ty.kind else {
        panic!("expected a struct");
    };
    let TypeKind::List { elem, .. } = &fields[0].ty.kind else {
        panic!("expected a list");
    };
    assert!(matches!(&elem.kind, TypeKind::Alias(name) if name == "Tree"));
    assert!(matches!(fields[1].ty.kind, TypeKind::Optional { .. }));
}
