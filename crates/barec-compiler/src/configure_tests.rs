use std::rc::Rc;

use indoc::indoc;

use super::ast::{Absent, EnumRepr, Literal, TypeKind};
use super::config::Config;
use super::configure::{Annotated, configure};
use super::error::ErrorKind;
use super::normalize::normalize;
use super::parser::parse;

fn pipeline(src: &str, config: &Config) -> Result<Annotated, super::error::CompileError> {
    let schema = parse(src, "test.bare", config).expect("valid schema");
    super::check::check(&schema, config).expect("checked schema");
    configure(&normalize(&schema), config)
}

#[test]
fn default_config_is_identity() {
    let config = Config::default();
    let schema = parse("type Person struct { name: str }", "test.bare", &config).unwrap();
    let normalized = normalize(&schema);
    let annotated = configure(&normalized, &config).unwrap();
    assert!(Rc::ptr_eq(&normalized, &annotated.schema));
    assert!(annotated.tagged.is_empty());
}

#[test]
fn annotations_follow_config() {
    let config = Config {
        use_int_enum: true,
        use_class: true,
        use_mutable: true,
        use_null: true,
        use_lax_optional: true,
        ..Config::default()
    };
    let annotated = pipeline(
        indoc! {"
            type E enum { A B }
            type S struct { xs: []str opt: optional<u8> }
        "},
        &config,
    )
    .unwrap();
    let defs = &annotated.schema.defs;

    let TypeKind::Enum { repr, .. } = &defs[0].ty.kind else {
        panic!("expected an enum");
    };
    assert_eq!(*repr, EnumRepr::IntKey);

    let TypeKind::Struct { fields, class } = &defs[1].ty.kind else {
        panic!("expected a struct");
    };
    assert!(class);
    assert_eq!(fields.len(), 2);

    // Both field types were hoisted; inspect the synthetic declarations.
    let list = annotated
        .schema
        .defs
        .iter()
        .find_map(|d| match &d.ty.kind {
            TypeKind::List { mutable, .. } => Some(*mutable),
            _ => None,
        })
        .expect("hoisted list");
    assert!(list);

    let (absent, lax) = annotated
        .schema
        .defs
        .iter()
        .find_map(|d| match &d.ty.kind {
            TypeKind::Optional { absent, lax, .. } => Some((*absent, *lax)),
            _ => None,
        })
        .expect("hoisted optional");
    assert_eq!(absent, Absent::Null);
    assert!(lax);
}

#[test]
fn unknown_root_is_a_config_error() {
    let config = Config {
        main: vec!["Missing".to_string()],
        ..Config::default()
    };
    let err = pipeline("type A u8", &config).expect_err("unknown root");
    assert_eq!(err.kind, ErrorKind::Config);
    assert!(err.message.contains("root alias 'Missing'"));
}

#[test]
fn void_root_is_a_config_error() {
    let config = Config {
        main: vec!["V".to_string()],
        ..Config::default()
    };
    let schema = parse("type V void", "test.bare", &config).unwrap();
    let err = configure(&normalize(&schema), &config).expect_err("void root");
    assert!(err.message.contains("must not resolve to void"));
}

#[test]
fn flat_struct_union_gets_string_discriminators() {
    let config = Config {
        use_flat_union: true,
        ..Config::default()
    };
    let annotated = pipeline(
        indoc! {"
            type A struct { x: u8 }
            type B struct { y: str }
            type U (A | B)
        "},
        &config,
    )
    .unwrap();
    assert_eq!(
        annotated.tagged.iter().cloned().collect::<Vec<_>>(),
        vec!["A".to_string(), "B".to_string()]
    );

    let a = &annotated.schema.defs[0];
    let TypeKind::Struct { fields, .. } = &a.ty.kind else {
        panic!("expected a struct");
    };
    assert_eq!(fields[0].name, "tag");
    let TypeKind::Literal(Literal::Str(tag)) = &fields[0].ty.kind else {
        panic!("expected a string literal");
    };
    assert_eq!(tag, "A");
    assert_eq!(fields[1].name, "x");
}

#[test]
fn int_tag_discriminators() {
    let config = Config {
        use_flat_union: true,
        use_int_tag: true,
        ..Config::default()
    };
    let annotated = pipeline(
        indoc! {"
            type A struct { x: u8 }
            type B struct { y: str }
            type U (A | B = 9)
        "},
        &config,
    )
    .unwrap();
    let b = &annotated.schema.defs[1];
    let TypeKind::Struct { fields, .. } = &b.ty.kind else {
        panic!("expected a struct");
    };
    assert!(matches!(
        fields[0].ty.kind,
        TypeKind::Literal(Literal::Int(9))
    ));
}

#[test]
fn class_unions_need_no_discriminator() {
    let config = Config {
        use_flat_union: true,
        use_class: true,
        ..Config::default()
    };
    let annotated = pipeline(
        indoc! {"
            type A struct { x: u8 }
            type B struct { y: str }
            type U (A | B)
        "},
        &config,
    )
    .unwrap();
    assert!(annotated.tagged.is_empty());
    let TypeKind::Struct { fields, .. } = &annotated.schema.defs[0].ty.kind else {
        panic!("expected a struct");
    };
    assert_eq!(fields[0].name, "x");
}

#[test]
fn naturally_discriminated_unions_are_left_alone() {
    let config = Config {
        use_flat_union: true,
        ..Config::default()
    };
    let annotated = pipeline(
        indoc! {"
            type A struct { kind: 0 x: u8 }
            type B struct { kind: 1 y: str }
            type U (A | B)
        "},
        &config,
    )
    .unwrap();
    assert!(annotated.tagged.is_empty());
}

#[test]
fn alias_in_two_flat_unions_is_rejected() {
    let config = Config {
        use_flat_union: true,
        ..Config::default()
    };
    let err = pipeline(
        indoc! {"
            type A struct { x: u8 }
            type B struct { y: str }
            type C struct { z: bool }
            type U (A | B)
            type V (A | C)
        "},
        &config,
    )
    .expect_err("A cannot carry two discriminators");
    assert_eq!(err.kind, ErrorKind::Config);
    assert!(err.message.contains("two flat unions"));
}

#[test]
fn existing_tag_field_blocks_injection() {
    let config = Config {
        use_flat_union: true,
        ..Config::default()
    };
    let err = pipeline(
        indoc! {"
            type A struct { tag: u8 }
            type B struct { y: str }
            type U (A | B)
        "},
        &config,
    )
    .expect_err("field name collision");
    assert!(err.message.contains("'tag' already exists"));
}
