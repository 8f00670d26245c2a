use indoc::indoc;

use super::check::check;
use super::config::Config;
use super::error::{CompileError, ErrorKind};
use super::parser::parse;

fn check_src(src: &str) -> Result<(), CompileError> {
    let schema = parse(src, "test.bare", &Config::default()).expect("valid syntax");
    check(&schema, &Config::default())
}

fn check_flat(src: &str) -> Result<(), CompileError> {
    let config = Config {
        use_flat_union: true,
        ..Config::default()
    };
    let schema = parse(src, "test.bare", &config).expect("valid syntax");
    check(&schema, &config)
}

fn err_of(src: &str) -> CompileError {
    check_src(src).expect_err("invalid schema")
}

#[test]
fn undefined_alias() {
    let err = err_of("type A B");
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert_eq!(err.message, "alias 'B' is not defined");
}

#[test]
fn alias_cycle_is_rejected() {
    let err = err_of("type A B\ntype B A");
    assert!(err.message.contains("circular reference"));
}

#[test]
fn variable_containers_break_cycles() {
    check_src("type A []A").expect("list breaks the cycle");
    check_src("type A optional<A>").expect("optional breaks the cycle");
    check_src("type A map[str]A").expect("map breaks the cycle");
    check_src("type A set<A>").expect("set breaks the cycle");
}

#[test]
fn fixed_list_does_not_break_cycles() {
    let err = err_of("type A [2]A");
    assert!(err.message.contains("circular reference to 'A'"));
}

#[test]
fn struct_field_cycle_is_rejected() {
    let err = err_of("type Node struct { next: Node }");
    assert!(err.message.contains("circular reference to 'Node'"));
}

#[test]
fn union_field_with_one_finite_member_is_accepted() {
    check_src(indoc! {"
        type Tree struct {
            child: (void | Tree)
        }
    "})
    .expect("void member terminates the recursion");
}

#[test]
fn union_field_with_no_finite_member_is_rejected() {
    let err = err_of("type Tree struct { child: (Tree | [2]Tree) }");
    assert!(err.message.contains("circular reference"));
}

#[test]
fn cyclic_alias_behind_a_union_field_is_accepted() {
    check_src(indoc! {"
        type A struct { x: B }
        type B (u8 | A)
    "})
    .expect("scalar member terminates the recursion");
}

#[test]
fn top_level_union_cycle_is_rejected() {
    let err = err_of("type A (u8 | A)");
    assert!(err.message.contains("circular reference to 'A'"));
}

#[test]
fn void_placement() {
    check_src("type U (void | u8)").expect("void union member");
    check_src("type O optional<void>").expect("void optional element");
    check_src("type V void\ntype U (V | u8)").expect("void behind an alias");

    let err = err_of("type S struct { f: void }");
    assert!(err.message.contains("void is only allowed"));
    let err = err_of("type L []void");
    assert!(err.message.contains("void is only allowed"));
    let err = err_of("type V void\ntype S struct { f: V }");
    assert!(err.message.contains("void is only allowed"));
}

#[test]
fn literal_placement() {
    check_src("type U (0 | true)").expect("literal union members");
    check_src("type Msg struct { kind: 1 body: str }").expect("leading literal field");

    let err = err_of("type A 42");
    assert!(err.message.contains("literal is only allowed"));
    let err = err_of("type Msg struct { body: str kind: 1 }");
    assert!(err.message.contains("literal is only allowed"));
}

#[test]
fn empty_composites_are_rejected() {
    assert!(err_of("type E enum { }").message.contains("at least one member"));
    assert!(err_of("type S struct { }").message.contains("at least one field"));
}

#[test]
fn map_key_resolution() {
    check_src("type K u8\ntype M map[K]str").expect("scalar key behind alias");
    check_src("type K enum { A B }\ntype M map[K]str").expect("enum key");

    let err = err_of("type K data\ntype M map[K]u8");
    assert!(err.message.contains("map key"));
}

#[test]
fn fixed_length_bounds() {
    assert!(err_of("type D data[0]").message.contains("at least 1"));
    assert!(
        err_of("type D data[4294967296]")
            .message
            .contains("32 bits")
    );
    check_src("type D data[4294967295]").expect("u32::MAX is allowed");
}

#[test]
fn flat_union_by_runtime_class() {
    check_flat("type U (u8 | str | bool)").expect("distinct classes");
    check_flat("type U (u64 | u8)").expect("bigint and number are distinct");

    let err = check_flat("type U (u8 | u16)").expect_err("two numbers");
    assert!(err.message.contains("share a runtime class"));
    let err = check_flat("type E enum { A }\ntype U (E | str)")
        .expect_err("string enum collides with str");
    assert!(err.message.contains("share a runtime class"));
}

#[test]
fn flat_union_of_structs() {
    check_flat(indoc! {"
        type A struct { x: u8 }
        type B struct { y: str }
        type U (A | B)
    "})
    .expect("struct unions can always be discriminated");
}

#[test]
fn mixed_flat_union_is_rejected() {
    let err = check_flat(indoc! {"
        type A struct { x: u8 }
        type U (A | u8)
    "})
    .expect_err("struct mixed with scalar");
    assert!(err.message.contains("no distinct runtime class"));
}

#[test]
fn tagged_unions_are_not_subject_to_flat_rules() {
    check_src("type U (u8 | u16 | u32)").expect("tags disambiguate");
}
