use super::*;
use crate::structure::{ClassStructure, Format};
use crate::test_fixtures::Fixture;
use crate::types::Access;

#[test]
fn class_and_parameterized_types() {
    let fx = Fixture::new();
    let map = fx.class("Map");
    fx.declare(
        ClassStructure::new(map, Format::Class)
            .with_type_param(fx.name("Key"), fx.object())
            .with_type_param(fx.name("Value"), fx.object()),
    );
    let formatter = TypeFormatter::new(&fx.pool);
    let t = fx.pool.parameterized_type(fx.ty(map), vec![fx.string(), fx.int()]);
    assert_eq!(formatter.format(t), "Map<String, Int>");
    assert_eq!(formatter.format(fx.pool.formal_type(map)), "Map<Key, Value>");
}

#[test]
fn modifiers_and_relational_operands() {
    let fx = Fixture::new();
    let a = fx.ty(fx.class("A"));
    let b = fx.ty(fx.class("B"));
    let formatter = TypeFormatter::new(&fx.pool);

    let both = fx.pool.intersection_type(a, b);
    assert_eq!(formatter.format(both), "A | B");
    assert_eq!(formatter.format(fx.pool.access_type(both, Access::Private)), "(A | B):private");
    assert_eq!(formatter.format(fx.pool.union_type(a, b)), "A + B");
    assert_eq!(formatter.format(fx.pool.difference_type(a, b)), "A - B");
    assert_eq!(formatter.format(fx.pool.immutable_type(a)), "immutable A");
    assert_eq!(formatter.format(fx.pool.annotated_type(b, a)), "@B A");
}

#[test]
fn placeholders_render_by_name_until_bound() {
    let fx = Fixture::new();
    let (placeholder, t) = fx.pool.unresolved_type("Later");
    let formatter = TypeFormatter::new(&fx.pool);
    assert_eq!(formatter.format(t), "Later");
    fx.pool.resolve_placeholder(placeholder, fx.int()).unwrap();
    assert_eq!(formatter.format(t), "Int");
}

#[test]
fn signatures() {
    let fx = Fixture::new();
    let formatter = TypeFormatter::new(&fx.pool);
    let boolean = fx.pool.class_type(fx.pool.core().boolean);
    assert_eq!(
        formatter.format_signature(fx.sig("foo", vec![fx.string(), boolean], vec![fx.int()])),
        "Int foo(String, Boolean)"
    );
    assert_eq!(formatter.format_signature(fx.sig("bar", vec![], vec![])), "void bar()");
    assert_eq!(
        formatter.format_signature(fx.sig("pair", vec![], vec![fx.int(), fx.string()])),
        "(Int, String) pair()"
    );
}

#[test]
fn identities_render_as_paths() {
    let fx = Fixture::new();
    let account = fx.class("Account");
    let balance = fx.pool.property_identity(account, "balance");
    let get = fx.pool.method_identity(balance, fx.sig("get", vec![], vec![fx.int()]));
    let formatter = TypeFormatter::new(&fx.pool);
    assert_eq!(formatter.format_identity(balance), "Account.balance");
    assert_eq!(formatter.format_identity(get), "Account.Int get()");
}
