use super::*;
use crate::structure::{ClassStructure, Format};
use crate::test_fixtures::Fixture;

#[test]
fn core_names_are_visible_from_any_class() {
    let fx = Fixture::new();
    let account = fx.class("Account");
    fx.declare(ClassStructure::new(account, Format::Class));
    let scope = ClassScope::new(account);

    let mut resolver = TypeResolver::new(&fx.pool);
    assert_eq!(resolver.resolve_type_expr(&TypeExpr::named("Int"), &scope), fx.int());
    assert_eq!(resolver.resolve_type_expr(&TypeExpr::named("Account"), &scope), fx.ty(account));
    assert!(resolver.pending().is_empty());
}

#[test]
fn type_parameters_shadow_outer_names() {
    let fx = Fixture::new();
    let holder = fx.class("Holder");
    fx.declare(ClassStructure::new(holder, Format::Class).with_type_param(fx.name("Int"), fx.object()));
    let scope = ClassScope::new(holder);

    let mut resolver = TypeResolver::new(&fx.pool);
    assert_eq!(
        resolver.resolve_type_expr(&TypeExpr::named("Int"), &scope),
        fx.formal(holder, "Int")
    );
}

#[test]
fn composite_expressions_intern_bottom_up() {
    let fx = Fixture::new();
    let map = fx.class("Map");
    fx.declare(
        ClassStructure::new(map, Format::Class)
            .with_type_param(fx.name("Key"), fx.object())
            .with_type_param(fx.name("Value"), fx.object()),
    );
    let scope = ClassScope::new(map);
    let mut resolver = TypeResolver::new(&fx.pool);

    let expr = TypeExpr::Immutable(Box::new(
        TypeExpr::named("Map").of(vec![TypeExpr::named("String"), TypeExpr::named("Int")]),
    ));
    let expected = fx
        .pool
        .immutable_type(fx.pool.parameterized_type(fx.ty(map), vec![fx.string(), fx.int()]));
    assert_eq!(resolver.resolve_type_expr(&expr, &scope), expected);

    let either = TypeExpr::Union(Box::new(TypeExpr::named("Int")), Box::new(TypeExpr::named("String")));
    assert_eq!(
        resolver.resolve_type_expr(&either, &scope),
        fx.pool.union_type(fx.int(), fx.string())
    );
}

#[test]
fn unknown_names_are_deferred_then_bound() {
    let fx = Fixture::new();
    let account = fx.class("Account");
    fx.declare(ClassStructure::new(account, Format::Class));
    let scope = ClassScope::new(account);
    let mut resolver = TypeResolver::new(&fx.pool);

    let t = resolver.resolve_type_expr(&TypeExpr::named("Ledger"), &scope);
    assert!(fx.pool.contains_unresolved(t));
    assert_eq!(resolver.pending().len(), 1);
    assert_eq!(resolver.pending()[0].name, "Ledger");

    let ledger = fx.class("Ledger");
    fx.declare(ClassStructure::new(ledger, Format::Class));
    assert_eq!(resolver.resolve_pending(&scope), Ok(()));
    assert!(resolver.pending().is_empty());
    assert_eq!(fx.pool.dereference(t), fx.ty(ledger));
    assert_eq!(fx.pool.class_of(t), Some(ledger));
}

#[test]
fn names_still_unknown_are_reported() {
    let fx = Fixture::new();
    let account = fx.class("Account");
    fx.declare(ClassStructure::new(account, Format::Class));
    let scope = ClassScope::new(account);
    let mut resolver = TypeResolver::new(&fx.pool);

    resolver.resolve_type_expr(&TypeExpr::named("Missing"), &scope);
    assert_eq!(
        resolver.resolve_pending(&scope),
        Err(vec![ResolveError::UnknownName("Missing".to_string())])
    );
    assert_eq!(resolver.pending().len(), 1);
}

#[test]
fn dotted_names_walk_nested_declarations() {
    let fx = Fixture::new();
    let outer = fx.class("Outer");
    let kid = fx.pool.class_identity(outer, "Kid");
    let other = fx.class("Other");
    fx.declare(ClassStructure::new(outer, Format::Class));
    fx.declare(ClassStructure::new(kid, Format::Class));
    fx.declare(ClassStructure::new(other, Format::Class));

    let from_other = ClassScope::new(other);
    assert_eq!(from_other.lookup(&fx.pool, "Outer.Kid"), Some(fx.ty(kid)));
    assert_eq!(from_other.lookup(&fx.pool, "Kid"), None);

    let from_kid = ClassScope::new(kid);
    assert_eq!(from_kid.lookup(&fx.pool, "Kid"), Some(fx.ty(kid)));
    assert_eq!(from_kid.lookup(&fx.pool, "Other"), Some(fx.ty(other)));
}
