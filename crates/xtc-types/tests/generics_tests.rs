use super::*;
use crate::structure::{ClassStructure, Format};
use crate::test_fixtures::Fixture;

fn generic_class(fx: &Fixture, name: &str, params: &[&str]) -> IdentityId {
    let id = fx.class(name);
    let structure = params.iter().fold(ClassStructure::new(id, Format::Class), |s, p| {
        s.with_type_param(fx.name(p), fx.object())
    });
    fx.declare(structure);
    id
}

#[test]
fn formal_types_are_replaced_by_their_bindings() {
    let fx = Fixture::new();
    let box_class = generic_class(&fx, "Box", &["Element"]);
    let element = fx.formal(box_class, "Element");
    let bindings = Bindings::new().with(fx.name("Element"), fx.int());

    assert_eq!(fx.pool.resolve_generics(element, &bindings), fx.int());
    let box_of_element = fx.pool.parameterized_type(fx.ty(box_class), vec![element]);
    assert_eq!(
        fx.pool.resolve_generics(box_of_element, &bindings),
        fx.pool.parameterized_type(fx.ty(box_class), vec![fx.int()])
    );
    assert_eq!(fx.pool.resolve_generics(fx.string(), &bindings), fx.string());
}

#[test]
fn unbound_formals_are_left_alone() {
    let fx = Fixture::new();
    let box_class = generic_class(&fx, "Box", &["Element"]);
    let element = fx.formal(box_class, "Element");
    assert_eq!(fx.pool.resolve_generics(element, &Bindings::new()), element);
}

#[test]
fn resolving_twice_equals_resolving_once() {
    let fx = Fixture::new();
    let box_class = generic_class(&fx, "Box", &["Element"]);
    let element = fx.formal(box_class, "Element");
    let box_of_element = fx.pool.parameterized_type(fx.ty(box_class), vec![element]);
    let bindings = Bindings::new().with(fx.name("Element"), box_of_element);

    let once = fx.pool.resolve_generics(element, &bindings);
    assert_eq!(once, box_of_element);
    let twice = fx.pool.resolve_generics(once, &bindings);
    assert_eq!(twice, once);
}

#[test]
fn bindings_of_a_type_fall_back_to_constraints() {
    let fx = Fixture::new();
    let map = generic_class(&fx, "Map", &["Key", "Value"]);
    let partial = fx.pool.parameterized_type(fx.ty(map), vec![fx.string()]);

    let bindings = Bindings::of_type(&fx.pool, partial);
    assert_eq!(bindings.get(fx.name("Key")), Some(fx.string()));
    assert_eq!(bindings.get(fx.name("Value")), Some(fx.object()));

    let immutable = fx.pool.immutable_type(partial);
    assert_eq!(Bindings::of_type(&fx.pool, immutable).get(fx.name("Key")), Some(fx.string()));
    assert!(Bindings::of_type(&fx.pool, fx.int()).is_empty());
}

#[test]
fn a_formal_child_resolves_through_its_parent() {
    let fx = Fixture::new();
    let map = generic_class(&fx, "Map", &["Key", "Value"]);
    let holder = generic_class(&fx, "Holder", &["Element"]);
    let element = fx.pool.property_identity(holder, "Element");
    let key = fx.pool.formal_child_type(fx.pool.formal_child_identity(element, "Key"));
    let value = fx.pool.formal_child_type(fx.pool.formal_child_identity(element, "Value"));

    let map_type = fx.pool.parameterized_type(fx.ty(map), vec![fx.string(), fx.int()]);
    let bindings = Bindings::new().with(fx.name("Element"), map_type);
    assert_eq!(fx.pool.resolve_generics(key, &bindings), fx.string());
    assert_eq!(fx.pool.resolve_generics(value, &bindings), fx.int());

    let raw = Bindings::new().with(fx.name("Element"), fx.ty(map));
    assert_eq!(fx.pool.resolve_generics(value, &raw), fx.object());
}

#[test]
fn signatures_are_rewritten_in_place() {
    let fx = Fixture::new();
    let box_class = generic_class(&fx, "Box", &["Element"]);
    let element = fx.formal(box_class, "Element");
    let bindings = Bindings::new().with(fx.name("Element"), fx.int());

    let put = fx.sig("put", vec![element], vec![fx.string()]);
    assert_eq!(
        fx.pool.resolve_signature_generics(put, &bindings),
        fx.sig("put", vec![fx.int()], vec![fx.string()])
    );
    let plain = fx.sig("size", vec![], vec![fx.int()]);
    assert_eq!(fx.pool.resolve_signature_generics(plain, &bindings), plain);
}

#[test]
fn auto_narrowing_uses_the_target_or_the_declaring_class() {
    let fx = Fixture::new();
    let base = generic_class(&fx, "Base", &[]);
    let derived = generic_class(&fx, "Derived", &[]);
    let this = fx.pool.this_class_type(base);
    assert!(fx.pool.is_auto_narrowing(this));
    assert!(!fx.pool.is_auto_narrowing(fx.ty(base)));

    assert_eq!(fx.pool.resolve_auto_narrowing(this, false, None), fx.ty(base));
    assert_eq!(fx.pool.resolve_auto_narrowing(this, false, Some(fx.ty(derived))), fx.ty(derived));

    let copy = fx.sig("copy", vec![], vec![this]);
    assert_eq!(
        fx.pool.resolve_signature_auto_narrowing(copy, Some(fx.ty(derived))),
        fx.sig("copy", vec![], vec![fx.ty(derived)])
    );
}

#[test]
fn parameterized_auto_narrowing_can_retain_params() {
    let fx = Fixture::new();
    let list = generic_class(&fx, "List", &["Element"]);
    let array = generic_class(&fx, "Array", &["Element"]);
    let this_of_int = fx.pool.parameterized_type(fx.pool.this_class_type(list), vec![fx.int()]);
    let array_of_string = fx.pool.parameterized_type(fx.ty(array), vec![fx.string()]);

    assert_eq!(
        fx.pool.resolve_auto_narrowing(this_of_int, true, Some(array_of_string)),
        fx.pool.parameterized_type(fx.ty(array), vec![fx.int()])
    );
    assert_eq!(
        fx.pool.resolve_auto_narrowing(this_of_int, false, Some(array_of_string)),
        array_of_string
    );
    assert_eq!(
        fx.pool.resolve_auto_narrowing(this_of_int, false, None),
        fx.pool.parameterized_type(fx.ty(list), vec![fx.int()])
    );
}
