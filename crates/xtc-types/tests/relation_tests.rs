use super::*;
use crate::diagnostics::SilentSink;
use crate::structure::{ClassStructure, ContributionDecl, Format};
use crate::test_fixtures::Fixture;
use crate::types::{Access, IdentityId, TypeId};
use crate::ResolutionContext;

fn plain(fx: &Fixture, name: &str) -> TypeId {
    let id = fx.class(name);
    fx.declare(ClassStructure::new(id, Format::Class))
}

fn extending(fx: &Fixture, name: &str, parent: TypeId) -> TypeId {
    let id = fx.class(name);
    fx.declare(ClassStructure::new(id, Format::Class).with_contribution(ContributionDecl::extends(parent)))
}

/// An interface declaring `void <method>()`.
fn interface_with(fx: &Fixture, name: &str, method: &str) -> TypeId {
    let id = fx.class(name);
    fx.declare(ClassStructure::new(id, Format::Interface).with_method(fx.declared_method(id, method, vec![], vec![])))
}

/// `interface <name><Element> { Element get(); [void set(Element);] }`
fn generic_interface(fx: &Fixture, name: &str, settable: bool) -> IdentityId {
    let id = fx.class(name);
    let element = fx.formal(id, "Element");
    let mut structure = ClassStructure::new(id, Format::Interface)
        .with_type_param(fx.name("Element"), fx.object())
        .with_method(fx.declared_method(id, "get", vec![], vec![element]));
    if settable {
        structure = structure.with_method(fx.declared_method(id, "set", vec![element], vec![]));
    }
    fx.declare(structure);
    id
}

#[test]
fn relations_combine_by_strength() {
    assert!(Relation::Incompatible < Relation::IsAWeak);
    assert!(Relation::IsAWeak < Relation::IsA);
    assert_eq!(Relation::IsA.worse(Relation::IsAWeak), Relation::IsAWeak);
    assert_eq!(Relation::Incompatible.best(Relation::IsAWeak), Relation::IsAWeak);
    assert!(!Relation::Incompatible.is_compatible());
    assert_eq!(Relation::IsAWeak.name(), "is_a_weak");
}

#[test]
fn object_is_the_top_type() {
    let fx = Fixture::new();
    let c = plain(&fx, "C");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.is_a(c, c), Relation::IsA);
    assert_eq!(ctx.is_a(c, fx.object()), Relation::IsA);
    assert_eq!(ctx.is_a(fx.object(), c), Relation::Incompatible);
}

#[test]
fn extends_and_implements_are_followed() {
    let fx = Fixture::new();
    let base = plain(&fx, "Base");
    let middle = extending(&fx, "Middle", base);
    let sub = extending(&fx, "Sub", middle);
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.is_a(sub, base), Relation::IsA);
    assert_eq!(ctx.is_a(base, sub), Relation::Incompatible);

    let core = *fx.pool.core();
    let orderable = fx.pool.class_type(core.orderable);
    assert_eq!(ctx.is_a(fx.int(), orderable), Relation::IsA);
    assert_eq!(ctx.is_a(fx.int(), fx.pool.class_type(core.const_iface)), Relation::IsA);
    assert_eq!(ctx.is_a(sub, orderable), Relation::Incompatible);
}

#[test]
fn duck_typing_against_an_interface_is_weak() {
    let fx = Fixture::new();
    let named = fx.class("Named");
    fx.declare(
        ClassStructure::new(named, Format::Interface)
            .with_method(fx.declared_method(named, "name", vec![], vec![fx.string()])),
    );
    let person = fx.class("Person");
    fx.declare(
        ClassStructure::new(person, Format::Class)
            .with_method(fx.pool.declare_method(person, "name", vec![], vec![fx.string()])),
    );
    let rock = plain(&fx, "Rock");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.is_a(fx.ty(person), fx.ty(named)), Relation::IsAWeak);
    assert_eq!(ctx.is_a(rock, fx.ty(named)), Relation::Incompatible);
}

#[test]
fn a_relation_that_reaches_itself_is_not_assumed() {
    // interface Chained { Chained next(); }  class Link { Link next(); }
    let fx = Fixture::new();
    let chained = fx.class("Chained");
    let chained_type = fx.ty(chained);
    fx.declare(
        ClassStructure::new(chained, Format::Interface)
            .with_method(fx.declared_method(chained, "next", vec![], vec![chained_type])),
    );
    let link = fx.class("Link");
    let link_type = fx.ty(link);
    fx.declare(
        ClassStructure::new(link, Format::Class)
            .with_method(fx.pool.declare_method(link, "next", vec![], vec![link_type])),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.is_a(link_type, chained_type), Relation::Incompatible);
    // asked again from the cache
    assert_eq!(ctx.is_a(link_type, chained_type), Relation::Incompatible);
}

#[test]
fn relational_targets_and_sources() {
    let fx = Fixture::new();
    let a = interface_with(&fx, "A", "a");
    let b = interface_with(&fx, "B", "b");
    let both = fx.class("Both");
    fx.declare(
        ClassStructure::new(both, Format::Class)
            .with_contribution(ContributionDecl::implements(a))
            .with_contribution(ContributionDecl::implements(b)),
    );
    let only_a = fx.class("OnlyA");
    fx.declare(ClassStructure::new(only_a, Format::Class).with_contribution(ContributionDecl::implements(a)));
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    let a_and_b = fx.pool.intersection_type(a, b);
    let a_or_b = fx.pool.union_type(a, b);
    assert_eq!(ctx.is_a(fx.ty(both), a_and_b), Relation::IsA);
    assert_eq!(ctx.is_a(fx.ty(only_a), a_and_b), Relation::Incompatible);
    assert_eq!(ctx.is_a(fx.ty(only_a), a_or_b), Relation::IsA);
    assert_eq!(ctx.is_a(a_and_b, a), Relation::IsA);

    let orderable = fx.pool.class_type(fx.pool.core().orderable);
    assert_eq!(ctx.is_a(fx.pool.union_type(fx.int(), fx.string()), orderable), Relation::IsA);
    assert_eq!(ctx.is_a(fx.pool.union_type(fx.int(), fx.ty(both)), orderable), Relation::Incompatible);
}

#[test]
fn difference_target_excludes_the_right_side() {
    let fx = Fixture::new();
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let not_string = fx.pool.difference_type(fx.object(), fx.string());

    assert_eq!(ctx.is_a(fx.int(), not_string), Relation::IsA);
    assert_eq!(ctx.is_a(fx.string(), not_string), Relation::Incompatible);
}

#[test]
fn immutable_and_struct_targets() {
    let fx = Fixture::new();
    let c = plain(&fx, "C");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.is_a(fx.int(), fx.pool.immutable_type(fx.object())), Relation::IsA);
    assert_eq!(ctx.is_a(c, fx.pool.immutable_type(c)), Relation::Incompatible);
    assert_eq!(ctx.is_a(fx.pool.immutable_type(c), c), Relation::IsA);

    let c_struct = fx.pool.access_type(c, Access::Struct);
    assert_eq!(ctx.is_a(c, c_struct), Relation::Incompatible);
    assert_eq!(ctx.is_a(fx.pool.access_type(c, Access::Private), c), Relation::IsA);
}

#[test]
fn type_parameters_are_covariant_and_weak_when_consumed() {
    let fx = Fixture::new();
    let source = fx.ty(generic_interface(&fx, "Source", false));
    let cell = fx.ty(generic_interface(&fx, "Cell", true));
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let of = |base: TypeId, param: TypeId| fx.pool.parameterized_type(base, vec![param]);

    assert_eq!(ctx.is_a(of(source, fx.int()), of(source, fx.object())), Relation::IsA);
    assert_eq!(ctx.is_a(of(source, fx.int()), source), Relation::IsA);
    assert_eq!(ctx.is_a(of(cell, fx.int()), of(cell, fx.object())), Relation::IsAWeak);
    assert_eq!(ctx.is_a(of(cell, fx.object()), of(cell, fx.int())), Relation::Incompatible);
}

#[test]
fn functions_are_contravariant_in_parameters() {
    let fx = Fixture::new();
    let core = *fx.pool.core();
    let tuple = fx.pool.class_type(core.tuple);
    let function = fx.pool.class_type(core.function);
    let tuple_of = |t: TypeId| fx.pool.parameterized_type(tuple, vec![t]);
    let func = |params: TypeId, returns: TypeId| {
        fx.pool
            .parameterized_type(function, vec![tuple_of(params), tuple_of(returns)])
    };
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    let wide = func(fx.object(), fx.int());
    let narrow = func(fx.int(), fx.object());
    assert_eq!(ctx.is_a(wide, narrow), Relation::IsA);
    assert_eq!(ctx.is_a(narrow, wide), Relation::Incompatible);
    assert_eq!(ctx.is_a(narrow, function), Relation::IsA);
    assert_eq!(ctx.is_a(tuple_of(fx.int()), tuple_of(fx.object())), Relation::IsA);
    assert_eq!(ctx.is_a(tuple_of(fx.object()), tuple_of(fx.int())), Relation::Incompatible);
}

#[test]
fn formal_types_relate_through_their_constraint() {
    let fx = Fixture::new();
    let orderable = fx.pool.class_type(fx.pool.core().orderable);
    let sorted = fx.class("Sorted");
    fx.declare(ClassStructure::new(sorted, Format::Class).with_type_param(fx.name("Element"), orderable));
    let element = fx.formal(sorted, "Element");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.formal_constraint(element), orderable);
    assert_eq!(ctx.is_a(element, orderable), Relation::IsA);
    assert_eq!(ctx.is_a(element, fx.int()), Relation::Incompatible);
    assert_eq!(ctx.is_a(fx.int(), element), Relation::Incompatible);
}

#[test]
fn cached_relations_are_recomputed_after_a_redefinition() {
    let fx = Fixture::new();
    let base = plain(&fx, "Base");
    let sub = extending(&fx, "Sub", base);
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.is_a(sub, base), Relation::IsA);
    assert_eq!(
        ctx.relations.get(&(sub, base)).map(|e| *e.value()),
        Some(RelationState::Done {
            relation: Relation::IsA,
            count: 0
        })
    );

    let sub_class = fx.pool.class_of(sub).unwrap();
    fx.declare(ClassStructure::new(sub_class, Format::Class));
    assert_eq!(ctx.is_a(sub, base), Relation::Incompatible);
}

#[test]
fn substitutable_signatures() {
    let fx = Fixture::new();
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let wide = fx.sig("foo", vec![fx.object()], vec![fx.int()]);
    let narrow = fx.sig("foo", vec![fx.int()], vec![fx.object()]);

    assert!(ctx.is_substitutable_for(wide, narrow, 0));
    assert!(!ctx.is_substitutable_for(narrow, wide, 0));
    assert!(!ctx.is_substitutable_for(fx.sig("bar", vec![fx.object()], vec![fx.int()]), narrow, 0));

    let extra = fx.sig("foo", vec![fx.int(), fx.string()], vec![fx.object()]);
    assert!(ctx.is_substitutable_for(extra, narrow, 1));
    assert!(!ctx.is_substitutable_for(extra, narrow, 0));
}
