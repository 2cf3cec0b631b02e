use super::*;
use crate::diagnostics::SilentSink;
use crate::structure::{ClassStructure, ContributionDecl, Format, PropertyFlags};
use crate::test_fixtures::Fixture;
use crate::types::{IdentityId, TypeId};

fn origins(bodies: &[MethodBody]) -> Vec<IdentityId> {
    bodies.iter().map(|b| b.origin).collect()
}

/// `class Base { Object get(); void run(); }`
fn base(fx: &Fixture) -> TypeId {
    let id = fx.class("Base");
    fx.declare(
        ClassStructure::new(id, Format::Class)
            .with_method(fx.pool.declare_method(id, "get", vec![], vec![fx.object()]))
            .with_method(fx.pool.declare_method(id, "run", vec![], vec![])),
    )
}

/// `class Sub extends Base { String get(); void run(); }`
fn sub(fx: &Fixture) -> TypeId {
    let base = base(fx);
    let id = fx.class("Sub");
    fx.declare(
        ClassStructure::new(id, Format::Class)
            .with_contribution(ContributionDecl::extends(base))
            .with_method(fx.pool.declare_method(id, "get", vec![], vec![fx.string()]))
            .with_method(fx.pool.declare_method(id, "run", vec![], vec![])),
    )
}

#[test]
fn super_calls_continue_down_the_chain() {
    let fx = Fixture::new();
    let sub = sub(&fx);
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let info = ctx.ensure_type_info(sub);

    let run = fx.sig("run", vec![], vec![]);
    let chain = resolve_call_chain(&info, run).unwrap();
    assert_eq!(chain.signature, run);
    assert_eq!(origins(&chain.bodies), vec![fx.class("Sub"), fx.class("Base")]);
    assert_eq!(chain.head().unwrap().origin, fx.class("Sub"));
    assert!(resolve_call_chain(&info, fx.sig("missing", vec![], vec![])).is_none());
}

#[test]
fn calls_through_a_capped_signature_reach_the_narrower_method() {
    let fx = Fixture::new();
    let sub = sub(&fx);
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let info = ctx.ensure_type_info(sub);

    let chain = resolve_call_chain(&info, fx.sig("get", vec![], vec![fx.object()])).unwrap();
    assert_eq!(chain.signature, fx.sig("get", vec![], vec![fx.string()]));
    assert_eq!(origins(&chain.bodies), vec![fx.class("Sub"), fx.class("Base")]);
}

#[test]
fn bodies_without_code_are_skipped() {
    let fx = Fixture::new();
    let greeter = fx.class("Greeter");
    let greeter_type = fx.declare(
        ClassStructure::new(greeter, Format::Interface)
            .with_method(fx.declared_method(greeter, "greet", vec![], vec![fx.string()])),
    );
    let person = fx.class("Person");
    let person_type = fx.declare(
        ClassStructure::new(person, Format::Class)
            .with_contribution(ContributionDecl::implements(greeter_type))
            .with_method(fx.pool.declare_method(person, "greet", vec![], vec![fx.string()])),
    );
    let silent_class = fx.declare(
        ClassStructure::new(fx.class("Silent"), Format::Class)
            .with_contribution(ContributionDecl::implements(greeter_type)),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let greet = fx.sig("greet", vec![], vec![fx.string()]);

    let info = ctx.ensure_type_info(person_type);
    assert_eq!(info.find_method_by_signature(greet).unwrap().bodies().len(), 2);
    assert_eq!(origins(&resolve_call_chain(&info, greet).unwrap().bodies), vec![person]);

    let abstract_chain = resolve_call_chain(&ctx.ensure_type_info(silent_class), greet).unwrap();
    assert!(abstract_chain.is_empty());
    assert!(abstract_chain.head().is_none());
}

#[test]
fn a_plain_field_is_read_directly() {
    let fx = Fixture::new();
    let c = fx.class("C");
    let t = fx.declare(
        ClassStructure::new(c, Format::Class).with_property(fx.pool.declare_property(c, "count", fx.int())),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let info = ctx.ensure_type_info(t);

    let chain = resolve_property_chain(&fx.pool, &info, fx.name("count")).unwrap();
    assert!(chain.is_direct_read());
    assert!(chain.setter.is_empty());
    assert!(!chain.read_only);
    assert!(resolve_property_chain(&fx.pool, &info, fx.name("missing")).is_none());
}

#[test]
fn an_exploded_property_reads_through_its_accessors() {
    let fx = Fixture::new();
    let lazy = fx.lazy_mixin();
    let c = fx.class("C");
    let x = fx.pool.property_identity(c, "x");
    let t = fx.declare(
        ClassStructure::new(c, Format::Class).with_property(
            fx.pool
                .declare_property(c, "x", fx.int())
                .with_annotation(fx.ty(lazy))
                .with_method(fx.pool.declare_method(x, "get", vec![], vec![fx.int()])),
        ),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let info = ctx.ensure_type_info(t);

    let chain = resolve_property_chain(&fx.pool, &info, fx.name("x")).unwrap();
    assert_eq!(origins(&chain.getter), vec![c, lazy]);
    // Var.set has no body of its own; writes go to the field
    assert!(chain.setter.is_empty());
    assert!(chain.field);
    assert!(!chain.is_direct_read());
}

#[test]
fn read_only_properties_have_no_setter() {
    let fx = Fixture::new();
    let c = fx.class("C");
    let total = fx.pool.property_identity(c, "total");
    let t = fx.declare(
        ClassStructure::new(c, Format::Class).with_property(
            fx.pool
                .declare_property(c, "total", fx.int())
                .with_flags(PropertyFlags::READ_ONLY)
                .without_field()
                .with_method(fx.pool.declare_method(total, "get", vec![], vec![fx.int()]))
                .with_method(fx.pool.declare_method(total, "set", vec![fx.int()], vec![])),
        ),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let info = ctx.ensure_type_info(t);

    let chain = resolve_property_chain(&fx.pool, &info, fx.name("total")).unwrap();
    assert!(chain.read_only);
    assert!(!chain.field);
    assert_eq!(origins(&chain.getter), vec![c]);
    assert!(chain.setter.is_empty());
}

#[test]
fn find_callable_binds_to_a_wider_method() {
    let fx = Fixture::new();
    let c = fx.class("C");
    let t = fx.declare(
        ClassStructure::new(c, Format::Class)
            .with_method(fx.pool.declare_method(c, "foo", vec![fx.object()], vec![fx.object()]))
            .with_method(fx.pool.declare_method(c, "foo", vec![fx.string()], vec![fx.object()])),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let info = ctx.ensure_type_info(t);

    let exact = fx.sig("foo", vec![fx.string()], vec![fx.object()]);
    assert_eq!(ctx.find_callable(&info, exact).unwrap().signature, exact);

    let chain = ctx.find_callable(&info, fx.sig("foo", vec![fx.int()], vec![fx.object()])).unwrap();
    assert_eq!(chain.signature, fx.sig("foo", vec![fx.object()], vec![fx.object()]));
    assert_eq!(origins(&chain.bodies), vec![c]);

    assert!(ctx.find_callable(&info, fx.sig("foo", vec![fx.int()], vec![fx.int()])).is_none());
    assert!(ctx.find_callable(&info, fx.sig("bar", vec![], vec![])).is_none());
}
