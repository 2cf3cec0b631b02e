use super::*;
use crate::test_fixtures::Fixture;

/// `interface Source<Element> { Element next(); }`
fn source(fx: &Fixture) -> IdentityId {
    let id = fx.class("Source");
    let element = fx.formal(id, "Element");
    fx.declare(
        ClassStructure::new(id, Format::Interface)
            .with_type_param(fx.name("Element"), fx.object())
            .with_method(fx.declared_method(id, "next", vec![], vec![element])),
    );
    id
}

/// `interface Sink<Element> { void accept(Element); }`
fn sink(fx: &Fixture) -> IdentityId {
    let id = fx.class("Sink");
    let element = fx.formal(id, "Element");
    fx.declare(
        ClassStructure::new(id, Format::Interface)
            .with_type_param(fx.name("Element"), fx.object())
            .with_method(fx.declared_method(id, "accept", vec![element], vec![])),
    );
    id
}

#[test]
fn returns_produce_and_parameters_consume() {
    let fx = Fixture::new();
    let source = source(&fx);
    let sink = sink(&fx);
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let element = fx.name("Element");

    assert!(ctx.produces_formal_type(fx.ty(source), element));
    assert!(!ctx.consumes_formal_type(fx.ty(source), element));
    assert!(ctx.consumes_formal_type(fx.ty(sink), element));
    assert!(!ctx.produces_formal_type(fx.ty(sink), element));
    assert!(!ctx.produces_formal_type(fx.ty(source), fx.name("Missing")));
}

#[test]
fn settable_properties_both_produce_and_consume() {
    let fx = Fixture::new();
    let cell = fx.class("Cell");
    let value = fx.formal(cell, "Value");
    fx.declare(
        ClassStructure::new(cell, Format::Class)
            .with_type_param(fx.name("Value"), fx.object())
            .with_property(fx.pool.declare_property(cell, "content", value)),
    );
    let frozen = fx.class("Frozen");
    let frozen_value = fx.formal(frozen, "Value");
    fx.declare(
        ClassStructure::new(frozen, Format::Class)
            .with_type_param(fx.name("Value"), fx.object())
            .with_property(
                fx.pool
                    .declare_property(frozen, "content", frozen_value)
                    .with_flags(PropertyFlags::READ_ONLY),
            ),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let name = fx.name("Value");

    assert!(ctx.produces_formal_type(fx.ty(cell), name));
    assert!(ctx.consumes_formal_type(fx.ty(cell), name));
    assert!(ctx.produces_formal_type(fx.ty(frozen), name));
    assert!(!ctx.consumes_formal_type(fx.ty(frozen), name));
}

#[test]
fn private_members_are_ignored() {
    let fx = Fixture::new();
    let hidden = fx.class("Hidden");
    let value = fx.formal(hidden, "Value");
    fx.declare(
        ClassStructure::new(hidden, Format::Class)
            .with_type_param(fx.name("Value"), fx.object())
            .with_method(
                fx.pool
                    .declare_method(hidden, "store", vec![value], vec![])
                    .with_access(Access::Private),
            ),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    assert!(!ctx.consumes_formal_type(fx.ty(hidden), fx.name("Value")));
}

#[test]
fn polarity_flows_through_parameterized_types() {
    let fx = Fixture::new();
    let source = source(&fx);
    let producer = fx.class("Producer");
    let value = fx.formal(producer, "Value");
    let source_of_value = fx.pool.parameterized_type(fx.ty(source), vec![value]);
    fx.declare(
        ClassStructure::new(producer, Format::Class)
            .with_type_param(fx.name("Value"), fx.object())
            .with_method(fx.pool.declare_method(producer, "items", vec![], vec![source_of_value])),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let name = fx.name("Value");

    assert!(ctx.produces_formal_type(fx.ty(producer), name));
    assert!(!ctx.consumes_formal_type(fx.ty(producer), name));
}

#[test]
fn function_parameter_types_flip_polarity() {
    let fx = Fixture::new();
    let core = *fx.pool.core();
    let tuple = fx.pool.class_type(core.tuple);
    let function = fx.pool.class_type(core.function);
    let list = fx.class("List");
    let element = fx.formal(list, "Element");
    // void each(Function<Tuple<Element>, Tuple> visitor)
    let visitor = fx.pool.parameterized_type(
        function,
        vec![fx.pool.parameterized_type(tuple, vec![element]), tuple],
    );
    fx.declare(
        ClassStructure::new(list, Format::Class)
            .with_type_param(fx.name("Element"), fx.object())
            .with_method(fx.pool.declare_method(list, "each", vec![visitor], vec![])),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let name = fx.name("Element");

    assert!(ctx.produces_formal_type(fx.ty(list), name));
    assert!(!ctx.consumes_formal_type(fx.ty(list), name));
}
