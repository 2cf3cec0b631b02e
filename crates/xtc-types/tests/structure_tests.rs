use super::*;
use crate::test_fixtures::Fixture;

#[test]
fn extend_rules_follow_the_format() {
    assert!(Format::Class.can_extend(Format::Class));
    assert!(Format::Const.can_extend(Format::Class));
    assert!(Format::Const.can_extend(Format::Const));
    assert!(!Format::Class.can_extend(Format::Const));
    assert!(Format::Service.can_extend(Format::Service));
    assert!(!Format::Class.can_extend(Format::Service));
    assert!(Format::EnumValue.can_extend(Format::Enum));
    assert!(Format::Mixin.can_extend(Format::Mixin));
    assert!(!Format::Interface.can_extend(Format::Interface));
    assert!(!Format::Class.can_extend(Format::Interface));
}

#[test]
fn format_predicates() {
    assert!(Format::Service.is_class_like());
    assert!(!Format::Mixin.is_class_like());
    assert!(Format::Package.is_const_like());
    assert!(!Format::Service.is_const_like());
    assert_eq!(Format::EnumValue.name(), "enum value");
}

#[test]
fn implementations_without_code_sort_last() {
    assert!(Implementation::Explicit.has_code());
    assert!(Implementation::Default.has_code());
    assert!(Implementation::Delegating.has_code());
    assert!(!Implementation::Declared.has_code());
    assert!(!Implementation::Abstract.has_code());
    assert!(Implementation::Explicit.chain_rank() < Implementation::Default.chain_rank());
    assert!(Implementation::Default.chain_rank() < Implementation::Abstract.chain_rank());
}

#[test]
fn declaration_helpers_fill_defaults() {
    let fx = Fixture::new();
    let account = fx.class("Account");
    let balance = fx.pool.declare_property(account, "balance", fx.int());
    assert_eq!(balance.flags, PropertyFlags::FIELD);
    assert_eq!(balance.access, Access::Public);
    assert!(!balance.needs_explosion());
    assert!(!balance.is_read_only());

    let annotated = balance.clone().with_annotation(fx.object());
    assert!(annotated.needs_explosion());
    let computed = balance.without_field().with_flags(PropertyFlags::READ_ONLY);
    assert_eq!(computed.flags, PropertyFlags::READ_ONLY);

    let deposit = fx.pool.declare_method(account, "deposit", vec![fx.int()], vec![]);
    assert_eq!(deposit.implementation, Implementation::Explicit);
    assert!(!deposit.is_override());
    assert!(deposit.with_flags(MethodFlags::OVERRIDE).is_override());
}

#[test]
fn conditional_contribution() {
    let fx = Fixture::new();
    let plain = ContributionDecl::incorporates(fx.object());
    assert!(!plain.is_conditional());
    let conditional = plain.when(fx.name("Element"), fx.int());
    assert!(conditional.is_conditional());
    assert_eq!(conditional.conditions[0].param, fx.name("Element"));
}

#[test]
fn extends_walk_follows_declared_edges() {
    let fx = Fixture::new();
    let a = fx.class("A");
    let b = fx.class("B");
    let c = fx.class("C");
    fx.declare(ClassStructure::new(a, Format::Class));
    fx.declare(ClassStructure::new(b, Format::Class).with_contribution(ContributionDecl::extends(fx.ty(a))));
    fx.declare(ClassStructure::new(c, Format::Class).with_contribution(ContributionDecl::extends(fx.ty(b))));

    assert_eq!(fx.pool.extends_class(c), Some(b));
    assert!(fx.pool.extends_transitively(c, a));
    assert!(!fx.pool.extends_transitively(a, c));
}

#[test]
fn extends_walk_stops_on_a_cycle() {
    let fx = Fixture::new();
    let a = fx.class("A");
    let b = fx.class("B");
    let unrelated = fx.class("Unrelated");
    fx.declare(ClassStructure::new(a, Format::Class).with_contribution(ContributionDecl::extends(fx.ty(b))));
    fx.declare(ClassStructure::new(b, Format::Class).with_contribution(ContributionDecl::extends(fx.ty(a))));

    assert!(!fx.pool.extends_transitively(a, unrelated));
    assert!(fx.pool.extends_transitively(a, b));
}

#[test]
fn virtual_children_are_found_through_the_extends_chain() {
    let fx = Fixture::new();
    let outer = fx.class("Outer");
    let sub = fx.class("Sub");
    let kid = fx.pool.class_identity(outer, "Kid");
    let helper = fx.pool.class_identity(outer, "Helper");
    fx.declare(ClassStructure::new(outer, Format::Class));
    fx.declare(ClassStructure::new(kid, Format::Class).as_virtual_child());
    fx.declare(ClassStructure::new(helper, Format::Class));
    fx.declare(ClassStructure::new(sub, Format::Class).with_contribution(ContributionDecl::extends(fx.ty(outer))));

    assert_eq!(fx.pool.virtual_children(outer), vec![kid]);
    assert_eq!(fx.pool.find_virtual_child(sub, fx.name("Kid")), Some(kid));
    assert_eq!(fx.pool.find_virtual_child(sub, fx.name("Helper")), None);
    assert_eq!(fx.pool.find_virtual_child(sub, fx.name("Missing")), None);
}

#[test]
fn terminal_class_looks_through_parameterization_and_placeholders() {
    let fx = Fixture::new();
    let list = fx.class("List");
    let list_of_int = fx.pool.parameterized_type(fx.ty(list), vec![fx.int()]);
    assert_eq!(fx.pool.terminal_class(list_of_int), Some(list));

    let (placeholder, pending) = fx.pool.unresolved_type("List");
    assert_eq!(fx.pool.terminal_class(pending), None);
    fx.pool.resolve_placeholder(placeholder, fx.ty(list)).unwrap();
    assert_eq!(fx.pool.terminal_class(pending), Some(list));
}
