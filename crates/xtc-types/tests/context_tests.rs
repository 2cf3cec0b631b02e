use super::*;
use crate::diagnostics::{DiagnosticCollector, SilentSink};
use crate::relation::Relation;
use crate::structure::{ClassStructure, ContributionDecl, Format};
use crate::test_fixtures::Fixture;
use crate::type_info::Progress;
use crate::types::Access;

fn plain(fx: &Fixture, name: &str) -> TypeId {
    let id = fx.class(name);
    fx.declare(ClassStructure::new(id, Format::Class))
}

#[test]
fn a_plain_class_gets_a_complete_public_info() {
    let fx = Fixture::new();
    let c = plain(&fx, "C");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    let info = ctx.ensure_type_info(c);
    assert!(info.is_complete());
    assert_eq!(info.type_id, c);
    assert_eq!(info.access, Access::Public);
    assert_eq!(info.format, Format::Class);
    assert_eq!(info.class_identity, fx.class("C"));
    let chain: Vec<IdentityId> = info.class_chain.keys().copied().collect();
    assert_eq!(chain, vec![fx.class("C"), fx.pool.core().object]);
    assert!(info.dependencies.contains(&fx.class("C")));
}

#[test]
fn a_second_request_is_served_from_the_cache() {
    let fx = Fixture::new();
    let c = plain(&fx, "C");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    assert_eq!(ctx.slot_rank(c), 0);
    let first = ctx.ensure_type_info(c);
    assert_eq!(ctx.slot_rank(c), 3);
    let second = ctx.ensure_type_info(c);
    assert!(Arc::ptr_eq(&first, &second));

    ctx.clear();
    assert_eq!(ctx.slot_rank(c), 0);
    assert!(!Arc::ptr_eq(&first, &ctx.ensure_type_info(c)));
}

#[test]
fn stores_never_downgrade_a_complete_info() {
    let fx = Fixture::new();
    let c = plain(&fx, "C");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);
    let complete = ctx.ensure_type_info(c);

    let mut partial = TypeInfo::empty(c, fx.class("C"), Format::Class);
    partial.progress = Progress::Incomplete;
    let partial = Arc::new(partial);
    assert!(!ctx.store(
        c,
        TypeInfoSlot::Built {
            info: partial.clone(),
            validated: 0
        }
    ));
    assert_eq!(ctx.slot_rank(c), 3);

    assert!(ctx.store(c, TypeInfoSlot::Placeholder { owner: thread::current().id() }));
    assert_eq!(ctx.slot_rank(c), 1);
    assert!(ctx.store(c, TypeInfoSlot::Built { info: partial, validated: 0 }));
    assert_eq!(ctx.slot_rank(c), 2);
    assert!(ctx.store(c, TypeInfoSlot::Built { info: complete, validated: 0 }));
    assert_eq!(ctx.slot_rank(c), 3);
}

#[test]
fn unrelated_redefinitions_keep_cached_infos() {
    let fx = Fixture::new();
    let a = plain(&fx, "A");
    let b = plain(&fx, "B");
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    let a_info = ctx.ensure_type_info(a);
    let b_info = ctx.ensure_type_info(b);
    fx.declare(ClassStructure::new(fx.class("B"), Format::Class));

    assert!(Arc::ptr_eq(&a_info, &ctx.ensure_type_info(a)));
    let rebuilt = ctx.ensure_type_info(b);
    assert!(!Arc::ptr_eq(&b_info, &rebuilt));
    assert_eq!(rebuilt.invalidation_count, 1);
}

#[test]
fn redefining_a_base_class_invalidates_subclasses() {
    let fx = Fixture::new();
    let base = plain(&fx, "Base");
    let sub_class = fx.class("Sub");
    let sub = fx.declare(ClassStructure::new(sub_class, Format::Class).with_contribution(ContributionDecl::extends(base)));
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    let before = ctx.ensure_type_info(sub);
    assert!(before.class_chain.contains_key(&fx.class("Base")));
    let run = fx.pool.declare_method(fx.class("Base"), "run", vec![], vec![]);
    fx.declare(ClassStructure::new(fx.class("Base"), Format::Class).with_method(run));

    let after = ctx.ensure_type_info(sub);
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.find_method_by_signature(fx.sig("run", vec![], vec![])).is_some());
}

#[test]
fn an_unresolved_type_reports_once_and_answers_object() {
    let fx = Fixture::new();
    let (_, ghost) = fx.pool.unresolved_type("Ghost");
    let collector = DiagnosticCollector::new();
    let ctx = ResolutionContext::new(&fx.pool, &collector);

    let info = ctx.ensure_type_info(ghost);
    assert!(info.is_complete());
    assert_eq!(info.class_identity, fx.pool.core().object);
    ctx.ensure_type_info(ghost);
    assert_eq!(collector.codes(), vec![diagnostic_codes::TYPE_UNRESOLVED]);
    assert!(!ctx.is_halted());
}

#[test]
fn unknown_classes_and_cyclical_typedefs_are_reported() {
    let fx = Fixture::new();
    let a = fx.pool.typedef_identity(fx.module, "A");
    let b = fx.pool.typedef_identity(fx.module, "B");
    fx.pool.register_typedef(a, fx.pool.typedef_type(b));
    fx.pool.register_typedef(b, fx.pool.typedef_type(a));
    let collector = DiagnosticCollector::new();
    let ctx = ResolutionContext::new(&fx.pool, &collector);

    ctx.ensure_type_info(fx.ty(fx.class("Nowhere")));
    ctx.ensure_type_info(fx.pool.typedef_type(a));
    assert_eq!(
        collector.codes(),
        vec![diagnostic_codes::CLASS_UNKNOWN, diagnostic_codes::TYPEDEF_CYCLICAL]
    );
}

#[test]
fn a_halting_sink_marks_the_context() {
    let fx = Fixture::new();
    let (_, ghost) = fx.pool.unresolved_type("Ghost");
    let collector = DiagnosticCollector::halting();
    let ctx = ResolutionContext::new(&fx.pool, &collector);

    let info = ctx.ensure_type_info(ghost);
    assert!(ctx.is_halted());
    assert!(info.is_complete());
}

#[test]
fn a_mixin_applied_to_a_structural_match_still_completes() {
    // interface Named { String name(); }
    // mixin Greeter into Named { String greet(); }
    // class Person incorporates Greeter { String name(); }
    let fx = Fixture::new();
    let named = fx.class("Named");
    fx.declare(
        ClassStructure::new(named, Format::Interface)
            .with_method(fx.declared_method(named, "name", vec![], vec![fx.string()])),
    );
    let greeter = fx.class("Greeter");
    fx.declare(
        ClassStructure::new(greeter, Format::Mixin)
            .with_contribution(ContributionDecl::into(fx.ty(named)))
            .with_method(fx.pool.declare_method(greeter, "greet", vec![], vec![fx.string()])),
    );
    let person = fx.class("Person");
    fx.declare(
        ClassStructure::new(person, Format::Class)
            .with_contribution(ContributionDecl::incorporates(fx.ty(greeter)))
            .with_method(fx.pool.declare_method(person, "name", vec![], vec![fx.string()])),
    );
    let collector = DiagnosticCollector::new();
    let ctx = ResolutionContext::new(&fx.pool, &collector);

    let info = ctx.ensure_type_info(fx.ty(person));
    assert!(info.is_complete());
    assert!(collector.is_empty(), "{:?}", collector.codes());
    let chain: Vec<IdentityId> = info.class_chain.keys().copied().collect();
    assert_eq!(chain, vec![person, greeter, fx.pool.core().object]);
    assert!(info.find_method_by_signature(fx.sig("greet", vec![], vec![fx.string()])).is_some());
    assert_eq!(ctx.is_a(fx.ty(person), fx.ty(named)), Relation::IsAWeak);
}

#[test]
fn concurrent_requests_agree() {
    let fx = Fixture::new();
    let base = plain(&fx, "Base");
    let middle_class = fx.class("Middle");
    let middle = fx.declare(
        ClassStructure::new(middle_class, Format::Class).with_contribution(ContributionDecl::extends(base)),
    );
    let sub_class = fx.class("Sub");
    let sub = fx.declare(
        ClassStructure::new(sub_class, Format::Class)
            .with_contribution(ContributionDecl::extends(middle))
            .with_method(fx.pool.declare_method(sub_class, "run", vec![], vec![])),
    );
    let silent = SilentSink;
    let ctx = ResolutionContext::new(&fx.pool, &silent);

    let chains: Vec<Vec<IdentityId>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let info = ctx.ensure_type_info(sub);
                    assert!(info.is_complete());
                    info.class_chain.keys().copied().collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let expected = vec![sub_class, middle_class, fx.class("Base"), fx.pool.core().object];
    for chain in chains {
        assert_eq!(chain, expected);
    }
}

#[test]
fn builds_run_under_a_trace_subscriber() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let fx = Fixture::new();
        let base = plain(&fx, "Base");
        let sub = fx.declare(
            ClassStructure::new(fx.class("Sub"), Format::Class).with_contribution(ContributionDecl::extends(base)),
        );
        let silent = SilentSink;
        let ctx = ResolutionContext::new(&fx.pool, &silent);
        assert!(ctx.ensure_type_info(sub).is_complete());
        assert_eq!(ctx.is_a(sub, base), Relation::IsA);
    });
}
