use super::*;
use crate::diagnostics::render;
use crate::test_fixtures::Fixture;
use xtc_common::diagnostics::{DiagnosticCategory, diagnostic_codes};

#[test]
fn render_fills_the_template_with_formatted_args() {
    let fx = Fixture::new();
    let child = fx.class("Child");
    let named = fx.ty(fx.class("Named"));
    let pending = PendingDiagnostic::error(
        diagnostic_codes::EXTENDS_NOT_CLASS,
        vec![DiagnosticArg::Identity(child), DiagnosticArg::Type(named)],
    );

    let rendered = render(&fx.pool, &pending);
    assert_eq!(rendered.code, diagnostic_codes::EXTENDS_NOT_CLASS);
    assert_eq!(rendered.category, DiagnosticCategory::Error);
    assert_eq!(rendered.message_text, "\"Child\" cannot extend \"Named\" because it is not a class.");
    assert!(rendered.subject.is_empty());
}

#[test]
fn render_names_the_subject() {
    let fx = Fixture::new();
    let list = fx.ty(fx.class("List"));
    let subject = fx.pool.parameterized_type(list, vec![fx.int()]);
    let pending = PendingDiagnostic::error(diagnostic_codes::CLASS_UNKNOWN, vec![DiagnosticArg::Type(list)])
        .with_subject(subject);
    assert_eq!(render(&fx.pool, &pending).subject, "List<Int>");
}

#[test]
fn unknown_codes_render_their_arguments() {
    let fx = Fixture::new();
    let pending = PendingDiagnostic::warning(9999, vec!["first".into(), DiagnosticArg::Number(2)]);
    let rendered = render(&fx.pool, &pending);
    assert_eq!(rendered.message_text, "first, 2");
    assert!(!pending.is_error());
}

#[test]
fn collector_keeps_diagnostics_in_order() {
    let collector = DiagnosticCollector::new();
    assert!(collector.is_empty());
    assert!(!collector.report(PendingDiagnostic::error(diagnostic_codes::TYPE_UNRESOLVED, vec![])));
    collector.report(PendingDiagnostic::warning(diagnostic_codes::CONTRIBUTION_DUPLICATE, vec![]));
    collector.report(PendingDiagnostic::error(diagnostic_codes::TYPE_UNRESOLVED, vec![]));

    assert_eq!(
        collector.codes(),
        vec![
            diagnostic_codes::TYPE_UNRESOLVED,
            diagnostic_codes::CONTRIBUTION_DUPLICATE,
            diagnostic_codes::TYPE_UNRESOLVED,
        ]
    );
    assert_eq!(collector.count_of(diagnostic_codes::TYPE_UNRESOLVED), 2);
    assert_eq!(collector.diagnostics()[1].severity, DiagnosticSeverity::Warning);
    collector.clear();
    assert!(collector.is_empty());
}

#[test]
fn halting_collector_asks_to_halt_on_errors_only() {
    let collector = DiagnosticCollector::halting();
    assert!(!collector.report(PendingDiagnostic::warning(diagnostic_codes::CONTRIBUTION_DUPLICATE, vec![])));
    assert!(collector.report(PendingDiagnostic::error(diagnostic_codes::CLASS_UNKNOWN, vec![])));
    assert!(!SilentSink.report(PendingDiagnostic::error(diagnostic_codes::CLASS_UNKNOWN, vec![])));
}
