//! Structured diagnostics and the sink they are delivered to.
//!
//! The engine never formats messages while resolving types. It records the
//! code and raw arguments in a [`PendingDiagnostic`] and hands it to the
//! injected [`DiagnosticSink`]; [`render`] produces text on demand.

use crate::format::TypeFormatter;
use crate::pool::ConstantPool;
use crate::types::{IdentityId, SignatureId, TypeId};
use std::sync::{Arc, Mutex, PoisonError};
use xtc_common::diagnostics::{Diagnostic, DiagnosticCategory, format_message, get_diagnostic_message};
use xtc_common::interner::Atom;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

// =============================================================================
// Lazy Diagnostic Arguments
// =============================================================================

/// Argument for a diagnostic message template, formatted only when rendered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticArg {
    Type(TypeId),
    Identity(IdentityId),
    Signature(SignatureId),
    Atom(Atom),
    String(Arc<str>),
    Number(usize),
}

macro_rules! impl_from_diagnostic_arg {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(impl From<$source> for DiagnosticArg {
            fn from(v: $source) -> Self { Self::$variant(v) }
        })*
    };
}

impl_from_diagnostic_arg! {
    TypeId      => Type,
    IdentityId  => Identity,
    SignatureId => Signature,
    Atom        => Atom,
    usize       => Number,
}

impl From<&str> for DiagnosticArg {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for DiagnosticArg {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

/// A diagnostic that hasn't been rendered yet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PendingDiagnostic {
    pub code: u32,
    pub args: Vec<DiagnosticArg>,
    pub severity: DiagnosticSeverity,
    /// The type whose TypeInfo was being built.
    pub subject: Option<TypeId>,
}

impl PendingDiagnostic {
    pub fn error(code: u32, args: Vec<DiagnosticArg>) -> Self {
        Self {
            code,
            args,
            severity: DiagnosticSeverity::Error,
            subject: None,
        }
    }

    pub fn warning(code: u32, args: Vec<DiagnosticArg>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(code, args)
        }
    }

    pub fn with_subject(mut self, subject: TypeId) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receives diagnostics raised while resolving types.
pub trait DiagnosticSink: Send + Sync {
    /// Deliver one diagnostic. Returns `true` if the caller asked to halt;
    /// resolution still completes with degraded values.
    fn report(&self, diagnostic: PendingDiagnostic) -> bool;
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Mutex<Vec<PendingDiagnostic>>,
    halt_on_error: bool,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector that asks to halt on the first error.
    pub fn halting() -> Self {
        Self {
            halt_on_error: true,
            ..Self::default()
        }
    }

    pub fn diagnostics(&self) -> Vec<PendingDiagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn codes(&self) -> Vec<u32> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|d| d.code)
            .collect()
    }

    pub fn count_of(&self, code: u32) -> usize {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.code == code)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn clear(&self) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn report(&self, diagnostic: PendingDiagnostic) -> bool {
        let halt = self.halt_on_error && diagnostic.is_error();
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
        halt
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentSink;

impl DiagnosticSink for SilentSink {
    fn report(&self, _diagnostic: PendingDiagnostic) -> bool {
        false
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn render_arg(formatter: &TypeFormatter<'_>, pool: &ConstantPool, arg: &DiagnosticArg) -> String {
    match arg {
        DiagnosticArg::Type(t) => formatter.format(*t),
        DiagnosticArg::Identity(id) => formatter.format_identity(*id),
        DiagnosticArg::Signature(sig) => formatter.format_signature(*sig),
        DiagnosticArg::Atom(atom) => pool.name_text(*atom).to_string(),
        DiagnosticArg::String(s) => s.to_string(),
        DiagnosticArg::Number(n) => n.to_string(),
    }
}

/// Render a pending diagnostic against the pool its arguments came from.
pub fn render(pool: &ConstantPool, diagnostic: &PendingDiagnostic) -> Diagnostic {
    let formatter = TypeFormatter::new(pool);
    let args: Vec<String> = diagnostic
        .args
        .iter()
        .map(|arg| render_arg(&formatter, pool, arg))
        .collect();
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let category = match diagnostic.severity {
        DiagnosticSeverity::Error => DiagnosticCategory::Error,
        DiagnosticSeverity::Warning => DiagnosticCategory::Warning,
    };
    let mut rendered = match get_diagnostic_message(diagnostic.code) {
        Some(message) => Diagnostic {
            code: diagnostic.code,
            category,
            message_text: format_message(message.message, &refs),
            subject: String::new(),
        },
        None => Diagnostic::error(diagnostic.code, refs.join(", ")),
    };
    if let Some(subject) = diagnostic.subject {
        rendered = rendered.with_subject(formatter.format(subject));
    }
    rendered
}
