//! Diagnostic types and message lookup.
//!
//! The engine reports structured diagnostics (a stable code plus arguments);
//! the text is produced here from the templates in `data.rs`.

use serde::Serialize;

mod data;
pub use data::{DIAGNOSTIC_MESSAGES, diagnostic_codes, diagnostic_messages};

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Suggestion = 2,
    Message = 3,
}

/// A rendered diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message_text: String,
    /// The type or class whose resolution produced the diagnostic.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject: String,
}

impl Diagnostic {
    /// Create an error diagnostic with literal text.
    #[must_use]
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            category: DiagnosticCategory::Error,
            message_text: message.into(),
            subject: String::new(),
        }
    }

    /// Render the template registered for `code` with the given arguments.
    ///
    /// Unknown codes render as the joined arguments so nothing is lost.
    #[must_use]
    pub fn from_code(code: u32, args: &[&str]) -> Self {
        match get_diagnostic_message(code) {
            Some(msg) => Self {
                code,
                category: msg.category,
                message_text: format_message(msg.message, args),
                subject: String::new(),
            },
            None => Self::error(code, args.join(", ")),
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// One JSON object, as written by tooling that collects diagnostics.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.category {
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Suggestion => "suggestion",
            DiagnosticCategory::Message => "message",
        };
        write!(f, "{label} XTC{}: {}", self.code, self.message_text)
    }
}

/// Format a diagnostic message by replacing {0}, {1}, etc. with arguments.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// A diagnostic message definition with code, category, and message template.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// Look up a diagnostic message definition by code.
#[must_use]
pub fn get_diagnostic_message(code: u32) -> Option<&'static DiagnosticMessage> {
    DIAGNOSTIC_MESSAGES.iter().find(|m| m.code == code)
}

#[must_use]
pub fn get_message_template(code: u32) -> Option<&'static str> {
    get_diagnostic_message(code).map(|m| m.message)
}

#[must_use]
pub fn get_diagnostic_category(code: u32) -> Option<DiagnosticCategory> {
    get_diagnostic_message(code).map(|m| m.category)
}

#[cfg(test)]
#[path = "../../tests/diagnostics_tests.rs"]
mod tests;
