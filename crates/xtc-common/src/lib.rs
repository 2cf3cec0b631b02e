//! Common types and utilities for the XTC type-constant engine.
//!
//! This crate provides the foundations shared by the engine crates:
//! - String interning (`Atom`, `ShardedInterner`)
//! - Engine limits and thresholds
//! - Diagnostic categories, stable codes and message templates
//! - Tracing subscriber setup

// String interning for declaration names
pub mod interner;
pub use interner::{Atom, ShardedInterner};

// Centralized limits and thresholds
pub mod limits;

// Diagnostic codes, message templates and rendered diagnostics
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory, format_message};

// Subscriber setup driven by XTC_LOG / XTC_LOG_FORMAT
pub mod tracing_config;
