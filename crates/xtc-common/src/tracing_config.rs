//! Tracing configuration for debugging type resolution.
//!
//! Supports three output formats controlled by `XTC_LOG_FORMAT`:
//!
//! - `text` (default): standard `tracing-subscriber` flat output
//! - `tree`: hierarchical indented output via `tracing-tree`; build spans
//!   nest, so a TypeInfo build reads top-down
//! - `json`: one JSON object per span/event
//!
//! ```bash
//! XTC_LOG=debug XTC_LOG_FORMAT=tree cargo test -p xtc-types
//! XTC_LOG=xtc::query_json=trace XTC_LOG_FORMAT=json my-tool
//! XTC_LOG="xtc_types::builder=trace,xtc_types::relation=debug" my-tool
//! ```
//!
//! The subscriber is only installed when `XTC_LOG` (or `RUST_LOG`) is set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Tree,
    Json,
}

impl LogFormat {
    /// Parse a format name; anything unrecognised is `Text`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("XTC_LOG_FORMAT").unwrap_or_default())
    }
}

/// Build an `EnvFilter` from `XTC_LOG`, falling back to `RUST_LOG`.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("XTC_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Install the global tracing subscriber.
///
/// Does nothing when neither `XTC_LOG` nor `RUST_LOG` is set. Safe to call
/// more than once: a subscriber that is already installed wins, which lets
/// every test call this at the top. Output goes to stderr.
pub fn init_tracing() {
    let has_xtc_log = std::env::var("XTC_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_xtc_log && !has_rust_log {
        return;
    }

    let filter = build_filter();
    let result = match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true);
            Registry::default().with(filter).with(tree_layer).try_init()
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).try_init()
        }
        LogFormat::Text => {
            let text_layer = fmt::layer().with_writer(std::io::stderr);
            Registry::default().with(filter).with(text_layer).try_init()
        }
    };
    if result.is_err() {
        tracing::trace!("tracing subscriber already installed");
    }
}
