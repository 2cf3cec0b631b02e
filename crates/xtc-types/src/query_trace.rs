//! Structured query tracing for engine entry points.
//!
//! Events use target `xtc::query_json` and are intended to be consumed with:
//! `XTC_LOG=xtc::query_json=trace XTC_LOG_FORMAT=json`.
//!
//! Environment:
//! - `XTC_QUERY_RUN_ID`: optional run identifier attached to every event.

use crate::relation::Relation;
use crate::types::TypeId;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, trace};

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);
static QUERY_RUN_ID: OnceLock<String> = OnceLock::new();

#[inline]
pub(crate) fn enabled() -> bool {
    tracing::enabled!(target: "xtc::query_json", Level::TRACE)
}

#[inline]
pub(crate) fn next_query_id() -> u64 {
    NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed)
}

#[inline]
fn run_id() -> &'static str {
    QUERY_RUN_ID
        .get_or_init(|| std::env::var("XTC_QUERY_RUN_ID").unwrap_or_else(|_| "default".to_string()))
        .as_str()
}

#[inline]
pub(crate) fn type_info_start(query_id: u64, input: TypeId, invalidation_count: u64) {
    trace!(
        target: "xtc::query_json",
        event = "query",
        phase = "start",
        run_id = run_id(),
        query_id,
        op = "ensure_type_info",
        input_type_id = input.0,
        invalidation_count
    );
}

#[inline]
pub(crate) fn type_info_end(query_id: u64, result_type: TypeId, complete: bool, cache_hit: bool) {
    trace!(
        target: "xtc::query_json",
        event = "query",
        phase = "end",
        run_id = run_id(),
        query_id,
        op = "ensure_type_info",
        result_type_id = result_type.0,
        complete,
        cache_hit
    );
}

#[inline]
pub(crate) fn relation_start(query_id: u64, source: TypeId, target: TypeId) {
    trace!(
        target: "xtc::query_json",
        event = "query",
        phase = "start",
        run_id = run_id(),
        query_id,
        op = "is_a",
        source_type_id = source.0,
        target_type_id = target.0
    );
}

#[inline]
pub(crate) fn relation_end(query_id: u64, result: Relation, cache_hit: bool) {
    trace!(
        target: "xtc::query_json",
        event = "query",
        phase = "end",
        run_id = run_id(),
        query_id,
        op = "is_a",
        result = result.name(),
        cache_hit
    );
}
