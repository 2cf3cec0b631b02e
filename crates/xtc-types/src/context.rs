//! Resolution context: the caches derived from one constant pool.
//!
//! A [`ResolutionContext`] borrows a pool and owns every memo table built
//! from it (TypeInfo, `is_a`, formal-type usage). Tables are `DashMap`s so
//! several threads can resolve against one context; a slot that is still
//! being computed holds a sentinel tagged with the thread that placed it.
//!
//! TypeInfo construction is recursive and may loop back onto a type that is
//! still being built on the same thread. Such a request is answered without
//! the missing info, the requester is recorded as deferred, and the outermost
//! `ensure_type_info` call rebuilds deferred types until everything it
//! touched is complete.

use crate::diagnostics::{DiagnosticArg, DiagnosticSink, PendingDiagnostic};
use crate::pool::ConstantPool;
use crate::query_trace;
use crate::relation::RelationState;
use crate::relation::usage::{UsageKey, UsageState};
use crate::type_info::TypeInfo;
use crate::types::{IdentityId, TypeData, TypeId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use tracing::{Level, debug, span, trace};
use xtc_common::diagnostics::diagnostic_codes;
use xtc_common::limits::{
    MAX_TYPE_INFO_BUILD_DEPTH, MAX_TYPE_INFO_RETRY_DEPTH, STACK_GROWTH_SIZE, STACK_RED_ZONE,
};

// =============================================================================
// Cache slots
// =============================================================================

/// One TypeInfo cache slot.
#[derive(Clone, Debug)]
pub(crate) enum TypeInfoSlot {
    /// A build is in progress on `owner`.
    Placeholder { owner: ThreadId },
    /// `validated` is the invalidation count the info was last checked
    /// against.
    Built { info: Arc<TypeInfo>, validated: u64 },
}

impl TypeInfoSlot {
    /// Placeholder < incomplete < complete.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            TypeInfoSlot::Placeholder { .. } => 1,
            TypeInfoSlot::Built { info, .. } if info.is_complete() => 3,
            TypeInfoSlot::Built { .. } => 2,
        }
    }
}

/// Per-thread bookkeeping for in-flight builds and relations.
#[derive(Debug, Default)]
pub(crate) struct BuildState {
    /// Types whose build is on this thread's stack, innermost last.
    pub(crate) building: Vec<TypeId>,
    pub(crate) claimed: FxHashSet<TypeId>,
    /// Types to rebuild once the outermost request finishes.
    pub(crate) deferred: Vec<TypeId>,
    pub(crate) relation_visiting: FxHashSet<(TypeId, TypeId)>,
    pub(crate) relation_depth: u32,
    /// Relation keys a nested check found on the stack.
    pub(crate) relation_cycles: FxHashSet<(TypeId, TypeId)>,
    pub(crate) usage_visiting: FxHashSet<UsageKey>,
    /// Usage keys a nested computation found on the stack; results that
    /// depend on them are not cached.
    pub(crate) usage_cycles: FxHashSet<UsageKey>,
    /// Bumped whenever a relation used an info that may still change; such
    /// results are not cached.
    pub(crate) provisional: u64,
    /// Bumped whenever a relation needed the info of a type this thread is
    /// building.
    pub(crate) blocked: u64,
    pub(crate) ensure_depth: u32,
}

// =============================================================================
// ResolutionContext
// =============================================================================

/// Caches derived from one pool, plus the sink diagnostics go to.
pub struct ResolutionContext<'p> {
    pool: &'p ConstantPool,
    sink: &'p dyn DiagnosticSink,
    type_infos: DashMap<TypeId, TypeInfoSlot>,
    pub(crate) relations: DashMap<(TypeId, TypeId), RelationState>,
    pub(crate) usages: DashMap<UsageKey, UsageState>,
    build_states: DashMap<ThreadId, BuildState>,
    /// Diagnostics already delivered, with the invalidation count at the time.
    reported: DashMap<PendingDiagnostic, u64>,
    halted: AtomicBool,
}

impl<'p> ResolutionContext<'p> {
    pub fn new(pool: &'p ConstantPool, sink: &'p dyn DiagnosticSink) -> Self {
        Self {
            pool,
            sink,
            type_infos: DashMap::new(),
            relations: DashMap::new(),
            usages: DashMap::new(),
            build_states: DashMap::new(),
            reported: DashMap::new(),
            halted: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &'p ConstantPool {
        self.pool
    }

    /// True once the sink asked to halt. Resolution still completes; later
    /// results may be degraded.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Deliver a diagnostic, attributed to the type being built on this
    /// thread. A diagnostic identical to one already delivered since the
    /// last invalidation is dropped (retry rounds rebuild types).
    pub(crate) fn report(&self, diagnostic: PendingDiagnostic) {
        let diagnostic = match self.with_thread_state(|s| s.building.last().copied()) {
            Some(subject) if diagnostic.subject.is_none() => diagnostic.with_subject(subject),
            _ => diagnostic,
        };
        let count = self.pool.invalidation_count();
        match self.reported.entry(diagnostic.clone()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == count {
                    return;
                }
                entry.insert(count);
            }
            Entry::Vacant(entry) => {
                entry.insert(count);
            }
        }
        debug!(code = diagnostic.code, subject = ?diagnostic.subject, "diagnostic reported");
        if self.sink.report(diagnostic) {
            self.halted.store(true, Ordering::Release);
        }
    }

    pub(crate) fn with_thread_state<R>(&self, f: impl FnOnce(&mut BuildState) -> R) -> R {
        let mut entry = self.build_states.entry(thread::current().id()).or_default();
        f(entry.value_mut())
    }

    pub(crate) fn is_claimed_here(&self, t: TypeId) -> bool {
        self.with_thread_state(|s| s.claimed.contains(&t))
    }

    fn defer(&self, t: TypeId) {
        self.with_thread_state(|s| {
            if !s.deferred.contains(&t) {
                s.deferred.push(t);
            }
        });
    }

    // -------------------------------------------------------------------------
    // Slot access
    // -------------------------------------------------------------------------

    /// The cached info for `t` if it is complete and still valid.
    ///
    /// A slot validated against an older invalidation count is re-stamped
    /// when none of the declarations invalidated since then is one of its
    /// dependencies.
    pub(crate) fn current_info(&self, t: TypeId) -> Option<Arc<TypeInfo>> {
        let (info, validated) = match self.type_infos.get(&t).map(|e| e.value().clone()) {
            Some(TypeInfoSlot::Built { info, validated }) if info.is_complete() => (info, validated),
            _ => return None,
        };
        let now = self.pool.invalidation_count();
        if validated == now {
            return Some(info);
        }
        let changed = self.pool.invalidated_since(validated);
        if changed.iter().any(|id| info.dependencies.contains(id)) {
            debug!(type_id = t.0, validated, now, "type info is stale");
            return None;
        }
        if let Some(mut entry) = self.type_infos.get_mut(&t) {
            if let TypeInfoSlot::Built {
                info: current,
                validated: stamp,
            } = entry.value_mut()
            {
                if Arc::ptr_eq(current, &info) && *stamp < now {
                    *stamp = now;
                }
            }
        }
        trace!(type_id = t.0, now, "type info re-stamped");
        Some(info)
    }

    /// Whatever is stored for `t`, complete or not.
    pub(crate) fn best_available(&self, t: TypeId) -> Option<Arc<TypeInfo>> {
        match self.type_infos.get(&t).map(|e| e.value().clone()) {
            Some(TypeInfoSlot::Built { info, .. }) => Some(info),
            _ => None,
        }
    }

    /// Rank of the slot for `t` (0 when empty).
    pub fn slot_rank(&self, t: TypeId) -> u8 {
        self.type_infos.get(&t).map_or(0, |e| e.value().rank())
    }

    /// Store a slot. A placeholder always replaces what is there; an info
    /// replaces a lower-ranked slot, or a complete one computed against an
    /// older invalidation count. Returns whether the write was accepted.
    pub(crate) fn store(&self, t: TypeId, slot: TypeInfoSlot) -> bool {
        match self.type_infos.entry(t) {
            Entry::Vacant(entry) => {
                entry.insert(slot);
                true
            }
            Entry::Occupied(mut entry) => {
                let accept = match (&slot, entry.get()) {
                    (TypeInfoSlot::Placeholder { .. }, _) => true,
                    (TypeInfoSlot::Built { info: new, .. }, TypeInfoSlot::Built { info: old, .. })
                        if new.is_complete() && old.is_complete() =>
                    {
                        new.invalidation_count > old.invalidation_count
                    }
                    (new, old) => new.rank() > old.rank(),
                };
                if accept {
                    entry.insert(slot);
                } else {
                    trace!(type_id = t.0, "type info store rejected");
                }
                accept
            }
        }
    }

    fn claim(&self, t: TypeId) -> ClaimGuard<'_, 'p> {
        let depth = self.with_thread_state(|s| {
            s.claimed.insert(t);
            s.building.push(t);
            s.building.len()
        });
        if depth > MAX_TYPE_INFO_BUILD_DEPTH as usize {
            panic!("TypeInfo builds nested deeper than {MAX_TYPE_INFO_BUILD_DEPTH} at type #{}", t.0);
        }
        self.store(
            t,
            TypeInfoSlot::Placeholder {
                owner: thread::current().id(),
            },
        );
        ClaimGuard { ctx: self, type_id: t }
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// The type to actually build for `t`: its normal form, or `Object`
    /// after reporting why `t` cannot be built.
    fn validate(&self, t: TypeId) -> TypeId {
        let pool = self.pool;
        let object = pool.core().object_type;
        if pool.contains_unresolved(t) {
            self.report(PendingDiagnostic::error(
                diagnostic_codes::TYPE_UNRESOLVED,
                vec![DiagnosticArg::Type(t)],
            ));
            return object;
        }
        if let Some(typedef) = pool.typedef_cycle(t) {
            self.report(PendingDiagnostic::error(
                diagnostic_codes::TYPEDEF_CYCLICAL,
                vec![DiagnosticArg::Identity(typedef)],
            ));
            return object;
        }
        if let Some(class) = self.unknown_class(t) {
            self.report(PendingDiagnostic::error(
                diagnostic_codes::CLASS_UNKNOWN,
                vec![DiagnosticArg::Identity(class)],
            ));
            return object;
        }
        pool.normalize(t)
    }

    /// A class referenced by the outer shape of `t` that has no structure.
    fn unknown_class(&self, t: TypeId) -> Option<IdentityId> {
        let pool = self.pool;
        match pool.type_data(pool.resolve_typedefs(t)) {
            TypeData::Terminal(crate::types::TerminalType::Class(class)) => {
                pool.structure(class).is_none().then_some(class)
            }
            TypeData::Parameterized { base, .. }
            | TypeData::Immutable(base)
            | TypeData::Access { base, .. }
            | TypeData::VirtualChild { parent: base, .. } => self.unknown_class(base),
            TypeData::Annotated { annotation, base } => self
                .unknown_class(annotation)
                .or_else(|| self.unknown_class(base)),
            TypeData::Intersection(a, b) | TypeData::Union(a, b) | TypeData::Difference(a, b) => {
                self.unknown_class(a).or_else(|| self.unknown_class(b))
            }
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // ensure_type_info
    // -------------------------------------------------------------------------

    /// The complete TypeInfo for `t`.
    ///
    /// Invalid types (unresolved names, cyclical typedefs, unknown classes)
    /// are reported and answer the info of `Object`.
    ///
    /// # Panics
    ///
    /// Panics if deferred builds do not settle within
    /// `MAX_TYPE_INFO_RETRY_DEPTH` rounds; that is an engine defect.
    pub fn ensure_type_info(&self, t: TypeId) -> Arc<TypeInfo> {
        let query = query_trace::enabled().then(query_trace::next_query_id);
        if let Some(qid) = query {
            query_trace::type_info_start(qid, t, self.pool.invalidation_count());
        }
        let mut cache_hit = true;
        let info = match self.current_info(t) {
            Some(info) => info,
            None => {
                cache_hit = false;
                stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.ensure_uncached(t))
            }
        };
        if let Some(qid) = query {
            query_trace::type_info_end(qid, info.type_id, info.is_complete(), cache_hit);
        }
        info
    }

    fn ensure_uncached(&self, t: TypeId) -> Arc<TypeInfo> {
        let target = self.validate(t);
        if target != t {
            trace!(type_id = t.0, normalized = target.0, "ensure_type_info - normalized");
            return self.ensure_type_info(target);
        }
        if self.is_claimed_here(t) {
            // Asked for a type this thread is building: whatever is there, or
            // an uncached build that sees the type as unavailable.
            return match self.best_available(t) {
                Some(info) => info,
                None => Arc::new(self.build_type_info(t)),
            };
        }
        let outermost = self.with_thread_state(|s| {
            s.ensure_depth += 1;
            s.ensure_depth == 1
        });
        let _depth = EnsureDepthGuard { ctx: self };
        let info = self.build_and_store(t);
        if outermost {
            self.complete_deferred(t, info)
        } else {
            if !info.is_complete() {
                self.defer(t);
            }
            info
        }
    }

    /// TypeInfo for a contribution or other dependency of a build in
    /// progress. `None` means `t` is being built on this thread; the
    /// requester has been recorded for a rebuild.
    pub(crate) fn ensure_type_info_internal(&self, t: TypeId) -> Option<Arc<TypeInfo>> {
        if let Some(info) = self.current_info(t) {
            return Some(info);
        }
        let target = self.validate(t);
        if target != t {
            return self.ensure_type_info_internal(target);
        }
        let requester = self.with_thread_state(|s| s.building.last().copied());
        if self.is_claimed_here(t) {
            trace!(type_id = t.0, requester = ?requester, "ensure_type_info_internal - deferred");
            if let Some(requester) = requester {
                self.defer(requester);
            }
            return None;
        }
        let info = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.build_and_store(t));
        if !info.is_complete() {
            self.defer(t);
            if let Some(requester) = requester {
                self.defer(requester);
            }
        }
        Some(info)
    }

    fn build_and_store(&self, t: TypeId) -> Arc<TypeInfo> {
        let _span = span!(Level::TRACE, "build_type_info", type_id = t.0).entered();
        let guard = self.claim(t);
        let info = Arc::new(self.build_type_info(t));
        let accepted = self.store(
            t,
            TypeInfoSlot::Built {
                info: info.clone(),
                validated: info.invalidation_count,
            },
        );
        drop(guard);
        debug!(
            type_id = t.0,
            complete = info.is_complete(),
            accepted,
            methods = info.methods.len(),
            properties = info.properties.len(),
            "build_type_info"
        );
        if !accepted && !info.is_complete() {
            if let Some(better) = self.current_info(t) {
                return better;
            }
        }
        info
    }

    /// Rebuild deferred types (and `t`) until nothing is pending.
    fn complete_deferred(&self, t: TypeId, mut info: Arc<TypeInfo>) -> Arc<TypeInfo> {
        let mut round = 0;
        loop {
            let deferred = self.with_thread_state(|s| std::mem::take(&mut s.deferred));
            if deferred.is_empty() && info.is_complete() {
                return info;
            }
            round += 1;
            if round > MAX_TYPE_INFO_RETRY_DEPTH {
                panic!(
                    "TypeInfo for type #{} did not complete after {MAX_TYPE_INFO_RETRY_DEPTH} rounds ({} types pending)",
                    t.0,
                    deferred.len()
                );
            }
            debug!(type_id = t.0, round, deferred = deferred.len(), "ensure_type_info - rebuilding deferred types");
            for &d in &deferred {
                if d != t && self.current_info(d).is_none() {
                    self.build_and_store(d);
                }
            }
            if !info.is_complete() || deferred.contains(&t) {
                info = self.build_and_store(t);
            }
        }
    }

    /// TypeInfo for relation checks. Uses whatever is stored for a type this
    /// thread is building, and marks the relation result as provisional
    /// whenever the info used may still change.
    pub(crate) fn relation_type_info(&self, t: TypeId) -> Option<Arc<TypeInfo>> {
        if let Some(info) = self.current_info(t) {
            return Some(info);
        }
        let t = self.pool.normalize(t);
        if let Some(info) = self.current_info(t) {
            return Some(info);
        }
        if self.is_claimed_here(t) {
            self.with_thread_state(|s| {
                s.provisional += 1;
                s.blocked += 1;
            });
            return self.best_available(t);
        }
        let info = self.ensure_type_info(t);
        if !info.is_complete() {
            self.with_thread_state(|s| s.provisional += 1);
        }
        Some(info)
    }

    /// Drop every cached TypeInfo, relation and usage result.
    pub fn clear(&self) {
        self.type_infos.clear();
        self.relations.clear();
        self.usages.clear();
        self.reported.clear();
    }
}

/// Releases a claim when a build finishes (or unwinds).
struct ClaimGuard<'c, 'p> {
    ctx: &'c ResolutionContext<'p>,
    type_id: TypeId,
}

impl Drop for ClaimGuard<'_, '_> {
    fn drop(&mut self) {
        let t = self.type_id;
        self.ctx.with_thread_state(|s| {
            s.claimed.remove(&t);
            if s.building.last() == Some(&t) {
                s.building.pop();
            } else {
                s.building.retain(|&b| b != t);
            }
        });
        let me = thread::current().id();
        self.ctx.type_infos.remove_if(&t, |_, slot| {
            matches!(slot, TypeInfoSlot::Placeholder { owner } if *owner == me)
        });
    }
}

struct EnsureDepthGuard<'c, 'p> {
    ctx: &'c ResolutionContext<'p>,
}

impl Drop for EnsureDepthGuard<'_, '_> {
    fn drop(&mut self) {
        self.ctx.with_thread_state(|s| s.ensure_depth = s.ensure_depth.saturating_sub(1));
    }
}

#[cfg(test)]
#[path = "../tests/context_tests.rs"]
mod tests;
