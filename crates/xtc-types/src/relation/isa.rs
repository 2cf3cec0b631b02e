//! The `is_a` relation.
//!
//! `is_a(source, target)` answers whether a value of `source` may be used
//! where `target` is expected. Results are memoized per context; a check
//! that reaches itself again on the same thread answers `Incompatible`, and
//! anything computed on top of such an assumption (or on top of a TypeInfo
//! that may still change) is not cached.

use super::{Relation, RelationState};
use crate::context::ResolutionContext;
use crate::generics::Bindings;
use crate::identity::IdentityKind;
use crate::query_trace;
use crate::structure::{Composition, Format};
use crate::types::{Access, IdentityId, SignatureId, TerminalType, TypeData, TypeId};
use dashmap::mapref::entry::Entry;
use std::thread;
use tracing::trace;
use xtc_common::limits::{MAX_RELATION_DEPTH, STACK_GROWTH_SIZE, STACK_RED_ZONE};

/// Pops the relation key off this thread's stack and clears our sentinel,
/// also on unwind.
struct RelationGuard<'c, 'p> {
    ctx: &'c ResolutionContext<'p>,
    key: (TypeId, TypeId),
    owner: bool,
}

impl Drop for RelationGuard<'_, '_> {
    fn drop(&mut self) {
        let key = self.key;
        self.ctx.with_thread_state(|s| {
            s.relation_visiting.remove(&key);
            s.relation_depth = s.relation_depth.saturating_sub(1);
        });
        if self.owner {
            let me = thread::current().id();
            self.ctx
                .relations
                .remove_if(&key, |_, state| *state == RelationState::InProgress(me));
        }
    }
}

impl ResolutionContext<'_> {
    /// Whether a value of `source` may be used where `target` is expected.
    pub fn is_a(&self, source: TypeId, target: TypeId) -> Relation {
        if source == target {
            return Relation::IsA;
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.is_a_memo(source, target))
    }

    fn is_a_memo(&self, source: TypeId, target: TypeId) -> Relation {
        let query = query_trace::enabled().then(query_trace::next_query_id);
        if let Some(qid) = query {
            query_trace::relation_start(qid, source, target);
        }
        let key = (source, target);
        let count = self.pool().invalidation_count();
        let cached = self.relations.get(&key).map(|e| *e.value());
        if let Some(RelationState::Done { relation, count: at }) = cached {
            if at == count {
                if let Some(qid) = query {
                    query_trace::relation_end(qid, relation, true);
                }
                return relation;
            }
        }

        let entered = self.with_thread_state(|s| {
            if s.relation_visiting.contains(&key) {
                s.relation_cycles.insert(key);
                return None;
            }
            if s.relation_depth >= MAX_RELATION_DEPTH {
                return None;
            }
            s.relation_visiting.insert(key);
            s.relation_depth += 1;
            Some(s.provisional)
        });
        let Some(provisional_before) = entered else {
            trace!(source = source.0, target = target.0, "is_a - cycle or depth limit");
            return Relation::Incompatible;
        };

        let me = thread::current().id();
        let owner = match self.relations.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(RelationState::InProgress(me));
                true
            }
            Entry::Occupied(mut entry) => {
                let state = *entry.get();
                match state {
                    RelationState::Done { relation, count: at } if at == count => {
                        drop(entry);
                        self.with_thread_state(|s| {
                            s.relation_visiting.remove(&key);
                            s.relation_depth = s.relation_depth.saturating_sub(1);
                        });
                        return relation;
                    }
                    RelationState::Done { .. } => {
                        entry.insert(RelationState::InProgress(me));
                        true
                    }
                    // computed concurrently elsewhere; ours is not cached
                    RelationState::InProgress(_) => false,
                }
            }
        };
        let guard = RelationGuard {
            ctx: self,
            key,
            owner,
        };

        let relation = self.compute_relation(source, target);

        let cacheable = self.with_thread_state(|s| {
            s.relation_cycles.remove(&key);
            s.provisional == provisional_before && s.relation_cycles.is_empty()
        });
        if owner && cacheable {
            self.relations.insert(
                key,
                RelationState::Done {
                    relation,
                    count,
                },
            );
        }
        drop(guard);
        trace!(source = source.0, target = target.0, relation = relation.name(), cacheable, "is_a");
        if let Some(qid) = query {
            query_trace::relation_end(qid, relation, false);
        }
        relation
    }

    fn compute_relation(&self, source: TypeId, target: TypeId) -> Relation {
        let pool = self.pool();
        let source = pool.resolve_typedefs(source);
        let target = pool.resolve_typedefs(target);
        if source == target || target == pool.core().object_type {
            return Relation::IsA;
        }
        if pool.contains_unresolved(source) || pool.contains_unresolved(target) {
            return Relation::Incompatible;
        }

        // modifiers
        if let TypeData::Immutable(base) = pool.type_data(target) {
            if !self.is_immutable_value(source) {
                return Relation::Incompatible;
            }
            return self.is_a(strip_immutable(pool, source), base);
        }
        if let TypeData::Immutable(base) = pool.type_data(source) {
            return self.is_a(base, target);
        }
        if let TypeData::Access { base, access } = pool.type_data(target) {
            if access == Access::Struct && pool.access_of(source) != Access::Struct {
                return Relation::Incompatible;
            }
            return self.is_a(strip_access(pool, source), base);
        }
        if let TypeData::Access { base, .. } = pool.type_data(source) {
            return self.is_a(base, target);
        }
        if let TypeData::Annotated { annotation, base } = pool.type_data(source) {
            return self.is_a(base, target).best(self.is_a(annotation, target));
        }
        if let TypeData::Annotated { annotation, base } = pool.type_data(target) {
            return self.is_a(source, base).worse(self.is_a(source, annotation));
        }

        // relational types
        if let TypeData::Union(a, b) = pool.type_data(source) {
            return self.is_a(a, target).worse(self.is_a(b, target));
        }
        if let TypeData::Intersection(a, b) = pool.type_data(target) {
            return self.is_a(source, a).worse(self.is_a(source, b));
        }
        if let TypeData::Union(a, b) = pool.type_data(target) {
            return self.is_a(source, a).best(self.is_a(source, b));
        }
        if let TypeData::Intersection(a, b) = pool.type_data(source) {
            return self.is_a(a, target).best(self.is_a(b, target));
        }
        if let TypeData::Difference(a, b) = pool.type_data(target) {
            if self.is_a(source, b).is_compatible() {
                return Relation::Incompatible;
            }
            return self.is_a(source, a);
        }
        if let TypeData::Difference(a, _) = pool.type_data(source) {
            return self.is_a(a, target);
        }

        // formal and auto-narrowing terminals
        if pool.is_formal_type(source) {
            return self.is_a(self.formal_constraint(source), target);
        }
        if pool.is_formal_type(target) {
            return Relation::Incompatible;
        }
        if let TypeData::Terminal(TerminalType::ThisClass(class)) = pool.type_data(source) {
            return self.is_a(pool.class_type(class), target);
        }
        if let TypeData::Terminal(TerminalType::ThisClass(class)) = pool.type_data(target) {
            return self.is_a(source, pool.class_type(class));
        }
        if let TypeData::VirtualChild { .. } = pool.type_data(source) {
            return match pool.class_of(source) {
                Some(child) => self.is_a(pool.class_type(child), target),
                None => Relation::Incompatible,
            };
        }
        if let TypeData::VirtualChild { .. } = pool.type_data(target) {
            return match pool.class_of(target) {
                Some(child) => self.is_a(source, pool.class_type(child)),
                None => Relation::Incompatible,
            };
        }

        let (Some(source_class), Some(target_class)) =
            (pool.terminal_class(source), pool.terminal_class(target))
        else {
            return Relation::Incompatible;
        };
        let core = pool.core();
        if target_class == core.tuple {
            return self.tuple_relation(source, source_class, target);
        }
        if target_class == core.function {
            return self.function_relation(source, source_class, target);
        }
        if source_class == target_class {
            return self.same_class_relation(source, target, source_class);
        }

        let inherited = self.contribution_relation(source, source_class, target);
        if inherited != Relation::Incompatible {
            return inherited;
        }
        self.duck_relation(source, target, target_class)
    }

    fn is_immutable_value(&self, t: TypeId) -> bool {
        let pool = self.pool();
        pool.is_immutable(t)
            || pool
                .class_of(t)
                .and_then(|class| pool.format_of(class))
                .is_some_and(Format::is_const_like)
    }

    /// The constraint a formal type stands for.
    pub(crate) fn formal_constraint(&self, t: TypeId) -> TypeId {
        let pool = self.pool();
        let object = pool.core().object_type;
        match pool.type_data(pool.dereference(t)) {
            TypeData::Terminal(TerminalType::FormalProperty(id)) => {
                let name = pool.identity_name(id);
                pool.parent(id)
                    .filter(|&p| pool.identity_kind(p) == IdentityKind::Class)
                    .and_then(|class| pool.structure(class))
                    .and_then(|s| s.type_param(name).map(|p| p.constraint))
                    .unwrap_or(object)
            }
            _ => object,
        }
    }

    fn tuple_relation(&self, source: TypeId, source_class: IdentityId, target: TypeId) -> Relation {
        let pool = self.pool();
        if source_class != pool.core().tuple {
            return Relation::Incompatible;
        }
        let (sp, tp) = (pool.type_params(source), pool.type_params(target));
        if tp.is_empty() {
            return Relation::IsA;
        }
        if sp.len() != tp.len() {
            return Relation::Incompatible;
        }
        sp.iter()
            .zip(tp.iter())
            .fold(Relation::IsA, |acc, (&s, &t)| acc.worse(self.is_a(s, t)))
    }

    /// Parameters are contravariant and returns covariant; a function
    /// relation is never weak.
    fn function_relation(&self, source: TypeId, source_class: IdentityId, target: TypeId) -> Relation {
        let pool = self.pool();
        if source_class != pool.core().function {
            return Relation::Incompatible;
        }
        let (sp, tp) = (pool.type_params(source), pool.type_params(target));
        if tp.is_empty() {
            return Relation::IsA;
        }
        let tuple = pool.class_type(pool.core().tuple);
        let at = |list: &[TypeId], i: usize| list.get(i).copied().unwrap_or(tuple);
        let params = self.is_a(at(&tp, 0), at(&sp, 0));
        let returns = self.is_a(at(&sp, 1), at(&tp, 1));
        if params.worse(returns).is_compatible() {
            Relation::IsA
        } else {
            Relation::Incompatible
        }
    }

    /// Same class on both sides: compare actual type parameters. A differing
    /// actual for a parameter the class consumes makes the relation weak.
    fn same_class_relation(&self, source: TypeId, target: TypeId, class: IdentityId) -> Relation {
        let pool = self.pool();
        let Some(structure) = pool.structure(class) else {
            return Relation::IsA;
        };
        let (sp, tp) = (pool.type_params(source), pool.type_params(target));
        let mut result = Relation::IsA;
        for (i, decl) in structure.type_params.iter().enumerate() {
            let s = sp.get(i).copied().unwrap_or(decl.constraint);
            let t = tp.get(i).copied().unwrap_or(decl.constraint);
            if s == t {
                continue;
            }
            match self.is_a(s, t) {
                Relation::Incompatible => return Relation::Incompatible,
                _ if self.consumes_formal_type(target, decl.name) => result = Relation::IsAWeak,
                _ => {}
            }
        }
        result
    }

    /// Relation through the contributions `source`'s class declares.
    fn contribution_relation(&self, source: TypeId, source_class: IdentityId, target: TypeId) -> Relation {
        let pool = self.pool();
        let Some(structure) = pool.structure(source_class) else {
            return Relation::Incompatible;
        };
        let bindings = Bindings::of_type(pool, source);
        let mut best = Relation::Incompatible;
        for contribution in &structure.contributions {
            match contribution.composition {
                // a mixin is not an instance of what it applies to
                Composition::Equal | Composition::RebasesOnto | Composition::Into => continue,
                Composition::Incorporates if contribution.is_conditional() => {
                    let satisfied = contribution.conditions.iter().all(|c| {
                        bindings
                            .get(c.param)
                            .is_some_and(|actual| self.is_a(actual, c.constraint).is_compatible())
                    });
                    if !satisfied {
                        continue;
                    }
                }
                _ => {}
            }
            let contributed = pool.resolve_generics(contribution.type_id, &bindings);
            best = best.best(self.is_a(contributed, target));
            if best == Relation::IsA {
                return best;
            }
        }
        let core = pool.core();
        let implicit = core
            .format_interface(structure.format)
            .into_iter()
            .chain(structure.virtual_child.then_some(core.inner));
        for iface in implicit {
            best = best.best(self.is_a(pool.class_type(iface), target));
        }
        best
    }

    /// Structural match of `source` against an interface: every public
    /// method and property of the interface must be matched by one of
    /// `source`'s. Success is weak.
    fn duck_relation(&self, source: TypeId, target: TypeId, target_class: IdentityId) -> Relation {
        let pool = self.pool();
        if pool.format_of(target_class) != Some(Format::Interface)
            || pool.core().is_duck_excluded(target_class)
        {
            return Relation::Incompatible;
        }
        let (Some(target_info), Some(source_info)) =
            (self.relation_type_info(target), self.relation_type_info(source))
        else {
            return Relation::Incompatible;
        };

        for (nid, method) in &target_info.methods {
            if !nid.is_top_level()
                || method.is_capped()
                || method.is_function()
                || method.access() != Access::Public
            {
                continue;
            }
            let wanted = pool.resolve_signature_auto_narrowing(method.signature(), Some(source));
            let name = pool.signature(wanted).name;
            let found = source_info.methods_named(pool, name).any(|(_, candidate)| {
                if candidate.is_capped() || candidate.access() != Access::Public {
                    return false;
                }
                let offered = pool.resolve_signature_auto_narrowing(candidate.signature(), Some(source));
                self.is_substitutable_for(offered, wanted, candidate.head().default_params)
            });
            if !found {
                trace!(
                    source = source.0,
                    target = target.0,
                    method = %pool.name_text(name),
                    "duck typing - method missing"
                );
                return Relation::Incompatible;
            }
        }

        for (nid, property) in &target_info.properties {
            if !nid.is_top_level() || property.is_formal() || property.access() != Access::Public {
                continue;
            }
            let matched = source_info.find_property(property.name()).is_some_and(|offered| {
                self.is_a(offered.type_id(), property.type_id()).is_compatible()
            });
            if !matched {
                return Relation::Incompatible;
            }
        }
        Relation::IsAWeak
    }

    /// Whether a method with signature `sub` can stand in for one with
    /// signature `sup`: same name, parameters contravariant (extra trailing
    /// parameters of `sub` must have defaults), returns covariant.
    pub fn is_substitutable_for(&self, sub: SignatureId, sup: SignatureId, sub_default_params: u32) -> bool {
        if sub == sup {
            return true;
        }
        let pool = self.pool();
        let (a, b) = (pool.signature(sub), pool.signature(sup));
        if a.name != b.name {
            return false;
        }
        let (sub_params, sup_params) = (pool.type_list(a.params), pool.type_list(b.params));
        if sub_params.len() < sup_params.len()
            || sub_params.len() > sup_params.len() + sub_default_params as usize
        {
            return false;
        }
        if !sup_params
            .iter()
            .zip(sub_params.iter())
            .all(|(&p, &q)| self.is_a(p, q).is_compatible())
        {
            return false;
        }
        let (sub_returns, sup_returns) = (pool.type_list(a.returns), pool.type_list(b.returns));
        if sub_returns.len() < sup_returns.len() {
            return false;
        }
        sub_returns
            .iter()
            .zip(sup_returns.iter())
            .all(|(&r, &s)| self.is_a(r, s).is_compatible())
    }
}

fn strip_immutable(pool: &crate::ConstantPool, t: TypeId) -> TypeId {
    match pool.type_data(t) {
        TypeData::Immutable(base) => base,
        _ => t,
    }
}

fn strip_access(pool: &crate::ConstantPool, t: TypeId) -> TypeId {
    match pool.type_data(t) {
        TypeData::Access { base, .. } => base,
        _ => t,
    }
}
