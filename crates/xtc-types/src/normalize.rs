//! Typedef resolution and normalization.
//!
//! Every rewrite here is structural: a type is rebuilt bottom-up only where a
//! child changed, so an input without typedefs (or without missing type
//! parameters) comes back as the very same handle.

use crate::pool::ConstantPool;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{IdentityId, PlaceholderId, TerminalType, TypeData, TypeId};
use tracing::trace;

/// What the typedef walk is currently expanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Expansion {
    Typedef(IdentityId),
    Placeholder(PlaceholderId),
}

impl ConstantPool {
    /// Rebuild `t` with `f` applied to each direct child type.
    ///
    /// Terminal types are returned as is; a type whose children are all
    /// unchanged is returned as the same handle.
    pub(crate) fn map_type(&self, t: TypeId, mut f: impl FnMut(TypeId) -> TypeId) -> TypeId {
        match self.type_data(t) {
            TypeData::Terminal(_) | TypeData::Unresolved(_) => t,
            TypeData::Parameterized { base, params } => {
                let new_base = f(base);
                let old_params = self.type_list(params);
                let new_params: Vec<TypeId> = old_params.iter().map(|&p| f(p)).collect();
                if new_base == base && new_params[..] == old_params[..] {
                    return t;
                }
                self.parameterized_type(new_base, new_params)
            }
            TypeData::Annotated { annotation, base } => {
                let (a, b) = (f(annotation), f(base));
                if a == annotation && b == base {
                    return t;
                }
                self.annotated_type(a, b)
            }
            TypeData::Immutable(base) => {
                let b = f(base);
                if b == base { t } else { self.immutable_type(b) }
            }
            TypeData::Access { base, access } => {
                let b = f(base);
                if b == base { t } else { self.access_type(b, access) }
            }
            TypeData::VirtualChild { parent, name } => {
                let p = f(parent);
                if p == parent { t } else { self.virtual_child_type(p, name) }
            }
            TypeData::Intersection(a, b) => {
                let (na, nb) = (f(a), f(b));
                if na == a && nb == b { t } else { self.intersection_type(na, nb) }
            }
            TypeData::Union(a, b) => {
                let (na, nb) = (f(a), f(b));
                if na == a && nb == b { t } else { self.union_type(na, nb) }
            }
            TypeData::Difference(a, b) => {
                let (na, nb) = (f(a), f(b));
                if na == a && nb == b { t } else { self.difference_type(na, nb) }
            }
        }
    }

    /// Replace every typedef reference (and every bound placeholder) with
    /// what it stands for. Idempotent; a cyclical typedef is left in place.
    pub fn resolve_typedefs(&self, t: TypeId) -> TypeId {
        let mut guard = RecursionGuard::with_profile(RecursionProfile::TypedefResolution);
        let mut cycle = None;
        self.resolve_typedefs_in(t, &mut guard, &mut cycle)
    }

    /// The first typedef found to be cyclical while resolving `t`.
    pub fn typedef_cycle(&self, t: TypeId) -> Option<IdentityId> {
        let mut guard = RecursionGuard::with_profile(RecursionProfile::TypedefResolution);
        let mut cycle = None;
        self.resolve_typedefs_in(t, &mut guard, &mut cycle);
        cycle
    }

    fn resolve_typedefs_in(
        &self,
        t: TypeId,
        guard: &mut RecursionGuard<Expansion>,
        cycle: &mut Option<IdentityId>,
    ) -> TypeId {
        let (key, target) = match self.type_data(t) {
            TypeData::Terminal(TerminalType::Typedef(id)) => (Expansion::Typedef(id), self.typedef_target(id)),
            TypeData::Unresolved(ph) => (Expansion::Placeholder(ph), self.placeholder_target(ph)),
            TypeData::Terminal(_) => return t,
            _ => return self.map_type(t, |child| self.resolve_typedefs_in(child, guard, cycle)),
        };
        let Some(target) = target else {
            return t;
        };
        match guard.enter(key) {
            RecursionResult::Entered => {
                let resolved = self.resolve_typedefs_in(target, guard, cycle);
                guard.leave(key);
                resolved
            }
            _ => {
                if let (Expansion::Typedef(id), None) = (key, *cycle) {
                    trace!(typedef = id.0, "resolve_typedefs - cyclical typedef left in place");
                    *cycle = Some(id);
                }
                t
            }
        }
    }

    /// Structural equality after typedef resolution.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        a == b || self.resolve_typedefs(a) == self.resolve_typedefs(b)
    }

    /// The class parameterized by its own formal properties (`Map<Key, Value>`
    /// for `Map`). A class without type parameters answers its plain type.
    pub fn formal_type(&self, class: IdentityId) -> TypeId {
        let base = self.class_type(class);
        let Some(structure) = self.structure(class) else {
            return base;
        };
        let params = structure
            .type_params
            .iter()
            .map(|p| self.formal_property_type(self.property_identity_atom(class, p.name)))
            .collect();
        self.parameterized_type(base, params)
    }

    /// Canonical form used as the TypeInfo cache key: typedefs resolved,
    /// auto-narrowing replaced by the declaring class, and missing type
    /// parameters filled with their constraints.
    pub fn normalize(&self, t: TypeId) -> TypeId {
        let resolved = self.resolve_typedefs(t);
        let narrowed = self.resolve_auto_narrowing(resolved, false, None);
        self.fill_type_params(narrowed)
    }

    fn fill_type_params(&self, t: TypeId) -> TypeId {
        match self.type_data(t) {
            TypeData::Terminal(TerminalType::Class(class)) => self.complete_params(t, class, &[]),
            TypeData::Parameterized { base, params } => {
                let params = self.type_list(params);
                match self.type_data(base) {
                    TypeData::Terminal(TerminalType::Class(class)) => {
                        self.complete_params(t, class, &params)
                    }
                    _ => t,
                }
            }
            TypeData::Immutable(_) | TypeData::Access { .. } | TypeData::Annotated { .. } => {
                self.map_type(t, |child| self.fill_type_params(child))
            }
            _ => t,
        }
    }

    fn complete_params(&self, t: TypeId, class: IdentityId, actual: &[TypeId]) -> TypeId {
        let Some(structure) = self.structure(class) else {
            return t;
        };
        if actual.len() >= structure.type_params.len() {
            return t;
        }
        let mut params = actual.to_vec();
        params.extend(structure.type_params[actual.len()..].iter().map(|p| p.constraint));
        self.parameterized_type(self.class_type(class), params)
    }
}

#[cfg(test)]
#[path = "../tests/normalize_tests.rs"]
mod tests;
