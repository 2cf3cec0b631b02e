//! Formal-type usage: does a class consume or produce values of one of its
//! type parameters?
//!
//! A class *produces* `T` when values of type `T` flow out of it (return
//! values, readable properties) and *consumes* `T` when they flow in (method
//! parameters, settable properties). Nested parameterized types carry the
//! polarity of the class they parameterize; `Function` flips it for its
//! parameter types.

use crate::context::ResolutionContext;
use crate::identity::IdentityKind;
use crate::structure::{Composition, MethodFlags, PropertyFlags};
use crate::types::{Access, IdentityId, TerminalType, TypeData, TypeId};
use dashmap::mapref::entry::Entry;
use std::thread::{self, ThreadId};
use tracing::trace;
use xtc_common::interner::Atom;
use xtc_common::limits::MAX_USAGE_DEPTH;

/// `(class type, formal name, produces)`.
pub(crate) type UsageKey = (TypeId, Atom, bool);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UsageState {
    InProgress(ThreadId),
    Done(bool),
}

impl ResolutionContext<'_> {
    /// True if the class of `t` accepts values of its formal type `name`.
    pub fn consumes_formal_type(&self, t: TypeId, name: Atom) -> bool {
        self.formal_usage(t, name, false)
    }

    /// True if the class of `t` hands out values of its formal type `name`.
    pub fn produces_formal_type(&self, t: TypeId, name: Atom) -> bool {
        self.formal_usage(t, name, true)
    }

    fn formal_usage(&self, t: TypeId, name: Atom, produces: bool) -> bool {
        let pool = self.pool();
        let Some(class) = pool.class_of(pool.resolve_typedefs(t)) else {
            return false;
        };
        let key = (pool.class_type(class), name, produces);
        if let Some(UsageState::Done(cached)) = self.usages.get(&key).map(|e| *e.value()) {
            return cached;
        }

        // A usage question that loops back onto itself answers "no"; the
        // loop cannot add a use the rest of the class doesn't already show.
        let entered = self.with_thread_state(|s| {
            if s.usage_visiting.contains(&key) {
                s.usage_cycles.insert(key);
                return false;
            }
            if s.usage_visiting.len() >= MAX_USAGE_DEPTH as usize {
                return false;
            }
            s.usage_visiting.insert(key);
            true
        });
        if !entered {
            trace!(class = class.0, produces, "formal_usage - cycle");
            return false;
        }

        let me = thread::current().id();
        let owner = match self.usages.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(UsageState::InProgress(me));
                true
            }
            Entry::Occupied(entry) => {
                let state = *entry.get();
                drop(entry);
                match state {
                    UsageState::Done(cached) => {
                        self.with_thread_state(|s| s.usage_visiting.remove(&key));
                        return cached;
                    }
                    // another thread computes it too; ours is not cached
                    UsageState::InProgress(_) => false,
                }
            }
        };

        let result = self.compute_usage(class, name, produces);

        let cacheable = self.with_thread_state(|s| {
            s.usage_visiting.remove(&key);
            s.usage_cycles.remove(&key);
            s.usage_cycles.is_empty()
        });
        if owner {
            if cacheable {
                self.usages.insert(key, UsageState::Done(result));
            } else {
                self.usages
                    .remove_if(&key, |_, state| *state == UsageState::InProgress(me));
            }
        }
        result
    }

    fn compute_usage(&self, class: IdentityId, name: Atom, produces: bool) -> bool {
        let pool = self.pool();
        let Some(structure) = pool.structure(class) else {
            return false;
        };
        if structure.type_param(name).is_none() {
            return false;
        }
        let formal = pool.property_identity_atom(class, name);

        for method in &structure.methods {
            if method.access == Access::Private
                || method.flags.intersects(MethodFlags::FUNCTION | MethodFlags::CONSTRUCTOR)
            {
                continue;
            }
            let signature = pool.signature(method.signature);
            // parameters flow in, returns flow out
            if pool
                .type_list(signature.params)
                .iter()
                .any(|&p| self.occurs(p, formal, !produces, 0))
            {
                return true;
            }
            if pool
                .type_list(signature.returns)
                .iter()
                .any(|&r| self.occurs(r, formal, produces, 0))
            {
                return true;
            }
        }

        for property in &structure.properties {
            if property.access == Access::Private || property.flags.contains(PropertyFlags::CONSTANT) {
                continue;
            }
            let used = if property.is_read_only() {
                self.occurs(property.type_id, formal, produces, 0)
            } else {
                self.occurs(property.type_id, formal, true, 0)
                    || self.occurs(property.type_id, formal, false, 0)
            };
            if used {
                return true;
            }
        }

        structure.contributions.iter().any(|contribution| {
            !matches!(
                contribution.composition,
                Composition::Into | Composition::Equal | Composition::RebasesOnto
            ) && self.occurs(contribution.type_id, formal, produces, 0)
        })
    }

    /// True if the formal property `formal` occurs in `t` with the given
    /// polarity (`positive` is the orientation of `t` itself).
    fn occurs(&self, t: TypeId, formal: IdentityId, positive: bool, depth: u32) -> bool {
        let pool = self.pool();
        if depth > MAX_USAGE_DEPTH {
            return false;
        }
        match pool.type_data(t) {
            TypeData::Terminal(TerminalType::FormalProperty(id)) => id == formal && positive,
            TypeData::Terminal(TerminalType::FormalChild(id)) => {
                self.formal_root(id) == Some(formal) && positive
            }
            TypeData::Terminal(_) => false,
            TypeData::Unresolved(ph) => pool
                .placeholder_target(ph)
                .is_some_and(|target| self.occurs(target, formal, positive, depth + 1)),
            TypeData::Parameterized { base, params } => {
                let params = pool.type_list(params);
                let core = pool.core();
                match pool.terminal_class(base) {
                    Some(class) if class == core.function => params.iter().enumerate().any(|(i, &p)| {
                        // ParamTypes are contravariant
                        let polarity = if i == 0 { !positive } else { positive };
                        self.occurs(p, formal, polarity, depth + 1)
                    }),
                    Some(class) if class == core.tuple => params
                        .iter()
                        .any(|&p| self.occurs(p, formal, positive, depth + 1)),
                    Some(class) => {
                        let Some(structure) = pool.structure(class) else {
                            return false;
                        };
                        params.iter().zip(structure.type_params.iter()).any(|(&p, decl)| {
                            (self.produces_formal_type(base, decl.name)
                                && self.occurs(p, formal, positive, depth + 1))
                                || (self.consumes_formal_type(base, decl.name)
                                    && self.occurs(p, formal, !positive, depth + 1))
                        })
                    }
                    None => false,
                }
            }
            TypeData::Annotated { annotation, base } => {
                self.occurs(annotation, formal, positive, depth + 1)
                    || self.occurs(base, formal, positive, depth + 1)
            }
            TypeData::Immutable(base) | TypeData::Access { base, .. } => {
                self.occurs(base, formal, positive, depth + 1)
            }
            TypeData::VirtualChild { parent, .. } => self.occurs(parent, formal, positive, depth + 1),
            TypeData::Intersection(a, b) | TypeData::Union(a, b) | TypeData::Difference(a, b) => {
                self.occurs(a, formal, positive, depth + 1) || self.occurs(b, formal, positive, depth + 1)
            }
        }
    }

    /// The formal property a formal child (`Element.Key`) hangs off.
    fn formal_root(&self, child: IdentityId) -> Option<IdentityId> {
        let pool = self.pool();
        let mut current = pool.parent(child)?;
        loop {
            match pool.identity_kind(current) {
                IdentityKind::Property => return Some(current),
                IdentityKind::FormalTypeChild => current = pool.parent(current)?,
                _ => return None,
            }
        }
    }
}
