//! Subtype relation and formal-type usage.
//!
//! Both are memoized per [`ResolutionContext`](crate::ResolutionContext) in
//! `DashMap` side tables whose in-progress sentinel is its own variant,
//! tagged with the thread that placed it.

pub mod isa;
pub mod usage;

use std::thread::ThreadId;

/// Outcome of `is_a`.
///
/// Ordered from worst to best so `min`/`max` combine results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Incompatible,
    /// Assignable, but not type-safe in every direction (duck typing, or a
    /// differing actual type for a formal the class consumes).
    IsAWeak,
    IsA,
}

impl Relation {
    /// The weaker of two relations (both must hold).
    #[inline]
    pub fn worse(self, other: Relation) -> Relation {
        self.min(other)
    }

    /// The stronger of two relations (either may hold).
    #[inline]
    pub fn best(self, other: Relation) -> Relation {
        self.max(other)
    }

    #[inline]
    pub fn is_compatible(self) -> bool {
        self != Relation::Incompatible
    }

    pub fn name(self) -> &'static str {
        match self {
            Relation::Incompatible => "incompatible",
            Relation::IsAWeak => "is_a_weak",
            Relation::IsA => "is_a",
        }
    }
}

/// Relation cache slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RelationState {
    InProgress(ThreadId),
    /// Computed against the pool's invalidation count `count`.
    Done { relation: Relation, count: u64 },
}

#[cfg(test)]
#[path = "../../tests/relation_tests.rs"]
mod tests;
