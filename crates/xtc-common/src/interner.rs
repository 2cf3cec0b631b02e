//! String interner for declaration names.
//!
//! Every name that appears in an identity path, a signature or a type
//! parameter is interned once and passed around as an `Atom` (a `u32`).
//! Name comparisons in the identity graph and in nested-identity cache keys
//! are then integer comparisons.

use rustc_hash::{FxHashMap, FxHasher};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

/// An interned name.
///
/// Atoms are cheap to copy and compare. Use [`ShardedInterner::resolve`] to
/// get the text back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// The empty name.
    pub const NONE: Atom = Atom(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

const SHARD_BITS: u32 = 6;
const SHARD_COUNT: usize = 1 << SHARD_BITS;
const SHARD_MASK: u32 = (SHARD_COUNT as u32) - 1;

/// Names every pool touches during bootstrap and member collection.
const COMMON_NAMES: &[&str] = &[
    // Core module and classes
    "ecstasy",
    "Object",
    "Type",
    "Boolean",
    "Int",
    "String",
    "Ref",
    "Var",
    "Tuple",
    "Function",
    "Orderable",
    "Inner",
    "Outer",
    "Const",
    "Service",
    "Enum",
    "Module",
    "Package",
    // Formal type names of the core classes
    "DataType",
    "Referent",
    "ElementTypes",
    "ParamTypes",
    "ReturnTypes",
    // Accessors and common members
    "get",
    "set",
    "equals",
    "compare",
    "hashCode",
    "toString",
    "construct",
    "value",
];

#[derive(Default)]
struct ShardState {
    map: FxHashMap<Arc<str>, Atom>,
    strings: Vec<Arc<str>>,
}

struct InternerShard {
    state: RwLock<ShardState>,
}

impl InternerShard {
    fn new() -> Self {
        InternerShard {
            state: RwLock::new(ShardState::default()),
        }
    }
}

/// Sharded string interner for concurrent use.
///
/// Fixed buckets keep lock contention low while `resolve` stays O(1).
pub struct ShardedInterner {
    shards: [InternerShard; SHARD_COUNT],
}

impl ShardedInterner {
    /// Create a new interner with the empty string pre-interned as `Atom::NONE`.
    pub fn new() -> Self {
        let shards: [InternerShard; SHARD_COUNT] = std::array::from_fn(|_| InternerShard::new());
        {
            let mut state = shards[0]
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let empty: Arc<str> = Arc::from("");
            state.strings.push(empty.clone());
            state.map.insert(empty, Atom::NONE);
        }
        ShardedInterner { shards }
    }

    /// Intern a string, returning its Atom handle.
    pub fn intern(&self, s: &str) -> Atom {
        if s.is_empty() {
            return Atom::NONE;
        }

        let shard_idx = Self::shard_for(s);
        let shard = &self.shards[shard_idx];
        {
            let state = shard.state.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&atom) = state.map.get(s) {
                return atom;
            }
        }

        let mut state = shard.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&atom) = state.map.get(s) {
            return atom;
        }

        let local_index = state.strings.len() as u32;
        if local_index > (u32::MAX >> SHARD_BITS) {
            return Atom::NONE;
        }

        let atom = Self::make_atom(local_index, shard_idx as u32);
        let owned: Arc<str> = Arc::from(s);
        state.strings.push(owned.clone());
        state.map.insert(owned, atom);
        atom
    }

    /// Resolve an Atom back to its text. Unknown atoms resolve to "".
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        self.try_resolve(atom).unwrap_or_else(|| Arc::from(""))
    }

    pub fn try_resolve(&self, atom: Atom) -> Option<Arc<str>> {
        let (shard_idx, local_index) = Self::split_atom(atom);
        let shard = self.shards.get(shard_idx)?;
        let state = shard.state.read().unwrap_or_else(PoisonError::into_inner);
        state.strings.get(local_index).cloned()
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .state
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .strings
                    .len()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Pre-intern the core names used by every constant pool.
    pub fn intern_common(&self) {
        for s in COMMON_NAMES {
            self.intern(s);
        }
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        (hasher.finish() as usize) & (SHARD_COUNT - 1)
    }

    #[inline]
    fn make_atom(local_index: u32, shard_idx: u32) -> Atom {
        Atom((local_index << SHARD_BITS) | (shard_idx & SHARD_MASK))
    }

    #[inline]
    fn split_atom(atom: Atom) -> (usize, usize) {
        if atom == Atom::NONE {
            return (0, 0);
        }
        let raw = atom.0;
        ((raw & SHARD_MASK) as usize, (raw >> SHARD_BITS) as usize)
    }
}

impl Default for ShardedInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod tests;
