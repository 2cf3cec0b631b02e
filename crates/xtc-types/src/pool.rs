//! The constant pool.
//!
//! The pool is the only owner of identities, type constants, type lists and
//! signatures. Interning is structural: registering a constant equal to one
//! already present returns the existing handle, and a handle's raw value is
//! the constant's stable position.
//!
//! The pool also holds the declarations the engine reads (class structures
//! and typedef targets) and the invalidation log that lets derived caches
//! decide whether a redefinition affects them.

use crate::bootstrap::{self, CoreTypes};
use crate::identity::IdentityData;
use crate::structure::ClassStructure;
use crate::types::{
    IdentityId, PlaceholderId, SignatureData, SignatureId, TypeData, TypeId, TypeListId,
};
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, trace};
use xtc_common::interner::{Atom, ShardedInterner};

// =============================================================================
// Interning tables
// =============================================================================

struct ValueTable<T> {
    items: Vec<T>,
    map: FxHashMap<T, u32>,
}

impl<T> ValueTable<T>
where
    T: Eq + Hash + Copy,
{
    fn new() -> Self {
        ValueTable {
            items: Vec::new(),
            map: FxHashMap::default(),
        }
    }

    fn intern(&mut self, value: T) -> u32 {
        if let Some(&id) = self.map.get(&value) {
            return id;
        }
        let id = self.items.len() as u32;
        self.items.push(value);
        self.map.insert(value, id);
        id
    }

    fn find(&self, value: &T) -> Option<u32> {
        self.map.get(value).copied()
    }

    fn get(&self, id: u32) -> Option<T> {
        self.items.get(id as usize).copied()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

struct SliceInterner<T> {
    items: Vec<Arc<[T]>>,
    map: FxHashMap<Arc<[T]>, u32>,
}

impl<T> SliceInterner<T>
where
    T: Eq + Hash,
{
    fn new() -> Self {
        let empty: Arc<[T]> = Arc::from(Vec::new());
        let mut map = FxHashMap::default();
        map.insert(empty.clone(), 0);
        SliceInterner {
            items: vec![empty],
            map,
        }
    }

    fn intern(&mut self, items: Vec<T>) -> u32 {
        if items.is_empty() {
            return 0;
        }
        if let Some(&id) = self.map.get(items.as_slice()) {
            return id;
        }
        let arc: Arc<[T]> = items.into();
        let id = self.items.len() as u32;
        self.items.push(arc.clone());
        self.map.insert(arc, id);
        id
    }

    fn get(&self, id: u32) -> Option<Arc<[T]>> {
        self.items.get(id as usize).cloned()
    }

    fn empty(&self) -> Arc<[T]> {
        self.items[0].clone()
    }
}

/// A front-end name waiting for resolution.
struct PlaceholderSlot {
    name: Arc<str>,
    target: OnceLock<TypeId>,
}

/// Error raised by the name-resolution pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// A placeholder already resolved to a different type.
    Conflict {
        placeholder: PlaceholderId,
        existing: TypeId,
        requested: TypeId,
    },
    UnknownPlaceholder(PlaceholderId),
    /// A name that no scope could resolve.
    UnknownName(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Conflict {
                placeholder,
                existing,
                requested,
            } => write!(
                f,
                "placeholder #{} already resolved to type #{}, cannot resolve to #{}",
                placeholder.0, existing.0, requested.0
            ),
            ResolveError::UnknownPlaceholder(p) => write!(f, "unknown placeholder #{}", p.0),
            ResolveError::UnknownName(name) => write!(f, "unresolvable name \"{name}\""),
        }
    }
}

impl std::error::Error for ResolveError {}

// =============================================================================
// ConstantPool
// =============================================================================

/// Structural interner and declaration store for one module set.
///
/// Thread-safe: every table is behind its own lock, and invalidation is
/// published through an atomic counter with release/acquire ordering.
pub struct ConstantPool {
    names: ShardedInterner,
    identities: RwLock<ValueTable<IdentityData>>,
    types: RwLock<ValueTable<TypeData>>,
    type_lists: RwLock<SliceInterner<TypeId>>,
    signatures: RwLock<ValueTable<SignatureData>>,
    placeholders: RwLock<Vec<Arc<PlaceholderSlot>>>,
    structures: DashMap<IdentityId, Arc<ClassStructure>>,
    typedefs: DashMap<IdentityId, TypeId>,
    invalidation_count: AtomicU64,
    invalidation_log: RwLock<Vec<IdentityId>>,
    core: CoreTypes,
}

impl ConstantPool {
    /// Create a pool with the core module (`ecstasy`) already installed.
    pub fn new() -> Self {
        let names = ShardedInterner::new();
        names.intern_common();
        let mut pool = ConstantPool {
            names,
            identities: RwLock::new(ValueTable::new()),
            types: RwLock::new(ValueTable::new()),
            type_lists: RwLock::new(SliceInterner::new()),
            signatures: RwLock::new(ValueTable::new()),
            placeholders: RwLock::new(Vec::new()),
            structures: DashMap::new(),
            typedefs: DashMap::new(),
            invalidation_count: AtomicU64::new(0),
            invalidation_log: RwLock::new(Vec::new()),
            core: CoreTypes::default(),
        };
        pool.core = bootstrap::install(&pool);
        // bootstrap registrations are not redefinitions
        pool.invalidation_count.store(0, Ordering::Release);
        pool.invalidation_log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!(
            identities = pool.identity_count(),
            types = pool.type_count(),
            "ConstantPool::new - core module installed"
        );
        pool
    }

    /// Handles of the core module's classes and types.
    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    // -------------------------------------------------------------------------
    // Names
    // -------------------------------------------------------------------------

    pub fn intern_name(&self, name: &str) -> Atom {
        self.names.intern(name)
    }

    pub fn name_text(&self, name: Atom) -> Arc<str> {
        self.names.resolve(name)
    }

    // -------------------------------------------------------------------------
    // Identities
    // -------------------------------------------------------------------------

    pub(crate) fn intern_identity(&self, data: IdentityData) -> IdentityId {
        {
            let table = self.identities.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(id) = table.find(&data) {
                return IdentityId(id);
            }
        }
        let mut table = self.identities.write().unwrap_or_else(PoisonError::into_inner);
        IdentityId(table.intern(data))
    }

    /// The handle of an identity, if it was ever registered.
    pub fn lookup_identity(&self, data: IdentityData) -> Option<IdentityId> {
        let table = self.identities.read().unwrap_or_else(PoisonError::into_inner);
        table.find(&data).map(IdentityId)
    }

    /// # Panics
    ///
    /// Panics on a handle this pool never issued.
    pub fn identity(&self, id: IdentityId) -> IdentityData {
        let table = self.identities.read().unwrap_or_else(PoisonError::into_inner);
        match table.get(id.0) {
            Some(data) => data,
            None => panic!("identity #{} is not registered in this pool", id.0),
        }
    }

    pub fn identity_count(&self) -> usize {
        self.identities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    /// Intern a type constant.
    pub fn intern_type(&self, data: TypeData) -> TypeId {
        {
            let table = self.types.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(id) = table.find(&data) {
                return TypeId(id);
            }
        }
        let mut table = self.types.write().unwrap_or_else(PoisonError::into_inner);
        let id = TypeId(table.intern(data));
        trace!(type_id = id.0, ?data, "ConstantPool::intern_type");
        id
    }

    /// # Panics
    ///
    /// Panics on a handle this pool never issued.
    pub fn type_data(&self, id: TypeId) -> TypeData {
        let table = self.types.read().unwrap_or_else(PoisonError::into_inner);
        match table.get(id.0) {
            Some(data) => data,
            None => panic!("type #{} is not registered in this pool", id.0),
        }
    }

    pub fn type_count(&self) -> usize {
        self.types.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Stable position of a type constant.
    pub fn position(&self, id: TypeId) -> u32 {
        id.0
    }

    pub fn intern_type_list(&self, types: Vec<TypeId>) -> TypeListId {
        let mut lists = self.type_lists.write().unwrap_or_else(PoisonError::into_inner);
        TypeListId(lists.intern(types))
    }

    pub fn type_list(&self, id: TypeListId) -> Arc<[TypeId]> {
        let lists = self.type_lists.read().unwrap_or_else(PoisonError::into_inner);
        lists.get(id.0).unwrap_or_else(|| lists.empty())
    }

    // -------------------------------------------------------------------------
    // Signatures
    // -------------------------------------------------------------------------

    pub fn intern_signature(&self, data: SignatureData) -> SignatureId {
        let mut table = self.signatures.write().unwrap_or_else(PoisonError::into_inner);
        SignatureId(table.intern(data))
    }

    /// Intern a signature from its parts.
    pub fn make_signature(&self, name: &str, params: Vec<TypeId>, returns: Vec<TypeId>) -> SignatureId {
        let data = SignatureData {
            name: self.intern_name(name),
            params: self.intern_type_list(params),
            returns: self.intern_type_list(returns),
        };
        self.intern_signature(data)
    }

    /// # Panics
    ///
    /// Panics on a handle this pool never issued.
    pub fn signature(&self, id: SignatureId) -> SignatureData {
        let table = self.signatures.read().unwrap_or_else(PoisonError::into_inner);
        match table.get(id.0) {
            Some(data) => data,
            None => panic!("signature #{} is not registered in this pool", id.0),
        }
    }

    // -------------------------------------------------------------------------
    // Placeholders
    // -------------------------------------------------------------------------

    /// Create an unresolved type standing for `name`.
    pub fn unresolved_type(&self, name: &str) -> (PlaceholderId, TypeId) {
        let id = {
            let mut slots = self.placeholders.write().unwrap_or_else(PoisonError::into_inner);
            let id = PlaceholderId(slots.len() as u32);
            slots.push(Arc::new(PlaceholderSlot {
                name: Arc::from(name),
                target: OnceLock::new(),
            }));
            id
        };
        (id, self.intern_type(TypeData::Unresolved(id)))
    }

    fn placeholder_slot(&self, id: PlaceholderId) -> Option<Arc<PlaceholderSlot>> {
        let slots = self.placeholders.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(id.0 as usize).cloned()
    }

    /// Bind a placeholder to its resolved type.
    ///
    /// Binding again to the same type is a no-op; binding to a different one
    /// is an error and leaves the first binding in place.
    pub fn resolve_placeholder(&self, id: PlaceholderId, target: TypeId) -> Result<(), ResolveError> {
        let slot = self
            .placeholder_slot(id)
            .ok_or(ResolveError::UnknownPlaceholder(id))?;
        let bound = *slot.target.get_or_init(|| target);
        if bound != target {
            return Err(ResolveError::Conflict {
                placeholder: id,
                existing: bound,
                requested: target,
            });
        }
        trace!(placeholder = id.0, target = target.0, "placeholder resolved");
        Ok(())
    }

    pub fn placeholder_target(&self, id: PlaceholderId) -> Option<TypeId> {
        self.placeholder_slot(id)
            .and_then(|slot| slot.target.get().copied())
    }

    pub fn placeholder_name(&self, id: PlaceholderId) -> Arc<str> {
        self.placeholder_slot(id)
            .map(|slot| slot.name.clone())
            .unwrap_or_else(|| Arc::from("?"))
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    /// Register (or redefine) the structure of a class.
    ///
    /// A redefinition invalidates every derived cache that depends on it.
    pub fn register_class(&self, structure: ClassStructure) -> IdentityId {
        let identity = structure.identity;
        let previous = self.structures.insert(identity, Arc::new(structure));
        if previous.is_some() {
            self.invalidate_type_infos(identity);
        }
        identity
    }

    pub fn structure(&self, identity: IdentityId) -> Option<Arc<ClassStructure>> {
        self.structures.get(&identity).map(|entry| entry.value().clone())
    }

    /// Identities of every registered class structure, in no particular order.
    pub fn registered_classes(&self) -> Vec<IdentityId> {
        self.structures.iter().map(|entry| *entry.key()).collect()
    }

    /// Register (or redefine) a typedef target.
    pub fn register_typedef(&self, identity: IdentityId, target: TypeId) {
        let previous = self.typedefs.insert(identity, target);
        if previous.is_some_and(|old| old != target) {
            self.invalidate_type_infos(identity);
        }
    }

    pub fn typedef_target(&self, identity: IdentityId) -> Option<TypeId> {
        self.typedefs.get(&identity).map(|entry| *entry.value())
    }

    // -------------------------------------------------------------------------
    // Invalidation
    // -------------------------------------------------------------------------

    /// Current invalidation count.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidation_count.load(Ordering::Acquire)
    }

    /// Record that the declaration `identity` changed.
    pub fn invalidate_type_infos(&self, identity: IdentityId) {
        let mut log = self
            .invalidation_log
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        log.push(identity);
        let count = log.len() as u64;
        self.invalidation_count.store(count, Ordering::Release);
        debug!(identity = identity.0, count, "invalidate_type_infos");
    }

    /// Identities invalidated after the count was `since`.
    pub fn invalidated_since(&self, since: u64) -> Vec<IdentityId> {
        let log = self
            .invalidation_log
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        log.get(since as usize..).map(<[_]>::to_vec).unwrap_or_default()
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantPool")
            .field("identities", &self.identity_count())
            .field("types", &self.type_count())
            .field("structures", &self.structures.len())
            .field("invalidation_count", &self.invalidation_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/pool_tests.rs"]
mod tests;
