//! TypeInfo: the flattened, immutable answer to "what can a value of this
//! type do".
//!
//! Member maps are keyed by [`NestedIdentity`], so a member declared on a
//! base class and its redeclaration on a subclass share one slot whose
//! chain lists every body from most derived to least derived.

use crate::identity::{NestedIdentity, Segment};
use crate::structure::{Composition, Format, Implementation, MethodFlags, PropertyFlags};
use crate::types::{Access, IdentityId, SignatureId, TypeId};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use xtc_common::interner::Atom;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Progress {
    /// Built while some dependency was still being built; only valid as an
    /// internal intermediate result.
    Incomplete,
    Complete,
}

/// Where a chain entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Origin {
    /// On the extends path (part of the implementation hierarchy).
    pub anchored: bool,
    pub composition: Composition,
    /// The contributed type that brought the entry in.
    pub contributor: TypeId,
}

/// One resolved type parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: Atom,
    pub constraint: TypeId,
    pub actual: TypeId,
    /// No actual type was supplied; `actual` is the constraint.
    pub formal: bool,
}

// =============================================================================
// Methods
// =============================================================================

/// One body in a method chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodBody {
    /// The declared method constant.
    pub identity: IdentityId,
    /// The class whose structure declared the body.
    pub origin: IdentityId,
    /// Signature with type parameters resolved for this TypeInfo.
    pub signature: SignatureId,
    pub implementation: Implementation,
    pub access: Access,
    pub flags: MethodFlags,
    pub default_params: u32,
    pub op: Option<Atom>,
    /// The property calls are forwarded to, for `Delegating` bodies.
    pub delegate: Option<Atom>,
    /// The narrowing method a `Capped` body redirects to.
    pub narrowed_to: Option<NestedIdentity>,
}

impl MethodBody {
    pub fn is_function(&self) -> bool {
        self.flags.contains(MethodFlags::FUNCTION)
    }

    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::CONSTRUCTOR)
    }
}

/// A method's chain of bodies, head (most derived) first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodInfo {
    /// The signature this chain answers to (its map key).
    signature: SignatureId,
    bodies: Vec<MethodBody>,
}

impl MethodInfo {
    pub fn new(body: MethodBody) -> Self {
        Self {
            signature: body.signature,
            bodies: vec![body],
        }
    }

    pub(crate) fn from_bodies(signature: SignatureId, bodies: Vec<MethodBody>) -> Option<Self> {
        if bodies.is_empty() {
            None
        } else {
            Some(Self { signature, bodies })
        }
    }

    pub fn bodies(&self) -> &[MethodBody] {
        &self.bodies
    }

    pub fn head(&self) -> &MethodBody {
        &self.bodies[0]
    }

    pub fn signature(&self) -> SignatureId {
        self.signature
    }

    pub fn identity(&self) -> IdentityId {
        self.head().identity
    }

    pub fn access(&self) -> Access {
        self.head().access
    }

    pub fn is_function(&self) -> bool {
        self.head().is_function()
    }

    /// Layer this chain on top of `base`: own bodies first, then the base's
    /// bodies that are not already present. Concrete bodies stay ahead of
    /// default bodies, which stay ahead of bodies without code. A cap on the
    /// base is dropped: the new head re-opens the chain.
    pub fn layer_on(&self, base: &MethodInfo) -> MethodInfo {
        let mut bodies = self.bodies.clone();
        for body in &base.bodies {
            if body.implementation == Implementation::Capped {
                continue;
            }
            if !bodies
                .iter()
                .any(|b| b.identity == body.identity && b.implementation == body.implementation)
            {
                bodies.push(body.clone());
            }
        }
        bodies.sort_by_key(|b| b.implementation.chain_rank());
        MethodInfo {
            signature: self.signature,
            bodies,
        }
    }

    /// Freeze this chain: calls through its signature are redirected to the
    /// narrowing method at `narrowed_to`.
    pub fn cap_with(&self, narrowed_to: NestedIdentity, narrowing: &MethodBody) -> MethodInfo {
        let head = self.head();
        let cap = MethodBody {
            identity: narrowing.identity,
            origin: narrowing.origin,
            signature: self.signature,
            implementation: Implementation::Capped,
            access: head.access,
            flags: head.flags,
            default_params: head.default_params,
            op: head.op,
            delegate: None,
            narrowed_to: Some(narrowed_to),
        };
        let mut bodies = Vec::with_capacity(self.bodies.len() + 1);
        bodies.push(cap);
        bodies.extend(
            self.bodies
                .iter()
                .filter(|b| b.implementation != Implementation::Capped)
                .cloned(),
        );
        MethodInfo {
            signature: self.signature,
            bodies,
        }
    }

    /// The chain with its cap removed; `None` if nothing is left.
    pub(crate) fn without_cap(&self) -> Option<MethodInfo> {
        let bodies: Vec<MethodBody> = self
            .bodies
            .iter()
            .filter(|b| b.implementation != Implementation::Capped)
            .cloned()
            .collect();
        Self::from_bodies(self.signature, bodies)
    }

    pub fn is_capped(&self) -> bool {
        self.head().implementation == Implementation::Capped
    }

    pub fn capped_target(&self) -> Option<&NestedIdentity> {
        if self.is_capped() {
            self.head().narrowed_to.as_ref()
        } else {
            None
        }
    }

    /// Only the bodies declared by one of `origins`; `None` if nothing is left.
    pub fn retain_only(&self, origins: &FxHashSet<IdentityId>) -> Option<MethodInfo> {
        let bodies: Vec<MethodBody> = self
            .bodies
            .iter()
            .filter(|b| origins.contains(&b.origin))
            .cloned()
            .collect();
        Self::from_bodies(self.signature, bodies)
    }

    /// True if some body carries code.
    pub fn has_implementation(&self) -> bool {
        self.bodies.iter().any(|b| b.implementation.has_code())
    }
}

// =============================================================================
// Properties
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyBody {
    pub identity: IdentityId,
    pub origin: IdentityId,
    pub name: Atom,
    pub type_id: TypeId,
    pub access: Access,
    pub flags: PropertyFlags,
    /// A synthesized type-parameter property (`Type<actual>`).
    pub formal: bool,
}

/// A property's chain of declarations, head (most derived) first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    bodies: Vec<PropertyBody>,
    /// Exploded `Ref`/`Var` chain, bottom to top: the `Ref<T>`/`Var<T>`
    /// base, then each annotation mixin.
    ref_layers: Vec<TypeId>,
}

impl PropertyInfo {
    pub fn new(body: PropertyBody) -> Self {
        Self {
            bodies: vec![body],
            ref_layers: Vec::new(),
        }
    }

    pub(crate) fn with_ref_layers(mut self, layers: Vec<TypeId>) -> Self {
        self.ref_layers = layers;
        self
    }

    pub fn bodies(&self) -> &[PropertyBody] {
        &self.bodies
    }

    pub fn head(&self) -> &PropertyBody {
        &self.bodies[0]
    }

    pub fn name(&self) -> Atom {
        self.head().name
    }

    pub fn type_id(&self) -> TypeId {
        self.head().type_id
    }

    pub fn access(&self) -> Access {
        self.head().access
    }

    pub fn identity(&self) -> IdentityId {
        self.head().identity
    }

    /// The declaration at the bottom of the chain.
    pub fn declaring_identity(&self) -> IdentityId {
        self.bodies[self.bodies.len() - 1].identity
    }

    pub fn ref_layers(&self) -> &[TypeId] {
        &self.ref_layers
    }

    pub fn is_exploded(&self) -> bool {
        !self.ref_layers.is_empty()
    }

    pub fn is_formal(&self) -> bool {
        self.head().formal
    }

    pub fn has_field(&self) -> bool {
        self.bodies.iter().any(|b| b.flags.contains(PropertyFlags::FIELD))
    }

    pub fn is_constant(&self) -> bool {
        self.head().flags.contains(PropertyFlags::CONSTANT)
    }

    pub fn is_read_only(&self) -> bool {
        self.head().flags.contains(PropertyFlags::READ_ONLY)
    }

    pub fn layer_on(&self, base: &PropertyInfo) -> PropertyInfo {
        let mut bodies = self.bodies.clone();
        for body in &base.bodies {
            if !bodies.iter().any(|b| b.identity == body.identity) {
                bodies.push(body.clone());
            }
        }
        let ref_layers = if self.ref_layers.is_empty() {
            base.ref_layers.clone()
        } else {
            self.ref_layers.clone()
        };
        PropertyInfo { bodies, ref_layers }
    }

    pub fn retain_only(&self, origins: &FxHashSet<IdentityId>) -> Option<PropertyInfo> {
        let bodies: Vec<PropertyBody> = self
            .bodies
            .iter()
            .filter(|b| origins.contains(&b.origin))
            .cloned()
            .collect();
        if bodies.is_empty() {
            return None;
        }
        Some(PropertyInfo {
            bodies,
            ref_layers: self.ref_layers.clone(),
        })
    }
}

// =============================================================================
// TypeInfo
// =============================================================================

#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub type_id: TypeId,
    /// The class a value of this type is an instance of (`Object` for
    /// relational types).
    pub class_identity: IdentityId,
    pub format: Format,
    pub access: Access,
    pub immutable: bool,
    pub type_params: IndexMap<Atom, ParamInfo>,
    pub class_chain: IndexMap<IdentityId, Origin>,
    pub default_chain: IndexMap<IdentityId, Origin>,
    pub properties: IndexMap<NestedIdentity, PropertyInfo>,
    pub methods: IndexMap<NestedIdentity, MethodInfo>,
    pub(crate) property_ids: FxHashMap<IdentityId, NestedIdentity>,
    pub(crate) method_ids: FxHashMap<IdentityId, NestedIdentity>,
    /// Declarations whose redefinition invalidates this snapshot.
    pub dependencies: FxHashSet<IdentityId>,
    pub progress: Progress,
    pub invalidation_count: u64,
}

impl TypeInfo {
    pub(crate) fn empty(type_id: TypeId, class_identity: IdentityId, format: Format) -> Self {
        Self {
            type_id,
            class_identity,
            format,
            access: Access::Public,
            immutable: false,
            type_params: IndexMap::new(),
            class_chain: IndexMap::new(),
            default_chain: IndexMap::new(),
            properties: IndexMap::new(),
            methods: IndexMap::new(),
            property_ids: FxHashMap::default(),
            method_ids: FxHashMap::default(),
            dependencies: FxHashSet::default(),
            progress: Progress::Complete,
            invalidation_count: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress == Progress::Complete
    }

    /// Rebuild the identity indexes from the member maps.
    pub(crate) fn reindex(&mut self) {
        self.property_ids.clear();
        self.method_ids.clear();
        for (nid, prop) in &self.properties {
            for body in prop.bodies() {
                self.property_ids.entry(body.identity).or_insert_with(|| nid.clone());
            }
        }
        for (nid, method) in &self.methods {
            for body in method.bodies() {
                if body.implementation != Implementation::Capped {
                    self.method_ids.entry(body.identity).or_insert_with(|| nid.clone());
                }
            }
        }
    }

    /// Identities of every class on either chain.
    pub fn chain_identities(&self) -> FxHashSet<IdentityId> {
        self.class_chain
            .keys()
            .chain(self.default_chain.keys())
            .copied()
            .collect()
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Exact lookup of a top-level method.
    pub fn find_method_by_signature(&self, signature: SignatureId) -> Option<&MethodInfo> {
        self.methods.get(&NestedIdentity::method(signature))
    }

    /// Lookup that follows caps to the method that narrowed the signature.
    pub fn get_method_by_signature(&self, signature: SignatureId) -> Option<&MethodInfo> {
        let mut method = self.find_method_by_signature(signature)?;
        for _ in 0..xtc_common::limits::MAX_CAP_REDIRECTS {
            match method.capped_target() {
                Some(target) => method = self.methods.get(target)?,
                None => return Some(method),
            }
        }
        None
    }

    pub fn find_method_by_id(&self, identity: IdentityId) -> Option<&MethodInfo> {
        self.method_ids.get(&identity).and_then(|nid| self.methods.get(nid))
    }

    pub fn find_method(&self, nid: &NestedIdentity) -> Option<&MethodInfo> {
        self.methods.get(nid)
    }

    /// Top-level property by name.
    pub fn find_property(&self, name: Atom) -> Option<&PropertyInfo> {
        self.properties.get(&NestedIdentity::property(name))
    }

    pub fn find_property_by_id(&self, identity: IdentityId) -> Option<&PropertyInfo> {
        self.property_ids
            .get(&identity)
            .and_then(|nid| self.properties.get(nid))
    }

    /// Top-level methods whose signature name is `name`, in map order.
    pub fn methods_named<'a>(
        &'a self,
        pool: &'a crate::ConstantPool,
        name: Atom,
    ) -> impl Iterator<Item = (&'a NestedIdentity, &'a MethodInfo)> + 'a {
        self.methods.iter().filter(move |(nid, _)| {
            nid.is_top_level()
                && matches!(nid.last(), Some(Segment::Method(sig)) if pool.signature(sig).name == name)
        })
    }

    /// Methods callable as operator `op` (or by name `name`) with `arity`
    /// parameters.
    pub fn find_op_methods(
        &self,
        pool: &crate::ConstantPool,
        name: Atom,
        op: Option<Atom>,
        arity: usize,
    ) -> Vec<&MethodInfo> {
        self.methods
            .iter()
            .filter(|(nid, method)| {
                if !nid.is_top_level() || method.is_capped() {
                    return false;
                }
                let head = method.head();
                let data = pool.signature(head.signature);
                let named = data.name == name || (op.is_some() && head.op == op);
                named && pool.type_list(data.params).len() == arity
            })
            .map(|(_, method)| method)
            .collect()
    }

    /// Methods nested under a property (its exploded accessors and helpers).
    pub fn property_methods(&self, property: &NestedIdentity) -> Vec<(&NestedIdentity, &MethodInfo)> {
        self.methods
            .iter()
            .filter(|(nid, _)| nid.container().as_ref() == Some(property))
            .collect()
    }

    /// Type parameter actual by name.
    pub fn type_param(&self, name: Atom) -> Option<TypeId> {
        self.type_params.get(&name).map(|p| p.actual)
    }
}
