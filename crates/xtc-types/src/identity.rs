//! Identity graph.
//!
//! An identity names a declaration by its path: module, package, class,
//! nested class, property, multi-method, method, method type parameter and
//! formal type child. Identities are interned by the pool and never change.
//!
//! A [`NestedIdentity`] is the part of a member's path below its owning
//! class. TypeInfo maps are keyed by it, so a property declared on a base
//! class and a narrowed redeclaration on a subclass land in the same slot.

use crate::pool::ConstantPool;
use crate::types::{IdentityId, SignatureId};
use smallvec::SmallVec;
use std::fmt::Write as _;
use xtc_common::interner::Atom;

// =============================================================================
// Data
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Module,
    Package,
    Class,
    Typedef,
    Property,
    MultiMethod,
    Method,
    TypeParameter,
    FormalTypeChild,
}

impl IdentityKind {
    /// Kinds that may appear as the parent of a declaration of this kind.
    fn allows_parent(self, parent: IdentityKind) -> bool {
        use IdentityKind::*;
        match self {
            Module => false,
            Package => matches!(parent, Module | Package),
            Class | Typedef | Property | MultiMethod => {
                matches!(parent, Module | Package | Class | Property | Method)
            }
            Method => parent == MultiMethod,
            TypeParameter => parent == Method,
            FormalTypeChild => matches!(parent, Property | TypeParameter | FormalTypeChild),
        }
    }
}

/// Structural content of an identity constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityData {
    Module { name: Atom },
    Package { parent: IdentityId, name: Atom },
    Class { parent: IdentityId, name: Atom },
    Typedef { parent: IdentityId, name: Atom },
    Property { parent: IdentityId, name: Atom },
    MultiMethod { parent: IdentityId, name: Atom },
    Method { parent: IdentityId, signature: SignatureId },
    TypeParameter { parent: IdentityId, name: Atom, register: u32 },
    FormalTypeChild { parent: IdentityId, name: Atom },
}

impl IdentityData {
    pub fn kind(&self) -> IdentityKind {
        match self {
            IdentityData::Module { .. } => IdentityKind::Module,
            IdentityData::Package { .. } => IdentityKind::Package,
            IdentityData::Class { .. } => IdentityKind::Class,
            IdentityData::Typedef { .. } => IdentityKind::Typedef,
            IdentityData::Property { .. } => IdentityKind::Property,
            IdentityData::MultiMethod { .. } => IdentityKind::MultiMethod,
            IdentityData::Method { .. } => IdentityKind::Method,
            IdentityData::TypeParameter { .. } => IdentityKind::TypeParameter,
            IdentityData::FormalTypeChild { .. } => IdentityKind::FormalTypeChild,
        }
    }

    pub fn parent(&self) -> Option<IdentityId> {
        match *self {
            IdentityData::Module { .. } => None,
            IdentityData::Package { parent, .. }
            | IdentityData::Class { parent, .. }
            | IdentityData::Typedef { parent, .. }
            | IdentityData::Property { parent, .. }
            | IdentityData::MultiMethod { parent, .. }
            | IdentityData::Method { parent, .. }
            | IdentityData::TypeParameter { parent, .. }
            | IdentityData::FormalTypeChild { parent, .. } => Some(parent),
        }
    }

    /// Same declaration under a different parent.
    fn with_parent(self, parent: IdentityId) -> IdentityData {
        match self {
            IdentityData::Module { name } => IdentityData::Module { name },
            IdentityData::Package { name, .. } => IdentityData::Package { parent, name },
            IdentityData::Class { name, .. } => IdentityData::Class { parent, name },
            IdentityData::Typedef { name, .. } => IdentityData::Typedef { parent, name },
            IdentityData::Property { name, .. } => IdentityData::Property { parent, name },
            IdentityData::MultiMethod { name, .. } => IdentityData::MultiMethod { parent, name },
            IdentityData::Method { signature, .. } => IdentityData::Method { parent, signature },
            IdentityData::TypeParameter { name, register, .. } => IdentityData::TypeParameter {
                parent,
                name,
                register,
            },
            IdentityData::FormalTypeChild { name, .. } => {
                IdentityData::FormalTypeChild { parent, name }
            }
        }
    }
}

// =============================================================================
// Nested identity
// =============================================================================

/// One step of a path below a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Name(Atom),
    /// A method; the multi-method level is folded into its signature.
    Method(SignatureId),
}

/// Path of a member relative to its owning class.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NestedIdentity {
    segments: SmallVec<[Segment; 2]>,
}

impl NestedIdentity {
    pub fn property(name: Atom) -> Self {
        Self {
            segments: SmallVec::from_slice(&[Segment::Name(name)]),
        }
    }

    pub fn method(signature: SignatureId) -> Self {
        Self {
            segments: SmallVec::from_slice(&[Segment::Method(signature)]),
        }
    }

    /// A member nested inside this one (e.g. a property accessor).
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The immediate container, if this identity is nested more than one level.
    pub fn container(&self) -> Option<NestedIdentity> {
        if self.segments.len() < 2 {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn last(&self) -> Option<Segment> {
        self.segments.last().copied()
    }

    /// The signature, when this identity names a method.
    pub fn signature(&self) -> Option<SignatureId> {
        match self.last() {
            Some(Segment::Method(sig)) => Some(sig),
            _ => None,
        }
    }

    /// True if this identity is directly on the class (not inside a member).
    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn is_nested_in(&self, container: &NestedIdentity) -> bool {
        self.segments.len() > container.segments.len()
            && self.segments.starts_with(&container.segments)
    }
}

// =============================================================================
// Pool operations
// =============================================================================

impl ConstantPool {
    pub fn module_identity(&self, name: &str) -> IdentityId {
        let name = self.intern_name(name);
        self.register_identity(IdentityData::Module { name })
    }

    pub fn package_identity(&self, parent: IdentityId, name: &str) -> IdentityId {
        let name = self.intern_name(name);
        self.register_identity(IdentityData::Package { parent, name })
    }

    pub fn class_identity(&self, parent: IdentityId, name: &str) -> IdentityId {
        let name = self.intern_name(name);
        self.register_identity(IdentityData::Class { parent, name })
    }

    pub fn typedef_identity(&self, parent: IdentityId, name: &str) -> IdentityId {
        let name = self.intern_name(name);
        self.register_identity(IdentityData::Typedef { parent, name })
    }

    pub fn property_identity(&self, parent: IdentityId, name: &str) -> IdentityId {
        let name = self.intern_name(name);
        self.property_identity_atom(parent, name)
    }

    pub fn property_identity_atom(&self, parent: IdentityId, name: Atom) -> IdentityId {
        self.register_identity(IdentityData::Property { parent, name })
    }

    pub fn multi_method_identity(&self, parent: IdentityId, name: Atom) -> IdentityId {
        self.register_identity(IdentityData::MultiMethod { parent, name })
    }

    /// The method with `signature` under `parent`, creating the multi-method
    /// level on the way.
    pub fn method_identity(&self, parent: IdentityId, signature: SignatureId) -> IdentityId {
        let name = self.signature(signature).name;
        let multi = self.multi_method_identity(parent, name);
        self.register_identity(IdentityData::Method {
            parent: multi,
            signature,
        })
    }

    pub fn type_parameter_identity(&self, method: IdentityId, name: &str, register: u32) -> IdentityId {
        let name = self.intern_name(name);
        self.register_identity(IdentityData::TypeParameter {
            parent: method,
            name,
            register,
        })
    }

    pub fn formal_child_identity(&self, parent: IdentityId, name: &str) -> IdentityId {
        let name = self.intern_name(name);
        self.register_identity(IdentityData::FormalTypeChild { parent, name })
    }

    /// Intern an identity after checking its parent kind.
    ///
    /// # Panics
    ///
    /// Panics when the parent is of a kind that cannot contain this
    /// declaration. That is an assembler defect, not a source error.
    pub fn register_identity(&self, data: IdentityData) -> IdentityId {
        if let Some(parent) = data.parent() {
            let parent_kind = self.identity_kind(parent);
            if !data.kind().allows_parent(parent_kind) {
                panic!(
                    "illegal parent for {:?}: {:?} #{} cannot contain it",
                    data.kind(),
                    parent_kind,
                    parent.0
                );
            }
        }
        self.intern_identity(data)
    }

    pub fn identity_kind(&self, id: IdentityId) -> IdentityKind {
        self.identity(id).kind()
    }

    pub fn parent(&self, id: IdentityId) -> Option<IdentityId> {
        self.identity(id).parent()
    }

    /// Simple name of the declaration; a method answers its signature name.
    pub fn identity_name(&self, id: IdentityId) -> Atom {
        match self.identity(id) {
            IdentityData::Module { name }
            | IdentityData::Package { name, .. }
            | IdentityData::Class { name, .. }
            | IdentityData::Typedef { name, .. }
            | IdentityData::Property { name, .. }
            | IdentityData::MultiMethod { name, .. }
            | IdentityData::TypeParameter { name, .. }
            | IdentityData::FormalTypeChild { name, .. } => name,
            IdentityData::Method { signature, .. } => self.signature(signature).name,
        }
    }

    /// Ancestors from the module down to `id` itself.
    pub fn path(&self, id: IdentityId) -> Vec<IdentityId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Dot-joined names below the module; multi-method levels are folded
    /// into their methods.
    pub fn path_string(&self, id: IdentityId) -> String {
        let mut out = String::new();
        for step in self.path(id) {
            match self.identity_kind(step) {
                IdentityKind::Module | IdentityKind::MultiMethod => continue,
                _ => {}
            }
            if !out.is_empty() {
                out.push('.');
            }
            let _ = write!(out, "{}", self.name_text(self.identity_name(step)));
        }
        if out.is_empty() {
            out.push_str(&self.name_text(self.identity_name(id)));
        }
        out
    }

    pub fn module_of(&self, id: IdentityId) -> IdentityId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// The nearest class containing `id`, or `id` itself when it is a class.
    pub fn nearest_class(&self, id: IdentityId) -> Option<IdentityId> {
        let mut current = Some(id);
        while let Some(step) = current {
            if self.identity_kind(step) == IdentityKind::Class {
                return Some(step);
            }
            current = self.parent(step);
        }
        None
    }

    /// The class nearest the module on the path of `id`.
    pub fn outermost_class(&self, id: IdentityId) -> Option<IdentityId> {
        self.path(id)
            .into_iter()
            .find(|&step| self.identity_kind(step) == IdentityKind::Class)
    }

    /// Number of non-class segments between `id` and its nearest class.
    /// A class itself is at depth 0.
    pub fn nested_depth(&self, id: IdentityId) -> u32 {
        self.nested_identity(id).depth() as u32
    }

    /// True if both identities share an outermost class, or one outermost
    /// class extends the other.
    pub fn is_nest_mate_of(&self, a: IdentityId, b: IdentityId) -> bool {
        let (Some(outer_a), Some(outer_b)) = (self.outermost_class(a), self.outermost_class(b))
        else {
            return false;
        };
        outer_a == outer_b
            || self.extends_transitively(outer_a, outer_b)
            || self.extends_transitively(outer_b, outer_a)
    }

    /// Re-home the last segment of `id` under `new_parent`. A method moves
    /// together with its multi-method level.
    pub fn append_trailing_segment_to(&self, id: IdentityId, new_parent: IdentityId) -> IdentityId {
        match self.identity(id) {
            IdentityData::Method { signature, .. } => self.method_identity(new_parent, signature),
            data => self.register_identity(data.with_parent(new_parent)),
        }
    }

    /// Re-home the last `n` segments of `id` under `new_root`.
    pub fn append_trailing_path_to(&self, id: IdentityId, new_root: IdentityId, n: usize) -> IdentityId {
        let mut trailing = Vec::with_capacity(n);
        let mut current = id;
        for _ in 0..n {
            trailing.push(current);
            let Some(parent) = self.parent(current) else {
                break;
            };
            current = match self.identity(current) {
                IdentityData::Method { .. } => self.parent(parent).unwrap_or(parent),
                _ => parent,
            };
        }
        trailing
            .into_iter()
            .rev()
            .fold(new_root, |parent, step| self.append_trailing_segment_to(step, parent))
    }

    /// The path of `id` below its nearest class.
    pub fn nested_identity(&self, id: IdentityId) -> NestedIdentity {
        let mut segments: SmallVec<[Segment; 2]> = SmallVec::new();
        let mut current = id;
        loop {
            match self.identity(current) {
                IdentityData::Class { .. } | IdentityData::Module { .. } => break,
                IdentityData::Package { .. } => break,
                IdentityData::Method { parent, signature } => {
                    segments.push(Segment::Method(signature));
                    // skip the multi-method level
                    match self.parent(parent) {
                        Some(grand) => current = grand,
                        None => break,
                    }
                }
                data => {
                    segments.push(Segment::Name(self.identity_name(current)));
                    match data.parent() {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
        }
        segments.reverse();
        NestedIdentity { segments }
    }
}

#[cfg(test)]
#[path = "../tests/identity_tests.rs"]
mod tests;
