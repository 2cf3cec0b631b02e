//! Type constructors and structural queries.

use crate::pool::ConstantPool;
use crate::types::{
    Access, IdentityId, TerminalType, TypeData, TypeId, TypeListId, UnsupportedOperation,
};
use xtc_common::interner::Atom;

impl ConstantPool {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn class_type(&self, class: IdentityId) -> TypeId {
        self.intern_type(TypeData::Terminal(TerminalType::Class(class)))
    }

    pub fn typedef_type(&self, typedef: IdentityId) -> TypeId {
        self.intern_type(TypeData::Terminal(TerminalType::Typedef(typedef)))
    }

    pub fn formal_property_type(&self, property: IdentityId) -> TypeId {
        self.intern_type(TypeData::Terminal(TerminalType::FormalProperty(property)))
    }

    pub fn type_parameter_type(&self, param: IdentityId) -> TypeId {
        self.intern_type(TypeData::Terminal(TerminalType::TypeParameter(param)))
    }

    pub fn formal_child_type(&self, child: IdentityId) -> TypeId {
        self.intern_type(TypeData::Terminal(TerminalType::FormalChild(child)))
    }

    pub fn this_class_type(&self, class: IdentityId) -> TypeId {
        self.intern_type(TypeData::Terminal(TerminalType::ThisClass(class)))
    }

    /// `base<params>`; an empty parameter list answers `base` itself.
    pub fn parameterized_type(&self, base: TypeId, params: Vec<TypeId>) -> TypeId {
        if params.is_empty() {
            return base;
        }
        let params = self.intern_type_list(params);
        self.intern_type(TypeData::Parameterized { base, params })
    }

    pub fn annotated_type(&self, annotation: TypeId, base: TypeId) -> TypeId {
        self.intern_type(TypeData::Annotated { annotation, base })
    }

    /// `immutable base`; applying it twice is a no-op.
    pub fn immutable_type(&self, base: TypeId) -> TypeId {
        if let TypeData::Immutable(_) = self.type_data(base) {
            return base;
        }
        self.intern_type(TypeData::Immutable(base))
    }

    /// `base:access`; a public view of a plain type is the type itself, and
    /// re-qualifying replaces the previous access.
    pub fn access_type(&self, base: TypeId, access: Access) -> TypeId {
        let base = match self.type_data(base) {
            TypeData::Access { base, .. } => base,
            _ => base,
        };
        if access == Access::Public {
            return base;
        }
        self.intern_type(TypeData::Access { base, access })
    }

    pub fn virtual_child_type(&self, parent: TypeId, name: Atom) -> TypeId {
        self.intern_type(TypeData::VirtualChild { parent, name })
    }

    pub fn intersection_type(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        self.intern_type(TypeData::Intersection(a, b))
    }

    pub fn union_type(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        self.intern_type(TypeData::Union(a, b))
    }

    pub fn difference_type(&self, a: TypeId, b: TypeId) -> TypeId {
        self.intern_type(TypeData::Difference(a, b))
    }

    // =========================================================================
    // Structural queries
    // =========================================================================

    pub fn is_modifying_type(&self, t: TypeId) -> bool {
        self.type_data(t).is_modifying()
    }

    pub fn is_relational_type(&self, t: TypeId) -> bool {
        self.type_data(t).is_relational()
    }

    pub fn is_formal_type(&self, t: TypeId) -> bool {
        self.type_data(t).is_formal()
    }

    /// The single underlying type of a modifying type, or the first of a
    /// relational type.
    pub fn underlying_type(&self, t: TypeId) -> Result<TypeId, UnsupportedOperation> {
        match self.type_data(t) {
            TypeData::Parameterized { base, .. }
            | TypeData::Annotated { base, .. }
            | TypeData::Immutable(base)
            | TypeData::Access { base, .. } => Ok(base),
            TypeData::VirtualChild { parent, .. } => Ok(parent),
            TypeData::Intersection(a, _) | TypeData::Union(a, _) | TypeData::Difference(a, _) => {
                Ok(a)
            }
            TypeData::Unresolved(ph) => match self.placeholder_target(ph) {
                Some(target) => self.underlying_type(target),
                None => Err(UnsupportedOperation {
                    operation: "underlying_type",
                    type_id: t,
                }),
            },
            TypeData::Terminal(_) => Err(UnsupportedOperation {
                operation: "underlying_type",
                type_id: t,
            }),
        }
    }

    /// The second underlying type of a relational type.
    pub fn underlying_type2(&self, t: TypeId) -> Result<TypeId, UnsupportedOperation> {
        match self.type_data(t) {
            TypeData::Intersection(_, b) | TypeData::Union(_, b) | TypeData::Difference(_, b) => {
                Ok(b)
            }
            TypeData::Unresolved(ph) => match self.placeholder_target(ph) {
                Some(target) => self.underlying_type2(target),
                None => Err(UnsupportedOperation {
                    operation: "underlying_type2",
                    type_id: t,
                }),
            },
            _ => Err(UnsupportedOperation {
                operation: "underlying_type2",
                type_id: t,
            }),
        }
    }

    /// Follow bound placeholders to the type they stand for.
    pub fn dereference(&self, t: TypeId) -> TypeId {
        let mut current = t;
        while let TypeData::Unresolved(ph) = self.type_data(current) {
            match self.placeholder_target(ph) {
                Some(target) if target != current => current = target,
                _ => break,
            }
        }
        current
    }

    /// The class a value of this type is an instance of, looking through
    /// modifiers. Relational and formal types have none.
    pub fn class_of(&self, t: TypeId) -> Option<IdentityId> {
        match self.type_data(self.dereference(t)) {
            TypeData::Terminal(TerminalType::Class(id) | TerminalType::ThisClass(id)) => Some(id),
            TypeData::Parameterized { base, .. }
            | TypeData::Annotated { base, .. }
            | TypeData::Immutable(base)
            | TypeData::Access { base, .. } => self.class_of(base),
            TypeData::VirtualChild { parent, name } => {
                let parent_class = self.class_of(parent)?;
                self.find_virtual_child(parent_class, name)
            }
            _ => None,
        }
    }

    /// Actual type parameters, looking through modifiers other than
    /// parameterization.
    pub fn type_params(&self, t: TypeId) -> std::sync::Arc<[TypeId]> {
        match self.type_data(self.dereference(t)) {
            TypeData::Parameterized { params, .. } => self.type_list(params),
            TypeData::Annotated { base, .. }
            | TypeData::Immutable(base)
            | TypeData::Access { base, .. } => self.type_params(base),
            _ => self.type_list(TypeListId::EMPTY),
        }
    }

    pub fn is_immutable(&self, t: TypeId) -> bool {
        match self.type_data(self.dereference(t)) {
            TypeData::Immutable(_) => true,
            TypeData::Annotated { base, .. } | TypeData::Access { base, .. } => {
                self.is_immutable(base)
            }
            _ => false,
        }
    }

    /// Access of a type (`Public` unless qualified).
    pub fn access_of(&self, t: TypeId) -> Access {
        match self.type_data(self.dereference(t)) {
            TypeData::Access { access, .. } => access,
            TypeData::Immutable(base) | TypeData::Annotated { base, .. } => self.access_of(base),
            _ => Access::Public,
        }
    }

    /// True if an unbound placeholder occurs anywhere in the type.
    pub fn contains_unresolved(&self, t: TypeId) -> bool {
        match self.type_data(t) {
            TypeData::Unresolved(ph) => match self.placeholder_target(ph) {
                Some(target) => self.contains_unresolved(target),
                None => true,
            },
            TypeData::Terminal(_) => false,
            TypeData::Parameterized { base, params } => {
                self.contains_unresolved(base)
                    || self.type_list(params).iter().any(|&p| self.contains_unresolved(p))
            }
            TypeData::Annotated { annotation, base } => {
                self.contains_unresolved(annotation) || self.contains_unresolved(base)
            }
            TypeData::Immutable(base) | TypeData::Access { base, .. } => {
                self.contains_unresolved(base)
            }
            TypeData::VirtualChild { parent, .. } => self.contains_unresolved(parent),
            TypeData::Intersection(a, b) | TypeData::Union(a, b) | TypeData::Difference(a, b) => {
                self.contains_unresolved(a) || self.contains_unresolved(b)
            }
        }
    }

    /// True if the type mentions a formal type anywhere.
    pub fn contains_formal(&self, t: TypeId) -> bool {
        match self.type_data(self.dereference(t)) {
            data if data.is_formal() => true,
            TypeData::Terminal(_) | TypeData::Unresolved(_) => false,
            TypeData::Parameterized { base, params } => {
                self.contains_formal(base)
                    || self.type_list(params).iter().any(|&p| self.contains_formal(p))
            }
            TypeData::Annotated { annotation, base } => {
                self.contains_formal(annotation) || self.contains_formal(base)
            }
            TypeData::Immutable(base) | TypeData::Access { base, .. } => self.contains_formal(base),
            TypeData::VirtualChild { parent, .. } => self.contains_formal(parent),
            TypeData::Intersection(a, b) | TypeData::Union(a, b) | TypeData::Difference(a, b) => {
                self.contains_formal(a) || self.contains_formal(b)
            }
        }
    }

    /// Name of a formal type (the property, type parameter or child name).
    pub fn formal_name(&self, t: TypeId) -> Option<Atom> {
        match self.type_data(self.dereference(t)) {
            TypeData::Terminal(
                TerminalType::FormalProperty(id)
                | TerminalType::TypeParameter(id)
                | TerminalType::FormalChild(id),
            ) => Some(self.identity_name(id)),
            _ => None,
        }
    }
}
