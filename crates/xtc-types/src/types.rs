//! Type-constant graph data model.
//!
//! Every constant lives in a [`ConstantPool`](crate::ConstantPool) and is
//! referred to by a small `Copy` handle. Handles compare by value and, because
//! the pool interns structurally, two handles are equal exactly when the
//! constants they name are structurally equal.

use xtc_common::interner::Atom;

// =============================================================================
// Handles
// =============================================================================

/// Handle to an interned identity (module, package, class, property, ...).
///
/// The raw value is the identity's stable pool position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(pub u32);

/// Handle to an interned type constant.
///
/// The raw value is the type's stable pool position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// An unassigned handle; never issued by a pool.
impl Default for IdentityId {
    fn default() -> Self {
        IdentityId(u32::MAX)
    }
}

/// An unassigned handle; never issued by a pool.
impl Default for TypeId {
    fn default() -> Self {
        TypeId(u32::MAX)
    }
}

/// Handle to an interned list of types (type parameters, signature
/// parameters and returns). `TypeListId::EMPTY` is the empty list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeListId(pub u32);

impl TypeListId {
    pub const EMPTY: TypeListId = TypeListId(0);
}

/// Handle to an interned method signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureId(pub u32);

/// Handle to a pending name reference produced before name resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderId(pub u32);

// =============================================================================
// Type constants
// =============================================================================

/// Access qualifier of a type or a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Access {
    Public,
    Protected,
    Private,
    /// The structure view: type parameters, constants and fields only.
    Struct,
}

impl Access {
    /// Whether a member declared with `self` access is visible through a
    /// type with `view` access.
    pub fn is_visible_from(self, view: Access) -> bool {
        match view {
            Access::Private | Access::Struct => true,
            Access::Protected => self != Access::Private,
            Access::Public => self == Access::Public,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
            Access::Struct => "struct",
        }
    }
}

/// A type with no underlying type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminalType {
    /// A class, interface, mixin, const, service, enum, module or package.
    Class(IdentityId),
    /// A reference to a typedef; removed by `resolve_typedefs`.
    Typedef(IdentityId),
    /// A class type parameter, expressed as its formal property.
    FormalProperty(IdentityId),
    /// A method type parameter.
    TypeParameter(IdentityId),
    /// A formal type nested under another formal type (`Element.Key`).
    FormalChild(IdentityId),
    /// The auto-narrowing `this:class` of the given declaring class.
    ThisClass(IdentityId),
}

/// Structural content of a type constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Terminal(TerminalType),
    Parameterized {
        base: TypeId,
        params: TypeListId,
    },
    /// `@annotation base`; the annotation is a (possibly parameterized)
    /// mixin type.
    Annotated {
        annotation: TypeId,
        base: TypeId,
    },
    Immutable(TypeId),
    Access {
        base: TypeId,
        access: Access,
    },
    /// `parent.name`: the virtual child class named `name` as seen through
    /// the parent type.
    VirtualChild {
        parent: TypeId,
        name: Atom,
    },
    /// `A | B`: a value of both types.
    Intersection(TypeId, TypeId),
    /// `A + B`: a value of either type.
    Union(TypeId, TypeId),
    /// `A - B`: the capabilities of `A` that `B` lacks.
    Difference(TypeId, TypeId),
    /// A name the front end could not resolve yet.
    Unresolved(PlaceholderId),
}

impl TypeData {
    /// Modifying types wrap exactly one underlying type.
    pub fn is_modifying(&self) -> bool {
        matches!(
            self,
            TypeData::Parameterized { .. }
                | TypeData::Annotated { .. }
                | TypeData::Immutable(_)
                | TypeData::Access { .. }
                | TypeData::VirtualChild { .. }
        )
    }

    /// Relational types wrap exactly two underlying types.
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            TypeData::Intersection(..) | TypeData::Union(..) | TypeData::Difference(..)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TypeData::Terminal(_) | TypeData::Unresolved(_))
    }

    /// Formal types stand for an as-yet unknown actual type.
    pub fn is_formal(&self) -> bool {
        matches!(
            self,
            TypeData::Terminal(
                TerminalType::FormalProperty(_)
                    | TerminalType::TypeParameter(_)
                    | TerminalType::FormalChild(_)
            )
        )
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// A method signature: name, parameter types and return types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignatureData {
    pub name: Atom,
    pub params: TypeListId,
    pub returns: TypeListId,
}

/// A failed structural query on a type variant that does not support it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsupportedOperation {
    pub operation: &'static str,
    pub type_id: TypeId,
}

impl std::fmt::Display for UnsupportedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not supported by type #{}", self.operation, self.type_id.0)
    }
}

impl std::error::Error for UnsupportedOperation {}
