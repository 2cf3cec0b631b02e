//! Class structures: the declarations the TypeInfo builder reads.
//!
//! A `ClassStructure` is what the front end hands over for one class,
//! interface, mixin, const, service, enum, module or package: its format,
//! formal type parameters, contributions in declaration order, and declared
//! properties and methods.

use crate::pool::ConstantPool;
use crate::types::{Access, IdentityId, SignatureId, TerminalType, TypeData, TypeId};
use bitflags::bitflags;
use xtc_common::interner::Atom;
use xtc_common::limits::MAX_CONTRIBUTION_WALK;

/// Runtime representation of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Module,
    Package,
    Class,
    Interface,
    Mixin,
    Service,
    Const,
    Enum,
    EnumValue,
}

impl Format {
    /// Formats that can be extended and instantiated (everything but
    /// interfaces and mixins).
    pub fn is_class_like(self) -> bool {
        !matches!(self, Format::Interface | Format::Mixin)
    }

    /// Formats whose instances are immutable once constructed.
    pub fn is_const_like(self) -> bool {
        matches!(
            self,
            Format::Const | Format::Enum | Format::EnumValue | Format::Module | Format::Package
        )
    }

    /// Whether a class of this format may extend a class of format `parent`.
    pub fn can_extend(self, parent: Format) -> bool {
        match parent {
            Format::Class => self.is_class_like(),
            Format::Const => self.is_const_like(),
            Format::Service => self == Format::Service,
            Format::Enum => self == Format::EnumValue,
            Format::Mixin => self == Format::Mixin,
            Format::Interface | Format::EnumValue | Format::Module | Format::Package => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Module => "module",
            Format::Package => "package",
            Format::Class => "class",
            Format::Interface => "interface",
            Format::Mixin => "mixin",
            Format::Service => "service",
            Format::Const => "const",
            Format::Enum => "enum",
            Format::EnumValue => "enum value",
        }
    }
}

/// Kind of a contribution edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Composition {
    Extends,
    Incorporates,
    Implements,
    Delegates,
    Annotation,
    Into,
    RebasesOnto,
    /// The class itself.
    Equal,
}

/// How a member body is implemented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Implementation {
    /// Declared with code.
    Explicit,
    Native,
    /// An interface method with a default body.
    Default,
    /// An interface method without a body.
    Declared,
    Abstract,
    /// Implemented implicitly, e.g. a field-backed accessor.
    SansCode,
    /// Forwarded to a delegate property.
    Delegating,
    /// A frozen chain head that redirects to a narrower signature.
    Capped,
}

impl Implementation {
    /// Ordering group used to normalize a chain: concrete bodies first,
    /// then defaults, then bodies without code.
    pub(crate) fn chain_rank(self) -> u8 {
        match self {
            Implementation::Explicit
            | Implementation::Native
            | Implementation::SansCode
            | Implementation::Delegating
            | Implementation::Capped => 0,
            Implementation::Default => 1,
            Implementation::Declared | Implementation::Abstract => 2,
        }
    }

    pub fn has_code(self) -> bool {
        self.chain_rank() < 2
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u16 {
        /// Explicitly overrides (and possibly narrows) a super method.
        const OVERRIDE = 1 << 0;
        /// A static function.
        const FUNCTION = 1 << 1;
        const CONSTRUCTOR = 1 << 2;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u16 {
        /// Backed by a field.
        const FIELD = 1 << 0;
        /// A static constant.
        const CONSTANT = 1 << 1;
        /// Exposed as `Ref` rather than `Var`.
        const READ_ONLY = 1 << 2;
        const ABSTRACT = 1 << 3;
    }
}

/// Requirement on an actual type parameter for a conditional incorporate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Condition {
    pub param: Atom,
    pub constraint: TypeId,
}

/// One declared contribution.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContributionDecl {
    pub composition: Composition,
    pub type_id: TypeId,
    /// Non-empty only for conditional incorporates.
    pub conditions: Vec<Condition>,
    /// The property that receives delegated calls.
    pub delegate: Option<Atom>,
}

impl ContributionDecl {
    pub fn new(composition: Composition, type_id: TypeId) -> Self {
        Self {
            composition,
            type_id,
            conditions: Vec::new(),
            delegate: None,
        }
    }

    pub fn extends(type_id: TypeId) -> Self {
        Self::new(Composition::Extends, type_id)
    }

    pub fn implements(type_id: TypeId) -> Self {
        Self::new(Composition::Implements, type_id)
    }

    pub fn incorporates(type_id: TypeId) -> Self {
        Self::new(Composition::Incorporates, type_id)
    }

    pub fn annotation(type_id: TypeId) -> Self {
        Self::new(Composition::Annotation, type_id)
    }

    pub fn into(type_id: TypeId) -> Self {
        Self::new(Composition::Into, type_id)
    }

    pub fn delegates(type_id: TypeId, property: Atom) -> Self {
        Self {
            delegate: Some(property),
            ..Self::new(Composition::Delegates, type_id)
        }
    }

    /// Apply only when the actual type of `param` satisfies `constraint`.
    pub fn when(mut self, param: Atom, constraint: TypeId) -> Self {
        self.conditions.push(Condition { param, constraint });
        self
    }

    pub fn is_conditional(&self) -> bool {
        !self.conditions.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParamDecl {
    pub name: Atom,
    pub constraint: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDecl {
    pub identity: IdentityId,
    pub signature: SignatureId,
    pub access: Access,
    pub implementation: Implementation,
    pub flags: MethodFlags,
    /// Trailing parameters that have default values.
    pub default_params: u32,
    /// Operator name (`+`, `[]`, ...) this method implements.
    pub op: Option<Atom>,
}

impl MethodDecl {
    pub fn with_implementation(mut self, implementation: Implementation) -> Self {
        self.implementation = implementation;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_default_params(mut self, count: u32) -> Self {
        self.default_params = count;
        self
    }

    pub fn with_op(mut self, op: Atom) -> Self {
        self.op = Some(op);
        self
    }

    pub fn is_override(&self) -> bool {
        self.flags.contains(MethodFlags::OVERRIDE)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyDecl {
    pub identity: IdentityId,
    pub name: Atom,
    pub type_id: TypeId,
    pub access: Access,
    pub flags: PropertyFlags,
    /// `Ref`/`Var` annotations in declaration order.
    pub annotations: Vec<TypeId>,
    /// Custom accessor code (`get`, `set`, helpers).
    pub methods: Vec<MethodDecl>,
}

impl PropertyDecl {
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn without_field(mut self) -> Self {
        self.flags.remove(PropertyFlags::FIELD);
        self
    }

    pub fn with_annotation(mut self, annotation: TypeId) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(PropertyFlags::READ_ONLY)
    }

    /// Properties with custom code or annotations get their own Ref/Var chain.
    pub fn needs_explosion(&self) -> bool {
        !self.methods.is_empty() || !self.annotations.is_empty()
    }
}

/// Declared shape of one class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassStructure {
    pub identity: IdentityId,
    pub format: Format,
    pub type_params: Vec<TypeParamDecl>,
    pub contributions: Vec<ContributionDecl>,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
    /// A non-static inner class, instantiated through its parent.
    pub virtual_child: bool,
}

impl ClassStructure {
    pub fn new(identity: IdentityId, format: Format) -> Self {
        Self {
            identity,
            format,
            type_params: Vec::new(),
            contributions: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            virtual_child: false,
        }
    }

    pub fn with_type_param(mut self, name: Atom, constraint: TypeId) -> Self {
        self.type_params.push(TypeParamDecl { name, constraint });
        self
    }

    pub fn with_contribution(mut self, contribution: ContributionDecl) -> Self {
        self.contributions.push(contribution);
        self
    }

    pub fn with_property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn as_virtual_child(mut self) -> Self {
        self.virtual_child = true;
        self
    }

    pub fn type_param(&self, name: Atom) -> Option<&TypeParamDecl> {
        self.type_params.iter().find(|p| p.name == name)
    }

    pub fn type_param_index(&self, name: Atom) -> Option<usize> {
        self.type_params.iter().position(|p| p.name == name)
    }

    pub fn property(&self, name: Atom) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn contributions_of(&self, composition: Composition) -> impl Iterator<Item = &ContributionDecl> {
        self.contributions
            .iter()
            .filter(move |c| c.composition == composition)
    }
}

// =============================================================================
// Declaration helpers
// =============================================================================

impl ConstantPool {
    /// A public, field-backed property declaration on `owner`.
    pub fn declare_property(&self, owner: IdentityId, name: &str, type_id: TypeId) -> PropertyDecl {
        let atom = self.intern_name(name);
        PropertyDecl {
            identity: self.property_identity_atom(owner, atom),
            name: atom,
            type_id,
            access: Access::Public,
            flags: PropertyFlags::FIELD,
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public method declaration with code on `owner`.
    pub fn declare_method(
        &self,
        owner: IdentityId,
        name: &str,
        params: Vec<TypeId>,
        returns: Vec<TypeId>,
    ) -> MethodDecl {
        let signature = self.make_signature(name, params, returns);
        MethodDecl {
            identity: self.method_identity(owner, signature),
            signature,
            access: Access::Public,
            implementation: Implementation::Explicit,
            flags: MethodFlags::empty(),
            default_params: 0,
            op: None,
        }
    }

    /// The class a type names directly, if it is a terminal class reference
    /// or a parameterization of one.
    pub fn terminal_class(&self, type_id: TypeId) -> Option<IdentityId> {
        match self.type_data(type_id) {
            TypeData::Terminal(TerminalType::Class(id)) => Some(id),
            TypeData::Parameterized { base, .. } => self.terminal_class(base),
            TypeData::Unresolved(ph) => self
                .placeholder_target(ph)
                .and_then(|target| self.terminal_class(target)),
            _ => None,
        }
    }

    pub fn format_of(&self, class: IdentityId) -> Option<Format> {
        self.structure(class).map(|s| s.format)
    }

    /// The class `class` declares it extends.
    pub fn extends_class(&self, class: IdentityId) -> Option<IdentityId> {
        let structure = self.structure(class)?;
        let decl = structure.contributions_of(Composition::Extends).next()?;
        self.terminal_class(self.resolve_typedefs(decl.type_id))
    }

    /// True if `class` reaches `ancestor` through declared extends edges.
    /// Stops on cycles.
    pub fn extends_transitively(&self, class: IdentityId, ancestor: IdentityId) -> bool {
        let mut current = self.extends_class(class);
        let mut steps = 0;
        while let Some(step) = current {
            if step == ancestor {
                return true;
            }
            if step == class || steps > MAX_CONTRIBUTION_WALK {
                return false;
            }
            steps += 1;
            current = self.extends_class(step);
        }
        false
    }

    /// Virtual children declared directly inside `class`.
    pub fn virtual_children(&self, class: IdentityId) -> Vec<IdentityId> {
        let mut children: Vec<IdentityId> = self
            .registered_classes()
            .into_iter()
            .filter(|&id| {
                self.parent(id) == Some(class) && self.structure(id).is_some_and(|s| s.virtual_child)
            })
            .collect();
        children.sort();
        children
    }

    /// Find the virtual child named `name` on `class` or one of the classes
    /// it extends.
    pub fn find_virtual_child(&self, class: IdentityId, name: Atom) -> Option<IdentityId> {
        let mut current = Some(class);
        let mut steps = 0;
        while let Some(step) = current {
            let candidate = crate::identity::IdentityData::Class { parent: step, name };
            if let Some(child) = self.lookup_identity(candidate) {
                if self.structure(child).is_some_and(|s| s.virtual_child) {
                    return Some(child);
                }
            }
            steps += 1;
            if steps > MAX_CONTRIBUTION_WALK {
                return None;
            }
            current = self.extends_class(step);
        }
        None
    }
}

#[cfg(test)]
#[path = "../tests/structure_tests.rs"]
mod tests;
