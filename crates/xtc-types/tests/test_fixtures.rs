//! Declarations shared by the unit tests.

use crate::pool::ConstantPool;
use crate::structure::{ClassStructure, ContributionDecl, Format, Implementation, MethodDecl};
use crate::types::{IdentityId, SignatureId, TypeId};
use xtc_common::interner::Atom;

/// A pool with a `test` module to declare classes in.
pub(crate) struct Fixture {
    pub(crate) pool: ConstantPool,
    pub(crate) module: IdentityId,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let pool = ConstantPool::new();
        let module = pool.module_identity("test");
        Self { pool, module }
    }

    pub(crate) fn class(&self, name: &str) -> IdentityId {
        self.pool.class_identity(self.module, name)
    }

    pub(crate) fn ty(&self, class: IdentityId) -> TypeId {
        self.pool.class_type(class)
    }

    pub(crate) fn object(&self) -> TypeId {
        self.pool.core().object_type
    }

    pub(crate) fn int(&self) -> TypeId {
        self.pool.core().int_type
    }

    pub(crate) fn string(&self) -> TypeId {
        self.pool.core().string_type
    }

    pub(crate) fn name(&self, text: &str) -> Atom {
        self.pool.intern_name(text)
    }

    /// The formal type of the type parameter `name` declared on `class`.
    pub(crate) fn formal(&self, class: IdentityId, name: &str) -> TypeId {
        self.pool
            .formal_property_type(self.pool.property_identity(class, name))
    }

    pub(crate) fn sig(&self, name: &str, params: Vec<TypeId>, returns: Vec<TypeId>) -> SignatureId {
        self.pool.make_signature(name, params, returns)
    }

    /// Register a structure and answer its class type.
    pub(crate) fn declare(&self, structure: ClassStructure) -> TypeId {
        let id = self.pool.register_class(structure);
        self.pool.class_type(id)
    }

    /// A method without a body, as interfaces declare them.
    pub(crate) fn declared_method(
        &self,
        owner: IdentityId,
        name: &str,
        params: Vec<TypeId>,
        returns: Vec<TypeId>,
    ) -> MethodDecl {
        self.pool
            .declare_method(owner, name, params, returns)
            .with_implementation(Implementation::Declared)
    }

    /// `mixin Lazy<Referent> into Ref<Referent> { Referent get(); }`
    pub(crate) fn lazy_mixin(&self) -> IdentityId {
        let lazy = self.class("Lazy");
        let referent = self.formal(lazy, "Referent");
        let ref_type = self.pool.class_type(self.pool.core().ref_class);
        self.declare(
            ClassStructure::new(lazy, Format::Mixin)
                .with_type_param(self.name("Referent"), self.object())
                .with_contribution(ContributionDecl::into(
                    self.pool.parameterized_type(ref_type, vec![referent]),
                ))
                .with_method(self.pool.declare_method(lazy, "get", vec![], vec![referent])),
        );
        lazy
    }
}
