//! Core module installed into every pool.
//!
//! The engine relies on a handful of classes by identity: `Object` (the top
//! of every relation), `Ref`/`Var` (the base of exploded properties),
//! `Tuple`/`Function` (relation special cases), `Inner`/`Outer` (implicit
//! virtual-child markers) and the format interfaces a rebase layer targets.

use crate::pool::ConstantPool;
use crate::structure::{ClassStructure, ContributionDecl, Format, Implementation};
use crate::types::{IdentityId, TypeId};

/// Handles of the core classes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreTypes {
    pub module: IdentityId,
    pub object: IdentityId,
    pub type_class: IdentityId,
    pub boolean: IdentityId,
    pub int: IdentityId,
    pub string: IdentityId,
    pub ref_class: IdentityId,
    pub var_class: IdentityId,
    pub tuple: IdentityId,
    pub function: IdentityId,
    pub orderable: IdentityId,
    pub inner: IdentityId,
    pub outer: IdentityId,
    pub const_iface: IdentityId,
    pub service_iface: IdentityId,
    pub enum_iface: IdentityId,
    pub module_iface: IdentityId,
    pub package_iface: IdentityId,

    pub object_type: TypeId,
    pub boolean_type: TypeId,
    pub int_type: TypeId,
    pub string_type: TypeId,
}

impl CoreTypes {
    /// The interface a class of `format` is rebased onto when it extends a
    /// plain class.
    pub fn format_interface(&self, format: Format) -> Option<IdentityId> {
        match format {
            Format::Const => Some(self.const_iface),
            Format::Service => Some(self.service_iface),
            Format::Enum => Some(self.enum_iface),
            Format::Module => Some(self.module_iface),
            Format::Package => Some(self.package_iface),
            _ => None,
        }
    }

    /// Classes never compared by duck typing.
    pub fn is_duck_excluded(&self, class: IdentityId) -> bool {
        class == self.object || class == self.tuple || class == self.function || class == self.orderable
    }
}

pub(crate) fn install(pool: &ConstantPool) -> CoreTypes {
    let module = pool.module_identity("ecstasy");
    let class = |name: &str| pool.class_identity(module, name);

    let object = class("Object");
    let object_type = pool.class_type(object);

    let type_class = class("Type");
    let boolean = class("Boolean");
    let int = class("Int");
    let string = class("String");
    let ref_class = class("Ref");
    let var_class = class("Var");
    let tuple = class("Tuple");
    let function = class("Function");
    let orderable = class("Orderable");
    let inner = class("Inner");
    let outer = class("Outer");
    let const_iface = class("Const");
    let service_iface = class("Service");
    let enum_iface = class("Enum");
    let module_iface = class("Module");
    let package_iface = class("Package");

    let boolean_type = pool.class_type(boolean);
    let int_type = pool.class_type(int);
    let string_type = pool.class_type(string);

    pool.register_class(ClassStructure::new(object, Format::Class));

    let marker = |id: IdentityId| {
        pool.register_class(ClassStructure::new(id, Format::Interface));
    };
    marker(orderable);
    marker(inner);
    marker(outer);
    marker(service_iface);

    let orderable_type = pool.class_type(orderable);
    let const_type = pool.class_type(const_iface);
    pool.register_class(
        ClassStructure::new(const_iface, Format::Interface)
            .with_contribution(ContributionDecl::implements(orderable_type)),
    );
    for id in [enum_iface, module_iface, package_iface] {
        pool.register_class(
            ClassStructure::new(id, Format::Interface)
                .with_contribution(ContributionDecl::implements(const_type)),
        );
    }

    // Type<DataType>
    let data_type = pool.intern_name("DataType");
    pool.register_class(
        ClassStructure::new(type_class, Format::Interface).with_type_param(data_type, object_type),
    );

    // Ref<Referent> { Referent get(); }
    let referent = pool.intern_name("Referent");
    let ref_referent = pool.formal_property_type(pool.property_identity_atom(ref_class, referent));
    pool.register_class(
        ClassStructure::new(ref_class, Format::Interface)
            .with_type_param(referent, object_type)
            .with_method(
                pool.declare_method(ref_class, "get", vec![], vec![ref_referent])
                    .with_implementation(Implementation::Declared),
            ),
    );

    // Var<Referent> implements Ref<Referent> { void set(Referent value); }
    let var_referent = pool.formal_property_type(pool.property_identity_atom(var_class, referent));
    let ref_of_var_referent = pool.parameterized_type(pool.class_type(ref_class), vec![var_referent]);
    pool.register_class(
        ClassStructure::new(var_class, Format::Interface)
            .with_type_param(referent, object_type)
            .with_contribution(ContributionDecl::implements(ref_of_var_referent))
            .with_method(
                pool.declare_method(var_class, "set", vec![var_referent], vec![])
                    .with_implementation(Implementation::Declared),
            ),
    );

    // Tuple<ElementTypes>, Function<ParamTypes, ReturnTypes>
    let tuple_type = pool.class_type(tuple);
    pool.register_class(
        ClassStructure::new(tuple, Format::Interface)
            .with_type_param(pool.intern_name("ElementTypes"), tuple_type),
    );
    pool.register_class(
        ClassStructure::new(function, Format::Interface)
            .with_type_param(pool.intern_name("ParamTypes"), tuple_type)
            .with_type_param(pool.intern_name("ReturnTypes"), tuple_type),
    );

    // Value classes
    let boolean_decl = ClassStructure::new(boolean, Format::Const);
    pool.register_class(boolean_decl);
    pool.register_class(
        ClassStructure::new(int, Format::Const)
            .with_contribution(ContributionDecl::implements(orderable_type)),
    );
    pool.register_class(
        ClassStructure::new(string, Format::Const)
            .with_contribution(ContributionDecl::implements(orderable_type)),
    );

    CoreTypes {
        module,
        object,
        type_class,
        boolean,
        int,
        string,
        ref_class,
        var_class,
        tuple,
        function,
        orderable,
        inner,
        outer,
        const_iface,
        service_iface,
        enum_iface,
        module_iface,
        package_iface,
        object_type,
        boolean_type,
        int_type,
        string_type,
    }
}
