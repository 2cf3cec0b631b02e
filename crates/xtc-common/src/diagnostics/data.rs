//! Diagnostic message table.
//!
//! Codes are stable: tooling keys off them, so a code is never reused for a
//! different message.

use super::{DiagnosticCategory, DiagnosticMessage};

pub mod diagnostic_codes {
    // Unresolvable input
    pub const TYPE_UNRESOLVED: u32 = 1001;
    pub const CLASS_UNKNOWN: u32 = 1002;

    // Extends
    pub const EXTENDS_NOT_CLASS: u32 = 1011;
    pub const EXTENDS_CYCLICAL: u32 = 1012;
    pub const EXTENDS_INCOMPATIBLE: u32 = 1013;
    pub const EXTENDS_MULTIPLE: u32 = 1014;
    pub const INTERFACE_EXTENDS: u32 = 1015;

    // Other compositions
    pub const INCORPORATE_NOT_MIXIN: u32 = 1020;
    pub const ANNOTATION_NOT_MIXIN: u32 = 1021;
    pub const MIXIN_INTO_INCOMPATIBLE: u32 = 1022;
    pub const IMPLEMENTS_MIXIN: u32 = 1023;
    pub const CONTRIBUTION_DUPLICATE: u32 = 1024;
    pub const CONTRIBUTION_CYCLICAL: u32 = 1025;
    pub const INTO_NOT_MIXIN: u32 = 1026;

    // Type parameters
    pub const TYPE_PARAMS_TOO_MANY: u32 = 1030;
    pub const TYPE_PARAM_CONSTRAINT: u32 = 1031;
    pub const TYPE_PARAM_INCOMPATIBLE: u32 = 1032;
    pub const TYPE_PARAM_PROPERTY_CONFLICT: u32 = 1033;

    // Members
    pub const SUPER_AMBIGUOUS: u32 = 1040;
    pub const OVERRIDE_MISSING_SUPER: u32 = 1041;
    pub const PROPERTY_TYPE_INCOMPATIBLE: u32 = 1042;

    // Virtual children, delegation, typedefs
    pub const VIRTUAL_CHILD_MISSING: u32 = 1050;
    pub const DELEGATE_PROPERTY_MISSING: u32 = 1051;
    pub const TYPEDEF_CYCLICAL: u32 = 1060;
}

pub mod diagnostic_messages {
    pub const TYPE_UNRESOLVED: &str = "Type \"{0}\" could not be resolved; \"Object\" is assumed.";
    pub const CLASS_UNKNOWN: &str = "No structure is registered for class \"{0}\".";
    pub const EXTENDS_NOT_CLASS: &str = "\"{0}\" cannot extend \"{1}\" because it is not a class.";
    pub const EXTENDS_CYCLICAL: &str = "Class \"{0}\" has a cyclical extends relationship.";
    pub const EXTENDS_INCOMPATIBLE: &str =
        "\"{0}\" with format {1} cannot extend \"{2}\" with format {3}.";
    pub const EXTENDS_MULTIPLE: &str = "\"{0}\" extends more than one class.";
    pub const INTERFACE_EXTENDS: &str = "Interface \"{0}\" cannot extend \"{1}\".";
    pub const INCORPORATE_NOT_MIXIN: &str = "\"{0}\" cannot incorporate \"{1}\", which is not a mixin.";
    pub const ANNOTATION_NOT_MIXIN: &str = "Annotation \"{0}\" on \"{1}\" is not a mixin.";
    pub const MIXIN_INTO_INCOMPATIBLE: &str =
        "Mixin \"{0}\" cannot be applied to \"{1}\" because it requires \"{2}\".";
    pub const IMPLEMENTS_MIXIN: &str = "\"{0}\" cannot implement mixin \"{1}\".";
    pub const CONTRIBUTION_DUPLICATE: &str = "\"{0}\" contributes \"{1}\" more than once.";
    pub const CONTRIBUTION_CYCLICAL: &str = "Contribution \"{1}\" to \"{0}\" is cyclical.";
    pub const INTO_NOT_MIXIN: &str = "\"{0}\" is not a mixin and cannot declare \"into {1}\".";
    pub const TYPE_PARAMS_TOO_MANY: &str = "Type \"{0}\" declares {1} type parameters but {2} were supplied.";
    pub const TYPE_PARAM_CONSTRAINT: &str =
        "Type parameter \"{0}\" of \"{1}\" requires \"{2}\"; \"{3}\" does not satisfy it.";
    pub const TYPE_PARAM_INCOMPATIBLE: &str =
        "Type parameter \"{0}\" of \"{1}\" is bound to both \"{2}\" and \"{3}\".";
    pub const TYPE_PARAM_PROPERTY_CONFLICT: &str =
        "Property \"{0}\" of \"{1}\" conflicts with the type parameter of the same name.";
    pub const SUPER_AMBIGUOUS: &str = "Method \"{0}\" on \"{1}\" narrows more than one super method ambiguously.";
    pub const OVERRIDE_MISSING_SUPER: &str = "Method \"{0}\" on \"{1}\" is marked override but has no super method.";
    pub const PROPERTY_TYPE_INCOMPATIBLE: &str =
        "Property \"{0}\" of \"{1}\" has type \"{2}\", which is incompatible with the inherited \"{3}\".";
    pub const VIRTUAL_CHILD_MISSING: &str = "\"{0}\" has no virtual child named \"{1}\".";
    pub const DELEGATE_PROPERTY_MISSING: &str =
        "\"{0}\" delegates \"{1}\" to property \"{2}\", which does not exist.";
    pub const TYPEDEF_CYCLICAL: &str = "Typedef \"{0}\" is cyclical.";
}

macro_rules! message {
    ($name:ident, $category:ident) => {
        DiagnosticMessage {
            code: diagnostic_codes::$name,
            category: DiagnosticCategory::$category,
            message: diagnostic_messages::$name,
        }
    };
}

pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    message!(TYPE_UNRESOLVED, Error),
    message!(CLASS_UNKNOWN, Error),
    message!(EXTENDS_NOT_CLASS, Error),
    message!(EXTENDS_CYCLICAL, Error),
    message!(EXTENDS_INCOMPATIBLE, Error),
    message!(EXTENDS_MULTIPLE, Error),
    message!(INTERFACE_EXTENDS, Error),
    message!(INCORPORATE_NOT_MIXIN, Error),
    message!(ANNOTATION_NOT_MIXIN, Error),
    message!(MIXIN_INTO_INCOMPATIBLE, Error),
    message!(IMPLEMENTS_MIXIN, Error),
    message!(CONTRIBUTION_DUPLICATE, Warning),
    message!(CONTRIBUTION_CYCLICAL, Error),
    message!(INTO_NOT_MIXIN, Error),
    message!(TYPE_PARAMS_TOO_MANY, Error),
    message!(TYPE_PARAM_CONSTRAINT, Error),
    message!(TYPE_PARAM_INCOMPATIBLE, Error),
    message!(TYPE_PARAM_PROPERTY_CONFLICT, Error),
    message!(SUPER_AMBIGUOUS, Error),
    message!(OVERRIDE_MISSING_SUPER, Error),
    message!(PROPERTY_TYPE_INCOMPATIBLE, Error),
    message!(VIRTUAL_CHILD_MISSING, Error),
    message!(DELEGATE_PROPERTY_MISSING, Error),
    message!(TYPEDEF_CYCLICAL, Error),
];
