//! Type-Constant Resolution for the XTC Object Model
//!
//! This crate answers the questions a compiler and a runtime ask about
//! types once the class structures are loaded:
//!
//! - **Identities**: interned constants for modules, classes, properties,
//!   methods and typedefs, plus the nested identities members are keyed by
//! - **Type constants**: interned `TypeId`s with structural queries,
//!   typedef resolution, generic substitution and normalization
//! - **isA**: the assignability relation with coinductive cycle handling and
//!   per-context caches, and the formal-type usage queries
//! - **TypeInfo**: the flattened view of a type (call chains, exploded
//!   properties, narrowing caps) built with deferral and bounded retry
//! - **Dispatch**: call and property chains a runtime follows
//!
//! Everything is owned by a [`ConstantPool`]; resolution state lives in a
//! [`ResolutionContext`] borrowed from it.
pub mod bootstrap;
mod builder;
pub mod context;
pub mod diagnostics;
pub mod dispatch;
pub mod factory;
pub mod format;
pub mod generics;
pub mod identity;
pub mod normalize;
pub mod pool;
mod query_trace;
pub mod recursion;
pub mod relation;
pub mod resolve;
pub mod structure;
pub mod type_info;
pub mod types;

pub use bootstrap::CoreTypes;
pub use context::ResolutionContext;
pub use diagnostics::{
    DiagnosticArg, DiagnosticCollector, DiagnosticSeverity, DiagnosticSink, PendingDiagnostic,
    SilentSink,
};
pub use dispatch::{CallChain, PropertyChain, resolve_call_chain, resolve_property_chain};
pub use format::TypeFormatter;
pub use generics::{Bindings, GenericTypeResolver};
pub use identity::{IdentityKind, NestedIdentity, Segment};
pub use pool::{ConstantPool, ResolveError};
pub use relation::Relation;
pub use resolve::{TypeExpr, TypeResolver};
pub use structure::{
    ClassStructure, Composition, ContributionDecl, Format, Implementation, MethodDecl, MethodFlags,
    PropertyDecl, PropertyFlags,
};
pub use type_info::{MethodBody, MethodInfo, Origin, Progress, PropertyInfo, TypeInfo};
pub use types::{
    Access, IdentityId, PlaceholderId, SignatureId, TerminalType, TypeData, TypeId, TypeListId,
};

// Test modules: most are loaded by their source files via #[path = "../tests/..."].
#[cfg(test)]
#[path = "../tests/test_fixtures.rs"]
mod test_fixtures;

#[cfg(test)]
#[path = "../tests/usage_tests.rs"]
mod usage_tests;

#[cfg(test)]
#[path = "../tests/diagnostics_tests.rs"]
mod diagnostics_tests;
