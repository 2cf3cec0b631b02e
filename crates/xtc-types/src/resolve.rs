//! Two-phase name resolution.
//!
//! The front end hands over type expressions as [`TypeExpr`] trees that
//! still refer to types by name. [`TypeResolver::resolve_type_expr`] interns
//! them bottom-up; names no scope knows yet become `Unresolved` placeholder
//! types. Once more declarations are registered,
//! [`TypeResolver::resolve_pending`] binds the placeholders, after which
//! every engine operation sees through them.

use crate::identity::IdentityData;
use crate::pool::{ConstantPool, ResolveError};
use crate::types::{Access, IdentityId, PlaceholderId, TypeId};
use tracing::{debug, trace};

/// An unresolved type expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    /// A simple or dotted name (`Int`, `Map`, `Outer.Inner`).
    Named(String),
    Parameterized(Box<TypeExpr>, Vec<TypeExpr>),
    Annotated {
        annotation: Box<TypeExpr>,
        base: Box<TypeExpr>,
    },
    Immutable(Box<TypeExpr>),
    Access(Box<TypeExpr>, Access),
    /// Virtual child `parent.Name`.
    Child(Box<TypeExpr>, String),
    Intersection(Box<TypeExpr>, Box<TypeExpr>),
    Union(Box<TypeExpr>, Box<TypeExpr>),
    Difference(Box<TypeExpr>, Box<TypeExpr>),
    /// `this:class` of the given class.
    ThisClass(IdentityId),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named(name.to_string())
    }

    pub fn of(self, params: Vec<TypeExpr>) -> Self {
        TypeExpr::Parameterized(Box::new(self), params)
    }
}

/// Maps a name to a type in some lexical context.
pub trait NameScope {
    fn lookup(&self, pool: &ConstantPool, name: &str) -> Option<TypeId>;
}

/// Names visible from inside a class: its type parameters, then classes and
/// typedefs nested in it or in any enclosing declaration, then the core
/// module.
#[derive(Clone, Copy, Debug)]
pub struct ClassScope {
    pub class: IdentityId,
}

impl ClassScope {
    pub fn new(class: IdentityId) -> Self {
        Self { class }
    }

    fn lookup_simple(&self, pool: &ConstantPool, name: &str) -> Option<TypeId> {
        let atom = pool.intern_name(name);
        let is_type_param = pool
            .structure(self.class)
            .is_some_and(|s| s.type_param(atom).is_some());
        if is_type_param {
            return Some(pool.formal_property_type(pool.property_identity_atom(self.class, atom)));
        }
        let mut container = Some(self.class);
        while let Some(step) = container {
            if let Some(found) = member_type(pool, step, atom) {
                return Some(found);
            }
            container = pool.parent(step);
        }
        member_type(pool, pool.core().module, atom)
    }
}

/// A class or typedef named `name` declared directly under `container`.
fn member_type(pool: &ConstantPool, container: IdentityId, name: xtc_common::Atom) -> Option<TypeId> {
    if let Some(class) = pool.lookup_identity(IdentityData::Class { parent: container, name }) {
        return Some(pool.class_type(class));
    }
    pool.lookup_identity(IdentityData::Typedef { parent: container, name })
        .map(|typedef| pool.typedef_type(typedef))
}

impl NameScope for ClassScope {
    fn lookup(&self, pool: &ConstantPool, name: &str) -> Option<TypeId> {
        let mut segments = name.split('.');
        let first = segments.next()?;
        let mut current = self.lookup_simple(pool, first)?;
        for segment in segments {
            let class = pool.terminal_class(current)?;
            current = member_type(pool, class, pool.intern_name(segment))?;
        }
        Some(current)
    }
}

/// A name waiting for the second resolution phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingName {
    pub placeholder: PlaceholderId,
    pub name: String,
}

/// Interns type expressions against a pool, collecting names it could not
/// resolve yet.
pub struct TypeResolver<'p> {
    pool: &'p ConstantPool,
    pending: Vec<PendingName>,
}

impl<'p> TypeResolver<'p> {
    pub fn new(pool: &'p ConstantPool) -> Self {
        Self {
            pool,
            pending: Vec::new(),
        }
    }

    /// Intern `expr`; unknown names become placeholder types.
    pub fn resolve_type_expr(&mut self, expr: &TypeExpr, scope: &dyn NameScope) -> TypeId {
        let pool = self.pool;
        match expr {
            TypeExpr::Named(name) => match scope.lookup(pool, name) {
                Some(t) => t,
                None => {
                    let (placeholder, t) = pool.unresolved_type(name);
                    trace!(name = %name, placeholder = placeholder.0, "name deferred");
                    self.pending.push(PendingName {
                        placeholder,
                        name: name.clone(),
                    });
                    t
                }
            },
            TypeExpr::Parameterized(base, params) => {
                let base = self.resolve_type_expr(base, scope);
                let params = params.iter().map(|p| self.resolve_type_expr(p, scope)).collect();
                pool.parameterized_type(base, params)
            }
            TypeExpr::Annotated { annotation, base } => {
                let annotation = self.resolve_type_expr(annotation, scope);
                let base = self.resolve_type_expr(base, scope);
                pool.annotated_type(annotation, base)
            }
            TypeExpr::Immutable(base) => {
                let base = self.resolve_type_expr(base, scope);
                pool.immutable_type(base)
            }
            TypeExpr::Access(base, access) => {
                let base = self.resolve_type_expr(base, scope);
                pool.access_type(base, *access)
            }
            TypeExpr::Child(parent, name) => {
                let parent = self.resolve_type_expr(parent, scope);
                pool.virtual_child_type(parent, pool.intern_name(name))
            }
            TypeExpr::Intersection(a, b) => {
                let (a, b) = (self.resolve_type_expr(a, scope), self.resolve_type_expr(b, scope));
                pool.intersection_type(a, b)
            }
            TypeExpr::Union(a, b) => {
                let (a, b) = (self.resolve_type_expr(a, scope), self.resolve_type_expr(b, scope));
                pool.union_type(a, b)
            }
            TypeExpr::Difference(a, b) => {
                let (a, b) = (self.resolve_type_expr(a, scope), self.resolve_type_expr(b, scope));
                pool.difference_type(a, b)
            }
            TypeExpr::ThisClass(class) => pool.this_class_type(*class),
        }
    }

    pub fn pending(&self) -> &[PendingName] {
        &self.pending
    }

    /// Second phase: bind every pending placeholder `scope` can now resolve.
    ///
    /// Names that still cannot be resolved stay pending and are reported as
    /// [`ResolveError::UnknownName`].
    pub fn resolve_pending(&mut self, scope: &dyn NameScope) -> Result<(), Vec<ResolveError>> {
        let pool = self.pool;
        let mut errors = Vec::new();
        let mut still_pending = Vec::new();
        for pending in self.pending.drain(..) {
            match scope.lookup(pool, &pending.name) {
                Some(target) => {
                    if let Err(err) = pool.resolve_placeholder(pending.placeholder, target) {
                        errors.push(err);
                    }
                }
                None => {
                    errors.push(ResolveError::UnknownName(pending.name.clone()));
                    still_pending.push(pending);
                }
            }
        }
        self.pending = still_pending;
        if errors.is_empty() {
            Ok(())
        } else {
            debug!(errors = errors.len(), "resolve_pending - names left unresolved");
            Err(errors)
        }
    }
}

#[cfg(test)]
#[path = "../tests/resolve_tests.rs"]
mod tests;
