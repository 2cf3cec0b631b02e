//! Generic substitution and auto-narrowing.
//!
//! `resolve_generics` replaces formal types (class type parameters, method
//! type parameters and formal children) with the actual types a
//! [`GenericTypeResolver`] supplies. `resolve_auto_narrowing` replaces
//! `this:class` with a concrete type.

use crate::pool::ConstantPool;
use crate::recursion::{DepthCounter, RecursionProfile};
use crate::types::{IdentityId, SignatureData, SignatureId, TerminalType, TypeData, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Mutex, PoisonError};
use xtc_common::interner::Atom;

/// Supplies actual types for formal types.
pub trait GenericTypeResolver {
    /// The actual type for `formal`, or `None` to leave it unchanged.
    fn resolve(&self, pool: &ConstantPool, formal: TypeId) -> Option<TypeId>;

    /// True if `t` was produced by this resolver and must not be rewritten
    /// again.
    fn produced(&self, _t: TypeId) -> bool {
        false
    }

    /// Remember a type this resolver produced.
    fn record(&self, _t: TypeId) {}
}

/// Name-keyed bindings of formal types to actual types.
///
/// Remembers every type it produced, so running `resolve_generics` twice
/// with the same instance yields the same result as running it once.
#[derive(Debug, Default)]
pub struct Bindings {
    actual: FxHashMap<Atom, TypeId>,
    produced: Mutex<FxHashSet<TypeId>>,
}

impl Clone for Bindings {
    fn clone(&self) -> Self {
        Self {
            actual: self.actual.clone(),
            produced: Mutex::new(FxHashSet::default()),
        }
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: Atom, actual: TypeId) {
        self.actual.insert(name, actual);
    }

    pub fn with(mut self, name: Atom, actual: TypeId) -> Self {
        self.bind(name, actual);
        self
    }

    pub fn get(&self, name: Atom) -> Option<TypeId> {
        self.actual.get(&name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }

    /// Bindings carried by a (possibly parameterized) class type: each
    /// declared type parameter is bound to its actual type, or to its
    /// constraint when no actual was supplied. A virtual child also sees
    /// the bindings of its parent.
    pub fn of_type(pool: &ConstantPool, t: TypeId) -> Self {
        let mut bindings = Self::new();
        bindings.collect(pool, pool.dereference(t), 0);
        bindings
    }

    fn collect(&mut self, pool: &ConstantPool, t: TypeId, depth: u32) {
        if depth > RecursionProfile::GenericResolution.max_depth() {
            return;
        }
        match pool.type_data(t) {
            TypeData::Annotated { base, .. } | TypeData::Immutable(base) | TypeData::Access { base, .. } => {
                self.collect(pool, base, depth + 1);
            }
            TypeData::VirtualChild { parent, .. } => {
                self.collect(pool, pool.dereference(parent), depth + 1);
                if let Some(child) = pool.class_of(t) {
                    self.collect_declared(pool, child, &[]);
                }
            }
            _ => {
                if let Some(class) = pool.terminal_class(t) {
                    let params = pool.type_params(t);
                    self.collect_declared(pool, class, &params);
                }
            }
        }
    }

    fn collect_declared(&mut self, pool: &ConstantPool, class: IdentityId, actual: &[TypeId]) {
        let Some(structure) = pool.structure(class) else {
            return;
        };
        for (i, param) in structure.type_params.iter().enumerate() {
            let value = actual.get(i).copied().unwrap_or(param.constraint);
            self.actual.insert(param.name, value);
        }
    }
}

impl GenericTypeResolver for Bindings {
    fn resolve(&self, pool: &ConstantPool, formal: TypeId) -> Option<TypeId> {
        pool.formal_name(formal).and_then(|name| self.get(name))
    }

    fn produced(&self, t: TypeId) -> bool {
        self.produced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&t)
    }

    fn record(&self, t: TypeId) {
        self.produced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(t);
    }
}

impl ConstantPool {
    /// Substitute formal types in `t` with the resolver's actual types.
    pub fn resolve_generics(&self, t: TypeId, resolver: &dyn GenericTypeResolver) -> TypeId {
        let mut depth = DepthCounter::with_profile(RecursionProfile::GenericResolution);
        self.resolve_generics_in(t, resolver, &mut depth)
    }

    fn resolve_generics_in(
        &self,
        t: TypeId,
        resolver: &dyn GenericTypeResolver,
        depth: &mut DepthCounter,
    ) -> TypeId {
        if resolver.produced(t) || !depth.enter() {
            return t;
        }
        let result = match self.type_data(t) {
            TypeData::Terminal(TerminalType::FormalProperty(_) | TerminalType::TypeParameter(_)) => {
                resolver.resolve(self, t).unwrap_or(t)
            }
            TypeData::Terminal(TerminalType::FormalChild(child)) => self
                .resolve_formal_child(child, resolver, depth)
                .unwrap_or(t),
            TypeData::Terminal(_) => t,
            TypeData::Unresolved(ph) => match self.placeholder_target(ph) {
                Some(target) => self.resolve_generics_in(target, resolver, depth),
                None => t,
            },
            _ => self.map_type(t, |child| self.resolve_generics_in(child, resolver, depth)),
        };
        depth.leave();
        if result != t {
            resolver.record(result);
        }
        result
    }

    /// `Element.Key`: resolve `Element`, then take the actual type of the
    /// resolved class's `Key` parameter.
    fn resolve_formal_child(
        &self,
        child: IdentityId,
        resolver: &dyn GenericTypeResolver,
        depth: &mut DepthCounter,
    ) -> Option<TypeId> {
        let parent = self.parent(child)?;
        let parent_type = match self.identity_kind(parent) {
            crate::identity::IdentityKind::Property => self.formal_property_type(parent),
            crate::identity::IdentityKind::TypeParameter => self.type_parameter_type(parent),
            crate::identity::IdentityKind::FormalTypeChild => self.formal_child_type(parent),
            _ => return None,
        };
        let actual_parent = self.resolve_generics_in(parent_type, resolver, depth);
        if actual_parent == parent_type {
            return None;
        }
        let class = self.terminal_class(actual_parent)?;
        let structure = self.structure(class)?;
        let name = self.identity_name(child);
        let index = structure.type_param_index(name)?;
        let actual = self.type_params(actual_parent);
        Some(
            actual
                .get(index)
                .copied()
                .unwrap_or(structure.type_params[index].constraint),
        )
    }

    pub fn resolve_signature_generics(
        &self,
        signature: SignatureId,
        resolver: &dyn GenericTypeResolver,
    ) -> SignatureId {
        self.map_signature(signature, |t| self.resolve_generics(t, resolver))
    }

    // =========================================================================
    // Auto-narrowing
    // =========================================================================

    /// Replace `this:class` in `t`.
    ///
    /// With a target, a plain `this:class` becomes the target; a
    /// parameterized one keeps its own parameters on the target's class when
    /// `retain_params` is set, and becomes the target otherwise. Without a
    /// target, `this:class` becomes its declaring class. Wrappers and type
    /// parameters of other types are rewritten in place.
    pub fn resolve_auto_narrowing(&self, t: TypeId, retain_params: bool, target: Option<TypeId>) -> TypeId {
        let mut depth = DepthCounter::with_profile(RecursionProfile::GenericResolution);
        self.resolve_auto_narrowing_in(t, retain_params, target, &mut depth)
    }

    fn resolve_auto_narrowing_in(
        &self,
        t: TypeId,
        retain_params: bool,
        target: Option<TypeId>,
        depth: &mut DepthCounter,
    ) -> TypeId {
        if !depth.enter() {
            return t;
        }
        let result = match self.type_data(t) {
            TypeData::Terminal(TerminalType::ThisClass(class)) => {
                target.unwrap_or_else(|| self.class_type(class))
            }
            TypeData::Parameterized { base, params } => match self.type_data(base) {
                TypeData::Terminal(TerminalType::ThisClass(class)) => {
                    let params: Vec<TypeId> = self
                        .type_list(params)
                        .iter()
                        .map(|&p| self.resolve_auto_narrowing_in(p, retain_params, target, depth))
                        .collect();
                    match target {
                        None => self.parameterized_type(self.class_type(class), params),
                        Some(target) if retain_params => {
                            let narrowed = self.terminal_class(target).unwrap_or(class);
                            self.parameterized_type(self.class_type(narrowed), params)
                        }
                        Some(target) => target,
                    }
                }
                _ => self.map_type(t, |child| {
                    self.resolve_auto_narrowing_in(child, retain_params, target, depth)
                }),
            },
            TypeData::Terminal(_) => t,
            _ => self.map_type(t, |child| {
                self.resolve_auto_narrowing_in(child, retain_params, target, depth)
            }),
        };
        depth.leave();
        result
    }

    pub fn resolve_signature_auto_narrowing(&self, signature: SignatureId, target: Option<TypeId>) -> SignatureId {
        self.map_signature(signature, |t| self.resolve_auto_narrowing(t, false, target))
    }

    /// True if `this:class` occurs anywhere in `t`.
    pub fn is_auto_narrowing(&self, t: TypeId) -> bool {
        match self.type_data(self.dereference(t)) {
            TypeData::Terminal(TerminalType::ThisClass(_)) => true,
            TypeData::Terminal(_) | TypeData::Unresolved(_) => false,
            TypeData::Parameterized { base, params } => {
                self.is_auto_narrowing(base) || self.type_list(params).iter().any(|&p| self.is_auto_narrowing(p))
            }
            TypeData::Annotated { annotation, base } => {
                self.is_auto_narrowing(annotation) || self.is_auto_narrowing(base)
            }
            TypeData::Immutable(base) | TypeData::Access { base, .. } => self.is_auto_narrowing(base),
            TypeData::VirtualChild { parent, .. } => self.is_auto_narrowing(parent),
            TypeData::Intersection(a, b) | TypeData::Union(a, b) | TypeData::Difference(a, b) => {
                self.is_auto_narrowing(a) || self.is_auto_narrowing(b)
            }
        }
    }

    /// Rewrite every parameter and return type of a signature.
    pub(crate) fn map_signature(&self, signature: SignatureId, mut f: impl FnMut(TypeId) -> TypeId) -> SignatureId {
        let data = self.signature(signature);
        let old_params = self.type_list(data.params);
        let old_returns = self.type_list(data.returns);
        let params: Vec<TypeId> = old_params.iter().map(|&t| f(t)).collect();
        let returns: Vec<TypeId> = old_returns.iter().map(|&t| f(t)).collect();
        if params[..] == old_params[..] && returns[..] == old_returns[..] {
            return signature;
        }
        self.intern_signature(SignatureData {
            name: data.name,
            params: self.intern_type_list(params),
            returns: self.intern_type_list(returns),
        })
    }
}

#[cfg(test)]
#[path = "../tests/generics_tests.rs"]
mod tests;
