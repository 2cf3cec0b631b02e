//! Member collection.
//!
//! Members are layered bottom up: the processing list is walked from its
//! last entry to its first, and each contributor's members are laid on top
//! of what is already there. The class's own members go in at the `Equal`
//! entry, so annotations end up above the class and everything it extends or
//! implements below it.

use super::ClassBuilder;
use super::contributions::Contribution;
use crate::diagnostics::DiagnosticArg;
use crate::identity::{NestedIdentity, Segment};
use crate::structure::{Composition, Format, PropertyDecl, PropertyFlags};
use crate::type_info::{MethodBody, MethodInfo, PropertyBody, PropertyInfo, TypeInfo};
use crate::types::{Access, IdentityId, TypeId};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;
use xtc_common::diagnostics::diagnostic_codes;
use xtc_common::interner::Atom;

/// Lay every member of `source` on top of `target`. Top-level members are
/// limited to bodies whose origin is in `origins`, when given.
pub(super) fn layer_members(target: &mut TypeInfo, source: &TypeInfo, origins: Option<&FxHashSet<IdentityId>>) {
    for (nid, property) in &source.properties {
        let property = match origins {
            Some(origins) if nid.is_top_level() => match property.retain_only(origins) {
                Some(kept) => kept,
                None => continue,
            },
            _ => property.clone(),
        };
        let layered = match target.properties.get(nid) {
            Some(existing) => property.layer_on(existing),
            None => property,
        };
        target.properties.insert(nid.clone(), layered);
    }
    for (nid, method) in &source.methods {
        let method = match origins {
            Some(origins) if nid.is_top_level() => match method.retain_only(origins) {
                Some(kept) => kept,
                None => continue,
            },
            _ => method.clone(),
        };
        let layered = match target.methods.get(nid) {
            Some(existing) => method.layer_on(existing),
            None => method,
        };
        target.methods.insert(nid.clone(), layered);
    }
}

impl ClassBuilder<'_, '_> {
    /// Walk the processing list bottom up and collect members.
    pub(super) fn merge_members(
        &mut self,
        contributions: &[(Contribution, Option<Arc<TypeInfo>>)],
        owned: &[FxHashSet<IdentityId>],
    ) {
        for ((contribution, info), origins) in contributions.iter().zip(owned).rev() {
            match (contribution.composition, info) {
                (Composition::Equal, _) => self.add_own_members(),
                (Composition::Into, _) | (_, None) => {}
                (Composition::Delegates, Some(info)) => {
                    self.info.dependencies.extend(info.dependencies.iter().copied());
                    self.add_delegated(info, contribution);
                }
                (_, Some(info)) => {
                    self.info.dependencies.extend(info.dependencies.iter().copied());
                    self.layer_contributor(info, origins);
                }
            }
        }
    }

    /// Lay a contributor's members on top, narrowing across contributors: a
    /// method that an existing method already narrows is capped to it.
    fn layer_contributor(&mut self, source: &TypeInfo, origins: &FxHashSet<IdentityId>) {
        let mut rest = source.clone();
        let mut capped = Vec::new();
        rest.methods.retain(|nid, method| {
            if !nid.is_top_level() || self.info.methods.contains_key(nid) {
                return true;
            }
            capped.push((nid.clone(), method.clone()));
            false
        });
        layer_members(&mut self.info, &rest, Some(origins));

        for (nid, method) in capped {
            let Some(method) = method.retain_only(origins) else {
                continue;
            };
            let signature = method.signature();
            let narrowing = if method.is_capped() || method.is_function() {
                None
            } else {
                self.find_narrowing(signature)
            };
            let method = match narrowing {
                Some(target) => match self.info.methods.get(&target) {
                    Some(narrower) => {
                        let head = narrower.head().clone();
                        method.cap_with(target, &head)
                    }
                    None => method,
                },
                None => method,
            };
            self.info.methods.insert(nid, method);
        }
    }

    /// Bodies that forward the delegate interface's methods to a property.
    fn add_delegated(&mut self, source: &TypeInfo, contribution: &Contribution) {
        let Some(property) = contribution.delegate else {
            layer_members(&mut self.info, source, None);
            return;
        };
        let declared = self.structure.property(property).is_some()
            || self.info.find_property(property).is_some();
        if !declared {
            self.report(
                diagnostic_codes::DELEGATE_PROPERTY_MISSING,
                vec![
                    DiagnosticArg::Identity(self.class),
                    DiagnosticArg::Type(contribution.type_id),
                    DiagnosticArg::Atom(property),
                ],
            );
            layer_members(&mut self.info, source, None);
            return;
        }

        let mut delegated = source.clone();
        for (nid, method) in delegated.methods.iter_mut() {
            if !nid.is_top_level()
                || method.is_function()
                || method.is_capped()
                || method.access() != Access::Public
            {
                continue;
            }
            let head = method.head();
            let body = MethodBody {
                identity: head.identity,
                origin: self.class,
                signature: method.signature(),
                implementation: crate::structure::Implementation::Delegating,
                access: Access::Public,
                flags: head.flags,
                default_params: head.default_params,
                op: head.op,
                delegate: Some(property),
                narrowed_to: None,
            };
            *method = MethodInfo::new(body).layer_on(method);
        }
        layer_members(&mut self.info, &delegated, None);
    }

    // -------------------------------------------------------------------------
    // Own members
    // -------------------------------------------------------------------------

    pub(super) fn add_own_members(&mut self) {
        let structure = Arc::clone(&self.structure);
        let shadowed = self.add_formal_properties();
        for property in &structure.properties {
            if shadowed.contains(&property.name) {
                continue;
            }
            self.add_own_property(property);
        }
        for method in &structure.methods {
            self.add_own_method(method);
        }
    }

    /// A `Type<actual>` constant for each declared type parameter. Returns
    /// the names a declared property may no longer use.
    fn add_formal_properties(&mut self) -> FxHashSet<Atom> {
        let pool = self.pool;
        let structure = Arc::clone(&self.structure);
        let type_class = pool.class_type(pool.core().type_class);
        let mut names = FxHashSet::default();
        for decl in &structure.type_params {
            if structure.property(decl.name).is_some() {
                self.report(
                    diagnostic_codes::TYPE_PARAM_PROPERTY_CONFLICT,
                    vec![DiagnosticArg::Atom(decl.name), DiagnosticArg::Identity(self.class)],
                );
            }
            names.insert(decl.name);
            let actual = self.info.type_param(decl.name).unwrap_or(decl.constraint);
            let body = PropertyBody {
                identity: pool.property_identity_atom(self.class, decl.name),
                origin: self.class,
                name: decl.name,
                type_id: pool.parameterized_type(type_class, vec![actual]),
                access: Access::Public,
                flags: PropertyFlags::CONSTANT | PropertyFlags::READ_ONLY,
                formal: true,
            };
            self.layer_property(NestedIdentity::property(decl.name), PropertyInfo::new(body));
        }
        names
    }

    fn add_own_property(&mut self, decl: &PropertyDecl) {
        let pool = self.pool;
        let nid = NestedIdentity::property(decl.name);
        let type_id = pool.resolve_generics(decl.type_id, &self.bindings);

        let inherited = self
            .info
            .properties
            .get(&nid)
            .filter(|p| !p.is_formal())
            .map(PropertyInfo::type_id);
        if let Some(inherited) = inherited {
            if !self.check_is_a(type_id, inherited) {
                self.report(
                    diagnostic_codes::PROPERTY_TYPE_INCOMPATIBLE,
                    vec![
                        DiagnosticArg::Identity(decl.identity),
                        DiagnosticArg::Identity(self.class),
                        DiagnosticArg::Type(type_id),
                        DiagnosticArg::Type(inherited),
                    ],
                );
            }
        }

        let body = PropertyBody {
            identity: decl.identity,
            origin: self.class,
            name: decl.name,
            type_id,
            access: decl.access,
            flags: decl.flags,
            formal: false,
        };
        let mut property = PropertyInfo::new(body);
        if decl.needs_explosion() {
            let layers = self.explode_property(&nid, decl, type_id);
            property = property.with_ref_layers(layers);
        }
        self.layer_property(nid, property);
    }

    fn layer_property(&mut self, nid: NestedIdentity, property: PropertyInfo) {
        let layered = match self.info.properties.get(&nid) {
            Some(existing) => property.layer_on(existing),
            None => property,
        };
        self.info.properties.insert(nid, layered);
    }

    /// Give a property its own `Ref`/`Var` chain: the `Ref<T>` (read-only) or
    /// `Var<T>` base at the bottom, each annotation mixin above it in
    /// declaration order, and the property's own accessor code on top.
    /// Returns the layer types, bottom first.
    fn explode_property(&mut self, nid: &NestedIdentity, decl: &PropertyDecl, type_id: TypeId) -> Vec<TypeId> {
        let pool = self.pool;
        let core = pool.core();
        let base_class = if decl.is_read_only() {
            core.ref_class
        } else {
            core.var_class
        };
        let base = pool.parameterized_type(pool.class_type(base_class), vec![type_id]);
        let mut layers = vec![base];
        match self.ctx.ensure_type_info_internal(base) {
            Some(info) => {
                if !info.is_complete() {
                    self.incomplete = true;
                }
                self.layer_accessors(nid, &info);
            }
            None => self.incomplete = true,
        }

        for &annotation in &decl.annotations {
            let annotation = self.property_annotation(annotation, type_id);
            let mixin = pool.class_of(annotation);
            if mixin.and_then(|m| pool.format_of(m)) != Some(Format::Mixin) {
                self.report(
                    diagnostic_codes::ANNOTATION_NOT_MIXIN,
                    vec![DiagnosticArg::Type(annotation), DiagnosticArg::Identity(decl.identity)],
                );
                continue;
            }
            let into = self.mixin_into(annotation);
            if !self.check_is_a(base, into) {
                self.report(
                    diagnostic_codes::MIXIN_INTO_INCOMPATIBLE,
                    vec![
                        DiagnosticArg::Type(annotation),
                        DiagnosticArg::Type(base),
                        DiagnosticArg::Type(into),
                    ],
                );
                continue;
            }
            let view = pool.access_type(annotation, Access::Protected);
            match self.ctx.ensure_type_info_internal(view) {
                Some(info) => {
                    if !info.is_complete() {
                        self.incomplete = true;
                    }
                    self.info.dependencies.extend(info.dependencies.iter().copied());
                    self.layer_accessors(nid, &info);
                    layers.push(annotation);
                }
                None => self.incomplete = true,
            }
        }

        for method in &decl.methods {
            let signature = pool.resolve_signature_generics(method.signature, &self.bindings);
            let body = MethodBody {
                identity: method.identity,
                origin: self.class,
                signature,
                implementation: method.implementation,
                access: method.access,
                flags: method.flags,
                default_params: method.default_params,
                op: method.op,
                delegate: None,
                narrowed_to: None,
            };
            let key = nid.child(Segment::Method(signature));
            let layered = match self.info.methods.get(&key) {
                Some(existing) => MethodInfo::new(body).layer_on(existing),
                None => MethodInfo::new(body),
            };
            self.info.methods.insert(key, layered);
        }
        trace!(
            property = %pool.name_text(decl.name),
            layers = layers.len(),
            "explode_property"
        );
        layers
    }

    /// Lay the top-level methods of a Ref/Var layer under the property.
    fn layer_accessors(&mut self, nid: &NestedIdentity, layer: &TypeInfo) {
        for (member, method) in &layer.methods {
            if !member.is_top_level() || method.is_function() {
                continue;
            }
            let key = nid.child(Segment::Method(method.signature()));
            let layered = match self.info.methods.get(&key) {
                Some(existing) => method.layer_on(existing),
                None => method.clone(),
            };
            self.info.methods.insert(key, layered);
        }
    }

    /// An unparameterized property annotation applies to the property's
    /// type: `@Lazy Int` means `Lazy<Int>`.
    fn property_annotation(&self, annotation: TypeId, type_id: TypeId) -> TypeId {
        let pool = self.pool;
        if !pool.type_params(annotation).is_empty() {
            return annotation;
        }
        match pool.terminal_class(annotation).and_then(|m| pool.structure(m)) {
            Some(structure) if !structure.type_params.is_empty() => {
                pool.normalize(pool.parameterized_type(annotation, vec![type_id]))
            }
            _ => annotation,
        }
    }
}
