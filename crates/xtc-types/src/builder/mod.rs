//! TypeInfo construction.
//!
//! `build_type_info` dispatches on the shape of a normalized type. Classes
//! (plain, parameterized and virtual children) get a canonical private build
//! by [`ClassBuilder`]; every other access view, and every modifier, is
//! derived from another type's info. The canonical build runs in steps:
//!
//! 1. resolve the type parameters against the actual types;
//! 2. collect and validate the contributions (`contributions.rs`);
//! 3. fetch each contribution's protected info;
//! 4. merge the class and default chains, top first (`chains.rs`);
//! 5. layer members bottom up, adding the class's own members at its
//!    position in the list (`members.rs`, `narrowing.rs`);
//! 6. merge conditional incorporates whose conditions hold (`mixins.rs`).

mod chains;
mod contributions;
mod members;
mod mixins;
mod narrowing;

use crate::context::ResolutionContext;
use crate::diagnostics::{DiagnosticArg, PendingDiagnostic};
use crate::generics::Bindings;
use crate::identity::NestedIdentity;
use crate::pool::ConstantPool;
use crate::structure::{ClassStructure, Format};
use crate::type_info::{MethodInfo, ParamInfo, Progress, TypeInfo};
use crate::types::{Access, IdentityId, TerminalType, TypeData, TypeId};
use contributions::Contribution;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, trace};
use xtc_common::diagnostics::diagnostic_codes;
use xtc_common::interner::Atom;

impl ResolutionContext<'_> {
    /// Build the TypeInfo of a normalized type. Never cached here; see
    /// `ensure_type_info`.
    pub(crate) fn build_type_info(&self, t: TypeId) -> TypeInfo {
        let pool = self.pool();
        let count = pool.invalidation_count();
        let mut info = match pool.type_data(t) {
            TypeData::Terminal(TerminalType::Class(_))
            | TypeData::Parameterized { .. }
            | TypeData::VirtualChild { .. } => self.build_view(t, t, Access::Public),
            TypeData::Access { base, access } => self.build_view(t, base, access),
            TypeData::Immutable(base) => {
                let mut info = self.derive(t, base);
                info.immutable = true;
                info
            }
            TypeData::Annotated { annotation, base } => self.build_annotated(t, annotation, base),
            TypeData::Intersection(..) | TypeData::Union(..) | TypeData::Difference(..) => {
                self.build_relational(t)
            }
            TypeData::Terminal(
                TerminalType::FormalProperty(_)
                | TerminalType::TypeParameter(_)
                | TerminalType::FormalChild(_),
            ) => self.derive(t, self.formal_constraint(t)),
            TypeData::Terminal(_) | TypeData::Unresolved(_) => self.derive(t, pool.core().object_type),
        };
        info.invalidation_count = count;
        info.reindex();
        info
    }

    /// `base` seen through `view`. The private view of a class is the
    /// canonical build; other views strip members from it.
    fn build_view(&self, t: TypeId, base: TypeId, view: Access) -> TypeInfo {
        let pool = self.pool();
        let class = match pool.type_data(base) {
            TypeData::VirtualChild { parent, name } => {
                let found = pool
                    .class_of(parent)
                    .and_then(|parent_class| pool.find_virtual_child(parent_class, name));
                if found.is_none() {
                    self.report(PendingDiagnostic::error(
                        diagnostic_codes::VIRTUAL_CHILD_MISSING,
                        vec![DiagnosticArg::Type(parent), DiagnosticArg::Atom(name)],
                    ));
                    return self.derive(t, pool.core().object_type);
                }
                found
            }
            TypeData::Terminal(TerminalType::Class(class)) => Some(class),
            TypeData::Parameterized { .. } => pool.terminal_class(base),
            _ => None,
        };
        let Some(class) = class else {
            // a view of a non-class type: strip members from its info
            let mut info = self.derive(t, base);
            apply_view(&mut info, view);
            return info;
        };
        if view == Access::Private {
            return ClassBuilder::new(self, t, base, class).build();
        }
        let mut info = self.derive(t, pool.access_type(base, Access::Private));
        apply_view(&mut info, view);
        info
    }

    /// A copy of `base`'s info answering for `t`.
    fn derive(&self, t: TypeId, base: TypeId) -> TypeInfo {
        match self.ensure_type_info_internal(base) {
            Some(info) => {
                let mut info = TypeInfo::clone(&info);
                info.type_id = t;
                info
            }
            None => self.incomplete_info(t),
        }
    }

    fn incomplete_info(&self, t: TypeId) -> TypeInfo {
        let mut info = TypeInfo::empty(t, self.pool().core().object, Format::Class);
        info.progress = Progress::Incomplete;
        info
    }

    /// `is_a` for checks made while building. `None` when the answer is
    /// negative but was computed against info that is still being built.
    pub(crate) fn check_is_a(&self, source: TypeId, target: TypeId) -> Option<bool> {
        let before = self.with_thread_state(|s| (s.blocked, s.provisional));
        if self.is_a(source, target).is_compatible() {
            return Some(true);
        }
        let after = self.with_thread_state(|s| (s.blocked, s.provisional));
        if after == before { Some(false) } else { None }
    }

    /// Members of two types combined: an intersection has the members of
    /// either side, a union those common to both, and a difference those of
    /// the left side missing on the right.
    fn build_relational(&self, t: TypeId) -> TypeInfo {
        let pool = self.pool();
        let data = pool.type_data(t);
        let (a, b) = match data {
            TypeData::Intersection(a, b) | TypeData::Union(a, b) | TypeData::Difference(a, b) => (a, b),
            _ => return self.derive(t, pool.core().object_type),
        };
        let (Some(left), Some(right)) = (
            self.ensure_type_info_internal(a),
            self.ensure_type_info_internal(b),
        ) else {
            return self.incomplete_info(t);
        };

        let mut info = TypeInfo::empty(t, pool.core().object, Format::Interface);
        let keep = |in_right: bool| match data {
            TypeData::Intersection(..) => true,
            TypeData::Union(..) => in_right,
            _ => !in_right,
        };
        for (nid, method) in &left.methods {
            if keep(right.methods.contains_key(nid)) {
                info.methods.insert(nid.clone(), method.clone());
            }
        }
        for (nid, property) in &left.properties {
            if keep(right.properties.contains_key(nid)) {
                info.properties.insert(nid.clone(), property.clone());
            }
        }
        for (id, origin) in left.class_chain.iter().chain(&left.default_chain) {
            let shared = right.class_chain.contains_key(id) || right.default_chain.contains_key(id);
            if keep(shared) {
                info.default_chain.insert(*id, *origin);
            }
        }
        if let TypeData::Intersection(..) = data {
            for (nid, method) in &right.methods {
                info.methods.entry(nid.clone()).or_insert_with(|| method.clone());
            }
            for (nid, property) in &right.properties {
                info.properties.entry(nid.clone()).or_insert_with(|| property.clone());
            }
            for (id, origin) in right.class_chain.iter().chain(&right.default_chain) {
                info.default_chain.entry(*id).or_insert(*origin);
            }
        }
        info.type_params = left.type_params.clone();
        info.dependencies.extend(left.dependencies.iter().copied());
        info.dependencies.extend(right.dependencies.iter().copied());
        if !left.is_complete() || !right.is_complete() {
            info.progress = Progress::Incomplete;
        }
        trace!(
            type_id = t.0,
            methods = info.methods.len(),
            properties = info.properties.len(),
            "build_relational"
        );
        info
    }
}

/// Strip the members `view` cannot see from a private info.
///
/// `Struct` keeps what a structure holds: type parameters, constants,
/// fields, functions and constructors.
pub(crate) fn apply_view(info: &mut TypeInfo, view: Access) {
    info.access = view;
    match view {
        Access::Private => return,
        Access::Struct => {
            info.properties
                .retain(|nid, p| nid.is_top_level() && (p.is_formal() || p.is_constant() || p.has_field()));
            info.methods.retain(|nid, m| {
                let head = m.head();
                nid.is_top_level() && (head.is_function() || head.is_constructor())
            });
        }
        Access::Public | Access::Protected => {
            let hidden: Vec<NestedIdentity> = info
                .properties
                .iter()
                .filter(|(_, p)| !p.access().is_visible_from(view))
                .map(|(nid, _)| nid.clone())
                .collect();
            info.properties
                .retain(|nid, p| p.access().is_visible_from(view) && !hidden.iter().any(|h| nid.is_nested_in(h)));
            info.methods.retain(|nid, m| {
                m.access().is_visible_from(view) && !hidden.iter().any(|h| nid.is_nested_in(h))
            });
        }
    }
    // a cap pointing at a method this view removed no longer redirects
    let orphaned: Vec<NestedIdentity> = info
        .methods
        .iter()
        .filter(|(_, m)| m.capped_target().is_some_and(|target| !info.methods.contains_key(target)))
        .map(|(nid, _)| nid.clone())
        .collect();
    for nid in orphaned {
        let uncapped = info.methods.get(&nid).and_then(MethodInfo::without_cap);
        match uncapped {
            Some(method) => {
                info.methods.insert(nid, method);
            }
            None => {
                info.methods.shift_remove(&nid);
            }
        }
    }
}

// =============================================================================
// Class builder
// =============================================================================

/// State of one canonical (private) class build.
pub(super) struct ClassBuilder<'c, 'p> {
    ctx: &'c ResolutionContext<'p>,
    pool: &'p ConstantPool,
    /// The type being built (the private view).
    type_id: TypeId,
    /// The class type the view is of; contributions are resolved against it.
    this_type: TypeId,
    class: IdentityId,
    structure: Arc<ClassStructure>,
    bindings: Bindings,
    info: TypeInfo,
    incomplete: bool,
    /// Method names already reported as ambiguous.
    ambiguous: FxHashSet<Atom>,
}

impl<'c, 'p> ClassBuilder<'c, 'p> {
    fn new(ctx: &'c ResolutionContext<'p>, type_id: TypeId, this_type: TypeId, class: IdentityId) -> Self {
        let pool = ctx.pool();
        let structure = pool
            .structure(class)
            .unwrap_or_else(|| Arc::new(ClassStructure::new(class, Format::Class)));
        let mut info = TypeInfo::empty(type_id, class, structure.format);
        info.access = Access::Private;
        Self {
            ctx,
            pool,
            type_id,
            this_type,
            class,
            structure,
            bindings: Bindings::of_type(pool, this_type),
            info,
            incomplete: false,
            ambiguous: FxHashSet::default(),
        }
    }

    fn build(mut self) -> TypeInfo {
        self.resolve_type_params();
        let (contributions, conditional) = self.collect_contributions();

        let mut fetched: Vec<(Contribution, Option<Arc<TypeInfo>>)> = Vec::with_capacity(contributions.len());
        for contribution in contributions {
            let info = self.contribution_info(&contribution);
            fetched.push((contribution, info));
        }

        let owned = self.merge_chains(&fetched);
        self.merge_members(&fetched, &owned);
        self.apply_conditional_incorporates(&conditional);
        self.finish()
    }

    /// Report a diagnostic about this class.
    fn report(&self, code: u32, args: Vec<DiagnosticArg>) {
        self.ctx.report(PendingDiagnostic::error(code, args));
    }

    /// `is_a` for validation checks. A check that cannot be decided yet
    /// counts as satisfied; the dependent info is rebuilt anyway.
    fn check_is_a(&mut self, source: TypeId, target: TypeId) -> bool {
        match self.ctx.check_is_a(source, target) {
            Some(result) => result,
            None => {
                trace!(class = self.class.0, source = source.0, target = target.0, "check_is_a - undecided");
                true
            }
        }
    }

    /// The public type of this class (what `is_a` checks compare).
    fn public_type(&self) -> TypeId {
        self.pool.access_type(self.this_type, Access::Public)
    }

    fn contribution_info(&mut self, contribution: &Contribution) -> Option<Arc<TypeInfo>> {
        use crate::structure::Composition;
        if contribution.composition == Composition::Equal {
            return None;
        }
        let view = self.pool.access_type(contribution.type_id, Access::Protected);
        let info = self.ctx.ensure_type_info_internal(view);
        match &info {
            None if contribution.composition != Composition::Into => self.incomplete = true,
            Some(info) if !info.is_complete() => self.incomplete = true,
            _ => {}
        }
        info
    }

    // -------------------------------------------------------------------------
    // Type parameters
    // -------------------------------------------------------------------------

    fn resolve_type_params(&mut self) {
        let pool = self.pool;
        let structure = Arc::clone(&self.structure);
        let supplied = pool.type_params(self.this_type);
        if supplied.len() > structure.type_params.len() {
            self.report(
                diagnostic_codes::TYPE_PARAMS_TOO_MANY,
                vec![
                    DiagnosticArg::Type(self.this_type),
                    DiagnosticArg::Number(structure.type_params.len()),
                    DiagnosticArg::Number(supplied.len()),
                ],
            );
        }

        // a virtual child sees its parent's type parameters
        if let TypeData::VirtualChild { parent, .. } = pool.type_data(self.this_type) {
            let parent_bindings = Bindings::of_type(pool, parent);
            if let Some(parent_structure) = pool.class_of(parent).and_then(|c| pool.structure(c)) {
                for decl in &parent_structure.type_params {
                    let actual = parent_bindings.get(decl.name).unwrap_or(decl.constraint);
                    self.info.type_params.insert(
                        decl.name,
                        ParamInfo {
                            name: decl.name,
                            constraint: decl.constraint,
                            actual,
                            formal: actual == decl.constraint,
                        },
                    );
                }
            }
        }

        for (i, decl) in structure.type_params.iter().enumerate() {
            let mut actual = supplied
                .get(i)
                .copied()
                .or_else(|| self.bindings.get(decl.name))
                .unwrap_or(decl.constraint);
            if actual != decl.constraint && !self.check_is_a(actual, decl.constraint) {
                self.report(
                    diagnostic_codes::TYPE_PARAM_CONSTRAINT,
                    vec![
                        DiagnosticArg::Atom(decl.name),
                        DiagnosticArg::Identity(self.class),
                        DiagnosticArg::Type(decl.constraint),
                        DiagnosticArg::Type(actual),
                    ],
                );
                actual = decl.constraint;
                self.bindings.bind(decl.name, actual);
            }
            self.info.type_params.insert(
                decl.name,
                ParamInfo {
                    name: decl.name,
                    constraint: decl.constraint,
                    actual,
                    formal: actual == decl.constraint,
                },
            );
        }
    }

    // -------------------------------------------------------------------------
    // Finish
    // -------------------------------------------------------------------------

    fn finish(mut self) -> TypeInfo {
        let chain_ids = self.info.chain_identities();
        self.info.dependencies.insert(self.class);
        self.info.dependencies.extend(chain_ids);
        if self.incomplete {
            self.info.progress = Progress::Incomplete;
        }
        self.info.immutable = self.structure.format.is_const_like();
        debug!(
            class = %self.pool.path_string(self.class),
            type_id = self.type_id.0,
            class_chain = self.info.class_chain.len(),
            default_chain = self.info.default_chain.len(),
            complete = !self.incomplete,
            "class type info built"
        );
        self.info
    }
}

#[cfg(test)]
#[path = "../../tests/builder_tests.rs"]
mod tests;
