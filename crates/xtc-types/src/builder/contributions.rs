//! Contribution collection and validation.
//!
//! Turns the declared contributions of a class into the processing list the
//! rest of the build walks, top of the chain first:
//! annotations, the class itself, incorporates, implements and delegates,
//! the implicit `Inner`/`Outer` markers, the rebase onto a format interface,
//! extends, into. Invalid contributions are reported and dropped; a class
//! left without a valid extends falls back to `Object`.

use super::ClassBuilder;
use crate::diagnostics::DiagnosticArg;
use crate::generics::Bindings;
use crate::structure::{Composition, ContributionDecl, Format};
use crate::types::{IdentityId, TypeId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::trace;
use xtc_common::diagnostics::diagnostic_codes;
use xtc_common::interner::Atom;
use xtc_common::limits::MAX_CONTRIBUTION_WALK;

/// One entry of the processing list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Contribution {
    pub(super) composition: Composition,
    /// Resolved against the class's type parameters.
    pub(super) type_id: TypeId,
    pub(super) delegate: Option<Atom>,
}

impl Contribution {
    fn new(composition: Composition, type_id: TypeId) -> Self {
        Self {
            composition,
            type_id,
            delegate: None,
        }
    }
}

impl ClassBuilder<'_, '_> {
    /// The processing list, plus the conditional incorporates set aside for
    /// the end of the build.
    pub(super) fn collect_contributions(&mut self) -> (Vec<Contribution>, Vec<ContributionDecl>) {
        let pool = self.pool;
        let core = pool.core();
        let format = self.structure.format;
        let decls = self.structure.contributions.clone();

        let mut seen: FxHashSet<(Composition, TypeId)> = FxHashSet::default();
        let mut annotations = Vec::new();
        let mut incorporates = Vec::new();
        let mut implements = Vec::new();
        let mut rebase = None;
        let mut extends: Option<Contribution> = None;
        let mut extends_declared = false;
        let mut into = Vec::new();
        let mut conditional = Vec::new();

        for decl in &decls {
            if decl.is_conditional() {
                conditional.push(decl.clone());
                continue;
            }
            let type_id = pool.resolve_typedefs(pool.resolve_generics(decl.type_id, &self.bindings));
            if !seen.insert((decl.composition, type_id)) {
                self.ctx.report(crate::diagnostics::PendingDiagnostic::warning(
                    diagnostic_codes::CONTRIBUTION_DUPLICATE,
                    vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)],
                ));
                continue;
            }
            let contributor = pool.class_of(type_id);
            match decl.composition {
                Composition::Extends => {
                    let first = !extends_declared;
                    extends_declared = true;
                    if let Some(contribution) = self.check_extends(type_id, contributor, first) {
                        extends = Some(contribution);
                    }
                    continue;
                }
                Composition::Annotation => {
                    if !self.check_mixin(type_id, contributor, diagnostic_codes::ANNOTATION_NOT_MIXIN) {
                        continue;
                    }
                }
                Composition::Incorporates => {
                    if !self.check_mixin(type_id, contributor, diagnostic_codes::INCORPORATE_NOT_MIXIN) {
                        continue;
                    }
                }
                Composition::Implements | Composition::Delegates => {
                    if contributor.and_then(|c| pool.format_of(c)) == Some(Format::Mixin) {
                        self.report(
                            diagnostic_codes::IMPLEMENTS_MIXIN,
                            vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)],
                        );
                        continue;
                    }
                }
                Composition::Into => {
                    if format != Format::Mixin {
                        self.report(
                            diagnostic_codes::INTO_NOT_MIXIN,
                            vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)],
                        );
                        continue;
                    }
                    into.push(Contribution::new(Composition::Into, type_id));
                    continue;
                }
                Composition::RebasesOnto => {
                    rebase = Some(Contribution::new(Composition::RebasesOnto, type_id));
                    continue;
                }
                Composition::Equal => continue,
            }
            if let Some(contributor) = contributor {
                if self.reaches_class(contributor) {
                    self.report(
                        diagnostic_codes::CONTRIBUTION_CYCLICAL,
                        vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)],
                    );
                    continue;
                }
            }
            let contribution = Contribution {
                composition: decl.composition,
                type_id,
                delegate: decl.delegate,
            };
            match decl.composition {
                Composition::Annotation => annotations.push(contribution),
                Composition::Incorporates => incorporates.push(contribution),
                _ => implements.push(contribution),
            }
        }

        // implicit contributions
        if extends.is_none() && format.is_class_like() && self.class != core.object {
            extends = Some(Contribution::new(Composition::Extends, core.object_type));
        }
        if self.structure.virtual_child {
            implements.push(Contribution::new(Composition::Implements, pool.class_type(core.inner)));
        }
        if !pool.virtual_children(self.class).is_empty() {
            implements.push(Contribution::new(Composition::Implements, pool.class_type(core.outer)));
        }
        if rebase.is_none() {
            rebase = self.implicit_rebase(extends.as_ref());
        }

        let mut list = annotations;
        list.push(Contribution::new(Composition::Equal, self.this_type));
        list.extend(incorporates);
        list.extend(implements);
        list.extend(rebase);
        list.extend(extends);
        list.extend(into);
        trace!(
            class = self.class.0,
            contributions = list.len(),
            conditional = conditional.len(),
            "collect_contributions"
        );
        (list, conditional)
    }

    /// Validate an extends contribution. `first` is false for every extends
    /// after the first one declared.
    fn check_extends(&mut self, type_id: TypeId, parent: Option<IdentityId>, first: bool) -> Option<Contribution> {
        let pool = self.pool;
        let format = self.structure.format;
        if format == Format::Interface {
            self.report(
                diagnostic_codes::INTERFACE_EXTENDS,
                vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)],
            );
            return None;
        }
        if !first {
            self.report(diagnostic_codes::EXTENDS_MULTIPLE, vec![DiagnosticArg::Identity(self.class)]);
            return None;
        }
        let parent_format = parent.and_then(|p| pool.format_of(p));
        let (Some(parent), Some(parent_format)) = (parent, parent_format) else {
            self.report(
                diagnostic_codes::EXTENDS_NOT_CLASS,
                vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)],
            );
            return None;
        };
        if parent_format == Format::Interface {
            self.report(
                diagnostic_codes::EXTENDS_NOT_CLASS,
                vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)],
            );
            return None;
        }
        if !format.can_extend(parent_format) {
            self.report(
                diagnostic_codes::EXTENDS_INCOMPATIBLE,
                vec![
                    DiagnosticArg::Identity(self.class),
                    DiagnosticArg::from(format.name()),
                    DiagnosticArg::Type(type_id),
                    DiagnosticArg::from(parent_format.name()),
                ],
            );
            return None;
        }
        if parent == self.class || pool.extends_transitively(parent, self.class) {
            self.report(diagnostic_codes::EXTENDS_CYCLICAL, vec![DiagnosticArg::Identity(self.class)]);
            return None;
        }
        Some(Contribution::new(Composition::Extends, type_id))
    }

    /// An incorporated or annotating type must be a mixin whose `into` type
    /// this class satisfies.
    fn check_mixin(&mut self, type_id: TypeId, mixin: Option<IdentityId>, not_mixin: u32) -> bool {
        let pool = self.pool;
        if mixin.and_then(|m| pool.format_of(m)) != Some(Format::Mixin) {
            self.report(not_mixin, vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(type_id)]);
            return false;
        }
        let into = self.mixin_into(type_id);
        let this = self.public_type();
        if !self.check_is_a(this, into) {
            self.report(
                diagnostic_codes::MIXIN_INTO_INCOMPATIBLE,
                vec![
                    DiagnosticArg::Type(type_id),
                    DiagnosticArg::Identity(self.class),
                    DiagnosticArg::Type(into),
                ],
            );
            return false;
        }
        true
    }

    /// The type a mixin applies to: its own `into`, or the one of the mixin
    /// it extends, or `Object`.
    pub(super) fn mixin_into(&self, mixin_type: TypeId) -> TypeId {
        mixin_into_type(self.pool, mixin_type)
    }

    /// A const-like class rebases onto its format interface unless the class
    /// it extends already has the same format.
    fn implicit_rebase(&self, extends: Option<&Contribution>) -> Option<Contribution> {
        let pool = self.pool;
        let format = self.structure.format;
        let iface = pool.core().format_interface(format)?;
        let parent_format = extends
            .and_then(|e| pool.class_of(e.type_id))
            .and_then(|parent| pool.format_of(parent));
        if parent_format == Some(format) {
            return None;
        }
        Some(Contribution::new(Composition::RebasesOnto, pool.class_type(iface)))
    }

    /// True if `contributor` reaches this class through declared
    /// contributions (other than `into`).
    fn reaches_class(&self, contributor: IdentityId) -> bool {
        let pool = self.pool;
        let mut visited: FxHashSet<IdentityId> = FxHashSet::default();
        let mut queue = VecDeque::from([contributor]);
        let mut steps = 0;
        while let Some(step) = queue.pop_front() {
            if step == self.class {
                return true;
            }
            steps += 1;
            if steps > MAX_CONTRIBUTION_WALK || !visited.insert(step) {
                continue;
            }
            let Some(structure) = pool.structure(step) else {
                continue;
            };
            for decl in &structure.contributions {
                if matches!(decl.composition, Composition::Into | Composition::RebasesOnto) {
                    continue;
                }
                if let Some(next) = pool.class_of(pool.resolve_typedefs(decl.type_id)) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

/// The type a mixin applies to, with the mixin's own type parameters
/// substituted.
pub(super) fn mixin_into_type(pool: &crate::ConstantPool, mixin_type: TypeId) -> TypeId {
    let object = pool.core().object_type;
    let mut current = pool.class_of(mixin_type);
    let mut steps = 0;
    while let Some(mixin) = current {
        let Some(structure) = pool.structure(mixin) else {
            return object;
        };
        if let Some(decl) = structure.contributions_of(Composition::Into).next() {
            let bindings = Bindings::of_type(pool, mixin_type);
            return pool.resolve_generics(decl.type_id, &bindings);
        }
        steps += 1;
        if steps > MAX_CONTRIBUTION_WALK {
            return object;
        }
        current = pool.extends_class(mixin).filter(|&parent| parent != mixin);
    }
    object
}
