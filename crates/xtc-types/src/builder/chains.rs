//! Class and default chain assembly.
//!
//! The class chain lists the classes (and mixins) whose code makes up the
//! implementation, most derived first; the default chain lists interfaces
//! that may supply default bodies. Chains are merged from the processing
//! list in order, so the first contribution to bring an identity owns it.

use super::ClassBuilder;
use super::contributions::Contribution;
use crate::diagnostics::DiagnosticArg;
use crate::structure::{Composition, Format};
use crate::type_info::{Origin, ParamInfo, TypeInfo};
use crate::types::IdentityId;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use xtc_common::diagnostics::diagnostic_codes;
use xtc_common::interner::Atom;

impl ClassBuilder<'_, '_> {
    /// Merge every contribution's chains and type parameters. Returns, per
    /// contribution, the chain identities it was the first to bring in.
    pub(super) fn merge_chains(
        &mut self,
        contributions: &[(Contribution, Option<Arc<TypeInfo>>)],
    ) -> Vec<FxHashSet<IdentityId>> {
        let mut owned = Vec::with_capacity(contributions.len());
        for (contribution, info) in contributions {
            let mut mine = FxHashSet::default();
            match (contribution.composition, info) {
                (Composition::Equal, _) => {
                    let origin = Origin {
                        anchored: true,
                        composition: Composition::Equal,
                        contributor: contribution.type_id,
                    };
                    let chain = if self.structure.format == Format::Interface {
                        &mut self.info.default_chain
                    } else {
                        &mut self.info.class_chain
                    };
                    chain.insert(self.class, origin);
                    mine.insert(self.class);
                }
                (_, None) => {}
                (Composition::Into, Some(info)) => self.merge_params(&info.type_params),
                (Composition::Implements | Composition::Delegates, Some(info)) => {
                    for (&id, origin) in info.class_chain.iter().chain(&info.default_chain) {
                        if self.splice(id, *origin, contribution, false) {
                            mine.insert(id);
                        }
                    }
                    self.merge_params(&info.type_params);
                }
                (_, Some(info)) => {
                    for (&id, origin) in &info.class_chain {
                        if self.splice(id, *origin, contribution, true) {
                            mine.insert(id);
                        }
                    }
                    for (&id, origin) in &info.default_chain {
                        if self.splice(id, *origin, contribution, false) {
                            mine.insert(id);
                        }
                    }
                    self.merge_params(&info.type_params);
                }
            }
            owned.push(mine);
        }

        // an identity on the class chain needs no default entry
        let class_chain = &self.info.class_chain;
        self.info.default_chain.retain(|id, _| !class_chain.contains_key(id));
        owned
    }

    /// Add one chain entry brought in by `contribution`. Returns false if the
    /// identity is already on either chain.
    fn splice(&mut self, id: IdentityId, origin: Origin, contribution: &Contribution, class_chain: bool) -> bool {
        if self.info.class_chain.contains_key(&id) || self.info.default_chain.contains_key(&id) {
            return false;
        }
        let origin = Origin {
            anchored: contribution.composition == Composition::Extends && origin.anchored,
            composition: contribution.composition,
            contributor: contribution.type_id,
        };
        if class_chain {
            self.info.class_chain.insert(id, origin);
        } else {
            self.info.default_chain.insert(id, origin);
        }
        true
    }

    /// Merge type parameters inherited from a contribution. The first binding
    /// of a name wins; a later binding must be compatible with it.
    pub(super) fn merge_params(&mut self, incoming: &IndexMap<Atom, ParamInfo>) {
        for (&name, param) in incoming {
            let Some(existing) = self.info.type_params.get(&name).copied() else {
                self.info.type_params.insert(name, *param);
                continue;
            };
            if existing.actual == param.actual {
                continue;
            }
            if !self.check_is_a(existing.actual, param.actual) && !self.structure.virtual_child {
                self.report(
                    diagnostic_codes::TYPE_PARAM_INCOMPATIBLE,
                    vec![
                        DiagnosticArg::Atom(name),
                        DiagnosticArg::Identity(self.class),
                        DiagnosticArg::Type(existing.actual),
                        DiagnosticArg::Type(param.actual),
                    ],
                );
            }
        }
    }
}
