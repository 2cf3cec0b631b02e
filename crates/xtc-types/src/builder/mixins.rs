//! Mixins applied to a type: annotations on a type (`@M T`) and
//! conditional incorporates (`incorporates conditional M<T extends X>`).

use super::ClassBuilder;
use super::contributions::mixin_into_type;
use super::members::layer_members;
use crate::context::ResolutionContext;
use crate::diagnostics::{DiagnosticArg, PendingDiagnostic};
use crate::structure::{Composition, ContributionDecl, Format};
use crate::type_info::{Origin, Progress, TypeInfo};
use crate::types::{Access, TypeId};
use indexmap::IndexMap;
use tracing::{debug, trace};
use xtc_common::diagnostics::diagnostic_codes;

impl ResolutionContext<'_> {
    /// `@annotation base`: the annotation mixin's members layered over the
    /// base's, and the mixin placed at the top of the class chain. An
    /// annotation that is not a mixin, or does not apply to the base, is
    /// reported and leaves the base unchanged.
    pub(super) fn build_annotated(&self, t: TypeId, annotation: TypeId, base: TypeId) -> TypeInfo {
        let pool = self.pool();
        let mut info = self.derive(t, base);

        let mixin = pool.class_of(annotation);
        if mixin.and_then(|m| pool.format_of(m)) != Some(Format::Mixin) {
            self.report(PendingDiagnostic::error(
                diagnostic_codes::ANNOTATION_NOT_MIXIN,
                vec![DiagnosticArg::Type(annotation), DiagnosticArg::Type(base)],
            ));
            return info;
        }
        let into = mixin_into_type(pool, annotation);
        if self.check_is_a(base, into) == Some(false) {
            self.report(PendingDiagnostic::error(
                diagnostic_codes::MIXIN_INTO_INCOMPATIBLE,
                vec![
                    DiagnosticArg::Type(annotation),
                    DiagnosticArg::Type(base),
                    DiagnosticArg::Type(into),
                ],
            ));
            return info;
        }

        let Some(layer) = self.ensure_type_info_internal(pool.access_type(annotation, Access::Protected)) else {
            info.progress = Progress::Incomplete;
            return info;
        };
        layer_members(&mut info, &layer, None);

        let on_top = Origin {
            anchored: false,
            composition: Composition::Annotation,
            contributor: annotation,
        };
        let mut class_chain: IndexMap<_, _> = layer.class_chain.keys().map(|&id| (id, on_top)).collect();
        for (&id, &origin) in &info.class_chain {
            class_chain.entry(id).or_insert(origin);
        }
        info.class_chain = class_chain;
        for (&id, &origin) in &layer.default_chain {
            if !info.class_chain.contains_key(&id) {
                info.default_chain.entry(id).or_insert(origin);
            }
        }
        for (&name, &param) in &layer.type_params {
            info.type_params.entry(name).or_insert(param);
        }
        info.dependencies.extend(layer.dependencies.iter().copied());
        if !layer.is_complete() {
            info.progress = Progress::Incomplete;
        }
        trace!(type_id = t.0, annotation = annotation.0, "build_annotated");
        info
    }
}

impl ClassBuilder<'_, '_> {
    /// Merge each conditional incorporate whose conditions the actual type
    /// parameters satisfy. Only members the class does not already have are
    /// added; the mixin goes on the class chain right below the class.
    pub(super) fn apply_conditional_incorporates(&mut self, conditional: &[ContributionDecl]) {
        let pool = self.pool;
        for decl in conditional {
            let mut satisfied = true;
            for condition in &decl.conditions {
                let Some(actual) = self.info.type_param(condition.param) else {
                    satisfied = false;
                    break;
                };
                match self.ctx.check_is_a(actual, condition.constraint) {
                    Some(true) => {}
                    Some(false) => {
                        satisfied = false;
                        break;
                    }
                    None => {
                        // decided once the blocking info is complete
                        self.incomplete = true;
                        satisfied = false;
                        break;
                    }
                }
            }
            if !satisfied {
                trace!(class = self.class.0, mixin = decl.type_id.0, "conditional incorporate skipped");
                continue;
            }

            let mixin_type = pool.resolve_generics(decl.type_id, &self.bindings);
            if pool.class_of(mixin_type).and_then(|m| pool.format_of(m)) != Some(Format::Mixin) {
                self.report(
                    diagnostic_codes::INCORPORATE_NOT_MIXIN,
                    vec![DiagnosticArg::Identity(self.class), DiagnosticArg::Type(mixin_type)],
                );
                continue;
            }
            let view = pool.access_type(mixin_type, Access::Protected);
            let Some(layer) = self.ctx.ensure_type_info_internal(view) else {
                self.incomplete = true;
                continue;
            };
            if !layer.is_complete() {
                self.incomplete = true;
            }

            for (nid, property) in &layer.properties {
                if !self.info.properties.contains_key(nid) {
                    self.info.properties.insert(nid.clone(), property.clone());
                }
            }
            for (nid, method) in &layer.methods {
                if !self.info.methods.contains_key(nid) {
                    self.info.methods.insert(nid.clone(), method.clone());
                }
            }

            let mut position = self
                .info
                .class_chain
                .get_index_of(&self.class)
                .map_or(0, |i| i + 1);
            let origin = Origin {
                anchored: false,
                composition: Composition::Incorporates,
                contributor: mixin_type,
            };
            for &id in layer.class_chain.keys() {
                if self.info.class_chain.contains_key(&id) {
                    continue;
                }
                self.info.class_chain.shift_insert(position, id, origin);
                position += 1;
            }
            self.merge_params(&layer.type_params);
            self.info.dependencies.extend(layer.dependencies.iter().copied());
            debug!(
                class = %pool.path_string(self.class),
                mixin = mixin_type.0,
                "conditional incorporate applied"
            );
        }
    }
}
