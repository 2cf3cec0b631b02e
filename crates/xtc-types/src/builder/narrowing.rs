//! Method narrowing.
//!
//! A method whose signature is substitutable for an inherited one (same
//! name, wider parameters, narrower returns) narrows it: the inherited chain
//! is capped so calls through the old signature reach the new method, and
//! the new method's chain continues with the inherited bodies.

use super::ClassBuilder;
use crate::diagnostics::DiagnosticArg;
use crate::identity::NestedIdentity;
use crate::structure::{MethodDecl, MethodFlags};
use crate::type_info::{MethodBody, MethodInfo};
use crate::types::SignatureId;
use tracing::trace;
use xtc_common::diagnostics::diagnostic_codes;

impl ClassBuilder<'_, '_> {
    pub(super) fn add_own_method(&mut self, decl: &MethodDecl) {
        let pool = self.pool;
        let signature = pool.resolve_signature_generics(decl.signature, &self.bindings);
        let nid = NestedIdentity::method(signature);
        let body = MethodBody {
            identity: decl.identity,
            origin: self.class,
            signature,
            implementation: decl.implementation,
            access: decl.access,
            flags: decl.flags,
            default_params: decl.default_params,
            op: decl.op,
            delegate: None,
            narrowed_to: None,
        };
        let own = MethodInfo::new(body.clone());

        if let Some(existing) = self.info.methods.get(&nid) {
            let layered = own.layer_on(existing);
            self.info.methods.insert(nid, layered);
            return;
        }
        if decl.flags.intersects(MethodFlags::FUNCTION | MethodFlags::CONSTRUCTOR) {
            self.info.methods.insert(nid, own);
            return;
        }

        let candidates = self.narrowing_candidates(signature, decl.default_params);
        match candidates.as_slice() {
            [] => {
                if decl.is_override() {
                    self.report(
                        diagnostic_codes::OVERRIDE_MISSING_SUPER,
                        vec![
                            DiagnosticArg::Signature(signature),
                            DiagnosticArg::Identity(self.class),
                        ],
                    );
                }
                self.info.methods.insert(nid, own);
            }
            [only] => {
                let only = only.clone();
                self.narrow(nid, own, &body, &only, std::slice::from_ref(&only));
            }
            _ => match self.widest(&candidates) {
                Some(widest) => {
                    let widest = widest.clone();
                    self.narrow(nid, own, &body, &widest, &candidates);
                }
                None => {
                    let name = pool.signature(signature).name;
                    if self.ambiguous.insert(name) {
                        self.report(
                            diagnostic_codes::SUPER_AMBIGUOUS,
                            vec![DiagnosticArg::Atom(name), DiagnosticArg::Identity(self.class)],
                        );
                    }
                    let layered = match self.info.methods.get(&candidates[0]) {
                        Some(first) => own.layer_on(first),
                        None => own,
                    };
                    self.info.methods.insert(nid, layered);
                }
            },
        }
    }

    /// Insert the narrowing method at `nid`, continuing with the chain of
    /// `parent`, and cap every one of `capped`.
    fn narrow(
        &mut self,
        nid: NestedIdentity,
        own: MethodInfo,
        body: &MethodBody,
        parent: &NestedIdentity,
        capped: &[NestedIdentity],
    ) {
        let layered = match self.info.methods.get(parent) {
            Some(inherited) => own.layer_on(inherited),
            None => own,
        };
        for super_nid in capped {
            let cap = self
                .info
                .methods
                .get(super_nid)
                .map(|inherited| inherited.cap_with(nid.clone(), body));
            if let Some(cap) = cap {
                trace!(
                    class = self.class.0,
                    narrowed = ?super_nid.signature(),
                    by = ?nid.signature(),
                    "method narrowed"
                );
                self.info.methods.insert(super_nid.clone(), cap);
            }
        }
        self.info.methods.insert(nid, layered);
    }

    /// Inherited methods `signature` can stand in for, in map order.
    fn narrowing_candidates(&self, signature: SignatureId, default_params: u32) -> Vec<NestedIdentity> {
        let pool = self.pool;
        let name = pool.signature(signature).name;
        let inherited: Vec<(NestedIdentity, SignatureId)> = self
            .info
            .methods_named(pool, name)
            .filter(|(_, m)| !m.is_capped() && !m.is_function() && m.head().origin != self.class)
            .map(|(nid, m)| (nid.clone(), m.signature()))
            .collect();
        inherited
            .into_iter()
            .filter(|&(_, sup)| self.ctx.is_substitutable_for(signature, sup, default_params))
            .map(|(nid, _)| nid)
            .collect()
    }

    /// The candidate every other candidate can stand in for.
    fn widest<'a>(&self, candidates: &'a [NestedIdentity]) -> Option<&'a NestedIdentity> {
        candidates.iter().find(|&wide| {
            let Some(wide_sig) = wide.signature() else {
                return false;
            };
            candidates.iter().all(|other| {
                other == wide
                    || other
                        .signature()
                        .is_some_and(|sig| self.ctx.is_substitutable_for(sig, wide_sig, 0))
            })
        })
    }

    /// The narrowest existing method that can stand in for `signature`.
    pub(super) fn find_narrowing(&self, signature: SignatureId) -> Option<NestedIdentity> {
        let pool = self.pool;
        let name = pool.signature(signature).name;
        let candidates: Vec<(NestedIdentity, SignatureId, u32)> = self
            .info
            .methods_named(pool, name)
            .filter(|(nid, m)| {
                !m.is_capped() && !m.is_function() && nid.signature() != Some(signature)
            })
            .map(|(nid, m)| (nid.clone(), m.signature(), m.head().default_params))
            .collect();
        let matching: Vec<(NestedIdentity, SignatureId)> = candidates
            .into_iter()
            .filter(|&(_, sub, defaults)| self.ctx.is_substitutable_for(sub, signature, defaults))
            .map(|(nid, sub, _)| (nid, sub))
            .collect();
        matching
            .iter()
            .find(|(_, narrow)| {
                matching
                    .iter()
                    .all(|(_, other)| other == narrow || self.ctx.is_substitutable_for(*narrow, *other, 0))
            })
            .map(|(nid, _)| nid.clone())
    }
}
