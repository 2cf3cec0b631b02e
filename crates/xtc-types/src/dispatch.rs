//! What a runtime needs from a TypeInfo to dispatch calls and property
//! access.

use crate::context::ResolutionContext;
use crate::identity::{NestedIdentity, Segment};
use crate::pool::ConstantPool;
use crate::structure::Implementation;
use crate::type_info::{MethodBody, MethodInfo, TypeInfo};
use crate::types::SignatureId;
use xtc_common::interner::Atom;
use xtc_common::limits::MAX_CAP_REDIRECTS;

/// The bodies a call runs through, most derived first. A `super` call from
/// body `i` continues with body `i + 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallChain {
    /// The signature the chain answers to after following caps.
    pub signature: SignatureId,
    pub bodies: Vec<MethodBody>,
}

impl CallChain {
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn head(&self) -> Option<&MethodBody> {
        self.bodies.first()
    }
}

/// How a property is read and written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyChain {
    pub name: Atom,
    /// Bodies of the `get` accessor, empty when reads go to the field.
    pub getter: Vec<MethodBody>,
    /// Bodies of the `set` accessor, empty when writes go to the field (or
    /// the property is read-only).
    pub setter: Vec<MethodBody>,
    /// Backed by a field.
    pub field: bool,
    pub read_only: bool,
}

impl PropertyChain {
    /// Reads bypass the `Ref` chain entirely.
    pub fn is_direct_read(&self) -> bool {
        self.getter.is_empty() && self.field
    }
}

/// Follow caps to the method that finally answers.
fn follow_caps<'a>(info: &'a TypeInfo, mut method: &'a MethodInfo) -> Option<&'a MethodInfo> {
    for _ in 0..MAX_CAP_REDIRECTS {
        match method.capped_target() {
            Some(target) => method = info.methods.get(target)?,
            None => return Some(method),
        }
    }
    None
}

/// The bodies a call through `signature` runs: caps are followed to the
/// narrowing method and only bodies with code are kept.
pub fn resolve_call_chain(info: &TypeInfo, signature: SignatureId) -> Option<CallChain> {
    let method = info.find_method_by_signature(signature)?;
    let method = follow_caps(info, method)?;
    let bodies: Vec<MethodBody> = method
        .bodies()
        .iter()
        .filter(|b| b.implementation.has_code() && b.implementation != Implementation::Capped)
        .cloned()
        .collect();
    Some(CallChain {
        signature: method.signature(),
        bodies,
    })
}

/// Getter and setter chains of the top-level property `name`.
pub fn resolve_property_chain(pool: &ConstantPool, info: &TypeInfo, name: Atom) -> Option<PropertyChain> {
    let property = info.find_property(name)?;
    let nid = NestedIdentity::property(name);
    let accessor = |accessor_name: &str| -> Vec<MethodBody> {
        let wanted = pool.intern_name(accessor_name);
        info.property_methods(&nid)
            .into_iter()
            .filter(|(member, _)| {
                matches!(member.last(), Some(Segment::Method(sig)) if pool.signature(sig).name == wanted)
            })
            .filter_map(|(_, method)| follow_caps(info, method))
            .flat_map(|method| method.bodies().iter().filter(|b| b.implementation.has_code()).cloned())
            .filter(|b| b.implementation != Implementation::Capped)
            .collect()
    };
    Some(PropertyChain {
        name,
        getter: accessor("get"),
        setter: if property.is_read_only() {
            Vec::new()
        } else {
            accessor("set")
        },
        field: property.has_field(),
        read_only: property.is_read_only(),
    })
}

impl ResolutionContext<'_> {
    /// The method a call through `signature` binds to: the exact match if
    /// there is one, else the narrowest method that can stand in for it.
    pub fn find_callable(&self, info: &TypeInfo, signature: SignatureId) -> Option<CallChain> {
        if let Some(chain) = resolve_call_chain(info, signature) {
            return Some(chain);
        }
        let pool = self.pool();
        let name = pool.signature(signature).name;
        let candidates: Vec<(&NestedIdentity, &MethodInfo)> = info
            .methods_named(pool, name)
            .filter(|(_, m)| !m.is_capped())
            .filter(|(_, m)| self.is_substitutable_for(m.signature(), signature, m.head().default_params))
            .collect();
        let (_, best) = candidates.iter().find(|(_, narrow)| {
            candidates.iter().all(|(_, other)| {
                other.signature() == narrow.signature()
                    || self.is_substitutable_for(narrow.signature(), other.signature(), 0)
            })
        })?;
        resolve_call_chain(info, best.signature())
    }
}

#[cfg(test)]
#[path = "../tests/dispatch_tests.rs"]
mod tests;
