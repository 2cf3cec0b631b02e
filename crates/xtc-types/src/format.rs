//! Human-readable rendering of types, identities and signatures.
//!
//! Used for diagnostic arguments and trace output.

use crate::identity::IdentityKind;
use crate::pool::ConstantPool;
use crate::types::{IdentityId, SignatureId, TerminalType, TypeData, TypeId};

pub struct TypeFormatter<'a> {
    pool: &'a ConstantPool,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(pool: &'a ConstantPool) -> Self {
        Self { pool }
    }

    pub fn format(&self, t: TypeId) -> String {
        let pool = self.pool;
        match pool.type_data(t) {
            TypeData::Terminal(terminal) => self.format_terminal(terminal),
            TypeData::Parameterized { base, params } => {
                let params: Vec<String> = pool.type_list(params).iter().map(|&p| self.format(p)).collect();
                format!("{}<{}>", self.format(base), params.join(", "))
            }
            TypeData::Annotated { annotation, base } => {
                format!("@{} {}", self.format(annotation), self.format(base))
            }
            TypeData::Immutable(base) => format!("immutable {}", self.format_operand(base)),
            TypeData::Access { base, access } => {
                format!("{}:{}", self.format_operand(base), access.keyword())
            }
            TypeData::VirtualChild { parent, name } => {
                format!("{}.{}", self.format_operand(parent), pool.name_text(name))
            }
            TypeData::Intersection(a, b) => {
                format!("{} | {}", self.format_operand(a), self.format_operand(b))
            }
            TypeData::Union(a, b) => format!("{} + {}", self.format_operand(a), self.format_operand(b)),
            TypeData::Difference(a, b) => {
                format!("{} - {}", self.format_operand(a), self.format_operand(b))
            }
            TypeData::Unresolved(ph) => match pool.placeholder_target(ph) {
                Some(target) => self.format(target),
                None => pool.placeholder_name(ph).to_string(),
            },
        }
    }

    /// Relational operands are parenthesized.
    fn format_operand(&self, t: TypeId) -> String {
        if self.pool.is_relational_type(t) {
            format!("({})", self.format(t))
        } else {
            self.format(t)
        }
    }

    fn format_terminal(&self, terminal: TerminalType) -> String {
        let pool = self.pool;
        match terminal {
            TerminalType::Class(id) | TerminalType::Typedef(id) => pool.path_string(id),
            TerminalType::FormalProperty(id) | TerminalType::TypeParameter(id) => {
                pool.name_text(pool.identity_name(id)).to_string()
            }
            TerminalType::FormalChild(id) => {
                let name = pool.name_text(pool.identity_name(id));
                match pool.parent(id) {
                    Some(parent) if pool.identity_kind(parent) != IdentityKind::Class => {
                        format!("{}.{name}", self.format_formal_parent(parent))
                    }
                    _ => name.to_string(),
                }
            }
            TerminalType::ThisClass(id) => format!("this:class({})", pool.path_string(id)),
        }
    }

    fn format_formal_parent(&self, id: IdentityId) -> String {
        let pool = self.pool;
        let name = pool.name_text(pool.identity_name(id));
        match (pool.identity_kind(id), pool.parent(id)) {
            (IdentityKind::FormalTypeChild, Some(parent)) => {
                format!("{}.{name}", self.format_formal_parent(parent))
            }
            _ => name.to_string(),
        }
    }

    pub fn format_identity(&self, id: IdentityId) -> String {
        match self.pool.identity(id) {
            crate::identity::IdentityData::Method { signature, .. } => {
                let owner = self
                    .pool
                    .nearest_class(id)
                    .map(|c| self.pool.path_string(c))
                    .unwrap_or_default();
                format!("{owner}.{}", self.format_signature(signature))
            }
            _ => self.pool.path_string(id),
        }
    }

    /// `Int foo(String, Boolean)`, `void bar()`, `(Int, String) pair()`.
    pub fn format_signature(&self, signature: SignatureId) -> String {
        let pool = self.pool;
        let data = pool.signature(signature);
        let returns = pool.type_list(data.returns);
        let returns = match returns.len() {
            0 => "void".to_string(),
            1 => self.format(returns[0]),
            _ => {
                let parts: Vec<String> = returns.iter().map(|&t| self.format(t)).collect();
                format!("({})", parts.join(", "))
            }
        };
        let params: Vec<String> = pool
            .type_list(data.params)
            .iter()
            .map(|&t| self.format(t))
            .collect();
        format!("{returns} {}({})", pool.name_text(data.name), params.join(", "))
    }
}

#[cfg(test)]
#[path = "../tests/format_tests.rs"]
mod tests;
