//! Enum types and members.

use std::rc::Rc;
use std::sync::Arc;

use super::binding::{Binding, Element, Unresolved, UnresolvedKind};
use super::cache::CacheCell;
use super::diagnostics::{EdmError, ErrorKind};
use super::schema::SchemaId;
use super::type_ref::PrimitiveKind;
use crate::ast;
use crate::base::{Location, NodeId};

pub struct EnumType {
    ast: Arc<ast::EnumType>,
    schema: SchemaId,
    qualified_name: Arc<str>,
    underlying_type: CacheCell<Binding<PrimitiveKind>>,
    members: CacheCell<Rc<[Rc<EnumMember>]>>,
}

impl EnumType {
    pub(crate) fn new(ast: Arc<ast::EnumType>, schema: SchemaId, namespace: &str) -> Self {
        let qualified_name = Arc::from(format!("{}.{}", namespace, ast.name));
        Self {
            ast,
            schema,
            qualified_name,
            underlying_type: CacheCell::new(),
            members: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::EnumType> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn is_flags(&self) -> bool {
        self.ast.is_flags
    }

    /// The integral primitive the members are stored as; `Edm.Int32` when
    /// not declared.
    pub fn underlying_type(&self) -> Binding<PrimitiveKind> {
        self.underlying_type.get_or_init(|| {
            let Some(name) = self.ast.underlying_type.as_ref() else {
                return Binding::Resolved(PrimitiveKind::Int32);
            };
            match PrimitiveKind::from_qualified_name(name) {
                Some(kind) if kind.is_integral() => Binding::Resolved(kind),
                _ => Binding::Unresolved(Unresolved::with_error(
                    UnresolvedKind::PrimitiveType,
                    name.clone(),
                    self.ast.location.clone(),
                    ErrorKind::UnresolvedPrimitiveType(name.clone()),
                )),
            }
        })
    }

    /// Members in declaration order. A member without an explicit value
    /// takes the previous member's value plus one; the first defaults to 0.
    pub fn members(&self) -> Rc<[Rc<EnumMember>]> {
        self.members.get_or_init(|| {
            let mut next = 0i64;
            self.ast
                .members
                .iter()
                .map(|node| {
                    let value = node.value.unwrap_or(next);
                    next = value.wrapping_add(1);
                    Rc::new(EnumMember {
                        ast: Arc::clone(node),
                        declaring_type: self.qualified_name.clone(),
                        value,
                    })
                })
                .collect()
        })
    }

    pub fn find_member(&self, name: &str) -> Option<Rc<EnumMember>> {
        self.members().iter().find(|m| m.name() == name).cloned()
    }

    pub fn errors(&self) -> Vec<EdmError> {
        self.underlying_type().errors()
    }
}

impl Element for EnumType {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for EnumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumType")
            .field("name", &self.qualified_name)
            .field("is_flags", &self.ast.is_flags)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct EnumMember {
    ast: Arc<ast::EnumMember>,
    declaring_type: Arc<str>,
    value: i64,
}

impl EnumMember {
    pub fn ast(&self) -> &Arc<ast::EnumMember> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn declaring_type_name(&self) -> &str {
        &self.declaring_type
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl Element for EnumMember {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}
