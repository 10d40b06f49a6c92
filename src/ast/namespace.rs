//! Schema-level AST nodes: the schema itself, `using` statements and
//! out-of-line annotation blocks.

use std::sync::Arc;

use super::{
    Association, EntityContainer, EnumType, Function, StructuredType, ValueTerm,
    VocabularyAnnotation,
};
use crate::base::{Location, NodeId};

/// One parsed `<Schema>` element.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    pub id: NodeId,
    pub namespace: Arc<str>,
    pub alias: Option<Arc<str>>,
    pub usings: Vec<Using>,
    /// Entity and complex types, in declaration order.
    pub structured_types: Vec<Arc<StructuredType>>,
    pub enum_types: Vec<Arc<EnumType>>,
    pub associations: Vec<Arc<Association>>,
    pub functions: Vec<Arc<Function>>,
    pub value_terms: Vec<Arc<ValueTerm>>,
    pub entity_containers: Vec<Arc<EntityContainer>>,
    /// `<Annotations Target="...">` blocks.
    pub annotations: Vec<AnnotationsBlock>,
    pub location: Location,
}

impl Schema {
    /// An empty schema for `namespace`.
    pub fn new(id: NodeId, namespace: impl Into<Arc<str>>, location: Location) -> Self {
        Self {
            id,
            namespace: namespace.into(),
            alias: None,
            usings: Vec::new(),
            structured_types: Vec::new(),
            enum_types: Vec::new(),
            associations: Vec::new(),
            functions: Vec::new(),
            value_terms: Vec::new(),
            entity_containers: Vec::new(),
            annotations: Vec::new(),
            location,
        }
    }
}

/// `<Using Namespace="..." Alias="..."/>`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Using {
    pub namespace: Arc<str>,
    pub alias: Arc<str>,
    pub location: Location,
}

/// Out-of-line annotations applied to the element named by `target`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnotationsBlock {
    pub target: Arc<str>,
    pub qualifier: Option<Arc<str>>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}
