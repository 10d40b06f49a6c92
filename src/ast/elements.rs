//! Type, member, function and term declarations.

use std::sync::Arc;

use super::{TypeRef, VocabularyAnnotation};
use crate::base::{Location, NodeId};

/// Whether a structured type is an entity type (has a key) or a complex type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructuredKind {
    Entity,
    Complex,
}

/// `<EntityType>` or `<ComplexType>`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructuredType {
    pub id: NodeId,
    pub name: Arc<str>,
    pub kind: StructuredKind,
    /// Declared base type name, possibly alias-qualified.
    pub base_type: Option<Arc<str>>,
    pub is_abstract: bool,
    pub is_open: bool,
    /// `<Key><PropertyRef/></Key>`; empty for complex types.
    pub key: Vec<PropertyRef>,
    pub properties: Vec<Arc<Property>>,
    pub navigation_properties: Vec<Arc<NavigationProperty>>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

/// A structural property.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Property {
    pub id: NodeId,
    pub name: Arc<str>,
    pub type_ref: Arc<TypeRef>,
    pub default_value: Option<Arc<str>>,
    pub is_concurrency_token: bool,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

/// `<PropertyRef Name="..."/>`, used by keys and referential constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyRef {
    pub name: Arc<str>,
    pub location: Location,
}

/// A navigation property traversing `relationship` from `from_role` to `to_role`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigationProperty {
    pub id: NodeId,
    pub name: Arc<str>,
    pub relationship: Arc<str>,
    pub from_role: Arc<str>,
    pub to_role: Arc<str>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

/// `<EnumType>`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumType {
    pub id: NodeId,
    pub name: Arc<str>,
    pub underlying_type: Option<Arc<str>>,
    pub is_flags: bool,
    pub members: Vec<Arc<EnumMember>>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumMember {
    pub id: NodeId,
    pub name: Arc<str>,
    pub value: Option<i64>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

/// A schema-level (model-defined) function.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub id: NodeId,
    pub name: Arc<str>,
    pub return_type: Option<Arc<TypeRef>>,
    pub parameters: Vec<Arc<Parameter>>,
    pub defining_expression: Option<Arc<str>>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

/// A parameter of a function or function import.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    pub id: NodeId,
    pub name: Arc<str>,
    pub type_ref: Arc<TypeRef>,
    pub mode: ParameterMode,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

/// `<ValueTerm>`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueTerm {
    pub id: NodeId,
    pub name: Arc<str>,
    pub type_ref: Arc<TypeRef>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}
