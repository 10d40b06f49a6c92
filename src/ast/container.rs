//! Entity containers and their members.

use std::sync::Arc;

use super::{Parameter, TypeRef, VocabularyAnnotation};
use crate::base::{Location, NodeId};

/// `<EntityContainer>`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityContainer {
    pub id: NodeId,
    pub name: Arc<str>,
    /// Name of the single container this one extends.
    pub extends: Option<Arc<str>>,
    pub is_default: bool,
    pub entity_sets: Vec<Arc<EntitySet>>,
    pub association_sets: Vec<Arc<AssociationSet>>,
    pub function_imports: Vec<Arc<FunctionImport>>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

/// A foreign-namespace attribute attached directly to an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectAnnotation {
    pub namespace: Arc<str>,
    pub name: Arc<str>,
    pub value: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySet {
    pub id: NodeId,
    pub name: Arc<str>,
    pub entity_type: Arc<str>,
    pub direct_annotations: Vec<DirectAnnotation>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssociationSet {
    pub id: NodeId,
    pub name: Arc<str>,
    pub association: Arc<str>,
    pub end1: Option<Arc<AssociationSetEnd>>,
    pub end2: Option<Arc<AssociationSetEnd>>,
    pub direct_annotations: Vec<DirectAnnotation>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssociationSetEnd {
    pub id: NodeId,
    /// Explicit association end role; inferred when absent.
    pub role: Option<Arc<str>>,
    pub entity_set: Arc<str>,
    pub direct_annotations: Vec<DirectAnnotation>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionImport {
    pub id: NodeId,
    pub name: Arc<str>,
    pub return_type: Option<Arc<TypeRef>>,
    /// Entity set the returned entities belong to.
    pub entity_set: Option<Arc<str>>,
    pub is_side_effecting: bool,
    pub is_bindable: bool,
    pub is_composable: bool,
    pub parameters: Vec<Arc<Parameter>>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}
