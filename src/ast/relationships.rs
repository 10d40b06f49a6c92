//! Associations and their ends.

use std::sync::Arc;

use super::{PropertyRef, VocabularyAnnotation};
use crate::base::{Location, NodeId};

/// `<Association>`. A well-formed association declares exactly two ends;
/// a missing end is `None` rather than absent from the node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Association {
    pub id: NodeId,
    pub name: Arc<str>,
    pub end1: Option<Arc<AssociationEnd>>,
    pub end2: Option<Arc<AssociationEnd>>,
    pub constraint: Option<Arc<ReferentialConstraint>>,
    pub annotations: Vec<Arc<VocabularyAnnotation>>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Multiplicity {
    ZeroOrOne,
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OnDeleteAction {
    #[default]
    None,
    Cascade,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssociationEnd {
    pub id: NodeId,
    pub role: Arc<str>,
    /// Entity type name, possibly alias-qualified.
    pub entity_type: Arc<str>,
    pub multiplicity: Multiplicity,
    pub on_delete: OnDeleteAction,
    pub location: Location,
}

/// `<ReferentialConstraint>`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferentialConstraint {
    pub id: NodeId,
    pub principal: ConstraintRole,
    pub dependent: ConstraintRole,
    pub location: Location,
}

/// `<Principal>` / `<Dependent>` of a referential constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintRole {
    pub role: Arc<str>,
    pub properties: Vec<PropertyRef>,
    pub location: Location,
}
