//! Type reference nodes.

use std::sync::Arc;

use super::Property;
use crate::base::{Location, NodeId};

/// A reference to a type, as written at a use site (property, parameter,
/// return type, value term).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeRef {
    pub id: NodeId,
    pub kind: TypeRefKind,
    pub nullable: bool,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeRefKind {
    /// A primitive (`Edm.Int32`) or schema type (`NS.Customer`, `Alias.Customer`).
    Named { name: Arc<str>, facets: Facets },
    /// An anonymous row type.
    Row { properties: Vec<Arc<Property>> },
    /// `Collection(T)`
    Collection { element: Arc<TypeRef> },
    /// `Ref(T)`
    EntityReference { entity_type: Arc<str> },
}

/// Primitive facets. Which ones apply depends on the primitive family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Facets {
    pub max_length: Option<MaxLength>,
    pub is_fixed_length: Option<bool>,
    pub is_unicode: Option<bool>,
    pub collation: Option<Arc<str>>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub srid: Option<Srid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaxLength {
    Max,
    Value(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Srid {
    Variable,
    Value(i32),
}
