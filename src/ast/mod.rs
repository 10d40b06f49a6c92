//! Schema AST: the immutable input of the semantic layer.
//!
//! These types are the contract with the external CSDL parser. They carry
//! exactly what resolution needs: names, role names, multiplicities, facet
//! values, nested expression/annotation trees and a [`Location`] per node.
//! Every node that the semantic layer wraps carries a [`NodeId`]; ids must be
//! unique across all schemas handed to one model.
//!
//! Child nodes are held behind `Arc` so wrappers can keep a cheap handle to
//! the exact node they wrap.
//!
//! [`Location`]: crate::base::Location
//! [`NodeId`]: crate::base::NodeId

mod container;
mod elements;
mod expressions;
mod namespace;
mod relationships;
mod type_ref;

pub use container::{
    AssociationSet, AssociationSetEnd, DirectAnnotation, EntityContainer, EntitySet,
    FunctionImport,
};
pub use elements::{
    EnumMember, EnumType, Function, NavigationProperty, Parameter, ParameterMode, Property,
    PropertyRef, StructuredKind, StructuredType, ValueTerm,
};
pub use expressions::{
    AnnotationKind, Constant, Expression, ExpressionKind, PropertyValue, VocabularyAnnotation,
};
pub use namespace::{AnnotationsBlock, Schema, Using};
pub use relationships::{
    Association, AssociationEnd, ConstraintRole, Multiplicity, OnDeleteAction,
    ReferentialConstraint,
};
pub use type_ref::{Facets, MaxLength, Srid, TypeRef, TypeRefKind};
