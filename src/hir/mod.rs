//! High-level IR (HIR): the lazily-resolved semantic model.
//!
//! Every semantic element wraps exactly one AST node and resolves its
//! cross-references on first access. Results are memoized per wrapper in a
//! [`CacheCell`], which also turns reentrant computations into cyclic
//! placeholders instead of unbounded recursion.
//!
//! ## Key Types
//!
//! - [`SemanticModel`] - Model-wide dictionaries and the query surface
//! - [`ModelBuilder`] - Registers schema ASTs and freezes the dictionaries
//! - [`Binding`] - Resolved, ambiguous or unresolved reference
//! - [`EdmError`] - A semantic error with its location
//!
//! ## Resolution Layers
//!
//! ```text
//! ModelBuilder::build        ← register elements, derived-type index
//!     │
//!     ▼
//! Schema::resolve_*          ← alias substitution, model lookup
//!     │
//!     ▼
//! wrapper accessors          ← base types, keys, ends, sets (memoized)
//!     │
//!     ▼
//! SemanticModel::errors      ← full-graph error walk
//! ```

mod annotation;
mod association;
mod association_set;
mod binding;
mod cache;
mod container;
mod diagnostics;
mod entity_set;
mod enum_type;
mod expression;
mod function;
mod model;
mod schema;
mod structured;
mod type_ref;
mod wrap;

pub use annotation::{AnnotationTarget, Term, VocabularyAnnotation};
pub use association::{Association, AssociationEnd, ReferentialConstraint};
pub use association_set::{AssociationSet, AssociationSetEnd};
pub use binding::{Ambiguous, Binding, Element, Unresolved, UnresolvedKind};
pub use cache::CacheCell;
pub use container::EntityContainer;
pub use diagnostics::{Diagnostic, DiagnosticCollector, EdmError, ErrorCode, ErrorKind};
pub use entity_set::{AssociationSetMapping, EntitySet, NavigationTarget, SetKey};
pub use enum_type::{EnumMember, EnumType};
pub use expression::{
    LabeledExpression, LabeledRegistry, annotation_expressions, child_expressions,
    expression_errors, resolve_labeled_reference, walk_expression,
};
pub use function::{Function, FunctionImport, Parameter, ValueTerm};
pub use model::{BuildError, ModelBuilder, SemanticModel};
pub use schema::{Schema, SchemaElement, SchemaId};
pub use structured::{Member, NavigationProperty, Property, SchemaType, StructuredType};
pub use type_ref::{
    BinaryFacets, DecimalFacets, PrimitiveFamily, PrimitiveKind, RowType, SpatialFacets,
    StringFacets, TemporalFacets, TypeReference, TypeReferenceKind,
};
pub use wrap::WrapTable;
