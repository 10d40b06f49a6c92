//! Type references: classification and resolution of use-site types.
//!
//! A type reference is classified by a fixed table: named primitives map to
//! [`TypeReferenceKind::Primitive`] or to a facet-carrying variant for the
//! binary, decimal, string, temporal and spatial families; every other name
//! resolves against the schema scope (after alias substitution) to a
//! [`Binding<SchemaType>`]. Row, collection and entity-reference types wrap
//! nested definitions.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::binding::{Binding, Element};
use super::diagnostics::EdmError;
use super::model::SemanticModel;
use super::schema::SchemaId;
use super::structured::{Property, SchemaType, StructuredType};
use crate::ast::{self, MaxLength, Srid, TypeRefKind};
use crate::base::Location;

// ============================================================================
// PRIMITIVE KINDS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    DateTime,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    Stream,
    Time,
    Geography,
    GeographyPoint,
    GeographyLineString,
    GeographyPolygon,
    GeographyCollection,
    GeographyMultiPolygon,
    GeographyMultiLineString,
    GeographyMultiPoint,
    Geometry,
    GeometryPoint,
    GeometryLineString,
    GeometryPolygon,
    GeometryCollection,
    GeometryMultiPolygon,
    GeometryMultiLineString,
    GeometryMultiPoint,
}

/// Which facets a primitive kind carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveFamily {
    Simple,
    Binary,
    Decimal,
    String,
    Temporal,
    Spatial,
}

const PRIMITIVES: &[(&str, PrimitiveKind)] = &[
    ("Edm.Binary", PrimitiveKind::Binary),
    ("Edm.Boolean", PrimitiveKind::Boolean),
    ("Edm.Byte", PrimitiveKind::Byte),
    ("Edm.DateTime", PrimitiveKind::DateTime),
    ("Edm.DateTimeOffset", PrimitiveKind::DateTimeOffset),
    ("Edm.Decimal", PrimitiveKind::Decimal),
    ("Edm.Double", PrimitiveKind::Double),
    ("Edm.Guid", PrimitiveKind::Guid),
    ("Edm.Int16", PrimitiveKind::Int16),
    ("Edm.Int32", PrimitiveKind::Int32),
    ("Edm.Int64", PrimitiveKind::Int64),
    ("Edm.SByte", PrimitiveKind::SByte),
    ("Edm.Single", PrimitiveKind::Single),
    ("Edm.String", PrimitiveKind::String),
    ("Edm.Stream", PrimitiveKind::Stream),
    ("Edm.Time", PrimitiveKind::Time),
    ("Edm.Geography", PrimitiveKind::Geography),
    ("Edm.GeographyPoint", PrimitiveKind::GeographyPoint),
    ("Edm.GeographyLineString", PrimitiveKind::GeographyLineString),
    ("Edm.GeographyPolygon", PrimitiveKind::GeographyPolygon),
    ("Edm.GeographyCollection", PrimitiveKind::GeographyCollection),
    ("Edm.GeographyMultiPolygon", PrimitiveKind::GeographyMultiPolygon),
    ("Edm.GeographyMultiLineString", PrimitiveKind::GeographyMultiLineString),
    ("Edm.GeographyMultiPoint", PrimitiveKind::GeographyMultiPoint),
    ("Edm.Geometry", PrimitiveKind::Geometry),
    ("Edm.GeometryPoint", PrimitiveKind::GeometryPoint),
    ("Edm.GeometryLineString", PrimitiveKind::GeometryLineString),
    ("Edm.GeometryPolygon", PrimitiveKind::GeometryPolygon),
    ("Edm.GeometryCollection", PrimitiveKind::GeometryCollection),
    ("Edm.GeometryMultiPolygon", PrimitiveKind::GeometryMultiPolygon),
    ("Edm.GeometryMultiLineString", PrimitiveKind::GeometryMultiLineString),
    ("Edm.GeometryMultiPoint", PrimitiveKind::GeometryMultiPoint),
];

impl PrimitiveKind {
    /// Look up a built-in primitive by its `Edm.`-qualified name.
    pub fn from_qualified_name(name: &str) -> Option<Self> {
        PRIMITIVES
            .iter()
            .find(|(qualified, _)| *qualified == name)
            .map(|(_, kind)| *kind)
    }

    pub fn qualified_name(self) -> &'static str {
        PRIMITIVES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(qualified, _)| *qualified)
            .unwrap_or("Edm.Unknown")
    }

    pub fn family(self) -> PrimitiveFamily {
        match self {
            PrimitiveKind::Binary => PrimitiveFamily::Binary,
            PrimitiveKind::Decimal => PrimitiveFamily::Decimal,
            PrimitiveKind::String => PrimitiveFamily::String,
            PrimitiveKind::DateTime | PrimitiveKind::DateTimeOffset | PrimitiveKind::Time => {
                PrimitiveFamily::Temporal
            }
            PrimitiveKind::Geography
            | PrimitiveKind::GeographyPoint
            | PrimitiveKind::GeographyLineString
            | PrimitiveKind::GeographyPolygon
            | PrimitiveKind::GeographyCollection
            | PrimitiveKind::GeographyMultiPolygon
            | PrimitiveKind::GeographyMultiLineString
            | PrimitiveKind::GeographyMultiPoint
            | PrimitiveKind::Geometry
            | PrimitiveKind::GeometryPoint
            | PrimitiveKind::GeometryLineString
            | PrimitiveKind::GeometryPolygon
            | PrimitiveKind::GeometryCollection
            | PrimitiveKind::GeometryMultiPolygon
            | PrimitiveKind::GeometryMultiLineString
            | PrimitiveKind::GeometryMultiPoint => PrimitiveFamily::Spatial,
            _ => PrimitiveFamily::Simple,
        }
    }

    /// Integral kinds usable as an enum's underlying type.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::SByte
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
        )
    }
}

// ============================================================================
// FACETS
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BinaryFacets {
    pub max_length: Option<MaxLength>,
    pub is_fixed_length: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecimalFacets {
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringFacets {
    pub max_length: Option<MaxLength>,
    pub is_fixed_length: Option<bool>,
    pub is_unicode: Option<bool>,
    pub collation: Option<Arc<str>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemporalFacets {
    pub precision: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpatialFacets {
    pub srid: Option<Srid>,
}

// ============================================================================
// TYPE REFERENCES
// ============================================================================

#[derive(Clone, Debug)]
pub enum TypeReferenceKind {
    Primitive(PrimitiveKind),
    Binary(BinaryFacets),
    Decimal(DecimalFacets),
    String(StringFacets),
    Temporal(PrimitiveKind, TemporalFacets),
    Spatial(PrimitiveKind, SpatialFacets),
    Schema(Binding<SchemaType>),
    Row(Rc<RowType>),
    Collection(Rc<TypeReference>),
    EntityReference(Binding<Rc<StructuredType>>),
}

/// A resolved type reference.
#[derive(Clone, Debug)]
pub struct TypeReference {
    kind: TypeReferenceKind,
    nullable: bool,
    location: Location,
}

impl TypeReference {
    /// Classify and resolve `node` in the scope of schema `scope`.
    pub(crate) fn resolve(node: &ast::TypeRef, scope: SchemaId, model: &SemanticModel) -> Self {
        let kind = match &node.kind {
            TypeRefKind::Named { name, facets } => match PrimitiveKind::from_qualified_name(name) {
                Some(primitive) => Self::classify_primitive(primitive, facets),
                None => TypeReferenceKind::Schema(model.schema(scope).resolve_type(
                    name,
                    &node.location,
                    model,
                )),
            },
            TypeRefKind::Row { properties } => {
                TypeReferenceKind::Row(Rc::new(RowType::new(properties, scope)))
            }
            TypeRefKind::Collection { element } => {
                TypeReferenceKind::Collection(Rc::new(Self::resolve(element, scope, model)))
            }
            TypeRefKind::EntityReference { entity_type } => TypeReferenceKind::EntityReference(
                model
                    .schema(scope)
                    .resolve_entity_type(entity_type, &node.location, model),
            ),
        };
        Self {
            kind,
            nullable: node.nullable,
            location: node.location.clone(),
        }
    }

    fn classify_primitive(kind: PrimitiveKind, facets: &ast::Facets) -> TypeReferenceKind {
        match kind.family() {
            PrimitiveFamily::Simple => TypeReferenceKind::Primitive(kind),
            PrimitiveFamily::Binary => TypeReferenceKind::Binary(BinaryFacets {
                max_length: facets.max_length,
                is_fixed_length: facets.is_fixed_length,
            }),
            PrimitiveFamily::Decimal => TypeReferenceKind::Decimal(DecimalFacets {
                precision: facets.precision,
                scale: facets.scale,
            }),
            PrimitiveFamily::String => TypeReferenceKind::String(StringFacets {
                max_length: facets.max_length,
                is_fixed_length: facets.is_fixed_length,
                is_unicode: facets.is_unicode,
                collation: facets.collation.clone(),
            }),
            PrimitiveFamily::Temporal => TypeReferenceKind::Temporal(
                kind,
                TemporalFacets {
                    precision: facets.precision,
                },
            ),
            PrimitiveFamily::Spatial => {
                TypeReferenceKind::Spatial(kind, SpatialFacets { srid: facets.srid })
            }
        }
    }

    pub fn kind(&self) -> &TypeReferenceKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The primitive kind, for any primitive family.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match &self.kind {
            TypeReferenceKind::Primitive(kind)
            | TypeReferenceKind::Temporal(kind, _)
            | TypeReferenceKind::Spatial(kind, _) => Some(*kind),
            TypeReferenceKind::Binary(_) => Some(PrimitiveKind::Binary),
            TypeReferenceKind::Decimal(_) => Some(PrimitiveKind::Decimal),
            TypeReferenceKind::String(_) => Some(PrimitiveKind::String),
            _ => None,
        }
    }

    pub fn schema_type(&self) -> Option<&Binding<SchemaType>> {
        match &self.kind {
            TypeReferenceKind::Schema(binding) => Some(binding),
            _ => None,
        }
    }

    /// Element type of a collection reference.
    pub fn collection_element(&self) -> Option<&TypeReference> {
        match &self.kind {
            TypeReferenceKind::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// Target of an entity-reference (`Ref(T)`) type.
    pub fn referenced_entity_type(&self) -> Option<&Binding<Rc<StructuredType>>> {
        match &self.kind {
            TypeReferenceKind::EntityReference(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, TypeReferenceKind::Collection(_))
    }

    /// Errors from names inside this reference that failed to resolve.
    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        match &self.kind {
            TypeReferenceKind::Schema(binding) => binding.errors(),
            TypeReferenceKind::EntityReference(binding) => binding.errors(),
            TypeReferenceKind::Collection(element) => element.errors(model),
            TypeReferenceKind::Row(row) => row
                .properties()
                .iter()
                .flat_map(|property| property.errors(model))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Structural equivalence: same nullability and equivalent definitions.
    pub fn is_equivalent_to(&self, other: &TypeReference, model: &SemanticModel) -> bool {
        self.nullable == other.nullable && self.definition_equivalent_to(other, model)
    }

    /// Equivalence of the referenced definitions, ignoring nullability.
    pub fn definition_equivalent_to(&self, other: &TypeReference, model: &SemanticModel) -> bool {
        use TypeReferenceKind as K;
        match (&self.kind, &other.kind) {
            (K::Primitive(a), K::Primitive(b)) => a == b,
            (K::Binary(a), K::Binary(b)) => a == b,
            (K::Decimal(a), K::Decimal(b)) => a == b,
            (K::String(a), K::String(b)) => a == b,
            (K::Temporal(ka, a), K::Temporal(kb, b)) => ka == kb && a == b,
            (K::Spatial(ka, a), K::Spatial(kb, b)) => ka == kb && a == b,
            (K::Schema(a), K::Schema(b)) => {
                same_binding(a, b, |x, y| x.same_as(y))
            }
            (K::EntityReference(a), K::EntityReference(b)) => {
                same_binding(a, b, |x, y| Rc::ptr_eq(x, y))
            }
            (K::Collection(a), K::Collection(b)) => a.is_equivalent_to(b, model),
            (K::Row(a), K::Row(b)) => a.is_equivalent_to(b, model),
            _ => false,
        }
    }

    /// Display name, e.g. `Edm.Int32`, `Collection(NS.Order)`, `Ref(NS.Customer)`.
    pub fn full_name(&self) -> String {
        match &self.kind {
            TypeReferenceKind::Schema(binding) => match binding.identity() {
                Some(schema_type) => schema_type.qualified_name().to_string(),
                None => binding.name().to_string(),
            },
            TypeReferenceKind::EntityReference(binding) => match binding.identity() {
                Some(entity) => format!("Ref({})", entity.qualified_name()),
                None => format!("Ref({})", binding.name()),
            },
            TypeReferenceKind::Collection(element) => {
                format!("Collection({})", element.full_name())
            }
            TypeReferenceKind::Row(row) => {
                let names: Vec<&str> = row.properties().iter().map(|p| p.name()).collect();
                format!("Row({})", names.join(", "))
            }
            _ => self
                .primitive_kind()
                .map(PrimitiveKind::qualified_name)
                .unwrap_or("Edm.Unknown")
                .to_string(),
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

fn same_binding<T: Element>(
    a: &Binding<T>,
    b: &Binding<T>,
    same: impl Fn(&T, &T) -> bool,
) -> bool {
    match (a.identity(), b.identity()) {
        (Some(x), Some(y)) => same(x, y),
        (None, None) => a.name() == b.name(),
        _ => false,
    }
}

// ============================================================================
// ROW TYPES
// ============================================================================

/// An anonymous structural type declared inline at a use site.
#[derive(Debug)]
pub struct RowType {
    properties: Vec<Rc<Property>>,
}

impl RowType {
    fn new(properties: &[Arc<ast::Property>], scope: SchemaId) -> Self {
        let declaring: Arc<str> = Arc::from("Row");
        Self {
            properties: properties
                .iter()
                .map(|node| Rc::new(Property::new(Arc::clone(node), scope, declaring.clone())))
                .collect(),
        }
    }

    pub fn properties(&self) -> &[Rc<Property>] {
        &self.properties
    }

    pub fn find_property(&self, name: &str) -> Option<&Rc<Property>> {
        self.properties.iter().find(|p| p.name() == name)
    }

    fn is_equivalent_to(&self, other: &RowType, model: &SemanticModel) -> bool {
        self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .zip(other.properties.iter())
                .all(|(a, b)| {
                    a.name() == b.name()
                        && a.type_ref(model).is_equivalent_to(&b.type_ref(model), model)
                })
    }
}
