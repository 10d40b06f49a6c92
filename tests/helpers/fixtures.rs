//! Hand-built schema ASTs for model tests.
//!
//! One [`Fixture`] per test: it hands out unique node ids and a fresh line
//! number per node so errors can be told apart by location.

use std::sync::Arc;

use csdl::ast::{
    AnnotationKind, AnnotationsBlock, Association, AssociationEnd, AssociationSet,
    AssociationSetEnd, ConstraintRole, EntityContainer, EntitySet, EnumMember, EnumType,
    Expression, ExpressionKind, Facets, Function, FunctionImport, Multiplicity,
    NavigationProperty, OnDeleteAction, Parameter, ParameterMode, Property, PropertyRef,
    ReferentialConstraint, Schema, StructuredKind, StructuredType, TypeRef, TypeRefKind, Using,
    ValueTerm, VocabularyAnnotation,
};
use csdl::{Location, NodeId, NodeIdAllocator};

pub const SOURCE: &str = "test.csdl";

#[derive(Debug, Default)]
pub struct Fixture {
    ids: NodeIdAllocator,
    line: usize,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&mut self) -> NodeId {
        self.ids.alloc()
    }

    /// A location on the next unused line.
    pub fn loc(&mut self) -> Location {
        self.line += 1;
        Location::at(SOURCE, self.line, 0)
    }

    // ------------------------------------------------------------------
    // Schemas
    // ------------------------------------------------------------------

    pub fn schema(&mut self, namespace: &str) -> Schema {
        let id = self.id();
        let location = self.loc();
        Schema::new(id, namespace, location)
    }

    pub fn using(&mut self, namespace: &str, alias: &str) -> Using {
        Using {
            namespace: Arc::from(namespace),
            alias: Arc::from(alias),
            location: self.loc(),
        }
    }

    // ------------------------------------------------------------------
    // Type references
    // ------------------------------------------------------------------

    pub fn named(&mut self, name: &str) -> Arc<TypeRef> {
        self.named_with(name, Facets::default())
    }

    pub fn named_with(&mut self, name: &str, facets: Facets) -> Arc<TypeRef> {
        Arc::new(TypeRef {
            id: self.id(),
            kind: TypeRefKind::Named {
                name: Arc::from(name),
                facets,
            },
            nullable: true,
            location: self.loc(),
        })
    }

    pub fn collection(&mut self, element: Arc<TypeRef>) -> Arc<TypeRef> {
        Arc::new(TypeRef {
            id: self.id(),
            kind: TypeRefKind::Collection { element },
            nullable: true,
            location: self.loc(),
        })
    }

    pub fn entity_ref(&mut self, entity_type: &str) -> Arc<TypeRef> {
        Arc::new(TypeRef {
            id: self.id(),
            kind: TypeRefKind::EntityReference {
                entity_type: Arc::from(entity_type),
            },
            nullable: true,
            location: self.loc(),
        })
    }

    // ------------------------------------------------------------------
    // Types and members
    // ------------------------------------------------------------------

    pub fn property(&mut self, name: &str, type_name: &str) -> Arc<Property> {
        let type_ref = self.named(type_name);
        Arc::new(Property {
            id: self.id(),
            name: Arc::from(name),
            type_ref,
            default_value: None,
            is_concurrency_token: false,
            annotations: Vec::new(),
            location: self.loc(),
        })
    }

    fn structured(&mut self, name: &str, kind: StructuredKind) -> StructuredType {
        StructuredType {
            id: self.id(),
            name: Arc::from(name),
            kind,
            base_type: None,
            is_abstract: false,
            is_open: false,
            key: Vec::new(),
            properties: Vec::new(),
            navigation_properties: Vec::new(),
            annotations: Vec::new(),
            location: self.loc(),
        }
    }

    /// An entity type with one `Edm.Int32` property per key name.
    pub fn entity_type(&mut self, name: &str, key: &[&str]) -> StructuredType {
        let mut ty = self.structured(name, StructuredKind::Entity);
        for key_name in key {
            ty.properties.push(self.property(key_name, "Edm.Int32"));
            let location = self.loc();
            ty.key.push(PropertyRef {
                name: Arc::from(*key_name),
                location,
            });
        }
        ty
    }

    pub fn derived_entity_type(&mut self, name: &str, base: &str) -> StructuredType {
        let mut ty = self.structured(name, StructuredKind::Entity);
        ty.base_type = Some(Arc::from(base));
        ty
    }

    pub fn complex_type(&mut self, name: &str) -> StructuredType {
        self.structured(name, StructuredKind::Complex)
    }

    pub fn navigation(
        &mut self,
        name: &str,
        relationship: &str,
        from_role: &str,
        to_role: &str,
    ) -> Arc<NavigationProperty> {
        Arc::new(NavigationProperty {
            id: self.id(),
            name: Arc::from(name),
            relationship: Arc::from(relationship),
            from_role: Arc::from(from_role),
            to_role: Arc::from(to_role),
            annotations: Vec::new(),
            location: self.loc(),
        })
    }

    pub fn enum_type(&mut self, name: &str, members: &[(&str, Option<i64>)]) -> EnumType {
        let id = self.id();
        let members = members
            .iter()
            .map(|(member, value)| {
                Arc::new(EnumMember {
                    id: self.id(),
                    name: Arc::from(*member),
                    value: *value,
                    annotations: Vec::new(),
                    location: self.loc(),
                })
            })
            .collect();
        EnumType {
            id,
            name: Arc::from(name),
            underlying_type: None,
            is_flags: false,
            members,
            annotations: Vec::new(),
            location: self.loc(),
        }
    }

    // ------------------------------------------------------------------
    // Associations
    // ------------------------------------------------------------------

    pub fn end(&mut self, role: &str, entity_type: &str, multiplicity: Multiplicity) -> Arc<AssociationEnd> {
        Arc::new(AssociationEnd {
            id: self.id(),
            role: Arc::from(role),
            entity_type: Arc::from(entity_type),
            multiplicity,
            on_delete: OnDeleteAction::None,
            location: self.loc(),
        })
    }

    pub fn association(
        &mut self,
        name: &str,
        end1: Option<Arc<AssociationEnd>>,
        end2: Option<Arc<AssociationEnd>>,
    ) -> Association {
        Association {
            id: self.id(),
            name: Arc::from(name),
            end1,
            end2,
            constraint: None,
            annotations: Vec::new(),
            location: self.loc(),
        }
    }

    pub fn constraint(
        &mut self,
        principal: (&str, &[&str]),
        dependent: (&str, &[&str]),
    ) -> Arc<ReferentialConstraint> {
        let principal = self.constraint_role(principal.0, principal.1);
        let dependent = self.constraint_role(dependent.0, dependent.1);
        Arc::new(ReferentialConstraint {
            id: self.id(),
            principal,
            dependent,
            location: self.loc(),
        })
    }

    fn constraint_role(&mut self, role: &str, properties: &[&str]) -> ConstraintRole {
        let properties = properties
            .iter()
            .map(|name| PropertyRef {
                name: Arc::from(*name),
                location: self.loc(),
            })
            .collect();
        ConstraintRole {
            role: Arc::from(role),
            properties,
            location: self.loc(),
        }
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    pub fn container(&mut self, name: &str, extends: Option<&str>) -> EntityContainer {
        EntityContainer {
            id: self.id(),
            name: Arc::from(name),
            extends: extends.map(Arc::from),
            is_default: false,
            entity_sets: Vec::new(),
            association_sets: Vec::new(),
            function_imports: Vec::new(),
            annotations: Vec::new(),
            location: self.loc(),
        }
    }

    pub fn entity_set(&mut self, name: &str, entity_type: &str) -> Arc<EntitySet> {
        Arc::new(EntitySet {
            id: self.id(),
            name: Arc::from(name),
            entity_type: Arc::from(entity_type),
            direct_annotations: Vec::new(),
            annotations: Vec::new(),
            location: self.loc(),
        })
    }

    pub fn set_end(&mut self, role: Option<&str>, entity_set: &str) -> Arc<AssociationSetEnd> {
        Arc::new(AssociationSetEnd {
            id: self.id(),
            role: role.map(Arc::from),
            entity_set: Arc::from(entity_set),
            direct_annotations: Vec::new(),
            location: self.loc(),
        })
    }

    pub fn association_set(
        &mut self,
        name: &str,
        association: &str,
        end1: Option<Arc<AssociationSetEnd>>,
        end2: Option<Arc<AssociationSetEnd>>,
    ) -> Arc<AssociationSet> {
        Arc::new(AssociationSet {
            id: self.id(),
            name: Arc::from(name),
            association: Arc::from(association),
            end1,
            end2,
            direct_annotations: Vec::new(),
            location: self.loc(),
        })
    }

    pub fn function_import(&mut self, name: &str, params: &[(&str, &str)]) -> FunctionImport {
        let parameters = self.parameters(params);
        FunctionImport {
            id: self.id(),
            name: Arc::from(name),
            return_type: None,
            entity_set: None,
            is_side_effecting: false,
            is_bindable: false,
            is_composable: false,
            parameters,
            annotations: Vec::new(),
            location: self.loc(),
        }
    }

    // ------------------------------------------------------------------
    // Functions and terms
    // ------------------------------------------------------------------

    fn parameters(&mut self, params: &[(&str, &str)]) -> Vec<Arc<Parameter>> {
        params
            .iter()
            .map(|(name, type_name)| {
                let type_ref = self.named(type_name);
                self.parameter(name, type_ref)
            })
            .collect()
    }

    pub fn parameter(&mut self, name: &str, type_ref: Arc<TypeRef>) -> Arc<Parameter> {
        Arc::new(Parameter {
            id: self.id(),
            name: Arc::from(name),
            type_ref,
            mode: ParameterMode::In,
            annotations: Vec::new(),
            location: self.loc(),
        })
    }

    pub fn function(&mut self, name: &str, params: &[(&str, &str)]) -> Function {
        let parameters = self.parameters(params);
        Function {
            id: self.id(),
            name: Arc::from(name),
            return_type: None,
            parameters,
            defining_expression: None,
            annotations: Vec::new(),
            location: self.loc(),
        }
    }

    pub fn value_term(&mut self, name: &str, type_name: &str) -> Arc<ValueTerm> {
        let type_ref = self.named(type_name);
        Arc::new(ValueTerm {
            id: self.id(),
            name: Arc::from(name),
            type_ref,
            annotations: Vec::new(),
            location: self.loc(),
        })
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    pub fn expr(&mut self, kind: ExpressionKind) -> Arc<Expression> {
        Arc::new(Expression {
            id: self.id(),
            kind,
            location: self.loc(),
        })
    }

    pub fn value_annotation(&mut self, term: &str, value: Arc<Expression>) -> Arc<VocabularyAnnotation> {
        Arc::new(VocabularyAnnotation {
            id: self.id(),
            term: Arc::from(term),
            qualifier: None,
            kind: AnnotationKind::Value(value),
            location: self.loc(),
        })
    }

    pub fn annotations_block(
        &mut self,
        target: &str,
        annotations: Vec<Arc<VocabularyAnnotation>>,
    ) -> AnnotationsBlock {
        AnnotationsBlock {
            target: Arc::from(target),
            qualifier: None,
            annotations,
            location: self.loc(),
        }
    }
}

// ============================================================================
// PREBUILT SCHEMAS
// ============================================================================

/// `Shop` namespace: `Product`/`Category` joined by `ProductCategory`
/// (roles `P` and `C`), exposed as `Products`/`Categories` in `Store`.
pub fn shop_schema(fx: &mut Fixture) -> Schema {
    let mut schema = fx.schema("Shop");

    let mut product = fx.entity_type("Product", &["Id"]);
    let to_category = fx.navigation("Category", "Shop.ProductCategory", "P", "C");
    product.navigation_properties.push(to_category);
    let mut category = fx.entity_type("Category", &["Id"]);
    let to_products = fx.navigation("Products", "Shop.ProductCategory", "C", "P");
    category.navigation_properties.push(to_products);
    schema.structured_types.push(Arc::new(product));
    schema.structured_types.push(Arc::new(category));

    let p = fx.end("P", "Shop.Product", Multiplicity::Many);
    let c = fx.end("C", "Shop.Category", Multiplicity::ZeroOrOne);
    schema
        .associations
        .push(Arc::new(fx.association("ProductCategory", Some(p), Some(c))));

    let mut store = fx.container("Store", None);
    store.entity_sets.push(fx.entity_set("Products", "Shop.Product"));
    store.entity_sets.push(fx.entity_set("Categories", "Shop.Category"));
    let end1 = fx.set_end(Some("P"), "Products");
    let end2 = fx.set_end(Some("C"), "Categories");
    store
        .association_sets
        .push(fx.association_set("ProductCategories", "Shop.ProductCategory", Some(end1), Some(end2)));
    schema.entity_containers.push(Arc::new(store));
    schema
}
