//! Associations, their ends and referential constraints.

use std::rc::Rc;
use std::sync::Arc;

use super::binding::{Binding, Element, Unresolved, UnresolvedKind};
use super::cache::CacheCell;
use super::diagnostics::{EdmError, ErrorKind};
use super::model::SemanticModel;
use super::schema::SchemaId;
use super::structured::{Property, StructuredType};
use crate::ast::{self, Multiplicity, OnDeleteAction};
use crate::base::{Location, NodeId};

// ============================================================================
// ASSOCIATION
// ============================================================================

/// A two-ended relationship between entity types.
///
/// The association owns the wrappers of its ends: every path that reaches an
/// end (the association itself, navigation properties, association sets,
/// constraints) observes the same `Rc`.
pub struct Association {
    ast: Arc<ast::Association>,
    schema: SchemaId,
    qualified_name: Arc<str>,
    end1: CacheCell<Binding<Rc<AssociationEnd>>>,
    end2: CacheCell<Binding<Rc<AssociationEnd>>>,
    constraint: CacheCell<Option<Rc<ReferentialConstraint>>>,
}

impl Association {
    pub(crate) fn new(ast: Arc<ast::Association>, schema: SchemaId, namespace: &str) -> Self {
        let qualified_name = Arc::from(format!("{}.{}", namespace, ast.name));
        Self {
            ast,
            schema,
            qualified_name,
            end1: CacheCell::new(),
            end2: CacheCell::new(),
            constraint: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::Association> {
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

    /// The first declared end, or a bad-end placeholder when missing.
    pub fn end1(&self) -> Binding<Rc<AssociationEnd>> {
        self.end1.get_or_init(|| self.wrap_end(self.ast.end1.as_ref()))
    }

    /// The second declared end, or a bad-end placeholder when missing.
    pub fn end2(&self) -> Binding<Rc<AssociationEnd>> {
        self.end2.get_or_init(|| self.wrap_end(self.ast.end2.as_ref()))
    }

    fn wrap_end(&self, node: Option<&Arc<ast::AssociationEnd>>) -> Binding<Rc<AssociationEnd>> {
        match node {
            Some(node) => Binding::Resolved(Rc::new(AssociationEnd {
                ast: Arc::clone(node),
                schema: self.schema,
                association_name: self.qualified_name.clone(),
                entity_type: CacheCell::new(),
            })),
            None => Binding::Unresolved(Unresolved::new(
                UnresolvedKind::BadAssociationEnd,
                self.qualified_name.clone(),
                self.ast.location.clone(),
            )),
        }
    }

    /// The end declaring `role`, if either does.
    pub fn end_by_role(&self, role: &str) -> Option<Rc<AssociationEnd>> {
        [self.end1(), self.end2()]
            .into_iter()
            .filter_map(Binding::into_resolved)
            .find(|end| end.role() == role)
    }

    /// The end opposite `end`, when `end` is one of this association's ends.
    pub fn other_end(&self, end: &Rc<AssociationEnd>) -> Option<Binding<Rc<AssociationEnd>>> {
        let (end1, end2) = (self.end1(), self.end2());
        if end1.resolved().is_some_and(|e| Rc::ptr_eq(e, end)) {
            Some(end2)
        } else if end2.resolved().is_some_and(|e| Rc::ptr_eq(e, end)) {
            Some(end1)
        } else {
            None
        }
    }

    pub fn referential_constraint(&self) -> Option<Rc<ReferentialConstraint>> {
        self.constraint.get_or_init(|| {
            self.ast.constraint.as_ref().map(|node| {
                Rc::new(ReferentialConstraint {
                    ast: Arc::clone(node),
                    association_name: self.qualified_name.clone(),
                    end1: self.end1(),
                    end2: self.end2(),
                    errors: CacheCell::new(),
                    dependent_properties: CacheCell::new(),
                })
            })
        })
    }

    /// Bad-end errors, end type resolution errors and constraint errors.
    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let mut errors = Vec::new();
        for end in [self.end1(), self.end2()] {
            match end.resolved() {
                Some(end) => errors.extend(end.errors(model)),
                None => errors.extend(end.errors()),
            }
        }
        if let Some(constraint) = self.referential_constraint() {
            errors.extend(constraint.errors(model).iter().cloned());
        }
        errors
    }
}

impl Element for Association {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for Association {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for Association {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Association")
            .field("name", &self.qualified_name)
            .field("id", &self.ast.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ASSOCIATION END
// ============================================================================

pub struct AssociationEnd {
    ast: Arc<ast::AssociationEnd>,
    schema: SchemaId,
    association_name: Arc<str>,
    entity_type: CacheCell<Binding<Rc<StructuredType>>>,
}

impl AssociationEnd {
    pub fn ast(&self) -> &Arc<ast::AssociationEnd> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn role(&self) -> &str {
        &self.ast.role
    }

    pub fn association_name(&self) -> &str {
        &self.association_name
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.ast.multiplicity
    }

    pub fn on_delete(&self) -> OnDeleteAction {
        self.ast.on_delete
    }

    pub fn entity_type(&self, model: &SemanticModel) -> Binding<Rc<StructuredType>> {
        self.entity_type.get_or_init(|| {
            model
                .schema(self.schema)
                .resolve_entity_type(&self.ast.entity_type, &self.ast.location, model)
        })
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        self.entity_type(model).errors()
    }
}

impl Element for AssociationEnd {
    fn name(&self) -> &str {
        &self.ast.role
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for AssociationEnd {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for AssociationEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationEnd")
            .field("association", &self.association_name)
            .field("role", &self.ast.role)
            .field("multiplicity", &self.ast.multiplicity)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// REFERENTIAL CONSTRAINT
// ============================================================================

/// Declares that the principal end's key determines dependent properties.
pub struct ReferentialConstraint {
    ast: Arc<ast::ReferentialConstraint>,
    association_name: Arc<str>,
    end1: Binding<Rc<AssociationEnd>>,
    end2: Binding<Rc<AssociationEnd>>,
    errors: CacheCell<Rc<[EdmError]>>,
    dependent_properties: CacheCell<Rc<[Binding<Rc<Property>>]>>,
}

impl ReferentialConstraint {
    pub fn ast(&self) -> &Arc<ast::ReferentialConstraint> {
        &self.ast
    }

    pub fn principal_role(&self) -> &str {
        &self.ast.principal.role
    }

    pub fn dependent_role(&self) -> &str {
        &self.ast.dependent.role
    }

    fn end_for_role(&self, role: &str) -> Option<&Rc<AssociationEnd>> {
        [&self.end1, &self.end2]
            .into_iter()
            .filter_map(Binding::resolved)
            .find(|end| end.role() == role)
    }

    fn end_binding(&self, side: &ast::ConstraintRole) -> Binding<Rc<AssociationEnd>> {
        match self.end_for_role(&side.role) {
            Some(end) => Binding::Resolved(Rc::clone(end)),
            None => Binding::unresolved(
                UnresolvedKind::AssociationEnd,
                side.role.clone(),
                side.location.clone(),
            ),
        }
    }

    pub fn principal_end(&self) -> Binding<Rc<AssociationEnd>> {
        self.end_binding(&self.ast.principal)
    }

    pub fn dependent_end(&self) -> Binding<Rc<AssociationEnd>> {
        self.end_binding(&self.ast.dependent)
    }

    /// Validation errors, in check order.
    ///
    /// Role checks run first; property-level checks only run when both roles
    /// are distinct ends of the association.
    pub fn errors(&self, model: &SemanticModel) -> Rc<[EdmError]> {
        self.errors.get_or_init(|| Rc::from(self.validate(model)))
    }

    fn validate(&self, model: &SemanticModel) -> Vec<EdmError> {
        let principal = &self.ast.principal;
        let dependent = &self.ast.dependent;
        let mut errors = Vec::new();

        if principal.role == dependent.role {
            errors.push(EdmError::new(
                self.ast.location.clone(),
                ErrorKind::SameRoleReferredInReferentialConstraint(principal.role.clone()),
            ));
        }
        for side in [principal, dependent] {
            if self.end_for_role(&side.role).is_none() {
                errors.push(EdmError::new(
                    side.location.clone(),
                    ErrorKind::InvalidRoleInRelationshipConstraint {
                        role: side.role.clone(),
                        association: self.association_name.clone(),
                    },
                ));
            }
        }
        if !errors.is_empty() {
            return errors;
        }

        let principal_type = self
            .end_for_role(&principal.role)
            .and_then(|end| end.entity_type(model).into_resolved());
        let dependent_type = self
            .end_for_role(&dependent.role)
            .and_then(|end| end.entity_type(model).into_resolved());
        let key = principal_type.as_ref().and_then(|ty| ty.key(model));

        // a resolved principal without a key has zero key properties
        let key_count = principal_type
            .as_ref()
            .map(|_| key.as_ref().map_or(0, |key| key.len()));
        if principal.properties.len() != dependent.properties.len()
            || key_count.is_some_and(|count| count != principal.properties.len())
        {
            errors.push(EdmError::new(
                self.ast.location.clone(),
                ErrorKind::MismatchNumberOfPropertiesInRelationshipConstraint {
                    association: self.association_name.clone(),
                    principal: principal.properties.len(),
                    dependent: dependent.properties.len(),
                    key: key_count.unwrap_or(0),
                },
            ));
        }

        if let Some(principal_type) = &principal_type {
            for property_ref in &principal.properties {
                let in_key = key.as_ref().is_some_and(|key| {
                    key.iter()
                        .filter_map(Binding::resolved)
                        .any(|p| p.name() == &*property_ref.name)
                });
                if !in_key {
                    errors.push(EdmError::new(
                        property_ref.location.clone(),
                        ErrorKind::BadPrincipalPropertiesInReferentialConstraint {
                            property: property_ref.name.clone(),
                            entity_type: Arc::from(principal_type.qualified_name()),
                        },
                    ));
                }
            }
        }

        if let Some(dependent_type) = &dependent_type {
            for property_ref in &dependent.properties {
                let found = dependent_type
                    .find_property(&property_ref.name, model)
                    .is_some_and(|member| member.as_structural().is_some());
                if !found {
                    errors.push(EdmError::new(
                        property_ref.location.clone(),
                        ErrorKind::InvalidPropertyInRelationshipConstraint {
                            property: property_ref.name.clone(),
                            entity_type: Arc::from(dependent_type.qualified_name()),
                        },
                    ));
                }
            }
        }

        errors
    }

    /// Dependent properties in the principal type's key order.
    ///
    /// When the constraint is invalid, or either end's type is unresolved,
    /// every dependent reference becomes an unresolved-property placeholder
    /// in declaration order.
    pub fn dependent_properties(&self, model: &SemanticModel) -> Rc<[Binding<Rc<Property>>]> {
        self.dependent_properties.get_or_init(|| {
            self.ordered_dependent_properties(model)
                .unwrap_or_else(|| self.unresolved_dependent_properties())
                .into()
        })
    }

    fn ordered_dependent_properties(
        &self,
        model: &SemanticModel,
    ) -> Option<Vec<Binding<Rc<Property>>>> {
        if !self.errors(model).is_empty() {
            return None;
        }
        let principal = &self.ast.principal;
        let dependent = &self.ast.dependent;
        let principal_type = self
            .end_for_role(&principal.role)?
            .entity_type(model)
            .into_resolved()?;
        let dependent_type = self
            .end_for_role(&dependent.role)?
            .entity_type(model)
            .into_resolved()?;
        let key = principal_type.key(model)?;

        let mut ordered = Vec::with_capacity(dependent.properties.len());
        for key_property in key.iter() {
            let key_property = key_property.resolved()?;
            let position = principal
                .properties
                .iter()
                .position(|r| &*r.name == key_property.name())?;
            let dependent_ref = dependent.properties.get(position)?;
            let property = dependent_type
                .find_property(&dependent_ref.name, model)?
                .as_structural()
                .cloned()?;
            ordered.push(Binding::Resolved(property));
        }
        (ordered.len() == dependent.properties.len()).then_some(ordered)
    }

    fn unresolved_dependent_properties(&self) -> Vec<Binding<Rc<Property>>> {
        self.ast
            .dependent
            .properties
            .iter()
            .map(|property_ref| {
                Binding::unresolved(
                    UnresolvedKind::Property,
                    property_ref.name.clone(),
                    property_ref.location.clone(),
                )
            })
            .collect()
    }
}

impl std::fmt::Debug for ReferentialConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferentialConstraint")
            .field("association", &self.association_name)
            .field("principal", &self.ast.principal.role)
            .field("dependent", &self.ast.dependent.role)
            .finish_non_exhaustive()
    }
}
