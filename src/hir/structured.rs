//! Entity and complex types, their properties and navigation properties.

use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::association::{Association, AssociationEnd};
use super::binding::{Binding, Element, Unresolved, UnresolvedKind};
use super::cache::CacheCell;
use super::diagnostics::EdmError;
use super::enum_type::EnumType;
use super::model::SemanticModel;
use super::schema::SchemaId;
use super::type_ref::TypeReference;
use crate::ast::{self, StructuredKind};
use crate::base::{Location, NodeId};

// ============================================================================
// SCHEMA TYPES
// ============================================================================

/// A named type declared in a schema.
#[derive(Clone, Debug)]
pub enum SchemaType {
    Structured(Rc<StructuredType>),
    Enum(Rc<EnumType>),
}

impl SchemaType {
    pub fn qualified_name(&self) -> &str {
        match self {
            SchemaType::Structured(ty) => ty.qualified_name(),
            SchemaType::Enum(ty) => ty.qualified_name(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        match self {
            SchemaType::Structured(ty) => ty.node_id(),
            SchemaType::Enum(ty) => ty.node_id(),
        }
    }

    pub fn schema_id(&self) -> SchemaId {
        match self {
            SchemaType::Structured(ty) => ty.schema_id(),
            SchemaType::Enum(ty) => ty.schema_id(),
        }
    }

    /// Wrapper identity.
    pub fn same_as(&self, other: &SchemaType) -> bool {
        match (self, other) {
            (SchemaType::Structured(a), SchemaType::Structured(b)) => Rc::ptr_eq(a, b),
            (SchemaType::Enum(a), SchemaType::Enum(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_structured(&self) -> Option<&Rc<StructuredType>> {
        match self {
            SchemaType::Structured(ty) => Some(ty),
            SchemaType::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Rc<EnumType>> {
        match self {
            SchemaType::Enum(ty) => Some(ty),
            SchemaType::Structured(_) => None,
        }
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        match self {
            SchemaType::Structured(ty) => ty.errors(model),
            SchemaType::Enum(ty) => ty.errors(),
        }
    }
}

impl Element for SchemaType {
    fn name(&self) -> &str {
        match self {
            SchemaType::Structured(ty) => ty.name(),
            SchemaType::Enum(ty) => ty.name(),
        }
    }

    fn location(&self) -> &Location {
        match self {
            SchemaType::Structured(ty) => ty.location(),
            SchemaType::Enum(ty) => ty.location(),
        }
    }
}

impl PartialEq for SchemaType {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

// ============================================================================
// STRUCTURED TYPES
// ============================================================================

/// A member found by [`StructuredType::find_property`].
#[derive(Clone, Debug)]
pub enum Member {
    Structural(Rc<Property>),
    Navigation(Rc<NavigationProperty>),
}

impl Member {
    pub fn as_structural(&self) -> Option<&Rc<Property>> {
        match self {
            Member::Structural(property) => Some(property),
            Member::Navigation(_) => None,
        }
    }

    pub fn as_navigation(&self) -> Option<&Rc<NavigationProperty>> {
        match self {
            Member::Navigation(navigation) => Some(navigation),
            Member::Structural(_) => None,
        }
    }
}

impl Element for Member {
    fn name(&self) -> &str {
        match self {
            Member::Structural(property) => property.name(),
            Member::Navigation(navigation) => navigation.name(),
        }
    }

    fn location(&self) -> &Location {
        match self {
            Member::Structural(property) => property.location(),
            Member::Navigation(navigation) => navigation.location(),
        }
    }
}

/// An entity or complex type.
pub struct StructuredType {
    ast: Arc<ast::StructuredType>,
    schema: SchemaId,
    qualified_name: Arc<str>,
    base_type: CacheCell<Binding<Rc<StructuredType>>>,
    properties: CacheCell<Rc<[Rc<Property>]>>,
    navigation_properties: CacheCell<Rc<[Rc<NavigationProperty>]>>,
    declared_key: CacheCell<Option<Rc<[Binding<Rc<Property>>]>>>,
}

impl StructuredType {
    pub(crate) fn new(ast: Arc<ast::StructuredType>, schema: SchemaId, namespace: &str) -> Self {
        let qualified_name = Arc::from(format!("{}.{}", namespace, ast.name));
        Self {
            ast,
            schema,
            qualified_name,
            base_type: CacheCell::new(),
            properties: CacheCell::new(),
            navigation_properties: CacheCell::new(),
            declared_key: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::StructuredType> {
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

    pub fn kind(&self) -> StructuredKind {
        self.ast.kind
    }

    pub fn is_entity(&self) -> bool {
        self.ast.kind == StructuredKind::Entity
    }

    pub fn is_abstract(&self) -> bool {
        self.ast.is_abstract
    }

    pub fn is_open(&self) -> bool {
        self.ast.is_open
    }

    /// The base type name exactly as declared.
    pub fn declared_base_type_name(&self) -> Option<&str> {
        self.ast.base_type.as_deref()
    }

    /// The resolved base type, `None` when none is declared.
    ///
    /// A type whose base chain leads back to itself gets a cyclic
    /// placeholder. Resolving a parent forces the parent's own base type
    /// first, so a cycle anywhere above is detected before it is used.
    pub fn base_type(&self, model: &SemanticModel) -> Option<Binding<Rc<StructuredType>>> {
        let name = self.ast.base_type.as_ref()?;
        Some(self.base_type.get_or_compute(
            || {
                let binding = self.resolve_base_type(name, model);
                if let Some(parent) = binding.identity() {
                    let _ = parent.base_type(model);
                }
                binding
            },
            || self.cyclic_base_type(),
        ))
    }

    fn resolve_base_type(&self, name: &Arc<str>, model: &SemanticModel) -> Binding<Rc<StructuredType>> {
        let kind = self.kind();
        let location = &self.ast.location;
        let unresolved_kind = match kind {
            StructuredKind::Entity => UnresolvedKind::EntityType,
            StructuredKind::Complex => UnresolvedKind::ComplexType,
        };
        let scope = model.schema(self.schema);
        let qualified = scope.substitute_alias(name);
        scope.resolve_type(name, location, model).narrow(
            |candidate| {
                candidate
                    .as_structured()
                    .filter(|ty| ty.kind() == kind)
                    .cloned()
            },
            || Unresolved::new(unresolved_kind, qualified.clone(), location.clone()),
        )
    }

    fn cyclic_base_type(&self) -> Binding<Rc<StructuredType>> {
        tracing::debug!("[RESOLVE] base type cycle through '{}'", self.qualified_name);
        let kind = match self.kind() {
            StructuredKind::Entity => UnresolvedKind::CyclicEntityType,
            StructuredKind::Complex => UnresolvedKind::CyclicComplexType,
        };
        Binding::unresolved(kind, self.qualified_name.clone(), self.ast.location.clone())
    }

    /// Resolved ancestors, nearest first.
    pub fn base_chain(&self, model: &SemanticModel) -> Vec<Rc<StructuredType>> {
        let mut chain: Vec<Rc<StructuredType>> = Vec::new();
        let mut visited = FxHashSet::default();
        visited.insert(self.node_id());
        let mut next = self.base_type(model).and_then(|b| b.identity().cloned());
        while let Some(parent) = next {
            if !visited.insert(parent.node_id()) {
                break;
            }
            next = parent.base_type(model).and_then(|b| b.identity().cloned());
            chain.push(parent);
        }
        chain
    }

    /// Whether `self` is `other` or one of its descendants.
    pub fn is_or_derives_from(&self, other: &StructuredType, model: &SemanticModel) -> bool {
        self.node_id() == other.node_id()
            || self
                .base_chain(model)
                .iter()
                .any(|ancestor| ancestor.node_id() == other.node_id())
    }

    pub fn declared_properties(&self) -> Rc<[Rc<Property>]> {
        self.properties.get_or_init(|| {
            self.ast
                .properties
                .iter()
                .map(|node| {
                    Rc::new(Property::new(
                        Arc::clone(node),
                        self.schema,
                        self.qualified_name.clone(),
                    ))
                })
                .collect()
        })
    }

    pub fn declared_navigation_properties(&self) -> Rc<[Rc<NavigationProperty>]> {
        self.navigation_properties.get_or_init(|| {
            self.ast
                .navigation_properties
                .iter()
                .map(|node| {
                    Rc::new(NavigationProperty::new(
                        Arc::clone(node),
                        self.schema,
                        self.qualified_name.clone(),
                    ))
                })
                .collect()
        })
    }

    /// Inherited structural properties followed by declared ones.
    pub fn properties(&self, model: &SemanticModel) -> Vec<Rc<Property>> {
        let mut properties = Vec::new();
        for ancestor in self.base_chain(model).iter().rev() {
            properties.extend(ancestor.declared_properties().iter().cloned());
        }
        properties.extend(self.declared_properties().iter().cloned());
        properties
    }

    /// Inherited navigation properties followed by declared ones.
    pub fn navigation_properties(&self, model: &SemanticModel) -> Vec<Rc<NavigationProperty>> {
        let mut navigations = Vec::new();
        for ancestor in self.base_chain(model).iter().rev() {
            navigations.extend(ancestor.declared_navigation_properties().iter().cloned());
        }
        navigations.extend(self.declared_navigation_properties().iter().cloned());
        navigations
    }

    fn find_declared_member(&self, name: &str) -> Option<Member> {
        if let Some(property) = self.declared_properties().iter().find(|p| p.name() == name) {
            return Some(Member::Structural(Rc::clone(property)));
        }
        self.declared_navigation_properties()
            .iter()
            .find(|n| n.name() == name)
            .map(|n| Member::Navigation(Rc::clone(n)))
    }

    /// Find a structural or navigation property, searching the base chain.
    pub fn find_property(&self, name: &str, model: &SemanticModel) -> Option<Member> {
        self.find_declared_member(name).or_else(|| {
            self.base_chain(model)
                .iter()
                .find_map(|ancestor| ancestor.find_declared_member(name))
        })
    }

    /// Key properties declared on this type, resolved against its own
    /// declared properties. `None` when the type declares no key.
    pub fn declared_key(&self) -> Option<Rc<[Binding<Rc<Property>>]>> {
        self.declared_key.get_or_init(|| {
            if self.ast.key.is_empty() {
                return None;
            }
            let properties = self.declared_properties();
            Some(
                self.ast
                    .key
                    .iter()
                    .map(|key_ref| {
                        match properties.iter().find(|p| p.name() == &*key_ref.name) {
                            Some(property) => Binding::Resolved(Rc::clone(property)),
                            None => Binding::unresolved(
                                UnresolvedKind::Property,
                                key_ref.name.clone(),
                                key_ref.location.clone(),
                            ),
                        }
                    })
                    .collect(),
            )
        })
    }

    /// The effective key: the declared key of this type or of its nearest
    /// ancestor that declares one.
    pub fn key(&self, model: &SemanticModel) -> Option<Rc<[Binding<Rc<Property>>]>> {
        self.declared_key().or_else(|| {
            self.base_chain(model)
                .iter()
                .find_map(|ancestor| ancestor.declared_key())
        })
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let mut errors = Vec::new();
        if let Some(base) = self.base_type(model) {
            errors.extend(base.errors());
        }
        if let Some(key) = self.declared_key() {
            errors.extend(key.iter().flat_map(Binding::errors));
        }
        for property in self.declared_properties().iter() {
            errors.extend(property.errors(model));
        }
        for navigation in self.declared_navigation_properties().iter() {
            errors.extend(navigation.errors(model));
        }
        errors
    }
}

impl Element for StructuredType {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for StructuredType {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for StructuredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredType")
            .field("name", &self.qualified_name)
            .field("kind", &self.ast.kind)
            .field("id", &self.ast.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

/// A structural property of a structured or row type.
pub struct Property {
    ast: Arc<ast::Property>,
    schema: SchemaId,
    declaring_type: Arc<str>,
    type_ref: CacheCell<Rc<TypeReference>>,
}

impl Property {
    pub(crate) fn new(ast: Arc<ast::Property>, schema: SchemaId, declaring_type: Arc<str>) -> Self {
        Self {
            ast,
            schema,
            declaring_type,
            type_ref: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::Property> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    /// Qualified name of the declaring type (`Row` for row-type members).
    pub fn declaring_type_name(&self) -> &str {
        &self.declaring_type
    }

    pub fn type_ref(&self, model: &SemanticModel) -> Rc<TypeReference> {
        self.type_ref.get_or_init(|| {
            Rc::new(TypeReference::resolve(&self.ast.type_ref, self.schema, model))
        })
    }

    pub fn default_value(&self) -> Option<&str> {
        self.ast.default_value.as_deref()
    }

    pub fn is_concurrency_token(&self) -> bool {
        self.ast.is_concurrency_token
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        self.type_ref(model).errors(model)
    }
}

impl Element for Property {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.ast.name)
            .field("declaring_type", &self.declaring_type)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NAVIGATION PROPERTIES
// ============================================================================

/// A member that traverses an association from one of its ends to the other.
pub struct NavigationProperty {
    ast: Arc<ast::NavigationProperty>,
    schema: SchemaId,
    declaring_type: Arc<str>,
    association: CacheCell<Binding<Rc<Association>>>,
}

impl NavigationProperty {
    pub(crate) fn new(
        ast: Arc<ast::NavigationProperty>,
        schema: SchemaId,
        declaring_type: Arc<str>,
    ) -> Self {
        Self {
            ast,
            schema,
            declaring_type,
            association: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::NavigationProperty> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn declaring_type_name(&self) -> &str {
        &self.declaring_type
    }

    pub fn from_role(&self) -> &str {
        &self.ast.from_role
    }

    pub fn to_role(&self) -> &str {
        &self.ast.to_role
    }

    pub fn association(&self, model: &SemanticModel) -> Binding<Rc<Association>> {
        self.association.get_or_init(|| {
            model
                .schema(self.schema)
                .resolve_association(&self.ast.relationship, &self.ast.location, model)
        })
    }

    /// The association end this property navigates from.
    pub fn from_end(&self, model: &SemanticModel) -> Binding<Rc<AssociationEnd>> {
        self.end_for_role(&self.ast.from_role, model)
    }

    /// The association end this property navigates to.
    pub fn to_end(&self, model: &SemanticModel) -> Binding<Rc<AssociationEnd>> {
        self.end_for_role(&self.ast.to_role, model)
    }

    fn end_for_role(&self, role: &Arc<str>, model: &SemanticModel) -> Binding<Rc<AssociationEnd>> {
        match self
            .association(model)
            .identity()
            .and_then(|association| association.end_by_role(role))
        {
            Some(end) => Binding::Resolved(end),
            None => Binding::unresolved(
                UnresolvedKind::AssociationEnd,
                role.clone(),
                self.ast.location.clone(),
            ),
        }
    }

    /// The entity type at the far end.
    pub fn target_type(&self, model: &SemanticModel) -> Option<Binding<Rc<StructuredType>>> {
        self.to_end(model)
            .into_resolved()
            .map(|end| end.entity_type(model))
    }

    /// The navigation property on the target type that traverses the same
    /// association in the opposite direction.
    pub fn partner(&self, model: &SemanticModel) -> Option<Rc<NavigationProperty>> {
        let association = self.association(model).into_resolved()?;
        let target = self.target_type(model)?.into_resolved()?;
        target
            .navigation_properties(model)
            .into_iter()
            .find(|candidate| {
                candidate.node_id() != self.node_id()
                    && candidate.from_role() == self.to_role()
                    && candidate.to_role() == self.from_role()
                    && candidate
                        .association(model)
                        .resolved()
                        .is_some_and(|other| Rc::ptr_eq(other, &association))
            })
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let association = self.association(model);
        if association.identity().is_none() {
            return association.errors();
        }
        let mut errors = self.from_end(model).errors();
        errors.extend(self.to_end(model).errors());
        errors
    }
}

impl Element for NavigationProperty {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for NavigationProperty {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for NavigationProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationProperty")
            .field("name", &self.ast.name)
            .field("relationship", &self.ast.relationship)
            .field("from_role", &self.ast.from_role)
            .field("to_role", &self.ast.to_role)
            .finish_non_exhaustive()
    }
}
