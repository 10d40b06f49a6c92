//! Entity sets and navigation target resolution.

use std::rc::{Rc, Weak};
use std::sync::Arc;

use super::binding::{Binding, Element};
use super::cache::CacheCell;
use super::container::EntityContainer;
use super::diagnostics::EdmError;
use super::model::SemanticModel;
use super::schema::SchemaId;
use super::structured::{NavigationProperty, StructuredType};
use crate::ast::{self, DirectAnnotation};
use crate::base::{Location, NodeId};

/// Identity of an entity set wrapper: inherited sets are distinct per
/// exposing container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SetKey {
    pub container: NodeId,
    pub set: NodeId,
}

/// A navigation property together with the entity set it leads to.
#[derive(Clone, Debug)]
pub struct NavigationTarget {
    pub navigation_property: Rc<NavigationProperty>,
    pub target: Rc<EntitySet>,
}

/// What serialization needs to know about the association set that bound a
/// navigation target: its name and the direct annotations on the set and
/// on both of its ends.
#[derive(Clone, Debug, PartialEq)]
pub struct AssociationSetMapping {
    pub set_name: Arc<str>,
    pub set_annotations: Vec<DirectAnnotation>,
    pub this_end_annotations: Vec<DirectAnnotation>,
    pub other_end_annotations: Vec<DirectAnnotation>,
}

pub struct EntitySet {
    ast: Arc<ast::EntitySet>,
    schema: SchemaId,
    container: Weak<EntityContainer>,
    container_id: NodeId,
    container_name: Arc<str>,
    inherited: bool,
    element_type: CacheCell<Binding<Rc<StructuredType>>>,
    navigation_targets: CacheCell<Rc<[NavigationTarget]>>,
}

impl EntitySet {
    pub(crate) fn new(
        ast: Arc<ast::EntitySet>,
        schema: SchemaId,
        container: Weak<EntityContainer>,
        container_id: NodeId,
        container_name: Arc<str>,
        inherited: bool,
    ) -> Self {
        Self {
            ast,
            schema,
            container,
            container_id,
            container_name,
            inherited,
            element_type: CacheCell::new(),
            navigation_targets: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::EntitySet> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn key(&self) -> SetKey {
        SetKey {
            container: self.container_id,
            set: self.ast.id,
        }
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    pub fn container(&self) -> Option<Rc<EntityContainer>> {
        self.container.upgrade()
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Whether this wrapper was copied from an extended container.
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn direct_annotations(&self) -> &[DirectAnnotation] {
        &self.ast.direct_annotations
    }

    pub fn element_type(&self, model: &SemanticModel) -> Binding<Rc<StructuredType>> {
        self.element_type.get_or_init(|| {
            model
                .schema(self.schema)
                .resolve_entity_type(&self.ast.entity_type, &self.ast.location, model)
        })
    }

    /// Navigation targets of every navigation property reachable from the
    /// element type, including those declared only on derived types.
    ///
    /// Computing the targets records an [`AssociationSetMapping`] per
    /// resolved navigation property in the model.
    pub fn navigation_targets(&self, model: &SemanticModel) -> Rc<[NavigationTarget]> {
        self.navigation_targets
            .get_or_init(|| self.compute_navigation_targets(model).into())
    }

    pub fn find_navigation_target(
        &self,
        navigation: &NavigationProperty,
        model: &SemanticModel,
    ) -> Option<Rc<EntitySet>> {
        self.navigation_targets(model)
            .iter()
            .find(|t| t.navigation_property.node_id() == navigation.node_id())
            .map(|t| Rc::clone(&t.target))
    }

    fn compute_navigation_targets(&self, model: &SemanticModel) -> Vec<NavigationTarget> {
        let Some(element_type) = self.element_type(model).into_resolved() else {
            return Vec::new();
        };
        let mut navigations = element_type.navigation_properties(model);
        for derived in model.find_all_derived_types(&element_type) {
            navigations.extend(derived.declared_navigation_properties().iter().cloned());
        }

        let containers = model.entity_containers();
        let mut targets = Vec::new();
        for navigation in navigations {
            let Some(association) = navigation.association(model).into_resolved() else {
                continue;
            };
            let Some(to_end) = navigation.to_end(model).into_resolved() else {
                continue;
            };
            let found = containers.iter().find_map(|container| {
                container
                    .find_association_sets(&association, model)
                    .iter()
                    .find_map(|set| {
                        let (end1, end2) = (set.end1(model), set.end2(model));
                        [(&end1, &end2), (&end2, &end1)]
                            .into_iter()
                            .find_map(|(this_end, other_end)| {
                                let is_this = this_end
                                    .entity_set()
                                    .resolved()
                                    .is_some_and(|s| s.key() == self.key());
                                let leads_to = other_end
                                    .role()
                                    .resolved()
                                    .is_some_and(|role| Rc::ptr_eq(role, &to_end));
                                if !(is_this && leads_to) {
                                    return None;
                                }
                                let target = other_end.entity_set().resolved().cloned()?;
                                let mapping = AssociationSetMapping {
                                    set_name: Arc::from(set.name()),
                                    set_annotations: set.direct_annotations().to_vec(),
                                    this_end_annotations: this_end.direct_annotations().to_vec(),
                                    other_end_annotations: other_end
                                        .direct_annotations()
                                        .to_vec(),
                                };
                                Some((target, mapping))
                            })
                    })
            });
            if let Some((target, mapping)) = found {
                tracing::trace!(
                    "[RESOLVE] {}/{} navigates '{}' to {}",
                    self.container_name,
                    self.ast.name,
                    navigation.name(),
                    target.name()
                );
                model.record_association_set_mapping(self.key(), navigation.node_id(), mapping);
                targets.push(NavigationTarget {
                    navigation_property: navigation,
                    target,
                });
            }
        }
        targets
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        self.element_type(model).errors()
    }
}

impl Element for EntitySet {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for EntitySet {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl std::fmt::Debug for EntitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySet")
            .field("container", &self.container_name)
            .field("name", &self.ast.name)
            .field("inherited", &self.inherited)
            .finish_non_exhaustive()
    }
}
