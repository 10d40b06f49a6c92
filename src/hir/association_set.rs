//! Association sets: binding an association's ends to entity sets.

use std::rc::{Rc, Weak};
use std::sync::Arc;

use super::association::{Association, AssociationEnd};
use super::binding::{Binding, Element, Unresolved, UnresolvedKind};
use super::cache::CacheCell;
use super::container::EntityContainer;
use super::diagnostics::{EdmError, ErrorKind};
use super::entity_set::EntitySet;
use super::model::SemanticModel;
use super::schema::SchemaId;
use crate::ast::{self, DirectAnnotation};
use crate::base::{Location, NodeId};

pub struct AssociationSet {
    ast: Arc<ast::AssociationSet>,
    schema: SchemaId,
    container: Weak<EntityContainer>,
    container_id: NodeId,
    inherited: bool,
    association: CacheCell<Binding<Rc<Association>>>,
    ends: CacheCell<(Rc<AssociationSetEnd>, Rc<AssociationSetEnd>)>,
}

impl AssociationSet {
    pub(crate) fn new(
        ast: Arc<ast::AssociationSet>,
        schema: SchemaId,
        container: Weak<EntityContainer>,
        container_id: NodeId,
        inherited: bool,
    ) -> Self {
        Self {
            ast,
            schema,
            container,
            container_id,
            inherited,
            association: CacheCell::new(),
            ends: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::AssociationSet> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    pub fn container(&self) -> Option<Rc<EntityContainer>> {
        self.container.upgrade()
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn direct_annotations(&self) -> &[DirectAnnotation] {
        &self.ast.direct_annotations
    }

    pub fn association(&self, model: &SemanticModel) -> Binding<Rc<Association>> {
        self.association.get_or_init(|| {
            model
                .schema(self.schema)
                .resolve_association(&self.ast.association, &self.ast.location, model)
        })
    }

    pub fn end1(&self, model: &SemanticModel) -> Rc<AssociationSetEnd> {
        self.ends(model).0
    }

    pub fn end2(&self, model: &SemanticModel) -> Rc<AssociationSetEnd> {
        self.ends(model).1
    }

    fn ends(&self, model: &SemanticModel) -> (Rc<AssociationSetEnd>, Rc<AssociationSetEnd>) {
        self.ends.get_or_init(|| {
            let (role1, role2) = self.resolve_roles(model);
            let end1 = self.bind_end(self.ast.end1.as_ref(), role1, model);
            let end2 = self.bind_end(self.ast.end2.as_ref(), role2, model);
            (Rc::new(end1), Rc::new(end2))
        })
    }

    /// Bind each set end to an association end.
    ///
    /// An explicit role is looked up by name. An end that is omitted (or
    /// names no role) takes the complement of the other end; when both are
    /// omitted the first takes the association's first end.
    fn resolve_roles(
        &self,
        model: &SemanticModel,
    ) -> (Binding<Rc<AssociationEnd>>, Binding<Rc<AssociationEnd>>) {
        let association = self.association(model).identity().cloned();
        let explicit1 = self.explicit_role(self.ast.end1.as_ref(), association.as_ref());
        let explicit2 = self.explicit_role(self.ast.end2.as_ref(), association.as_ref());
        match (explicit1, explicit2) {
            (Some(role1), Some(role2)) => (role1, role2),
            (Some(role1), None) => {
                let role2 = self.complement(&role1, association.as_ref());
                (role1, role2)
            }
            (None, Some(role2)) => {
                let role1 = self.complement(&role2, association.as_ref());
                (role1, role2)
            }
            (None, None) => {
                let role1 = match association.as_ref().map(|a| a.end1()) {
                    Some(Binding::Resolved(end)) => Binding::Resolved(end),
                    _ => self.non_computable_end(),
                };
                let role2 = self.complement(&role1, association.as_ref());
                (role1, role2)
            }
        }
    }

    fn explicit_role(
        &self,
        node: Option<&Arc<ast::AssociationSetEnd>>,
        association: Option<&Rc<Association>>,
    ) -> Option<Binding<Rc<AssociationEnd>>> {
        let node = node?;
        let role = node.role.as_ref()?;
        Some(
            match association.and_then(|association| association.end_by_role(role)) {
                Some(end) => Binding::Resolved(end),
                None => Binding::unresolved(
                    UnresolvedKind::AssociationEnd,
                    role.clone(),
                    node.location.clone(),
                ),
            },
        )
    }

    fn complement(
        &self,
        other: &Binding<Rc<AssociationEnd>>,
        association: Option<&Rc<Association>>,
    ) -> Binding<Rc<AssociationEnd>> {
        let complement = other
            .resolved()
            .zip(association)
            .and_then(|(end, association)| association.other_end(end))
            .and_then(Binding::into_resolved);
        match complement {
            Some(end) => Binding::Resolved(end),
            None => self.non_computable_end(),
        }
    }

    fn non_computable_end(&self) -> Binding<Rc<AssociationEnd>> {
        Binding::Unresolved(Unresolved::new(
            UnresolvedKind::NonComputableAssociationEnd,
            self.ast.name.clone(),
            self.ast.location.clone(),
        ))
    }

    fn bind_end(
        &self,
        node: Option<&Arc<ast::AssociationSetEnd>>,
        role: Binding<Rc<AssociationEnd>>,
        model: &SemanticModel,
    ) -> AssociationSetEnd {
        let container = self.container();
        let entity_set = match node {
            Some(node) => container
                .as_ref()
                .and_then(|container| container.find_entity_set(&node.entity_set, model))
                .unwrap_or_else(|| {
                    Binding::unresolved(
                        UnresolvedKind::EntitySet,
                        node.entity_set.clone(),
                        node.location.clone(),
                    )
                }),
            None => self.infer_entity_set(&role, container.as_ref(), model),
        };
        AssociationSetEnd {
            ast: node.cloned(),
            set_name: self.ast.name.clone(),
            location: node
                .map(|node| node.location.clone())
                .unwrap_or_else(|| self.ast.location.clone()),
            role,
            entity_set,
        }
    }

    /// The only entity set of the container whose element type is the
    /// role's entity type.
    fn infer_entity_set(
        &self,
        role: &Binding<Rc<AssociationEnd>>,
        container: Option<&Rc<EntityContainer>>,
        model: &SemanticModel,
    ) -> Binding<Rc<EntitySet>> {
        let entity_type = role
            .resolved()
            .and_then(|end| end.entity_type(model).into_resolved());
        let candidates: Vec<Rc<EntitySet>> = match (entity_type, container) {
            (Some(entity_type), Some(container)) => container
                .entity_sets(model)
                .iter()
                .filter(|set| {
                    set.element_type(model)
                        .resolved()
                        .is_some_and(|ty| Rc::ptr_eq(ty, &entity_type))
                })
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
        let name: Arc<str> = match role {
            Binding::Resolved(end) => Arc::from(end.role()),
            _ => self.ast.name.clone(),
        };
        match <[Rc<EntitySet>; 1]>::try_from(candidates) {
            Ok([set]) => Binding::Resolved(set),
            Err(_) => Binding::unresolved(UnresolvedKind::EntitySet, name, self.ast.location.clone()),
        }
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let association = self.association(model);
        if association.identity().is_none() {
            return association.errors();
        }
        let (end1, end2) = self.ends(model);
        let mut errors = Vec::new();
        for end in [&end1, &end2] {
            errors.extend(end.role().errors());
            errors.extend(end.entity_set().errors());
        }
        let duplicate = match (role_name(end1.role()), role_name(end2.role())) {
            (Some(role1), Some(role2)) if role1 == role2 => Some(role2),
            _ => None,
        };
        if let Some(role2) = duplicate {
            errors.push(EdmError::new(
                end2.location().clone(),
                ErrorKind::DuplicateEndName {
                    end: Arc::from(role2),
                    set: self.ast.name.clone(),
                },
            ));
        }
        errors
    }
}

/// The role an end names: the bound end's role, or the declared role that
/// failed to bind. Inferred placeholders name no role.
fn role_name(role: &Binding<Rc<AssociationEnd>>) -> Option<&str> {
    match role {
        Binding::Resolved(end) => Some(end.role()),
        Binding::Unresolved(unresolved) if unresolved.kind() == UnresolvedKind::AssociationEnd => {
            Some(unresolved.name())
        }
        _ => None,
    }
}

impl Element for AssociationSet {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for AssociationSet {
    fn eq(&self, other: &Self) -> bool {
        self.container_id == other.container_id && self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for AssociationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationSet")
            .field("name", &self.ast.name)
            .field("association", &self.ast.association)
            .field("inherited", &self.inherited)
            .finish_non_exhaustive()
    }
}

/// One end of an association set, declared or inferred.
#[derive(Debug)]
pub struct AssociationSetEnd {
    ast: Option<Arc<ast::AssociationSetEnd>>,
    set_name: Arc<str>,
    location: Location,
    role: Binding<Rc<AssociationEnd>>,
    entity_set: Binding<Rc<EntitySet>>,
}

impl AssociationSetEnd {
    /// `None` when the end was omitted and inferred.
    pub fn ast(&self) -> Option<&Arc<ast::AssociationSetEnd>> {
        self.ast.as_ref()
    }

    pub fn association_set_name(&self) -> &str {
        &self.set_name
    }

    pub fn role(&self) -> &Binding<Rc<AssociationEnd>> {
        &self.role
    }

    pub fn entity_set(&self) -> &Binding<Rc<EntitySet>> {
        &self.entity_set
    }

    pub fn direct_annotations(&self) -> &[DirectAnnotation] {
        self.ast
            .as_ref()
            .map(|node| node.direct_annotations.as_slice())
            .unwrap_or_default()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}
