//! Functions, function imports, parameters and value terms.

use std::rc::{Rc, Weak};
use std::sync::Arc;

use super::binding::{Binding, Element, UnresolvedKind};
use super::cache::CacheCell;
use super::container::EntityContainer;
use super::diagnostics::EdmError;
use super::entity_set::EntitySet;
use super::model::SemanticModel;
use super::schema::SchemaId;
use super::type_ref::TypeReference;
use crate::ast::{self, ParameterMode};
use crate::base::{Location, NodeId};

fn wrap_parameters(
    nodes: &[Arc<ast::Parameter>],
    schema: SchemaId,
    owner: &Arc<str>,
) -> Rc<[Rc<Parameter>]> {
    nodes
        .iter()
        .map(|node| {
            Rc::new(Parameter {
                ast: Arc::clone(node),
                schema,
                owner: owner.clone(),
                type_ref: CacheCell::new(),
            })
        })
        .collect()
}

// ============================================================================
// PARAMETERS
// ============================================================================

pub struct Parameter {
    ast: Arc<ast::Parameter>,
    schema: SchemaId,
    owner: Arc<str>,
    type_ref: CacheCell<Rc<TypeReference>>,
}

impl Parameter {
    pub fn ast(&self) -> &Arc<ast::Parameter> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    /// Qualified name of the declaring function or function import.
    pub fn owner_name(&self) -> &str {
        &self.owner
    }

    pub fn mode(&self) -> ParameterMode {
        self.ast.mode
    }

    pub fn type_ref(&self, model: &SemanticModel) -> Rc<TypeReference> {
        self.type_ref.get_or_init(|| {
            Rc::new(TypeReference::resolve(&self.ast.type_ref, self.schema, model))
        })
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        self.type_ref(model).errors(model)
    }
}

impl Element for Parameter {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("owner", &self.owner)
            .field("name", &self.ast.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FUNCTIONS
// ============================================================================

/// A model-defined function. Functions may be overloaded by signature.
pub struct Function {
    ast: Arc<ast::Function>,
    schema: SchemaId,
    qualified_name: Arc<str>,
    return_type: CacheCell<Option<Rc<TypeReference>>>,
    parameters: CacheCell<Rc<[Rc<Parameter>]>>,
}

impl Function {
    pub(crate) fn new(ast: Arc<ast::Function>, schema: SchemaId, namespace: &str) -> Self {
        let qualified_name = Arc::from(format!("{}.{}", namespace, ast.name));
        Self {
            ast,
            schema,
            qualified_name,
            return_type: CacheCell::new(),
            parameters: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::Function> {
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

    pub fn defining_expression(&self) -> Option<&str> {
        self.ast.defining_expression.as_deref()
    }

    pub fn return_type(&self, model: &SemanticModel) -> Option<Rc<TypeReference>> {
        self.return_type.get_or_init(|| {
            self.ast
                .return_type
                .as_ref()
                .map(|node| Rc::new(TypeReference::resolve(node, self.schema, model)))
        })
    }

    pub fn parameters(&self) -> Rc<[Rc<Parameter>]> {
        self.parameters.get_or_init(|| {
            wrap_parameters(&self.ast.parameters, self.schema, &self.qualified_name)
        })
    }

    pub fn find_parameter(&self, name: &str) -> Option<Rc<Parameter>> {
        self.parameters().iter().find(|p| p.name() == name).cloned()
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let mut errors = self
            .return_type(model)
            .map(|ty| ty.errors(model))
            .unwrap_or_default();
        for parameter in self.parameters().iter() {
            errors.extend(parameter.errors(model));
        }
        errors
    }
}

impl Element for Function {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.qualified_name)
            .field("parameters", &self.ast.parameters.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FUNCTION IMPORTS
// ============================================================================

/// A container-scoped function import.
///
/// Inherited imports are re-wrapped under the inheriting container, so the
/// same declaration has one wrapper per container that exposes it.
pub struct FunctionImport {
    ast: Arc<ast::FunctionImport>,
    schema: SchemaId,
    container: Weak<EntityContainer>,
    container_id: NodeId,
    qualified_name: Arc<str>,
    inherited: bool,
    return_type: CacheCell<Option<Rc<TypeReference>>>,
    entity_set: CacheCell<Binding<Rc<EntitySet>>>,
    parameters: CacheCell<Rc<[Rc<Parameter>]>>,
}

impl FunctionImport {
    pub(crate) fn new(
        ast: Arc<ast::FunctionImport>,
        schema: SchemaId,
        container: Weak<EntityContainer>,
        container_id: NodeId,
        container_name: &str,
        inherited: bool,
    ) -> Self {
        let qualified_name = Arc::from(format!("{}/{}", container_name, ast.name));
        Self {
            ast,
            schema,
            container,
            container_id,
            qualified_name,
            inherited,
            return_type: CacheCell::new(),
            entity_set: CacheCell::new(),
            parameters: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::FunctionImport> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    /// `Container/Import`.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn container(&self) -> Option<Rc<EntityContainer>> {
        self.container.upgrade()
    }

    /// Whether this wrapper was copied from an extended container.
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn is_side_effecting(&self) -> bool {
        self.ast.is_side_effecting
    }

    pub fn is_bindable(&self) -> bool {
        self.ast.is_bindable
    }

    pub fn is_composable(&self) -> bool {
        self.ast.is_composable
    }

    pub fn return_type(&self, model: &SemanticModel) -> Option<Rc<TypeReference>> {
        self.return_type.get_or_init(|| {
            self.ast
                .return_type
                .as_ref()
                .map(|node| Rc::new(TypeReference::resolve(node, self.schema, model)))
        })
    }

    /// The entity set results are drawn from, resolved in the exposing
    /// container.
    pub fn entity_set(&self, model: &SemanticModel) -> Option<Binding<Rc<EntitySet>>> {
        let name = self.ast.entity_set.as_ref()?;
        Some(self.entity_set.get_or_init(|| {
            let found = self
                .container()
                .and_then(|container| container.find_entity_set(name, model));
            found.unwrap_or_else(|| {
                Binding::unresolved(UnresolvedKind::EntitySet, name.clone(), self.ast.location.clone())
            })
        }))
    }

    pub fn parameters(&self) -> Rc<[Rc<Parameter>]> {
        self.parameters.get_or_init(|| {
            wrap_parameters(&self.ast.parameters, self.schema, &self.qualified_name)
        })
    }

    pub fn find_parameter(&self, name: &str) -> Option<Rc<Parameter>> {
        self.parameters().iter().find(|p| p.name() == name).cloned()
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let mut errors = self
            .return_type(model)
            .map(|ty| ty.errors(model))
            .unwrap_or_default();
        if let Some(entity_set) = self.entity_set(model) {
            errors.extend(entity_set.errors());
        }
        for parameter in self.parameters().iter() {
            errors.extend(parameter.errors(model));
        }
        errors
    }
}

impl Element for FunctionImport {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for FunctionImport {
    fn eq(&self, other: &Self) -> bool {
        self.container_id == other.container_id && self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for FunctionImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionImport")
            .field("name", &self.qualified_name)
            .field("inherited", &self.inherited)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// VALUE TERMS
// ============================================================================

/// A term whose annotations carry a single value of `type_ref`.
pub struct ValueTerm {
    ast: Arc<ast::ValueTerm>,
    schema: SchemaId,
    qualified_name: Arc<str>,
    type_ref: CacheCell<Rc<TypeReference>>,
}

impl ValueTerm {
    pub(crate) fn new(ast: Arc<ast::ValueTerm>, schema: SchemaId, namespace: &str) -> Self {
        let qualified_name = Arc::from(format!("{}.{}", namespace, ast.name));
        Self {
            ast,
            schema,
            qualified_name,
            type_ref: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::ValueTerm> {
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

    pub fn type_ref(&self, model: &SemanticModel) -> Rc<TypeReference> {
        self.type_ref.get_or_init(|| {
            Rc::new(TypeReference::resolve(&self.ast.type_ref, self.schema, model))
        })
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        self.type_ref(model).errors(model)
    }
}

impl Element for ValueTerm {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for ValueTerm {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for ValueTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueTerm")
            .field("name", &self.qualified_name)
            .finish_non_exhaustive()
    }
}
