//! The semantic model: model-wide dictionaries and the query surface.
//!
//! Construction is two-phase: [`ModelBuilder`] collects schema ASTs, then
//! `build` registers every element into insertion-ordered dictionaries and
//! the derived-type index and freezes them. Everything after that is lazy:
//! wrappers are created on first request and their derived properties are
//! computed on first read.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::annotation::{AnnotationTarget, VocabularyAnnotation};
use super::association::Association;
use super::binding::{Binding, Element};
use super::container::EntityContainer;
use super::diagnostics::{DiagnosticCollector, EdmError};
use super::entity_set::{AssociationSetMapping, EntitySet, SetKey};
use super::enum_type::EnumType;
use super::function::{Function, ValueTerm};
use super::schema::{Schema, SchemaElement, SchemaId};
use super::structured::{NavigationProperty, SchemaType, StructuredType};
use super::wrap::WrapTable;
use crate::ast::{self, DirectAnnotation};
use crate::base::{Location, NodeId};

// ============================================================================
// BUILD ERRORS
// ============================================================================

/// Input that breaks the model's structural assumptions.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("schema at {location} has an empty namespace")]
    EmptyNamespace { location: Location },
    #[error("node id {id} is shared by '{first}' and '{second}'")]
    DuplicateNodeId {
        id: NodeId,
        first: Arc<str>,
        second: Arc<str>,
    },
}

// ============================================================================
// REGISTRIES
// ============================================================================

/// A registered AST node and the schema that declares it.
#[derive(Debug)]
struct Entry<T> {
    node: Arc<T>,
    schema: SchemaId,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            schema: self.schema,
        }
    }
}

#[derive(Clone, Debug)]
enum TypeEntry {
    Structured(Entry<ast::StructuredType>),
    Enum(Entry<ast::EnumType>),
}

type Registry<T> = IndexMap<Arc<str>, Vec<T>>;

fn register<T>(registry: &mut Registry<T>, name: Arc<str>, entry: T) {
    registry.entry(name).or_default().push(entry);
}

/// The last dot-separated segment of a (possibly qualified) name.
fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

// ============================================================================
// MODEL
// ============================================================================

/// A fully-linked, lazily-resolved view over a fixed set of schemas.
pub struct SemanticModel {
    schemas: Vec<Schema>,
    types: Registry<TypeEntry>,
    associations: Registry<Entry<ast::Association>>,
    functions: Registry<Entry<ast::Function>>,
    value_terms: Registry<Entry<ast::ValueTerm>>,
    containers: Registry<Entry<ast::EntityContainer>>,
    /// Base-type short name -> types declaring that base.
    derived_types: FxHashMap<Arc<str>, Vec<Entry<ast::StructuredType>>>,
    structured_wraps: WrapTable<StructuredType>,
    enum_wraps: WrapTable<EnumType>,
    association_wraps: WrapTable<Association>,
    function_wraps: WrapTable<Function>,
    value_term_wraps: WrapTable<ValueTerm>,
    container_wraps: WrapTable<EntityContainer>,
    association_set_mappings: RefCell<FxHashMap<(SetKey, NodeId), AssociationSetMapping>>,
}

impl SemanticModel {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// The schema with `id`. Ids are only handed out by this model.
    pub fn schema(&self, id: SchemaId) -> &Schema {
        &self.schemas[id.index()]
    }

    pub fn find_schema(&self, namespace: &str) -> Option<&Schema> {
        self.schemas.iter().find(|schema| schema.namespace() == namespace)
    }

    // ========================================================================
    // WRAPPING
    // ========================================================================

    pub(crate) fn wrap_structured_type(
        &self,
        node: &Arc<ast::StructuredType>,
        schema: SchemaId,
    ) -> Rc<StructuredType> {
        self.structured_wraps.get_or_wrap(node.id, || {
            Rc::new(StructuredType::new(
                Arc::clone(node),
                schema,
                self.schema(schema).namespace(),
            ))
        })
    }

    pub(crate) fn wrap_enum_type(&self, node: &Arc<ast::EnumType>, schema: SchemaId) -> Rc<EnumType> {
        self.enum_wraps.get_or_wrap(node.id, || {
            Rc::new(EnumType::new(Arc::clone(node), schema, self.schema(schema).namespace()))
        })
    }

    pub(crate) fn wrap_association(
        &self,
        node: &Arc<ast::Association>,
        schema: SchemaId,
    ) -> Rc<Association> {
        self.association_wraps.get_or_wrap(node.id, || {
            Rc::new(Association::new(Arc::clone(node), schema, self.schema(schema).namespace()))
        })
    }

    pub(crate) fn wrap_function(&self, node: &Arc<ast::Function>, schema: SchemaId) -> Rc<Function> {
        self.function_wraps.get_or_wrap(node.id, || {
            Rc::new(Function::new(Arc::clone(node), schema, self.schema(schema).namespace()))
        })
    }

    pub(crate) fn wrap_value_term(&self, node: &Arc<ast::ValueTerm>, schema: SchemaId) -> Rc<ValueTerm> {
        self.value_term_wraps.get_or_wrap(node.id, || {
            Rc::new(ValueTerm::new(Arc::clone(node), schema, self.schema(schema).namespace()))
        })
    }

    pub(crate) fn wrap_entity_container(
        &self,
        node: &Arc<ast::EntityContainer>,
        schema: SchemaId,
    ) -> Rc<EntityContainer> {
        self.container_wraps.get_or_wrap(node.id, || {
            Rc::new_cyclic(|this| {
                EntityContainer::new(
                    Arc::clone(node),
                    schema,
                    self.schema(schema).namespace(),
                    this.clone(),
                )
            })
        })
    }

    fn wrap_type(&self, entry: &TypeEntry) -> SchemaType {
        match entry {
            TypeEntry::Structured(entry) => {
                SchemaType::Structured(self.wrap_structured_type(&entry.node, entry.schema))
            }
            TypeEntry::Enum(entry) => SchemaType::Enum(self.wrap_enum_type(&entry.node, entry.schema)),
        }
    }

    // ========================================================================
    // BINDINGS
    // ========================================================================

    fn bind<T, W>(
        &self,
        registry: &Registry<T>,
        qualified: &str,
        wrap: impl Fn(&T) -> W,
    ) -> Option<Binding<W>> {
        let entries = registry.get(qualified)?;
        tracing::trace!("[RESOLVE] '{}' -> {} candidate(s)", qualified, entries.len());
        Binding::from_candidates(qualified, entries.iter().map(wrap).collect())
    }

    /// The type registered under a fully-qualified name.
    pub(crate) fn type_binding(&self, qualified: &str) -> Option<Binding<SchemaType>> {
        self.bind(&self.types, qualified, |entry| self.wrap_type(entry))
    }

    pub(crate) fn association_binding(&self, qualified: &str) -> Option<Binding<Rc<Association>>> {
        self.bind(&self.associations, qualified, |entry| {
            self.wrap_association(&entry.node, entry.schema)
        })
    }

    pub(crate) fn container_binding(&self, qualified: &str) -> Option<Binding<Rc<EntityContainer>>> {
        self.bind(&self.containers, qualified, |entry| {
            self.wrap_entity_container(&entry.node, entry.schema)
        })
    }

    pub(crate) fn value_term_binding(&self, qualified: &str) -> Option<Binding<Rc<ValueTerm>>> {
        self.bind(&self.value_terms, qualified, |entry| {
            self.wrap_value_term(&entry.node, entry.schema)
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// The type registered under `qualified_name`; the first-registered one
    /// when the name is ambiguous.
    pub fn find_type(&self, qualified_name: &str) -> Option<SchemaType> {
        self.type_binding(qualified_name)
            .and_then(|binding| binding.identity().cloned())
    }

    pub fn find_association(&self, qualified_name: &str) -> Option<Rc<Association>> {
        self.association_binding(qualified_name)
            .and_then(|binding| binding.identity().cloned())
    }

    pub fn find_entity_container(&self, qualified_name: &str) -> Option<Rc<EntityContainer>> {
        self.container_binding(qualified_name)
            .and_then(|binding| binding.identity().cloned())
    }

    pub fn find_value_term(&self, qualified_name: &str) -> Option<Rc<ValueTerm>> {
        self.value_term_binding(qualified_name)
            .and_then(|binding| binding.identity().cloned())
    }

    /// All overloads registered under `qualified_name`.
    pub fn find_functions(&self, qualified_name: &str) -> Vec<Rc<Function>> {
        self.functions
            .get(qualified_name)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| self.wrap_function(&entry.node, entry.schema))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every registered association, duplicates included.
    pub fn associations(&self) -> Vec<Rc<Association>> {
        self.associations
            .values()
            .flatten()
            .map(|entry| self.wrap_association(&entry.node, entry.schema))
            .collect()
    }

    /// Every registered entity container, duplicates included.
    pub fn entity_containers(&self) -> Vec<Rc<EntityContainer>> {
        self.containers
            .values()
            .flatten()
            .map(|entry| self.wrap_entity_container(&entry.node, entry.schema))
            .collect()
    }

    /// Types, functions, value terms and containers of every schema.
    pub fn schema_elements(&self) -> impl Iterator<Item = SchemaElement> + '_ {
        self.schemas
            .iter()
            .flat_map(move |schema| schema.elements(self))
    }

    /// Out-of-line annotations of every schema, then inline ones.
    pub fn vocabulary_annotations(&self) -> Vec<Rc<VocabularyAnnotation>> {
        let mut annotations = Vec::new();
        for schema in &self.schemas {
            annotations.extend(schema.out_of_line_annotations().iter().cloned());
        }
        for schema in &self.schemas {
            annotations.extend(schema.inline_annotations(self).iter().cloned());
        }
        annotations
    }

    /// Annotations whose target resolves to `target`.
    pub fn find_vocabulary_annotations(&self, target: &AnnotationTarget) -> Vec<Rc<VocabularyAnnotation>> {
        self.vocabulary_annotations()
            .into_iter()
            .filter(|annotation| {
                annotation
                    .target(self)
                    .identity()
                    .is_some_and(|resolved| resolved.same_as(target))
            })
            .collect()
    }

    /// Types whose resolved base type is `base`.
    pub fn find_directly_derived_types(&self, base: &StructuredType) -> Vec<Rc<StructuredType>> {
        let Some(entries) = self.derived_types.get(base.name()) else {
            return Vec::new();
        };
        entries
            .iter()
            .map(|entry| self.wrap_structured_type(&entry.node, entry.schema))
            .filter(|derived| {
                derived
                    .base_type(self)
                    .and_then(|binding| binding.into_resolved())
                    .is_some_and(|parent| parent.node_id() == base.node_id())
            })
            .collect()
    }

    /// Every type transitively derived from `base`, breadth first.
    pub fn find_all_derived_types(&self, base: &StructuredType) -> Vec<Rc<StructuredType>> {
        let mut visited = FxHashSet::default();
        visited.insert(base.node_id());
        let mut found = Vec::new();
        let mut queue: VecDeque<Rc<StructuredType>> =
            self.find_directly_derived_types(base).into();
        while let Some(derived) = queue.pop_front() {
            if !visited.insert(derived.node_id()) {
                continue;
            }
            queue.extend(self.find_directly_derived_types(&derived));
            found.push(derived);
        }
        found
    }

    // ========================================================================
    // ASSOCIATION SET MAPPINGS
    // ========================================================================

    pub(crate) fn record_association_set_mapping(
        &self,
        set: SetKey,
        navigation: NodeId,
        mapping: AssociationSetMapping,
    ) {
        self.association_set_mappings
            .borrow_mut()
            .insert((set, navigation), mapping);
    }

    /// The association set that bound `navigation` from `set`, as recorded
    /// while resolving the set's navigation targets.
    pub fn association_set_mapping(
        &self,
        set: &EntitySet,
        navigation: &NavigationProperty,
    ) -> Option<AssociationSetMapping> {
        let _ = set.navigation_targets(self);
        self.association_set_mappings
            .borrow()
            .get(&(set.key(), navigation.node_id()))
            .cloned()
    }

    pub fn association_set_name(&self, set: &EntitySet, navigation: &NavigationProperty) -> Option<Arc<str>> {
        self.association_set_mapping(set, navigation)
            .map(|mapping| mapping.set_name)
    }

    /// Direct annotations of the association set, of the end bound to `set`
    /// and of the opposite end.
    pub fn association_set_annotations(
        &self,
        set: &EntitySet,
        navigation: &NavigationProperty,
    ) -> Option<(Vec<DirectAnnotation>, Vec<DirectAnnotation>, Vec<DirectAnnotation>)> {
        self.association_set_mapping(set, navigation).map(|mapping| {
            (
                mapping.set_annotations,
                mapping.this_end_annotations,
                mapping.other_end_annotations,
            )
        })
    }

    // ========================================================================
    // ERRORS
    // ========================================================================

    fn duplicate_errors(&self) -> Vec<EdmError> {
        let mut errors = Vec::new();
        for name in self.types.keys() {
            if let Some(Binding::Ambiguous(ambiguous)) = self.type_binding(name) {
                errors.extend(ambiguous.duplicate_errors());
            }
        }
        for name in self.associations.keys() {
            if let Some(Binding::Ambiguous(ambiguous)) = self.association_binding(name) {
                errors.extend(ambiguous.duplicate_errors());
            }
        }
        for name in self.value_terms.keys() {
            if let Some(Binding::Ambiguous(ambiguous)) = self.value_term_binding(name) {
                errors.extend(ambiguous.duplicate_errors());
            }
        }
        for name in self.containers.keys() {
            if let Some(Binding::Ambiguous(ambiguous)) = self.container_binding(name) {
                errors.extend(ambiguous.duplicate_errors());
            }
        }
        errors
    }

    /// Every semantic error in the model.
    ///
    /// Walks the whole graph on each call; nothing is cached at this level.
    pub fn errors(&self) -> Vec<EdmError> {
        let mut errors = self.duplicate_errors();
        for association in self.associations() {
            errors.extend(association.errors(self));
        }
        for schema in &self.schemas {
            errors.extend(schema.errors(self));
        }
        tracing::debug!("[MODEL] {} semantic error(s)", errors.len());
        errors
    }

    pub fn diagnostics(&self) -> DiagnosticCollector {
        let mut collector = DiagnosticCollector::new();
        collector.extend_errors(self.errors());
        collector
    }
}

impl std::fmt::Debug for SemanticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticModel")
            .field("schemas", &self.schemas)
            .field("types", &self.types.len())
            .field("associations", &self.associations.len())
            .field("functions", &self.functions.len())
            .field("containers", &self.containers.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects schema ASTs and builds a [`SemanticModel`] from them.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    schemas: Vec<ast::Schema>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: ast::Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn with_schemas(mut self, schemas: impl IntoIterator<Item = ast::Schema>) -> Self {
        self.schemas.extend(schemas);
        self
    }

    /// Register every element and freeze the dictionaries.
    pub fn build(self) -> Result<SemanticModel, BuildError> {
        Self::check_input(&self.schemas)?;

        let schemas: Vec<Schema> = self
            .schemas
            .into_iter()
            .enumerate()
            .map(|(index, node)| Schema::new(SchemaId::new(index), Arc::new(node)))
            .collect();

        let mut types = Registry::new();
        let mut associations = Registry::new();
        let mut functions = Registry::new();
        let mut value_terms = Registry::new();
        let mut containers = Registry::new();
        let mut derived_types: FxHashMap<Arc<str>, Vec<Entry<ast::StructuredType>>> =
            FxHashMap::default();

        for schema in &schemas {
            let id = schema.id();
            let namespace = schema.namespace();
            let node = schema.ast();
            let qualify = |name: &str| -> Arc<str> { Arc::from(format!("{}.{}", namespace, name)) };

            for ty in &node.structured_types {
                let entry = Entry {
                    node: Arc::clone(ty),
                    schema: id,
                };
                if let Some(base) = &ty.base_type {
                    derived_types
                        .entry(Arc::from(short_name(base)))
                        .or_default()
                        .push(entry.clone());
                }
                register(&mut types, qualify(&ty.name), TypeEntry::Structured(entry));
            }
            for ty in &node.enum_types {
                let entry = Entry {
                    node: Arc::clone(ty),
                    schema: id,
                };
                register(&mut types, qualify(&ty.name), TypeEntry::Enum(entry));
            }
            for association in &node.associations {
                let entry = Entry {
                    node: Arc::clone(association),
                    schema: id,
                };
                register(&mut associations, qualify(&association.name), entry);
            }
            for function in &node.functions {
                let entry = Entry {
                    node: Arc::clone(function),
                    schema: id,
                };
                register(&mut functions, qualify(&function.name), entry);
            }
            for term in &node.value_terms {
                let entry = Entry {
                    node: Arc::clone(term),
                    schema: id,
                };
                register(&mut value_terms, qualify(&term.name), entry);
            }
            for container in &node.entity_containers {
                let entry = Entry {
                    node: Arc::clone(container),
                    schema: id,
                };
                register(&mut containers, qualify(&container.name), entry);
            }
        }

        tracing::info!(
            "[MODEL] built {} schema(s): {} type name(s), {} association(s), {} function name(s), {} value term(s), {} container(s)",
            schemas.len(),
            types.len(),
            associations.len(),
            functions.len(),
            value_terms.len(),
            containers.len()
        );

        Ok(SemanticModel {
            schemas,
            types,
            associations,
            functions,
            value_terms,
            containers,
            derived_types,
            structured_wraps: WrapTable::new(),
            enum_wraps: WrapTable::new(),
            association_wraps: WrapTable::new(),
            function_wraps: WrapTable::new(),
            value_term_wraps: WrapTable::new(),
            container_wraps: WrapTable::new(),
            association_set_mappings: RefCell::new(FxHashMap::default()),
        })
    }

    /// Namespaces must be non-empty, and node ids unique within each family
    /// of wrapped nodes.
    fn check_input(schemas: &[ast::Schema]) -> Result<(), BuildError> {
        fn unique<'a>(
            nodes: impl IntoIterator<Item = (NodeId, &'a Arc<str>)>,
        ) -> Result<(), BuildError> {
            let mut seen: FxHashMap<NodeId, &Arc<str>> = FxHashMap::default();
            for (id, name) in nodes {
                if let Some(first) = seen.insert(id, name) {
                    return Err(BuildError::DuplicateNodeId {
                        id,
                        first: first.clone(),
                        second: name.clone(),
                    });
                }
            }
            Ok(())
        }

        if let Some(schema) = schemas.iter().find(|schema| schema.namespace.is_empty()) {
            return Err(BuildError::EmptyNamespace {
                location: schema.location.clone(),
            });
        }
        unique(
            schemas
                .iter()
                .flat_map(|s| s.structured_types.iter().map(|n| (n.id, &n.name))),
        )?;
        unique(
            schemas
                .iter()
                .flat_map(|s| s.enum_types.iter().map(|n| (n.id, &n.name))),
        )?;
        unique(
            schemas
                .iter()
                .flat_map(|s| s.associations.iter().map(|n| (n.id, &n.name))),
        )?;
        unique(
            schemas
                .iter()
                .flat_map(|s| s.functions.iter().map(|n| (n.id, &n.name))),
        )?;
        unique(
            schemas
                .iter()
                .flat_map(|s| s.value_terms.iter().map(|n| (n.id, &n.name))),
        )?;
        unique(
            schemas
                .iter()
                .flat_map(|s| s.entity_containers.iter().map(|n| (n.id, &n.name))),
        )
    }
}
