//! Entity containers: `Extends` chains and the inherited element view.
//!
//! A container optionally extends exactly one other container. Its computed
//! elements are copies of the parent's entity sets, association sets and
//! function imports, re-wrapped under the child, followed by its own. Lookup
//! dictionaries are built once over that full list.

use std::rc::{Rc, Weak};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use super::association::Association;
use super::association_set::AssociationSet;
use super::binding::{Binding, Element, UnresolvedKind};
use super::cache::CacheCell;
use super::diagnostics::{EdmError, ErrorKind};
use super::entity_set::EntitySet;
use super::function::FunctionImport;
use super::model::SemanticModel;
use super::schema::SchemaId;
use crate::ast;
use crate::base::{Location, NodeId};

type EntitySetIndex = IndexMap<Arc<str>, Binding<Rc<EntitySet>>>;
type FunctionImportIndex = IndexMap<Arc<str>, Vec<Rc<FunctionImport>>>;
type AssociationSetIndex = FxHashMap<NodeId, Vec<Rc<AssociationSet>>>;

pub struct EntityContainer {
    ast: Arc<ast::EntityContainer>,
    schema: SchemaId,
    qualified_name: Arc<str>,
    this: Weak<EntityContainer>,
    extends: CacheCell<Binding<Rc<EntityContainer>>>,
    entity_sets: CacheCell<Rc<[Rc<EntitySet>]>>,
    association_sets: CacheCell<Rc<[Rc<AssociationSet>]>>,
    function_imports: CacheCell<Rc<[Rc<FunctionImport>]>>,
    entity_set_index: CacheCell<Rc<EntitySetIndex>>,
    function_import_index: CacheCell<Rc<FunctionImportIndex>>,
    association_set_index: CacheCell<Rc<AssociationSetIndex>>,
}

impl EntityContainer {
    /// Build a container inside `Rc::new_cyclic`; `this` is the weak handle
    /// the container's members point back through.
    pub(crate) fn new(
        ast: Arc<ast::EntityContainer>,
        schema: SchemaId,
        namespace: &str,
        this: Weak<EntityContainer>,
    ) -> Self {
        let qualified_name = Arc::from(format!("{}.{}", namespace, ast.name));
        Self {
            ast,
            schema,
            qualified_name,
            this,
            extends: CacheCell::new(),
            entity_sets: CacheCell::new(),
            association_sets: CacheCell::new(),
            function_imports: CacheCell::new(),
            entity_set_index: CacheCell::new(),
            function_import_index: CacheCell::new(),
            association_set_index: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::EntityContainer> {
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

    pub fn is_default(&self) -> bool {
        self.ast.is_default
    }

    /// The container this one extends, `None` when nothing is declared.
    ///
    /// Finding the parent forces the parent's own `extends` before
    /// returning, so a cycle anywhere up the chain turns into a cyclic
    /// placeholder instead of unbounded recursion.
    pub fn extends(&self, model: &SemanticModel) -> Option<Binding<Rc<EntityContainer>>> {
        let name = self.ast.extends.as_ref()?;
        Some(self.extends.get_or_compute(
            || {
                let binding = model
                    .schema(self.schema)
                    .resolve_container(name, &self.ast.location, model);
                if let Some(parent) = binding.identity() {
                    let _ = parent.extends(model);
                }
                binding
            },
            || {
                tracing::debug!("[CONTAINER] extends cycle through '{}'", self.qualified_name);
                Binding::unresolved(
                    UnresolvedKind::CyclicEntityContainer,
                    self.qualified_name.clone(),
                    self.ast.location.clone(),
                )
            },
        ))
    }

    fn parent(&self, model: &SemanticModel) -> Option<Rc<EntityContainer>> {
        self.extends(model).and_then(Binding::into_resolved)
    }

    /// Inherited entity sets followed by declared ones.
    pub fn entity_sets(&self, model: &SemanticModel) -> Rc<[Rc<EntitySet>]> {
        self.entity_sets.get_or_init(|| {
            let mut sets = Vec::new();
            if let Some(parent) = self.parent(model) {
                for set in parent.entity_sets(model).iter() {
                    sets.push(Rc::new(self.wrap_entity_set(set.ast(), set.schema_id(), true)));
                }
            }
            for node in &self.ast.entity_sets {
                sets.push(Rc::new(self.wrap_entity_set(node, self.schema, false)));
            }
            tracing::trace!(
                "[CONTAINER] {} exposes {} entity sets",
                self.qualified_name,
                sets.len()
            );
            sets.into()
        })
    }

    fn wrap_entity_set(&self, node: &Arc<ast::EntitySet>, schema: SchemaId, inherited: bool) -> EntitySet {
        EntitySet::new(
            Arc::clone(node),
            schema,
            self.this.clone(),
            self.ast.id,
            self.qualified_name.clone(),
            inherited,
        )
    }

    /// Inherited association sets followed by declared ones.
    pub fn association_sets(&self, model: &SemanticModel) -> Rc<[Rc<AssociationSet>]> {
        self.association_sets.get_or_init(|| {
            let mut sets = Vec::new();
            if let Some(parent) = self.parent(model) {
                for set in parent.association_sets(model).iter() {
                    sets.push(Rc::new(AssociationSet::new(
                        Arc::clone(set.ast()),
                        set.schema_id(),
                        self.this.clone(),
                        self.ast.id,
                        true,
                    )));
                }
            }
            for node in &self.ast.association_sets {
                sets.push(Rc::new(AssociationSet::new(
                    Arc::clone(node),
                    self.schema,
                    self.this.clone(),
                    self.ast.id,
                    false,
                )));
            }
            sets.into()
        })
    }

    /// Inherited function imports followed by declared ones.
    pub fn function_imports(&self, model: &SemanticModel) -> Rc<[Rc<FunctionImport>]> {
        self.function_imports.get_or_init(|| {
            let mut imports = Vec::new();
            if let Some(parent) = self.parent(model) {
                for import in parent.function_imports(model).iter() {
                    imports.push(Rc::new(FunctionImport::new(
                        Arc::clone(import.ast()),
                        import.schema_id(),
                        self.this.clone(),
                        self.ast.id,
                        &self.qualified_name,
                        true,
                    )));
                }
            }
            for node in &self.ast.function_imports {
                imports.push(Rc::new(FunctionImport::new(
                    Arc::clone(node),
                    self.schema,
                    self.this.clone(),
                    self.ast.id,
                    &self.qualified_name,
                    false,
                )));
            }
            imports.into()
        })
    }

    fn entity_set_index(&self, model: &SemanticModel) -> Rc<EntitySetIndex> {
        self.entity_set_index.get_or_init(|| {
            let mut grouped: IndexMap<Arc<str>, Vec<Rc<EntitySet>>> = IndexMap::new();
            for set in self.entity_sets(model).iter() {
                grouped
                    .entry(Arc::from(set.name()))
                    .or_default()
                    .push(Rc::clone(set));
            }
            Rc::new(
                grouped
                    .into_iter()
                    .filter_map(|(name, sets)| {
                        Binding::from_candidates(name.clone(), sets).map(|b| (name, b))
                    })
                    .collect(),
            )
        })
    }

    fn function_import_index(&self, model: &SemanticModel) -> Rc<FunctionImportIndex> {
        self.function_import_index.get_or_init(|| {
            let mut index = FunctionImportIndex::new();
            for import in self.function_imports(model).iter() {
                index
                    .entry(Arc::from(import.name()))
                    .or_default()
                    .push(Rc::clone(import));
            }
            Rc::new(index)
        })
    }

    fn association_set_index(&self, model: &SemanticModel) -> Rc<AssociationSetIndex> {
        self.association_set_index.get_or_init(|| {
            let mut index = AssociationSetIndex::default();
            for set in self.association_sets(model).iter() {
                if let Some(association) = set.association(model).identity() {
                    index
                        .entry(association.node_id())
                        .or_default()
                        .push(Rc::clone(set));
                }
            }
            Rc::new(index)
        })
    }

    /// Entity set by name; ambiguous when the name is exposed more than once.
    pub fn find_entity_set(&self, name: &str, model: &SemanticModel) -> Option<Binding<Rc<EntitySet>>> {
        self.entity_set_index(model).get(name).cloned()
    }

    /// All function imports (overloads) with `name`.
    pub fn find_function_imports(&self, name: &str, model: &SemanticModel) -> Vec<Rc<FunctionImport>> {
        self.function_import_index(model)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Association sets bound to `association`.
    pub fn find_association_sets(
        &self,
        association: &Association,
        model: &SemanticModel,
    ) -> Vec<Rc<AssociationSet>> {
        self.association_set_index(model)
            .get(&association.node_id())
            .cloned()
            .unwrap_or_default()
    }

    pub fn find_association_set(&self, name: &str, model: &SemanticModel) -> Option<Rc<AssociationSet>> {
        self.association_sets(model)
            .iter()
            .find(|set| set.name() == name)
            .cloned()
    }

    /// Errors of the container and of the elements it declares.
    ///
    /// Inherited elements report their errors through the container that
    /// declares them.
    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let mut errors = Vec::new();
        if let Some(extends) = self.extends(model) {
            errors.extend(extends.errors());
        }
        for binding in self.entity_set_index(model).values() {
            if let Binding::Ambiguous(ambiguous) = binding {
                errors.extend(
                    ambiguous
                        .candidates()
                        .iter()
                        .skip(1)
                        .filter(|set| !set.is_inherited())
                        .map(|set| {
                            EdmError::new(
                                set.location().clone(),
                                ErrorKind::AlreadyDefined(Arc::from(set.name())),
                            )
                        }),
                );
            }
        }
        for set in self.entity_sets(model).iter().filter(|s| !s.is_inherited()) {
            errors.extend(set.errors(model));
        }
        for set in self.association_sets(model).iter().filter(|s| !s.is_inherited()) {
            errors.extend(set.errors(model));
        }
        for import in self.function_imports(model).iter().filter(|f| !f.is_inherited()) {
            errors.extend(import.errors(model));
        }
        errors
    }
}

impl Element for EntityContainer {
    fn name(&self) -> &str {
        &self.ast.name
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for EntityContainer {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

impl std::fmt::Debug for EntityContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityContainer")
            .field("name", &self.qualified_name)
            .field("extends", &self.ast.extends)
            .finish_non_exhaustive()
    }
}
