//! Schemas: per-namespace resolution scopes.
//!
//! A schema resolves names used inside it: alias substitution first (own
//! alias, then each `using` alias in declaration order), then lookup in the
//! model-wide dictionaries. It also owns the labeled-element registry and
//! the annotations declared in it.

use std::rc::Rc;
use std::sync::Arc;

use super::annotation::{AnnotationTarget, VocabularyAnnotation};
use super::association::Association;
use super::binding::{Binding, Element, Unresolved, UnresolvedKind};
use super::cache::CacheCell;
use super::container::EntityContainer;
use super::diagnostics::{EdmError, ErrorKind};
use super::expression::{LabeledExpression, LabeledRegistry, collect_labeled_elements};
use super::function::{Function, ValueTerm};
use super::model::SemanticModel;
use super::structured::{SchemaType, StructuredType};
use crate::ast::{self, StructuredKind};
use crate::base::{Location, NodeId};

/// Index of a schema within its model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u32);

impl SchemaId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A top-level element of a schema.
#[derive(Clone, Debug)]
pub enum SchemaElement {
    Type(SchemaType),
    Function(Rc<Function>),
    ValueTerm(Rc<ValueTerm>),
    EntityContainer(Rc<EntityContainer>),
}

impl SchemaElement {
    pub fn qualified_name(&self) -> &str {
        match self {
            SchemaElement::Type(ty) => ty.qualified_name(),
            SchemaElement::Function(function) => function.qualified_name(),
            SchemaElement::ValueTerm(term) => term.qualified_name(),
            SchemaElement::EntityContainer(container) => container.qualified_name(),
        }
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        match self {
            SchemaElement::Type(ty) => ty.errors(model),
            SchemaElement::Function(function) => function.errors(model),
            SchemaElement::ValueTerm(term) => term.errors(model),
            SchemaElement::EntityContainer(container) => container.errors(model),
        }
    }
}

impl Element for SchemaElement {
    fn name(&self) -> &str {
        match self {
            SchemaElement::Type(ty) => ty.name(),
            SchemaElement::Function(function) => function.name(),
            SchemaElement::ValueTerm(term) => term.name(),
            SchemaElement::EntityContainer(container) => container.name(),
        }
    }

    fn location(&self) -> &Location {
        match self {
            SchemaElement::Type(ty) => ty.location(),
            SchemaElement::Function(function) => function.location(),
            SchemaElement::ValueTerm(term) => term.location(),
            SchemaElement::EntityContainer(container) => container.location(),
        }
    }
}

pub struct Schema {
    id: SchemaId,
    ast: Arc<ast::Schema>,
    labeled_elements: CacheCell<Rc<LabeledRegistry>>,
    inline_annotations: CacheCell<Rc<[Rc<VocabularyAnnotation>]>>,
    out_of_line_annotations: CacheCell<Rc<[Rc<VocabularyAnnotation>]>>,
}

impl Schema {
    pub(crate) fn new(id: SchemaId, ast: Arc<ast::Schema>) -> Self {
        Self {
            id,
            ast,
            labeled_elements: CacheCell::new(),
            inline_annotations: CacheCell::new(),
            out_of_line_annotations: CacheCell::new(),
        }
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn ast(&self) -> &Arc<ast::Schema> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn namespace(&self) -> &str {
        &self.ast.namespace
    }

    pub fn alias(&self) -> Option<&str> {
        self.ast.alias.as_deref()
    }

    // ========================================================================
    // NAME RESOLUTION
    // ========================================================================

    /// Replace a leading `Alias.` with the namespace it stands for.
    ///
    /// The schema's own alias is tried first, then each `using` alias in
    /// declaration order. Names without a known alias prefix come back
    /// unchanged.
    pub fn substitute_alias(&self, name: &str) -> Arc<str> {
        let Some((prefix, rest)) = name.split_once('.') else {
            return Arc::from(name);
        };
        if self.ast.alias.as_deref() == Some(prefix) {
            return Arc::from(format!("{}.{}", self.ast.namespace, rest));
        }
        self.ast
            .usings
            .iter()
            .find(|using| &*using.alias == prefix)
            .map(|using| Arc::from(format!("{}.{}", using.namespace, rest)))
            .unwrap_or_else(|| Arc::from(name))
    }

    pub fn resolve_type(
        &self,
        name: &str,
        location: &Location,
        model: &SemanticModel,
    ) -> Binding<SchemaType> {
        let qualified = self.substitute_alias(name);
        model.type_binding(&qualified).unwrap_or_else(|| {
            Binding::unresolved(UnresolvedKind::Type, qualified, location.clone())
        })
    }

    pub fn resolve_entity_type(
        &self,
        name: &str,
        location: &Location,
        model: &SemanticModel,
    ) -> Binding<Rc<StructuredType>> {
        let qualified = self.substitute_alias(name);
        let binding = model.type_binding(&qualified).unwrap_or_else(|| {
            Binding::unresolved(UnresolvedKind::EntityType, qualified.clone(), location.clone())
        });
        binding.narrow(
            |ty| {
                ty.as_structured()
                    .filter(|ty| ty.kind() == StructuredKind::Entity)
                    .cloned()
            },
            || Unresolved::new(UnresolvedKind::EntityType, qualified.clone(), location.clone()),
        )
    }

    pub fn resolve_association(
        &self,
        name: &str,
        location: &Location,
        model: &SemanticModel,
    ) -> Binding<Rc<Association>> {
        let qualified = self.substitute_alias(name);
        model.association_binding(&qualified).unwrap_or_else(|| {
            Binding::unresolved(UnresolvedKind::Association, qualified, location.clone())
        })
    }

    pub fn resolve_container(
        &self,
        name: &str,
        location: &Location,
        model: &SemanticModel,
    ) -> Binding<Rc<EntityContainer>> {
        let qualified = self.substitute_alias(name);
        model.container_binding(&qualified).unwrap_or_else(|| {
            Binding::unresolved(UnresolvedKind::EntityContainer, qualified, location.clone())
        })
    }

    pub fn resolve_value_term(
        &self,
        name: &str,
        location: &Location,
        model: &SemanticModel,
    ) -> Binding<Rc<ValueTerm>> {
        let qualified = self.substitute_alias(name);
        model.value_term_binding(&qualified).unwrap_or_else(|| {
            Binding::unresolved(UnresolvedKind::Term, qualified, location.clone())
        })
    }

    pub fn find_functions(&self, name: &str, model: &SemanticModel) -> Vec<Rc<Function>> {
        model.find_functions(&self.substitute_alias(name))
    }

    // ========================================================================
    // ELEMENTS
    // ========================================================================

    pub fn types(&self, model: &SemanticModel) -> Vec<SchemaType> {
        let structured = self
            .ast
            .structured_types
            .iter()
            .map(|node| SchemaType::Structured(model.wrap_structured_type(node, self.id)));
        let enums = self
            .ast
            .enum_types
            .iter()
            .map(|node| SchemaType::Enum(model.wrap_enum_type(node, self.id)));
        structured.chain(enums).collect()
    }

    pub fn associations(&self, model: &SemanticModel) -> Vec<Rc<Association>> {
        self.ast
            .associations
            .iter()
            .map(|node| model.wrap_association(node, self.id))
            .collect()
    }

    pub fn functions(&self, model: &SemanticModel) -> Vec<Rc<Function>> {
        self.ast
            .functions
            .iter()
            .map(|node| model.wrap_function(node, self.id))
            .collect()
    }

    pub fn value_terms(&self, model: &SemanticModel) -> Vec<Rc<ValueTerm>> {
        self.ast
            .value_terms
            .iter()
            .map(|node| model.wrap_value_term(node, self.id))
            .collect()
    }

    pub fn entity_containers(&self, model: &SemanticModel) -> Vec<Rc<EntityContainer>> {
        self.ast
            .entity_containers
            .iter()
            .map(|node| model.wrap_entity_container(node, self.id))
            .collect()
    }

    /// Types, functions, value terms and containers, in that order.
    pub fn elements(&self, model: &SemanticModel) -> Vec<SchemaElement> {
        let mut elements: Vec<SchemaElement> =
            self.types(model).into_iter().map(SchemaElement::Type).collect();
        elements.extend(self.functions(model).into_iter().map(SchemaElement::Function));
        elements.extend(self.value_terms(model).into_iter().map(SchemaElement::ValueTerm));
        elements.extend(
            self.entity_containers(model)
                .into_iter()
                .map(SchemaElement::EntityContainer),
        );
        elements
    }

    // ========================================================================
    // LABELED ELEMENTS
    // ========================================================================

    /// Every labeled sub-expression in the schema's annotations, by label.
    pub fn labeled_elements(&self) -> Rc<LabeledRegistry> {
        self.labeled_elements.get_or_init(|| {
            Rc::new(collect_labeled_elements(ast_annotations(&self.ast), self.id))
        })
    }

    pub fn find_labeled_element(&self, label: &str) -> Option<Binding<Rc<LabeledExpression>>> {
        self.labeled_elements().get(label).cloned()
    }

    // ========================================================================
    // ANNOTATIONS
    // ========================================================================

    /// Annotations from `<Annotations Target="...">` blocks.
    pub fn out_of_line_annotations(&self) -> Rc<[Rc<VocabularyAnnotation>]> {
        self.out_of_line_annotations.get_or_init(|| {
            self.ast
                .annotations
                .iter()
                .flat_map(|block| {
                    block.annotations.iter().map(move |node| {
                        Rc::new(VocabularyAnnotation::out_of_line(
                            Arc::clone(node),
                            self.id,
                            block,
                        ))
                    })
                })
                .collect()
        })
    }

    /// Annotations declared directly on the schema's elements and their
    /// members.
    pub fn inline_annotations(&self, model: &SemanticModel) -> Rc<[Rc<VocabularyAnnotation>]> {
        self.inline_annotations
            .get_or_init(|| self.collect_inline_annotations(model).into())
    }

    fn collect_inline_annotations(&self, model: &SemanticModel) -> Vec<Rc<VocabularyAnnotation>> {
        let mut found = Vec::new();
        let mut push = |nodes: &[Arc<ast::VocabularyAnnotation>], target: AnnotationTarget| {
            for node in nodes {
                found.push(Rc::new(VocabularyAnnotation::inline(
                    Arc::clone(node),
                    self.id,
                    target.clone(),
                )));
            }
        };

        for ty in self.types(model) {
            match &ty {
                SchemaType::Structured(structured) => {
                    push(&structured.ast().annotations, AnnotationTarget::Type(ty.clone()));
                    for property in structured.declared_properties().iter() {
                        push(
                            &property.ast().annotations,
                            AnnotationTarget::Property(Rc::clone(property)),
                        );
                    }
                    for navigation in structured.declared_navigation_properties().iter() {
                        push(
                            &navigation.ast().annotations,
                            AnnotationTarget::NavigationProperty(Rc::clone(navigation)),
                        );
                    }
                }
                SchemaType::Enum(enum_type) => {
                    push(&enum_type.ast().annotations, AnnotationTarget::Type(ty.clone()));
                    for member in enum_type.members().iter() {
                        push(
                            &member.ast().annotations,
                            AnnotationTarget::EnumMember(Rc::clone(member)),
                        );
                    }
                }
            }
        }
        for association in self.associations(model) {
            push(
                &association.ast().annotations,
                AnnotationTarget::Association(Rc::clone(&association)),
            );
        }
        for function in self.functions(model) {
            push(
                &function.ast().annotations,
                AnnotationTarget::Function(Rc::clone(&function)),
            );
            for parameter in function.parameters().iter() {
                push(
                    &parameter.ast().annotations,
                    AnnotationTarget::Parameter(Rc::clone(parameter)),
                );
            }
        }
        for term in self.value_terms(model) {
            push(&term.ast().annotations, AnnotationTarget::ValueTerm(Rc::clone(&term)));
        }
        for container in self.entity_containers(model) {
            push(
                &container.ast().annotations,
                AnnotationTarget::EntityContainer(Rc::clone(&container)),
            );
            for set in container.entity_sets(model).iter().filter(|s| !s.is_inherited()) {
                push(&set.ast().annotations, AnnotationTarget::EntitySet(Rc::clone(set)));
            }
            for import in container
                .function_imports(model)
                .iter()
                .filter(|f| !f.is_inherited())
            {
                push(
                    &import.ast().annotations,
                    AnnotationTarget::FunctionImport(Rc::clone(import)),
                );
                for parameter in import.parameters().iter() {
                    push(
                        &parameter.ast().annotations,
                        AnnotationTarget::Parameter(Rc::clone(parameter)),
                    );
                }
            }
        }
        found
    }

    // ========================================================================
    // ERRORS
    // ========================================================================

    /// A `using` alias that repeats the schema alias or an earlier `using`
    /// alias.
    fn duplicate_alias_errors(&self) -> Vec<EdmError> {
        let mut seen: Vec<&str> = self.ast.alias.as_deref().into_iter().collect();
        let mut errors = Vec::new();
        for using in &self.ast.usings {
            if seen.contains(&&*using.alias) {
                errors.push(EdmError::new(
                    using.location.clone(),
                    ErrorKind::DuplicateAlias(using.alias.clone()),
                ));
            } else {
                seen.push(&using.alias);
            }
        }
        errors
    }

    /// Errors of this schema's elements and annotations. Associations report
    /// through the model.
    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let mut errors = self.duplicate_alias_errors();
        for element in self.elements(model) {
            errors.extend(element.errors(model));
        }
        for annotation in self.out_of_line_annotations().iter() {
            errors.extend(annotation.errors(model));
        }
        for annotation in self.inline_annotations(model).iter() {
            errors.extend(annotation.errors(model));
        }
        for binding in self.labeled_elements().values() {
            if let Binding::Ambiguous(ambiguous) = binding {
                errors.extend(ambiguous.duplicate_errors());
            }
        }
        errors
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id)
            .field("namespace", &self.ast.namespace)
            .field("alias", &self.ast.alias)
            .finish_non_exhaustive()
    }
}

/// Every annotation node in the schema AST, inline and out-of-line.
fn ast_annotations(schema: &ast::Schema) -> Vec<&Arc<ast::VocabularyAnnotation>> {
    let mut found = Vec::new();
    for ty in &schema.structured_types {
        found.extend(&ty.annotations);
        for property in &ty.properties {
            found.extend(&property.annotations);
        }
        for navigation in &ty.navigation_properties {
            found.extend(&navigation.annotations);
        }
    }
    for ty in &schema.enum_types {
        found.extend(&ty.annotations);
        for member in &ty.members {
            found.extend(&member.annotations);
        }
    }
    for association in &schema.associations {
        found.extend(&association.annotations);
    }
    for function in &schema.functions {
        found.extend(&function.annotations);
        for parameter in &function.parameters {
            found.extend(&parameter.annotations);
        }
    }
    for term in &schema.value_terms {
        found.extend(&term.annotations);
    }
    for container in &schema.entity_containers {
        found.extend(&container.annotations);
        for set in &container.entity_sets {
            found.extend(&set.annotations);
        }
        for import in &container.function_imports {
            found.extend(&import.annotations);
            for parameter in &import.parameters {
                found.extend(&parameter.annotations);
            }
        }
    }
    for block in &schema.annotations {
        found.extend(&block.annotations);
    }
    found
}
