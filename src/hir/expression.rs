//! Annotation expressions: labeled elements and their references.

use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use super::binding::{Binding, Element, UnresolvedKind};
use super::diagnostics::EdmError;
use super::model::SemanticModel;
use super::schema::{Schema, SchemaId};
use super::type_ref::TypeReference;
use crate::ast::{self, AnnotationKind, ExpressionKind};
use crate::base::{Location, NodeId};

/// Label -> labeled element, ambiguous when a label is used more than once
/// in one schema.
pub type LabeledRegistry = IndexMap<Arc<str>, Binding<Rc<LabeledExpression>>>;

/// A `<LabeledElement>` sub-expression.
#[derive(Debug)]
pub struct LabeledExpression {
    ast: Arc<ast::Expression>,
    label: Arc<str>,
    element: Arc<ast::Expression>,
    schema: SchemaId,
}

impl LabeledExpression {
    pub fn ast(&self) -> &Arc<ast::Expression> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    /// The labeled sub-expression itself.
    pub fn element(&self) -> &Arc<ast::Expression> {
        &self.element
    }
}

impl Element for LabeledExpression {
    fn name(&self) -> &str {
        &self.label
    }

    fn location(&self) -> &Location {
        &self.ast.location
    }
}

impl PartialEq for LabeledExpression {
    fn eq(&self, other: &Self) -> bool {
        self.node_id() == other.node_id()
    }
}

// ============================================================================
// WALK
// ============================================================================

/// Direct sub-expressions of `expression`.
pub fn child_expressions(expression: &ast::Expression) -> Vec<&Arc<ast::Expression>> {
    match &expression.kind {
        ExpressionKind::Collection(elements) => elements.iter().collect(),
        ExpressionKind::Apply { arguments, .. } => arguments.iter().collect(),
        ExpressionKind::Record { properties, .. } => {
            properties.iter().map(|property| &property.value).collect()
        }
        ExpressionKind::If {
            test,
            if_true,
            if_false,
        } => vec![test, if_true, if_false],
        ExpressionKind::IsType { operand, .. } | ExpressionKind::AssertType { operand, .. } => {
            vec![operand]
        }
        ExpressionKind::Labeled { element, .. } => vec![element],
        ExpressionKind::Constant(_)
        | ExpressionKind::Path(_)
        | ExpressionKind::EnumMember(_)
        | ExpressionKind::EntitySetReference(_)
        | ExpressionKind::FunctionReference(_)
        | ExpressionKind::LabeledElementRef(_) => Vec::new(),
    }
}

/// Top-level expressions of an annotation body.
pub fn annotation_expressions(annotation: &ast::VocabularyAnnotation) -> Vec<&Arc<ast::Expression>> {
    match &annotation.kind {
        AnnotationKind::Value(value) => vec![value],
        AnnotationKind::Type { properties } => {
            properties.iter().map(|property| &property.value).collect()
        }
    }
}

/// Visit `expression` and every expression nested in it, pre-order.
pub fn walk_expression<'a>(expression: &'a Arc<ast::Expression>, f: &mut impl FnMut(&'a Arc<ast::Expression>)) {
    f(expression);
    for child in child_expressions(expression) {
        walk_expression(child, f);
    }
}

/// Build the labeled-element registry over `annotations`.
pub(crate) fn collect_labeled_elements<'a>(
    annotations: impl IntoIterator<Item = &'a Arc<ast::VocabularyAnnotation>>,
    schema: SchemaId,
) -> LabeledRegistry {
    let mut grouped: IndexMap<Arc<str>, Vec<Rc<LabeledExpression>>> = IndexMap::new();
    for annotation in annotations {
        for root in annotation_expressions(annotation) {
            walk_expression(root, &mut |expression| {
                if let ExpressionKind::Labeled { label, element } = &expression.kind {
                    grouped.entry(label.clone()).or_default().push(Rc::new(LabeledExpression {
                        ast: Arc::clone(expression),
                        label: label.clone(),
                        element: Arc::clone(element),
                        schema,
                    }));
                }
            });
        }
    }
    grouped
        .into_iter()
        .filter_map(|(label, candidates)| {
            Binding::from_candidates(label.clone(), candidates).map(|binding| (label, binding))
        })
        .collect()
}

/// Resolve a `<LabeledElementReference>` in `schema`.
pub fn resolve_labeled_reference(
    label: &Arc<str>,
    location: &Location,
    schema: &Schema,
) -> Binding<Rc<LabeledExpression>> {
    schema.find_labeled_element(label).unwrap_or_else(|| {
        Binding::unresolved(UnresolvedKind::LabeledElement, label.clone(), location.clone())
    })
}

/// Errors inside one expression tree: unresolved labeled-element references
/// and unresolved types of type tests and casts.
pub fn expression_errors(
    root: &Arc<ast::Expression>,
    schema: &Schema,
    model: &SemanticModel,
) -> Vec<EdmError> {
    let mut errors = Vec::new();
    walk_expression(root, &mut |expression| match &expression.kind {
        ExpressionKind::LabeledElementRef(label) => {
            errors.extend(resolve_labeled_reference(label, &expression.location, schema).errors());
        }
        ExpressionKind::IsType { type_ref, .. } | ExpressionKind::AssertType { type_ref, .. } => {
            errors.extend(TypeReference::resolve(type_ref, schema.id(), model).errors(model));
        }
        _ => {}
    });
    errors
}
