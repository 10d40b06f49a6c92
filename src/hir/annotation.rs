//! Vocabulary annotations: term and target binding.
//!
//! Inline annotations know their target. Out-of-line annotations name it by
//! a `/`-delimited path, resolved by segment count:
//!
//! | segments | shape                                                  |
//! |----------|--------------------------------------------------------|
//! | 1        | type, value term, `Function(Sig)`, container           |
//! | 2        | `Container/Set`, `Container/Import`, `Type/Property`, `Function/Parameter` |
//! | 3        | `Container/Import/Parameter`                           |
//!
//! Anything else is an impossible target.

use std::rc::Rc;
use std::sync::Arc;

use super::association::Association;
use super::binding::{Binding, Element, Unresolved, UnresolvedKind};
use super::cache::CacheCell;
use super::container::EntityContainer;
use super::diagnostics::EdmError;
use super::entity_set::EntitySet;
use super::enum_type::EnumMember;
use super::expression::{annotation_expressions, expression_errors};
use super::function::{Function, FunctionImport, Parameter, ValueTerm};
use super::model::SemanticModel;
use super::schema::{Schema, SchemaId};
use super::structured::{Member, NavigationProperty, Property, SchemaType};
use super::type_ref::{PrimitiveKind, TypeReference};
use crate::ast::{self, AnnotationKind, PropertyValue};
use crate::base::{Location, NodeId};

// ============================================================================
// TARGETS AND TERMS
// ============================================================================

/// An element an annotation can apply to.
#[derive(Clone, Debug)]
pub enum AnnotationTarget {
    Type(SchemaType),
    Property(Rc<Property>),
    NavigationProperty(Rc<NavigationProperty>),
    EnumMember(Rc<EnumMember>),
    Association(Rc<Association>),
    Function(Rc<Function>),
    Parameter(Rc<Parameter>),
    ValueTerm(Rc<ValueTerm>),
    EntityContainer(Rc<EntityContainer>),
    EntitySet(Rc<EntitySet>),
    FunctionImport(Rc<FunctionImport>),
}

impl AnnotationTarget {
    /// Wrapper identity.
    pub fn same_as(&self, other: &AnnotationTarget) -> bool {
        use AnnotationTarget as T;
        match (self, other) {
            (T::Type(a), T::Type(b)) => a.same_as(b),
            (T::Property(a), T::Property(b)) => Rc::ptr_eq(a, b),
            (T::NavigationProperty(a), T::NavigationProperty(b)) => Rc::ptr_eq(a, b),
            (T::EnumMember(a), T::EnumMember(b)) => Rc::ptr_eq(a, b),
            (T::Association(a), T::Association(b)) => Rc::ptr_eq(a, b),
            (T::Function(a), T::Function(b)) => Rc::ptr_eq(a, b),
            (T::Parameter(a), T::Parameter(b)) => Rc::ptr_eq(a, b),
            (T::ValueTerm(a), T::ValueTerm(b)) => Rc::ptr_eq(a, b),
            (T::EntityContainer(a), T::EntityContainer(b)) => Rc::ptr_eq(a, b),
            (T::EntitySet(a), T::EntitySet(b)) => Rc::ptr_eq(a, b),
            (T::FunctionImport(a), T::FunctionImport(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn from_member(member: Member) -> Self {
        match member {
            Member::Structural(property) => AnnotationTarget::Property(property),
            Member::Navigation(navigation) => AnnotationTarget::NavigationProperty(navigation),
        }
    }
}

impl Element for AnnotationTarget {
    fn name(&self) -> &str {
        use AnnotationTarget as T;
        match self {
            T::Type(e) => e.name(),
            T::Property(e) => e.name(),
            T::NavigationProperty(e) => e.name(),
            T::EnumMember(e) => e.name(),
            T::Association(e) => e.name(),
            T::Function(e) => e.name(),
            T::Parameter(e) => e.name(),
            T::ValueTerm(e) => e.name(),
            T::EntityContainer(e) => e.name(),
            T::EntitySet(e) => e.name(),
            T::FunctionImport(e) => e.name(),
        }
    }

    fn location(&self) -> &Location {
        use AnnotationTarget as T;
        match self {
            T::Type(e) => e.location(),
            T::Property(e) => e.location(),
            T::NavigationProperty(e) => e.location(),
            T::EnumMember(e) => e.location(),
            T::Association(e) => e.location(),
            T::Function(e) => e.location(),
            T::Parameter(e) => e.location(),
            T::ValueTerm(e) => e.location(),
            T::EntityContainer(e) => e.location(),
            T::EntitySet(e) => e.location(),
            T::FunctionImport(e) => e.location(),
        }
    }
}

/// What an annotation's term names.
#[derive(Clone, Debug)]
pub enum Term {
    Type(SchemaType),
    ValueTerm(Rc<ValueTerm>),
    Function(Rc<Function>),
}

impl Element for Term {
    fn name(&self) -> &str {
        match self {
            Term::Type(ty) => ty.name(),
            Term::ValueTerm(term) => term.name(),
            Term::Function(function) => function.name(),
        }
    }

    fn location(&self) -> &Location {
        match self {
            Term::Type(ty) => ty.location(),
            Term::ValueTerm(term) => term.location(),
            Term::Function(function) => function.location(),
        }
    }
}

// ============================================================================
// VOCABULARY ANNOTATION
// ============================================================================

#[derive(Debug)]
enum TargetSource {
    Path { path: Arc<str>, location: Location },
    Known(AnnotationTarget),
}

pub struct VocabularyAnnotation {
    ast: Arc<ast::VocabularyAnnotation>,
    schema: SchemaId,
    qualifier: Option<Arc<str>>,
    source: TargetSource,
    term: CacheCell<Binding<Term>>,
    target: CacheCell<Binding<AnnotationTarget>>,
}

impl VocabularyAnnotation {
    /// An annotation declared on `target` itself.
    pub(crate) fn inline(
        ast: Arc<ast::VocabularyAnnotation>,
        schema: SchemaId,
        target: AnnotationTarget,
    ) -> Self {
        Self {
            qualifier: ast.qualifier.clone(),
            ast,
            schema,
            source: TargetSource::Known(target),
            term: CacheCell::new(),
            target: CacheCell::new(),
        }
    }

    /// An annotation from an `<Annotations Target="...">` block.
    pub(crate) fn out_of_line(
        ast: Arc<ast::VocabularyAnnotation>,
        schema: SchemaId,
        block: &ast::AnnotationsBlock,
    ) -> Self {
        Self {
            qualifier: ast.qualifier.clone().or_else(|| block.qualifier.clone()),
            ast,
            schema,
            source: TargetSource::Path {
                path: block.target.clone(),
                location: block.location.clone(),
            },
            term: CacheCell::new(),
            target: CacheCell::new(),
        }
    }

    pub fn ast(&self) -> &Arc<ast::VocabularyAnnotation> {
        &self.ast
    }

    pub fn node_id(&self) -> NodeId {
        self.ast.id
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.source, TargetSource::Known(_))
    }

    /// The target path of an out-of-line annotation.
    pub fn target_path(&self) -> Option<&str> {
        match &self.source {
            TargetSource::Path { path, .. } => Some(path),
            TargetSource::Known(_) => None,
        }
    }

    /// The value of a value annotation.
    pub fn value(&self) -> Option<&Arc<ast::Expression>> {
        match &self.ast.kind {
            AnnotationKind::Value(value) => Some(value),
            AnnotationKind::Type { .. } => None,
        }
    }

    /// The property values of a type annotation.
    pub fn property_values(&self) -> &[PropertyValue] {
        match &self.ast.kind {
            AnnotationKind::Type { properties } => properties,
            AnnotationKind::Value(_) => &[],
        }
    }

    pub fn term(&self, model: &SemanticModel) -> Binding<Term> {
        self.term.get_or_init(|| {
            resolve_term(&self.ast.term, &self.ast.location, model.schema(self.schema), model)
        })
    }

    pub fn target(&self, model: &SemanticModel) -> Binding<AnnotationTarget> {
        self.target.get_or_init(|| match &self.source {
            TargetSource::Known(target) => Binding::Resolved(target.clone()),
            TargetSource::Path { path, location } => {
                resolve_target(path, location, model.schema(self.schema), model)
            }
        })
    }

    pub fn errors(&self, model: &SemanticModel) -> Vec<EdmError> {
        let mut errors = self.term(model).errors();
        errors.extend(self.target(model).errors());
        let schema = model.schema(self.schema);
        for root in annotation_expressions(&self.ast) {
            errors.extend(expression_errors(root, schema, model));
        }
        errors
    }
}

impl std::fmt::Debug for VocabularyAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyAnnotation")
            .field("term", &self.ast.term)
            .field("qualifier", &self.qualifier)
            .field("target", &self.source)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TERM RESOLUTION
// ============================================================================

/// Type, then value term, then parameterized function.
pub(crate) fn resolve_term(
    name: &str,
    location: &Location,
    schema: &Schema,
    model: &SemanticModel,
) -> Binding<Term> {
    let qualified = schema.substitute_alias(name);
    if let Some(binding) = model.type_binding(&qualified) {
        return binding.map(Term::Type);
    }
    if let Some(binding) = model.value_term_binding(&qualified) {
        return binding.map(Term::ValueTerm);
    }
    if let Some(binding) = find_parameterized_function(name, schema, model) {
        return binding.map(Term::Function);
    }
    Binding::unresolved(UnresolvedKind::Term, qualified, location.clone())
}

// ============================================================================
// TARGET RESOLUTION
// ============================================================================

/// Resolve an out-of-line annotation target path.
pub(crate) fn resolve_target(
    path: &str,
    location: &Location,
    schema: &Schema,
    model: &SemanticModel,
) -> Binding<AnnotationTarget> {
    let segments = split_top_level(path, '/');
    match segments.as_slice() {
        [single] => resolve_single(single, location, schema, model),
        [first, second] => resolve_pair(first, second, location, schema, model),
        [container, import, parameter] => {
            resolve_triple(container, import, parameter, location, schema, model)
        }
        _ => Binding::unresolved(UnresolvedKind::ImpossibleTarget, path, location.clone()),
    }
}

fn resolve_single(
    segment: &str,
    location: &Location,
    schema: &Schema,
    model: &SemanticModel,
) -> Binding<AnnotationTarget> {
    let qualified = schema.substitute_alias(segment);
    if let Some(binding) = model.type_binding(&qualified) {
        return binding.map(AnnotationTarget::Type);
    }
    if let Some(binding) = model.value_term_binding(&qualified) {
        return binding.map(AnnotationTarget::ValueTerm);
    }
    if let Some(binding) = find_parameterized_function(segment, schema, model) {
        return binding.map(AnnotationTarget::Function);
    }
    if let Some(binding) = model.container_binding(&qualified) {
        return binding.map(AnnotationTarget::EntityContainer);
    }
    Binding::unresolved(UnresolvedKind::Type, qualified, location.clone())
}

fn resolve_pair(
    first: &str,
    second: &str,
    location: &Location,
    schema: &Schema,
    model: &SemanticModel,
) -> Binding<AnnotationTarget> {
    let qualified = schema.substitute_alias(first);

    if let Some(container) = model
        .container_binding(&qualified)
        .and_then(|binding| binding.identity().cloned())
    {
        if let Some(set) = container.find_entity_set(second, model) {
            return set.map(AnnotationTarget::EntitySet);
        }
        if let Some(imports) = find_function_import(&container, second, model) {
            return imports.map(AnnotationTarget::FunctionImport);
        }
        return Binding::unresolved(UnresolvedKind::EntitySet, second, location.clone());
    }

    if let Some(ty) = model
        .type_binding(&qualified)
        .and_then(|binding| binding.identity().cloned())
    {
        let member = match &ty {
            SchemaType::Structured(structured) => structured
                .find_property(second, model)
                .map(AnnotationTarget::from_member),
            SchemaType::Enum(enum_type) => {
                enum_type.find_member(second).map(AnnotationTarget::EnumMember)
            }
        };
        return match member {
            Some(member) => Binding::Resolved(member),
            None => Binding::unresolved(UnresolvedKind::Property, second, location.clone()),
        };
    }

    if let Some(function) = find_parameterized_function(first, schema, model)
        .and_then(|binding| binding.identity().cloned())
    {
        return match function.find_parameter(second) {
            Some(parameter) => Binding::Resolved(AnnotationTarget::Parameter(parameter)),
            None => Binding::unresolved(UnresolvedKind::Parameter, second, location.clone()),
        };
    }

    Binding::Unresolved(
        Unresolved::new(UnresolvedKind::Property, second, location.clone()).within(
            Unresolved::new(UnresolvedKind::EntityType, qualified, location.clone()),
        ),
    )
}

fn resolve_triple(
    container: &str,
    import: &str,
    parameter: &str,
    location: &Location,
    schema: &Schema,
    model: &SemanticModel,
) -> Binding<AnnotationTarget> {
    let qualified = schema.substitute_alias(container);
    let found = model
        .container_binding(&qualified)
        .and_then(|binding| binding.identity().cloned())
        .and_then(|container| find_function_import(&container, import, model))
        .and_then(|binding| binding.identity().cloned())
        .and_then(|import| import.find_parameter(parameter));
    match found {
        Some(parameter) => Binding::Resolved(AnnotationTarget::Parameter(parameter)),
        None => Binding::Unresolved(
            Unresolved::new(UnresolvedKind::Parameter, parameter, location.clone()).within(
                Unresolved::new(UnresolvedKind::Function, import, location.clone()),
            ),
        ),
    }
}

// ============================================================================
// SIGNATURE MATCHING
// ============================================================================

/// Split on `separator` outside parentheses, trimming each piece.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                pieces.push(text[start..index].trim());
                start = index + ch.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(text[start..].trim());
    pieces
}

/// `Name(T1, T2)` -> (`Name`, [`T1`, `T2`]); `None` without parentheses.
pub(crate) fn split_signature(path: &str) -> Option<(&str, Vec<&str>)> {
    let open = path.find('(')?;
    let close = path.rfind(')')?;
    if close < open {
        return None;
    }
    let name = path[..open].trim();
    let inner = path[open + 1..close].trim();
    let tokens = if inner.is_empty() {
        Vec::new()
    } else {
        split_top_level(inner, ',')
    };
    Some((name, tokens))
}

/// `Wrapper(Inner)` -> `Inner`.
fn strip_wrapper<'a>(token: &'a str, wrapper: &str) -> Option<&'a str> {
    token
        .strip_prefix(wrapper)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(str::trim)
}

/// Whether a parameter of type `parameter` accepts the signature token.
fn type_matches_token(
    parameter: &TypeReference,
    token: &str,
    schema: &Schema,
    model: &SemanticModel,
) -> bool {
    if let Some(inner) = strip_wrapper(token, "Collection") {
        return parameter
            .collection_element()
            .is_some_and(|element| type_matches_token(element, inner, schema, model));
    }
    if let Some(inner) = strip_wrapper(token, "Ref") {
        let Some(expected) = model
            .type_binding(&schema.substitute_alias(inner))
            .and_then(|binding| binding.identity().cloned())
        else {
            return false;
        };
        return parameter
            .referenced_entity_type()
            .and_then(|binding| binding.identity().cloned())
            .is_some_and(|actual| {
                expected
                    .as_structured()
                    .is_some_and(|expected| Rc::ptr_eq(expected, &actual))
            });
    }
    if let Some(kind) = PrimitiveKind::from_qualified_name(token) {
        return parameter.primitive_kind() == Some(kind);
    }
    let expected = model
        .type_binding(&schema.substitute_alias(token))
        .and_then(|binding| binding.identity().cloned());
    match (expected, parameter.schema_type().and_then(Binding::identity)) {
        (Some(expected), Some(actual)) => expected.same_as(actual),
        _ => false,
    }
}

fn signature_matches(
    parameters: &[Rc<Parameter>],
    tokens: &[&str],
    schema: &Schema,
    model: &SemanticModel,
) -> bool {
    parameters.len() == tokens.len()
        && parameters
            .iter()
            .zip(tokens)
            .all(|(parameter, token)| type_matches_token(&parameter.type_ref(model), token, schema, model))
}

/// Resolve `Name(T1, ...)` to the matching function overloads.
///
/// `None` when the text has no signature or nothing matches; ambiguous
/// when several overloads match.
pub(crate) fn find_parameterized_function(
    text: &str,
    schema: &Schema,
    model: &SemanticModel,
) -> Option<Binding<Rc<Function>>> {
    let (name, tokens) = split_signature(text)?;
    let qualified = schema.substitute_alias(name);
    let matches: Vec<Rc<Function>> = model
        .find_functions(&qualified)
        .into_iter()
        .filter(|function| signature_matches(&function.parameters(), &tokens, schema, model))
        .collect();
    Binding::from_candidates(qualified, matches)
}

/// Resolve a function import by plain name (all overloads) or by
/// `Name(T1, ...)` signature.
fn find_function_import(
    container: &EntityContainer,
    text: &str,
    model: &SemanticModel,
) -> Option<Binding<Rc<FunctionImport>>> {
    let schema = model.schema(container.schema_id());
    match split_signature(text) {
        Some((name, tokens)) => {
            let matches: Vec<Rc<FunctionImport>> = container
                .find_function_imports(name, model)
                .into_iter()
                .filter(|import| signature_matches(&import.parameters(), &tokens, schema, model))
                .collect();
            Binding::from_candidates(name, matches)
        }
        None => Binding::from_candidates(text, container.find_function_imports(text, model)),
    }
}
