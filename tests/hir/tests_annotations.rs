//! Vocabulary annotations: term binding, target paths, labeled elements.

use std::rc::Rc;
use std::sync::Arc;

use csdl::ast::{Constant, ExpressionKind, Schema, VocabularyAnnotation as AstAnnotation};
use csdl::hir::{AnnotationTarget, Term, VocabularyAnnotation};
use csdl::{Element, ErrorCode, SemanticModel};
use rstest::rstest;

use crate::helpers::fixtures::Fixture;
use crate::helpers::model_helpers::{assert_no_errors, build_model, codes};

fn text(fx: &mut Fixture, value: &str) -> Arc<AstAnnotation> {
    let value = fx.expr(ExpressionKind::Constant(Constant::String(Arc::from(value))));
    fx.value_annotation("NS.Label", value)
}

/// `NS` (alias `Self`): `Customer` with `Name`, enum `Color`, value term
/// `Label`, two `Math` overloads, and container `C` exposing `Customers`
/// and the import `Run(x)`.
fn catalog(fx: &mut Fixture) -> Schema {
    let mut schema = fx.schema("NS");
    schema.alias = Some(Arc::from("Self"));
    let mut customer = fx.entity_type("Customer", &["Id"]);
    customer.properties.push(fx.property("Name", "Edm.String"));
    schema.structured_types.push(Arc::new(customer));
    schema
        .enum_types
        .push(Arc::new(fx.enum_type("Color", &[("Red", None), ("Blue", None)])));
    schema.value_terms.push(fx.value_term("Label", "Edm.String"));
    schema
        .functions
        .push(Arc::new(fx.function("Math", &[("a", "Edm.Int32"), ("b", "Edm.Int32")])));
    schema
        .functions
        .push(Arc::new(fx.function("Math", &[("a", "Edm.Int32"), ("s", "Edm.String")])));
    let mut container = fx.container("C", None);
    container.entity_sets.push(fx.entity_set("Customers", "NS.Customer"));
    container
        .function_imports
        .push(Arc::new(fx.function_import("Run", &[("x", "Edm.Int32")])));
    schema.entity_containers.push(Arc::new(container));
    schema
}

/// `catalog` plus one block targeting `target`, holding one annotation.
fn catalog_with_target(fx: &mut Fixture, target: &str) -> SemanticModel {
    let mut schema = catalog(fx);
    let annotation = text(fx, "x");
    let block = fx.annotations_block(target, vec![annotation]);
    schema.annotations.push(block);
    build_model(vec![schema])
}

fn only_annotation(model: &SemanticModel) -> Rc<VocabularyAnnotation> {
    let annotations = model.vocabulary_annotations();
    assert_eq!(annotations.len(), 1);
    Rc::clone(&annotations[0])
}

fn describe(target: &AnnotationTarget) -> String {
    let kind = match target {
        AnnotationTarget::Type(_) => "type",
        AnnotationTarget::Property(_) => "property",
        AnnotationTarget::NavigationProperty(_) => "navigation",
        AnnotationTarget::EnumMember(_) => "member",
        AnnotationTarget::Association(_) => "association",
        AnnotationTarget::Function(_) => "function",
        AnnotationTarget::Parameter(_) => "parameter",
        AnnotationTarget::ValueTerm(_) => "term",
        AnnotationTarget::EntityContainer(_) => "container",
        AnnotationTarget::EntitySet(_) => "set",
        AnnotationTarget::FunctionImport(_) => "import",
    };
    format!("{kind} {}", target.name())
}

// ============================================================================
// Terms
// ============================================================================

#[test]
fn test_term_resolves_to_value_term() {
    let mut fx = Fixture::new();
    let model = catalog_with_target(&mut fx, "NS.Customer");
    let annotation = only_annotation(&model);

    let Some(Term::ValueTerm(term)) = annotation.term(&model).into_resolved() else {
        panic!("expected value term");
    };
    assert!(Rc::ptr_eq(&term, &model.find_value_term("NS.Label").unwrap()));
    assert_no_errors(&model);
}

#[test]
fn test_term_resolves_to_type() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);
    let value = fx.expr(ExpressionKind::Constant(Constant::Null));
    let annotation = fx.value_annotation("Self.Customer", value);
    schema.annotations.push(fx.annotations_block("NS.C", vec![annotation]));
    let model = build_model(vec![schema]);

    let term = only_annotation(&model).term(&model);
    assert!(matches!(term.resolved(), Some(Term::Type(ty)) if ty.qualified_name() == "NS.Customer"));
}

#[test]
fn test_unresolved_term() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);
    let value = fx.expr(ExpressionKind::Constant(Constant::Bool(true)));
    let annotation = fx.value_annotation("Self.Missing", value);
    schema.annotations.push(fx.annotations_block("NS.C", vec![annotation]));
    let model = build_model(vec![schema]);

    let term = only_annotation(&model).term(&model);
    assert!(term.is_unresolved());
    assert_eq!(term.name(), "NS.Missing");
    assert_eq!(codes(&model.errors()), vec![ErrorCode::BadUnresolvedTerm]);
}

// ============================================================================
// Targets
// ============================================================================

#[rstest]
#[case::type_("NS.Customer", "type Customer")]
#[case::aliased_type("Self.Customer", "type Customer")]
#[case::value_term("NS.Label", "term Label")]
#[case::container("NS.C", "container C")]
#[case::function("NS.Math(Edm.Int32, Edm.String)", "function Math")]
#[case::entity_set("NS.C/Customers", "set Customers")]
#[case::function_import("NS.C/Run", "import Run")]
#[case::property("NS.Customer/Name", "property Name")]
#[case::enum_member("Self.Color/Blue", "member Blue")]
#[case::function_parameter("NS.Math(Edm.Int32,Edm.Int32)/b", "parameter b")]
#[case::import_parameter("NS.C/Run/x", "parameter x")]
fn test_target_resolves(#[case] path: &str, #[case] expected: &str) {
    let mut fx = Fixture::new();
    let model = catalog_with_target(&mut fx, path);
    let annotation = only_annotation(&model);

    assert!(!annotation.is_inline());
    assert_eq!(annotation.target_path(), Some(path));
    let target = annotation.target(&model).into_resolved().unwrap();
    assert_eq!(describe(&target), expected);
    assert_no_errors(&model);
}

#[rstest]
#[case::missing_type("NS.Missing", ErrorCode::BadUnresolvedType)]
#[case::unqualified_function("Math(Edm.Int32,Edm.Int32)", ErrorCode::BadUnresolvedType)]
#[case::no_matching_overload("NS.Math(Edm.String)", ErrorCode::BadUnresolvedType)]
#[case::missing_set("NS.C/Nothing", ErrorCode::BadUnresolvedEntitySet)]
#[case::missing_property("NS.Customer/Nothing", ErrorCode::BadUnresolvedProperty)]
#[case::missing_owner("NS.Missing/Name", ErrorCode::BadUnresolvedProperty)]
#[case::missing_function_parameter("NS.Math(Edm.Int32,Edm.Int32)/zz", ErrorCode::BadUnresolvedParameter)]
#[case::missing_import_parameter("NS.C/Run/y", ErrorCode::BadUnresolvedParameter)]
#[case::missing_import("NS.C/Walk/x", ErrorCode::BadUnresolvedParameter)]
#[case::too_deep("NS.C/Run/x/y", ErrorCode::ImpossibleAnnotationsTarget)]
fn test_target_unresolved(#[case] path: &str, #[case] code: ErrorCode) {
    let mut fx = Fixture::new();
    let model = catalog_with_target(&mut fx, path);
    let annotation = only_annotation(&model);

    assert!(annotation.target(&model).is_unresolved());
    assert_eq!(codes(&model.errors()), vec![code]);
}

#[test]
fn test_signature_selects_overload() {
    let mut fx = Fixture::new();
    let model = catalog_with_target(&mut fx, "NS.Math(Edm.Int32,Edm.Int32)");
    let annotation = only_annotation(&model);

    let Some(AnnotationTarget::Function(function)) = annotation.target(&model).into_resolved()
    else {
        panic!("expected function target");
    };
    let names: Vec<String> = function
        .parameters()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    let overloads = model.find_functions("NS.Math");
    assert!(Rc::ptr_eq(&function, &overloads[0]));
}

#[test]
fn test_identical_overloads_are_ambiguous() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.value_terms.push(fx.value_term("Label", "Edm.String"));
    schema
        .functions
        .push(Arc::new(fx.function("Twice", &[("v", "Edm.Int32")])));
    schema
        .functions
        .push(Arc::new(fx.function("Twice", &[("w", "Edm.Int32")])));
    let annotation = text(&mut fx, "x");
    schema
        .annotations
        .push(fx.annotations_block("NS.Twice(Edm.Int32)", vec![annotation]));
    let model = build_model(vec![schema]);

    let target = only_annotation(&model).target(&model);
    assert!(target.is_ambiguous());
    // usable despite the ambiguity
    assert!(target.identity().is_some());
}

#[test]
fn test_collection_signature_token() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.value_terms.push(fx.value_term("Label", "Edm.String"));
    let element = fx.named("Edm.Int32");
    let collection = fx.collection(element);
    let parameter = fx.parameter("values", collection);
    let mut sum = fx.function("Sum", &[]);
    sum.parameters.push(parameter);
    schema.functions.push(Arc::new(sum));
    let annotation = text(&mut fx, "x");
    schema
        .annotations
        .push(fx.annotations_block("NS.Sum(Collection(Edm.Int32))/values", vec![annotation]));
    let model = build_model(vec![schema]);

    let target = only_annotation(&model).target(&model).into_resolved().unwrap();
    assert_eq!(describe(&target), "parameter values");
    assert_no_errors(&model);
}

#[rstest]
#[case::matching("NS.Use(Ref(NS.E))/e", true)]
#[case::other_entity("NS.Use(Ref(NS.Other))/e", false)]
fn test_entity_reference_signature_token(#[case] path: &str, #[case] resolves: bool) {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.value_terms.push(fx.value_term("Label", "Edm.String"));
    schema.structured_types.push(Arc::new(fx.entity_type("E", &["Id"])));
    let reference = fx.entity_ref("NS.E");
    let parameter = fx.parameter("e", reference);
    let mut use_fn = fx.function("Use", &[]);
    use_fn.parameters.push(parameter);
    schema.functions.push(Arc::new(use_fn));
    let annotation = text(&mut fx, "x");
    schema.annotations.push(fx.annotations_block(path, vec![annotation]));
    let model = build_model(vec![schema]);

    let target = only_annotation(&model).target(&model);
    if resolves {
        assert_eq!(describe(&target.into_resolved().unwrap()), "parameter e");
        assert_no_errors(&model);
    } else {
        assert!(target.is_unresolved());
    }
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_inline_and_out_of_line_annotations() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);

    let mut customer = (*schema.structured_types[0]).clone();
    customer.annotations.push(text(&mut fx, "inline on type"));
    let mut name = (*customer.properties[1]).clone();
    name.annotations.push(text(&mut fx, "inline on property"));
    customer.properties[1] = Arc::new(name);
    schema.structured_types[0] = Arc::new(customer);

    let mut container = (*schema.entity_containers[0]).clone();
    let mut set = (*container.entity_sets[0]).clone();
    set.annotations.push(text(&mut fx, "inline on set"));
    container.entity_sets[0] = Arc::new(set);
    schema.entity_containers[0] = Arc::new(container);

    let annotation = text(&mut fx, "out of line");
    schema
        .annotations
        .push(fx.annotations_block("NS.Customer", vec![annotation]));
    let model = build_model(vec![schema]);

    let all = model.vocabulary_annotations();
    assert_eq!(all.len(), 4);
    // out-of-line annotations come first
    assert!(!all[0].is_inline());
    assert!(all[1..].iter().all(|a| a.is_inline()));

    let customer = model.find_type("NS.Customer").unwrap();
    let on_customer = model.find_vocabulary_annotations(&AnnotationTarget::Type(customer));
    assert_eq!(on_customer.len(), 2);

    let container = model.find_entity_container("NS.C").unwrap();
    let customers = container
        .find_entity_set("Customers", &model)
        .and_then(|b| b.into_resolved())
        .unwrap();
    let on_set = model.find_vocabulary_annotations(&AnnotationTarget::EntitySet(customers));
    assert_eq!(on_set.len(), 1);
    assert!(on_set[0].is_inline());
    assert_no_errors(&model);
}

#[test]
fn test_qualifier_falls_back_to_block() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);
    let plain = text(&mut fx, "plain");
    let mut own = (*text(&mut fx, "own")).clone();
    own.qualifier = Some(Arc::from("Phone"));
    let mut block = fx.annotations_block("NS.Customer", vec![plain, Arc::new(own)]);
    block.qualifier = Some(Arc::from("Tablet"));
    schema.annotations.push(block);
    let model = build_model(vec![schema]);

    let qualifiers: Vec<Option<String>> = model
        .vocabulary_annotations()
        .iter()
        .map(|a| a.qualifier().map(str::to_string))
        .collect();
    assert_eq!(
        qualifiers,
        vec![Some("Tablet".to_string()), Some("Phone".to_string())]
    );
}

// ============================================================================
// Labeled elements
// ============================================================================

fn labeled(fx: &mut Fixture, label: &str) -> Arc<AstAnnotation> {
    let inner = fx.expr(ExpressionKind::Constant(Constant::Int(42)));
    let value = fx.expr(ExpressionKind::Labeled {
        label: Arc::from(label),
        element: inner,
    });
    fx.value_annotation("NS.Label", value)
}

fn reference(fx: &mut Fixture, label: &str) -> Arc<AstAnnotation> {
    let value = fx.expr(ExpressionKind::LabeledElementRef(Arc::from(label)));
    fx.value_annotation("NS.Label", value)
}

#[test]
fn test_labeled_element_reference_resolves() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);
    let definition = labeled(&mut fx, "Answer");
    let use_site = reference(&mut fx, "Answer");
    schema
        .annotations
        .push(fx.annotations_block("NS.Customer", vec![definition, use_site]));
    let model = build_model(vec![schema]);

    let schema = model.find_schema("NS").unwrap();
    let found = schema.find_labeled_element("Answer").unwrap();
    let found = found.resolved().unwrap();
    assert!(matches!(
        found.element().kind,
        ExpressionKind::Constant(Constant::Int(42))
    ));
    assert!(schema.find_labeled_element("Question").is_none());
    assert_no_errors(&model);
}

#[test]
fn test_unresolved_labeled_element_reference() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);
    let use_site = reference(&mut fx, "Nowhere");
    schema
        .annotations
        .push(fx.annotations_block("NS.Customer", vec![use_site]));
    let model = build_model(vec![schema]);

    assert_eq!(
        codes(&model.errors()),
        vec![ErrorCode::BadUnresolvedLabeledElement]
    );
}

#[test]
fn test_duplicate_labels() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);
    let first = labeled(&mut fx, "Twin");
    let second = labeled(&mut fx, "Twin");
    let use_site = reference(&mut fx, "Twin");
    schema
        .annotations
        .push(fx.annotations_block("NS.Customer", vec![first, second, use_site]));
    let model = build_model(vec![schema]);

    let schema = model.find_schema("NS").unwrap();
    assert!(schema.find_labeled_element("Twin").unwrap().is_ambiguous());
    assert_eq!(codes(&model.errors()), vec![ErrorCode::AlreadyDefined]);
}

#[test]
fn test_type_test_with_unknown_type() {
    let mut fx = Fixture::new();
    let mut schema = catalog(&mut fx);
    let operand = fx.expr(ExpressionKind::Path(Arc::from("Name")));
    let type_ref = fx.named("NS.Nope");
    let value = fx.expr(ExpressionKind::IsType { operand, type_ref });
    let annotation = fx.value_annotation("NS.Label", value);
    schema
        .annotations
        .push(fx.annotations_block("NS.Customer", vec![annotation]));
    let model = build_model(vec![schema]);

    assert_eq!(codes(&model.errors()), vec![ErrorCode::BadUnresolvedType]);
}
