//! Model construction, name lookup and model-wide error aggregation.

use std::rc::Rc;
use std::sync::Arc;

use csdl::hir::{BuildError, SchemaElement, SchemaType};
use csdl::{Element, ErrorCode, ModelBuilder};

use crate::helpers::fixtures::{Fixture, shop_schema};
use crate::helpers::model_helpers::{assert_no_errors, build_model, codes, errors_with_code};

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_shop_model_is_clean() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_schema(&mut fx)]);
    assert_no_errors(&model);
    assert_eq!(model.schemas().len(), 1);
    assert_eq!(model.find_schema("Shop").map(|s| s.namespace()), Some("Shop"));
}

#[test]
fn test_duplicate_node_id_is_a_build_error() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    let ty = Arc::new(fx.entity_type("A", &["Id"]));
    schema.structured_types.push(Arc::clone(&ty));
    schema.structured_types.push(ty);

    let err = ModelBuilder::new().with_schema(schema).build().unwrap_err();
    assert!(matches!(err, BuildError::DuplicateNodeId { .. }));
}

#[test]
fn test_ids_may_repeat_across_families() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    let ty = fx.entity_type("A", &["Id"]);
    let mut association = fx.association("Assoc", None, None);
    association.id = ty.id;
    schema.structured_types.push(Arc::new(ty));
    schema.associations.push(Arc::new(association));

    assert!(ModelBuilder::new().with_schema(schema).build().is_ok());
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_find_is_idempotent() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_schema(&mut fx)]);

    let first = model.find_type("Shop.Product").unwrap();
    let second = model.find_type("Shop.Product").unwrap();
    assert!(first.same_as(&second));
    let (SchemaType::Structured(a), SchemaType::Structured(b)) = (&first, &second) else {
        panic!("expected structured types");
    };
    assert!(Rc::ptr_eq(a, b));

    let c1 = model.find_entity_container("Shop.Store").unwrap();
    let c2 = model.find_entity_container("Shop.Store").unwrap();
    assert!(Rc::ptr_eq(&c1, &c2));
    assert!(Rc::ptr_eq(&c1.entity_sets(&model), &c2.entity_sets(&model)));

    let a1 = model.find_association("Shop.ProductCategory").unwrap();
    let a2 = model.find_association("Shop.ProductCategory").unwrap();
    assert!(Rc::ptr_eq(&a1, &a2));
}

#[test]
fn test_find_misses_return_none() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_schema(&mut fx)]);
    assert!(model.find_type("Shop.Missing").is_none());
    assert!(model.find_type("Product").is_none());
    assert!(model.find_association("Shop.Product").is_none());
    assert!(model.find_value_term("Shop.Term").is_none());
    assert!(model.find_functions("Shop.Fn").is_empty());
}

#[test]
fn test_schema_elements_in_declaration_order() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.structured_types.push(Arc::new(fx.entity_type("A", &["Id"])));
    schema.enum_types.push(Arc::new(fx.enum_type("Color", &[("Red", None)])));
    schema.functions.push(Arc::new(fx.function("F", &[])));
    schema.value_terms.push(fx.value_term("T", "Edm.String"));
    schema.entity_containers.push(Arc::new(fx.container("C", None)));
    let model = build_model(vec![schema]);

    let names: Vec<String> = model
        .schema_elements()
        .map(|element| element.qualified_name().to_string())
        .collect();
    assert_eq!(names, vec!["NS.A", "NS.Color", "NS.F", "NS.T", "NS.C"]);
    assert!(matches!(
        model.schema_elements().last(),
        Some(SchemaElement::EntityContainer(_))
    ));
    // restartable
    assert_eq!(model.schema_elements().count(), 5);
}

// ============================================================================
// Ambiguity
// ============================================================================

#[test]
fn test_duplicate_type_reports_one_already_defined_at_second_declaration() {
    let mut fx = Fixture::new();
    let mut first = fx.schema("NS");
    first.structured_types.push(Arc::new(fx.entity_type("Dup", &["Id"])));
    let mut second = fx.schema("NS");
    let duplicate = fx.entity_type("Dup", &["Id"]);
    let duplicate_location = duplicate.location.clone();
    second.structured_types.push(Arc::new(duplicate));
    let model = build_model(vec![first, second]);

    let errors = errors_with_code(&model, ErrorCode::AlreadyDefined);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, duplicate_location);
    assert!(errors[0].message.contains("NS.Dup"));
}

#[test]
fn test_ambiguous_type_still_resolves_references() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.structured_types.push(Arc::new(fx.complex_type("Address")));
    schema.structured_types.push(Arc::new(fx.complex_type("Address")));
    let mut customer = fx.entity_type("Customer", &["Id"]);
    customer.properties.push(fx.property("Home", "NS.Address"));
    schema.structured_types.push(Arc::new(customer));
    let model = build_model(vec![schema]);

    let customer = model.find_type("NS.Customer").unwrap();
    let customer = customer.as_structured().unwrap();
    let home = customer.find_property("Home", &model).unwrap();
    let home = home.as_structural().unwrap();
    assert!(home.type_ref(&model).schema_type().unwrap().is_ambiguous());
    assert_eq!(codes(&model.errors()), vec![ErrorCode::AlreadyDefined]);
}

// ============================================================================
// Aliases
// ============================================================================

#[test]
fn test_using_alias_round_trip() {
    let mut fx = Fixture::new();
    let mut real = fx.schema("Real.Namespace");
    real.structured_types.push(Arc::new(fx.complex_type("Foo")));
    let mut user = fx.schema("User");
    user.usings.push(fx.using("Real.Namespace", "Alias"));
    let model = build_model(vec![real, user]);

    let user = model.find_schema("User").unwrap();
    let substituted = user.substitute_alias("Alias.Foo");
    assert_eq!(&*substituted, "Real.Namespace.Foo");
    let via_alias = model.find_type(&substituted).unwrap();
    let direct = model.find_type("Real.Namespace.Foo").unwrap();
    assert!(via_alias.same_as(&direct));
}

#[test]
fn test_schema_alias_wins_over_using() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("Own");
    schema.alias = Some(Arc::from("X"));
    schema.usings.push(fx.using("Other", "X"));
    let model = build_model(vec![schema]);

    let own = &model.schemas()[0];
    assert_eq!(&*own.substitute_alias("X.T"), "Own.T");
    assert_eq!(&*own.substitute_alias("Y.T"), "Y.T");
    assert_eq!(&*own.substitute_alias("Plain"), "Plain");
}

#[test]
fn test_duplicate_alias() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.alias = Some(Arc::from("A"));
    schema.usings.push(fx.using("Other", "A"));
    schema.usings.push(fx.using("Third", "B"));
    schema.usings.push(fx.using("Fourth", "B"));
    let model = build_model(vec![schema]);

    let errors = errors_with_code(&model, ErrorCode::DuplicateAlias);
    assert_eq!(errors.len(), 2);
}

// ============================================================================
// Derived types
// ============================================================================

#[test]
fn test_directly_derived_types_filter_by_resolved_base() {
    let mut fx = Fixture::new();
    let mut ns = fx.schema("NS");
    ns.structured_types.push(Arc::new(fx.entity_type("Base", &["Id"])));
    ns.structured_types.push(Arc::new(fx.derived_entity_type("Child", "NS.Base")));
    ns.structured_types.push(Arc::new(fx.derived_entity_type("GrandChild", "NS.Child")));
    let mut other = fx.schema("Other");
    other.structured_types.push(Arc::new(fx.entity_type("Base", &["Id"])));
    other.structured_types.push(Arc::new(fx.derived_entity_type("Impostor", "Other.Base")));
    let model = build_model(vec![ns, other]);

    let base = model.find_type("NS.Base").unwrap();
    let base = base.as_structured().unwrap();
    let direct: Vec<String> = model
        .find_directly_derived_types(base)
        .iter()
        .map(|t| t.qualified_name().to_string())
        .collect();
    assert_eq!(direct, vec!["NS.Child"]);

    let all: Vec<String> = model
        .find_all_derived_types(base)
        .iter()
        .map(|t| t.qualified_name().to_string())
        .collect();
    assert_eq!(all, vec!["NS.Child", "NS.GrandChild"]);
    assert_no_errors(&model);
}

#[test]
fn test_diagnostics_mirror_errors() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    let mut ty = fx.entity_type("A", &["Id"]);
    ty.properties.push(fx.property("Broken", "NS.Missing"));
    schema.structured_types.push(Arc::new(ty));
    let model = build_model(vec![schema]);

    let diagnostics = model.diagnostics();
    assert_eq!(diagnostics.error_count(), model.errors().len());
    assert!(diagnostics.has_errors());
    let missing = model.find_type("NS.A").unwrap();
    assert_eq!(missing.name(), "A");
}
