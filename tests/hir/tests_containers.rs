//! Entity containers: extension, inherited members, entity sets, function
//! imports and navigation targets.

use std::rc::Rc;
use std::sync::Arc;

use csdl::ast::{DirectAnnotation, EntityContainer, Multiplicity, Schema};
use csdl::hir::{EntitySet, Member, NavigationProperty, SchemaType, StructuredType};
use csdl::{Element, ErrorCode, SemanticModel};

use crate::helpers::fixtures::{Fixture, shop_schema};
use crate::helpers::model_helpers::{assert_no_errors, build_model, codes};

fn structured(model: &SemanticModel, name: &str) -> Rc<StructuredType> {
    match model.find_type(name) {
        Some(SchemaType::Structured(ty)) => ty,
        other => panic!("expected structured type '{name}', got {other:?}"),
    }
}

fn navigation(ty: &StructuredType, name: &str, model: &SemanticModel) -> Rc<NavigationProperty> {
    match ty.find_property(name, model) {
        Some(Member::Navigation(navigation)) => navigation,
        other => panic!("expected navigation property '{name}', got {other:?}"),
    }
}

fn entity_set(model: &SemanticModel, container: &str, name: &str) -> Rc<EntitySet> {
    let container = model.find_entity_container(container).unwrap();
    container
        .find_entity_set(name, model)
        .and_then(|binding| binding.into_resolved())
        .unwrap_or_else(|| panic!("expected entity set '{name}'"))
}

fn set_names(sets: &[Rc<EntitySet>]) -> Vec<String> {
    sets.iter().map(|s| s.name().to_string()).collect()
}

fn annotation(name: &str, value: &str) -> DirectAnnotation {
    DirectAnnotation {
        namespace: Arc::from("urn:test"),
        name: Arc::from(name),
        value: Arc::from(value),
    }
}

/// `Shop` with a second container `Child` extending `Shop.Store`.
fn shop_with_child(fx: &mut Fixture, configure: impl FnOnce(&mut Fixture, &mut EntityContainer)) -> Schema {
    let mut schema = shop_schema(fx);
    let mut child = fx.container("Child", Some("Shop.Store"));
    configure(fx, &mut child);
    schema.entity_containers.push(Arc::new(child));
    schema
}

// ============================================================================
// Extension
// ============================================================================

#[test]
fn test_extends_resolves_parent() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_with_child(&mut fx, |_, _| {})]);

    let child = model.find_entity_container("Shop.Child").unwrap();
    let store = model.find_entity_container("Shop.Store").unwrap();
    let parent = child.extends(&model).unwrap().into_resolved().unwrap();
    assert!(Rc::ptr_eq(&parent, &store));
    assert!(store.extends(&model).is_none());
    assert_no_errors(&model);
}

#[test]
fn test_unresolved_extends() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema
        .entity_containers
        .push(Arc::new(fx.container("C", Some("NS.Nowhere"))));
    let model = build_model(vec![schema]);

    let container = model.find_entity_container("NS.C").unwrap();
    let extends = container.extends(&model).unwrap();
    assert!(extends.is_unresolved());
    assert_eq!(extends.name(), "NS.Nowhere");
    assert_eq!(codes(&model.errors()), vec![ErrorCode::BadUnresolvedEntityContainer]);
}

#[test]
fn test_extends_cycle_breaks_at_first_queried() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    let mut a = fx.container("A", Some("NS.B"));
    a.entity_sets.push(fx.entity_set("FromA", "NS.E"));
    let mut b = fx.container("B", Some("NS.A"));
    b.entity_sets.push(fx.entity_set("FromB", "NS.E"));
    schema.structured_types.push(Arc::new(fx.entity_type("E", &["Id"])));
    schema.entity_containers.push(Arc::new(a));
    schema.entity_containers.push(Arc::new(b));
    let model = build_model(vec![schema]);

    let a = model.find_entity_container("NS.A").unwrap();
    let b = model.find_entity_container("NS.B").unwrap();
    let a_extends = a.extends(&model).unwrap();
    assert!(a_extends.is_unresolved());
    let b_parent = b.extends(&model).unwrap().into_resolved().unwrap();
    assert!(Rc::ptr_eq(&b_parent, &a));

    // A has no usable parent, B inherits from A only
    assert_eq!(set_names(&a.entity_sets(&model)), vec!["FromA"]);
    assert_eq!(set_names(&b.entity_sets(&model)), vec!["FromA", "FromB"]);

    assert!(!a.errors(&model).is_empty());
    assert!(b.errors(&model).is_empty());
    assert_eq!(codes(&model.errors()), vec![ErrorCode::BadCyclicEntityContainer]);
}

// ============================================================================
// Inherited members
// ============================================================================

#[test]
fn test_inherited_entity_sets_come_first() {
    let mut fx = Fixture::new();
    let schema = shop_with_child(&mut fx, |fx, child| {
        child.entity_sets.push(fx.entity_set("Featured", "Shop.Product"));
    });
    let model = build_model(vec![schema]);

    let child = model.find_entity_container("Shop.Child").unwrap();
    let sets = child.entity_sets(&model);
    assert_eq!(set_names(&sets), vec!["Products", "Categories", "Featured"]);
    let inherited: Vec<bool> = sets.iter().map(|s| s.is_inherited()).collect();
    assert_eq!(inherited, vec![true, true, false]);

    // inherited copies belong to the child
    let products = entity_set(&model, "Shop.Child", "Products");
    assert_eq!(products.container_name(), "Shop.Child");
    assert!(Rc::ptr_eq(&products.container().unwrap(), &child));
    let original = entity_set(&model, "Shop.Store", "Products");
    assert_ne!(products.key(), original.key());
    assert_eq!(products.node_id(), original.node_id());
    assert_no_errors(&model);
}

#[test]
fn test_inherited_entity_set_resolves_element_type() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_with_child(&mut fx, |_, _| {})]);

    let products = entity_set(&model, "Shop.Child", "Products");
    let element = products.element_type(&model).into_resolved().unwrap();
    assert_eq!(element.qualified_name(), "Shop.Product");
}

#[test]
fn test_duplicate_entity_set_in_one_container() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.structured_types.push(Arc::new(fx.entity_type("E", &["Id"])));
    let mut container = fx.container("C", None);
    container.entity_sets.push(fx.entity_set("Things", "NS.E"));
    let duplicate = fx.entity_set("Things", "NS.E");
    let duplicate_location = duplicate.location.clone();
    container.entity_sets.push(duplicate);
    schema.entity_containers.push(Arc::new(container));
    let model = build_model(vec![schema]);

    let container = model.find_entity_container("NS.C").unwrap();
    assert!(container.find_entity_set("Things", &model).unwrap().is_ambiguous());
    let errors = model.errors();
    assert_eq!(codes(&errors), vec![ErrorCode::AlreadyDefined]);
    assert_eq!(errors[0].location, duplicate_location);
}

#[test]
fn test_redeclared_inherited_set_reported_once() {
    let mut fx = Fixture::new();
    let schema = shop_with_child(&mut fx, |fx, child| {
        child.entity_sets.push(fx.entity_set("Products", "Shop.Product"));
    });
    let model = build_model(vec![schema]);

    let child = model.find_entity_container("Shop.Child").unwrap();
    assert!(child.find_entity_set("Products", &model).unwrap().is_ambiguous());
    // the parent keeps a single, unambiguous set
    let store = model.find_entity_container("Shop.Store").unwrap();
    assert!(store.find_entity_set("Products", &model).unwrap().is_resolved());
    assert_eq!(codes(&model.errors()), vec![ErrorCode::AlreadyDefined]);
}

#[test]
fn test_inherited_errors_reported_by_declaring_container() {
    let mut fx = Fixture::new();
    let mut schema = shop_with_child(&mut fx, |_, _| {});
    let mut broken = fx.container("Broken", None);
    broken.entity_sets.push(fx.entity_set("Ghosts", "Shop.Ghost"));
    schema.entity_containers.push(Arc::new(broken));
    let mut heir = fx.container("Heir", Some("Shop.Broken"));
    heir.is_default = true;
    schema.entity_containers.push(Arc::new(heir));
    let model = build_model(vec![schema]);

    let heir = model.find_entity_container("Shop.Heir").unwrap();
    assert!(heir.is_default());
    assert!(heir.errors(&model).is_empty());
    assert_eq!(codes(&model.errors()), vec![ErrorCode::BadUnresolvedEntityType]);
}

#[test]
fn test_entity_set_of_complex_type_is_unresolved() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.structured_types.push(Arc::new(fx.complex_type("Address")));
    let mut container = fx.container("C", None);
    container.entity_sets.push(fx.entity_set("Addresses", "NS.Address"));
    schema.entity_containers.push(Arc::new(container));
    let model = build_model(vec![schema]);

    let set = entity_set(&model, "NS.C", "Addresses");
    assert!(set.element_type(&model).is_unresolved());
    assert_eq!(codes(&model.errors()), vec![ErrorCode::BadUnresolvedEntityType]);
}

// ============================================================================
// Function imports
// ============================================================================

#[test]
fn test_function_import_entity_set_and_overloads() {
    let mut fx = Fixture::new();
    let mut schema = shop_schema(&mut fx);
    let mut store = fx.container("Outlet", None);
    store.entity_sets.push(fx.entity_set("Products", "Shop.Product"));
    let mut by_id = fx.function_import("Lookup", &[("id", "Edm.Int32")]);
    by_id.entity_set = Some(Arc::from("Products"));
    let by_name = fx.function_import("Lookup", &[("name", "Edm.String")]);
    store.function_imports.push(Arc::new(by_id));
    store.function_imports.push(Arc::new(by_name));
    schema.entity_containers.push(Arc::new(store));
    let model = build_model(vec![schema]);

    let outlet = model.find_entity_container("Shop.Outlet").unwrap();
    let imports = outlet.find_function_imports("Lookup", &model);
    assert_eq!(imports.len(), 2);
    assert_eq!(imports[0].qualified_name(), "Shop.Outlet/Lookup");

    let target = imports[0].entity_set(&model).unwrap().into_resolved().unwrap();
    assert!(Rc::ptr_eq(&target, &entity_set(&model, "Shop.Outlet", "Products")));
    assert!(imports[1].entity_set(&model).is_none());
    assert!(imports[1].find_parameter("name").is_some());
    assert!(outlet.find_function_imports("Missing", &model).is_empty());
    assert_no_errors(&model);
}

#[test]
fn test_function_import_unknown_entity_set() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    let mut container = fx.container("C", None);
    let mut import = fx.function_import("Get", &[]);
    import.entity_set = Some(Arc::from("Nowhere"));
    container.function_imports.push(Arc::new(import));
    schema.entity_containers.push(Arc::new(container));
    let model = build_model(vec![schema]);

    assert_eq!(codes(&model.errors()), vec![ErrorCode::BadUnresolvedEntitySet]);
}

#[test]
fn test_inherited_function_import_rebinds_entity_set() {
    let mut fx = Fixture::new();
    let mut schema = fx.schema("NS");
    schema.structured_types.push(Arc::new(fx.entity_type("E", &["Id"])));
    let mut base = fx.container("Base", None);
    base.entity_sets.push(fx.entity_set("Things", "NS.E"));
    let mut import = fx.function_import("Get", &[]);
    import.entity_set = Some(Arc::from("Things"));
    base.function_imports.push(Arc::new(import));
    schema.entity_containers.push(Arc::new(base));
    schema
        .entity_containers
        .push(Arc::new(fx.container("Derived", Some("NS.Base"))));
    let model = build_model(vec![schema]);

    let derived = model.find_entity_container("NS.Derived").unwrap();
    let imports = derived.function_imports(&model);
    assert_eq!(imports.len(), 1);
    assert!(imports[0].is_inherited());
    assert_eq!(imports[0].qualified_name(), "NS.Derived/Get");
    let target = imports[0].entity_set(&model).unwrap().into_resolved().unwrap();
    assert_eq!(target.container_name(), "NS.Derived");
    assert_no_errors(&model);
}

// ============================================================================
// Navigation targets
// ============================================================================

#[test]
fn test_navigation_targets_follow_association_set() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_schema(&mut fx)]);

    let product = structured(&model, "Shop.Product");
    let category = structured(&model, "Shop.Category");
    let products = entity_set(&model, "Shop.Store", "Products");
    let categories = entity_set(&model, "Shop.Store", "Categories");

    let to_category = navigation(&product, "Category", &model);
    let target = products.find_navigation_target(&to_category, &model).unwrap();
    assert!(Rc::ptr_eq(&target, &categories));

    let to_products = navigation(&category, "Products", &model);
    let back = categories.find_navigation_target(&to_products, &model).unwrap();
    assert!(Rc::ptr_eq(&back, &products));

    // the Category navigation is not reachable from Categories' element type
    assert!(categories.find_navigation_target(&to_category, &model).is_none());
    assert!(Rc::ptr_eq(
        &products.navigation_targets(&model),
        &products.navigation_targets(&model)
    ));
}

#[test]
fn test_navigation_targets_include_derived_types() {
    let mut fx = Fixture::new();
    let mut schema = shop_schema(&mut fx);
    let mut special = fx.derived_entity_type("Special", "Shop.Product");
    special
        .navigation_properties
        .push(fx.navigation("Featured", "Shop.Featuring", "S", "F"));
    schema.structured_types.push(Arc::new(special));
    let s = fx.end("S", "Shop.Special", Multiplicity::Many);
    let f = fx.end("F", "Shop.Category", Multiplicity::ZeroOrOne);
    schema
        .associations
        .push(Arc::new(fx.association("Featuring", Some(s), Some(f))));
    let mut extra = fx.container("Promotions", None);
    extra.entity_sets.push(fx.entity_set("Products", "Shop.Product"));
    extra.entity_sets.push(fx.entity_set("Categories", "Shop.Category"));
    let end1 = fx.set_end(Some("S"), "Products");
    let end2 = fx.set_end(Some("F"), "Categories");
    extra
        .association_sets
        .push(fx.association_set("Featurings", "Shop.Featuring", Some(end1), Some(end2)));
    schema.entity_containers.push(Arc::new(extra));
    let model = build_model(vec![schema]);

    let products = entity_set(&model, "Shop.Promotions", "Products");
    let names: Vec<String> = products
        .navigation_targets(&model)
        .iter()
        .map(|t| format!("{}->{}", t.navigation_property.name(), t.target.container_name()))
        .collect();
    assert_eq!(names, vec!["Featured->Shop.Promotions"]);

    let special = structured(&model, "Shop.Special");
    let featured = navigation(&special, "Featured", &model);
    assert_eq!(
        model.association_set_name(&products, &featured).as_deref(),
        Some("Featurings")
    );
    assert_no_errors(&model);
}

#[test]
fn test_inherited_sets_navigate_within_child() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_with_child(&mut fx, |_, _| {})]);

    let product = structured(&model, "Shop.Product");
    let to_category = navigation(&product, "Category", &model);
    let products = entity_set(&model, "Shop.Child", "Products");
    let target = products.find_navigation_target(&to_category, &model).unwrap();
    assert!(Rc::ptr_eq(&target, &entity_set(&model, "Shop.Child", "Categories")));
}

// ============================================================================
// Association set mappings
// ============================================================================

#[test]
fn test_association_set_name_and_annotations() {
    let mut fx = Fixture::new();
    let mut schema = shop_schema(&mut fx);
    schema.entity_containers.clear();

    let mut store = fx.container("Store", None);
    store.entity_sets.push(fx.entity_set("Products", "Shop.Product"));
    store.entity_sets.push(fx.entity_set("Categories", "Shop.Category"));
    let mut end1 = (*fx.set_end(Some("P"), "Products")).clone();
    end1.direct_annotations.push(annotation("side", "products"));
    let mut end2 = (*fx.set_end(Some("C"), "Categories")).clone();
    end2.direct_annotations.push(annotation("side", "categories"));
    let mut set = (*fx.association_set(
        "ProductCategories",
        "Shop.ProductCategory",
        Some(Arc::new(end1)),
        Some(Arc::new(end2)),
    ))
    .clone();
    set.direct_annotations.push(annotation("kind", "link"));
    store.association_sets.push(Arc::new(set));
    schema.entity_containers.push(Arc::new(store));
    let model = build_model(vec![schema]);

    let product = structured(&model, "Shop.Product");
    let to_category = navigation(&product, "Category", &model);
    let products = entity_set(&model, "Shop.Store", "Products");

    // mappings are recorded on demand, without touching navigation targets first
    assert_eq!(
        model.association_set_name(&products, &to_category).as_deref(),
        Some("ProductCategories")
    );
    let (set, this_end, other_end) = model
        .association_set_annotations(&products, &to_category)
        .unwrap();
    assert_eq!(set, vec![annotation("kind", "link")]);
    assert_eq!(this_end, vec![annotation("side", "products")]);
    assert_eq!(other_end, vec![annotation("side", "categories")]);
    assert_no_errors(&model);
}

#[test]
fn test_no_mapping_without_association_set() {
    let mut fx = Fixture::new();
    let mut schema = shop_schema(&mut fx);
    schema.entity_containers.clear();
    let mut store = fx.container("Store", None);
    store.entity_sets.push(fx.entity_set("Products", "Shop.Product"));
    schema.entity_containers.push(Arc::new(store));
    let model = build_model(vec![schema]);

    let product = structured(&model, "Shop.Product");
    let to_category = navigation(&product, "Category", &model);
    let products = entity_set(&model, "Shop.Store", "Products");
    assert!(products.navigation_targets(&model).is_empty());
    assert!(model.association_set_name(&products, &to_category).is_none());
    assert!(model.association_set_annotations(&products, &to_category).is_none());
}

#[test]
fn test_find_association_sets_by_association() {
    let mut fx = Fixture::new();
    let model = build_model(vec![shop_schema(&mut fx)]);

    let store = model.find_entity_container("Shop.Store").unwrap();
    let association = model.find_association("Shop.ProductCategory").unwrap();
    let sets = store.find_association_sets(&association, &model);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].name(), "ProductCategories");
    assert!(Rc::ptr_eq(
        &sets[0],
        &store.find_association_set("ProductCategories", &model).unwrap()
    ));
}
