use std::sync::Arc;

use deepassert_compare::{AssertConfig, Comparator, FailureKind};
use deepassert_types::{Override, PropertyKind, Record, TypeRegistry, Value};
use proptest::prelude::*;

fn registry() -> Arc<TypeRegistry> {
    let mut r = TypeRegistry::new();
    r.register_value_object("Node")
        .register_value_object("Leaf")
        .register_value_object("Pair")
        .register_value_object("Animal")
        .register_value_object("Gauge")
        .register_value_object("Bag")
        .register_entity("Tag", "id")
        .declare_subtype("Dog", "Animal");
    Arc::new(r)
}

fn comparator() -> Comparator {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Comparator::new(registry())
}

fn node(label: &str, children: Vec<Value>) -> Value {
    Value::Object(
        Record::new("Node")
            .with("label", label)
            .with("children", Value::List(children))
            .with_kind("peer", PropertyKind::Object("Node"), Value::Null)
            .into_ref(),
    )
}

fn leaf(n: i64) -> Value {
    Value::Object(Record::new("Leaf").with("n", n).into_ref())
}

fn object(value: &Value) -> &deepassert_types::ObjectRef {
    value.as_object().unwrap()
}

#[derive(Clone, Debug)]
enum Shape {
    Leaf(i64),
    Node(String, Vec<Shape>),
}

fn build(shape: &Shape) -> Value {
    match shape {
        Shape::Leaf(n) => leaf(*n),
        Shape::Node(label, children) => node(label, children.iter().map(build).collect()),
    }
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = any::<i64>().prop_map(Shape::Leaf);
    leaf.prop_recursive(6, 64, 4, |inner| {
        ("[a-z]{1,6}", prop::collection::vec(inner, 0..4))
            .prop_map(|(label, children)| Shape::Node(label, children))
    })
}

proptest! {
    #[test]
    fn copy_compares_equal_to_source(shape in shape_strategy()) {
        let cmp = Comparator::new(registry());
        let source = build(&shape);
        let copy = cmp.copier().copy_root(&source).unwrap();
        let report = cmp.compare(&copy, &source, Vec::new()).unwrap();
        prop_assert!(report.is_success(), "{}", report);
    }

    #[test]
    fn relabelled_root_fails_exactly_once(label in "[a-z]{1,6}", leaves in prop::collection::vec(any::<i64>(), 0..5)) {
        let cmp = Comparator::new(registry());
        let source = node(&label, leaves.into_iter().map(leaf).collect());
        let copy = cmp.copier().copy_root(&source).unwrap();
        object(&copy).set("label", Value::from(format!("{label}!"))).unwrap();
        let report = cmp.compare(&copy, &source, Vec::new()).unwrap();
        prop_assert_eq!(report.failure_count(), 1);
        prop_assert_eq!(report.failures()[0].path.as_str(), "Node.label");
    }
}

#[test]
fn cyclic_graphs_terminate() {
    let cmp = comparator();
    let a = node("a", Vec::new());
    let b = node("b", Vec::new());
    object(&a).set("peer", b.clone()).unwrap();
    object(&b).set("peer", a.clone()).unwrap();

    let copy = cmp.copier().copy_root(&a).unwrap();
    let report = cmp.compare(&copy, &a, Vec::new()).unwrap();
    assert!(report.is_success(), "{report}");

    let copied_b = object(&copy).get("peer").unwrap();
    object(&copied_b).set("label", Value::from("z")).unwrap();
    let report = cmp.compare(&copy, &a, Vec::new()).unwrap();
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures()[0].path, "Node.peer.label");
}

#[test]
fn self_reference_terminates() {
    let cmp = comparator();
    let a = node("a", Vec::new());
    object(&a).set("peer", a.clone()).unwrap();
    let copy = cmp.copier().copy_root(&a).unwrap();
    let report = cmp.compare(&copy, &a, Vec::new()).unwrap();
    assert!(report.is_success(), "{report}");
}

#[test]
fn list_size_mismatch_is_one_terminal_failure() {
    let cmp = comparator();
    let expected = node("n", vec![leaf(1), leaf(2)]);
    let actual = node("n", vec![leaf(1), leaf(2), leaf(3)]);
    let report = cmp.compare(&expected, &actual, Vec::new()).unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].failure_kind(), Some(FailureKind::SizeMismatch));
    assert_eq!(failures[0].path, "Node.children");
    assert_eq!(failures[0].message(), "expected 2 elements but was 3");
    assert!(!report.to_string().contains("Node.children.0"));
}

#[test]
fn list_elements_compare_pairwise() {
    let cmp = comparator();
    let expected = node("n", vec![leaf(1), leaf(2)]);
    let actual = node("n", vec![leaf(1), leaf(5)]);
    let report = cmp.compare(&expected, &actual, Vec::new()).unwrap();
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures()[0].path, "Node.children.1.n");
}

#[test]
fn map_keys_are_matched() {
    let cmp = comparator();
    let with_map = |entries: Value| {
        Value::Object(Record::new("Node").with("labels", entries).into_ref())
    };
    let expected = with_map(Value::map([("k1", 1), ("k2", 2)]));
    let actual = with_map(Value::map([("k1", 1), ("k3", 3)]));
    let report = cmp.compare(&expected, &actual, Vec::new()).unwrap();

    let missing = report.failures_of(FailureKind::ExcessExpected);
    let extra = report.failures_of(FailureKind::ExcessActual);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].path, "Node.labels.k2");
    assert_eq!(extra.len(), 1);
    assert_eq!(extra[0].path, "Node.labels.k3");
    assert_eq!(report.failure_count(), 2);
}

#[test]
fn set_elements_are_matched_by_key() {
    let cmp = comparator();
    let with_set = |items: Value| Value::Object(Record::new("Node").with("tags", items).into_ref());

    let report = cmp
        .compare(
            &with_set(Value::set([1, 2])),
            &with_set(Value::set([2, 1])),
            Vec::new(),
        )
        .unwrap();
    assert!(report.is_success(), "{report}");

    let report = cmp
        .compare(
            &with_set(Value::set([1, 2])),
            &with_set(Value::set([2, 3])),
            Vec::new(),
        )
        .unwrap();
    assert_eq!(report.failures_of(FailureKind::ExcessExpected).len(), 1);
    assert_eq!(report.failures_of(FailureKind::ExcessActual).len(), 1);
}

#[test]
fn value_object_set_elements_match_structurally() {
    let cmp = comparator();
    let with_set = |items: Value| Value::Object(Record::new("Node").with("leaves", items).into_ref());
    let report = cmp
        .compare(
            &with_set(Value::set([leaf(1), leaf(2)])),
            &with_set(Value::set([leaf(2), leaf(1)])),
            Vec::new(),
        )
        .unwrap();
    assert!(report.is_success(), "{report}");
}

#[test]
fn duplicate_set_elements_are_not_collapsed() {
    let cmp = comparator();
    let with_set = |items: Value| Value::Object(Record::new("Node").with("leaves", items).into_ref());
    let report = cmp
        .compare(
            &with_set(Value::set([leaf(1), leaf(1)])),
            &with_set(Value::set([leaf(1)])),
            Vec::new(),
        )
        .unwrap();
    assert_eq!(report.failure_count(), 1, "{report}");
    assert_eq!(report.failures_of(FailureKind::ExcessExpected).len(), 1);

    let report = cmp
        .compare(
            &with_set(Value::set([leaf(1), leaf(1)])),
            &with_set(Value::set([leaf(1), leaf(1)])),
            Vec::new(),
        )
        .unwrap();
    assert!(report.is_success(), "{report}");
}

#[test]
fn nan_fields_survive_a_copy() {
    let cmp = comparator();
    let gauge = Value::Object(
        Record::new("Gauge")
            .with("reading", f64::NAN)
            .with("samples", Value::list([f64::NAN, 1.5]))
            .into_ref(),
    );
    let copy = cmp.copier().copy_root(&gauge).unwrap();
    let report = cmp.compare(&copy, &gauge, Vec::new()).unwrap();
    assert!(report.is_success(), "{report}");
}

#[test]
fn unsaved_entities_in_sets_pair_up_deterministically() {
    let cmp = comparator();
    let tag = |name: &str| {
        Value::Object(
            Record::new("Tag")
                .with("id", Value::Null)
                .with("name", name)
                .into_ref(),
        )
    };
    let bag = Value::Object(
        Record::new("Bag")
            .with("tags", Value::set([tag("red"), tag("blue")]))
            .into_ref(),
    );
    let copy = cmp.copier().copy_root(&bag).unwrap();
    let report = cmp.compare(&copy, &bag, Vec::new()).unwrap();

    assert!(report.failures_of(FailureKind::ExcessExpected).is_empty(), "{report}");
    assert!(report.failures_of(FailureKind::ExcessActual).is_empty(), "{report}");
    // Nested entities still need an id to be compared.
    let missing = report.failures_of(FailureKind::IdMissing);
    assert_eq!(missing.len(), 2);
    assert!(missing.iter().all(|c| !c.path.contains('@')), "{report}");
    assert_eq!(report.failure_count(), 2);
}

#[test]
fn excess_overrides_are_reported() {
    let cmp = comparator();
    let expected = node("n", Vec::new());
    let actual = node("m", Vec::new());
    let overrides = vec![
        Override::value("label", "m").unwrap(),
        Override::value("Node.label", "m").unwrap(),
        Override::not_null("peer.label").unwrap(),
        Override::value("colour", "red").unwrap(),
    ];
    let report = cmp.compare(&expected, &actual, overrides).unwrap();

    let excess = report.failures_of(FailureKind::ExcessOverride);
    let paths: Vec<&str> = excess.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(excess.len(), 3, "{report}");
    assert!(paths.contains(&"Node.label"));
    assert!(paths.contains(&"Node.peer.label"));
    assert!(paths.contains(&"Node.colour"));
    assert_eq!(report.failure_count(), 3);
}

#[test]
fn swapped_references_cross_roles() {
    let cmp = comparator();
    let x = node("x", Vec::new());
    let y = node("y", Vec::new());
    let pair = |first: &Value, second: &Value| {
        Value::Object(
            Record::new("Pair")
                .with("first", first.clone())
                .with("second", second.clone())
                .into_ref(),
        )
    };
    let report = cmp
        .compare(&pair(&x, &y), &pair(&y, &x), Vec::new())
        .unwrap();
    let crossed = report.failures_of(FailureKind::CrossRoleReference);
    assert_eq!(crossed.len(), 1, "{report}");
    assert_eq!(crossed[0].path, "Pair.second");
}

#[test]
fn shared_expected_references_are_compared_once() {
    let cmp = comparator();
    let shared = leaf(1);
    let source = node("n", vec![shared.clone(), shared]);
    let copy = cmp.copier().copy_root(&source).unwrap();
    let report = cmp.compare(&copy, &source, Vec::new()).unwrap();
    assert!(report.is_success(), "{report}");
    let seen = report
        .comments()
        .iter()
        .chain(report.children().iter().flat_map(|c| c.comments()))
        .filter(|c| c.message() == "already compared in this pass")
        .count();
    assert_eq!(seen, 1);
}

#[test]
fn subtypes_inherit_registration() {
    let cmp = comparator();
    let dog = |name: &str| Value::Object(Record::new("Dog").with("name", name).into_ref());
    let report = cmp.compare(&dog("rex"), &dog("max"), Vec::new()).unwrap();
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures()[0].path, "Dog.name");
}

#[test]
fn float_tolerance_comes_from_config() {
    let config = AssertConfig::from_toml_str("float_tolerance = 0.5").unwrap();
    let cmp = Comparator::with_config(registry(), config);
    let with_weight =
        |w: f64| Value::Object(Record::new("Leaf").with("weight", w).into_ref());
    let report = cmp
        .compare(&with_weight(1.0), &with_weight(1.25), Vec::new())
        .unwrap();
    assert!(report.is_success(), "{report}");
    let report = cmp
        .compare(&with_weight(1.0), &with_weight(2.0), Vec::new())
        .unwrap();
    assert_eq!(report.failure_count(), 1);
}

#[test]
fn reports_serialize_to_json() {
    let cmp = comparator();
    let report = cmp
        .compare(&node("a", Vec::new()), &node("b", Vec::new()), Vec::new())
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let text = json.to_string();
    assert!(text.contains("Node.label"));
    assert!(text.contains("failure"));
}
