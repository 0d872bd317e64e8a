use proptest::prelude::*;
use serde_json::{json, Value};

use pm_workflows::processes;
use pm_workflows::schema::{minimal_instance, ViolationKind};
use pm_workflows::workflow::TaskContext;
use pm_workflows::Schema;

fn catalog_schemas() -> Vec<(String, Value)> {
    let ctx = TaskContext::new("tasks");
    processes::catalog()
        .iter()
        .flat_map(|process| process.tasks())
        .map(|task| {
            let descriptor = task.build(&json!({ "productName": "Acme" }), &ctx);
            (descriptor.name, descriptor.agent.output_schema)
        })
        .collect()
}

#[test]
fn test_every_catalog_schema_compiles_and_accepts_its_minimal_instance() {
    let schemas = catalog_schemas();
    assert_eq!(schemas.len(), 39);

    for (task, raw) in schemas {
        let schema = Schema::compile(&raw).unwrap_or_else(|e| panic!("{}: {}", task, e));
        let instance = minimal_instance(&schema);
        let violations = schema.validate(&instance);
        assert!(violations.is_empty(), "{}: {:?}", task, violations);
    }
}

#[test]
fn test_every_catalog_schema_requires_artifacts() {
    for (task, raw) in catalog_schemas() {
        let required: Vec<&str> = raw["required"]
            .as_array()
            .unwrap_or_else(|| panic!("{} has no required list", task))
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"artifacts"), "{}", task);
    }
}

#[test]
fn test_removing_a_required_field_is_reported_by_name() {
    for (task, raw) in catalog_schemas() {
        let schema = Schema::compile(&raw).unwrap();
        let instance = minimal_instance(&schema);

        for field in raw["required"].as_array().unwrap().iter().filter_map(Value::as_str) {
            let mut broken = instance.clone();
            broken.as_object_mut().unwrap().remove(field);

            let violations = schema.validate(&broken);
            assert_eq!(violations.len(), 1, "{} without {}", task, field);
            assert_eq!(violations[0].field(), Some(field));
            assert!(matches!(
                violations[0].kind,
                ViolationKind::MissingRequired { .. }
            ));
        }
    }
}

#[test]
fn test_violations_collect_every_failure() {
    let schema = Schema::compile(&json!({
        "type": "object",
        "required": ["name", "score", "tags"],
        "properties": {
            "name": { "type": "string" },
            "score": { "type": "integer", "minimum": 1, "maximum": 10 },
            "tags": { "type": "array", "minItems": 1, "items": { "type": "string" } }
        }
    }))
    .unwrap();

    let violations = schema.validate(&json!({ "score": 11, "tags": [3] }));
    let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
    assert_eq!(violations.len(), 3, "{:?}", violations);
    assert!(paths.contains(&"name"));
    assert!(paths.contains(&"score"));
    assert!(paths.contains(&"tags[0]"));
}

proptest! {
    #[test]
    fn integer_bounds_are_inclusive(min in -50i64..50, span in 0i64..50, value in -200i64..200) {
        let max = min + span;
        let schema = Schema::compile(&json!({ "type": "integer", "minimum": min, "maximum": max })).unwrap();

        let violations = schema.validate(&json!(value));
        let in_range = value >= min && value <= max;
        prop_assert_eq!(violations.is_empty(), in_range);
        if value < min {
            prop_assert!(matches!(violations[0].kind, ViolationKind::BelowMinimum { .. }), "expected BelowMinimum");
        }
        if value > max {
            prop_assert!(matches!(violations[0].kind, ViolationKind::AboveMaximum { .. }), "expected AboveMaximum");
        }
    }

    #[test]
    fn fractional_numbers_are_not_integers(whole in -1000i64..1000, fraction in 0.01f64..0.99) {
        let schema = Schema::compile(&json!({ "type": "integer" })).unwrap();
        let value = whole as f64 + fraction;

        prop_assert!(!schema.is_valid(&json!(value)));
        prop_assert!(schema.is_valid(&json!(whole)));
    }

    #[test]
    fn min_items_counts_elements(min_items in 0usize..8, len in 0usize..12) {
        let schema = Schema::compile(&json!({
            "type": "array",
            "minItems": min_items,
            "items": { "type": "string" }
        }))
        .unwrap();
        let value = Value::Array((0..len).map(|i| json!(format!("item-{}", i))).collect());

        prop_assert_eq!(schema.is_valid(&value), len >= min_items);
    }
}
