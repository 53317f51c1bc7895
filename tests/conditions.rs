use flowloom::execution::Variables;
use flowloom::model::{Condition, ConditionOperator};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn operator_table() {
    let mut vars = Variables::new();
    vars.insert("amount", json!(150));
    vars.insert("status", json!("approved"));
    vars.insert("tags", json!(["billing", "priority"]));

    let cases = [
        ("amount", ConditionOperator::Equals, json!(150), true),
        ("amount", ConditionOperator::NotEquals, json!(150), false),
        ("amount", ConditionOperator::GreaterThan, json!(100), true),
        ("amount", ConditionOperator::GreaterThan, json!(150), false),
        ("amount", ConditionOperator::LessThan, json!(200), true),
        ("status", ConditionOperator::Contains, json!("rove"), true),
        ("status", ConditionOperator::Contains, json!("denied"), false),
        ("tags", ConditionOperator::Contains, json!("billing"), true),
    ];
    for (field, operator, value, expected) in cases {
        let condition = Condition::new(field, operator, value.clone());
        assert_eq!(
            condition.evaluate(&vars),
            expected,
            "{field} {operator} {value}"
        );
    }
}

#[test]
fn missing_field_never_errors() {
    let vars = Variables::new();
    for operator in [
        ConditionOperator::Equals,
        ConditionOperator::NotEquals,
        ConditionOperator::GreaterThan,
        ConditionOperator::LessThan,
        ConditionOperator::Contains,
    ] {
        assert!(!Condition::new("absent", operator, json!("x")).evaluate(&vars));
    }
}

proptest! {
    // Branch determinism: for a fixed variable map, repeated evaluations of
    // the same condition always agree, and the ordering operators stay
    // mutually consistent.
    #[test]
    fn evaluation_is_deterministic(amount in -1_000_000i64..1_000_000, threshold in -1_000_000i64..1_000_000) {
        let mut vars = Variables::new();
        vars.insert("amount", json!(amount));

        let gt = Condition::new("amount", ConditionOperator::GreaterThan, json!(threshold));
        let lt = Condition::new("amount", ConditionOperator::LessThan, json!(threshold));
        let eq = Condition::new("amount", ConditionOperator::Equals, json!(threshold));

        let first = (gt.evaluate(&vars), lt.evaluate(&vars), eq.evaluate(&vars));
        for _ in 0..3 {
            prop_assert_eq!(first, (gt.evaluate(&vars), lt.evaluate(&vars), eq.evaluate(&vars)));
        }
        // Exactly one of gt/lt/eq holds for integers.
        prop_assert_eq!(
            [first.0, first.1, first.2].iter().filter(|b| **b).count(),
            1
        );
    }

    #[test]
    fn numeric_string_coercion_matches_numbers(amount in -10_000i64..10_000) {
        let mut typed = Variables::new();
        typed.insert("v", json!(amount));
        let mut stringly = Variables::new();
        stringly.insert("v", json!(amount.to_string()));

        let condition = Condition::new("v", ConditionOperator::GreaterThan, json!(0));
        prop_assert_eq!(condition.evaluate(&typed), condition.evaluate(&stringly));
    }
}
