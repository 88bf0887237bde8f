//! Property-based tests for the sandboxed evaluator.

use blockflow_core::{EvaluationError, Value, evaluate};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Characters that survive normalization but are outside the accepted set.
const FORBIDDEN: &[char] = &[
    '\'', '"', '[', ']', '{', '}', ';', ':', ',', '!', '@', '#', '$', '^', '&', '|', '~', '`',
    '?', '\\', 'é', 'λ', '０',
];

fn safe_fragment() -> impl Strategy<Value = String> {
    "[a-z0-9_+*/<>=%().-]{0,12}"
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1000i64..1000).prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
    ]
}

/// Bindings whose names all start with `a`..`w` and so never equal `x`.
fn bindings_without_x() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map("[a-w][a-z0-9_]{0,4}", value_strategy(), 0..6)
}

proptest! {
    #[test]
    fn forbidden_character_is_always_reported(
        prefix in safe_fragment(),
        bad in prop::sample::select(FORBIDDEN),
        suffix in safe_fragment(),
    ) {
        let expression = format!("{prefix}{bad}{suffix}");
        let result = evaluate(&expression, &BTreeMap::new());
        let is_forbidden_character = matches!(
            result,
            Err(EvaluationError::ForbiddenCharacter { .. })
        );
        prop_assert!(is_forbidden_character, "{expression:?} gave {result:?}");
    }

    #[test]
    fn call_syntax_is_always_rejected(
        lead in "([0-9]{1,3}[+*<-])?",
        name in "[a-z_][a-z0-9_]{0,6}",
        args in "[0-9a-z+]{0,5}",
    ) {
        let expression = format!("{lead}{name}({args})");
        let result = evaluate(&expression, &BTreeMap::new());
        let is_forbidden_call = matches!(result, Err(EvaluationError::ForbiddenCall { .. }));
        prop_assert!(is_forbidden_call, "{expression:?} gave {result:?}");
    }

    #[test]
    fn unbound_name_is_unknown(bindings in bindings_without_x()) {
        prop_assert_eq!(
            evaluate("x", &bindings),
            Err(EvaluationError::UnknownIdentifier("x".into()))
        );
    }

    #[test]
    fn bound_name_yields_its_value(
        mut bindings in bindings_without_x(),
        value in value_strategy(),
    ) {
        bindings.insert("x".to_string(), value);
        prop_assert_eq!(evaluate("x", &bindings), Ok(value));
    }

    #[test]
    fn integer_arithmetic_matches_native(
        a in -10_000i64..10_000,
        b in -10_000i64..10_000,
        c in -10_000i64..10_000,
    ) {
        let bindings = BTreeMap::from([
            ("a".to_string(), Value::from(a)),
            ("b".to_string(), Value::from(b)),
            ("c".to_string(), Value::from(c)),
        ]);
        prop_assert_eq!(evaluate("a+b*c", &bindings), Ok(Value::from(a + b * c)));
        prop_assert_eq!(evaluate("(a-b)*c", &bindings), Ok(Value::from((a - b) * c)));
        prop_assert_eq!(evaluate("a<b", &bindings), Ok(Value::Bool(a < b)));
        prop_assert_eq!(evaluate("a<=b<=c", &bindings), Ok(Value::Bool(a <= b && b <= c)));
        if c != 0 {
            // floored: the remainder takes the divisor's sign
            let floored = ((a % c) + c) % c;
            prop_assert_eq!(evaluate("a%c", &bindings), Ok(Value::from(floored)));
        }
    }

    #[test]
    fn whitespace_never_changes_the_result(
        a in 0i64..1000,
        b in 1i64..1000,
        pad in "[ \n\t]{0,3}",
    ) {
        let compact = format!("{a}*{b}-{b}");
        let spaced = format!("{pad}{a}{pad}*{pad}{b}{pad}-{pad}{b}{pad}");
        prop_assert_eq!(
            evaluate(&compact, &BTreeMap::new()),
            evaluate(&spaced, &BTreeMap::new())
        );
    }
}
