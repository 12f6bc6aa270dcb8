// SPDX-License-Identifier: MIT

use super::*;
use proptest::prelude::*;
use serde_json::json;

fn vars(pairs: &[(&str, &str)]) -> Variables {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

// =============================================================================
// process tests
// =============================================================================

#[test]
fn no_braces_passes_through() {
    assert_eq!(process("plain text", &vars(&[])).unwrap(), "plain text");
}

#[test]
fn simple_substitution() {
    let v = vars(&[("ext", "png")]);
    assert_eq!(process("x.{ext}", &v).unwrap(), "x.png");
}

#[test]
fn multiple_substitutions() {
    let v = vars(&[("a", "1"), ("b", "2")]);
    assert_eq!(process("{a}+{b}={a}{b}", &v).unwrap(), "1+2=12");
}

#[test]
fn nested_braces_resolve_innermost_first() {
    let v = vars(&[("b", "x"), ("axc", "deep")]);
    assert_eq!(process("{a{b}c}", &v).unwrap(), "deep");
}

#[test]
fn chained_indirection() {
    let v = vars(&[("a", "v"), ("b", "{a}")]);
    assert_eq!(process("{b}", &v).unwrap(), "v");
}

#[test]
fn unknown_variable_is_fatal() {
    let err = process("{missing}", &vars(&[])).unwrap_err();
    assert!(matches!(err, InterpError::UnknownVariable { ref name, .. } if name == "missing"));
}

#[test]
fn missing_close_brace_is_fatal() {
    let err = process("oops {name", &vars(&[("name", "x")])).unwrap_err();
    assert!(matches!(err, InterpError::UnbalancedBrace(_)));
}

#[test]
fn self_referential_variable_hits_the_cap() {
    let v = vars(&[("a", "{a}")]);
    let err = process("{a}", &v).unwrap_err();
    assert!(matches!(err, InterpError::IterationCap(_)));
}

#[test]
fn mutually_recursive_variables_hit_the_cap() {
    let v = vars(&[("a", "{b}"), ("b", "{a}")]);
    let err = process("{a}", &v).unwrap_err();
    assert!(matches!(err, InterpError::IterationCap(_)));
}

#[test]
fn substituted_value_may_contain_close_brace() {
    let v = vars(&[("a", "x}y")]);
    assert_eq!(process("{a}", &v).unwrap(), "x}y");
}

proptest! {
    /// Full expansion is idempotent: once all braces are gone, a second
    /// pass is the identity.
    #[test]
    fn process_is_idempotent_after_expansion(
        key in "[a-z]{1,6}",
        val in "[a-zA-Z0-9 ._-]{0,12}",
        prefix in "[a-zA-Z0-9 ._-]{0,8}",
        suffix in "[a-zA-Z0-9 ._-]{0,8}",
    ) {
        let mut v = Variables::new();
        v.set(key.clone(), val);
        let input = format!("{prefix}{{{key}}}{suffix}");
        let once = process(&input, &v).unwrap();
        let twice = process(&once, &v).unwrap();
        prop_assert_eq!(once, twice);
    }
}

// =============================================================================
// process_json tests
// =============================================================================

#[test]
fn json_string_leaves_are_expanded() {
    let v = vars(&[("n", "5")]);
    let mut value = json!({"count": "{n}", "list": ["{n}", "{n}x"]});
    process_json(&mut value, &v).unwrap();
    assert_eq!(value, json!({"count": "5", "list": ["5", "5x"]}));
}

#[test]
fn json_non_string_leaves_untouched() {
    let v = vars(&[]);
    let mut value = json!({"num": 3, "flag": true, "nil": null});
    process_json(&mut value, &v).unwrap();
    assert_eq!(value, json!({"num": 3, "flag": true, "nil": null}));
}

#[test]
fn json_keys_are_not_expanded() {
    let v = vars(&[("k", "expanded")]);
    let mut value = json!({"{k}": "{k}"});
    process_json(&mut value, &v).unwrap();
    assert_eq!(value, json!({"{k}": "expanded"}));
}

#[test]
fn json_error_propagates_from_nested_leaf() {
    let v = vars(&[]);
    let mut value = json!({"outer": {"inner": "{missing}"}});
    assert!(process_json(&mut value, &v).is_err());
}

// =============================================================================
// adapt tests
// =============================================================================

#[test]
fn adapt_inserts_definitions_in_order() {
    let mut v = Variables::new();
    adapt(&mut v, &json!([{"a": "1"}, {"b": "2"}])).unwrap();
    assert_eq!(v.get("a"), Some("1"));
    assert_eq!(v.get("b"), Some("2"));
}

#[test]
fn adapt_interpolates_values_against_earlier_entries() {
    let mut v = Variables::new();
    adapt(&mut v, &json!([{"a": "v"}, {"b": "{a}"}])).unwrap();
    assert_eq!(v.get("b"), Some("v"));
}

#[test]
fn adapt_interpolates_keys() {
    let mut v = Variables::new();
    v.set("which", "target");
    adapt(&mut v, &json!([{"{which}": "hit"}])).unwrap();
    assert_eq!(v.get("target"), Some("hit"));
}

#[test]
fn adapt_later_entries_shadow_earlier() {
    let mut v = Variables::new();
    adapt(&mut v, &json!([{"k": "one"}, {"k": "two"}])).unwrap();
    assert_eq!(v.get("k"), Some("two"));
}

#[test]
fn adapt_is_deterministic_for_equal_environments() {
    let defs = json!([{"a": "1"}, {"b": "{a}x"}]);
    let mut v1 = vars(&[("seed", "s")]);
    let mut v2 = vars(&[("seed", "s")]);
    adapt(&mut v1, &defs).unwrap();
    adapt(&mut v2, &defs).unwrap();
    assert_eq!(v1, v2);
}

#[test]
fn adapt_rejects_non_array() {
    let mut v = Variables::new();
    assert!(matches!(adapt(&mut v, &json!({"a": "1"})), Err(InterpError::InvalidVarDef(_))));
}

#[test]
fn adapt_rejects_multi_entry_objects() {
    let mut v = Variables::new();
    assert!(matches!(
        adapt(&mut v, &json!([{"a": "1", "b": "2"}])),
        Err(InterpError::InvalidVarDef(_))
    ));
}

#[test]
fn adapt_rejects_non_string_values() {
    let mut v = Variables::new();
    assert!(matches!(adapt(&mut v, &json!([{"a": 1}])), Err(InterpError::InvalidVarDef(_))));
}
