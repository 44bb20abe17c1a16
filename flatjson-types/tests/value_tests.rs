use flatjson_types::{PropertyType, PropertyValue};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::str::FromStr;

// ── PropertyType ─────────────────────────────────────────────────

#[test]
fn property_type_roundtrips_through_str() {
    for ty in [
        PropertyType::String,
        PropertyType::Number,
        PropertyType::Boolean,
        PropertyType::Object,
        PropertyType::Array,
        PropertyType::Null,
        PropertyType::Custom,
    ] {
        assert_eq!(PropertyType::from_str(ty.as_str()).unwrap(), ty);
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, format!("\"{ty}\""));
    }
}

#[test]
fn property_type_rejects_unknown() {
    assert!(PropertyType::from_str("integer").is_err());
}

// ── Strict parse ─────────────────────────────────────────────────

#[test]
fn parse_number_keeps_integers() {
    let v = PropertyValue::parse(PropertyType::Number, "42").unwrap();
    assert_eq!(v.to_json(), json!(42));
    assert_eq!(v.to_stored_text(), "42");
}

#[test]
fn parse_number_float() {
    let v = PropertyValue::parse(PropertyType::Number, "9.99").unwrap();
    assert_eq!(v.to_json(), json!(9.99));
}

#[test]
fn parse_number_rejects_garbage() {
    assert!(PropertyValue::parse(PropertyType::Number, "abc").is_err());
    assert!(PropertyValue::parse(PropertyType::Number, "NaN").is_err());
}

#[test]
fn parse_boolean_is_strict() {
    assert_eq!(
        PropertyValue::parse(PropertyType::Boolean, "true").unwrap(),
        PropertyValue::Bool(true)
    );
    assert_eq!(
        PropertyValue::parse(PropertyType::Boolean, "false").unwrap(),
        PropertyValue::Bool(false)
    );
    assert!(PropertyValue::parse(PropertyType::Boolean, "yes").is_err());
}

#[test]
fn parse_object_requires_object() {
    let v = PropertyValue::parse(PropertyType::Object, r#"{"a":1}"#).unwrap();
    assert_eq!(v.property_type(), PropertyType::Object);
    assert!(PropertyValue::parse(PropertyType::Object, "[1,2]").is_err());
    assert!(PropertyValue::parse(PropertyType::Object, "{oops").is_err());
}

#[test]
fn parse_array_requires_array() {
    let v = PropertyValue::parse(PropertyType::Array, "[1,2]").unwrap();
    assert_eq!(v.property_type(), PropertyType::Array);
    assert!(PropertyValue::parse(PropertyType::Array, "{}").is_err());
}

#[test]
fn parse_string_and_custom_keep_text() {
    assert_eq!(
        PropertyValue::parse(PropertyType::String, "dark").unwrap(),
        PropertyValue::string("dark")
    );
    assert_eq!(
        PropertyValue::parse(PropertyType::Custom, "#ff0000").unwrap(),
        PropertyValue::custom("#ff0000")
    );
}

// ── Lenient coerce ───────────────────────────────────────────────

#[test]
fn coerce_boolean_compares_with_true() {
    assert_eq!(PropertyValue::coerce(PropertyType::Boolean, "true").unwrap(), json!(true));
    assert_eq!(PropertyValue::coerce(PropertyType::Boolean, "TRUE").unwrap(), json!(false));
    assert_eq!(PropertyValue::coerce(PropertyType::Boolean, "1").unwrap(), json!(false));
}

#[test]
fn coerce_object_accepts_any_json() {
    assert_eq!(PropertyValue::coerce(PropertyType::Object, "[1]").unwrap(), json!([1]));
}

#[test]
fn coerce_null_ignores_text() {
    assert_eq!(PropertyValue::coerce(PropertyType::Null, "whatever").unwrap(), json!(null));
}

#[test]
fn coerce_reports_failures() {
    assert!(PropertyValue::coerce(PropertyType::Number, "twelve").is_err());
    assert!(PropertyValue::coerce(PropertyType::Array, "[1,").is_err());
}

// ── Constructors ─────────────────────────────────────────────────

#[test]
fn from_json_maps_each_kind() {
    assert_eq!(PropertyValue::from_json(&json!(null)), PropertyValue::Null);
    assert_eq!(PropertyValue::from_json(&json!("x")), PropertyValue::string("x"));
    assert_eq!(PropertyValue::from_json(&json!(true)), PropertyValue::Bool(true));
    assert_eq!(PropertyValue::from_json(&json!(7)), PropertyValue::integer(7));
    assert_eq!(
        PropertyValue::from_json(&json!([])).property_type(),
        PropertyType::Array
    );
}

#[test]
fn number_rejects_non_finite() {
    assert!(PropertyValue::number(f64::NAN).is_none());
    assert!(PropertyValue::number(f64::INFINITY).is_none());
    assert!(PropertyValue::number(1.5).is_some());
}

#[test]
fn stored_text_of_null_and_json() {
    assert_eq!(PropertyValue::Null.to_stored_text(), "null");
    assert_eq!(PropertyValue::json(json!({"a": [1, 2]})).to_stored_text(), r#"{"a":[1,2]}"#);
}
