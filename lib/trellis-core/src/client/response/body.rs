use cruet::Inflector;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::super::error::ApiClientError;
use super::object::ResponseObject;
use super::schema::{ElementRule, FieldRule, FieldType, Schema, json_kind};
use super::CallOutcome;

const SNIPPET_MAX_LENGTH: usize = 256;

/// Structural validation failures for a response body.
///
/// Each variant names the offending field, the expected type, and what was
/// actually found, so a failing response can be diagnosed from the error
/// alone.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum ValidationError {
    /// A required field is absent from the response body.
    #[display("Missing field '{field}' in response body. Body: {body}")]
    MissingField {
        /// The absent field.
        field: String,
        /// The declared type.
        expected: String,
        /// The body the field was looked up in.
        body: String,
    },

    /// A field is present with a value of the wrong type.
    #[display(
        "Field '{field}' expected to be of type '{expected}', but got '{actual_type}' with value '{actual}'"
    )]
    TypeMismatch {
        /// The offending field, indexed for array elements.
        field: String,
        /// The declared type.
        expected: String,
        /// The runtime JSON kind of the value.
        actual_type: String,
        /// The value itself.
        actual: String,
    },

    /// An array-of field is absent from the response body.
    #[display(
        "Expected an array for field '{field}' in response body; declare it with `allow_blank` if an absent value is acceptable"
    )]
    MissingArray {
        /// The absent field.
        field: String,
    },
}

/// Validates a raw response body against a declared schema and materializes
/// the conforming value.
///
/// The body is parsed as JSON, its mapping keys are normalized to snake case
/// (recursively, arrays of objects included), the normalized value is checked
/// field by field against the schema, and the result is materialized into
/// [`ResponseObject`]s. A bare top-level integer bypasses the structural check
/// entirely and is returned unchanged.
pub(crate) fn validate(schema: &Schema, raw_body: &str) -> Result<CallOutcome, ApiClientError> {
    let parsed: Value =
        serde_json::from_str(raw_body).map_err(|error| ApiClientError::ParseError {
            message: error.to_string(),
            snippet: snippet(raw_body),
        })?;

    if let Value::Number(ref number) = parsed {
        if let Some(integer) = number.as_i64() {
            return Ok(CallOutcome::Integer(integer));
        }
    }

    match normalize_keys(parsed) {
        Value::Object(object) => {
            check_structure(&object, schema)?;
            Ok(CallOutcome::Object(materialize(object)))
        }
        Value::Array(items) => {
            let mut objects = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(object) => {
                        check_structure(&object, schema)?;
                        objects.push(materialize(object));
                    }
                    other => {
                        return Err(type_mismatch(&format!("$[{index}]"), "object", &other).into());
                    }
                }
            }
            Ok(CallOutcome::Array(objects))
        }
        other => Err(type_mismatch("$", "object", &other).into()),
    }
}

/// Recursively rewrites mapping keys from the wire casing to snake case.
fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| (key.to_snake_case(), normalize_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn check_structure(object: &Map<String, Value>, schema: &Schema) -> Result<(), ValidationError> {
    for (field, rule) in schema.iter() {
        match rule {
            FieldRule::Type(field_type) => check_type(object, field, *field_type)?,
            FieldRule::Optional(field_type) => {
                if object.contains_key(field) {
                    check_type(object, field, *field_type)?;
                }
            }
            FieldRule::AllowBlank(field_type) => match object.get(field) {
                None => {}
                Some(value) if is_blank(value) => {}
                Some(_) => check_type(object, field, *field_type)?,
            },
            FieldRule::Nested(nested) => match object.get(field) {
                // An omitted or null nested object is acceptable; recursion
                // only happens into a present value.
                None | Some(Value::Null) => {}
                Some(Value::Object(inner)) => check_structure(inner, nested)?,
                Some(value) => return Err(type_mismatch(field, "object", value)),
            },
            FieldRule::ArrayOf(element) => match object.get(field) {
                None => {
                    return Err(ValidationError::MissingArray {
                        field: field.to_string(),
                    });
                }
                Some(Value::Array(items)) => check_elements(field, items, element)?,
                Some(value) => return Err(type_mismatch(field, "array", value)),
            },
        }
    }
    Ok(())
}

fn check_elements(
    field: &str,
    items: &[Value],
    element: &ElementRule,
) -> Result<(), ValidationError> {
    for (index, item) in items.iter().enumerate() {
        match element {
            ElementRule::Type(field_type) => {
                if !field_type.matches(item) {
                    return Err(type_mismatch(
                        &format!("{field}[{index}]"),
                        field_type.name(),
                        item,
                    ));
                }
            }
            ElementRule::Nested(nested) => {
                let Value::Object(inner) = item else {
                    return Err(type_mismatch(&format!("{field}[{index}]"), "object", item));
                };
                check_structure(inner, nested)?;
            }
        }
    }
    Ok(())
}

fn check_type(
    object: &Map<String, Value>,
    field: &str,
    field_type: FieldType,
) -> Result<(), ValidationError> {
    let Some(value) = object.get(field) else {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
            expected: field_type.name().to_string(),
            body: snippet(&Value::Object(object.clone()).to_string()),
        });
    };

    if field_type.matches(value) {
        Ok(())
    } else {
        Err(type_mismatch(field, field_type.name(), value))
    }
}

fn type_mismatch(field: &str, expected: &str, actual: &Value) -> ValidationError {
    ValidationError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        actual_type: json_kind(actual).to_string(),
        actual: snippet(&actual.to_string()),
    }
}

/// Blank-like values: null, false, empty or whitespace-only strings, empty
/// arrays, empty objects.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(object) => object.is_empty(),
        Value::Number(_) => false,
    }
}

fn materialize(object: Map<String, Value>) -> ResponseObject {
    ResponseObject::new(object.into_iter().collect::<IndexMap<_, _>>())
}

fn snippet(body: &str) -> String {
    if body.len() <= SNIPPET_MAX_LENGTH {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(SNIPPET_MAX_LENGTH).collect();
        format!("{truncated}... (truncated)")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn schema(declaration: Value) -> Schema {
        Schema::parse(declaration).unwrap()
    }

    fn validation_error(result: Result<CallOutcome, ApiClientError>) -> ValidationError {
        match result.unwrap_err() {
            ApiClientError::ValidationError(error) => error,
            other => panic!("expected a validation error, got {other}"),
        }
    }

    #[test]
    fn test_accepts_conforming_object() {
        let schema = schema(json!({"name": "string", "count": "integer", "active": "boolean"}));
        let body = json!({"name": "John", "count": 3, "active": false}).to_string();

        let outcome = validate(&schema, &body).unwrap();

        let CallOutcome::Object(object) = outcome else {
            panic!("expected an object outcome");
        };
        assert_eq!(object.attribute("name").unwrap(), &json!("John"));
        assert_eq!(object.attribute("count").unwrap(), &json!(3));
    }

    #[rstest]
    #[case::string_field("name", json!({"count": 1}))]
    #[case::integer_field("count", json!({"name": "John"}))]
    fn test_missing_required_field(#[case] field: &str, #[case] body: Value) {
        let schema = schema(json!({"name": "string", "count": "integer"}));

        let error = validation_error(validate(&schema, &body.to_string()));

        assert!(matches!(error, ValidationError::MissingField { field: ref f, .. } if f == field));
    }

    #[rstest]
    #[case::string_vs_integer("string", json!(42))]
    #[case::string_vs_boolean("string", json!(true))]
    #[case::integer_vs_string("integer", json!("42"))]
    #[case::integer_vs_float("integer", json!(4.2))]
    #[case::boolean_vs_string("boolean", json!("true"))]
    #[case::array_vs_object("array", json!({}))]
    #[case::object_vs_array("object", json!([]))]
    fn test_type_mismatch(#[case] declared: &str, #[case] value: Value) {
        let schema = schema(json!({"field": declared}));
        let body = json!({"field": value}).to_string();

        let error = validation_error(validate(&schema, &body));

        assert!(
            matches!(error, ValidationError::TypeMismatch { ref field, ref expected, .. }
                if field == "field" && expected == declared)
        );
    }

    #[rstest]
    #[case::true_value(true)]
    #[case::false_value(false)]
    fn test_boolean_accepts_both_literals(#[case] literal: bool) {
        let schema = schema(json!({"flag": "boolean"}));
        let body = json!({"flag": literal}).to_string();

        assert!(validate(&schema, &body).is_ok());
    }

    #[test]
    fn test_optional_field_may_be_absent() {
        let schema = schema(json!({"name": "string", "day": {"type": "integer", "optional": true}}));
        let body = json!({"name": "John"}).to_string();

        let outcome = validate(&schema, &body).unwrap();

        let CallOutcome::Object(object) = outcome else {
            panic!("expected an object outcome");
        };
        assert!(!object.contains("day"));
    }

    #[test]
    fn test_optional_field_present_is_still_type_checked() {
        let schema = schema(json!({"day": {"type": "integer", "optional": true}}));
        let body = json!({"day": "fifteen"}).to_string();

        let error = validation_error(validate(&schema, &body));

        assert!(matches!(error, ValidationError::TypeMismatch { ref field, .. } if field == "day"));
    }

    #[rstest]
    #[case::null(json!(null))]
    #[case::empty_string(json!(""))]
    #[case::whitespace(json!("   "))]
    #[case::empty_array(json!([]))]
    #[case::empty_object(json!({}))]
    fn test_allow_blank_accepts_blank_values(#[case] blank: Value) {
        let schema = schema(json!({"note": {"type": "integer", "allow_blank": true}}));
        let body = json!({"note": blank}).to_string();

        assert!(validate(&schema, &body).is_ok());
    }

    #[test]
    fn test_allow_blank_accepts_absence_but_checks_present_values() {
        let schema = schema(json!({"note": {"type": "string", "allow_blank": true}}));

        assert!(validate(&schema, &json!({}).to_string()).is_ok());
        assert!(validate(&schema, &json!({"note": "hi"}).to_string()).is_ok());

        let error = validation_error(validate(&schema, &json!({"note": 42}).to_string()));
        assert!(matches!(error, ValidationError::TypeMismatch { ref field, .. } if field == "note"));
    }

    #[test]
    fn test_nested_schema_recursion_skips_absent_and_null() {
        let schema = schema(json!({
            "name": "string",
            "birthdate": {"day": "integer", "month": "integer"},
        }));

        assert!(validate(&schema, &json!({"name": "John"}).to_string()).is_ok());
        assert!(validate(&schema, &json!({"name": "John", "birthdate": null}).to_string()).is_ok());
    }

    #[test]
    fn test_nested_schema_checks_present_values() {
        let schema = schema(json!({"birthdate": {"day": "integer"}}));

        let body = json!({"birthdate": {"day": "monday"}}).to_string();
        let error = validation_error(validate(&schema, &body));
        assert!(matches!(error, ValidationError::TypeMismatch { ref field, .. } if field == "day"));

        let body = json!({"birthdate": "1990-01-01"}).to_string();
        let error = validation_error(validate(&schema, &body));
        assert!(
            matches!(error, ValidationError::TypeMismatch { ref field, ref expected, .. }
                if field == "birthdate" && expected == "object")
        );
    }

    #[test]
    fn test_missing_array_field_is_never_treated_as_empty() {
        let schema = schema(json!({"tags": ["string"]}));
        let body = json!({}).to_string();

        let error = validation_error(validate(&schema, &body));

        assert_eq!(
            error,
            ValidationError::MissingArray {
                field: "tags".to_string(),
            }
        );
        assert!(error.to_string().contains("allow_blank"));
    }

    #[test]
    fn test_array_of_scalars_checks_each_element() {
        let schema = schema(json!({"tags": ["string"]}));

        assert!(validate(&schema, &json!({"tags": ["a", "b"]}).to_string()).is_ok());
        assert!(validate(&schema, &json!({"tags": []}).to_string()).is_ok());

        let error = validation_error(validate(&schema, &json!({"tags": ["a", 2]}).to_string()));
        assert!(
            matches!(error, ValidationError::TypeMismatch { ref field, .. } if field == "tags[1]")
        );
    }

    #[test]
    fn test_array_of_objects_recurses_into_each_element() {
        let schema = schema(json!({"items": [{"id": "integer"}]}));

        let body = json!({"items": [{"id": 1}, {"id": 2}]}).to_string();
        assert!(validate(&schema, &body).is_ok());

        let body = json!({"items": [{"id": 1}, {"id": "two"}]}).to_string();
        let error = validation_error(validate(&schema, &body));
        assert!(matches!(error, ValidationError::TypeMismatch { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_bare_integer_body_bypasses_validation() {
        let schema = schema(json!({"name": "string"}));

        let outcome = validate(&schema, "42").unwrap();

        assert_eq!(outcome, CallOutcome::Integer(42));
    }

    #[test]
    fn test_top_level_array_maps_each_element() {
        let schema = schema(json!({"id": "integer"}));
        let body = json!([{"id": 1}, {"id": 2}]).to_string();

        let outcome = validate(&schema, &body).unwrap();

        let CallOutcome::Array(objects) = outcome else {
            panic!("expected an array outcome");
        };
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1].attribute("id").unwrap(), &json!(2));
    }

    #[test]
    fn test_wire_keys_are_normalized_to_snake_case() {
        let schema = schema(json!({
            "provider_id": "string",
            "primary_locale": {"country_code": "string"},
        }));
        let body = json!({
            "providerId": "abc",
            "primaryLocale": {"countryCode": "FR"},
        })
        .to_string();

        let outcome = validate(&schema, &body).unwrap();

        let CallOutcome::Object(object) = outcome else {
            panic!("expected an object outcome");
        };
        assert!(object.contains("provider_id"));
        assert!(!object.contains("providerId"));
    }

    #[test]
    fn test_key_normalization_reaches_arrays_of_objects() {
        let schema = schema(json!({"items": [{"item_id": "integer"}]}));
        let body = json!({"items": [{"itemId": 1}]}).to_string();

        assert!(validate(&schema, &body).is_ok());
    }

    #[test]
    fn test_malformed_json_fails_with_parse_error() {
        let schema = Schema::new();

        let error = validate(&schema, "{not json").unwrap_err();

        let ApiClientError::ParseError { snippet, .. } = error else {
            panic!("expected a parse error, got {error}");
        };
        assert_eq!(snippet, "{not json");
    }

    #[test]
    fn test_scalar_top_level_body_is_rejected() {
        let schema = Schema::new();

        let error = validation_error(validate(&schema, "\"hello\""));

        assert!(matches!(error, ValidationError::TypeMismatch { ref field, .. } if field == "$"));
    }

    #[test]
    fn test_empty_schema_accepts_any_object() {
        let schema = Schema::new();
        let body = json!({"anything": {"goes": true}}).to_string();

        assert!(validate(&schema, &body).is_ok());
    }
}
