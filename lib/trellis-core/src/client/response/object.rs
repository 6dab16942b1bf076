use indexmap::IndexMap;
use serde_json::Value;

use super::super::error::ApiClientError;

/// A materialized, presence-aware view over a validated response body.
///
/// One instance is produced per successful validation (never reused between
/// responses). Field access is presence-checked: reading a declared-optional
/// field that the response omitted is a programming error, distinct from the
/// field being present with a `null` value. Check [`contains`](Self::contains)
/// first, or use the infallible [`get`](Self::get).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseObject {
    attributes: IndexMap<String, Value>,
}

impl ResponseObject {
    pub(crate) fn new(attributes: IndexMap<String, Value>) -> Self {
        Self { attributes }
    }

    /// Reads a field value.
    ///
    /// # Errors
    ///
    /// Fails when the field is absent from the response, naming the field and
    /// suggesting the presence check.
    pub fn attribute(&self, name: &str) -> Result<&Value, ApiClientError> {
        self.attributes
            .get(name)
            .ok_or_else(|| ApiClientError::MissingAttribute {
                field: name.to_string(),
            })
    }

    /// Reads a field value, `None` when absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// True when the field is present among the attributes.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// The full attribute mapping, in response order.
    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    /// The number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when the object carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl std::fmt::Display for ResponseObject {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = Value::Object(
            self.attributes
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        );
        write!(formatter, "{rendered}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(entries: &[(&str, Value)]) -> ResponseObject {
        ResponseObject::new(
            entries
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_contains_is_false_for_missing_field() {
        let response = object(&[("name", json!("John"))]);

        assert!(!response.contains("day"));
        assert!(response.contains("name"));
    }

    #[test]
    fn test_accessing_missing_field_fails_with_presence_hint() {
        let response = object(&[("name", json!("John"))]);

        let error = response.attribute("day").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Optional field 'day' is not present in the response body. Use `contains(\"day\")` to check its presence."
        );
    }

    #[test]
    fn test_present_field_is_accessible() {
        let response = object(&[("name", json!("John")), ("day", json!(15))]);

        assert_eq!(response.attribute("day").unwrap(), &json!(15));
        assert!(response.contains("day"));
    }

    #[test]
    fn test_present_null_is_not_absent() {
        let response = object(&[("day", Value::Null)]);

        assert!(response.contains("day"));
        assert_eq!(response.attribute("day").unwrap(), &Value::Null);
    }

    #[test]
    fn test_display_renders_attributes() {
        let response = object(&[("name", json!("John"))]);
        assert_eq!(response.to_string(), r#"{"name":"John"}"#);
    }
}
