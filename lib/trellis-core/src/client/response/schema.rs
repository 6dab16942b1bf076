use indexmap::IndexMap;
use serde_json::Value;

/// Errors raised while turning a schema declaration into a [`Schema`].
///
/// These are declaration-time logic errors in the client definition itself,
/// never a property of a response body.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum SchemaError {
    /// The declaration uses a type tag outside the supported vocabulary.
    #[display("Unknown type tag '{tag}' for field '{field}'")]
    UnknownTypeTag {
        /// The field carrying the bad tag.
        field: String,
        /// The unrecognized tag.
        tag: String,
    },

    /// An array rule must contain exactly one element rule.
    #[display("Array rule for field '{field}' must contain exactly one element rule, got {count}")]
    InvalidArrayRule {
        /// The field carrying the bad rule.
        field: String,
        /// The number of elements found.
        count: usize,
    },

    /// The declaration is not one of the supported rule forms.
    #[display("Unsupported rule declaration for field '{field}': {detail}")]
    InvalidRule {
        /// The field carrying the bad rule.
        field: String,
        /// What made the declaration unusable.
        detail: String,
    },

    /// The top-level declaration is not a mapping.
    #[display("A schema declaration must be a JSON object, got {got}")]
    NotAnObject {
        /// The JSON kind that was found instead.
        got: String,
    },
}

/// Primitive type tags a field rule can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A JSON string.
    String,
    /// A JSON integer (floats do not qualify).
    Integer,
    /// A JSON boolean; `true` and `false` are accepted interchangeably.
    Boolean,
    /// Any JSON array, elements unchecked.
    Array,
    /// Any JSON object, fields unchecked.
    Object,
}

impl FieldType {
    fn parse(field: &str, tag: &str) -> Result<Self, SchemaError> {
        match tag {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            _ => Err(SchemaError::UnknownTypeTag {
                field: field.to_string(),
                tag: tag.to_string(),
            }),
        }
    }

    /// The declaration tag for this type.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Checks a runtime JSON value against this type tag.
    pub(crate) fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}

/// The rule an array element is checked against.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementRule {
    /// Each element must match the primitive type tag.
    Type(FieldType),
    /// Each element is an object checked against the nested schema.
    Nested(Schema),
}

/// One field rule of a structural schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    /// Field must be present and match the type tag.
    Type(FieldType),
    /// Field may be absent; when present it must match the type tag.
    Optional(FieldType),
    /// Field may be absent or blank-like; otherwise it must match the type tag.
    AllowBlank(FieldType),
    /// Field holds an object checked against a nested schema.
    ///
    /// An absent or null field skips the recursion entirely.
    Nested(Schema),
    /// Field must be present and hold an array of conforming elements.
    ArrayOf(ElementRule),
}

/// A declared structural schema: an ordered mapping from field name to rule.
///
/// A schema is declared once, at client-definition time, and reused read-only
/// for every validation. The most convenient way to declare one is
/// [`Schema::parse`] with a `serde_json::json!` literal:
///
/// ```rust
/// use serde_json::json;
/// use trellis_core::Schema;
///
/// let schema = Schema::parse(json!({
///     "name": "string",
///     "day": {"type": "integer", "optional": true},
///     "tags": ["string"],
///     "birthdate": {
///         "day": {"type": "integer", "optional": true},
///         "month": {"type": "integer", "optional": true},
///     },
/// }))?;
/// # Ok::<(), trellis_core::SchemaError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: IndexMap<String, FieldRule>,
}

impl Schema {
    /// Creates an empty schema (accepts any object).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field rule, replacing any previous rule for the same name.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    /// Parses a JSON schema declaration into a typed schema.
    ///
    /// Supported rule forms per field:
    /// - a type tag string: `"string"`, `"integer"`, `"boolean"`, `"array"`,
    ///   `"object"`
    /// - `{"type": tag, "optional": true}` — field may be absent
    /// - `{"type": tag, "allow_blank": true}` — field may be absent or blank
    /// - a nested mapping without a `"type"` entry — recursive schema
    /// - a one-element array of a tag or mapping — array-of rule
    ///
    /// # Errors
    ///
    /// Any other shape fails with a [`SchemaError`] naming the offending
    /// field; a malformed declaration is never silently ignored.
    pub fn parse(declaration: Value) -> Result<Self, SchemaError> {
        let Value::Object(mapping) = declaration else {
            return Err(SchemaError::NotAnObject {
                got: json_kind(&declaration).to_string(),
            });
        };

        let mut fields = IndexMap::with_capacity(mapping.len());
        for (name, rule) in mapping {
            let rule = Self::parse_rule(&name, rule)?;
            fields.insert(name, rule);
        }
        Ok(Self { fields })
    }

    fn parse_rule(field: &str, declaration: Value) -> Result<FieldRule, SchemaError> {
        match declaration {
            Value::String(tag) => Ok(FieldRule::Type(FieldType::parse(field, &tag)?)),
            Value::Object(mapping) => Self::parse_mapping_rule(field, mapping),
            Value::Array(mut elements) => {
                if elements.len() != 1 {
                    return Err(SchemaError::InvalidArrayRule {
                        field: field.to_string(),
                        count: elements.len(),
                    });
                }
                let element = elements.remove(0);
                let element = match element {
                    Value::String(tag) => ElementRule::Type(FieldType::parse(field, &tag)?),
                    Value::Object(_) => ElementRule::Nested(Self::parse(element)?),
                    other => {
                        return Err(SchemaError::InvalidRule {
                            field: field.to_string(),
                            detail: format!(
                                "array element rule must be a type tag or a mapping, got {}",
                                json_kind(&other)
                            ),
                        });
                    }
                };
                Ok(FieldRule::ArrayOf(element))
            }
            other => Err(SchemaError::InvalidRule {
                field: field.to_string(),
                detail: format!("expected a type tag, mapping, or array rule, got {}", json_kind(&other)),
            }),
        }
    }

    fn parse_mapping_rule(
        field: &str,
        mapping: serde_json::Map<String, Value>,
    ) -> Result<FieldRule, SchemaError> {
        // A mapping without a "type" entry is a nested schema.
        if !mapping.contains_key("type") {
            return Ok(FieldRule::Nested(Self::parse(Value::Object(mapping))?));
        }

        let field_type = match mapping.get("type") {
            Some(Value::String(tag)) => FieldType::parse(field, tag)?,
            other => {
                return Err(SchemaError::InvalidRule {
                    field: field.to_string(),
                    detail: format!(
                        "'type' must be a type tag string, got {}",
                        other.map_or("nothing", json_kind)
                    ),
                });
            }
        };

        let optional = mapping.get("optional").and_then(Value::as_bool).unwrap_or(false);
        let allow_blank = mapping
            .get("allow_blank")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        match (optional, allow_blank) {
            (true, true) => Err(SchemaError::InvalidRule {
                field: field.to_string(),
                detail: "'optional' and 'allow_blank' cannot be combined".to_string(),
            }),
            (true, false) => Ok(FieldRule::Optional(field_type)),
            (false, true) => Ok(FieldRule::AllowBlank(field_type)),
            (false, false) => Ok(FieldRule::Type(field_type)),
        }
    }

    /// True when the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterates over the declared field rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(name, rule)| (name.as_str(), rule))
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) => {
            if number.is_f64() {
                "number"
            } else {
                "integer"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
