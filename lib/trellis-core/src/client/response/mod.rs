use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;

use super::error::ApiClientError;
use super::params::CallArgs;

pub(crate) mod body;
pub use self::body::ValidationError;

mod object;
pub use self::object::ResponseObject;

pub(crate) mod schema;
pub use self::schema::{ElementRule, FieldRule, FieldType, Schema, SchemaError};

/// The final value of an executed call.
///
/// Validation materializes `Object`/`Array`/`Integer`; the pass-through and
/// empty body modes produce `Raw` and `Empty`; a transform may replace any of
/// these with an arbitrary `Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// A validated response object.
    Object(ResponseObject),
    /// A validated top-level array of response objects.
    Array(Vec<ResponseObject>),
    /// A bare integer response body, returned unchanged.
    Integer(i64),
    /// The raw response body of a pass-through response.
    Raw(String),
    /// An empty result, produced regardless of the body content.
    Empty,
    /// A transform-produced value.
    Value(Value),
}

impl CallOutcome {
    /// A transform-produced string marker, convenient for mapping API answers
    /// onto domain outcomes.
    pub fn sentinel(tag: impl Into<String>) -> Self {
        Self::Value(Value::String(tag.into()))
    }

    /// The validated object, when the outcome is a single object.
    pub fn as_object(&self) -> Option<&ResponseObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The validated objects, when the outcome is an array.
    pub fn as_array(&self) -> Option<&[ResponseObject]> {
        match self {
            Self::Array(objects) => Some(objects),
            _ => None,
        }
    }

    /// The raw body, when the outcome is a pass-through.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(body) => Some(body),
            _ => None,
        }
    }

    /// The transform-produced value, when there is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// True for the empty outcome.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// How a declared response treats the body it receives.
#[derive(Debug, Clone)]
pub enum BodyMode {
    /// Validate the body against a structural schema and materialize it.
    Structured(Schema),
    /// Hand the raw body back unmodified.
    PassThrough,
    /// Ignore the body entirely and produce an empty result.
    Empty,
}

type Transform =
    Arc<dyn Fn(CallOutcome, &CallArgs) -> Result<CallOutcome, ApiClientError> + Send + Sync>;

/// One declared response: a status code paired with a body mode and an
/// optional transform.
///
/// Status codes are unique within their owning path node; the transform, when
/// present, receives the materialized result and the call-site arguments and
/// produces the call's final value.
///
/// ```rust
/// use serde_json::json;
/// use trellis_core::{CallOutcome, ResponseSpec, Schema, StatusCode};
///
/// let schema = Schema::parse(json!({"object": "string", "invitation_id": "string"}))?;
/// let spec = ResponseSpec::structured(StatusCode::CREATED, schema)
///     .with_transform(|outcome, _args| {
///         let sent = outcome
///             .as_object()
///             .and_then(|object| object.get("object"))
///             .is_some_and(|value| value == "UserInvitationSent");
///         Ok(CallOutcome::sentinel(if sent { "sent" } else { "not_sent" }))
///     });
/// # Ok::<(), trellis_core::SchemaError>(())
/// ```
#[derive(Clone)]
pub struct ResponseSpec {
    status: StatusCode,
    body: BodyMode,
    transform: Option<Transform>,
}

impl ResponseSpec {
    /// Declares a response whose body is validated against `schema`.
    pub fn structured(status: StatusCode, schema: Schema) -> Self {
        Self {
            status,
            body: BodyMode::Structured(schema),
            transform: None,
        }
    }

    /// Declares a response whose raw body is handed back unmodified.
    pub fn passthrough(status: StatusCode) -> Self {
        Self {
            status,
            body: BodyMode::PassThrough,
            transform: None,
        }
    }

    /// Declares a response whose body is ignored.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: BodyMode::Empty,
            transform: None,
        }
    }

    /// Attaches a transform run on the materialized result.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: impl Fn(CallOutcome, &CallArgs) -> Result<CallOutcome, ApiClientError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// The status code this response is declared for.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Runs the body mode and transform against a received body.
    pub(crate) fn apply(
        &self,
        raw_body: &str,
        args: &CallArgs,
    ) -> Result<CallOutcome, ApiClientError> {
        let outcome = match &self.body {
            BodyMode::Structured(schema) => body::validate(schema, raw_body)?,
            BodyMode::PassThrough => CallOutcome::Raw(raw_body.to_string()),
            BodyMode::Empty => CallOutcome::Empty,
        };

        match &self.transform {
            Some(transform) => transform(outcome, args),
            None => Ok(outcome),
        }
    }
}

impl fmt::Debug for ResponseSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResponseSpec")
            .field("status", &self.status)
            .field("body", &self.body)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
