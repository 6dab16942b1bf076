use super::response::body::ValidationError;
use super::response::schema::SchemaError;
use super::transport::TransportError;

/// Errors that can occur when declaring or executing an API client call.
///
/// This enum covers all possible error conditions, from configuration mistakes
/// to transport failures and response validation errors. All variants implement
/// `std::error::Error` and provide detailed context for debugging.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum ApiClientError {
    /// The client domain was never configured.
    ///
    /// Raised before any network attempt when a call is executed on a client
    /// without a domain.
    #[display("Client domain is not set. Please set the domain in the client configuration.")]
    MissingDomain,

    /// The configured domain is not a usable base URL.
    ///
    /// The domain must carry an explicit `http` or `https` scheme.
    #[display(
        "Invalid URL: {domain}. Ensure you have set protocol (http/https) in the client domain."
    )]
    #[from(skip)]
    InvalidDomain {
        /// The offending domain value.
        domain: String,
    },

    /// Underlying transport failure.
    ///
    /// Surfaced to the caller unmodified, never retried.
    TransportError(TransportError),

    /// URL parsing error when constructing the request URL.
    UrlError(url::ParseError),

    /// JSON serialization error when encoding the outgoing request body.
    JsonError(serde_json::Error),

    /// Query parameter serialization error.
    ///
    /// Occurs when converting outgoing parameters to a URL query string.
    QuerySerializationError(serde_urlencoded::ser::Error),

    /// A query parameter value cannot be represented in a query string.
    ///
    /// Objects and arrays are not supported as query parameter values.
    #[display(
        "Unsupported query parameter value for '{name}': objects and arrays are not supported. Got: {value}"
    )]
    #[from(skip)]
    UnsupportedQueryParameterValue {
        /// The parameter name.
        name: String,
        /// The unsupported value that was provided.
        value: serde_json::Value,
    },

    /// The response body is not valid JSON.
    #[display("Invalid JSON format: {message}. Body: {snippet:?}")]
    #[from(skip)]
    ParseError {
        /// The underlying JSON parser message.
        message: String,
        /// The offending body, truncated for diagnostics.
        snippet: String,
    },

    /// The response status has no declared response on the dispatched node.
    ///
    /// This indicates a declaration gap: the API answered with a status the
    /// client never described.
    #[display("{path} returns {status}, but it is not defined in the client")]
    #[from(skip)]
    UnhandledStatus {
        /// The dispatched URL.
        path: String,
        /// The observed HTTP status code.
        status: u16,
    },

    /// Structural validation of the response body failed.
    ValidationError(ValidationError),

    /// The declared schema itself is malformed.
    ///
    /// This is a declaration-time logic error, distinct from a response that
    /// fails validation.
    SchemaError(SchemaError),

    /// A declared-optional, actually-absent field was read without a presence
    /// check.
    #[display(
        "Optional field '{field}' is not present in the response body. Use `contains(\"{field}\")` to check its presence."
    )]
    #[from(skip)]
    MissingAttribute {
        /// The absent field name.
        field: String,
    },

    /// A path segment lookup failed.
    #[display("Path '{route}' has no child segment named '{segment}'")]
    #[from(skip)]
    UnknownPath {
        /// The requested child segment name.
        segment: String,
        /// The route of the node the lookup started from.
        route: String,
    },

    /// No dispatch alias is registered under the given name.
    #[display("No alias '{name}' is declared in the client")]
    #[from(skip)]
    UnknownAlias {
        /// The requested alias.
        name: String,
    },

    /// A parameterized segment was executed without a bound value.
    #[display("Path '{route}' is missing its parameter value; bind it with `with(value)`")]
    #[from(skip)]
    MissingPathParameter {
        /// The route of the parameterized node.
        route: String,
    },

    /// A value was bound onto a segment that is not parameterized.
    #[display("Path '{route}' is not parameterized and cannot take a value")]
    #[from(skip)]
    UnexpectedPathParameter {
        /// The route of the node.
        route: String,
    },

    /// A node with child segments was executed directly.
    #[display("Path '{route}' has child segments and cannot be executed directly")]
    #[from(skip)]
    NotALeaf {
        /// The route of the node.
        route: String,
    },
}
