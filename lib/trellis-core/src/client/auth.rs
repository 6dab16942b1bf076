use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::ApiClientError;

/// Secure wrapper for sensitive string data that zeroes memory on drop.
///
/// Credentials are never displayed in full: `Debug` redacts the value and
/// `Display` masks all but the edges.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString(String);

impl SecureString {
    /// Creates a new secure string from the provided value.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns a reference to the inner string value.
    ///
    /// The returned reference should not be stored for extended periods.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks if the secure string equals the given string slice without
    /// exposing the value.
    pub fn equals_str(&self, other: &str) -> bool {
        self.0 == other
    }

    fn mask_sensitive(value: &str) -> String {
        if value.len() <= 8 {
            "***".to_string()
        } else {
            let head: String = value.chars().take(4).collect();
            let tail: String = value.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("{head}...{tail}")
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SecureString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", Self::mask_sensitive(&self.0))
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

/// What an authorization strategy contributes to an outgoing request: either
/// extra headers or extra query parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContribution {
    /// Headers merged into the request headers.
    Headers(IndexMap<String, String>),
    /// Parameters deep-merged into the outgoing params.
    Query(Map<String, Value>),
}

type ExternalAuth = Arc<dyn Fn() -> Result<AuthContribution, ApiClientError> + Send + Sync>;

/// Authorization capability applied to every executed call.
///
/// The strategy is selected once at configuration time; each call asks it for
/// a [`AuthContribution`] which is merged into the request per its kind.
///
/// # Examples
///
/// ```rust
/// use trellis_core::Authorization;
///
/// // Bearer token
/// let auth = Authorization::bearer("my-api-token");
///
/// // Custom header
/// let auth = Authorization::custom_headers([("X-API-KEY", "secret")]);
///
/// // Query-string credential
/// let auth = Authorization::custom_query([("api_key", "secret")]);
/// ```
///
/// An `external` strategy defers to a caller-provided function resolved at
/// configuration time, for providers that mint short-lived credentials:
///
/// ```rust
/// use trellis_core::{AuthContribution, Authorization};
///
/// let auth = Authorization::external(|| {
///     let token = fetch_service_account_token()?;
///     Ok(AuthContribution::Headers(
///         [("Authorization".to_string(), format!("Bearer {token}"))]
///             .into_iter()
///             .collect(),
///     ))
/// });
/// # fn fetch_service_account_token() -> Result<String, trellis_core::ApiClientError> {
/// #     Ok("token".to_string())
/// # }
/// ```
#[derive(Clone)]
pub enum Authorization {
    /// `Authorization: Bearer <token>` header.
    Bearer(SecureString),
    /// Fixed custom headers.
    CustomHeaders(IndexMap<String, SecureString>),
    /// Fixed query parameters.
    CustomQuery(IndexMap<String, String>),
    /// A function computing the contribution at call time.
    External(ExternalAuth),
}

impl Authorization {
    /// Bearer token authorization.
    pub fn bearer(token: impl Into<SecureString>) -> Self {
        Self::Bearer(token.into())
    }

    /// Fixed custom header authorization.
    pub fn custom_headers<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<SecureString>,
    {
        Self::CustomHeaders(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// Fixed query parameter authorization.
    pub fn custom_query<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::CustomQuery(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// Externally computed authorization.
    pub fn external(
        compute: impl Fn() -> Result<AuthContribution, ApiClientError> + Send + Sync + 'static,
    ) -> Self {
        Self::External(Arc::new(compute))
    }

    /// Computes this strategy's contribution for one call.
    pub(crate) fn contribution(&self) -> Result<AuthContribution, ApiClientError> {
        match self {
            Self::Bearer(token) => Ok(AuthContribution::Headers(
                [(
                    "Authorization".to_string(),
                    format!("Bearer {}", token.as_str()),
                )]
                .into_iter()
                .collect(),
            )),
            Self::CustomHeaders(headers) => Ok(AuthContribution::Headers(
                headers
                    .iter()
                    .map(|(name, value)| (name.clone(), value.as_str().to_string()))
                    .collect(),
            )),
            Self::CustomQuery(params) => Ok(AuthContribution::Query(
                params
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect(),
            )),
            Self::External(compute) => compute(),
        }
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(token) => write!(formatter, "Bearer {token}"),
            Self::CustomHeaders(headers) => {
                let masked: Vec<String> = headers
                    .iter()
                    .map(|(name, value)| format!("{name}: {value}"))
                    .collect();
                write!(formatter, "CustomHeaders ({})", masked.join(", "))
            }
            Self::CustomQuery(params) => {
                let names: Vec<&str> = params.keys().map(String::as_str).collect();
                write!(formatter, "CustomQuery ({})", names.join(", "))
            }
            Self::External(_) => formatter.write_str("External(..)"),
        }
    }
}
