use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

mod builder;
pub use self::builder::{ApiClientBuilder, PathBuilder};

mod call;
pub use self::call::{ApiCall, CallbackPayload};
use self::call::Callback;

mod auth;
pub use self::auth::{AuthContribution, Authorization, SecureString};

mod error;
pub use self::error::ApiClientError;

mod params;
pub use self::params::CallArgs;

mod path;
pub use self::path::{PathCursor, PathNode};

mod response;
pub use self::response::{
    BodyMode, CallOutcome, ElementRule, FieldRule, FieldType, ResponseObject, ResponseSpec,
    Schema, SchemaError, ValidationError,
};

mod transport;
pub use self::transport::{
    HttpTransport, Transport, TransportError, TransportRequest, TransportResponse,
};


/// The root of a declared API client: base domain, authorization, callback
/// hook, and the path tree.
///
/// A client is assembled once with [`ApiClient::builder`] and is immutable
/// afterwards; all per-call state lives on the [`PathCursor`] returned by
/// [`at`](Self::at), so a single client can serve concurrent calls.
///
/// # Example
///
/// ```rust,no_run
/// use trellis_core::{ApiClient, CallArgs, Method, ResponseSpec, StatusCode};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), trellis_core::ApiClientError> {
/// let client = ApiClient::builder()
///     .with_domain("https://www.amocrm.ru")
///     .with_paths(|paths| {
///         paths.path("oauth2", |oauth2| {
///             oauth2.path("access_token", |token| {
///                 token
///                     .method(Method::POST)
///                     .params_named([
///                         "client_id",
///                         "client_secret",
///                         "redirect_uri",
///                         "code",
///                         "grant_type",
///                     ])
///                     .response(ResponseSpec::passthrough(StatusCode::OK));
///             });
///         });
///     })
///     .build();
///
/// let body = client
///     .at("oauth2")?
///     .at("access_token")?
///     .call(
///         CallArgs::new()
///             .arg("client_id", "id")
///             .arg("client_secret", "secret")
///             .arg("redirect_uri", "redirect")
///             .arg("code", "code")
///             .arg("grant_type", "authorization_code"),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiClient<T: Transport = HttpTransport> {
    pub(crate) transport: T,
    pub(crate) domain: Option<String>,
    pub(crate) authorization: Option<Authorization>,
    pub(crate) callback: Option<Callback>,
    pub(crate) extra_callback_args: Vec<String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) roots: Vec<Arc<PathNode>>,
    pub(crate) aliases: IndexMap<String, Arc<PathNode>>,
}

impl ApiClient {
    /// Starts a builder with the default HTTP transport.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }
}

impl<T: Transport> ApiClient<T> {
    /// Resolves a root path segment by exact name.
    ///
    /// # Errors
    ///
    /// Fails when no root segment carries that name.
    pub fn at(&self, name: &str) -> Result<PathCursor<'_, T>, ApiClientError> {
        let root = self
            .roots
            .iter()
            .find(|node| node.name() == name)
            .map(Arc::clone)
            .ok_or_else(|| ApiClientError::UnknownPath {
                segment: name.to_string(),
                route: "(root)".to_string(),
            })?;
        Ok(PathCursor::new(self, root))
    }

    /// Resolves a node registered under a dispatch alias, positioned with its
    /// full ancestor chain.
    ///
    /// # Errors
    ///
    /// Fails when no alias carries that name.
    pub fn aliased(&self, name: &str) -> Result<PathCursor<'_, T>, ApiClientError> {
        let node = self
            .aliases
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| ApiClientError::UnknownAlias {
                name: name.to_string(),
            })?;
        Ok(PathCursor::new(self, node))
    }

    /// The configured base domain, when set.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// The configured authorization capability, when set.
    pub fn authorization(&self) -> Option<&Authorization> {
        self.authorization.as_ref()
    }

    pub(crate) fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }

    /// The argument names reserved for the callback, in declared order.
    pub fn extra_callback_args(&self) -> &[String] {
        &self.extra_callback_args
    }

    /// The per-request timeout forwarded to the transport, when set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> fmt::Debug for ApiClient<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiClient")
            .field("domain", &self.domain)
            .field("authorization", &self.authorization)
            .field("callback", &self.callback.is_some())
            .field("extra_callback_args", &self.extra_callback_args)
            .field("timeout", &self.timeout)
            .field("roots", &self.roots)
            .field("aliases", &self.aliases.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
