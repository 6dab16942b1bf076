use std::sync::{Arc, Weak};
use std::time::Duration;

use http::Method;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use super::ApiClient;
use super::auth::Authorization;
use super::call::{Callback, CallbackPayload};
use super::params::{CallArgs, ParamsSpec};
use super::path::PathNode;
use super::response::ResponseSpec;
use super::transport::{HttpTransport, Transport};

/// Builder for [`ApiClient`] instances.
///
/// The builder collects the base domain, authorization, callback hook, and
/// the declarative path tree, then freezes everything into an immutable
/// client.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use trellis_core::{ApiClient, Authorization, Method, ResponseSpec, Schema, StatusCode};
///
/// let client = ApiClient::builder()
///     .with_domain("https://api.example.com/v1")
///     .with_authorization(Authorization::custom_headers([("X-API-KEY", "secret")]))
///     .with_paths(|paths| {
///         paths.path("users", |users| {
///             users.path("invite", |invite| {
///                 invite
///                     .method(Method::POST)
///                     .params_named(["provider_id", "account_id", "message"])
///                     .response(ResponseSpec::structured(
///                         StatusCode::CREATED,
///                         Schema::parse(json!({"object": "string", "invitation_id": "string"}))
///                             .expect("a valid schema"),
///                     ));
///             });
///         });
///     })
///     .build();
/// ```
pub struct ApiClientBuilder<T: Transport = HttpTransport> {
    transport: T,
    domain: Option<String>,
    authorization: Option<Authorization>,
    callback: Option<Callback>,
    extra_callback_args: Vec<String>,
    timeout: Option<Duration>,
    roots: Vec<NodeDraft>,
}

impl<T: Transport> std::fmt::Debug for ApiClientBuilder<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiClientBuilder")
            .field("domain", &self.domain)
            .field("authorization", &self.authorization)
            .field("callback", &self.callback.is_some())
            .field("extra_callback_args", &self.extra_callback_args)
            .field("timeout", &self.timeout)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl Default for ApiClientBuilder<HttpTransport> {
    fn default() -> Self {
        Self {
            transport: HttpTransport::new(),
            domain: None,
            authorization: None,
            callback: None,
            extra_callback_args: Vec::new(),
            timeout: None,
            roots: Vec::new(),
        }
    }
}

impl<T: Transport> ApiClientBuilder<T> {
    /// Sets the base URL all dispatch paths are joined onto.
    ///
    /// The domain is validated when a call executes: it must be non-empty and
    /// carry an `http` or `https` scheme.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the authorization capability applied to every call.
    #[must_use]
    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Sets the hook invoked after every executed call.
    #[must_use]
    pub fn with_callback(mut self, callback: impl Fn(CallbackPayload) + Send + Sync + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Reserves argument names that are stripped from call sites and forwarded
    /// to the callback instead of the parameter builder.
    #[must_use]
    pub fn with_extra_callback_args<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.extra_callback_args = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-request timeout forwarded to the transport.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the transport the client dispatches through.
    #[must_use]
    pub fn with_transport<U: Transport>(self, transport: U) -> ApiClientBuilder<U> {
        let Self {
            transport: _,
            domain,
            authorization,
            callback,
            extra_callback_args,
            timeout,
            roots,
        } = self;
        ApiClientBuilder {
            transport,
            domain,
            authorization,
            callback,
            extra_callback_args,
            timeout,
            roots,
        }
    }

    /// Declares path segments at the root of the tree.
    ///
    /// The closure receives a [`PathBuilder`] positioned at the root; nested
    /// declarations thread child builders through nested closures.
    #[must_use]
    pub fn with_paths(mut self, declare: impl FnOnce(&mut PathBuilder<'_>)) -> Self {
        let mut root = NodeDraft::new(String::new(), false);
        declare(&mut PathBuilder { node: &mut root });
        self.roots.extend(root.children);
        self
    }

    /// Freezes the declaration into an immutable client.
    pub fn build(self) -> ApiClient<T> {
        let Self {
            transport,
            domain,
            authorization,
            callback,
            extra_callback_args,
            timeout,
            roots,
        } = self;

        let mut aliases = IndexMap::new();
        let roots: Vec<Arc<PathNode>> = roots
            .into_iter()
            .map(|draft| freeze(draft, Weak::new(), &mut aliases))
            .collect();

        ApiClient {
            transport,
            domain,
            authorization,
            callback,
            extra_callback_args,
            timeout,
            roots,
            aliases,
        }
    }
}

/// A mutable path node under declaration.
#[derive(Debug)]
struct NodeDraft {
    name: String,
    method: Method,
    is_param: bool,
    params: ParamsSpec,
    responses: Vec<ResponseSpec>,
    alias: Option<String>,
    children: Vec<NodeDraft>,
}

impl NodeDraft {
    fn new(name: String, is_param: bool) -> Self {
        Self {
            name,
            method: Method::GET,
            is_param,
            params: ParamsSpec::default(),
            responses: Vec::new(),
            alias: None,
            children: Vec::new(),
        }
    }
}

/// The declaration cursor threaded through nested `with_paths` closures.
///
/// Each nested closure receives the builder for the segment it declares;
/// there is no ambient "current parent" state outside the builder itself.
#[derive(Debug)]
pub struct PathBuilder<'d> {
    node: &'d mut NodeDraft,
}

impl PathBuilder<'_> {
    /// Declares a fixed child segment.
    pub fn path(
        &mut self,
        name: impl Into<String>,
        declare: impl FnOnce(&mut PathBuilder<'_>),
    ) -> &mut Self {
        self.child(name.into(), false, declare)
    }

    /// Declares a parameterized child segment whose URL text is supplied at
    /// call time with [`PathCursor::with`](super::PathCursor::with).
    pub fn param(
        &mut self,
        name: impl Into<String>,
        declare: impl FnOnce(&mut PathBuilder<'_>),
    ) -> &mut Self {
        self.child(name.into(), true, declare)
    }

    fn child(
        &mut self,
        name: String,
        is_param: bool,
        declare: impl FnOnce(&mut PathBuilder<'_>),
    ) -> &mut Self {
        // Sibling names are unique: a redeclaration replaces the previous
        // segment entirely.
        if let Some(position) = self.node.children.iter().position(|child| child.name == name) {
            warn!(%name, "replacing previously declared path segment");
            self.node.children.remove(position);
        }

        let mut draft = NodeDraft::new(name, is_param);
        declare(&mut PathBuilder { node: &mut draft });
        self.node.children.push(draft);
        self
    }

    /// Sets the HTTP method this segment executes with (default `GET`).
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.node.method = method;
        self
    }

    /// Declares the parameter builder as a projection of named call-site
    /// arguments. Re-declaring replaces the previous builder.
    pub fn params_named<S: Into<String>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.replace_params(ParamsSpec::Named(names.into_iter().map(Into::into).collect()))
    }

    /// Declares the parameter builder as a function of the call-site
    /// arguments. Re-declaring replaces the previous builder.
    pub fn params_with(
        &mut self,
        build: impl Fn(&CallArgs) -> Map<String, Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.replace_params(ParamsSpec::Builder(Arc::new(build)))
    }

    fn replace_params(&mut self, params: ParamsSpec) -> &mut Self {
        if self.node.params.is_declared() {
            warn!(
                segment = %self.node.name,
                "replacing previously declared parameter builder; the last declaration wins"
            );
        }
        self.node.params = params;
        self
    }

    /// Declares an expected response. Status codes are unique per segment:
    /// re-declaring a status replaces the previous response.
    pub fn response(&mut self, spec: ResponseSpec) -> &mut Self {
        if let Some(position) = self
            .node
            .responses
            .iter()
            .position(|existing| existing.status() == spec.status())
        {
            warn!(
                segment = %self.node.name,
                status = %spec.status(),
                "replacing previously declared response"
            );
            self.node.responses.remove(position);
        }
        self.node.responses.push(spec);
        self
    }

    /// Registers this segment under a client-level dispatch alias, reachable
    /// with [`ApiClient::aliased`](super::ApiClient::aliased).
    pub fn alias(&mut self, name: impl Into<String>) -> &mut Self {
        self.node.alias = Some(name.into());
        self
    }
}

fn freeze(
    draft: NodeDraft,
    parent: Weak<PathNode>,
    aliases: &mut IndexMap<String, Arc<PathNode>>,
) -> Arc<PathNode> {
    let NodeDraft {
        name,
        method,
        is_param,
        params,
        responses,
        alias,
        children,
    } = draft;

    let node = Arc::new_cyclic(|me| PathNode {
        name,
        method,
        is_param,
        parent,
        children: children
            .into_iter()
            .map(|child| freeze(child, me.clone(), aliases))
            .collect(),
        params,
        responses,
    });

    if let Some(alias) = alias {
        if aliases.insert(alias.clone(), Arc::clone(&node)).is_some() {
            warn!(%alias, "replacing previously declared alias");
        }
    }

    node
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_declares_a_nested_tree() {
        let client = ApiClient::builder()
            .with_paths(|paths| {
                paths.path("users", |users| {
                    users.path("invite", |invite| {
                        invite.method(Method::POST);
                    });
                    users.param("user_id", |_user| {});
                });
                paths.path("status", |_status| {});
            })
            .build();

        let invite = client.at("users").unwrap().at("invite").unwrap();
        assert_eq!(invite.node().method(), &Method::POST);
        assert!(invite.node().is_leaf());

        let user = client.at("users").unwrap().at("user_id").unwrap();
        assert!(user.node().is_param());

        assert!(client.at("status").is_ok());
        assert!(client.at("missing").is_err());
    }

    #[test]
    fn test_method_defaults_to_get() {
        let client = ApiClient::builder()
            .with_paths(|paths| {
                paths.path("profile", |_profile| {});
            })
            .build();

        assert_eq!(client.at("profile").unwrap().node().method(), &Method::GET);
    }

    #[test]
    fn test_last_params_declaration_wins() {
        let client = ApiClient::builder()
            .with_paths(|paths| {
                paths.path("widgets", |widgets| {
                    widgets.params_named(["old"]);
                    widgets.params_with(|_args| {
                        json!({"replaced": true}).as_object().cloned().unwrap_or_default()
                    });
                });
            })
            .build();

        let node = Arc::clone(client.at("widgets").unwrap().node());
        let params = node.params.build(&CallArgs::new().arg("old", 1));

        assert_eq!(params.get("replaced"), Some(&json!(true)));
        assert!(!params.contains_key("old"));
    }

    #[test]
    fn test_redeclared_status_replaces_previous_response() {
        let client = ApiClient::builder()
            .with_paths(|paths| {
                paths.path("jobs", |jobs| {
                    jobs.response(ResponseSpec::passthrough(StatusCode::OK));
                    jobs.response(ResponseSpec::empty(StatusCode::OK));
                });
            })
            .build();

        let node = Arc::clone(client.at("jobs").unwrap().node());
        assert_eq!(node.responses.len(), 1);

        let outcome = node
            .response_for(StatusCode::OK)
            .unwrap()
            .apply("ignored", &CallArgs::new())
            .unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_duplicate_sibling_names_are_replaced() {
        let client = ApiClient::builder()
            .with_paths(|paths| {
                paths.path("events", |events| {
                    events.method(Method::POST);
                });
                paths.path("events", |events| {
                    events.method(Method::DELETE);
                });
            })
            .build();

        assert_eq!(client.roots.len(), 1);
        assert_eq!(client.at("events").unwrap().node().method(), &Method::DELETE);
    }

    #[test]
    fn test_alias_reaches_a_nested_node() {
        let client = ApiClient::builder()
            .with_paths(|paths| {
                paths.path("users", |users| {
                    users.path("invite", |invite| {
                        invite.method(Method::POST).alias("linkedin_invite");
                    });
                });
            })
            .build();

        let cursor = client.aliased("linkedin_invite").unwrap();

        assert_eq!(cursor.node().name(), "invite");
        assert_eq!(cursor.route(), "users/invite");
        assert_eq!(cursor.full_path().unwrap(), "users/invite");
    }

    #[test]
    fn test_unknown_alias_is_an_error() {
        let client = ApiClient::builder().build();

        let error = client.aliased("nope").unwrap_err();

        assert_eq!(error.to_string(), "No alias 'nope' is declared in the client");
    }
}
