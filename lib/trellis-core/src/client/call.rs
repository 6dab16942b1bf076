use std::sync::Arc;

use http::{Method, StatusCode};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use super::ApiClient;
use super::auth::AuthContribution;
use super::error::ApiClientError;
use super::params::{CallArgs, deep_merge, split_extra_args};
use super::path::{PathNode, resolve_path};
use super::response::CallOutcome;
use super::transport::{Transport, TransportRequest};

const SNIPPET_MAX_LENGTH: usize = 256;

/// The arguments handed to the registry callback after an execution.
///
/// The callback fires once per executed call, whatever response the matched
/// declaration classified, and receives the dispatched URL, the outgoing
/// parameters and headers as sent (authorization merged in), the parsed
/// response body, and the extra callback arguments in declared order.
#[derive(Debug, Clone)]
pub struct CallbackPayload {
    /// The dispatched URL, query string excluded.
    pub url: String,
    /// The outgoing parameters, authorization contributions merged in.
    pub params: Map<String, Value>,
    /// The request headers as sent.
    pub headers: IndexMap<String, String>,
    /// The parsed response body.
    pub response: Value,
    /// The extra callback arguments stripped from the call site.
    pub extra: Vec<Value>,
}

pub(crate) type Callback = Arc<dyn Fn(CallbackPayload) + Send + Sync>;

/// One fully assembled call, ready to dispatch.
///
/// Obtained from [`PathCursor::prepare`](super::PathCursor::prepare); the
/// usual entry point is [`PathCursor::call`](super::PathCursor::call), which
/// assembles and dispatches in one step.
#[derive(Debug)]
pub struct ApiCall<'c, T: Transport> {
    client: &'c ApiClient<T>,
    chain: Vec<Arc<PathNode>>,
    bindings: Vec<Option<String>>,
    params: Map<String, Value>,
    args: CallArgs,
    extra: Vec<Value>,
}

impl<'c, T: Transport> ApiCall<'c, T> {
    pub(crate) fn new(
        client: &'c ApiClient<T>,
        chain: Vec<Arc<PathNode>>,
        bindings: Vec<Option<String>>,
        mut args: CallArgs,
    ) -> Self {
        let extra = split_extra_args(&mut args, client.extra_callback_args());
        let params = chain
            .last()
            .map(|node| node.params.build(&args))
            .unwrap_or_default();
        Self {
            client,
            chain,
            bindings,
            params,
            args,
            extra,
        }
    }

    /// Dispatches the call and returns its final outcome.
    pub async fn exchange(self) -> Result<CallOutcome, ApiClientError> {
        let (_, outcome) = self.exchange_detailed().await?;
        Ok(outcome)
    }

    /// Dispatches the call and returns the matched status alongside the
    /// outcome, for callers that branch on which declared response answered.
    pub async fn exchange_detailed(self) -> Result<(StatusCode, CallOutcome), ApiClientError> {
        let Self {
            client,
            chain,
            bindings,
            mut params,
            args,
            extra,
        } = self;
        let node = chain
            .last()
            .map(Arc::clone)
            .unwrap_or_else(|| unreachable!("a call chain is never empty"));

        // Preconditions: the domain must be a usable http(s) base URL.
        let domain = client.domain().ok_or(ApiClientError::MissingDomain)?;
        if domain.is_empty() {
            return Err(ApiClientError::MissingDomain);
        }
        let base = Url::parse(domain).map_err(|_| ApiClientError::InvalidDomain {
            domain: domain.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ApiClientError::InvalidDomain {
                domain: domain.to_string(),
            });
        }

        let mut headers: IndexMap<String, String> = [
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
        .into_iter()
        .collect();

        if let Some(authorization) = client.authorization() {
            match authorization.contribution()? {
                AuthContribution::Headers(contributed) => {
                    headers.extend(contributed);
                }
                AuthContribution::Query(contributed) => {
                    deep_merge(&mut params, &contributed);
                }
            }
        }

        let full_path = resolve_path(&chain, &bindings)?;
        let dispatch_url = format!("{}/{full_path}", domain.trim_end_matches('/'));
        let mut url: Url = dispatch_url.parse()?;

        let method = node.method().clone();
        let body = if sends_query(&method) {
            if !params.is_empty() {
                let query = serde_urlencoded::to_string(query_pairs(&params)?)?;
                url.set_query(Some(&query));
            }
            None
        } else {
            Some(serde_json::to_string(&Value::Object(params.clone()))?)
        };

        let request = TransportRequest {
            method,
            url,
            headers: headers.clone(),
            body,
            timeout: client.timeout(),
        };

        debug!(method = %request.method, url = %request.url, "sending...");
        let response = client.transport().send(request).await?;
        debug!(status = %response.status, "...receiving");

        let spec = node
            .response_for(response.status)
            .ok_or_else(|| ApiClientError::UnhandledStatus {
                path: dispatch_url.clone(),
                status: response.status.as_u16(),
            })?;

        let outcome = spec.apply(&response.body, &args)?;

        if let Some(callback) = client.callback() {
            let parsed = parse_response(&response.body)?;
            callback(CallbackPayload {
                url: dispatch_url,
                params,
                headers,
                response: parsed,
                extra,
            });
        }

        Ok((response.status, outcome))
    }
}

fn sends_query(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE
}

fn query_pairs(params: &Map<String, Value>) -> Result<Vec<(String, String)>, ApiClientError> {
    let mut pairs = Vec::with_capacity(params.len());
    for (name, value) in params {
        let rendered = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(ApiClientError::UnsupportedQueryParameterValue {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        };
        pairs.push((name.clone(), rendered));
    }
    Ok(pairs)
}

fn parse_response(raw_body: &str) -> Result<Value, ApiClientError> {
    serde_json::from_str(raw_body).map_err(|error| ApiClientError::ParseError {
        message: error.to_string(),
        snippet: snippet(raw_body),
    })
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
    use serde_json::json;

    use super::*;

    #[test]
    fn test_query_pairs_renders_scalars() {
        let params = json!({"page": 2, "active": true, "name": "John", "skip": null})
            .as_object()
            .cloned()
            .unwrap();

        let pairs = query_pairs(&params).unwrap();

        assert_eq!(
            pairs,
            vec![
                ("active".to_string(), "true".to_string()),
                ("name".to_string(), "John".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_rejects_nested_values() {
        let params = json!({"filter": {"name": "John"}}).as_object().cloned().unwrap();

        let error = query_pairs(&params).unwrap_err();

        assert!(matches!(
            error,
            ApiClientError::UnsupportedQueryParameterValue { ref name, .. } if name == "filter"
        ));
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let body = "x".repeat(300);

        let rendered = snippet(&body);

        assert!(rendered.ends_with("... (truncated)"));
        assert!(rendered.len() < body.len() + 20);
    }
}
