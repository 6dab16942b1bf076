use std::sync::{Arc, Weak};

use http::Method;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::call::ApiCall;
use super::error::ApiClientError;
use super::params::{CallArgs, ParamsSpec};
use super::response::{CallOutcome, ResponseSpec};
use super::transport::Transport;
use super::ApiClient;

/// URL-encode a bound path-segment value.
fn encode_segment_value(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// One node of the declarative path tree.
///
/// A node carries its segment name, HTTP method, children, parameter builder,
/// and declared responses. The tree is frozen at build time and never mutated
/// afterwards; per-call state such as a parameterized segment's value lives on
/// the [`PathCursor`] instead, so concurrent calls over the same tree cannot
/// observe each other.
#[derive(Debug)]
pub struct PathNode {
    pub(crate) name: String,
    pub(crate) method: Method,
    pub(crate) is_param: bool,
    pub(crate) parent: Weak<PathNode>,
    pub(crate) children: Vec<Arc<PathNode>>,
    pub(crate) params: ParamsSpec,
    pub(crate) responses: Vec<ResponseSpec>,
}

impl PathNode {
    /// The segment name, unique among its siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The HTTP method used when this node executes.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// True when the segment's URL text is supplied at call time.
    pub fn is_param(&self) -> bool {
        self.is_param
    }

    /// True when the node has no child segments and can execute.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn child(&self, name: &str) -> Option<&Arc<PathNode>> {
        self.children.iter().find(|child| child.name == name)
    }

    pub(crate) fn response_for(&self, status: http::StatusCode) -> Option<&ResponseSpec> {
        self.responses.iter().find(|spec| spec.status() == status)
    }

    /// The declaration route of this node, parameterized segments rendered as
    /// `{name}`. Used in diagnostics.
    pub fn route(&self) -> String {
        let segment = if self.is_param {
            format!("{{{}}}", self.name)
        } else {
            self.name.clone()
        };
        match self.parent.upgrade() {
            Some(parent) => format!("{}/{segment}", parent.route()),
            None => segment,
        }
    }

    /// The chain of nodes from the root down to `self`, inclusive.
    pub(crate) fn ancestry(self: &Arc<Self>) -> Vec<Arc<PathNode>> {
        let mut chain = vec![Arc::clone(self)];
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent.upgrade() {
            chain.push(Arc::clone(&parent));
            current = parent;
        }
        chain.reverse();
        chain
    }
}

/// A per-call position in the path tree.
///
/// A cursor owns the chain of resolved nodes and the values bound to
/// parameterized segments for this one call. Binding a value never touches
/// the shared tree, so any number of cursors can address the same node
/// concurrently.
///
/// ```rust,no_run
/// # use trellis_core::{ApiClient, CallArgs};
/// # async fn example(client: &ApiClient) -> Result<(), trellis_core::ApiClientError> {
/// let outcome = client
///     .at("users")?
///     .at("user_id")?
///     .with("77")?
///     .call(CallArgs::new().arg("account_id", 8))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PathCursor<'c, T: Transport> {
    client: &'c ApiClient<T>,
    chain: Vec<Arc<PathNode>>,
    bindings: Vec<Option<String>>,
}

impl<'c, T: Transport> PathCursor<'c, T> {
    pub(crate) fn new(client: &'c ApiClient<T>, node: Arc<PathNode>) -> Self {
        let chain = node.ancestry();
        let bindings = vec![None; chain.len()];
        Self {
            client,
            chain,
            bindings,
        }
    }

    /// The node the cursor currently points at.
    pub fn node(&self) -> &Arc<PathNode> {
        self.chain.last().unwrap_or_else(|| unreachable!("a cursor chain is never empty"))
    }

    /// The declaration route of the current node.
    pub fn route(&self) -> String {
        self.node().route()
    }

    /// Resolves a child segment by exact name.
    ///
    /// # Errors
    ///
    /// Fails when the current node has no child with that name.
    pub fn at(mut self, name: &str) -> Result<Self, ApiClientError> {
        let child = self
            .node()
            .child(name)
            .map(Arc::clone)
            .ok_or_else(|| ApiClientError::UnknownPath {
                segment: name.to_string(),
                route: self.route(),
            })?;
        self.chain.push(child);
        self.bindings.push(None);
        Ok(self)
    }

    /// Binds the current parameterized segment's value for this call.
    ///
    /// # Errors
    ///
    /// Fails when the current node is not parameterized.
    pub fn with(mut self, value: impl ToString) -> Result<Self, ApiClientError> {
        if !self.node().is_param() {
            return Err(ApiClientError::UnexpectedPathParameter { route: self.route() });
        }
        if let Some(binding) = self.bindings.last_mut() {
            *binding = Some(value.to_string());
        }
        Ok(self)
    }

    /// The dispatch path for this call: ancestor segment texts joined with
    /// `/`, bound values substituted for parameterized segments.
    ///
    /// # Errors
    ///
    /// Fails when a parameterized segment on the chain has no bound value.
    pub fn full_path(&self) -> Result<String, ApiClientError> {
        resolve_path(&self.chain, &self.bindings)
    }

    /// Assembles the call without dispatching it.
    ///
    /// Extra callback arguments are stripped from `args` and the node's
    /// parameter builder runs against the remainder.
    ///
    /// # Errors
    ///
    /// Fails when the current node still has child segments.
    pub fn prepare(self, args: CallArgs) -> Result<ApiCall<'c, T>, ApiClientError> {
        if !self.node().is_leaf() {
            return Err(ApiClientError::NotALeaf { route: self.route() });
        }
        let Self {
            client,
            chain,
            bindings,
        } = self;
        Ok(ApiCall::new(client, chain, bindings, args))
    }

    /// Assembles and dispatches the call, returning its final outcome.
    pub async fn call(self, args: CallArgs) -> Result<CallOutcome, ApiClientError> {
        self.prepare(args)?.exchange().await
    }
}

/// Joins a resolved chain into the dispatch path, substituting the per-call
/// bound value for every parameterized segment.
pub(crate) fn resolve_path(
    chain: &[Arc<PathNode>],
    bindings: &[Option<String>],
) -> Result<String, ApiClientError> {
    let mut segments = Vec::with_capacity(chain.len());
    for (node, binding) in chain.iter().zip(bindings) {
        if node.is_param() {
            let value = binding
                .as_deref()
                .ok_or_else(|| ApiClientError::MissingPathParameter { route: node.route() })?;
            segments.push(encode_segment_value(value));
        } else {
            segments.push(node.name.clone());
        }
    }
    Ok(segments.join("/"))
}
