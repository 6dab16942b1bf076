use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

/// Ordered keyword arguments supplied at a call site.
///
/// Arguments drive the node's parameter builder; names reserved as extra
/// callback arguments are stripped out before the builder runs and forwarded
/// to the completion callback instead.
///
/// ```rust
/// use trellis_core::CallArgs;
///
/// let args = CallArgs::new()
///     .arg("provider_id", 1)
///     .arg("message", "hi");
/// assert!(args.contains("message"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs(IndexMap<String, Value>);

impl CallArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument, replacing any previous value under the same name.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Reads an argument value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// True when an argument with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// The number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the arguments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for CallArgs {
    fn from(entries: [(K, V); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// How a node turns call-site arguments into outgoing request parameters.
///
/// Exactly one builder is active per node; re-declaring replaces the previous
/// one (last declaration wins).
#[derive(Clone, Default)]
pub(crate) enum ParamsSpec {
    /// No parameters: the outgoing payload is empty.
    #[default]
    None,
    /// Project the named arguments into the payload; absent names are omitted.
    Named(Vec<String>),
    /// Build the payload with a caller-supplied function.
    Builder(Arc<dyn Fn(&CallArgs) -> Map<String, Value> + Send + Sync>),
}

impl ParamsSpec {
    pub(crate) fn build(&self, args: &CallArgs) -> Map<String, Value> {
        match self {
            Self::None => Map::new(),
            Self::Named(names) => names
                .iter()
                .filter_map(|name| args.get(name).map(|value| (name.clone(), value.clone())))
                .collect(),
            Self::Builder(builder) => builder(args),
        }
    }

    pub(crate) fn is_declared(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Debug for ParamsSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => formatter.write_str("None"),
            Self::Named(names) => formatter.debug_tuple("Named").field(names).finish(),
            Self::Builder(_) => formatter.write_str("Builder(..)"),
        }
    }
}

/// Merges `incoming` into `target`, combining nested objects key by key
/// instead of replacing them wholesale.
pub(crate) fn deep_merge(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                deep_merge(existing, nested);
            }
            (_, value) => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Splits the reserved extra-callback arguments out of `args`, in declared
/// order. Names the call site did not supply forward as `Value::Null`.
pub(crate) fn split_extra_args(args: &mut CallArgs, names: &[String]) -> Vec<Value> {
    names
        .iter()
        .map(|name| {
            args.remove(name).unwrap_or_else(|| {
                warn!(%name, "extra callback argument not supplied at call site");
                Value::Null
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_named_spec_projects_supplied_arguments() {
        let spec = ParamsSpec::Named(vec!["account_id".to_string(), "cursor".to_string()]);
        let args = CallArgs::new().arg("account_id", 8).arg("ignored", true);

        let params = spec.build(&args);

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("account_id"), Some(&json!(8)));
    }

    #[test]
    fn test_builder_spec_runs_the_function() {
        let spec = ParamsSpec::Builder(Arc::new(|args: &CallArgs| {
            let mut params = Map::new();
            params.insert(
                "grant_type".to_string(),
                args.get("grant_type")
                    .cloned()
                    .unwrap_or_else(|| json!("authorization_code")),
            );
            params
        }));

        let params = spec.build(&CallArgs::new());
        assert_eq!(params.get("grant_type"), Some(&json!("authorization_code")));

        let params = spec.build(&CallArgs::new().arg("grant_type", "refresh_token"));
        assert_eq!(params.get("grant_type"), Some(&json!("refresh_token")));
    }

    #[test]
    fn test_deep_merge_combines_nested_objects() {
        let mut target = json!({"filter": {"name": "John"}, "page": 1})
            .as_object()
            .cloned()
            .unwrap();
        let incoming = json!({"filter": {"token": "abc"}, "limit": 10})
            .as_object()
            .cloned()
            .unwrap();

        deep_merge(&mut target, &incoming);

        assert_eq!(
            Value::Object(target),
            json!({"filter": {"name": "John", "token": "abc"}, "page": 1, "limit": 10})
        );
    }

    #[test]
    fn test_deep_merge_replaces_scalars() {
        let mut target = json!({"token": "old"}).as_object().cloned().unwrap();
        let incoming = json!({"token": "new"}).as_object().cloned().unwrap();

        deep_merge(&mut target, &incoming);

        assert_eq!(target.get("token"), Some(&json!("new")));
    }

    #[test]
    fn test_split_extra_args_strips_in_declared_order() {
        let mut args = CallArgs::new()
            .arg("resource", "user-1")
            .arg("provider_id", 1);
        let names = vec!["resource".to_string(), "trace_id".to_string()];

        let extra = split_extra_args(&mut args, &names);

        assert_eq!(extra, vec![json!("user-1"), Value::Null]);
        assert!(!args.contains("resource"));
        assert!(args.contains("provider_id"));
    }

    #[test]
    fn test_call_args_from_array() {
        let args = CallArgs::from([("name", "John"), ("city", "Paris")]);
        assert_eq!(args.len(), 2);
        assert_eq!(args.get("city"), Some(&json!("Paris")));
    }
}
