//! Manager base
//!
//! Shared request primitives used by every resource manager: fetch one,
//! list, create, update, delete and the generic `/action` POST.

use super::registry::{registry, Route, VersionedMethod};
use crate::api::client::Client;
use crate::api::http::{ApiResponse, RequestOptions};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Allowed values for `sort_dir` on every list call
pub const SORT_DIR_VALUES: &[&str] = &["asc", "desc"];

/// A typed value object built from one JSON entity returned by the service
pub trait Resource: DeserializeOwned + Serialize {
    fn id(&self) -> &str;

    /// Fields the typed struct does not declare
    fn extra(&self) -> &Map<String, Value>;

    /// Look up any attribute by its wire name, declared or not
    fn attr(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.extra().get(name) {
            return Some(value.clone());
        }
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(name).filter(|v| !v.is_null()),
            _ => None,
        }
    }
}

/// Anything that identifies a resource: its id as text or the resource itself
pub trait ResourceId {
    fn resource_id(&self) -> &str;
}

impl ResourceId for str {
    fn resource_id(&self) -> &str {
        self
    }
}

impl ResourceId for String {
    fn resource_id(&self) -> &str {
        self
    }
}

/// Paths and response keys of one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    /// Registry and hook namespace, e.g. `shares`
    pub name: &'static str,
    /// Collection path, e.g. `/shares`
    pub path: &'static str,
    /// Key of a single object in responses, e.g. `share`
    pub singular: &'static str,
    /// Key of a list in responses, e.g. `shares`
    pub plural: &'static str,
}

impl ResourceKind {
    pub fn resource_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }

    pub fn action_path(&self, id: &str) -> String {
        format!("{}/{}/action", self.path, id)
    }

    /// Collection path for a list call, with `/detail` when requested
    pub fn list_path(&self, detailed: bool, query: &str) -> String {
        if detailed {
            format!("{}/detail{}", self.path, query)
        } else {
            format!("{}{}", self.path, query)
        }
    }

    pub fn operation(&self, op: &str) -> String {
        format!("{}.{}", self.name, op)
    }
}

/// Callback that may rewrite an action body before it is posted
pub type ActionHook = Arc<dyn Fn(&mut Value) + Send + Sync>;

/// Hook registrations, per resource kind, in registration order
#[derive(Default)]
pub struct Hooks {
    modify_body_for_action: HashMap<&'static str, Vec<ActionHook>>,
}

impl Hooks {
    pub fn add_action_hook(&mut self, kind: &'static str, hook: ActionHook) {
        self.modify_body_for_action
            .entry(kind)
            .or_default()
            .push(hook);
    }

    pub fn run_action_hooks(&self, kind: &str, body: &mut Value) {
        if let Some(hooks) = self.modify_body_for_action.get(kind) {
            for hook in hooks {
                hook(body);
            }
        }
    }
}

/// Filters for list calls
///
/// Keys are kept sorted so the rendered query string is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOpts(BTreeMap<String, Value>);

impl SearchOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for SearchOpts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Arguments common to every list call
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub detailed: bool,
    pub search_opts: SearchOpts,
    pub sort_key: Option<String>,
    pub sort_dir: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            detailed: true,
            search_opts: SearchOpts::default(),
            sort_key: None,
            sort_dir: None,
        }
    }
}

impl ListOptions {
    pub fn search(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.search_opts.insert(key, value);
        self
    }

    pub fn sort(mut self, key: &str, dir: &str) -> Self {
        self.sort_key = Some(key.to_string());
        self.sort_dir = Some(dir.to_string());
        self
    }

    /// Validate sort arguments and fold them into the search options
    ///
    /// `aliases` maps accepted sort keys to the key the service expects.
    pub(crate) fn into_search_opts(
        self,
        allowed_sort_keys: &[&str],
        aliases: &[(&str, &str)],
    ) -> Result<SearchOpts> {
        let mut opts = self.search_opts;

        if let Some(sort_key) = self.sort_key {
            if !allowed_sort_keys.contains(&sort_key.as_str()) {
                return Err(Error::invalid_input(format!(
                    "sort_key must be one of the following: {}.",
                    allowed_sort_keys.join(", ")
                )));
            }
            let resolved = aliases
                .iter()
                .find(|(alias, _)| *alias == sort_key)
                .map(|(_, key)| key.to_string())
                .unwrap_or(sort_key);
            opts.insert("sort_key", resolved);
        }

        if let Some(sort_dir) = self.sort_dir {
            if !SORT_DIR_VALUES.contains(&sort_dir.as_str()) {
                return Err(Error::invalid_input(format!(
                    "sort_dir must be one of the following: {}.",
                    SORT_DIR_VALUES.join(", ")
                )));
            }
            opts.insert("sort_dir", sort_dir);
        }

        Ok(opts)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn render_query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

/// Encode filters as `k=v` pairs joined by `&`, sorted by key
///
/// Falsy values (null, false, 0, empty string/array/object) are dropped.
pub fn encode_query(opts: &SearchOpts) -> String {
    opts.0
        .iter()
        .filter(|(_, value)| !is_falsy(value))
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&render_query_value(value))
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Query string including the leading `?`, or empty when nothing remains
pub fn build_query_string(opts: &SearchOpts) -> String {
    let query = encode_query(opts);
    if query.is_empty() {
        query
    } else {
        format!("?{}", query)
    }
}

/// A dispatched operation: the chosen request shape plus its request options
#[derive(Debug, Clone, Copy)]
pub struct Call {
    pub route: Route,
    pub options: RequestOptions,
}

/// Request primitives for one resource kind, borrowed from a [`Client`]
#[derive(Clone, Copy)]
pub struct Manager<'a> {
    client: &'a Client,
    kind: ResourceKind,
}

impl<'a> Manager<'a> {
    pub fn new(client: &'a Client, kind: ResourceKind) -> Self {
        Self { client, kind }
    }

    pub fn client(&self) -> &'a Client {
        self.client
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Resolve a version-gated operation of this kind at the client's version
    pub fn resolve(&self, op: &str) -> Result<Call> {
        let method: &VersionedMethod<Route> =
            registry().dispatch(&self.kind.operation(op), self.client)?;
        Ok(Call {
            route: method.func,
            options: RequestOptions {
                experimental: method.experimental && self.client.supports_experimental(),
            },
        })
    }

    /// GET `path` and parse the object under `key`
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.client.http.get(path, options).await?;
        take_key(response.body, key)
    }

    /// GET `path` and parse the array under `key`
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        options: RequestOptions,
    ) -> Result<Vec<T>> {
        let response = self.client.http.get(path, options).await?;
        take_key(response.body, key)
    }

    /// POST `body` to `path` and parse the object under `key`
    pub async fn create<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        key: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.client.http.post(path, Some(body), options).await?;
        take_key(response.body, key)
    }

    /// PUT `body` to `path` and parse the object under `key`
    pub async fn update<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        key: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.client.http.put(path, Some(body), options).await?;
        take_key(response.body, key)
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<()> {
        self.client.http.delete(path, options).await?;
        Ok(())
    }

    /// POST `{action: info}` to the action path of `id`
    ///
    /// Registered `modify_body_for_action` hooks run first, in order.
    pub async fn action(
        &self,
        id: &str,
        action: &str,
        info: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let mut body = Value::Object(Map::from_iter([(
            action.to_string(),
            info.unwrap_or(Value::Null),
        )]));
        self.client
            .hooks()
            .run_action_hooks(self.kind.name, &mut body);

        let path = self.kind.action_path(id);
        self.client.http.post(&path, Some(&body), options).await
    }

    /// Run a dispatched `Action` or `Post` route against `id`
    pub async fn execute(&self, call: Call, id: &str, info: Option<Value>) -> Result<ApiResponse> {
        match call.route {
            Route::Action(action) => self.action(id, action, info, call.options).await,
            Route::Post(template) => {
                let path = template.replace("{id}", id);
                self.client.http.post(&path, info.as_ref(), call.options).await
            }
            Route::Standard => Err(Error::invalid_input(format!(
                "{} has no request shape to execute against '{}'",
                self.kind.name, id
            ))),
        }
    }
}

/// Wrap a request body under its resource key, e.g. `{"share": {...}}`
pub(crate) fn envelope<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Value> {
    Ok(Value::Object(Map::from_iter([(
        key.to_string(),
        serde_json::to_value(value)?,
    )])))
}

/// Parse the value nested under `key` in a response body
pub(crate) fn take_key<T: DeserializeOwned>(body: Value, key: &str) -> Result<T> {
    match body {
        Value::Object(mut map) => {
            let value = map
                .remove(key)
                .ok_or_else(|| Error::MissingKey(key.to_string()))?;
            Ok(serde_json::from_value(value)?)
        }
        _ => Err(Error::MissingKey(key.to_string())),
    }
}
