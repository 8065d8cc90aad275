use crate::config::RemoteConfig;
use crate::document::{count_from_number, Envelope, FunctionCall, LinkDocument};
use crate::stats::{attribute_totals, deltas_by_key};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use shortlink_core::{
    normalize, ClickStats, Link, ReadStorage, Result, Storage, StorageError,
};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

const LOAD_ALL: &str = "load:loadAll";
const LOAD_ONE: &str = "load:loadOne";
const STORE: &str = "store";
const LOAD_STATS: &str = "stats:loadStats";
const SAVE_STATS: &str = "stats:saveStats";

/// Which remote endpoint a function is called through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    /// Side-effect free functions.
    Query,
    /// Functions that modify state.
    Mutation,
}

impl Endpoint {
    fn as_str(self) -> &'static str {
        match self {
            Endpoint::Query => "query",
            Endpoint::Mutation => "mutation",
        }
    }
}

/// Storage backed by a remote query/mutation function service.
///
/// Each operation is one or two blocking HTTP round trips. The client holds
/// no locks; ordering and atomicity between concurrent callers are up to
/// the service.
#[derive(Clone)]
pub struct RemoteStorage {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for RemoteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStorage")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn map_reqwest_error(path: &str, err: reqwest::Error) -> StorageError {
    let message = format!("{path}: {err}");
    if err.is_decode() {
        StorageError::Protocol(message)
    } else {
        StorageError::Io(message)
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| StorageError::Protocol(format!("unexpected value from {path}: {e}")))
}

impl RemoteStorage {
    /// Creates a client for the service at `config.url`.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Io(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    /// Calls a remote function and returns the `value` of a successful
    /// envelope. An absent value is returned as `Value::Null`.
    fn call(&self, endpoint: Endpoint, path: &str, mut args: Map<String, Value>) -> Result<Value> {
        args.insert("token".to_string(), Value::String(self.token.clone()));
        let url = format!("{}/api/{}", self.base_url, endpoint.as_str());
        let body = FunctionCall {
            path,
            args,
            format: "json",
        };

        trace!(path, endpoint = endpoint.as_str(), "calling remote function");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                warn!(path, error = %e, "remote call failed");
                map_reqwest_error(path, e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = match response.text() {
                Ok(text) => text,
                Err(e) => format!("<unreadable body: {e}>"),
            };
            warn!(path, status = %status, "unexpected status code from remote");
            return Err(StorageError::Protocol(format!(
                "unexpected status code from {path}: {status}: {body}"
            )));
        }

        let bytes = response.bytes().map_err(|e| map_reqwest_error(path, e))?;
        let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path, error = %e, "malformed response envelope");
            StorageError::Protocol(format!("malformed response from {path}: {e}"))
        })?;

        match envelope.status.as_str() {
            "success" => Ok(envelope.value.unwrap_or(Value::Null)),
            "error" => {
                let message = envelope.error_message.unwrap_or_default();
                warn!(path, error = %message, "remote function reported an error");
                Err(StorageError::Application(message))
            }
            other => Err(StorageError::Protocol(format!(
                "unexpected response status '{other}' from {path}"
            ))),
        }
    }

    fn query<T: DeserializeOwned>(&self, path: &str, args: Map<String, Value>) -> Result<T> {
        let value = self.call(Endpoint::Query, path, args)?;
        decode(path, value)
    }

    fn mutation(&self, path: &str, args: Map<String, Value>) -> Result<()> {
        self.call(Endpoint::Mutation, path, args).map(drop)
    }
}

/// Arguments holding a single named value.
fn arg(name: &str, value: impl Into<Value>) -> Map<String, Value> {
    Map::from_iter([(name.to_string(), value.into())])
}

fn to_value<T: serde::Serialize>(path: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| StorageError::Protocol(format!("failed to encode arguments for {path}: {e}")))
}

impl ReadStorage for RemoteStorage {
    fn load_all(&self) -> Result<Vec<Link>> {
        // A null value is an empty table.
        let docs: Vec<LinkDocument> = self
            .query::<Option<_>>(LOAD_ALL, Map::new())?
            .unwrap_or_default();
        trace!(count = docs.len(), "loaded links from remote");
        docs.into_iter().map(LinkDocument::into_link).collect()
    }

    fn load(&self, short: &str) -> Result<Link> {
        let key = normalize(short);
        let doc: Option<LinkDocument> =
            self.query(LOAD_ONE, arg("normalizedId", key.as_str()))?;

        match doc {
            Some(doc) => doc.into_link(),
            None => {
                trace!(key = %key, "link not found on remote");
                Err(StorageError::NotFound(key))
            }
        }
    }

    fn load_stats(&self) -> Result<ClickStats> {
        let raw: HashMap<String, Number> = self
            .query::<Option<_>>(LOAD_STATS, Map::new())?
            .unwrap_or_default();
        let totals = raw
            .into_iter()
            .map(|(key, clicks)| match count_from_number(&clicks) {
                Some(clicks) => Ok((key, clicks)),
                None => Err(StorageError::Protocol(format!(
                    "invalid click total {clicks} for '{key}'"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let links = self.load_all()?;
        Ok(attribute_totals(&links, totals))
    }
}

impl Storage for RemoteStorage {
    fn save(&self, link: &Link) -> Result<()> {
        let doc = LinkDocument::from_link(link);
        let key = doc.normalized_id.clone();

        self.mutation(STORE, arg("link", to_value(STORE, &doc)?))?;
        debug!(key = %key, "saved link");
        Ok(())
    }

    fn save_stats(&self, deltas: &ClickStats) -> Result<()> {
        let deltas = deltas_by_key(deltas)?;
        if deltas.is_empty() {
            return Ok(());
        }

        self.mutation(SAVE_STATS, arg("stats", to_value(SAVE_STATS, &deltas)?))?;
        debug!(links = deltas.len(), "recorded click deltas");
        Ok(())
    }
}
