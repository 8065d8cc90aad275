#![allow(dead_code)]

pub mod contract;

use serde_json::{json, Map, Value};
use shortlink_storage::{RemoteConfig, RemoteStorage, SqliteStorage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// A SQLite store in a throwaway directory.
pub struct SqliteFixture {
    _dir: TempDir,
    pub storage: SqliteStorage,
}

impl SqliteFixture {
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let storage = SqliteStorage::open_path(dir.path().join("links.db")).expect("open sqlite");
        Self { _dir: dir, storage }
    }
}

#[derive(Default)]
struct FakeState {
    links: HashMap<String, Value>,
    stats: HashMap<String, i64>,
    calls: Vec<Value>,
}

/// An in-process stand-in for the hosted function service.
///
/// It keeps links and click totals in memory and answers the query and
/// mutation endpoints with the same envelopes the real service uses.
/// Timestamps are stored and returned as floats.
#[derive(Clone, Default)]
struct FakeService {
    state: Arc<Mutex<FakeState>>,
}

fn success(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "success", "value": value }))
}

fn failure(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "error", "errorMessage": message }))
}

fn as_float(doc: &mut Map<String, Value>, field: &str) {
    if let Some(seconds) = doc.get(field).and_then(Value::as_f64) {
        doc.insert(field.to_string(), json!(seconds));
    }
}

impl FakeService {
    fn handle(&self, endpoint: &str, body: Value) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        state.calls.push(json!({ "endpoint": endpoint, "body": body.clone() }));

        if body["format"] != "json" {
            return failure("unsupported format");
        }
        if body["args"]["token"] != TOKEN {
            return failure("invalid token");
        }
        let args = &body["args"];

        match (endpoint, body["path"].as_str().unwrap_or_default()) {
            ("query", "load:loadAll") => success(Value::Array(state.links.values().cloned().collect())),
            ("query", "load:loadOne") => {
                let id = args["normalizedId"].as_str().unwrap_or_default();
                success(state.links.get(id).cloned().unwrap_or(Value::Null))
            }
            ("mutation", "store") => {
                let Some(mut doc) = args["link"].as_object().cloned() else {
                    return failure("missing link");
                };
                as_float(&mut doc, "created");
                as_float(&mut doc, "lastEdit");
                let id = doc["normalizedId"].as_str().unwrap_or_default().to_string();
                state.links.insert(id, Value::Object(doc));
                success(Value::Null)
            }
            ("query", "stats:loadStats") => {
                let totals: Map<String, Value> = state
                    .stats
                    .iter()
                    .map(|(id, clicks)| (id.clone(), json!(*clicks as f64)))
                    .collect();
                success(Value::Object(totals))
            }
            ("mutation", "stats:saveStats") => {
                let Some(deltas) = args["stats"].as_object().cloned() else {
                    return failure("missing stats");
                };
                for (id, clicks) in deltas {
                    *state.stats.entry(id).or_default() += clicks.as_i64().unwrap_or_default();
                }
                success(Value::Null)
            }
            (endpoint, path) => failure(&format!("no {endpoint} function named '{path}'")),
        }
    }
}

struct EndpointResponder {
    endpoint: &'static str,
    service: FakeService,
}

impl Respond for EndpointResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        match serde_json::from_slice::<Value>(&request.body) {
            Ok(body) => self.service.handle(self.endpoint, body),
            Err(_) => ResponseTemplate::new(400),
        }
    }
}

/// A fake function service plus the URL a [`RemoteStorage`] should use.
pub struct RemoteFixture {
    pub server: MockServer,
    service: FakeService,
}

impl RemoteFixture {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let service = FakeService::default();

        for endpoint in ["query", "mutation"] {
            Mock::given(method("POST"))
                .and(path(format!("/api/{endpoint}")))
                .respond_with(EndpointResponder {
                    endpoint,
                    service: service.clone(),
                })
                .mount(&server)
                .await;
        }

        Self { server, service }
    }

    pub fn config(&self) -> RemoteConfig {
        remote_config(&self.server)
    }

    /// Runs `f` against a fresh client on a blocking thread.
    ///
    /// The blocking HTTP client must not be created or dropped on an
    /// async worker.
    pub async fn run<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&RemoteStorage) -> T + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(self.config(), f).await
    }

    /// Request bodies received so far, tagged with their endpoint.
    pub fn calls(&self) -> Vec<Value> {
        self.service.state.lock().unwrap().calls.clone()
    }

    /// Inserts a stats total directly, bypassing the client.
    pub fn seed_stats(&self, id: &str, clicks: i64) {
        self.service
            .state
            .lock()
            .unwrap()
            .stats
            .insert(id.to_string(), clicks);
    }
}

pub fn remote_config(server: &MockServer) -> RemoteConfig {
    RemoteConfig::builder().url(server.uri()).token(TOKEN).build()
}

/// Builds a client from `config` and runs `f` on a blocking thread.
pub async fn run_blocking<T, F>(config: RemoteConfig, f: F) -> T
where
    F: FnOnce(&RemoteStorage) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let storage = RemoteStorage::new(config).expect("build remote storage");
        f(&storage)
    })
    .await
    .expect("blocking task panicked")
}
