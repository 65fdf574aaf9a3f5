//! Test helper utilities: a scripted Gamma API server and in-memory stores
#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gamma_gallery_migrate::models::gallery::GalleryRecord;
use gamma_gallery_migrate::services::gallery_table::{GalleryTable, GalleryTableError};
use gamma_gallery_migrate::services::retry::RetryPolicy;
use gamma_gallery_migrate::services::storage::{ObjectStore, StorageError};

/// One canned response from the mock generation endpoint
#[derive(Clone)]
pub struct Scripted {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl Scripted {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// Requests seen by the mock server
#[derive(Default)]
pub struct Recorded {
    pub calls: AtomicUsize,
    pub call_times: Mutex<Vec<Instant>>,
    pub bodies: Mutex<Vec<Value>>,
    pub auth_headers: Mutex<Vec<String>>,
}

impl Recorded {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Gap between request `i` and request `i + 1`
    pub fn gap(&self, i: usize) -> Duration {
        let times = self.call_times.lock().unwrap();
        times[i + 1] - times[i]
    }
}

/// Decides the response for each generation request
pub type Responder = Arc<dyn Fn(usize, &Value) -> Scripted + Send + Sync>;

#[derive(Clone)]
struct MockState {
    recorded: Arc<Recorded>,
    responder: Responder,
    archives: Arc<Vec<(String, Vec<u8>)>>,
}

/// Running mock Gamma server
pub struct MockGamma {
    pub addr: SocketAddr,
    pub recorded: Arc<Recorded>,
}

impl MockGamma {
    pub fn generations_url(&self) -> String {
        format!("http://{}/v1/generations", self.addr)
    }

    pub fn archive_url(&self, name: &str) -> String {
        format!("http://{}/archives/{}", self.addr, name)
    }
}

/// Start a mock server that replays `script` in order, repeating the last entry
pub async fn spawn_scripted(script: Vec<Scripted>) -> MockGamma {
    let responder: Responder = Arc::new(move |call: usize, _body: &Value| -> Scripted {
        script[call.min(script.len() - 1)].clone()
    });
    spawn_mock(responder, Vec::new()).await
}

/// Start a mock server with a custom responder and downloadable archives
pub async fn spawn_mock(responder: Responder, archives: Vec<(String, Vec<u8>)>) -> MockGamma {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("No local address");
    let recorded = Arc::new(Recorded::default());

    let state = MockState {
        recorded: recorded.clone(),
        responder,
        archives: Arc::new(archives),
    };

    let app = Router::new()
        .route("/v1/generations", post(generations))
        .route("/archives/{name}", get(archive))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock server error");
    });

    MockGamma { addr, recorded }
}

async fn generations(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call = state.recorded.calls.fetch_add(1, Ordering::SeqCst);
    state.recorded.call_times.lock().unwrap().push(Instant::now());
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        state.recorded.auth_headers.lock().unwrap().push(auth.to_string());
    }

    let scripted = (state.responder)(call, &body);
    state.recorded.bodies.lock().unwrap().push(body);

    let mut response = (scripted.status, Json(scripted.body)).into_response();
    for (name, value) in scripted.headers {
        response
            .headers_mut()
            .insert(name, value.parse().expect("Invalid header value"));
    }
    response
}

async fn archive(
    State(state): State<MockState>,
    axum::extract::Path(name): axum::extract::Path<String>,
) -> Response {
    match state.archives.iter().find(|(n, _)| *n == name) {
        Some((_, bytes)) => (StatusCode::OK, bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Retry policy where one `Retry-After` unit is 50ms
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: vec![Duration::from_millis(10); 3],
        retry_after_unit: Duration::from_millis(50),
        default_retry_after: 1,
    }
}

/// Object store that accepts everything into memory
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, key: &str, data: &[u8], _content_type: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().push((key.to_string(), data.len()));
        Ok(())
    }
}

/// Object store that always fails
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn upload(&self, _key: &str, _data: &[u8], _content_type: &str) -> Result<(), StorageError> {
        Err(StorageError::Rejected {
            status: 503,
            body: "storage unavailable".to_string(),
        })
    }
}

/// Gallery table that keeps rows in memory
#[derive(Default)]
pub struct MemoryTable {
    pub rows: Mutex<Vec<GalleryRecord>>,
}

#[async_trait]
impl GalleryTable for MemoryTable {
    async fn insert(&self, record: &GalleryRecord) -> Result<(), GalleryTableError> {
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Gallery table whose inserts always fail
pub struct FailingTable;

#[async_trait]
impl GalleryTable for FailingTable {
    async fn insert(&self, _record: &GalleryRecord) -> Result<(), GalleryTableError> {
        Err(GalleryTableError::Database(sqlx::Error::PoolTimedOut))
    }
}
