use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{any, get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HELLO: &str = "/hello";
pub const PATH_ECHO: &str = "/echo";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_HANG: &str = "/hang";
pub const PATH_STATUS: &str = "/status/{code}";
pub const PATH_CONVERSATIONS: &str = "/conversations";
pub const PATH_CONVERSATIONS_ANONYMOUS: &str = "/conversations/anonymous";
pub const PATH_MESSAGES: &str = "/messages";

/// How long `/slow` takes to answer.
pub const SLOW_DELAY: Duration = Duration::from_millis(50);

/// How long `/hang` takes to answer; longer than any timeout a test would configure.
pub const HANG_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    saw_custom_header: Arc<AtomicU64>,
    saw_json_content_type: Arc<AtomicU64>,
    conversations_created: Arc<AtomicU64>,
    messages_accepted: Arc<AtomicU64>,
    messages_rejected: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Requests that carried `x-test: 1`.
    pub fn saw_custom_header(&self) -> u64 {
        self.saw_custom_header.load(Ordering::Relaxed)
    }

    pub fn saw_json_content_type(&self) -> u64 {
        self.saw_json_content_type.load(Ordering::Relaxed)
    }

    pub fn conversations_created(&self) -> u64 {
        self.conversations_created.load(Ordering::Relaxed)
    }

    pub fn messages_accepted(&self) -> u64 {
        self.messages_accepted.load(Ordering::Relaxed)
    }

    pub fn messages_rejected(&self) -> u64 {
        self.messages_rejected.load(Ordering::Relaxed)
    }

    fn observe_headers(&self, headers: &HeaderMap) {
        Self::inc(&self.requests_total);

        if headers.get("x-test").and_then(|v| v.to_str().ok()) == Some("1") {
            Self::inc(&self.saw_custom_header);
        }
        if headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().starts_with("application/json"))
        {
            Self::inc(&self.saw_json_content_type);
        }
    }
}

#[derive(Debug, Clone, Default)]
struct AppState {
    stats: TestServerStats,
    next_conversation: Arc<AtomicU64>,
    conversations: Arc<Mutex<HashSet<String>>>,
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub hello: String,
    pub echo: String,
    pub slow: String,
    pub hang: String,
    pub conversations: String,
    pub conversations_anonymous: String,
    pub messages: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            hello: format!("{base_url}{PATH_HELLO}"),
            echo: format!("{base_url}{PATH_ECHO}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            hang: format!("{base_url}{PATH_HANG}"),
            conversations: format!("{base_url}{PATH_CONVERSATIONS}"),
            conversations_anonymous: format!("{base_url}{PATH_CONVERSATIONS_ANONYMOUS}"),
            messages: format!("{base_url}{PATH_MESSAGES}"),
            base_url,
        }
    }

    /// URL that always answers with `code`.
    pub fn status(&self, code: u16) -> String {
        format!("{}/status/{code}", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ConversationCreated {
    id: String,
    title: String,
}

#[derive(Debug, Serialize)]
struct AnonymousConversation {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest {
    conversation_id: String,
}

async fn handle_hello(State(state): State<AppState>, headers: HeaderMap) -> &'static str {
    state.stats.observe_headers(&headers);
    "Hello World!"
}

async fn handle_slow(State(state): State<AppState>, headers: HeaderMap) -> &'static str {
    state.stats.observe_headers(&headers);
    sleep(SLOW_DELAY).await;
    "slow"
}

async fn handle_hang(State(state): State<AppState>, headers: HeaderMap) -> &'static str {
    state.stats.observe_headers(&headers);
    sleep(HANG_DELAY).await;
    "late"
}

async fn handle_echo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    state.stats.observe_headers(&headers);
    (StatusCode::OK, body)
}

async fn handle_status(
    State(state): State<AppState>,
    Path(code): Path<u16>,
    headers: HeaderMap,
) -> StatusCode {
    state.stats.observe_headers(&headers);
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn handle_create_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Bytes) {
    state.stats.observe_headers(&headers);

    let n = state.next_conversation.fetch_add(1, Ordering::Relaxed) + 1;
    let id = format!("conv-{n}");
    state
        .conversations
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(id.clone());
    TestServerStats::inc(&state.stats.conversations_created);

    let res = ConversationCreated {
        id,
        title: "new conversation".to_string(),
    };
    match serde_json::to_vec(&res) {
        Ok(bytes) => (StatusCode::CREATED, Bytes::from(bytes)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ),
    }
}

async fn handle_create_anonymous(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Bytes) {
    state.stats.observe_headers(&headers);

    let res = AnonymousConversation {
        title: "no id here".to_string(),
    };
    match serde_json::to_vec(&res) {
        Ok(bytes) => (StatusCode::CREATED, Bytes::from(bytes)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ),
    }
}

async fn handle_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    state.stats.observe_headers(&headers);

    let known = serde_json::from_slice::<MessageRequest>(&body)
        .ok()
        .is_some_and(|req| {
            state
                .conversations
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .contains(&req.conversation_id)
        });

    if known {
        TestServerStats::inc(&state.stats.messages_accepted);
        StatusCode::CREATED
    } else {
        TestServerStats::inc(&state.stats.messages_rejected);
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

pub fn router(stats: TestServerStats) -> Router {
    let state = AppState {
        stats,
        ..AppState::default()
    };

    Router::new()
        .route(PATH_HELLO, get(handle_hello))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_HANG, get(handle_hang))
        .route(PATH_ECHO, post(handle_echo))
        .route(PATH_STATUS, any(handle_status))
        .route(PATH_CONVERSATIONS, post(handle_create_conversation))
        .route(PATH_CONVERSATIONS_ANONYMOUS, post(handle_create_anonymous))
        .route(PATH_MESSAGES, post(handle_message))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();

        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");
        let urls = TestServerUrls::new(base_url.clone());

        Ok(Self {
            addr,
            base_url,
            urls,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    /// Graceful shutdown. Waits for in-flight requests, so avoid it after hitting `/hang`;
    /// dropping the server aborts it instead.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
