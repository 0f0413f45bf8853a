// In-process mock of the platform API:
// - binds an ephemeral 127.0.0.1 port and polls until it accepts connections
// - records every request (method, path with query, auth header, JSON body)
// - graceful shutdown so servers don't linger between tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    /// Path below the `/api` prefix, query included.
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body: body.to_string(), delay: Duration::ZERO }
    }

    pub fn ok(body: Value) -> Self { Self::json(200, body) }

    pub fn text(status: u16, body: &str) -> Self {
        Self { status, body: body.to_string(), delay: Duration::ZERO }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = dyn Fn(&Seen) -> Reply + Send + Sync;

struct MockState {
    seen: Mutex<Vec<Seen>>,
    respond: Box<Responder>,
}

pub struct MockApi {
    pub base: String,
    state: Arc<MockState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MockApi {
    pub async fn start<F>(respond: F) -> MockApi
    where
        F: Fn(&Seen) -> Reply + Send + Sync + 'static,
    {
        let state = Arc::new(MockState { seen: Mutex::new(Vec::new()), respond: Box::new(respond) });
        let router = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        wait_for_listen(addr).await;
        MockApi { base: format!("http://{}/api", addr), state, shutdown: Some(shutdown_tx), handle }
    }

    pub fn seen(&self) -> Vec<Seen> { self.state.seen.lock().clone() }

    pub fn last(&self) -> Seen { self.seen().last().cloned().expect("no request recorded") }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

async fn wait_for_listen(addr: SocketAddr) {
    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return,
            Err(err) => {
                if Instant::now() >= deadline {
                    panic!("mock api not ready at {addr}: {err}");
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let full = uri.path_and_query().map(|p| p.as_str().to_string()).unwrap_or_default();
    let seen = Seen {
        method: method.as_str().to_string(),
        path: full.strip_prefix("/api").unwrap_or(&full).to_string(),
        authorization: headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string),
        content_type: headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state.seen.lock().push(seen.clone());
    let reply = (state.respond)(&seen);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body)
}

/// `{code, success: true, model}` around `model`.
pub fn wrapped(model: Value) -> Value {
    serde_json::json!({"code": 0, "success": true, "model": model})
}

pub fn auth_body(user_id: &str, role: &str, token: &str) -> Value {
    serde_json::json!({
        "userId": user_id,
        "email": "a@b.com",
        "role": role,
        "token": token,
        "message": "ok",
        "firstName": "Ana",
        "lastName": "Souza"
    })
}
