//! Mock Brick server shared by the integration suites
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Bytes, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use brick::{ApiClient, AuthSession, ClientConfig, MemoryCredentialStore};
use parking_lot::Mutex;
use tokio::net::TcpListener;

/// One request as the server saw it
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    /// Path plus query string
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub type Log = Arc<Mutex<Vec<Captured>>>;

#[derive(Clone)]
struct Canned {
    log: Log,
    status: StatusCode,
    body: String,
}

async fn record(State(canned): State<Canned>, req: Request) -> (StatusCode, String) {
    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let headers = req.headers().clone();
    let body = to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    canned.log.lock().push(Captured {
        method,
        uri,
        headers,
        body,
    });
    (canned.status, canned.body.clone())
}

/// Server that records every request and answers each with the same response
pub fn recorder(status: u16, body: &str) -> (Router, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let canned = Canned {
        log: log.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        body: body.to_string(),
    };
    (Router::new().fallback(record).with_state(canned), log)
}

/// Serve on an ephemeral port of the current runtime; returns the base URL
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Serve from a dedicated thread, for callers that block (the C ABI)
pub fn serve_blocking(app: Router) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = TcpListener::from_std(std_listener).unwrap();
            axum::serve(listener, app).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

pub fn client(base_url: &str) -> ApiClient {
    ApiClient::new(ClientConfig::new(base_url).unwrap(), AuthSession::in_memory()).unwrap()
}

pub fn client_with_token(base_url: &str, token: &str) -> ApiClient {
    let session = AuthSession::new(Arc::new(MemoryCredentialStore::with_token(token)));
    ApiClient::new(ClientConfig::new(base_url).unwrap(), session).unwrap()
}
