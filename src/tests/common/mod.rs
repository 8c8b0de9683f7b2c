// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};
use reqwest::Client as ReqwestClient;
use serde_json::Value;

use crate::cache::token::AccessToken;
use crate::client::{Client, ClientOptions};
use crate::credentials::{CredentialError, CredentialProvider};
use crate::helpers::time::now_i64;
use crate::resilience::retry::RetrySettings;
use crate::resolver::environment::Environment;
use crate::transport::{HttpRequest, HttpSend, RawResponse, SendError};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> ReqwestClient {
    ReqwestClient::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Issues `token-<n>-for-<scope>` valid for an hour and remembers every scope asked for.
#[derive(Default)]
pub struct StaticProvider {
    pub acquisitions: AtomicUsize,
    pub scopes: Mutex<Vec<String>>,
}

impl StaticProvider {
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scopes.lock().unwrap().clone()
    }
}

impl CredentialProvider for StaticProvider {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let n = self.acquisitions.fetch_add(1, Ordering::SeqCst) + 1;
        self.scopes.lock().unwrap().push(scope.to_owned());
        Ok(AccessToken::new(format!("token-{n}-for-{scope}"), now_i64() + 3600))
    }

    fn kind(&self) -> &'static str {
        "static"
    }
}

/// One canned outcome for [`ScriptedSender`].
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, Vec<u8>),
    Fail { retryable: bool },
}

impl Reply {
    pub fn ok_json(body: Value) -> Self {
        Reply::Status(200, body.to_string().into_bytes())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, format!("status {code}").into_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub at: tokio::time::Instant,
}

impl RecordedCall {
    pub fn authorization(&self) -> &str {
        self.headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

/// In-memory [`HttpSend`] that plays back replies in order; the last one repeats.
pub struct ScriptedSender {
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedSender {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or_else(|| Reply::status(200))
        }
    }
}

impl HttpSend for ScriptedSender {
    async fn send(&self, request: HttpRequest<'_>) -> Result<RawResponse, SendError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            url: request.url.to_owned(),
            headers: request.headers.clone(),
            query: request.query.to_vec(),
            body: request.json_body.cloned(),
            at: tokio::time::Instant::now(),
        });

        match self.next_reply() {
            Reply::Status(code, body) => Ok(RawResponse {
                status: StatusCode::from_u16(code).unwrap(),
                headers: HeaderMap::new(),
                body,
            }),
            Reply::Fail { retryable: true } => Err(SendError::retryable("connection reset by peer")),
            Reply::Fail { retryable: false } => Err(SendError::terminal("relative URL without a base")),
        }
    }
}

pub const TEST_RESOURCE_ID: &str = "api://omnia-timeseries-test";

pub fn test_environment() -> Environment {
    Environment::new(TEST_RESOURCE_ID, "https://timeseries.test/plant/timeseries/v1.7")
}

pub fn test_options(attempts: u32) -> ClientOptions {
    ClientOptions {
        retry: RetrySettings {
            attempts,
            base_delay_ms: 100,
            max_delay_ms: 60_000,
        },
        safety_margin_seconds: 60,
        request_deadline: Duration::from_secs(600),
    }
}

/// Client over a scripted sender and a static provider.
pub fn scripted_client(
    replies: impl IntoIterator<Item = Reply>,
    attempts: u32,
) -> Client<StaticProvider, ScriptedSender> {
    Client::with_parts(
        test_environment(),
        StaticProvider::default(),
        ScriptedSender::new(replies),
        test_options(attempts),
    )
}
