//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the sync engine.
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, hyper, a game engine's web request, etc.).

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{Ack, SyncTransport};
use parking_lot::RwLock;
use playersync_core::Changeset;
use playersync_protocol::{
    account_path, decode_mapping, delete_path, encode_delete, encode_mapping, AckBody,
    API_KEY_HEADER, CONTENT_TYPE_JSON, SESSION_TOKEN_HEADER,
};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
}

impl Method {
    /// The method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    pub fn with_json_body(self, body: Vec<u8>) -> Self {
        let mut request = self.with_header("Content-Type", CONTENT_TYPE_JSON);
        request.body = Some(body);
        request
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the path portion of the URL, including any query.
    pub fn path(&self) -> &str {
        let after_scheme = self
            .url
            .find("://")
            .map(|i| &self.url[i + 3..])
            .unwrap_or(&self.url);
        after_scheme
            .find('/')
            .map(|i| &after_scheme[i..])
            .unwrap_or("/")
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. The error
/// string describes a failure to get any response at all; non-2xx
/// responses are returned as `Ok`.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: HttpRequest)
        -> impl Future<Output = Result<HttpResponse, String>> + Send;
}

/// HTTP-based sync transport.
///
/// Uses JSON bodies. Sends the configured API key and the caller's session
/// token as headers.
pub struct HttpTransport<C: HttpClient> {
    config: SyncConfig,
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(config: SyncConfig, client: C) -> Self {
        Self {
            config,
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns true until [`close`](Self::close) is called.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the transport; later calls fail with [`SyncError::NotConnected`].
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> HttpRequest {
        let mut request = HttpRequest::new(method, self.config.url_for(path))
            .with_header("User-Agent", self.config.user_agent.clone());
        if let Some(key) = &self.config.api_key {
            request = request.with_header(API_KEY_HEADER, key.clone());
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            request = request.with_header(SESSION_TOKEN_HEADER, token);
        }
        request
    }

    async fn execute(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.client.send(request).await.map_err(|e| {
            self.set_error(&e);
            SyncError::transport_retryable(e)
        })?;

        if !response.is_success() {
            let message = failure_message(&response);
            warn!(status = response.status, %message, "request rejected");
            self.set_error(&message);
            return Err(SyncError::Server {
                status: response.status,
                message,
            });
        }

        self.clear_error();
        Ok(response)
    }

    fn read_ack(response: &HttpResponse, fallback: &str) -> SyncResult<Ack> {
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Ack::new(fallback));
        }
        match AckBody::decode(&response.body) {
            Ok(body) if !body.success => Err(SyncError::Server {
                status: response.status,
                message: body.message,
            }),
            Ok(body) if !body.message.is_empty() => Ok(Ack::new(body.message)),
            Ok(_) => Ok(Ack::new(fallback)),
            Err(_) => Ok(Ack::new(String::from_utf8_lossy(&response.body).trim())),
        }
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    async fn save(
        &self,
        player_id: &str,
        changes: &Changeset,
        token: Option<&str>,
    ) -> SyncResult<Ack> {
        let body = encode_mapping(changes)?;
        let request = self
            .request(Method::Post, &account_path(player_id)?, token)
            .with_json_body(body);

        let response = self.execute(request).await?;
        Self::read_ack(&response, "Saved dictionary successfully.")
    }

    async fn load(&self, player_id: &str, token: Option<&str>) -> SyncResult<Changeset> {
        let request = self.request(Method::Get, &account_path(player_id)?, token);
        let response = self.execute(request).await?;

        decode_mapping(&response.body).map_err(|e| {
            self.set_error(&e.to_string());
            SyncError::from(e)
        })
    }

    async fn delete(&self, player_id: &str, keys: &[String], token: Option<&str>) -> SyncResult<Ack> {
        let body = encode_delete(keys)?;
        let request = self
            .request(Method::Post, &delete_path(player_id)?, token)
            .with_json_body(body);

        let response = self.execute(request).await?;
        Self::read_ack(&response, "Deleted keys successfully.")
    }
}

fn failure_message(response: &HttpResponse) -> String {
    let detail = AckBody::decode(&response.body)
        .map(|body| body.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).trim().to_string());

    if detail.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        detail
    }
}

/// Trait for servers that can handle loopback requests.
///
/// Implemented for any `Fn(&HttpRequest) -> HttpResponse`, so an in-process
/// backend can be wired in with a closure.
pub trait LoopbackServer: Send + Sync {
    /// Handles a request and returns the response.
    fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

impl<F> LoopbackServer for F
where
    F: Fn(&HttpRequest) -> HttpResponse + Send + Sync,
{
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self(request)
    }
}

/// An HTTP client that routes requests directly to an in-process server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        Ok(self.server.handle(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use playersync_core::ValueCell;

    struct TestClient {
        response: Mutex<Result<HttpResponse, String>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl TestClient {
        fn replying(status: u16, body: &[u8]) -> Self {
            Self {
                response: Mutex::new(Ok(HttpResponse::new(status, body.to_vec()))),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                response: Mutex::new(Err("connection refused".into())),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last_request(&self) -> HttpRequest {
            self.requests.lock().last().cloned().unwrap()
        }
    }

    impl HttpClient for TestClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.requests.lock().push(request);
            self.response.lock().clone()
        }
    }

    fn transport(client: TestClient) -> HttpTransport<TestClient> {
        let config = SyncConfig::new("https://game.example.com/").with_api_key("fn-key");
        HttpTransport::new(config, client)
    }

    #[test]
    fn request_path() {
        let request = HttpRequest::new(Method::Get, "https://h.example.com:8080/api/v1/x?y=1");
        assert_eq!(request.path(), "/api/v1/x?y=1");
        assert_eq!(HttpRequest::new(Method::Get, "loopback").path(), "/");
    }

    #[tokio::test]
    async fn save_sends_json_and_headers() {
        let transport = transport(TestClient::replying(200, b""));
        let changes: Changeset = [("Coins", 50i64)].into_iter().collect();

        let ack = transport.save("p1", &changes, Some("sess")).await.unwrap();
        assert_eq!(ack.message, "Saved dictionary successfully.");

        let request = transport.client().last_request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.url,
            "https://game.example.com/api/v1/players/p1/account"
        );
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("X-Functions-Key"), Some("fn-key"));
        assert_eq!(request.header("x-session-token"), Some("sess"));
        assert_eq!(request.body.as_deref(), Some(&br#"{"Coins":50}"#[..]));
    }

    #[tokio::test]
    async fn load_without_token() {
        let transport = transport(TestClient::replying(200, br#"{"Coins":7,"RowKey":"r"}"#));

        let record = transport.load("p1", None).await.unwrap();
        assert_eq!(record.get("Coins"), Some(&ValueCell::Integer(7)));

        let request = transport.client().last_request();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.header(SESSION_TOKEN_HEADER), None);
        assert_eq!(request.body, None);
    }

    #[tokio::test]
    async fn delete_sends_key_array() {
        let transport = transport(TestClient::replying(
            200,
            br#"{"success":true,"message":"Deleted 2 keys."}"#,
        ));
        let keys = vec!["Coins".to_string(), "Gems".to_string()];

        let ack = transport.delete("p1", &keys, None).await.unwrap();
        assert_eq!(ack.message, "Deleted 2 keys.");

        let request = transport.client().last_request();
        assert!(request.url.ends_with("/api/v1/players/p1/account/delete"));
        assert_eq!(request.body.as_deref(), Some(&br#"["Coins","Gems"]"#[..]));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let transport = transport(TestClient::unreachable());
        let err = transport.load("p1", None).await.unwrap_err();

        assert!(matches!(err, SyncError::Transport { retryable: true, .. }));
        assert_eq!(transport.last_error().as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_serialization_error() {
        let transport = transport(TestClient::replying(200, b"<html>oops</html>"));
        let err = transport.load("p1", None).await.unwrap_err();

        assert!(err.is_serialization());
        assert!(transport.last_error().is_some());
    }

    #[tokio::test]
    async fn error_status_is_a_server_error() {
        let transport = transport(TestClient::replying(
            401,
            br#"{"success":false,"message":"Invalid session token."}"#,
        ));
        let changes: Changeset = [("Coins", 1i64)].into_iter().collect();
        let err = transport.save("p1", &changes, Some("bad")).await.unwrap_err();

        match err {
            SyncError::Server { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid session token.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rejected_ack_is_a_server_error() {
        let transport = transport(TestClient::replying(
            200,
            br#"{"success":false,"message":"quota exceeded"}"#,
        ));
        let changes: Changeset = [("Coins", 1i64)].into_iter().collect();
        let err = transport.save("p1", &changes, None).await.unwrap_err();
        assert!(matches!(err, SyncError::Server { status: 200, .. }));
    }

    #[tokio::test]
    async fn invalid_player_id_never_reaches_the_client() {
        let transport = transport(TestClient::replying(200, b"{}"));
        let err = transport.load("a/b", None).await.unwrap_err();

        assert!(matches!(err, SyncError::InvalidRequest(_)));
        assert!(transport.client().requests.lock().is_empty());
    }

    #[tokio::test]
    async fn closed_transport() {
        let transport = transport(TestClient::replying(200, b"{}"));
        assert!(transport.is_connected());
        transport.close();
        assert!(!transport.is_connected());

        let err = transport.load("p1", None).await.unwrap_err();
        assert!(matches!(err, SyncError::NotConnected));
    }

    #[tokio::test]
    async fn loopback_client_routes_to_closure() {
        let client = LoopbackClient::new(|request: &HttpRequest| {
            assert_eq!(request.path(), "/api/v1/players/p1/account");
            HttpResponse::new(200, br#"{"Coins":3}"#.to_vec())
        });
        let transport = HttpTransport::new(SyncConfig::new("loopback://local"), client);

        let record = transport.load("p1", None).await.unwrap();
        assert_eq!(record.get("Coins"), Some(&ValueCell::Integer(3)));
    }
}
