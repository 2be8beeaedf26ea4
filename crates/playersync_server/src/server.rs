//! Main server entry point.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use playersync_core::Changeset;
use playersync_protocol::{
    decode_delete, decode_mapping, encode_mapping, parse_route, AckBody, Route,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// An incoming request, independent of any HTTP library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerRequest<'a> {
    /// Request method, e.g. `"GET"`.
    pub method: &'a str,
    /// Request path, optionally with a query string.
    pub path: &'a str,
    /// Value of the API key header.
    pub api_key: Option<&'a str>,
    /// Value of the session token header.
    pub session_token: Option<&'a str>,
    /// Request body.
    pub body: &'a [u8],
}

impl<'a> ServerRequest<'a> {
    /// Creates a `GET` request.
    pub fn get(path: &'a str) -> Self {
        Self {
            method: "GET",
            path,
            api_key: None,
            session_token: None,
            body: &[],
        }
    }

    /// Creates a `POST` request.
    pub fn post(path: &'a str, body: &'a [u8]) -> Self {
        Self {
            method: "POST",
            body,
            ..Self::get(path)
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: &'a str) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the session token.
    pub fn with_session_token(mut self, token: &'a str) -> Self {
        self.session_token = Some(token);
        self
    }
}

/// A response to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Vec<u8>,
}

impl ServerResponse {
    fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    fn ack(message: String) -> Self {
        Self::ok(AckBody::success(message).encode().unwrap_or_default())
    }

    fn failure(err: &ServerError) -> Self {
        Self {
            status: err.status(),
            body: AckBody::failure(err.to_string())
                .encode()
                .unwrap_or_default(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The reference backend.
///
/// Holds one record per player in memory and answers the account
/// endpoints.
///
/// # Example
///
/// ```
/// use playersync_server::{ServerConfig, ServerRequest, SyncServer};
///
/// let server = SyncServer::new(ServerConfig::default());
/// let save = ServerRequest::post("/api/v1/players/p1/account", br#"{"Coins":5}"#);
/// assert_eq!(server.handle(&save).status, 200);
///
/// let load = ServerRequest::get("/api/v1/players/p1/account");
/// assert_eq!(server.handle(&load).status, 200);
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new server with no records.
    pub fn new(config: ServerConfig) -> Self {
        let context = Arc::new(HandlerContext::new(config));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Handles one request.
    pub fn handle(&self, request: &ServerRequest<'_>) -> ServerResponse {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => {
                if err.is_server_error() {
                    error!(method = request.method, path = request.path, error = %err, "request failed");
                } else {
                    warn!(method = request.method, path = request.path, error = %err, "request rejected");
                }
                ServerResponse::failure(&err)
            }
        }
    }

    fn dispatch(&self, request: &ServerRequest<'_>) -> ServerResult<ServerResponse> {
        if let Some(expected) = &self.context.config.api_key {
            if request.api_key != Some(expected.as_str()) {
                return Err(ServerError::InvalidApiKey);
            }
        }

        let no_route = || ServerError::NoRoute {
            method: request.method.to_string(),
            path: request.path.to_string(),
        };
        let route = parse_route(request.path).ok_or_else(no_route)?;
        let player_id = match &route {
            Route::Account { player_id } | Route::DeleteKeys { player_id } => player_id.as_str(),
        };

        if !self
            .context
            .sessions
            .validate(player_id, request.session_token)
        {
            return Err(ServerError::InvalidSessionToken);
        }

        debug!(method = request.method, player_id, "handling request");
        let method = request.method.to_ascii_uppercase();
        match (method.as_str(), &route) {
            ("GET", Route::Account { .. }) => {
                let record = self.handler.handle_load(player_id)?;
                let body =
                    encode_mapping(&record).map_err(|e| ServerError::Internal(e.to_string()))?;
                Ok(ServerResponse::ok(body))
            }
            ("POST", Route::Account { .. }) => {
                let changes = decode_mapping(request.body)?;
                self.handler
                    .handle_save(player_id, changes)
                    .map(ServerResponse::ack)
            }
            ("POST", Route::DeleteKeys { .. }) => {
                let keys = decode_delete(request.body)?;
                self.handler
                    .handle_delete(player_id, &keys)
                    .map(ServerResponse::ack)
            }
            _ => Err(no_route()),
        }
    }

    /// Issues a session token that `player_id` must present from now on.
    pub fn issue_token(&self, player_id: &str) -> String {
        self.context.sessions.issue(player_id)
    }

    /// Revokes `player_id`'s session token.
    pub fn revoke_token(&self, player_id: &str) -> bool {
        self.context.sessions.revoke(player_id)
    }

    /// Returns the application entries of `player_id`'s record.
    pub fn record(&self, player_id: &str) -> Option<Changeset> {
        self.context.record(player_id)
    }

    /// Number of players with a record.
    pub fn player_count(&self) -> usize {
        self.context.player_count()
    }
}
