//! Wiring of the coordinator to the in-process backend.

use playersync_engine::{
    register_sync_commands, ChannelLog, CommandRegistry, ConsoleLog, HttpRequest, HttpResponse,
    HttpTransport, LoopbackClient, LoopbackServer, PlayerSession, SyncConfig, SyncCoordinator,
};
use playersync_protocol::{API_KEY_HEADER, SESSION_TOKEN_HEADER};
use playersync_server::{ServerConfig, ServerRequest, SyncServer};
use std::sync::Arc;

const BASE_URL: &str = "loopback://playersync.local";

/// Folder holding the sync commands.
pub const FOLDER: &str = "Player Data";

/// Connection options from the command line.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Player id; a guest id is generated when absent.
    pub player: Option<String>,
    /// Session token sent with every request.
    pub token: Option<String>,
    /// API key shared by the client and the in-process server.
    pub api_key: Option<String>,
    /// Whether the server stamps bookkeeping keys on loads.
    pub stamp_metadata: bool,
    /// Keep console lines without printing them.
    pub quiet: bool,
}

/// Transport used by the CLI.
pub type Transport = HttpTransport<LoopbackClient<Router>>;

/// Everything a console session needs.
pub struct Backend {
    /// The in-process server.
    pub server: Arc<SyncServer>,
    /// Coordinator over the loopback transport.
    pub sync: Arc<SyncCoordinator<Transport>>,
    /// Session the commands act for.
    pub session: PlayerSession,
    /// Console shared by the coordinator and the commands.
    pub console: Arc<EchoLog>,
    /// Registered player data commands.
    pub registry: CommandRegistry,
}

/// Hands loopback requests to the in-process server.
pub struct Router {
    server: Arc<SyncServer>,
}

impl LoopbackServer for Router {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let response = self.server.handle(&ServerRequest {
            method: request.method.as_str(),
            path: request.path(),
            api_key: request.header(API_KEY_HEADER),
            session_token: request.header(SESSION_TOKEN_HEADER),
            body: request.body.as_deref().unwrap_or_default(),
        });
        HttpResponse::new(response.status, response.body)
    }
}

/// Prints console lines as they arrive and keeps them for `log`.
#[derive(Debug, Default)]
pub struct EchoLog {
    /// Every line logged so far.
    pub lines: ChannelLog,
    quiet: bool,
}

impl ConsoleLog for EchoLog {
    fn log(&self, channel: &str, message: &str) {
        if !self.quiet {
            println!("[{channel}] {message}");
        }
        self.lines.log(channel, message);
    }
}

/// Builds a backend, coordinator and command registry.
pub fn connect(options: Options) -> Backend {
    let mut server_config = ServerConfig::new().with_stamp_metadata(options.stamp_metadata);
    let mut client_config = SyncConfig::new(BASE_URL);
    if let Some(key) = options.api_key.filter(|k| !k.is_empty()) {
        server_config = server_config.with_api_key(key.clone());
        client_config = client_config.with_api_key(key);
    }
    let server = Arc::new(SyncServer::new(server_config));

    let mut session = options
        .player
        .map(PlayerSession::new)
        .unwrap_or_else(PlayerSession::guest);
    if let Some(token) = options.token {
        session = session.with_token(token);
    }

    let router = Router {
        server: server.clone(),
    };
    let transport = HttpTransport::new(client_config, LoopbackClient::new(router));

    let console = Arc::new(EchoLog {
        lines: ChannelLog::new(),
        quiet: options.quiet,
    });
    let sync = Arc::new(SyncCoordinator::new(transport).with_console(console.clone()));

    let mut registry = CommandRegistry::new();
    register_sync_commands(
        &mut registry,
        FOLDER,
        sync.clone(),
        session.clone(),
        console.clone(),
    );

    Backend {
        server,
        sync,
        session,
        console,
        registry,
    }
}
