//! Configuration for the sync engine.

use uuid::Uuid;

/// Configuration for reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// API key sent with every request, if the backend requires one.
    pub api_key: Option<String>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    ///
    /// Trailing slashes are trimmed from `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            user_agent: format!("playersync/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.is_empty() {
            None
        } else {
            Some(api_key)
        };
        self
    }

    /// Joins `path` onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:7071")
    }
}

/// The player a sync operation acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSession {
    /// Backend player id.
    pub player_id: String,
    /// Session token from a login, if any.
    pub token: Option<String>,
}

impl PlayerSession {
    /// Creates a session for `player_id` without a token.
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            token: None,
        }
    }

    /// Creates an unauthenticated guest session with a random id.
    pub fn guest() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self::new(format!("guest-{}", &id[..6]))
    }

    /// Sets the session token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the token as a borrowed string.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns true if the session carries a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
