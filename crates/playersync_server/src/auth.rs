//! Session tokens.
//!
//! A player that has been issued a token must present it on every request.
//! Players without a token (guests) are accepted without one.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Issued session tokens, one per player.
#[derive(Debug, Default)]
pub struct SessionTokens {
    tokens: RwLock<HashMap<String, String>>,
}

impl SessionTokens {
    /// Creates an empty token table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for `player_id`, replacing any previous one.
    pub fn issue(&self, player_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .insert(player_id.to_string(), token.clone());
        token
    }

    /// Revokes the token for `player_id`.
    pub fn revoke(&self, player_id: &str) -> bool {
        self.tokens.write().remove(player_id).is_some()
    }

    /// Returns true if `token` is acceptable for `player_id`.
    pub fn validate(&self, player_id: &str, token: Option<&str>) -> bool {
        match self.tokens.read().get(player_id) {
            Some(expected) => token == Some(expected.as_str()),
            None => true,
        }
    }
}
