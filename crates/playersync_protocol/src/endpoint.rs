//! Endpoint paths and headers.
//!
//! Each player owns one account record:
//!
//! | method | path | body |
//! |---|---|---|
//! | `GET` | `/api/v1/players/{id}/account` | none; response is the full mapping |
//! | `POST` | `/api/v1/players/{id}/account` | mapping of changed keys |
//! | `POST` | `/api/v1/players/{id}/account/delete` | array of keys |

use crate::error::{ProtocolError, ProtocolResult};

/// Header carrying the backend API key.
pub const API_KEY_HEADER: &str = "x-functions-key";

/// Header carrying the player's session token.
pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// Content type of every request and response body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

const PLAYERS_PREFIX: &str = "/api/v1/players/";
const ACCOUNT_SUFFIX: &str = "/account";
const DELETE_SUFFIX: &str = "/account/delete";

/// A parsed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The player's account record (load or save).
    Account {
        /// Player id taken from the path.
        player_id: String,
    },
    /// Bulk key deletion for the player's record.
    DeleteKeys {
        /// Player id taken from the path.
        player_id: String,
    },
}

/// Checks that a player id can be used as a single path segment.
///
/// Only RFC 3986 unreserved characters are allowed, so ids never need
/// escaping.
pub fn validate_player_id(player_id: &str) -> ProtocolResult<()> {
    let ok = !player_id.is_empty()
        && player_id != "."
        && player_id != ".."
        && player_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));

    if ok {
        Ok(())
    } else {
        Err(ProtocolError::InvalidPlayerId(player_id.to_string()))
    }
}

/// Path of the account record for `player_id`.
pub fn account_path(player_id: &str) -> ProtocolResult<String> {
    validate_player_id(player_id)?;
    Ok(format!("{PLAYERS_PREFIX}{player_id}{ACCOUNT_SUFFIX}"))
}

/// Path of the bulk delete endpoint for `player_id`.
pub fn delete_path(player_id: &str) -> ProtocolResult<String> {
    validate_player_id(player_id)?;
    Ok(format!("{PLAYERS_PREFIX}{player_id}{DELETE_SUFFIX}"))
}

/// Parses a request path (without scheme, host or query) into a route.
pub fn parse_route(path: &str) -> Option<Route> {
    let path = path.split('?').next().unwrap_or(path);
    let rest = path.strip_prefix(PLAYERS_PREFIX)?;

    if let Some(player_id) = rest.strip_suffix(DELETE_SUFFIX) {
        validate_player_id(player_id).ok()?;
        return Some(Route::DeleteKeys {
            player_id: player_id.to_string(),
        });
    }

    let player_id = rest.strip_suffix(ACCOUNT_SUFFIX)?;
    validate_player_id(player_id).ok()?;
    Some(Route::Account {
        player_id: player_id.to_string(),
    })
}
