//! Player identity carried in the session bearer token.
//!
//! The token is opaque to the client: its payload segment is decoded for
//! display and message attribution only. Nothing is verified.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Token is not a three-part bearer token")]
    MalformedToken,
    #[error("Token payload is not base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Token payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Token payload has an empty player id")]
    MissingPlayerId,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Who this client is, as far as the server's token says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    #[serde(alias = "sub")]
    pub player_id: String,
    #[serde(default)]
    pub nickname: String,
}

impl SessionIdentity {
    pub fn new(player_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            nickname: nickname.into(),
        }
    }

    /// Decode the unverified payload of `header.payload.signature`.
    /// A leading `Bearer ` is ignored.
    pub fn from_token(token: &str) -> SessionResult<Self> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        let mut parts = token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
            _ => return Err(SessionError::MalformedToken),
        };

        let trimmed = payload.trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .or_else(|_| STANDARD_NO_PAD.decode(trimmed))?;
        let identity: SessionIdentity = serde_json::from_slice(&bytes)?;
        if identity.player_id.is_empty() {
            return Err(SessionError::MissingPlayerId);
        }
        Ok(identity)
    }

    /// Name to show next to this player's messages.
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.player_id
        } else {
            &self.nickname
        }
    }
}
