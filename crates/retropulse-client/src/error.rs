//! Client error taxonomy
//!
//! HTTP statuses from the server map onto the recoverable error kinds the
//! UI distinguishes: re-prompt on validation, disable controls on quota,
//! refetch on conflict, retry/rollback on network trouble.

use thiserror::Error;

/// Errors surfaced by the board client
#[derive(Error, Debug)]
pub enum ClientError {
    /// 400: bad input shape; recoverable by re-prompting the user
    #[error("validation rejected: {0}")]
    Validation(String),

    /// 403: caller does not own the card or board
    #[error("not owner: {0}")]
    NotOwner(String),

    /// 404: board or card is gone; recoverable by refetching state
    #[error("not found: {0}")]
    NotFound(String),

    /// 409: the board was closed (or the relationship conflicted) concurrently
    #[error("conflict: {0}")]
    Conflict(String),

    /// 429: server-enforced quota hit; the optimistic change rolls back
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// 5xx: server-side failure
    #[error("server error: {0}")]
    Server(String),

    /// Transport failure; recoverable via retry/rollback
    #[error("network error: {0}")]
    Network(String),

    /// The server sent a frame we could not decode
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Map an HTTP status and response body to the matching error kind
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => ClientError::Validation(body),
            403 => ClientError::NotOwner(body),
            404 => ClientError::NotFound(body),
            409 => ClientError::Conflict(body),
            429 => ClientError::QuotaExceeded(body),
            500..=599 => ClientError::Server(body),
            _ => ClientError::Server(format!("unexpected status {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ClientError::from_status(400, "bad".into()),
            ClientError::Validation(_)
        ));
        assert!(matches!(
            ClientError::from_status(403, "no".into()),
            ClientError::NotOwner(_)
        ));
        assert!(matches!(
            ClientError::from_status(404, "gone".into()),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            ClientError::from_status(409, "closed".into()),
            ClientError::Conflict(_)
        ));
        assert!(matches!(
            ClientError::from_status(429, "quota".into()),
            ClientError::QuotaExceeded(_)
        ));
        assert!(matches!(
            ClientError::from_status(503, "down".into()),
            ClientError::Server(_)
        ));
    }
}
