//! Board client: REST calls plus the WebSocket event loop.
//!
//! The reconnection contract is fetch-then-resubscribe: the socket is
//! opened first so no event is missed, the session enters its fetch window
//! (discarding deltas), the snapshot is fetched and installed, and only
//! then do events apply. Dropping the returned future cancels the
//! subscription, which is how navigating away from a board unsubscribes.

use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use retropulse_core::{
    BoardId, BoardState, Card, CardId, CardType, ColumnId, ConnectionPhase, EventEnvelope,
    LinkKind, QuotaKind, QuotaSnapshot, SyncSession,
};

use crate::error::ClientError;

/// Default timeout for REST calls
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper bound for the reconnect backoff
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Header carrying the caller's opaque user hash
const USER_HEADER: &str = "x-retropulse-user";

/// Client for one RetroPulse server.
pub struct BoardClient {
    http: reqwest::Client,
    base_url: String,
    user_hash: String,
}

impl BoardClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:8080`),
    /// acting as the given user.
    pub fn new(
        base_url: impl Into<String>,
        user_hash: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_hash: user_hash.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ws_url(&self, board_id: BoardId) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/v1/boards/{}/ws", ws_base, board_id)
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Fetch the full board state (board, cards, participants)
    pub async fn fetch_snapshot(&self, board_id: BoardId) -> Result<BoardState, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/boards/{}", board_id)))
            .header(USER_HEADER, &self.user_hash)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Fetch the caller's quota reading for a board
    pub async fn fetch_quota(
        &self,
        board_id: BoardId,
        kind: QuotaKind,
    ) -> Result<QuotaSnapshot, ClientError> {
        let segment = match kind {
            QuotaKind::Cards => "cards",
            QuotaKind::Reactions => "reactions",
        };
        let response = self
            .http
            .get(self.url(&format!("/v1/boards/{}/{}/quota", board_id, segment)))
            .header(USER_HEADER, &self.user_hash)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Create a card, returning the server-confirmed entity
    pub async fn create_card(
        &self,
        board_id: BoardId,
        column_id: ColumnId,
        content: &str,
        card_type: CardType,
        is_anonymous: bool,
    ) -> Result<Card, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/v1/boards/{}/cards", board_id)))
            .header(USER_HEADER, &self.user_hash)
            .json(&serde_json::json!({
                "content": content,
                "cardType": card_type,
                "columnId": column_id,
                "isAnonymous": is_anonymous,
            }))
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Delete a card
    pub async fn delete_card(&self, card_id: CardId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/v1/cards/{}", card_id)))
            .header(USER_HEADER, &self.user_hash)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(())
    }

    /// Link a card under/to another card
    pub async fn link_cards(
        &self,
        source_id: CardId,
        target_id: CardId,
        link_kind: LinkKind,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/v1/cards/{}/link", source_id)))
            .header(USER_HEADER, &self.user_hash)
            .json(&serde_json::json!({
                "targetCardId": target_id,
                "linkType": link_kind,
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(())
    }

    /// Remove a card's link. A dedicated POST endpoint: several HTTP
    /// client/browser combinations silently drop bodies on DELETE.
    pub async fn unlink_card(
        &self,
        card_id: CardId,
        link_kind: LinkKind,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/v1/cards/{}/unlink", card_id)))
            .header(USER_HEADER, &self.user_hash)
            .json(&serde_json::json!({ "linkType": link_kind }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(())
    }

    /// Add a reaction to a card
    pub async fn add_reaction(&self, card_id: CardId) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/cards/{}/reactions", card_id)))
            .header(USER_HEADER, &self.user_hash)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(())
    }

    /// Remove a reaction from a card
    pub async fn remove_reaction(&self, card_id: CardId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/cards/{}/reactions", card_id)))
            .header(USER_HEADER, &self.user_hash)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(())
    }

    /// One connect cycle: subscribe, fetch, go live, apply events until the
    /// socket closes. Returns `Ok(())` on a clean close.
    pub async fn run(
        &self,
        board_id: BoardId,
        session: &mut SyncSession,
    ) -> Result<(), ClientError> {
        let (ws_stream, _) = connect_async(self.ws_url(board_id)).await?;
        let (_write, mut read) = ws_stream.split();

        session.begin_fetch();
        let mut fetch = Box::pin(self.fetch_snapshot(board_id));

        loop {
            tokio::select! {
                snapshot = &mut fetch, if session.phase() == ConnectionPhase::Fetching => {
                    session.install_snapshot(snapshot?);
                    tracing::info!(board = %board_id, "snapshot installed, session live");
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let envelope: EventEnvelope = match serde_json::from_str(&text) {
                            Ok(envelope) => envelope,
                            Err(e) => {
                                tracing::warn!("undecodable event frame: {}", e);
                                continue;
                            }
                        };
                        match session.handle_remote(&envelope) {
                            Ok(applied) => {
                                tracing::debug!(
                                    event = envelope.event.name(),
                                    id = %envelope.event_id,
                                    ?applied,
                                    "event"
                                );
                            }
                            Err(e) if session.phase() == ConnectionPhase::Fetching => {
                                // Invariant violation: the session flipped back
                                // to its fetch window; self-heal with a refetch
                                tracing::error!("state diverged, refetching: {}", e);
                                fetch = Box::pin(self.fetch_snapshot(board_id));
                            }
                            Err(e) => {
                                tracing::warn!("event rejected: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        session.disconnect();
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        session.disconnect();
                        return Err(e.into());
                    }
                },
            }
        }
    }

    /// Run the session until cancelled, reconnecting with capped
    /// exponential backoff after drops. Each reconnect re-runs the
    /// fetch-then-resubscribe cycle.
    pub async fn run_with_reconnect(
        &self,
        board_id: BoardId,
        session: &mut SyncSession,
    ) -> Result<(), ClientError> {
        let mut backoff = Duration::from_secs(1);
        loop {
            match self.run(board_id, session).await {
                Ok(()) => {
                    backoff = Duration::from_secs(1);
                }
                Err(ClientError::Network(e)) => {
                    tracing::warn!("connection lost ({}), retrying in {:?}", e, backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                // Anything other than a transport failure will not heal by
                // retrying (board deleted, access revoked)
                Err(e) => return Err(e),
            }
            tokio::time::sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_scheme_rewrite() {
        let client = BoardClient::new("http://localhost:8080", "user").unwrap();
        let board_id = BoardId::new();
        assert_eq!(
            client.ws_url(board_id),
            format!("ws://localhost:8080/v1/boards/{}/ws", board_id)
        );

        let client = BoardClient::new("https://retro.example.com/", "user").unwrap();
        assert!(client.ws_url(board_id).starts_with("wss://retro.example.com"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BoardClient::new("http://localhost:8080///", "user").unwrap();
        assert_eq!(client.url("/v1/boards"), "http://localhost:8080/v1/boards");
    }
}
