//! RetroPulse Server - board API server
//!
//! HTTP/WebSocket server for retrospective boards. Every mutation runs
//! through the core reducer and, on success, broadcasts the event to the
//! board's subscribed sockets.

pub mod http;
pub mod websocket;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use retropulse_core::{
    Board, BoardEvent, BoardId, BoardState, CardId, EventEnvelope, QuotaLedger, RetroConfig,
};

/// Buffered events per board before slow sockets are disconnected
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One live board: replicated state, quota ledger, and the event fan-out
pub struct BoardRoom {
    pub state: BoardState,
    pub ledger: QuotaLedger,
    events: broadcast::Sender<EventEnvelope>,
}

impl BoardRoom {
    /// Create a room for a freshly created board
    pub fn new(board: Board, config: &RetroConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: BoardState::new(board),
            ledger: QuotaLedger::new(
                config.quotas.max_cards_per_user,
                config.quotas.max_reactions_per_user,
            ),
            events,
        }
    }

    /// Subscribe a socket to this room's events
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Broadcast an event to every subscribed socket, with anonymous card
    /// creators redacted. Send failures just mean nobody is listening.
    pub fn broadcast(&self, event: BoardEvent) {
        let envelope = EventEnvelope::new(self.state.board.id, redact_event(event));
        let _ = self.events.send(envelope);
    }
}

/// All live rooms plus the card-to-board index the `/v1/cards/{id}`
/// endpoints resolve through
#[derive(Default)]
pub struct Rooms {
    rooms: HashMap<BoardId, BoardRoom>,
    card_index: HashMap<CardId, BoardId>,
}

impl Rooms {
    /// Add a room
    pub fn insert(&mut self, room: BoardRoom) {
        self.rooms.insert(room.state.board.id, room);
    }

    /// Remove a room and its card index entries
    pub fn remove(&mut self, board_id: BoardId) -> Option<BoardRoom> {
        self.card_index.retain(|_, b| *b != board_id);
        self.rooms.remove(&board_id)
    }

    /// Get a room by board ID
    pub fn room(&self, board_id: BoardId) -> Option<&BoardRoom> {
        self.rooms.get(&board_id)
    }

    /// Get a mutable room by board ID
    pub fn room_mut(&mut self, board_id: BoardId) -> Option<&mut BoardRoom> {
        self.rooms.get_mut(&board_id)
    }

    /// Resolve the board a card lives on
    pub fn board_of_card(&self, card_id: CardId) -> Option<BoardId> {
        self.card_index.get(&card_id).copied()
    }

    /// Record which board a card lives on
    pub fn index_card(&mut self, card_id: CardId, board_id: BoardId) {
        self.card_index.insert(card_id, board_id);
    }

    /// Drop a card's index entry
    pub fn unindex_card(&mut self, card_id: CardId) {
        self.card_index.remove(&card_id);
    }

    /// Number of live rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Check if there are no rooms
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Mark participants idle once they have shown no activity for the
    /// given threshold
    pub fn sweep_idle(&mut self, threshold: chrono::Duration) -> usize {
        let mut swept = 0;
        for room in self.rooms.values_mut() {
            for participant in room.state.participants.values_mut() {
                if participant.should_be_idle(threshold) {
                    participant.mark_idle();
                    swept += 1;
                }
            }
        }
        swept
    }
}

/// Shared application state
pub struct AppState {
    pub config: RetroConfig,
    pub rooms: RwLock<Rooms>,
}

impl AppState {
    pub fn new(config: RetroConfig) -> Self {
        Self {
            config,
            rooms: RwLock::new(Rooms::default()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RetroConfig::default())
    }
}

/// Strip creator identity from anonymous cards before they go on the wire
fn redact_event(event: BoardEvent) -> BoardEvent {
    match event {
        BoardEvent::CardCreated { card } => BoardEvent::CardCreated {
            card: card.redacted(),
        },
        BoardEvent::CardUpdated { card } => BoardEvent::CardUpdated {
            card: card.redacted(),
        },
        other => other,
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Board endpoints
        .route("/v1/boards", post(http::create_board))
        .route("/v1/boards/{id}", get(http::get_board))
        .route("/v1/boards/{id}", put(http::rename_board))
        .route("/v1/boards/{id}", delete(http::delete_board))
        .route("/v1/boards/{id}/close", post(http::close_board))
        // Participant endpoints
        .route("/v1/boards/{id}/join", post(http::join_board))
        .route("/v1/boards/{id}/alias", put(http::change_alias))
        // Card endpoints
        .route("/v1/boards/{id}/cards", post(http::create_card))
        .route("/v1/cards/{id}", put(http::update_card))
        .route("/v1/cards/{id}", delete(http::delete_card))
        .route("/v1/cards/{id}/link", post(http::link_card))
        .route("/v1/cards/{id}/unlink", post(http::unlink_card))
        // Reaction endpoints
        .route("/cards/{id}/reactions", post(http::add_reaction))
        .route("/cards/{id}/reactions", delete(http::remove_reaction))
        // Quota endpoints
        .route("/v1/boards/{id}/cards/quota", get(http::card_quota))
        .route("/v1/boards/{id}/reactions/quota", get(http::reaction_quota))
        // WebSocket
        .route("/v1/boards/{id}/ws", get(websocket::ws_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Spawn the background task that marks inactive participants idle
pub fn spawn_idle_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let period = std::time::Duration::from_secs(u64::from(state.config.server.heartbeat_seconds));
    let threshold = chrono::Duration::seconds(i64::from(state.config.server.idle_after_seconds));
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        loop {
            tick.tick().await;
            let swept = state.rooms.write().await.sweep_idle(threshold);
            if swept > 0 {
                tracing::debug!(swept, "participants marked idle");
            }
        }
    })
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(Arc::clone(&state));
    spawn_idle_sweeper(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("RetroPulse server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
