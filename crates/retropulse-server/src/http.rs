//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use retropulse_collab::{Participant, Permissions};
use retropulse_core::{
    validation, Board, BoardError, BoardEvent, BoardId, BoardState, Card, CardId, CardType,
    ColumnId, LinkKind, QuotaKind, QuotaSnapshot, RelationshipError, RetroError,
};

use crate::{AppState, BoardRoom};

/// Header carrying the caller's opaque user hash
pub const USER_HEADER: &str = "x-retropulse-user";

/// Colors assigned to participants as they join
const PARTICIPANT_COLORS: &[&str] = &[
    "#E06C75", "#61AFEF", "#98C379", "#C678DD", "#E5C07B", "#56B6C2",
];

fn user_hash(headers: &HeaderMap) -> Result<String, (StatusCode, String)> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("missing {} header", USER_HEADER),
            )
        })
}

fn status_for(err: &RetroError) -> StatusCode {
    match err {
        RetroError::Validation(_) => StatusCode::BAD_REQUEST,
        RetroError::Relationship(_) => StatusCode::CONFLICT,
        RetroError::Quota(_) => StatusCode::TOO_MANY_REQUESTS,
        RetroError::Board(BoardError::UnknownColumn(_)) => StatusCode::BAD_REQUEST,
        RetroError::Board(_) => StatusCode::CONFLICT,
        RetroError::NotFound(_) => StatusCode::NOT_FOUND,
        RetroError::Sync(_) | RetroError::InvariantViolation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn reject(err: impl Into<RetroError>) -> (StatusCode, String) {
    let err = err.into();
    if matches!(err, RetroError::InvariantViolation(_)) {
        tracing::error!("invariant violation: {}", err);
    }
    (status_for(&err), err.to_string())
}

fn not_found(what: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("not found: {}", what))
}

fn forbidden(msg: &str) -> (StatusCode, String) {
    (StatusCode::FORBIDDEN, msg.to_string())
}

fn board_closed(board_id: BoardId) -> (StatusCode, String) {
    reject(BoardError::Closed(board_id))
}

/// Effective permissions of a user in a room: the board owner facilitates,
/// everyone else participates
fn permissions_for(room: &BoardRoom, user: &str) -> Permissions {
    if room.state.board.is_owned_by(user) {
        Permissions::FACILITATOR
    } else {
        Permissions::PARTICIPANT
    }
}

/// Snapshot with anonymous cards redacted for everyone but their creator
fn snapshot_for(state: &BoardState, user: &str) -> BoardState {
    let mut snapshot = state.clone();
    let redacted: Vec<Card> = snapshot
        .cards
        .iter()
        .filter(|c| c.is_anonymous && !c.is_owned_by(user))
        .map(Card::redacted)
        .collect();
    for card in redacted {
        snapshot.cards.insert(card);
    }
    snapshot
}

// ============================================================================
// Board Endpoints
// ============================================================================

/// Request to create a board
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    pub name: String,
    pub columns: Option<Vec<String>>,
}

/// Create a new board; the caller becomes its facilitator
pub async fn create_board(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<Board>), (StatusCode, String)> {
    let user = user_hash(&headers)?;
    validation::validate_board_name(&request.name).map_err(reject)?;

    let columns = request
        .columns
        .unwrap_or_else(|| state.config.boards.default_columns.clone());
    if columns.is_empty() || columns.len() > state.config.boards.max_columns as usize {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "a board needs between 1 and {} columns",
                state.config.boards.max_columns
            ),
        ));
    }
    for name in &columns {
        validation::validate_column_name(name).map_err(reject)?;
    }

    let board = Board::new(request.name, user, columns);
    let response = board.clone();

    let mut rooms = state.rooms.write().await;
    rooms.insert(BoardRoom::new(board, &state.config));
    tracing::info!(board = %response.id, "board created");

    Ok((StatusCode::CREATED, Json(response)))
}

/// Full board snapshot: the fetch half of every (re)connection
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<BoardState>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;

    let rooms = state.rooms.read().await;
    let room = rooms.room(board_id).ok_or_else(|| not_found(board_id))?;
    Ok(Json(snapshot_for(&room.state, &user)))
}

/// Request to rename a board
#[derive(Debug, Deserialize)]
pub struct RenameBoardRequest {
    pub name: String,
}

/// Rename a board (facilitator only)
pub async fn rename_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RenameBoardRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;
    validation::validate_board_name(&request.name).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !permissions_for(room, &user).is_admin() {
        return Err(forbidden("only the facilitator can rename the board"));
    }
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    let event = BoardEvent::BoardRenamed {
        name: request.name.clone(),
    };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);

    Ok(Json(serde_json::json!({
        "success": true,
        "boardId": board_id,
        "name": request.name
    })))
}

/// Close a board (facilitator only); all mutating operations reject afterwards
pub async fn close_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !permissions_for(room, &user).is_admin() {
        return Err(forbidden("only the facilitator can close the board"));
    }
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    room.state.apply(&BoardEvent::BoardClosed).map_err(reject)?;
    room.broadcast(BoardEvent::BoardClosed);
    tracing::info!(board = %board_id, "board closed");

    Ok(Json(serde_json::json!({
        "success": true,
        "boardId": board_id,
        "phase": "closed"
    })))
}

/// Delete a board and everything on it (facilitator only)
pub async fn delete_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    {
        let room = rooms.room(board_id).ok_or_else(|| not_found(board_id))?;
        if !permissions_for(room, &user).is_admin() {
            return Err(forbidden("only the facilitator can delete the board"));
        }
        // Let connected clients disable their controls before the room goes
        room.broadcast(BoardEvent::BoardClosed);
    }
    rooms.remove(board_id);
    tracing::info!(board = %board_id, "board deleted");

    Ok(Json(serde_json::json!({
        "success": true,
        "boardId": board_id
    })))
}

// ============================================================================
// Participant Endpoints
// ============================================================================

/// Request to join a board
#[derive(Debug, Deserialize)]
pub struct JoinBoardRequest {
    pub alias: String,
}

/// Join a board under an alias
pub async fn join_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<JoinBoardRequest>,
) -> Result<(StatusCode, Json<Participant>), (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;
    validation::validate_alias(&request.alias).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;

    let color = PARTICIPANT_COLORS[room.state.participants.len() % PARTICIPANT_COLORS.len()];
    let participant = Participant::new(user, request.alias.trim(), board_id.to_string())
        .with_color(color);

    let event = BoardEvent::UserJoined {
        participant: participant.clone(),
    };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);

    Ok((StatusCode::CREATED, Json(participant)))
}

/// Request to change an alias
#[derive(Debug, Deserialize)]
pub struct ChangeAliasRequest {
    pub alias: String,
}

/// Change the caller's alias on a board
pub async fn change_alias(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ChangeAliasRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;
    validation::validate_alias(&request.alias).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.participants.contains_key(&user) {
        return Err(not_found(format!("participant on board {}", board_id)));
    }

    let event = BoardEvent::UserAliasChanged {
        user_hash: user,
        alias: request.alias.trim().to_string(),
    };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);

    Ok(Json(serde_json::json!({
        "success": true,
        "alias": request.alias.trim()
    })))
}

// ============================================================================
// Card Endpoints
// ============================================================================

/// Request to create a card
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    /// Client-generated ID, so the optimistic insert and the confirmed
    /// entity share one; omitted means the server assigns it
    pub id: Option<CardId>,
    pub content: String,
    pub card_type: CardType,
    pub column_id: ColumnId,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Create a card on a board
pub async fn create_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;
    validation::validate_card_content(&request.content).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }
    if !room.state.board.has_column(request.column_id) {
        return Err(reject(BoardError::UnknownColumn(
            request.column_id.to_string(),
        )));
    }
    if let Some(id) = request.id {
        if room.state.cards.contains(id) {
            return Err((StatusCode::CONFLICT, format!("card {} already exists", id)));
        }
    }
    room.ledger.charge(QuotaKind::Cards, &user).map_err(reject)?;

    let mut card = Card::new(
        board_id,
        request.column_id,
        request.content,
        request.card_type,
        user,
        request.is_anonymous,
    );
    if let Some(id) = request.id {
        card.id = id;
    }
    card.version = 1;

    let event = BoardEvent::CardCreated { card: card.clone() };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);
    rooms.index_card(card.id, board_id);

    Ok((StatusCode::CREATED, Json(card)))
}

fn locate_card(
    rooms: &crate::Rooms,
    card_id: CardId,
) -> Result<BoardId, (StatusCode, String)> {
    rooms.board_of_card(card_id).ok_or_else(|| not_found(card_id))
}

/// Request to update a card
#[derive(Debug, Deserialize)]
pub struct UpdateCardRequest {
    pub content: String,
}

/// Edit a card's content (creator or facilitator)
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateCardRequest>,
) -> Result<Json<Card>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let card_id = CardId::parse(&id).map_err(reject)?;
    validation::validate_card_content(&request.content).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let board_id = locate_card(&rooms, card_id)?;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    let existing = room.state.cards.get(card_id).ok_or_else(|| not_found(card_id))?;
    if !existing.is_owned_by(&user) && !permissions_for(room, &user).can_moderate() {
        return Err(forbidden("only the creator can edit this card"));
    }

    let mut updated = existing.clone();
    updated.content = request.content;
    updated.bump();

    let event = BoardEvent::CardUpdated {
        card: updated.clone(),
    };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);

    // A facilitator editing someone's anonymous card still must not see
    // the creator
    let response = if updated.is_owned_by(&user) {
        updated
    } else {
        updated.redacted()
    };
    Ok(Json(response))
}

/// Delete a card (creator or facilitator). Children are orphaned, never
/// deleted with their parent.
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let card_id = CardId::parse(&id).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let board_id = locate_card(&rooms, card_id)?;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    let card = room.state.cards.get(card_id).ok_or_else(|| not_found(card_id))?;
    if !card.is_owned_by(&user) && !permissions_for(room, &user).can_moderate() {
        return Err(forbidden("only the creator can delete this card"));
    }
    let creator = card.created_by_hash.clone();

    let event = BoardEvent::CardDeleted { card_id };
    room.state.apply(&event).map_err(reject)?;
    if let Some(creator) = creator {
        room.ledger.release(QuotaKind::Cards, &creator);
    }
    room.broadcast(event);
    rooms.unindex_card(card_id);

    Ok(Json(serde_json::json!({
        "success": true,
        "cardId": card_id
    })))
}

/// Request to link a card
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub target_card_id: CardId,
    pub link_type: LinkKind,
}

/// Link a card under/to another card
pub async fn link_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<LinkRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let _ = user_hash(&headers)?;
    let source_id = CardId::parse(&id).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let board_id = locate_card(&rooms, source_id)?;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    // Surface the specific violated rule rather than a generic failure
    retropulse_core::relationship::check_link(
        &room.state.cards,
        source_id,
        request.target_card_id,
        request.link_type,
    )
    .map_err(reject)?;

    let event = BoardEvent::CardLinked {
        source_id,
        target_id: request.target_card_id,
        link_kind: request.link_type,
    };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);

    Ok(Json(serde_json::json!({
        "success": true,
        "sourceId": source_id,
        "targetId": request.target_card_id,
        "linkType": request.link_type
    })))
}

/// Request to unlink a card
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkRequest {
    pub link_type: LinkKind,
}

/// Remove a card's link. A dedicated POST endpoint because several HTTP
/// client/browser combinations silently drop bodies on DELETE.
pub async fn unlink_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UnlinkRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let _ = user_hash(&headers)?;
    let card_id = CardId::parse(&id).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let board_id = locate_card(&rooms, card_id)?;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    // Distinguish "nothing to unlink" from success for the caller
    let card = room.state.cards.get(card_id).ok_or_else(|| not_found(card_id))?;
    let linked = match request.link_type {
        LinkKind::ParentChild => card.parent_card_id.is_some(),
        LinkKind::ActionFeedback => card.linked_feedback_id.is_some(),
    };
    if !linked {
        return Err(reject(RelationshipError::NotLinked(card_id)));
    }

    let event = BoardEvent::CardUnlinked {
        card_id,
        link_kind: request.link_type,
    };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);

    Ok(Json(serde_json::json!({
        "success": true,
        "cardId": card_id,
        "linkType": request.link_type
    })))
}

// ============================================================================
// Reaction Endpoints
// ============================================================================

/// Add a reaction to a card
pub async fn add_reaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let card_id = CardId::parse(&id).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let board_id = locate_card(&rooms, card_id)?;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    let card = room.state.cards.get(card_id).ok_or_else(|| not_found(card_id))?;
    let version = card.version + 1;
    room.ledger.charge(QuotaKind::Reactions, &user).map_err(reject)?;

    let event = BoardEvent::ReactionAdded { card_id, version };
    room.state.apply(&event).map_err(reject)?;
    room.broadcast(event);

    let card = room.state.cards.get(card_id).ok_or_else(|| not_found(card_id))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "cardId": card_id,
        "directReactionCount": card.direct_reaction_count,
        "aggregatedReactionCount": card.aggregated_reaction_count,
        "version": card.version
    })))
}

/// Remove a reaction from a card
pub async fn remove_reaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let card_id = CardId::parse(&id).map_err(reject)?;

    let mut rooms = state.rooms.write().await;
    let board_id = locate_card(&rooms, card_id)?;
    let room = rooms.room_mut(board_id).ok_or_else(|| not_found(board_id))?;
    if !room.state.board.phase.is_mutable() {
        return Err(board_closed(board_id));
    }

    let card = room.state.cards.get(card_id).ok_or_else(|| not_found(card_id))?;
    if card.direct_reaction_count == 0 {
        return Err((
            StatusCode::CONFLICT,
            format!("card {} has no reactions", card_id),
        ));
    }
    let version = card.version + 1;

    let event = BoardEvent::ReactionRemoved { card_id, version };
    room.state.apply(&event).map_err(reject)?;
    room.ledger.release(QuotaKind::Reactions, &user);
    room.broadcast(event);

    let card = room.state.cards.get(card_id).ok_or_else(|| not_found(card_id))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "cardId": card_id,
        "directReactionCount": card.direct_reaction_count,
        "aggregatedReactionCount": card.aggregated_reaction_count,
        "version": card.version
    })))
}

// ============================================================================
// Quota Endpoints
// ============================================================================

/// Response for quota readings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub board_id: BoardId,
    pub kind: QuotaKind,
    #[serde(flatten)]
    pub snapshot: QuotaSnapshot,
}

async fn quota(
    state: Arc<AppState>,
    id: String,
    headers: HeaderMap,
    kind: QuotaKind,
) -> Result<Json<QuotaResponse>, (StatusCode, String)> {
    let user = user_hash(&headers)?;
    let board_id = BoardId::parse(&id).map_err(reject)?;

    let rooms = state.rooms.read().await;
    let room = rooms.room(board_id).ok_or_else(|| not_found(board_id))?;
    Ok(Json(QuotaResponse {
        board_id,
        kind,
        snapshot: room.ledger.snapshot(kind, &user),
    }))
}

/// The caller's card-creation quota on a board
pub async fn card_quota(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<QuotaResponse>, (StatusCode, String)> {
    quota(state, id, headers, QuotaKind::Cards).await
}

/// The caller's reaction quota on a board
pub async fn reaction_quota(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<QuotaResponse>, (StatusCode, String)> {
    quota(state, id, headers, QuotaKind::Reactions).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use retropulse_core::{QuotaError, ValidationError};

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            status_for(&ValidationError::ContentEmpty.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&RelationshipError::NotLinked(CardId::new()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(
                &QuotaError::Exceeded {
                    kind: QuotaKind::Cards,
                    limit: 5
                }
                .into()
            ),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&BoardError::Closed(BoardId::new()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&BoardError::UnknownColumn("c".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&RetroError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&RetroError::InvariantViolation("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn user_header_required() {
        let headers = HeaderMap::new();
        assert!(user_hash(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, "hash-1".parse().unwrap());
        assert_eq!(user_hash(&headers).unwrap(), "hash-1");
    }

    #[test]
    fn snapshot_redacts_for_non_creators() {
        let board = Board::new("Retro", "owner", vec!["Col".into()]);
        let column = board.columns[0].id;
        let board_id = board.id;
        let mut state = BoardState::new(board);

        let mut anon = Card::new(board_id, column, "anon", CardType::Feedback, "alice", true);
        anon.version = 1;
        let named = Card::new(board_id, column, "named", CardType::Feedback, "alice", false);
        let (anon_id, named_id) = (anon.id, named.id);
        state.cards.insert(anon);
        state.cards.insert(named.clone());

        let for_bob = snapshot_for(&state, "bob");
        assert_eq!(for_bob.cards.get(anon_id).unwrap().created_by_hash, None);
        assert_eq!(
            for_bob.cards.get(named_id).unwrap().created_by_hash,
            Some("alice".to_string())
        );

        // The creator still sees their own anonymous card
        let for_alice = snapshot_for(&state, "alice");
        assert_eq!(
            for_alice.cards.get(anon_id).unwrap().created_by_hash,
            Some("alice".to_string())
        );
    }
}
