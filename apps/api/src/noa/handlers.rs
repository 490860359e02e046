//! Axum route handlers for the NOA API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::noa::models::{ChatMessage, Recommendation};
use crate::noa::recommender::{answer_dialogue, recommend, refine, start_dialogue};
use crate::noa::sessions::SessionView;
use crate::noa::validation::{
    validate_history, validate_message, validate_scenario, MAX_CONVERSATION_HISTORY_LENGTH,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub scenario: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub original_scenario: String,
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendation: Recommendation,
    pub raw_response: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    #[serde(flatten)]
    pub session: SessionView,
    pub raw_response: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Stateless handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/noa/recommend
///
/// First-pass recommendation for a scenario. Nothing is kept server-side.
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    let scenario = validate_scenario("scenario", &request.scenario)?;
    let reply = recommend(state.llm.as_ref(), &scenario).await?;

    Ok(Json(RecommendResponse {
        recommendation: reply.extraction.recommendation,
        raw_response: reply.raw,
    }))
}

/// POST /api/v1/noa/chat
///
/// Updated recommendation from a caller-held scenario and conversation history.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    let scenario = validate_scenario("original_scenario", &request.original_scenario)?;
    let history = validate_history(&request.conversation_history)?;
    let reply = refine(state.llm.as_ref(), &scenario, &history).await?;

    Ok(Json(RecommendResponse {
        recommendation: reply.extraction.recommendation,
        raw_response: reply.raw,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Session handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Runs the first pass and opens a session only if it succeeds.
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<(StatusCode, Json<TurnResponse>), AppError> {
    let scenario = validate_scenario("scenario", &request.scenario)?;
    let (cursor, _turn, reply) = start_dialogue(state.llm.as_ref(), &scenario).await?;
    let session = state.sessions.insert(cursor).await;

    Ok((
        StatusCode::CREATED,
        Json(TurnResponse {
            session,
            raw_response: reply.raw,
        }),
    ))
}

/// POST /api/v1/sessions/:id/scenario
///
/// Discards the session's conversation and runs a first pass on the new scenario.
/// A failed first pass leaves the session with no scenario.
pub async fn handle_submit_scenario(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let scenario = validate_scenario("scenario", &request.scenario)?;
    let claim = state.sessions.begin_turn(session_id).await?;
    claim.discard_cursor().await;

    let (cursor, _turn, reply) = start_dialogue(state.llm.as_ref(), &scenario).await?;
    let session = claim.commit(cursor).await?;

    Ok(Json(TurnResponse {
        session,
        raw_response: reply.raw,
    }))
}

/// POST /api/v1/sessions/:id/answer
///
/// Answers the pending question and returns the refreshed recommendation.
pub async fn handle_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let message = validate_message("message", &request.message)?;
    let claim = state.sessions.begin_turn(session_id).await?;

    let cursor = claim.cursor().await.ok_or_else(|| {
        AppError::Conflict(format!("Session {session_id} has no active scenario"))
    })?;
    if cursor.history().len() >= MAX_CONVERSATION_HISTORY_LENGTH {
        return Err(AppError::Validation(format!(
            "conversation_history: cannot exceed {MAX_CONVERSATION_HISTORY_LENGTH} messages"
        )));
    }

    let (next, _turn, reply) = answer_dialogue(state.llm.as_ref(), &cursor, &message).await?;
    let session = claim.commit(next).await?;

    Ok(Json(TurnResponse {
        session,
        raw_response: reply.raw,
    }))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(session.view().await))
}

/// DELETE /api/v1/sessions/:id
///
/// Discards the scenario, questions and history unconditionally.
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.reset(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
