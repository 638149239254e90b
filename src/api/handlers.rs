use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::request::Principal;
use crate::http::server::AppState;
use crate::messaging::{
    Conversation, Message, MessageEditEvent, MessageFilter, NewMessage, Notification, PageRequest,
    Paginated, ThreadedMessage,
};

/// The authenticated caller. Rejects with 401 when the request is anonymous.
pub struct CurrentUser(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversation {
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessage {
    pub body: String,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "detail": "Not found." })),
    )
}

pub async fn create_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateConversation>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let conversation = state.messages.create_conversation(&user.id, req.participants)?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(state.messages.conversations_for(&user.id)?))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.messages.conversation(id, &user.id)?))
}

pub async fn get_thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ThreadedMessage>>, ApiError> {
    Ok(Json(state.messages.thread(id, &user.id)?))
}

pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<MessageFilter>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Paginated<Message>>, ApiError> {
    Ok(Json(state.messages.list_messages(&user.id, &filter, page)?))
}

pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state.messages.send(&user.id, req)?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn edit_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<EditMessage>,
) -> Result<Json<Message>, ApiError> {
    Ok(Json(state.messages.edit(id, &user.id, req.body)?))
}

pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.messages.delete(id, &user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageEditEvent>>, ApiError> {
    Ok(Json(state.messages.history(id, &user.id)?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    Ok(Json(state.messages.mark_read(id, &user.id)?))
}

pub async fn get_unread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.messages.unread_for(&user.id)?))
}

pub async fn get_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.messages.notifications_for(&user.id)?))
}
