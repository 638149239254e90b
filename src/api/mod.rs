pub mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_api_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/api/conversations", post(create_conversation).get(list_conversations))
        .route("/api/conversations/{id}", get(get_conversation))
        .route("/api/conversations/{id}/thread", get(get_thread))
        .route("/api/messages", post(send_message).get(list_messages))
        .route("/api/messages/unread", get(get_unread))
        .route("/api/messages/{id}", put(edit_message).delete(delete_message))
        .route("/api/messages/{id}/history", get(get_history))
        .route("/api/messages/{id}/read", put(mark_read))
        .route("/api/notifications", get(get_notifications))
        .fallback(not_found)
        .with_state(state)
}
