use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::messaging::ServiceError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Service(service) => match service {
                ServiceError::NotFound(_)
                | ServiceError::ConversationNotFound(_)
                | ServiceError::InvalidPage => StatusCode::NOT_FOUND,
                ServiceError::NotParticipant { .. } | ServiceError::NotInConversation { .. } => {
                    StatusCode::FORBIDDEN
                }
                ServiceError::EmptyBody
                | ServiceError::TooFewParticipants
                | ServiceError::MissingConversation
                | ServiceError::InvalidReceiver(_)
                | ServiceError::InvalidParent(_) => StatusCode::BAD_REQUEST,
                ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}
