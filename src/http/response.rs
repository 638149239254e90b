//! Outcome types produced by the gate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// A terminal rejection: status plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub status: StatusCode,
    pub reason: String,
}

impl Denial {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            reason: reason.into(),
        }
    }

    pub fn too_many_requests(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            reason: reason.into(),
        }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.reason })),
        )
            .into_response()
    }
}

/// One stage's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Deny(Denial),
}

/// The outcome of a whole pipeline run.
#[derive(Debug)]
pub enum RequestDecision<R> {
    /// Every stage passed; carries the handler's response.
    Allowed(R),
    Denied(Denial),
}

impl<R> RequestDecision<R> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RequestDecision::Allowed(_))
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            RequestDecision::Allowed(_) => None,
            RequestDecision::Denied(denial) => Some(denial),
        }
    }
}

impl<R: IntoResponse> IntoResponse for RequestDecision<R> {
    fn into_response(self) -> Response {
        match self {
            RequestDecision::Allowed(inner) => inner.into_response(),
            RequestDecision::Denied(denial) => denial.into_response(),
        }
    }
}
