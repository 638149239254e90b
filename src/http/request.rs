//! Framework-neutral request descriptor seen by the gate stages.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, Request};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Header carrying the authenticated user id, set by the fronting auth proxy.
pub const X_USER_ID: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const X_USER_ROLE: &str = "x-user-role";

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }

    /// Read the principal from the identity headers. A missing or empty user id
    /// means the request is anonymous; a missing role is kept as an empty role.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let id = header_str(headers, X_USER_ID)?;
        if id.is_empty() {
            return None;
        }
        let role = header_str(headers, X_USER_ROLE).unwrap_or_default();
        Some(Self::new(id, role))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Everything a stage may look at. Stamped once on arrival.
#[derive(Debug, Clone)]
pub struct GateRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub peer: Option<SocketAddr>,
    pub principal: Option<Principal>,
    pub received_at: NaiveDateTime,
}

impl GateRequest {
    pub fn new(method: Method, path: impl Into<String>, received_at: NaiveDateTime) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            peer: None,
            principal: None,
            received_at,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Describe an axum request. The principal is taken from request extensions.
    pub fn from_http<B>(req: &Request<B>, peer: Option<SocketAddr>, received_at: NaiveDateTime) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            headers: req.headers().clone(),
            peer,
            principal: req.extensions().get::<Principal>().cloned(),
            received_at,
        }
    }
}
