//! Pipeline stages.

use axum::http::Method;
use thiserror::Error;

use crate::http::request::GateRequest;
use crate::http::response::{Denial, Verdict};
use crate::observability::RequestLogger;
use crate::security::role::ROLE_DENIED_REASON;
use crate::security::{client_identity, Admission, RoleAuthorizer, SlidingWindowRateLimiter, TimeOfDayGate};

pub const RATE_LIMIT_REASON: &str =
    "Message limit exceeded. Please wait before sending more messages.";

/// Unexpected fault inside a stage. Surfaces as a 500 for that one request.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("stage {stage} failed: {message}")]
    Stage { stage: &'static str, message: String },
}

/// One link of the request pipeline.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Either let the request continue or deny it. Denials are verdicts, not errors.
    fn evaluate(&self, req: &GateRequest) -> Result<Verdict, GateError>;
}

/// Records every request that reaches it.
pub struct LoggerStage {
    logger: RequestLogger,
}

impl LoggerStage {
    pub fn new(logger: RequestLogger) -> Self {
        Self { logger }
    }
}

impl Stage for LoggerStage {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn evaluate(&self, req: &GateRequest) -> Result<Verdict, GateError> {
        self.logger
            .log(req.received_at, req.principal.as_ref(), &req.path);
        Ok(Verdict::Continue)
    }
}

pub struct TimeGateStage {
    gate: TimeOfDayGate,
}

impl TimeGateStage {
    pub fn new(gate: TimeOfDayGate) -> Self {
        Self { gate }
    }
}

impl Stage for TimeGateStage {
    fn name(&self) -> &'static str {
        "time_gate"
    }

    fn evaluate(&self, req: &GateRequest) -> Result<Verdict, GateError> {
        if self.gate.allows(req.received_at) {
            Ok(Verdict::Continue)
        } else {
            Ok(Verdict::Deny(Denial::forbidden(self.gate.denial_reason())))
        }
    }
}

pub struct RoleStage {
    authorizer: RoleAuthorizer,
}

impl RoleStage {
    pub fn new(authorizer: RoleAuthorizer) -> Self {
        Self { authorizer }
    }
}

impl Stage for RoleStage {
    fn name(&self) -> &'static str {
        "role"
    }

    fn evaluate(&self, req: &GateRequest) -> Result<Verdict, GateError> {
        if self.authorizer.allows(req.principal.as_ref()) {
            Ok(Verdict::Continue)
        } else {
            Ok(Verdict::Deny(Denial::forbidden(ROLE_DENIED_REASON)))
        }
    }
}

/// Which requests count against the rate limit.
#[derive(Debug, Clone)]
pub struct RateLimitTrigger {
    methods: Vec<Method>,
    path_prefix: String,
}

impl RateLimitTrigger {
    pub fn new(methods: Vec<Method>, path_prefix: impl Into<String>) -> Self {
        Self {
            methods,
            path_prefix: path_prefix.into(),
        }
    }

    pub fn matches(&self, req: &GateRequest) -> bool {
        self.methods.contains(&req.method) && self.covers(&req.path)
    }

    /// The prefix itself or anything below it, on segment boundaries.
    fn covers(&self, path: &str) -> bool {
        match path.strip_prefix(self.path_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.path_prefix.ends_with('/'),
            None => false,
        }
    }
}

pub struct RateLimitStage {
    limiter: SlidingWindowRateLimiter,
    trigger: RateLimitTrigger,
}

impl RateLimitStage {
    pub fn new(limiter: SlidingWindowRateLimiter, trigger: RateLimitTrigger) -> Self {
        Self { limiter, trigger }
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn evaluate(&self, req: &GateRequest) -> Result<Verdict, GateError> {
        if !self.trigger.matches(req) {
            return Ok(Verdict::Continue);
        }

        let client = client_identity(&req.headers, req.peer);
        match self.limiter.admit(&client, req.received_at) {
            Admission::Allowed => Ok(Verdict::Continue),
            Admission::Denied => {
                tracing::warn!(
                    client = %client,
                    limit = self.limiter.limit(),
                    window_secs = self.limiter.window().num_seconds(),
                    "Rate limit exceeded"
                );
                Ok(Verdict::Deny(Denial::too_many_requests(RATE_LIMIT_REASON)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Principal;
    use crate::observability::MemorySink;
    use crate::security::ClientWindows;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
    use std::sync::Arc;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn post(path: &str) -> GateRequest {
        GateRequest::new(Method::POST, path, at(19, 0)).with_peer("192.0.2.1:4000".parse().unwrap())
    }

    fn rate_stage(limit: usize) -> RateLimitStage {
        RateLimitStage::new(
            SlidingWindowRateLimiter::new(limit, TimeDelta::seconds(60), ClientWindows::new()),
            RateLimitTrigger::new(vec![Method::POST], "/api/messages"),
        )
    }

    #[test]
    fn test_logger_stage_always_continues() {
        let sink = Arc::new(MemorySink::new());
        let stage = LoggerStage::new(RequestLogger::new(sink.clone()));
        let req = post("/x").with_principal(Principal::new("carol", "guest"));
        assert_eq!(stage.evaluate(&req).unwrap(), Verdict::Continue);
        assert!(sink.lines()[0].contains("User: carol - Path: /x"));
    }

    #[test]
    fn test_time_gate_stage_denies_with_403() {
        let stage = TimeGateStage::new(TimeOfDayGate::new(
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        ));
        let mut req = post("/api/messages");
        assert_eq!(stage.evaluate(&req).unwrap(), Verdict::Continue);

        req.received_at = at(8, 0);
        match stage.evaluate(&req).unwrap() {
            Verdict::Deny(denial) => assert_eq!(denial.status, StatusCode::FORBIDDEN),
            Verdict::Continue => panic!("expected denial"),
        }
    }

    #[test]
    fn test_role_stage_message() {
        let stage = RoleStage::new(RoleAuthorizer::new(["admin"]));
        let req = post("/").with_principal(Principal::new("g", "guest"));
        assert_eq!(
            stage.evaluate(&req).unwrap(),
            Verdict::Deny(Denial::forbidden(ROLE_DENIED_REASON))
        );
    }

    #[test]
    fn test_rate_limit_only_counts_qualifying_requests() {
        let stage = rate_stage(1);
        let get = GateRequest::new(Method::GET, "/api/messages", at(19, 0));
        for _ in 0..3 {
            assert_eq!(stage.evaluate(&get).unwrap(), Verdict::Continue);
        }
        assert_eq!(stage.evaluate(&post("/status")).unwrap(), Verdict::Continue);
        assert_eq!(stage.evaluate(&post("/api/messages")).unwrap(), Verdict::Continue);
        assert_eq!(
            stage.evaluate(&post("/api/messages/abc")).unwrap(),
            Verdict::Deny(Denial::too_many_requests(RATE_LIMIT_REASON))
        );
    }

    #[test]
    fn test_trigger_matches_on_segment_boundaries() {
        let trigger = RateLimitTrigger::new(vec![Method::POST], "/api/messages");
        assert!(trigger.matches(&post("/api/messages")));
        assert!(trigger.matches(&post("/api/messages/")));
        assert!(trigger.matches(&post("/api/messages/abc/read")));
        assert!(!trigger.matches(&post("/api/messagesX")));
        assert!(!trigger.matches(&post("/api/message")));

        let slashed = RateLimitTrigger::new(vec![Method::POST], "/api/");
        assert!(slashed.matches(&post("/api/messages")));
        assert!(!slashed.matches(&post("/apix")));
    }

    #[test]
    fn test_rate_limit_keys_on_forwarded_for() {
        let stage = rate_stage(1);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.3"));

        let forwarded = post("/api/messages").with_headers(headers);
        assert_eq!(stage.evaluate(&forwarded).unwrap(), Verdict::Continue);
        // Same peer, different forwarded client: separate window.
        assert_eq!(stage.evaluate(&post("/api/messages")).unwrap(), Verdict::Continue);
        assert!(matches!(stage.evaluate(&forwarded).unwrap(), Verdict::Deny(_)));
    }
}
