//! Ordered chain of request stages.
//!
//! # Data Flow
//! ```text
//! GateRequest
//!     → stage 1 ── Deny ──▶ Denial (no later stage runs, handler skipped)
//!     → stage 2 ── Deny ──▶ Denial
//!     → ...
//!     → handler ──────────▶ Allowed(response)
//! ```
//!
//! The order comes from `pipeline.order` in the config. A stage placed
//! before a denying stage sees the request; a stage placed after it does not.

pub mod middleware;
pub mod stage;

use std::future::Future;

use axum::http::Method;
use chrono::TimeDelta;

use crate::config::{GateConfig, StageKind};
use crate::http::request::GateRequest;
use crate::http::response::{Denial, RequestDecision, Verdict};
use crate::observability::{metrics, RequestLogger};
use crate::security::{ClientWindows, RoleAuthorizer, SlidingWindowRateLimiter, TimeOfDayGate};

pub use middleware::{gate_middleware, identity_middleware, GateState};
pub use stage::{
    GateError, LoggerStage, RateLimitStage, RateLimitTrigger, RoleStage, Stage, TimeGateStage,
};

/// Runs stages in order and short-circuits on the first denial.
#[derive(Default)]
pub struct RequestPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl RequestPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage at the end of the chain.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Build the configured chain.
    ///
    /// `windows` is the long-lived rate-limit state; `logger` is `None` when
    /// no request log sink exists, in which case the logger stage is left out.
    pub fn from_config(
        config: &GateConfig,
        windows: ClientWindows,
        logger: Option<RequestLogger>,
    ) -> Self {
        let mut pipeline = Self::new();
        for kind in &config.pipeline.order {
            match kind {
                StageKind::Logger if config.request_log.enabled => {
                    if let Some(logger) = &logger {
                        pipeline = pipeline.with_stage(LoggerStage::new(logger.clone()));
                    }
                }
                StageKind::TimeGate if config.access_window.enabled => {
                    let window = &config.access_window;
                    pipeline = pipeline
                        .with_stage(TimeGateStage::new(TimeOfDayGate::new(window.start, window.end)));
                }
                StageKind::Role if config.roles.enabled => {
                    pipeline = pipeline.with_stage(RoleStage::new(RoleAuthorizer::new(
                        config.roles.allowed.iter().cloned(),
                    )));
                }
                StageKind::RateLimit if config.rate_limit.enabled => {
                    let limits = &config.rate_limit;
                    // Validation bounds the window; anything larger saturates.
                    let window = i64::try_from(limits.window_secs)
                        .ok()
                        .and_then(TimeDelta::try_seconds)
                        .unwrap_or(TimeDelta::MAX);
                    let methods = limits
                        .methods
                        .iter()
                        .filter_map(|m| match Method::from_bytes(m.to_ascii_uppercase().as_bytes()) {
                            Ok(method) => Some(method),
                            Err(_) => {
                                tracing::warn!(method = %m, "Ignoring unknown rate limit method");
                                None
                            }
                        })
                        .collect();
                    pipeline = pipeline.with_stage(RateLimitStage::new(
                        SlidingWindowRateLimiter::new(limits.count, window, windows.clone()),
                        RateLimitTrigger::new(methods, limits.path_prefix.clone()),
                    ));
                }
                _ => {}
            }
        }
        pipeline
    }

    /// Evaluate every stage. `Ok(None)` means the request may proceed.
    pub fn check(&self, req: &GateRequest) -> Result<Option<Denial>, GateError> {
        for stage in &self.stages {
            match stage.evaluate(req)? {
                Verdict::Continue => {}
                Verdict::Deny(denial) => {
                    metrics::record_denial(stage.name());
                    tracing::debug!(
                        stage = stage.name(),
                        status = %denial.status,
                        path = %req.path,
                        "Request denied"
                    );
                    return Ok(Some(denial));
                }
            }
        }
        Ok(None)
    }

    /// Evaluate the stages, then call `handler` only if none denied.
    pub async fn run<F, Fut, R>(
        &self,
        req: &GateRequest,
        handler: F,
    ) -> Result<RequestDecision<R>, GateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        match self.check(req)? {
            Some(denial) => Ok(RequestDecision::Denied(denial)),
            None => Ok(RequestDecision::Allowed(handler().await)),
        }
    }
}
