//! Configuration validation.
//!
//! Serde handles syntax; this pass checks value ranges and combinations.
//! All problems are collected so one reload attempt reports every mistake.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::GateConfig;

/// Largest window a `chrono::TimeDelta` can hold, in whole seconds.
pub const MAX_WINDOW_SECS: u64 = i64::MAX as u64 / 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("rate_limit.count must be greater than zero")]
    ZeroRateLimit,

    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.window_secs {0} exceeds the maximum of {MAX_WINDOW_SECS}")]
    WindowTooLarge(u64),

    #[error("rate_limit.methods entry {0:?} is not an HTTP method")]
    InvalidMethod(String),

    #[error("access_window.start {start} is after access_window.end {end}; overnight windows are not supported")]
    InvertedAccessWindow { start: String, end: String },

    #[error("roles.allowed is empty while role checks are enabled")]
    NoAllowedRoles,

    #[error("pipeline.order lists stage {0:?} more than once")]
    DuplicateStage(&'static str),
}

/// Validate a parsed configuration, returning every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.count == 0 {
            errors.push(ValidationError::ZeroRateLimit);
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroWindow);
        }
        if config.rate_limit.window_secs > MAX_WINDOW_SECS {
            errors.push(ValidationError::WindowTooLarge(config.rate_limit.window_secs));
        }
        for method in &config.rate_limit.methods {
            if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod(method.clone()));
            }
        }
    }

    let window = &config.access_window;
    if window.enabled && window.start > window.end {
        errors.push(ValidationError::InvertedAccessWindow {
            start: window.start.to_string(),
            end: window.end.to_string(),
        });
    }

    if config.roles.enabled && config.roles.allowed.is_empty() {
        errors.push(ValidationError::NoAllowedRoles);
    }

    let mut seen = HashSet::new();
    for kind in &config.pipeline.order {
        if !seen.insert(*kind) {
            errors.push(ValidationError::DuplicateStage(kind.as_str()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
