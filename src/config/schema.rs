//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Root configuration for the chat gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-client sliding window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Time-of-day access window.
    pub access_window: AccessWindowConfig,

    /// Role-based access restriction.
    pub roles: RoleConfig,

    /// Durable request log.
    pub request_log: RequestLogConfig,

    /// Stage ordering.
    pub pipeline: PipelineConfig,

    /// Message storage.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum qualifying actions per client within one window.
    pub count: usize,

    /// Window length in seconds.
    pub window_secs: u64,

    /// HTTP methods that count as qualifying actions.
    pub methods: Vec<String>,

    /// Path prefix a qualifying action must match.
    pub path_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 5,
            window_secs: 60,
            methods: vec!["POST".to_string()],
            path_prefix: "/api/messages".to_string(),
        }
    }
}

/// Time-of-day access window. Both bounds are inclusive.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessWindowConfig {
    pub enabled: bool,

    #[serde(with = "time_of_day")]
    pub start: NaiveTime,

    #[serde(with = "time_of_day")]
    pub end: NaiveTime,
}

impl Default for AccessWindowConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
        }
    }
}

/// Role restriction for authenticated principals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoleConfig {
    pub enabled: bool,

    /// Roles admitted past the gate.
    pub allowed: Vec<String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed: vec!["admin".to_string(), "moderator".to_string()],
        }
    }
}

/// Request log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestLogConfig {
    pub enabled: bool,

    /// Append-only log file.
    pub path: String,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "request_logs.log".to_string(),
        }
    }
}

/// Identifies one built-in pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Logger,
    TimeGate,
    Role,
    RateLimit,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Logger => "logger",
            StageKind::TimeGate => "time_gate",
            StageKind::Role => "role",
            StageKind::RateLimit => "rate_limit",
        }
    }
}

/// Stage ordering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stages in evaluation order. Stages disabled in their own section are skipped.
    pub order: Vec<StageKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order: vec![
                StageKind::Logger,
                StageKind::TimeGate,
                StageKind::Role,
                StageKind::RateLimit,
            ],
        }
    }
}

/// Message storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot loaded at startup and written on shutdown.
    pub snapshot_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// `HH:MM` or `HH:MM:SS` time-of-day values.
mod time_of_day {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = if time.second() == 0 {
            time.format("%H:%M").to_string()
        } else {
            time.format("%H:%M:%S").to_string()
        };
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(|e| serde::de::Error::custom(format!("invalid time of day {raw:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = GateConfig::default();
        assert_eq!(config.rate_limit.count, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.roles.allowed, vec!["admin", "moderator"]);
        assert_eq!(config.access_window.start, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(config.pipeline.order.len(), 4);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: GateConfig = toml::from_str(
            r#"
            [access_window]
            enabled = true
            start = "09:30"
            end = "17:15:30"

            [pipeline]
            order = ["rate_limit", "logger"]
            "#,
        )
        .unwrap();

        assert!(config.access_window.enabled);
        assert_eq!(config.access_window.start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(config.access_window.end, NaiveTime::from_hms_opt(17, 15, 30).unwrap());
        assert_eq!(config.pipeline.order, vec![StageKind::RateLimit, StageKind::Logger]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_time_rejected() {
        let result: Result<GateConfig, _> = toml::from_str(
            r#"
            [access_window]
            start = "25:00"
            "#,
        );
        assert!(result.is_err());
    }
}
