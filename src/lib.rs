//! Chat gate: a rate-limited, time-gated request pipeline in front of a
//! small messaging API with edit history.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod messaging;
pub mod observability;
pub mod pipeline;
pub mod security;

pub use config::GateConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::RequestPipeline;
