//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stdout)
//!     → metrics.rs (counters, histograms)
//!
//! The gate pipeline additionally produces:
//!     → request_log.rs (one durable line per request)
//! ```

pub mod logging;
pub mod metrics;
pub mod request_log;

pub use request_log::{FileSink, LogSink, MemorySink, RequestLogger};
