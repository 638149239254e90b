//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (principal + GateRequest descriptor)
//!     → [pipeline stages]
//!     → response.rs (Denial / RequestDecision)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{GateRequest, Principal};
pub use response::{Denial, RequestDecision, Verdict};
pub use server::{AppState, Dependencies, HttpServer};
