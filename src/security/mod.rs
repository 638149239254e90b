//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_id.rs (resolve client address)
//!     → time_gate.rs (time-of-day window)
//!     → role.rs (role membership for authenticated users)
//!     → rate_limit.rs (per-client sliding window)
//!     → Pass to handler
//! ```
//!
//! These are plain decision objects; `crate::pipeline` wraps them into stages.

pub mod client_id;
pub mod rate_limit;
pub mod role;
pub mod time_gate;

pub use client_id::client_identity;
pub use rate_limit::{Admission, ClientWindows, SlidingWindowRateLimiter};
pub use role::RoleAuthorizer;
pub use time_gate::TimeOfDayGate;
