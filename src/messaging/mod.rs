//! Messaging subsystem.
//!
//! # Data Flow
//! ```text
//! send:  service.rs → conversation membership (or a new conversation)
//!                   → parent check for replies
//!                   → store.insert → notification for receiver
//! edit:  service.rs → store.get (participant check)
//!                   → history.rs (capture prior body, mark edited)
//!                   → store.save
//! ```

pub mod history;
pub mod query;
pub mod service;
pub mod store;
pub mod types;

pub use history::EditHistoryRecorder;
pub use query::{MessageFilter, PageRequest, Paginated};
pub use service::{MessageService, ServiceError};
pub use store::{InMemoryStore, MessageStore, StoreError};
pub use types::{Conversation, Message, MessageEditEvent, NewMessage, Notification, ThreadedMessage};
