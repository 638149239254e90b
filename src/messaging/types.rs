//! Messaging records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A set of users who can exchange messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Sorted and free of duplicates.
    pub participants: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl Conversation {
    pub fn new<I, S>(participants: I, created_at: NaiveDateTime) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut participants: Vec<String> = participants
            .into_iter()
            .map(|p| {
                let p: String = p.into();
                p.trim().to_string()
            })
            .filter(|p| !p.is_empty())
            .collect();
        participants.sort();
        participants.dedup();

        Self {
            id: Uuid::new_v4(),
            participants,
            created_at,
        }
    }

    pub fn has_participant(&self, user: &str) -> bool {
        self.participants.iter().any(|p| p == user)
    }
}

/// A chat message inside a conversation, optionally replying to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: String,
    pub receiver: Option<String>,
    #[serde(default)]
    pub parent_message: Option<Uuid>,
    pub body: String,
    pub sent_at: NaiveDateTime,
    /// Set once the body has changed; never cleared.
    pub edited: bool,
    pub edited_at: Option<NaiveDateTime>,
    pub edited_by: Option<String>,
    pub read: bool,
}

impl Message {
    pub fn new(
        conversation_id: Uuid,
        sender: impl Into<String>,
        receiver: Option<String>,
        body: impl Into<String>,
        sent_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender: sender.into(),
            receiver,
            parent_message: None,
            body: body.into(),
            sent_at,
            edited: false,
            edited_at: None,
            edited_by: None,
            read: false,
        }
    }

    pub fn replying_to(mut self, parent: Uuid) -> Self {
        self.parent_message = Some(parent);
        self
    }
}

/// Body of a send request.
///
/// Without `conversation_id` a new two-person conversation with `receiver`
/// is started.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMessage {
    pub conversation_id: Option<Uuid>,
    pub receiver: Option<String>,
    pub parent_message: Option<Uuid>,
    pub body: String,
}

/// A message with its replies, each level ordered by `sent_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub replies: Vec<ThreadedMessage>,
}

/// One prior body of a message, captured when the body changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEditEvent {
    pub message_id: Uuid,
    pub previous_body: String,
    pub captured_at: NaiveDateTime,
}

/// Tells a receiver that a message arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user: String,
    pub message_id: Uuid,
    pub created_at: NaiveDateTime,
    /// Set when the receiver marks the message read.
    pub is_read: bool,
}

impl Notification {
    pub fn for_message(message: &Message, user: impl Into<String>, created_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.into(),
            message_id: message.id,
            created_at,
            is_read: false,
        }
    }
}
