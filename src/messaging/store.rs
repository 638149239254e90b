//! Message persistence port and its in-memory adapter.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::messaging::types::{Conversation, Message, MessageEditEvent, Notification};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message {0} not found")]
    NotFound(Uuid),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Storage operations the write path depends on.
pub trait MessageStore: Send + Sync {
    fn insert_conversation(&self, conversation: Conversation) -> Result<(), StoreError>;

    fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError>;

    /// Conversations `user` takes part in, oldest first.
    fn conversations_for(&self, user: &str) -> Result<Vec<Conversation>, StoreError>;

    /// Every message of a conversation, oldest first.
    fn messages_in(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    fn insert(&self, message: Message) -> Result<(), StoreError>;

    /// Overwrite a stored message. Fails with `NotFound` if it is gone.
    fn save(&self, message: Message) -> Result<(), StoreError>;

    /// Remove a message and every reply below it, together with their
    /// history and notifications. Returns the message named by `id`.
    fn delete(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    fn append_history(&self, event: MessageEditEvent) -> Result<(), StoreError>;

    /// Edit events for a message, oldest first.
    fn history(&self, id: Uuid) -> Result<Vec<MessageEditEvent>, StoreError>;

    fn add_notification(&self, notification: Notification) -> Result<(), StoreError>;

    fn notifications_for(&self, user: &str) -> Result<Vec<Notification>, StoreError>;

    /// Flag `user`'s notifications about `message_id` as read. Returns how many changed.
    fn mark_notifications_read(&self, user: &str, message_id: Uuid) -> Result<usize, StoreError>;

    /// Messages received by `user` that are not read yet, oldest first.
    fn unread_for(&self, user: &str) -> Result<Vec<Message>, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    history: Vec<MessageEditEvent>,
    notifications: Vec<Notification>,
}

/// Concurrent in-memory store with optional JSON snapshots.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    conversations: Arc<DashMap<Uuid, Conversation>>,
    messages: Arc<DashMap<Uuid, Message>>,
    history: Arc<DashMap<Uuid, Vec<MessageEditEvent>>>,
    notifications: Arc<DashMap<String, Vec<Notification>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot if the file exists, otherwise start empty.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let store = Self::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)?;
            for conversation in snapshot.conversations {
                store.conversations.insert(conversation.id, conversation);
            }
            for message in snapshot.messages {
                store.messages.insert(message.id, message);
            }
            for event in snapshot.history {
                store.history.entry(event.message_id).or_default().push(event);
            }
            for notification in snapshot.notifications {
                store
                    .notifications
                    .entry(notification.user.clone())
                    .or_default()
                    .push(notification);
            }
            tracing::info!(
                path = ?path,
                conversations = store.conversations.len(),
                messages = store.messages.len(),
                "Loaded message snapshot"
            );
        }
        Ok(store)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let mut snapshot = Snapshot {
            conversations: self.conversations.iter().map(|r| r.value().clone()).collect(),
            messages: self.messages.iter().map(|r| r.value().clone()).collect(),
            history: self.history.iter().flat_map(|r| r.value().clone()).collect(),
            notifications: self.notifications.iter().flat_map(|r| r.value().clone()).collect(),
        };
        snapshot.conversations.sort_by_key(|c| c.created_at);
        snapshot.messages.sort_by_key(|m| m.sent_at);
        snapshot.history.sort_by_key(|e| e.captured_at);

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &snapshot)?;
        tracing::info!(path = ?path, messages = snapshot.messages.len(), "Saved message snapshot");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MessageStore for InMemoryStore {
    fn insert_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        self.conversations.insert(conversation.id, conversation);
        Ok(())
    }

    fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError> {
        Ok(self.conversations.get(&id).map(|r| r.value().clone()))
    }

    fn conversations_for(&self, user: &str) -> Result<Vec<Conversation>, StoreError> {
        let mut found: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|r| r.has_participant(user))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by_key(|c| c.created_at);
        Ok(found)
    }

    fn messages_in(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let mut found: Vec<Message> = self
            .messages
            .iter()
            .filter(|r| r.conversation_id == conversation_id)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by_key(|m| m.sent_at);
        Ok(found)
    }

    fn get(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        Ok(self.messages.get(&id).map(|r| r.value().clone()))
    }

    fn insert(&self, message: Message) -> Result<(), StoreError> {
        self.messages.insert(message.id, message);
        Ok(())
    }

    fn save(&self, message: Message) -> Result<(), StoreError> {
        match self.messages.get_mut(&message.id) {
            Some(mut stored) => {
                *stored = message;
                Ok(())
            }
            None => Err(StoreError::NotFound(message.id)),
        }
    }

    fn delete(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        let Some((_, root)) = self.messages.remove(&id) else {
            return Ok(None);
        };

        let mut removed = vec![id];
        let mut pending = vec![id];
        while let Some(parent) = pending.pop() {
            let children: Vec<Uuid> = self
                .messages
                .iter()
                .filter(|r| r.parent_message == Some(parent))
                .map(|r| *r.key())
                .collect();
            for child in children {
                if self.messages.remove(&child).is_some() {
                    removed.push(child);
                    pending.push(child);
                }
            }
        }

        for gone in &removed {
            self.history.remove(gone);
        }
        for mut entry in self.notifications.iter_mut() {
            entry.value_mut().retain(|n| !removed.contains(&n.message_id));
        }
        Ok(Some(root))
    }

    fn append_history(&self, event: MessageEditEvent) -> Result<(), StoreError> {
        self.history.entry(event.message_id).or_default().push(event);
        Ok(())
    }

    fn history(&self, id: Uuid) -> Result<Vec<MessageEditEvent>, StoreError> {
        Ok(self.history.get(&id).map(|r| r.value().clone()).unwrap_or_default())
    }

    fn add_notification(&self, notification: Notification) -> Result<(), StoreError> {
        self.notifications
            .entry(notification.user.clone())
            .or_default()
            .push(notification);
        Ok(())
    }

    fn notifications_for(&self, user: &str) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .notifications
            .get(user)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    fn mark_notifications_read(&self, user: &str, message_id: Uuid) -> Result<usize, StoreError> {
        let mut changed = 0;
        if let Some(mut notes) = self.notifications.get_mut(user) {
            for note in notes.iter_mut().filter(|n| n.message_id == message_id && !n.is_read) {
                note.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn unread_for(&self, user: &str) -> Result<Vec<Message>, StoreError> {
        let mut unread: Vec<Message> = self
            .messages
            .iter()
            .filter(|r| !r.read && r.receiver.as_deref() == Some(user))
            .map(|r| r.value().clone())
            .collect();
        unread.sort_by_key(|m| m.sent_at);
        Ok(unread)
    }
}
