//! The messaging write path.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::messaging::history::EditHistoryRecorder;
use crate::messaging::query::{MessageFilter, PageRequest, Paginated};
use crate::messaging::store::{MessageStore, StoreError};
use crate::messaging::types::{
    Conversation, Message, MessageEditEvent, NewMessage, Notification, ThreadedMessage,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("message {0} not found")]
    NotFound(Uuid),

    #[error("conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("user {user} is not a participant of message {message}")]
    NotParticipant { user: String, message: Uuid },

    #[error("user {user} is not a participant of conversation {conversation}")]
    NotInConversation { user: String, conversation: Uuid },

    #[error("message body must not be empty")]
    EmptyBody,

    #[error("a conversation needs at least two participants")]
    TooFewParticipants,

    #[error("either conversation_id or receiver is required")]
    MissingConversation,

    #[error("receiver {0} is not a participant of the conversation")]
    InvalidReceiver(String),

    #[error("parent message {0} is not in this conversation")]
    InvalidParent(Uuid),

    #[error("Invalid page.")]
    InvalidPage,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Store(other),
        }
    }
}

/// Conversations, messages and their history on top of a [`MessageStore`].
///
/// Access follows conversation membership: only participants see or change
/// a conversation and its messages.
#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    recorder: EditHistoryRecorder,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(store: Arc<dyn MessageStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            recorder: EditHistoryRecorder::new(),
            clock,
        }
    }

    /// Start a conversation between `creator` and `participants`.
    pub fn create_conversation(
        &self,
        creator: &str,
        participants: Vec<String>,
    ) -> Result<Conversation, ServiceError> {
        let conversation = Conversation::new(
            participants.into_iter().chain(std::iter::once(creator.to_string())),
            self.clock.now(),
        );
        if conversation.participants.len() < 2 {
            return Err(ServiceError::TooFewParticipants);
        }

        self.store.insert_conversation(conversation.clone())?;
        tracing::debug!(
            conversation_id = %conversation.id,
            participants = conversation.participants.len(),
            "Conversation created"
        );
        Ok(conversation)
    }

    pub fn conversations_for(&self, user: &str) -> Result<Vec<Conversation>, ServiceError> {
        Ok(self.store.conversations_for(user)?)
    }

    pub fn conversation(&self, id: Uuid, user: &str) -> Result<Conversation, ServiceError> {
        let conversation = self
            .store
            .get_conversation(id)?
            .ok_or(ServiceError::ConversationNotFound(id))?;
        if !conversation.has_participant(user) {
            return Err(ServiceError::NotInConversation {
                user: user.to_string(),
                conversation: id,
            });
        }
        Ok(conversation)
    }

    /// Store a new message and notify its receiver.
    pub fn send(&self, sender: &str, new: NewMessage) -> Result<Message, ServiceError> {
        if new.body.trim().is_empty() {
            return Err(ServiceError::EmptyBody);
        }

        if let (None, Some(parent)) = (new.conversation_id, new.parent_message) {
            return Err(ServiceError::InvalidParent(parent));
        }

        let conversation = match (new.conversation_id, &new.receiver) {
            (Some(id), _) => self.conversation(id, sender)?,
            (None, Some(receiver)) => self.create_conversation(sender, vec![receiver.clone()])?,
            (None, None) => return Err(ServiceError::MissingConversation),
        };
        if let Some(receiver) = &new.receiver {
            if !conversation.has_participant(receiver) {
                return Err(ServiceError::InvalidReceiver(receiver.clone()));
            }
        }

        let now = self.clock.now();
        let mut message = Message::new(conversation.id, sender, new.receiver, new.body, now);
        if let Some(parent_id) = new.parent_message {
            match self.store.get(parent_id)? {
                Some(parent) if parent.conversation_id == conversation.id => {
                    message = message.replying_to(parent_id);
                }
                _ => return Err(ServiceError::InvalidParent(parent_id)),
            }
        }
        self.store.insert(message.clone())?;

        if let Some(receiver) = &message.receiver {
            self.store
                .add_notification(Notification::for_message(&message, receiver.clone(), now))?;
        }

        tracing::debug!(message_id = %message.id, sender = %sender, "Message stored");
        Ok(message)
    }

    /// Replace a message body on behalf of one of its participants.
    pub fn edit(&self, id: Uuid, editor: &str, body: String) -> Result<Message, ServiceError> {
        if body.trim().is_empty() {
            return Err(ServiceError::EmptyBody);
        }

        let mut incoming = self.participant_message(id, editor)?;
        incoming.body = body;

        let now = self.clock.now();
        if self
            .recorder
            .on_before_update(self.store.as_ref(), &mut incoming, now)?
            .is_some()
        {
            incoming.edited_by = Some(editor.to_string());
        }

        self.store.save(incoming.clone())?;
        Ok(incoming)
    }

    pub fn history(&self, id: Uuid, user: &str) -> Result<Vec<MessageEditEvent>, ServiceError> {
        self.participant_message(id, user)?;
        Ok(self.store.history(id)?)
    }

    /// Mark a received message as read. Only the receiver can do this.
    pub fn mark_read(&self, id: Uuid, user: &str) -> Result<Message, ServiceError> {
        let mut message = self.store.get(id)?.ok_or(ServiceError::NotFound(id))?;
        if message.receiver.as_deref() != Some(user) {
            return Err(ServiceError::NotParticipant {
                user: user.to_string(),
                message: id,
            });
        }
        message.read = true;
        self.store.save(message.clone())?;
        self.store.mark_notifications_read(user, id)?;
        Ok(message)
    }

    pub fn delete(&self, id: Uuid, user: &str) -> Result<Message, ServiceError> {
        self.participant_message(id, user)?;
        self.store.delete(id)?.ok_or(ServiceError::NotFound(id))
    }

    pub fn unread_for(&self, user: &str) -> Result<Vec<Message>, ServiceError> {
        Ok(self.store.unread_for(user)?)
    }

    pub fn notifications_for(&self, user: &str) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.store.notifications_for(user)?)
    }

    /// Messages in the caller's conversations matching `filter`, oldest first.
    pub fn list_messages(
        &self,
        user: &str,
        filter: &MessageFilter,
        page: PageRequest,
    ) -> Result<Paginated<Message>, ServiceError> {
        let mut messages = Vec::new();
        for conversation in self.store.conversations_for(user)? {
            if filter.conversation_id.is_some_and(|id| id != conversation.id) {
                continue;
            }
            messages.extend(
                self.store
                    .messages_in(conversation.id)?
                    .into_iter()
                    .filter(|m| filter.matches(m)),
            );
        }
        messages.sort_by_key(|m| m.sent_at);
        Paginated::paginate(messages, page).ok_or(ServiceError::InvalidPage)
    }

    /// The conversation as a reply tree: top-level messages with nested replies.
    pub fn thread(&self, conversation_id: Uuid, user: &str) -> Result<Vec<ThreadedMessage>, ServiceError> {
        self.conversation(conversation_id, user)?;

        let mut roots = Vec::new();
        let mut children: HashMap<Uuid, Vec<Message>> = HashMap::new();
        for message in self.store.messages_in(conversation_id)? {
            match message.parent_message {
                Some(parent) => children.entry(parent).or_default().push(message),
                None => roots.push(message),
            }
        }
        Ok(roots
            .into_iter()
            .map(|root| build_thread(root, &mut children))
            .collect())
    }

    /// Load a message and check that `user` belongs to its conversation.
    fn participant_message(&self, id: Uuid, user: &str) -> Result<Message, ServiceError> {
        let message = self.store.get(id)?.ok_or(ServiceError::NotFound(id))?;
        let member = self
            .store
            .get_conversation(message.conversation_id)?
            .is_some_and(|c| c.has_participant(user));
        if !member {
            return Err(ServiceError::NotParticipant {
                user: user.to_string(),
                message: id,
            });
        }
        Ok(message)
    }
}

/// Messages arrive oldest first, so every reply list is already in `sent_at` order.
fn build_thread(message: Message, children: &mut HashMap<Uuid, Vec<Message>>) -> ThreadedMessage {
    let replies = children
        .remove(&message.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| build_thread(reply, children))
        .collect();
    ThreadedMessage { message, replies }
}
