//! Edit history capture.
//!
//! The write path calls [`EditHistoryRecorder::on_before_update`] right before
//! it overwrites a stored message. Creations never go through here.

use chrono::NaiveDateTime;

use crate::messaging::store::{MessageStore, StoreError};
use crate::messaging::types::{Message, MessageEditEvent};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, Default)]
pub struct EditHistoryRecorder;

impl EditHistoryRecorder {
    pub fn new() -> Self {
        Self
    }

    /// Record the stored body if `incoming` changes it.
    ///
    /// Returns the event that was appended, if any. A message that no longer
    /// resolves (never stored, or deleted concurrently) is a no-op. The
    /// `edited` flag only ever goes from false to true.
    pub fn on_before_update(
        &self,
        store: &dyn MessageStore,
        incoming: &mut Message,
        now: NaiveDateTime,
    ) -> Result<Option<MessageEditEvent>, StoreError> {
        let Some(existing) = store.get(incoming.id)? else {
            tracing::debug!(message_id = %incoming.id, "No stored message, skipping edit history");
            return Ok(None);
        };

        incoming.edited |= existing.edited;
        if existing.body == incoming.body {
            return Ok(None);
        }

        let event = MessageEditEvent {
            message_id: existing.id,
            previous_body: existing.body,
            captured_at: now,
        };
        store.append_history(event.clone())?;
        metrics::record_edit();

        incoming.edited = true;
        incoming.edited_at = Some(now);
        tracing::debug!(message_id = %incoming.id, "Captured previous message body");
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::store::InMemoryStore;
    use chrono::{NaiveDate, TimeDelta};
    use uuid::Uuid;

    fn at(min: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 4).unwrap().and_hms_opt(20, 0, 0).unwrap()
            + TimeDelta::minutes(min)
    }

    fn stored(store: &InMemoryStore, body: &str) -> Message {
        let msg = Message::new(Uuid::new_v4(), "alice", Some("bob".into()), body, at(0));
        store.insert(msg.clone()).unwrap();
        msg
    }

    fn apply(store: &InMemoryStore, msg: &Message, body: &str, now: NaiveDateTime) -> (Message, Option<MessageEditEvent>) {
        let mut incoming = store.get(msg.id).unwrap().unwrap();
        incoming.body = body.to_string();
        let event = EditHistoryRecorder::new().on_before_update(store, &mut incoming, now).unwrap();
        store.save(incoming.clone()).unwrap();
        (incoming, event)
    }

    #[test]
    fn test_same_body_records_nothing() {
        let store = InMemoryStore::new();
        let msg = stored(&store, "hello");
        let (updated, event) = apply(&store, &msg, "hello", at(1));
        assert!(event.is_none());
        assert!(!updated.edited);
        assert!(updated.edited_at.is_none());
        assert!(store.history(msg.id).unwrap().is_empty());
    }

    #[test]
    fn test_changed_body_records_prior_body() {
        let store = InMemoryStore::new();
        let msg = stored(&store, "hello");
        let (updated, event) = apply(&store, &msg, "hello, world", at(1));

        let event = event.unwrap();
        assert_eq!(event.previous_body, "hello");
        assert_eq!(event.captured_at, at(1));
        assert!(updated.edited);
        assert_eq!(updated.edited_at, Some(at(1)));
        assert_eq!(store.history(msg.id).unwrap(), vec![event]);
    }

    #[test]
    fn test_edited_flag_is_monotonic() {
        let store = InMemoryStore::new();
        let msg = stored(&store, "v1");
        apply(&store, &msg, "v2", at(1));
        let (reverted, _) = apply(&store, &msg, "v1", at(2));
        assert!(reverted.edited);

        // An incoming copy that lost the flag still ends up edited.
        let mut stale = msg.clone();
        stale.body = "v1".into();
        EditHistoryRecorder::new().on_before_update(&store, &mut stale, at(3)).unwrap();
        assert!(stale.edited);

        let bodies: Vec<_> = store
            .history(msg.id)
            .unwrap()
            .into_iter()
            .map(|e| e.previous_body)
            .collect();
        assert_eq!(bodies, vec!["v1", "v2"]);
    }

    #[test]
    fn test_missing_message_is_noop() {
        let store = InMemoryStore::new();
        let mut ghost = Message::new(Uuid::new_v4(), "alice", None, "boo", at(0));
        let event = EditHistoryRecorder::new().on_before_update(&store, &mut ghost, at(1)).unwrap();
        assert!(event.is_none());
        assert!(!ghost.edited);
    }
}
