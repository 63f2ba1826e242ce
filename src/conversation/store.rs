use crate::engine::Clock;
use crate::models::chat::{ Message, MessageId, Sender };
use chrono::{ DateTime, SecondsFormat, Utc };
use serde::{ Deserialize, Serialize };
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No user message at index {index} (conversation has {len} messages)")]
    InvalidIndex {
        index: usize,
        len: usize,
    },
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: String,
}

/// Serialized conversation as handed to a history backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub Vec<SnapshotEntry>);

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::MalformedSnapshot(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Ordered message history for one conversation.
///
/// Ids are zero-padded counters seeded from the clock in microseconds and
/// bumped on collision. Restored numeric ids raise the counter, so new ids
/// sort after them under `MessageId`'s ordering.
pub struct MessageStore {
    messages: Vec<Message>,
    clock: Arc<dyn Clock>,
    last_id: u64,
}

impl MessageStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { messages: Vec::new(), clock, last_id: 0 }
    }

    pub fn restore(snapshot: Snapshot, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(snapshot.len());
        let mut messages = Vec::with_capacity(snapshot.len());
        let mut last_id = 0;

        for (position, entry) in snapshot.0.into_iter().enumerate() {
            if entry.id.is_empty() {
                return Err(StoreError::MalformedSnapshot(format!("entry {} has an empty id", position)));
            }
            if !seen.insert(entry.id.clone()) {
                return Err(StoreError::MalformedSnapshot(format!("duplicate id '{}'", entry.id)));
            }
            let timestamp = DateTime::parse_from_rfc3339(&entry.timestamp)
                .map_err(|e|
                    StoreError::MalformedSnapshot(
                        format!("entry {} has timestamp '{}': {}", position, entry.timestamp, e)
                    )
                )?
                .with_timezone(&Utc);
            let id = MessageId::new(entry.id);
            if let Some(numeric) = id.as_number() {
                last_id = last_id.max(numeric);
            }
            messages.push(Message {
                id,
                text: entry.text,
                sender: entry.sender,
                timestamp,
            });
        }

        Ok(Self { messages, clock, last_id })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(
            self.messages
                .iter()
                .map(|m| SnapshotEntry {
                    id: m.id.as_str().to_string(),
                    text: m.text.clone(),
                    sender: m.sender,
                    timestamp: format_timestamp(&m.timestamp),
                })
                .collect()
        )
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    fn next_id(&mut self) -> MessageId {
        let candidate = u64::try_from(self.now().timestamp_micros()).unwrap_or(0);
        self.last_id = if candidate > self.last_id { candidate } else { self.last_id + 1 };
        MessageId::new(format!("{:020}", self.last_id))
    }

    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> Message {
        self.append_at(sender, text, self.now())
    }

    /// Like [`append`](Self::append) but with a caller-supplied timestamp.
    pub fn append_at(
        &mut self,
        sender: Sender,
        text: impl Into<String>,
        timestamp: DateTime<Utc>
    ) -> Message {
        let message = Message {
            id: self.next_id(),
            text: text.into(),
            sender,
            timestamp,
        };
        self.messages.push(message.clone());
        message
    }

    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_user)
    }

    pub fn replace_user_text_at(
        &mut self,
        index: usize,
        new_text: impl Into<String>
    ) -> Result<(), StoreError> {
        let now = self.now();
        let len = self.messages.len();
        match self.messages.get_mut(index) {
            Some(message) if message.is_user() => {
                message.text = new_text.into();
                message.timestamp = now;
                Ok(())
            }
            _ => Err(StoreError::InvalidIndex { index, len }),
        }
    }

    /// Removes the assistant reply right after `index`, if there is one.
    pub fn drop_following_assistant_if_present(&mut self, index: usize) -> Option<Message> {
        let next = index.checked_add(1)?;
        if self.messages.get(next).map_or(false, Message::is_assistant) {
            Some(self.messages.remove(next))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ FixedClock, SystemClock };
    use chrono::FixedOffset;

    fn frozen_clock() -> Arc<dyn Clock> {
        let at = DateTime::<FixedOffset>::parse_from_rfc3339("2026-10-18T09:30:00.123456789Z").unwrap();
        Arc::new(FixedClock(at))
    }

    #[test]
    fn ids_stay_unique_and_ordered_under_a_frozen_clock() {
        let mut store = MessageStore::new(frozen_clock());
        let ids: Vec<MessageId> = (0..5)
            .map(|i| store.append(Sender::User, format!("m{}", i)).id)
            .collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn last_user_index_scans_from_the_end() {
        let mut store = MessageStore::new(Arc::new(SystemClock));
        assert_eq!(store.last_user_index(), None);
        store.append(Sender::Assistant, "greeting");
        assert_eq!(store.last_user_index(), None);
        store.append(Sender::User, "a");
        store.append(Sender::Assistant, "reply a");
        store.append(Sender::User, "b");
        store.append(Sender::Assistant, "reply b");
        assert_eq!(store.last_user_index(), Some(3));
    }

    #[test]
    fn replace_rejects_assistant_and_out_of_range() {
        let mut store = MessageStore::new(Arc::new(SystemClock));
        store.append(Sender::Assistant, "greeting");
        assert_eq!(
            store.replace_user_text_at(0, "x"),
            Err(StoreError::InvalidIndex { index: 0, len: 1 })
        );
        assert_eq!(
            store.replace_user_text_at(9, "x"),
            Err(StoreError::InvalidIndex { index: 9, len: 1 })
        );
        assert_eq!(store.messages()[0].text, "greeting");
    }

    #[test]
    fn replace_keeps_id_and_refreshes_timestamp() {
        let early = DateTime::<FixedOffset>::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap();
        let mut store = MessageStore::new(Arc::new(FixedClock(early)));
        let original = store.append(Sender::User, "A");
        store.clock = frozen_clock();
        store.replace_user_text_at(0, "B").unwrap();

        let edited = &store.messages()[0];
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.text, "B");
        assert!(edited.timestamp > original.timestamp);
    }

    #[test]
    fn drop_following_only_removes_assistant() {
        let mut store = MessageStore::new(Arc::new(SystemClock));
        store.append(Sender::User, "a");
        store.append(Sender::User, "b");
        assert!(store.drop_following_assistant_if_present(0).is_none());
        assert!(store.drop_following_assistant_if_present(1).is_none());
        store.append(Sender::Assistant, "reply");
        let dropped = store.drop_following_assistant_if_present(1).unwrap();
        assert_eq!(dropped.text, "reply");
        assert_eq!(store.len(), 2);
        assert!(store.drop_following_assistant_if_present(usize::MAX).is_none());
    }

    #[test]
    fn snapshot_round_trip_preserves_every_field() {
        let mut store = MessageStore::new(Arc::new(SystemClock));
        store.append(Sender::Assistant, "Hello! I'm your chat assistant.");
        store.append(Sender::User, "what's the weather?");
        store.append(Sender::Assistant, "No idea.\nCheck outside!");
        store.append(Sender::User, "thanks");

        let json = store.snapshot().to_json().unwrap();
        let restored = MessageStore::restore(Snapshot::from_json(&json).unwrap(), Arc::new(SystemClock)).unwrap();
        assert_eq!(restored.messages(), store.messages());
    }

    #[test]
    fn restored_store_keeps_issuing_later_ids() {
        let mut store = MessageStore::new(Arc::new(SystemClock));
        store.append(Sender::User, "a");
        let mut entries = store.snapshot();
        entries.0[0].id = format!("{:020}", u64::MAX / 2);

        let mut restored = MessageStore::restore(entries, Arc::new(SystemClock)).unwrap();
        let next = restored.append(Sender::Assistant, "b");
        assert!(next.id > restored.messages()[0].id);
    }

    #[test]
    fn appends_after_millisecond_ids_sort_last() {
        let json = r#"[
            {"id":"1760000000000","text":"Hello!","sender":"assistant","timestamp":"2025-10-09T08:53:20Z"},
            {"id":"1760000000500","text":"hi","sender":"user","timestamp":"2025-10-09T08:53:20.5Z"}
        ]"#;
        let mut store = MessageStore::restore(Snapshot::from_json(json).unwrap(), frozen_clock()).unwrap();
        let next = store.append(Sender::Assistant, "Hi there!");

        let ids: Vec<&MessageId> = store.messages().iter().map(|m| &m.id).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(ids.iter().max().copied(), Some(&next.id));
    }

    #[test]
    fn restore_rejects_bad_timestamp() {
        let json = r#"[{"id":"1","text":"hi","sender":"user","timestamp":"yesterday"}]"#;
        let err = MessageStore::restore(Snapshot::from_json(json).unwrap(), Arc::new(SystemClock));
        assert!(matches!(err, Err(StoreError::MalformedSnapshot(_))));
    }

    #[test]
    fn restore_rejects_duplicate_ids() {
        let json = r#"[
            {"id":"1","text":"a","sender":"user","timestamp":"2026-10-18T09:30:00Z"},
            {"id":"1","text":"b","sender":"assistant","timestamp":"2026-10-18T09:30:01Z"}
        ]"#;
        let err = MessageStore::restore(Snapshot::from_json(json).unwrap(), Arc::new(SystemClock));
        assert!(matches!(err, Err(StoreError::MalformedSnapshot(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn snapshot_parse_rejects_missing_fields_and_unknown_sender() {
        assert!(Snapshot::from_json(r#"[{"id":"1","text":"a"}]"#).is_err());
        assert!(
            Snapshot::from_json(
                r#"[{"id":"1","text":"a","sender":"bot","timestamp":"2026-10-18T09:30:00Z"}]"#
            ).is_err()
        );
        assert!(Snapshot::from_json("{not json").is_err());
    }
}
