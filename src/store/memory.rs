//! In-memory implementations of the store traits, backed by `DashMap`.
//!
//! Used by the test suite and by embedders that want the messaging core
//! without a database. The canonical-key index uses the map's entry API so
//! the find-or-create stays atomic per key, mirroring the unique-index
//! upsert of the Postgres implementation.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{canonical_key, Conversation, ConversationKind, Message};
use crate::store::{ConversationStore, MessageStore};

#[derive(Default)]
pub struct MemoryStore {
    conversations: DashMap<Uuid, Conversation>,
    key_index: DashMap<String, Uuid>,
    messages: DashMap<Uuid, Message>,
    // Strictly increasing clock in microseconds so message ordering is
    // deterministic even when two writes land in the same instant.
    clock_us: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The two trait handles over one shared dataset.
    pub fn stores(self: &Arc<Self>) -> (MemoryConversationStore, MemoryMessageStore) {
        (
            MemoryConversationStore { inner: self.clone() },
            MemoryMessageStore { inner: self.clone() },
        )
    }

    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let prev = self
            .clock_us
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(wall.max(last + 1))
            })
            .unwrap_or(0);
        let us = wall.max(prev + 1);
        Utc.timestamp_micros(us).single().unwrap_or_else(Utc::now)
    }

    fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> bool {
        self.conversations
            .get(&conversation_id)
            .map(|c| c.is_participant(user_id))
            .unwrap_or(false)
    }

    fn touch_conversation(&self, conversation_id: Uuid, at: DateTime<Utc>) {
        if let Some(mut conv) = self.conversations.get_mut(&conversation_id) {
            conv.updated_at = at;
        }
    }
}

#[derive(Clone)]
pub struct MemoryConversationStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn upsert_by_participants(
        &self,
        participants: &[Uuid],
        created_by: Uuid,
    ) -> AppResult<Conversation> {
        let key = canonical_key(participants);
        let kind = ConversationKind::from_participant_count(participants.len());
        let now = self.inner.now();

        // The entry guard serializes concurrent upserts on the same key.
        match self.inner.key_index.entry(key.clone()) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                let mut conv = self
                    .inner
                    .conversations
                    .get_mut(&id)
                    .ok_or(AppError::NotFound)?;
                conv.participants = participants.to_vec();
                conv.kind = kind;
                conv.removed_for.retain(|u| *u != created_by);
                conv.updated_at = now;
                Ok(conv.clone())
            }
            Entry::Vacant(slot) => {
                let conv = Conversation {
                    id: Uuid::new_v4(),
                    canonical_key: key,
                    kind,
                    created_by,
                    participants: participants.to_vec(),
                    removed_for: Vec::new(),
                    created_at: now,
                    updated_at: now,
                };
                self.inner.conversations.insert(conv.id, conv.clone());
                slot.insert(conv.id);
                Ok(conv)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid, requesting_user: Uuid) -> AppResult<Conversation> {
        self.inner
            .conversations
            .get(&id)
            .filter(|c| c.is_participant(requesting_user))
            .map(|c| c.value().clone())
            .ok_or(AppError::NotFound)
    }

    async fn soft_delete_for_user(&self, id: Uuid, user_id: Uuid) -> AppResult<Conversation> {
        let now = self.inner.now();
        let mut conv = self.inner.conversations.get_mut(&id).ok_or(AppError::NotFound)?;
        if !conv.removed_for.contains(&user_id) {
            conv.removed_for.push(user_id);
        }
        conv.updated_at = now;
        Ok(conv.clone())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let mut out: Vec<Conversation> = self
            .inner
            .conversations
            .iter()
            .filter(|entry| entry.value().visible_to(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }
}

#[derive(Clone)]
pub struct MemoryMessageStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(
        &self,
        sender: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<Message> {
        if !self.inner.is_participant(conversation_id, sender) {
            return Err(AppError::InvalidConversation(
                "sender is not a participant of this conversation".into(),
            ));
        }

        let now = self.inner.now();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender,
            content: content.to_string(),
            removed_for: Vec::new(),
            created_at: now,
        };
        self.inner.messages.insert(message.id, message.clone());
        self.inner.touch_conversation(conversation_id, now);
        Ok(message)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: Uuid,
        requesting_user: Uuid,
    ) -> AppResult<Vec<Message>> {
        if !self.inner.is_participant(conversation_id, requesting_user) {
            return Err(AppError::InvalidConversation(
                "requesting user is not a participant of this conversation".into(),
            ));
        }

        let mut out: Vec<Message> = self
            .inner
            .messages
            .iter()
            .filter(|entry| {
                let m = entry.value();
                m.conversation_id == conversation_id && m.visible_to(requesting_user)
            })
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn soft_delete_for_user(&self, message_id: Uuid, user_id: Uuid) -> AppResult<Message> {
        let mut message = self
            .inner
            .messages
            .get_mut(&message_id)
            .ok_or(AppError::NotFound)?;
        if !message.removed_for.contains(&user_id) {
            message.removed_for.push(user_id);
        }
        Ok(message.clone())
    }

    async fn cascade_remove_for_user(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        for mut entry in self.inner.messages.iter_mut() {
            if entry.conversation_id == conversation_id && !entry.removed_for.contains(&user_id) {
                entry.removed_for.push(user_id);
            }
        }
        Ok(())
    }

    async fn latest_visible(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Message>> {
        let latest = self
            .inner
            .messages
            .iter()
            .filter(|entry| {
                let m = entry.value();
                m.conversation_id == conversation_id && m.visible_to(user_id)
            })
            .map(|entry| entry.value().clone())
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_keyed_on_the_participant_set() {
        let store = MemoryStore::new();
        let (conversations, _) = store.stores();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let first = conversations.upsert_by_participants(&[a, b], a).await.unwrap();
        let second = conversations.upsert_by_participants(&[b, a], b).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn concurrent_upserts_create_one_conversation() {
        let store = MemoryStore::new();
        let (conversations, _) = store.stores();
        let conversations = Arc::new(conversations);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let mut handles = Vec::new();
        for creator in [a, b, c, a, b, c, a, b] {
            let stores = conversations.clone();
            handles.push(tokio::spawn(async move {
                stores.upsert_by_participants(&[a, b, c], creator).await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1, "every upsert must resolve to the same conversation");
    }

    #[tokio::test]
    async fn message_clock_is_strictly_increasing() {
        let store = MemoryStore::new();
        let (conversations, messages) = store.stores();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let conv = conversations.upsert_by_participants(&[a, b], a).await.unwrap();

        let m1 = messages.create(a, conv.id, "one").await.unwrap();
        let m2 = messages.create(a, conv.id, "two").await.unwrap();
        assert!(m2.created_at > m1.created_at);
    }
}
