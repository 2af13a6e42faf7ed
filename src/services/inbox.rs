//! Inbox aggregation: one entry per conversation, carrying the latest
//! message still visible to the requesting user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::UserSummary;
use crate::services::directory::UserDirectory;
use crate::store::{ConversationStore, MessageStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub content: String,
    pub sender: UserSummary,
    pub other_participants: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
}

pub struct InboxAggregator {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    limit: usize,
}

impl InboxAggregator {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            conversations,
            messages,
            directory,
            limit: 100,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Application-level join over the two stores, recomputed per call.
    /// Visibility is applied at every stage: conversations the user removed
    /// never contribute, and a removed latest message falls back to the
    /// next-latest visible one via the store. Conversations with no visible
    /// message are dropped.
    pub async fn latest_messages_for_user(&self, user_id: Uuid) -> AppResult<Vec<InboxEntry>> {
        let conversations = self.conversations.list_for_user(user_id).await?;

        let mut entries = Vec::with_capacity(conversations.len().min(self.limit));
        for conversation in conversations {
            let Some(message) = self
                .messages
                .latest_visible(conversation.id, user_id)
                .await?
            else {
                continue;
            };

            let sender = self.resolve(message.sender_id).await?;
            let other_participants = try_join_all(
                conversation
                    .participants
                    .iter()
                    .filter(|p| **p != user_id)
                    .map(|p| self.resolve(*p)),
            )
            .await?;

            entries.push(InboxEntry {
                conversation_id: conversation.id,
                message_id: message.id,
                content: message.content,
                sender,
                other_participants,
                created_at: message.created_at,
            });
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.message_id.cmp(&a.message_id))
        });
        entries.truncate(self.limit);
        Ok(entries)
    }

    /// A participant can disappear from the directory after the fact
    /// (account deletion); the inbox degrades to an id-only summary instead
    /// of failing the whole listing.
    async fn resolve(&self, user_id: Uuid) -> AppResult<UserSummary> {
        Ok(self
            .directory
            .summarize(user_id)
            .await?
            .unwrap_or(UserSummary {
                id: user_id,
                display_name: user_id.to_string(),
                avatar_url: None,
            }))
    }
}
