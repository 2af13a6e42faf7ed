pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Conversation, Message};

pub use memory::{MemoryConversationStore, MemoryMessageStore, MemoryStore};
pub use postgres::{PgConversationStore, PgMessageStore};

/// Conversation persistence. Implementations must keep the canonical-key
/// uniqueness guarantee under concurrent upserts: the find-or-create must be
/// a single atomic storage operation, not a read followed by a write.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Find-or-create by the canonical key of `participants`. On the create
    /// path the record starts with an empty removed-for set; on the update
    /// path participants and kind are refreshed and `created_by` (the value
    /// passed here, not the stored creator) is pulled out of removed-for, so
    /// re-requesting a conversation undeletes it for the requester.
    ///
    /// `participants` is expected to be normalized already (distinct, at
    /// least two entries, creator included).
    async fn upsert_by_participants(
        &self,
        participants: &[Uuid],
        created_by: Uuid,
    ) -> AppResult<Conversation>;

    /// `NotFound` when the id is absent or `requesting_user` is not a
    /// participant; non-participants cannot distinguish the two.
    async fn find_by_id(&self, id: Uuid, requesting_user: Uuid) -> AppResult<Conversation>;

    /// Idempotent set-add of `user_id` to the removed-for set.
    async fn soft_delete_for_user(&self, id: Uuid, user_id: Uuid) -> AppResult<Conversation>;

    /// Conversations where `user_id` is a participant and has not removed
    /// the conversation, most recently updated first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>>;
}

/// Message persistence. All reads apply the per-user visibility rule.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// `InvalidConversation` when the conversation is missing or `sender`
    /// is not a current participant.
    async fn create(
        &self,
        sender: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<Message>;

    /// Visible messages of a conversation in `created_at` ascending order.
    /// `InvalidConversation` when `requesting_user` is not a participant; a
    /// participant who soft-deleted the conversation still gets a (possibly
    /// empty) list.
    async fn list_by_conversation(
        &self,
        conversation_id: Uuid,
        requesting_user: Uuid,
    ) -> AppResult<Vec<Message>>;

    /// Idempotent set-add of `user_id` to the message's removed-for set.
    async fn soft_delete_for_user(&self, message_id: Uuid, user_id: Uuid) -> AppResult<Message>;

    /// Bulk set-add over every message of the conversation; best effort and
    /// safe to retry.
    async fn cascade_remove_for_user(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()>;

    /// Newest message of the conversation still visible to `user_id`, ties
    /// on `created_at` broken by the larger message id.
    async fn latest_visible(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Message>>;
}
