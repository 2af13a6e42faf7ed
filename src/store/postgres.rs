//! sqlx/Postgres implementations of the store traits.
//!
//! Conversation dedup leans on the unique index over `canonical_key`: the
//! upsert is a single `INSERT .. ON CONFLICT DO UPDATE`, so concurrent
//! requests for the same participant set can never create two rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{canonical_key, Conversation, ConversationKind, Message};
use crate::store::{ConversationStore, MessageStore};

const CONVERSATION_COLUMNS: &str =
    "id, canonical_key, kind, created_by, participants, removed_for, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, removed_for, created_at";

fn conversation_from_row(row: &PgRow) -> Conversation {
    let kind: String = row.get("kind");
    Conversation {
        id: row.get("id"),
        canonical_key: row.get("canonical_key"),
        kind: ConversationKind::from_str(&kind),
        created_by: row.get("created_by"),
        participants: row.get("participants"),
        removed_for: row.get("removed_for"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        removed_for: row.get("removed_for"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[derive(Clone)]
pub struct PgConversationStore {
    db: Pool<Postgres>,
}

impl PgConversationStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn upsert_by_participants(
        &self,
        participants: &[Uuid],
        created_by: Uuid,
    ) -> AppResult<Conversation> {
        let key = canonical_key(participants);
        let kind = ConversationKind::from_participant_count(participants.len());

        let sql = format!(
            "INSERT INTO conversations (id, canonical_key, kind, created_by, participants) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (canonical_key) DO UPDATE \
             SET participants = EXCLUDED.participants, \
                 kind = EXCLUDED.kind, \
                 removed_for = array_remove(conversations.removed_for, $4), \
                 updated_at = NOW() \
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&key)
            .bind(kind.as_str())
            .bind(created_by)
            .bind(participants)
            .fetch_one(&self.db)
            .await
            .map_err(|e| AppError::storage("upsert conversation", e))?;

        Ok(conversation_from_row(&row))
    }

    async fn find_by_id(&self, id: Uuid, requesting_user: Uuid) -> AppResult<Conversation> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE id = $1 AND $2 = ANY(participants)"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(requesting_user)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::storage("find conversation", e))?;

        row.map(|r| conversation_from_row(&r)).ok_or(AppError::NotFound)
    }

    async fn soft_delete_for_user(&self, id: Uuid, user_id: Uuid) -> AppResult<Conversation> {
        // CASE keeps the add idempotent: deleting twice leaves one entry.
        let sql = format!(
            "UPDATE conversations \
             SET removed_for = CASE WHEN $2 = ANY(removed_for) THEN removed_for \
                                    ELSE array_append(removed_for, $2) END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::storage("soft delete conversation", e))?;

        row.map(|r| conversation_from_row(&r)).ok_or(AppError::NotFound)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE $1 = ANY(participants) AND NOT $1 = ANY(removed_for) \
             ORDER BY updated_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::storage("list conversations", e))?;

        Ok(rows.iter().map(conversation_from_row).collect())
    }
}

#[derive(Clone)]
pub struct PgMessageStore {
    db: Pool<Postgres>,
}

impl PgMessageStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    /// Membership gate shared by the write and read paths. Missing
    /// conversation and non-participant collapse into one answer.
    async fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM conversations WHERE id = $1 AND $2 = ANY(participants) LIMIT 1",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::storage("check membership", e))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create(
        &self,
        sender: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<Message> {
        if !self.is_participant(conversation_id, sender).await? {
            return Err(AppError::InvalidConversation(
                "sender is not a participant of this conversation".into(),
            ));
        }

        let sql = format!(
            "INSERT INTO messages (id, conversation_id, sender_id, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(conversation_id)
            .bind(sender)
            .bind(content)
            .fetch_one(&self.db)
            .await
            .map_err(|e| AppError::storage("insert message", e))?;

        // Bump conversation activity so list_for_user sorts it first.
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::storage("touch conversation", e))?;

        Ok(message_from_row(&row))
    }

    async fn list_by_conversation(
        &self,
        conversation_id: Uuid,
        requesting_user: Uuid,
    ) -> AppResult<Vec<Message>> {
        if !self.is_participant(conversation_id, requesting_user).await? {
            return Err(AppError::InvalidConversation(
                "requesting user is not a participant of this conversation".into(),
            ));
        }

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 AND NOT $2 = ANY(removed_for) \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(conversation_id)
            .bind(requesting_user)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::storage("list messages", e))?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn soft_delete_for_user(&self, message_id: Uuid, user_id: Uuid) -> AppResult<Message> {
        let sql = format!(
            "UPDATE messages \
             SET removed_for = CASE WHEN $2 = ANY(removed_for) THEN removed_for \
                                    ELSE array_append(removed_for, $2) END \
             WHERE id = $1 \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(message_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::storage("soft delete message", e))?;

        row.map(|r| message_from_row(&r)).ok_or(AppError::NotFound)
    }

    async fn cascade_remove_for_user(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        // Filtering on membership makes retries no-ops for already-cascaded
        // rows, so partial failure is safe to re-run.
        sqlx::query(
            "UPDATE messages SET removed_for = array_append(removed_for, $2) \
             WHERE conversation_id = $1 AND NOT $2 = ANY(removed_for)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::storage("cascade remove messages", e))?;
        Ok(())
    }

    async fn latest_visible(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 AND NOT $2 = ANY(removed_for) \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(conversation_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::storage("latest visible message", e))?;

        Ok(row.map(|r| message_from_row(&r)))
    }
}
