//! The messaging facade: the six operations the transport tier calls,
//! with authorization and structural validation layered over the stores.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{conversation::normalize_participants, Conversation, Message};
use crate::services::directory::UserDirectory;
use crate::services::inbox::{InboxAggregator, InboxEntry};
use crate::services::notifier::{ChangeEvent, ChangeNotifier};
use crate::store::{ConversationStore, MessageStore};

/// Orchestrates the stores and the external collaborators. All dependencies
/// are injected; nothing in here is a process-wide singleton.
pub struct MessagingService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn ChangeNotifier>,
    inbox: InboxAggregator,
}

impl MessagingService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        let inbox = InboxAggregator::new(
            conversations.clone(),
            messages.clone(),
            directory.clone(),
        );
        Self {
            conversations,
            messages,
            directory,
            notifier,
            inbox,
        }
    }

    /// Cap the number of inbox entries returned; wired from
    /// `Config::max_inbox_entries` by the embedder.
    pub fn with_inbox_limit(mut self, limit: usize) -> Self {
        self.inbox = self.inbox.with_limit(limit);
        self
    }

    /// Find-or-create the conversation for a participant set. The creator is
    /// added to the set when missing; the kind (private vs group) is derived
    /// from the resulting count, never taken from the caller. Re-requesting
    /// an existing set undeletes the conversation for the creator argument.
    pub async fn create_conversation(
        &self,
        participants: &[Uuid],
        created_by: Uuid,
    ) -> AppResult<Conversation> {
        let participants = normalize_participants(participants, created_by);
        if participants.len() < 2 {
            return Err(AppError::InvalidEntity(
                "a conversation needs at least 2 distinct participants".into(),
            ));
        }

        // Participants must be known to the user directory before we write;
        // the check is explicit here rather than hidden in a storage hook.
        for participant in &participants {
            if !self.directory.exists(*participant).await? {
                return Err(AppError::InvalidEntity(format!(
                    "unknown participant: {participant}"
                )));
            }
        }

        let conversation = self
            .conversations
            .upsert_by_participants(&participants, created_by)
            .await?;

        self.emit(ChangeEvent::new(
            "conversation.upserted",
            conversation.id,
            json!({
                "kind": conversation.kind,
                "participants": conversation.participants,
                "created_by": created_by,
            }),
        ))
        .await;

        Ok(conversation)
    }

    pub async fn create_message(
        &self,
        sender: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<Message> {
        if content.trim().is_empty() {
            return Err(AppError::InvalidEntity("message content cannot be empty".into()));
        }

        let message = self.messages.create(sender, conversation_id, content).await?;

        self.emit(ChangeEvent::new(
            "message.new",
            conversation_id,
            json!({
                "message_id": message.id,
                "sender_id": message.sender_id,
                "created_at": message.created_at,
            }),
        ))
        .await;

        Ok(message)
    }

    /// Visible messages of a conversation, oldest first. A participant who
    /// has soft-deleted the conversation still gets a list (possibly empty);
    /// only non-participants are rejected.
    pub async fn list_conversation_messages(
        &self,
        requesting_user: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Vec<Message>> {
        self.messages
            .list_by_conversation(conversation_id, requesting_user)
            .await
    }

    pub async fn list_inbox(&self, user_id: Uuid) -> AppResult<Vec<InboxEntry>> {
        self.inbox.latest_messages_for_user(user_id).await
    }

    /// Remove a message from the requesting user's own view. The requester
    /// does not have to be the sender; everyone curates their own copy.
    pub async fn delete_message(
        &self,
        requesting_user: Uuid,
        message_id: Uuid,
    ) -> AppResult<Message> {
        let message = self
            .messages
            .soft_delete_for_user(message_id, requesting_user)
            .await?;

        self.emit(ChangeEvent::new(
            "message.removed",
            message.conversation_id,
            json!({
                "message_id": message.id,
                "user_id": requesting_user,
            }),
        ))
        .await;

        Ok(message)
    }

    /// Soft-delete the conversation for the requester and cascade the same
    /// mark onto its messages. The cascade is best effort; re-running it is
    /// a no-op for already-marked messages.
    pub async fn delete_conversation(
        &self,
        requesting_user: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Conversation> {
        let conversation = self
            .conversations
            .soft_delete_for_user(conversation_id, requesting_user)
            .await?;
        self.messages
            .cascade_remove_for_user(conversation_id, requesting_user)
            .await?;

        self.emit(ChangeEvent::new(
            "conversation.removed",
            conversation_id,
            json!({ "user_id": requesting_user }),
        ))
        .await;

        Ok(conversation)
    }

    /// Notifier failures must not fail the write that produced the event.
    async fn emit(&self, event: ChangeEvent) {
        if let Err(e) = self.notifier.publish(&event).await {
            tracing::warn!(
                event_type = %event.event_type,
                conversation_id = %event.conversation_id,
                error = %e,
                "change notification dropped"
            );
        }
    }
}
