use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    /// Users who soft-deleted this message from their own view. The record
    /// itself is never hard-deleted.
    pub removed_for: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        !self.removed_for.contains(&user_id)
    }
}
