pub mod conversation;
pub mod message;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use conversation::{canonical_key, Conversation, ConversationKind};
pub use message::Message;

/// Lightweight projection of a user, resolved through the user directory.
/// This is all the inbox needs to render a sender or participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
