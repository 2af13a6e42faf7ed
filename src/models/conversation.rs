use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationKind {
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "group")]
    Group,
}

impl ConversationKind {
    /// Kind is derived from the participant count, never caller-supplied.
    pub fn from_participant_count(count: usize) -> Self {
        if count == 2 {
            ConversationKind::Private
        } else {
            ConversationKind::Group
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Private => "private",
            ConversationKind::Group => "group",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "private" => ConversationKind::Private,
            _ => ConversationKind::Group,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Deterministic encoding of the participant set; unique across all
    /// conversations, order of the input irrelevant.
    pub canonical_key: String,
    pub kind: ConversationKind,
    pub created_by: Uuid,
    /// Ordered form kept for display; canonicalization sorts a copy.
    pub participants: Vec<Uuid>,
    /// Users who soft-deleted this conversation from their own view.
    pub removed_for: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// The uniform visibility rule: member of the conversation and not in
    /// its removed-for set.
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        self.is_participant(user_id) && !self.removed_for.contains(&user_id)
    }
}

/// Canonical key for a participant set: dedupe, sort by the Uuid total
/// order and join the hyphenated forms with ':'. A colon cannot appear
/// inside a UUID, so the encoding is injective.
pub fn canonical_key(participants: &[Uuid]) -> String {
    let mut sorted: Vec<Uuid> = participants.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(":")
}

/// Distinct participants in first-seen order, with the creator appended when
/// the caller left them out.
pub fn normalize_participants(participants: &[Uuid], created_by: Uuid) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(participants.len() + 1);
    for p in participants {
        if !out.contains(p) {
            out.push(*p);
        }
    }
    if !out.contains(&created_by) {
        out.push(created_by);
    }
    out
}
