//! Real-time change notifications.
//!
//! The facade emits an event after every successful write; delivery to
//! connected clients is the realtime gateway's concern. Emission is
//! fire-and-forget: a failed publish is logged and never fails the write
//! that produced it.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub conversation_id: Uuid,
    pub payload: Value,
}

impl ChangeEvent {
    pub fn new(event_type: &str, conversation_id: Uuid, payload: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            conversation_id,
            payload,
        }
    }
}

#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn publish(&self, event: &ChangeEvent) -> AppResult<()>;
}

fn channel_for_conversation(id: Uuid) -> String {
    format!("conversation:{}", id)
}

/// Publishes events on Redis pub/sub, one channel per conversation. The
/// realtime gateway pattern-subscribes on `conversation:*` and fans out to
/// websocket clients.
#[derive(Clone)]
pub struct RedisNotifier {
    client: redis::Client,
}

impl RedisNotifier {
    pub fn new(redis_url: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Config(format!("invalid redis url: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChangeNotifier for RedisNotifier {
    async fn publish(&self, event: &ChangeEvent) -> AppResult<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::Config(format!("event serialization: {e}")))?;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Config(format!("redis connection: {e}")))?;
        conn.publish::<_, _, ()>(channel_for_conversation(event.conversation_id), payload)
            .await
            .map_err(|e| AppError::Config(format!("redis publish: {e}")))?;
        Ok(())
    }
}

/// Drops every event. Useful in tests and batch tooling.
#[derive(Default, Clone)]
pub struct NullNotifier;

#[async_trait]
impl ChangeNotifier for NullNotifier {
    async fn publish(&self, _event: &ChangeEvent) -> AppResult<()> {
        Ok(())
    }
}
