//! Shared harness: the facade wired over the in-memory stores, a static
//! user directory and a no-op notifier.

use std::sync::Arc;

use messaging_core::services::{MessagingService, NullNotifier, StaticDirectory};
use messaging_core::store::{MemoryConversationStore, MemoryMessageStore, MemoryStore};

pub struct TestHarness {
    pub service: MessagingService,
    pub directory: Arc<StaticDirectory>,
    pub conversations: MemoryConversationStore,
    pub messages: MemoryMessageStore,
}

pub fn harness() -> TestHarness {
    let store = MemoryStore::new();
    let (conversations, messages) = store.stores();
    let directory = Arc::new(StaticDirectory::new());
    let service = MessagingService::new(
        Arc::new(conversations.clone()),
        Arc::new(messages.clone()),
        directory.clone(),
        Arc::new(NullNotifier),
    );
    TestHarness {
        service,
        directory,
        conversations,
        messages,
    }
}
