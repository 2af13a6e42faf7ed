pub mod directory;
pub mod inbox;
pub mod messaging;
pub mod notifier;

pub use directory::{HttpUserDirectory, StaticDirectory, UserDirectory};
pub use inbox::{InboxAggregator, InboxEntry};
pub use messaging::MessagingService;
pub use notifier::{ChangeEvent, ChangeNotifier, NullNotifier, RedisNotifier};
