pub mod housekeeping;
pub mod notification_dispatch;

pub use housekeeping::{spawn_denylist_sweep, spawn_rate_limit_sweep};
pub use notification_dispatch::{spawn_notification_dispatcher, NotificationDispatcher};
