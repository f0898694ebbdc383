pub mod config;
pub mod logging;
pub mod notifications;

pub use config::MintdeskConfig;
pub use notifications::{AppNotification, NotificationStore, NotificationType};
