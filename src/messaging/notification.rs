// Notifications - error and status reports for the user-facing layer
//
// The cpal error callback cannot log through the scheduling loop, so it
// pushes a notification here and the loop forwards it to the logger.

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Subsystem that raised the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Audio,
    /// Terminal input thread
    Input,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    /// Unix time in milliseconds
    pub timestamp: u64,
}

impl Notification {
    pub fn new(level: NotificationLevel, category: NotificationCategory, message: String) -> Self {
        Self {
            level,
            category,
            message,
            timestamp: unix_millis(),
        }
    }

    pub fn info(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }

    /// Forward to the `log` facade at the matching level
    pub fn log(&self) {
        let level = match self.level {
            NotificationLevel::Info => log::Level::Info,
            NotificationLevel::Warning => log::Level::Warn,
            NotificationLevel::Error => log::Level::Error,
        };
        log::log!(level, "[{:?}] {}", self.category, self.message);
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_helpers() {
        let info = Notification::info(NotificationCategory::Audio, "connected".to_string());
        let warning = Notification::warning(NotificationCategory::Input, "ignored".to_string());
        let error = Notification::error(NotificationCategory::Audio, "boom".to_string());

        assert_eq!(info.level, NotificationLevel::Info);
        assert_eq!(warning.level, NotificationLevel::Warning);
        assert_eq!(error.level, NotificationLevel::Error);
        assert_eq!(error.message, "boom");
        assert!(info.timestamp > 0);
    }
}
