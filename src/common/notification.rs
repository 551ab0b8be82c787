//! Notifications from the core to the surrounding application

use std::fmt;

/// Category of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Free-form status text
    Console,
    /// Driving mode change (e.g. "Autonomous", "Navigation", "Parked")
    ControlMode,
    /// Toggle state of a UI button
    ButtonState,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::Console => "console",
            NotificationKind::ControlMode => "control-mode",
            NotificationKind::ButtonState => "button-state",
        };
        f.write_str(s)
    }
}

/// Fire-and-forget sink for UI/telemetry notifications.
///
/// Implementations must not block the caller and must not fail observably.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, name: Option<&str>, data: &str);
}

/// Sink that writes every notification to the log facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, kind: NotificationKind, name: Option<&str>, data: &str) {
        match name {
            Some(name) => log::info!("[{}] {}: {}", kind, name, data),
            None => log::info!("[{}] {}", kind, data),
        }
    }
}
