use std::time::Duration;

/// How long a notification stays on screen after the latest `show`.
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// Single-slot transient message with a restartable dismiss cycle.
///
/// Every `show` bumps a generation token. A dismiss timer started for an
/// older token is ignored by `expire`, so re-showing restarts the delay.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Notification>,
    visible: bool,
    generation: u64,
    pending_timer: Option<u64>,
}

impl Notifier {
    pub fn show(&mut self, message: impl Into<String>, severity: Severity) -> u64 {
        self.generation += 1;
        self.current = Some(Notification {
            message: message.into(),
            severity,
        });
        self.visible = true;
        self.pending_timer = Some(self.generation);
        self.generation
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.show(message, Severity::Info)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.show(message, Severity::Error)
    }

    /// Hide the notification if `token` is still the latest one.
    pub fn expire(&mut self, token: u64) -> bool {
        if token == self.generation && self.visible {
            self.visible = false;
            true
        } else {
            false
        }
    }

    /// Token whose dismiss timer has not been started yet.
    pub fn take_pending_timer(&mut self) -> Option<u64> {
        self.pending_timer.take()
    }

    /// Visible notification, if any.
    pub fn visible(&self) -> Option<&Notification> {
        self.current.as_ref().filter(|_| self.visible)
    }
}
