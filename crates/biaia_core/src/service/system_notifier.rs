//! OS-level notification display.
//!
//! Only the live poller raises system notifications, and only when
//! permission was granted earlier. Anything else stays in-app.

use crate::model::notification::Notification;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Never asked.
    Default,
}

pub trait SystemNotifier: Send + Sync {
    fn permission(&self) -> Permission;
    fn show(&self, notification: &Notification);
}

/// Notifier for hosts without a system notification surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSystemNotifier;

impl SystemNotifier for NoopSystemNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn show(&self, _notification: &Notification) {}
}

/// Writes each alert to the log instead of a desktop surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSystemNotifier;

impl SystemNotifier for LogSystemNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn show(&self, notification: &Notification) {
        info!(
            "event=system_notification module=notifier status=ok id={} type={}",
            notification.id,
            notification.kind.as_str()
        );
    }
}
