//! [`Notifier`]-related implementations.

mod log;

use tokio::sync::mpsc;

use crate::domain::Notification;

pub use self::log::Log;

/// Delivery of [`Notification`]s to their recipients.
pub use common::Handler as Notifier;

/// Sending side of the in-process [`Notification`]s queue.
pub type Outbox = mpsc::UnboundedSender<Notification>;

/// Receiving side of the in-process [`Notification`]s queue.
pub type Inbox = mpsc::UnboundedReceiver<Notification>;

/// Creates a new in-process [`Notification`]s queue.
#[must_use]
pub fn queue() -> (Outbox, Inbox) {
    mpsc::unbounded_channel()
}
