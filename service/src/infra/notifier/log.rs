//! [`Log`] [`Notifier`] implementation.

use std::convert::Infallible;

use common::operations::Deliver;
use tracing as log;

use crate::domain::Notification;

use super::Notifier;

/// [`Notifier`] emitting every [`Notification`] as a structured log event.
///
/// Actual e-mail or push delivery is performed by external consumers of the
/// log stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Notifier<Deliver<Notification>> for Log {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Deliver(notification): Deliver<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification { recipient, event } = notification;
        log::info!(
            notification.kind = %event.kind(),
            notification.recipient = %recipient,
            offer.id = %event.offer_id(),
            ?event,
            "notification",
        );
        Ok(())
    }
}
