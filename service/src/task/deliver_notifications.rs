//! [`DeliverNotifications`] [`Task`].

use std::{convert::Infallible, fmt::Display};

use common::operations::{Deliver, Perform, Start};
use tracing as log;

use crate::{
    domain::Notification,
    infra::{notifier, Notifier},
    Service,
};

use super::Task;

/// [`Task`] draining the [`Notification`]s queue of a [`Service`] and
/// passing them to a [`Notifier`].
#[derive(Debug)]
pub struct DeliverNotifications<N> {
    /// [`Notifier`] delivering [`Notification`]s.
    notifier: N,

    /// Queue of [`Notification`]s to be delivered.
    inbox: notifier::Inbox,
}

impl<N> DeliverNotifications<N> {
    /// Creates a new [`DeliverNotifications`] [`Task`] draining the provided
    /// [`notifier::Inbox`] into the provided [`Notifier`].
    #[must_use]
    pub const fn new(notifier: N, inbox: notifier::Inbox) -> Self {
        Self { notifier, inbox }
    }
}

impl<Db, N> Task<Start<DeliverNotifications<N>>> for Service<Db>
where
    DeliverNotifications<N>:
        Task<Perform<Notification>, Ok = (), Err: Display>,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(mut task): Start<DeliverNotifications<N>>,
    ) -> Result<Self::Ok, Self::Err> {
        while let Some(n) = task.inbox.recv().await {
            let (kind, recipient) = (n.event.kind(), n.recipient);
            _ = task.execute(Perform(n)).await.map_err(|e| {
                log::error!(
                    "`task::DeliverNotifications` failed to deliver `{kind}` \
                     to `User(id: {recipient})`: {e}",
                );
            });
        }
        log::debug!("`task::DeliverNotifications` finished: queue is closed");
        Ok(())
    }
}

impl<N> Task<Perform<Notification>> for DeliverNotifications<N>
where
    N: Notifier<Deliver<Notification>, Ok = ()>,
{
    type Ok = ();
    type Err = N::Err;

    async fn execute(
        &self,
        Perform(notification): Perform<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.notifier.execute(Deliver(notification)).await
    }
}

#[cfg(test)]
mod spec {
    use std::{
        convert::Infallible,
        sync::{Arc, Mutex},
    };

    use common::operations::{Deliver, Start};
    use derive_more::{Display, Error};

    use crate::{
        domain::{notification::Event, offer, user, Notification},
        infra::{database::memory, Notifier},
        Task as _,
    };

    use super::DeliverNotifications;

    /// [`Notifier`] recording delivered [`Notification`]s.
    #[derive(Clone, Debug, Default)]
    struct Recording(Arc<Mutex<Vec<Notification>>>);

    impl Notifier<Deliver<Notification>> for Recording {
        type Ok = ();
        type Err = Infallible;

        async fn execute(
            &self,
            Deliver(n): Deliver<Notification>,
        ) -> Result<Self::Ok, Self::Err> {
            self.0.lock().unwrap().push(n);
            Ok(())
        }
    }

    #[derive(Debug, Display, Error)]
    #[display("unreachable")]
    struct Unreachable;

    /// [`Notifier`] failing to deliver anything.
    #[derive(Clone, Copy, Debug)]
    struct Failing;

    impl Notifier<Deliver<Notification>> for Failing {
        type Ok = ();
        type Err = Unreachable;

        async fn execute(
            &self,
            _: Deliver<Notification>,
        ) -> Result<Self::Ok, Self::Err> {
            Err(Unreachable)
        }
    }

    fn closed(offer_id: offer::Id) -> Notification {
        Event::OfferClosed { offer_id }.to(user::Id::new())
    }

    #[tokio::test]
    async fn delivers_queued_notifications_in_order() {
        let (svc, inbox) = memory::service();
        let sent = [closed(offer::Id::new()), closed(offer::Id::new())];
        svc.notify(sent);
        let (drainer, _) = memory::service();
        drop(svc);

        let recording = Recording::default();
        drainer
            .execute(Start(DeliverNotifications::new(recording.clone(), inbox)))
            .await
            .unwrap();

        assert_eq!(*recording.0.lock().unwrap(), sent);
    }

    #[tokio::test]
    async fn swallows_delivery_failures() {
        let (svc, inbox) = memory::service();
        svc.notify([closed(offer::Id::new())]);
        let (drainer, _) = memory::service();
        drop(svc);

        let res = drainer
            .execute(Start(DeliverNotifications::new(Failing, inbox)))
            .await;
        assert!(res.is_ok());
    }
}
