//! [`Command`] for completing an [`Offer`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{notification::Event, offer, user, Offer, Profile},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for marking an [`Offer`] in progress as completed.
#[derive(Clone, Copy, Debug)]
pub struct CompleteOffer {
    /// ID of the client owning the [`Offer`].
    pub user_id: user::Id,

    /// ID of the [`Offer`] to be completed.
    pub offer_id: offer::Id,
}

impl<Db> Command<CompleteOffer> for Service<Db>
where
    Db: Database<
            Select<By<Option<Profile>, user::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Offer, offer::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Offer>, offer::Id>>,
            Ok = Option<Offer>,
            Err = Traced<database::Error>,
        > + Database<Update<Offer>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Offer;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CompleteOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CompleteOffer { user_id, offer_id } = cmd;

        let actor = self
            .database()
            .execute(Select(By::<Option<Profile>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?
            .actor();
        if !actor.can_post_offers() {
            return Err(tracerr::new!(E::NotClient(user_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Offer, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let mut offer = tx
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?;
        if !offer.is_owned_by(user_id) {
            return Err(tracerr::new!(E::NotOwner(offer_id)));
        }
        offer
            .apply(offer::Transition::Complete)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(
            offer
                .assigned_professionals
                .iter()
                .map(|id| Event::OfferCompleted { offer_id }.to(*id)),
        );

        Ok(offer)
    }
}

/// Error of [`CompleteOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Completing user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Completing user is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Completing user doesn't own the [`Offer`].
    #[display("`Offer(id: {_0})` is owned by another user")]
    NotOwner(#[error(not(source))] offer::Id),

    /// [`Offer`] is not in progress.
    #[display("`Offer` transition failed: {_0}")]
    #[from]
    OfferTransition(offer::IllegalTransition),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{notification::Event, offer},
        infra::database::memory,
        Command as _,
    };

    use super::{CompleteOffer, ExecutionError};

    #[tokio::test]
    async fn completes_offer_in_progress() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let assignee = db.professional().await;
        let mut offer = db.open_offer(client).await;
        offer.status = offer::Status::InProgress;
        _ = offer.assigned_professionals.insert(assignee);
        db.put_offer(offer.clone()).await;

        let completed = svc
            .execute(CompleteOffer {
                user_id: client,
                offer_id: offer.id,
            })
            .await
            .unwrap();

        assert_eq!(completed.status, offer::Status::Completed);
        assert_eq!(
            memory::drain(&mut inbox),
            [Event::OfferCompleted { offer_id: offer.id }.to(assignee)],
        );
    }

    #[tokio::test]
    async fn rejects_open_offer() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let offer = db.open_offer(client).await;

        let err = svc
            .execute(CompleteOffer {
                user_id: client,
                offer_id: offer.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OfferTransition(offer::IllegalTransition {
                transition: offer::Transition::Complete,
                from: offer::Status::Open,
            }),
        ));
        assert!(memory::drain(&mut inbox).is_empty());
    }
}
