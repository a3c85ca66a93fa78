//! [`Command`] for closing an [`Offer`].

use std::collections::HashSet;

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        notification::Event, offer, user, Application, Offer, Profile,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for closing an [`Offer`] by its owner.
///
/// Notifies the assigned professionals and the ones whose [`Application`]s
/// are still [`Invited`] or [`Pending`].
///
/// [`Invited`]: crate::domain::application::Status::Invited
/// [`Pending`]: crate::domain::application::Status::Pending
#[derive(Clone, Copy, Debug)]
pub struct CloseOffer {
    /// ID of the client owning the [`Offer`].
    pub user_id: user::Id,

    /// ID of the [`Offer`] to be closed.
    pub offer_id: offer::Id,
}

impl<Db> Command<CloseOffer> for Service<Db>
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
        > + Database<
            Select<By<Vec<Application>, offer::Id>>,
            Ok = Vec<Application>,
            Err = Traced<database::Error>,
        > + Database<Update<Offer>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Offer;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CloseOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CloseOffer { user_id, offer_id } = cmd;

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
            .apply(offer::Transition::Close)
            .map_err(|e| tracerr::new!(E::AlreadyClosed(e.from)))?;

        tx.execute(Update(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let applications = tx
            .execute(Select(By::<Vec<Application>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut notified = HashSet::new();
        let recipients = offer
            .assigned_professionals
            .iter()
            .copied()
            .chain(
                applications
                    .iter()
                    .filter(|a| a.is_undecided())
                    .map(|a| a.professional_id),
            )
            .filter(|id| notified.insert(*id));
        self.notify(
            recipients.map(|id| Event::OfferClosed { offer_id }.to(id)),
        );

        Ok(offer)
    }
}

/// Error of [`CloseOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Closing user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Closing user is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Closing user doesn't own the [`Offer`].
    #[display("`Offer(id: {_0})` is owned by another user")]
    NotOwner(#[error(not(source))] offer::Id),

    /// [`Offer`] is already closed or completed.
    #[display("`Offer` is already `{_0}`")]
    AlreadyClosed(#[error(not(source))] offer::Status),
}
