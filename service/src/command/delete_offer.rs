//! [`Command`] for deleting an [`Offer`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{offer, user, Offer, Profile},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting an [`Offer`] along with all its
/// [`Application`]s.
///
/// [`Application`]: crate::domain::Application
#[derive(Clone, Copy, Debug)]
pub struct DeleteOffer {
    /// ID of the client owning the [`Offer`].
    pub user_id: user::Id,

    /// ID of the [`Offer`] to be deleted.
    pub offer_id: offer::Id,
}

impl<Db> Command<DeleteOffer> for Service<Db>
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
            Delete<By<Offer, offer::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteOffer { user_id, offer_id } = cmd;

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
        let offer = tx
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?;
        if !offer.is_owned_by(user_id) {
            return Err(tracerr::new!(E::NotOwner(offer_id)));
        }

        tx.execute(Delete(By::<Offer, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`DeleteOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Deleting user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Deleting user is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Deleting user doesn't own the [`Offer`].
    #[display("`Offer(id: {_0})` is owned by another user")]
    NotOwner(#[error(not(source))] offer::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::ApplyToOffer,
        domain::{application, quota},
        infra::database::memory,
        Command as _,
    };

    use super::{DeleteOffer, ExecutionError};

    #[tokio::test]
    async fn deletes_offer_with_applications() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let offer = db.open_offer(client).await;
        let application = db
            .application_in(
                offer.id,
                professional,
                application::Status::Pending,
            )
            .await;

        svc.execute(DeleteOffer {
            user_id: client,
            offer_id: offer.id,
        })
        .await
        .unwrap();

        assert!(db.offer(offer.id).await.is_none());
        assert!(db.application(application.id).await.is_none());
    }

    #[tokio::test]
    async fn requires_owner() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let (owner, stranger) = (db.client().await, db.client().await);
        let offer = db.open_offer(owner).await;

        let err = svc
            .execute(DeleteOffer {
                user_id: stranger,
                offer_id: offer.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotOwner(id) if *id == offer.id,
        ));
        assert!(db.offer(offer.id).await.is_some());
    }

    #[tokio::test]
    async fn deletion_keeps_quota_consumed() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, Some(1)).await;
        let (deleted, other) =
            (db.open_offer(client).await, db.open_offer(client).await);

        let apply = |offer_id| ApplyToOffer {
            user_id: professional,
            offer_id,
            proposal: None,
        };
        drop(svc.execute(apply(deleted.id)).await.unwrap());
        svc.execute(DeleteOffer {
            user_id: client,
            offer_id: deleted.id,
        })
        .await
        .unwrap();

        assert_eq!(db.consumed_by(professional).await, 1);
        let err = svc.execute(apply(other.id)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            crate::command::apply_to_offer::ExecutionError::Quota(
                quota::Denial::Exhausted { limit: 1, used: 1 },
            ),
        ));
    }
}
