//! [`Command`] for assigning an [`Offer`] to a professional.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        application, notification::Event, offer, user, Application, Offer,
        Profile,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for assigning an [`Offer`] to the professional of an accepted
/// [`Application`].
///
/// Every other non-rejected [`Application`] of the [`Offer`] is dismissed.
#[derive(Clone, Copy, Debug)]
pub struct AssignOffer {
    /// ID of the client owning the [`Offer`].
    pub user_id: user::Id,

    /// ID of the [`Offer`] to be assigned.
    pub offer_id: offer::Id,

    /// ID of the accepted [`Application`] to assign the [`Offer`] by.
    pub application_id: application::Id,
}

impl<Db> Command<AssignOffer> for Service<Db>
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
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Application>, offer::Id>>,
            Ok = Vec<Application>,
            Err = Traced<database::Error>,
        > + Database<Update<Offer>, Err = Traced<database::Error>>
        + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Offer;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AssignOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssignOffer {
            user_id,
            offer_id,
            application_id,
        } = cmd;

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

        // Only one concurrent assignment may see the `Offer` as open.
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
            .apply(offer::Transition::Assign)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let application = tx
            .execute(Select(By::<Option<Application>, _>::new(
                application_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|a| a.offer_id == offer_id)
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?;
        if application.status != application::Status::Accepted {
            return Err(tracerr::new!(E::ApplicationNotAccepted(
                application.status
            )));
        }

        _ = offer
            .assigned_professionals
            .insert(application.professional_id);
        tx.execute(Update(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let competitors = tx
            .execute(Select(By::<Vec<Application>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        for mut competitor in competitors {
            if competitor.id == application_id || !competitor.is_active() {
                continue;
            }
            competitor
                .apply(application::Transition::Dismiss)
                .map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Update(competitor))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify([Event::OfferAssigned {
            offer_id,
            application_id,
        }
        .to(application.professional_id)]);

        Ok(offer)
    }
}

/// Error of [`AssignOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Assigning user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Assigning user is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Assigning user doesn't own the [`Offer`].
    #[display("`Offer(id: {_0})` is owned by another user")]
    NotOwner(#[error(not(source))] offer::Id),

    /// [`Offer`] cannot be assigned in its current status.
    #[display("`Offer` transition failed: {_0}")]
    #[from]
    OfferTransition(offer::IllegalTransition),

    /// [`Application`] does not exist on the [`Offer`].
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// [`Application`] is not accepted.
    #[display("`Application` in `{_0}` status cannot be assigned")]
    ApplicationNotAccepted(#[error(not(source))] application::Status),

    /// [`Application`] cannot be dismissed.
    #[display("`Application` transition failed: {_0}")]
    #[from]
    ApplicationTransition(application::IllegalTransition),
}

#[cfg(test)]
mod spec {
    use futures::future;

    use crate::{
        domain::{application, notification::Event, offer},
        infra::database::memory,
        Command as _,
    };

    use super::{AssignOffer, ExecutionError};

    #[tokio::test]
    async fn assigns_and_dismisses_competitors() {
        use application::Status as S;

        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let offer = db.open_offer(client).await;
        let (winner, accepted, pending, invited, rejected) = (
            db.professional().await,
            db.professional().await,
            db.professional().await,
            db.professional().await,
            db.professional().await,
        );
        let chosen = db.application_in(offer.id, winner, S::Accepted).await;
        let accepted = db.application_in(offer.id, accepted, S::Accepted).await;
        let pending = db.application_in(offer.id, pending, S::Pending).await;
        let invited = db.application_in(offer.id, invited, S::Invited).await;
        let rejected = db.application_in(offer.id, rejected, S::Rejected).await;

        let assigned = svc
            .execute(AssignOffer {
                user_id: client,
                offer_id: offer.id,
                application_id: chosen.id,
            })
            .await
            .unwrap();

        assert_eq!(assigned.status, offer::Status::InProgress);
        assert!(assigned.assigned_professionals.contains(&winner));
        assert_eq!(assigned.assigned_professionals.len(), 1);

        let status = |id| async move {
            db.application(id).await.map(|a| a.status).unwrap()
        };
        assert_eq!(status(chosen.id).await, S::Accepted);
        for a in [&accepted, &pending, &invited, &rejected] {
            assert_eq!(status(a.id).await, S::Rejected);
        }

        assert_eq!(
            memory::drain(&mut inbox),
            [Event::OfferAssigned {
                offer_id: offer.id,
                application_id: chosen.id,
            }
            .to(winner)],
        );
    }

    #[tokio::test]
    async fn requires_accepted_application() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let offer = db.open_offer(client).await;
        let professional = db.professional().await;
        let pending = db
            .application_in(
                offer.id,
                professional,
                application::Status::Pending,
            )
            .await;

        let err = svc
            .execute(AssignOffer {
                user_id: client,
                offer_id: offer.id,
                application_id: pending.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ApplicationNotAccepted(
                application::Status::Pending
            ),
        ));
        assert_eq!(
            db.offer(offer.id).await.unwrap().status,
            offer::Status::Open,
        );
    }

    #[tokio::test]
    async fn concurrent_assignments_have_single_winner() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let offer = db.open_offer(client).await;
        let first = db.professional().await;
        let second = db.professional().await;
        let first = db
            .application_in(offer.id, first, application::Status::Accepted)
            .await;
        let second = db
            .application_in(offer.id, second, application::Status::Accepted)
            .await;

        let assign = |application_id| {
            svc.execute(AssignOffer {
                user_id: client,
                offer_id: offer.id,
                application_id,
            })
        };
        let (a, b) = future::join(assign(first.id), assign(second.id)).await;

        let (winner, loser, err) = match (a, b) {
            (Ok(_), Err(e)) => (first.id, second.id, e),
            (Err(e), Ok(_)) => (second.id, first.id, e),
            (a, b) => panic!("expected single winner, got: {a:?}, {b:?}"),
        };
        assert!(matches!(
            err.as_ref(),
            ExecutionError::OfferTransition(offer::IllegalTransition {
                transition: offer::Transition::Assign,
                from: offer::Status::InProgress,
            }),
        ));
        assert_eq!(
            db.application(winner).await.unwrap().status,
            application::Status::Accepted,
        );
        assert_eq!(
            db.application(loser).await.unwrap().status,
            application::Status::Rejected,
        );
        assert_eq!(
            db.offer(offer.id).await.unwrap().assigned_professionals.len(),
            1,
        );
    }
}
