//! [`Command`] for an [`Offer`] owner deciding on an [`Application`].

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

/// [`Command`] for an [`Offer`] owner accepting or rejecting an
/// [`Application`].
///
/// Never changes the [`Offer`] itself.
#[derive(Clone, Copy, Debug)]
pub struct UpdateApplicationStatus {
    /// ID of the client owning the [`Offer`].
    pub user_id: user::Id,

    /// ID of the [`Application`] to decide on.
    pub application_id: application::Id,

    /// [`Decision`] of the owner.
    pub decision: Decision,
}

/// Decision of an [`Offer`] owner on an [`Application`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Decision {
    /// [`Application`] is accepted.
    Accept,

    /// [`Application`] is rejected.
    Reject,
}

impl From<Decision> for application::Transition {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accept => Self::Accept,
            Decision::Reject => Self::Reject,
        }
    }
}

impl<Db> Command<UpdateApplicationStatus> for Service<Db>
where
    Db: Database<
            Select<By<Option<Profile>, user::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
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
        > + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateApplicationStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateApplicationStatus {
            user_id,
            application_id,
            decision,
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

        let offer_id = self
            .database()
            .execute(Select(By::<Option<Application>, _>::new(
                application_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?
            .offer_id;

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
        if offer.status != offer::Status::Open {
            return Err(tracerr::new!(E::InvalidOfferStatus(offer.status)));
        }

        let mut application = tx
            .execute(Select(By::<Option<Application>, _>::new(
                application_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|a| a.offer_id == offer_id)
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?;
        application
            .apply(decision.into())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(application.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify([Event::ApplicationStatusChanged {
            offer_id,
            application_id,
            status: application.status,
        }
        .to(application.professional_id)]);

        Ok(application)
    }
}

/// Error of [`UpdateApplicationStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Deciding user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Deciding user is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),

    /// [`Application`] does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Deciding user doesn't own the [`Offer`].
    #[display("`Offer(id: {_0})` is owned by another user")]
    NotOwner(#[error(not(source))] offer::Id),

    /// [`Offer`] is not [`offer::Status::Open`].
    #[display("`Offer` in `{_0}` status doesn't take decisions")]
    InvalidOfferStatus(#[error(not(source))] offer::Status),

    /// [`Decision`] is not allowed in the current [`application::Status`].
    #[display("`Application` transition failed: {_0}")]
    #[from]
    ApplicationTransition(application::IllegalTransition),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{application, notification::Event, offer},
        infra::database::memory,
        Command as _,
    };

    use super::{Decision, ExecutionError, UpdateApplicationStatus};

    #[tokio::test]
    async fn accepts_pending_application() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let offer = db.open_offer(client).await;
        let pending = db
            .application_in(
                offer.id,
                professional,
                application::Status::Pending,
            )
            .await;

        let accepted = svc
            .execute(UpdateApplicationStatus {
                user_id: client,
                application_id: pending.id,
                decision: Decision::Accept,
            })
            .await
            .unwrap();

        assert_eq!(accepted.status, application::Status::Accepted);
        assert_eq!(
            db.offer(offer.id).await.unwrap().status,
            offer::Status::Open,
        );
        assert_eq!(
            memory::drain(&mut inbox),
            [Event::ApplicationStatusChanged {
                offer_id: offer.id,
                application_id: pending.id,
                status: application::Status::Accepted,
            }
            .to(professional)],
        );
    }

    #[tokio::test]
    async fn rejects_accepted_application() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let offer = db.open_offer(client).await;
        let accepted = db
            .application_in(
                offer.id,
                professional,
                application::Status::Accepted,
            )
            .await;

        let rejected = svc
            .execute(UpdateApplicationStatus {
                user_id: client,
                application_id: accepted.id,
                decision: Decision::Reject,
            })
            .await
            .unwrap();

        assert_eq!(rejected.status, application::Status::Rejected);
    }

    #[tokio::test]
    async fn accepts_invited_professional() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let offer = db.open_offer(client).await;
        let invitation = db
            .application_in(
                offer.id,
                professional,
                application::Status::Invited,
            )
            .await;

        let accepted = svc
            .execute(UpdateApplicationStatus {
                user_id: client,
                application_id: invitation.id,
                decision: Decision::Accept,
            })
            .await
            .unwrap();

        assert_eq!(accepted.status, application::Status::Accepted);
        assert_eq!(accepted.origin, application::Origin::Invited);
        assert_eq!(
            db.application(invitation.id).await.map(|a| a.status),
            Some(application::Status::Accepted),
        );
        assert_eq!(memory::drain(&mut inbox).len(), 1);
    }

    #[tokio::test]
    async fn cannot_accept_rejected_application() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let offer = db.open_offer(client).await;
        let rejected = db
            .application_in(
                offer.id,
                professional,
                application::Status::Rejected,
            )
            .await;

        let err = svc
            .execute(UpdateApplicationStatus {
                user_id: client,
                application_id: rejected.id,
                decision: Decision::Accept,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ApplicationTransition(
                application::IllegalTransition {
                    transition: application::Transition::Accept,
                    from: application::Status::Rejected,
                }
            ),
        ));
    }

    #[tokio::test]
    async fn requires_open_offer() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let mut offer = db.open_offer(client).await;
        offer.status = offer::Status::InProgress;
        db.put_offer(offer.clone()).await;
        let pending = db
            .application_in(
                offer.id,
                professional,
                application::Status::Pending,
            )
            .await;

        let err = svc
            .execute(UpdateApplicationStatus {
                user_id: client,
                application_id: pending.id,
                decision: Decision::Accept,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOfferStatus(offer::Status::InProgress),
        ));
    }
}
