//! [`Command`] for accepting an invitation to an [`Offer`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        application, notification::Event, offer, quota, user, Application,
        Offer, Profile,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for an invited professional accepting the invitation
/// directly, making their [`Application`] [`application::Status::Accepted`].
///
/// Passes the quota check even if the professional's quota is exhausted.
#[derive(Clone, Copy, Debug)]
pub struct AcceptInvitation {
    /// ID of the invited professional.
    pub user_id: user::Id,

    /// ID of the [`Application`] representing the invitation.
    pub application_id: application::Id,
}

impl<Db> Command<AcceptInvitation> for Service<Db>
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
            Lock<By<Application, (offer::Id, user::Id)>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<quota::Usage, user::Id>>,
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
            Select<By<Option<quota::Usage>, (user::Id, quota::Resource)>>,
            Ok = Option<quota::Usage>,
            Err = Traced<database::Error>,
        > + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AcceptInvitation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AcceptInvitation {
            user_id,
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
        if !actor.can_apply() {
            return Err(tracerr::new!(E::NotProfessional(user_id)));
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
        tx.execute(Lock(By::<Application, _>::new((offer_id, user_id))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut application = tx
            .execute(Select(By::<Option<Application>, _>::new(
                application_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?;
        if application.professional_id != user_id {
            return Err(tracerr::new!(E::NotSubject(application_id)));
        }
        application
            .apply(application::Transition::AcceptInvitation)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let offer = tx
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?;
        if !offer.accepts_invitations() {
            return Err(tracerr::new!(E::InvalidOfferStatus(offer.status)));
        }

        tx.execute(Lock(By::<quota::Usage, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let usage = tx
            .execute(Select(By::<Option<quota::Usage>, _>::new((
                user_id,
                quota::Resource::Applications,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        quota::check(usage.as_ref(), quota::Purpose::InvitedResponse)
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
        .to(offer.owner_id)]);

        Ok(application)
    }
}

/// Error of [`AcceptInvitation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Accepting user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Accepting user is not a professional.
    #[display("`User(id: {_0})` is not a professional")]
    NotProfessional(#[error(not(source))] user::Id),

    /// [`Application`] does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// [`Application`] belongs to another professional.
    #[display("`Application(id: {_0})` belongs to another professional")]
    NotSubject(#[error(not(source))] application::Id),

    /// [`Application`] is not an invitation awaiting response.
    #[display("`Application` transition failed: {_0}")]
    #[from]
    ApplicationTransition(application::IllegalTransition),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// [`Offer`] doesn't accept invitations in its current status.
    #[display("`Offer` in `{_0}` status doesn't accept invitations")]
    InvalidOfferStatus(#[error(not(source))] offer::Status),

    /// Subscription quota denies the acceptance.
    #[display("Quota check failed: {_0}")]
    #[from]
    Quota(quota::Denial),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{application, notification::Event, offer, quota},
        infra::database::memory,
        Command as _,
    };

    use super::{AcceptInvitation, ExecutionError};

    #[tokio::test]
    async fn accepts_invitation_with_exhausted_quota() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, Some(1)).await;
        let other = db.open_offer(client).await;
        drop(
            db.application_in(
                other.id,
                professional,
                application::Status::Pending,
            )
            .await,
        );
        let offer = db.open_offer(client).await;
        let invitation = db
            .application_in(
                offer.id,
                professional,
                application::Status::Invited,
            )
            .await;

        let accepted = svc
            .execute(AcceptInvitation {
                user_id: professional,
                application_id: invitation.id,
            })
            .await
            .unwrap();

        assert_eq!(accepted.status, application::Status::Accepted);
        assert_eq!(
            memory::drain(&mut inbox),
            [Event::ApplicationStatusChanged {
                offer_id: offer.id,
                application_id: invitation.id,
                status: application::Status::Accepted,
            }
            .to(client)],
        );
    }

    #[tokio::test]
    async fn forbidding_plan_blocks_acceptance() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, Some(0)).await;
        let offer = db.open_offer(client).await;
        let invitation = db
            .application_in(
                offer.id,
                professional,
                application::Status::Invited,
            )
            .await;

        let err = svc
            .execute(AcceptInvitation {
                user_id: professional,
                application_id: invitation.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Quota(quota::Denial::Forbidden),
        ));
        assert_eq!(
            db.application(invitation.id).await.unwrap().status,
            application::Status::Invited,
        );
    }

    #[tokio::test]
    async fn only_invitee_may_accept() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let (invitee, intruder) =
            (db.professional().await, db.professional().await);
        db.subscribe(intruder, None).await;
        let offer = db.open_offer(client).await;
        let invitation = db
            .application_in(offer.id, invitee, application::Status::Invited)
            .await;

        let err = svc
            .execute(AcceptInvitation {
                user_id: intruder,
                application_id: invitation.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotSubject(id) if *id == invitation.id,
        ));
    }

    #[tokio::test]
    async fn requires_pending_invitation_on_live_offer() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, None).await;
        let mut offer = db.open_offer(client).await;
        let pending = db
            .application_in(
                offer.id,
                professional,
                application::Status::Pending,
            )
            .await;
        let accept = AcceptInvitation {
            user_id: professional,
            application_id: pending.id,
        };

        let err = svc.execute(accept).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::ApplicationTransition(
                application::IllegalTransition {
                    transition: application::Transition::AcceptInvitation,
                    from: application::Status::Pending,
                }
            ),
        ));

        let mut invitation = pending;
        invitation.status = application::Status::Invited;
        db.put_application(invitation).await;
        offer.status = offer::Status::Closed;
        db.put_offer(offer).await;

        let err = svc.execute(accept).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOfferStatus(offer::Status::Closed),
        ));
    }
}
