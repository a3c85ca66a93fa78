//! [`Command`] for reactivating a closed or completed [`Offer`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        application, notification::Event, offer, user, Application, Offer,
        Profile,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for reactivating a [`offer::Status::Closed`] or
/// [`offer::Status::Completed`] [`Offer`].
///
/// [`offer::ReactivationMode::ContinueWithProfessional`] falls back to
/// [`offer::ReactivationMode::ReopenToAll`] if the [`Offer`] has no assigned
/// professionals.
#[derive(Clone, Copy, Debug)]
pub struct ReactivateOffer {
    /// ID of the client owning the [`Offer`].
    pub user_id: user::Id,

    /// ID of the [`Offer`] to be reactivated.
    pub offer_id: offer::Id,

    /// Requested [`offer::ReactivationMode`].
    pub mode: offer::ReactivationMode,
}

/// Output of [`ReactivateOffer`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Output {
    /// Reactivated [`Offer`].
    pub offer: Offer,

    /// [`offer::ReactivationMode`] effectively applied.
    pub mode: offer::ReactivationMode,
}

impl<Db> Command<ReactivateOffer> for Service<Db>
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
        + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ReactivateOffer,
    ) -> Result<Self::Ok, Self::Err> {
        use offer::ReactivationMode as Mode;
        use ExecutionError as E;

        let ReactivateOffer {
            user_id,
            offer_id,
            mode,
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

        let mode = if mode == Mode::ContinueWithProfessional
            && offer.assigned_professionals.is_empty()
        {
            log::debug!(
                offer.id = %offer_id,
                "no assigned professionals to continue with, reopening",
            );
            Mode::ReopenToAll
        } else {
            mode
        };

        let previously_assigned = offer.assigned_professionals.clone();
        match mode {
            Mode::ContinueWithProfessional => {
                offer
                    .apply(offer::Transition::Continue)
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                offer.is_open_to_applications = false;
            }
            Mode::ReopenToAll => {
                offer
                    .apply(offer::Transition::Reopen)
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                offer.is_open_to_applications = true;
                offer.assigned_professionals.clear();

                let applications = tx
                    .execute(Select(By::<Vec<Application>, _>::new(offer_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                for mut application in applications {
                    application
                        .apply(application::Transition::Dismiss)
                        .map_err(tracerr::from_and_wrap!(=> E))?;
                    tx.execute(Update(application))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))
                        .map(drop)?;
                }
            }
        }

        tx.execute(Update(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(
            previously_assigned
                .into_iter()
                .map(|id| Event::OfferReactivated { offer_id, mode }.to(id)),
        );

        Ok(Output { offer, mode })
    }
}

/// Error of [`ReactivateOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Reactivating user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Reactivating user is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Reactivating user doesn't own the [`Offer`].
    #[display("`Offer(id: {_0})` is owned by another user")]
    NotOwner(#[error(not(source))] offer::Id),

    /// [`Offer`] is neither closed nor completed.
    #[display("`Offer` transition failed: {_0}")]
    #[from]
    OfferTransition(offer::IllegalTransition),

    /// [`Application`] cannot be dismissed.
    #[display("`Application` transition failed: {_0}")]
    #[from]
    ApplicationTransition(application::IllegalTransition),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{application, notification::Event, offer, user, Offer},
        infra::database::memory::{self, Memory},
        Command as _,
    };

    use super::{ExecutionError, ReactivateOffer};

    /// Stores a [`offer::Status::Completed`] [`Offer`] with the provided
    /// assignees, each having an accepted [`application::Application`], and
    /// one more pending competitor.
    async fn completed_offer(
        db: &Memory,
        owner: user::Id,
        assignees: &[user::Id],
    ) -> Offer {
        let mut offer = db.open_offer(owner).await;
        offer.status = offer::Status::Completed;
        offer.is_open_to_applications = false;
        offer.assigned_professionals.extend(assignees.iter().copied());
        db.put_offer(offer.clone()).await;
        for id in assignees {
            drop(
                db.application_in(offer.id, *id, application::Status::Accepted)
                    .await,
            );
        }
        let competitor = db.professional().await;
        drop(
            db.application_in(
                offer.id,
                competitor,
                application::Status::Pending,
            )
            .await,
        );
        offer
    }

    #[tokio::test]
    async fn continues_with_assigned_professional() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let assignee = db.professional().await;
        let offer = completed_offer(db, client, &[assignee]).await;

        let out = svc
            .execute(ReactivateOffer {
                user_id: client,
                offer_id: offer.id,
                mode: offer::ReactivationMode::ContinueWithProfessional,
            })
            .await
            .unwrap();

        assert_eq!(out.mode, offer::ReactivationMode::ContinueWithProfessional);
        assert_eq!(out.offer.status, offer::Status::InProgress);
        assert!(!out.offer.is_open_to_applications);
        assert!(out.offer.assigned_professionals.contains(&assignee));
        assert!(db
            .applications_of(offer.id)
            .await
            .iter()
            .all(application::Application::is_active));
        assert_eq!(
            memory::drain(&mut inbox),
            [Event::OfferReactivated {
                offer_id: offer.id,
                mode: offer::ReactivationMode::ContinueWithProfessional,
            }
            .to(assignee)],
        );
    }

    #[tokio::test]
    async fn reopens_to_all() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let assignee = db.professional().await;
        let offer = completed_offer(db, client, &[assignee]).await;

        let out = svc
            .execute(ReactivateOffer {
                user_id: client,
                offer_id: offer.id,
                mode: offer::ReactivationMode::ReopenToAll,
            })
            .await
            .unwrap();

        assert_eq!(out.mode, offer::ReactivationMode::ReopenToAll);
        assert_eq!(out.offer.status, offer::Status::Open);
        assert!(out.offer.is_open_to_applications);
        assert!(out.offer.assigned_professionals.is_empty());
        let applications = db.applications_of(offer.id).await;
        assert_eq!(applications.len(), 2);
        assert!(applications.iter().all(|a| !a.is_active()));
        assert_eq!(
            memory::drain(&mut inbox),
            [Event::OfferReactivated {
                offer_id: offer.id,
                mode: offer::ReactivationMode::ReopenToAll,
            }
            .to(assignee)],
        );
    }

    #[tokio::test]
    async fn continuing_without_assignees_reopens() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let continued = completed_offer(db, client, &[]).await;
        let reopened = completed_offer(db, client, &[]).await;

        let reactivate = |offer_id, mode| {
            svc.execute(ReactivateOffer {
                user_id: client,
                offer_id,
                mode,
            })
        };
        let fallback = reactivate(
            continued.id,
            offer::ReactivationMode::ContinueWithProfessional,
        )
        .await
        .unwrap();
        let reopening =
            reactivate(reopened.id, offer::ReactivationMode::ReopenToAll)
                .await
                .unwrap();

        let outcome = |offer: Offer| {
            (
                offer.status,
                offer.is_open_to_applications,
                offer.assigned_professionals,
            )
        };
        let statuses = |applications: Vec<application::Application>| {
            applications
                .into_iter()
                .map(|a| a.status)
                .collect::<Vec<_>>()
        };

        assert_eq!(fallback.mode, reopening.mode);
        assert_eq!(fallback.mode, offer::ReactivationMode::ReopenToAll);
        assert_eq!(outcome(fallback.offer), outcome(reopening.offer));
        assert_eq!(
            db.offer(continued.id).await.map(outcome),
            db.offer(reopened.id).await.map(outcome),
        );
        assert_eq!(
            statuses(db.applications_of(continued.id).await),
            statuses(db.applications_of(reopened.id).await),
        );
        assert_eq!(
            statuses(db.applications_of(continued.id).await),
            [application::Status::Rejected],
        );
        assert!(memory::drain(&mut inbox).is_empty());
    }

    #[tokio::test]
    async fn requires_closed_or_completed_offer() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let offer = db.open_offer(client).await;

        let err = svc
            .execute(ReactivateOffer {
                user_id: client,
                offer_id: offer.id,
                mode: offer::ReactivationMode::ReopenToAll,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OfferTransition(offer::IllegalTransition {
                transition: offer::Transition::Reopen,
                from: offer::Status::Open,
            }),
        ));
    }
}
