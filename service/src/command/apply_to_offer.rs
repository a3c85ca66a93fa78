//! [`Command`] for applying to an [`Offer`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
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

/// [`Command`] for a professional applying to an [`Offer`].
///
/// If the professional is already invited, the invitation is turned into a
/// candidacy instead, without consuming any quota.
#[derive(Clone, Debug)]
pub struct ApplyToOffer {
    /// ID of the applying professional.
    pub user_id: user::Id,

    /// ID of the [`Offer`] to apply to.
    pub offer_id: offer::Id,

    /// [`application::Proposal`] of the candidacy.
    pub proposal: Option<application::Proposal>,
}

impl<Db> Command<ApplyToOffer> for Service<Db>
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
            Select<By<Option<Application>, (offer::Id, user::Id)>>,
            Ok = Option<Application>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<quota::Usage>, (user::Id, quota::Resource)>>,
            Ok = Option<quota::Usage>,
            Err = Traced<database::Error>,
        > + Database<Insert<Application>, Err = Traced<database::Error>>
        + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Insert<quota::Consumption>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ApplyToOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApplyToOffer {
            user_id,
            offer_id,
            proposal,
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

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Keeps the `Offer` from being assigned while applying.
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
        if offer.status != offer::Status::Open {
            return Err(tracerr::new!(E::InvalidOfferStatus(offer.status)));
        }

        let pair = (offer_id, user_id);
        tx.execute(Lock(By::<Application, _>::new(pair)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let existing = tx
            .execute(Select(By::<Option<Application>, _>::new(pair)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let application = match existing {
            Some(mut invited)
                if invited.status == application::Status::Invited =>
            {
                invited
                    .apply(application::Transition::Submit)
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                let invited = invited.with_proposal(proposal);
                tx.execute(Update(invited.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                invited
            }
            Some(_) => {
                return Err(tracerr::new!(E::DuplicateApplication {
                    offer_id,
                    professional_id: user_id,
                }));
            }
            None => {
                if !offer.is_open_to_applications {
                    return Err(tracerr::new!(E::NotOpenToApplications(
                        offer_id
                    )));
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
                quota::check(usage.as_ref(), quota::Purpose::Consume)
                    .map_err(tracerr::from_and_wrap!(=> E))?;

                let submitted =
                    Application::submitted(offer_id, user_id, proposal);
                let inserted = tx.execute(Insert(submitted.clone())).await;
                if let Err(e) = &inserted {
                    if e.as_ref().is_unique_violation(None) {
                        return Err(tracerr::new!(E::DuplicateApplication {
                            offer_id,
                            professional_id: user_id,
                        }));
                    }
                }
                inserted
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                tx.execute(Insert(quota::Consumption::application(
                    user_id,
                    submitted.id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
                submitted
            }
        };

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify([Event::ApplicationSubmitted {
            offer_id,
            application_id: application.id,
            professional_id: user_id,
        }
        .to(offer.owner_id)]);

        Ok(application)
    }
}

/// Error of [`ApplyToOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Applying user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Applying user is not a professional.
    #[display("`User(id: {_0})` is not a professional")]
    NotProfessional(#[error(not(source))] user::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// [`Offer`] is not [`offer::Status::Open`].
    #[display("`Offer` in `{_0}` status doesn't accept applications")]
    InvalidOfferStatus(#[error(not(source))] offer::Status),

    /// [`Offer`] accepts invited professionals only.
    #[display("`Offer(id: {_0})` is not open to applications")]
    NotOpenToApplications(#[error(not(source))] offer::Id),

    /// Professional already has an [`Application`] on the [`Offer`].
    #[display(
        "`User(id: {professional_id})` already has an `Application` on \
         `Offer(id: {offer_id})`"
    )]
    DuplicateApplication {
        /// ID of the [`Offer`].
        offer_id: offer::Id,

        /// ID of the professional.
        professional_id: user::Id,
    },

    /// Subscription quota denies the application.
    #[display("Quota check failed: {_0}")]
    #[from]
    Quota(quota::Denial),

    /// Invitation cannot be turned into a candidacy.
    #[display("`Application` transition failed: {_0}")]
    #[from]
    ApplicationTransition(application::IllegalTransition),
}

#[cfg(test)]
mod spec {
    use futures::future;

    use crate::{
        domain::{application, notification::Event, offer, quota},
        infra::database::memory,
        Command as _,
    };

    use super::{ApplyToOffer, ExecutionError};

    #[tokio::test]
    async fn submits_candidacy() {
        let (svc, mut inbox) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, Some(3)).await;
        let offer = db.open_offer(client).await;

        let application = svc
            .execute(ApplyToOffer {
                user_id: professional,
                offer_id: offer.id,
                proposal: application::Proposal::new("Tomorrow works"),
            })
            .await
            .unwrap();

        assert_eq!(application.status, application::Status::Pending);
        assert_eq!(application.origin, application::Origin::Applied);
        assert!(application.proposal.is_some());
        assert_eq!(
            memory::drain(&mut inbox),
            [Event::ApplicationSubmitted {
                offer_id: offer.id,
                application_id: application.id,
                professional_id: professional,
            }
            .to(client)],
        );
    }

    #[tokio::test]
    async fn turns_invitation_into_candidacy_without_quota() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let mut offer = db.open_offer(client).await;
        offer.is_open_to_applications = false;
        db.put_offer(offer.clone()).await;
        let invitation = db
            .application_in(
                offer.id,
                professional,
                application::Status::Invited,
            )
            .await;

        let application = svc
            .execute(ApplyToOffer {
                user_id: professional,
                offer_id: offer.id,
                proposal: None,
            })
            .await
            .unwrap();

        assert_eq!(application.id, invitation.id);
        assert_eq!(application.status, application::Status::Pending);
        assert_eq!(application.origin, application::Origin::Invited);
    }

    #[tokio::test]
    async fn rejects_repeated_candidacy() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, None).await;

        for status in
            [application::Status::Pending, application::Status::Rejected]
        {
            let offer = db.open_offer(client).await;
            let existing =
                db.application_in(offer.id, professional, status).await;

            let err = svc
                .execute(ApplyToOffer {
                    user_id: professional,
                    offer_id: offer.id,
                    proposal: None,
                })
                .await
                .unwrap_err();

            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::DuplicateApplication { .. },
                ),
                "{status}",
            );
            let rows = db.applications_of(offer.id).await;
            assert_eq!(rows.len(), 1, "{status}");
            assert_eq!(rows[0].id, existing.id, "{status}");
            assert_eq!(rows[0].status, status, "{status}");
        }
    }

    #[tokio::test]
    async fn checks_professional_quota() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, Some(1)).await;
        let (first, second) =
            (db.open_offer(client).await, db.open_offer(client).await);

        let apply = |offer_id| ApplyToOffer {
            user_id: professional,
            offer_id,
            proposal: None,
        };
        drop(svc.execute(apply(first.id)).await.unwrap());

        let err = svc.execute(apply(second.id)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Quota(quota::Denial::Exhausted {
                limit: 1,
                used: 1,
            }),
        ));
        assert!(db.applications_of(second.id).await.is_empty());
    }

    #[tokio::test]
    async fn requires_subscription() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let offer = db.open_offer(client).await;

        let err = svc
            .execute(ApplyToOffer {
                user_id: professional,
                offer_id: offer.id,
                proposal: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Quota(quota::Denial::NoSubscription),
        ));
    }

    #[tokio::test]
    async fn requires_open_offer() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, None).await;
        let mut offer = db.open_offer(client).await;

        offer.is_open_to_applications = false;
        db.put_offer(offer.clone()).await;
        let apply = ApplyToOffer {
            user_id: professional,
            offer_id: offer.id,
            proposal: None,
        };
        let err = svc.execute(apply.clone()).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotOpenToApplications(id) if *id == offer.id,
        ));

        offer.status = offer::Status::Closed;
        db.put_offer(offer.clone()).await;
        let err = svc.execute(apply).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOfferStatus(offer::Status::Closed),
        ));
    }

    #[tokio::test]
    async fn concurrent_candidacies_on_same_offer_have_single_winner() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, None).await;
        let offer = db.open_offer(client).await;

        let apply = || {
            svc.execute(ApplyToOffer {
                user_id: professional,
                offer_id: offer.id,
                proposal: None,
            })
        };
        let (a, b) = future::join(apply(), apply()).await;

        let (winner, err) = match (a, b) {
            (Ok(w), Err(e)) | (Err(e), Ok(w)) => (w, e),
            (a, b) => panic!("expected single winner, got: {a:?}, {b:?}"),
        };
        assert!(matches!(
            err.as_ref(),
            ExecutionError::DuplicateApplication { offer_id, professional_id }
                if *offer_id == offer.id && *professional_id == professional,
        ));
        assert_eq!(
            db.applications_of(offer.id)
                .await
                .into_iter()
                .map(|a| a.id)
                .collect::<Vec<_>>(),
            [winner.id],
        );
        assert_eq!(db.consumed_by(professional).await, 1);
    }

    #[tokio::test]
    async fn concurrent_candidacies_never_overshoot_quota() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        db.subscribe(professional, Some(1)).await;
        let (first, second) =
            (db.open_offer(client).await, db.open_offer(client).await);

        let apply = |offer_id| {
            svc.execute(ApplyToOffer {
                user_id: professional,
                offer_id,
                proposal: None,
            })
        };
        let (a, b) = future::join(apply(first.id), apply(second.id)).await;

        let (winner, loser, err) = match (a, b) {
            (Ok(_), Err(e)) => (first.id, second.id, e),
            (Err(e), Ok(_)) => (second.id, first.id, e),
            (a, b) => panic!("expected single winner, got: {a:?}, {b:?}"),
        };
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Quota(quota::Denial::Exhausted {
                limit: 1,
                used: 1,
            }),
        ));
        assert_eq!(db.applications_of(winner).await.len(), 1);
        assert!(db.applications_of(loser).await.is_empty());
        assert_eq!(db.consumed_by(professional).await, 1);
    }
}
