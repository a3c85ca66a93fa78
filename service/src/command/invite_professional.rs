//! [`Command`] for inviting a professional to an [`Offer`].

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

/// [`Command`] for inviting a professional to an [`Offer`].
#[derive(Clone, Debug)]
pub struct InviteProfessional {
    /// ID of the client owning the [`Offer`].
    pub user_id: user::Id,

    /// ID of the [`Offer`] to invite to.
    pub offer_id: offer::Id,

    /// ID of the professional to be invited.
    pub professional_id: user::Id,

    /// [`application::Proposal`] attached to the invitation.
    pub proposal: Option<application::Proposal>,
}

impl<Db> Command<InviteProfessional> for Service<Db>
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

    async fn execute(
        &self,
        cmd: InviteProfessional,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let InviteProfessional {
            user_id,
            offer_id,
            professional_id,
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
        if !actor.can_post_offers() {
            return Err(tracerr::new!(E::NotClient(user_id)));
        }

        let invitee = self
            .database()
            .execute(Select(By::<Option<Profile>, _>::new(professional_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(professional_id))
            .map_err(tracerr::wrap!())?
            .actor();
        if !invitee.can_apply() {
            return Err(tracerr::new!(E::NotProfessional(professional_id)));
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
        if !offer.accepts_invitations() {
            return Err(tracerr::new!(E::InvalidOfferStatus(offer.status)));
        }

        // Avoid concurrent creation of the same `Application`.
        let pair = (offer_id, professional_id);
        tx.execute(Lock(By::<Application, _>::new(pair)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let existing = tx
            .execute(Select(By::<Option<Application>, _>::new(pair)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.as_ref().is_some_and(Application::is_active) {
            return Err(tracerr::new!(E::DuplicateApplication {
                offer_id,
                professional_id,
            }));
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

        let application = if let Some(mut rejected) = existing {
            // Re-use the row to keep the pair unique, along with its `Origin`.
            rejected
                .apply(application::Transition::Reinvite)
                .map_err(tracerr::from_and_wrap!(=> E))?;
            let rejected = rejected.with_proposal(proposal);
            tx.execute(Update(rejected.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            rejected
        } else {
            let invited =
                Application::invited(offer_id, professional_id, proposal);
            let inserted = tx.execute(Insert(invited.clone())).await;
            if let Err(e) = &inserted {
                if e.as_ref().is_unique_violation(None) {
                    return Err(tracerr::new!(E::DuplicateApplication {
                        offer_id,
                        professional_id,
                    }));
                }
            }
            inserted
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            invited
        };
        tx.execute(Insert(quota::Consumption::application(
            user_id,
            application.id,
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify([Event::InvitationSent {
            offer_id,
            application_id: application.id,
        }
        .to(professional_id)]);

        Ok(application)
    }
}

/// Error of [`InviteProfessional`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// User does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Inviting user is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),

    /// Invited user is not a professional.
    #[display("`User(id: {_0})` is not a professional")]
    NotProfessional(#[error(not(source))] user::Id),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// Inviting user doesn't own the [`Offer`].
    #[display("`Offer(id: {_0})` is owned by another user")]
    NotOwner(#[error(not(source))] offer::Id),

    /// [`Offer`] doesn't accept invitations in its current status.
    #[display("`Offer` in `{_0}` status doesn't accept invitations")]
    InvalidOfferStatus(#[error(not(source))] offer::Status),

    /// Professional already has an active [`Application`] on the [`Offer`].
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

    /// Subscription quota denies the invitation.
    #[display("Quota check failed: {_0}")]
    #[from]
    Quota(quota::Denial),

    /// [`Application`] cannot be re-invited.
    #[display("`Application` transition failed: {_0}")]
    #[from]
    ApplicationTransition(application::IllegalTransition),
}
