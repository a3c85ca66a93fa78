//! [`Command`] for a professional rejecting their [`Application`].

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

/// [`Command`] for a professional withdrawing their candidacy or declining
/// an invitation.
#[derive(Clone, Copy, Debug)]
pub struct RejectApplication {
    /// ID of the professional the [`Application`] belongs to.
    pub user_id: user::Id,

    /// ID of the [`Application`] to be rejected.
    pub application_id: application::Id,
}

impl<Db> Command<RejectApplication> for Service<Db>
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
        cmd: RejectApplication,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RejectApplication {
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
        let previous = application.status;
        application
            .apply(application::Transition::Withdraw)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let owner_id = tx
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotExists(offer_id))
            .map_err(tracerr::wrap!())?
            .owner_id;

        tx.execute(Update(application.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let event = if previous == application::Status::Invited {
            Event::InvitationDeclined {
                offer_id,
                application_id,
                professional_id: user_id,
            }
        } else {
            Event::ApplicationStatusChanged {
                offer_id,
                application_id,
                status: application.status,
            }
        };
        self.notify([event.to(owner_id)]);

        Ok(application)
    }
}

/// Error of [`RejectApplication`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Rejecting user does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// Rejecting user is not a professional.
    #[display("`User(id: {_0})` is not a professional")]
    NotProfessional(#[error(not(source))] user::Id),

    /// [`Application`] does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// [`Application`] belongs to another professional.
    #[display("`Application(id: {_0})` belongs to another professional")]
    NotSubject(#[error(not(source))] application::Id),

    /// [`Application`] is already accepted or rejected.
    #[display("`Application` transition failed: {_0}")]
    #[from]
    ApplicationTransition(application::IllegalTransition),

    /// [`Offer`] does not exist.
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),
}
