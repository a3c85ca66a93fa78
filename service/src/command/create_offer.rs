//! [`Command`] for creating a new [`Offer`].

use std::collections::HashSet;

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{offer, user, Offer, Profile},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Offer`].
#[derive(Clone, Debug)]
pub struct CreateOffer {
    /// ID of the client posting the [`Offer`].
    pub user_id: user::Id,

    /// [`offer::Title`] of the new [`Offer`].
    pub title: offer::Title,

    /// [`offer::Description`] of the new [`Offer`].
    pub description: offer::Description,
}

impl<Db> Command<CreateOffer> for Service<Db>
where
    Db: Database<
            Select<By<Option<Profile>, user::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Offer>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Offer;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateOffer) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateOffer {
            user_id,
            title,
            description,
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

        let now = DateTime::now();
        let offer = Offer {
            id: offer::Id::new(),
            owner_id: user_id,
            title,
            description,
            status: offer::Status::Open,
            is_open_to_applications: true,
            assigned_professionals: HashSet::new(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(offer)
    }
}

/// Error of [`CreateOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// User posting the [`Offer`] does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// User posting the [`Offer`] is not a client.
    #[display("`User(id: {_0})` is not a client")]
    NotClient(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::offer, infra::database::memory, Command as _,
    };

    use super::{CreateOffer, ExecutionError};

    #[tokio::test]
    async fn creates_open_offer() {
        let (svc, mut inbox) = memory::service();
        let client = svc.database().client().await;

        let offer = svc
            .execute(CreateOffer {
                user_id: client,
                title: offer::Title::new("Paint the fence").unwrap(),
                description: offer::Description::new("Two layers").unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(offer.status, offer::Status::Open);
        assert!(offer.is_open_to_applications);
        assert!(offer.assigned_professionals.is_empty());
        assert_eq!(offer.owner_id, client);
        assert!(svc.database().offer(offer.id).await.is_some());
        assert!(memory::drain(&mut inbox).is_empty());
    }

    #[tokio::test]
    async fn forbids_professionals() {
        let (svc, _) = memory::service();
        let professional = svc.database().professional().await;

        let err = svc
            .execute(CreateOffer {
                user_id: professional,
                title: offer::Title::new("Paint the fence").unwrap(),
                description: offer::Description::new("Two layers").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotClient(id) if *id == professional,
        ));
    }
}
