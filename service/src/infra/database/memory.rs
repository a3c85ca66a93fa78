//! In-memory [`Database`] implementation used in tests.
//!
//! Transactions are serialized: a [`Tx`] holds the whole [`State`]
//! exclusively until committed or dropped, so [`Lock`]s are no-ops.

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{Arc, Mutex as SyncMutex},
};

use common::{
    operations::{
        By, Commit, Delete, Insert, Lock, Select, Transact, Update,
    },
    pagination, DateTime,
};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;
use uuid::Uuid;

use crate::{
    domain::{
        application, offer, quota, user, Application, Notification, Offer,
        Profile,
    },
    infra::{database, notifier, Database},
    read, Config, Service,
};

/// Entities stored in a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`Offer`]s.
    pub offers: HashMap<offer::Id, Offer>,

    /// Stored [`Application`]s.
    pub applications: HashMap<application::Id, Application>,

    /// Known [`Profile`]s.
    pub profiles: HashMap<user::Id, Profile>,

    /// Limits of the active subscriptions.
    pub subscriptions: HashMap<user::Id, Option<u32>>,

    /// Recorded [`quota::Consumption`]s.
    pub consumptions: Vec<quota::Consumption>,
}

impl State {
    /// Returns the [`Application`] of the provided professional on the
    /// provided [`Offer`], if any.
    fn application_by_pair(
        &self,
        offer_id: offer::Id,
        professional_id: user::Id,
    ) -> Option<&Application> {
        self.applications.values().find(|a| {
            a.offer_id == offer_id && a.professional_id == professional_id
        })
    }

    /// Calculates [`quota::Usage`] of the provided user.
    fn usage(
        &self,
        user_id: user::Id,
        resource: quota::Resource,
    ) -> Option<quota::Usage> {
        let limit = *self.subscriptions.get(&user_id)?;
        let used = self
            .consumptions
            .iter()
            .filter(|c| c.user_id == user_id && c.resource == resource)
            .count();
        Some(quota::Usage {
            limit,
            used: u32::try_from(used).unwrap(),
        })
    }
}

/// Name of the unique constraint over an [`Offer`] and a professional of an
/// [`Application`], as named by Postgres.
pub const APPLICATION_PAIR_CONSTRAINT: &str =
    "applications_offer_id_professional_id_key";

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if this [`Error`] is a unique violation of the specified
    /// constraint (or of any constraint, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match *self {
            Self::UniqueViolation(name) => {
                constraint.map_or(true, |c| c == name)
            }
        }
    }
}

/// Non-transactional access to a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct NonTx(Arc<Mutex<State>>);

/// Transactional access to a [`Memory`] database.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Exclusive access to the committed [`State`].
    guard: Arc<Mutex<Option<OwnedMutexGuard<State>>>>,

    /// Working copy of the [`State`] to be committed.
    state: Arc<SyncMutex<State>>,
}

/// Access to the [`State`] of a [`Memory`] database.
pub trait Access {
    /// Runs the provided function over the accessible [`State`].
    fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = R>;
}

impl Access for NonTx {
    async fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut *self.0.lock().await)
    }
}

impl Access for Tx {
    async fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub struct Memory<C = NonTx>(C);

impl Memory {
    /// Registers a new client, returning its ID.
    pub async fn client(&self) -> user::Id {
        self.user(false).await
    }

    /// Registers a new professional, returning its ID.
    pub async fn professional(&self) -> user::Id {
        self.user(true).await
    }

    /// Registers a new user with the provided kind of [`Profile`].
    async fn user(&self, has_professional_profile: bool) -> user::Id {
        let user_id = user::Id::new();
        self.0
            .with(|s| {
                drop(s.profiles.insert(
                    user_id,
                    Profile {
                        user_id,
                        has_professional_profile,
                    },
                ));
            })
            .await;
        user_id
    }

    /// Activates a subscription with the provided `limit` for the provided
    /// user.
    pub async fn subscribe(&self, user_id: user::Id, limit: Option<u32>) {
        self.0
            .with(|s| drop(s.subscriptions.insert(user_id, limit)))
            .await;
    }

    /// Returns a snapshot of the stored [`Offer`].
    pub async fn offer(&self, id: offer::Id) -> Option<Offer> {
        self.0.with(|s| s.offers.get(&id).cloned()).await
    }

    /// Returns a snapshot of the stored [`Application`].
    pub async fn application(
        &self,
        id: application::Id,
    ) -> Option<Application> {
        self.0.with(|s| s.applications.get(&id).cloned()).await
    }

    /// Returns a snapshot of all the [`Application`]s of the provided
    /// [`Offer`].
    pub async fn applications_of(
        &self,
        offer_id: offer::Id,
    ) -> Vec<Application> {
        self.0
            .with(|s| {
                s.applications
                    .values()
                    .filter(|a| a.offer_id == offer_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Stores a new [`offer::Status::Open`] [`Offer`] of the provided client.
    pub async fn open_offer(&self, owner_id: user::Id) -> Offer {
        let now = DateTime::now();
        let offer = Offer {
            id: offer::Id::new(),
            owner_id,
            title: offer::Title::new("Fix the roof").unwrap(),
            description: offer::Description::new("Leaks after rain").unwrap(),
            status: offer::Status::Open,
            is_open_to_applications: true,
            assigned_professionals: HashSet::new(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        self.put_offer(offer.clone()).await;
        offer
    }

    /// Stores a new [`Application`] of the provided professional in the
    /// provided [`application::Status`].
    ///
    /// The quota is consumed as if the [`Application`] was created by its
    /// [`application::Origin`] side: invitations by the [`Offer`] owner,
    /// candidacies by the professional.
    pub async fn application_in(
        &self,
        offer_id: offer::Id,
        professional_id: user::Id,
        status: application::Status,
    ) -> Application {
        let mut application = if status == application::Status::Invited {
            Application::invited(offer_id, professional_id, None)
        } else {
            Application::submitted(offer_id, professional_id, None)
        };
        application.status = status;
        let stored = application.clone();
        self.0
            .with(|s| {
                let consumer = match stored.origin {
                    application::Origin::Applied => Some(professional_id),
                    application::Origin::Invited => {
                        s.offers.get(&offer_id).map(|o| o.owner_id)
                    }
                };
                if let Some(user_id) = consumer {
                    s.consumptions.push(quota::Consumption::application(
                        user_id, stored.id,
                    ));
                }
                drop(s.applications.insert(stored.id, stored));
            })
            .await;
        application
    }

    /// Returns the amount of [`quota::Consumption`]s of the provided user.
    pub async fn consumed_by(&self, user_id: user::Id) -> usize {
        self.0
            .with(|s| {
                s.consumptions.iter().filter(|c| c.user_id == user_id).count()
            })
            .await
    }

    /// Overwrites the stored [`Offer`] bypassing any lifecycle rules.
    pub async fn put_offer(&self, offer: Offer) {
        self.0
            .with(|s| drop(s.offers.insert(offer.id, offer)))
            .await;
    }

    /// Overwrites the stored [`Application`] bypassing any lifecycle rules.
    pub async fn put_application(&self, application: Application) {
        self.0
            .with(|s| drop(s.applications.insert(application.id, application)))
            .await;
    }
}

/// Creates a new [`Service`] backed by an empty [`Memory`] database.
pub fn service() -> (Service<Memory>, notifier::Inbox) {
    Service::detached(
        Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                SECRET,
            ),
        },
        Memory::default(),
    )
}

/// Secret the [`Session`]s of a [`service()`] are signed with.
///
/// [`Session`]: crate::domain::user::Session
pub const SECRET: &[u8] = b"secret";

/// Takes all the [`Notification`]s enqueued so far.
pub fn drain(inbox: &mut notifier::Inbox) -> Vec<Notification> {
    let mut notifications = Vec::new();
    while let Ok(n) = inbox.try_recv() {
        notifications.push(n);
    }
    notifications
}

/// Returns a [`pagination::Page`] of the provided IDs.
fn page<Id>(
    arguments: &pagination::Arguments<Id>,
    ids: impl IntoIterator<Item = Id>,
) -> pagination::Page<Id, Id>
where
    Id: Copy + Into<Uuid>,
{
    use pagination::Kind as K;

    let kind = arguments.kind();
    let cursor: Option<Uuid> = arguments.cursor().map(|c| (*c).into());
    let mut ids = ids
        .into_iter()
        .filter(|id| {
            let id: Uuid = (*id).into();
            cursor.map_or(true, |c| match kind {
                K::Forward => id > c,
                K::ForwardIncluding => id >= c,
                K::Backward => id < c,
                K::BackwardIncluding => id <= c,
            })
        })
        .collect::<Vec<_>>();
    ids.sort_by_key(|id| Into::<Uuid>::into(*id));
    if kind.is_backward() {
        ids.reverse();
    }

    let has_more = ids.len() > arguments.limit();
    pagination::Page::new(
        arguments,
        ids.into_iter().take(arguments.limit()).map(|id| (id, id)),
        has_more,
    )
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let guard = Arc::clone(&self.0 .0).lock_owned().await;
        let state = guard.clone();
        Ok(Memory(Tx {
            guard: Arc::new(Mutex::new(Some(guard))),
            state: Arc::new(SyncMutex::new(state)),
        }))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let mut guard =
            self.0.guard.lock().await.take().expect("already committed");
        *guard = self.0.state.lock().unwrap().clone();
        Ok(())
    }
}

impl<C: Access> Database<Select<By<Option<Profile>, user::Id>>>
    for Memory<C>
{
    type Ok = Option<Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Profile>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(|s| s.profiles.get(&id).copied()).await)
    }
}

impl<C: Access> Database<Select<By<Option<Offer>, offer::Id>>>
    for Memory<C>
{
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(|s| s.offers.get(&id).cloned()).await)
    }
}

impl<C: Access> Database<Select<By<Option<Application>, application::Id>>>
    for Memory<C>
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.0.with(|s| s.applications.get(&id).cloned()).await)
    }
}

impl<C: Access>
    Database<Select<By<Option<Application>, (offer::Id, user::Id)>>>
    for Memory<C>
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, (offer::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (offer_id, professional_id) = by.into_inner();
        Ok(self
            .0
            .with(|s| s.application_by_pair(offer_id, professional_id).cloned())
            .await)
    }
}

impl<C: Access> Database<Select<By<Vec<Application>, offer::Id>>>
    for Memory<C>
{
    type Ok = Vec<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Application>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let offer_id = by.into_inner();
        Ok(self
            .0
            .with(|s| {
                s.applications
                    .values()
                    .filter(|a| a.offer_id == offer_id)
                    .cloned()
                    .collect()
            })
            .await)
    }
}

impl<C: Access>
    Database<Select<By<Option<quota::Usage>, (user::Id, quota::Resource)>>>
    for Memory<C>
{
    type Ok = Option<quota::Usage>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<quota::Usage>, (user::Id, quota::Resource)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (user_id, resource) = by.into_inner();
        Ok(self.0.with(|s| s.usage(user_id, resource)).await)
    }
}

impl<C: Access>
    Database<
        Select<By<read::offer::list::Page, read::offer::list::Selector>>,
    > for Memory<C>
{
    type Ok = read::offer::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::offer::list::Page, read::offer::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::offer::list::Selector {
            arguments,
            filter:
                read::offer::list::Filter {
                    owner_id,
                    status,
                    applicant,
                },
        } = by.into_inner();

        let ids = self
            .0
            .with(|s| {
                s.offers
                    .values()
                    .filter(|o| {
                        owner_id.map_or(true, |id| o.owner_id == id)
                            && status.map_or(true, |st| o.status == st)
                            && applicant.as_ref().map_or(true, |a| {
                                s.application_by_pair(o.id, a.professional_id)
                                    .is_some_and(|app| {
                                        a.statuses.contains(&app.status)
                                    })
                            })
                    })
                    .map(|o| o.id)
                    .collect::<Vec<_>>()
            })
            .await;

        Ok(page(&arguments, ids))
    }
}

impl<C: Access>
    Database<
        Select<
            By<
                read::application::list::Page,
                read::application::list::Selector,
            >,
        >,
    > for Memory<C>
{
    type Ok = read::application::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::application::list::Page,
                read::application::list::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::application::list::Selector {
            arguments,
            filter:
                read::application::list::Filter {
                    offer_id,
                    professional_id,
                    status,
                },
        } = by.into_inner();

        let ids = self
            .0
            .with(|s| {
                s.applications
                    .values()
                    .filter(|a| {
                        offer_id.map_or(true, |id| a.offer_id == id)
                            && professional_id
                                .map_or(true, |id| a.professional_id == id)
                            && status.map_or(true, |st| a.status == st)
                    })
                    .map(|a| a.id)
                    .collect::<Vec<_>>()
            })
            .await;

        Ok(page(&arguments, ids))
    }
}

impl<W, B> Database<Lock<By<W, B>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<W, B>>) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Insert<Offer>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(offer)).await
    }
}

impl Database<Update<Offer>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(offer): Update<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.with(|s| drop(s.offers.insert(offer.id, offer))).await;
        Ok(())
    }
}

impl Database<Delete<By<Offer, offer::Id>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Offer, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| {
                drop(s.offers.remove(&id));
                s.applications.retain(|_, a| a.offer_id != id);
            })
            .await;
        Ok(())
    }
}

impl Database<Insert<Application>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(application): Insert<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                if s.application_by_pair(
                    application.offer_id,
                    application.professional_id,
                )
                .is_some()
                {
                    return Err(Error::UniqueViolation(
                        APPLICATION_PAIR_CONSTRAINT,
                    ));
                }
                drop(s.applications.insert(application.id, application));
                Ok(())
            })
            .await
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Insert<quota::Consumption>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(consumption): Insert<quota::Consumption>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.with(|s| s.consumptions.push(consumption)).await;
        Ok(())
    }
}

impl Database<Update<Application>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(application): Update<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| drop(s.applications.insert(application.id, application)))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{Insert, Transact};

    use crate::{domain::Application, infra::Database as _};

    use super::{service, APPLICATION_PAIR_CONSTRAINT};

    #[tokio::test]
    async fn reports_duplicate_pair_as_unique_violation() {
        let (svc, _) = service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let offer = db.open_offer(client).await;

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(Application::submitted(
            offer.id,
            professional,
            None,
        )))
        .await
        .unwrap();
        let err = tx
            .execute(Insert(Application::invited(
                offer.id,
                professional,
                None,
            )))
            .await
            .unwrap_err();

        let err = err.as_ref();
        assert!(err.is_unique_violation(None));
        assert!(err.is_unique_violation(Some(APPLICATION_PAIR_CONSTRAINT)));
        assert!(!err.is_unique_violation(Some("offers_pkey")));
    }
}
