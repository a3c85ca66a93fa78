//! [`Offer`]-related definitions.

use std::future;

use common::{DateTime, Handler as _};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// An offer.
#[derive(Clone, Debug)]
pub struct Offer {
    /// ID of this [`Offer`].
    id: Id,

    /// Underlying [`domain::Offer`].
    offer: OnceCell<domain::Offer>,
}

impl From<domain::Offer> for Offer {
    fn from(offer: domain::Offer) -> Self {
        Self {
            id: offer.id.into(),
            offer: OnceCell::new_with(Some(offer)),
        }
    }
}

impl Offer {
    /// Creates a new [`Offer`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Offer`] with the provided ID exists,
    /// otherwise accessing this [`Offer`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            offer: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Offer`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Offer`] doesn't exist.
    pub(crate) async fn offer(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Offer, Error> {
        let id = self.id.into();
        self.offer
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::offer::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|o| {
                        future::ready(o.ok_or_else(|| {
                            api::query::OfferError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// An offer posted by a client, which a professional is wanted to fulfill.
#[graphql_object(context = Context)]
impl Offer {
    /// Unique identifier of this `Offer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// ID of the client who posted this `Offer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.ownerId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn owner_id(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Id, Error> {
        Ok(self.offer(ctx).await?.owner_id.into())
    }

    /// Title of this `Offer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn title(&self, ctx: &Context) -> Result<Title, Error> {
        Ok(self.offer(ctx).await?.title.clone().into())
    }

    /// Description of this `Offer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.description",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn description(
        &self,
        ctx: &Context,
    ) -> Result<Description, Error> {
        Ok(self.offer(ctx).await?.description.clone().into())
    }

    /// Status of this `Offer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.offer(ctx).await?.status.into())
    }

    /// Indicator whether this `Offer` accepts new candidacies.
    ///
    /// Invited professionals may respond regardless of it.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.isOpenToApplications",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn is_open_to_applications(
        &self,
        ctx: &Context,
    ) -> Result<bool, Error> {
        Ok(self.offer(ctx).await?.is_open_to_applications)
    }

    /// IDs of the professionals assigned to this `Offer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.assignedProfessionals",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn assigned_professionals(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::user::Id>, Error> {
        let mut ids = self
            .offer(ctx)
            .await?
            .assigned_professionals
            .iter()
            .copied()
            .map(api::user::Id::from)
            .collect::<Vec<_>>();
        ids.sort_by_key(ToString::to_string);
        Ok(ids)
    }

    /// `DateTime` when this `Offer` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.offer(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Offer` was updated the last time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Offer.updatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.offer(ctx).await?.updated_at.coerce())
    }
}

/// Unique identifier of an `Offer`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::offer::Id)]
#[into(domain::offer::Id)]
#[graphql(name = "OfferId", transparent)]
pub struct Id(Uuid);

/// Title of an `Offer`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "OfferTitle", with = scalar::Via::<domain::offer::Title>)]
pub struct Title(domain::offer::Title);

/// Description of an `Offer`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "OfferDescription",
    with = scalar::Via::<domain::offer::Description>,
)]
pub struct Description(domain::offer::Description);

/// Status of an `Offer`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "OfferStatus")]
pub enum Status {
    /// Not published yet.
    Pending,

    /// Published and looking for a professional.
    Open,

    /// Assigned to professionals who work on it.
    InProgress,

    /// Closed by its owner before being completed.
    Closed,

    /// Fulfilled by the assigned professionals.
    Completed,
}

impl From<domain::offer::Status> for Status {
    fn from(status: domain::offer::Status) -> Self {
        use domain::offer::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Open => Self::Open,
            S::InProgress => Self::InProgress,
            S::Closed => Self::Closed,
            S::Completed => Self::Completed,
        }
    }
}

impl From<Status> for domain::offer::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Open => Self::Open,
            Status::InProgress => Self::InProgress,
            Status::Closed => Self::Closed,
            Status::Completed => Self::Completed,
        }
    }
}

/// Mode of reactivating a closed or completed `Offer`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "OfferReactivationMode")]
pub enum ReactivationMode {
    /// Continue with the already assigned professionals.
    ///
    /// Falls back to `REOPEN_TO_ALL` if nobody is assigned.
    ContinueWithProfessional,

    /// Reopen to all professionals, dismissing every `Application`.
    ReopenToAll,
}

impl From<domain::offer::ReactivationMode> for ReactivationMode {
    fn from(mode: domain::offer::ReactivationMode) -> Self {
        use domain::offer::ReactivationMode as M;
        match mode {
            M::ContinueWithProfessional => Self::ContinueWithProfessional,
            M::ReopenToAll => Self::ReopenToAll,
        }
    }
}

impl From<ReactivationMode> for domain::offer::ReactivationMode {
    fn from(mode: ReactivationMode) -> Self {
        match mode {
            ReactivationMode::ContinueWithProfessional => {
                Self::ContinueWithProfessional
            }
            ReactivationMode::ReopenToAll => Self::ReopenToAll,
        }
    }
}

/// Result of an `Offer` reactivation.
#[derive(Clone, Debug)]
pub struct Reactivation {
    /// Reactivated [`Offer`].
    offer: Offer,

    /// [`ReactivationMode`] actually applied.
    mode: ReactivationMode,
}

impl From<service::command::reactivate_offer::Output> for Reactivation {
    fn from(output: service::command::reactivate_offer::Output) -> Self {
        Self {
            offer: output.offer.into(),
            mode: output.mode.into(),
        }
    }
}

/// Result of an `Offer` reactivation.
#[graphql_object(name = "OfferReactivation", context = Context)]
impl Reactivation {
    /// Reactivated `Offer`.
    #[must_use]
    pub fn offer(&self) -> &Offer {
        &self.offer
    }

    /// Mode actually applied, which differs from the requested one if there
    /// was nobody to continue with.
    #[must_use]
    pub fn mode(&self) -> ReactivationMode {
        self.mode
    }
}

pub mod list {
    //! Definitions related to the [`Offer`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::read;

    use super::{Id, Offer};
    use crate::{api::scalar, Context};

    /// Cursor for the `Offer` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::offer::list::Cursor)]
    #[graphql(
        name = "OfferListCursor",
        with = scalar::Via::<read::offer::list::Cursor>,
    )]
    pub struct Cursor(pub read::offer::list::Cursor);

    /// Edge in the [`Offer`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::offer::list::Edge);

    /// Edge in the `Offer` list.
    #[graphql_object(name = "OfferListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `OfferListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `OfferListEdge`.
        #[must_use]
        pub fn node(&self) -> Offer {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees `Offer` \
                          existence"
            )]
            unsafe {
                Offer::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Offer`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::offer::list::Connection);

    /// Connection of the `Offer` list.
    #[graphql_object(name = "OfferListConnection", context = Context)]
    impl Connection {
        /// Edges of this `OfferListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.0.page_info(),
                start_cursor: self.0.edges.first().map(|e| e.cursor.into()),
                end_cursor: self.0.edges.last().map(|e| e.cursor.into()),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::offer::list::PageInfo`].
        info: read::offer::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about an `OfferListConnection` page.
    #[graphql_object(name = "OfferListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> &Option<Cursor> {
            &self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> &Option<Cursor> {
            &self.end_cursor
        }
    }
}
