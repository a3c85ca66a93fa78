//! [`Application`]-related definitions.

use std::future;

use common::{DateTime, Handler as _};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{command, domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// Relationship of a professional to an `Offer`.
#[derive(Clone, Debug)]
pub struct Application {
    /// ID of this [`Application`].
    id: Id,

    /// Underlying [`domain::Application`].
    application: OnceCell<domain::Application>,
}

impl From<domain::Application> for Application {
    fn from(application: domain::Application) -> Self {
        Self {
            id: application.id.into(),
            application: OnceCell::new_with(Some(application)),
        }
    }
}

impl Application {
    /// Creates a new [`Application`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Application`] with the provided ID exists,
    /// otherwise accessing this [`Application`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            application: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Application`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Application`] doesn't exist.
    async fn application(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Application, Error> {
        let id = self.id.into();
        self.application
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::application::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|a| {
                        future::ready(a.ok_or_else(|| {
                            api::query::ApplicationError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// Relationship of a professional to an `Offer`: either a candidacy or an
/// invitation.
#[graphql_object(context = Context)]
impl Application {
    /// Unique identifier of this `Application`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// `Offer` this `Application` is attached to.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.offer",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn offer(&self, ctx: &Context) -> Result<api::Offer, Error> {
        let offer_id = self.application(ctx).await?.offer_id;
        #[expect(
            unsafe_code,
            reason = "`Application` cannot outlive its `Offer`"
        )]
        let offer = unsafe { api::Offer::new_unchecked(offer_id) };
        Ok(offer)
    }

    /// ID of the professional this `Application` belongs to.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.professionalId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn professional_id(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Id, Error> {
        Ok(self.application(ctx).await?.professional_id.into())
    }

    /// Status of this `Application`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.application(ctx).await?.status.into())
    }

    /// Side which initiated this `Application`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.origin",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn origin(&self, ctx: &Context) -> Result<Origin, Error> {
        Ok(self.application(ctx).await?.origin.into())
    }

    /// Proposal message of this `Application`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.proposal",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn proposal(
        &self,
        ctx: &Context,
    ) -> Result<Option<Proposal>, Error> {
        Ok(self.application(ctx).await?.proposal.clone().map(Into::into))
    }

    /// `DateTime` when this `Application` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.application(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Application` was updated the last time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.updatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.application(ctx).await?.updated_at.coerce())
    }
}

/// Unique identifier of an `Application`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::application::Id)]
#[into(domain::application::Id)]
#[graphql(name = "ApplicationId", transparent)]
pub struct Id(Uuid);

/// Proposal message of an `Application`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ApplicationProposal",
    with = scalar::Via::<domain::application::Proposal>,
)]
pub struct Proposal(domain::application::Proposal);

/// Status of an `Application`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "ApplicationStatus")]
pub enum Status {
    /// Invitation awaiting the professional's response.
    Invited,

    /// Candidacy awaiting the owner's decision.
    Pending,

    /// Accepted, so the professional may be assigned.
    Accepted,

    /// Rejected, withdrawn or dismissed.
    Rejected,
}

impl From<domain::application::Status> for Status {
    fn from(status: domain::application::Status) -> Self {
        use domain::application::Status as S;
        match status {
            S::Invited => Self::Invited,
            S::Pending => Self::Pending,
            S::Accepted => Self::Accepted,
            S::Rejected => Self::Rejected,
        }
    }
}

impl From<Status> for domain::application::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Invited => Self::Invited,
            Status::Pending => Self::Pending,
            Status::Accepted => Self::Accepted,
            Status::Rejected => Self::Rejected,
        }
    }
}

/// Side which initiated an `Application`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "ApplicationOrigin")]
pub enum Origin {
    /// Professional applied on their own.
    Applied,

    /// Owner of the `Offer` invited the professional.
    Invited,
}

impl From<domain::application::Origin> for Origin {
    fn from(origin: domain::application::Origin) -> Self {
        use domain::application::Origin as O;
        match origin {
            O::Applied => Self::Applied,
            O::Invited => Self::Invited,
        }
    }
}

/// Decision of an `Offer` owner on an `Application`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "ApplicationDecision")]
pub enum Decision {
    /// Accept a pending candidacy.
    Accept,

    /// Reject a candidacy or revoke an invitation.
    Reject,
}

impl From<Decision> for command::update_application_status::Decision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accept => Self::Accept,
            Decision::Reject => Self::Reject,
        }
    }
}

pub mod list {
    //! Definitions related to the [`Application`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::read;

    use super::{Application, Id};
    use crate::{api::scalar, Context};

    /// Cursor for the `Application` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::application::list::Cursor)]
    #[graphql(
        name = "ApplicationListCursor",
        with = scalar::Via::<read::application::list::Cursor>,
    )]
    pub struct Cursor(pub read::application::list::Cursor);

    /// Edge in the [`Application`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::application::list::Edge);

    /// Edge in the `Application` list.
    #[graphql_object(name = "ApplicationListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `ApplicationListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `ApplicationListEdge`.
        #[must_use]
        pub fn node(&self) -> Application {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees \
                          `Application` existence"
            )]
            unsafe {
                Application::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Application`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::application::list::Connection);

    /// Connection of the `Application` list.
    #[graphql_object(name = "ApplicationListConnection", context = Context)]
    impl Connection {
        /// Edges of this `ApplicationListConnection`.
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
        /// Underlying [`read::application::list::PageInfo`].
        info: read::application::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about an `ApplicationListConnection` page.
    #[graphql_object(name = "ApplicationListPageInfo", context = Context)]
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
