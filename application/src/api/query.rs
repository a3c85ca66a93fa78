//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{domain, query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Default amount of nodes in a requested page.
const DEFAULT_PAGE_SIZE: i32 = 10;

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";

    /// Ensures the `Offer` with the provided ID exists and is owned by the
    /// currently authenticated user.
    async fn ensure_owned(
        offer_id: api::offer::Id,
        ctx: &Context,
    ) -> Result<(), Error> {
        let my_id = ctx.current_session().await?.user_id;
        let offer = ctx
            .service()
            .execute(query::offer::ById::by(offer_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| OfferError::NotExists.into())
            .map_err(ctx.error())?;
        if offer.is_owned_by(my_id.into()) {
            Ok(())
        } else {
            Err(ctx.error()(api::PrivilegeError::NotOwner.into()))
        }
    }

    /// Fetches the page of `Application`s matching the provided filter.
    async fn application_list(
        arguments: (
            Option<i32>,
            Option<api::application::list::Cursor>,
            Option<i32>,
            Option<api::application::list::Cursor>,
        ),
        filter: read::application::list::Filter,
        ctx: &Context,
    ) -> Result<api::application::list::Connection, Error> {
        let (first, after, last, before) = arguments;
        let arguments = read::application::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;

        ctx.service()
            .execute(query::applications::List::by(
                read::application::list::Selector { arguments, filter },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the quota usage of the currently authenticated user.
    ///
    /// `null` is returned if there is no active subscription.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myQuota",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_quota(
        ctx: &Context,
    ) -> Result<Option<api::quota::Usage>, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::quota::Usage::by((
                my_id.into(),
                domain::quota::Resource::Applications,
            )))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|u| u.map(Into::into))
    }

    /// Returns the `Offer` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "offer",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn offer(
        id: api::offer::Id,
        ctx: &Context,
    ) -> Result<api::Offer, Error> {
        drop(ctx.current_session().await?);
        ctx.service()
            .execute(query::offer::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| OfferError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Offer`s posted by the currently authenticated
    /// user.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "myOffers",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn my_offers(
        first: Option<i32>,
        after: Option<api::offer::list::Cursor>,
        last: Option<i32>,
        before: Option<api::offer::list::Cursor>,
        status: Option<api::offer::Status>,
        ctx: &Context,
    ) -> Result<api::offer::list::Connection, Error> {
        let arguments = read::offer::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;

        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::offers::List::by(read::offer::list::Selector {
                arguments,
                filter: read::offer::list::Filter {
                    owner_id: Some(my_id.into()),
                    status: status.map(Into::into),
                    applicant: None,
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Offer`s the currently authenticated professional
    /// holds an `Application` on.
    ///
    /// Only pending invitations are considered if no `statuses` specified.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "receivedOffers",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            statuses = ?statuses,
        ),
    )]
    pub async fn received_offers(
        first: Option<i32>,
        after: Option<api::offer::list::Cursor>,
        last: Option<i32>,
        before: Option<api::offer::list::Cursor>,
        statuses: Option<Vec<api::application::Status>>,
        ctx: &Context,
    ) -> Result<api::offer::list::Connection, Error> {
        let arguments = read::offer::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;

        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::offers::Received {
                professional_id: my_id.into(),
                statuses: statuses
                    .into_iter()
                    .flatten()
                    .map(Into::into)
                    .collect(),
                arguments,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Application`s on the `Offer` owned by the
    /// currently authenticated user.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "applications",
            last = ?last,
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn applications(
        offer_id: api::offer::Id,
        status: Option<api::application::Status>,
        first: Option<i32>,
        after: Option<api::application::list::Cursor>,
        last: Option<i32>,
        before: Option<api::application::list::Cursor>,
        ctx: &Context,
    ) -> Result<api::application::list::Connection, Error> {
        Self::ensure_owned(offer_id, ctx).await?;
        Self::application_list(
            (first, after, last, before),
            read::application::list::Filter {
                offer_id: Some(offer_id.into()),
                professional_id: None,
                status: status.map(Into::into),
            },
            ctx,
        )
        .await
    }

    /// Fetches the page of accepted `Application`s on the `Offer` owned by
    /// the currently authenticated user.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "acceptedApplications",
            last = ?last,
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn accepted_applications(
        offer_id: api::offer::Id,
        first: Option<i32>,
        after: Option<api::application::list::Cursor>,
        last: Option<i32>,
        before: Option<api::application::list::Cursor>,
        ctx: &Context,
    ) -> Result<api::application::list::Connection, Error> {
        Self::applications(
            offer_id,
            Some(api::application::Status::Accepted),
            first,
            after,
            last,
            before,
            ctx,
        )
        .await
    }

    /// Fetches the page of invitations awaiting a response of the currently
    /// authenticated professional.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "receivedInvitations",
            last = ?last,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn received_invitations(
        first: Option<i32>,
        after: Option<api::application::list::Cursor>,
        last: Option<i32>,
        before: Option<api::application::list::Cursor>,
        ctx: &Context,
    ) -> Result<api::application::list::Connection, Error> {
        let my_id = ctx.current_session().await?.user_id;
        Self::application_list(
            (first, after, last, before),
            read::application::list::Filter {
                offer_id: None,
                professional_id: Some(my_id.into()),
                status: Some(domain::application::Status::Invited),
            },
            ctx,
        )
        .await
    }
}

define_error! {
    enum ApplicationError {
        #[code = "APPLICATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Application` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum OfferError {
        #[code = "OFFER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Offer` with the specified ID does not exist"]
        NotExists,
    }
}
