//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Posts a new `Offer` on behalf of the authenticated client.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createOffer",
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    pub async fn create_offer(
        title: api::offer::Title,
        description: api::offer::Description,
        ctx: &Context,
    ) -> Result<api::Offer, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::CreateOffer {
                user_id: my_id.into(),
                title: title.into(),
                description: description.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `Offer` along with all its `Application`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteOffer",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_offer(
        offer_id: api::offer::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::DeleteOffer {
                user_id: my_id.into(),
                offer_id: offer_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Invites a professional to the `Offer` owned by the authenticated
    /// client.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional;
    /// - `NOT_PROFESSIONAL` - the invited `User` is not a professional;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else;
    /// - `INVALID_OFFER_STATUS` - the `Offer` is neither pending nor open;
    /// - `DUPLICATE_APPLICATION` - the professional already has an
    ///                             `Application` on the `Offer`;
    /// - `NO_SUBSCRIPTION`, `PLAN_FORBIDS_APPLICATIONS`, `QUOTA_EXHAUSTED` -
    ///   the subscription quota doesn't allow inviting.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "inviteProfessional",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
            professional_id = %professional_id,
        ),
    )]
    pub async fn invite_professional(
        offer_id: api::offer::Id,
        professional_id: api::user::Id,
        proposal: Option<api::application::Proposal>,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::InviteProfessional {
                user_id: my_id.into(),
                offer_id: offer_id.into(),
                professional_id: professional_id.into(),
                proposal: proposal.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Applies the authenticated professional to the `Offer`.
    ///
    /// Responding this way to an invitation turns it into a pending
    /// candidacy without consuming the quota.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PROFESSIONAL` - the authenticated `User` is not a professional;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `INVALID_OFFER_STATUS` - the `Offer` is not open;
    /// - `NOT_OPEN_TO_APPLICATIONS` - the `Offer` accepts invited
    ///                                professionals only;
    /// - `DUPLICATE_APPLICATION` - an `Application` on the `Offer` already
    ///                             exists;
    /// - `NO_SUBSCRIPTION`, `PLAN_FORBIDS_APPLICATIONS`, `QUOTA_EXHAUSTED` -
    ///   the subscription quota doesn't allow applying.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "applyToOffer",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn apply_to_offer(
        offer_id: api::offer::Id,
        proposal: Option<api::application::Proposal>,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::ApplyToOffer {
                user_id: my_id.into(),
                offer_id: offer_id.into(),
                proposal: proposal.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Accepts the invitation of the authenticated professional directly.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PROFESSIONAL` - the authenticated `User` is not a professional;
    /// - `APPLICATION_NOT_EXISTS` - the `Application` with the specified ID
    ///                              does not exist;
    /// - `NOT_SUBJECT` - the invitation is addressed to someone else;
    /// - `INVALID_APPLICATION_STATUS` - the `Application` is not an
    ///                                  invitation awaiting a response;
    /// - `INVALID_OFFER_STATUS` - the `Offer` is neither pending nor open;
    /// - `NO_SUBSCRIPTION`, `PLAN_FORBIDS_APPLICATIONS` - the subscription
    ///   doesn't allow responding.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = %application_id,
            gql.name = "acceptInvitation",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn accept_invitation(
        application_id: api::application::Id,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::AcceptInvitation {
                user_id: my_id.into(),
                application_id: application_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Declines the invitation or withdraws the candidacy of the
    /// authenticated professional.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PROFESSIONAL` - the authenticated `User` is not a professional;
    /// - `APPLICATION_NOT_EXISTS` - the `Application` with the specified ID
    ///                              does not exist;
    /// - `NOT_SUBJECT` - the `Application` belongs to someone else;
    /// - `INVALID_APPLICATION_STATUS` - the `Application` is already decided.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = %application_id,
            gql.name = "rejectApplication",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reject_application(
        application_id: api::application::Id,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::RejectApplication {
                user_id: my_id.into(),
                application_id: application_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Accepts or rejects the `Application` on the `Offer` owned by the
    /// authenticated client.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional;
    /// - `APPLICATION_NOT_EXISTS` - the `Application` with the specified ID
    ///                              does not exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else;
    /// - `INVALID_OFFER_STATUS` - the `Offer` is not open;
    /// - `INVALID_APPLICATION_STATUS` - the `Application` is already
    ///                                  rejected.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = %application_id,
            decision = ?decision,
            gql.name = "updateApplicationStatus",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_application_status(
        application_id: api::application::Id,
        decision: api::application::Decision,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::UpdateApplicationStatus {
                user_id: my_id.into(),
                application_id: application_id.into(),
                decision: decision.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Assigns the professional of the accepted `Application` to the `Offer`,
    /// rejecting all the competing `Application`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else;
    /// - `INVALID_OFFER_STATUS` - the `Offer` is not open;
    /// - `APPLICATION_NOT_EXISTS` - the `Application` does not exist on the
    ///                              `Offer`;
    /// - `APPLICATION_NOT_ACCEPTED` - the `Application` is not accepted.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = %application_id,
            gql.name = "assignOffer",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn assign_offer(
        offer_id: api::offer::Id,
        application_id: api::application::Id,
        ctx: &Context,
    ) -> Result<api::Offer, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::AssignOffer {
                user_id: my_id.into(),
                offer_id: offer_id.into(),
                application_id: application_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Closes the `Offer` owned by the authenticated client.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else;
    /// - `OFFER_ALREADY_CLOSED` - the `Offer` is already closed or completed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "closeOffer",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn close_offer(
        offer_id: api::offer::Id,
        ctx: &Context,
    ) -> Result<api::Offer, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::CloseOffer {
                user_id: my_id.into(),
                offer_id: offer_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Offer` owned by the authenticated client as completed.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else;
    /// - `INVALID_OFFER_STATUS` - the `Offer` is not in progress.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "completeOffer",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn complete_offer(
        offer_id: api::offer::Id,
        ctx: &Context,
    ) -> Result<api::Offer, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::CompleteOffer {
                user_id: my_id.into(),
                offer_id: offer_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Reactivates the closed or completed `Offer` owned by the authenticated
    /// client.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CLIENT` - the authenticated `User` is a professional;
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist;
    /// - `NOT_OWNER` - the `Offer` is owned by someone else;
    /// - `INVALID_OFFER_STATUS` - the `Offer` is neither closed nor
    ///                            completed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "reactivateOffer",
            mode = ?mode,
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reactivate_offer(
        offer_id: api::offer::Id,
        mode: api::offer::ReactivationMode,
        ctx: &Context,
    ) -> Result<api::offer::Reactivation, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(command::ReactivateOffer {
                user_id: my_id.into(),
                offer_id: offer_id.into(),
                mode: mode.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum NotExistsError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        User,

        #[code = "OFFER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Offer` with the specified ID does not exist"]
        Offer,

        #[code = "APPLICATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Application` with the specified ID does not exist"]
        Application,
    }
}

define_error! {
    enum StateError {
        #[code = "INVALID_OFFER_STATUS"]
        #[status = BAD_REQUEST]
        #[message = "`Offer` is not in a suitable status"]
        OfferStatus,

        #[code = "NOT_OPEN_TO_APPLICATIONS"]
        #[status = BAD_REQUEST]
        #[message = "`Offer` accepts invited professionals only"]
        NotOpenToApplications,

        #[code = "APPLICATION_NOT_ACCEPTED"]
        #[status = BAD_REQUEST]
        #[message = "`Application` must be accepted first"]
        ApplicationNotAccepted,

        #[code = "OFFER_ALREADY_CLOSED"]
        #[status = CONFLICT]
        #[message = "`Offer` is already closed or completed"]
        AlreadyClosed,

        #[code = "DUPLICATE_APPLICATION"]
        #[status = CONFLICT]
        #[message = "Professional already has an `Application` on this \
                     `Offer`"]
        DuplicateApplication,
    }
}

impl AsError for command::create_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
        })
    }
}

impl AsError for command::delete_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::NotOwner(_) => api::PrivilegeError::NotOwner.into(),
        })
    }
}

impl AsError for command::invite_professional::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
            Self::NotProfessional(_) => {
                api::PrivilegeError::NotProfessional.into()
            }
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::NotOwner(_) => api::PrivilegeError::NotOwner.into(),
            Self::InvalidOfferStatus(_) => StateError::OfferStatus.into(),
            Self::DuplicateApplication { .. } => {
                StateError::DuplicateApplication.into()
            }
            Self::Quota(e) => return e.try_as_error(),
            Self::ApplicationTransition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::apply_to_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotProfessional(_) => {
                api::PrivilegeError::NotProfessional.into()
            }
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::InvalidOfferStatus(_) => StateError::OfferStatus.into(),
            Self::NotOpenToApplications(_) => {
                StateError::NotOpenToApplications.into()
            }
            Self::DuplicateApplication { .. } => {
                StateError::DuplicateApplication.into()
            }
            Self::Quota(e) => return e.try_as_error(),
            Self::ApplicationTransition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::accept_invitation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotProfessional(_) => {
                api::PrivilegeError::NotProfessional.into()
            }
            Self::ApplicationNotExists(_) => NotExistsError::Application.into(),
            Self::NotSubject(_) => api::PrivilegeError::NotSubject.into(),
            Self::ApplicationTransition(e) => return e.try_as_error(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::InvalidOfferStatus(_) => StateError::OfferStatus.into(),
            Self::Quota(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::reject_application::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotProfessional(_) => {
                api::PrivilegeError::NotProfessional.into()
            }
            Self::ApplicationNotExists(_) => NotExistsError::Application.into(),
            Self::NotSubject(_) => api::PrivilegeError::NotSubject.into(),
            Self::ApplicationTransition(e) => return e.try_as_error(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
        })
    }
}

impl AsError for command::update_application_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
            Self::ApplicationNotExists(_) => NotExistsError::Application.into(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::NotOwner(_) => api::PrivilegeError::NotOwner.into(),
            Self::InvalidOfferStatus(_) => StateError::OfferStatus.into(),
            Self::ApplicationTransition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::assign_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::NotOwner(_) => api::PrivilegeError::NotOwner.into(),
            Self::OfferTransition(e) => return e.try_as_error(),
            Self::ApplicationNotExists(_) => NotExistsError::Application.into(),
            Self::ApplicationNotAccepted(_) => {
                StateError::ApplicationNotAccepted.into()
            }
            Self::ApplicationTransition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::close_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::NotOwner(_) => api::PrivilegeError::NotOwner.into(),
            Self::AlreadyClosed(_) => StateError::AlreadyClosed.into(),
        })
    }
}

impl AsError for command::complete_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::NotOwner(_) => api::PrivilegeError::NotOwner.into(),
            Self::OfferTransition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::reactivate_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => NotExistsError::User.into(),
            Self::NotClient(_) => api::PrivilegeError::NotClient.into(),
            Self::OfferNotExists(_) => NotExistsError::Offer.into(),
            Self::NotOwner(_) => api::PrivilegeError::NotOwner.into(),
            Self::OfferTransition(e) => return e.try_as_error(),
            Self::ApplicationTransition(e) => return e.try_as_error(),
        })
    }
}
