//! GraphQL API definitions.

pub mod application;
mod mutation;
pub mod offer;
pub mod quota;
mod query;
pub mod scalar;
mod subscription;
pub mod user;

use crate::define_error;

pub use self::{
    application::Application, mutation::Mutation, offer::Offer, query::Query,
    subscription::Subscription,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

define_error! {
    enum PrivilegeError {
        #[code = "NOT_OWNER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must own the `Offer`"]
        NotOwner,

        #[code = "NOT_CLIENT"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be a client"]
        NotClient,

        #[code = "NOT_PROFESSIONAL"]
        #[status = FORBIDDEN]
        #[message = "`User` must be a professional"]
        NotProfessional,

        #[code = "NOT_SUBJECT"]
        #[status = FORBIDDEN]
        #[message = "`Application` belongs to another professional"]
        NotSubject,
    }
}

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Ambiguous pagination arguments"]
        Ambiguous,
    }
}
