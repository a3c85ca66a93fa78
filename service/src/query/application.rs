//! [`Query`] collection related to a single [`Application`].

use common::operations::By;

use crate::domain::{application, offer, user, Application};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Application`] by its [`application::Id`].
pub type ById = DatabaseQuery<By<Option<Application>, application::Id>>;

/// Queries an [`Application`] of a professional on an [`Offer`].
///
/// [`Offer`]: crate::domain::Offer
pub type ByPair = DatabaseQuery<By<Option<Application>, (offer::Id, user::Id)>>;
