//! [`Query`] collection related to subscription quotas.

use common::operations::By;

use crate::domain::{quota, user};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries [`quota::Usage`] of a [`quota::Resource`] by a user.
///
/// [`None`] if the user has no active subscription.
pub type Usage =
    DatabaseQuery<By<Option<quota::Usage>, (user::Id, quota::Resource)>>;
