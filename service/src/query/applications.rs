//! [`Query`] collection related to the multiple [`Application`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Application, Query};

use super::DatabaseQuery;

/// Queries a list of [`Application`]s.
pub type List = DatabaseQuery<
    By<read::application::list::Page, read::application::list::Selector>,
>;
