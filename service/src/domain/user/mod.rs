//! [`Profile`] and [`Actor`] definitions.
//!
//! Users themselves are stored by an external identity provider, so only
//! their [`Id`]s and [`Profile`]s are known here.

pub mod session;

use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// ID of a platform user.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Profile of a platform user, as provided by the profile storage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Profile {
    /// ID of the user this [`Profile`] belongs to.
    pub user_id: Id,

    /// Indicator whether the user has a professional profile.
    pub has_professional_profile: bool,
}

impl Profile {
    /// Resolves the [`Actor`] this [`Profile`] acts as.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        if self.has_professional_profile {
            Actor::Professional(self.user_id)
        } else {
            Actor::Client(self.user_id)
        }
    }
}

/// Platform user performing an operation.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Actor {
    /// Client posting [`Offer`]s and inviting professionals.
    ///
    /// [`Offer`]: crate::domain::Offer
    #[display("Client(id: {_0})")]
    Client(Id),

    /// Professional applying to [`Offer`]s.
    ///
    /// [`Offer`]: crate::domain::Offer
    #[display("Professional(id: {_0})")]
    Professional(Id),
}

impl Actor {
    /// Returns [`Id`] of this [`Actor`].
    #[must_use]
    pub const fn id(&self) -> Id {
        match *self {
            Self::Client(id) | Self::Professional(id) => id,
        }
    }

    /// Indicates whether this [`Actor`] may post [`Offer`]s.
    ///
    /// [`Offer`]: crate::domain::Offer
    #[must_use]
    pub const fn can_post_offers(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    /// Indicates whether this [`Actor`] may apply to [`Offer`]s.
    ///
    /// [`Offer`]: crate::domain::Offer
    #[must_use]
    pub const fn can_apply(&self) -> bool {
        matches!(self, Self::Professional(_))
    }
}
