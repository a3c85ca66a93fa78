//! [`Offer`] definitions.

use std::collections::HashSet;

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

/// Job posted by a client, which a professional is wanted to fulfill.
#[derive(Clone, Debug)]
pub struct Offer {
    /// ID of this [`Offer`].
    pub id: Id,

    /// ID of the client who posted this [`Offer`].
    pub owner_id: user::Id,

    /// [`Title`] of this [`Offer`].
    pub title: Title,

    /// [`Description`] of this [`Offer`].
    pub description: Description,

    /// [`Status`] of this [`Offer`].
    ///
    /// Changed only via [`Offer::apply()`].
    pub status: Status,

    /// Indicator whether this [`Offer`] accepts new candidacies.
    ///
    /// Independent of the [`Status`]: invited professionals may still respond
    /// while this is `false`.
    pub is_open_to_applications: bool,

    /// Professionals assigned to this [`Offer`].
    pub assigned_professionals: HashSet<user::Id>,

    /// [`DateTime`] when this [`Offer`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Offer`] was updated the last time.
    pub updated_at: UpdateDateTime,
}

impl Offer {
    /// Indicates whether this [`Offer`] is owned by the provided user.
    #[must_use]
    pub fn is_owned_by(&self, user_id: user::Id) -> bool {
        self.owner_id == user_id
    }

    /// Indicates whether professionals may be invited to (or may respond to
    /// an invitation for) this [`Offer`].
    #[must_use]
    pub const fn accepts_invitations(&self) -> bool {
        matches!(self.status, Status::Pending | Status::Open)
    }

    /// Moves this [`Offer`] along the provided [`Transition`].
    ///
    /// # Errors
    ///
    /// If the [`Transition`] is not allowed from the current [`Status`].
    pub fn apply(
        &mut self,
        transition: Transition,
    ) -> Result<(), IllegalTransition> {
        let (from, to) = transition.edge();
        if !from.contains(&self.status) {
            return Err(IllegalTransition {
                transition,
                from: self.status,
            });
        }
        self.status = to;
        self.updated_at = DateTime::now().coerce();
        Ok(())
    }
}

/// ID of an [`Offer`].
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

/// Title of an [`Offer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `title` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title
            && !title.is_empty()
            && title.chars().count() <= 256
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Description of an [`Offer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `description` matches the
    /// format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(description: impl Into<String>) -> Self {
        Self(description.into())
    }

    /// Creates a new [`Description`] if the given `description` is valid.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Option<Self> {
        let description = description.into();
        Self::check(&description).then_some(Self(description))
    }

    /// Checks whether the given `description` is a valid [`Description`].
    fn check(description: impl AsRef<str>) -> bool {
        let description = description.as_ref();
        description.trim() == description
            && !description.is_empty()
            && description.chars().count() <= 10_000
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

define_kind! {
    #[doc = "Status of an [`Offer`]."]
    enum Status {
        #[doc = "[`Offer`] is drafted and not yet published."]
        Pending = 1,

        #[doc = "[`Offer`] is published and looks for a professional."]
        Open = 2,

        #[doc = "[`Offer`] is being fulfilled by assigned professionals."]
        InProgress = 3,

        #[doc = "[`Offer`] is closed by its owner."]
        Closed = 4,

        #[doc = "[`Offer`] is fulfilled."]
        Completed = 5,
    }
}

/// Transition of an [`Offer`] between [`Status`]es.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Transition {
    /// A professional is assigned to the [`Offer`].
    Assign,

    /// The [`Offer`] is closed by its owner.
    Close,

    /// The [`Offer`] work is done.
    Complete,

    /// A closed or completed [`Offer`] continues with its assigned
    /// professionals.
    Continue,

    /// A closed or completed [`Offer`] is reopened to everyone.
    Reopen,
}

/// Every allowed [`Transition`] of an [`Offer`]: the [`Status`]es it may be
/// applied in, and the [`Status`] it leads to.
const TRANSITIONS: [(Transition, &[Status], Status); 5] = [
    (Transition::Assign, &[Status::Open], Status::InProgress),
    (
        Transition::Close,
        &[Status::Pending, Status::Open, Status::InProgress],
        Status::Closed,
    ),
    (Transition::Complete, &[Status::InProgress], Status::Completed),
    (
        Transition::Continue,
        &[Status::Closed, Status::Completed],
        Status::InProgress,
    ),
    (
        Transition::Reopen,
        &[Status::Closed, Status::Completed],
        Status::Open,
    ),
];

impl Transition {
    /// Returns the [`Status`]es this [`Transition`] is allowed from, and the
    /// [`Status`] it leads to.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn edge(self) -> (&'static [Status], Status) {
        TRANSITIONS
            .iter()
            .find(|(t, ..)| *t == self)
            .map(|(_, from, to)| (*from, *to))
            .expect("every `Transition` is listed")
    }
}

/// Error of applying a [`Transition`] to an [`Offer`] in a wrong [`Status`].
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[display("cannot `{transition}` an `Offer` in `{from}` status")]
pub struct IllegalTransition {
    /// [`Transition`] being applied.
    pub transition: Transition,

    /// [`Status`] the [`Offer`] was in.
    pub from: Status,
}

define_kind! {
    #[doc = "Mode of reactivating a closed or completed [`Offer`]."]
    enum ReactivationMode {
        #[doc = "Continue with the assigned professionals."]
        ContinueWithProfessional = 1,

        #[doc = "Reopen the [`Offer`] to all professionals."]
        ReopenToAll = 2,
    }
}

/// [`DateTime`] when an [`Offer`] was created.
pub type CreationDateTime = DateTimeOf<(Offer, unit::Creation)>;

/// [`DateTime`] when an [`Offer`] was updated.
pub type UpdateDateTime = DateTimeOf<(Offer, unit::Update)>;

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::DateTime;

    use super::{
        Description, IllegalTransition, Offer, Status, Title, Transition,
    };
    use crate::domain::user;

    const ALL_STATUSES: [Status; 5] = [
        Status::Pending,
        Status::Open,
        Status::InProgress,
        Status::Closed,
        Status::Completed,
    ];

    const ALL_TRANSITIONS: [Transition; 5] = [
        Transition::Assign,
        Transition::Close,
        Transition::Complete,
        Transition::Continue,
        Transition::Reopen,
    ];

    fn offer(status: Status) -> Offer {
        Offer {
            id: super::Id::new(),
            owner_id: user::Id::new(),
            title: Title::new("Paint the fence").unwrap(),
            description: Description::new("Two layers, white").unwrap(),
            status,
            is_open_to_applications: true,
            assigned_professionals: HashSet::new(),
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn moves_only_along_table_edges() {
        let expected = [
            (Transition::Assign, Status::Open, Status::InProgress),
            (Transition::Close, Status::Pending, Status::Closed),
            (Transition::Close, Status::Open, Status::Closed),
            (Transition::Close, Status::InProgress, Status::Closed),
            (Transition::Complete, Status::InProgress, Status::Completed),
            (Transition::Continue, Status::Closed, Status::InProgress),
            (Transition::Continue, Status::Completed, Status::InProgress),
            (Transition::Reopen, Status::Closed, Status::Open),
            (Transition::Reopen, Status::Completed, Status::Open),
        ];

        for transition in ALL_TRANSITIONS {
            for from in ALL_STATUSES {
                let mut o = offer(from);
                let res = o.apply(transition);

                match expected
                    .iter()
                    .find(|(t, f, _)| *t == transition && *f == from)
                {
                    Some((.., to)) => {
                        assert_eq!(res, Ok(()), "{transition} from {from}");
                        assert_eq!(o.status, *to, "{transition} from {from}");
                    }
                    None => {
                        assert_eq!(
                            res,
                            Err(IllegalTransition { transition, from }),
                            "{transition} from {from}",
                        );
                        assert_eq!(o.status, from, "{transition} from {from}");
                    }
                }
            }
        }
    }

    #[test]
    fn accepts_invitations_only_when_pending_or_open() {
        for status in ALL_STATUSES {
            assert_eq!(
                offer(status).accepts_invitations(),
                matches!(status, Status::Pending | Status::Open),
                "{status}",
            );
        }
    }

    #[test]
    fn validates_title() {
        assert!(Title::new("Fix the roof").is_some());
        assert!(Title::new("").is_none());
        assert!(Title::new(" Fix the roof").is_none());
        assert!(Title::new("a".repeat(256)).is_some());
        assert!(Title::new("a".repeat(257)).is_none());
    }
}
