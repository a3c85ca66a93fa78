//! [`Application`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Offer;
use crate::domain::{offer, user};

/// Relationship of one professional to one [`Offer`]: either a candidacy or
/// an invitation.
///
/// There is at most one [`Application`] per [`Offer`] and professional.
#[derive(Clone, Debug)]
pub struct Application {
    /// ID of this [`Application`].
    pub id: Id,

    /// ID of the [`Offer`] this [`Application`] is attached to.
    pub offer_id: offer::Id,

    /// ID of the professional this [`Application`] belongs to.
    pub professional_id: user::Id,

    /// [`Status`] of this [`Application`].
    ///
    /// Changed only via [`Application::apply()`].
    pub status: Status,

    /// [`Origin`] of this [`Application`].
    pub origin: Origin,

    /// [`Proposal`] of this [`Application`], if any.
    pub proposal: Option<Proposal>,

    /// [`DateTime`] when this [`Application`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Application`] was updated the last time.
    pub updated_at: UpdateDateTime,
}

impl Application {
    /// Creates a new [`Application`] submitted by a professional.
    #[must_use]
    pub fn submitted(
        offer_id: offer::Id,
        professional_id: user::Id,
        proposal: Option<Proposal>,
    ) -> Self {
        Self::new(offer_id, professional_id, Status::Pending, Origin::Applied)
            .with_proposal(proposal)
    }

    /// Creates a new [`Application`] for a professional invited by the
    /// [`Offer`] owner.
    #[must_use]
    pub fn invited(
        offer_id: offer::Id,
        professional_id: user::Id,
        proposal: Option<Proposal>,
    ) -> Self {
        Self::new(offer_id, professional_id, Status::Invited, Origin::Invited)
            .with_proposal(proposal)
    }

    /// Creates a new [`Application`] with the provided parameters.
    fn new(
        offer_id: offer::Id,
        professional_id: user::Id,
        status: Status,
        origin: Origin,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: Id::new(),
            offer_id,
            professional_id,
            status,
            origin,
            proposal: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    /// Replaces the [`Proposal`] of this [`Application`], if the provided one
    /// is present.
    #[must_use]
    pub fn with_proposal(mut self, proposal: Option<Proposal>) -> Self {
        if proposal.is_some() {
            self.proposal = proposal;
        }
        self
    }

    /// Indicates whether this [`Application`] is not [`Status::Rejected`].
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.status, Status::Rejected)
    }

    /// Indicates whether this [`Application`] still awaits a decision, being
    /// [`Status::Invited`] or [`Status::Pending`].
    #[must_use]
    pub const fn is_undecided(&self) -> bool {
        matches!(self.status, Status::Invited | Status::Pending)
    }

    /// Moves this [`Application`] along the provided [`Transition`].
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

/// ID of an [`Application`].
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

/// Proposal message of an [`Application`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Proposal(String);

impl Proposal {
    /// Creates a new [`Proposal`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `proposal` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(proposal: impl Into<String>) -> Self {
        Self(proposal.into())
    }

    /// Creates a new [`Proposal`] if the given `proposal` is valid.
    #[must_use]
    pub fn new(proposal: impl Into<String>) -> Option<Self> {
        let proposal = proposal.into();
        Self::check(&proposal).then_some(Self(proposal))
    }

    /// Checks whether the given `proposal` is a valid [`Proposal`].
    fn check(proposal: impl AsRef<str>) -> bool {
        let proposal = proposal.as_ref();
        proposal.trim() == proposal
            && !proposal.is_empty()
            && proposal.chars().count() <= 10_000
    }
}

impl FromStr for Proposal {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Proposal`")
    }
}

define_kind! {
    #[doc = "Status of an [`Application`]."]
    enum Status {
        #[doc = "Professional is invited and has not responded yet."]
        Invited = 1,

        #[doc = "Professional applied and waits for the owner's decision."]
        Pending = 2,

        #[doc = "[`Application`] is accepted."]
        Accepted = 3,

        #[doc = "[`Application`] is rejected, withdrawn or dismissed."]
        Rejected = 4,
    }
}

define_kind! {
    #[doc = "Side which created an [`Application`]."]
    enum Origin {
        #[doc = "Professional applied on their own."]
        Applied = 1,

        #[doc = "[`Offer`] owner invited the professional."]
        Invited = 2,
    }
}

/// Transition of an [`Application`] between [`Status`]es.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Transition {
    /// Invited professional submits a candidacy.
    Submit,

    /// Invited professional accepts the invitation directly.
    AcceptInvitation,

    /// Professional withdraws or declines.
    Withdraw,

    /// [`Offer`] owner accepts a professional, whether invited or applied.
    Accept,

    /// [`Offer`] owner rejects a candidacy.
    Reject,

    /// [`Offer`] owner invites a previously rejected professional again.
    Reinvite,

    /// [`Application`] is rejected as a consequence of an [`Offer`] change.
    Dismiss,
}

/// Every allowed [`Transition`] of an [`Application`]: the [`Status`]es it
/// may be applied in, and the [`Status`] it leads to.
const TRANSITIONS: [(Transition, &[Status], Status); 7] = [
    (Transition::Submit, &[Status::Invited], Status::Pending),
    (Transition::AcceptInvitation, &[Status::Invited], Status::Accepted),
    (
        Transition::Withdraw,
        &[Status::Invited, Status::Pending],
        Status::Rejected,
    ),
    (
        Transition::Accept,
        &[Status::Invited, Status::Pending, Status::Accepted],
        Status::Accepted,
    ),
    (
        Transition::Reject,
        &[Status::Invited, Status::Pending, Status::Accepted],
        Status::Rejected,
    ),
    (Transition::Reinvite, &[Status::Rejected], Status::Invited),
    (
        Transition::Dismiss,
        &[
            Status::Invited,
            Status::Pending,
            Status::Accepted,
            Status::Rejected,
        ],
        Status::Rejected,
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

/// Error of applying a [`Transition`] to an [`Application`] in a wrong
/// [`Status`].
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[display("cannot `{transition}` an `Application` in `{from}` status")]
pub struct IllegalTransition {
    /// [`Transition`] being applied.
    pub transition: Transition,

    /// [`Status`] the [`Application`] was in.
    pub from: Status,
}

/// [`DateTime`] when an [`Application`] was created.
pub type CreationDateTime = DateTimeOf<(Application, unit::Creation)>;

/// [`DateTime`] when an [`Application`] was updated.
pub type UpdateDateTime = DateTimeOf<(Application, unit::Update)>;

#[cfg(test)]
mod spec {
    use super::{
        Application, IllegalTransition, Origin, Proposal, Status, Transition,
    };
    use crate::domain::{offer, user};

    #[test]
    fn moves_only_along_table_edges() {
        use Status as S;
        use Transition as T;

        let expected: &[(T, S, S)] = &[
            (T::Submit, S::Invited, S::Pending),
            (T::AcceptInvitation, S::Invited, S::Accepted),
            (T::Withdraw, S::Invited, S::Rejected),
            (T::Withdraw, S::Pending, S::Rejected),
            (T::Accept, S::Invited, S::Accepted),
            (T::Accept, S::Pending, S::Accepted),
            (T::Accept, S::Accepted, S::Accepted),
            (T::Reject, S::Invited, S::Rejected),
            (T::Reject, S::Pending, S::Rejected),
            (T::Reject, S::Accepted, S::Rejected),
            (T::Reinvite, S::Rejected, S::Invited),
            (T::Dismiss, S::Invited, S::Rejected),
            (T::Dismiss, S::Pending, S::Rejected),
            (T::Dismiss, S::Accepted, S::Rejected),
            (T::Dismiss, S::Rejected, S::Rejected),
        ];

        let transitions = [
            T::Submit,
            T::AcceptInvitation,
            T::Withdraw,
            T::Accept,
            T::Reject,
            T::Reinvite,
            T::Dismiss,
        ];
        for transition in transitions {
            for from in [S::Invited, S::Pending, S::Accepted, S::Rejected] {
                let mut a = Application::invited(
                    offer::Id::new(),
                    user::Id::new(),
                    None,
                );
                a.status = from;
                let res = a.apply(transition);

                match expected
                    .iter()
                    .find(|(t, f, _)| *t == transition && *f == from)
                {
                    Some((.., to)) => {
                        assert_eq!(res, Ok(()), "{transition} from {from}");
                        assert_eq!(a.status, *to, "{transition} from {from}");
                    }
                    None => {
                        assert_eq!(
                            res,
                            Err(IllegalTransition { transition, from }),
                            "{transition} from {from}",
                        );
                        assert_eq!(a.status, from, "{transition} from {from}");
                    }
                }
            }
        }
    }

    #[test]
    fn only_invited_and_pending_are_undecided() {
        let mut a =
            Application::invited(offer::Id::new(), user::Id::new(), None);
        for (status, undecided) in [
            (Status::Invited, true),
            (Status::Pending, true),
            (Status::Accepted, false),
            (Status::Rejected, false),
        ] {
            a.status = status;
            assert_eq!(a.is_undecided(), undecided, "{status}");
        }
    }

    #[test]
    fn records_origin() {
        let (offer_id, professional_id) = (offer::Id::new(), user::Id::new());

        let submitted =
            Application::submitted(offer_id, professional_id, None);
        assert_eq!(submitted.status, Status::Pending);
        assert_eq!(submitted.origin, Origin::Applied);

        let invited = Application::invited(offer_id, professional_id, None);
        assert_eq!(invited.status, Status::Invited);
        assert_eq!(invited.origin, Origin::Invited);
    }

    #[test]
    fn keeps_proposal_when_none_provided() {
        let proposal = Proposal::new("I can do it by Friday").unwrap();
        let a = Application::submitted(
            offer::Id::new(),
            user::Id::new(),
            Some(proposal.clone()),
        )
        .with_proposal(None);
        assert_eq!(a.proposal, Some(proposal));
    }
}
