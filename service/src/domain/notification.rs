//! [`Notification`] definitions.

use common::define_kind;

#[cfg(doc)]
use crate::domain::{Application, Offer};
use crate::domain::{application, offer, user};

/// Notification about a lifecycle event, addressed to a single user.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Notification {
    /// ID of the user receiving this [`Notification`].
    pub recipient: user::Id,

    /// [`Event`] this [`Notification`] is about.
    pub event: Event,
}

/// Lifecycle event of an [`Offer`] or an [`Application`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// Professional was invited to an [`Offer`].
    InvitationSent {
        /// ID of the [`Offer`].
        offer_id: offer::Id,

        /// ID of the invitation [`Application`].
        application_id: application::Id,
    },

    /// Professional applied to an [`Offer`].
    ApplicationSubmitted {
        /// ID of the [`Offer`].
        offer_id: offer::Id,

        /// ID of the submitted [`Application`].
        application_id: application::Id,

        /// ID of the applied professional.
        professional_id: user::Id,
    },

    /// [`application::Status`] has changed.
    ApplicationStatusChanged {
        /// ID of the [`Offer`].
        offer_id: offer::Id,

        /// ID of the changed [`Application`].
        application_id: application::Id,

        /// New [`application::Status`].
        status: application::Status,
    },

    /// Professional was assigned to an [`Offer`].
    OfferAssigned {
        /// ID of the assigned [`Offer`].
        offer_id: offer::Id,

        /// ID of the accepted [`Application`] of the professional.
        application_id: application::Id,
    },

    /// [`Offer`] was closed by its owner.
    OfferClosed {
        /// ID of the closed [`Offer`].
        offer_id: offer::Id,
    },

    /// [`Offer`] was completed.
    OfferCompleted {
        /// ID of the completed [`Offer`].
        offer_id: offer::Id,
    },

    /// Closed or completed [`Offer`] was reactivated.
    OfferReactivated {
        /// ID of the reactivated [`Offer`].
        offer_id: offer::Id,

        /// [`offer::ReactivationMode`] being applied.
        mode: offer::ReactivationMode,
    },

    /// Professional declined an invitation.
    InvitationDeclined {
        /// ID of the [`Offer`].
        offer_id: offer::Id,

        /// ID of the declined [`Application`].
        application_id: application::Id,

        /// ID of the declining professional.
        professional_id: user::Id,
    },
}

impl Event {
    /// Returns [`Kind`] of this [`Event`].
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::InvitationSent { .. } => Kind::InvitationSent,
            Self::ApplicationSubmitted { .. } => Kind::ApplicationSubmitted,
            Self::ApplicationStatusChanged { .. } => {
                Kind::ApplicationStatusChanged
            }
            Self::OfferAssigned { .. } => Kind::OfferAssigned,
            Self::OfferClosed { .. } => Kind::OfferClosed,
            Self::OfferCompleted { .. } => Kind::OfferCompleted,
            Self::OfferReactivated { .. } => Kind::OfferReactivated,
            Self::InvitationDeclined { .. } => Kind::InvitationDeclined,
        }
    }

    /// Returns ID of the [`Offer`] this [`Event`] relates to.
    #[must_use]
    pub const fn offer_id(&self) -> offer::Id {
        match *self {
            Self::InvitationSent { offer_id, .. }
            | Self::ApplicationSubmitted { offer_id, .. }
            | Self::ApplicationStatusChanged { offer_id, .. }
            | Self::OfferAssigned { offer_id, .. }
            | Self::OfferClosed { offer_id }
            | Self::OfferCompleted { offer_id }
            | Self::OfferReactivated { offer_id, .. }
            | Self::InvitationDeclined { offer_id, .. } => offer_id,
        }
    }

    /// Creates a [`Notification`] of this [`Event`] for the provided
    /// `recipient`.
    #[must_use]
    pub const fn to(self, recipient: user::Id) -> Notification {
        Notification {
            recipient,
            event: self,
        }
    }
}

define_kind! {
    #[doc = "Kind of an [`Event`]."]
    enum Kind {
        #[doc = "[`Event::InvitationSent`]."]
        InvitationSent = 1,

        #[doc = "[`Event::ApplicationSubmitted`]."]
        ApplicationSubmitted = 2,

        #[doc = "[`Event::ApplicationStatusChanged`]."]
        ApplicationStatusChanged = 3,

        #[doc = "[`Event::OfferAssigned`]."]
        OfferAssigned = 4,

        #[doc = "[`Event::OfferClosed`]."]
        OfferClosed = 5,

        #[doc = "[`Event::OfferCompleted`]."]
        OfferCompleted = 6,

        #[doc = "[`Event::OfferReactivated`]."]
        OfferReactivated = 7,

        #[doc = "[`Event::InvitationDeclined`]."]
        InvitationDeclined = 8,
    }
}
