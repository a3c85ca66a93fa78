//! [`Offer`] read model definition.

#[cfg(doc)]
use crate::domain::Offer;

pub mod list {
    //! [`Offer`]s list definitions.

    use common::define_pagination;

    use crate::domain::{application, offer, user};
    #[cfg(doc)]
    use crate::domain::{Application, Offer};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = offer::Id;

    /// Cursor pointing to a specific [`Offer`] in a list.
    pub type Cursor = offer::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// ID of the client owning the [`Offer`]s.
        pub owner_id: Option<user::Id>,

        /// [`offer::Status`] of the [`Offer`]s.
        pub status: Option<offer::Status>,

        /// [`Applicant`] holding an [`Application`] on the [`Offer`]s.
        pub applicant: Option<Applicant>,
    }

    /// Professional holding an [`Application`] on an [`Offer`].
    #[derive(Clone, Debug)]
    pub struct Applicant {
        /// ID of the professional.
        pub professional_id: user::Id,

        /// [`application::Status`]es the [`Application`] may be in.
        pub statuses: Vec<application::Status>,
    }
}
