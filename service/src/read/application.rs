//! [`Application`] read model definition.

#[cfg(doc)]
use crate::domain::Application;

pub mod list {
    //! [`Application`]s list definitions.

    use common::define_pagination;

    use crate::domain::{application, offer, user};
    #[cfg(doc)]
    use crate::domain::{Application, Offer};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = application::Id;

    /// Cursor pointing to a specific [`Application`] in a list.
    pub type Cursor = application::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the [`Offer`] the [`Application`]s are attached to.
        pub offer_id: Option<offer::Id>,

        /// ID of the professional the [`Application`]s belong to.
        pub professional_id: Option<user::Id>,

        /// [`application::Status`] of the [`Application`]s.
        pub status: Option<application::Status>,
    }
}
