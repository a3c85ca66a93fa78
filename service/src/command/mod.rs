//! [`Command`] definition.

pub mod accept_invitation;
pub mod apply_to_offer;
pub mod assign_offer;
pub mod authorize_user_session;
pub mod close_offer;
pub mod complete_offer;
pub mod create_offer;
pub mod delete_offer;
pub mod invite_professional;
pub mod reactivate_offer;
pub mod reject_application;
pub mod update_application_status;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    accept_invitation::AcceptInvitation, apply_to_offer::ApplyToOffer,
    assign_offer::AssignOffer, authorize_user_session::AuthorizeUserSession,
    close_offer::CloseOffer, complete_offer::CompleteOffer,
    create_offer::CreateOffer, delete_offer::DeleteOffer,
    invite_professional::InviteProfessional,
    reactivate_offer::ReactivateOffer,
    reject_application::RejectApplication,
    update_application_status::UpdateApplicationStatus,
};
