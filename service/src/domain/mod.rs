//! Domain definitions.

pub mod application;
pub mod notification;
pub mod offer;
pub mod quota;
pub mod user;

pub use self::{
    application::Application,
    notification::Notification,
    offer::Offer,
    user::{Actor, Profile},
};
