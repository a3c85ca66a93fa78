//! Read entities definitions.

pub mod application;
pub mod offer;
