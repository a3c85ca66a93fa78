//! Subscription quota definitions.

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{Display, Error};

#[cfg(doc)]
use crate::domain::Application;
use crate::domain::{application, user};

define_kind! {
    #[doc = "Resource limited by a subscription plan."]
    enum Resource {
        #[doc = "[`Application`]s created within a billing period."]
        Applications = 1,
    }
}

/// Usage of a [`Resource`] by an actor within the current billing period of
/// the active subscription.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Usage {
    /// Limit of the [`Resource`] granted by the subscription plan.
    ///
    /// [`None`] means unlimited, while `Some(0)` means the plan forbids the
    /// [`Resource`] at all.
    pub limit: Option<u32>,

    /// Amount of the [`Resource`] already used.
    pub used: u32,
}

/// Record of a single [`Resource`] consumption, counted towards the
/// [`Usage`] of its user.
///
/// Stored apart from the consuming [`Application`], so updating or deleting
/// the [`Application`] never gives the [`Resource`] back.
#[derive(Clone, Copy, Debug)]
pub struct Consumption {
    /// ID of the user whose quota is consumed.
    pub user_id: user::Id,

    /// Consumed [`Resource`].
    pub resource: Resource,

    /// ID of the [`Application`] the [`Resource`] is consumed for.
    pub application_id: application::Id,

    /// [`DateTime`] of this [`Consumption`].
    pub consumed_at: ConsumptionDateTime,
}

impl Consumption {
    /// Creates a new [`Consumption`] of the [`Resource::Applications`] by the
    /// provided user for the provided [`Application`].
    #[must_use]
    pub fn application(
        user_id: user::Id,
        application_id: application::Id,
    ) -> Self {
        Self {
            user_id,
            resource: Resource::Applications,
            application_id,
            consumed_at: DateTime::now().coerce(),
        }
    }
}

/// [`DateTime`] of a [`Consumption`].
pub type ConsumptionDateTime = DateTimeOf<(Consumption, unit::Creation)>;

/// Purpose a [`Resource`] is going to be consumed for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Purpose {
    /// Creating a new quota-consuming entry.
    Consume,

    /// Responding to an invitation, which doesn't consume the quota of an
    /// invited professional.
    InvitedResponse,
}

/// Reason of denying a [`Resource`] consumption.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum Denial {
    /// No active subscription.
    #[display("No active subscription")]
    NoSubscription,

    /// Subscription plan doesn't include the [`Resource`].
    #[display("Subscription plan forbids this action")]
    Forbidden,

    /// Limit of the subscription plan is reached.
    #[display("Quota exhausted: {used} of {limit} used")]
    Exhausted {
        /// Limit of the subscription plan.
        limit: u32,

        /// Amount already used.
        used: u32,
    },
}

/// Checks whether a [`Resource`] may be consumed for the provided
/// [`Purpose`], given its current [`Usage`].
///
/// [`None`] `usage` means there is no active subscription.
///
/// # Errors
///
/// With a [`Denial`] if the [`Resource`] cannot be consumed.
pub fn check(usage: Option<&Usage>, purpose: Purpose) -> Result<(), Denial> {
    let Some(&Usage { limit, used }) = usage else {
        return Err(Denial::NoSubscription);
    };
    match limit {
        None => Ok(()),
        Some(0) => Err(Denial::Forbidden),
        Some(limit) if used >= limit => match purpose {
            Purpose::InvitedResponse => Ok(()),
            Purpose::Consume => Err(Denial::Exhausted { limit, used }),
        },
        Some(_) => Ok(()),
    }
}
