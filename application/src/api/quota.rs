//! Subscription quota definitions.

use juniper::GraphQLObject;
use service::domain;

/// Usage of the `Application`s quota within the current billing period.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "QuotaUsage")]
pub struct Usage {
    /// Limit granted by the subscription plan.
    ///
    /// `null` means unlimited, while `0` means the plan doesn't allow
    /// `Application`s at all.
    pub limit: Option<i32>,

    /// Amount already used.
    pub used: i32,

    /// Amount still available, if limited.
    pub remaining: Option<i32>,
}

impl From<domain::quota::Usage> for Usage {
    fn from(usage: domain::quota::Usage) -> Self {
        let domain::quota::Usage { limit, used } = usage;
        let clamp = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);
        Self {
            limit: limit.map(clamp),
            used: clamp(used),
            remaining: limit.map(|l| clamp(l.saturating_sub(used))),
        }
    }
}
