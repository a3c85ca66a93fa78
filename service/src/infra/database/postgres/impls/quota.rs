//! [`quota::Usage`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use tracerr::Traced;

use crate::{
    domain::{quota, user},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C>
    Database<Select<By<Option<quota::Usage>, (user::Id, quota::Resource)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<quota::Usage>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<quota::Usage>, (user::Id, quota::Resource)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (user_id, resource) = by.into_inner();

        const SQL: &str = "\
            SELECT p.applications_limit, \
                   (SELECT COUNT(*) \
                    FROM quota_consumptions AS c \
                    WHERE c.user_id = s.user_id \
                      AND c.resource = $2::INT2 \
                      AND c.consumed_at >= s.period_started_at \
                   ) AS used \
            FROM subscriptions AS s \
            INNER JOIN plans AS p ON p.id = s.plan_id \
            WHERE s.user_id = $1::UUID \
              AND s.is_active \
            ORDER BY s.period_started_at DESC \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&user_id, &resource])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let limit = row
            .get::<_, Option<i32>>("applications_limit")
            .map(|l| u32::try_from(l).unwrap_or_default());
        let used = u32::try_from(row.get::<_, i64>("used")).unwrap_or(u32::MAX);
        Ok(Some(quota::Usage { limit, used }))
    }
}

impl<C> Database<Lock<By<quota::Usage, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<quota::Usage, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO quota_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (user_id) DO UPDATE \
            SET user_id = EXCLUDED.user_id";
        self.exec(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Insert<quota::Consumption>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(consumption): Insert<quota::Consumption>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let quota::Consumption {
            user_id,
            resource,
            application_id,
            consumed_at,
        } = consumption;

        const SQL: &str = "\
            INSERT INTO quota_consumptions (\
                user_id, resource, application_id, consumed_at\
            ) \
            VALUES ($1::UUID, $2::INT2, $3::UUID, $4::TIMESTAMPTZ)";
        self.exec(SQL, &[&user_id, &resource, &application_id, &consumed_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
