//! [`Application`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{application, offer, user, Application},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `applications` table, as expected by [`from_row()`].
const COLUMNS: &str = "\
    id, offer_id, professional_id, \
    status, origin, proposal, \
    created_at, updated_at";

/// Reads an [`Application`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Application {
    Application {
        id: row.get("id"),
        offer_id: row.get("offer_id"),
        professional_id: row.get("professional_id"),
        status: row.get("status"),
        origin: row.get("origin"),
        proposal: row.get("proposal"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<application::Id, Application>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[application::Id]>,
{
    type Ok = HashMap<application::Id, Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<application::Id, Application>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[application::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap_or(i32::MAX);

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
             WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
             LIMIT $2::INT4",
        );
        Ok(self
            .query(&sql, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let a = from_row(row);
                (a.id, a)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Application>, application::Id>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<application::Id, Application>, [application::Id; 1]>>,
        Ok = HashMap<application::Id, Application>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Option<Application>, (offer::Id, user::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, (offer::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (offer_id, professional_id) = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
             WHERE offer_id = $1::UUID \
               AND professional_id = $2::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&offer_id, &professional_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Application>, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Application>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let offer_id: offer::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
             WHERE offer_id = $1::UUID \
             ORDER BY created_at, id",
        );
        Ok(self
            .query(&sql, &[&offer_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Application>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Application>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(application): Insert<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        // Violation of `applications_offer_id_professional_id_key` is
        // reported as is.
        self.execute(Update(application))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Application>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(application): Update<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        let Application {
            id,
            offer_id,
            professional_id,
            status,
            origin,
            proposal,
            created_at,
            updated_at,
        } = application;

        const SQL: &str = "\
            INSERT INTO applications (\
                id, offer_id, professional_id, \
                status, origin, proposal, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::INT2, $5::INT2, $6::TEXT, \
                $7::TIMESTAMPTZ, $8::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                origin = EXCLUDED.origin, \
                proposal = EXCLUDED.proposal, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &offer_id,
                &professional_id,
                &status,
                &origin,
                &proposal,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Application, (offer::Id, user::Id)>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Application, (offer::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (offer_id, professional_id) = by.into_inner();

        const SQL: &str = "\
            INSERT INTO applications_lock \
            VALUES ($1::UUID, $2::UUID) \
            ON CONFLICT (offer_id, professional_id) DO UPDATE \
            SET offer_id = EXCLUDED.offer_id";
        self.exec(SQL, &[&offer_id, &professional_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<
        Select<
            By<
                read::application::list::Page,
                read::application::list::Selector,
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::application::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::application::list::Page,
                read::application::list::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::application::list::Selector {
            arguments,
            filter:
                read::application::list::Filter {
                    offer_id,
                    professional_id,
                    status,
                },
        } = by.into_inner();

        let limit = i32::try_from(arguments.limit()).unwrap_or(i32::MAX - 1)
            + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let filters = [
            offer_id.as_ref().map(|id| {
                ps.push(id);
                ("offer_id", ps.len(), "UUID")
            }),
            professional_id.as_ref().map(|id| {
                ps.push(id);
                ("professional_id", ps.len(), "UUID")
            }),
            status.as_ref().map(|s| {
                ps.push(s);
                ("status", ps.len(), "INT2")
            }),
        ];

        let sql = format!(
            "SELECT id \
             FROM applications \
             WHERE true \
                   {cursor} \
                   {filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            order = arguments.kind().order().sql(),
            filtering = filters.into_iter().flatten().format_with(
                " ",
                |(column, idx, ty), f| {
                    f(&format_args!("AND {column} = ${idx}::{ty}"))
                },
            ),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::application::list::Page::new(&arguments, edges, has_more))
    }
}
