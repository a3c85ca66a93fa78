//! [`Offer`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{offer, user, Offer},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C, IDs> Database<Select<By<HashMap<offer::Id, Offer>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[offer::Id]>,
{
    type Ok = HashMap<offer::Id, Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<offer::Id, Offer>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[offer::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap_or(i32::MAX);

        const SQL: &str = "\
            SELECT id, owner_id, \
                   title, description, \
                   status, is_open_to_applications, \
                   assigned_professionals, \
                   created_at, updated_at \
            FROM offers \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Offer {
                        id,
                        owner_id: row.get("owner_id"),
                        title: row.get("title"),
                        description: row.get("description"),
                        status: row.get("status"),
                        is_open_to_applications: row
                            .get("is_open_to_applications"),
                        assigned_professionals: row
                            .get::<_, Vec<user::Id>>("assigned_professionals")
                            .into_iter()
                            .collect(),
                        created_at: row.get("created_at"),
                        updated_at: row.get("updated_at"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Offer>, offer::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<offer::Id, Offer>, [offer::Id; 1]>>,
        Ok = HashMap<offer::Id, Offer>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Offer>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Offer>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(offer)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Offer>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(offer): Update<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        let Offer {
            id,
            owner_id,
            title,
            description,
            status,
            is_open_to_applications,
            assigned_professionals,
            created_at,
            updated_at,
        } = offer;

        let mut assigned_professionals =
            assigned_professionals.into_iter().collect::<Vec<_>>();
        assigned_professionals.sort_by_key(ToString::to_string);

        const SQL: &str = "\
            INSERT INTO offers (\
                id, owner_id, \
                title, description, \
                status, is_open_to_applications, \
                assigned_professionals, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, \
                $3::VARCHAR, $4::TEXT, \
                $5::INT2, $6::BOOLEAN, \
                $7::UUID[], \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET owner_id = EXCLUDED.owner_id, \
                title = EXCLUDED.title, \
                description = EXCLUDED.description, \
                status = EXCLUDED.status, \
                is_open_to_applications = EXCLUDED.is_open_to_applications, \
                assigned_professionals = EXCLUDED.assigned_professionals, \
                created_at = EXCLUDED.created_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &owner_id,
                &title,
                &description,
                &status,
                &is_open_to_applications,
                &assigned_professionals,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Offer, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Offer, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: offer::Id = by.into_inner();

        // `applications` are removed by `ON DELETE CASCADE`.
        const SQL: &str = "\
            DELETE FROM offers \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Offer, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Offer, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: offer::Id = by.into_inner();

        // Touching an already existing row locks it until the end of the
        // transaction too.
        const SQL: &str = "\
            INSERT INTO offers_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE \
            SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Select<By<read::offer::list::Page, read::offer::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::offer::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::offer::list::Page, read::offer::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::offer::list::Selector {
            arguments,
            filter:
                read::offer::list::Filter {
                    owner_id,
                    status,
                    applicant,
                },
        } = by.into_inner();

        let limit = i32::try_from(arguments.limit()).unwrap_or(i32::MAX - 1)
            + 1;
        let applicant_statuses = applicant.as_ref().map(|a| {
            a.statuses
                .iter()
                .map(|s| i16::from(s.u8()))
                .collect::<Vec<_>>()
        });

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let owner_idx = owner_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let applicant_idx = applicant
            .as_ref()
            .zip(applicant_statuses.as_ref())
            .map(|(a, statuses)| {
                ps.push(&a.professional_id);
                ps.push(statuses);
                (ps.len() - 1, ps.len())
            });

        let sql = format!(
            "SELECT id \
             FROM offers \
             WHERE true \
                   {cursor} \
                   {owner_filtering} \
                   {status_filtering} \
                   {applicant_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            order = arguments.kind().order().sql(),
            owner_filtering = owner_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND owner_id = ${idx}::UUID"))
            }),
            status_filtering =
                status_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND status = ${idx}::INT2"))
                }),
            applicant_filtering = applicant_idx.into_iter().format_with(
                "",
                |(pro, statuses), f| {
                    f(&format_args!(
                        "AND EXISTS (\
                             SELECT 1 \
                             FROM applications \
                             WHERE offer_id = offers.id \
                               AND professional_id = ${pro}::UUID \
                               AND status = ANY(${statuses}::INT2[])\
                         )"
                    ))
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

        Ok(read::offer::list::Page::new(&arguments, edges, has_more))
    }
}
