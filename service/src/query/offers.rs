//! [`Query`] collection related to the multiple [`Offer`]s.

use common::operations::{By, Select};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Application, Offer};
use crate::{
    domain::{application, user},
    infra::{database, Database},
    read::offer::list,
    Service,
};

use super::{DatabaseQuery, Query};

/// Queries a list of [`Offer`]s.
pub type List = DatabaseQuery<By<list::Page, list::Selector>>;

/// Queries a list of [`Offer`]s a professional holds an [`Application`] on.
#[derive(Clone, Debug)]
pub struct Received {
    /// ID of the professional.
    pub professional_id: user::Id,

    /// [`application::Status`]es of the held [`Application`]s.
    ///
    /// Only invitations awaiting response are considered, if empty.
    pub statuses: Vec<application::Status>,

    /// [`list::Arguments`] of the page to select.
    pub arguments: list::Arguments,
}

impl<Db> Query<Received> for Service<Db>
where
    Db: Database<
        Select<By<list::Page, list::Selector>>,
        Ok = list::Page,
        Err = Traced<database::Error>,
    >,
{
    type Ok = list::Page;
    type Err = Traced<database::Error>;

    async fn execute(&self, query: Received) -> Result<Self::Ok, Self::Err> {
        let Received {
            professional_id,
            mut statuses,
            arguments,
        } = query;

        if statuses.is_empty() {
            statuses.push(application::Status::Invited);
        }

        self.database()
            .execute(Select(By::new(list::Selector {
                arguments,
                filter: list::Filter {
                    applicant: Some(list::Applicant {
                        professional_id,
                        statuses,
                    }),
                    ..list::Filter::default()
                },
            })))
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::application, infra::database::memory, read::offer::list,
        Query as _,
    };

    use super::Received;

    #[tokio::test]
    async fn lists_invitations_by_default() {
        let (svc, _) = memory::service();
        let db = svc.database();
        let client = db.client().await;
        let professional = db.professional().await;
        let (invited, pending, untouched) = (
            db.open_offer(client).await,
            db.open_offer(client).await,
            db.open_offer(client).await,
        );
        drop(
            db.application_in(
                invited.id,
                professional,
                application::Status::Invited,
            )
            .await,
        );
        drop(
            db.application_in(
                pending.id,
                professional,
                application::Status::Pending,
            )
            .await,
        );

        let received = |statuses| Received {
            professional_id: professional,
            statuses,
            arguments: list::Arguments::Forward {
                first: 10,
                after: None,
                including: false,
            },
        };

        let page = svc.execute(received(vec![])).await.unwrap();
        let ids = page.edges.iter().map(|e| e.node).collect::<Vec<_>>();
        assert_eq!(ids, [invited.id]);

        let page = svc
            .execute(received(vec![
                application::Status::Invited,
                application::Status::Pending,
            ]))
            .await
            .unwrap();
        let ids = page.edges.iter().map(|e| e.node).collect::<Vec<_>>();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&untouched.id));
    }
}
