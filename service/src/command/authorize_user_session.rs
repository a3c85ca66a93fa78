//! [`Command`] for authorizing a user [`Session`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        Profile,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`Session`] issued by the identity provider.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<Profile>, user::Id>>,
        Ok = Option<Profile>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        drop(
            self.database()
                .execute(Select(By::<Option<Profile>, _>::new(
                    session.user_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(session.user_id))
                .map_err(tracerr::wrap!())?,
        );

        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// User the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::{
        domain::user::{self, session, Session},
        infra::database::memory,
        Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    /// Issues a [`session::Token`] for the provided user.
    fn issue(user_id: user::Id, ttl: Duration) -> session::Token {
        let session = Session {
            user_id,
            expires_at: (DateTime::now() + ttl).coerce(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &session,
            &EncodingKey::from_secret(memory::SECRET),
        )
        .unwrap()
        .parse()
        .unwrap()
    }

    #[tokio::test]
    async fn authorizes_existing_user() {
        let (svc, _) = memory::service();
        let client = svc.database().client().await;

        let session = svc
            .execute(AuthorizeUserSession {
                token: issue(client, Duration::from_secs(60)),
            })
            .await
            .unwrap();

        assert_eq!(session.user_id, client);
    }

    #[tokio::test]
    async fn rejects_unknown_user() {
        let (svc, _) = memory::service();
        let stranger = user::Id::new();

        let err = svc
            .execute(AuthorizeUserSession {
                token: issue(stranger, Duration::from_secs(60)),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UserNotExists(id) if *id == stranger,
        ));
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let (svc, _) = memory::service();
        let client = svc.database().client().await;
        let token = jsonwebtoken::encode(
            &Header::default(),
            &Session {
                user_id: client,
                expires_at: (DateTime::now() + Duration::from_secs(60))
                    .coerce(),
            },
            &EncodingKey::from_secret(b"other"),
        )
        .unwrap();

        let err = svc
            .execute(AuthorizeUserSession {
                token: token.parse().unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }
}
