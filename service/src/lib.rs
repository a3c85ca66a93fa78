//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::error::Error;

use common::operations::Start;
use derive_more::Debug;
use tracing as log;

#[cfg(doc)]
use self::infra::{Database, Notifier};
use self::{domain::Notification, infra::notifier};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the sessions issued by the identity provider.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Queue of [`Notification`]s to be delivered once the [`Command`]s
    /// producing them are committed.
    outbox: notifier::Outbox,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters, delivering
    /// [`Notification`]s via the provided [`Notifier`] in the background.
    pub fn new<N>(
        config: Config,
        database: Db,
        notifier: N,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<task::DeliverNotifications<N>>,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
        N: 'static,
    {
        let (this, inbox) = Self::detached(config, database);

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            let task = task::DeliverNotifications::new(notifier, inbox);
            svc.execute(Start(task)).await
        });

        (this, bg)
    }

    /// Creates a new [`Service`] with the provided parameters, returning the
    /// [`notifier::Inbox`] of its [`Notification`]s to be drained by the
    /// caller.
    #[must_use]
    pub fn detached(config: Config, database: Db) -> (Self, notifier::Inbox) {
        let (outbox, inbox) = notifier::queue();
        (
            Self {
                config,
                database,
                outbox,
            },
            inbox,
        )
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Enqueues the provided [`Notification`]s for delivery.
    ///
    /// Never fails: [`Notification`]s are dropped if nobody is going to
    /// deliver them anymore.
    pub(crate) fn notify(
        &self,
        notifications: impl IntoIterator<Item = Notification>,
    ) {
        for n in notifications {
            if self.outbox.send(n).is_err() {
                log::warn!(
                    "`Notification` queue is closed, dropping `{}` for \
                     `User(id: {})`",
                    n.event.kind(),
                    n.recipient,
                );
            }
        }
    }
}
