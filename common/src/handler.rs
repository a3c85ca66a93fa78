//! [`Handler`] of commands, queries, tasks and database operations.

use std::future::Future;

/// Asynchronous handler of `Args`.
///
/// Implemented once per argument type, so a single service or database
/// handles many operations, each with its own result and error types.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Handles the provided `Args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
