//! The execution surface rendered commands are sent to.

use crate::error::OrmResult;
use crate::fragment::SqlCommand;
use crate::row::Row;
use crate::value::Value;

/// Runs rendered [`SqlCommand`]s against a database.
///
/// Implementations bind `command.params` in placeholder order, honour
/// `command.timeout` and report faults unwrapped; statement context is added by
/// [`OrmConnection`](crate::connection::OrmConnection).
pub trait Executor: Send + Sync {
    /// Run a statement that returns rows.
    fn query(
        &self,
        command: &SqlCommand,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, command: &SqlCommand) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// First column of the first row, if any.
    fn scalar(
        &self,
        command: &SqlCommand,
    ) -> impl std::future::Future<Output = OrmResult<Option<Value>>> + Send {
        async move {
            let rows = self.query(command).await?;
            Ok(rows
                .into_iter()
                .next()
                .and_then(|row| row.get_idx(0).cloned()))
        }
    }
}

impl<E: Executor> Executor for &E {
    fn query(
        &self,
        command: &SqlCommand,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(command)
    }

    fn execute(&self, command: &SqlCommand) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        (**self).execute(command)
    }

    fn scalar(
        &self,
        command: &SqlCommand,
    ) -> impl std::future::Future<Output = OrmResult<Option<Value>>> + Send {
        (**self).scalar(command)
    }
}
