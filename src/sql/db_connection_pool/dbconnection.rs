use serde_json::Value;
use snafu::prelude::*;
use std::any::Any;

pub mod trinoconn;

pub type GenericError = Box<dyn std::error::Error + Send + Sync>;
type Result<T, E = GenericError> = std::result::Result<T, E>;

/// One result row as returned by the server, one JSON value per column.
pub type Row = Vec<Value>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Failed to execute query.\n{source}"))]
    UnableToLoad { source: GenericError },

    #[snafu(display("Unable to describe table '{table_name}': {source}"))]
    UnableToDescribeTable {
        table_name: String,
        source: GenericError,
    },

    #[snafu(display("Unable to list tables in schema '{schema_name}': {source}"))]
    UnableToGetTables {
        schema_name: String,
        source: GenericError,
    },
}

pub trait DbConnection: Send {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_sync(&self) -> Option<&dyn SyncDbConnection> {
        None
    }
}

pub trait SyncDbConnection: DbConnection {
    /// Run a statement to completion and return every row it produced.
    ///
    /// Used both for metadata queries (`DESCRIBE`, `SHOW TABLES`) and for
    /// DDL/DML, whose rows carry affected-row counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or the server rejects it.
    fn load(&self, sql: &str) -> Result<Vec<Row>, Error>;
}
