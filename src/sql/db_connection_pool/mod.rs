use dbconnection::DbConnection;

pub mod dbconnection;
pub mod trinodbpool;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Hands out a fresh session for each logical operation.
///
/// The returned connection is dropped by the caller once that operation's
/// statements have run, on success and error paths alike.
pub trait DbConnectionPool: Send + Sync {
    fn connect(&self) -> Result<Box<dyn DbConnection>>;
}
