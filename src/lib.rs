pub mod sql;
pub mod trino;
pub mod util;

pub use trino::{InsertStats, TrinoConnector};
