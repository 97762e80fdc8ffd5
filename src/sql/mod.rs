pub mod db_connection_pool;
pub mod sql_gen;
