pub mod column_type;
pub mod statement;
pub mod trino;
