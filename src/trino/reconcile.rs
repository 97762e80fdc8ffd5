use crate::sql::db_connection_pool::dbconnection::{Error, SyncDbConnection};
use crate::sql::sql_gen::statement::TableReference;
use crate::sql::sql_gen::trino::value::quote_string;
use crate::util::identifier::{clean_column_name, quote_identifier};
use crate::util::schema::TableSchema;
use std::collections::HashSet;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Column names of the live table, lower-cased as Trino reports them.
///
/// A table with no rows in its `DESCRIBE` output yields an empty set; a
/// failing `DESCRIBE` (for example a missing table) is returned as an error.
///
/// # Errors
///
/// Returns an error if the `DESCRIBE` statement fails.
pub fn existing_columns(
    conn: &dyn SyncDbConnection,
    table: &TableReference,
) -> Result<HashSet<String>> {
    let rows = conn
        .load(&format!("DESCRIBE {table}"))
        .map_err(|source| Error::UnableToDescribeTable {
            table_name: table.to_string(),
            source: Box::new(source),
        })?;

    Ok(rows
        .iter()
        .filter_map(|row| row.first().and_then(|name| name.as_str()))
        .map(str::to_lowercase)
        .collect())
}

/// Desired columns whose sanitized name is not among `existing`, in schema order.
#[must_use]
pub fn new_columns<'a>(schema: &'a TableSchema, existing: &HashSet<String>) -> Vec<&'a str> {
    schema
        .column_names()
        .into_iter()
        .filter(|name| !existing.contains(&clean_column_name(name)))
        .collect()
}

/// `SHOW TABLES FROM schema LIKE 'table'`
///
/// `_` and `%` in the table name are escaped so the pattern only matches the
/// name itself.
#[must_use]
pub fn show_tables_sql(table: &TableReference) -> String {
    let schema = quote_identifier(table.schema_name());
    let name = table.table_name();

    if !name.contains(['_', '%', '\\']) {
        return format!("SHOW TABLES FROM {schema} LIKE {}", quote_string(name));
    }

    let pattern = name
        .replace('\\', "\\\\")
        .replace('_', "\\_")
        .replace('%', "\\%");
    format!(
        "SHOW TABLES FROM {schema} LIKE {} ESCAPE '\\'",
        quote_string(&pattern)
    )
}

/// True when `SHOW TABLES` returns at least one row for the table name.
///
/// # Errors
///
/// Returns an error if the `SHOW TABLES` statement fails.
pub fn table_exists(conn: &dyn SyncDbConnection, table: &TableReference) -> Result<bool> {
    let rows = conn
        .load(&show_tables_sql(table))
        .map_err(|source| Error::UnableToGetTables {
            schema_name: table.schema_name().to_string(),
            source: Box::new(source),
        })?;

    Ok(!rows.is_empty())
}
