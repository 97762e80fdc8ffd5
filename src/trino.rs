/*
Copyright 2024 The Spice.ai OSS Authors

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

     https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::sql::db_connection_pool::dbconnection::{self, DbConnection, Row, SyncDbConnection};
use crate::sql::db_connection_pool::trinodbpool::{self, TrinoConnectionPool};
use crate::sql::db_connection_pool::{self, DbConnectionPool};
use crate::sql::sql_gen::statement::{
    self, AlterTableBuilder, CreateTableBuilder, InsertBuilder, TableReference,
};
use crate::sql::sql_gen::trino::schema::trino_column_type_mapping;
use crate::sql::sql_gen::trino::value::TrinoValueConverter;
use crate::sql::sql_gen::trino::{self as trino_sql, wrap_insert_commands};
use crate::util::on_conflict::UniqueConflictMethod;
use crate::util::schema::{Record, TableSchema};
use secrecy::SecretString;
use serde_json::Value;
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

pub mod reconcile;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Unable to create the Trino connection pool: {source}"))]
    UnableToCreatePool { source: trinodbpool::Error },

    #[snafu(display("Unable to open a Trino session: {source}"))]
    UnableToConnect { source: db_connection_pool::Error },

    #[snafu(display("The Trino session does not support synchronous queries."))]
    UnableToDowncastConnection,

    #[snafu(display("Unable to map column types for table '{table}': {source}"))]
    UnableToMapColumnTypes {
        table: String,
        source: trino_sql::Error,
    },

    #[snafu(display("Unable to build insert for table '{table}': {source}"))]
    UnableToBuildInsert {
        table: String,
        source: statement::Error,
    },

    #[snafu(display("Unable to reconcile the schema of table '{table}': {source}"))]
    UnableToReconcileSchema {
        table: String,
        source: dbconnection::Error,
    },

    #[snafu(display("Failed to execute statement {index} of {total}: {source}"))]
    UnableToExecuteCommand {
        index: usize,
        total: usize,
        source: dbconnection::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Row counts reported back to the pipeline after an insert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub records_inserted: i64,
    pub records_updated: i64,
}

/// Sums the affected-row counts Trino returns for each executed statement.
///
/// Every statement contributes its rows; a row counts when its first element
/// is an integer. Trino has no upsert, so nothing is ever updated.
#[must_use]
pub fn calculate_records_inserted_and_updated(data: &[Vec<Row>]) -> InsertStats {
    let records_inserted = data
        .iter()
        .flatten()
        .filter_map(|row| row.first().and_then(Value::as_i64))
        .sum();

    InsertStats {
        records_inserted,
        records_updated: 0,
    }
}

/// Entry point for writing record batches into Trino tables.
///
/// Every operation that talks to Trino opens its own session from the pool and
/// drops it before returning.
pub struct TrinoConnector<P: DbConnectionPool = TrinoConnectionPool> {
    pool: Arc<P>,
}

impl<P: DbConnectionPool> std::fmt::Debug for TrinoConnector<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrinoConnector").finish_non_exhaustive()
    }
}

impl TrinoConnector<TrinoConnectionPool> {
    /// Builds the HTTP connection pool from connection parameters and verifies the coordinator.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or Trino cannot be reached.
    pub fn from_params(params: HashMap<String, SecretString>) -> Result<Self> {
        let pool = TrinoConnectionPool::new(params).context(UnableToCreatePoolSnafu)?;
        Ok(Self::new(Arc::new(pool)))
    }
}

impl<P: DbConnectionPool> TrinoConnector<P> {
    #[must_use]
    pub fn new(pool: Arc<P>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// Opens a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot hand out a connection.
    pub fn build_connection(&self) -> Result<Box<dyn DbConnection>> {
        self.pool.connect().context(UnableToConnectSnafu)
    }

    /// # Errors
    ///
    /// Returns an error if a column type cannot be mapped.
    #[tracing::instrument(level = "debug", skip(self, schema, unique_constraints))]
    pub fn build_create_table_commands(
        &self,
        schema: &TableSchema,
        schema_name: &str,
        stream: &str,
        table_name: &str,
        database_name: Option<&str>,
        unique_constraints: &[String],
    ) -> Result<Vec<String>> {
        let table = TableReference::new(schema_name, table_name).with_database_name(database_name);
        let mapping = trino_column_type_mapping(schema).context(UnableToMapColumnTypesSnafu {
            table: table.to_string(),
        })?;

        Ok(CreateTableBuilder::new(mapping, &table)
            .unique_constraints(unique_constraints.to_vec())
            .build_trino())
    }

    /// Adds the schema's columns that the live table is missing.
    ///
    /// Runs `DESCRIBE` on a fresh session. Columns already present are never
    /// changed, whatever their current type.
    ///
    /// # Errors
    ///
    /// Returns an error if `DESCRIBE` fails or a new column's type cannot be mapped.
    #[tracing::instrument(level = "debug", skip(self, schema, unique_constraints))]
    pub fn build_alter_table_commands(
        &self,
        schema: &TableSchema,
        schema_name: &str,
        stream: &str,
        table_name: &str,
        database_name: Option<&str>,
        unique_constraints: &[String],
    ) -> Result<Vec<String>> {
        let table = TableReference::new(schema_name, table_name).with_database_name(database_name);
        if !unique_constraints.is_empty() {
            tracing::debug!(
                %table,
                ?unique_constraints,
                "Ignoring unique constraints; Trino does not support them"
            );
        }

        let existing = {
            let conn = self.build_connection()?;
            let conn = as_sync(conn.as_ref())?;
            reconcile::existing_columns(conn, &table).context(UnableToReconcileSchemaSnafu {
                table: table.to_string(),
            })?
        };

        let new_columns = reconcile::new_columns(schema, &existing);
        if new_columns.is_empty() {
            tracing::debug!(%table, "No new columns to add");
            return Ok(Vec::new());
        }
        tracing::debug!(%table, ?new_columns, "Adding new columns");

        let mapping = trino_column_type_mapping(schema)
            .context(UnableToMapColumnTypesSnafu {
                table: table.to_string(),
            })?
            .retain_columns(&new_columns);

        Ok(AlterTableBuilder::new(mapping, &table).build_trino())
    }

    /// One `INSERT INTO ... VALUES` statement covering the whole batch, or none
    /// for an empty batch. Conflict handling is not available in Trino and is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a column type cannot be mapped or a value cannot be converted.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(level = "debug", skip(self, records, schema, unique_constraints), fields(records = records.len()))]
    pub fn build_insert_commands(
        &self,
        records: &[Record],
        schema: &TableSchema,
        schema_name: &str,
        table_name: &str,
        database_name: Option<&str>,
        unique_conflict_method: Option<UniqueConflictMethod>,
        unique_constraints: &[String],
    ) -> Result<Vec<String>> {
        let table = TableReference::new(schema_name, table_name).with_database_name(database_name);

        if let Some(method) = unique_conflict_method {
            tracing::debug!(
                %table,
                %method,
                ?unique_constraints,
                "Ignoring unique conflict method; Trino tables have no unique constraints"
            );
        }

        let mapping = trino_column_type_mapping(schema).context(UnableToMapColumnTypesSnafu {
            table: table.to_string(),
        })?;

        let commands = InsertBuilder::new(mapping, &table, records)
            .build(&TrinoValueConverter)
            .context(UnableToBuildInsertSnafu {
                table: table.to_string(),
            })?;

        if commands.is_empty() {
            return Ok(commands);
        }

        Ok(wrap_insert_commands(&commands))
    }

    /// See [`calculate_records_inserted_and_updated`]; the constraint arguments are ignored.
    #[must_use]
    pub fn calculate_records_inserted_and_updated(
        &self,
        data: &[Vec<Row>],
        _unique_constraints: &[String],
        _unique_conflict_method: Option<UniqueConflictMethod>,
    ) -> InsertStats {
        calculate_records_inserted_and_updated(data)
    }

    /// # Errors
    ///
    /// Returns an error if the `SHOW TABLES` statement fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn does_table_exist(
        &self,
        schema_name: &str,
        table_name: &str,
        database_name: Option<&str>,
    ) -> Result<bool> {
        let table = TableReference::new(schema_name, table_name).with_database_name(database_name);

        let conn = self.build_connection()?;
        let conn = as_sync(conn.as_ref())?;
        reconcile::table_exists(conn, &table).context(UnableToReconcileSchemaSnafu {
            table: table.to_string(),
        })
    }

    /// Runs the statements in order on one session and returns each one's rows.
    ///
    /// Stops at the first failing statement.
    ///
    /// # Errors
    ///
    /// Returns an error if a session cannot be opened or a statement fails.
    #[tracing::instrument(level = "debug", skip_all, fields(commands = commands.len()))]
    pub fn execute_commands(&self, commands: &[String]) -> Result<Vec<Vec<Row>>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.build_connection()?;
        let conn = as_sync(conn.as_ref())?;
        let total = commands.len();

        commands
            .iter()
            .enumerate()
            .map(|(i, sql)| {
                tracing::trace!(sql, "Executing statement");
                conn.load(sql).context(UnableToExecuteCommandSnafu {
                    index: i + 1,
                    total,
                })
            })
            .collect()
    }

    /// Builds and runs `CREATE TABLE IF NOT EXISTS`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be built or fails.
    pub fn create_table(
        &self,
        schema: &TableSchema,
        schema_name: &str,
        stream: &str,
        table_name: &str,
        database_name: Option<&str>,
        unique_constraints: &[String],
    ) -> Result<()> {
        let commands = self.build_create_table_commands(
            schema,
            schema_name,
            stream,
            table_name,
            database_name,
            unique_constraints,
        )?;
        self.execute_commands(&commands)?;
        Ok(())
    }

    /// Builds and runs the `ALTER TABLE` for missing columns, returning how many
    /// statements were executed.
    ///
    /// # Errors
    ///
    /// Returns an error if the live table cannot be described or the command fails.
    pub fn alter_table(
        &self,
        schema: &TableSchema,
        schema_name: &str,
        stream: &str,
        table_name: &str,
        database_name: Option<&str>,
        unique_constraints: &[String],
    ) -> Result<usize> {
        let commands = self.build_alter_table_commands(
            schema,
            schema_name,
            stream,
            table_name,
            database_name,
            unique_constraints,
        )?;
        self.execute_commands(&commands)?;
        Ok(commands.len())
    }

    /// Builds and runs the insert for one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert cannot be built or fails.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_records(
        &self,
        records: &[Record],
        schema: &TableSchema,
        schema_name: &str,
        table_name: &str,
        database_name: Option<&str>,
        unique_conflict_method: Option<UniqueConflictMethod>,
        unique_constraints: &[String],
    ) -> Result<InsertStats> {
        let commands = self.build_insert_commands(
            records,
            schema,
            schema_name,
            table_name,
            database_name,
            unique_conflict_method,
            unique_constraints,
        )?;
        let data = self.execute_commands(&commands)?;

        let stats = self.calculate_records_inserted_and_updated(
            &data,
            unique_constraints,
            unique_conflict_method,
        );
        tracing::debug!(
            table = %TableReference::new(schema_name, table_name),
            records_inserted = stats.records_inserted,
            "Inserted records"
        );
        Ok(stats)
    }
}

fn as_sync(conn: &dyn DbConnection) -> Result<&dyn SyncDbConnection> {
    conn.as_sync().context(UnableToDowncastConnectionSnafu)
}
