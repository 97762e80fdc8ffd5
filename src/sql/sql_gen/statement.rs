use crate::sql::sql_gen::column_type::{ColumnTypeMapping, MappedColumn};
use crate::util::identifier::quote_identifier;
use crate::util::schema::{ColumnType, Record};
use itertools::Itertools;
use serde_json::Value;
use snafu::prelude::*;
use std::fmt::Display;

pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Failed to convert the value of column '{column}': {source}"))]
    FailedToConvertValue { column: String, source: GenericError },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Qualifies every generated statement.
///
/// The database name is accepted so that all destinations share one call shape,
/// but only `schema.table` is ever rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableReference {
    schema_name: String,
    table_name: String,
    database_name: Option<String>,
}

impl TableReference {
    #[must_use]
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            database_name: None,
        }
    }

    #[must_use]
    pub fn with_database_name(mut self, database_name: Option<impl Into<String>>) -> Self {
        self.database_name = database_name.map(Into::into);
        self
    }

    #[must_use]
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }
}

impl Display for TableReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}",
            quote_identifier(&self.schema_name),
            quote_identifier(&self.table_name)
        )
    }
}

pub struct CreateTableBuilder {
    mapping: ColumnTypeMapping,
    table: TableReference,
    unique_constraints: Vec<String>,
}

impl CreateTableBuilder {
    #[must_use]
    pub fn new(mapping: ColumnTypeMapping, table: &TableReference) -> Self {
        Self {
            mapping,
            table: table.clone(),
            unique_constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn unique_constraints<T>(mut self, columns: Vec<T>) -> Self
    where
        T: Into<String>,
    {
        self.unique_constraints = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Trino has no unique constraints, so any configured ones are dropped.
    ///
    /// <https://trino.io/docs/current/sql/create-table.html>
    #[must_use]
    pub fn build_trino(self) -> Vec<String> {
        if !self.unique_constraints.is_empty() {
            tracing::debug!(
                table = %self.table,
                "Ignoring unique constraints {:?}; Trino does not support them",
                self.unique_constraints
            );
        }

        vec![self.build()]
    }

    /// Column definitions only; the table never carries a constraint clause.
    #[must_use]
    pub fn build(&self) -> String {
        let definitions = self
            .mapping
            .columns()
            .iter()
            .map(|c| format!("{} {}", c.identifier(), c.type_converted))
            .join(", ");

        format!("CREATE TABLE IF NOT EXISTS {} ({definitions})", self.table)
    }
}

pub struct AlterTableBuilder {
    new_columns: ColumnTypeMapping,
    table: TableReference,
}

impl AlterTableBuilder {
    /// `new_columns` holds only the columns missing from the live table.
    #[must_use]
    pub fn new(new_columns: ColumnTypeMapping, table: &TableReference) -> Self {
        Self {
            new_columns,
            table: table.clone(),
        }
    }

    #[must_use]
    pub fn build_trino(self) -> Vec<String> {
        self.build().into_iter().collect()
    }

    /// Additive only: existing columns are never altered, even if their type changed upstream.
    #[must_use]
    pub fn build(&self) -> Option<String> {
        if self.new_columns.is_empty() {
            return None;
        }

        let additions = self
            .new_columns
            .columns()
            .iter()
            .map(|c| format!("ADD COLUMN {} {}", c.identifier(), c.type_converted))
            .join(", ");

        Some(format!("ALTER TABLE {} {additions}", self.table))
    }
}

/// How a column's values are rendered, decided by the column's mapped type
/// rather than by whatever shape the incoming value happens to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Array,
    JsonOrString,
}

impl Conversion {
    #[must_use]
    pub fn for_column(column: &MappedColumn) -> Self {
        match column.column_type {
            ColumnType::Array => Conversion::Array,
            _ => Conversion::JsonOrString,
        }
    }
}

/// Dialect-specific rendering of record values into SQL literals.
pub trait ValueConverter {
    fn convert_array(
        &self,
        values: &[Value],
        column: &MappedColumn,
    ) -> std::result::Result<String, GenericError>;

    fn string_parse(
        &self,
        value: &Value,
        column: &MappedColumn,
    ) -> std::result::Result<String, GenericError>;
}

pub struct InsertBuilder<'a> {
    mapping: ColumnTypeMapping,
    table: TableReference,
    records: &'a [Record],
}

impl<'a> InsertBuilder<'a> {
    #[must_use]
    pub fn new(mapping: ColumnTypeMapping, table: &TableReference, records: &'a [Record]) -> Self {
        Self {
            mapping,
            table: table.clone(),
            records,
        }
    }

    #[must_use]
    pub fn table(&self) -> &TableReference {
        &self.table
    }

    /// Sanitized column names and one `(v1, v2, ...)` tuple per record.
    ///
    /// # Errors
    ///
    /// Returns an error if any value fails to convert.
    pub fn build_columns_and_values(
        &self,
        converter: &dyn ValueConverter,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let columns = self
            .mapping
            .columns()
            .iter()
            .map(|c| c.identifier().to_string())
            .collect();

        let values = self
            .records
            .iter()
            .map(|record| {
                let row = self
                    .mapping
                    .columns()
                    .iter()
                    .map(|column| {
                        convert_value(record.get(column.name()), column, converter)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", row.join(", ")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((columns, values))
    }

    /// The `INSERT INTO` line followed by one `VALUES` line, or nothing for an empty batch.
    ///
    /// # Errors
    ///
    /// Returns an error if any value fails to convert.
    pub fn build(&self, converter: &dyn ValueConverter) -> Result<Vec<String>> {
        if self.records.is_empty() || self.mapping.is_empty() {
            return Ok(Vec::new());
        }

        let (columns, values) = self.build_columns_and_values(converter)?;

        Ok(vec![
            format!("INSERT INTO {} ({})", self.table, columns.join(", ")),
            format!("VALUES {}", values.join(", ")),
        ])
    }
}

fn convert_value(
    value: Option<&Value>,
    column: &MappedColumn,
    converter: &dyn ValueConverter,
) -> Result<String> {
    let literal = match (Conversion::for_column(column), value) {
        (_, None | Some(Value::Null)) => Ok("NULL".to_string()),
        (Conversion::Array, Some(Value::Array(values))) => converter.convert_array(values, column),
        (_, Some(value)) => converter.string_parse(value, column),
    };

    literal.context(FailedToConvertValueSnafu {
        column: column.name(),
    })
}
