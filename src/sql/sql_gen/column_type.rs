use crate::util::identifier::ColumnIdentifier;
use crate::util::schema::{ColumnSchema, ColumnType, TableSchema};
use snafu::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Column '{column}' has no mappable type; only 'null' was declared."))]
    NoMappableType { column: String },

    #[snafu(display(
        "Columns '{first}' and '{second}' both sanitize to '{identifier}'. Rename one of them in the source schema."
    ))]
    DuplicateColumnIdentifier {
        first: String,
        second: String,
        identifier: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Dialect hook invoked for array columns with the already converted item type, if any.
pub type ArrayTypeOverride<'a> = &'a dyn Fn(Option<&str>) -> String;

/// Target types for the scalar tags that every SQL dialect shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarTypes {
    pub boolean: &'static str,
    pub integer: &'static str,
    pub number: &'static str,
    pub string: &'static str,
    pub datetime: &'static str,
    pub object: &'static str,
}

impl Default for ScalarTypes {
    fn default() -> Self {
        Self {
            boolean: "BOOLEAN",
            integer: "BIGINT",
            number: "DOUBLE PRECISION",
            string: "TEXT",
            datetime: "TIMESTAMP",
            object: "TEXT",
        }
    }
}

/// A schema column together with the dialect type it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedColumn {
    pub column: ColumnSchema,
    pub column_type: ColumnType,
    pub item_type: Option<ColumnType>,
    pub type_converted: String,
}

impl MappedColumn {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.column.name
    }

    #[must_use]
    pub fn identifier(&self) -> ColumnIdentifier {
        ColumnIdentifier::new(&self.column.name)
    }
}

/// Column types for a whole schema, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTypeMapping {
    columns: Vec<MappedColumn>,
}

impl ColumnTypeMapping {
    #[must_use]
    pub fn columns(&self) -> &[MappedColumn] {
        &self.columns
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MappedColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Keeps only the named columns, in this mapping's order.
    #[must_use]
    pub fn retain_columns(&self, names: &[&str]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| names.contains(&c.name()))
                .cloned()
                .collect(),
        }
    }
}

/// Maps a single column through the shared rule table.
///
/// # Errors
///
/// Returns an error if the column declares no type besides `null`.
pub fn map_column_type(
    column: &ColumnSchema,
    scalar_types: &ScalarTypes,
    array_type_override: ArrayTypeOverride,
) -> Result<MappedColumn> {
    let column_type = column.column_type().context(NoMappableTypeSnafu {
        column: column.name.clone(),
    })?;

    let item_type = column.items.as_deref().and_then(ColumnSchema::column_type);

    let type_converted = match column_type {
        ColumnType::Array => {
            let item_type_converted = match column.items.as_deref() {
                Some(items) if item_type.is_some() => {
                    Some(map_column_type(items, scalar_types, array_type_override)?.type_converted)
                }
                _ => None,
            };
            array_type_override(item_type_converted.as_deref())
        }
        ColumnType::Boolean => scalar_types.boolean.to_string(),
        ColumnType::Integer => scalar_types.integer.to_string(),
        ColumnType::Number => scalar_types.number.to_string(),
        ColumnType::Object => scalar_types.object.to_string(),
        ColumnType::String if column.is_datetime() => scalar_types.datetime.to_string(),
        ColumnType::String => scalar_types.string.to_string(),
        ColumnType::Null => {
            return NoMappableTypeSnafu {
                column: column.name.clone(),
            }
            .fail()
        }
    };

    Ok(MappedColumn {
        column: column.clone(),
        column_type,
        item_type,
        type_converted,
    })
}

/// Maps every column of the schema.
///
/// # Errors
///
/// Returns an error on the first column that cannot be mapped, or when two
/// columns sanitize to the same identifier.
pub fn column_type_mapping(
    schema: &TableSchema,
    scalar_types: &ScalarTypes,
    array_type_override: ArrayTypeOverride,
) -> Result<ColumnTypeMapping> {
    let columns = schema
        .columns()
        .iter()
        .map(|column| map_column_type(column, scalar_types, array_type_override))
        .collect::<Result<Vec<_>>>()?;

    let mut seen: HashMap<String, &str> = HashMap::new();
    for column in &columns {
        let identifier = column.identifier().name().to_string();
        if let Some(first) = seen.insert(identifier.clone(), column.name()) {
            return DuplicateColumnIdentifierSnafu {
                first,
                second: column.name(),
                identifier,
            }
            .fail();
        }
    }

    Ok(ColumnTypeMapping { columns })
}
