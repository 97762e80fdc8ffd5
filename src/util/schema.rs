use serde_json::{Map, Value};
use snafu::prelude::*;
use std::fmt::Display;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("The stream schema has no 'properties' object."))]
    MissingProperties,

    #[snafu(display("Column '{column}' has no 'type' in its schema."))]
    MissingColumnType { column: String },

    #[snafu(display("Column '{column}' has an invalid 'type' entry: {value}"))]
    InvalidColumnType { column: String, value: String },

    #[snafu(display("Column '{column}' has an unsupported type: {column_type}"))]
    UnsupportedColumnType { column: String, column_type: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Abstract column type tags, as found in a JSON-Schema `type` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl ColumnType {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "array" => Some(ColumnType::Array),
            "boolean" => Some(ColumnType::Boolean),
            "integer" => Some(ColumnType::Integer),
            "null" => Some(ColumnType::Null),
            "number" => Some(ColumnType::Number),
            "object" => Some(ColumnType::Object),
            "string" => Some(ColumnType::String),
            _ => None,
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            ColumnType::Array => "array",
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Null => "null",
            ColumnType::Number => "number",
            ColumnType::Object => "object",
            ColumnType::String => "string",
        };
        write!(f, "{tag}")
    }
}

/// One incoming row, keyed by the unsanitized column name.
pub type Record = Map<String, Value>;

pub const COLUMN_FORMAT_DATETIME: &str = "date-time";

/// One entry of the desired table schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub types: Vec<ColumnType>,
    pub format: Option<String>,
    pub items: Option<Box<ColumnSchema>>,
}

impl ColumnSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            types: vec![column_type],
            format: None,
            items: None,
        }
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        if !self.types.contains(&ColumnType::Null) {
            self.types.insert(0, ColumnType::Null);
        }
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: ColumnSchema) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// The first non-null type tag, which decides how the column is mapped.
    #[must_use]
    pub fn column_type(&self) -> Option<ColumnType> {
        self.types.iter().copied().find(|t| *t != ColumnType::Null)
    }

    #[must_use]
    pub fn is_datetime(&self) -> bool {
        self.format.as_deref() == Some(COLUMN_FORMAT_DATETIME)
    }

    fn from_json(name: &str, settings: &Value) -> Result<Self> {
        let types = match settings.get("type") {
            None => return MissingColumnTypeSnafu { column: name }.fail(),
            Some(Value::String(tag)) => vec![parse_tag(name, tag)?],
            Some(Value::Array(tags)) => tags
                .iter()
                .map(|tag| match tag {
                    Value::String(tag) => parse_tag(name, tag),
                    other => InvalidColumnTypeSnafu {
                        column: name,
                        value: other.to_string(),
                    }
                    .fail(),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return InvalidColumnTypeSnafu {
                    column: name,
                    value: other.to_string(),
                }
                .fail()
            }
        };

        let format = settings
            .get("format")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        // Item schemas are optional and may omit their own type.
        let items = match settings.get("items") {
            Some(items) if items.get("type").is_some() => {
                Some(Box::new(ColumnSchema::from_json(name, items)?))
            }
            _ => None,
        };

        Ok(Self {
            name: name.to_string(),
            types,
            format,
            items,
        })
    }
}

fn parse_tag(column: &str, tag: &str) -> Result<ColumnType> {
    ColumnType::parse(tag).context(UnsupportedColumnTypeSnafu {
        column,
        column_type: tag,
    })
}

/// Ordered collection of columns; order decides the generated column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    #[must_use]
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        let mut schema = Self::default();
        for column in columns {
            schema.push(column);
        }
        schema
    }

    /// Adds a column, replacing any earlier column with the same name in place.
    pub fn push(&mut self, column: ColumnSchema) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Parses a JSON-Schema object of the form `{"properties": {...}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if `properties` is missing, or a column has a missing or unknown type.
    pub fn from_json(schema: &Value) -> Result<Self> {
        let properties: &Map<String, Value> = schema
            .get("properties")
            .and_then(Value::as_object)
            .context(MissingPropertiesSnafu)?;

        let columns = properties
            .iter()
            .map(|(name, settings)| ColumnSchema::from_json(name, settings))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }
}
