use super::{FailedToMapColumnTypesSnafu, Result};
use crate::sql::sql_gen::column_type::{self, ColumnTypeMapping, MappedColumn, ScalarTypes};
use crate::util::schema::{ColumnSchema, TableSchema};
use snafu::ResultExt;

pub const TRINO_JSON_TYPE: &str = "JSON";

pub const TRINO_SCALAR_TYPES: ScalarTypes = ScalarTypes {
    boolean: "BOOLEAN",
    integer: "BIGINT",
    number: "DOUBLE",
    string: "VARCHAR",
    datetime: "TIMESTAMP",
    object: TRINO_JSON_TYPE,
};

/// Arrays of any depth or item type are stored as semi-structured JSON.
#[must_use]
pub fn trino_array_type(_item_type_converted: Option<&str>) -> String {
    TRINO_JSON_TYPE.to_string()
}

#[must_use]
pub fn is_json_type(type_converted: &str) -> bool {
    type_converted.eq_ignore_ascii_case(TRINO_JSON_TYPE)
}

pub fn map_trino_column_type(column: &ColumnSchema) -> Result<MappedColumn> {
    column_type::map_column_type(column, &TRINO_SCALAR_TYPES, &trino_array_type)
        .context(FailedToMapColumnTypesSnafu)
}

pub fn trino_column_type_mapping(schema: &TableSchema) -> Result<ColumnTypeMapping> {
    column_type::column_type_mapping(schema, &TRINO_SCALAR_TYPES, &trino_array_type)
        .context(FailedToMapColumnTypesSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::schema::ColumnType;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({"type": "boolean"}), "BOOLEAN")]
    #[case(json!({"type": ["null", "integer"]}), "BIGINT")]
    #[case(json!({"type": "number"}), "DOUBLE")]
    #[case(json!({"type": "string"}), "VARCHAR")]
    #[case(json!({"type": ["string", "null"], "format": "date-time"}), "TIMESTAMP")]
    #[case(json!({"type": "string", "format": "date"}), "VARCHAR")]
    #[case(json!({"type": "object"}), "JSON")]
    #[case(json!({"type": "array", "items": {"type": "string"}}), "JSON")]
    #[case(json!({"type": "array", "items": {"type": "object"}}), "JSON")]
    #[case(json!({"type": "array", "items": {"type": "array", "items": {"type": "array", "items": {"type": "integer"}}}}), "JSON")]
    #[case(json!({"type": "array"}), "JSON")]
    fn test_trino_column_types(#[case] settings: serde_json::Value, #[case] expected: &str) {
        let schema = TableSchema::from_json(&json!({"properties": {"column": settings}}))
            .expect("schema should parse");

        let mapping = trino_column_type_mapping(&schema).expect("mapping should succeed");
        assert_eq!(mapping.columns()[0].type_converted, expected);
    }

    #[test]
    fn test_null_only_column_is_rejected() {
        let column = ColumnSchema::new("nothing", ColumnType::Null);
        let result = map_trino_column_type(&column);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Column 'nothing' has no mappable type"));
    }

    #[test]
    fn test_is_json_type() {
        assert!(is_json_type("JSON"));
        assert!(is_json_type("json"));
        assert!(!is_json_type("VARCHAR"));
    }
}
