use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W").expect("non-word pattern is a valid regex"));

/// Reserved keywords that must be double-quoted when used as identifiers.
///
/// <https://trino.io/docs/current/language/reserved.html>
const TRINO_RESERVED_KEYWORDS: &[&str] = &[
    "alter",
    "and",
    "as",
    "between",
    "by",
    "case",
    "cast",
    "constraint",
    "create",
    "cross",
    "cube",
    "current_catalog",
    "current_date",
    "current_path",
    "current_role",
    "current_schema",
    "current_time",
    "current_timestamp",
    "current_user",
    "deallocate",
    "delete",
    "describe",
    "distinct",
    "drop",
    "else",
    "end",
    "escape",
    "except",
    "execute",
    "exists",
    "extract",
    "false",
    "for",
    "from",
    "full",
    "group",
    "grouping",
    "having",
    "in",
    "inner",
    "insert",
    "intersect",
    "into",
    "is",
    "join",
    "json_array",
    "json_exists",
    "json_object",
    "json_query",
    "json_table",
    "json_value",
    "left",
    "like",
    "listagg",
    "localtime",
    "localtimestamp",
    "natural",
    "normalize",
    "not",
    "null",
    "on",
    "or",
    "order",
    "outer",
    "prepare",
    "recursive",
    "right",
    "rollup",
    "select",
    "skip",
    "table",
    "then",
    "trim",
    "true",
    "uescape",
    "union",
    "unnest",
    "using",
    "values",
    "when",
    "where",
    "with",
];

#[must_use]
pub fn is_reserved_keyword(name: &str) -> bool {
    TRINO_RESERVED_KEYWORDS.contains(&name.to_lowercase().as_str())
}

/// A column name after sanitization.
///
/// `name()` is the bare, case-folded form that Trino reports back from `DESCRIBE`;
/// `Display` renders the form that is safe to embed in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnIdentifier {
    name: String,
}

impl ColumnIdentifier {
    #[must_use]
    pub fn new(column: &str) -> Self {
        Self {
            name: clean_column_name(column),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for ColumnIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", quote_identifier(&self.name))
    }
}

/// Lower-cases the name, replaces every non-word character with `_` and
/// prefixes names starting with a digit.
///
/// Distinct names can clean to the same identifier (`"a b"` and `"A_B"`);
/// `column_type_mapping` rejects such schemas.
#[must_use]
pub fn clean_column_name(column: &str) -> String {
    let cleaned = NON_WORD.replace_all(&column.to_lowercase(), "_").into_owned();

    if cleaned.is_empty() {
        return "_".to_string();
    }

    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

/// Double-quotes the name if it is a reserved keyword or is not a plain
/// identifier, leaving it untouched otherwise.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if plain && !is_reserved_keyword(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
