use snafu::Snafu;

pub mod schema;
pub mod value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Failed to encode value as JSON: {source}"))]
    FailedToEncodeJson { source: serde_json::Error },

    #[snafu(display("Failed to map column types: {source}"))]
    FailedToMapColumnTypes {
        source: crate::sql::sql_gen::column_type::Error,
    },
}

/// Joins the `INSERT INTO` and `VALUES` lines into the single statement Trino executes.
///
/// A batch is never split, so the result always has exactly one element.
#[must_use]
pub fn wrap_insert_commands(commands: &[String]) -> Vec<String> {
    vec![commands.join("\n")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_insert_commands() {
        let commands = vec![
            "INSERT INTO s.t (id)".to_string(),
            "VALUES (1), (2)".to_string(),
        ];
        assert_eq!(
            wrap_insert_commands(&commands),
            vec!["INSERT INTO s.t (id)\nVALUES (1), (2)".to_string()]
        );
    }
}
