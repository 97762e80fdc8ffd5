use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt::Display;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Expected IGNORE or UPDATE, found: {token}"))]
    UnexpectedToken { token: String },
}

/// What a destination should do when an incoming record collides with an
/// existing row on its unique constraints.
///
/// Trino tables carry no unique constraints, so the Trino connector accepts
/// the setting and always appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UniqueConflictMethod {
    Ignore,
    Update,
}

impl Display for UniqueConflictMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueConflictMethod::Ignore => write!(f, "IGNORE"),
            UniqueConflictMethod::Update => write!(f, "UPDATE"),
        }
    }
}

impl TryFrom<&str> for UniqueConflictMethod {
    type Error = Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_uppercase().as_str() {
            "IGNORE" => Ok(UniqueConflictMethod::Ignore),
            "UPDATE" => Ok(UniqueConflictMethod::Update),
            _ => UnexpectedTokenSnafu {
                token: value.to_string(),
            }
            .fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("UPDATE", UniqueConflictMethod::Update)]
    #[case("update", UniqueConflictMethod::Update)]
    #[case(" IGNORE ", UniqueConflictMethod::Ignore)]
    fn test_parse(#[case] value: &str, #[case] expected: UniqueConflictMethod) {
        assert_eq!(
            UniqueConflictMethod::try_from(value).expect("method should parse"),
            expected
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = UniqueConflictMethod::try_from("merge").expect_err("merge is not a method");
        assert_eq!(err.to_string(), "Expected IGNORE or UPDATE, found: merge");
    }

    #[test]
    fn test_serde_and_display_agree() {
        let method: UniqueConflictMethod =
            serde_json::from_str("\"UPDATE\"").expect("method should deserialize");
        assert_eq!(method, UniqueConflictMethod::Update);
        assert_eq!(
            serde_json::to_string(&method).expect("method should serialize"),
            format!("\"{method}\"")
        );
    }
}
