use mockito::{Matcher, Mock, Server, ServerGuard};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use trino_destination::util::schema::{Record, TableSchema};
use trino_destination::TrinoConnector;

/// A mocked coordinator that answers `/v1/info` and whatever statements a test registers.
pub(super) struct MockCoordinator {
    pub server: ServerGuard,
    info: Mock,
    query_id: usize,
}

impl MockCoordinator {
    pub fn start() -> Self {
        let mut server = Server::new();
        let info = server
            .mock("GET", "/v1/info")
            .match_header("X-Trino-Catalog", "memory")
            .match_header("X-Trino-Schema", "analytics")
            .match_header("X-Trino-User", "pipeline")
            .with_status(200)
            .with_body(r#"{"nodeVersion":{"version":"455"},"starting":false}"#)
            .create();

        Self {
            server,
            info,
            query_id: 0,
        }
    }

    pub fn params(&self) -> HashMap<String, SecretString> {
        let address = self.server.socket_address();
        HashMap::from([
            ("trino_host".to_string(), SecretString::from(address.ip().to_string())),
            ("trino_port".to_string(), SecretString::from(address.port().to_string())),
            ("trino_catalog".to_string(), SecretString::from("memory".to_string())),
            ("trino_schema".to_string(), SecretString::from("analytics".to_string())),
            ("trino_username".to_string(), SecretString::from("pipeline".to_string())),
            ("trino_sslmode".to_string(), SecretString::from("disabled".to_string())),
            ("trino_poll_wait_time_ms".to_string(), SecretString::from("0".to_string())),
        ])
    }

    pub fn connector(&self) -> TrinoConnector {
        let connector =
            TrinoConnector::from_params(self.params()).expect("connector should be created");
        self.info.assert();
        connector
    }

    /// Answers a statement with `rows`, delivered on a second page after one `nextUri` hop.
    pub fn expect_statement(&mut self, sql: &str, rows: Value) -> (Mock, Mock) {
        self.query_id += 1;
        let next_path = format!("/v1/statement/executing/q{}/1", self.query_id);

        let submit = self
            .server
            .mock("POST", "/v1/statement")
            .match_body(Matcher::Exact(sql.to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "id": format!("q{}", self.query_id),
                    "nextUri": format!("{}{next_path}", self.server.url()),
                    "stats": {"state": "QUEUED"},
                })
                .to_string(),
            )
            .expect(1)
            .create();

        let poll = self
            .server
            .mock("GET", next_path.as_str())
            .with_status(200)
            .with_body(
                json!({
                    "id": format!("q{}", self.query_id),
                    "data": rows,
                    "stats": {"state": "FINISHED"},
                })
                .to_string(),
            )
            .expect(1)
            .create();

        (submit, poll)
    }

    /// Fails a statement the way Trino reports analysis errors.
    pub fn fail_statement(&mut self, sql: &str, message: &str) -> Mock {
        self.query_id += 1;
        self.server
            .mock("POST", "/v1/statement")
            .match_body(Matcher::Exact(sql.to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "id": format!("q{}", self.query_id),
                    "stats": {"state": "FAILED"},
                    "error": {"message": message, "errorName": "TABLE_NOT_FOUND"},
                })
                .to_string(),
            )
            .create()
    }
}

pub(super) fn events_schema() -> TableSchema {
    TableSchema::from_json(&json!({
        "properties": {
            "id": {"type": "integer"},
            "Event Name": {"type": ["null", "string"]},
            "amount": {"type": ["number", "null"]},
            "is_test": {"type": "boolean"},
            "payload": {"type": "object"},
            "tags": {"type": "array", "items": {"type": "string"}},
            "created_at": {"type": "string", "format": "date-time"},
        }
    }))
    .expect("schema should parse")
}

pub(super) fn records(values: Value) -> Vec<Record> {
    values
        .as_array()
        .expect("records should be an array")
        .iter()
        .map(|r| r.as_object().cloned().expect("record should be an object"))
        .collect()
}
