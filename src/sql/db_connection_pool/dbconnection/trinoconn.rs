use super::DbConnection;
use super::Row;
use super::SyncDbConnection;
use reqwest::blocking::Client;
use serde_json::Value;
use snafu::prelude::*;
use std::any::Any;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Query execution failed.\n{source}\nFor details, refer to the Trino documentation: https://trino.io/docs/"))]
    QueryError { source: reqwest::Error },

    #[snafu(display("Authentication failed."))]
    AuthenticationFailedError,

    #[snafu(display("Trino server error: {status_code} - {message}"))]
    TrinoServerError { status_code: u16, message: String },

    #[snafu(display("Trino query failed: {message}"))]
    QueryFailedError {
        message: String,
        error_name: Option<String>,
    },
}

pub const DEFAULT_POLL_WAIT_TIME_MS: u64 = 50;

/// A session against the Trino REST protocol.
///
/// Every call to [`SyncDbConnection::load`] submits one statement and follows
/// `nextUri` until the query reaches a terminal state.
pub struct TrinoConnection {
    client: Arc<Client>,
    base_url: String,
    poll_wait_time: Duration,
}

impl DbConnection for TrinoConnection {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_sync(&self) -> Option<&dyn SyncDbConnection> {
        Some(self)
    }
}

impl SyncDbConnection for TrinoConnection {
    fn load(&self, sql: &str) -> Result<Vec<Row>, super::Error> {
        self.execute_query(sql)
            .map_err(|e| super::Error::UnableToLoad {
                source: Box::new(e),
            })
    }
}

impl TrinoConnection {
    #[must_use]
    pub fn new_with_config(client: Arc<Client>, base_url: String, poll_wait_time: Duration) -> Self {
        TrinoConnection {
            client,
            base_url,
            poll_wait_time,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn execute_query(&self, sql: &str) -> Result<Vec<Row>, Error> {
        let url = format!("{}/v1/statement", self.base_url);

        tracing::trace!(sql, "Submitting statement to Trino");
        let response = self
            .client
            .post(&url)
            .body(sql.to_string())
            .send()
            .context(QuerySnafu)?;
        let mut result = Self::read_response(response)?;

        let mut rows = Vec::new();

        loop {
            let state = result["stats"]["state"].as_str().unwrap_or("");

            if state == "FAILED" || result.get("error").is_some_and(|e| !e.is_null()) {
                let error = &result["error"];
                return Err(Error::QueryFailedError {
                    message: error["message"]
                        .as_str()
                        .unwrap_or("Query failed")
                        .to_string(),
                    error_name: error["errorName"].as_str().map(ToString::to_string),
                });
            } else if state == "CANCELED" {
                return Err(Error::TrinoServerError {
                    status_code: 499,
                    message: "Query was canceled".to_string(),
                });
            }

            if let Some(data) = result.get("data").and_then(|d| d.as_array()) {
                rows.extend(data.iter().filter_map(|row| row.as_array().cloned()));
            }

            match result.get("nextUri").and_then(|u| u.as_str()) {
                Some(next_uri) => {
                    sleep(self.poll_wait_time);

                    let response = self.client.get(next_uri).send().context(QuerySnafu)?;
                    result = Self::read_response(response)?;
                }
                None => {
                    if state != "FINISHED" && !state.is_empty() {
                        return Err(Error::TrinoServerError {
                            status_code: 500,
                            message: format!("Query stuck in state: {state}"),
                        });
                    }
                    break;
                }
            }
        }

        tracing::trace!(rows = rows.len(), "Trino statement finished");
        Ok(rows)
    }

    fn read_response(response: reqwest::blocking::Response) -> Result<Value, Error> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::AuthenticationFailedError);
        }

        if !status.is_success() {
            return Err(Error::TrinoServerError {
                status_code: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        response.json().context(QuerySnafu)
    }
}
