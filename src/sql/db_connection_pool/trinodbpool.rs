use super::DbConnectionPool;
use crate::sql::db_connection_pool::dbconnection::trinoconn::{
    TrinoConnection, DEFAULT_POLL_WAIT_TIME_MS,
};
use crate::sql::db_connection_pool::dbconnection::DbConnection;
use crate::util;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, Identity};
use secrecy::{ExposeSecret, SecretString};
use snafu::{ResultExt, Snafu};
use std::{collections::HashMap, fs, sync::Arc, time::Duration};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Trino connection failed.\n{source}\nFor details, refer to the Trino documentation: https://trino.io/docs/"))]
    TrinoConnectionError { source: reqwest::Error },

    #[snafu(display("Could not parse {parameter_name} into a valid integer. Ensure it is configured with a valid value."))]
    InvalidIntegerParameterError {
        parameter_name: String,
        source: std::num::ParseIntError,
    },

    #[snafu(display("Authentication failed."))]
    AuthenticationFailedError,

    #[snafu(display(
        "Invalid sslmode: {value}. Expected values are: required, preferred, disabled"
    ))]
    InvalidSSLModeParameter { value: String },

    #[snafu(display("Missing required parameter: {parameter_name}"))]
    MissingRequiredParameter { parameter_name: String },

    #[snafu(display("Failed to build HTTP client: {source}"))]
    FailedToBuildTrinoHttpClient { source: reqwest::Error },

    #[snafu(display("Trino server error: {status_code} - {message}"))]
    TrinoServerError { status_code: u16, message: String },

    #[snafu(display("Invalid Trino authentication configuration: {details}"))]
    InvalidAuthConfig { details: String },

    #[snafu(display("Parameter {parameter_name} cannot be sent as an HTTP header: {source}"))]
    InvalidHeaderValue {
        parameter_name: String,
        source: reqwest::header::InvalidHeaderValue,
    },

    #[snafu(display("Failed to read identity PEM file at '{path}': {source}"))]
    UnableToReadIdentityPem {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Invalid identity PEM at '{path}': {source}"))]
    InvalidIdentityPem {
        path: String,
        source: reqwest::Error,
    },

    #[snafu(display("Failed to read root cert file at '{path}': {source}"))]
    UnableToReadRootCert {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Invalid root cert at '{path}': {source}"))]
    InvalidRootCert {
        path: String,
        source: reqwest::Error,
    },
}

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SCHEMA: &str = "default";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SSL_MODE: &str = "required";

/// Factory for [`TrinoConnection`] sessions.
///
/// Holds one configured HTTP client; every call to `connect` hands out a new
/// session sharing it. Nothing is pooled.
#[derive(Clone)]
pub struct TrinoConnectionPool {
    base_url: String,
    catalog: String,
    schema: String,
    client: Arc<Client>,
    poll_wait_time: Duration,
}

impl std::fmt::Debug for TrinoConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrinoConnectionPool")
            .field("base_url", &self.base_url)
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("poll_wait_time", &self.poll_wait_time)
            .finish_non_exhaustive()
    }
}

impl TrinoConnectionPool {
    /// Creates a new instance of `TrinoConnectionPool` and verifies the
    /// coordinator answers on `/v1/info`.
    ///
    /// # Arguments
    ///
    /// * `params` - Connection settings. A `trino_` prefix on any key is ignored.
    ///   * `host` - The Trino coordinator host (required)
    ///   * `port` - The Trino coordinator port (optional, defaults to 8080)
    ///   * `catalog` - The catalog new tables are written to (required)
    ///   * `schema` - The session default schema (optional, defaults to "default")
    ///   * `user` / `username` - The user to authenticate with (required)
    ///   * `password` - Password for basic authentication (optional)
    ///   * `bearer_token` - Bearer token for authentication (optional)
    ///   * `identity_pem_path` - PEM file holding a client certificate and key for mTLS (optional)
    ///   * `sslmode` - 'disabled', 'required' or 'preferred'. Defaults to 'required'. 'preferred' allows invalid certificates/hostnames.
    ///   * `sslrootcert` - Path to an extra root certificate (optional)
    ///   * `timeout_ms` - Request timeout in ms (optional, defaults to 30000)
    ///   * `poll_wait_time_ms` - Waiting time in ms between polling trino results (optional, defaults to 50)
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is missing or invalid, or the coordinator
    /// cannot be reached.
    pub fn new(params: HashMap<String, SecretString>) -> Result<Self> {
        let params = util::remove_prefix_from_hashmap_keys(params, "trino_");

        let (catalog, schema) = get_catalog_and_schema(&params)?;
        let (user, password) = get_user_and_password(&params);
        let bearer_token = params.get("bearer_token").cloned();

        validate_auth(&params, user.as_deref(), password.as_ref())?;

        let headers = build_headers(
            &catalog,
            &schema,
            user.as_deref(),
            password.as_ref(),
            bearer_token.as_ref(),
        )?;

        let timeout_ms = parse_u64_param(&params, "timeout_ms", DEFAULT_TIMEOUT_MS)?;
        let poll_wait_time =
            parse_u64_param(&params, "poll_wait_time_ms", DEFAULT_POLL_WAIT_TIME_MS)?;

        let client_builder = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(timeout_ms));

        let (client_builder, protocol) = configure_tls(client_builder, &params)?;
        let client_builder = configure_identity(client_builder, &params)?;

        let base_url = build_base_url(protocol, &params)?;

        let client = client_builder
            .build()
            .context(FailedToBuildTrinoHttpClientSnafu)?;

        Self::test_connection(&client, &base_url)?;
        tracing::debug!(%base_url, %catalog, %schema, "Connected to Trino coordinator");

        Ok(Self {
            base_url,
            catalog,
            schema,
            client: Arc::new(client),
            poll_wait_time: Duration::from_millis(poll_wait_time),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn test_connection(client: &Client, base_url: &str) -> Result<()> {
        let url = format!("{base_url}/v1/info");

        let response = client.get(&url).send().context(TrinoConnectionSnafu)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::AuthenticationFailedError);
        }

        if !response.status().is_success() {
            return Err(Error::TrinoServerError {
                status_code: response.status().as_u16(),
                message: format!("Connection test failed with HTTP {}", response.status()),
            });
        }

        Ok(())
    }
}

impl DbConnectionPool for TrinoConnectionPool {
    fn connect(&self) -> super::Result<Box<dyn DbConnection>> {
        Ok(Box::new(TrinoConnection::new_with_config(
            Arc::clone(&self.client),
            self.base_url.clone(),
            self.poll_wait_time,
        )))
    }
}

fn required_param<'a>(params: &'a HashMap<String, SecretString>, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .map(ExposeSecret::expose_secret)
        .ok_or_else(|| Error::MissingRequiredParameter {
            parameter_name: key.to_string(),
        })
}

fn build_base_url(protocol: &str, params: &HashMap<String, SecretString>) -> Result<String> {
    let host = required_param(params, "host")?;
    let port = parse_u16_param(params, "port", DEFAULT_PORT)?;

    Ok(format!("{protocol}://{host}:{port}"))
}

fn get_catalog_and_schema(params: &HashMap<String, SecretString>) -> Result<(String, String)> {
    let catalog = required_param(params, "catalog")?.to_string();

    let schema = params
        .get("schema")
        .map(ExposeSecret::expose_secret)
        .unwrap_or(DEFAULT_SCHEMA)
        .to_string();

    Ok((catalog, schema))
}

fn get_user_and_password(
    params: &HashMap<String, SecretString>,
) -> (Option<String>, Option<SecretString>) {
    let user = params
        .get("user")
        .or_else(|| params.get("username"))
        .map(|u| u.expose_secret().to_string());
    let password = params.get("password").cloned();
    (user, password)
}

fn validate_auth(
    params: &HashMap<String, SecretString>,
    user: Option<&str>,
    password: Option<&SecretString>,
) -> Result<()> {
    if user.is_none() {
        return Err(Error::InvalidAuthConfig {
            details: "User is required".into(),
        });
    }

    let has_user_pass = password.is_some();
    let has_identity = params.contains_key("identity_pem_path");
    let has_token = params.contains_key("bearer_token");

    let auth_count = [has_user_pass, has_identity, has_token]
        .into_iter()
        .filter(|x| *x)
        .count();

    if auth_count > 1 {
        return Err(Error::InvalidAuthConfig {
            details: "At most one authentication method must be provided: basic auth, mTLS, or bearer token".into(),
        });
    }
    Ok(())
}

fn configure_tls(
    client_builder: ClientBuilder,
    params: &HashMap<String, SecretString>,
) -> Result<(ClientBuilder, &'static str)> {
    let ssl_mode = params
        .get("sslmode")
        .map(ExposeSecret::expose_secret)
        .unwrap_or(DEFAULT_SSL_MODE)
        .to_lowercase();

    let accept_invalid = match ssl_mode.as_str() {
        "disabled" => return Ok((client_builder, "http")),
        "required" => false,
        "preferred" => true,
        _ => return InvalidSSLModeParameterSnafu { value: ssl_mode }.fail(),
    };

    let mut client_builder = client_builder;

    if let Some(cert_path) = params.get("sslrootcert") {
        let path = cert_path.expose_secret();
        let ca_cert = fs::read(path).context(UnableToReadRootCertSnafu { path })?;
        let cert = Certificate::from_pem(&ca_cert).context(InvalidRootCertSnafu { path })?;
        client_builder = client_builder.add_root_certificate(cert);
    }

    if accept_invalid {
        client_builder = client_builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    Ok((client_builder, "https"))
}

fn configure_identity(
    client_builder: ClientBuilder,
    params: &HashMap<String, SecretString>,
) -> Result<ClientBuilder> {
    let Some(identity_path) = params.get("identity_pem_path") else {
        return Ok(client_builder);
    };

    let path = identity_path.expose_secret();
    let pem = fs::read(path).context(UnableToReadIdentityPemSnafu { path })?;
    let identity = Identity::from_pem(&pem).context(InvalidIdentityPemSnafu { path })?;

    Ok(client_builder.identity(identity))
}

fn header_value(parameter_name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).context(InvalidHeaderValueSnafu { parameter_name })
}

fn build_headers(
    catalog: &str,
    schema: &str,
    user: Option<&str>,
    password: Option<&SecretString>,
    bearer_token: Option<&SecretString>,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert("X-Trino-Catalog", header_value("catalog", catalog)?);
    headers.insert("X-Trino-Schema", header_value("schema", schema)?);

    if let Some(user) = user {
        headers.insert("X-Trino-User", header_value("user", user)?);
    }

    if let (Some(user), Some(password)) = (user, password) {
        let encoded = BASE64.encode(format!("{user}:{}", password.expose_secret()));
        let mut value = header_value("password", &format!("Basic {encoded}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    } else if let Some(token) = bearer_token {
        let mut value = header_value(
            "bearer_token",
            &format!("Bearer {}", token.expose_secret()),
        )?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn parse_u64_param(params: &HashMap<String, SecretString>, key: &str, default: u64) -> Result<u64> {
    match params.get(key) {
        Some(value) => value
            .expose_secret()
            .trim()
            .parse::<u64>()
            .context(InvalidIntegerParameterSnafu {
                parameter_name: key,
            }),
        None => Ok(default),
    }
}

fn parse_u16_param(params: &HashMap<String, SecretString>, key: &str, default: u16) -> Result<u16> {
    match params.get(key) {
        Some(value) => value
            .expose_secret()
            .trim()
            .parse::<u16>()
            .context(InvalidIntegerParameterSnafu {
                parameter_name: key,
            }),
        None => Ok(default),
    }
}
