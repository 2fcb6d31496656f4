use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::shared::ValidationError;

/// Name reported to Postgres for every warehouse connection.
const APPLICATION_NAME: &str = "hiring_warehouse_loader";

/// Static session options applied to every warehouse connection.
///
/// Dates and timestamps are read back from `dim_datetime` and compared against source rows,
/// so the date style must not depend on the server defaults.
pub struct DefaultPgConnectionOptions;

impl DefaultPgConnectionOptions {
    /// Returns the options as key-value pairs suitable for sqlx.
    pub fn to_key_value_pairs() -> Vec<(String, String)> {
        vec![
            ("datestyle".to_string(), "ISO".to_string()),
            ("intervalstyle".to_string(), "postgres".to_string()),
            ("client_encoding".to_string(), "UTF8".to_string()),
        ]
    }
}

/// Configuration for connecting to the Postgres warehouse.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid accidentally
/// leaking the password into serialized forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PgConnectionConfig {
    /// Hostname or IP address of the Postgres server.
    pub host: String,
    /// Port number on which the Postgres server is listening.
    pub port: u16,
    /// Name of the Postgres database to connect to.
    pub name: String,
    /// Username for authenticating with the Postgres server.
    pub username: String,
    /// Password for the specified user. Redacted in debug output.
    pub password: Option<SecretString>,
    /// TLS configuration for secure connections.
    #[serde(default)]
    pub tls: TlsConfig,
}

impl PgConnectionConfig {
    /// Validates the connection settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "warehouse.postgres.host".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        self.tls.validate()
    }
}

/// TLS settings for secure Postgres connections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    #[serde(default)]
    pub trusted_root_certs: String,
    /// Whether TLS is enabled for the connection.
    #[serde(default)]
    pub enabled: bool,
}

impl TlsConfig {
    /// Validates the [`TlsConfig`].
    ///
    /// Returns [`ValidationError::MissingTrustedRootCerts`] if TLS is enabled but no certificates
    /// are provided.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

/// Converts a connection configuration into driver specific connect options.
pub trait IntoConnectOptions<Output> {
    /// Creates connection options without selecting a database.
    fn without_db(&self) -> Output;

    /// Creates connection options for the configured database.
    fn with_db(&self) -> Output;
}

impl IntoConnectOptions<PgConnectOptions> for PgConnectionConfig {
    fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.tls.enabled {
            PgSslMode::VerifyFull
        } else {
            PgSslMode::Prefer
        };
        let mut options = PgConnectOptions::new_without_pgpass()
            .application_name(APPLICATION_NAME)
            .host(&self.host)
            .username(&self.username)
            .port(self.port)
            .ssl_mode(ssl_mode)
            .options(DefaultPgConnectionOptions::to_key_value_pairs());

        if self.tls.enabled {
            options = options.ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes());
        }

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }

    fn with_db(&self) -> PgConnectOptions {
        let options: PgConnectOptions = self.without_db();
        options.database(&self.name)
    }
}
