//! Connection settings for a Redshift endpoint.

use crate::error::{QbError, QbResult};
use std::fmt;
use std::time::Duration;
use tokio_postgres::config::SslMode;

/// Default Redshift port.
pub const DEFAULT_PORT: u16 = 5439;

/// Connection parameters for a Redshift cluster or workgroup.
#[derive(Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Defaults to [`DEFAULT_PORT`].
    pub port: u16,
    /// Passed to the driver; `None` waits as long as the OS allows.
    pub connect_timeout: Option<Duration>,
    pub application_name: Option<String>,
    pub ssl_mode: SslMode,
}

impl ConnectOptions {
    /// Create options for the given endpoint on the default port.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            application_name: None,
            ssl_mode: SslMode::Prefer,
        }
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the `application_name` reported to the server.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Set the TLS negotiation mode.
    pub fn ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    /// Load options from the environment (and a `.env` file, if present).
    ///
    /// Required: `REDSHIFT_HOST`, `REDSHIFT_USER`, `REDSHIFT_PASSWORD`,
    /// `REDSHIFT_DATABASE`. Optional: `REDSHIFT_PORT`,
    /// `REDSHIFT_CONNECT_TIMEOUT_SECS`, `REDSHIFT_APPLICATION_NAME`,
    /// `REDSHIFT_SSLMODE` (`disable`, `prefer`, `require`).
    pub fn from_env() -> QbResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> QbResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| QbError::config(format!("{key} must be set")))
        };

        let mut opts = Self::new(
            required("REDSHIFT_HOST")?,
            required("REDSHIFT_USER")?,
            required("REDSHIFT_PASSWORD")?,
            required("REDSHIFT_DATABASE")?,
        );

        if let Some(port) = lookup("REDSHIFT_PORT") {
            opts.port = port
                .trim()
                .parse()
                .map_err(|e| QbError::config(format!("invalid REDSHIFT_PORT '{port}': {e}")))?;
        }
        if let Some(secs) = lookup("REDSHIFT_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                QbError::config(format!("invalid REDSHIFT_CONNECT_TIMEOUT_SECS '{secs}': {e}"))
            })?;
            opts.connect_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(name) = lookup("REDSHIFT_APPLICATION_NAME") {
            opts.application_name = Some(name);
        }
        if let Some(mode) = lookup("REDSHIFT_SSLMODE") {
            opts.ssl_mode = parse_ssl_mode(&mode)?;
        }

        Ok(opts)
    }

    /// Driver configuration for these options.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(self.host.as_str())
            .port(self.port)
            .user(self.user.as_str())
            .password(self.password.as_str())
            .dbname(self.database.as_str())
            .ssl_mode(self.ssl_mode);
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }
        if let Some(name) = &self.application_name {
            config.application_name(name.as_str());
        }
        config
    }
}

fn parse_ssl_mode(mode: &str) -> QbResult<SslMode> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "disable" => Ok(SslMode::Disable),
        "prefer" => Ok(SslMode::Prefer),
        "require" => Ok(SslMode::Require),
        other => Err(QbError::config(format!("invalid REDSHIFT_SSLMODE '{other}'"))),
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .field("application_name", &self.application_name)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}
