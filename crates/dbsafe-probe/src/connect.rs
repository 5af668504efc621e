//! Connection settings and the mapping onto `mysql::Opts`.

use std::path::PathBuf;
use std::time::Duration;

use mysql::{Conn, OptsBuilder, SslOpts};

use crate::error::{ProbeError, Result};

/// TLS negotiation mode for the probe connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Never use TLS.
    Disabled,
    /// Let the driver and server negotiate (the default).
    #[default]
    Preferred,
    /// Require TLS with full certificate verification.
    Required,
    /// Require TLS but accept any certificate (self-signed servers).
    SkipVerify,
    /// Require TLS verified against a caller-provided CA file.
    Custom,
}

impl TlsMode {
    /// Parses the CLI spelling (`disabled`, `preferred`, `required`,
    /// `skip-verify`, `custom`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "disabled" => Some(Self::Disabled),
            "preferred" => Some(Self::Preferred),
            "required" => Some(Self::Required),
            "skip-verify" => Some(Self::SkipVerify),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Everything needed to reach the target server.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub socket: Option<PathBuf>,
    pub database: Option<String>,
    pub tls: TlsMode,
    pub tls_ca: Option<PathBuf>,
    pub connect_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3306,
            user: "root".into(),
            password: None,
            socket: None,
            database: None,
            tls: TlsMode::default(),
            tls_ca: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectionSettings {
    /// Builds the driver options, validating the TLS combination.
    fn build_opts(&self) -> Result<OptsBuilder> {
        let ssl = self.ssl_opts()?;
        let mut builder = OptsBuilder::new()
            .user(Some(self.user.clone()))
            .pass(self.password.clone())
            .db_name(self.database.clone())
            .tcp_connect_timeout(Some(self.connect_timeout))
            .ssl_opts(ssl);
        if let Some(socket) = &self.socket {
            builder = builder.socket(Some(socket.display().to_string()));
        } else {
            builder = builder
                .ip_or_hostname(Some(self.host.clone()))
                .tcp_port(self.port);
        }
        Ok(builder)
    }

    /// TLS mapping: the driver uses TLS exactly when `SslOpts` is present,
    /// so `preferred` stays on the driver default (no explicit opts).
    fn ssl_opts(&self) -> Result<Option<SslOpts>> {
        match self.tls {
            TlsMode::Disabled | TlsMode::Preferred => Ok(None),
            TlsMode::Required => Ok(Some(SslOpts::default())),
            TlsMode::SkipVerify => Ok(Some(
                SslOpts::default()
                    .with_danger_accept_invalid_certs(true)
                    .with_danger_skip_domain_validation(true),
            )),
            TlsMode::Custom => {
                let ca = self.tls_ca.clone().ok_or(ProbeError::MissingTlsCa)?;
                Ok(Some(SslOpts::default().with_root_cert_path(Some(ca))))
            }
        }
    }

    /// Opens a connection to the target server.
    pub fn connect(&self) -> Result<Conn> {
        let opts = self.build_opts()?;
        tracing::debug!(host = %self.host, port = self.port, "connecting");
        Conn::new(opts).map_err(|e| ProbeError::Connection(e.to_string()))
    }
}
