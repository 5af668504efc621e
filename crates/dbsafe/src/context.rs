//! Runtime context: CLI flags merged over the config file, with password
//! resolution.

use anyhow::{bail, Context, Result};

use dbsafe_engine::DEFAULT_CHUNK_SIZE;
use dbsafe_probe::{ConnectionSettings, TlsMode};
use dbsafe_render::OutputFormat;

use crate::cli::Cli;
use crate::config::FileConfig;

/// Environment variable supplying the password non-interactively.
const PASSWORD_ENV: &str = "DBSAFE_PASSWORD";

/// Everything the analyze command needs, resolved once at startup.
#[derive(Debug)]
pub struct RuntimeContext {
    pub settings: ConnectionSettings,
    pub format: OutputFormat,
    pub chunk_size: u64,
    pub fk_checks_disabled: bool,
    pub verbose: bool,
}

impl RuntimeContext {
    /// Merges CLI flags over file config over built-in defaults.
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Result<Self> {
        let format = OutputFormat::parse(&cli.format)
            .with_context(|| format!("unknown --format value: {}", cli.format))?;

        let tls_text = cli
            .connection
            .tls
            .clone()
            .or_else(|| file.connection.tls.clone());
        let tls = match tls_text.as_deref() {
            None => TlsMode::default(),
            Some(t) => match TlsMode::parse(t) {
                Some(mode) => mode,
                None => bail!(
                    "unknown --tls value: {} (expected disabled, preferred, required, \
                     skip-verify, or custom)",
                    t
                ),
            },
        };
        let tls_ca = cli
            .connection
            .tls_ca
            .clone()
            .or_else(|| file.connection.tls_ca.clone());
        if tls == TlsMode::Custom && tls_ca.is_none() {
            bail!("--tls=custom requires --tls-ca");
        }

        let defaults = ConnectionSettings::default();
        let settings = ConnectionSettings {
            host: cli
                .connection
                .host
                .clone()
                .or_else(|| file.connection.host.clone())
                .unwrap_or(defaults.host),
            port: cli
                .connection
                .port
                .or(file.connection.port)
                .unwrap_or(defaults.port),
            user: cli
                .connection
                .user
                .clone()
                .or_else(|| file.connection.user.clone())
                .unwrap_or(defaults.user),
            password: resolve_password(cli)?,
            socket: cli
                .connection
                .socket
                .clone()
                .or_else(|| file.connection.socket.clone()),
            database: cli
                .connection
                .database
                .clone()
                .or_else(|| file.connection.database.clone()),
            tls,
            tls_ca,
            connect_timeout: defaults.connect_timeout,
        };

        Ok(Self {
            settings,
            format,
            chunk_size: cli
                .chunk_size
                .or(file.chunk_size)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            fk_checks_disabled: cli.no_fk_checks,
            verbose: cli.verbose,
        })
    }
}

/// Password priority: inline flag value, then $DBSAFE_PASSWORD, then a
/// terminal prompt when `--password` was passed bare.
fn resolve_password(cli: &Cli) -> Result<Option<String>> {
    match cli.connection.password.as_deref() {
        Some("") => {
            if let Ok(env_password) = std::env::var(PASSWORD_ENV) {
                return Ok(Some(env_password));
            }
            let prompted = rpassword::prompt_password("Password: ")
                .context("failed to read password from terminal")?;
            Ok(Some(prompted))
        }
        Some(inline) => Ok(Some(inline.to_string())),
        None => Ok(std::env::var(PASSWORD_ENV).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("dbsafe").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let ctx = RuntimeContext::resolve(&cli(&["--sql", "SELECT 1"]), &FileConfig::default())
            .unwrap();
        assert_eq!(ctx.settings.host, "127.0.0.1");
        assert_eq!(ctx.settings.port, 3306);
        assert_eq!(ctx.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(ctx.format, OutputFormat::Text);
        assert!(!ctx.fk_checks_disabled);
    }

    #[test]
    fn cli_beats_file_config() {
        let file: FileConfig = serde_yaml::from_str(
            "connection:\n  host: from-file\n  port: 3307\nchunk_size: 5000\n",
        )
        .unwrap();
        let ctx = RuntimeContext::resolve(
            &cli(&["--sql", "SELECT 1", "--host", "from-cli", "--chunk-size", "2000"]),
            &file,
        )
        .unwrap();
        assert_eq!(ctx.settings.host, "from-cli");
        assert_eq!(ctx.settings.port, 3307);
        assert_eq!(ctx.chunk_size, 2000);
    }

    #[test]
    fn bad_format_is_rejected() {
        assert!(RuntimeContext::resolve(
            &cli(&["--sql", "SELECT 1", "--format", "yaml"]),
            &FileConfig::default()
        )
        .is_err());
    }

    #[test]
    fn custom_tls_requires_ca() {
        assert!(RuntimeContext::resolve(
            &cli(&["--sql", "SELECT 1", "--tls", "custom"]),
            &FileConfig::default()
        )
        .is_err());
        assert!(RuntimeContext::resolve(
            &cli(&["--sql", "SELECT 1", "--tls", "custom", "--tls-ca", "/tmp/ca.pem"]),
            &FileConfig::default()
        )
        .is_ok());
    }

    #[test]
    fn unknown_tls_mode_is_rejected() {
        assert!(RuntimeContext::resolve(
            &cli(&["--sql", "SELECT 1", "--tls", "mutual"]),
            &FileConfig::default()
        )
        .is_err());
    }
}
