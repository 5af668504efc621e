//! Clap CLI definitions for the `dbsafe` command.

use std::path::PathBuf;

use clap::{Args, Parser};

/// dbsafe -- MySQL DDL/DML safety analyzer.
///
/// Analyzes a pending statement against a live server and reports the
/// expected algorithm and lock, a risk verdict, an execution-method
/// recommendation, a rollback plan, and disk/cluster impact estimates.
#[derive(Parser, Debug)]
#[command(
    name = "dbsafe",
    about = "MySQL DDL/DML safety analyzer",
    long_about = "Analyzes a pending MySQL statement against a live server: expected \
                  ALTER algorithm and lock, risk verdict, execution-method \
                  recommendation (direct / chunked / gh-ost / pt-osc), rollback plan, \
                  and disk and cluster impact estimates.",
    version
)]
pub struct Cli {
    /// SQL file containing the statement to analyze.
    pub sql_file: Option<PathBuf>,

    /// Inline SQL statement to analyze (instead of a file).
    #[arg(long, value_name = "STATEMENT")]
    pub sql: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format: text, plain, json, markdown.
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Batch size used when a chunked execution script is generated.
    #[arg(long, value_name = "ROWS")]
    pub chunk_size: Option<u64>,

    /// Assert that the executing session will run with foreign_key_checks=0.
    #[arg(long)]
    pub no_fk_checks: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Standard MySQL connection flags.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Server hostname.
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// Server port.
    #[arg(long, short = 'P')]
    pub port: Option<u16>,

    /// User name.
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Password. With no value, prompts on the terminal;
    /// also read from $DBSAFE_PASSWORD.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "")]
    pub password: Option<String>,

    /// Unix socket path (overrides host/port).
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Default database for unqualified table names.
    #[arg(long, short = 'D')]
    pub database: Option<String>,

    /// TLS mode: disabled, preferred, required, skip-verify, custom.
    #[arg(long)]
    pub tls: Option<String>,

    /// CA certificate file (required with --tls=custom).
    #[arg(long, value_name = "FILE")]
    pub tls_ca: Option<PathBuf>,
}
