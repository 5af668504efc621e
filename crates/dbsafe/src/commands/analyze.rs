//! The analysis command: read the statement, probe the server, run the
//! engine, render the report.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use dbsafe_core::enums::OperationTag;
use dbsafe_engine::AnalysisInput;
use dbsafe_probe::{estimate_rows, fetch_table_metadata, probe_topology, probe_version};
use dbsafe_render::{render, OutputFormat};

use crate::cli::Cli;
use crate::context::RuntimeContext;

/// Executes one analysis run. Exit code 0 regardless of risk; errors are
/// reserved for parse/probe/connection failure.
pub fn run(ctx: &RuntimeContext, cli: &Cli) -> Result<()> {
    let sql = read_sql(cli)?;
    let parsed = dbsafe_parser::parse(&sql).context("failed to parse the statement")?;
    tracing::info!(op = %parsed.op_tag, table = %parsed.table, "statement parsed");

    if parsed.table.is_empty() {
        bail!("statement has no target table to analyze");
    }

    let database = if parsed.database.is_empty() {
        match &ctx.settings.database {
            Some(db) => db.clone(),
            None => bail!(
                "table `{}` is unqualified and no default database was given; \
                 qualify the table or pass --database",
                parsed.table
            ),
        }
    } else {
        parsed.database.clone()
    };

    let mut conn = ctx
        .settings
        .connect()
        .context("failed to connect to the server")?;

    let version = probe_version(&mut conn).context("failed to probe the server version")?;
    let topology = probe_topology(&mut conn).context("failed to probe the topology")?;
    let meta = fetch_table_metadata(&mut conn, &database, &parsed.table)
        .with_context(|| format!("failed to collect metadata for {}.{}", database, parsed.table))?;

    let estimated_rows = match parsed.op_tag {
        OperationTag::Update | OperationTag::Delete | OperationTag::Select => {
            estimate_rows(&mut conn, &sql)
        }
        _ => 0,
    };

    let mut parsed = parsed;
    parsed.database = database;
    let input = AnalysisInput::new(parsed, meta, version, topology)
        .with_chunk_size(ctx.chunk_size)
        .with_estimated_rows(estimated_rows)
        .with_fk_checks_disabled(ctx.fk_checks_disabled);

    let mut report = dbsafe_engine::analyze(&input);

    // The chunked script is the one artifact persisted to disk.
    if let Some(script) = &report.generated_script {
        let path = PathBuf::from(&script.path);
        std::fs::write(&path, &script.body)
            .with_context(|| format!("failed to write script to {}", path.display()))?;
        report.execution_command = Some(execution_command(ctx, &path));
        tracing::info!(path = %path.display(), "wrote chunked execution script");
    }

    println!("{}", render(&report, ctx.format));
    Ok(())
}

fn read_sql(cli: &Cli) -> Result<String> {
    match (&cli.sql, &cli.sql_file) {
        (Some(inline), _) => Ok(inline.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read SQL file {}", path.display())),
        (None, None) => bail!("no SQL to analyze; pass a file or --sql"),
    }
}

/// Shell hint for running a generated script with the same connection.
fn execution_command(ctx: &RuntimeContext, path: &std::path::Path) -> String {
    let mut cmd = format!(
        "mysql --host {} --port {} --user {}",
        ctx.settings.host, ctx.settings.port, ctx.settings.user
    );
    if ctx.settings.password.is_some() {
        cmd.push_str(" -p");
    }
    if let Some(db) = &ctx.settings.database {
        cmd.push_str(&format!(" {}", db));
    }
    cmd.push_str(&format!(" < {}", path.display()));
    cmd
}

/// Renders an error for the selected format (JSON gets a JSON object, so
/// scripted callers never have to scrape stderr prose).
pub fn render_error(format: OutputFormat, error: &anyhow::Error) -> String {
    if format == OutputFormat::Json {
        serde_json::json!({ "error": format!("{:#}", error) }).to_string()
    } else {
        format!("Error: {:#}", error)
    }
}
