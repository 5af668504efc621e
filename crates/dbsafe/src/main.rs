//! `dbsafe` -- MySQL DDL/DML safety analyzer CLI.
//!
//! Parses CLI arguments with clap, resolves the runtime context from flags
//! and the optional config file, and runs the analysis command.

mod cli;
mod commands;
mod config;
mod context;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use cli::Cli;
use commands::analyze;
use context::RuntimeContext;
use dbsafe_render::OutputFormat;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: exit cleanly (a probe may be mid-flight). Second: force.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(130);
    });

    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("dbsafe=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = config::load()
        .and_then(|file| RuntimeContext::resolve(&cli, &file))
        .and_then(|ctx| analyze::run(&ctx, &cli).map(|()| ctx));

    if let Err(e) = result {
        // Error formatting follows the requested output format when it is
        // at least parseable; otherwise plain text.
        let format = OutputFormat::parse(&cli.format).unwrap_or_default();
        eprintln!("{}", analyze::render_error(format, &e));
        std::process::exit(1);
    }
}
