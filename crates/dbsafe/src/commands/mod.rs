//! Command handlers for the `dbsafe` CLI.

pub mod analyze;
