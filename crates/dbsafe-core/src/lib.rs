//! Core domain types for the dbsafe analyzer.
//!
//! This crate holds everything the decision engine, probes, parser, and
//! renderers share: the operation/classification enums, the server version
//! classifier, parsed-statement and metadata snapshots, the topology
//! snapshot, and the analysis report that renderers consume.

pub mod classification;
pub mod enums;
pub mod format;
pub mod metadata;
pub mod report;
pub mod statement;
pub mod topology;
pub mod version;
