//! Live-server probes for the dbsafe analyzer.
//!
//! Everything here produces read-only snapshots (`TableMetadata`,
//! `TopologyInfo`, `ServerVersion`, an EXPLAIN row estimate) that the pure
//! engine consumes. Connection management lives in [`connect`]; each probe
//! keeps its server-row-to-record mapping in pure functions for testing.

pub mod connect;
pub mod error;
pub mod explain;
pub mod metadata;
pub mod topology;

pub use connect::{ConnectionSettings, TlsMode};
pub use error::{ProbeError, Result};
pub use explain::estimate_rows;
pub use metadata::fetch_table_metadata;
pub use topology::{probe_topology, probe_version};
