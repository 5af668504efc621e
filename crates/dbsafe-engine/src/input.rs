//! The engine's input: one statement plus the snapshots it is judged against.

use dbsafe_core::metadata::TableMetadata;
use dbsafe_core::statement::ParsedStatement;
use dbsafe_core::topology::TopologyInfo;
use dbsafe_core::version::ServerVersion;

/// Default batch size for chunked DML execution.
pub const DEFAULT_CHUNK_SIZE: u64 = 10_000;

/// Everything one analysis needs. The engine performs no I/O: the caller
/// collects these snapshots (and the EXPLAIN estimate) up front.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub parsed: ParsedStatement,
    pub meta: TableMetadata,
    pub version: ServerVersion,
    pub topology: TopologyInfo,
    /// Batch size for chunked execution.
    pub chunk_size: u64,
    /// Row estimate from EXPLAIN; 0 when unavailable (EXPLAIN failure
    /// degrades here rather than aborting the analysis).
    pub estimated_rows: u64,
    /// Whether the session that will run the DDL has
    /// `foreign_key_checks = 0`. Defaults to `false`: ADD FOREIGN KEY is
    /// assumed to validate existing rows unless the operator says otherwise.
    pub foreign_key_checks_disabled: bool,
}

impl AnalysisInput {
    /// Creates an input with default chunk size, no row estimate, and
    /// foreign-key checks assumed ON.
    pub fn new(
        parsed: ParsedStatement,
        meta: TableMetadata,
        version: ServerVersion,
        topology: TopologyInfo,
    ) -> Self {
        Self {
            parsed,
            meta,
            version,
            topology,
            chunk_size: DEFAULT_CHUNK_SIZE,
            estimated_rows: 0,
            foreign_key_checks_disabled: false,
        }
    }

    /// Sets the chunked-execution batch size (zero falls back to default).
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        self
    }

    /// Sets the EXPLAIN row estimate.
    pub fn with_estimated_rows(mut self, rows: u64) -> Self {
        self.estimated_rows = rows;
        self
    }

    /// Asserts the executing session will disable foreign-key checks.
    pub fn with_fk_checks_disabled(mut self, disabled: bool) -> Self {
        self.foreign_key_checks_disabled = disabled;
        self
    }

    /// Rows the DML statement will touch: the EXPLAIN estimate when
    /// available; for UPDATE/DELETE without a WHERE clause, the whole
    /// table; otherwise unknown (0).
    pub fn affected_rows(&self) -> u64 {
        use dbsafe_core::enums::OperationTag;
        if self.estimated_rows > 0 {
            self.estimated_rows
        } else if matches!(
            self.parsed.op_tag,
            OperationTag::Update | OperationTag::Delete
        ) && !self.parsed.has_where
        {
            self.meta.row_count
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsafe_core::enums::{OperationTag, StatementKind};

    fn input(has_where: bool, estimated: u64, row_count: u64) -> AnalysisInput {
        let parsed = ParsedStatement {
            kind: StatementKind::Dml,
            op_tag: OperationTag::Delete,
            has_where,
            ..Default::default()
        };
        let meta = TableMetadata {
            database: "app".into(),
            table: "logs".into(),
            engine: "InnoDB".into(),
            row_count,
            avg_row_length: 100,
            data_length: 0,
            index_length: 0,
            columns: vec![],
            indexes: vec![],
            foreign_keys: vec![],
            triggers: vec![],
            partitioned: false,
        };
        AnalysisInput::new(
            parsed,
            meta,
            ServerVersion::new(8, 0, 35),
            TopologyInfo::standalone(),
        )
        .with_estimated_rows(estimated)
    }

    #[test]
    fn explain_estimate_wins() {
        assert_eq!(input(true, 4_654_623, 1_000).affected_rows(), 4_654_623);
    }

    #[test]
    fn no_where_falls_back_to_row_count() {
        assert_eq!(input(false, 0, 500_000).affected_rows(), 500_000);
    }

    #[test]
    fn where_without_estimate_is_unknown() {
        assert_eq!(input(true, 0, 500_000).affected_rows(), 0);
    }

    #[test]
    fn zero_chunk_size_falls_back_to_default() {
        let i = input(true, 0, 0).with_chunk_size(0);
        assert_eq!(i.chunk_size, DEFAULT_CHUNK_SIZE);
        let i = input(true, 0, 0).with_chunk_size(500);
        assert_eq!(i.chunk_size, 500);
    }

    #[test]
    fn fk_checks_default_on() {
        assert!(!input(true, 0, 0).foreign_key_checks_disabled);
    }
}
