//! Live table metadata snapshot, as collected by the schema probe.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Column / index / constraint / trigger records
// ---------------------------------------------------------------------------

/// One column from `information_schema.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Full column type text, lower-cased (e.g. `varchar(120)`).
    pub type_text: String,
    pub nullable: bool,
    /// 1-based ordinal position.
    pub position: u32,
    /// Column character set for string types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    /// `true` for STORED generated columns.
    #[serde(default)]
    pub is_stored_generated: bool,
}

/// One index from `information_schema.STATISTICS`, grouped by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    /// BTREE, FULLTEXT, SPATIAL, HASH.
    pub index_type: String,
}

/// One foreign key from `information_schema.KEY_COLUMN_USAGE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Trigger event from `information_schema.TRIGGERS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

/// Trigger timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerTiming {
    Before,
    After,
}

/// One trigger defined on the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub name: String,
    pub event: TriggerEvent,
    pub timing: TriggerTiming,
}

// ---------------------------------------------------------------------------
// TableMetadata
// ---------------------------------------------------------------------------

/// Read-only snapshot of one table, valid for the duration of one analysis.
///
/// Invariant (enforced by the probe): `columns` is ordered by position,
/// positions are unique, names are unique. An empty `columns` list means
/// column validation was skipped, not that the table has no columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub database: String,
    pub table: String,
    /// Storage engine, free-form; compare case-insensitively.
    pub engine: String,
    pub row_count: u64,
    pub avg_row_length: u64,
    pub data_length: u64,
    pub index_length: u64,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
    #[serde(default)]
    pub triggers: Vec<TriggerInfo>,
    #[serde(default)]
    pub partitioned: bool,
}

impl TableMetadata {
    /// Data plus index bytes.
    pub fn total_size(&self) -> u64 {
        self.data_length + self.index_length
    }

    /// Returns `true` when at least one trigger is defined on the table.
    pub fn has_triggers(&self) -> bool {
        !self.triggers.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive engine comparison.
    pub fn engine_is(&self, other: &str) -> bool {
        self.engine.eq_ignore_ascii_case(other)
    }

    /// Returns `true` when column metadata was collected, meaning
    /// existence validation can run.
    pub fn has_column_metadata(&self) -> bool {
        !self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> TableMetadata {
        TableMetadata {
            database: "app".into(),
            table: "users".into(),
            engine: "InnoDB".into(),
            row_count: 1000,
            avg_row_length: 128,
            data_length: 4096,
            index_length: 1024,
            columns: vec![
                ColumnInfo {
                    name: "id".into(),
                    type_text: "bigint".into(),
                    nullable: false,
                    position: 1,
                    character_set: None,
                    is_stored_generated: false,
                },
                ColumnInfo {
                    name: "Email".into(),
                    type_text: "varchar(255)".into(),
                    nullable: true,
                    position: 2,
                    character_set: Some("utf8mb4".into()),
                    is_stored_generated: false,
                },
            ],
            indexes: vec![],
            foreign_keys: vec![],
            triggers: vec![],
            partitioned: false,
        }
    }

    #[test]
    fn total_size_sums_data_and_index() {
        assert_eq!(meta().total_size(), 5120);
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let m = meta();
        assert!(m.column("email").is_some());
        assert!(m.column("EMAIL").is_some());
        assert!(m.column("missing").is_none());
    }

    #[test]
    fn engine_comparison_is_case_insensitive() {
        let m = meta();
        assert!(m.engine_is("innodb"));
        assert!(m.engine_is("INNODB"));
        assert!(!m.engine_is("myisam"));
    }

    #[test]
    fn empty_columns_means_validation_skipped() {
        let mut m = meta();
        m.columns.clear();
        assert!(!m.has_column_metadata());
        assert!(!m.has_triggers());
    }
}
