//! Enum types for the dbsafe analyzer.
//!
//! Each enum is a closed set of string-backed variants with:
//! - `as_str()` and a `Display` impl
//! - Serialize/Deserialize as the canonical string
//! - an `ALL` constant so totality tests can iterate every variant

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Macro: defines a closed enum backed by fixed strings.
// ---------------------------------------------------------------------------
macro_rules! define_str_enum {
    (
        $(#[$meta:meta])*
        $name:ident,
        variants: [
            $( ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( Self::$variant, )+ ];

            /// Returns the canonical string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }

            /// Parses the canonical string form, returning `None` for
            /// anything outside the closed set.
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $( $str => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!("unknown ", stringify!($name), " value: {}"),
                        s
                    ))
                })
            }
        }
    };
}

// ===========================================================================
// RiskLevel
// ===========================================================================

define_str_enum! {
    /// Safety verdict for an analyzed statement.
    RiskLevel,
    variants: [
        (Safe, "SAFE"),
        (Caution, "CAUTION"),
        (Dangerous, "DANGEROUS"),
    ]
}

impl RiskLevel {
    /// Numeric severity used for the monotone risk floor.
    fn severity(&self) -> u8 {
        match self {
            Self::Safe => 0,
            Self::Caution => 1,
            Self::Dangerous => 2,
        }
    }

    /// Returns the higher of `self` and `floor`. Risk only ever ratchets up.
    pub fn at_least(self, floor: RiskLevel) -> RiskLevel {
        if floor.severity() > self.severity() {
            floor
        } else {
            self
        }
    }

    /// Returns `true` if `self` is at least as severe as `other`.
    pub fn is_at_least(&self, other: RiskLevel) -> bool {
        self.severity() >= other.severity()
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Safe
    }
}

// ===========================================================================
// ExecutionMethod
// ===========================================================================

define_str_enum! {
    /// How the statement should be executed.
    ExecutionMethod,
    variants: [
        (Direct, "DIRECT"),
        (Chunked, "CHUNKED"),
        (Ghost, "GHOST"),
        (PtOsc, "PTOSC"),
    ]
}

impl ExecutionMethod {
    /// Human-readable description for renderers.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Direct => "run the statement directly",
            Self::Chunked => "split the write into batched chunks",
            Self::Ghost => "use gh-ost (trigger-less online schema change)",
            Self::PtOsc => "use pt-online-schema-change (Percona Toolkit)",
        }
    }

    /// Returns `true` for the online schema-change tools.
    pub fn is_osc_tool(&self) -> bool {
        matches!(self, Self::Ghost | Self::PtOsc)
    }
}

// ===========================================================================
// Algorithm
// ===========================================================================

define_str_enum! {
    /// MySQL 8.0 ALTER algorithm.
    Algorithm,
    variants: [
        (Instant, "INSTANT"),
        (Inplace, "INPLACE"),
        (Copy, "COPY"),
        (Depends, "DEPENDS"),
    ]
}

impl Algorithm {
    /// Strictness ordering for multi-op fusion: INSTANT < INPLACE < COPY.
    /// DEPENDS sorts between INPLACE and COPY so an unresolved sub-op can
    /// never make a compound ALTER look cheaper than its worst member.
    pub fn strictness(&self) -> u8 {
        match self {
            Self::Instant => 0,
            Self::Inplace => 1,
            Self::Depends => 2,
            Self::Copy => 3,
        }
    }

    /// Returns the stricter of two algorithms.
    pub fn strictest(self, other: Algorithm) -> Algorithm {
        if other.strictness() > self.strictness() {
            other
        } else {
            self
        }
    }
}

// ===========================================================================
// LockLevel
// ===========================================================================

define_str_enum! {
    /// MySQL metadata-lock level taken by an ALTER.
    LockLevel,
    variants: [
        (None, "NONE"),
        (Shared, "SHARED"),
        (Exclusive, "EXCLUSIVE"),
        (Depends, "DEPENDS"),
    ]
}

impl LockLevel {
    /// Strictness ordering for multi-op fusion: NONE < SHARED < EXCLUSIVE.
    pub fn strictness(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Shared => 1,
            Self::Depends => 2,
            Self::Exclusive => 3,
        }
    }

    /// Returns the stricter of two lock levels.
    pub fn strictest(self, other: LockLevel) -> LockLevel {
        if other.strictness() > self.strictness() {
            other
        } else {
            self
        }
    }

    /// Returns `true` if concurrent DML stays possible under this lock.
    pub fn allows_writes(&self) -> bool {
        matches!(self, Self::None)
    }
}

// ===========================================================================
// StatementKind
// ===========================================================================

define_str_enum! {
    /// Broad statement category.
    StatementKind,
    variants: [
        (Ddl, "DDL"),
        (Dml, "DML"),
    ]
}

// ===========================================================================
// OperationTag
// ===========================================================================

define_str_enum! {
    /// The specific operation a statement performs. Drives matrix lookup.
    OperationTag,
    variants: [
        // Column operations
        (AddColumn, "add_column"),
        (DropColumn, "drop_column"),
        (ModifyColumn, "modify_column"),
        (ChangeColumn, "change_column"),
        // Index operations
        (AddIndex, "add_index"),
        (AddFulltextIndex, "add_fulltext_index"),
        (AddSpatialIndex, "add_spatial_index"),
        (DropIndex, "drop_index"),
        (RenameIndex, "rename_index"),
        (ChangeIndexType, "change_index_type"),
        // Constraints
        (AddForeignKey, "add_foreign_key"),
        (DropForeignKey, "drop_foreign_key"),
        (AddCheckConstraint, "add_check_constraint"),
        (DropCheckConstraint, "drop_check_constraint"),
        (AddPrimaryKey, "add_primary_key"),
        (DropPrimaryKey, "drop_primary_key"),
        (ReplacePrimaryKey, "replace_primary_key"),
        // Table-level operations
        (RenameTable, "rename_table"),
        (SetDefault, "set_default"),
        (DropDefault, "drop_default"),
        (ChangeAutoIncrement, "change_auto_increment"),
        (ChangeTableStats, "change_table_stats"),
        (ChangeRowFormat, "change_row_format"),
        (ChangeKeyBlockSize, "change_key_block_size"),
        (ForceRebuild, "force_rebuild"),
        (OptimizeTable, "optimize_table"),
        (ChangeEngine, "change_engine"),
        (ConvertCharset, "convert_charset"),
        (ChangeDefaultCharset, "change_default_charset"),
        (ToggleEncryption, "toggle_encryption"),
        // Tablespace / partition operations
        (RenameTablespace, "rename_tablespace"),
        (AddPartition, "add_partition"),
        (DropPartition, "drop_partition"),
        (ReorganizePartition, "reorganize_partition"),
        (RebuildPartition, "rebuild_partition"),
        (TruncatePartition, "truncate_partition"),
        // Compound / fallback
        (MultipleOps, "multiple_ops"),
        (OtherDdl, "other_ddl"),
        // DML
        (Insert, "insert"),
        (Update, "update"),
        (Delete, "delete"),
        (Replace, "replace"),
        (Select, "select"),
    ]
}

impl OperationTag {
    /// Returns `true` for DML operations.
    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            Self::Insert | Self::Update | Self::Delete | Self::Replace | Self::Select
        )
    }

    /// Returns `true` for DDL operations.
    pub fn is_ddl(&self) -> bool {
        !self.is_dml()
    }

    /// Returns `true` for operations that act on a named column.
    pub fn is_column_op(&self) -> bool {
        matches!(
            self,
            Self::AddColumn | Self::DropColumn | Self::ModifyColumn | Self::ChangeColumn
        )
    }

    /// Returns `true` for partition maintenance operations.
    pub fn is_partition_op(&self) -> bool {
        matches!(
            self,
            Self::AddPartition
                | Self::DropPartition
                | Self::ReorganizePartition
                | Self::RebuildPartition
                | Self::TruncatePartition
        )
    }

    /// Human-readable label, as it appears in SQL.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::AddColumn => "ADD COLUMN",
            Self::DropColumn => "DROP COLUMN",
            Self::ModifyColumn => "MODIFY COLUMN",
            Self::ChangeColumn => "CHANGE COLUMN",
            Self::AddIndex => "ADD INDEX",
            Self::AddFulltextIndex => "ADD FULLTEXT INDEX",
            Self::AddSpatialIndex => "ADD SPATIAL INDEX",
            Self::DropIndex => "DROP INDEX",
            Self::RenameIndex => "RENAME INDEX",
            Self::ChangeIndexType => "CHANGE INDEX TYPE",
            Self::AddForeignKey => "ADD FOREIGN KEY",
            Self::DropForeignKey => "DROP FOREIGN KEY",
            Self::AddCheckConstraint => "ADD CHECK CONSTRAINT",
            Self::DropCheckConstraint => "DROP CHECK CONSTRAINT",
            Self::AddPrimaryKey => "ADD PRIMARY KEY",
            Self::DropPrimaryKey => "DROP PRIMARY KEY",
            Self::ReplacePrimaryKey => "REPLACE PRIMARY KEY",
            Self::RenameTable => "RENAME TABLE",
            Self::SetDefault => "SET DEFAULT",
            Self::DropDefault => "DROP DEFAULT",
            Self::ChangeAutoIncrement => "CHANGE AUTO_INCREMENT",
            Self::ChangeTableStats => "CHANGE TABLE STATS",
            Self::ChangeRowFormat => "CHANGE ROW_FORMAT",
            Self::ChangeKeyBlockSize => "CHANGE KEY_BLOCK_SIZE",
            Self::ForceRebuild => "FORCE REBUILD",
            Self::OptimizeTable => "OPTIMIZE TABLE",
            Self::ChangeEngine => "CHANGE ENGINE",
            Self::ConvertCharset => "CONVERT CHARACTER SET",
            Self::ChangeDefaultCharset => "CHANGE DEFAULT CHARACTER SET",
            Self::ToggleEncryption => "TABLE ENCRYPTION",
            Self::RenameTablespace => "ALTER TABLESPACE RENAME",
            Self::AddPartition => "ADD PARTITION",
            Self::DropPartition => "DROP PARTITION",
            Self::ReorganizePartition => "REORGANIZE PARTITION",
            Self::RebuildPartition => "REBUILD PARTITION",
            Self::TruncatePartition => "TRUNCATE PARTITION",
            Self::MultipleOps => "MULTIPLE OPERATIONS",
            Self::OtherDdl => "OTHER DDL",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Replace => "REPLACE",
            Self::Select => "SELECT",
        }
    }
}
