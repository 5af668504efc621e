//! The DDL classification matrix: `(operation, era) -> classification`.
//!
//! This table encodes server-side algorithm/lock facts and is the
//! authoritative artifact of the engine. It is data, not code: every row
//! lists one cell per era, and lookup is a total function. Anything not in
//! the table classifies to the conservative default (COPY, SHARED lock,
//! full rebuild).

use std::collections::HashMap;
use std::sync::OnceLock;

use dbsafe_core::classification::DdlClassification;
use dbsafe_core::enums::{Algorithm, LockLevel, OperationTag};
use dbsafe_core::version::VersionEra;

use dbsafe_core::enums::Algorithm::{Copy, Depends, Inplace, Instant};
use dbsafe_core::enums::LockLevel::{Exclusive, None as NoLock, Shared};

// ---------------------------------------------------------------------------
// Row representation
// ---------------------------------------------------------------------------

/// One classification cell: what the server does for one operation in one era.
#[derive(Debug, Clone, Copy)]
struct Cell {
    algorithm: Algorithm,
    lock: LockLevel,
    rebuilds: bool,
    notes: &'static str,
}

const fn cell(algorithm: Algorithm, lock: LockLevel, rebuilds: bool, notes: &'static str) -> Cell {
    Cell {
        algorithm,
        lock,
        rebuilds,
        notes,
    }
}

/// One matrix row: cells indexed `[Early80, Instant80, Full80, Lts84]`.
#[derive(Debug, Clone, Copy)]
struct MatrixRow {
    op: OperationTag,
    cells: [Cell; 4],
    /// Minimum server version for the operation to exist at all.
    available_since: Option<(u32, u32, u32)>,
}

/// The same behavior in every era.
const fn uniform(c: Cell) -> [Cell; 4] {
    [c, c, c, c]
}

/// Behavior changed at 8.0.12 (the first INSTANT release).
const fn since_instant(older: Cell, newer: Cell) -> [Cell; 4] {
    [older, newer, newer, newer]
}

/// Behavior changed at 8.0.29 (INSTANT for any position / INSTANT drop).
const fn since_full(older: Cell, newer: Cell) -> [Cell; 4] {
    [older, older, newer, newer]
}

const fn row(op: OperationTag, cells: [Cell; 4]) -> MatrixRow {
    MatrixRow {
        op,
        cells,
        available_since: None,
    }
}

const fn row_since(op: OperationTag, cells: [Cell; 4], since: (u32, u32, u32)) -> MatrixRow {
    MatrixRow {
        op,
        cells,
        available_since: Some(since),
    }
}

// ---------------------------------------------------------------------------
// The matrix
// ---------------------------------------------------------------------------

static MATRIX: &[MatrixRow] = &[
    // -- Column operations ---------------------------------------------------
    row(
        OperationTag::AddColumn,
        since_instant(
            cell(Inplace, NoLock, false, "trailing column added in place"),
            cell(Instant, NoLock, false, "metadata-only for a trailing column"),
        ),
    ),
    row(
        OperationTag::DropColumn,
        since_full(
            cell(Inplace, NoLock, true, "drops the column with a full in-place rebuild"),
            cell(Instant, NoLock, false, "metadata-only since 8.0.29"),
        ),
    ),
    row(
        OperationTag::ModifyColumn,
        uniform(cell(
            Copy,
            Shared,
            true,
            "type change rewrites the table; contextual rules may relax this",
        )),
    ),
    row(
        OperationTag::ChangeColumn,
        since_full(
            cell(Inplace, NoLock, false, "rename-only; a type change escalates to COPY"),
            cell(Instant, NoLock, false, "rename-only is metadata-only since 8.0.29"),
        ),
    ),
    // -- Index operations ----------------------------------------------------
    row(
        OperationTag::AddIndex,
        uniform(cell(Inplace, NoLock, false, "B-tree built without blocking DML")),
    ),
    row(
        OperationTag::AddFulltextIndex,
        uniform(cell(
            Inplace,
            Shared,
            true,
            "the first FULLTEXT index rebuilds the table to add FTS_DOC_ID",
        )),
    ),
    row(
        OperationTag::AddSpatialIndex,
        uniform(cell(Inplace, Shared, false, "spatial index build blocks writes")),
    ),
    row(
        OperationTag::DropIndex,
        uniform(cell(Inplace, NoLock, false, "metadata-only")),
    ),
    row(
        OperationTag::RenameIndex,
        uniform(cell(Inplace, NoLock, false, "metadata-only")),
    ),
    row(
        OperationTag::ChangeIndexType,
        since_instant(
            cell(Inplace, NoLock, false, "drop + add under the same name"),
            cell(Instant, NoLock, false, "metadata-only drop + add under the same name"),
        ),
    ),
    // -- Constraints ---------------------------------------------------------
    row(
        OperationTag::AddForeignKey,
        uniform(cell(
            Inplace,
            NoLock,
            false,
            "assumes foreign_key_checks=0; with checks on, existing rows are validated",
        )),
    ),
    row(
        OperationTag::DropForeignKey,
        uniform(cell(Inplace, NoLock, false, "metadata-only")),
    ),
    row_since(
        OperationTag::AddCheckConstraint,
        uniform(cell(Inplace, NoLock, false, "existing rows validated without a rebuild")),
        (8, 0, 16),
    ),
    row_since(
        OperationTag::DropCheckConstraint,
        uniform(cell(Inplace, NoLock, false, "metadata-only")),
        (8, 0, 16),
    ),
    row(
        OperationTag::AddPrimaryKey,
        uniform(cell(
            Inplace,
            NoLock,
            true,
            "clustered index change rebuilds the table in place",
        )),
    ),
    row(
        OperationTag::DropPrimaryKey,
        uniform(cell(Copy, Shared, true, "dropping the clustered index forces a copy")),
    ),
    row(
        OperationTag::ReplacePrimaryKey,
        uniform(cell(
            Inplace,
            NoLock,
            true,
            "DROP + ADD PRIMARY KEY in one ALTER rebuilds in place",
        )),
    ),
    // -- Table-level metadata ------------------------------------------------
    row(
        OperationTag::RenameTable,
        uniform(cell(Instant, NoLock, false, "metadata-only")),
    ),
    row(
        OperationTag::SetDefault,
        uniform(cell(Instant, NoLock, false, "metadata-only")),
    ),
    row(
        OperationTag::DropDefault,
        uniform(cell(Instant, NoLock, false, "metadata-only")),
    ),
    row(
        OperationTag::ChangeAutoIncrement,
        uniform(cell(Inplace, NoLock, false, "updates a memory-resident counter")),
    ),
    row(
        OperationTag::ChangeTableStats,
        uniform(cell(Inplace, NoLock, false, "STATS_* options are metadata-only")),
    ),
    row_since(
        OperationTag::RenameTablespace,
        uniform(cell(Inplace, NoLock, false, "tablespace rename without data movement")),
        (8, 0, 21),
    ),
    // -- Rebuild-class table options -----------------------------------------
    row(
        OperationTag::ChangeRowFormat,
        uniform(cell(Inplace, NoLock, true, "row format change rewrites every row")),
    ),
    row(
        OperationTag::ChangeKeyBlockSize,
        uniform(cell(Inplace, NoLock, true, "page compression change rewrites every page")),
    ),
    row(
        OperationTag::ForceRebuild,
        uniform(cell(Inplace, NoLock, true, "null rebuild in place")),
    ),
    row(
        OperationTag::OptimizeTable,
        uniform(cell(Inplace, NoLock, true, "maps to ALTER TABLE ... FORCE for InnoDB")),
    ),
    row(
        OperationTag::ChangeEngine,
        uniform(cell(
            Copy,
            Shared,
            true,
            "cross-engine conversion copies every row; same-engine detects as FORCE",
        )),
    ),
    row(
        OperationTag::ConvertCharset,
        uniform(cell(
            Copy,
            Shared,
            true,
            "converts every string column; INPLACE exists only without indexed string columns",
        )),
    ),
    row(
        OperationTag::ChangeDefaultCharset,
        uniform(cell(
            Instant,
            NoLock,
            false,
            "default charset applies to future columns only",
        )),
    ),
    row(
        OperationTag::ToggleEncryption,
        uniform(cell(Copy, Shared, true, "encrypting or decrypting rewrites the tablespace")),
    ),
    // -- Partition maintenance -----------------------------------------------
    row(
        OperationTag::AddPartition,
        uniform(cell(Inplace, NoLock, false, "new empty partition")),
    ),
    row(
        OperationTag::DropPartition,
        uniform(cell(Inplace, NoLock, false, "partition data is discarded, not copied")),
    ),
    row(
        OperationTag::ReorganizePartition,
        uniform(cell(Inplace, Shared, false, "rows move between affected partitions")),
    ),
    row(
        OperationTag::RebuildPartition,
        uniform(cell(Inplace, Shared, false, "affected partitions are rebuilt")),
    ),
    row(
        OperationTag::TruncatePartition,
        uniform(cell(Inplace, Exclusive, false, "takes an exclusive lock while truncating")),
    ),
    // -- Compound / fallback -------------------------------------------------
    row(
        OperationTag::MultipleOps,
        uniform(cell(Depends, LockLevel::Depends, false, "classified from sub-operations")),
    ),
    row(
        OperationTag::OtherDdl,
        uniform(cell(Copy, Shared, true, "not in matrix")),
    ),
];

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

fn era_index(era: VersionEra) -> usize {
    match era {
        VersionEra::Early80 => 0,
        VersionEra::Instant80 => 1,
        VersionEra::Full80 => 2,
        VersionEra::Lts84 => 3,
    }
}

fn table() -> &'static HashMap<OperationTag, &'static MatrixRow> {
    static TABLE: OnceLock<HashMap<OperationTag, &'static MatrixRow>> = OnceLock::new();
    TABLE.get_or_init(|| MATRIX.iter().map(|r| (r.op, r)).collect())
}

/// Classifies one operation for one era. Total: operations outside the
/// matrix (including DML tags, which never belong in it) come back as the
/// conservative default.
pub fn classify(op: OperationTag, era: VersionEra) -> DdlClassification {
    match table().get(&op) {
        Some(r) => {
            let c = r.cells[era_index(era)];
            DdlClassification::new(c.algorithm, c.lock, c.rebuilds, c.notes)
        }
        None => DdlClassification::safe_default("not in matrix"),
    }
}

/// The minimum server version at which the operation exists, when gated.
pub fn available_since(op: OperationTag) -> Option<(u32, u32, u32)> {
    table().get(&op).and_then(|r| r.available_since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_op_has_every_era() {
        for r in MATRIX {
            for era in VersionEra::ALL {
                let c = classify(r.op, *era);
                assert!(!c.notes.is_empty(), "{:?}/{:?} has empty notes", r.op, era);
            }
        }
    }

    #[test]
    fn no_duplicate_rows() {
        let mut seen = std::collections::HashSet::new();
        for r in MATRIX {
            assert!(seen.insert(r.op), "duplicate matrix row for {:?}", r.op);
        }
    }

    #[test]
    fn unknown_op_is_safe_default() {
        // DML tags are never in the matrix; they exercise the default path.
        let c = classify(OperationTag::Delete, VersionEra::Full80);
        assert_eq!(c.algorithm, Algorithm::Copy);
        assert_eq!(c.lock, LockLevel::Shared);
        assert!(c.rebuilds_table);
        assert_eq!(c.notes, "not in matrix");
    }

    #[test]
    fn add_column_became_instant_at_8_0_12() {
        let early = classify(OperationTag::AddColumn, VersionEra::Early80);
        assert_eq!(early.algorithm, Algorithm::Inplace);
        for era in [VersionEra::Instant80, VersionEra::Full80, VersionEra::Lts84] {
            assert_eq!(classify(OperationTag::AddColumn, era).algorithm, Algorithm::Instant);
        }
    }

    #[test]
    fn drop_column_became_instant_at_8_0_29() {
        for era in [VersionEra::Early80, VersionEra::Instant80] {
            let c = classify(OperationTag::DropColumn, era);
            assert_eq!(c.algorithm, Algorithm::Inplace);
            assert!(c.rebuilds_table);
        }
        for era in [VersionEra::Full80, VersionEra::Lts84] {
            let c = classify(OperationTag::DropColumn, era);
            assert_eq!(c.algorithm, Algorithm::Instant);
            assert!(!c.rebuilds_table);
        }
    }

    #[test]
    fn modify_column_is_always_copy() {
        for era in VersionEra::ALL {
            let c = classify(OperationTag::ModifyColumn, *era);
            assert_eq!(c.algorithm, Algorithm::Copy);
            assert_eq!(c.lock, LockLevel::Shared);
            assert!(c.rebuilds_table);
        }
    }

    #[test]
    fn primary_key_rows() {
        let add = classify(OperationTag::AddPrimaryKey, VersionEra::Full80);
        assert_eq!(add.algorithm, Algorithm::Inplace);
        assert!(add.rebuilds_table);
        let drop = classify(OperationTag::DropPrimaryKey, VersionEra::Full80);
        assert_eq!(drop.algorithm, Algorithm::Copy);
        assert!(drop.rebuilds_table);
        let replace = classify(OperationTag::ReplacePrimaryKey, VersionEra::Full80);
        assert_eq!(replace.algorithm, Algorithm::Inplace);
        assert!(replace.rebuilds_table);
    }

    #[test]
    fn truncate_partition_takes_exclusive_lock() {
        let c = classify(OperationTag::TruncatePartition, VersionEra::Lts84);
        assert_eq!(c.lock, LockLevel::Exclusive);
    }

    #[test]
    fn version_gated_rows() {
        assert_eq!(available_since(OperationTag::RenameTablespace), Some((8, 0, 21)));
        assert_eq!(available_since(OperationTag::AddCheckConstraint), Some((8, 0, 16)));
        assert_eq!(available_since(OperationTag::AddColumn), None);
    }

    #[test]
    fn fulltext_is_conservative_rebuild_in_every_era() {
        for era in VersionEra::ALL {
            let c = classify(OperationTag::AddFulltextIndex, *era);
            assert_eq!(c.lock, LockLevel::Shared);
            assert!(c.rebuilds_table);
        }
    }
}
