//! Risk bands and execution-method selection.

use dbsafe_core::classification::DdlClassification;
use dbsafe_core::enums::{Algorithm, ExecutionMethod, LockLevel, RiskLevel};
use dbsafe_core::topology::TopologyInfo;

/// 1 GiB: the rebuild/copy danger threshold.
pub const GIB: u64 = 1024 * 1024 * 1024;
/// 10 GiB: where even a lock-free in-place change warrants caution.
pub const LARGE_INPLACE_BYTES: u64 = 10 * GIB;
/// DML row-count band edges.
pub const DML_SAFE_ROWS: u64 = 10_000;
pub const DML_CAUTION_ROWS: u64 = 100_000;

/// Selected risk and method, plus the chunk count when chunking applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub risk: RiskLevel,
    pub method: ExecutionMethod,
    pub alternative: Option<ExecutionMethod>,
    pub chunk_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

/// Risk band for a classified DDL against a table of `total_size` bytes.
pub fn ddl_risk(classification: &DdlClassification, total_size: u64) -> RiskLevel {
    match classification.algorithm {
        Algorithm::Instant => RiskLevel::Safe,
        Algorithm::Inplace => {
            if !classification.rebuilds_table && classification.lock == LockLevel::None {
                if total_size < LARGE_INPLACE_BYTES {
                    RiskLevel::Safe
                } else {
                    RiskLevel::Caution
                }
            } else if total_size < GIB {
                RiskLevel::Caution
            } else {
                RiskLevel::Dangerous
            }
        }
        // DEPENDS is judged like COPY: without certainty, assume the worst.
        Algorithm::Copy | Algorithm::Depends => {
            if total_size < GIB {
                RiskLevel::Caution
            } else {
                RiskLevel::Dangerous
            }
        }
    }
}

/// Execution method for a classified DDL.
///
/// COPY routes to gh-ost with pt-osc as the fallback, except where gh-ost
/// cannot run: Galera and Aurora lack the binlog stream it tails, and
/// triggers conflict with its cut-over.
pub fn ddl_method(
    classification: &DdlClassification,
    topology: &TopologyInfo,
    has_triggers: bool,
) -> (ExecutionMethod, Option<ExecutionMethod>) {
    match classification.algorithm {
        Algorithm::Instant | Algorithm::Inplace => (ExecutionMethod::Direct, None),
        Algorithm::Copy | Algorithm::Depends => {
            if topology.forces_ptosc() || has_triggers {
                (ExecutionMethod::PtOsc, None)
            } else {
                (ExecutionMethod::Ghost, Some(ExecutionMethod::PtOsc))
            }
        }
    }
}

/// Full DDL selection.
pub fn select_ddl(
    classification: &DdlClassification,
    total_size: u64,
    topology: &TopologyInfo,
    has_triggers: bool,
) -> Selection {
    let (method, alternative) = ddl_method(classification, topology, has_triggers);
    Selection {
        risk: ddl_risk(classification, total_size),
        method,
        alternative,
        chunk_count: None,
    }
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

/// Risk band from the affected-row count alone.
pub fn dml_row_band(affected_rows: u64) -> RiskLevel {
    if affected_rows <= DML_SAFE_ROWS {
        RiskLevel::Safe
    } else if affected_rows <= DML_CAUTION_ROWS {
        RiskLevel::Caution
    } else {
        RiskLevel::Dangerous
    }
}

/// Full DML selection.
///
/// A statement without WHERE floors at DANGEROUS; the floor relaxes to
/// CAUTION only when the row band itself lands there (a bounded mid-size
/// write), never when the count is small enough to look SAFE: rewriting an
/// entire table is never routine.
pub fn select_dml(affected_rows: u64, has_where: bool, chunk_size: u64) -> Selection {
    let band = dml_row_band(affected_rows);
    let risk = if !has_where && band != RiskLevel::Caution {
        band.at_least(RiskLevel::Dangerous)
    } else {
        band
    };

    if affected_rows > DML_CAUTION_ROWS {
        Selection {
            risk,
            method: ExecutionMethod::Chunked,
            alternative: None,
            chunk_count: Some(chunk_count(affected_rows, chunk_size)),
        }
    } else {
        Selection {
            risk,
            method: ExecutionMethod::Direct,
            alternative: None,
            chunk_count: None,
        }
    }
}

/// Ceiling division of rows into chunks.
pub fn chunk_count(affected_rows: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    affected_rows.div_ceil(chunk_size)
}
