//! Disk-space estimation for the selected execution plan.

use dbsafe_core::classification::DdlClassification;
use dbsafe_core::enums::{Algorithm, ExecutionMethod};
use dbsafe_core::format::human_bytes;
use dbsafe_core::metadata::TableMetadata;
use dbsafe_core::report::DiskEstimate;

/// Below this nothing is worth reporting: any healthy server has the headroom.
pub const REPORTING_GATE: u64 = 100 * 1024 * 1024;

/// Estimates the temporary disk space a DDL needs, if enough to mention.
///
/// INSTANT changes and DML produce nothing (the caller never invokes this
/// for DML). Everything else scales with the table: an index re-create
/// needs the index bytes, a rebuild or copy needs the whole table again.
pub fn estimate(
    classification: &DdlClassification,
    method: ExecutionMethod,
    meta: &TableMetadata,
) -> Option<DiskEstimate> {
    let (required_bytes, reason) = match classification.algorithm {
        Algorithm::Instant => return None,
        Algorithm::Inplace if !classification.rebuilds_table => (
            meta.index_length,
            "indexes are re-created in temporary space during the operation".to_string(),
        ),
        Algorithm::Inplace => (
            meta.total_size(),
            "in-place rebuild writes a full copy of the table before swapping".to_string(),
        ),
        Algorithm::Copy | Algorithm::Depends => match method {
            ExecutionMethod::Ghost => (
                meta.total_size(),
                "gh-ost builds a full shadow table and tails the binlog until cut-over"
                    .to_string(),
            ),
            ExecutionMethod::PtOsc => (
                meta.total_size(),
                "pt-online-schema-change builds a full shadow table synced by triggers"
                    .to_string(),
            ),
            _ => (
                meta.total_size(),
                "table copy requires space for a complete duplicate".to_string(),
            ),
        },
    };

    if required_bytes < REPORTING_GATE {
        return None;
    }

    Some(DiskEstimate {
        required_bytes,
        required_human: human_bytes(required_bytes),
        reason,
    })
}
