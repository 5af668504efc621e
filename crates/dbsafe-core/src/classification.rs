//! DDL classification: the algorithm/lock/rebuild triple a statement maps to.

use serde::Serialize;

use crate::enums::{Algorithm, LockLevel};

/// How the server will execute a DDL operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DdlClassification {
    /// The ALTER algorithm the server will pick.
    pub algorithm: Algorithm,
    /// The metadata lock held while the operation runs.
    pub lock: LockLevel,
    /// Whether the operation rewrites the whole table.
    pub rebuilds_table: bool,
    /// Free-form context shown to the operator.
    pub notes: String,
}

impl DdlClassification {
    /// Creates a classification with the given fields.
    pub fn new(
        algorithm: Algorithm,
        lock: LockLevel,
        rebuilds_table: bool,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            algorithm,
            lock,
            rebuilds_table,
            notes: notes.into(),
        }
    }

    /// The conservative fallback used for anything outside the matrix:
    /// assume a full table copy under a shared lock.
    pub fn safe_default(notes: impl Into<String>) -> Self {
        Self::new(Algorithm::Copy, LockLevel::Shared, true, notes)
    }

    /// Combines two classifications the way a compound ALTER does: the
    /// strictest algorithm, the strictest lock, and a rebuild if either
    /// side rebuilds.
    pub fn fused_with(&self, other: &DdlClassification) -> DdlClassification {
        DdlClassification {
            algorithm: self.algorithm.strictest(other.algorithm),
            lock: self.lock.strictest(other.lock),
            rebuilds_table: self.rebuilds_table || other.rebuilds_table,
            notes: self.notes.clone(),
        }
    }

    /// Returns `true` if this is a metadata-only change.
    pub fn is_instant(&self) -> bool {
        self.algorithm == Algorithm::Instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_default_is_copy_shared_rebuild() {
        let c = DdlClassification::safe_default("not in matrix");
        assert_eq!(c.algorithm, Algorithm::Copy);
        assert_eq!(c.lock, LockLevel::Shared);
        assert!(c.rebuilds_table);
        assert_eq!(c.notes, "not in matrix");
    }

    #[test]
    fn fusion_takes_strictest_of_each_field() {
        let instant = DdlClassification::new(Algorithm::Instant, LockLevel::None, false, "a");
        let copy = DdlClassification::new(Algorithm::Copy, LockLevel::Shared, true, "b");
        let fused = instant.fused_with(&copy);
        assert_eq!(fused.algorithm, Algorithm::Copy);
        assert_eq!(fused.lock, LockLevel::Shared);
        assert!(fused.rebuilds_table);

        let inplace = DdlClassification::new(Algorithm::Inplace, LockLevel::Exclusive, false, "c");
        let fused = instant.fused_with(&inplace);
        assert_eq!(fused.algorithm, Algorithm::Inplace);
        assert_eq!(fused.lock, LockLevel::Exclusive);
        assert!(!fused.rebuilds_table);
    }
}
