//! Property tests for the engine's universal invariants.

use proptest::prelude::*;

use dbsafe_core::classification::DdlClassification;
use dbsafe_core::enums::{Algorithm, ExecutionMethod, LockLevel, OperationTag};
use dbsafe_core::metadata::TableMetadata;
use dbsafe_core::statement::ParsedStatement;
use dbsafe_core::topology::{TopologyInfo, TopologyKind};
use dbsafe_core::version::VersionEra;
use dbsafe_engine::{disk, matrix, overrides, risk};

fn meta(data: u64, index: u64) -> TableMetadata {
    TableMetadata {
        database: "app".into(),
        table: "t".into(),
        engine: "InnoDB".into(),
        row_count: 0,
        avg_row_length: 0,
        data_length: data,
        index_length: index,
        columns: vec![],
        indexes: vec![],
        foreign_keys: vec![],
        triggers: vec![],
        partitioned: false,
    }
}

// ---------------------------------------------------------------------------
// Matrix totality
// ---------------------------------------------------------------------------

#[test]
fn matrix_is_total_over_all_tags_and_eras() {
    for op in OperationTag::ALL {
        for era in VersionEra::ALL {
            let c = matrix::classify(*op, *era);
            // Every field populated; notes never empty.
            assert!(!c.notes.is_empty(), "{:?}/{:?}", op, era);
        }
    }
}

#[test]
fn tags_outside_the_matrix_get_the_safe_default() {
    for op in [
        OperationTag::Insert,
        OperationTag::Update,
        OperationTag::Delete,
        OperationTag::Replace,
        OperationTag::Select,
    ] {
        for era in VersionEra::ALL {
            let c = matrix::classify(op, *era);
            assert_eq!(c.algorithm, Algorithm::Copy);
            assert_eq!(c.lock, LockLevel::Shared);
            assert!(c.rebuilds_table);
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn any_algorithm() -> impl Strategy<Value = Algorithm> {
    prop::sample::select(Algorithm::ALL.to_vec())
}

fn any_lock() -> impl Strategy<Value = LockLevel> {
    prop::sample::select(LockLevel::ALL.to_vec())
}

fn ddl_tags() -> Vec<OperationTag> {
    OperationTag::ALL
        .iter()
        .copied()
        .filter(|t| t.is_ddl() && *t != OperationTag::MultipleOps)
        .collect()
}

proptest! {
    // Risk is monotone in total_size: growing the table never lowers risk.
    #[test]
    fn risk_is_monotone_in_table_size(
        algorithm in any_algorithm(),
        lock in any_lock(),
        rebuilds in any::<bool>(),
        size_a in 0u64..(20u64 << 30),
        size_b in 0u64..(20u64 << 30),
    ) {
        let (small, large) = if size_a <= size_b { (size_a, size_b) } else { (size_b, size_a) };
        let c = DdlClassification::new(algorithm, lock, rebuilds, "");
        let low = risk::ddl_risk(&c, small);
        let high = risk::ddl_risk(&c, large);
        prop_assert!(high.is_at_least(low), "{:?} -> {:?} as size grew", low, high);
    }

    // INSTANT never produces a disk estimate, at any size or method.
    #[test]
    fn instant_never_estimates_disk(
        lock in any_lock(),
        data in 0u64..(20u64 << 30),
        index in 0u64..(4u64 << 30),
    ) {
        let c = DdlClassification::new(Algorithm::Instant, lock, false, "");
        for method in ExecutionMethod::ALL {
            prop_assert!(disk::estimate(&c, *method, &meta(data, index)).is_none());
        }
    }

    // Galera and Aurora never see GHOST; the alternative is always cleared.
    #[test]
    fn cluster_topologies_never_route_to_ghost(
        algorithm in any_algorithm(),
        lock in any_lock(),
        rebuilds in any::<bool>(),
        kind in prop::sample::select(vec![
            TopologyKind::Galera,
            TopologyKind::AuroraWriter,
            TopologyKind::AuroraReader,
        ]),
    ) {
        let c = DdlClassification::new(algorithm, lock, rebuilds, "");
        let mut topo = TopologyInfo::standalone();
        topo.kind = kind;
        let (method, alternative) = risk::ddl_method(&c, &topo, false);
        prop_assert_ne!(method, ExecutionMethod::Ghost);
        if method == ExecutionMethod::PtOsc {
            prop_assert_eq!(alternative, None);
        }
    }

    // Triggers block gh-ost regardless of everything else.
    #[test]
    fn triggers_block_ghost(
        algorithm in any_algorithm(),
        lock in any_lock(),
        rebuilds in any::<bool>(),
    ) {
        let c = DdlClassification::new(algorithm, lock, rebuilds, "");
        let (method, _) = risk::ddl_method(&c, &TopologyInfo::standalone(), true);
        prop_assert_ne!(method, ExecutionMethod::Ghost);
    }

    // Fusion: the compound classification is exactly the strictest of its
    // sub-operations, field by field.
    #[test]
    fn fusion_is_the_strictest_of_sub_ops(
        tags in prop::collection::vec(prop::sample::select(ddl_tags()), 2..6),
        era in prop::sample::select(VersionEra::ALL.to_vec()),
    ) {
        let parsed = ParsedStatement {
            op_tag: OperationTag::MultipleOps,
            sub_operations: tags.clone(),
            ..Default::default()
        };
        let m = meta(0, 0);
        let input = overrides::RuleInput {
            parsed: &parsed,
            meta: &m,
            era,
            fk_checks_disabled: true,
        };
        let out = overrides::apply(matrix::classify(OperationTag::MultipleOps, era), &input);

        let strictest_algorithm = tags
            .iter()
            .map(|t| matrix::classify(*t, era).algorithm)
            .max_by_key(|a| a.strictness())
            .unwrap();
        let strictest_lock = tags
            .iter()
            .map(|t| matrix::classify(*t, era).lock)
            .max_by_key(|l| l.strictness())
            .unwrap();
        let any_rebuild = tags
            .iter()
            .any(|t| matrix::classify(*t, era).rebuilds_table);

        prop_assert_eq!(out.classification.algorithm, strictest_algorithm);
        prop_assert_eq!(out.classification.lock, strictest_lock);
        prop_assert_eq!(out.classification.rebuilds_table, any_rebuild);
        prop_assert_eq!(out.sub_results.len(), tags.len());
    }

    // chunk_count is exact ceiling division.
    #[test]
    fn chunk_count_is_ceiling(
        affected in 1u64..100_000_000,
        chunk_size in 1u64..1_000_000,
    ) {
        let count = risk::chunk_count(affected, chunk_size);
        prop_assert!(count * chunk_size >= affected);
        prop_assert!((count - 1) * chunk_size < affected);
    }
}
