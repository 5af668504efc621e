//! Topology overlay: cluster- and cloud-aware post-filtering.
//!
//! Runs after risk/method selection. May escalate risk, mutate the method,
//! and emit cluster warnings. Method is re-checked after every mutation so
//! interacting conditions (Aurora demoting GHOST, triggers, write-set
//! limits) cannot re-introduce a method an earlier step ruled out.

use dbsafe_core::enums::{Algorithm, ExecutionMethod, RiskLevel, StatementKind};
use dbsafe_core::format::human_bytes;
use dbsafe_core::report::{AnalysisReport, OperationDetails};
use dbsafe_core::topology::{GroupReplicationMode, OsuMethod, TopologyKind};

use crate::input::AnalysisInput;
use crate::risk;

/// Replica lag beyond which a warning is emitted, in seconds.
const REPLICA_LAG_WARN_SECS: u64 = 30;
/// Flow-control pause fraction beyond which the cluster is under pressure.
const FLOW_CONTROL_WARN: f64 = 0.01;

/// Applies the overlay for the input's topology to an otherwise-final report.
pub fn apply(report: &mut AnalysisReport, input: &AnalysisInput) {
    match input.topology.kind {
        TopologyKind::Standalone => {}
        TopologyKind::Galera => apply_galera(report, input),
        TopologyKind::GroupReplication => apply_group_replication(report, input),
        TopologyKind::AsyncReplica | TopologyKind::SemiSyncReplica => {
            apply_replica(report, input)
        }
        TopologyKind::AuroraWriter => apply_aurora_writer(report, input),
        TopologyKind::AuroraReader => apply_aurora_reader(report, input),
    }

    // RDS without Aurora still lacks SUPER; gh-ost needs extra flags there.
    if input.topology.is_cloud_managed
        && !input.topology.kind.is_aurora()
        && report.recommended_method == ExecutionMethod::Ghost
    {
        report.push_cluster_warning(
            "RDS detected: run gh-ost with --allow-on-master --assume-rbr (no SUPER privilege)",
        );
    }
}

// ---------------------------------------------------------------------------
// Galera / PXC
// ---------------------------------------------------------------------------

fn apply_galera(report: &mut AnalysisReport, input: &AnalysisInput) {
    let topo = &input.topology;

    if report.kind == StatementKind::Ddl {
        let non_instant = report
            .operation
            .as_ddl()
            .is_some_and(|d| d.classification.algorithm != Algorithm::Instant);
        let cluster_size = topo.galera_cluster_size.unwrap_or(0);
        if non_instant && topo.galera_osu_method == Some(OsuMethod::Toi) && cluster_size > 1 {
            report.push_cluster_warning(format!(
                "wsrep_OSU_method=TOI: this DDL will execute on ALL {} nodes \
                 simultaneously, stalling the whole cluster for its duration",
                cluster_size
            ));
        }
    }

    if report.kind == StatementKind::Dml {
        if let Some(max_ws) = topo.wsrep_max_ws_size {
            enforce_write_set_limit(report, input, max_ws, "wsrep_max_ws_size");
        }
    }

    if topo.flow_control_paused > FLOW_CONTROL_WARN {
        let pct = if topo.flow_control_paused_pct.is_empty() {
            format!("{:.1}%", topo.flow_control_paused * 100.0)
        } else {
            topo.flow_control_paused_pct.clone()
        };
        report.push_cluster_warning(format!(
            "Flow control paused {} of the time; the cluster is already under \
             replication pressure",
            pct
        ));
    }
}

// ---------------------------------------------------------------------------
// Group Replication
// ---------------------------------------------------------------------------

fn apply_group_replication(report: &mut AnalysisReport, input: &AnalysisInput) {
    let topo = &input.topology;

    if report.kind == StatementKind::Dml {
        if let Some(limit) = topo.gr_transaction_limit {
            enforce_write_set_limit(report, input, limit, "group_replication_transaction_size_limit");
        }
    }

    if report.kind == StatementKind::Ddl && topo.gr_mode == Some(GroupReplicationMode::MultiPrimary)
    {
        report.push_cluster_warning(
            "Group Replication is in MULTI-PRIMARY mode: concurrent conflicting DDL \
             on another primary can break the group",
        );
    }
}

// ---------------------------------------------------------------------------
// Async / semi-sync replicas
// ---------------------------------------------------------------------------

fn apply_replica(report: &mut AnalysisReport, input: &AnalysisInput) {
    if let Some(lag) = input.topology.replica_lag_secs {
        if lag > REPLICA_LAG_WARN_SECS {
            report.push_cluster_warning(format!(
                "Replica lag is {}s; this statement will push it further behind",
                lag
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Aurora
// ---------------------------------------------------------------------------

fn apply_aurora_writer(report: &mut AnalysisReport, input: &AnalysisInput) {
    let is_copy = report
        .operation
        .as_ddl()
        .is_some_and(|d| d.classification.algorithm == Algorithm::Copy);
    if is_copy {
        // The selector already avoids gh-ost on Aurora; keep the overlay
        // idempotent in case an earlier mutation put GHOST back.
        if report.recommended_method == ExecutionMethod::Ghost {
            report.recommended_method = ExecutionMethod::PtOsc;
        }
        if report.recommended_method == ExecutionMethod::PtOsc {
            report.alternative_method = None;
        }
        report.push_cluster_warning(
            "Aurora does not expose the binlog stream gh-ost tails; \
             pt-online-schema-change is the only online option",
        );
    }
    apply_replica(report, input);
}

fn apply_aurora_reader(report: &mut AnalysisReport, _input: &AnalysisInput) {
    if report.kind == StatementKind::Ddl {
        report.push_cluster_warning(
            "Target appears to be a READ REPLICA (Aurora reader); run DDL on the \
             writer endpoint",
        );
    }
}

// ---------------------------------------------------------------------------
// Shared write-set enforcement
// ---------------------------------------------------------------------------

fn enforce_write_set_limit(
    report: &mut AnalysisReport,
    input: &AnalysisInput,
    limit: u64,
    limit_name: &str,
) {
    let (write_set, affected) = match report.operation.as_dml() {
        // Reads replicate nothing; only writes build a write-set.
        Some(d) if d.operation != dbsafe_core::enums::OperationTag::Select => {
            (d.write_set_size, d.affected_rows)
        }
        _ => return,
    };
    if write_set <= limit {
        return;
    }

    report.push_cluster_warning(format!(
        "Estimated write-set {} EXCEEDS {} ({}); the transaction would be rejected \
         by the cluster",
        human_bytes(write_set),
        limit_name,
        human_bytes(limit)
    ));
    report.raise_risk(RiskLevel::Dangerous);

    if report.recommended_method != ExecutionMethod::Chunked {
        report.recommended_method = ExecutionMethod::Chunked;
        if let OperationDetails::Dml(details) = &mut report.operation {
            details.chunk_count = Some(risk::chunk_count(affected, input.chunk_size));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dbsafe_core::classification::DdlClassification;
    use dbsafe_core::enums::{LockLevel, OperationTag};
    use dbsafe_core::metadata::TableMetadata;
    use dbsafe_core::report::{DdlDetails, DmlDetails, RollbackPlan};
    use dbsafe_core::statement::ParsedStatement;
    use dbsafe_core::topology::TopologyInfo;
    use dbsafe_core::version::ServerVersion;

    fn base_meta() -> TableMetadata {
        TableMetadata {
            database: "app".into(),
            table: "orders".into(),
            engine: "InnoDB".into(),
            row_count: 1_000_000,
            avg_row_length: 200,
            data_length: 200_000_000,
            index_length: 20_000_000,
            columns: vec![],
            indexes: vec![],
            foreign_keys: vec![],
            triggers: vec![],
            partitioned: false,
        }
    }

    fn ddl_report(algorithm: Algorithm, method: ExecutionMethod) -> AnalysisReport {
        AnalysisReport {
            statement: String::new(),
            kind: StatementKind::Ddl,
            database: "app".into(),
            table: "orders".into(),
            risk: RiskLevel::Caution,
            recommended_method: method,
            alternative_method: (method == ExecutionMethod::Ghost)
                .then_some(ExecutionMethod::PtOsc),
            recommendation: String::new(),
            operation: OperationDetails::Ddl(DdlDetails {
                operation: OperationTag::ModifyColumn,
                classification: DdlClassification::new(algorithm, LockLevel::Shared, true, ""),
                sub_operations: vec![],
            }),
            warnings: vec![],
            cluster_warnings: vec![],
            rollback: RollbackPlan::default(),
            generated_script: None,
            execution_command: None,
            disk_estimate: None,
            idempotent_script: None,
            idempotent_note: None,
            topology: TopologyInfo::standalone(),
            analyzed_at: Utc::now(),
        }
    }

    fn dml_report(affected: u64, write_set: u64) -> AnalysisReport {
        let mut r = ddl_report(Algorithm::Copy, ExecutionMethod::Direct);
        r.kind = StatementKind::Dml;
        r.operation = OperationDetails::Dml(DmlDetails {
            operation: OperationTag::Update,
            affected_rows: affected,
            affected_pct: 10.0,
            write_set_size: write_set,
            has_where: true,
            chunk_size: 10_000,
            chunk_count: None,
        });
        r
    }

    fn input_with(topology: TopologyInfo, parsed_kind: StatementKind) -> AnalysisInput {
        let parsed = ParsedStatement {
            kind: parsed_kind,
            ..Default::default()
        };
        AnalysisInput::new(parsed, base_meta(), ServerVersion::new(8, 0, 35), topology)
    }

    #[test]
    fn standalone_is_a_noop() {
        let mut report = ddl_report(Algorithm::Copy, ExecutionMethod::Ghost);
        let input = input_with(TopologyInfo::standalone(), StatementKind::Ddl);
        apply(&mut report, &input);
        assert!(report.cluster_warnings.is_empty());
        assert_eq!(report.recommended_method, ExecutionMethod::Ghost);
    }

    #[test]
    fn galera_toi_warns_for_non_instant_ddl() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::Galera;
        topo.galera_cluster_size = Some(3);
        topo.galera_osu_method = Some(OsuMethod::Toi);

        let mut report = ddl_report(Algorithm::Copy, ExecutionMethod::PtOsc);
        apply(&mut report, &input_with(topo.clone(), StatementKind::Ddl));
        assert!(report.cluster_warnings.iter().any(|w| w.contains("TOI")));
        assert!(report.cluster_warnings.iter().any(|w| w.contains("ALL 3 nodes")));

        // INSTANT DDL commits on every node without stalling: no warning.
        let mut report = ddl_report(Algorithm::Instant, ExecutionMethod::Direct);
        apply(&mut report, &input_with(topo, StatementKind::Ddl));
        assert!(report.cluster_warnings.is_empty());
    }

    #[test]
    fn galera_write_set_limit_forces_chunking() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::Galera;
        topo.wsrep_max_ws_size = Some(2_000_000_000);

        // 50M rows x 200 bytes = 10 GB write-set, over the 2 GB limit.
        let mut report = dml_report(50_000_000, 10_000_000_000);
        apply(&mut report, &input_with(topo, StatementKind::Dml));
        assert_eq!(report.risk, RiskLevel::Dangerous);
        assert_eq!(report.recommended_method, ExecutionMethod::Chunked);
        assert!(report
            .cluster_warnings
            .iter()
            .any(|w| w.contains("EXCEEDS wsrep_max_ws_size")));
        assert_eq!(
            report.operation.as_dml().unwrap().chunk_count,
            Some(5_000)
        );
    }

    #[test]
    fn galera_small_write_set_passes() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::Galera;
        topo.wsrep_max_ws_size = Some(2_000_000_000);

        let mut report = dml_report(1_000, 200_000);
        apply(&mut report, &input_with(topo, StatementKind::Dml));
        assert!(report.cluster_warnings.is_empty());
        assert_eq!(report.recommended_method, ExecutionMethod::Direct);
    }

    #[test]
    fn galera_flow_control_pressure_warns() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::Galera;
        topo.flow_control_paused = 0.125;
        topo.flow_control_paused_pct = "12.5%".into();

        let mut report = ddl_report(Algorithm::Instant, ExecutionMethod::Direct);
        apply(&mut report, &input_with(topo, StatementKind::Ddl));
        assert!(report
            .cluster_warnings
            .iter()
            .any(|w| w.contains("Flow control paused 12.5%")));
    }

    #[test]
    fn group_replication_multi_primary_ddl_warns() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::GroupReplication;
        topo.gr_mode = Some(GroupReplicationMode::MultiPrimary);

        let mut report = ddl_report(Algorithm::Copy, ExecutionMethod::Ghost);
        apply(&mut report, &input_with(topo, StatementKind::Ddl));
        assert!(report
            .cluster_warnings
            .iter()
            .any(|w| w.contains("MULTI-PRIMARY")));
    }

    #[test]
    fn group_replication_transaction_limit_enforced() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::GroupReplication;
        topo.gr_transaction_limit = Some(150_000_000);

        let mut report = dml_report(10_000_000, 2_000_000_000);
        apply(&mut report, &input_with(topo, StatementKind::Dml));
        assert_eq!(report.recommended_method, ExecutionMethod::Chunked);
        assert!(report
            .cluster_warnings
            .iter()
            .any(|w| w.contains("group_replication_transaction_size_limit")));
    }

    #[test]
    fn replica_lag_warns_past_threshold() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::AsyncReplica;
        topo.replica_lag_secs = Some(120);

        let mut report = ddl_report(Algorithm::Instant, ExecutionMethod::Direct);
        apply(&mut report, &input_with(topo.clone(), StatementKind::Ddl));
        assert!(report.cluster_warnings.iter().any(|w| w.contains("120s")));

        topo.replica_lag_secs = Some(5);
        let mut report = ddl_report(Algorithm::Instant, ExecutionMethod::Direct);
        apply(&mut report, &input_with(topo, StatementKind::Ddl));
        assert!(report.cluster_warnings.is_empty());
    }

    #[test]
    fn aurora_writer_demotes_ghost_and_clears_alternative() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::AuroraWriter;

        let mut report = ddl_report(Algorithm::Copy, ExecutionMethod::Ghost);
        apply(&mut report, &input_with(topo, StatementKind::Ddl));
        assert_eq!(report.recommended_method, ExecutionMethod::PtOsc);
        assert_eq!(report.alternative_method, None);
        assert!(report.cluster_warnings.iter().any(|w| w.contains("binlog")));
    }

    #[test]
    fn aurora_reader_warns_on_any_ddl() {
        let mut topo = TopologyInfo::standalone();
        topo.kind = TopologyKind::AuroraReader;

        let mut report = ddl_report(Algorithm::Instant, ExecutionMethod::Direct);
        apply(&mut report, &input_with(topo, StatementKind::Ddl));
        assert!(report
            .cluster_warnings
            .iter()
            .any(|w| w.contains("READ REPLICA")));
    }

    #[test]
    fn rds_ghost_gets_allow_on_master_advisory() {
        let mut topo = TopologyInfo::standalone();
        topo.is_cloud_managed = true;
        topo.cloud_provider = "aws-rds".into();

        let mut report = ddl_report(Algorithm::Copy, ExecutionMethod::Ghost);
        apply(&mut report, &input_with(topo, StatementKind::Ddl));
        assert!(report
            .cluster_warnings
            .iter()
            .any(|w| w.contains("--allow-on-master")));
    }
}
