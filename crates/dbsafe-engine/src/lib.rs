//! The dbsafe decision engine.
//!
//! One [`AnalysisInput`] in, one [`AnalysisReport`] out. The engine is
//! pure: no I/O, no retries, no errors. Everything recoverable becomes a
//! warning inside the report, and risk only ever ratchets upward.
//!
//! Stage order is fixed: matrix lookup, contextual overrides, risk/method
//! selection, topology overlay, then synthesis (rollback, scripts,
//! wrapper, disk estimate) against the final classification and method.

pub mod disk;
pub mod input;
pub mod matrix;
pub mod overlay;
pub mod overrides;
pub mod risk;
pub mod rollback;
pub mod script;
pub mod wrapper;

use chrono::Utc;

use dbsafe_core::enums::{
    ExecutionMethod, OperationTag, RiskLevel, StatementKind,
};
use dbsafe_core::format::{format_number, human_bytes};
use dbsafe_core::report::{
    AnalysisReport, DdlDetails, DmlDetails, OperationDetails, RollbackPlan,
};

pub use input::{AnalysisInput, DEFAULT_CHUNK_SIZE};
pub use wrapper::WrapperOutcome;

/// Analyzes one statement against its snapshots.
pub fn analyze(input: &AnalysisInput) -> AnalysisReport {
    if input.parsed.op_tag.is_dml() {
        analyze_dml(input)
    } else {
        analyze_ddl(input)
    }
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

fn analyze_ddl(input: &AnalysisInput) -> AnalysisReport {
    let parsed = &input.parsed;
    let era = input.version.era();
    tracing::debug!(op = %parsed.op_tag, era = %era, "classifying DDL");

    let base = matrix::classify(parsed.op_tag, era);

    let rule_input = overrides::RuleInput {
        parsed,
        meta: &input.meta,
        era,
        fk_checks_disabled: input.foreign_key_checks_disabled,
    };
    let outcome = overrides::apply(base, &rule_input);

    let selection = risk::select_ddl(
        &outcome.classification,
        input.meta.total_size(),
        &input.topology,
        input.meta.has_triggers(),
    );

    let mut report = AnalysisReport {
        statement: parsed.raw_sql.clone(),
        kind: StatementKind::Ddl,
        database: parsed.database.clone(),
        table: parsed.table.clone(),
        risk: selection.risk.at_least(outcome.risk_floor),
        recommended_method: selection.method,
        alternative_method: selection.alternative,
        recommendation: String::new(),
        operation: OperationDetails::Ddl(DdlDetails {
            operation: parsed.op_tag,
            classification: outcome.classification.clone(),
            sub_operations: outcome.sub_results,
        }),
        warnings: outcome.warnings,
        cluster_warnings: vec![],
        rollback: RollbackPlan::default(),
        generated_script: None,
        execution_command: None,
        disk_estimate: None,
        idempotent_script: None,
        idempotent_note: None,
        topology: input.topology.clone(),
        analyzed_at: Utc::now(),
    };

    // Operations the target server predates always fail; still classified so
    // the operator sees what a supported server would do.
    if let Some((major, minor, patch)) = matrix::available_since(parsed.op_tag) {
        if !input.version.at_least(major, minor, patch) {
            report.push_warning(format!(
                "{} requires MySQL {}.{}.{} or later (server is {})",
                parsed.op_tag.describe(),
                major,
                minor,
                patch,
                input.version
            ));
            report.raise_risk(RiskLevel::Dangerous);
        }
    }

    // Topology overlay runs after method selection and may mutate it.
    overlay::apply(&mut report, input);

    // Synthesis sees the final classification and method.
    report.rollback = rollback::synthesize(parsed, report.analyzed_at);
    report.disk_estimate =
        disk::estimate(&outcome.classification, report.recommended_method, &input.meta);
    match wrapper::synthesize(parsed) {
        WrapperOutcome::Script(s) => report.idempotent_script = Some(s),
        WrapperOutcome::Unsupported(reason) => report.idempotent_note = Some(reason),
    }

    report.recommendation = ddl_recommendation(&report, input);
    report
}

fn ddl_recommendation(report: &AnalysisReport, input: &AnalysisInput) -> String {
    let size = human_bytes(input.meta.total_size());
    let Some(ddl) = report.operation.as_ddl() else {
        return String::new();
    };
    let algorithm = ddl.classification.algorithm;

    match report.recommended_method {
        ExecutionMethod::Direct => match report.risk {
            RiskLevel::Safe => format!(
                "{} change; safe to run directly at any time.",
                algorithm.as_str()
            ),
            RiskLevel::Caution => format!(
                "{} change on a {} table; run directly during a low-traffic window.",
                algorithm.as_str(),
                size
            ),
            RiskLevel::Dangerous => format!(
                "{} change on a {} table; schedule a maintenance window and verify \
                 the warnings above before running.",
                algorithm.as_str(),
                size
            ),
        },
        ExecutionMethod::Ghost => format!(
            "Full table copy of {}; use gh-ost to keep the table writable \
             (pt-online-schema-change as fallback).",
            size
        ),
        ExecutionMethod::PtOsc => format!(
            "Full table copy of {}; use pt-online-schema-change (gh-ost is not an \
             option here).",
            size
        ),
        ExecutionMethod::Chunked => {
            // DDL never chunks; reachable only through a future overlay change.
            format!("Split the operation into batches; table is {}.", size)
        }
    }
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

fn analyze_dml(input: &AnalysisInput) -> AnalysisReport {
    let parsed = &input.parsed;
    let affected = input.affected_rows();
    let row_count = input.meta.row_count;
    tracing::debug!(op = %parsed.op_tag, affected, "judging DML");

    let affected_pct = if row_count > 0 {
        ((affected as f64 / row_count as f64) * 100.0).min(100.0)
    } else if affected > 0 {
        100.0
    } else {
        0.0
    };
    let write_set_size = affected.saturating_mul(input.meta.avg_row_length);

    let is_batch_write = matches!(parsed.op_tag, OperationTag::Update | OperationTag::Delete);
    let selection = if is_batch_write {
        risk::select_dml(affected, parsed.has_where, input.chunk_size)
    } else {
        risk::Selection {
            // Reads never endanger data; other writes are judged by volume.
            risk: if parsed.op_tag == OperationTag::Select {
                RiskLevel::Safe
            } else {
                risk::dml_row_band(affected)
            },
            method: ExecutionMethod::Direct,
            alternative: None,
            chunk_count: None,
        }
    };

    let mut report = AnalysisReport {
        statement: parsed.raw_sql.clone(),
        kind: StatementKind::Dml,
        database: parsed.database.clone(),
        table: parsed.table.clone(),
        risk: selection.risk,
        recommended_method: selection.method,
        alternative_method: selection.alternative,
        recommendation: String::new(),
        operation: OperationDetails::Dml(DmlDetails {
            operation: parsed.op_tag,
            affected_rows: affected,
            affected_pct,
            write_set_size,
            has_where: parsed.has_where,
            chunk_size: input.chunk_size,
            chunk_count: selection.chunk_count,
        }),
        warnings: vec![],
        cluster_warnings: vec![],
        rollback: RollbackPlan::default(),
        generated_script: None,
        execution_command: None,
        disk_estimate: None,
        idempotent_script: None,
        idempotent_note: None,
        topology: input.topology.clone(),
        analyzed_at: Utc::now(),
    };

    if is_batch_write && !parsed.has_where {
        report.push_warning(format!(
            "No WHERE clause: every row in {} will be affected",
            parsed.qualified_table()
        ));
    }
    if is_batch_write && parsed.has_where && affected == 0 && input.estimated_rows == 0 {
        report.push_warning(
            "Row estimate unavailable (EXPLAIN failed or returned nothing); \
             affected-row bands could not be applied",
        );
    }

    overlay::apply(&mut report, input);

    // Script synthesis last: the overlay may have forced chunking.
    if report.recommended_method == ExecutionMethod::Chunked {
        let chunk_count = report
            .operation
            .as_dml()
            .and_then(|d| d.chunk_count)
            .unwrap_or_else(|| risk::chunk_count(affected, input.chunk_size));
        report.generated_script = script::synthesize(parsed, affected, input.chunk_size, chunk_count);
    }

    report.rollback = rollback::synthesize(parsed, report.analyzed_at);
    report.recommendation = dml_recommendation(&report, affected);
    report
}

fn dml_recommendation(report: &AnalysisReport, affected: u64) -> String {
    match report.recommended_method {
        ExecutionMethod::Chunked => {
            let chunks = report
                .operation
                .as_dml()
                .and_then(|d| d.chunk_count)
                .unwrap_or(0);
            format!(
                "{} rows is too many for one transaction; run the generated script \
                 ({} batches) instead of the raw statement.",
                format_number(affected),
                format_number(chunks)
            )
        }
        _ => match report.risk {
            RiskLevel::Safe => "Affected rows are within safe bounds; run directly.".to_string(),
            RiskLevel::Caution => format!(
                "{} rows will be written in one transaction; run during a low-traffic \
                 window and confirm the WHERE clause first.",
                format_number(affected)
            ),
            RiskLevel::Dangerous => format!(
                "{} rows will be written in one transaction; take a backup (see \
                 rollback options) before running.",
                format_number(affected)
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsafe_core::metadata::TableMetadata;
    use dbsafe_core::statement::ParsedStatement;
    use dbsafe_core::topology::TopologyInfo;
    use dbsafe_core::version::ServerVersion;

    fn meta(rows: u64, data: u64, index: u64) -> TableMetadata {
        TableMetadata {
            database: "app".into(),
            table: "users".into(),
            engine: "InnoDB".into(),
            row_count: rows,
            avg_row_length: if rows > 0 { data / rows.max(1) } else { 0 },
            data_length: data,
            index_length: index,
            columns: vec![],
            indexes: vec![],
            foreign_keys: vec![],
            triggers: vec![],
            partitioned: false,
        }
    }

    #[test]
    fn version_gated_op_warns_on_old_server() {
        let parsed = ParsedStatement {
            raw_sql: "ALTER TABLESPACE ts1 RENAME TO ts2".into(),
            op_tag: OperationTag::RenameTablespace,
            table: "ts1".into(),
            ..Default::default()
        };
        let input = AnalysisInput::new(
            parsed,
            meta(0, 0, 0),
            ServerVersion::new(8, 0, 19),
            TopologyInfo::standalone(),
        );
        let report = analyze(&input);
        assert_eq!(report.risk, RiskLevel::Dangerous);
        assert!(report.warnings.iter().any(|w| w.contains("8.0.21")));
    }

    #[test]
    fn select_is_always_safe_and_direct() {
        let parsed = ParsedStatement {
            raw_sql: "SELECT * FROM users".into(),
            kind: StatementKind::Dml,
            op_tag: OperationTag::Select,
            table: "users".into(),
            ..Default::default()
        };
        let input = AnalysisInput::new(
            parsed,
            meta(10_000_000, 1 << 30, 0),
            ServerVersion::new(8, 0, 35),
            TopologyInfo::standalone(),
        )
        .with_estimated_rows(10_000_000);
        let report = analyze(&input);
        assert_eq!(report.risk, RiskLevel::Safe);
        assert_eq!(report.recommended_method, ExecutionMethod::Direct);
    }

    #[test]
    fn insert_is_not_floored_by_missing_where() {
        let parsed = ParsedStatement {
            raw_sql: "INSERT INTO users (name) VALUES ('x')".into(),
            kind: StatementKind::Dml,
            op_tag: OperationTag::Insert,
            table: "users".into(),
            ..Default::default()
        };
        let input = AnalysisInput::new(
            parsed,
            meta(10_000_000, 1 << 30, 0),
            ServerVersion::new(8, 0, 35),
            TopologyInfo::standalone(),
        );
        let report = analyze(&input);
        assert_eq!(report.risk, RiskLevel::Safe);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn dml_with_unknown_estimate_warns() {
        let parsed = ParsedStatement {
            raw_sql: "DELETE FROM users WHERE id = 5".into(),
            kind: StatementKind::Dml,
            op_tag: OperationTag::Delete,
            table: "users".into(),
            where_clause: Some("id = 5".into()),
            has_where: true,
            ..Default::default()
        };
        let input = AnalysisInput::new(
            parsed,
            meta(1_000, 10_000, 0),
            ServerVersion::new(8, 0, 35),
            TopologyInfo::standalone(),
        );
        let report = analyze(&input);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("Row estimate unavailable")));
    }
}
