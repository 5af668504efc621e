//! Styled terminal rendering: the default interactive view.

use dbsafe_core::format::format_number_short;
use dbsafe_core::report::{AnalysisReport, OperationDetails};

use crate::styles::{
    render_bold, render_cluster_warning, render_method, render_muted, render_risk,
    render_section, render_separator, render_warning,
};

/// Renders the report for an interactive terminal.
pub fn render(report: &AnalysisReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    let target = if report.database.is_empty() {
        format!("`{}`", report.table)
    } else {
        format!("`{}`.`{}`", report.database, report.table)
    };
    lines.push(format!(
        "{} {}",
        render_section("dbsafe"),
        render_bold(&target)
    ));
    lines.push(render_separator());
    lines.push(render_muted(report.statement.trim()));
    lines.push(String::new());

    let method_part = match report.alternative_method {
        Some(alt) => format!(
            "{}  (alt: {})",
            render_method(report.recommended_method),
            render_method(alt)
        ),
        None => render_method(report.recommended_method),
    };
    lines.push(format!(
        "{}   method {}",
        render_risk(report.risk),
        method_part
    ));
    lines.push(String::new());

    match &report.operation {
        OperationDetails::Ddl(ddl) => {
            lines.push(format!(
                "{} {}  algorithm {}  lock {}{}",
                render_section("operation"),
                ddl.operation.describe(),
                render_bold(ddl.classification.algorithm.as_str()),
                render_bold(ddl.classification.lock.as_str()),
                if ddl.classification.rebuilds_table {
                    format!("  {}", render_warning("rebuilds table"))
                } else {
                    String::new()
                }
            ));
            if !ddl.classification.notes.is_empty() {
                lines.push(render_muted(&format!("  {}", ddl.classification.notes)));
            }
            for sub in &ddl.sub_operations {
                lines.push(format!(
                    "  - {} {} / {}",
                    sub.operation.describe(),
                    sub.classification.algorithm,
                    sub.classification.lock
                ));
            }
        }
        OperationDetails::Dml(dml) => {
            lines.push(format!(
                "{} {}  {} rows ({:.1}%)  where: {}",
                render_section("operation"),
                dml.operation.describe(),
                render_bold(&format_number_short(dml.affected_rows)),
                dml.affected_pct,
                if dml.has_where {
                    "yes".to_string()
                } else {
                    render_warning("none")
                }
            ));
            if let Some(chunks) = dml.chunk_count {
                lines.push(render_muted(&format!(
                    "  {} batches of {} rows",
                    format_number_short(chunks),
                    format_number_short(dml.chunk_size)
                )));
            }
        }
    }

    for w in &report.warnings {
        lines.push(render_warning(w));
    }
    for w in &report.cluster_warnings {
        lines.push(render_cluster_warning(w));
    }

    if let Some(disk) = &report.disk_estimate {
        lines.push(format!(
            "{} {}  {}",
            render_section("disk"),
            render_bold(&disk.required_human),
            render_muted(&disk.reason)
        ));
    }

    lines.push(String::new());
    lines.push(render_section("rollback"));
    if let Some(sql) = &report.rollback.sql {
        lines.push(format!("  {}", sql));
    }
    if let Some(notes) = &report.rollback.notes {
        lines.push(render_muted(&format!("  {}", notes)));
    }
    for option in &report.rollback.options {
        lines.push(format!(
            "  {} {}",
            render_bold(&format!("[{}]", option.label)),
            option.description
        ));
    }

    if let Some(script) = &report.generated_script {
        lines.push(String::new());
        lines.push(format!(
            "{} {}",
            render_section("script"),
            render_bold(&script.path)
        ));
        if let Some(cmd) = &report.execution_command {
            lines.push(render_muted(&format!("  {}", cmd)));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} {}",
        render_section("advice"),
        report.recommendation
    ));
    lines.push(render_muted(&format!(
        "{} | analyzed {}",
        report.topology.kind.label(),
        report.analyzed_at.format("%Y-%m-%d %H:%M UTC")
    )));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dbsafe_core::enums::{ExecutionMethod, OperationTag, RiskLevel, StatementKind};
    use dbsafe_core::report::{DmlDetails, RollbackPlan};
    use dbsafe_core::topology::TopologyInfo;

    #[test]
    fn styled_view_short_groups_numbers() {
        let report = AnalysisReport {
            statement: "DELETE FROM logs".into(),
            kind: StatementKind::Dml,
            database: String::new(),
            table: "logs".into(),
            risk: RiskLevel::Dangerous,
            recommended_method: ExecutionMethod::Chunked,
            alternative_method: None,
            recommendation: "Run the generated script.".into(),
            operation: OperationDetails::Dml(DmlDetails {
                operation: OperationTag::Delete,
                affected_rows: 4_654_623,
                affected_pct: 100.0,
                write_set_size: 0,
                has_where: false,
                chunk_size: 10_000,
                chunk_count: Some(466),
            }),
            warnings: vec!["No WHERE clause".into()],
            cluster_warnings: vec![],
            rollback: RollbackPlan::default(),
            generated_script: None,
            execution_command: None,
            disk_estimate: None,
            idempotent_script: None,
            idempotent_note: None,
            topology: TopologyInfo::standalone(),
            analyzed_at: Utc::now(),
        };
        let out = render(&report);
        assert!(out.contains("4.7M"));
        assert!(out.contains("10K"));
        assert!(out.contains("No WHERE clause"));
        assert!(out.contains("DANGEROUS"));
    }
}
