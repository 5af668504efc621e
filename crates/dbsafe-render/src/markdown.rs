//! Markdown rendering, for pasting analyses into runbooks and reviews.

use dbsafe_core::format::format_number;
use dbsafe_core::report::{AnalysisReport, OperationDetails};

/// Renders the report as Markdown.
pub fn render(report: &AnalysisReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    let target = if report.database.is_empty() {
        format!("`{}`", report.table)
    } else {
        format!("`{}.{}`", report.database, report.table)
    };
    lines.push(format!("# dbsafe analysis: {}", target));
    lines.push(String::new());
    lines.push("```sql".into());
    lines.push(report.statement.trim().to_string());
    lines.push("```".into());
    lines.push(String::new());

    lines.push("| | |".into());
    lines.push("|---|---|".into());
    lines.push(format!("| Risk | **{}** |", report.risk));
    lines.push(format!("| Method | {} |", report.recommended_method));
    if let Some(alt) = report.alternative_method {
        lines.push(format!("| Alternative | {} |", alt));
    }

    match &report.operation {
        OperationDetails::Ddl(ddl) => {
            lines.push(format!("| Operation | {} |", ddl.operation.describe()));
            lines.push(format!("| Algorithm | {} |", ddl.classification.algorithm));
            lines.push(format!("| Lock | {} |", ddl.classification.lock));
            lines.push(format!(
                "| Rebuilds table | {} |",
                if ddl.classification.rebuilds_table { "yes" } else { "no" }
            ));
        }
        OperationDetails::Dml(dml) => {
            lines.push(format!("| Operation | {} |", dml.operation.describe()));
            lines.push(format!(
                "| Affected rows | {} ({:.1}%) |",
                format_number(dml.affected_rows),
                dml.affected_pct
            ));
            if let Some(chunks) = dml.chunk_count {
                lines.push(format!(
                    "| Chunking | {} batches of {} |",
                    format_number(chunks),
                    format_number(dml.chunk_size)
                ));
            }
        }
    }
    if let Some(disk) = &report.disk_estimate {
        lines.push(format!("| Disk required | {} |", disk.required_human));
    }

    if !report.warnings.is_empty() || !report.cluster_warnings.is_empty() {
        lines.push(String::new());
        lines.push("## Warnings".into());
        for w in report.warnings.iter().chain(&report.cluster_warnings) {
            lines.push(format!("- {}", w));
        }
    }

    lines.push(String::new());
    lines.push("## Rollback".into());
    if let Some(sql) = &report.rollback.sql {
        lines.push("```sql".into());
        lines.push(sql.clone());
        lines.push("```".into());
    }
    if let Some(notes) = &report.rollback.notes {
        lines.push(notes.clone());
    }
    for option in &report.rollback.options {
        lines.push(format!("**{}** — {}", option.label, option.description));
        if let Some(sql) = &option.sql {
            lines.push("```sql".into());
            lines.push(sql.clone());
            lines.push("```".into());
        }
    }

    if let Some(script) = &report.generated_script {
        lines.push(String::new());
        lines.push(format!("## Generated script: `{}`", script.path));
        lines.push("```sql".into());
        lines.push(script.body.trim_end().to_string());
        lines.push("```".into());
    }

    lines.push(String::new());
    lines.push(format!("> {}", report.recommendation));
    lines.push(String::new());
    lines.push(format!(
        "_{} · analyzed {}_",
        report.topology.kind.label(),
        report.analyzed_at.to_rfc3339()
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dbsafe_core::classification::DdlClassification;
    use dbsafe_core::enums::{
        Algorithm, ExecutionMethod, LockLevel, OperationTag, RiskLevel, StatementKind,
    };
    use dbsafe_core::report::{DdlDetails, RollbackPlan};
    use dbsafe_core::topology::TopologyInfo;

    #[test]
    fn markdown_has_table_and_fences() {
        let report = AnalysisReport {
            statement: "ALTER TABLE users ADD COLUMN email VARCHAR(255)".into(),
            kind: StatementKind::Ddl,
            database: String::new(),
            table: "users".into(),
            risk: RiskLevel::Safe,
            recommended_method: ExecutionMethod::Direct,
            alternative_method: None,
            recommendation: "Safe to run directly.".into(),
            operation: OperationDetails::Ddl(DdlDetails {
                operation: OperationTag::AddColumn,
                classification: DdlClassification::new(
                    Algorithm::Instant,
                    LockLevel::None,
                    false,
                    "",
                ),
                sub_operations: vec![],
            }),
            warnings: vec![],
            cluster_warnings: vec![],
            rollback: RollbackPlan {
                sql: Some("ALTER TABLE `users` DROP COLUMN `email`;".into()),
                notes: None,
                options: vec![],
            },
            generated_script: None,
            execution_command: None,
            disk_estimate: None,
            idempotent_script: None,
            idempotent_note: None,
            topology: TopologyInfo::standalone(),
            analyzed_at: Utc::now(),
        };
        let out = render(&report);
        assert!(out.starts_with("# dbsafe analysis: `users`"));
        assert!(out.contains("| Risk | **SAFE** |"));
        assert!(out.contains("| Algorithm | INSTANT |"));
        assert!(out.contains("```sql"));
        assert!(out.contains("DROP COLUMN `email`"));
    }
}
