//! Plain-text rendering: the full report, no color, no icons.

use dbsafe_core::format::format_number;
use dbsafe_core::report::{AnalysisReport, OperationDetails};

/// Renders the report as plain text.
pub fn render(report: &AnalysisReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    let target = if report.database.is_empty() {
        report.table.clone()
    } else {
        format!("{}.{}", report.database, report.table)
    };
    lines.push(format!("dbsafe analysis: {} [{}]", target, report.kind));
    lines.push("=".repeat(60));
    lines.push(format!("Statement: {}", report.statement.trim()));
    lines.push(String::new());

    lines.push(format!("Risk:   {}", report.risk));
    match report.alternative_method {
        Some(alt) => lines.push(format!(
            "Method: {} (alternative: {})",
            report.recommended_method, alt
        )),
        None => lines.push(format!("Method: {}", report.recommended_method)),
    }

    match &report.operation {
        OperationDetails::Ddl(ddl) => {
            lines.push(format!(
                "Operation: {} -- algorithm {}, lock {}{}",
                ddl.operation.describe(),
                ddl.classification.algorithm,
                ddl.classification.lock,
                if ddl.classification.rebuilds_table {
                    ", rebuilds table"
                } else {
                    ""
                }
            ));
            if !ddl.classification.notes.is_empty() {
                lines.push(format!("Notes: {}", ddl.classification.notes));
            }
            if !ddl.sub_operations.is_empty() {
                lines.push("Sub-operations:".to_string());
                for sub in &ddl.sub_operations {
                    lines.push(format!(
                        "  - {}: {} / {}{}",
                        sub.operation.describe(),
                        sub.classification.algorithm,
                        sub.classification.lock,
                        if sub.classification.rebuilds_table {
                            " (rebuild)"
                        } else {
                            ""
                        }
                    ));
                }
            }
        }
        OperationDetails::Dml(dml) => {
            lines.push(format!(
                "Operation: {} -- {} rows affected ({:.1}% of the table)",
                dml.operation.describe(),
                format_number(dml.affected_rows),
                dml.affected_pct
            ));
            lines.push(format!(
                "Write-set: {} bytes; WHERE clause: {}",
                format_number(dml.write_set_size),
                if dml.has_where { "yes" } else { "NO" }
            ));
            if let Some(chunks) = dml.chunk_count {
                lines.push(format!(
                    "Chunking: {} batches of {} rows",
                    format_number(chunks),
                    format_number(dml.chunk_size)
                ));
            }
        }
    }

    if !report.warnings.is_empty() {
        lines.push(String::new());
        lines.push("WARNINGS".to_string());
        for w in &report.warnings {
            lines.push(format!("  ! {}", w));
        }
    }
    if !report.cluster_warnings.is_empty() {
        lines.push(String::new());
        lines.push(format!("CLUSTER WARNINGS ({})", report.topology.kind.label()));
        for w in &report.cluster_warnings {
            lines.push(format!("  ! {}", w));
        }
    }

    if let Some(disk) = &report.disk_estimate {
        lines.push(String::new());
        lines.push(format!(
            "Disk space required: {} -- {}",
            disk.required_human, disk.reason
        ));
    }

    lines.push(String::new());
    lines.push("ROLLBACK".to_string());
    if let Some(sql) = &report.rollback.sql {
        lines.push(format!("  {}", sql));
    }
    if let Some(notes) = &report.rollback.notes {
        lines.push(format!("  {}", notes));
    }
    for option in &report.rollback.options {
        lines.push(format!("  [{}] {}", option.label, option.description));
        if let Some(sql) = &option.sql {
            for line in sql.lines() {
                lines.push(format!("    {}", line));
            }
        }
    }

    if let Some(script) = &report.generated_script {
        lines.push(String::new());
        lines.push(format!("Generated script: {}", script.path));
        if let Some(cmd) = &report.execution_command {
            lines.push(format!("Run with: {}", cmd));
        }
    }
    if let Some(wrapper) = &report.idempotent_script {
        lines.push(format!("Idempotent wrapper: {}", wrapper.path));
    }

    lines.push(String::new());
    lines.push(format!("Recommendation: {}", report.recommendation));
    lines.push(format!(
        "Analyzed at {} ({})",
        report.analyzed_at.to_rfc3339(),
        report.topology.kind.label()
    ));

    lines.join("\n")
}
