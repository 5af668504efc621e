//! The analysis report: a single-run value object built by the engine,
//! rendered by a renderer, then discarded.
//!
//! Serialized keys are contractual (renderers and downstream tooling
//! depend on them); see the field attributes before renaming anything.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classification::DdlClassification;
use crate::enums::{ExecutionMethod, OperationTag, RiskLevel, StatementKind};
use crate::topology::TopologyInfo;

// ---------------------------------------------------------------------------
// Operation details (DDL vs DML)
// ---------------------------------------------------------------------------

/// Classification result for one sub-operation of a compound ALTER.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubOpResult {
    pub operation: OperationTag,
    #[serde(flatten)]
    pub classification: DdlClassification,
}

/// DDL-specific slice of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DdlDetails {
    pub operation: OperationTag,
    #[serde(flatten)]
    pub classification: DdlClassification,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_operations: Vec<SubOpResult>,
}

/// DML-specific slice of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DmlDetails {
    #[serde(rename = "dml_operation")]
    pub operation: OperationTag,
    pub affected_rows: u64,
    /// Share of the table affected, capped at 100.0.
    pub affected_pct: f64,
    /// `affected_rows * avg_row_length`; what a cluster replicates.
    pub write_set_size: u64,
    pub has_where: bool,
    pub chunk_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u64>,
}

/// Either side of the DDL/DML split.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationDetails {
    Ddl(DdlDetails),
    Dml(DmlDetails),
}

impl OperationDetails {
    /// The DDL details, when this is a DDL report.
    pub fn as_ddl(&self) -> Option<&DdlDetails> {
        match self {
            Self::Ddl(d) => Some(d),
            Self::Dml(_) => None,
        }
    }

    /// The DML details, when this is a DML report.
    pub fn as_dml(&self) -> Option<&DmlDetails> {
        match self {
            Self::Ddl(_) => None,
            Self::Dml(d) => Some(d),
        }
    }
}

// ---------------------------------------------------------------------------
// Rollback plan
// ---------------------------------------------------------------------------

/// One way to undo (or pre-arm against) the analyzed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackOption {
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// The rollback section of the report.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RollbackPlan {
    /// Direct reverse DDL, when the operation is unambiguously reversible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<RollbackOption>,
}

// ---------------------------------------------------------------------------
// Generated artifacts
// ---------------------------------------------------------------------------

/// A synthesized script and where the CLI should write it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedScript {
    pub path: String,
    pub body: String,
}

/// Disk headroom required before executing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskEstimate {
    pub required_bytes: u64,
    pub required_human: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// AnalysisReport
// ---------------------------------------------------------------------------

/// Everything the engine concluded about one statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// The statement as analyzed.
    pub statement: String,
    #[serde(rename = "type")]
    pub kind: StatementKind,
    pub database: String,
    pub table: String,
    pub risk: RiskLevel,
    pub recommended_method: ExecutionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_method: Option<ExecutionMethod>,
    /// One-paragraph operator guidance.
    pub recommendation: String,
    pub operation: OperationDetails,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cluster_warnings: Vec<String>,
    pub rollback: RollbackPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_script: Option<GeneratedScript>,
    /// Shell hint for running the generated script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_command: Option<String>,
    #[serde(rename = "disk_space_estimate", skip_serializing_if = "Option::is_none")]
    pub disk_estimate: Option<DiskEstimate>,
    /// Existence-guarded wrapper for reversible single-op DDL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_script: Option<GeneratedScript>,
    /// Why no idempotent wrapper was produced, when one was not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_note: Option<String>,
    pub topology: TopologyInfo,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// Appends a warning, skipping exact duplicates.
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Appends a cluster warning, skipping exact duplicates.
    pub fn push_cluster_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.cluster_warnings.contains(&warning) {
            self.cluster_warnings.push(warning);
        }
    }

    /// Raises the risk floor; never lowers it.
    pub fn raise_risk(&mut self, floor: RiskLevel) {
        self.risk = self.risk.at_least(floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{Algorithm, LockLevel};

    fn ddl_report() -> AnalysisReport {
        AnalysisReport {
            statement: "ALTER TABLE `app`.`users` ADD COLUMN `email` varchar(255)".into(),
            kind: StatementKind::Ddl,
            database: "app".into(),
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
                    "metadata-only",
                ),
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

    #[test]
    fn json_uses_contractual_keys() {
        let report = ddl_report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["type"], "DDL");
        assert_eq!(json["risk"], "SAFE");
        assert_eq!(json["recommended_method"], "DIRECT");
        assert_eq!(json["operation"]["algorithm"], "INSTANT");
        assert_eq!(json["operation"]["lock"], "NONE");
        assert_eq!(json["operation"]["rebuilds_table"], false);
        assert_eq!(json["topology"]["type"], "STANDALONE");
        assert!(json.get("alternative_method").is_none());
        assert!(json.get("disk_space_estimate").is_none());
        assert!(json["analyzed_at"].is_string());
    }

    #[test]
    fn warnings_deduplicate() {
        let mut report = ddl_report();
        report.push_warning("column already exists");
        report.push_warning("column already exists");
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn risk_floor_never_lowers() {
        let mut report = ddl_report();
        report.raise_risk(RiskLevel::Dangerous);
        report.raise_risk(RiskLevel::Caution);
        assert_eq!(report.risk, RiskLevel::Dangerous);
    }

    #[test]
    fn dml_details_serialize_under_operation() {
        let mut report = ddl_report();
        report.kind = StatementKind::Dml;
        report.operation = OperationDetails::Dml(DmlDetails {
            operation: OperationTag::Delete,
            affected_rows: 500_000,
            affected_pct: 100.0,
            write_set_size: 50_000_000,
            has_where: false,
            chunk_size: 10_000,
            chunk_count: Some(50),
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["operation"]["dml_operation"], "delete");
        assert_eq!(json["operation"]["affected_rows"], 500_000);
        assert_eq!(json["operation"]["chunk_count"], 50);
    }
}
