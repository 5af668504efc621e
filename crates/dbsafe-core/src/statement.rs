//! The parsed-statement record handed to the engine by the SQL parser.

use serde::{Deserialize, Serialize};

use crate::enums::{OperationTag, StatementKind};

/// Structured view of one SQL statement.
///
/// Produced by the parser; identifier text is preserved raw (no quoting),
/// while charset and type strings are normalized to lower-case. The parser
/// must tag anything it cannot identify as [`OperationTag::OtherDdl`] so
/// the engine can apply its unparsable-operation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    /// The statement exactly as provided.
    pub raw_sql: String,
    /// DDL or DML.
    pub kind: StatementKind,
    /// The specific operation; drives matrix lookup.
    pub op_tag: OperationTag,
    /// Schema name, empty when the statement does not qualify the table.
    #[serde(default)]
    pub database: String,
    /// Target table name.
    #[serde(default)]
    pub table: String,

    // -- Column details ------------------------------------------------------
    /// The column being added/dropped/modified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// For CHANGE COLUMN: the existing column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_column_name: Option<String>,
    /// For CHANGE COLUMN: the new column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column_name: Option<String>,
    /// The declared column type, lower-cased (e.g. `varchar(255)`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column_type: Option<String>,
    /// Declared nullability, when the statement spells it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column_nullable: Option<bool>,
    /// Declared column charset, lower-cased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column_charset: Option<String>,
    /// FIRST or AFTER placement present.
    #[serde(default)]
    pub is_first_after: bool,
    /// AUTO_INCREMENT attribute present on the column definition.
    #[serde(default)]
    pub has_auto_increment: bool,
    /// GENERATED ALWAYS AS (...) column.
    #[serde(default)]
    pub is_generated_column: bool,
    /// STORED (vs VIRTUAL) generated column.
    #[serde(default)]
    pub is_generated_stored: bool,

    // -- Index details -------------------------------------------------------
    /// Index or constraint name when the operation names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    // -- DML details ---------------------------------------------------------
    /// The WHERE clause body (without the keyword), raw text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    /// Whether a WHERE clause is present.
    #[serde(default)]
    pub has_where: bool,

    // -- Table-option details ------------------------------------------------
    /// Target engine for CHANGE ENGINE, lower-cased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_engine: Option<String>,
    /// Tablespace being altered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablespace_name: Option<String>,
    /// New tablespace name for RENAME TO.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_tablespace_name: Option<String>,

    // -- Compound ALTER ------------------------------------------------------
    /// Sub-operation tags for `MultipleOps`; at least two entries then.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_operations: Vec<OperationTag>,
}

impl Default for ParsedStatement {
    fn default() -> Self {
        Self {
            raw_sql: String::new(),
            kind: StatementKind::Ddl,
            op_tag: OperationTag::OtherDdl,
            database: String::new(),
            table: String::new(),
            column_name: None,
            old_column_name: None,
            new_column_name: None,
            new_column_type: None,
            new_column_nullable: None,
            new_column_charset: None,
            is_first_after: false,
            has_auto_increment: false,
            is_generated_column: false,
            is_generated_stored: false,
            index_name: None,
            where_clause: None,
            has_where: false,
            new_engine: None,
            tablespace_name: None,
            new_tablespace_name: None,
            sub_operations: Vec::new(),
        }
    }
}

impl ParsedStatement {
    /// Fully-qualified, backtick-quoted table reference for generated SQL.
    pub fn qualified_table(&self) -> String {
        if self.database.is_empty() {
            format!("`{}`", self.table)
        } else {
            format!("`{}`.`{}`", self.database, self.table)
        }
    }

    /// The column name a MODIFY/CHANGE/ADD/DROP acts on, preferring the
    /// CHANGE COLUMN old name when present.
    pub fn target_column(&self) -> Option<&str> {
        self.old_column_name
            .as_deref()
            .or(self.column_name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_table_with_and_without_database() {
        let mut stmt = ParsedStatement {
            table: "users".into(),
            ..Default::default()
        };
        assert_eq!(stmt.qualified_table(), "`users`");
        stmt.database = "app".into();
        assert_eq!(stmt.qualified_table(), "`app`.`users`");
    }

    #[test]
    fn target_column_prefers_change_old_name() {
        let stmt = ParsedStatement {
            op_tag: OperationTag::ChangeColumn,
            old_column_name: Some("fullname".into()),
            new_column_name: Some("full_name".into()),
            column_name: Some("full_name".into()),
            ..Default::default()
        };
        assert_eq!(stmt.target_column(), Some("fullname"));
    }

    #[test]
    fn default_is_unparsed_ddl() {
        let stmt = ParsedStatement::default();
        assert_eq!(stmt.kind, StatementKind::Ddl);
        assert_eq!(stmt.op_tag, OperationTag::OtherDdl);
        assert!(!stmt.has_where);
    }
}
