//! Idempotent-wrapper synthesis: wraps reversible single-op DDL in a
//! stored procedure guarded by an information_schema existence probe.

use dbsafe_core::enums::OperationTag;
use dbsafe_core::report::GeneratedScript;
use dbsafe_core::statement::ParsedStatement;

/// Result of wrapper synthesis: either a script or the reason there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum WrapperOutcome {
    Script(GeneratedScript),
    Unsupported(String),
}

/// Builds the existence-guarded wrapper for one DDL statement.
pub fn synthesize(parsed: &ParsedStatement) -> WrapperOutcome {
    let guard = match guard_for(parsed) {
        Ok(g) => g,
        Err(reason) => return WrapperOutcome::Unsupported(reason),
    };

    let ddl = parsed.raw_sql.trim().trim_end_matches(';');
    let body = format!(
        "DELIMITER $$\n\
         CREATE PROCEDURE idempotent_ddl()\n\
         BEGIN\n\
         \x20 IF {guard} THEN\n\
         \x20   {ddl};\n\
         \x20 END IF;\n\
         END$$\n\
         DELIMITER ;\n\
         \n\
         CALL idempotent_ddl();\n\
         DROP PROCEDURE idempotent_ddl;\n",
    );

    let path = if parsed.database.is_empty() {
        format!("{}_{}_idempotent.sql", parsed.table, parsed.op_tag.as_str())
    } else {
        format!(
            "{}_{}_{}_idempotent.sql",
            parsed.database,
            parsed.table,
            parsed.op_tag.as_str()
        )
    };

    WrapperOutcome::Script(GeneratedScript { path, body })
}

// ---------------------------------------------------------------------------
// Guard construction
// ---------------------------------------------------------------------------

/// The schema predicate shared by every probe: the statement's database
/// when qualified, otherwise the session default.
fn schema_predicate(parsed: &ParsedStatement) -> String {
    if parsed.database.is_empty() {
        "TABLE_SCHEMA = DATABASE()".to_string()
    } else {
        format!("TABLE_SCHEMA = '{}'", parsed.database)
    }
}

fn guard_for(parsed: &ParsedStatement) -> Result<String, String> {
    let schema = schema_predicate(parsed);
    let table = &parsed.table;

    match parsed.op_tag {
        OperationTag::AddColumn => {
            let column = require(parsed.column_name.as_deref(), "column name")?;
            Ok(format!(
                "NOT EXISTS (SELECT 1 FROM information_schema.COLUMNS WHERE {} \
                 AND TABLE_NAME = '{}' AND COLUMN_NAME = '{}')",
                schema, table, column
            ))
        }
        OperationTag::DropColumn => {
            let column = require(parsed.column_name.as_deref(), "column name")?;
            Ok(format!(
                "EXISTS (SELECT 1 FROM information_schema.COLUMNS WHERE {} \
                 AND TABLE_NAME = '{}' AND COLUMN_NAME = '{}')",
                schema, table, column
            ))
        }
        OperationTag::AddIndex
        | OperationTag::AddFulltextIndex
        | OperationTag::AddSpatialIndex => {
            let index = require(parsed.index_name.as_deref(), "index name")?;
            Ok(format!(
                "NOT EXISTS (SELECT 1 FROM information_schema.STATISTICS WHERE {} \
                 AND TABLE_NAME = '{}' AND INDEX_NAME = '{}')",
                schema, table, index
            ))
        }
        OperationTag::DropIndex => {
            let index = require(parsed.index_name.as_deref(), "index name")?;
            Ok(format!(
                "EXISTS (SELECT 1 FROM information_schema.STATISTICS WHERE {} \
                 AND TABLE_NAME = '{}' AND INDEX_NAME = '{}')",
                schema, table, index
            ))
        }
        OperationTag::AddForeignKey | OperationTag::AddCheckConstraint => {
            let constraint = require(parsed.index_name.as_deref(), "constraint name")?;
            Ok(format!(
                "NOT EXISTS (SELECT 1 FROM information_schema.TABLE_CONSTRAINTS WHERE {} \
                 AND TABLE_NAME = '{}' AND CONSTRAINT_NAME = '{}')",
                schema, table, constraint
            ))
        }
        OperationTag::DropForeignKey | OperationTag::DropCheckConstraint => {
            let constraint = require(parsed.index_name.as_deref(), "constraint name")?;
            Ok(format!(
                "EXISTS (SELECT 1 FROM information_schema.TABLE_CONSTRAINTS WHERE {} \
                 AND TABLE_NAME = '{}' AND CONSTRAINT_NAME = '{}')",
                schema, table, constraint
            ))
        }
        OperationTag::RenameTable => Ok(format!(
            // Guard on the source still existing so a re-run is a no-op.
            "EXISTS (SELECT 1 FROM information_schema.TABLES WHERE {} \
             AND TABLE_NAME = '{}')",
            schema, table
        )),
        OperationTag::MultipleOps => Err(
            "compound ALTER statements mix operations with different existence probes; \
             split them to wrap individually"
                .into(),
        ),
        op if op.is_partition_op() => Err(
            "partition maintenance is not covered by an information_schema existence probe"
                .into(),
        ),
        OperationTag::ConvertCharset | OperationTag::ChangeDefaultCharset => Err(
            "charset conversions are not guarded by an existence probe; re-running \
             converts already-converted data"
                .into(),
        ),
        OperationTag::SetDefault
        | OperationTag::DropDefault
        | OperationTag::ChangeAutoIncrement
        | OperationTag::ChangeTableStats => Err(
            "metadata-only change; re-running it is already harmless".into(),
        ),
        op if op.is_dml() => Err("idempotent wrappers apply to DDL only".into()),
        _ => Err(format!(
            "no existence probe is defined for {}",
            parsed.op_tag.describe()
        )),
    }
}

fn require<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, String> {
    value.ok_or_else(|| format!("statement does not carry a {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(op: OperationTag, raw: &str) -> ParsedStatement {
        ParsedStatement {
            raw_sql: raw.into(),
            op_tag: op,
            database: "app".into(),
            table: "users".into(),
            ..Default::default()
        }
    }

    #[test]
    fn add_column_gets_not_exists_guard() {
        let mut s = stmt(
            OperationTag::AddColumn,
            "ALTER TABLE app.users ADD COLUMN email VARCHAR(255);",
        );
        s.column_name = Some("email".into());
        let WrapperOutcome::Script(script) = synthesize(&s) else {
            panic!("expected a script");
        };
        assert!(script.body.contains("IF NOT EXISTS (SELECT 1 FROM information_schema.COLUMNS"));
        assert!(script.body.contains("COLUMN_NAME = 'email'"));
        assert!(script.body.contains("ALTER TABLE app.users ADD COLUMN email VARCHAR(255);"));
        assert!(script.body.contains("CALL idempotent_ddl();"));
        assert!(script.body.contains("DROP PROCEDURE idempotent_ddl;"));
        assert_eq!(script.path, "app_users_add_column_idempotent.sql");
    }

    #[test]
    fn drop_column_gets_exists_guard() {
        let mut s = stmt(OperationTag::DropColumn, "ALTER TABLE app.users DROP COLUMN email");
        s.column_name = Some("email".into());
        let WrapperOutcome::Script(script) = synthesize(&s) else {
            panic!("expected a script");
        };
        assert!(script.body.contains("IF EXISTS (SELECT 1 FROM information_schema.COLUMNS"));
    }

    #[test]
    fn add_index_probes_statistics() {
        let mut s = stmt(OperationTag::AddIndex, "CREATE INDEX idx_email ON app.users (email)");
        s.index_name = Some("idx_email".into());
        let WrapperOutcome::Script(script) = synthesize(&s) else {
            panic!("expected a script");
        };
        assert!(script.body.contains("information_schema.STATISTICS"));
        assert!(script.body.contains("INDEX_NAME = 'idx_email'"));
    }

    #[test]
    fn add_foreign_key_probes_table_constraints() {
        let mut s = stmt(
            OperationTag::AddForeignKey,
            "ALTER TABLE app.users ADD CONSTRAINT fk_org FOREIGN KEY (org_id) REFERENCES orgs(id)",
        );
        s.index_name = Some("fk_org".into());
        let WrapperOutcome::Script(script) = synthesize(&s) else {
            panic!("expected a script");
        };
        assert!(script.body.contains("information_schema.TABLE_CONSTRAINTS"));
        assert!(script.body.contains("CONSTRAINT_NAME = 'fk_org'"));
    }

    #[test]
    fn unqualified_table_probes_session_database() {
        let mut s = stmt(OperationTag::AddColumn, "ALTER TABLE users ADD COLUMN email TEXT");
        s.database = String::new();
        s.column_name = Some("email".into());
        let WrapperOutcome::Script(script) = synthesize(&s) else {
            panic!("expected a script");
        };
        assert!(script.body.contains("TABLE_SCHEMA = DATABASE()"));
    }

    #[test]
    fn compound_alter_is_unsupported() {
        let s = stmt(OperationTag::MultipleOps, "ALTER TABLE users ADD a INT, DROP b");
        let WrapperOutcome::Unsupported(reason) = synthesize(&s) else {
            panic!("expected unsupported");
        };
        assert!(reason.contains("compound"));
    }

    #[test]
    fn partition_and_charset_ops_are_unsupported() {
        for op in [
            OperationTag::AddPartition,
            OperationTag::TruncatePartition,
            OperationTag::ConvertCharset,
        ] {
            assert!(matches!(
                synthesize(&stmt(op, "ALTER TABLE users ...")),
                WrapperOutcome::Unsupported(_)
            ));
        }
    }

    #[test]
    fn metadata_only_ops_need_no_wrapper() {
        let WrapperOutcome::Unsupported(reason) =
            synthesize(&stmt(OperationTag::SetDefault, "ALTER TABLE users ALTER c SET DEFAULT 1"))
        else {
            panic!("expected unsupported");
        };
        assert!(reason.contains("harmless"));
    }

    #[test]
    fn missing_identifier_is_unsupported() {
        let s = stmt(OperationTag::AddColumn, "ALTER TABLE users ADD COLUMN x INT");
        assert!(matches!(synthesize(&s), WrapperOutcome::Unsupported(_)));
    }
}
