//! Rollback synthesis: reverse DDL where unambiguous, notes and options
//! everywhere else.

use chrono::{DateTime, Utc};

use dbsafe_core::enums::OperationTag;
use dbsafe_core::report::{RollbackOption, RollbackPlan};
use dbsafe_core::statement::ParsedStatement;

/// Builds the rollback plan for one statement.
///
/// `now` stamps the backup-table name for DML pre-backup options; it is
/// passed in so the whole engine run shares one timestamp.
pub fn synthesize(parsed: &ParsedStatement, now: DateTime<Utc>) -> RollbackPlan {
    if parsed.op_tag.is_dml() {
        dml_plan(parsed, now)
    } else {
        ddl_plan(parsed)
    }
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

fn ddl_plan(parsed: &ParsedStatement) -> RollbackPlan {
    let table = parsed.qualified_table();

    match parsed.op_tag {
        OperationTag::AddColumn => match parsed.column_name.as_deref() {
            Some(column) => RollbackPlan {
                sql: Some(format!("ALTER TABLE {} DROP COLUMN `{}`;", table, column)),
                notes: Some(
                    "DROP COLUMN is INSTANT on 8.0.29+/8.4; older versions rebuild \
                     the table in place."
                        .into(),
                ),
                options: vec![],
            },
            None => default_plan(),
        },
        OperationTag::DropColumn => RollbackPlan {
            sql: None,
            notes: Some(
                "Cannot automatically reverse DROP COLUMN: the data is gone. \
                 Restore from backup."
                    .into(),
            ),
            options: vec![],
        },
        OperationTag::AddIndex
        | OperationTag::AddFulltextIndex
        | OperationTag::AddSpatialIndex => match parsed.index_name.as_deref() {
            Some(index) => RollbackPlan {
                sql: Some(format!("ALTER TABLE {} DROP INDEX `{}`;", table, index)),
                notes: Some("DROP INDEX is metadata-only.".into()),
                options: vec![],
            },
            None => default_plan(),
        },
        OperationTag::DropIndex => RollbackPlan {
            sql: None,
            notes: Some("Recreate the index from its original definition.".into()),
            options: vec![],
        },
        OperationTag::RenameTable => RollbackPlan {
            sql: None,
            notes: Some("Reverse by renaming the table back to its original name.".into()),
            options: vec![],
        },
        OperationTag::AddForeignKey => match parsed.index_name.as_deref() {
            Some(constraint) => RollbackPlan {
                sql: Some(format!(
                    "ALTER TABLE {} DROP FOREIGN KEY `{}`;",
                    table, constraint
                )),
                notes: None,
                options: vec![],
            },
            None => default_plan(),
        },
        OperationTag::DropForeignKey => RollbackPlan {
            sql: None,
            notes: Some("Recreate the foreign key from its original definition.".into()),
            options: vec![],
        },
        OperationTag::ModifyColumn | OperationTag::ChangeColumn => RollbackPlan {
            sql: None,
            notes: Some(
                "Recreate the previous column definition from SHOW CREATE TABLE \
                 (captured before running the change)."
                    .into(),
            ),
            options: vec![],
        },
        _ => default_plan(),
    }
}

fn default_plan() -> RollbackPlan {
    RollbackPlan {
        sql: None,
        notes: Some(
            "Review SHOW CREATE TABLE output to construct a reverse operation.".into(),
        ),
        options: vec![],
    }
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

fn dml_plan(parsed: &ParsedStatement, now: DateTime<Utc>) -> RollbackPlan {
    let table = parsed.qualified_table();
    let backup_name = format!("{}_backup_{}", parsed.table, now.format("%Y%m%d"));
    let backup = if parsed.database.is_empty() {
        format!("`{}`", backup_name)
    } else {
        format!("`{}`.`{}`", parsed.database, backup_name)
    };

    let where_suffix = parsed
        .where_clause
        .as_deref()
        .map(|w| format!(" WHERE {}", w))
        .unwrap_or_default();

    let backup_sql = format!(
        "CREATE TABLE {backup} AS SELECT * FROM {table}{where_suffix};\n\
         -- To restore after a bad run:\n\
         INSERT INTO {table} SELECT * FROM {backup};",
    );

    RollbackPlan {
        sql: None,
        notes: None,
        options: vec![
            RollbackOption {
                label: "Pre-backup".into(),
                description: format!(
                    "Copy the affected rows into {} before executing; restore with \
                     the companion INSERT if the change must be undone.",
                    backup
                ),
                sql: Some(backup_sql),
            },
            RollbackOption {
                label: "Point-in-time recovery".into(),
                description: "Reconstruct the previous row images from the binary log \
                              with mysqlbinlog (requires binlog_format=ROW and the \
                              binlogs covering the statement)."
                    .into(),
                sql: None,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dbsafe_core::enums::StatementKind;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn stmt(op: OperationTag) -> ParsedStatement {
        ParsedStatement {
            op_tag: op,
            kind: if op.is_dml() {
                StatementKind::Dml
            } else {
                StatementKind::Ddl
            },
            database: "app".into(),
            table: "users".into(),
            ..Default::default()
        }
    }

    #[test]
    fn add_column_reverses_to_drop() {
        let mut s = stmt(OperationTag::AddColumn);
        s.column_name = Some("email".into());
        let plan = synthesize(&s, at());
        assert_eq!(
            plan.sql.as_deref(),
            Some("ALTER TABLE `app`.`users` DROP COLUMN `email`;")
        );
        assert!(plan.notes.unwrap().contains("INSTANT on 8.0.29+"));
    }

    #[test]
    fn drop_column_is_irreversible() {
        let plan = synthesize(&stmt(OperationTag::DropColumn), at());
        assert!(plan.sql.is_none());
        assert!(plan.notes.unwrap().contains("Restore from backup"));
    }

    #[test]
    fn add_index_reverses_to_drop_index() {
        let mut s = stmt(OperationTag::AddIndex);
        s.index_name = Some("idx_email".into());
        let plan = synthesize(&s, at());
        assert_eq!(
            plan.sql.as_deref(),
            Some("ALTER TABLE `app`.`users` DROP INDEX `idx_email`;")
        );
        assert!(plan.notes.unwrap().contains("metadata-only"));
    }

    #[test]
    fn add_foreign_key_reverses_to_drop_fk() {
        let mut s = stmt(OperationTag::AddForeignKey);
        s.index_name = Some("fk_user_org".into());
        let plan = synthesize(&s, at());
        assert_eq!(
            plan.sql.as_deref(),
            Some("ALTER TABLE `app`.`users` DROP FOREIGN KEY `fk_user_org`;")
        );
    }

    #[test]
    fn modify_column_points_at_show_create_table() {
        let plan = synthesize(&stmt(OperationTag::ModifyColumn), at());
        assert!(plan.sql.is_none());
        assert!(plan.notes.unwrap().contains("SHOW CREATE TABLE"));
    }

    #[test]
    fn unknown_ddl_gets_default_note() {
        let plan = synthesize(&stmt(OperationTag::ToggleEncryption), at());
        assert!(plan.sql.is_none());
        assert!(plan.notes.unwrap().contains("SHOW CREATE TABLE"));
    }

    #[test]
    fn dml_always_gets_backup_and_pitr_options() {
        let mut s = stmt(OperationTag::Delete);
        s.where_clause = Some("created_at < '2020-01-01'".into());
        s.has_where = true;
        let plan = synthesize(&s, at());
        assert!(plan.sql.is_none());
        assert_eq!(plan.options.len(), 2);

        let backup = &plan.options[0];
        assert_eq!(backup.label, "Pre-backup");
        let sql = backup.sql.as_deref().unwrap();
        assert!(sql.contains("CREATE TABLE `app`.`users_backup_20260314` AS SELECT * FROM `app`.`users` WHERE created_at < '2020-01-01';"));
        assert!(sql.contains("INSERT INTO `app`.`users` SELECT * FROM `app`.`users_backup_20260314`;"));

        let pitr = &plan.options[1];
        assert_eq!(pitr.label, "Point-in-time recovery");
        assert!(pitr.sql.is_none());
        assert!(pitr.description.contains("mysqlbinlog"));
    }

    #[test]
    fn dml_backup_without_where_copies_whole_table() {
        let plan = synthesize(&stmt(OperationTag::Update), at());
        let sql = plan.options[0].sql.as_deref().unwrap();
        assert!(sql.contains("AS SELECT * FROM `app`.`users`;"));
    }
}
