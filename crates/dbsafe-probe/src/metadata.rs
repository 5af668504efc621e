//! Schema metadata probe: one read-only snapshot of the target table from
//! information_schema.
//!
//! Row-to-record mapping is factored into pure functions so the shapes can
//! be unit-tested without a server.

use mysql::prelude::Queryable;
use mysql::Conn;

use dbsafe_core::metadata::{
    ColumnInfo, ForeignKeyInfo, IndexInfo, TableMetadata, TriggerEvent, TriggerInfo,
    TriggerTiming,
};

use crate::error::{ProbeError, Result};

/// Collects the full metadata snapshot for one table.
pub fn fetch_table_metadata(conn: &mut Conn, database: &str, table: &str) -> Result<TableMetadata> {
    let sizing: Option<(Option<String>, Option<u64>, Option<u64>, Option<u64>, Option<u64>, Option<String>)> =
        conn.exec_first(
            "SELECT ENGINE, TABLE_ROWS, AVG_ROW_LENGTH, DATA_LENGTH, INDEX_LENGTH, CREATE_OPTIONS \
             FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
            (database, table),
        )?;
    let Some((engine, rows, avg, data, index, options)) = sizing else {
        return Err(ProbeError::table_not_found(database, table));
    };

    let columns: Vec<(String, String, String, u32, Option<String>, String)> = conn.exec(
        "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, ORDINAL_POSITION, \
                CHARACTER_SET_NAME, EXTRA \
         FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
         ORDER BY ORDINAL_POSITION",
        (database, table),
    )?;

    let index_parts: Vec<(String, String, u8, String)> = conn.exec(
        "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE, INDEX_TYPE \
         FROM information_schema.STATISTICS \
         WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
         ORDER BY INDEX_NAME, SEQ_IN_INDEX",
        (database, table),
    )?;

    let fks: Vec<(String, String, String, String)> = conn.exec(
        "SELECT CONSTRAINT_NAME, COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
         FROM information_schema.KEY_COLUMN_USAGE \
         WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND REFERENCED_TABLE_NAME IS NOT NULL",
        (database, table),
    )?;

    let triggers: Vec<(String, String, String)> = conn.exec(
        "SELECT TRIGGER_NAME, EVENT_MANIPULATION, ACTION_TIMING \
         FROM information_schema.TRIGGERS \
         WHERE EVENT_OBJECT_SCHEMA = ? AND EVENT_OBJECT_TABLE = ?",
        (database, table),
    )?;

    let meta = TableMetadata {
        database: database.to_string(),
        table: table.to_string(),
        engine: engine.unwrap_or_default(),
        row_count: rows.unwrap_or(0),
        avg_row_length: avg.unwrap_or(0),
        data_length: data.unwrap_or(0),
        index_length: index.unwrap_or(0),
        columns: columns.into_iter().map(map_column).collect(),
        indexes: group_indexes(index_parts),
        foreign_keys: fks.into_iter().map(map_foreign_key).collect(),
        triggers: triggers.into_iter().filter_map(map_trigger).collect(),
        partitioned: options
            .map(|o| o.to_ascii_lowercase().contains("partitioned"))
            .unwrap_or(false),
    };
    tracing::debug!(
        table = %meta.table,
        rows = meta.row_count,
        columns = meta.columns.len(),
        triggers = meta.triggers.len(),
        "collected table metadata"
    );
    Ok(meta)
}

// ---------------------------------------------------------------------------
// Pure row mapping
// ---------------------------------------------------------------------------

/// Maps one information_schema.COLUMNS row.
pub fn map_column(
    (name, column_type, is_nullable, position, character_set, extra): (
        String,
        String,
        String,
        u32,
        Option<String>,
        String,
    ),
) -> ColumnInfo {
    ColumnInfo {
        name,
        type_text: column_type.to_ascii_lowercase(),
        nullable: is_nullable.eq_ignore_ascii_case("YES"),
        position,
        character_set: character_set.map(|c| c.to_ascii_lowercase()),
        is_stored_generated: extra.to_ascii_uppercase().contains("STORED GENERATED"),
    }
}

/// Groups information_schema.STATISTICS rows (one per index column, ordered
/// by index then sequence) into one record per index.
pub fn group_indexes(rows: Vec<(String, String, u8, String)>) -> Vec<IndexInfo> {
    let mut indexes: Vec<IndexInfo> = Vec::new();
    for (index_name, column, non_unique, index_type) in rows {
        match indexes.last_mut() {
            Some(last) if last.name == index_name => last.columns.push(column),
            _ => indexes.push(IndexInfo {
                name: index_name,
                columns: vec![column],
                unique: non_unique == 0,
                index_type,
            }),
        }
    }
    indexes
}

/// Maps one KEY_COLUMN_USAGE row with a referenced table.
pub fn map_foreign_key(
    (name, column, referenced_table, referenced_column): (String, String, String, String),
) -> ForeignKeyInfo {
    ForeignKeyInfo {
        name,
        column,
        referenced_table,
        referenced_column,
    }
}

/// Maps one TRIGGERS row; rows with event/timing values outside the known
/// sets are dropped rather than guessed at.
pub fn map_trigger((name, event, timing): (String, String, String)) -> Option<TriggerInfo> {
    let event = match event.to_ascii_uppercase().as_str() {
        "INSERT" => TriggerEvent::Insert,
        "UPDATE" => TriggerEvent::Update,
        "DELETE" => TriggerEvent::Delete,
        _ => return None,
    };
    let timing = match timing.to_ascii_uppercase().as_str() {
        "BEFORE" => TriggerTiming::Before,
        "AFTER" => TriggerTiming::After,
        _ => return None,
    };
    Some(TriggerInfo {
        name,
        event,
        timing,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn column_mapping() {
        let col = map_column((
            "email".into(),
            "VARCHAR(255)".into(),
            "YES".into(),
            3,
            Some("UTF8MB4".into()),
            "".into(),
        ));
        assert_eq!(col.name, "email");
        assert_eq!(col.type_text, "varchar(255)");
        assert!(col.nullable);
        assert_eq!(col.position, 3);
        assert_eq!(col.character_set.as_deref(), Some("utf8mb4"));
        assert!(!col.is_stored_generated);
    }

    #[test]
    fn stored_generated_detection() {
        let col = map_column((
            "total".into(),
            "decimal(10,2)".into(),
            "NO".into(),
            4,
            None,
            "STORED GENERATED".into(),
        ));
        assert!(col.is_stored_generated);
        assert!(!col.nullable);

        let virtual_col = map_column((
            "total_v".into(),
            "decimal(10,2)".into(),
            "NO".into(),
            5,
            None,
            "VIRTUAL GENERATED".into(),
        ));
        assert!(!virtual_col.is_stored_generated);
    }

    #[test]
    fn index_grouping_preserves_column_order() {
        let indexes = group_indexes(vec![
            ("PRIMARY".into(), "id".into(), 0, "BTREE".into()),
            ("idx_name_email".into(), "name".into(), 1, "BTREE".into()),
            ("idx_name_email".into(), "email".into(), 1, "BTREE".into()),
            ("ft_body".into(), "body".into(), 1, "FULLTEXT".into()),
        ]);
        assert_eq!(indexes.len(), 3);
        assert!(indexes[0].unique);
        assert_eq!(indexes[1].columns, vec!["name", "email"]);
        assert_eq!(indexes[2].index_type, "FULLTEXT");
    }

    #[test]
    fn trigger_mapping_drops_unknown_values() {
        assert!(map_trigger(("t".into(), "INSERT".into(), "BEFORE".into())).is_some());
        assert!(map_trigger(("t".into(), "LOGIN".into(), "BEFORE".into())).is_none());
        assert!(map_trigger(("t".into(), "UPDATE".into(), "INSTEAD".into())).is_none());
    }
}
