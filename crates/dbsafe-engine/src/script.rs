//! Chunked-script synthesis for oversized DELETE / UPDATE statements.

use dbsafe_core::enums::OperationTag;
use dbsafe_core::format::format_number;
use dbsafe_core::report::GeneratedScript;
use dbsafe_core::statement::ParsedStatement;

/// Warning embedded verbatim in chunked UPDATE scripts.
const UPDATE_PK_CAVEAT: &str = "UPDATE ... LIMIT without an ORDER BY is non-deterministic: \
MySQL may pick different rows on each execution. Supply an explicit primary-key window \
below so every batch touches a distinct slice.";

/// Builds the batch script for a CHUNKED DELETE or UPDATE.
///
/// Returns `None` for operations that have no chunked form.
pub fn synthesize(
    parsed: &ParsedStatement,
    affected_rows: u64,
    chunk_size: u64,
    chunk_count: u64,
) -> Option<GeneratedScript> {
    match parsed.op_tag {
        OperationTag::Delete => Some(delete_script(parsed, affected_rows, chunk_size, chunk_count)),
        OperationTag::Update => Some(update_script(parsed, affected_rows, chunk_size, chunk_count)),
        _ => None,
    }
}

/// Suggested file name: `<db>_<table>_<op>.sql`, with the database part
/// omitted when the statement was unqualified.
pub fn script_path(parsed: &ParsedStatement) -> String {
    if parsed.database.is_empty() {
        format!("{}_{}.sql", parsed.table, parsed.op_tag.as_str())
    } else {
        format!(
            "{}_{}_{}.sql",
            parsed.database,
            parsed.table,
            parsed.op_tag.as_str()
        )
    }
}

fn header(parsed: &ParsedStatement, affected_rows: u64, chunk_size: u64, chunk_count: u64) -> String {
    format!(
        "-- Chunked {} for {}\n\
         -- Estimated rows: {}\n\
         -- Chunk size: {} ({} chunks)\n\
         -- Tune @sleep_time to trade throughput for replication headroom.\n",
        parsed.op_tag.describe(),
        parsed.qualified_table(),
        format_number(affected_rows),
        format_number(chunk_size),
        format_number(chunk_count),
    )
}

fn delete_script(
    parsed: &ParsedStatement,
    affected_rows: u64,
    chunk_size: u64,
    chunk_count: u64,
) -> GeneratedScript {
    let table = parsed.qualified_table();
    let where_part = parsed
        .where_clause
        .as_deref()
        .map(|w| format!(" WHERE {}", w))
        .unwrap_or_default();

    let body = format!(
        "{header}\
         SET @batch_size = {chunk_size};\n\
         SET @sleep_time = 0.5;\n\
         \n\
         DELIMITER $$\n\
         CREATE PROCEDURE chunked_delete()\n\
         BEGIN\n\
         \x20 DECLARE batch_rows INT DEFAULT 1;\n\
         \x20 WHILE batch_rows > 0 DO\n\
         \x20   DELETE FROM {table}{where_part} LIMIT {chunk_size};\n\
         \x20   SET batch_rows = ROW_COUNT();\n\
         \x20   DO SLEEP(@sleep_time);\n\
         \x20 END WHILE;\n\
         END$$\n\
         DELIMITER ;\n\
         \n\
         CALL chunked_delete();\n\
         DROP PROCEDURE chunked_delete;\n",
        header = header(parsed, affected_rows, chunk_size, chunk_count),
    );

    GeneratedScript {
        path: script_path(parsed),
        body,
    }
}

fn update_script(
    parsed: &ParsedStatement,
    affected_rows: u64,
    chunk_size: u64,
    chunk_count: u64,
) -> GeneratedScript {
    let raw = parsed.raw_sql.trim().trim_end_matches(';');
    let window_predicate = "<pk_column> >= @pk_cursor AND <pk_column> < @pk_cursor + @batch_size";
    let windowed_update = if parsed.has_where {
        format!("{} AND {}", raw, window_predicate)
    } else {
        format!("{} WHERE {}", raw, window_predicate)
    };

    let body = format!(
        "{header}\
         -- {caveat}\n\
         -- Replace <pk_column>, <pk_start>, <pk_end> before running.\n\
         SET @batch_size = {chunk_size};\n\
         SET @sleep_time = 0.5;\n\
         \n\
         DELIMITER $$\n\
         CREATE PROCEDURE chunked_update()\n\
         BEGIN\n\
         \x20 SET @pk_cursor = <pk_start>;\n\
         \x20 WHILE @pk_cursor < <pk_end> DO\n\
         \x20   {update};\n\
         \x20   SET @pk_cursor = @pk_cursor + @batch_size;\n\
         \x20   DO SLEEP(@sleep_time);\n\
         \x20 END WHILE;\n\
         END$$\n\
         DELIMITER ;\n\
         \n\
         CALL chunked_update();\n\
         DROP PROCEDURE chunked_update;\n",
        header = header(parsed, affected_rows, chunk_size, chunk_count),
        caveat = UPDATE_PK_CAVEAT,
        update = windowed_update,
    );

    GeneratedScript {
        path: script_path(parsed),
        body,
    }
}
