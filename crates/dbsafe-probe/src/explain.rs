//! EXPLAIN-based row estimation for DML statements.

use mysql::prelude::Queryable;
use mysql::Conn;

/// Estimates how many rows a DML statement will touch by running EXPLAIN.
///
/// Degrades to 0 on any failure: a missing estimate is never fatal, the
/// engine falls back to row-count heuristics.
pub fn estimate_rows(conn: &mut Conn, sql: &str) -> u64 {
    let explain = format!("EXPLAIN {}", sql.trim().trim_end_matches(';'));
    match conn.query::<mysql::Row, _>(&explain) {
        Ok(rows) => {
            let estimate = rows
                .into_iter()
                .filter_map(|row| row.get::<Option<u64>, _>("rows").flatten())
                .max()
                .unwrap_or(0);
            tracing::debug!(estimate, "EXPLAIN row estimate");
            estimate
        }
        Err(e) => {
            tracing::warn!(error = %e, "EXPLAIN failed; proceeding without a row estimate");
            0
        }
    }
}
