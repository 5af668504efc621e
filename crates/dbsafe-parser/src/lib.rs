//! SQL statement parser for the dbsafe analyzer.
//!
//! Maps one raw SQL statement to a [`ParsedStatement`]. The contract with
//! the engine:
//! - anything recognized as DDL but not classifiable is tagged `other_ddl`
//!   (never an error), so the engine can apply its conservative fallback;
//! - charset and type strings come out lower-cased;
//! - identifier text is preserved raw, with backticks stripped;
//! - compound ALTERs populate `sub_operations`.
//!
//! [`ParseError`] is reserved for genuinely unusable input: empty SQL or a
//! statement kind outside the DDL/DML surface.

mod alter;
mod error;
mod ident;

pub use error::{ParseError, Result};

use std::sync::OnceLock;

use regex::Regex;

use dbsafe_core::enums::{OperationTag, StatementKind};
use dbsafe_core::statement::ParsedStatement;

use ident::{parse_table_ref, strip_keyword, strip_keywords, take_identifier};

/// Parses one SQL statement.
pub fn parse(sql: &str) -> Result<ParsedStatement> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let body = trimmed.trim_end_matches(';').trim_end();

    let keyword = leading_keyword(body);
    tracing::debug!(keyword = %keyword, "parsing statement");

    match keyword.as_str() {
        "alter" => parse_alter(sql, body),
        "create" => parse_create(sql, body),
        "drop" => parse_drop(sql, body),
        "rename" => parse_rename_table(sql, body),
        "optimize" => parse_optimize(sql, body),
        "truncate" => parse_truncate(sql, body),
        "insert" => parse_write_into(sql, body, OperationTag::Insert),
        "replace" => parse_write_into(sql, body, OperationTag::Replace),
        "update" => parse_update(sql, body),
        "delete" => parse_delete(sql, body),
        "select" => parse_select(sql, body),
        other => Err(ParseError::unsupported(other)),
    }
}

fn leading_keyword(body: &str) -> String {
    body.split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// DDL statements
// ---------------------------------------------------------------------------

fn parse_alter(raw: &str, body: &str) -> Result<ParsedStatement> {
    let rest = strip_keyword(body, "alter").unwrap_or(body);
    if let Some(after_table) = strip_keyword(rest, "table") {
        return alter::parse_alter_table(raw, after_table);
    }
    if let Some(after_ts) = strip_keyword(rest, "tablespace") {
        return parse_alter_tablespace(raw, after_ts);
    }
    // ALTER DATABASE / VIEW / EVENT ...: recognized as DDL, not classified.
    Ok(other_ddl(raw))
}

fn parse_alter_tablespace(raw: &str, rest: &str) -> Result<ParsedStatement> {
    let Some((name, after_name)) = take_identifier(rest) else {
        return Ok(other_ddl(raw));
    };
    let mut stmt = other_ddl(raw);
    stmt.tablespace_name = Some(name);
    if let Some(after_rename) = strip_keywords(after_name, &["rename", "to"]) {
        stmt.op_tag = OperationTag::RenameTablespace;
        stmt.new_tablespace_name = take_identifier(after_rename).map(|(n, _)| n);
    }
    Ok(stmt)
}

fn parse_create(raw: &str, body: &str) -> Result<ParsedStatement> {
    let rest = strip_keyword(body, "create").unwrap_or(body);

    let (tag, rest) = if let Some(r) = strip_keywords(rest, &["unique", "index"]) {
        (OperationTag::AddIndex, r)
    } else if let Some(r) = strip_keywords(rest, &["fulltext", "index"]) {
        (OperationTag::AddFulltextIndex, r)
    } else if let Some(r) = strip_keywords(rest, &["spatial", "index"]) {
        (OperationTag::AddSpatialIndex, r)
    } else if let Some(r) = strip_keyword(rest, "index") {
        (OperationTag::AddIndex, r)
    } else {
        // CREATE TABLE / VIEW / DATABASE ...: DDL outside the matrix.
        return Ok(other_ddl(raw));
    };

    let Some((index_name, after_name)) = take_identifier(rest) else {
        return Ok(other_ddl(raw));
    };
    let Some(after_on) = strip_keyword(after_name, "on") else {
        return Err(ParseError::missing_table(raw));
    };
    let mut stmt = table_statement(raw, after_on, StatementKind::Ddl, tag)?;
    stmt.index_name = Some(index_name);
    Ok(stmt)
}

fn parse_drop(raw: &str, body: &str) -> Result<ParsedStatement> {
    let rest = strip_keyword(body, "drop").unwrap_or(body);
    if let Some(after_index) = strip_keyword(rest, "index") {
        let Some((index_name, after_name)) = take_identifier(after_index) else {
            return Ok(other_ddl(raw));
        };
        let Some(after_on) = strip_keyword(after_name, "on") else {
            return Err(ParseError::missing_table(raw));
        };
        let mut stmt =
            table_statement(raw, after_on, StatementKind::Ddl, OperationTag::DropIndex)?;
        stmt.index_name = Some(index_name);
        return Ok(stmt);
    }
    // DROP TABLE / DATABASE / VIEW ...: destructive, outside the matrix.
    Ok(other_ddl(raw))
}

fn parse_rename_table(raw: &str, body: &str) -> Result<ParsedStatement> {
    let rest = strip_keyword(body, "rename").unwrap_or(body);
    let Some(after_table) = strip_keyword(rest, "table") else {
        return Ok(other_ddl(raw));
    };
    // RENAME TABLE old TO new [, ...]: analyzed against the first source.
    let source = after_table
        .split([',', ' '])
        .find(|p| !p.trim().is_empty())
        .unwrap_or("");
    table_statement(raw, source, StatementKind::Ddl, OperationTag::RenameTable)
}

fn parse_optimize(raw: &str, body: &str) -> Result<ParsedStatement> {
    let rest = strip_keyword(body, "optimize").unwrap_or(body);
    let rest = strip_keyword(rest, "table").unwrap_or(rest);
    table_statement(raw, rest, StatementKind::Ddl, OperationTag::OptimizeTable)
}

fn parse_truncate(raw: &str, body: &str) -> Result<ParsedStatement> {
    let rest = strip_keyword(body, "truncate").unwrap_or(body);
    let rest = strip_keyword(rest, "table").unwrap_or(rest);
    // TRUNCATE is DDL with no matrix row: the conservative path applies.
    table_statement(raw, rest, StatementKind::Ddl, OperationTag::OtherDdl)
}

// ---------------------------------------------------------------------------
// DML statements
// ---------------------------------------------------------------------------

fn parse_write_into(raw: &str, body: &str, tag: OperationTag) -> Result<ParsedStatement> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?is)^(?:insert|replace)\s+(?:low_priority\s+|delayed\s+|high_priority\s+|ignore\s+)*(?:into\s+)?(\S+)").unwrap()
    });
    let Some(caps) = re.captures(body) else {
        return Err(ParseError::missing_table(raw));
    };
    table_statement(raw, &caps[1], StatementKind::Dml, tag)
}

fn parse_update(raw: &str, body: &str) -> Result<ParsedStatement> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?is)^update\s+(?:low_priority\s+|ignore\s+)*(\S+)\s+set\b").unwrap()
    });
    let Some(caps) = re.captures(body) else {
        return Err(ParseError::missing_table(raw));
    };
    let mut stmt = table_statement(raw, &caps[1], StatementKind::Dml, OperationTag::Update)?;
    attach_where(&mut stmt, body);
    Ok(stmt)
}

fn parse_delete(raw: &str, body: &str) -> Result<ParsedStatement> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?is)^delete\s+(?:low_priority\s+|quick\s+|ignore\s+)*from\s+(\S+)").unwrap()
    });
    let Some(caps) = re.captures(body) else {
        return Err(ParseError::missing_table(raw));
    };
    let mut stmt = table_statement(raw, &caps[1], StatementKind::Dml, OperationTag::Delete)?;
    attach_where(&mut stmt, body);
    Ok(stmt)
}

fn parse_select(raw: &str, body: &str) -> Result<ParsedStatement> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?is)\bfrom\s+(\S+)").unwrap());
    let table = re
        .captures(body)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();
    let mut stmt = ParsedStatement {
        raw_sql: raw.to_string(),
        kind: StatementKind::Dml,
        op_tag: OperationTag::Select,
        ..Default::default()
    };
    if !table.is_empty() {
        let r = parse_table_ref(&table);
        stmt.database = r.database;
        stmt.table = r.table;
    }
    attach_where(&mut stmt, body);
    Ok(stmt)
}

/// Finds a top-level WHERE (outside quotes and parentheses) and records the
/// clause text that follows it, raw.
fn attach_where(stmt: &mut ParsedStatement, body: &str) {
    if let Some(idx) = find_top_level_where(body) {
        let clause = body[idx..].trim();
        if !clause.is_empty() {
            stmt.has_where = true;
            stmt.where_clause = Some(clause.to_string());
        }
    }
}

fn find_top_level_where(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '\'' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            'w' | 'W' if !in_quotes && depth == 0 => {
                let candidate = &bytes[i..];
                if candidate.len() >= 5
                    && candidate[..5].eq_ignore_ascii_case(b"where")
                    && (i == 0 || (bytes[i - 1] as char).is_whitespace())
                    && candidate
                        .get(5)
                        .is_none_or(|b| (*b as char).is_whitespace())
                {
                    return Some(i + 5);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Shared constructors
// ---------------------------------------------------------------------------

fn other_ddl(raw: &str) -> ParsedStatement {
    ParsedStatement {
        raw_sql: raw.to_string(),
        kind: StatementKind::Ddl,
        op_tag: OperationTag::OtherDdl,
        ..Default::default()
    }
}

fn table_statement(
    raw: &str,
    table_text: &str,
    kind: StatementKind,
    tag: OperationTag,
) -> Result<ParsedStatement> {
    let r = parse_table_ref(table_text.trim());
    if r.table.is_empty() {
        return Err(ParseError::missing_table(raw));
    }
    Ok(ParsedStatement {
        raw_sql: raw.to_string(),
        kind,
        op_tag: tag,
        database: r.database,
        table: r.table,
        ..Default::default()
    })
}
