//! ALTER TABLE parsing: clause splitting and per-clause classification.

use std::sync::OnceLock;

use regex::Regex;

use dbsafe_core::enums::{OperationTag, StatementKind};
use dbsafe_core::statement::ParsedStatement;

use crate::error::{ParseError, Result};
use crate::ident::{
    parse_table_ref, split_top_level_commas, strip_keyword, strip_keywords, take_identifier,
    take_type,
};

// ---------------------------------------------------------------------------
// Per-clause record
// ---------------------------------------------------------------------------

/// One classified clause of an ALTER TABLE statement.
#[derive(Debug, Default, Clone)]
struct Clause {
    tag: Option<OperationTag>,
    column_name: Option<String>,
    old_column_name: Option<String>,
    new_column_name: Option<String>,
    new_column_type: Option<String>,
    new_column_nullable: Option<bool>,
    new_column_charset: Option<String>,
    is_first_after: bool,
    has_auto_increment: bool,
    is_generated_column: bool,
    is_generated_stored: bool,
    index_name: Option<String>,
    new_engine: Option<String>,
}

impl Clause {
    fn tag(&self) -> OperationTag {
        self.tag.unwrap_or(OperationTag::OtherDdl)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parses the text following `ALTER TABLE`.
pub fn parse_alter_table(raw_sql: &str, rest: &str) -> Result<ParsedStatement> {
    let rest = rest.trim();
    let (table_text, clauses_text) = split_table_and_clauses(rest);
    if table_text.is_empty() {
        return Err(ParseError::missing_table(raw_sql));
    }
    let table_ref = parse_table_ref(&table_text);

    let clause_texts = split_top_level_commas(clauses_text);
    let clauses: Vec<Clause> = clause_texts.iter().map(|c| classify_clause(c)).collect();

    let mut stmt = ParsedStatement {
        raw_sql: raw_sql.to_string(),
        kind: StatementKind::Ddl,
        op_tag: OperationTag::OtherDdl,
        database: table_ref.database,
        table: table_ref.table,
        ..Default::default()
    };

    match clauses.len() {
        0 => {}
        1 => apply_single_clause(&mut stmt, clauses.into_iter().next().unwrap()),
        _ => apply_compound(&mut stmt, clauses),
    }

    tracing::trace!(op = %stmt.op_tag, table = %stmt.table, "parsed ALTER TABLE");
    Ok(stmt)
}

/// The table reference runs up to the first whitespace outside backticks.
fn split_table_and_clauses(text: &str) -> (String, &str) {
    let mut in_backticks = false;
    for (i, c) in text.char_indices() {
        match c {
            '`' => in_backticks = !in_backticks,
            c if c.is_whitespace() && !in_backticks => {
                return (text[..i].to_string(), &text[i..]);
            }
            _ => {}
        }
    }
    (text.to_string(), "")
}

fn apply_single_clause(stmt: &mut ParsedStatement, clause: Clause) {
    stmt.op_tag = clause.tag();
    stmt.column_name = clause.column_name;
    stmt.old_column_name = clause.old_column_name;
    stmt.new_column_name = clause.new_column_name;
    stmt.new_column_type = clause.new_column_type;
    stmt.new_column_nullable = clause.new_column_nullable;
    stmt.new_column_charset = clause.new_column_charset;
    stmt.is_first_after = clause.is_first_after;
    stmt.has_auto_increment = clause.has_auto_increment;
    stmt.is_generated_column = clause.is_generated_column;
    stmt.is_generated_stored = clause.is_generated_stored;
    stmt.index_name = clause.index_name;
    stmt.new_engine = clause.new_engine;
}

fn apply_compound(stmt: &mut ParsedStatement, clauses: Vec<Clause>) {
    let tags: Vec<OperationTag> = clauses.iter().map(|c| c.tag()).collect();

    // Two recognizable combinations collapse to a dedicated tag.
    if tags.len() == 2 {
        if tags.contains(&OperationTag::DropPrimaryKey)
            && tags.contains(&OperationTag::AddPrimaryKey)
        {
            stmt.op_tag = OperationTag::ReplacePrimaryKey;
            return;
        }
        if tags.contains(&OperationTag::DropIndex) && tags.contains(&OperationTag::AddIndex) {
            let dropped = clauses
                .iter()
                .find(|c| c.tag() == OperationTag::DropIndex)
                .and_then(|c| c.index_name.as_deref());
            let added = clauses
                .iter()
                .find(|c| c.tag() == OperationTag::AddIndex)
                .and_then(|c| c.index_name.as_deref());
            if let (Some(d), Some(a)) = (dropped, added) {
                if d.eq_ignore_ascii_case(a) {
                    stmt.op_tag = OperationTag::ChangeIndexType;
                    stmt.index_name = Some(d.to_string());
                    return;
                }
            }
        }
    }

    stmt.op_tag = OperationTag::MultipleOps;
    stmt.sub_operations = tags;
    stmt.has_auto_increment = clauses.iter().any(|c| c.has_auto_increment);
}

// ---------------------------------------------------------------------------
// Clause classification
// ---------------------------------------------------------------------------

fn classify_clause(clause: &str) -> Clause {
    let clause = clause.trim();

    if let Some(rest) = strip_keyword(clause, "add") {
        return classify_add(rest);
    }
    if let Some(rest) = strip_keyword(clause, "drop") {
        return classify_drop(rest);
    }
    if let Some(rest) = strip_keyword(clause, "modify") {
        let rest = strip_keyword(rest, "column").unwrap_or(rest);
        return classify_column_def(rest, OperationTag::ModifyColumn);
    }
    if let Some(rest) = strip_keyword(clause, "change") {
        return classify_change(rest);
    }
    if let Some(rest) = strip_keyword(clause, "alter") {
        return classify_alter_column(rest);
    }
    if let Some(rest) = strip_keyword(clause, "rename") {
        return classify_rename(rest);
    }
    if let Some(rest) = strip_keyword(clause, "convert") {
        if strip_keywords(rest, &["to", "character", "set"]).is_some()
            || strip_keywords(rest, &["to", "charset"]).is_some()
        {
            return tagged(OperationTag::ConvertCharset);
        }
        return tagged(OperationTag::OtherDdl);
    }
    if let Some(rest) = strip_keyword(clause, "engine") {
        return engine_clause(rest);
    }
    if strip_keyword(clause, "auto_increment").is_some() {
        return tagged(OperationTag::ChangeAutoIncrement);
    }
    if strip_keyword(clause, "row_format").is_some() {
        return tagged(OperationTag::ChangeRowFormat);
    }
    if strip_keyword(clause, "key_block_size").is_some() {
        return tagged(OperationTag::ChangeKeyBlockSize);
    }
    if clause.to_ascii_lowercase().starts_with("stats_") {
        return tagged(OperationTag::ChangeTableStats);
    }
    if strip_keyword(clause, "force").is_some_and(|r| r.trim().is_empty()) {
        return tagged(OperationTag::ForceRebuild);
    }
    if strip_keyword(clause, "encryption").is_some() {
        return tagged(OperationTag::ToggleEncryption);
    }
    let charset_clause = strip_keyword(clause, "default").unwrap_or(clause);
    if strip_keywords(charset_clause, &["character", "set"]).is_some()
        || strip_keyword(charset_clause, "charset").is_some()
    {
        return tagged(OperationTag::ChangeDefaultCharset);
    }
    if let Some(rest) = strip_keyword(clause, "reorganize") {
        if strip_keyword(rest, "partition").is_some() {
            return tagged(OperationTag::ReorganizePartition);
        }
    }
    if let Some(rest) = strip_keyword(clause, "rebuild") {
        if strip_keyword(rest, "partition").is_some() {
            return tagged(OperationTag::RebuildPartition);
        }
    }
    if let Some(rest) = strip_keyword(clause, "truncate") {
        if strip_keyword(rest, "partition").is_some() {
            return tagged(OperationTag::TruncatePartition);
        }
    }
    if let Some(rest) = strip_keyword(clause, "coalesce") {
        if strip_keyword(rest, "partition").is_some() {
            return tagged(OperationTag::DropPartition);
        }
    }

    tagged(OperationTag::OtherDdl)
}

fn tagged(tag: OperationTag) -> Clause {
    Clause {
        tag: Some(tag),
        ..Default::default()
    }
}

fn engine_clause(rest: &str) -> Clause {
    let rest = rest.trim_start().trim_start_matches('=').trim_start();
    let engine = take_identifier(rest).map(|(e, _)| e.to_ascii_lowercase());
    Clause {
        tag: Some(OperationTag::ChangeEngine),
        new_engine: engine,
        ..Default::default()
    }
}

// -- ADD ---------------------------------------------------------------------

fn classify_add(rest: &str) -> Clause {
    if let Some(after) = strip_keyword(rest, "constraint") {
        // ADD CONSTRAINT [name] FOREIGN KEY | CHECK | PRIMARY KEY | UNIQUE
        let (name, after_name) = match take_identifier(after) {
            Some((n, r))
                if !n.eq_ignore_ascii_case("foreign")
                    && !n.eq_ignore_ascii_case("check")
                    && !n.eq_ignore_ascii_case("primary")
                    && !n.eq_ignore_ascii_case("unique") =>
            {
                (Some(n), r)
            }
            _ => (None, after),
        };
        if strip_keywords(after_name, &["foreign", "key"]).is_some() {
            return Clause {
                tag: Some(OperationTag::AddForeignKey),
                index_name: name,
                ..Default::default()
            };
        }
        if strip_keyword(after_name, "check").is_some() {
            return Clause {
                tag: Some(OperationTag::AddCheckConstraint),
                index_name: name,
                ..Default::default()
            };
        }
        if strip_keywords(after_name, &["primary", "key"]).is_some() {
            return tagged(OperationTag::AddPrimaryKey);
        }
        if strip_keyword(after_name, "unique").is_some() {
            let mut clause =
                index_clause(after_name, OperationTag::AddIndex, &["unique", "index", "key"]);
            if clause.index_name.is_none() {
                clause.index_name = name;
            }
            return clause;
        }
        return tagged(OperationTag::OtherDdl);
    }

    if strip_keywords(rest, &["primary", "key"]).is_some() {
        return tagged(OperationTag::AddPrimaryKey);
    }
    if let Some(after) = strip_keywords(rest, &["foreign", "key"]) {
        let name = take_identifier(after).map(|(n, _)| n);
        return Clause {
            tag: Some(OperationTag::AddForeignKey),
            index_name: name,
            ..Default::default()
        };
    }
    if strip_keyword(rest, "check").is_some() {
        return tagged(OperationTag::AddCheckConstraint);
    }
    if strip_keyword(rest, "fulltext").is_some() {
        return index_clause(rest, OperationTag::AddFulltextIndex, &["fulltext", "index", "key"]);
    }
    if strip_keyword(rest, "spatial").is_some() {
        return index_clause(rest, OperationTag::AddSpatialIndex, &["spatial", "index", "key"]);
    }
    if strip_keyword(rest, "unique").is_some() {
        return index_clause(rest, OperationTag::AddIndex, &["unique", "index", "key"]);
    }
    if strip_keyword(rest, "index").is_some() || strip_keyword(rest, "key").is_some() {
        return index_clause(rest, OperationTag::AddIndex, &["index", "key"]);
    }
    if strip_keyword(rest, "partition").is_some() {
        return tagged(OperationTag::AddPartition);
    }

    let rest = strip_keyword(rest, "column").unwrap_or(rest);
    classify_column_def(rest, OperationTag::AddColumn)
}

/// Parses `[keyword...] [index_name] (...)`, skipping the leading keywords
/// that identify the index flavor.
fn index_clause(text: &str, tag: OperationTag, keywords: &[&str]) -> Clause {
    let mut rest = text;
    for k in keywords {
        if let Some(r) = strip_keyword(rest, k) {
            rest = r;
        }
    }
    let name = match take_identifier(rest) {
        Some((n, _)) => Some(n),
        None => None,
    };
    Clause {
        tag: Some(tag),
        index_name: name,
        ..Default::default()
    }
}

// -- DROP --------------------------------------------------------------------

fn classify_drop(rest: &str) -> Clause {
    if strip_keywords(rest, &["primary", "key"]).is_some() {
        return tagged(OperationTag::DropPrimaryKey);
    }
    if let Some(after) = strip_keywords(rest, &["foreign", "key"]) {
        return Clause {
            tag: Some(OperationTag::DropForeignKey),
            index_name: take_identifier(after).map(|(n, _)| n),
            ..Default::default()
        };
    }
    if let Some(after) = strip_keyword(rest, "check").or_else(|| strip_keyword(rest, "constraint"))
    {
        return Clause {
            tag: Some(OperationTag::DropCheckConstraint),
            index_name: take_identifier(after).map(|(n, _)| n),
            ..Default::default()
        };
    }
    if let Some(after) = strip_keyword(rest, "index").or_else(|| strip_keyword(rest, "key")) {
        return Clause {
            tag: Some(OperationTag::DropIndex),
            index_name: take_identifier(after).map(|(n, _)| n),
            ..Default::default()
        };
    }
    if strip_keyword(rest, "partition").is_some() {
        return tagged(OperationTag::DropPartition);
    }

    let rest = strip_keyword(rest, "column").unwrap_or(rest);
    Clause {
        tag: Some(OperationTag::DropColumn),
        column_name: take_identifier(rest).map(|(n, _)| n),
        ..Default::default()
    }
}

// -- MODIFY / CHANGE / ALTER COLUMN ------------------------------------------

fn classify_column_def(rest: &str, tag: OperationTag) -> Clause {
    let Some((name, after_name)) = take_identifier(rest) else {
        return tagged(OperationTag::OtherDdl);
    };
    let mut clause = parse_column_attributes(after_name);
    clause.tag = Some(tag);
    clause.column_name = Some(name);
    clause
}

fn classify_change(rest: &str) -> Clause {
    let rest = strip_keyword(rest, "column").unwrap_or(rest);
    let Some((old_name, after_old)) = take_identifier(rest) else {
        return tagged(OperationTag::OtherDdl);
    };
    let Some((new_name, after_new)) = take_identifier(after_old) else {
        return tagged(OperationTag::OtherDdl);
    };
    let mut clause = parse_column_attributes(after_new);
    clause.tag = Some(OperationTag::ChangeColumn);
    clause.old_column_name = Some(old_name);
    clause.new_column_name = Some(new_name);
    clause
}

fn classify_alter_column(rest: &str) -> Clause {
    let rest = strip_keyword(rest, "column").unwrap_or(rest);
    let Some((name, after_name)) = take_identifier(rest) else {
        return tagged(OperationTag::OtherDdl);
    };
    if strip_keywords(after_name, &["set", "default"]).is_some() {
        return Clause {
            tag: Some(OperationTag::SetDefault),
            column_name: Some(name),
            ..Default::default()
        };
    }
    if strip_keywords(after_name, &["drop", "default"]).is_some() {
        return Clause {
            tag: Some(OperationTag::DropDefault),
            column_name: Some(name),
            ..Default::default()
        };
    }
    tagged(OperationTag::OtherDdl)
}

// -- RENAME ------------------------------------------------------------------

fn classify_rename(rest: &str) -> Clause {
    if let Some(after) = strip_keyword(rest, "index").or_else(|| strip_keyword(rest, "key")) {
        return Clause {
            tag: Some(OperationTag::RenameIndex),
            index_name: take_identifier(after).map(|(n, _)| n),
            ..Default::default()
        };
    }
    if let Some(after) = strip_keyword(rest, "column") {
        // RENAME COLUMN old TO new: a rename-only CHANGE.
        let old = take_identifier(after);
        if let Some((old_name, after_old)) = old {
            if let Some(after_to) = strip_keyword(after_old, "to") {
                if let Some((new_name, _)) = take_identifier(after_to) {
                    return Clause {
                        tag: Some(OperationTag::ChangeColumn),
                        old_column_name: Some(old_name),
                        new_column_name: Some(new_name),
                        ..Default::default()
                    };
                }
            }
        }
        return tagged(OperationTag::OtherDdl);
    }
    // RENAME [TO|AS] new_table
    tagged(OperationTag::RenameTable)
}

// ---------------------------------------------------------------------------
// Column attribute extraction
// ---------------------------------------------------------------------------

fn nullability_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bnot\s+null\b").unwrap())
}

fn null_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bnull\b").unwrap())
}

fn charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:character\s+set|charset)\s+(\w+)").unwrap())
}

fn first_after_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:first|after\s+(?:`[^`]+`|\S+))\s*$").unwrap())
}

fn auto_increment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bauto_increment\b").unwrap())
}

fn generated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:generated\s+always\s+as|as)\s*\(").unwrap())
}

fn stored_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bstored\b").unwrap())
}

/// Extracts column attributes from the text following the column name.
fn parse_column_attributes(text: &str) -> Clause {
    let mut clause = Clause::default();

    let after_type = match take_type(text) {
        Some((type_text, rest)) => {
            clause.new_column_type = Some(type_text);
            rest
        }
        None => text,
    };

    if nullability_re().is_match(after_type) {
        clause.new_column_nullable = Some(false);
    } else if null_re().is_match(after_type) {
        clause.new_column_nullable = Some(true);
    }
    if let Some(caps) = charset_re().captures(after_type) {
        clause.new_column_charset = Some(caps[1].to_ascii_lowercase());
    }
    clause.is_first_after = first_after_re().is_match(after_type);
    clause.has_auto_increment = auto_increment_re().is_match(after_type);
    if generated_re().is_match(after_type) {
        clause.is_generated_column = true;
        clause.is_generated_stored = stored_re().is_match(after_type);
    }

    clause
}
