//! Identifier and token scanning helpers shared by the DDL and DML paths.

/// A table reference split into schema and table, backticks stripped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

/// Parses `db.table`, `` `db`.`table` ``, or a bare table name.
pub fn parse_table_ref(text: &str) -> TableRef {
    let text = text.trim().trim_end_matches(';');
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_backticks = false;
    for c in text.chars() {
        match c {
            '`' => in_backticks = !in_backticks,
            '.' if !in_backticks => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    match parts.len() {
        2 => TableRef {
            database: parts[0].clone(),
            table: parts[1].clone(),
        },
        _ => TableRef {
            database: String::new(),
            table: parts.last().cloned().unwrap_or_default(),
        },
    }
}

/// Takes the next identifier from `text`, returning it (backticks stripped)
/// and the remainder. Identifiers are backtick-quoted or bare words.
pub fn take_identifier(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();
    if let Some(rest) = text.strip_prefix('`') {
        let end = rest.find('`')?;
        Some((rest[..end].to_string(), &rest[end + 1..]))
    } else {
        let end = text
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(text.len());
        if end == 0 {
            return None;
        }
        Some((text[..end].to_string(), &text[end..]))
    }
}

/// Takes a column type from the start of `text`: a word plus an optional
/// balanced, quote-aware parenthesized group (so `enum('a)b','c')` scans
/// correctly), plus immediately-following width modifiers.
///
/// The type text is returned lower-cased; the remainder is untouched.
pub fn take_type(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();
    let word_end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    if word_end == 0 {
        return None;
    }
    let mut end = word_end;
    let after_word = text[word_end..].trim_start();
    if after_word.starts_with('(') {
        let offset = text.len() - after_word.len();
        let group_len = balanced_group_len(after_word)?;
        end = offset + group_len;
    }

    // Width / sign modifiers belong to the type.
    let mut rest = &text[end..];
    for modifier in ["unsigned", "zerofill"] {
        let trimmed = rest.trim_start();
        let bytes = trimmed.as_bytes();
        if bytes.len() >= modifier.len()
            && bytes[..modifier.len()].eq_ignore_ascii_case(modifier.as_bytes())
            && bytes
                .get(modifier.len())
                .is_none_or(|b| !b.is_ascii_alphanumeric())
        {
            let consumed = (rest.len() - trimmed.len()) + modifier.len();
            end += consumed;
            rest = &text[end..];
        }
    }

    Some((text[..end].to_ascii_lowercase(), &text[end..]))
}

/// Length of a balanced `(...)` group at the start of `text`, honoring
/// single-quoted strings (with doubled-quote escapes) inside it.
fn balanced_group_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' if in_quotes => {
                if chars.peek().map(|(_, c)| *c) == Some('\'') {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '\'' => in_quotes = true,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits `text` on top-level commas: commas inside parentheses or quoted
/// strings do not split.
pub fn split_top_level_commas(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quotes => {
                current.push(c);
                if chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '\'' => {
                in_quotes = true;
                current.push(c);
            }
            '(' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_quotes => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if !in_quotes && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let last = current.trim().to_string();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// Case-insensitive keyword-prefix test that respects word boundaries:
/// `starts_with_keyword("add index i", "add")` is true, but
/// `starts_with_keyword("additional", "add")` is not. Returns the remainder
/// after the keyword on a match.
pub fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let text = text.trim_start();
    let prefix = text.get(..keyword.len())?;
    if !prefix.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if !c.is_alphanumeric() && c != '_' => Some(rest),
        _ => None,
    }
}

/// Strips a sequence of keywords, each honoring word boundaries.
pub fn strip_keywords<'a>(text: &'a str, keywords: &[&str]) -> Option<&'a str> {
    let mut rest = text;
    for k in keywords {
        rest = strip_keyword(rest, k)?;
    }
    Some(rest)
}
