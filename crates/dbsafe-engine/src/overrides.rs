//! Contextual override layer: ordered rules that post-process a matrix row
//! using the parsed statement and live column metadata.
//!
//! The rule order is load-bearing: later rules see the output of earlier
//! ones, and the type-change escalation deliberately runs after the
//! relaxation rules so COPY always wins when both apply. Each rule is a
//! pure function from (current classification, inputs) to an optional
//! change; a rule emits at most one warning. Risk is a monotone floor:
//! rules may raise it, never lower it.

use dbsafe_core::classification::DdlClassification;
use dbsafe_core::enums::{Algorithm, LockLevel, OperationTag, RiskLevel};
use dbsafe_core::metadata::TableMetadata;
use dbsafe_core::report::SubOpResult;
use dbsafe_core::statement::ParsedStatement;
use dbsafe_core::version::VersionEra;

use crate::matrix;

// ---------------------------------------------------------------------------
// Rule plumbing
// ---------------------------------------------------------------------------

/// Read-only inputs every rule sees.
pub struct RuleInput<'a> {
    pub parsed: &'a ParsedStatement,
    pub meta: &'a TableMetadata,
    pub era: VersionEra,
    pub fk_checks_disabled: bool,
}

/// What one rule wants to change.
#[derive(Debug, Default)]
pub struct RuleChange {
    pub classification: Option<DdlClassification>,
    pub warning: Option<String>,
    pub risk_floor: Option<RiskLevel>,
    pub sub_results: Option<Vec<SubOpResult>>,
}

/// A single override rule.
pub type OverrideRule = fn(&DdlClassification, &RuleInput<'_>) -> Option<RuleChange>;

/// The override sequence. Order matters; do not sort.
pub const RULES: &[(&str, OverrideRule)] = &[
    ("unparsable-operation", unparsable_operation),
    ("multi-op-fusion", multi_op_fusion),
    ("first-after-add-column", first_after_add_column),
    ("same-engine-force", same_engine_force),
    ("auto-increment-add-column", auto_increment_add_column),
    ("generated-columns", generated_columns),
    ("nullability-change", nullability_change),
    ("charset-change", charset_change),
    ("varchar-length-tier", varchar_length_tier),
    ("enum-set-mutation", enum_set_mutation),
    ("type-change-with-reorder", type_change_with_reorder),
    ("rename-routing", rename_routing),
    ("fk-checks-enabled", fk_checks_enabled),
    ("column-existence", column_existence),
    ("trigger-preemption", trigger_preemption),
];

/// The accumulated result of running every rule in order.
#[derive(Debug)]
pub struct OverrideOutcome {
    pub classification: DdlClassification,
    pub warnings: Vec<String>,
    pub risk_floor: RiskLevel,
    pub sub_results: Vec<SubOpResult>,
}

/// Applies [`RULES`] in order to the matrix classification.
pub fn apply(base: DdlClassification, input: &RuleInput<'_>) -> OverrideOutcome {
    let mut outcome = OverrideOutcome {
        classification: base,
        warnings: Vec::new(),
        risk_floor: RiskLevel::Safe,
        sub_results: Vec::new(),
    };

    for (name, rule) in RULES {
        if let Some(change) = rule(&outcome.classification, input) {
            tracing::debug!(rule = name, "override rule fired");
            if let Some(c) = change.classification {
                outcome.classification = c;
            }
            if let Some(w) = change.warning {
                if !outcome.warnings.contains(&w) {
                    outcome.warnings.push(w);
                }
            }
            if let Some(r) = change.risk_floor {
                outcome.risk_floor = outcome.risk_floor.at_least(r);
            }
            if let Some(s) = change.sub_results {
                outcome.sub_results = s;
            }
        }
    }

    outcome
}

// ---------------------------------------------------------------------------
// Rule 1: unparsable operation
// ---------------------------------------------------------------------------

fn unparsable_operation(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    if input.parsed.op_tag != OperationTag::OtherDdl {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::safe_default(
            "statement could not be classified",
        )),
        warning: Some(
            "Statement could not be fully parsed; assuming the worst case \
             (COPY with SHARED lock)"
                .into(),
        ),
        risk_floor: Some(RiskLevel::Dangerous),
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 2: multi-op fusion
// ---------------------------------------------------------------------------

fn multi_op_fusion(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    let parsed = input.parsed;
    if parsed.op_tag != OperationTag::MultipleOps {
        return None;
    }

    let mut subs: Vec<SubOpResult> = Vec::with_capacity(parsed.sub_operations.len());
    let mut fused: Option<DdlClassification> = None;
    let auto_inc_column = parsed.has_auto_increment
        && parsed.sub_operations.contains(&OperationTag::AddColumn);

    for tag in &parsed.sub_operations {
        let c = if *tag == OperationTag::AddColumn && auto_inc_column {
            DdlClassification::new(
                Algorithm::Inplace,
                LockLevel::Shared,
                true,
                "AUTO_INCREMENT column addition",
            )
        } else {
            matrix::classify(*tag, input.era)
        };
        fused = Some(match fused {
            Some(f) => f.fused_with(&c),
            None => c.clone(),
        });
        subs.push(SubOpResult {
            operation: *tag,
            classification: c,
        });
    }

    let mut classification =
        fused.unwrap_or_else(|| DdlClassification::safe_default("no sub-operations parsed"));
    classification.notes = format!("combined from {} sub-operations", subs.len());

    Some(RuleChange {
        classification: Some(classification),
        warning: auto_inc_column.then(|| {
            "AUTO_INCREMENT column requires a SHARED lock; writes are blocked while \
             the table is rebuilt"
                .into()
        }),
        risk_floor: None,
        sub_results: Some(subs),
    })
}

// ---------------------------------------------------------------------------
// Rule 3: FIRST/AFTER on ADD COLUMN (initial-INSTANT era only)
// ---------------------------------------------------------------------------

fn first_after_add_column(
    current: &DdlClassification,
    input: &RuleInput<'_>,
) -> Option<RuleChange> {
    if input.parsed.op_tag != OperationTag::AddColumn
        || !input.parsed.is_first_after
        || input.era != VersionEra::Instant80
        || current.algorithm != Algorithm::Instant
    {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::new(
            Algorithm::Inplace,
            current.lock,
            current.rebuilds_table,
            "FIRST/AFTER placement prevents INSTANT before 8.0.29",
        )),
        warning: Some(
            "Column position (FIRST/AFTER) prevents INSTANT on this version; \
             INPLACE will be used"
                .into(),
        ),
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 4: same-engine FORCE detection
// ---------------------------------------------------------------------------

fn same_engine_force(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    if input.parsed.op_tag != OperationTag::ChangeEngine {
        return None;
    }
    let new_engine = input.parsed.new_engine.as_deref()?;
    if !input.meta.engine_is(new_engine) {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::new(
            Algorithm::Inplace,
            LockLevel::None,
            true,
            "target engine equals the current engine; null rebuild (FORCE)",
        )),
        warning: None,
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 5: AUTO_INCREMENT on ADD COLUMN
// ---------------------------------------------------------------------------

fn auto_increment_add_column(
    _: &DdlClassification,
    input: &RuleInput<'_>,
) -> Option<RuleChange> {
    if input.parsed.op_tag != OperationTag::AddColumn || !input.parsed.has_auto_increment {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::new(
            Algorithm::Inplace,
            LockLevel::Shared,
            true,
            "adding an AUTO_INCREMENT column seeds every row",
        )),
        warning: Some(
            "AUTO_INCREMENT column requires a SHARED lock; writes are blocked while \
             the table is rebuilt"
                .into(),
        ),
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 6: generated columns
// ---------------------------------------------------------------------------

fn generated_columns(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    let parsed = input.parsed;
    match parsed.op_tag {
        OperationTag::AddColumn if parsed.is_generated_column => {
            if parsed.is_generated_stored {
                Some(RuleChange {
                    classification: Some(DdlClassification::new(
                        Algorithm::Copy,
                        LockLevel::Shared,
                        true,
                        "STORED generated column is materialized for every row",
                    )),
                    warning: None,
                    risk_floor: None,
                    sub_results: None,
                })
            } else {
                Some(RuleChange {
                    classification: Some(DdlClassification::new(
                        Algorithm::Instant,
                        LockLevel::None,
                        false,
                        "VIRTUAL generated column is metadata-only",
                    )),
                    warning: None,
                    risk_floor: None,
                    sub_results: None,
                })
            }
        }
        OperationTag::DropColumn => {
            let col = input.meta.column(parsed.target_column()?)?;
            if !col.is_stored_generated {
                return None;
            }
            Some(RuleChange {
                classification: Some(DdlClassification::new(
                    Algorithm::Inplace,
                    LockLevel::None,
                    true,
                    "dropping a STORED generated column rebuilds in place",
                )),
                warning: None,
                risk_floor: None,
                sub_results: None,
            })
        }
        OperationTag::ModifyColumn if parsed.is_first_after => {
            let stored_in_meta = parsed
                .target_column()
                .and_then(|c| input.meta.column(c))
                .is_some_and(|c| c.is_stored_generated);
            if stored_in_meta || parsed.is_generated_stored {
                Some(RuleChange {
                    classification: Some(DdlClassification::new(
                        Algorithm::Copy,
                        LockLevel::Shared,
                        true,
                        "reordering a STORED generated column rewrites the table",
                    )),
                    warning: None,
                    risk_floor: None,
                    sub_results: None,
                })
            } else if parsed.is_generated_column {
                Some(RuleChange {
                    classification: Some(DdlClassification::new(
                        Algorithm::Inplace,
                        LockLevel::None,
                        false,
                        "reordering a VIRTUAL generated column does not touch row data",
                    )),
                    warning: None,
                    risk_floor: None,
                    sub_results: None,
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Rule 7: nullability change on MODIFY COLUMN (same base type)
// ---------------------------------------------------------------------------

fn nullability_change(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    let parsed = input.parsed;
    if parsed.op_tag != OperationTag::ModifyColumn {
        return None;
    }
    let new_nullable = parsed.new_column_nullable?;
    let col = input.meta.column(parsed.target_column()?)?;
    let new_type = parsed.new_column_type.as_deref()?;
    if base_type(new_type) != base_type(&col.type_text) || new_nullable == col.nullable {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::new(
            Algorithm::Inplace,
            LockLevel::None,
            true,
            "nullability change rebuilds in place without blocking DML",
        )),
        warning: None,
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 8: charset change on MODIFY COLUMN
// ---------------------------------------------------------------------------

fn charset_change(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    let parsed = input.parsed;
    if parsed.op_tag != OperationTag::ModifyColumn {
        return None;
    }
    let new_charset = parsed.new_column_charset.as_deref()?;
    let col = input.meta.column(parsed.target_column()?)?;
    let current = col.character_set.as_deref()?;
    if new_charset.eq_ignore_ascii_case(current) {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::new(
            Algorithm::Copy,
            LockLevel::Shared,
            true,
            "column charset conversion re-encodes every value",
        )),
        warning: Some(format!(
            "Charset change ({} -> {}) forces a full table rewrite",
            current, new_charset
        )),
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 9: VARCHAR length extension within the same prefix tier
// ---------------------------------------------------------------------------

fn varchar_length_tier(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    let parsed = input.parsed;
    if parsed.op_tag != OperationTag::ModifyColumn {
        return None;
    }
    let new_type = parsed.new_column_type.as_deref()?;
    let new_len = varchar_length(new_type)?;
    let col = input.meta.column(parsed.target_column()?)?;
    let old_len = varchar_length(&col.type_text)?;

    // Only a same-charset extension qualifies; a charset change was already
    // escalated by the previous rule.
    if let (Some(new_cs), Some(cur_cs)) = (
        parsed.new_column_charset.as_deref(),
        col.character_set.as_deref(),
    ) {
        if !new_cs.eq_ignore_ascii_case(cur_cs) {
            return None;
        }
    }

    let mbpc = col
        .character_set
        .as_deref()
        .map(charset_max_bytes)
        .unwrap_or(1);
    let old_tier = length_prefix_tier(old_len, mbpc);
    let new_tier = length_prefix_tier(new_len, mbpc);

    if new_len > old_len && new_tier == old_tier {
        Some(RuleChange {
            classification: Some(DdlClassification::new(
                Algorithm::Inplace,
                LockLevel::None,
                false,
                "VARCHAR extension within the same length-prefix tier",
            )),
            warning: None,
            risk_floor: None,
            sub_results: None,
        })
    } else if new_len > old_len {
        // Crossing from a 1-byte to a 2-byte length prefix changes the row
        // format, so the relaxation does not apply.
        Some(RuleChange {
            classification: None,
            warning: Some(format!(
                "VARCHAR({}) -> VARCHAR({}) crosses the 255-byte length-prefix \
                 boundary; the table will be rewritten",
                old_len, new_len
            )),
            risk_floor: None,
            sub_results: None,
        })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Rule 10: ENUM/SET mutation
// ---------------------------------------------------------------------------

fn enum_set_mutation(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    let parsed = input.parsed;
    if parsed.op_tag != OperationTag::ModifyColumn {
        return None;
    }
    let new_type = parsed.new_column_type.as_deref()?;
    let new_members = enum_set_members(new_type)?;
    let col = input.meta.column(parsed.target_column()?)?;
    let old_members = enum_set_members(&col.type_text)?;

    if base_type(new_type) != base_type(&col.type_text) {
        return None;
    }

    if is_suffix_append(&old_members, &new_members) {
        Some(RuleChange {
            classification: Some(DdlClassification::new(
                Algorithm::Instant,
                LockLevel::None,
                false,
                "appending ENUM/SET members is metadata-only",
            )),
            warning: None,
            risk_floor: None,
            sub_results: None,
        })
    } else {
        Some(RuleChange {
            classification: Some(DdlClassification::new(
                Algorithm::Copy,
                LockLevel::Shared,
                true,
                "reordering, inserting, or removing ENUM/SET members re-encodes stored values",
            )),
            warning: Some(
                "ENUM/SET members were reordered, inserted, or removed; every stored \
                 value must be re-encoded"
                    .into(),
            ),
            risk_floor: None,
            sub_results: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Rule 11: type change combined with FIRST/AFTER wins over relaxations
// ---------------------------------------------------------------------------

fn type_change_with_reorder(
    current: &DdlClassification,
    input: &RuleInput<'_>,
) -> Option<RuleChange> {
    let parsed = input.parsed;
    if parsed.op_tag != OperationTag::ModifyColumn
        || !parsed.is_first_after
        || current.algorithm == Algorithm::Copy
    {
        return None;
    }
    let new_type = parsed.new_column_type.as_deref()?;
    let col = input.meta.column(parsed.target_column()?)?;
    if normalized_type(new_type) == normalized_type(&col.type_text) {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::new(
            Algorithm::Copy,
            LockLevel::Shared,
            true,
            "type change combined with column reorder rewrites the table",
        )),
        warning: None,
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 12: ALTER TABLE ... RENAME TO routes through the rename entry
// ---------------------------------------------------------------------------

fn rename_routing(current: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    if input.parsed.op_tag != OperationTag::RenameTable {
        return None;
    }
    let rename = matrix::classify(OperationTag::RenameTable, input.era);
    if *current == rename {
        return None;
    }
    Some(RuleChange {
        classification: Some(rename),
        warning: None,
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 13: ADD FOREIGN KEY with foreign_key_checks = ON
// ---------------------------------------------------------------------------

fn fk_checks_enabled(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    if input.parsed.op_tag != OperationTag::AddForeignKey || input.fk_checks_disabled {
        return None;
    }
    Some(RuleChange {
        classification: Some(DdlClassification::new(
            Algorithm::Copy,
            LockLevel::Shared,
            true,
            "foreign_key_checks=1 validates every existing row",
        )),
        warning: Some(
            "foreign_key_checks is ON: existing rows will be validated and writes \
             blocked; run with foreign_key_checks=0 for an in-place add"
                .into(),
        ),
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Rule 14: column-existence validation
// ---------------------------------------------------------------------------

fn column_existence(_: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    let parsed = input.parsed;
    if !input.meta.has_column_metadata() {
        // No column snapshot: validation skipped.
        return None;
    }

    let warn = |message: String| {
        Some(RuleChange {
            classification: None,
            warning: Some(message),
            risk_floor: Some(RiskLevel::Dangerous),
            sub_results: None,
        })
    };

    match parsed.op_tag {
        OperationTag::AddColumn => {
            let name = parsed.column_name.as_deref()?;
            if input.meta.column(name).is_some() {
                return warn(format!("Column `{}` already exists; the statement will fail", name));
            }
            None
        }
        OperationTag::DropColumn | OperationTag::ModifyColumn => {
            let name = parsed.target_column()?;
            if input.meta.column(name).is_none() {
                return warn(format!("Column `{}` does not exist; the statement will fail", name));
            }
            None
        }
        OperationTag::ChangeColumn => {
            let old = parsed.old_column_name.as_deref()?;
            if input.meta.column(old).is_none() {
                return warn(format!("Column `{}` does not exist; the statement will fail", old));
            }
            if let Some(new) = parsed.new_column_name.as_deref() {
                if !new.eq_ignore_ascii_case(old) && input.meta.column(new).is_some() {
                    return warn(format!(
                        "Column `{}` already exists; the statement will fail",
                        new
                    ));
                }
            }
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Rule 15: triggers preempt gh-ost
// ---------------------------------------------------------------------------

fn trigger_preemption(current: &DdlClassification, input: &RuleInput<'_>) -> Option<RuleChange> {
    // Method selection later routes COPY to gh-ost; a trigger on the target
    // table makes that impossible, so the warning lands here and the
    // selector routes to pt-online-schema-change instead.
    if current.algorithm != Algorithm::Copy || !input.meta.has_triggers() {
        return None;
    }
    Some(RuleChange {
        classification: None,
        warning: Some(
            "Table has triggers: gh-ost cannot operate; pt-online-schema-change \
             will be used instead"
                .into(),
        ),
        risk_floor: None,
        sub_results: None,
    })
}

// ---------------------------------------------------------------------------
// Type-text helpers
// ---------------------------------------------------------------------------

/// The base type name: everything before `(` or whitespace, lower-cased.
fn base_type(type_text: &str) -> String {
    type_text
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Whitespace-insensitive, lower-cased comparison form of a type.
fn normalized_type(type_text: &str) -> String {
    type_text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Declared length of a `varchar(N)` type.
fn varchar_length(type_text: &str) -> Option<u32> {
    let t = type_text.trim().to_ascii_lowercase();
    let rest = t.strip_prefix("varchar")?.trim_start();
    let inner = rest.strip_prefix('(')?;
    let end = inner.find(')')?;
    inner[..end].trim().parse().ok()
}

/// Maximum bytes per character for a column charset.
///
/// Unknown charsets assume 4 bytes: overestimating pushes a length past the
/// 255-byte boundary and keeps the conservative COPY classification.
fn charset_max_bytes(charset: &str) -> u32 {
    match charset.to_ascii_lowercase().as_str() {
        "latin1" | "latin2" | "ascii" | "binary" | "cp1250" | "cp1251" | "cp1256" | "tis620"
        | "greek" | "hebrew" | "koi8r" | "koi8u" => 1,
        "big5" | "gbk" | "sjis" | "ucs2" | "cp932" | "euckr" => 2,
        "utf8" | "utf8mb3" | "eucjpms" | "ujis" => 3,
        _ => 4,
    }
}

/// VARCHAR length-prefix tier: 1 byte when every encoded value fits in 255
/// bytes, otherwise 2.
fn length_prefix_tier(declared_chars: u32, max_bytes_per_char: u32) -> u8 {
    if declared_chars * max_bytes_per_char <= 255 {
        1
    } else {
        2
    }
}

/// Member list of an `enum(...)` or `set(...)` type.
fn enum_set_members(type_text: &str) -> Option<Vec<String>> {
    let t = type_text.trim();
    let lower = t.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("enum")
        .or_else(|| lower.strip_prefix("set"))?;
    let open = t.len() - rest.len();
    let body = t[open..].trim_start().strip_prefix('(')?;
    let end = body.rfind(')')?;
    let body = &body[..end];

    let mut members = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quotes => {
                // Doubled quote inside a quoted member is an escaped quote.
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    in_quotes = false;
                    members.push(std::mem::take(&mut current));
                }
            }
            '\'' => in_quotes = true,
            _ if in_quotes => current.push(c),
            _ => {}
        }
    }
    if members.is_empty() { None } else { Some(members) }
}

/// Whether `new` is `old` plus zero or more members appended at the end.
fn is_suffix_append(old: &[String], new: &[String]) -> bool {
    new.len() >= old.len() && new[..old.len()] == *old
}
