use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded SQL literal. Decoding is total: anything that is not a NULL
/// marker, an unsigned integer, or a quoted string comes back as verbatim
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text content with NULL flattened to the empty string.
    pub fn text_or_empty(&self) -> &str {
        match self {
            SqlValue::Text(s) => s,
            _ => "",
        }
    }
}

/// One row's literals, positionally aligned to the source table's column
/// order.
pub type DecodedRow = Vec<SqlValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Author,
    Category,
    Post,
    Page,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Author => "author",
            EntityKind::Category => "category",
            EntityKind::Post => "post",
            EntityKind::Page => "page",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a row was dropped. Recoverable failures are counted and logged,
/// never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Malformed tuple or field
    Parse,
    /// Missing or unusable required field
    Validation,
    /// The store rejected the write
    Reconciliation,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Parse => "parse",
            SkipReason::Validation => "validation",
            SkipReason::Reconciliation => "reconciliation",
        };
        f.write_str(s)
    }
}

/// A skipped source row, retained for the optional end-of-run report.
#[derive(Debug, Clone)]
pub struct SkipRecord {
    pub table: String,
    pub legacy_id: String,
    pub reason: SkipReason,
    pub detail: String,
}
