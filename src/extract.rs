//! Statement extraction: isolates `INSERT INTO <table> ... ;` statements
//! for one source table from the full dump text.
//!
//! Statements are yielded lazily as borrowed slices of the dump. The
//! terminating semicolon is found with a quote-aware scan, so a `;`
//! embedded in a string literal never ends a statement early.

use tracing::debug;

/// One `INSERT` statement, borrowed from the dump text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStatement<'a> {
    /// The table identifier as it appears in the dump
    pub table: &'a str,
    /// The full statement text, terminating semicolon included
    pub text: &'a str,
}

/// Returns a lazy iterator over all `INSERT INTO <table>` statements.
/// Absence of data is valid: no matches yields an empty iterator.
pub fn statements<'a>(dump: &'a str, table: &str) -> StatementIter<'a> {
    StatementIter {
        dump,
        table: table.to_string(),
        pos: 0,
    }
}

pub struct StatementIter<'a> {
    dump: &'a str,
    table: String,
    pos: usize,
}

impl<'a> Iterator for StatementIter<'a> {
    type Item = RawStatement<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.dump.as_bytes();
        while self.pos < self.dump.len() {
            let head = match find_keyword_ci(bytes, self.pos, b"insert into") {
                Some(h) => h,
                None => {
                    self.pos = self.dump.len();
                    return None;
                }
            };

            let after_kw = head + "insert into".len();
            let span = match match_table(self.dump, after_kw, &self.table) {
                Some(span) => span,
                None => {
                    // A statement for some other table: jump past the
                    // whole statement, so an INSERT INTO embedded in its
                    // string literals is never taken for a real head.
                    self.pos = statement_end(self.dump, head).unwrap_or(self.dump.len());
                    continue;
                }
            };

            match statement_end(self.dump, head) {
                Some(end) => {
                    self.pos = end;
                    return Some(RawStatement {
                        table: &self.dump[span.0..span.1],
                        text: &self.dump[head..end],
                    });
                }
                None => {
                    // Unterminated statement: nothing more is usable.
                    debug!(table = %self.table, "Unterminated INSERT at end of dump");
                    self.pos = self.dump.len();
                    return None;
                }
            }
        }
        None
    }
}

/// Returns the text after the top-level `VALUES` keyword of a statement,
/// or `None` if the statement has no values clause.
pub fn values_clause(stmt: &str) -> Option<&str> {
    let bytes = stmt.as_bytes();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for i in 0..bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth -= 1,
                b'v' | b'V' if depth == 0 && keyword_at(bytes, i, b"values") => {
                    return Some(&stmt[i + "values".len()..]);
                }
                _ => {}
            }
        }
    }
    None
}

/// Case-insensitive needle search on raw bytes, requiring a word boundary
/// before the match. The needle must be lowercase ASCII.
fn find_keyword_ci(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if bytes.len() < needle.len() {
        return None;
    }
    for i in from..=bytes.len() - needle.len() {
        if keyword_at(bytes, i, needle) {
            return Some(i);
        }
    }
    None
}

fn keyword_at(bytes: &[u8], i: usize, needle: &[u8]) -> bool {
    if i + needle.len() > bytes.len() {
        return false;
    }
    if !bytes[i..i + needle.len()]
        .iter()
        .zip(needle.iter())
        .all(|(a, b)| a.to_ascii_lowercase() == *b)
    {
        return false;
    }
    let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
    let after = i + needle.len();
    let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
    before_ok && after_ok
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Matches the (optionally backtick-quoted) table identifier after the
/// `INSERT INTO` keyword. Returns the identifier's byte span.
fn match_table(dump: &str, from: usize, table: &str) -> Option<(usize, usize)> {
    let bytes = dump.as_bytes();
    let mut i = from;

    let ws_start = i;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i == ws_start {
        return None;
    }

    let quoted = i < bytes.len() && bytes[i] == b'`';
    if quoted {
        i += 1;
    }

    let start = i;
    while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
    }
    if !dump[start..i].eq_ignore_ascii_case(table) {
        return None;
    }
    if quoted && (i >= bytes.len() || bytes[i] != b'`') {
        return None;
    }
    Some((start, i))
}

/// Index one past the first semicolon at string-depth zero, scanning from
/// `from`. `None` if the statement never terminates.
fn statement_end(dump: &str, from: usize) -> Option<usize> {
    let bytes = dump.as_bytes();
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for i in from..bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' => quote = Some(b),
                b';' => return Some(i + 1),
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_statement() {
        let dump = "INSERT INTO wp_users VALUES (1, 'a');";
        let stmts: Vec<_> = statements(dump, "wp_users").collect();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].table, "wp_users");
        assert_eq!(stmts[0].text, dump);
    }

    #[test]
    fn backticked_table_name() {
        let dump = "INSERT INTO `wp_users` (`ID`) VALUES (1);";
        let stmts: Vec<_> = statements(dump, "wp_users").collect();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].table, "wp_users");
    }

    #[test]
    fn other_tables_are_skipped() {
        let dump = "INSERT INTO wp_posts VALUES (1);\nINSERT INTO wp_users VALUES (2);";
        let stmts: Vec<_> = statements(dump, "wp_users").collect();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].text.contains("(2)"));
    }

    #[test]
    fn prefix_table_does_not_match() {
        let dump = "INSERT INTO wp_usersmeta VALUES (1);";
        assert_eq!(statements(dump, "wp_users").count(), 0);
    }

    #[test]
    fn multiline_statement() {
        let dump = "INSERT INTO wp_posts\nVALUES\n(1, 'a'),\n(2, 'b');";
        let stmts: Vec<_> = statements(dump, "wp_posts").collect();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].text.ends_with(";"));
    }

    #[test]
    fn semicolon_inside_string_does_not_terminate() {
        let dump = "INSERT INTO wp_posts VALUES (1, 'a; b');\nINSERT INTO wp_posts VALUES (2, 'c');";
        let stmts: Vec<_> = statements(dump, "wp_posts").collect();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].text, "INSERT INTO wp_posts VALUES (1, 'a; b');");
    }

    #[test]
    fn escaped_quote_then_semicolon() {
        let dump = r"INSERT INTO wp_posts VALUES (1, 'it\'s; fine');";
        let stmts: Vec<_> = statements(dump, "wp_posts").collect();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].text, dump);
    }

    #[test]
    fn no_statements_is_empty_not_error() {
        assert_eq!(statements("SELECT 1;", "wp_users").count(), 0);
        assert_eq!(statements("", "wp_users").count(), 0);
    }

    #[test]
    fn unterminated_statement_yields_nothing_further() {
        let dump = "INSERT INTO wp_posts VALUES (1, 'a');\nINSERT INTO wp_posts VALUES (2, 'open";
        let stmts: Vec<_> = statements(dump, "wp_posts").collect();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn insert_inside_another_tables_string_is_not_a_head() {
        let dump = "INSERT INTO wp_posts VALUES (1, 'see INSERT INTO wp_users VALUES (9); above');\n\
                    INSERT INTO wp_users VALUES (2);";
        let stmts: Vec<_> = statements(dump, "wp_users").collect();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].text, "INSERT INTO wp_users VALUES (2);");
    }

    #[test]
    fn lowercase_keyword_matches() {
        let dump = "insert into wp_users values (1);";
        assert_eq!(statements(dump, "wp_users").count(), 1);
    }

    #[test]
    fn keyword_requires_word_boundary() {
        let dump = "reinsert into wp_users values (1);";
        assert_eq!(statements(dump, "wp_users").count(), 0);
    }

    #[test]
    fn values_clause_basic() {
        let v = values_clause("INSERT INTO t (a, b) VALUES (1, 2);").unwrap();
        assert_eq!(v.trim(), "(1, 2);");
    }

    #[test]
    fn values_clause_ignores_column_named_values() {
        let v = values_clause("INSERT INTO t (`values`, b) VALUES (1, 2);").unwrap();
        assert_eq!(v.trim(), "(1, 2);");
    }

    #[test]
    fn values_clause_ignores_keyword_in_string() {
        // No top-level VALUES keyword before the real one.
        let stmt = "INSERT INTO t (a) VALUES ('VALUES');";
        let v = values_clause(stmt).unwrap();
        assert_eq!(v.trim(), "('VALUES');");
    }

    #[test]
    fn values_clause_missing() {
        assert!(values_clause("INSERT INTO t SET a = 1;").is_none());
    }
}
