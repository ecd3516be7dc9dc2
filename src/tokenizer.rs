//! Character-scanning tokenizer for `VALUES (...), (...), ...` clauses.
//!
//! The scanner never interprets literals; it only finds their boundaries.
//! String state has priority over paren counting, so parentheses, commas
//! and semicolons inside quoted literals are inert.

/// Splits the text after `VALUES` into one verbatim slice per row-tuple,
/// without the enclosing parentheses.
///
/// Tracks paren depth on unquoted parens and a string sub-state entered on
/// an unescaped `'` or `"`, exited only by an unescaped matching quote.
/// A backslash inside a string makes the next byte literal. If the input
/// ends before depth returns to zero, the unterminated tuple is dropped
/// and everything captured so far is returned.
pub fn split_tuples(values: &str) -> Vec<&str> {
    let bytes = values.as_bytes();
    let mut tuples = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'(' {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut depth: i32 = 1;
        let mut quote: Option<u8> = None;
        let mut escaped = false;
        let mut end = None;
        i += 1;

        while i < bytes.len() {
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
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i);
                            i += 1;
                            break;
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }

        match end {
            Some(e) => tuples.push(&values[start..e]),
            None => break,
        }
    }

    tuples
}

/// Splits one tuple's text on top-level commas. Same string/escape-aware
/// scan as [`split_tuples`], with paren tracking so commas inside nested
/// call syntax do not split. Fields are trimmed of surrounding whitespace.
pub fn split_fields(tuple: &str) -> Vec<&str> {
    let bytes = tuple.as_bytes();
    let mut fields = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
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
                b',' if depth == 0 => {
                    fields.push(tuple[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
    }

    fields.push(tuple[start..].trim());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tuple() {
        assert_eq!(split_tuples("(1, 'a')"), vec!["1, 'a'"]);
    }

    #[test]
    fn multiple_tuples() {
        assert_eq!(
            split_tuples("(1, 'a'), (2, 'b'), (3, 'c')"),
            vec!["1, 'a'", "2, 'b'", "3, 'c'"]
        );
    }

    #[test]
    fn paren_inside_string_does_not_terminate() {
        assert_eq!(split_tuples("(1, 'a (test) b')"), vec!["1, 'a (test) b'"]);
    }

    #[test]
    fn comma_inside_string_does_not_split() {
        assert_eq!(split_fields("1, 'a, b', 2"), vec!["1", "'a, b'", "2"]);
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        assert_eq!(
            split_tuples(r"(1, 'O\'Brien'), (2, 'x')"),
            vec![r"1, 'O\'Brien'", "2, 'x'"]
        );
    }

    #[test]
    fn double_quoted_strings() {
        assert_eq!(split_tuples(r#"(1, "it's fine")"#), vec![r#"1, "it's fine""#]);
    }

    #[test]
    fn nested_parens_at_top_level() {
        assert_eq!(split_tuples("(1, (2, 3))"), vec!["1, (2, 3)"]);
        assert_eq!(split_fields("1, (2, 3)"), vec!["1", "(2, 3)"]);
    }

    #[test]
    fn unterminated_tuple_preserves_earlier_captures() {
        assert_eq!(split_tuples("(1, 'a'), (2, 'unterminated"), vec!["1, 'a'"]);
    }

    #[test]
    fn unterminated_string_swallows_rest() {
        // The open quote hides the closing paren; nothing usable remains.
        assert!(split_tuples("(1, 'no close)").is_empty());
    }

    #[test]
    fn empty_input() {
        assert!(split_tuples("").is_empty());
        assert!(split_tuples("   ;").is_empty());
    }

    #[test]
    fn junk_between_tuples_is_skipped() {
        assert_eq!(split_tuples(" (1) , \n (2) ;"), vec!["1", "2"]);
    }

    #[test]
    fn tuple_round_trip() {
        let inputs = [
            "1, 'a'",
            r"1, 'O\'Brien', NULL",
            "1, 'a (b, c) d', \"e\"",
            r"'\\', '\n'",
        ];
        for t in inputs {
            let rejoined = format!("({})", t);
            assert_eq!(split_tuples(&rejoined), vec![t]);
        }
    }

    #[test]
    fn fields_trimmed() {
        assert_eq!(split_fields("  1 ,  'a'  "), vec!["1", "'a'"]);
    }

    #[test]
    fn empty_tuple_yields_single_empty_field() {
        assert_eq!(split_fields(""), vec![""]);
    }

    #[test]
    fn non_ascii_content_is_preserved() {
        assert_eq!(split_tuples("(1, 'héllo, wörld')"), vec!["1, 'héllo, wörld'"]);
        assert_eq!(split_fields("'héllo, wörld', 2"), vec!["'héllo, wörld'", "2"]);
    }
}
