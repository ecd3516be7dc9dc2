//! Typed row schemas for the known source tables.
//!
//! Each source table has a fixed column order; a row is built from a
//! [`DecodedRow`] only when it carries at least the expected column
//! count, so a reordered or truncated dump fails with a clear
//! "expected N columns, got M" diagnostic instead of silently
//! misaligning fields.

use crate::models::{DecodedRow, SqlValue};
use anyhow::{bail, Result};

pub const USERS: &str = "users";
pub const TERMS: &str = "terms";
pub const TERM_TAXONOMY: &str = "term_taxonomy";
pub const TERM_RELATIONSHIPS: &str = "term_relationships";
pub const POSTS: &str = "posts";

pub const USERS_COLUMNS: usize = 10;
pub const TERMS_COLUMNS: usize = 4;
pub const TERM_TAXONOMY_COLUMNS: usize = 6;
pub const TERM_RELATIONSHIPS_COLUMNS: usize = 3;
pub const POSTS_COLUMNS: usize = 23;

/// Prepends the install's table prefix to a base table name.
pub fn qualified(prefix: &str, table: &str) -> String {
    format!("{}{}", prefix, table)
}

fn check_len(table: &str, row: &DecodedRow, expected: usize) -> Result<()> {
    if row.len() < expected {
        bail!("{} row: expected {} columns, got {}", table, expected, row.len());
    }
    Ok(())
}

fn int_at(table: &str, row: &DecodedRow, idx: usize, column: &str) -> Result<i64> {
    match &row[idx] {
        SqlValue::Integer(n) => Ok(*n),
        other => bail!("{} row: column {} is not an integer: {:?}", table, column, other),
    }
}

fn text_at(row: &DecodedRow, idx: usize) -> String {
    row[idx].text_or_empty().to_string()
}

/// `users`: ID, user_login, user_pass, user_nicename, user_email,
/// user_url, user_registered, user_activation_key, user_status,
/// display_name
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub login: String,
    pub slug: String,
    pub email: String,
    pub registered: String,
    pub display_name: String,
}

impl UserRow {
    pub fn from_row(row: &DecodedRow) -> Result<Self> {
        check_len(USERS, row, USERS_COLUMNS)?;
        Ok(Self {
            id: int_at(USERS, row, 0, "ID")?,
            login: text_at(row, 1),
            slug: text_at(row, 3),
            email: text_at(row, 4),
            registered: text_at(row, 6),
            display_name: text_at(row, 9),
        })
    }
}

/// `terms`: term_id, name, slug, term_group
#[derive(Debug, Clone, PartialEq)]
pub struct TermRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl TermRow {
    pub fn from_row(row: &DecodedRow) -> Result<Self> {
        check_len(TERMS, row, TERMS_COLUMNS)?;
        Ok(Self {
            id: int_at(TERMS, row, 0, "term_id")?,
            name: text_at(row, 1),
            slug: text_at(row, 2),
        })
    }
}

/// `term_taxonomy`: term_taxonomy_id, term_id, taxonomy, description,
/// parent, count
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyRow {
    pub id: i64,
    pub term_id: i64,
    pub taxonomy: String,
    pub description: String,
}

impl TaxonomyRow {
    pub fn from_row(row: &DecodedRow) -> Result<Self> {
        check_len(TERM_TAXONOMY, row, TERM_TAXONOMY_COLUMNS)?;
        Ok(Self {
            id: int_at(TERM_TAXONOMY, row, 0, "term_taxonomy_id")?,
            term_id: int_at(TERM_TAXONOMY, row, 1, "term_id")?,
            taxonomy: text_at(row, 2),
            description: text_at(row, 3),
        })
    }
}

/// `term_relationships`: object_id, term_taxonomy_id, term_order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipRow {
    pub object_id: i64,
    pub term_taxonomy_id: i64,
}

impl RelationshipRow {
    pub fn from_row(row: &DecodedRow) -> Result<Self> {
        check_len(TERM_RELATIONSHIPS, row, TERM_RELATIONSHIPS_COLUMNS)?;
        Ok(Self {
            object_id: int_at(TERM_RELATIONSHIPS, row, 0, "object_id")?,
            term_taxonomy_id: int_at(TERM_RELATIONSHIPS, row, 1, "term_taxonomy_id")?,
        })
    }
}

/// `posts`: ID, post_author, post_date, post_date_gmt, post_content,
/// post_title, post_excerpt, post_status, comment_status, ping_status,
/// post_password, post_name, to_ping, pinged, post_modified,
/// post_modified_gmt, post_content_filtered, post_parent, guid,
/// menu_order, post_type, post_mime_type, comment_count
#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub id: i64,
    pub author: i64,
    pub date: String,
    pub content: String,
    pub title: String,
    pub excerpt: String,
    pub status: String,
    pub slug: String,
    pub post_type: String,
}

impl PostRow {
    pub fn from_row(row: &DecodedRow) -> Result<Self> {
        check_len(POSTS, row, POSTS_COLUMNS)?;
        Ok(Self {
            id: int_at(POSTS, row, 0, "ID")?,
            author: int_at(POSTS, row, 1, "post_author")?,
            date: text_at(row, 2),
            content: text_at(row, 4),
            title: text_at(row, 5),
            excerpt: text_at(row, 6),
            status: text_at(row, 7),
            slug: text_at(row, 11),
            post_type: text_at(row, 20),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_row;

    fn user_tuple() -> &'static str {
        "2, 'jdoe', 'hash', 'jdoe', 'JDoe@Example.com', '', '2019-05-01 10:00:00', '', 0, 'John Doe'"
    }

    #[test]
    fn user_row_from_tuple() {
        let user = UserRow::from_row(&decode_row(user_tuple())).unwrap();
        assert_eq!(user.id, 2);
        assert_eq!(user.login, "jdoe");
        assert_eq!(user.slug, "jdoe");
        assert_eq!(user.email, "JDoe@Example.com");
        assert_eq!(user.display_name, "John Doe");
    }

    #[test]
    fn short_row_reports_expected_and_actual() {
        let err = UserRow::from_row(&decode_row("1, 'a'")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected 10 columns, got 2"), "{}", msg);
    }

    #[test]
    fn extra_columns_tolerated() {
        let tuple = format!("{}, 'spilled'", user_tuple());
        assert!(UserRow::from_row(&decode_row(&tuple)).is_ok());
    }

    #[test]
    fn non_integer_id_rejected() {
        let err = TermRow::from_row(&decode_row("'x', 'News', 'news', 0")).unwrap_err();
        assert!(err.to_string().contains("term_id"));
    }

    #[test]
    fn term_and_taxonomy_rows() {
        let term = TermRow::from_row(&decode_row("5, 'News', 'news', 0")).unwrap();
        assert_eq!((term.id, term.name.as_str(), term.slug.as_str()), (5, "News", "news"));

        let tax = TaxonomyRow::from_row(&decode_row("7, 5, 'category', 'All news', 0, 12")).unwrap();
        assert_eq!(tax.id, 7);
        assert_eq!(tax.term_id, 5);
        assert_eq!(tax.taxonomy, "category");
    }

    #[test]
    fn relationship_row() {
        let rel = RelationshipRow::from_row(&decode_row("10, 7, 0")).unwrap();
        assert_eq!((rel.object_id, rel.term_taxonomy_id), (10, 7));
    }

    #[test]
    fn post_row_column_positions() {
        let tuple = "1, 2, '2020-01-01 00:00:00', '2020-01-01 00:00:00', '<p>Body</p>', 'Hi', \
                     'ex', 'publish', 'open', 'open', '', 'hi', '', '', '2020-01-01 00:00:00', \
                     '2020-01-01 00:00:00', '', 0, 'https://example.com/?p=1', 0, 'post', '', 0";
        let post = PostRow::from_row(&decode_row(tuple)).unwrap();
        assert_eq!(post.id, 1);
        assert_eq!(post.author, 2);
        assert_eq!(post.content, "<p>Body</p>");
        assert_eq!(post.title, "Hi");
        assert_eq!(post.excerpt, "ex");
        assert_eq!(post.status, "publish");
        assert_eq!(post.slug, "hi");
        assert_eq!(post.post_type, "post");
    }

    #[test]
    fn null_text_columns_flatten_to_empty() {
        let tuple = "3, 'login', 'hash', NULL, NULL, '', '2019-05-01', '', 0, NULL";
        let user = UserRow::from_row(&decode_row(tuple)).unwrap();
        assert_eq!(user.slug, "");
        assert_eq!(user.email, "");
        assert_eq!(user.display_name, "");
    }

    #[test]
    fn qualified_prefixes() {
        assert_eq!(qualified("wp_", USERS), "wp_users");
        assert_eq!(qualified("legacy_", POSTS), "legacy_posts");
    }
}
