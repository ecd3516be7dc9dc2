//! The migration orchestrator: sequences extraction, decoding,
//! normalization, identity resolution and reconciliation per source
//! table, in foreign-key order (authors and categories before content).
//!
//! A single bad row never halts a run; it is skipped, counted and logged.
//! Only an unreadable input or a broken store aborts.

use crate::config::{DEFAULT_AUTHOR_SLUG, DEFAULT_TABLE_PREFIX, MIN_BODY_LENGTH, PROGRESS_INTERVAL};
use crate::decode::decode_row;
use crate::extract::{statements, values_clause};
use crate::models::{DecodedRow, EntityKind, SkipReason, SkipRecord, SqlValue};
use crate::normalize::{normalize, slugify};
use crate::resolve::{merge_duplicate_authors, ResolutionContext};
use crate::schema::{self, PostRow, RelationshipRow, TaxonomyRow, TermRow, UserRow};
use crate::stats::ImportStats;
use crate::store::{reconcile, FieldMap, Store};
use crate::tokenizer::split_tuples;
use crate::xml::{parse_export, XmlAuthor, XmlItem};
use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use indicatif::ProgressBar;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub table_prefix: String,
    /// Admit `draft` and `private` rows in addition to `publish`
    pub include_drafts: bool,
    /// Natural key of the author assigned when a legacy author id cannot
    /// be resolved
    pub default_author: String,
    pub min_body_length: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            include_drafts: false,
            default_author: DEFAULT_AUTHOR_SLUG.to_string(),
            min_body_length: MIN_BODY_LENGTH,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub stats: ImportStats,
    pub skips: Vec<SkipRecord>,
}

/// Reads the whole input into memory, decompressing `.bz2` transparently.
pub fn read_input(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
    let mut text = String::new();
    if path.extension().is_some_and(|e| e == "bz2") {
        BzDecoder::new(file)
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to decompress input: {}", path.display()))?;
    } else {
        file.read_to_string(&mut text)
            .with_context(|| format!("Failed to read input: {}", path.display()))?;
    }
    Ok(text)
}

/// Runs the full SQL-dump pipeline against the store.
pub fn run_sql<S: Store>(dump: &str, store: &mut S, opts: &ImportOptions) -> Result<RunSummary> {
    let mut run = Migration::new(store, opts);
    run.import_sql_authors(dump);
    run.import_sql_categories(dump);
    run.collect_sql_relationships(dump);
    run.import_sql_posts(dump);
    run.merge_authors()?;
    Ok(run.finish())
}

/// Runs the XML-export pipeline against the store. Structural XML errors
/// are fatal; per-item problems are skipped and counted.
pub fn run_xml<S: Store>(text: &str, store: &mut S, opts: &ImportOptions) -> Result<RunSummary> {
    let export = parse_export(text)?;
    info!(
        authors = export.authors.len(),
        items = export.items.len(),
        "Parsed XML export"
    );

    let mut run = Migration::new(store, opts);
    let mut logins: FxHashMap<String, u64> = FxHashMap::default();
    let mut category_keys: FxHashMap<String, u64> = FxHashMap::default();

    for author in &export.authors {
        run.import_xml_author(author, &mut logins);
    }
    for item in &export.items {
        run.import_xml_item(item, &logins, &mut category_keys);
    }
    run.merge_authors()?;
    Ok(run.finish())
}

/// One run's worth of mutable pipeline state: the store handle, the
/// resolution maps, the counters and the skip log.
struct Migration<'a, S: Store> {
    store: &'a mut S,
    opts: &'a ImportOptions,
    ctx: ResolutionContext,
    stats: ImportStats,
    skips: Vec<SkipRecord>,
    progress: ProgressBar,
    rows_seen: u64,
    default_author_id: Option<u64>,
}

impl<'a, S: Store> Migration<'a, S> {
    fn new(store: &'a mut S, opts: &'a ImportOptions) -> Self {
        Self {
            store,
            opts,
            ctx: ResolutionContext::new(),
            stats: ImportStats::new(),
            skips: Vec::new(),
            progress: ProgressBar::new_spinner(),
            rows_seen: 0,
            default_author_id: None,
        }
    }

    fn finish(self) -> RunSummary {
        self.progress.finish_and_clear();
        RunSummary {
            stats: self.stats,
            skips: self.skips,
        }
    }

    fn tick(&mut self) {
        self.rows_seen += 1;
        if self.rows_seen % PROGRESS_INTERVAL == 0 {
            self.progress.tick();
        }
    }

    fn skip(
        &mut self,
        kind: EntityKind,
        table: &str,
        legacy_id: String,
        reason: SkipReason,
        detail: String,
    ) {
        warn!(table, legacy_id = %legacy_id, %reason, detail = %detail, "Row skipped");
        self.stats.skip(kind);
        self.skips.push(SkipRecord {
            table: table.to_string(),
            legacy_id,
            reason,
            detail,
        });
    }

    /// Finds or creates the fallback author, once per run.
    fn default_author(&mut self) -> Result<u64> {
        if let Some(id) = self.default_author_id {
            return Ok(id);
        }
        let key = self.opts.default_author.clone();
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), key.clone());
        let outcome = reconcile(&mut *self.store, EntityKind::Author, &key, fields)?;
        self.stats.record(EntityKind::Author, outcome);
        self.default_author_id = Some(outcome.id());
        Ok(outcome.id())
    }

    fn merge_authors(&mut self) -> Result<()> {
        let merged = merge_duplicate_authors(&mut *self.store)?;
        if merged > 0 {
            info!(merged, "Duplicate authors collapsed");
        }
        self.stats.add_merged(EntityKind::Author, merged);
        Ok(())
    }

    // ---- SQL dump stages ----

    fn import_sql_authors(&mut self, dump: &str) {
        let table = schema::qualified(&self.opts.table_prefix, schema::USERS);
        for tuple in table_tuples(dump, &table) {
            self.tick();
            let row = decode_row(tuple);
            match UserRow::from_row(&row) {
                Ok(user) => self.import_author(&table, user),
                Err(e) => self.skip(
                    EntityKind::Author,
                    &table,
                    legacy_id_of(&row),
                    SkipReason::Parse,
                    e.to_string(),
                ),
            }
        }
        info!(authors = self.ctx.author_count(), "Authors reconciled");
    }

    fn import_author(&mut self, table: &str, user: UserRow) {
        let slug = first_nonempty([
            user.slug.clone(),
            slugify(&user.display_name),
            slugify(&user.login),
        ]);
        let Some(slug) = slug else {
            self.skip(
                EntityKind::Author,
                table,
                user.id.to_string(),
                SkipReason::Validation,
                "author has no usable slug or name".to_string(),
            );
            return;
        };

        let name = if user.display_name.is_empty() {
            user.login.clone()
        } else {
            user.display_name.clone()
        };
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), name);
        fields.insert("email".to_string(), user.email.to_ascii_lowercase());
        fields.insert("registered".to_string(), user.registered.clone());

        match reconcile(&mut *self.store, EntityKind::Author, &slug, fields) {
            Ok(outcome) => {
                self.stats.record(EntityKind::Author, outcome);
                self.ctx.map_author(user.id, outcome.id());
            }
            Err(e) => self.skip(
                EntityKind::Author,
                table,
                user.id.to_string(),
                SkipReason::Reconciliation,
                format!("{:#}", e),
            ),
        }
    }

    fn import_sql_categories(&mut self, dump: &str) {
        let terms_table = schema::qualified(&self.opts.table_prefix, schema::TERMS);
        let mut terms: FxHashMap<i64, TermRow> = FxHashMap::default();
        for tuple in table_tuples(dump, &terms_table) {
            self.tick();
            let row = decode_row(tuple);
            match TermRow::from_row(&row) {
                Ok(term) => {
                    terms.insert(term.id, term);
                }
                Err(e) => self.skip(
                    EntityKind::Category,
                    &terms_table,
                    legacy_id_of(&row),
                    SkipReason::Parse,
                    e.to_string(),
                ),
            }
        }

        let tax_table = schema::qualified(&self.opts.table_prefix, schema::TERM_TAXONOMY);
        for tuple in table_tuples(dump, &tax_table) {
            self.tick();
            let row = decode_row(tuple);
            match TaxonomyRow::from_row(&row) {
                // Tags and menus share the taxonomy table; only
                // categories are imported.
                Ok(tax) if tax.taxonomy == "category" => {
                    let term = terms.get(&tax.term_id).cloned();
                    self.import_category(&tax_table, tax, term);
                }
                Ok(_) => {}
                Err(e) => self.skip(
                    EntityKind::Category,
                    &tax_table,
                    legacy_id_of(&row),
                    SkipReason::Parse,
                    e.to_string(),
                ),
            }
        }
        info!(categories = self.ctx.category_count(), "Categories reconciled");
    }

    fn import_category(&mut self, table: &str, tax: TaxonomyRow, term: Option<TermRow>) {
        let (name, slug) = match term {
            Some(t) => (t.name, t.slug),
            None => (String::new(), String::new()),
        };
        let key = if slug.is_empty() { slugify(&name) } else { slug };
        if key.is_empty() {
            self.skip(
                EntityKind::Category,
                table,
                tax.id.to_string(),
                SkipReason::Validation,
                "category has no usable name or slug".to_string(),
            );
            return;
        }

        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), if name.is_empty() { key.clone() } else { name });
        fields.insert("description".to_string(), tax.description);

        match reconcile(&mut *self.store, EntityKind::Category, &key, fields) {
            Ok(outcome) => {
                self.stats.record(EntityKind::Category, outcome);
                self.ctx.map_category(tax.id, outcome.id());
            }
            Err(e) => self.skip(
                EntityKind::Category,
                table,
                tax.id.to_string(),
                SkipReason::Reconciliation,
                format!("{:#}", e),
            ),
        }
    }

    fn collect_sql_relationships(&mut self, dump: &str) {
        let table = schema::qualified(&self.opts.table_prefix, schema::TERM_RELATIONSHIPS);
        for tuple in table_tuples(dump, &table) {
            self.tick();
            let row = decode_row(tuple);
            match RelationshipRow::from_row(&row) {
                Ok(rel) => self
                    .ctx
                    .link_post_category(rel.object_id, rel.term_taxonomy_id),
                Err(e) => self.skip(
                    EntityKind::Post,
                    &table,
                    legacy_id_of(&row),
                    SkipReason::Parse,
                    e.to_string(),
                ),
            }
        }
    }

    fn import_sql_posts(&mut self, dump: &str) {
        let table = schema::qualified(&self.opts.table_prefix, schema::POSTS);
        for tuple in table_tuples(dump, &table) {
            self.tick();
            let row = decode_row(tuple);
            match PostRow::from_row(&row) {
                Ok(post) => {
                    let categories = self.ctx.post_categories(post.id);
                    let author = self.ctx.resolve_author(post.author);
                    self.import_content(
                        &table,
                        ContentSource {
                            legacy_id: post.id,
                            title: post.title,
                            body: post.content,
                            excerpt: post.excerpt,
                            date: post.date,
                            status: post.status,
                            slug: post.slug,
                            kind_field: post.post_type,
                            author,
                            legacy_author: post.author.to_string(),
                            categories,
                        },
                    );
                }
                Err(e) => self.skip(
                    EntityKind::Post,
                    &table,
                    legacy_id_of(&row),
                    SkipReason::Parse,
                    e.to_string(),
                ),
            }
        }
    }

    // ---- XML export stages ----

    fn import_xml_author(&mut self, author: &XmlAuthor, logins: &mut FxHashMap<String, u64>) {
        self.tick();
        let slug = first_nonempty([slugify(&author.login), slugify(&author.display_name)]);
        let Some(slug) = slug else {
            self.skip(
                EntityKind::Author,
                "export/author",
                author.id.to_string(),
                SkipReason::Validation,
                "author has no usable login or name".to_string(),
            );
            return;
        };

        let name = if author.display_name.is_empty() {
            author.login.clone()
        } else {
            author.display_name.clone()
        };
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), name);
        fields.insert("email".to_string(), author.email.to_ascii_lowercase());

        match reconcile(&mut *self.store, EntityKind::Author, &slug, fields) {
            Ok(outcome) => {
                self.stats.record(EntityKind::Author, outcome);
                logins.insert(author.login.clone(), outcome.id());
                if author.id != 0 {
                    self.ctx.map_author(author.id, outcome.id());
                }
            }
            Err(e) => self.skip(
                EntityKind::Author,
                "export/author",
                author.id.to_string(),
                SkipReason::Reconciliation,
                format!("{:#}", e),
            ),
        }
    }

    fn import_xml_item(
        &mut self,
        item: &XmlItem,
        logins: &FxHashMap<String, u64>,
        category_keys: &mut FxHashMap<String, u64>,
    ) {
        self.tick();

        let mut categories = Vec::new();
        for cat in &item.categories {
            let key = if cat.nicename.is_empty() {
                slugify(&cat.name)
            } else {
                cat.nicename.clone()
            };
            if key.is_empty() {
                self.skip(
                    EntityKind::Category,
                    "export/category",
                    item.id.to_string(),
                    SkipReason::Validation,
                    "category has no usable name or slug".to_string(),
                );
                continue;
            }
            if let Some(id) = category_keys.get(&key) {
                categories.push(*id);
                continue;
            }
            let mut fields = FieldMap::new();
            fields.insert("name".to_string(), if cat.name.is_empty() { key.clone() } else { cat.name.clone() });
            match reconcile(&mut *self.store, EntityKind::Category, &key, fields) {
                Ok(outcome) => {
                    self.stats.record(EntityKind::Category, outcome);
                    category_keys.insert(key, outcome.id());
                    categories.push(outcome.id());
                }
                Err(e) => self.skip(
                    EntityKind::Category,
                    "export/category",
                    item.id.to_string(),
                    SkipReason::Reconciliation,
                    format!("{:#}", e),
                ),
            }
        }

        let author = logins.get(&item.creator).copied();
        self.import_content(
            "export/item",
            ContentSource {
                legacy_id: item.id,
                title: item.title.clone(),
                body: item.content.clone(),
                excerpt: item.excerpt.clone(),
                date: item.date.clone(),
                status: item.status.clone(),
                slug: item.slug.clone(),
                kind_field: item.post_type.clone(),
                author,
                legacy_author: item.creator.clone(),
                categories,
            },
        );
    }

    // ---- Shared content stage ----

    fn import_content(&mut self, table: &str, source: ContentSource) {
        let kind = match source.kind_field.as_str() {
            "page" => EntityKind::Page,
            _ => EntityKind::Post,
        };
        let legacy_id = source.legacy_id.to_string();

        if !matches!(source.kind_field.as_str(), "post" | "page") {
            self.skip(
                kind,
                table,
                legacy_id,
                SkipReason::Validation,
                format!("type '{}' not importable", source.kind_field),
            );
            return;
        }

        if !self.status_eligible(&source.status) {
            self.skip(
                kind,
                table,
                legacy_id,
                SkipReason::Validation,
                format!("status '{}' not importable", source.status),
            );
            return;
        }

        let title = normalize(&source.title);
        let body = normalize(&source.body);
        let excerpt = normalize(&source.excerpt);

        if title.is_empty() {
            self.skip(kind, table, legacy_id, SkipReason::Validation, "empty title".to_string());
            return;
        }
        if body.chars().count() < self.opts.min_body_length {
            self.skip(
                kind,
                table,
                legacy_id,
                SkipReason::Validation,
                format!("body shorter than {} chars", self.opts.min_body_length),
            );
            return;
        }

        let slug = if source.slug.is_empty() {
            slugify(&title)
        } else {
            source.slug.clone()
        };
        if slug.is_empty() {
            self.skip(
                kind,
                table,
                legacy_id,
                SkipReason::Validation,
                "no usable slug".to_string(),
            );
            return;
        }

        let author_id = match source.author {
            Some(id) => id,
            None => {
                warn!(
                    table,
                    legacy_id = %legacy_id,
                    legacy_author = %source.legacy_author,
                    "Author not resolved; assigning default"
                );
                match self.default_author() {
                    Ok(id) => id,
                    Err(e) => {
                        self.skip(
                            kind,
                            table,
                            legacy_id,
                            SkipReason::Reconciliation,
                            format!("{:#}", e),
                        );
                        return;
                    }
                }
            }
        };

        let mut fields = FieldMap::new();
        fields.insert("title".to_string(), title);
        fields.insert("body".to_string(), body);
        fields.insert("excerpt".to_string(), excerpt);
        fields.insert("date".to_string(), source.date.clone());
        fields.insert("status".to_string(), source.status.clone());
        fields.insert("author".to_string(), author_id.to_string());
        fields.insert(
            "categories".to_string(),
            source
                .categories
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        );

        match reconcile(&mut *self.store, kind, &slug, fields) {
            Ok(outcome) => self.stats.record(kind, outcome),
            Err(e) => self.skip(
                kind,
                table,
                legacy_id,
                SkipReason::Reconciliation,
                format!("{:#}", e),
            ),
        }
    }

    fn status_eligible(&self, status: &str) -> bool {
        status == "publish"
            || (self.opts.include_drafts && matches!(status, "draft" | "private"))
    }
}

/// A content row after source-specific handling, ready for the shared
/// filter/normalize/reconcile stage.
struct ContentSource {
    legacy_id: i64,
    title: String,
    body: String,
    excerpt: String,
    date: String,
    status: String,
    slug: String,
    kind_field: String,
    author: Option<u64>,
    legacy_author: String,
    categories: Vec<u64>,
}

/// All row-tuples for one table, across every matching INSERT statement.
fn table_tuples<'a>(dump: &'a str, table: &str) -> Vec<&'a str> {
    let mut tuples = Vec::new();
    for stmt in statements(dump, table) {
        match values_clause(stmt.text) {
            Some(values) => tuples.extend(split_tuples(values)),
            None => warn!(table = stmt.table, "INSERT without VALUES clause"),
        }
    }
    tuples
}

fn legacy_id_of(row: &DecodedRow) -> String {
    match row.first() {
        Some(SqlValue::Integer(n)) => n.to_string(),
        _ => "?".to_string(),
    }
}

fn first_nonempty<const N: usize>(candidates: [String; N]) -> Option<String> {
    candidates.into_iter().find(|c| !c.is_empty())
}
