//! Identity resolution: legacy-id to target-id mapping for one run, and
//! the post-upsert author merge pass.

use crate::models::EntityKind;
use crate::store::{Entity, Store};
use anyhow::Result;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::info;

/// Per-run mapping state. Owned by the orchestrator, passed through the
/// pipeline by reference, never shared across runs.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    authors: FxHashMap<i64, u64>,
    categories: FxHashMap<i64, u64>,
    post_categories: FxHashMap<i64, Vec<i64>>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_author(&mut self, legacy_id: i64, target_id: u64) {
        self.authors.insert(legacy_id, target_id);
    }

    pub fn resolve_author(&self, legacy_id: i64) -> Option<u64> {
        self.authors.get(&legacy_id).copied()
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    pub fn map_category(&mut self, legacy_taxonomy_id: i64, target_id: u64) {
        self.categories.insert(legacy_taxonomy_id, target_id);
    }

    pub fn resolve_category(&self, legacy_taxonomy_id: i64) -> Option<u64> {
        self.categories.get(&legacy_taxonomy_id).copied()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Records a legacy post-to-taxonomy link; unresolvable taxonomy ids
    /// are dropped at lookup time.
    pub fn link_post_category(&mut self, legacy_post_id: i64, legacy_taxonomy_id: i64) {
        self.post_categories
            .entry(legacy_post_id)
            .or_default()
            .push(legacy_taxonomy_id);
    }

    /// Resolved target category ids for a legacy post, in link order.
    pub fn post_categories(&self, legacy_post_id: i64) -> Vec<u64> {
        self.post_categories
            .get(&legacy_post_id)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|tt| self.resolve_category(*tt))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Collapses duplicate author records, first by lower-cased email, then by
/// trimmed display name among the survivors. Within a group the member
/// with the most associated content items wins, tie broken by lowest id;
/// content owned by the others is reassigned to the winner and the losers
/// are deleted. Runs after the main upsert phase so duplicates created by
/// earlier runs are cleaned up too.
///
/// Returns the number of author records removed.
pub fn merge_duplicate_authors<S: Store>(store: &mut S) -> Result<u64> {
    let by_email = merge_pass(store, |e| {
        e.fields
            .get("email")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
    })?;
    let by_name = merge_pass(store, |e| {
        e.fields
            .get("name")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })?;
    Ok(by_email + by_name)
}

fn merge_pass<S, F>(store: &mut S, group_key: F) -> Result<u64>
where
    S: Store,
    F: Fn(&Entity) -> Option<String>,
{
    let authors = store.list(EntityKind::Author);
    let counts = content_counts(store);

    // BTreeMap keeps group processing order deterministic across runs.
    let mut groups: BTreeMap<String, Vec<&Entity>> = BTreeMap::new();
    for author in &authors {
        if let Some(key) = group_key(author) {
            groups.entry(key).or_default().push(author);
        }
    }

    let mut merged = 0;
    for (key, group) in groups {
        if group.len() < 2 {
            continue;
        }
        let primary = group
            .iter()
            .max_by_key(|e| (counts.get(&e.id).copied().unwrap_or(0), Reverse(e.id)))
            .copied()
            .unwrap();

        for other in &group {
            if other.id == primary.id {
                continue;
            }
            let moved = store.reassign_references(other.id, primary.id)?;
            store.delete(other.id)?;
            merged += 1;
            info!(
                key = %key,
                surviving = %primary.key,
                removed = %other.key,
                content_moved = moved,
                "Merged duplicate author"
            );
        }
    }
    Ok(merged)
}

fn content_counts<S: Store>(store: &S) -> FxHashMap<u64, u64> {
    let mut counts = FxHashMap::default();
    for kind in [EntityKind::Post, EntityKind::Page] {
        for entity in store.list(kind) {
            if let Some(author) = entity
                .fields
                .get("author")
                .and_then(|s| s.parse::<u64>().ok())
            {
                *counts.entry(author).or_insert(0) += 1;
            }
        }
    }
    counts
}
