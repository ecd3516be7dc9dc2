use crate::models::EntityKind;
use crate::store::Reconciled;

/// Counters for one entity kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KindCounters {
    pub created: u64,
    pub updated: u64,
    pub merged: u64,
    pub skipped: u64,
}

/// Statistics collected during one migration run. Owned by the
/// orchestrator, read only at the end for reporting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub authors: KindCounters,
    pub categories: KindCounters,
    pub posts: KindCounters,
    pub pages: KindCounters,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&mut self, kind: EntityKind) -> &mut KindCounters {
        match kind {
            EntityKind::Author => &mut self.authors,
            EntityKind::Category => &mut self.categories,
            EntityKind::Post => &mut self.posts,
            EntityKind::Page => &mut self.pages,
        }
    }

    pub fn record(&mut self, kind: EntityKind, outcome: Reconciled) {
        let counters = self.counters(kind);
        match outcome {
            Reconciled::Created(_) => counters.created += 1,
            Reconciled::Updated(_) => counters.updated += 1,
        }
    }

    pub fn skip(&mut self, kind: EntityKind) {
        self.counters(kind).skipped += 1;
    }

    pub fn add_merged(&mut self, kind: EntityKind, count: u64) {
        self.counters(kind).merged += count;
    }

    pub fn created(&self) -> u64 {
        self.authors.created + self.categories.created + self.posts.created + self.pages.created
    }

    pub fn updated(&self) -> u64 {
        self.authors.updated + self.categories.updated + self.posts.updated + self.pages.updated
    }

    pub fn skipped(&self) -> u64 {
        self.authors.skipped + self.categories.skipped + self.posts.skipped + self.pages.skipped
    }

    pub fn merged(&self) -> u64 {
        self.authors.merged + self.categories.merged + self.posts.merged + self.pages.merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = ImportStats::new();
        assert_eq!(stats.created(), 0);
        assert_eq!(stats.updated(), 0);
        assert_eq!(stats.skipped(), 0);
        assert_eq!(stats.merged(), 0);
    }

    #[test]
    fn record_routes_by_kind_and_outcome() {
        let mut stats = ImportStats::new();
        stats.record(EntityKind::Author, Reconciled::Created(1));
        stats.record(EntityKind::Author, Reconciled::Updated(1));
        stats.record(EntityKind::Post, Reconciled::Created(2));
        stats.record(EntityKind::Page, Reconciled::Created(3));

        assert_eq!(stats.authors.created, 1);
        assert_eq!(stats.authors.updated, 1);
        assert_eq!(stats.posts.created, 1);
        assert_eq!(stats.pages.created, 1);
        assert_eq!(stats.created(), 3);
        assert_eq!(stats.updated(), 1);
    }

    #[test]
    fn skip_and_merge_counters() {
        let mut stats = ImportStats::new();
        stats.skip(EntityKind::Post);
        stats.skip(EntityKind::Post);
        stats.skip(EntityKind::Category);
        stats.add_merged(EntityKind::Author, 3);

        assert_eq!(stats.posts.skipped, 2);
        assert_eq!(stats.categories.skipped, 1);
        assert_eq!(stats.skipped(), 3);
        assert_eq!(stats.authors.merged, 3);
        assert_eq!(stats.merged(), 3);
    }
}
