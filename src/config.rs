/// Minimum normalized body length for a row to count as real content
pub const MIN_BODY_LENGTH: usize = 10;

/// Natural key of the fallback author used when a content row's legacy
/// author id cannot be resolved
pub const DEFAULT_AUTHOR_SLUG: &str = "admin";

/// Table prefix used by stock legacy installs
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Progress update interval (tick every N rows)
pub const PROGRESS_INTERVAL: u64 = 500;
