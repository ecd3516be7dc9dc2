//! Charon: legacy CMS export migration pipeline
//!
//! This crate ferries content out of a legacy CMS's relational export (an
//! SQL dump of `INSERT` statements, or an XML content export) into a new
//! content store:
//!
//! 1. **Extraction** -- Isolate `INSERT INTO <table> ... ;` statements per
//!    source table with a quote-aware scanner, no SQL grammar required
//! 2. **Decoding** -- Tokenize `VALUES` row-tuples (nested parens, escaped
//!    quotes) and decode literals into typed rows against known column
//!    orders
//! 3. **Normalization** -- Strip legacy shortcodes and block-comment
//!    markers, decode HTML entities, collapse whitespace
//! 4. **Reconciliation** -- Idempotently create-or-update authors,
//!    categories and content items by natural key (slug), in
//!    foreign-key order, then collapse duplicate authors
//!
//! # Architecture
//!
//! The pipeline is deliberately single-threaded and sequential: upserts
//! keyed by natural key must not race, and dump sizes fit comfortably in
//! memory. A run either completes, aborts on a fatal input/store error,
//! or is killed externally; there is no partial-state rollback, because
//! re-running against the same store is safe by construction.
//!
//! # Key Modules
//!
//! - [`extract`] -- INSERT statement isolation per source table
//! - [`tokenizer`] -- VALUES tuple and field splitting state machine
//! - [`decode`] -- SQL literal decoding with escape handling
//! - [`schema`] -- Typed rows for the known source tables
//! - [`normalize`] -- Legacy markup cleanup and entity decoding
//! - [`xml`] -- The alternative XML export input path
//! - [`resolve`] -- Legacy-id mapping and duplicate-author merging
//! - [`store`] -- The upsert-capable target store seam
//! - [`pipeline`] -- The orchestrator tying the stages together
//! - [`stats`] -- Per-kind created/updated/merged/skipped counters
//! - [`report`] -- Optional CSV report of skipped rows
//! - [`models`] -- Core value and entity types
//! - [`config`] -- Constants for filtering and reporting
//!
//! # Example Usage
//!
//! ```bash
//! # Migrate a MySQL dump into a JSON-backed store
//! charon sql -i legacy.sql --store site.json
//!
//! # Re-run after fixing the dump; existing entities are updated in place
//! charon sql -i legacy-fixed.sql --store site.json
//!
//! # Import the XML export instead, drafts included
//! charon xml -i export.xml --store site.json --include-drafts
//! ```

pub mod config;
pub mod decode;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod stats;
pub mod store;
pub mod tokenizer;
pub mod xml;
