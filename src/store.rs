//! The target content store: an opaque, upsert-capable seam.
//!
//! The pipeline only ever talks to [`Store`]; everything it needs is
//! find-by-natural-key, create, update, delete, list, and reference
//! reassignment. [`MemoryStore`] backs tests and dry runs;
//! [`JsonStore`] persists the same state to a single JSON document with
//! an atomic tmp-write + rename, so repeated runs against the same file
//! exercise real idempotence.

use crate::models::EntityKind;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type FieldMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub kind: EntityKind,
    /// Natural key: slug for authors/categories/content. Never mutated.
    pub key: String,
    pub fields: FieldMap,
}

pub trait Store {
    fn find_by_natural_key(&self, kind: EntityKind, key: &str) -> Option<u64>;
    fn create(&mut self, kind: EntityKind, key: &str, fields: FieldMap) -> Result<u64>;
    /// Updates mutable fields only; the natural key is left untouched.
    fn update(&mut self, id: u64, fields: FieldMap) -> Result<()>;
    fn delete(&mut self, id: u64) -> Result<()>;
    fn get(&self, id: u64) -> Option<&Entity>;
    fn list(&self, kind: EntityKind) -> Vec<Entity>;
    /// Rewrites references to `from` (author and category fields of
    /// content items) to point at `to`. Returns the number of entities
    /// touched.
    fn reassign_references(&mut self, from: u64, to: u64) -> Result<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Created(u64),
    Updated(u64),
}

impl Reconciled {
    pub fn id(&self) -> u64 {
        match self {
            Reconciled::Created(id) | Reconciled::Updated(id) => *id,
        }
    }
}

/// Idempotent create-or-update by natural key.
pub fn reconcile<S: Store>(
    store: &mut S,
    kind: EntityKind,
    key: &str,
    fields: FieldMap,
) -> Result<Reconciled> {
    match store.find_by_natural_key(kind, key) {
        Some(id) => {
            store.update(id, fields)?;
            Ok(Reconciled::Updated(id))
        }
        None => {
            let id = store.create(kind, key, fields)?;
            Ok(Reconciled::Created(id))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: u64,
    entities: BTreeMap<u64, Entity>,
    keys: HashMap<(EntityKind, String), u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: BTreeMap::new(),
            keys: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Store for MemoryStore {
    fn find_by_natural_key(&self, kind: EntityKind, key: &str) -> Option<u64> {
        self.keys.get(&(kind, key.to_string())).copied()
    }

    fn create(&mut self, kind: EntityKind, key: &str, fields: FieldMap) -> Result<u64> {
        if key.is_empty() {
            bail!("cannot create {} with an empty natural key", kind);
        }
        if self.keys.contains_key(&(kind, key.to_string())) {
            bail!("{} with key '{}' already exists", kind, key);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                kind,
                key: key.to_string(),
                fields,
            },
        );
        self.keys.insert((kind, key.to_string()), id);
        Ok(id)
    }

    fn update(&mut self, id: u64, fields: FieldMap) -> Result<()> {
        let entity = match self.entities.get_mut(&id) {
            Some(e) => e,
            None => bail!("no entity with id {}", id),
        };
        for (k, v) in fields {
            entity.fields.insert(k, v);
        }
        Ok(())
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        let entity = match self.entities.remove(&id) {
            Some(e) => e,
            None => bail!("no entity with id {}", id),
        };
        self.keys.remove(&(entity.kind, entity.key));
        Ok(())
    }

    fn get(&self, id: u64) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn list(&self, kind: EntityKind) -> Vec<Entity> {
        self.entities
            .values()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    fn reassign_references(&mut self, from: u64, to: u64) -> Result<u64> {
        let from_s = from.to_string();
        let to_s = to.to_string();
        let mut touched = 0;

        for entity in self.entities.values_mut() {
            if !matches!(entity.kind, EntityKind::Post | EntityKind::Page) {
                continue;
            }
            let mut changed = false;
            if entity.fields.get("author") == Some(&from_s) {
                entity.fields.insert("author".to_string(), to_s.clone());
                changed = true;
            }
            if let Some(cats) = entity.fields.get("categories") {
                if cats.split(',').any(|c| c == from_s) {
                    let rewritten = cats
                        .split(',')
                        .map(|c| if c == from_s { to_s.as_str() } else { c })
                        .collect::<Vec<_>>()
                        .join(",");
                    entity.fields.insert("categories".to_string(), rewritten);
                    changed = true;
                }
            }
            if changed {
                touched += 1;
            }
        }

        debug!(from, to, touched, "Reassigned references");
        Ok(touched)
    }
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    entities: Vec<Entity>,
}

/// File-backed store. State lives in memory during a run; `save`
/// serializes everything back to the JSON document.
pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonStore {
    /// Opens an existing store file or starts an empty store if the file
    /// does not exist. A present-but-unreadable file is fatal: silently
    /// starting empty would duplicate every entity on the next save.
    pub fn open(path: &Path) -> Result<Self> {
        let mut inner = MemoryStore::new();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open store file: {}", path.display()))?;
            let data: StoreFile = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Store file is not valid JSON: {}", path.display()))?;
            inner.next_id = data.next_id;
            for entity in data.entities {
                inner
                    .keys
                    .insert((entity.kind, entity.key.clone()), entity.id);
                inner.entities.insert(entity.id, entity);
            }
            debug!(path = %path.display(), entities = inner.len(), "Store loaded");
        }

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Writes the store atomically: serialize to a temp file, then rename
    /// over the target.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let data = StoreFile {
            next_id: self.inner.next_id,
            entities: self.inner.entities.values().cloned().collect(),
        };

        let tmp_path = self.path.with_extension("json.tmp");
        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create temp store file: {}", tmp_path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &data)
            .context("Failed to serialize store")?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to rename temp store: {}", self.path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Store for JsonStore {
    fn find_by_natural_key(&self, kind: EntityKind, key: &str) -> Option<u64> {
        self.inner.find_by_natural_key(kind, key)
    }

    fn create(&mut self, kind: EntityKind, key: &str, fields: FieldMap) -> Result<u64> {
        self.inner.create(kind, key, fields)
    }

    fn update(&mut self, id: u64, fields: FieldMap) -> Result<()> {
        self.inner.update(id, fields)
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        self.inner.delete(id)
    }

    fn get(&self, id: u64) -> Option<&Entity> {
        self.inner.get(id)
    }

    fn list(&self, kind: EntityKind) -> Vec<Entity> {
        self.inner.list(kind)
    }

    fn reassign_references(&mut self, from: u64, to: u64) -> Result<u64> {
        self.inner.reassign_references(from, to)
    }
}
