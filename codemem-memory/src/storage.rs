//! RocksDB object store
//!
//! Durable, scoped storage for memory objects. Records live in RocksDB as
//! bincode under `obj:<id>` keys and are mirrored in a DashMap cache that
//! only ever holds committed objects, so readers never observe a write that
//! has not reached the database.

use dashmap::DashMap;
use parking_lot::Mutex;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{MemoryError, Result};
use crate::migration::{self, OBJECT_PREFIX};
use crate::node::{MemoryObject, ObjectBody, ObjectId, ObjectType, Scope, SymbolKind};
use crate::temporal::TemporalMetadata;

/// Store tuning knobs
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound on any single persistence operation
    pub io_timeout: Duration,
    /// Flush memtables after every write
    pub flush_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_millis(5000),
            flush_on_write: true,
        }
    }
}

/// Result of replacing the symbols recorded for one source path
#[derive(Debug, Clone, Default)]
pub struct ReplaceOutcome {
    pub removed: usize,
    pub inserted: Vec<ObjectId>,
}

struct StoreInner {
    db: DB,
    objects: DashMap<ObjectId, MemoryObject>,
    /// Serializes read-modify-write sequences; plain reads never take it
    write_lock: Mutex<()>,
    config: StoreConfig,
}

/// RocksDB-based memory object store
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Open a store at the given path with default settings
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, StoreConfig::default())
    }

    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_background_jobs(2);
        opts.set_bytes_per_sync(1048576); // 1MB
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        migration::migrate(&db)?;

        log::info!("MemoryStore opened at: {}", path.display());

        let store = Self {
            inner: Arc::new(StoreInner {
                db,
                objects: DashMap::new(),
                write_lock: Mutex::new(()),
                config,
            }),
        };

        store.load_cache()?;
        Ok(store)
    }

    /// Load existing objects into cache on startup
    fn load_cache(&self) -> Result<()> {
        let mut count = 0;
        let mut skipped = 0;

        for item in self.inner.db.iterator(IteratorMode::Start) {
            let (key, value) = item?;
            if !key.starts_with(OBJECT_PREFIX.as_bytes()) {
                continue;
            }

            match bincode::deserialize::<MemoryObject>(&value) {
                Ok(object) => {
                    self.inner.objects.insert(object.id, object);
                    count += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Failed to deserialize object {}: {}. Skipping.",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    skipped += 1;
                }
            }
        }

        if count > 0 {
            log::info!("Loaded {} objects from disk", count);
        }
        if skipped > 0 {
            log::warn!("Skipped {} objects due to deserialization errors", skipped);
        }
        Ok(())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Persist a new object and return its identifier.
    ///
    /// The store assigns `created_at`/`updated_at` and clears any history the
    /// caller supplied. An identifier already in use, in any scope, fails with
    /// `IdentityConflict`.
    pub async fn put(&self, mut object: MemoryObject) -> Result<ObjectId> {
        object.validate()?;
        self.run_io("put", move |inner| {
            let _guard = inner.write_lock.lock();
            if inner.objects.contains_key(&object.id) || inner.db.get(object_key(&object.id))?.is_some() {
                return Err(MemoryError::identity_conflict(object.id.to_string()));
            }
            inner.check_link_targets(&object, &HashSet::new(), &HashSet::new())?;

            object.temporal = TemporalMetadata::now();
            object.history.clear();

            inner.db.put(object_key(&object.id), bincode::serialize(&object)?)?;
            inner.maybe_flush()?;

            let id = object.id;
            log::debug!("Stored {} {} in {}", object.object_type(), id, object.scope);
            inner.objects.insert(id, object);
            Ok(id)
        })
        .await
    }

    /// Replace an existing object in place.
    ///
    /// The id, scope and `created_at` of the stored object are authoritative;
    /// the previous provenance is archived in `history`.
    pub async fn update(&self, scope: &Scope, object: MemoryObject) -> Result<MemoryObject> {
        scope.validate()?;
        object.provenance.validate()?;
        object.body.validate()?;
        object.validate_links()?;
        let scope = scope.clone();

        self.run_io("update", move |inner| {
            let _guard = inner.write_lock.lock();
            let existing = inner
                .objects
                .get(&object.id)
                .filter(|entry| entry.scope == scope)
                .map(|entry| entry.clone())
                .ok_or_else(|| MemoryError::not_found(object.id.to_string()))?;

            if object.scope != existing.scope {
                return Err(MemoryError::ScopeImmutable(format!(
                    "object {} belongs to {}, not {}",
                    existing.id, existing.scope, object.scope
                )));
            }

            inner.check_link_targets(&object, &HashSet::new(), &HashSet::new())?;

            let mut updated = existing;
            let now = updated.temporal.touch();
            updated.supersede_provenance(object.provenance, now);
            updated.body = object.body;
            updated.links = object.links;

            inner.db.put(object_key(&updated.id), bincode::serialize(&updated)?)?;
            inner.maybe_flush()?;
            inner.objects.insert(updated.id, updated.clone());
            Ok(updated)
        })
        .await
    }

    /// Get an object, visible only within its own scope
    pub fn get(&self, id: &ObjectId, scope: &Scope) -> Result<MemoryObject> {
        self.inner
            .objects
            .get(id)
            .filter(|entry| entry.scope == *scope)
            .map(|entry| entry.clone())
            .ok_or_else(|| MemoryError::not_found(id.to_string()))
    }

    /// Delete an object permanently
    pub async fn delete(&self, id: &ObjectId, scope: &Scope) -> Result<()> {
        let id = *id;
        let scope = scope.clone();
        self.run_io("delete", move |inner| {
            let _guard = inner.write_lock.lock();
            let in_scope = inner
                .objects
                .get(&id)
                .is_some_and(|entry| entry.scope == scope);
            if !in_scope {
                return Err(MemoryError::not_found(id.to_string()));
            }

            let retired = HashSet::from([id]);
            let relinked = inner.relink(&scope, &retired, &HashMap::new());

            let mut batch = WriteBatch::default();
            batch.delete(object_key(&id));
            for object in &relinked {
                batch.put(object_key(&object.id), bincode::serialize(object)?);
            }
            inner.db.write(batch)?;
            inner.maybe_flush()?;

            inner.objects.remove(&id);
            for object in relinked {
                inner.objects.insert(object.id, object);
            }
            Ok(())
        })
        .await
    }

    /// Atomically swap every symbol recorded for `path` with `objects`.
    ///
    /// Removal and insertion land in one write batch, so readers see either
    /// the old symbol set or the new one.
    pub async fn replace_symbols_for_path(
        &self,
        scope: &Scope,
        path: &str,
        objects: Vec<MemoryObject>,
    ) -> Result<ReplaceOutcome> {
        scope.validate()?;
        for object in &objects {
            object.validate()?;
            match &object.body {
                ObjectBody::Symbol(symbol) if symbol.path == path => {}
                _ => {
                    return Err(MemoryError::validation(format!(
                        "object {} is not a symbol of {}",
                        object.id, path
                    )))
                }
            }
            if object.scope != *scope {
                return Err(MemoryError::ScopeImmutable(format!(
                    "object {} belongs to {}, not {}",
                    object.id, object.scope, scope
                )));
            }
        }

        let scope = scope.clone();
        let path = path.to_string();
        self.run_io("replace_symbols", move |inner| {
            let _guard = inner.write_lock.lock();

            let stale: Vec<ObjectId> = inner
                .objects
                .iter()
                .filter(|entry| {
                    entry.scope == scope
                        && entry.as_symbol().is_some_and(|symbol| symbol.path == path)
                })
                .map(|entry| entry.id)
                .collect();

            let retired: HashSet<ObjectId> = stale.iter().copied().collect();
            let mut predecessors: HashMap<SymbolKey, ObjectId> = HashMap::new();
            for id in &stale {
                if let Some(key) = inner.objects.get(id).and_then(|entry| symbol_key(&entry)) {
                    predecessors.entry(key).or_insert(*id);
                }
            }

            let mut seen = HashSet::new();
            let now = TemporalMetadata::now();
            let mut successors = HashMap::new();
            let mut fresh = Vec::with_capacity(objects.len());
            for mut object in objects {
                if inner.objects.contains_key(&object.id) || !seen.insert(object.id) {
                    return Err(MemoryError::identity_conflict(object.id.to_string()));
                }
                object.temporal = now;
                object.history.clear();
                // A successor inherits the links of the symbol it supersedes.
                if let Some(previous) = symbol_key(&object).and_then(|key| predecessors.remove(&key)) {
                    successors.insert(previous, object.id);
                    if object.links.is_empty() {
                        if let Some(entry) = inner.objects.get(&previous) {
                            object.links = entry.links.clone();
                        }
                    }
                }
                fresh.push(object);
            }
            for object in &mut fresh {
                retarget(object, &retired, &successors);
            }
            for object in &fresh {
                inner.check_link_targets(object, &retired, &seen)?;
            }

            let relinked: Vec<MemoryObject> = inner
                .relink(&scope, &retired, &successors)
                .into_iter()
                .filter(|object| !retired.contains(&object.id))
                .collect();

            let mut batch = WriteBatch::default();
            for id in &stale {
                batch.delete(object_key(id));
            }
            for object in fresh.iter().chain(&relinked) {
                batch.put(object_key(&object.id), bincode::serialize(object)?);
            }

            inner.db.write(batch)?;
            inner.maybe_flush()?;

            for id in &stale {
                inner.objects.remove(id);
            }
            let inserted: Vec<ObjectId> = fresh.iter().map(|o| o.id).collect();
            for object in fresh.into_iter().chain(relinked) {
                inner.objects.insert(object.id, object);
            }

            log::debug!(
                "Replaced symbols for {} in {}: -{} +{}",
                path,
                scope,
                stale.len(),
                inserted.len()
            );
            Ok(ReplaceOutcome {
                removed: stale.len(),
                inserted,
            })
        })
        .await
    }

    /// All committed objects in a scope, oldest first
    pub fn list_by_scope(
        &self,
        scope: &Scope,
        object_type: Option<ObjectType>,
    ) -> Result<Vec<MemoryObject>> {
        scope.validate()?;
        let mut objects: Vec<MemoryObject> = self
            .inner
            .objects
            .iter()
            .filter(|entry| entry.scope == *scope)
            .filter(|entry| object_type.map_or(true, |t| entry.object_type() == t))
            .map(|entry| entry.clone())
            .collect();

        objects.sort_by(|a, b| {
            a.temporal
                .created_at
                .cmp(&b.temporal.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(objects)
    }

    /// Number of committed objects across all scopes
    pub fn len(&self) -> usize {
        self.inner.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.objects.is_empty()
    }

    /// Get store statistics, optionally restricted to one scope
    pub fn stats(&self, scope: Option<&Scope>) -> serde_json::Value {
        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_symbol_kind: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_language: BTreeMap<String, usize> = BTreeMap::new();
        let mut scopes = HashSet::new();
        let mut total = 0;

        for entry in self.inner.objects.iter() {
            let object = entry.value();
            if scope.is_some_and(|s| *s != object.scope) {
                continue;
            }
            total += 1;
            scopes.insert(object.scope.clone());
            *by_type.entry(object.object_type().to_string()).or_insert(0) += 1;

            if let Some(symbol) = object.as_symbol() {
                *by_symbol_kind.entry(symbol.kind.to_string()).or_insert(0) += 1;
                *by_language.entry(symbol.language.clone()).or_insert(0) += 1;
            }
        }

        serde_json::json!({
            "totalObjects": total,
            "scopes": scopes.len(),
            "byType": by_type,
            "bySymbolKind": by_symbol_kind,
            "byLanguage": by_language,
        })
    }

    /// Run a persistence operation on the blocking pool, bounded by `io_timeout`.
    ///
    /// An elapsed timeout surfaces as `StoreUnavailable`. The blocking task is
    /// not cancelled and may still commit afterwards.
    async fn run_io<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreInner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let timeout = inner.config.io_timeout;
        let task = tokio::task::spawn_blocking(move || f(&inner));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(MemoryError::other(format!("{op} task failed: {join_err}"))),
            Err(_) => {
                log::warn!("Store {} exceeded {:?}", op, timeout);
                Err(MemoryError::unavailable(format!(
                    "{op} did not complete within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}

impl StoreInner {
    fn maybe_flush(&self) -> Result<()> {
        if self.config.flush_on_write {
            self.db.flush()?;
        }
        Ok(())
    }

    /// Every link target must be a live object in the linking object's scope,
    /// or one of the `pending` objects committed alongside it.
    fn check_link_targets(
        &self,
        object: &MemoryObject,
        retired: &HashSet<ObjectId>,
        pending: &HashSet<ObjectId>,
    ) -> Result<()> {
        for link in &object.links {
            let live = pending.contains(&link.target)
                || (!retired.contains(&link.target)
                    && self
                        .objects
                        .get(&link.target)
                        .is_some_and(|target| target.scope == object.scope));
            if !live {
                return Err(MemoryError::validation(format!(
                    "{} link target {} not found in {}",
                    link.relation, link.target, object.scope
                )));
            }
        }
        Ok(())
    }

    /// Copies of the objects in `scope` whose links reach a `retired` id,
    /// with those links retargeted or dropped.
    fn relink(
        &self,
        scope: &Scope,
        retired: &HashSet<ObjectId>,
        successors: &HashMap<ObjectId, ObjectId>,
    ) -> Vec<MemoryObject> {
        self.objects
            .iter()
            .filter(|entry| {
                entry.scope == *scope
                    && entry.links.iter().any(|link| retired.contains(&link.target))
            })
            .map(|entry| {
                let mut object = entry.value().clone();
                retarget(&mut object, retired, successors);
                object
            })
            .collect()
    }
}

/// `(parent, name, kind)`, which identifies a symbol across re-parses of one path
type SymbolKey = (Option<String>, String, SymbolKind);

fn symbol_key(object: &MemoryObject) -> Option<SymbolKey> {
    object
        .as_symbol()
        .map(|symbol| (symbol.parent.clone(), symbol.name.clone(), symbol.kind))
}

/// Point links at `retired` ids to their successor, dropping those without one.
fn retarget(
    object: &mut MemoryObject,
    retired: &HashSet<ObjectId>,
    successors: &HashMap<ObjectId, ObjectId>,
) {
    let links = std::mem::take(&mut object.links);
    for mut link in links {
        if retired.contains(&link.target) {
            match successors.get(&link.target) {
                Some(successor) => link.target = *successor,
                None => continue,
            }
        }
        if link.target != object.id && !object.links.contains(&link) {
            object.links.push(link);
        }
    }
}

fn object_key(id: &ObjectId) -> Vec<u8> {
    format!("{}{}", OBJECT_PREFIX, id).into_bytes()
}
