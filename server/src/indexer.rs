//! Indexer - hands extracted symbols to the store.
//!
//! Re-indexing a file replaces every symbol previously recorded for it in one
//! atomic batch. Unchanged content (by SHA-256) is skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use codemem_memory::{MemoryError, MemoryObject, MemoryStore, Scope};
use dashmap::DashMap;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;

use crate::error::{ServerError, ServerResult};
use crate::extractor::{Extraction, SymbolExtractor};
use crate::grammar::Diagnostic;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "__pycache__",
    "dist",
    "build",
    "out",
    "vendor",
];

/// Outcome for one indexed file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub language: String,
    /// Symbols now recorded for the file
    pub symbols: usize,
    /// Symbols superseded by this pass
    pub removed: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// True when the content was unchanged and nothing was written
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub kind: &'static str,
    pub error: String,
}

/// Result of a batch index operation.
#[derive(Debug, Default, Serialize)]
pub struct BatchIndexResult {
    pub succeeded: Vec<FileReport>,
    pub skipped: Vec<String>,
    pub failed: Vec<FileFailure>,
}

impl BatchIndexResult {
    /// Check if every file was indexed or skipped.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Share of files that did not fail.
    pub fn success_rate(&self) -> f64 {
        let ok = self.succeeded.len() + self.skipped.len();
        let total = ok + self.failed.len();
        if total == 0 {
            1.0
        } else {
            ok as f64 / total as f64
        }
    }

    fn record(&mut self, path: String, outcome: ServerResult<FileReport>) {
        match outcome {
            Ok(report) if report.skipped => self.skipped.push(report.path),
            Ok(report) => self.succeeded.push(report),
            Err(e) => {
                tracing::warn!("Failed to index {}: {}", path, e);
                self.failed.push(FileFailure {
                    path,
                    kind: e.code(),
                    error: e.to_string(),
                });
            }
        }
    }
}

enum Prepared {
    Unchanged { language: String },
    Extracted { extraction: Extraction, hash: [u8; 32] },
}

struct IndexerInner {
    store: MemoryStore,
    extractor: SymbolExtractor,
    agent: String,
    /// Content hash of the last committed pass per (scope, path)
    hashes: DashMap<(Scope, String), (String, [u8; 32])>,
}

#[derive(Clone)]
pub struct Indexer {
    inner: Arc<IndexerInner>,
}

impl Indexer {
    pub fn new(store: MemoryStore, extractor: SymbolExtractor, agent: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(IndexerInner {
                store,
                extractor,
                agent: agent.into(),
                hashes: DashMap::new(),
            }),
        }
    }

    pub fn extractor(&self) -> &SymbolExtractor {
        &self.inner.extractor
    }

    pub fn can_index(&self, path: &Path) -> bool {
        self.inner.extractor.registry().can_parse(path)
    }

    /// Extract `content` and replace the stored symbols of `path` with the result.
    pub async fn index_source(
        &self,
        scope: &Scope,
        path: &str,
        content: &str,
        language: &str,
    ) -> ServerResult<FileReport> {
        scope.validate()?;
        let prepared = self.inner.prepare(scope, path, content, language)?;
        self.commit(scope, path, prepared).await
    }

    /// Index several in-memory files; extraction runs on blocking workers.
    ///
    /// Languages are inferred from the paths. A failing file never aborts
    /// the batch.
    pub async fn index_files(&self, scope: &Scope, files: Vec<(String, String)>) -> BatchIndexResult {
        let mut result = BatchIndexResult::default();
        if let Err(e) = scope.validate() {
            let e = ServerError::from(e);
            for (path, _) in files {
                result.failed.push(FileFailure {
                    path,
                    kind: e.code(),
                    error: e.to_string(),
                });
            }
            return result;
        }

        let mut workers = JoinSet::new();
        for (path, content) in files {
            let inner = Arc::clone(&self.inner);
            let scope = scope.clone();
            workers.spawn_blocking(move || {
                let prepared = inner.prepare(&scope, &path, &content, "");
                (path, prepared)
            });
        }

        let mut prepared = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(item) => prepared.push(item),
                Err(e) => tracing::error!("Extraction worker failed: {}", e),
            }
        }
        prepared.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, outcome) in prepared {
            let outcome = match outcome {
                Ok(p) => self.commit(scope, &path, p).await,
                Err(e) => Err(e),
            };
            result.record(path, outcome);
        }

        tracing::info!(
            "Indexed batch in {}: {} indexed, {} unchanged, {} failed",
            scope,
            result.succeeded.len(),
            result.skipped.len(),
            result.failed.len()
        );
        result
    }

    /// Index every supported file under `root`.
    ///
    /// Hidden entries, common build/vendor directories and paths matching
    /// `excludes` (globs relative to `root`) are skipped.
    pub async fn index_directory(
        &self,
        scope: &Scope,
        root: &Path,
        excludes: &[String],
    ) -> ServerResult<BatchIndexResult> {
        let root = root.canonicalize()?;
        let excludes = build_globset(excludes)?;

        tracing::info!("Indexing directory: {:?}", root);

        let walk_root = root.clone();
        let inner = Arc::clone(&self.inner);
        let paths = tokio::task::spawn_blocking(move || {
            let mut paths = Vec::new();
            collect_files(&walk_root, &walk_root, &excludes, &inner.extractor, &mut paths);
            paths
        })
        .await
        .map_err(|e| ServerError::Io(std::io::Error::other(e)))?;

        let mut files = Vec::with_capacity(paths.len());
        let mut unreadable = BatchIndexResult::default();
        for path in paths {
            let display = path.to_string_lossy().to_string();
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => files.push((display, content)),
                Err(e) => unreadable.record(display, Err(e.into())),
            }
        }

        let mut result = self.index_files(scope, files).await;
        result.failed.extend(unreadable.failed);
        Ok(result)
    }

    /// Forget the content hash of `path` so its next index pass re-extracts.
    ///
    /// Needed whenever the symbols of a path change outside the indexer.
    pub fn invalidate(&self, scope: &Scope, path: &str) {
        if self
            .inner
            .hashes
            .remove(&(scope.clone(), path.to_string()))
            .is_some()
        {
            tracing::debug!("Invalidated content hash of {}", path);
        }
    }

    /// Delete every symbol recorded for `path`.
    pub async fn remove_file(&self, scope: &Scope, path: &str) -> ServerResult<usize> {
        let outcome = self
            .inner
            .store
            .replace_symbols_for_path(scope, path, Vec::new())
            .await?;
        self.invalidate(scope, path);
        Ok(outcome.removed)
    }

    async fn commit(
        &self,
        scope: &Scope,
        path: &str,
        prepared: Prepared,
    ) -> ServerResult<FileReport> {
        let (extraction, hash) = match prepared {
            Prepared::Unchanged { language } => {
                tracing::debug!("Unchanged, skipping: {}", path);
                return Ok(FileReport {
                    path: path.to_string(),
                    language,
                    symbols: 0,
                    removed: 0,
                    diagnostics: Vec::new(),
                    skipped: true,
                });
            }
            Prepared::Extracted { extraction, hash } => (extraction, hash),
        };

        let summary = format!("Parsed from {path}");
        let objects = extraction
            .symbols
            .into_iter()
            .map(|symbol| {
                MemoryObject::builder()
                    .scope(scope.clone())
                    .provenance(self.inner.agent.clone(), summary.clone())
                    .symbol(symbol)
                    .build()
                    .map_err(MemoryError::from)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let outcome = self
            .inner
            .store
            .replace_symbols_for_path(scope, path, objects)
            .await?;

        self.inner.hashes.insert(
            (scope.clone(), path.to_string()),
            (extraction.language.clone(), hash),
        );

        tracing::debug!("Indexed {}: {} symbols", path, outcome.inserted.len());
        Ok(FileReport {
            path: path.to_string(),
            language: extraction.language,
            symbols: outcome.inserted.len(),
            removed: outcome.removed,
            diagnostics: extraction.diagnostics,
            skipped: false,
        })
    }
}

impl IndexerInner {
    fn prepare(
        &self,
        scope: &Scope,
        path: &str,
        content: &str,
        language: &str,
    ) -> ServerResult<Prepared> {
        let hash = content_hash(language, content);
        if let Some(entry) = self.hashes.get(&(scope.clone(), path.to_string())) {
            let (previous_language, previous_hash) = entry.value();
            if *previous_hash == hash {
                return Ok(Prepared::Unchanged {
                    language: previous_language.clone(),
                });
            }
        }

        let extraction = self.extractor.extract(path, content, language)?;
        Ok(Prepared::Extracted { extraction, hash })
    }
}

fn content_hash(language: &str, content: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(language.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    hasher.finalize().into()
}

pub(crate) fn build_globset(patterns: &[String]) -> ServerResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ServerError::invalid_request(format!("invalid exclude pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ServerError::invalid_request(format!("invalid exclude patterns: {e}")))
}

/// Hidden entries and well-known build/vendor directories.
pub(crate) fn is_skipped_name(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

fn collect_files(
    dir: &Path,
    root: &Path,
    excludes: &GlobSet,
    extractor: &SymbolExtractor,
    out: &mut Vec<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read directory {:?}: {}", dir, e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if is_skipped_name(name) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if excludes.is_match(relative) {
            continue;
        }

        if path.is_dir() {
            collect_files(&path, root, excludes, extractor, out);
        } else if extractor.registry().can_parse(&path) {
            out.push(path);
        }
    }
}
