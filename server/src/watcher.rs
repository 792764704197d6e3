//! File system watcher for incremental re-indexing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use codemem_memory::Scope;
use dashmap::DashSet;
use globset::GlobSet;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::error::ServerResult;
use crate::indexer::{build_globset, is_skipped_name, Indexer};

/// Default debounce interval in milliseconds.
const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// How often pending events are checked against the debounce interval.
const TICK_MS: u64 = 50;

/// What a debounced event does to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upsert,
    Remove,
}

impl ChangeKind {
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) | EventKind::Modify(_) => Some(ChangeKind::Upsert),
            EventKind::Remove(_) => Some(ChangeKind::Remove),
            _ => None,
        }
    }
}

/// File system watcher that re-indexes changed files into one scope.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    roots: Arc<DashSet<PathBuf>>,
}

impl FileWatcher {
    /// Create a new file watcher with the default debounce interval.
    ///
    /// `excludes` are globs relative to the watched roots, as accepted by
    /// [`Indexer::index_directory`].
    pub fn new(indexer: Indexer, scope: Scope, excludes: &[String]) -> ServerResult<Self> {
        Self::with_debounce(
            indexer,
            scope,
            excludes,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        )
    }

    pub fn with_debounce(
        indexer: Indexer,
        scope: Scope,
        excludes: &[String],
        debounce: Duration,
    ) -> ServerResult<Self> {
        let (tx, rx) = mpsc::channel::<Event>(100);
        let roots = Arc::new(DashSet::new());
        let context = WatchContext {
            indexer,
            scope,
            roots: Arc::clone(&roots),
            excludes: build_globset(excludes)?,
        };

        let watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                // notify calls back on its own thread
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            },
            Config::default(),
        )?;

        tokio::spawn(debounce_events(rx, context, debounce));

        Ok(Self { watcher, roots })
    }

    /// Start watching a directory recursively.
    pub fn watch(&mut self, path: &Path) -> ServerResult<()> {
        let root = path.canonicalize()?;
        self.watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::info!("Watching {:?}", root);
        self.roots.insert(root);
        Ok(())
    }

    pub fn unwatch(&mut self, path: &Path) -> ServerResult<()> {
        let root = path.canonicalize()?;
        self.watcher.unwatch(&root)?;
        self.roots.remove(&root);
        Ok(())
    }
}

/// Collect events per path and apply each once it has been quiet for `debounce`.
async fn debounce_events(mut rx: mpsc::Receiver<Event>, context: WatchContext, debounce: Duration) {
    let mut pending: HashMap<PathBuf, (ChangeKind, Instant)> = HashMap::new();
    let mut tick = tokio::time::interval(Duration::from_millis(TICK_MS));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        let Some(change) = ChangeKind::from_event(&event.kind) else {
                            continue;
                        };
                        for path in event.paths {
                            pending.insert(path, (change, Instant::now()));
                        }
                    }
                    None => break,
                }
            }
            _ = tick.tick() => {
                let now = Instant::now();
                let mut ready = Vec::new();
                pending.retain(|path, (change, at)| {
                    if now.duration_since(*at) >= debounce {
                        ready.push((path.clone(), *change));
                        false
                    } else {
                        true
                    }
                });

                for (path, change) in ready {
                    context.apply(&path, change).await;
                }
            }
        }
    }
    tracing::debug!("File watcher stopped");
}

/// Whether any component below the watched root is hidden or a build directory.
fn is_ignored(relative: &Path) -> bool {
    relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| name != "." && name != ".." && is_skipped_name(name))
}

/// State shared between the watcher handle and its event task.
#[derive(Clone)]
struct WatchContext {
    indexer: Indexer,
    scope: Scope,
    roots: Arc<DashSet<PathBuf>>,
    excludes: GlobSet,
}

impl WatchContext {
    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        self.roots
            .iter()
            .find_map(|root| path.strip_prefix(root.key()).ok())
            .unwrap_or(path)
    }

    /// Whether the path or one of its directories matches an exclude glob.
    fn is_excluded(&self, relative: &Path) -> bool {
        relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.excludes.is_match(p))
    }

    /// Apply one debounced change. Errors are logged; the watcher keeps running.
    async fn apply(&self, path: &Path, change: ChangeKind) {
        let relative = self.relative(path);
        if is_ignored(relative) || self.is_excluded(relative) || !self.indexer.can_index(path) {
            return;
        }
        let path_str = path.to_string_lossy().to_string();

        // Editors often replace files on save, so a create/modify may arrive
        // for a path that no longer exists.
        let change = if change == ChangeKind::Upsert && !path.exists() {
            ChangeKind::Remove
        } else {
            change
        };

        match change {
            ChangeKind::Upsert => {
                let content = match tokio::fs::read_to_string(path).await {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::warn!("Cannot read {}: {}", path_str, e);
                        return;
                    }
                };
                match self
                    .indexer
                    .index_source(&self.scope, &path_str, &content, "")
                    .await
                {
                    Ok(report) if report.skipped => {}
                    Ok(report) => tracing::debug!(
                        "Re-indexed {}: {} symbols ({} replaced)",
                        path_str,
                        report.symbols,
                        report.removed
                    ),
                    Err(e) => tracing::warn!("Error processing {}: {}", path_str, e),
                }
            }
            ChangeKind::Remove => match self.indexer.remove_file(&self.scope, &path_str).await {
                Ok(removed) => tracing::debug!("Removed {} symbols of {}", removed, path_str),
                Err(e) => tracing::warn!("Error removing {}: {}", path_str, e),
            },
        }
    }
}
