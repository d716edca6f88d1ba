//! Execution context handed to plugins

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

use crate::config::ToolConfiguration;

/// Shared cache adapters may use to skip unchanged work
pub trait AnalysisCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value);
    fn invalidate(&self, key: &str);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory LRU cache
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Value>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, LruCache<String, Value>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AnalysisCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) {
        if let Some((evicted, _)) = self.entries().push(key.to_string(), value) {
            if evicted != key {
                debug!("Evicted cache entry: {}", evicted);
            }
        }
    }

    fn invalidate(&self, key: &str) {
        self.entries().pop(key);
    }

    fn len(&self) -> usize {
        self.entries().len()
    }
}

/// Everything an adapter needs for one execution
#[derive(Clone)]
pub struct ExecutionContext {
    pub project_path: PathBuf,
    /// Restricts incremental-capable tools to these files
    pub changed_files: Option<Vec<PathBuf>>,
    pub cache: Option<Arc<dyn AnalysisCache>>,
    pub logger: tracing::Span,
    /// Flips to `true` when the caller wants the execution abandoned
    pub abort: Option<watch::Receiver<bool>>,
    pub config: Option<ToolConfiguration>,
}

impl ExecutionContext {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            changed_files: None,
            cache: None,
            logger: tracing::Span::none(),
            abort: None,
            config: None,
        }
    }

    pub fn with_changed_files(mut self, files: Vec<PathBuf>) -> Self {
        self.changed_files = Some(files);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_abort(mut self, abort: watch::Receiver<bool>) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Copy of this context scoped to one plugin
    pub(crate) fn for_plugin(&self, name: &str, config: ToolConfiguration) -> Self {
        Self {
            logger: tracing::info_span!("plugin", name = %name),
            config: Some(config),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("project_path", &self.project_path)
            .field("changed_files", &self.changed_files)
            .field("cache", &self.cache.as_ref().map(|c| c.len()))
            .field("aborted", &self.is_aborted())
            .field("config", &self.config)
            .finish()
    }
}
