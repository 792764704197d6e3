//! Adapter Registry - Maps language tags and file extensions to grammar adapters.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::error::{ServerError, ServerResult};
use crate::grammar::{builtin_adapters, GrammarAdapter};

static GLOBAL: OnceLock<Arc<AdapterRegistry>> = OnceLock::new();

/// Registry of all available grammar adapters.
///
/// Built once and read-only afterwards; lookups never mutate it.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn GrammarAdapter>>,
}

impl AdapterRegistry {
    /// Create a registry over an explicit adapter set.
    pub fn new(adapters: Vec<Box<dyn GrammarAdapter>>) -> Self {
        Self {
            adapters: adapters.into_iter().map(Arc::from).collect(),
        }
    }

    /// Create a registry with every builtin adapter.
    pub fn with_builtins() -> Self {
        Self::new(builtin_adapters())
    }

    /// Process-wide registry, initialized on first use.
    pub fn global() -> Arc<AdapterRegistry> {
        GLOBAL
            .get_or_init(|| Arc::new(AdapterRegistry::with_builtins()))
            .clone()
    }

    /// Get adapter by language tag or alias (case-insensitive).
    pub fn lookup(&self, language: &str) -> ServerResult<Arc<dyn GrammarAdapter>> {
        let tag = language.trim().to_lowercase();
        self.adapters
            .iter()
            .find(|a| a.language() == tag || a.aliases().contains(&tag.as_str()))
            .cloned()
            .ok_or_else(|| ServerError::UnsupportedLanguage(language.to_string()))
    }

    /// Find the adapter claiming a file path's extension.
    pub fn adapter_for_path(&self, path: &Path) -> Option<Arc<dyn GrammarAdapter>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.adapters
            .iter()
            .find(|a| a.file_extensions().contains(&ext.as_str()))
            .cloned()
    }

    /// Get the canonical language tag for a file path.
    pub fn language_for_path(&self, path: &Path) -> Option<&'static str> {
        self.adapter_for_path(path).map(|a| a.language())
    }

    pub fn supported_languages(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.language()).collect()
    }

    /// Get all supported file extensions.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.adapters
            .iter()
            .flat_map(|a| a.file_extensions().iter().copied())
            .collect()
    }

    /// Check if a file path is supported by any adapter.
    pub fn can_parse(&self, path: &Path) -> bool {
        self.adapter_for_path(path).is_some()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
