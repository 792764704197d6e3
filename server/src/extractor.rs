//! Symbol extraction.
//!
//! Drives a grammar adapter over one file and normalizes its raw constructs
//! into typed [`Symbol`] records. Nothing is persisted here; callers hand the
//! symbols to the store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use codemem_memory::{Symbol, SymbolKind};
use regex::Regex;

use crate::error::{ServerError, ServerResult};
use crate::grammar::{ConstructKind, Diagnostic, RawConstruct};
use crate::parser_registry::AdapterRegistry;

/// `MAX_RETRIES`, `_DEFAULT_PORT`, `V2`
static UPPER_SNAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_*[A-Z][A-Z0-9_]*$").expect("invalid regex"));

/// How a language marks a top-level binding as constant.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    /// Names matching this pattern are constants regardless of keyword.
    pub constant_pattern: Option<Regex>,
    /// Whether `const`-style declarations are constants by themselves.
    pub keyword_constants: bool,
}

impl NamingConvention {
    pub fn upper_snake_case() -> Self {
        Self {
            constant_pattern: Some(UPPER_SNAKE.clone()),
            keyword_constants: false,
        }
    }

    pub fn keyword() -> Self {
        Self {
            constant_pattern: None,
            keyword_constants: true,
        }
    }

    /// Default convention for a canonical language tag.
    pub fn for_language(language: &str) -> Self {
        match language {
            "rust" | "go" | "java" | "c" | "cpp" => Self::keyword(),
            _ => Self::upper_snake_case(),
        }
    }

    pub fn matches_pattern(&self, name: &str) -> bool {
        self.constant_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(name))
    }

    fn binding_kind(&self, construct: ConstructKind, name: &str) -> SymbolKind {
        let keyword_constant = construct == ConstructKind::ConstBinding && self.keyword_constants;
        if keyword_constant || self.matches_pattern(name) {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        }
    }
}

/// Result of extracting one file.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Canonical tag of the adapter that ran
    pub language: String,
    pub symbols: Vec<Symbol>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn unknown_count(&self) -> usize {
        self.symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Unknown)
            .count()
    }
}

#[derive(Clone)]
pub struct SymbolExtractor {
    registry: Arc<AdapterRegistry>,
    conventions: HashMap<String, NamingConvention>,
}

impl SymbolExtractor {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            conventions: HashMap::new(),
        }
    }

    /// Override the naming convention for one canonical language tag.
    pub fn with_convention(mut self, language: &str, convention: NamingConvention) -> Self {
        self.conventions.insert(language.to_string(), convention);
        self
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Extract symbols from `content`.
    ///
    /// An empty `language` is inferred from the extension of `file_path`.
    pub fn extract(
        &self,
        file_path: &str,
        content: &str,
        language: &str,
    ) -> ServerResult<Extraction> {
        let adapter = if language.trim().is_empty() {
            self.registry
                .adapter_for_path(Path::new(file_path))
                .ok_or_else(|| {
                    ServerError::UnsupportedLanguage(format!("(inferred from '{file_path}')"))
                })?
        } else {
            self.registry.lookup(language)?
        };

        let language = adapter.language();
        let output = adapter.parse(content);
        let fallback;
        let convention = match self.conventions.get(language) {
            Some(convention) => convention,
            None => {
                fallback = NamingConvention::for_language(language);
                &fallback
            }
        };

        let symbols = output
            .constructs
            .into_iter()
            .map(|construct| to_symbol(construct, file_path, language, convention))
            .collect();

        if !output.diagnostics.is_empty() {
            tracing::debug!(
                "{} diagnostics while parsing {}",
                output.diagnostics.len(),
                file_path
            );
        }

        Ok(Extraction {
            language: language.to_string(),
            symbols,
            diagnostics: output.diagnostics,
        })
    }
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new(AdapterRegistry::global())
    }
}

/// Symbol kind for a raw construct; `None` when no mapping exists.
pub fn construct_symbol_kind(
    kind: ConstructKind,
    name: &str,
    convention: &NamingConvention,
) -> Option<SymbolKind> {
    match kind {
        ConstructKind::Function => Some(SymbolKind::Function),
        ConstructKind::Method => Some(SymbolKind::Method),
        ConstructKind::Class | ConstructKind::Struct => Some(SymbolKind::Class),
        ConstructKind::Enum
        | ConstructKind::Interface
        | ConstructKind::Trait
        | ConstructKind::TypeAlias => Some(SymbolKind::Type),
        ConstructKind::Binding | ConstructKind::ConstBinding => {
            Some(convention.binding_kind(kind, name))
        }
        ConstructKind::Module | ConstructKind::Macro => None,
    }
}

fn to_symbol(
    construct: RawConstruct,
    file_path: &str,
    language: &str,
    convention: &NamingConvention,
) -> Symbol {
    let kind = construct_symbol_kind(construct.kind, &construct.name, convention)
        .unwrap_or_else(|| {
            tracing::warn!(
                "No symbol kind for {} construct '{}' in {}:{}",
                construct.kind.as_str(),
                construct.name,
                file_path,
                construct.start_line
            );
            SymbolKind::Unknown
        });

    let mut symbol = Symbol::new(
        construct.name,
        kind,
        file_path,
        language,
        construct.start_line,
        construct.end_line,
    );
    symbol.parent = construct.parent;
    symbol.signature = construct.signature;
    symbol.documentation = construct.documentation;
    symbol
}
