//! CodeMem server library.
//!
//! Extracts symbols from source files with tree-sitter, persists them and
//! architectural decisions in a scoped memory store, and answers ranked
//! queries over both. Exposed as a CLI and as a JSON-RPC server.

pub mod api;
pub mod config;
pub mod error;
pub mod extractor;
pub mod grammar;
pub mod indexer;
pub mod parser_registry;
pub mod rpc;
pub mod service;
pub mod watcher;

pub use config::ServiceConfig;
pub use error::{ServerError, ServerResult};
pub use extractor::SymbolExtractor;
pub use indexer::{BatchIndexResult, Indexer};
pub use parser_registry::AdapterRegistry;
pub use service::CodeMemoryService;
pub use watcher::FileWatcher;
