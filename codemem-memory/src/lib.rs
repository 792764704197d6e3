//! CodeMem Memory Layer
//!
//! Durable, multi-tenant object store for code symbols and design decisions,
//! with provenance tracking and a scoped, ranked query engine.
//!
//! ## Features
//!
//! - **Scope isolation** - Every object belongs to one `(tenant_id, project_id)` pair
//! - **Provenance** - Who changed an object and why, with an audit trail of prior entries
//! - **Pluggable ranking** - Lexical (BM25), similarity (feature hashing) or hybrid
//! - **RocksDB persistence** - Versioned schema, bounded-latency I/O
//!
//! ## Example
//!
//! ```ignore
//! use codemem_memory::{Decision, MemoryObject, MemoryStore, QueryEngine, QueryRequest, Scope, ScorerKind};
//!
//! let store = MemoryStore::new(&db_path)?;
//! let scope = Scope::new("acme", "web")?;
//!
//! let decision = MemoryObject::builder()
//!     .scope(scope.clone())
//!     .provenance("alice", "Architecture review")
//!     .decision(Decision::new("Use RocksDB", "Need durability", "Embedded, fast", "Adopted"))
//!     .build()?;
//! store.put(decision).await?;
//!
//! let engine = QueryEngine::with_kind(store, ScorerKind::Lexical);
//! let result = engine.query(&QueryRequest::new("rocksdb", scope, 10)).await?;
//! ```

pub mod embedding;
pub mod error;
pub mod migration;
pub mod node;
pub mod search;
pub mod storage;
pub mod temporal;

// Re-exports for convenience
pub use embedding::VectorEngine;
pub use error::{MemoryError, Result};
pub use node::{
    Decision, DecisionOption, DecisionStatus, LinkRelation, MemoryObject, MemoryObjectBuilder,
    ObjectBody, ObjectBuilderError, ObjectId, ObjectLink, ObjectType, Provenance,
    ProvenanceRecord, Scope, Symbol, SymbolKind,
};
pub use search::{
    HybridScorer, LexicalScorer, QueryEngine, QueryRequest, QueryResult, RelevanceScorer,
    ScorerKind, SearchResult, SimilarityScorer,
};
pub use storage::{MemoryStore, ReplaceOutcome, StoreConfig};
pub use temporal::TemporalMetadata;
