//! Request and response types for the service boundary.
//!
//! These are the JSON shapes exchanged over JSON-RPC and printed by the CLI.
//! Stored records keep their own serialization in the memory crate.

use chrono::{DateTime, Utc};
use codemem_memory::{
    Decision, MemoryObject, ObjectBody, ObjectId, ObjectLink, ObjectType, Provenance,
    ProvenanceRecord, SearchResult, Symbol, SymbolKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extractor::Extraction;
use crate::grammar::Diagnostic;

pub const DEFAULT_QUERY_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseRequest {
    pub file_path: String,
    pub content: String,
    /// Empty means infer from `file_path`
    #[serde(default)]
    pub language: String,
}

/// Wire form of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolView {
    pub name: String,
    #[serde(alias = "kind")]
    pub symbol_type: SymbolKind,
    pub path: String,
    pub language: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl From<Symbol> for SymbolView {
    fn from(symbol: Symbol) -> Self {
        Self {
            name: symbol.name,
            symbol_type: symbol.kind,
            path: symbol.path,
            language: symbol.language,
            start_line: symbol.start_line,
            end_line: symbol.end_line,
            parent: symbol.parent,
            signature: symbol.signature,
            documentation: symbol.documentation,
        }
    }
}

impl From<SymbolView> for Symbol {
    fn from(view: SymbolView) -> Self {
        let mut symbol = Symbol::new(
            view.name,
            view.symbol_type,
            view.path,
            view.language,
            view.start_line,
            view.end_line,
        );
        symbol.parent = view.parent;
        symbol.signature = view.signature;
        symbol.documentation = view.documentation;
        symbol
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResponse {
    pub language: String,
    pub symbols: Vec<SymbolView>,
    pub diagnostics: Vec<Diagnostic>,
}

impl From<Extraction> for ParseResponse {
    fn from(extraction: Extraction) -> Self {
        Self {
            language: extraction.language,
            symbols: extraction.symbols.into_iter().map(SymbolView::from).collect(),
            diagnostics: extraction.diagnostics,
        }
    }
}

/// Variant payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectPayload {
    Symbol(SymbolView),
    Decision(Decision),
}

impl ObjectPayload {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectPayload::Symbol(_) => ObjectType::Symbol,
            ObjectPayload::Decision(_) => ObjectType::Decision,
        }
    }
}

impl From<ObjectPayload> for ObjectBody {
    fn from(payload: ObjectPayload) -> Self {
        match payload {
            ObjectPayload::Symbol(view) => ObjectBody::Symbol(view.into()),
            ObjectPayload::Decision(decision) => ObjectBody::Decision(decision),
        }
    }
}

impl From<ObjectBody> for ObjectPayload {
    fn from(body: ObjectBody) -> Self {
        match body {
            ObjectBody::Symbol(symbol) => ObjectPayload::Symbol(symbol.into()),
            ObjectBody::Decision(decision) => ObjectPayload::Decision(decision),
        }
    }
}

/// A complete object minus the store-assigned id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateObjectRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub provenance: Provenance,
    #[serde(default)]
    pub links: Vec<ObjectLink>,
    #[serde(flatten)]
    pub body: ObjectPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedObject {
    pub id: ObjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateObjectRequest {
    pub id: String,
    pub tenant_id: String,
    pub project_id: String,
    pub provenance: Provenance,
    /// Replaces the stored links when present
    #[serde(default)]
    pub links: Option<Vec<ObjectLink>>,
    #[serde(flatten)]
    pub body: ObjectPayload,
}

/// Addresses one object: `(tenant_id, project_id, id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
    pub tenant_id: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest {
    pub tenant_id: String,
    pub project_id: String,
    #[serde(default, rename = "type")]
    pub object_type: Option<ObjectType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequestDto {
    pub text: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    pub tenant_id: String,
    pub project_id: String,
    #[serde(default)]
    pub types: Vec<ObjectType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFileRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub file_path: String,
    /// Read from disk when absent
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Wire form of a stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectView {
    pub id: ObjectId,
    pub tenant_id: String,
    pub project_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ProvenanceRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<ObjectLink>,
    #[serde(flatten)]
    pub body: ObjectPayload,
}

impl From<MemoryObject> for ObjectView {
    fn from(object: MemoryObject) -> Self {
        Self {
            id: object.id,
            tenant_id: object.scope.tenant_id,
            project_id: object.scope.project_id,
            created_at: object.temporal.created_at,
            updated_at: object.temporal.updated_at,
            provenance: object.provenance,
            history: object.history,
            links: object.links,
            body: object.body.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    pub object: ObjectView,
}

impl QueryHit {
    pub fn new(result: SearchResult, query: &str) -> Self {
        let matched = codemem_memory::search::matched_field(&result.object, query);
        Self {
            score: result.score,
            matched: matched.map(str::to_string),
            object: result.object.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<QueryHit>,
    pub trace_id: Uuid,
    pub total_count: usize,
    pub execution_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemem_memory::{DecisionStatus, LinkRelation, Scope};
    use serde_json::json;

    #[test]
    fn test_create_decision_defaults_to_accepted() {
        let request: CreateObjectRequest = serde_json::from_value(json!({
            "tenant_id": "acme",
            "project_id": "web",
            "provenance": {"agent": "alice", "summary": "Architecture review"},
            "type": "decision",
            "title": "Use RocksDB",
            "problem": "Need durable storage",
            "rationale": "Embedded and fast",
            "outcome": "Adopted"
        }))
        .unwrap();

        match request.body {
            ObjectPayload::Decision(decision) => {
                assert_eq!(decision.status, DecisionStatus::Accepted);
                assert!(decision.options.is_empty());
            }
            other => panic!("expected decision, got {other:?}"),
        }
        assert!(request.provenance.model.is_none());
    }

    #[test]
    fn test_create_symbol_accepts_kind_alias() {
        let request: CreateObjectRequest = serde_json::from_value(json!({
            "tenant_id": "acme",
            "project_id": "web",
            "provenance": {"agent": "indexer", "summary": "Parsed from a.py"},
            "type": "symbol",
            "name": "run",
            "kind": "function",
            "path": "a.py",
            "language": "python",
            "start_line": 0,
            "end_line": 3
        }))
        .unwrap();
        assert_eq!(request.body.object_type(), ObjectType::Symbol);
        let body: ObjectBody = request.body.into();
        assert_eq!(body.object_type(), ObjectType::Symbol);
    }

    #[test]
    fn test_symbol_view_uses_symbol_type() {
        let view = SymbolView::from(Symbol::new("f", SymbolKind::Function, "a.py", "python", 0, 1));
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["symbol_type"], "function");
        assert!(value.get("kind").is_none());
        assert!(value.get("parent").is_none());
    }

    #[test]
    fn test_query_request_defaults() {
        let request: QueryRequestDto = serde_json::from_value(json!({
            "text": "rust functions",
            "tenant_id": "t",
            "project_id": "p"
        }))
        .unwrap();
        assert_eq!(request.limit, DEFAULT_QUERY_LIMIT);
        assert_eq!(request.offset, 0);
        assert!(request.types.is_empty());
    }

    #[test]
    fn test_object_view_is_flat() {
        let object = MemoryObject::builder()
            .scope(Scope::new("t", "p").unwrap())
            .provenance("alice", "why")
            .decision(Decision::new("Title", "Problem", "Rationale", "Outcome"))
            .build()
            .unwrap();
        let value = serde_json::to_value(ObjectView::from(object)).unwrap();
        assert_eq!(value["type"], "decision");
        assert_eq!(value["title"], "Title");
        assert_eq!(value["status"], "accepted");
        assert_eq!(value["tenant_id"], "t");
        assert!(value.get("history").is_none());
    }

    #[test]
    fn test_links_on_the_wire() {
        let target = ObjectId::new();
        let request: CreateObjectRequest = serde_json::from_value(json!({
            "tenant_id": "acme",
            "project_id": "web",
            "provenance": {"agent": "alice", "summary": "Architecture review"},
            "type": "decision",
            "title": "Cache configs",
            "problem": "Slow startup",
            "rationale": "Reuse parsed files",
            "outcome": "Adopted",
            "links": [{"type": "justifies", "target": target.to_string()}]
        }))
        .unwrap();
        assert_eq!(request.links, vec![ObjectLink::new(LinkRelation::Justifies, target)]);

        let update: UpdateObjectRequest = serde_json::from_value(json!({
            "id": target.to_string(),
            "tenant_id": "acme",
            "project_id": "web",
            "provenance": {"agent": "bob", "summary": "Edit"},
            "type": "decision",
            "title": "t", "problem": "p", "rationale": "r", "outcome": "o"
        }))
        .unwrap();
        assert!(update.links.is_none());
    }

    #[test]
    fn test_symbol_documentation_roundtrip() {
        let symbol = Symbol::new("load", SymbolKind::Function, "cfg.py", "python", 0, 2)
            .with_documentation("Read settings.");
        let value = serde_json::to_value(SymbolView::from(symbol.clone())).unwrap();
        assert_eq!(value["documentation"], "Read settings.");
        let back: SymbolView = serde_json::from_value(value).unwrap();
        assert_eq!(Symbol::from(back), symbol);
    }
}
