//! Service facade over extraction, storage and query.
//!
//! Exposes the parse, object and query interfaces used by the JSON-RPC
//! server and the CLI. The service owns no state of its own beyond handles
//! to the store and the indexer's content-hash map.

use std::path::Path;

use codemem_memory::{
    MemoryError, MemoryObject, MemoryStore, ObjectId, QueryEngine, QueryRequest, Scope,
};

use crate::api::{
    CreateObjectRequest, CreatedObject, IndexFileRequest, ListRequest, ObjectRef, ObjectView,
    ParseRequest, ParseResponse, QueryHit, QueryRequestDto, QueryResponse, StatsRequest,
    UpdateObjectRequest,
};
use crate::config::ServiceConfig;
use crate::error::{ServerError, ServerResult};
use crate::extractor::SymbolExtractor;
use crate::indexer::{FileReport, Indexer};

pub struct CodeMemoryService {
    config: ServiceConfig,
    store: MemoryStore,
    engine: QueryEngine,
    indexer: Indexer,
}

impl CodeMemoryService {
    /// Open (or create) the store under `config.data_dir`.
    pub fn open(config: ServiceConfig) -> ServerResult<Self> {
        tracing::info!("Opening memory store at {:?}", config.data_dir);
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            tracing::error!("Failed to create data directory {:?}: {}", config.data_dir, e);
            e
        })?;

        let store = MemoryStore::open(&config.data_dir, config.store_config())?;
        tracing::info!("Memory store ready with {} objects", store.len());
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: ServiceConfig, store: MemoryStore) -> Self {
        let engine = QueryEngine::with_kind(store.clone(), config.scorer);
        let indexer = Indexer::new(store.clone(), SymbolExtractor::default(), config.agent.clone());
        Self {
            config,
            store,
            engine,
            indexer,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Extract symbols without persisting them.
    pub fn parse(&self, request: &ParseRequest) -> ServerResult<ParseResponse> {
        let extraction = self.indexer.extractor().extract(
            &request.file_path,
            &request.content,
            &request.language,
        )?;
        Ok(extraction.into())
    }

    /// Store a new object; id and timestamps are assigned by the store.
    pub async fn create(&self, request: CreateObjectRequest) -> ServerResult<CreatedObject> {
        let scope = Scope::new(request.tenant_id, request.project_id)?;
        let object = MemoryObject::builder()
            .scope(scope.clone())
            .provenance_record(request.provenance)
            .body(request.body.into())
            .links(request.links)
            .build()
            .map_err(MemoryError::from)?;

        let id = self.store.put(object).await?;
        let stored = self.store.get(&id, &scope)?;
        self.invalidate_symbol_path(&scope, &stored);
        tracing::debug!("Created {} {} in {}", stored.object_type(), id, scope);
        Ok(CreatedObject {
            id,
            created_at: stored.created_at(),
            updated_at: stored.updated_at(),
        })
    }

    pub fn get(&self, reference: &ObjectRef) -> ServerResult<ObjectView> {
        let (id, scope) = resolve(reference)?;
        Ok(self.store.get(&id, &scope)?.into())
    }

    /// Replace an object's body and provenance in place.
    ///
    /// Links are kept unless the request carries a new set.
    pub async fn update(&self, request: UpdateObjectRequest) -> ServerResult<ObjectView> {
        let id: ObjectId = request.id.parse()?;
        let scope = Scope::new(request.tenant_id, request.project_id)?;
        let previous = self.store.get(&id, &scope)?;
        let links = request.links.unwrap_or_else(|| previous.links.clone());
        let object = MemoryObject::builder()
            .id(id)
            .scope(scope.clone())
            .provenance_record(request.provenance)
            .body(request.body.into())
            .links(links)
            .build()
            .map_err(MemoryError::from)?;

        let updated = self.store.update(&scope, object).await?;
        self.invalidate_symbol_path(&scope, &previous);
        self.invalidate_symbol_path(&scope, &updated);
        Ok(updated.into())
    }

    pub async fn delete(&self, reference: &ObjectRef) -> ServerResult<()> {
        let (id, scope) = resolve(reference)?;
        let previous = self.store.get(&id, &scope)?;
        self.store.delete(&id, &scope).await?;
        self.invalidate_symbol_path(&scope, &previous);
        Ok(())
    }

    /// Symbols edited by hand no longer match their file's last index pass.
    fn invalidate_symbol_path(&self, scope: &Scope, object: &MemoryObject) {
        if let Some(symbol) = object.as_symbol() {
            self.indexer.invalidate(scope, &symbol.path);
        }
    }

    pub fn list(&self, request: &ListRequest) -> ServerResult<Vec<ObjectView>> {
        let scope = Scope::new(request.tenant_id.clone(), request.project_id.clone())?;
        let objects = self.store.list_by_scope(&scope, request.object_type)?;
        Ok(objects.into_iter().map(ObjectView::from).collect())
    }

    pub async fn query(&self, request: QueryRequestDto) -> ServerResult<QueryResponse> {
        // Built unchecked so that an empty tenant surfaces as InvalidScope
        // from the engine rather than from request decoding.
        let scope = Scope {
            tenant_id: request.tenant_id,
            project_id: request.project_id,
        };
        let query = QueryRequest::new(request.text.clone(), scope, request.limit)
            .with_offset(request.offset)
            .with_types(request.types);

        let result = self.engine.query(&query).await?;
        Ok(QueryResponse {
            results: result
                .results
                .into_iter()
                .map(|hit| QueryHit::new(hit, &request.text))
                .collect(),
            trace_id: result.trace_id,
            total_count: result.total_count,
            execution_time_ms: result.execution_time_ms,
        })
    }

    /// Parse one file and replace its stored symbols.
    pub async fn index_file(&self, request: IndexFileRequest) -> ServerResult<FileReport> {
        let scope = Scope::new(request.tenant_id, request.project_id)?;
        let content = match request.content {
            Some(content) => content,
            None => tokio::fs::read_to_string(Path::new(&request.file_path)).await?,
        };
        self.indexer
            .index_source(&scope, &request.file_path, &content, &request.language)
            .await
    }

    /// Object counts, for one scope or the whole store.
    pub fn stats(&self, request: &StatsRequest) -> ServerResult<serde_json::Value> {
        let scope = match (&request.tenant_id, &request.project_id) {
            (Some(tenant), Some(project)) => Some(Scope::new(tenant.clone(), project.clone())?),
            (None, None) => None,
            _ => {
                return Err(ServerError::invalid_request(
                    "stats needs both tenant_id and project_id, or neither",
                ))
            }
        };
        let mut stats = self.store.stats(scope.as_ref());
        if let Some(map) = stats.as_object_mut() {
            map.insert("scorer".to_string(), self.engine.scorer_name().into());
        }
        Ok(stats)
    }
}

fn resolve(reference: &ObjectRef) -> ServerResult<(ObjectId, Scope)> {
    let id: ObjectId = reference.id.parse()?;
    let scope = Scope::new(reference.tenant_id.clone(), reference.project_id.clone())?;
    Ok((id, scope))
}
