//! Scoped query engine
//!
//! Filters the store to one tenant/project, ranks the remaining objects with
//! a pluggable [`RelevanceScorer`] and paginates. Scoping, pagination and
//! trace generation are independent of the ranking strategy.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::embedding::VectorEngine;
use crate::error::{MemoryError, Result};
use crate::node::{MemoryObject, ObjectBody, ObjectType, Scope};
use crate::storage::MemoryStore;

/// BM25 k1 parameter
const K1: f32 = 1.2;
/// BM25 b parameter
const B: f32 = 0.75;
/// Typical searchable text length, in tokens
const AVG_DOC_LENGTH: f32 = 12.0;
/// Extra weight for terms found in a symbol name or decision title
const NAME_WEIGHT: f32 = 3.0;
/// Partial credit when a document term merely starts with the query term
const PREFIX_CREDIT: f32 = 0.5;

/// Objects scored between cooperative yields
const YIELD_EVERY: usize = 256;

/// Ranking strategy: relevance of one object to the query text.
///
/// A score of zero or less means "no match".
pub trait RelevanceScorer: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, query: &str, object: &MemoryObject) -> f32;
}

/// Available ranking strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    #[default]
    Lexical,
    Similarity,
    Hybrid,
}

impl ScorerKind {
    pub fn build(self) -> Arc<dyn RelevanceScorer> {
        match self {
            ScorerKind::Lexical => Arc::new(LexicalScorer::default()),
            ScorerKind::Similarity => Arc::new(SimilarityScorer::default()),
            ScorerKind::Hybrid => Arc::new(HybridScorer::default()),
        }
    }
}

impl FromStr for ScorerKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "bm25" => Ok(ScorerKind::Lexical),
            "similarity" | "semantic" => Ok(ScorerKind::Similarity),
            "hybrid" => Ok(ScorerKind::Hybrid),
            other => Err(MemoryError::validation(format!("unknown scorer '{other}'"))),
        }
    }
}

/// Tokenize text into lowercase terms, splitting identifiers.
///
/// `parseConfig`, `parse_config` and `ParseConfig` all yield `parse`, `config`.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_was_upper = false;

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            // Split before an uppercase letter unless it continues an acronym
            if ch.is_uppercase() && !current.is_empty() && !prev_was_upper {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
            current.push(ch);
            prev_was_upper = ch.is_uppercase();
        } else {
            if !current.is_empty() {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
            prev_was_upper = false;
        }
    }

    if !current.is_empty() {
        tokens.push(current.to_lowercase());
    }

    tokens
        .into_iter()
        .filter(|t| t.len() >= 2 || matches!(t.as_str(), "id" | "io" | "ok"))
        .collect()
}

/// BM25-style lexical scorer over an object's searchable text
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    pub name_weight: f32,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self {
            name_weight: NAME_WEIGHT,
        }
    }
}

impl LexicalScorer {
    fn saturate(tf: f32, doc_length: f32) -> f32 {
        let numerator = tf * (K1 + 1.0);
        let denominator = tf + K1 * (1.0 - B + B * doc_length / AVG_DOC_LENGTH);
        numerator / denominator
    }
}

impl RelevanceScorer for LexicalScorer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn score(&self, query: &str, object: &MemoryObject) -> f32 {
        let mut query_terms = tokenize(query);
        query_terms.sort();
        query_terms.dedup();
        if query_terms.is_empty() {
            return 0.0;
        }

        let doc_terms = tokenize(&object.searchable_text());
        let doc_length = doc_terms.len() as f32;
        let mut term_freqs: HashMap<&str, f32> = HashMap::new();
        for term in &doc_terms {
            *term_freqs.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
        let name_terms = tokenize(object.label());

        let mut score = 0.0;
        for term in &query_terms {
            let tf = match term_freqs.get(term.as_str()) {
                Some(tf) => *tf,
                None if term.len() >= 3 => {
                    let prefixed = doc_terms.iter().filter(|d| d.starts_with(term.as_str())).count();
                    prefixed as f32 * PREFIX_CREDIT
                }
                None => 0.0,
            };
            if tf <= 0.0 {
                continue;
            }

            let mut term_score = Self::saturate(tf, doc_length);
            if name_terms.iter().any(|n| n == term) {
                term_score *= self.name_weight;
            }
            score += term_score;
        }
        score
    }
}

/// Cosine similarity over feature-hashed embeddings
pub struct SimilarityScorer {
    engine: Arc<VectorEngine>,
    /// Similarities below this count as no match
    pub min_similarity: f32,
}

impl SimilarityScorer {
    pub fn new(engine: Arc<VectorEngine>, min_similarity: f32) -> Self {
        log::debug!(
            "Similarity scorer over {}d embeddings, cutoff {}",
            engine.dimension(),
            min_similarity
        );
        Self {
            engine,
            min_similarity,
        }
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(Arc::new(VectorEngine::new()), 0.2)
    }
}

impl RelevanceScorer for SimilarityScorer {
    fn name(&self) -> &'static str {
        "similarity"
    }

    fn score(&self, query: &str, object: &MemoryObject) -> f32 {
        let text = object.searchable_text();
        let vectors = self.engine.embed_batch(&[query, text.as_str()]);
        let similarity = self.engine.similarity(&vectors[0], &vectors[1]);
        if similarity < self.min_similarity {
            0.0
        } else {
            similarity
        }
    }
}

/// Weighted sum of lexical and similarity scores
pub struct HybridScorer {
    lexical: LexicalScorer,
    similarity: SimilarityScorer,
    pub lexical_weight: f32,
    pub similarity_weight: f32,
}

impl Default for HybridScorer {
    fn default() -> Self {
        Self {
            lexical: LexicalScorer::default(),
            similarity: SimilarityScorer::default(),
            lexical_weight: 0.6,
            similarity_weight: 0.4,
        }
    }
}

impl RelevanceScorer for HybridScorer {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn score(&self, query: &str, object: &MemoryObject) -> f32 {
        let lexical = self.lexical.score(query, object);
        // Squash the unbounded lexical score into [0, 1) to match cosine range
        let lexical = lexical / (1.0 + lexical);
        let similarity = self.similarity.score(query, object);
        lexical * self.lexical_weight + similarity * self.similarity_weight
    }
}

/// A scoped, paginated query
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub text: String,
    pub scope: Scope,
    pub limit: usize,
    pub offset: usize,
    /// Restrict to these object types; empty means all
    pub types: Vec<ObjectType>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>, scope: Scope, limit: usize) -> Self {
        Self {
            text: text.into(),
            scope,
            limit,
            offset: 0,
            types: Vec::new(),
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_types(mut self, types: Vec<ObjectType>) -> Self {
        self.types = types;
        self
    }
}

/// Search result with score
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub object: MemoryObject,
    pub score: f32,
}

/// Ranked, paginated, traceable query output
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub results: Vec<SearchResult>,
    /// Fresh per invocation
    pub trace_id: Uuid,
    /// Matches before pagination
    pub total_count: usize,
    pub execution_time_ms: u64,
}

/// Query engine over a memory store
#[derive(Clone)]
pub struct QueryEngine {
    store: MemoryStore,
    scorer: Arc<dyn RelevanceScorer>,
}

impl QueryEngine {
    pub fn new(store: MemoryStore, scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { store, scorer }
    }

    pub fn with_kind(store: MemoryStore, kind: ScorerKind) -> Self {
        Self::new(store, kind.build())
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Run a query.
    ///
    /// Blank text matches every object in scope with score 0, newest first.
    /// Dropping the returned future abandons the scoring pass.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let started = Instant::now();
        let trace_id = Uuid::new_v4();
        request.scope.validate()?;

        let candidates: Vec<MemoryObject> = self
            .store
            .list_by_scope(&request.scope, None)?
            .into_iter()
            .filter(|o| request.types.is_empty() || request.types.contains(&o.object_type()))
            .collect();

        let text = request.text.trim();
        let mut matches = Vec::new();
        for (i, object) in candidates.into_iter().enumerate() {
            if i > 0 && i % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
            if text.is_empty() {
                matches.push(SearchResult { object, score: 0.0 });
                continue;
            }
            let score = self.scorer.score(text, &object);
            if score > 0.0 {
                matches.push(SearchResult { object, score });
            }
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.object.updated_at().cmp(&a.object.updated_at()))
                .then_with(|| a.object.id.cmp(&b.object.id))
        });

        let total_count = matches.len();
        let results: Vec<SearchResult> = matches
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();

        let execution_time_ms = started.elapsed().as_millis() as u64;
        log::debug!(
            "Query trace={} scope={} scorer={} matched={} returned={} in {}ms",
            trace_id,
            request.scope,
            self.scorer.name(),
            total_count,
            results.len(),
            execution_time_ms
        );

        Ok(QueryResult {
            results,
            trace_id,
            total_count,
            execution_time_ms,
        })
    }
}

/// Symbol-name or decision-title match, used for display highlighting
pub fn matched_field(object: &MemoryObject, query: &str) -> Option<&'static str> {
    let terms = tokenize(query);
    let hit = |text: &str| {
        let tokens = tokenize(text);
        terms.iter().any(|t| tokens.contains(t))
    };
    match &object.body {
        ObjectBody::Symbol(s) if hit(&s.name) => Some("name"),
        ObjectBody::Symbol(s) if hit(&s.path) => Some("path"),
        ObjectBody::Decision(d) if hit(&d.title) => Some("title"),
        ObjectBody::Decision(d) if hit(&d.problem) || hit(&d.rationale) => Some("body"),
        _ => None,
    }
}
