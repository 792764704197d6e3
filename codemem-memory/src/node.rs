//! Memory object types and builders
//!
//! Core types for the objects kept in the store: scoped, provenance-tracked
//! records whose body is one of a closed set of variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::temporal::TemporalMetadata;

/// Unique identifier for memory objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Create a new random ObjectId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ObjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The `(tenant_id, project_id)` pair partitioning all stored objects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub tenant_id: String,
    pub project_id: String,
}

impl Scope {
    /// Create a scope, rejecting empty tenant or project identifiers
    pub fn new(tenant_id: impl Into<String>, project_id: impl Into<String>) -> Result<Self> {
        let scope = Self {
            tenant_id: tenant_id.into(),
            project_id: project_id.into(),
        };
        scope.validate()?;
        Ok(scope)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(MemoryError::invalid_scope("tenant_id is empty"));
        }
        if self.project_id.trim().is_empty() {
            return Err(MemoryError::invalid_scope("project_id is empty"));
        }
        Ok(())
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.project_id)
    }
}

/// Who or what produced or last modified an object, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub agent: String,
    pub summary: String,
    /// Model that produced the change, when an AI agent was involved
    #[serde(default)]
    pub model: Option<String>,
    /// Tools invoked while producing the change
    #[serde(default)]
    pub tools: Option<Vec<String>>,
}

impl Provenance {
    pub fn new(agent: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            summary: summary.into(),
            model: None,
            tools: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("provenance.agent", &self.agent)?;
        require_non_empty("provenance.summary", &self.summary)
    }
}

/// A provenance entry that was superseded by a later mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub provenance: Provenance,
    pub replaced_at: DateTime<Utc>,
}

/// Closed discriminator over object variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Symbol,
    Decision,
}

impl ObjectType {
    pub const ALL: [ObjectType; 2] = [ObjectType::Symbol, ObjectType::Decision];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Symbol => "symbol",
            ObjectType::Decision => "decision",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symbol" => Ok(ObjectType::Symbol),
            "decision" => Ok(ObjectType::Decision),
            other => Err(MemoryError::validation(format!("unknown object type '{other}'"))),
        }
    }
}

/// Kind of source construct a symbol describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Type,
    Constant,
    Variable,
    /// Only for constructs the grammar genuinely cannot classify
    Unknown,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Type => "type",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed record for one source-code construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub path: String,
    pub language: String,
    /// Zero-based, inclusive
    pub start_line: u32,
    /// Zero-based, inclusive
    pub end_line: u32,
    /// Enclosing type for methods
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    /// Docstring or leading doc comment, markers stripped
    #[serde(default)]
    pub documentation: Option<String>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        path: impl Into<String>,
        language: impl Into<String>,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
            language: language.into(),
            start_line,
            end_line,
            parent: None,
            signature: None,
            documentation: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    /// Name qualified by its enclosing type, e.g. `TestClass.method_one`
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("symbol.name", &self.name)?;
        require_non_empty("symbol.path", &self.path)?;
        if self.start_line > self.end_line {
            return Err(MemoryError::validation(format!(
                "symbol '{}' has start_line {} after end_line {}",
                self.name, self.start_line, self.end_line
            )));
        }
        Ok(())
    }
}

/// Lifecycle state of a recorded decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Proposed,
    #[default]
    Accepted,
    Rejected,
    Superseded,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Proposed => "proposed",
            DecisionStatus::Accepted => "accepted",
            DecisionStatus::Rejected => "rejected",
            DecisionStatus::Superseded => "superseded",
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DecisionStatus {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proposed" => Ok(DecisionStatus::Proposed),
            "accepted" => Ok(DecisionStatus::Accepted),
            "rejected" => Ok(DecisionStatus::Rejected),
            "superseded" => Ok(DecisionStatus::Superseded),
            other => Err(MemoryError::validation(format!("unknown decision status '{other}'"))),
        }
    }
}

/// An alternative weighed while making a decision
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

/// A recorded design decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub title: String,
    pub problem: String,
    pub rationale: String,
    pub outcome: String,
    #[serde(default)]
    pub status: DecisionStatus,
    #[serde(default)]
    pub options: Vec<DecisionOption>,
}

impl Decision {
    /// Create an accepted decision
    pub fn new(
        title: impl Into<String>,
        problem: impl Into<String>,
        rationale: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            problem: problem.into(),
            rationale: rationale.into(),
            outcome: outcome.into(),
            status: DecisionStatus::default(),
            options: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: DecisionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_option(mut self, option: DecisionOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("decision.title", &self.title)?;
        require_non_empty("decision.problem", &self.problem)?;
        require_non_empty("decision.rationale", &self.rationale)?;
        require_non_empty("decision.outcome", &self.outcome)?;
        for option in &self.options {
            require_non_empty("decision.options.name", &option.name)?;
        }
        Ok(())
    }
}

/// How a linked object relates to the object holding the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRelation {
    DependsOn,
    DefinedIn,
    Calls,
    Implements,
    /// Held by a decision, pointing at what it justifies
    Justifies,
    /// Held by a symbol, pointing at the decision behind it
    JustifiedBy,
}

impl LinkRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkRelation::DependsOn => "depends_on",
            LinkRelation::DefinedIn => "defined_in",
            LinkRelation::Calls => "calls",
            LinkRelation::Implements => "implements",
            LinkRelation::Justifies => "justifies",
            LinkRelation::JustifiedBy => "justified_by",
        }
    }
}

impl std::fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed reference to another object in the same scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLink {
    #[serde(rename = "type")]
    pub relation: LinkRelation,
    pub target: ObjectId,
}

impl ObjectLink {
    pub fn new(relation: LinkRelation, target: ObjectId) -> Self {
        Self { relation, target }
    }
}

/// Variant payload of a memory object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectBody {
    Symbol(Symbol),
    Decision(Decision),
}

impl ObjectBody {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectBody::Symbol(_) => ObjectType::Symbol,
            ObjectBody::Decision(_) => ObjectType::Decision,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ObjectBody::Symbol(symbol) => symbol.validate(),
            ObjectBody::Decision(decision) => decision.validate(),
        }
    }
}

/// A scoped, provenance-tracked object in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryObject {
    /// Unique identifier, immutable once committed
    pub id: ObjectId,
    /// Tenant/project partition, immutable once committed
    pub scope: Scope,
    /// Store-assigned timestamps
    pub temporal: TemporalMetadata,
    /// Latest provenance
    pub provenance: Provenance,
    /// Provenance entries replaced by later updates, oldest first
    #[serde(default)]
    pub history: Vec<ProvenanceRecord>,
    pub body: ObjectBody,
    /// Outgoing links; targets live in the same scope
    #[serde(default)]
    pub links: Vec<ObjectLink>,
}

impl MemoryObject {
    /// Create a new builder for MemoryObject
    pub fn builder() -> MemoryObjectBuilder {
        MemoryObjectBuilder::new()
    }

    pub fn object_type(&self) -> ObjectType {
        self.body.object_type()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.temporal.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.temporal.updated_at
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &self.body {
            ObjectBody::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn as_decision(&self) -> Option<&Decision> {
        match &self.body {
            ObjectBody::Decision(decision) => Some(decision),
            _ => None,
        }
    }

    /// Targets linked from this object under `relation`
    pub fn linked(&self, relation: LinkRelation) -> impl Iterator<Item = ObjectId> + '_ {
        self.links
            .iter()
            .filter(move |link| link.relation == relation)
            .map(|link| link.target)
    }

    /// Short label: symbol name or decision title
    pub fn label(&self) -> &str {
        match &self.body {
            ObjectBody::Symbol(symbol) => &symbol.name,
            ObjectBody::Decision(decision) => &decision.title,
        }
    }

    /// Get the searchable text for this object
    pub fn searchable_text(&self) -> String {
        match &self.body {
            ObjectBody::Symbol(s) => {
                let mut text = format!("{} {} {} {}", s.name, s.kind, s.language, s.path);
                if let Some(parent) = &s.parent {
                    text.push(' ');
                    text.push_str(parent);
                }
                for extra in [&s.signature, &s.documentation].into_iter().flatten() {
                    text.push(' ');
                    text.push_str(extra);
                }
                text
            }
            ObjectBody::Decision(d) => {
                let mut text = format!("{} {} {} {}", d.title, d.problem, d.rationale, d.outcome);
                for option in &d.options {
                    text.push(' ');
                    text.push_str(&option.name);
                    text.push(' ');
                    text.push_str(&option.description);
                }
                text
            }
        }
    }

    /// Replace the provenance, archiving the previous one
    pub fn supersede_provenance(&mut self, provenance: Provenance, at: DateTime<Utc>) {
        let previous = std::mem::replace(&mut self.provenance, provenance);
        self.history.push(ProvenanceRecord {
            provenance: previous,
            replaced_at: at,
        });
    }

    /// Check every field-level invariant
    pub fn validate(&self) -> Result<()> {
        self.scope.validate()?;
        self.provenance.validate()?;
        self.body.validate()?;
        self.validate_links()?;
        if !self.temporal.is_consistent() {
            return Err(MemoryError::validation("updated_at precedes created_at"));
        }
        Ok(())
    }

    /// Links may not point back at the object or repeat.
    pub fn validate_links(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for link in &self.links {
            if link.target == self.id {
                return Err(MemoryError::validation(format!(
                    "object {} links to itself",
                    self.id
                )));
            }
            if !seen.insert(*link) {
                return Err(MemoryError::validation(format!(
                    "duplicate {} link to {}",
                    link.relation, link.target
                )));
            }
        }
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(MemoryError::validation(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

/// Builder for MemoryObject with fluent API
#[derive(Debug, Default)]
pub struct MemoryObjectBuilder {
    id: Option<ObjectId>,
    scope: Option<Scope>,
    provenance: Option<Provenance>,
    body: Option<ObjectBody>,
    links: Vec<ObjectLink>,
}

impl MemoryObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object ID (auto-generated if not set)
    pub fn id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set provenance from agent and summary
    pub fn provenance(mut self, agent: impl Into<String>, summary: impl Into<String>) -> Self {
        self.provenance = Some(Provenance::new(agent, summary));
        self
    }

    pub fn provenance_record(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.body = Some(ObjectBody::Symbol(symbol));
        self
    }

    pub fn decision(mut self, decision: Decision) -> Self {
        self.body = Some(ObjectBody::Decision(decision));
        self
    }

    pub fn body(mut self, body: ObjectBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn link(mut self, relation: LinkRelation, target: ObjectId) -> Self {
        self.links.push(ObjectLink::new(relation, target));
        self
    }

    pub fn links(mut self, links: Vec<ObjectLink>) -> Self {
        self.links = links;
        self
    }

    /// Build the MemoryObject.
    ///
    /// Timestamps are provisional; the store overwrites them on commit.
    pub fn build(self) -> std::result::Result<MemoryObject, ObjectBuilderError> {
        let scope = self.scope.ok_or(ObjectBuilderError::MissingScope)?;
        let provenance = self.provenance.ok_or(ObjectBuilderError::MissingProvenance)?;
        let body = self.body.ok_or(ObjectBuilderError::MissingBody)?;

        let object = MemoryObject {
            id: self.id.unwrap_or_default(),
            scope,
            temporal: TemporalMetadata::now(),
            provenance,
            history: Vec::new(),
            body,
            links: self.links,
        };
        object
            .validate()
            .map_err(|e| ObjectBuilderError::Invalid(e.to_string()))?;
        Ok(object)
    }
}

/// Errors that can occur when building a MemoryObject
#[derive(Debug, thiserror::Error)]
pub enum ObjectBuilderError {
    #[error("Missing required field: scope")]
    MissingScope,
    #[error("Missing required field: provenance")]
    MissingProvenance,
    #[error("Missing required field: body")]
    MissingBody,
    #[error("Invalid object: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        Scope::new("acme", "web").unwrap()
    }

    #[test]
    fn test_object_id_generation() {
        let id1 = ObjectId::new();
        let id2 = ObjectId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_object_id_parse() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_scope_rejects_empty() {
        assert!(matches!(Scope::new("", "p"), Err(MemoryError::InvalidScope(_))));
        assert!(matches!(Scope::new("t", "  "), Err(MemoryError::InvalidScope(_))));
        assert_eq!(scope().to_string(), "acme/web");
    }

    #[test]
    fn test_decision_defaults_to_accepted() {
        let decision = Decision::new("Use RocksDB", "Need durability", "Embedded", "Adopted");
        assert_eq!(decision.status, DecisionStatus::Accepted);

        let parsed: Decision = serde_json::from_str(
            r#"{"title":"t","problem":"p","rationale":"r","outcome":"o"}"#,
        )
        .unwrap();
        assert_eq!(parsed.status, DecisionStatus::Accepted);
        assert!(parsed.options.is_empty());
    }

    #[test]
    fn test_builder_symbol() {
        let object = MemoryObject::builder()
            .scope(scope())
            .provenance("parser", "Parsed from app.py")
            .symbol(
                Symbol::new("method_one", SymbolKind::Method, "app.py", "python", 3, 4)
                    .with_parent("TestClass"),
            )
            .build()
            .unwrap();

        assert_eq!(object.object_type(), ObjectType::Symbol);
        assert_eq!(object.label(), "method_one");
        assert_eq!(
            object.as_symbol().map(|s| s.qualified_name()),
            Some("TestClass.method_one".to_string())
        );
        assert!(object.searchable_text().contains("TestClass"));
    }

    #[test]
    fn test_builder_missing_fields() {
        let err = MemoryObject::builder().provenance("a", "b").build().unwrap_err();
        assert!(matches!(err, ObjectBuilderError::MissingScope));

        let err = MemoryObject::builder().scope(scope()).build().unwrap_err();
        assert!(matches!(err, ObjectBuilderError::MissingProvenance));
    }

    #[test]
    fn test_builder_rejects_empty_provenance() {
        let err = MemoryObject::builder()
            .scope(scope())
            .provenance("", "summary")
            .decision(Decision::new("t", "p", "r", "o"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ObjectBuilderError::Invalid(_)));
    }

    #[test]
    fn test_symbol_span_validation() {
        let symbol = Symbol::new("f", SymbolKind::Function, "a.py", "python", 5, 2);
        assert!(matches!(symbol.validate(), Err(MemoryError::Validation(_))));
    }

    #[test]
    fn test_supersede_provenance_keeps_history() {
        let mut object = MemoryObject::builder()
            .scope(scope())
            .provenance("alice", "created")
            .decision(Decision::new("t", "p", "r", "o"))
            .build()
            .unwrap();

        let now = Utc::now();
        object.supersede_provenance(Provenance::new("bob", "revised"), now);

        assert_eq!(object.provenance.agent, "bob");
        assert_eq!(object.history.len(), 1);
        assert_eq!(object.history[0].provenance.agent, "alice");
        assert_eq!(object.history[0].replaced_at, now);
    }

    #[test]
    fn test_bincode_roundtrip_preserves_variant() {
        let object = MemoryObject::builder()
            .scope(scope())
            .provenance_record(Provenance::new("agent", "why").with_model("m").with_tools(vec!["grep".into()]))
            .decision(Decision::new("t", "p", "r", "o").with_status(DecisionStatus::Proposed))
            .build()
            .unwrap();

        let bytes = bincode::serialize(&object).unwrap();
        let back: MemoryObject = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, object);
    }

    #[test]
    fn test_status_and_type_parse() {
        assert_eq!("Superseded".parse::<DecisionStatus>().unwrap(), DecisionStatus::Superseded);
        assert_eq!("decision".parse::<ObjectType>().unwrap(), ObjectType::Decision);
        assert!("widget".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_links_reject_self_and_duplicates() {
        let id = ObjectId::new();
        let target = ObjectId::new();
        let build = |links: Vec<ObjectLink>| {
            MemoryObject::builder()
                .id(id)
                .scope(scope())
                .provenance("alice", "review")
                .decision(Decision::new("t", "p", "r", "o"))
                .links(links)
                .build()
        };

        let object = build(vec![ObjectLink::new(LinkRelation::Justifies, target)]).unwrap();
        assert_eq!(object.linked(LinkRelation::Justifies).collect::<Vec<_>>(), vec![target]);
        assert_eq!(object.linked(LinkRelation::Calls).count(), 0);

        let to_self = build(vec![ObjectLink::new(LinkRelation::DependsOn, id)]);
        assert!(matches!(to_self, Err(ObjectBuilderError::Invalid(_))));

        let twice = build(vec![
            ObjectLink::new(LinkRelation::Justifies, target),
            ObjectLink::new(LinkRelation::Justifies, target),
        ]);
        assert!(matches!(twice, Err(ObjectBuilderError::Invalid(_))));
    }

    #[test]
    fn test_documentation_is_searchable() {
        let symbol = Symbol::new("load", SymbolKind::Function, "cfg.py", "python", 0, 3)
            .with_documentation("Read settings from disk.");
        let object = MemoryObject::builder()
            .scope(scope())
            .provenance("parser", "Parsed from cfg.py")
            .symbol(symbol)
            .link(LinkRelation::DefinedIn, ObjectId::new())
            .build()
            .unwrap();
        assert!(object.searchable_text().contains("Read settings from disk."));

        let json = serde_json::to_value(&object.links[0]).unwrap();
        assert_eq!(json["type"], "defined_in");

        let bytes = bincode::serialize(&object).unwrap();
        let back: MemoryObject = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, object);
    }
}
