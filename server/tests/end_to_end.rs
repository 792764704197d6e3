//! End-to-end tests through the service facade.

use std::collections::HashSet;
use std::sync::Arc;

use codemem_memory::{
    Decision, DecisionStatus, LinkRelation, ObjectLink, ObjectType, Provenance, SymbolKind,
};
use codemem_server::api::{
    CreateObjectRequest, IndexFileRequest, ListRequest, ObjectPayload, ObjectRef, ParseRequest,
    QueryRequestDto, SymbolView, UpdateObjectRequest,
};
use codemem_server::{CodeMemoryService, ServiceConfig};
use tempfile::TempDir;

const PYTHON_FIXTURE: &str = r#"def hello_world():
    print("Hello, World!")

class TestClass:
    def method_one(self):
        pass

    def method_two(self):
        return 42

test_variable = "hello"
"#;

fn service() -> (TempDir, Arc<CodeMemoryService>) {
    let dir = TempDir::new().unwrap();
    let service = CodeMemoryService::open(ServiceConfig::new(dir.path().join("memory"))).unwrap();
    (dir, Arc::new(service))
}

fn query(text: &str, tenant: &str, project: &str) -> QueryRequestDto {
    QueryRequestDto {
        text: text.to_string(),
        limit: 10,
        offset: 0,
        tenant_id: tenant.to_string(),
        project_id: project.to_string(),
        types: Vec::new(),
    }
}

fn symbol_request(tenant: &str, project: &str, name: &str) -> CreateObjectRequest {
    CreateObjectRequest {
        tenant_id: tenant.to_string(),
        project_id: project.to_string(),
        provenance: Provenance::new("indexer", "Parsed from src/lib.rs"),
        links: Vec::new(),
        body: ObjectPayload::Symbol(SymbolView {
            name: name.to_string(),
            symbol_type: SymbolKind::Function,
            path: "src/lib.rs".to_string(),
            language: "rust".to_string(),
            start_line: 0,
            end_line: 2,
            parent: None,
            signature: None,
            documentation: None,
        }),
    }
}

fn decision_request(tenant: &str, project: &str, title: &str) -> CreateObjectRequest {
    CreateObjectRequest {
        tenant_id: tenant.to_string(),
        project_id: project.to_string(),
        provenance: Provenance::new("alice", "Architecture review"),
        links: Vec::new(),
        body: ObjectPayload::Decision(Decision::new(
            title,
            "Need a durable store",
            "Embedded and simple to operate",
            "Adopted",
        )),
    }
}

#[test]
fn test_python_fixture_symbols() {
    let (_dir, service) = service();
    let response = service
        .parse(&ParseRequest {
            file_path: "test.py".to_string(),
            content: PYTHON_FIXTURE.to_string(),
            language: "python".to_string(),
        })
        .unwrap();

    let mut kinds: Vec<&str> = response.symbols.iter().map(|s| s.symbol_type.as_str()).collect();
    kinds.sort_unstable();
    assert_eq!(kinds, vec!["class", "function", "method", "method", "variable"]);

    let methods: HashSet<&str> = response
        .symbols
        .iter()
        .filter(|s| s.symbol_type == SymbolKind::Method)
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(methods, HashSet::from(["method_one", "method_two"]));

    let line_count = PYTHON_FIXTURE.lines().count() as u32;
    for symbol in &response.symbols {
        assert!(symbol.start_line <= symbol.end_line, "{symbol:?}");
        assert!(symbol.end_line < line_count, "{symbol:?}");
    }
}

const JAVA_FIXTURE: &str = r#"package com.example.users;

import java.util.*;

// Enum definitions
enum Status {
    ACTIVE,
    INACTIVE
}

interface Repository<T> {
    Optional<T> findById(Long id);
    T save(T entity);
}

class User extends BaseEntity {
    public static final int MAX_NAME = 100;
    private String name;

    public User(String name) {
        this.name = name;
    }

    public String getName() {
        return name;
    }
}
"#;

const C_FIXTURE: &str = r#"#include <stdio.h>

// Macro definitions
#define MAX_USERS 1000

typedef enum {
    STATUS_ACTIVE,
    STATUS_INACTIVE
} Status;

typedef struct {
    long id;
    char name[100];
} User;

// Function declarations
User* user_create(const char* name);
void log_info(const char* message);

User* user_create(const char* name) {
    return NULL;
}
"#;

const CPP_FIXTURE: &str = r#"#include <string>

namespace amp {

enum class Status { Active, Inactive };

class User;

class User {
private:
    std::string name_;

public:
    User() {}
    const std::string& getName() const { return name_; }
    bool validate() const;
};

bool User::validate() const {
    return !name_.empty();
}

}
"#;

fn parsed(
    service: &CodeMemoryService,
    path: &str,
    content: &str,
) -> Vec<(String, SymbolKind, Option<String>)> {
    let response = service
        .parse(&ParseRequest {
            file_path: path.to_string(),
            content: content.to_string(),
            language: String::new(),
        })
        .unwrap();
    assert!(response.diagnostics.is_empty(), "{path}: {:?}", response.diagnostics);
    response
        .symbols
        .into_iter()
        .map(|s| (s.name, s.symbol_type, s.parent))
        .collect()
}

fn entry(
    name: &str,
    kind: SymbolKind,
    parent: Option<&str>,
) -> (String, SymbolKind, Option<String>) {
    (name.to_string(), kind, parent.map(str::to_string))
}

#[test]
fn test_java_fixture_symbols() {
    let (_dir, service) = service();
    let symbols = parsed(&service, "src/User.java", JAVA_FIXTURE);

    assert_eq!(
        symbols,
        vec![
            entry("Status", SymbolKind::Type, None),
            entry("Repository", SymbolKind::Type, None),
            entry("findById", SymbolKind::Method, Some("Repository")),
            entry("save", SymbolKind::Method, Some("Repository")),
            entry("User", SymbolKind::Class, None),
            entry("MAX_NAME", SymbolKind::Constant, Some("User")),
            entry("User", SymbolKind::Method, Some("User")),
            entry("getName", SymbolKind::Method, Some("User")),
        ]
    );
}

#[test]
fn test_c_fixture_symbols() {
    let (_dir, service) = service();
    let symbols = parsed(&service, "src/sample.c", C_FIXTURE);

    assert_eq!(
        symbols,
        vec![
            entry("MAX_USERS", SymbolKind::Constant, None),
            entry("Status", SymbolKind::Type, None),
            entry("User", SymbolKind::Class, None),
            entry("log_info", SymbolKind::Function, None),
            entry("user_create", SymbolKind::Function, None),
        ]
    );
}

#[test]
fn test_cpp_fixture_symbols() {
    let (_dir, service) = service();
    let symbols = parsed(&service, "src/sample.cpp", CPP_FIXTURE);

    // Namespaces have no symbol kind; the forward declaration is skipped
    assert_eq!(
        symbols,
        vec![
            entry("amp", SymbolKind::Unknown, None),
            entry("Status", SymbolKind::Type, None),
            entry("User", SymbolKind::Class, None),
            entry("User", SymbolKind::Method, Some("User")),
            entry("getName", SymbolKind::Method, Some("User")),
            entry("validate", SymbolKind::Method, Some("User")),
            entry("validate", SymbolKind::Method, Some("User")),
        ]
    );
}

#[tokio::test]
async fn test_query_on_empty_store() {
    let (_dir, service) = service();
    let first = service.query(query("rust functions", "acme", "web")).await.unwrap();
    let second = service.query(query("rust functions", "acme", "web")).await.unwrap();

    assert!(first.results.is_empty());
    assert_eq!(first.total_count, 0);
    assert!(!first.trace_id.is_nil());
    assert_ne!(first.trace_id, second.trace_id);
}

#[tokio::test]
async fn test_list_two_symbols_in_scope() {
    let (_dir, service) = service();
    let a = service.create(symbol_request("acme", "web", "alpha")).await.unwrap();
    let b = service.create(symbol_request("acme", "web", "beta")).await.unwrap();

    let listed = service
        .list(&ListRequest {
            tenant_id: "acme".to_string(),
            project_id: "web".to_string(),
            object_type: None,
        })
        .unwrap();
    let ids: HashSet<_> = listed.iter().map(|o| o.id).collect();
    assert_eq!(listed.len(), 2);
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&b.id));
}

#[tokio::test]
async fn test_scope_isolation() {
    let (_dir, service) = service();
    let created = service
        .create(decision_request("acme", "web", "Use RocksDB for storage"))
        .await
        .unwrap();

    let other = ObjectRef {
        id: created.id.to_string(),
        tenant_id: "acme".to_string(),
        project_id: "api".to_string(),
    };
    assert_eq!(service.get(&other).unwrap_err().code(), "not_found");

    let listed = service
        .list(&ListRequest {
            tenant_id: "globex".to_string(),
            project_id: "web".to_string(),
            object_type: None,
        })
        .unwrap();
    assert!(listed.is_empty());

    let hits = service.query(query("rocks storage", "acme", "api")).await.unwrap();
    assert_eq!(hits.total_count, 0);
    let hits = service.query(query("rocks storage", "acme", "web")).await.unwrap();
    assert_eq!(hits.total_count, 1);
}

#[tokio::test]
async fn test_concurrent_queries_have_distinct_traces() {
    let (_dir, service) = service();
    service.create(decision_request("acme", "web", "Adopt tracing")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.query(query("tracing", "acme", "web")).await.unwrap().trace_id
        }));
    }

    let mut traces = HashSet::new();
    for handle in handles {
        traces.insert(handle.await.unwrap());
    }
    assert_eq!(traces.len(), 16);
}

#[tokio::test]
async fn test_timestamps_across_updates() {
    let (_dir, service) = service();
    let created = service.create(decision_request("acme", "web", "A")).await.unwrap();

    let update = |status: DecisionStatus, agent: &str| UpdateObjectRequest {
        id: created.id.to_string(),
        tenant_id: "acme".to_string(),
        project_id: "web".to_string(),
        provenance: Provenance::new(agent, "Status change"),
        links: None,
        body: ObjectPayload::Decision(
            Decision::new("A", "Problem", "Rationale", "Outcome").with_status(status),
        ),
    };

    let first = service.update(update(DecisionStatus::Proposed, "bob")).await.unwrap();
    let second = service.update(update(DecisionStatus::Superseded, "carol")).await.unwrap();

    assert!(first.updated_at >= created.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.created_at, created.created_at);
    assert_eq!(second.history.len(), 2);
}

#[tokio::test]
async fn test_decision_defaults_to_accepted() {
    let (_dir, service) = service();
    let created = service.create(decision_request("acme", "web", "Default")).await.unwrap();
    let view = service
        .get(&ObjectRef {
            id: created.id.to_string(),
            tenant_id: "acme".to_string(),
            project_id: "web".to_string(),
        })
        .unwrap();

    match view.body {
        ObjectPayload::Decision(decision) => assert_eq!(decision.status, DecisionStatus::Accepted),
        other => panic!("expected decision, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reopen_preserves_objects() {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig::new(dir.path().join("memory"));

    let id = {
        let service = CodeMemoryService::open(config.clone()).unwrap();
        service.create(decision_request("acme", "web", "Persist me")).await.unwrap().id
    };

    let service = CodeMemoryService::open(config).unwrap();
    let view = service
        .get(&ObjectRef {
            id: id.to_string(),
            tenant_id: "acme".to_string(),
            project_id: "web".to_string(),
        })
        .unwrap();
    assert_eq!(view.id, id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_queries() {
    const WRITERS: usize = 24;
    let (_dir, service) = service();

    let mut writers = Vec::new();
    for i in 0..WRITERS {
        let service = Arc::clone(&service);
        writers.push(tokio::spawn(async move {
            service
                .create(decision_request("acme", "web", &format!("Adopt storage engine {i}")))
                .await
        }));
    }

    let mut readers = Vec::new();
    for _ in 0..4 {
        let service = Arc::clone(&service);
        readers.push(tokio::spawn(async move {
            let mut seen = 0;
            for _ in 0..25 {
                let response = service.query(query("storage", "acme", "web")).await.unwrap();
                assert!(response.total_count >= seen);
                seen = response.total_count;
            }
        }));
    }

    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    for reader in readers {
        reader.await.unwrap();
    }

    let mut request = query("storage", "acme", "web");
    request.limit = WRITERS * 2;
    let response = service.query(request).await.unwrap();
    assert_eq!(response.total_count, WRITERS);
    assert_eq!(response.results.len(), WRITERS);
}

#[tokio::test]
async fn test_decision_links_follow_reindexed_symbols() {
    let (_dir, service) = service();
    let index = |content: &str| IndexFileRequest {
        tenant_id: "acme".to_string(),
        project_id: "web".to_string(),
        file_path: "cfg.py".to_string(),
        content: Some(content.to_string()),
        language: String::new(),
    };
    let symbol_id = |name: &str| {
        service
            .list(&ListRequest {
                tenant_id: "acme".to_string(),
                project_id: "web".to_string(),
                object_type: Some(ObjectType::Symbol),
            })
            .unwrap()
            .into_iter()
            .find(|view| matches!(&view.body, ObjectPayload::Symbol(s) if s.name == name))
            .map(|view| view.id)
            .unwrap()
    };

    service
        .index_file(index("def load_config():\n    \"\"\"Read settings.\"\"\"\n"))
        .await
        .unwrap();
    let load = symbol_id("load_config");

    let mut request = decision_request("acme", "web", "Cache parsed configs");
    request.links = vec![ObjectLink::new(LinkRelation::Justifies, load)];
    let created = service.create(request).await.unwrap();
    let reference = ObjectRef {
        id: created.id.to_string(),
        tenant_id: "acme".to_string(),
        project_id: "web".to_string(),
    };
    assert_eq!(service.get(&reference).unwrap().links[0].target, load);

    let hits = service.query(query("cache configs", "acme", "web")).await.unwrap();
    let hit = hits
        .results
        .iter()
        .find(|hit| hit.object.id == created.id)
        .unwrap();
    assert_eq!(hit.object.links, vec![ObjectLink::new(LinkRelation::Justifies, load)]);

    // Editing the file supersedes the symbol; the link moves to its successor.
    service
        .index_file(index("import os\n\ndef load_config():\n    return os.environ\n"))
        .await
        .unwrap();
    let successor = symbol_id("load_config");
    assert_ne!(successor, load);
    assert_eq!(service.get(&reference).unwrap().links[0].target, successor);

    // Updates without a link set keep the stored one.
    let updated = service
        .update(UpdateObjectRequest {
            id: created.id.to_string(),
            tenant_id: "acme".to_string(),
            project_id: "web".to_string(),
            provenance: Provenance::new("bob", "Reworded"),
            links: None,
            body: ObjectPayload::Decision(Decision::new("Cache configs", "P", "R", "O")),
        })
        .await
        .unwrap();
    assert_eq!(updated.links.len(), 1);

    let mut dangling = decision_request("acme", "web", "Dangling");
    dangling.links = vec![ObjectLink::new(LinkRelation::Justifies, created.id)];
    dangling.tenant_id = "globex".to_string();
    assert_eq!(service.create(dangling).await.unwrap_err().code(), "validation");
}

#[test]
fn test_docstrings_are_extracted() {
    let (_dir, service) = service();
    let response = service
        .parse(&ParseRequest {
            file_path: "cfg.py".to_string(),
            content: "def load_config():\n    \"\"\"Read settings.\"\"\"\n    return {}\n".to_string(),
            language: "python".to_string(),
        })
        .unwrap();
    assert_eq!(response.symbols[0].documentation.as_deref(), Some("Read settings."));
}
