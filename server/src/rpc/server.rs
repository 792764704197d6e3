//! JSON-RPC server loop and method dispatch.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};

use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::transport::{Incoming, LineTransport};
use crate::api::{
    CreateObjectRequest, IndexFileRequest, ListRequest, ObjectRef, ParseRequest, QueryRequestDto,
    StatsRequest, UpdateObjectRequest,
};
use crate::error::{ServerError, ServerResult};
use crate::service::CodeMemoryService;

/// Serves one client connection over a [`LineTransport`].
pub struct RpcServer {
    service: Arc<CodeMemoryService>,
}

impl RpcServer {
    pub fn new(service: Arc<CodeMemoryService>) -> Self {
        Self { service }
    }

    /// Process messages until the peer closes its end.
    pub async fn run<R, W>(&self, mut transport: LineTransport<R, W>) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("JSON-RPC server starting...");

        while let Some(incoming) = transport.read_message().await? {
            let response = match incoming {
                Incoming::Message(value) => self.handle(value).await,
                Incoming::Malformed(e) => Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                )),
            };
            if let Some(response) = response {
                transport.write_response(&response).await?;
            }
        }

        tracing::info!("Client disconnected");
        Ok(())
    }

    /// Handle one decoded message. Notifications yield `None`.
    pub async fn handle(&self, message: Value) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ))
            }
        };
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }

        tracing::debug!("Handling request: {}", request.method);
        let notification = request.is_notification();
        let outcome = self.dispatch(&request.method, request.params).await;

        if notification {
            if let Err(e) = outcome {
                tracing::warn!("Notification {} failed: {}", request.method, e.message);
            }
            return None;
        }
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let service = &self.service;
        let result = match method {
            "parse" => to_value(service.parse(&self::params::<ParseRequest>(params)?)),
            "objects.create" => {
                to_value(service.create(self::params::<CreateObjectRequest>(params)?).await)
            }
            "objects.get" => to_value(service.get(&self::params::<ObjectRef>(params)?)),
            "objects.update" => {
                to_value(service.update(self::params::<UpdateObjectRequest>(params)?).await)
            }
            "objects.delete" => service
                .delete(&self::params::<ObjectRef>(params)?)
                .await
                .map(|()| serde_json::json!({ "deleted": true })),
            "objects.list" => to_value(service.list(&self::params::<ListRequest>(params)?)),
            "query" => to_value(service.query(self::params::<QueryRequestDto>(params)?).await),
            "index.file" => to_value(service.index_file(self::params::<IndexFileRequest>(params)?).await),
            "stats" => {
                let request = match params {
                    Some(Value::Null) | None => StatsRequest::default(),
                    Some(value) => decode(value)?,
                };
                service.stats(&request)
            }
            "languages" => Ok(serde_json::json!({
                "languages": service.indexer().extractor().registry().supported_languages(),
            })),
            _ => return Err(JsonRpcError::method_not_found(method)),
        };

        result.map_err(|e| {
            tracing::debug!("{} failed: {}", method, e);
            JsonRpcError::from(e)
        })
    }
}

fn params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    match params {
        Some(value) => decode(value),
        None => Err(JsonRpcError::invalid_params("Missing params")),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_value<T: serde::Serialize>(result: ServerResult<T>) -> ServerResult<Value> {
    result.and_then(|value| serde_json::to_value(value).map_err(ServerError::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn server() -> (TempDir, RpcServer) {
        let dir = TempDir::new().unwrap();
        let service = CodeMemoryService::open(ServiceConfig::new(dir.path().join("memory"))).unwrap();
        (dir, RpcServer::new(Arc::new(service)))
    }

    async fn call(server: &RpcServer, method: &str, params: Value) -> JsonRpcResponse {
        let request = serde_json::to_value(JsonRpcRequest::new(1, method, params)).unwrap();
        server.handle(request).await.unwrap()
    }

    fn decision(title: &str) -> Value {
        json!({
            "tenant_id": "acme",
            "project_id": "web",
            "provenance": {"agent": "alice", "summary": "Architecture review"},
            "type": "decision",
            "title": title,
            "problem": "Need durable storage",
            "rationale": "Embedded",
            "outcome": "Adopted"
        })
    }

    #[tokio::test]
    async fn test_parse_method() {
        let (_dir, server) = server();
        let response = call(
            &server,
            "parse",
            json!({"file_path": "a.py", "content": "def f():\n    pass\n", "language": "python"}),
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["symbols"][0]["name"], "f");
        assert_eq!(result["symbols"][0]["symbol_type"], "function");
    }

    #[tokio::test]
    async fn test_unsupported_language_is_invalid_params() {
        let (_dir, server) = server();
        let response = call(
            &server,
            "parse",
            json!({"file_path": "a.cob", "content": "x", "language": "cobol"}),
        )
        .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.data.unwrap()["kind"], "unsupported_language");
    }

    #[tokio::test]
    async fn test_object_lifecycle() {
        let (_dir, server) = server();
        let created = call(&server, "objects.create", decision("Use RocksDB")).await;
        let id = created.result.unwrap()["id"].as_str().unwrap().to_string();
        let reference = json!({"id": id, "tenant_id": "acme", "project_id": "web"});

        let fetched = call(&server, "objects.get", reference.clone()).await;
        assert_eq!(fetched.result.unwrap()["status"], "accepted");

        let deleted = call(&server, "objects.delete", reference.clone()).await;
        assert_eq!(deleted.result.unwrap()["deleted"], true);

        let missing = call(&server, "objects.get", reference).await;
        assert_eq!(missing.error.unwrap().data.unwrap()["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_query_method() {
        let (_dir, server) = server();
        call(&server, "objects.create", decision("Use RocksDB")).await;
        let response = call(
            &server,
            "query",
            json!({"text": "rocks", "tenant_id": "acme", "project_id": "web"}),
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["total_count"], 1);
        assert!(result["trace_id"].is_string());
    }

    #[tokio::test]
    async fn test_stats_without_params() {
        let (_dir, server) = server();
        let request = json!({"jsonrpc": "2.0", "id": 3, "method": "stats"});
        let response = server.handle(request).await.unwrap();
        assert_eq!(response.result.unwrap()["totalObjects"], 0);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (_dir, server) = server();

        let unknown = call(&server, "objects.explode", json!({})).await;
        assert_eq!(unknown.error.unwrap().code, -32601);

        let bad_params = call(&server, "objects.get", json!({"id": 5})).await;
        assert_eq!(bad_params.error.unwrap().code, -32602);

        let not_request = server.handle(json!({"hello": "world"})).await.unwrap();
        let encoded = serde_json::to_value(&not_request).unwrap();
        assert!(encoded.get("id").is_some() && encoded["id"].is_null());
        assert_eq!(not_request.error.unwrap().code, -32600);

        let wrong_version = server
            .handle(json!({"jsonrpc": "1.0", "id": 1, "method": "stats"}))
            .await
            .unwrap();
        assert_eq!(wrong_version.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let (_dir, server) = server();
        let notification = json!({"jsonrpc": "2.0", "method": "objects.create", "params": decision("A")});
        assert!(server.handle(notification).await.is_none());
        assert_eq!(server.service.store().len(), 1);
    }

    #[tokio::test]
    async fn test_run_over_line_transport() {
        let (_dir, server) = server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"languages"}"#,
            "\n",
            "garbage\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"stats","params":{}}"#,
            "\n"
        );
        let mut output = Vec::new();
        server
            .run(LineTransport::new(input.as_bytes(), &mut output))
            .await
            .unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0]["result"]["languages"]
            .as_array()
            .unwrap()
            .contains(&json!("python")));
        assert_eq!(lines[1]["error"]["code"], -32700);
        assert!(lines[1].get("id").is_some() && lines[1]["id"].is_null());
        assert_eq!(lines[2]["id"], 2);
    }
}
