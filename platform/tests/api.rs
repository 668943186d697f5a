//! HTTP API tests
//!
//! Each test serves the router on an ephemeral port with an in-memory
//! database and an echo model client bound to the `ollama` backend.

#![cfg(feature = "web")]

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use agentic_platform::config::LlmSettings;
use agentic_platform::db::Database;
use agentic_platform::llm::{BackendKind, ModelBackends, ModelClient, ModelResponse};
use agentic_platform::mcp::ToolRegistry;
use agentic_platform::orchestrator::WorkflowExecutor;
use agentic_platform::prompts::PromptStore;
use agentic_platform::web::{create_router, AppState};

struct Echo;

#[async_trait]
impl ModelClient for Echo {
    async fn complete(&self, model: &str, prompt: &str) -> anyhow::Result<ModelResponse> {
        Ok(ModelResponse {
            content: format!("{}: {}", model, prompt),
            model: model.to_string(),
            backend: BackendKind::Ollama,
            usage: None,
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    token: Option<&'static str>,
}

impl TestServer {
    async fn start(token: Option<&'static str>) -> Self {
        Self::start_with_store(token, PromptStore::new()).await
    }

    async fn start_with_store(token: Option<&'static str>, prompts: PromptStore) -> Self {
        let db = Database::open_in_memory().unwrap();
        let settings = LlmSettings {
            ollama_host: None,
            ..LlmSettings::default()
        };
        let backends = Arc::new(ModelBackends::new(settings).with_client(Arc::new(Echo)));
        let executor = WorkflowExecutor::new(backends).with_store(Arc::new(db.clone()));
        let state = AppState::new(
            db,
            prompts,
            Arc::new(ToolRegistry::new()),
            executor,
            token.map(String::from),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}/api", addr),
            client: reqwest::Client::new(),
            token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base, path));
        match self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        send(self.request(reqwest::Method::GET, path)).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        send(self.request(reqwest::Method::POST, path).json(&body)).await
    }

    async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        send(self.request(reqwest::Method::PATCH, path).json(&body)).await
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.request(reqwest::Method::DELETE, path)
            .send()
            .await
            .unwrap()
            .status()
    }
}

async fn send(builder: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let response = builder.send().await.unwrap();
    let status = response.status();
    let text = response.text().await.unwrap();
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, body)
}

#[tokio::test]
async fn test_health_is_public_and_reports_services() {
    let server = TestServer::start(Some("secret")).await;

    let response = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
    assert_eq!(body["backends"], json!(["ollama"]));
    assert_eq!(body["prompts"], 0);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = TestServer::start(Some("secret")).await;

    let missing = server
        .client
        .get(format!("{}/agents", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = server
        .client
        .get(format!("{}/agents", server.base))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = server.get("/agents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_agent_crud() {
    let server = TestServer::start(None).await;

    let (status, agent) = server
        .post(
            "/agents",
            json!({
                "name": "writer",
                "config": {"llm_type": "ollama", "model_name": "llama3"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(agent["status"], "inactive");
    let id = agent["id"].as_str().unwrap().to_string();

    let (status, fetched) = server.get(&format!("/agents/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "writer");

    let (status, updated) = server
        .patch(&format!("/agents/{}", id), json!({"description": "drafts"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "drafts");
    assert_eq!(updated["name"], "writer");

    let (_, list) = server.get("/agents").await;
    assert_eq!(list["total"], 1);

    assert_eq!(server.delete(&format!("/agents/{}", id)).await, StatusCode::NO_CONTENT);
    assert_eq!(server.delete(&format!("/agents/{}", id)).await, StatusCode::NOT_FOUND);

    let (status, body) = server.get(&format!("/agents/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn test_agent_validation() {
    let server = TestServer::start(None).await;

    let (status, _) = server.post("/agents", json!({"name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/agents", json!({"name": "x", "config": [1, 2]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_team_crud() {
    let server = TestServer::start(None).await;

    let (status, team) = server
        .post(
            "/teams",
            json!({
                "name": "research",
                "members": ["agent_1", "agent_2"],
                "orchestration_rules": {"mode": "sequential"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(team["members"], json!(["agent_1", "agent_2"]));
    assert!(team["workflow_status"].is_null());
    let id = team["id"].as_str().unwrap().to_string();

    let (status, updated) = server
        .patch(
            &format!("/teams/{}", id),
            json!({
                "workflow_status": "completed",
                "last_workflow_execution": "2026-01-02T03:04:05Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["workflow_status"], "completed");
    assert_eq!(updated["name"], "research");
    assert_eq!(updated["members"], json!(["agent_1", "agent_2"]));
    assert_eq!(updated["orchestration_rules"]["mode"], "sequential");
    assert!(updated["last_workflow_execution"]
        .as_str()
        .unwrap()
        .starts_with("2026-01-02T03:04:05"));

    let (status, fetched) = server.get(&format!("/teams/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["workflow_status"], "completed");

    let (_, list) = server.get("/teams?limit=10").await;
    assert_eq!(list["total"], 1);

    assert_eq!(server.delete(&format!("/teams/{}", id)).await, StatusCode::NO_CONTENT);
    assert_eq!(server.delete(&format!("/teams/{}", id)).await, StatusCode::NOT_FOUND);

    let (status, _) = server
        .patch(&format!("/teams/{}", id), json!({"name": "gone"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_team_validation() {
    let server = TestServer::start(None).await;

    let (status, _) = server.post("/teams", json!({"name": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/teams", json!({"name": "x", "orchestration_rules": "fast"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, team) = server.post("/teams", json!({"name": "x"})).await;
    let (status, _) = server
        .patch(&format!("/teams/{}", team["id"].as_str().unwrap()), json!({"name": " "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_prompt_versioning_over_http() {
    let server = TestServer::start(None).await;

    let (status, prompt) = server
        .post(
            "/prompts",
            json!({"body": "Summarize {text}", "version": "1.0", "tags": ["summary"]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = prompt["id"].as_str().unwrap().to_string();

    let (status, updated) = server
        .patch(
            &format!("/prompts/{}", id),
            json!({"body": "Summarize briefly {text}", "version": "1.1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], "1.1");

    let (status, versions) = server.get(&format!("/prompts/{}/versions", id)).await;
    assert_eq!(status, StatusCode::OK);
    let versions = versions.as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["version"], "1.0");
    assert_eq!(versions[1]["version"], "1.1");

    let (status, rolled) = server
        .post(&format!("/prompts/{}/rollback", id), json!({"version": "1.0"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rolled["body"], "Summarize {text}");
    assert_eq!(rolled["id"], id.as_str());
    let last = rolled["audit_log"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["action"], "rollback");
    assert_eq!(last["original_version"], "1.1");

    let (status, _) = server
        .post(&format!("/prompts/{}/rollback", id), json!({"version": "9.9"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get("/prompts/missing/versions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.post("/prompts", json!({"body": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_prompt_search() {
    let server = TestServer::start(None).await;

    server
        .post("/prompts", json!({"body": "Translate to French", "tags": ["i18n"]}))
        .await;
    server
        .post("/prompts", json!({"body": "Review this diff", "tags": ["code"]}))
        .await;

    let (_, by_tag) = server.get("/prompts?tags=code,unused").await;
    assert_eq!(by_tag["total"], 1);
    assert_eq!(by_tag["prompts"][0]["body"], "Review this diff");

    let (_, by_text) = server.get("/prompts?q=french").await;
    assert_eq!(by_text["total"], 1);

    let (_, all) = server.get("/prompts").await;
    assert_eq!(all["total"], 2);
}

#[tokio::test]
async fn test_prompt_backup_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let server =
        TestServer::start_with_store(None, PromptStore::new().with_backup_dir(dir.path())).await;

    let (_, prompt) = server
        .post("/prompts", json!({"body": "Keep me", "version": "2.0"}))
        .await;
    let id = prompt["id"].as_str().unwrap().to_string();

    let (status, backup) = server.post("/prompts/backup", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let path = backup["path"].as_str().unwrap().to_string();
    assert!(path.starts_with(dir.path().to_str().unwrap()));

    assert_eq!(server.delete(&format!("/prompts/{}", id)).await, StatusCode::NO_CONTENT);

    let (status, restored) = server.post("/prompts/restore", json!({"path": path})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["restored"], 1);

    let (status, back) = server.get(&format!("/prompts/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(back["version"], "2.0");

    let missing = dir.path().join("nope.json");
    let (status, _) = server
        .post("/prompts/restore", json!({"path": missing}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_workflow_with_inline_agents() {
    let server = TestServer::start(None).await;

    let (status, result) = server
        .post(
            "/workflows/run",
            json!({
                "prompt": "hello",
                "agents": [
                    {"id": "local", "config": {"llm_type": "ollama", "model_name": "tiny"}},
                    {"id": "cloud", "config": {"llm_type": "openai", "model_name": "gpt-4o"}},
                    {"id": "odd", "config": {"llm_type": "gemini"}}
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "success");

    let results = &result["results"];
    assert_eq!(results["local"]["response"]["content"], "tiny: hello");
    assert_eq!(results["cloud"]["kind"], "backend_unavailable");
    assert_eq!(results["odd"]["kind"], "unsupported_backend");

    let (_, metrics) = server.get("/metrics").await;
    assert_eq!(metrics["performance"]["total_executions"], 3);
}

#[tokio::test]
async fn test_workflow_with_stored_agent_and_prompt() {
    let server = TestServer::start(None).await;

    let (_, agent) = server
        .post(
            "/agents",
            json!({"name": "stored", "config": {"llm_type": "ollama", "model_name": "m"}}),
        )
        .await;
    let agent_id = agent["id"].as_str().unwrap().to_string();

    let (_, prompt) = server
        .post("/prompts", json!({"body": "first", "version": "1"}))
        .await;
    let prompt_id = prompt["id"].as_str().unwrap().to_string();
    server
        .patch(
            &format!("/prompts/{}", prompt_id),
            json!({"body": "second", "version": "2"}),
        )
        .await;

    let (status, result) = server
        .post(
            "/workflows/run",
            json!({"agent_ids": [agent_id], "prompt_id": prompt_id, "prompt_version": "1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["results"][&agent_id]["response"]["content"], "m: first");

    let (_, stored) = server.get(&format!("/agents/{}", agent_id)).await;
    assert_eq!(stored["status"], "active");
    assert!(stored["last_executed"].is_string());

    let (status, _) = server
        .post(
            "/workflows/run",
            json!({"agent_ids": ["missing"], "prompt": "x"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post("/workflows/run", json!({"agents": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[cfg(feature = "mcp")]
#[tokio::test]
async fn test_mcp_connection_lifecycle() {
    let server = TestServer::start(None).await;

    let (status, registered) = server
        .post(
            "/mcp/connections",
            json!({"name": "files", "uri": "definitely-not-a-real-mcp-server-binary"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["connected"], false);

    let (status, _) = server
        .post(
            "/mcp/connections",
            json!({"name": "", "uri": "x"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = server.get("/mcp/connections").await;
    let connections = list["connections"].as_array().unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0]["server_name"], "files");
    assert_eq!(connections[0]["transport"], "stdio");

    let (status, connect) = server
        .post("/mcp/connections/files/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(connect["connected"], false);

    let (status, _) = server
        .post("/mcp/connections/ghost/connect", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, tools) = server.get("/mcp/tools").await;
    assert!(tools["tools"].as_array().unwrap().is_empty());

    let (status, outcome) = server
        .post("/mcp/tools/read_file/execute", json!({"arguments": {"path": "/tmp"}}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(outcome["error"].is_string());

    assert_eq!(server.delete("/mcp/connections/files").await, StatusCode::NO_CONTENT);
    assert_eq!(server.delete("/mcp/connections/files").await, StatusCode::NOT_FOUND);
}
