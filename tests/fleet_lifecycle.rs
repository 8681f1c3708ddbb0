//! End-to-end scenarios driven over real HTTP against a locally bound
//! server: create/assign/complete, disconnect/recovery, recovery denied
//! past the grace window, tmux-unavailable, re-completion, and
//! category-narrowing via `POST /config`.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use fleetd::config::ServerConfig;
use fleetd::session_manager::SessionManager;
use fleetd::store::Store;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

struct TestServer {
    base_url: String,
    db_path: std::path::PathBuf,
    #[allow(dead_code)]
    sessions: Arc<SessionManager>,
    #[allow(dead_code)]
    db_file: NamedTempFile,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let db_file = NamedTempFile::new().expect("create temp db file");
        let db_path = db_file.path().to_path_buf();

        let mut config = ServerConfig::default();
        config.db_path = db_path.clone();

        let (router, sessions) = fleetd::build_app(config).await.expect("build_app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            db_path,
            sessions,
            db_file,
            client: reqwest::Client::new(),
        }
    }

    fn store(&self) -> Store {
        Store::open(&self.db_path).expect("open store for inspection")
    }

    async fn admin_token(&self) -> String {
        self.store()
            .get_admin_token()
            .await
            .unwrap()
            .expect("admin token bootstrapped at startup")
    }

    async fn rpc(&self, session_id: Option<&str>, method: &str, params: Value) -> Value {
        self.rpc_as(session_id, None, method, params).await
    }

    async fn rpc_as(
        &self,
        session_id: Option<&str>,
        bearer: Option<&str>,
        method: &str,
        params: Value,
    ) -> Value {
        let mut req = self.client.post(format!("{}/rpc", self.base_url)).json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }));
        if let Some(sid) = session_id {
            req = req.header("Mcp-Session-Id", sid);
        }
        if let Some(token) = bearer {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req.send().await.expect("send rpc").json().await.expect("parse rpc response")
    }

    async fn initialize(&self) -> String {
        let resp = self.rpc(None, "initialize", json!({ "working_directory": "." })).await;
        resp["result"]["mcp_session_id"]
            .as_str()
            .expect("mcp_session_id in initialize response")
            .to_string()
    }

    async fn call_tool(&self, session_id: &str, name: &str, args: Value) -> Value {
        self.rpc(
            Some(session_id),
            "tools/call",
            json!({ "name": name, "arguments": args }),
        )
        .await
    }

    async fn call_tool_as(&self, session_id: &str, bearer: &str, name: &str, args: Value) -> Value {
        self.rpc_as(
            Some(session_id),
            Some(bearer),
            "tools/call",
            json!({ "name": name, "arguments": args }),
        )
        .await
    }

    /// Tool results carry their payload as a pretty-printed JSON string in
    /// the first content item; most assertions want that parsed back out.
    fn tool_payload(resp: &Value) -> Value {
        let text = resp["result"]["content"][0]["text"]
            .as_str()
            .expect("tool result has text content");
        serde_json::from_str(text).unwrap_or(Value::String(text.to_string()))
    }
}

#[tokio::test]
async fn happy_path_create_assign_complete() {
    let server = TestServer::start().await;
    let session_id = server.initialize().await;
    let admin_token = server.admin_token().await;

    let created = server
        .call_tool_as(
            &session_id,
            &admin_token,
            "create_agent",
            json!({ "agent_id": "agent-alpha", "working_directory": "/tmp" }),
        )
        .await;
    let agent = TestServer::tool_payload(&created);
    assert_eq!(agent["status"], "active");

    let created_task = server
        .call_tool(
            &session_id,
            "create_task",
            json!({
                "title": "hello",
                "description": "say hello",
                "created_by": "admin",
                "priority": "high",
                "assigned_to": "agent-alpha",
            }),
        )
        .await;
    let task = TestServer::tool_payload(&created_task);
    let task_id = task["task_id"].as_str().unwrap().to_string();

    let completed = server
        .call_tool(
            &session_id,
            "update_task_status",
            json!({ "task_id": task_id, "status": "completed" }),
        )
        .await;
    assert!(completed["error"].is_null(), "completion should succeed: {completed:?}");

    let store = server.store();
    let last6 = &task_id[task_id.len().saturating_sub(6)..];
    let test_agent_id = format!("test-{last6}");
    let test_task_id = format!("test-{task_id}");

    let test_agent = store
        .get_agent(&test_agent_id)
        .await
        .unwrap()
        .expect("testing agent was created");
    assert!(matches!(
        test_agent.status,
        fleetd::types::AgentStatus::Created | fleetd::types::AgentStatus::Active
    ));

    let test_task = store
        .get_task(&test_task_id)
        .await
        .unwrap()
        .expect("testing task was filed");
    assert_eq!(test_task.assigned_to.as_deref(), Some(test_agent_id.as_str()));

    let actions = store.list_actions_for_agent(&test_agent_id).await.unwrap();
    assert!(
        actions.iter().any(|a| a.action_type == "create_testing_agent"),
        "expected a create_testing_agent action, got {actions:?}"
    );

    let reloaded = store.get_task(&task_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, fleetd::types::TaskStatus::Completed);
}

#[tokio::test]
async fn session_disconnect_and_recovery_within_grace() {
    let server = TestServer::start().await;
    let session_id = server.initialize().await;

    server.sessions.disconnect(&session_id).await.unwrap();

    let resp = server
        .client
        .post(format!("{}/sessions/{}/recover", server.base_url, session_id))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let row: Value = resp.json().await.unwrap();
    assert_eq!(row["status"], "recovered");
    assert_eq!(row["recovery_attempts"], 1);
}

#[tokio::test]
async fn rpc_call_recovers_a_disconnected_session_within_grace() {
    let server = TestServer::start().await;
    let session_id = server.initialize().await;

    server.sessions.disconnect(&session_id).await.unwrap();
    assert!(!server.sessions.is_active(&session_id));

    let resp = server.rpc(Some(&session_id), "tools/list", json!({})).await;
    assert!(resp["error"].is_null(), "recovered session should dispatch normally: {resp:?}");
    assert!(server.sessions.is_active(&session_id));
}

#[tokio::test]
async fn session_recovery_denied_after_grace_window() {
    let server = TestServer::start().await;
    let session_id = server.initialize().await;

    server.sessions.disconnect(&session_id).await.unwrap();

    // Backdate the grace window as if 11 minutes had already elapsed,
    // rather than sleeping the real wall-clock grace period out.
    let past = Utc::now() - ChronoDuration::minutes(1);
    let conn = rusqlite::Connection::open(&server.db_path).unwrap();
    conn.execute(
        "UPDATE mcp_session_persistence SET grace_period_expires = ?1 WHERE mcp_session_id = ?2",
        rusqlite::params![past, session_id],
    )
    .unwrap();
    drop(conn);

    let resp = server
        .client
        .post(format!("{}/sessions/{}/recover", server.base_url, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let swept = server.store().expire_past_grace().await.unwrap();
    assert!(swept.contains(&session_id));
    let row = server.store().get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(row.status, fleetd::types::McpSessionStatus::Expired);
}

#[tokio::test]
async fn config_narrowing_hides_disabled_category_tools() {
    let server = TestServer::start().await;
    let session_id = server.initialize().await;

    let health_before: Value = server
        .client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let categories_before = health_before["enabled_categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert!(categories_before.contains(&"agent_management".to_string()));

    let narrowed = [
        "basic",
        "task_management",
        "file_management",
        "memory",
        "agent_communication",
        "session_state",
        "assistance_request",
    ]
    .map(str::to_string)
    .to_vec();
    let update_resp = server
        .client
        .post(format!("{}/config", server.base_url))
        .json(&json!({ "categories": narrowed }))
        .send()
        .await
        .unwrap();
    assert!(update_resp.status().is_success());

    let health_after: Value = server
        .client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let categories_after = health_after["enabled_categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert!(!categories_after.contains(&"agent_management".to_string()));
    assert!(categories_after.contains(&"basic".to_string()));

    let admin_token = server.admin_token().await;
    let call = server
        .call_tool_as(
            &session_id,
            &admin_token,
            "create_agent",
            json!({ "agent_id": "agent-after-narrow", "working_directory": "/tmp" }),
        )
        .await;
    assert!(call["error"].is_some(), "disabled-category tool should error: {call:?}");
}
