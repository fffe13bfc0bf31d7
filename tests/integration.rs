//! Integration tests for the devtools MCP tools
//!
//! These drive the tools through their registry contract (JSON arguments in,
//! JSON text out), the same surface the MCP transport uses.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use devtools::config::EnvConfig;
use devtools::registry::{Registry, Tool, ToolInvocation};
use devtools::tools::{self, collab::CollabTool, skim::CodeSkimTool};

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test arguments must be a JSON object"),
    }
}

fn invocation_with_collab_dir(dir: &tempfile::TempDir) -> ToolInvocation {
    let config = EnvConfig {
        collab_dir: dir.path().to_path_buf(),
        ..EnvConfig::default()
    };
    ToolInvocation::standalone(Arc::new(config))
}

async fn call(tool: &dyn Tool, inv: &ToolInvocation, payload: Value) -> Value {
    let text = tool
        .execute(inv, args(payload))
        .await
        .unwrap_or_else(|e| panic!("tool call failed: {e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("tool returned non-JSON: {e}"))
}

#[tokio::test]
async fn test_code_skim_single_python_file() {
    // S1: strip a function and a method, keep the signatures.
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.py");
    std::fs::write(
        &file,
        "def foo(x):\n    return x + 1\n\nclass C:\n    def bar(self):\n        foo(1)\n",
    )
    .unwrap();

    let inv = ToolInvocation::standalone(Arc::new(EnvConfig::default()));
    let response = call(
        &CodeSkimTool,
        &inv,
        json!({"source": [file.display().to_string()]}),
    )
    .await;

    assert_eq!(response["total_files"], 1);
    assert_eq!(response["success_count"], 1);
    let result = &response["files"][0];
    assert_eq!(result["language"], "python");
    let content = result["content"].as_str().unwrap();
    assert!(content.contains("def foo(x):"));
    assert!(content.contains(" { /* ... */ }"));
    assert!(!content.contains("return x + 1"));
    assert_eq!(result["total_items"], 2);
    assert_eq!(result["matched_items"], 2);
    assert_eq!(result["filtered_items"], 0);
}

#[tokio::test]
async fn test_code_skim_filter_short_circuit() {
    // S6: ["!b", "*"] keeps a and c, removes b entirely.
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("f.py");
    std::fs::write(
        &file,
        "def a():\n    pass\n\ndef b():\n    pass\n\ndef c():\n    pass\n",
    )
    .unwrap();

    let inv = ToolInvocation::standalone(Arc::new(EnvConfig::default()));
    let response = call(
        &CodeSkimTool,
        &inv,
        json!({"source": [file.display().to_string()], "filter": ["!b", "*"]}),
    )
    .await;

    let result = &response["files"][0];
    assert_eq!(result["matched_items"], 2);
    assert_eq!(result["total_items"], 3);
    assert_eq!(result["filtered_items"], 1);
    let content = result["content"].as_str().unwrap();
    assert!(content.contains("def a():"));
    assert!(!content.contains("def b():"));
    assert!(content.contains("def c():"));
}

#[tokio::test]
async fn test_code_skim_batch_partial_failure() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("ok.py");
    std::fs::write(&good, "def f():\n    pass\n").unwrap();
    let missing = dir.path().join("gone.py");

    let inv = ToolInvocation::standalone(Arc::new(EnvConfig::default()));
    let response = call(
        &CodeSkimTool,
        &inv,
        json!({"source": [
            good.display().to_string(),
            missing.display().to_string(),
        ]}),
    )
    .await;

    assert_eq!(response["total_files"], 2);
    assert_eq!(response["success_count"], 1);
    assert_eq!(response["failure_count"], 1);
    assert!(response["files"][0]["error"].is_null());
    assert!(response["files"][1]["error"].is_string());
}

#[tokio::test]
async fn test_collab_end_to_end() {
    // S2 through the tool surface.
    let dir = tempfile::tempdir().unwrap();
    let inv = invocation_with_collab_dir(&dir);
    let mailbox = Arc::new(devtools::collab::Mailbox::new(dir.path().to_path_buf()));
    let tool = CollabTool::new(mailbox);

    // (a) create
    let created = call(
        &tool,
        &inv,
        json!({"function": "create_session", "topic": "Add streaming", "name": "alpha"}),
    )
    .await;
    let session_id = created["session"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["session"]["status"], "active");

    // (b) join
    let joined = call(
        &tool,
        &inv,
        json!({"function": "join_session", "session_id": session_id, "name": "beta"}),
    )
    .await;
    assert_eq!(joined["session"]["message_count"], 0);
    assert!(joined["session"]["participants"]["alpha"].is_object());
    assert!(joined["session"]["participants"]["beta"].is_object());

    // (c) post
    let posted = call(
        &tool,
        &inv,
        json!({
            "function": "post_message",
            "session_id": session_id,
            "name": "beta",
            "content": "hi",
            "message_type": "question",
        }),
    )
    .await;
    assert_eq!(posted["message"]["id"], 1);

    // (d) check from alpha sees it once
    let checked = call(
        &tool,
        &inv,
        json!({"function": "check_messages", "session_id": session_id, "name": "alpha"}),
    )
    .await;
    assert_eq!(checked["has_new"], true);
    assert_eq!(checked["new_messages"][0]["id"], 1);
    assert_eq!(checked["new_messages"][0]["content"], "hi");

    let again = call(
        &tool,
        &inv,
        json!({"function": "check_messages", "session_id": session_id, "name": "alpha"}),
    )
    .await;
    assert_eq!(again["has_new"], false);

    // (e) close; post now fails
    let closed = call(
        &tool,
        &inv,
        json!({"function": "close_session", "session_id": session_id, "summary": "done"}),
    )
    .await;
    assert_eq!(closed["session"]["status"], "closed");

    let late = tool
        .execute(
            &inv,
            args(json!({
                "function": "post_message",
                "session_id": session_id,
                "name": "beta",
                "content": "late",
            })),
        )
        .await;
    assert!(late.is_err(), "posting to a closed session must fail");
}

#[tokio::test]
async fn test_collab_auto_detects_participant_from_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let mut inv = invocation_with_collab_dir(&dir);
    inv.workspace_root = Some("/home/dev/My Project".to_string());
    let tool = CollabTool::new(Arc::new(devtools::collab::Mailbox::new(
        dir.path().to_path_buf(),
    )));

    let created = call(
        &tool,
        &inv,
        json!({"function": "create_session", "topic": "t"}),
    )
    .await;
    assert!(
        created["session"]["participants"]["my-project"].is_object(),
        "participant should derive from the workspace basename: {created}"
    );
}

#[test]
fn test_enablement_precedence_s4() {
    // S4: a disabled tool stays out even when explicitly enabled.
    let mut registry = Registry::with_disabled(vec!["code_skim".to_string()]);
    tools::register_all(&mut registry, &Arc::new(EnvConfig::default()));

    assert!(registry.get_tool("code_skim").is_none());
    assert!(registry.get_tool("code-skim").is_none());
    assert!(registry.get_tool("github").is_some());
    assert!(
        !registry
            .get_enabled_tool_names()
            .contains(&"code-skim".to_string())
    );
}

#[tokio::test]
async fn test_missing_arguments_are_input_errors() {
    let dir = tempfile::tempdir().unwrap();
    let inv = invocation_with_collab_dir(&dir);
    let tool = CollabTool::new(Arc::new(devtools::collab::Mailbox::new(
        dir.path().to_path_buf(),
    )));

    let err = tool
        .execute(&inv, args(json!({"function": "create_session"})))
        .await
        .unwrap_err();
    assert!(err.contains("topic"), "got: {err}");

    let err = tool
        .execute(&inv, args(json!({"function": "no_such_function"})))
        .await
        .unwrap_err();
    assert!(err.contains("invalid arguments"), "got: {err}");
}

#[tokio::test]
async fn test_skim_cache_survives_between_tool_calls() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.py");
    std::fs::write(&file, "def f():\n    pass\n").unwrap();

    let inv = ToolInvocation::standalone(Arc::new(EnvConfig::default()));
    let payload = json!({"source": [file.display().to_string()]});

    let first = call(&CodeSkimTool, &inv, payload.clone()).await;
    let second = call(&CodeSkimTool, &inv, payload).await;
    assert_eq!(first["files"][0]["cached"], false);
    assert_eq!(second["files"][0]["cached"], true);
    assert_eq!(
        first["files"][0]["content"],
        second["files"][0]["content"]
    );
}
