// src/registry/tool.rs
// The contract every tool satisfies, plus the per-invocation context

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::cache::ToolCache;
use crate::config::EnvConfig;
use crate::security::AccessPolicy;

/// Advisory behaviour hints surfaced to the MCP host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolAnnotations {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
    pub open_world: bool,
}

impl ToolAnnotations {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            idempotent: true,
            ..Self::default()
        }
    }
}

/// Schema and metadata for a tool, published via `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: String,
    /// JSON Schema object for the tool's arguments.
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
}

/// Generate the input schema for a typed request struct.
pub fn schema_for<T: schemars::JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Request-scoped context handed to every tool execution.
#[derive(Clone)]
pub struct ToolInvocation {
    /// Shared cache; values are immutable once stored.
    pub cache: Arc<ToolCache>,
    /// Configuration snapshot taken at startup.
    pub config: Arc<EnvConfig>,
    /// Security policy boundary.
    pub policy: Arc<dyn AccessPolicy>,
    /// Cancelled when the client aborts the request or the transport closes.
    pub ct: CancellationToken,
    /// Workspace root reported by the transport, used for participant
    /// auto-detection in collab tools.
    pub workspace_root: Option<String>,
}

impl ToolInvocation {
    /// Context for tests and one-shot CLI invocations.
    pub fn standalone(config: Arc<EnvConfig>) -> Self {
        Self {
            cache: Arc::new(ToolCache::new()),
            config,
            policy: Arc::new(crate::security::DefaultPolicy::new()),
            ct: CancellationToken::new(),
            workspace_root: None,
        }
    }
}

/// A tool that can be registered and executed.
///
/// `execute` returns `Err(String)` for user-visible failures; the transport
/// frames the string as an MCP tool error without further interpretation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(
        &self,
        inv: &ToolInvocation,
        args: Map<String, Value>,
    ) -> Result<String, String>;

    /// Usage examples shown on request. `Some` marks the extended-help
    /// capability.
    fn extended_help(&self) -> Option<String> {
        None
    }
}

/// Decode the raw argument map into a typed request struct.
pub fn decode_args<T: serde::de::DeserializeOwned>(args: Map<String, Value>) -> Result<T, String> {
    serde_json::from_value(Value::Object(args)).map_err(|e| format!("invalid arguments: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, schemars::JsonSchema)]
    struct DemoRequest {
        name: String,
        count: Option<u32>,
    }

    #[test]
    fn test_schema_for_is_object() {
        let schema = schema_for::<DemoRequest>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["name"].is_object());
    }

    #[test]
    fn test_decode_args() {
        let mut args = Map::new();
        args.insert("name".to_string(), Value::String("x".to_string()));
        let req: DemoRequest = decode_args(args).unwrap();
        assert_eq!(req.name, "x");
        assert_eq!(req.count, None);
    }

    #[test]
    fn test_decode_args_wrong_type() {
        let mut args = Map::new();
        args.insert("name".to_string(), Value::Bool(true));
        let err = decode_args::<DemoRequest>(args).unwrap_err();
        assert!(err.contains("invalid arguments"));
    }
}
