// src/mcp/mod.rs
// MCP server: binds protocol events to registry lookups and tool execution

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::{
    ErrorData, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, ListToolsResult, PaginatedRequestParams,
        ServerCapabilities, ServerInfo, ToolAnnotations,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::EnvConfig;
use crate::registry::{Registry, ToolDefinition, ToolInvocation};
use crate::security::{AccessPolicy, DefaultPolicy};

/// MCP server state. Clones share the registry, cache, and policy; the
/// transport may run many tool calls concurrently.
#[derive(Clone)]
pub struct DevToolsServer {
    pub registry: Arc<Registry>,
    pub config: Arc<EnvConfig>,
    pub policy: Arc<dyn AccessPolicy>,
    /// Workspace root used for collab participant auto-detection.
    pub workspace_root: Option<String>,
}

impl DevToolsServer {
    pub fn new(registry: Arc<Registry>, config: Arc<EnvConfig>) -> Self {
        let workspace_root = std::env::current_dir()
            .ok()
            .map(|p| p.display().to_string());
        Self {
            registry,
            config,
            policy: Arc::new(DefaultPolicy::new()),
            workspace_root,
        }
    }

    fn invocation(&self, ct: tokio_util::sync::CancellationToken) -> ToolInvocation {
        ToolInvocation {
            cache: self.registry.cache(),
            config: self.config.clone(),
            policy: self.policy.clone(),
            ct,
            workspace_root: self.workspace_root.clone(),
        }
    }
}

/// Build the wire-level tool model from a definition.
fn to_wire_tool(name: &str, definition: &ToolDefinition) -> rmcp::model::Tool {
    let schema = match &definition.input_schema {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    rmcp::model::Tool {
        name: Cow::Owned(name.to_string()),
        title: None,
        description: Some(Cow::Owned(definition.description.clone())),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: Some(ToolAnnotations {
            title: None,
            read_only_hint: Some(definition.annotations.read_only),
            destructive_hint: Some(definition.annotations.destructive),
            idempotent_hint: Some(definition.annotations.idempotent),
            open_world_hint: Some(definition.annotations.open_world),
        }),
        icons: None,
        meta: None,
    }
}

impl ServerHandler for DevToolsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "mcp-devtools".into(),
                title: Some("MCP developer tools: code skimming, collaboration, GitHub".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Developer tools for AI agents: skim source code to signatures, collaborate \
                 with other agents through shared sessions, and work with GitHub repositories."
                    .into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        let tools = self
            .registry
            .get_enabled_tools()
            .iter()
            .map(|(name, tool)| to_wire_tool(name, &tool.definition()))
            .collect();
        std::future::ready(Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        }))
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let name = request.name.to_string();
            let Some(tool) = self.registry.get_tool(&name) else {
                return Err(ErrorData::invalid_params(
                    format!("unknown or disabled tool: {name}"),
                    None,
                ));
            };

            let args = request.arguments.unwrap_or_default();
            let inv = self.invocation(context.ct.clone());
            let started = std::time::Instant::now();
            debug!(tool = %name, "tool call started");

            let result = tokio::select! {
                result = tool.execute(&inv, args) => result,
                _ = context.ct.cancelled() => Err("operation cancelled".to_string()),
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match result {
                Ok(text) => {
                    debug!(tool = %name, elapsed_ms, "tool call succeeded");
                    Ok(CallToolResult {
                        content: vec![Content::text(text)],
                        structured_content: None,
                        is_error: Some(false),
                        meta: None,
                    })
                }
                Err(message) => {
                    warn!(tool = %name, elapsed_ms, error = %message, "tool call failed");
                    Ok(CallToolResult::error(vec![Content::text(message)]))
                }
            }
        }
    }
}
