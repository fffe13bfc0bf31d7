// src/tools/think.rs
// Scratchpad tool: record a thought, change nothing

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::{
    Tool, ToolAnnotations, ToolDefinition, ToolInvocation, decode_args, schema_for,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ThinkRequest {
    /// The thought to record
    pub thought: String,
}

pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "think",
            description: "Record a thought for complex reasoning. Does not change any state; \
                          returns the thought so it appears in the conversation."
                .to_string(),
            input_schema: schema_for::<ThinkRequest>(),
            annotations: ToolAnnotations::read_only(),
        }
    }

    async fn execute(
        &self,
        _inv: &ToolInvocation,
        args: Map<String, Value>,
    ) -> Result<String, String> {
        let request: ThinkRequest = decode_args(args)?;
        debug!(length = request.thought.len(), "thought recorded");
        Ok(request.thought)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_think_echoes() {
        let inv = ToolInvocation::standalone(Arc::new(EnvConfig::default()));
        let mut args = Map::new();
        args.insert("thought".to_string(), Value::String("plan: a then b".into()));
        let out = ThinkTool.execute(&inv, args).await.unwrap();
        assert_eq!(out, "plan: a then b");
    }
}
