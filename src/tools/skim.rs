// src/tools/skim.rs
// The code-skim tool: strip bodies, keep signatures

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::registry::{
    Tool, ToolAnnotations, ToolDefinition, ToolInvocation, decode_args, schema_for,
};
use crate::skim::{self, SkimRequest};

pub struct CodeSkimTool;

#[async_trait]
impl Tool for CodeSkimTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "code_skim",
            description: "Skim source files: strip function and method bodies while keeping \
                          signatures, imports, and structure. Accepts files, directories, and \
                          glob patterns; supports pagination, item filters, and a compact \
                          'sigil' call-graph notation."
                .to_string(),
            input_schema: schema_for::<SkimRequest>(),
            annotations: ToolAnnotations::read_only(),
        }
    }

    async fn execute(
        &self,
        inv: &ToolInvocation,
        args: Map<String, Value>,
    ) -> Result<String, String> {
        let request: SkimRequest = decode_args(args)?;
        let response = skim::run(inv, request).await.map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
    }

    fn extended_help(&self) -> Option<String> {
        Some(
            "Examples:\n\
             {\"source\": [\"/repo/src/main.py\"]}\n\
             {\"source\": [\"/repo/src\"], \"filter\": [\"handle_*\", \"!handle_debug\"]}\n\
             {\"source\": [\"/repo/**/*.go\"], \"format\": \"sigil\"}\n\
             {\"source\": [\"/repo/big.ts\"], \"starting_line\": 10001}\n\
             Filters match item names; '!' prefixes exclude and win immediately."
                .to_string(),
        )
    }
}
