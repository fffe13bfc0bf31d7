// src/tools/security.rs
// Lift a policy denial by its opaque id (requires explicit enablement)

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::registry::{
    Tool, ToolAnnotations, ToolDefinition, ToolInvocation, decode_args, schema_for,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SecurityOverrideRequest {
    /// The denial id from an "access denied [id]" error
    pub id: String,
}

pub struct SecurityOverrideTool;

#[async_trait]
impl Tool for SecurityOverrideTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "security_override",
            description: "Override a security-policy denial for the rest of this process. \
                          Pass the short id shown in the 'access denied [id]' message."
                .to_string(),
            input_schema: schema_for::<SecurityOverrideRequest>(),
            annotations: ToolAnnotations {
                read_only: false,
                destructive: true,
                idempotent: true,
                open_world: false,
            },
        }
    }

    async fn execute(
        &self,
        inv: &ToolInvocation,
        args: Map<String, Value>,
    ) -> Result<String, String> {
        let request: SecurityOverrideRequest = decode_args(args)?;
        if inv.policy.apply_override(&request.id) {
            warn!(id = %request.id, "security denial overridden");
            Ok(format!(
                "Override applied for denial [{}]; retry the blocked operation.",
                request.id
            ))
        } else {
            Err(format!(
                "unknown denial id: {}. Only ids from recent 'access denied' errors can be \
                 overridden.",
                request.id
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use std::path::Path;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_override_round_trip() {
        let inv = ToolInvocation::standalone(Arc::new(EnvConfig::default()));
        let denial = inv
            .policy
            .check_file_access(Path::new("/home/u/.ssh/config"))
            .unwrap_err();

        let mut args = Map::new();
        args.insert("id".to_string(), Value::String(denial.id.clone()));
        let out = SecurityOverrideTool.execute(&inv, args).await.unwrap();
        assert!(out.contains(&denial.id));
        assert!(
            inv.policy
                .check_file_access(Path::new("/home/u/.ssh/config"))
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_unknown_id_fails() {
        let inv = ToolInvocation::standalone(Arc::new(EnvConfig::default()));
        let mut args = Map::new();
        args.insert("id".to_string(), Value::String("deadbeef".into()));
        assert!(SecurityOverrideTool.execute(&inv, args).await.is_err());
    }
}
