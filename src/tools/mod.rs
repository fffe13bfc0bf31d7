// src/tools/mod.rs
// Tool implementations that plug into the registry

pub mod collab;
pub mod github;
pub mod security;
pub mod skim;
pub mod think;

use std::sync::Arc;

use crate::collab::Mailbox;
use crate::config::EnvConfig;
use crate::registry::Registry;

/// Register every tool. Rust has no static initialisers, so this is the
/// single place the catalogue is assembled; the registry's enablement
/// policy decides what actually lands.
pub fn register_all(registry: &mut Registry, config: &Arc<EnvConfig>) {
    // One mailbox shared by collab and collab_wait so in-process callers
    // serialise on the same local locks.
    let mailbox = Arc::new(Mailbox::new(config.collab_dir.clone()));

    registry.register(Arc::new(skim::CodeSkimTool));
    registry.register(Arc::new(collab::CollabTool::new(mailbox.clone())));
    registry.register(Arc::new(collab::CollabWaitTool::new(mailbox)));
    registry.register(Arc::new(github::GitHubTool::new()));
    registry.register(Arc::new(think::ThinkTool));
    registry.register(Arc::new(security::SecurityOverrideTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_defaults_registered() {
        let mut registry = Registry::with_disabled(Vec::new());
        register_all(&mut registry, &Arc::new(EnvConfig::default()));

        for name in crate::registry::CORE_DEFAULT_TOOLS {
            assert!(
                registry.get_tool(name).is_some(),
                "{name} should be registered and enabled"
            );
        }
    }

    #[test]
    fn test_definitions_have_object_schemas() {
        let mut registry = Registry::with_disabled(Vec::new());
        register_all(&mut registry, &Arc::new(EnvConfig::default()));

        for (name, tool) in registry.get_enabled_tools() {
            let definition = tool.definition();
            assert_eq!(
                definition.input_schema["type"], "object",
                "{name} schema must be an object"
            );
            assert!(!definition.description.is_empty());
        }
    }

    #[test]
    fn test_extended_help_present_on_major_tools() {
        let mut registry = Registry::with_disabled(Vec::new());
        register_all(&mut registry, &Arc::new(EnvConfig::default()));

        let with_help = registry.get_tool_names_with_extended_help();
        assert!(with_help.contains(&"code-skim".to_string()));
        assert!(with_help.contains(&"github".to_string()));
        assert!(with_help.contains(&"collab".to_string()));
    }
}
