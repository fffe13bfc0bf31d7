// src/registry/mod.rs
// Process-wide tool catalogue with the three-tier enablement policy

mod tool;

pub use tool::{
    Tool, ToolAnnotations, ToolDefinition, ToolInvocation, decode_args, schema_for,
};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::cache::ToolCache;
use crate::config::{EnableList, disabled_tools_from_env};

/// Tools available without opt-in. Everything else registered must appear in
/// `ENABLE_ADDITIONAL_TOOLS` (or the `all` sentinel) to be served.
pub const CORE_DEFAULT_TOOLS: &[&str] = &["code-skim", "github", "collab", "collab-wait", "think"];

/// Legacy spellings accepted in the enablement list.
const TOOL_ALIASES: &[(&str, &str)] = &[
    ("codeskim", "code-skim"),
    ("agent-collaboration", "collab"),
    ("agent-collaboration-wait", "collab-wait"),
];

/// Canonical form used for every name comparison: lowercase with
/// underscores folded to hyphens.
pub fn normalize_tool_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

fn resolve_alias(normalized: &str) -> &str {
    TOOL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(normalized)
}

/// The three tiers, applied in order: disabled wins, then core defaults,
/// then the user-provided enablement list (aliases resolved on that side
/// only).
fn is_enabled(normalized: &str, disabled: &HashSet<String>, enable: &EnableList) -> bool {
    if disabled.contains(normalized) {
        return false;
    }
    if CORE_DEFAULT_TOOLS.contains(&normalized) {
        return true;
    }
    if enable.all {
        return true;
    }
    enable
        .names
        .iter()
        .any(|n| resolve_alias(&normalize_tool_name(n)) == normalized)
}

/// Process-wide tool registry. Built once at startup via [`Registry::init`]
/// plus `tools::register_all`; read concurrently afterwards.
pub struct Registry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    disabled: HashSet<String>,
    cache: Arc<ToolCache>,
}

impl Registry {
    /// One-shot initialisation: allocates the shared cache and parses the
    /// disabled-tools environment variable (current and legacy names).
    pub fn init() -> Self {
        Self::with_disabled(disabled_tools_from_env())
    }

    /// Construct with an explicit disabled list (used by tests).
    pub fn with_disabled(disabled: Vec<String>) -> Self {
        let disabled: HashSet<String> =
            disabled.iter().map(|n| normalize_tool_name(n)).collect();
        if !disabled.is_empty() {
            debug!(count = disabled.len(), "tools disabled by configuration");
        }
        Self {
            tools: BTreeMap::new(),
            disabled,
            cache: Arc::new(ToolCache::new()),
        }
    }

    pub fn cache(&self) -> Arc<ToolCache> {
        self.cache.clone()
    }

    /// Whether a tool should be registered under the current policy.
    pub fn should_register_tool(&self, name: &str) -> bool {
        is_enabled(
            &normalize_tool_name(name),
            &self.disabled,
            &EnableList::from_env(),
        )
    }

    /// Idempotent insertion keyed by the tool's canonical name. Tools the
    /// policy excludes are skipped silently.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = normalize_tool_name(tool.definition().name);
        if !self.should_register_tool(&name) {
            debug!(tool = %name, "skipping registration (disabled or not enabled)");
            return;
        }
        self.tools.insert(name, tool);
    }

    /// Look up a tool for execution. Unknown and disabled names are a normal
    /// `None`, not an error.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let normalized = normalize_tool_name(name);
        if self.disabled.contains(&normalized) {
            return None;
        }
        self.tools.get(&normalized).cloned()
    }

    /// Enabled tools, re-checking the enablement list so runtime policy
    /// changes take effect. Ordered by name.
    pub fn get_enabled_tools(&self) -> BTreeMap<String, Arc<dyn Tool>> {
        let enable = EnableList::from_env();
        self.tools
            .iter()
            .filter(|(name, _)| is_enabled(name, &self.disabled, &enable))
            .map(|(name, tool)| (name.clone(), tool.clone()))
            .collect()
    }

    pub fn get_enabled_tool_names(&self) -> Vec<String> {
        self.get_enabled_tools().into_keys().collect()
    }

    /// Enabled tools that carry extended help, ordered by name.
    pub fn get_tool_names_with_extended_help(&self) -> Vec<String> {
        self.get_enabled_tools()
            .into_iter()
            .filter(|(_, tool)| tool.extended_help().is_some())
            .map(|(name, _)| name)
            .collect()
    }
}
