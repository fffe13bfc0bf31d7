// src/config/mod.rs
// Environment-based configuration - single source of truth for all env vars

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-response line cap for code-skim pagination.
pub const DEFAULT_SKIM_MAX_LINES: usize = 10_000;

/// Default collab poll interval and its clamp bounds (seconds).
pub const DEFAULT_POLL_SECS: u64 = 60;
pub const MIN_POLL_SECS: u64 = 5;
pub const MAX_POLL_SECS: u64 = 300;

/// GitHub configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct GitHubEnv {
    /// Auth method override (GITHUB_AUTH_METHOD: "token", "ssh", "none")
    pub auth_method: Option<String>,
    /// API token (GITHUB_TOKEN)
    pub token: Option<String>,
    /// Explicit SSH private key path (GITHUB_SSH_PRIVATE_KEY_PATH)
    pub ssh_key_path: Option<PathBuf>,
    /// Core API requests per minute (GITHUB_CORE_API_RATE_LIMIT, default 80)
    pub core_rate_limit: u32,
    /// Search API requests per minute (GITHUB_SEARCH_API_RATE_LIMIT, default 25)
    pub search_rate_limit: u32,
}

impl GitHubEnv {
    fn from_env() -> Self {
        Self {
            auth_method: read_var("GITHUB_AUTH_METHOD").map(|m| m.to_lowercase()),
            token: read_var("GITHUB_TOKEN"),
            ssh_key_path: read_var("GITHUB_SSH_PRIVATE_KEY_PATH").map(PathBuf::from),
            core_rate_limit: read_parsed("GITHUB_CORE_API_RATE_LIMIT").unwrap_or(80),
            search_rate_limit: read_parsed("GITHUB_SEARCH_API_RATE_LIMIT").unwrap_or(25),
        }
    }
}

/// Environment configuration - all env vars in one place.
///
/// Loaded once at startup; call [`EnvConfig::load`] again to pick up changes.
/// The tool enablement list (`ENABLE_ADDITIONAL_TOOLS`) is deliberately NOT
/// captured here: the registry re-reads it on every lookup so enablement
/// changes take effect at runtime.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Per-response line cap for code-skim (CODE_SKIM_MAX_LINES)
    pub skim_max_lines: usize,
    /// Collab session storage base directory (COLLAB_DIR)
    pub collab_dir: PathBuf,
    /// Default poll interval for collab_wait (COLLAB_POLL_INTERVAL, seconds)
    pub collab_poll_interval: Duration,
    /// GitHub access configuration
    pub github: GitHubEnv,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        let skim_max_lines = read_parsed("CODE_SKIM_MAX_LINES")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SKIM_MAX_LINES);

        let collab_dir = read_var("COLLAB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_collab_dir);

        let poll_secs = read_parsed("COLLAB_POLL_INTERVAL")
            .unwrap_or(DEFAULT_POLL_SECS)
            .clamp(MIN_POLL_SECS, MAX_POLL_SECS);

        let config = Self {
            skim_max_lines,
            collab_dir,
            collab_poll_interval: Duration::from_secs(poll_secs),
            github: GitHubEnv::from_env(),
        };
        debug!(
            skim_max_lines = config.skim_max_lines,
            collab_dir = %config.collab_dir.display(),
            "Environment configuration loaded"
        );
        config
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            skim_max_lines: DEFAULT_SKIM_MAX_LINES,
            collab_dir: default_collab_dir(),
            collab_poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            github: GitHubEnv::default(),
        }
    }
}

/// Comma-separated tool names the user has opted in to, plus the `all`
/// sentinel. Re-read from the environment on every registry lookup.
#[derive(Debug, Clone, Default)]
pub struct EnableList {
    pub all: bool,
    pub names: Vec<String>,
}

impl EnableList {
    pub fn from_env() -> Self {
        Self::parse(read_var("ENABLE_ADDITIONAL_TOOLS").as_deref().unwrap_or(""))
    }

    /// Parse a raw comma-separated list. Names are kept verbatim here;
    /// the registry normalises both sides before matching.
    pub fn parse(raw: &str) -> Self {
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let all = names.iter().any(|n| n.eq_ignore_ascii_case("all"));
        Self { all, names }
    }
}

/// Parse the disabled-tools environment variable, supporting the legacy
/// `DISABLED_FUNCTIONS` name with a deprecation warning.
pub fn disabled_tools_from_env() -> Vec<String> {
    let raw = if let Some(v) = read_var("DISABLED_TOOLS") {
        v
    } else if let Some(v) = read_var("DISABLED_FUNCTIONS") {
        warn!("DISABLED_FUNCTIONS is deprecated; use DISABLED_TOOLS instead");
        v
    } else {
        return Vec::new();
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Base directory for server-owned files (`~/.mcp-devtools`).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mcp-devtools")
}

fn default_collab_dir() -> PathBuf {
    data_dir().join("collab")
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    read_var(name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_list_parse() {
        let list = EnableList::parse("foo, bar ,baz");
        assert!(!list.all);
        assert_eq!(list.names, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_enable_list_all_sentinel() {
        let list = EnableList::parse("all");
        assert!(list.all);
        let list = EnableList::parse("foo,ALL");
        assert!(list.all);
    }

    #[test]
    fn test_enable_list_empty() {
        let list = EnableList::parse("");
        assert!(!list.all);
        assert!(list.names.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = EnvConfig::default();
        assert_eq!(config.skim_max_lines, DEFAULT_SKIM_MAX_LINES);
        assert!(config.collab_dir.ends_with("collab"));
        assert_eq!(config.github.core_rate_limit, 0); // Default derive, not from_env
    }
}
