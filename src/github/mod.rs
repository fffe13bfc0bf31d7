// src/github/mod.rs
// Authenticated GitHub access layer: auth resolution, rate-limited REST
// client, and the per-function operations

pub mod clone;
pub mod files;
pub mod issues;
pub mod parse;
pub mod rate_limit;
pub mod workflows;

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::GitHubEnv;
use crate::error::{DevToolsError, Result};
use crate::state::StateFile;
use rate_limit::RateLimiter;

pub const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("mcp-devtools/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Token,
    Ssh,
    None,
}

/// Resolved once per client. SSH is used only for `git clone`; REST calls
/// always go over HTTPS.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub method: AuthMethod,
    pub token: Option<String>,
    pub ssh_key_path: Option<PathBuf>,
}

impl AuthConfig {
    pub fn resolve(env: &GitHubEnv) -> Result<Self> {
        if env.auth_method.as_deref() == Some("ssh") {
            let key = find_ssh_key(env.ssh_key_path.as_deref()).ok_or_else(|| {
                DevToolsError::Config(
                    "GITHUB_AUTH_METHOD=ssh but no private key found at ~/.ssh/id_ed25519, \
                     ~/.ssh/id_rsa, or GITHUB_SSH_PRIVATE_KEY_PATH"
                        .to_string(),
                )
            })?;
            return Ok(Self {
                method: AuthMethod::Ssh,
                token: env.token.clone(),
                ssh_key_path: Some(key),
            });
        }
        if env.auth_method.as_deref() == Some("none") {
            return Ok(Self {
                method: AuthMethod::None,
                token: None,
                ssh_key_path: None,
            });
        }
        if let Some(token) = &env.token {
            return Ok(Self {
                method: AuthMethod::Token,
                token: Some(token.clone()),
                ssh_key_path: None,
            });
        }
        Ok(Self {
            method: AuthMethod::None,
            token: None,
            ssh_key_path: None,
        })
    }
}

fn find_ssh_key(explicit: Option<&std::path::Path>) -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    for candidate in [home.join(".ssh/id_ed25519"), home.join(".ssh/id_rsa")] {
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    explicit.filter(|p| p.is_file()).map(PathBuf::from)
}

/// Which token bucket a REST call draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiClass {
    Core,
    Search,
}

/// GitHub REST client. Limiters are per-client, not per-process.
pub struct GitHubClient {
    http: reqwest::Client,
    pub auth: AuthConfig,
    core: RateLimiter,
    search: RateLimiter,
    pub(crate) state: StateFile,
}

impl GitHubClient {
    pub fn new(env: &GitHubEnv) -> Result<Self> {
        let auth = AuthConfig::resolve(env)?;
        debug!(method = ?auth.method, "GitHub auth resolved");
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            auth,
            core: RateLimiter::per_minute(env.core_rate_limit.max(1))?,
            search: RateLimiter::per_minute(env.search_rate_limit.max(1))?,
            state: StateFile::open_default(),
        })
    }

    fn limiter(&self, class: ApiClass) -> &RateLimiter {
        match class {
            ApiClass::Core => &self.core,
            ApiClass::Search => &self.search,
        }
    }

    /// Rate-limited GET. Status handling is left to the caller.
    pub(crate) async fn get(
        &self,
        class: ApiClass,
        url: &str,
        query: &[(&str, String)],
        ct: &CancellationToken,
    ) -> Result<reqwest::Response> {
        self.limiter(class).acquire(ct).await?;

        let mut request = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.auth.token {
            request = request.bearer_auth(token);
        }

        tokio::select! {
            response = request.send() => Ok(response?),
            _ = ct.cancelled() => Err(DevToolsError::Cancelled),
        }
    }

    /// GET expecting a JSON success body; non-2xx becomes an external error
    /// carrying the upstream status and message.
    pub(crate) async fn get_json(
        &self,
        class: ApiClass,
        url: &str,
        query: &[(&str, String)],
        ct: &CancellationToken,
    ) -> Result<Value> {
        let response = self.get(class, url, query, ct).await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or_default();
            return Err(DevToolsError::External(format!(
                "GitHub API returned {status} for {url}: {detail}"
            )));
        }
        Ok(response.json().await?)
    }

    /// Default branch for a repository, served from the state sidecar when
    /// fresh (24 h) to save core-API tokens.
    pub(crate) async fn default_branch(
        &self,
        owner: &str,
        repo: &str,
        ct: &CancellationToken,
    ) -> Option<String> {
        let key = format!("github:default_branch:{owner}/{repo}");
        if let Some(cached) = self.state.get_fresh(&key) {
            return cached.as_str().map(str::to_string);
        }
        let url = format!("{API_BASE}/repos/{owner}/{repo}");
        let branch = self
            .get_json(ApiClass::Core, &url, &[], ct)
            .await
            .ok()?
            .get("default_branch")?
            .as_str()?
            .to_string();
        let _ = self.state.set(key, Value::String(branch.clone()));
        Some(branch)
    }
}
