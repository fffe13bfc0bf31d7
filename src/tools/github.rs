// src/tools/github.rs
// GitHub tool: one entry point, function-dispatched

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;

use crate::github::{self, GitHubClient, parse};
use crate::registry::{
    Tool, ToolAnnotations, ToolDefinition, ToolInvocation, decode_args, schema_for,
};

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GitHubFunction {
    SearchRepositories,
    SearchIssues,
    SearchPullRequests,
    GetIssue,
    GetPullRequest,
    GetFileContents,
    ListDirectory,
    CloneRepository,
    GetWorkflowRun,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GitHubRequest {
    /// Operation to perform
    pub function: GitHubFunction,
    /// owner/repo or a github.com URL; issue/PR/run URLs carry their number
    pub repository: Option<String>,
    /// Function-specific options: query, limit, number, paths, ref, path,
    /// local_path, depth, run_id, include_logs
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl GitHubRequest {
    fn repository(&self) -> Result<(String, String), String> {
        let raw = self
            .repository
            .as_deref()
            .ok_or("repository is required")?;
        parse::parse_repository(raw).map_err(|e| e.to_string())
    }

    fn opt_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    fn opt_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(Value::as_u64)
    }

    fn require_query(&self) -> Result<&str, String> {
        self.opt_str("query")
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| "options.query is required".to_string())
    }

    /// Number embedded in the repository URL, else `options.number`.
    fn number(&self, from_url: impl Fn(&str) -> Option<u64>, what: &str) -> Result<u64, String> {
        self.repository
            .as_deref()
            .and_then(from_url)
            .or_else(|| self.opt_u64("number"))
            .ok_or_else(|| format!("{what} number not found in repository URL or options.number"))
    }
}

/// The client (auth + rate limiters) is resolved once on first use and
/// shared by every subsequent call.
pub struct GitHubTool {
    client: OnceCell<GitHubClient>,
}

impl GitHubTool {
    pub fn new() -> Self {
        Self {
            client: OnceCell::new(),
        }
    }

    async fn client(&self, inv: &ToolInvocation) -> Result<&GitHubClient, String> {
        self.client
            .get_or_try_init(|| async { GitHubClient::new(&inv.config.github) })
            .await
            .map_err(|e| e.to_string())
    }
}

impl Default for GitHubTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GitHubTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "github",
            description: "GitHub access: search repositories/issues/PRs, fetch issues and \
                          pull requests, read files in bulk, list directories, clone \
                          repositories, and inspect workflow runs with logs. Rate-limited \
                          per endpoint class."
                .to_string(),
            input_schema: schema_for::<GitHubRequest>(),
            annotations: ToolAnnotations {
                read_only: false,
                destructive: false,
                idempotent: true,
                open_world: true,
            },
        }
    }

    async fn execute(
        &self,
        inv: &ToolInvocation,
        args: Map<String, Value>,
    ) -> Result<String, String> {
        let request: GitHubRequest = decode_args(args)?;
        let client = self.client(inv).await?;
        let ct = &inv.ct;

        let result: Value = match request.function {
            GitHubFunction::SearchRepositories => {
                let query = request.require_query()?;
                github::issues::search_repositories(client, query, request.opt_u64("limit"), ct)
                    .await
                    .map_err(|e| e.to_string())?
            }
            GitHubFunction::SearchIssues => {
                let query = request.require_query()?;
                github::issues::search_issues(client, query, request.opt_u64("limit"), ct)
                    .await
                    .map_err(|e| e.to_string())?
            }
            GitHubFunction::SearchPullRequests => {
                let query = request.require_query()?;
                github::issues::search_pull_requests(client, query, request.opt_u64("limit"), ct)
                    .await
                    .map_err(|e| e.to_string())?
            }
            GitHubFunction::GetIssue => {
                let (owner, repo) = request.repository()?;
                let number = request.number(parse::extract_issue_number, "issue")?;
                github::issues::get_issue(client, &owner, &repo, number, ct)
                    .await
                    .map_err(|e| e.to_string())?
            }
            GitHubFunction::GetPullRequest => {
                let (owner, repo) = request.repository()?;
                let number = request.number(parse::extract_pull_number, "pull request")?;
                github::issues::get_pull_request(client, &owner, &repo, number, ct)
                    .await
                    .map_err(|e| e.to_string())?
            }
            GitHubFunction::GetFileContents => {
                let (owner, repo) = request.repository()?;
                let paths: Vec<String> = request
                    .options
                    .get("paths")
                    .and_then(Value::as_array)
                    .map(|a| {
                        a.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .or_else(|| request.opt_str("path").map(|p| vec![p.to_string()]))
                    .ok_or("options.paths (array) or options.path is required")?;
                let response = github::files::get_file_contents(
                    client,
                    &owner,
                    &repo,
                    &paths,
                    request.opt_str("ref"),
                    ct,
                )
                .await
                .map_err(|e| e.to_string())?;
                serde_json::to_value(response).map_err(|e| e.to_string())?
            }
            GitHubFunction::ListDirectory => {
                let (owner, repo) = request.repository()?;
                github::files::list_directory(
                    client,
                    &owner,
                    &repo,
                    request.opt_str("path"),
                    request.opt_str("ref"),
                    ct,
                )
                .await
                .map_err(|e| e.to_string())?
            }
            GitHubFunction::CloneRepository => {
                let (owner, repo) = request.repository()?;
                let depth = request.opt_u64("depth").map(|d| d as u32);
                let result = github::clone::clone_repository(
                    client,
                    &owner,
                    &repo,
                    request.opt_str("local_path"),
                    depth,
                    &inv.policy,
                    ct,
                )
                .await
                .map_err(|e| e.to_string())?;
                serde_json::to_value(result).map_err(|e| e.to_string())?
            }
            GitHubFunction::GetWorkflowRun => {
                let (owner, repo) = request.repository()?;
                let run_id = request
                    .repository
                    .as_deref()
                    .and_then(parse::extract_workflow_run_id)
                    .or_else(|| request.opt_u64("run_id"))
                    .ok_or("run id not found in repository URL or options.run_id")?;
                let include_logs = request
                    .options
                    .get("include_logs")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                github::workflows::get_workflow_run(
                    client,
                    &owner,
                    &repo,
                    run_id,
                    include_logs,
                    &inv.policy,
                    ct,
                )
                .await
                .map_err(|e| e.to_string())?
            }
        };
        serde_json::to_string_pretty(&json!(result)).map_err(|e| e.to_string())
    }

    fn extended_help(&self) -> Option<String> {
        Some(
            "Examples:\n\
             {\"function\": \"search_repositories\", \"options\": {\"query\": \"mcp server language:rust\"}}\n\
             {\"function\": \"get_issue\", \"repository\": \"https://github.com/a/b/issues/42\"}\n\
             {\"function\": \"get_file_contents\", \"repository\": \"a/b\", \
             \"options\": {\"paths\": [\"README.md\", \"src/main.rs\"], \"ref\": \"main\"}}\n\
             {\"function\": \"clone_repository\", \"repository\": \"a/b\", \
             \"options\": {\"local_path\": \"/tmp/b\", \"depth\": 1}}\n\
             {\"function\": \"get_workflow_run\", \"repository\": \
             \"https://github.com/a/b/actions/runs/123\", \"options\": {\"include_logs\": true}}"
                .to_string(),
        )
    }
}
