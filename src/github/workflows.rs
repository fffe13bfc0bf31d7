// src/github/workflows.rs
// Workflow run lookup and log retrieval

use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{API_BASE, ApiClass, GitHubClient};
use crate::error::{DevToolsError, Result};
use crate::security::AccessPolicy;

/// Logs are clamped to keep tool results bounded.
const MAX_LOG_BYTES: usize = 50 * 1024;
const TRUNCATION_MARKER: &str = "\n... (logs truncated)";

pub async fn get_workflow_run(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    run_id: u64,
    include_logs: bool,
    policy: &Arc<dyn AccessPolicy>,
    ct: &CancellationToken,
) -> Result<Value> {
    let url = format!("{API_BASE}/repos/{owner}/{repo}/actions/runs/{run_id}");
    let body = client.get_json(ApiClass::Core, &url, &[], ct).await?;

    let mut run = json!({
        "id": body["id"],
        "name": body["name"],
        "status": body["status"],
        "conclusion": body["conclusion"],
        "branch": body["head_branch"],
        "event": body["event"],
        "run_attempt": body["run_attempt"],
        "created_at": body["created_at"],
        "html_url": body["html_url"],
    });

    if include_logs {
        match fetch_logs(client, owner, repo, run_id, policy, ct).await {
            Ok(logs) => run["logs"] = Value::String(logs),
            // The run itself is still useful when logs are unavailable.
            Err(DevToolsError::Cancelled) => return Err(DevToolsError::Cancelled),
            Err(e) => run["logs_error"] = Value::String(e.to_string()),
        }
    }
    Ok(run)
}

/// Download the run logs. The logs endpoint redirects to blob storage, so
/// the final host passes through the domain-access policy before the body
/// is read.
async fn fetch_logs(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    run_id: u64,
    policy: &Arc<dyn AccessPolicy>,
    ct: &CancellationToken,
) -> Result<String> {
    let url = format!("{API_BASE}/repos/{owner}/{repo}/actions/runs/{run_id}/logs");
    let response = client.get(ApiClass::Core, &url, &[], ct).await?;
    if !response.status().is_success() {
        return Err(DevToolsError::External(format!(
            "logs unavailable: GitHub returned {}",
            response.status()
        )));
    }

    if let Some(host) = response.url().host_str()
        && let Err(denial) = policy.check_domain_access(host)
    {
        return Err(DevToolsError::PolicyDenied {
            id: denial.id,
            reason: denial.reason,
        });
    }

    let bytes = tokio::select! {
        bytes = response.bytes() => bytes?,
        _ = ct.cancelled() => return Err(DevToolsError::Cancelled),
    };
    Ok(clamp_logs(&String::from_utf8_lossy(&bytes)))
}

fn clamp_logs(logs: &str) -> String {
    if logs.len() <= MAX_LOG_BYTES {
        return logs.to_string();
    }
    let mut cut = MAX_LOG_BYTES;
    while !logs.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{TRUNCATION_MARKER}", &logs[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_short_logs_untouched() {
        assert_eq!(clamp_logs("all good"), "all good");
    }

    #[test]
    fn test_clamp_long_logs() {
        let long = "x".repeat(MAX_LOG_BYTES + 100);
        let clamped = clamp_logs(&long);
        assert!(clamped.ends_with(TRUNCATION_MARKER));
        assert!(clamped.len() <= MAX_LOG_BYTES + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_clamp_respects_char_boundaries() {
        let long = "é".repeat(MAX_LOG_BYTES);
        let clamped = clamp_logs(&long);
        assert!(clamped.ends_with(TRUNCATION_MARKER));
    }
}
