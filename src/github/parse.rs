// src/github/parse.rs
// owner/repo and issue/PR/run extraction from the URL forms users paste

use crate::error::{DevToolsError, Result};

/// Extract `(owner, repo)` from any accepted repository form:
/// `owner/repo`, `https://github.com/owner/repo[.git]`, or a URL embedding
/// an issue, pull request, or workflow-run path.
pub fn parse_repository(input: &str) -> Result<(String, String)> {
    let segments = path_segments(input);
    let (owner, repo) = match segments.as_slice() {
        [owner, repo, ..] => (owner.to_string(), trim_git_suffix(repo)),
        _ => {
            return Err(DevToolsError::InvalidInput(format!(
                "cannot parse repository from {input:?}; expected owner/repo or a github.com URL"
            )));
        }
    };
    if owner.is_empty() || repo.is_empty() || owner.contains(char::is_whitespace) {
        return Err(DevToolsError::InvalidInput(format!(
            "cannot parse repository from {input:?}"
        )));
    }
    Ok((owner, repo))
}

/// Issue number from `.../issues/{n}`.
pub fn extract_issue_number(input: &str) -> Option<u64> {
    number_after(input, &["issues"])
}

/// Pull request number from `.../pull/{n}`.
pub fn extract_pull_number(input: &str) -> Option<u64> {
    number_after(input, &["pull"])
}

/// Workflow run id from `.../actions/runs/{id}`.
pub fn extract_workflow_run_id(input: &str) -> Option<u64> {
    number_after(input, &["actions", "runs"])
}

fn number_after(input: &str, markers: &[&str]) -> Option<u64> {
    let segments = path_segments(input);
    let position = segments
        .windows(markers.len())
        .position(|window| window == markers)?;
    segments.get(position + markers.len())?.parse().ok()
}

/// Path segments after an optional scheme and github.com host.
fn path_segments(input: &str) -> Vec<&str> {
    let mut rest = input.trim();
    for prefix in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    for host in ["www.github.com/", "github.com/"] {
        if let Some(stripped) = rest.strip_prefix(host) {
            rest = stripped;
            break;
        }
    }
    rest.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

fn trim_git_suffix(repo: &str) -> String {
    repo.strip_suffix(".git").unwrap_or(repo).to_string()
}
