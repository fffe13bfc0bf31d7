// src/github/issues.rs
// Repository/issue/PR search and single-item lookups

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{API_BASE, ApiClass, GitHubClient};
use crate::error::Result;

const DEFAULT_SEARCH_LIMIT: u64 = 10;
const MAX_SEARCH_LIMIT: u64 = 50;

fn clamp_limit(limit: Option<u64>) -> String {
    limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
        .to_string()
}

pub async fn search_repositories(
    client: &GitHubClient,
    query: &str,
    limit: Option<u64>,
    ct: &CancellationToken,
) -> Result<Value> {
    let url = format!("{API_BASE}/search/repositories");
    let body = client
        .get_json(
            ApiClass::Search,
            &url,
            &[("q", query.to_string()), ("per_page", clamp_limit(limit))],
            ct,
        )
        .await?;

    let items: Vec<Value> = body["items"]
        .as_array()
        .map(|items| items.iter().map(summarize_repository).collect())
        .unwrap_or_default();
    Ok(json!({
        "total_count": body["total_count"],
        "items": items,
    }))
}

pub async fn search_issues(
    client: &GitHubClient,
    query: &str,
    limit: Option<u64>,
    ct: &CancellationToken,
) -> Result<Value> {
    search_issue_like(client, query, limit, ct).await
}

/// Same endpoint as issue search; the `is:pr` qualifier narrows it.
pub async fn search_pull_requests(
    client: &GitHubClient,
    query: &str,
    limit: Option<u64>,
    ct: &CancellationToken,
) -> Result<Value> {
    let query = format!("{query} is:pr");
    search_issue_like(client, &query, limit, ct).await
}

async fn search_issue_like(
    client: &GitHubClient,
    query: &str,
    limit: Option<u64>,
    ct: &CancellationToken,
) -> Result<Value> {
    let url = format!("{API_BASE}/search/issues");
    let body = client
        .get_json(
            ApiClass::Search,
            &url,
            &[("q", query.to_string()), ("per_page", clamp_limit(limit))],
            ct,
        )
        .await?;

    let items: Vec<Value> = body["items"]
        .as_array()
        .map(|items| items.iter().map(summarize_issue).collect())
        .unwrap_or_default();
    Ok(json!({
        "total_count": body["total_count"],
        "items": items,
    }))
}

pub async fn get_issue(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    number: u64,
    ct: &CancellationToken,
) -> Result<Value> {
    let url = format!("{API_BASE}/repos/{owner}/{repo}/issues/{number}");
    let body = client.get_json(ApiClass::Core, &url, &[], ct).await?;
    let mut summary = summarize_issue(&body);
    summary["body"] = body["body"].clone();
    Ok(summary)
}

pub async fn get_pull_request(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    number: u64,
    ct: &CancellationToken,
) -> Result<Value> {
    let url = format!("{API_BASE}/repos/{owner}/{repo}/pulls/{number}");
    let body = client.get_json(ApiClass::Core, &url, &[], ct).await?;
    Ok(json!({
        "number": body["number"],
        "title": body["title"],
        "state": body["state"],
        "user": body["user"]["login"],
        "body": body["body"],
        "draft": body["draft"],
        "merged": body["merged"],
        "mergeable": body["mergeable"],
        "head": body["head"]["ref"],
        "base": body["base"]["ref"],
        "changed_files": body["changed_files"],
        "additions": body["additions"],
        "deletions": body["deletions"],
        "html_url": body["html_url"],
    }))
}

fn summarize_repository(item: &Value) -> Value {
    json!({
        "full_name": item["full_name"],
        "description": item["description"],
        "stars": item["stargazers_count"],
        "language": item["language"],
        "archived": item["archived"],
        "html_url": item["html_url"],
    })
}

fn summarize_issue(item: &Value) -> Value {
    let labels: Vec<Value> = item["labels"]
        .as_array()
        .map(|labels| labels.iter().map(|l| l["name"].clone()).collect())
        .unwrap_or_default();
    json!({
        "number": item["number"],
        "title": item["title"],
        "state": item["state"],
        "user": item["user"]["login"],
        "labels": labels,
        "comments": item["comments"],
        "created_at": item["created_at"],
        "html_url": item["html_url"],
    })
}
