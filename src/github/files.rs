// src/github/files.rs
// Bulk file retrieval and directory listing. Partial failure is the
// expected shape: each path succeeds or fails on its own.

use base64::Engine;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{API_BASE, ApiClass, GitHubClient};
use crate::error::{DevToolsError, Result};

/// Files larger than this are reported without content.
const MAX_DECODE_SIZE: u64 = 1024 * 1024;

/// Bytes inspected for NUL when deciding text vs. binary.
const TEXT_PROBE_LEN: usize = 512;

#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub size: u64,
    pub binary: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileContent {
    fn failed(path: String, error: String) -> Self {
        Self {
            path,
            content: String::new(),
            size: 0,
            binary: false,
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileContent>,
    pub success_count: usize,
    pub total_count: usize,
}

/// Fetch several files from a repository. A failed path produces an error
/// entry; the batch always completes.
pub async fn get_file_contents(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    paths: &[String],
    git_ref: Option<&str>,
    ct: &CancellationToken,
) -> Result<FilesResponse> {
    if paths.is_empty() {
        return Err(DevToolsError::InvalidInput(
            "at least one file path is required".to_string(),
        ));
    }

    let mut files = Vec::with_capacity(paths.len());
    for raw_path in paths {
        let path = raw_path.trim_matches('/').to_string();
        let file = fetch_one(client, owner, repo, &path, git_ref, ct).await;
        files.push(match file {
            Ok(file) => file,
            Err(DevToolsError::Cancelled) => return Err(DevToolsError::Cancelled),
            Err(e) => FileContent::failed(path, e.to_string()),
        });
    }

    let success_count = files.iter().filter(|f| f.success).count();
    Ok(FilesResponse {
        total_count: files.len(),
        success_count,
        files,
    })
}

async fn fetch_one(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    path: &str,
    git_ref: Option<&str>,
    ct: &CancellationToken,
) -> Result<FileContent> {
    let url = format!("{API_BASE}/repos/{owner}/{repo}/contents/{path}");
    let query: Vec<(&str, String)> = git_ref
        .map(|r| vec![("ref", r.to_string())])
        .unwrap_or_default();

    let response = client.get(ApiClass::Core, &url, &query, ct).await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(DevToolsError::External(not_found_hint(
            client, owner, repo, path, git_ref, ct,
        )
        .await));
    }
    if !response.status().is_success() {
        return Err(DevToolsError::External(format!(
            "GitHub API returned {} for {path}",
            response.status()
        )));
    }

    let body: Value = response.json().await?;
    if body.is_array() {
        return Err(DevToolsError::InvalidInput(format!(
            "{path} is a directory; use list_directory instead"
        )));
    }

    let size = body["size"].as_u64().unwrap_or(0);
    if size > MAX_DECODE_SIZE {
        return Ok(FileContent {
            path: path.to_string(),
            content: String::new(),
            size,
            binary: false,
            success: true,
            error: Some(format!(
                "file is {size} bytes (limit {MAX_DECODE_SIZE}); content omitted"
            )),
        });
    }

    let raw = body["content"].as_str().unwrap_or("");
    let (content, binary) = decode_content(raw);
    Ok(FileContent {
        path: path.to_string(),
        content,
        size,
        binary,
        success: true,
        error: None,
    })
}

/// The 404 message teaches the agent how to recover.
async fn not_found_hint(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    path: &str,
    git_ref: Option<&str>,
    ct: &CancellationToken,
) -> String {
    let branch = match git_ref {
        Some(r) => r.to_string(),
        None => client
            .default_branch(owner, repo, ct)
            .await
            .unwrap_or_else(|| "main".to_string()),
    };
    format!(
        "'{path}' not found in {owner}/{repo} (ref: {branch}).\n\
         Suggestions:\n\
         - Use list_directory on the parent directory to see what actually exists\n\
         - Verify the file path spelling and the ref\n\
         - Browse the tree: https://github.com/{owner}/{repo}/tree/{branch}"
    )
}

/// Decode an API content payload: base64 first, then the literal string.
/// Returns `(text, binary)`; binary payloads yield empty text.
fn decode_content(raw: &str) -> (String, bool) {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(&stripped) {
        if is_binary(&bytes) {
            return (String::new(), true);
        }
        return (String::from_utf8_lossy(&bytes).to_string(), false);
    }
    if is_binary(raw.as_bytes()) {
        return (String::new(), true);
    }
    (raw.to_string(), false)
}

/// NUL bytes in the first 512 bytes mark the payload as binary.
fn is_binary(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .take(TEXT_PROBE_LEN)
        .any(|&b| b == 0)
}

/// List a directory within a repository.
pub async fn list_directory(
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    path: Option<&str>,
    git_ref: Option<&str>,
    ct: &CancellationToken,
) -> Result<Value> {
    let cleaned = path.map(|p| p.trim_matches('/')).unwrap_or("");
    let url = format!("{API_BASE}/repos/{owner}/{repo}/contents/{cleaned}");
    let query: Vec<(&str, String)> = git_ref
        .map(|r| vec![("ref", r.to_string())])
        .unwrap_or_default();

    let body = client.get_json(ApiClass::Core, &url, &query, ct).await?;
    let entries: Vec<Value> = match body.as_array() {
        Some(entries) => entries
            .iter()
            .map(|entry| {
                json!({
                    "name": entry["name"],
                    "path": entry["path"],
                    "type": entry["type"],
                    "size": entry["size"],
                })
            })
            .collect(),
        // A file path lists as itself.
        None => vec![json!({
            "name": body["name"],
            "path": body["path"],
            "type": body["type"],
            "size": body["size"],
        })],
    };
    let count = entries.len();
    Ok(json!({
        "path": cleaned,
        "entries": entries,
        "count": count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_text() {
        // "hello world\n" in the newline-wrapped form the API emits.
        let raw = "aGVsbG8g\nd29ybGQK\n";
        let (content, binary) = decode_content(raw);
        assert_eq!(content, "hello world\n");
        assert!(!binary);
    }

    #[test]
    fn test_decode_base64_binary() {
        let bytes = [0u8, 1, 2, 3, 0, 255];
        let raw = base64::engine::general_purpose::STANDARD.encode(bytes);
        let (content, binary) = decode_content(&raw);
        assert!(binary);
        assert!(content.is_empty(), "binary content must be empty");
    }

    #[test]
    fn test_decode_literal_fallback() {
        let raw = "plain text, not base64!";
        let (content, binary) = decode_content(raw);
        assert_eq!(content, raw);
        assert!(!binary);
    }

    #[test]
    fn test_is_binary_probe_window() {
        let mut text = vec![b'a'; TEXT_PROBE_LEN];
        text.push(0);
        assert!(!is_binary(&text), "NUL beyond the probe window is ignored");
        let mut early = vec![b'a'; 10];
        early.push(0);
        assert!(is_binary(&early));
    }
}
