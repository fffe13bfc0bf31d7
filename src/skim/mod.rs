// src/skim/mod.rs
// Code-skim engine: resolve sources, strip bodies, paginate

pub mod batch;
pub mod filter;
pub mod graph;
pub mod language;
pub mod resolve;
pub mod sigil;
pub mod transform;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::registry::ToolInvocation;
use batch::{MAX_FILE_SIZE, MemoryLedger};
use filter::FilterSet;
use language::Language;

const CACHE_PREFIX: &str = "codeskim:";

/// Output flavour: stripped source (default) or compact sigil notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SkimFormat {
    #[default]
    Skim,
    Sigil,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SkimRequest {
    /// Absolute file paths, directory paths, or glob patterns (`**` supported)
    pub source: Vec<String>,
    /// 1-based line to start the response at (for pagination)
    pub starting_line: Option<usize>,
    /// Glob patterns selecting items to keep; `!` prefix excludes
    pub filter: Option<Vec<String>>,
    /// Drop all cached skim results before processing
    pub clear_cache: Option<bool>,
    /// Output format: "skim" (stripped source) or "sigil" (call-graph notation)
    pub format: Option<SkimFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub content: String,
    pub cached: bool,
    pub truncated: bool,
    pub total_lines: usize,
    pub returned_lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_starting_line: Option<usize>,
    pub reduction_percent: u8,
    pub total_items: usize,
    pub matched_items: usize,
    pub filtered_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn failed(path: String, error: String) -> Self {
        Self {
            path,
            language: None,
            content: String::new(),
            cached: false,
            truncated: false,
            total_lines: 0,
            returned_lines: 0,
            next_starting_line: None,
            reduction_percent: 0,
            total_items: 0,
            matched_items: 0,
            filtered_items: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SkimResponse {
    pub files: Vec<FileResult>,
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

/// Resolved per-request parameters shared by all workers.
pub struct SkimParams {
    pub filter: FilterSet,
    pub format: SkimFormat,
    pub starting_line: usize,
    pub max_lines: usize,
}

/// Cached outcome of transforming one file. Stored under the preliminary
/// cache key; the sigil rendering is filled in on first sigil request.
#[derive(Debug, Clone)]
struct CachedSkim {
    text: String,
    total_items: usize,
    matched_items: usize,
    filtered_items: usize,
    sigil: Option<String>,
}

/// Run a skim request end to end. Per-file failures land in the result's
/// `error` field; only request-level validation aborts the batch.
pub async fn run(inv: &ToolInvocation, req: SkimRequest) -> Result<SkimResponse> {
    if req.clear_cache.unwrap_or(false) {
        debug!("clearing skim cache");
        inv.cache.invalidate_prefix(CACHE_PREFIX);
    }

    let filter = match &req.filter {
        Some(patterns) if !patterns.is_empty() => FilterSet::new(patterns)?,
        _ => FilterSet::empty(),
    };
    let paths = resolve::resolve_sources(&req.source)?;

    let params = Arc::new(SkimParams {
        filter,
        format: req.format.unwrap_or_default(),
        starting_line: req.starting_line.unwrap_or(1),
        max_lines: inv.config.skim_max_lines,
    });

    let files = batch::process_files(inv, paths, params).await;
    let success_count = files.iter().filter(|f| f.error.is_none()).count();
    Ok(SkimResponse {
        total_files: files.len(),
        success_count,
        failure_count: files.len() - success_count,
        files,
    })
}

fn cache_key(path: &str, mtime: u64, lang: Language, filter: &FilterSet) -> String {
    match filter.cache_key() {
        Some(f) => format!("{CACHE_PREFIX}{path}:{mtime}:{lang}:{f}"),
        None => format!("{CACHE_PREFIX}{path}:{mtime}:{lang}"),
    }
}

/// Process one file: access check, size gate, budget reservation, cache
/// lookup, transform, pagination. Never panics; failures become the
/// `error` field.
pub(crate) fn process_one(
    inv: &ToolInvocation,
    path: &Path,
    params: &SkimParams,
    ledger: Option<(&MemoryLedger, usize)>,
) -> FileResult {
    let display = path.display().to_string();

    if inv.ct.is_cancelled() {
        return FileResult::failed(display, "operation cancelled".to_string());
    }
    if let Err(denial) = inv.policy.check_file_access(path) {
        return FileResult::failed(
            display,
            format!("access denied [{}]: {}", denial.id, denial.reason),
        );
    }
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => return FileResult::failed(display, format!("cannot stat file: {e}")),
    };
    if metadata.len() > MAX_FILE_SIZE {
        let gate = crate::error::DevToolsError::ResourceGate(format!(
            "file is {} bytes; the per-file limit is {} bytes",
            metadata.len(),
            MAX_FILE_SIZE
        ));
        return FileResult::failed(display, gate.to_string());
    }
    let Some(lang) = Language::from_path(path) else {
        return FileResult::failed(display, "unsupported file type".to_string());
    };

    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    if let Some((ledger, slot)) = ledger {
        if !ledger.try_allocate(slot, MemoryLedger::estimate(metadata.len())) {
            let gate = crate::error::DevToolsError::ResourceGate(
                "batch memory budget exceeded; retry with fewer files".to_string(),
            );
            return FileResult::failed(display, gate.to_string());
        }
        let result = build_result(inv, path, &display, lang, mtime, params, metadata.len());
        ledger.release(slot);
        result
    } else {
        build_result(inv, path, &display, lang, mtime, params, metadata.len())
    }
}

fn build_result(
    inv: &ToolInvocation,
    path: &Path,
    display: &str,
    lang: Language,
    mtime: u64,
    params: &SkimParams,
    original_size: u64,
) -> FileResult {
    let key = cache_key(display, mtime, lang, &params.filter);

    let want_sigil = params.format == SkimFormat::Sigil;
    let (entry, cached): (Arc<CachedSkim>, bool) = match inv.cache.get::<CachedSkim>(&key) {
        Some(hit) if !(want_sigil && hit.sigil.is_none()) => (hit, true),
        _ => match compute(path, display, lang, params, want_sigil) {
            Ok(fresh) => {
                inv.cache.insert(key, fresh.clone());
                (Arc::new(fresh), false)
            }
            Err(e) => return FileResult::failed(display.to_string(), e.to_string()),
        },
    };

    let text = match params.format {
        SkimFormat::Skim => entry.text.as_str(),
        SkimFormat::Sigil => entry.sigil.as_deref().unwrap_or(entry.text.as_str()),
    };

    let page = match paginate(text, params.starting_line, params.max_lines) {
        Ok(page) => page,
        Err(e) => return FileResult::failed(display.to_string(), e.to_string()),
    };

    let reduction_percent = if original_size == 0 {
        0
    } else {
        (100u64.saturating_sub(text.len() as u64 * 100 / original_size)).min(100) as u8
    };

    FileResult {
        path: display.to_string(),
        language: Some(lang.to_string()),
        content: page.content,
        cached,
        truncated: page.truncated,
        total_lines: page.total_lines,
        returned_lines: page.returned_lines,
        next_starting_line: page.next_starting_line,
        reduction_percent,
        total_items: entry.total_items,
        matched_items: entry.matched_items,
        filtered_items: entry.filtered_items,
        error: None,
    }
}

fn compute(
    path: &Path,
    display: &str,
    lang: Language,
    params: &SkimParams,
    want_sigil: bool,
) -> Result<CachedSkim> {
    let source = fs::read_to_string(path)?;
    let transformed = transform::skim_source(&source, lang, &params.filter)?;
    let sigil = if want_sigil {
        let graph = graph::extract_graph(&source, lang)?;
        Some(sigil::format_sigil(display, lang, &graph))
    } else {
        None
    };
    Ok(CachedSkim {
        text: transformed.text,
        total_items: transformed.total_items,
        matched_items: transformed.matched_items,
        filtered_items: transformed.filtered_items,
        sigil,
    })
}

struct Page {
    content: String,
    total_lines: usize,
    returned_lines: usize,
    truncated: bool,
    next_starting_line: Option<usize>,
}

/// Slice `text` by lines. Concatenating consecutive pages reproduces the
/// input byte-for-byte. Line counts refer to the transformed text.
fn paginate(text: &str, starting_line: usize, max_lines: usize) -> Result<Page> {
    use crate::error::DevToolsError;

    if starting_line == 0 {
        return Err(DevToolsError::InvalidInput(
            "starting_line is 1-based".to_string(),
        ));
    }
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let total_lines = lines.len();
    if starting_line > total_lines && !(starting_line == 1 && total_lines == 0) {
        return Err(DevToolsError::InvalidInput(format!(
            "starting_line {starting_line} exceeds total lines {total_lines}"
        )));
    }

    let start = starting_line - 1;
    let end = (start + max_lines).min(total_lines);
    let content: String = lines[start..end].concat();
    let truncated = end < total_lines;
    Ok(Page {
        content,
        total_lines,
        returned_lines: end - start,
        truncated,
        next_starting_line: truncated.then_some(end + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;

    fn test_inv() -> ToolInvocation {
        ToolInvocation::standalone(Arc::new(EnvConfig::default()))
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const PY_SOURCE: &str =
        "def foo(x):\n    return x + 1\n\nclass C:\n    def bar(self):\n        foo(1)\n";

    #[tokio::test]
    async fn test_s1_single_python_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.py", PY_SOURCE);
        let inv = test_inv();

        let response = run(
            &inv,
            SkimRequest {
                source: vec![file.display().to_string()],
                starting_line: None,
                filter: None,
                clear_cache: None,
                format: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.total_files, 1);
        assert_eq!(response.success_count, 1);
        let result = &response.files[0];
        assert_eq!(result.language.as_deref(), Some("python"));
        assert!(result.content.contains("def foo(x):"));
        assert!(result.content.contains("class C:"));
        assert!(result.content.contains("def bar(self):"));
        assert!(!result.content.contains("return x + 1"));
        assert_eq!(result.total_items, 2);
        assert_eq!(result.matched_items, result.total_items);
        assert_eq!(result.filtered_items, 0);
    }

    #[tokio::test]
    async fn test_cache_hit_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.py", PY_SOURCE);
        let inv = test_inv();
        let request = || SkimRequest {
            source: vec![file.display().to_string()],
            starting_line: None,
            filter: None,
            clear_cache: None,
            format: None,
        };

        let first = run(&inv, request()).await.unwrap();
        let second = run(&inv, request()).await.unwrap();

        assert!(!first.files[0].cached);
        assert!(second.files[0].cached, "second request must hit the cache");
        assert_eq!(first.files[0].content, second.files[0].content);
        assert_eq!(first.files[0].total_items, second.files[0].total_items);
        assert_eq!(first.files[0].matched_items, second.files[0].matched_items);
        assert_eq!(
            first.files[0].filtered_items,
            second.files[0].filtered_items
        );
    }

    #[tokio::test]
    async fn test_clear_cache_forces_reprocessing() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.py", PY_SOURCE);
        let inv = test_inv();

        let mk = |clear: bool| SkimRequest {
            source: vec![file.display().to_string()],
            starting_line: None,
            filter: None,
            clear_cache: Some(clear),
            format: None,
        };
        run(&inv, mk(false)).await.unwrap();
        let third = run(&inv, mk(true)).await.unwrap();
        assert!(!third.files[0].cached);
    }

    #[tokio::test]
    async fn test_pagination_round_trip() {
        // Invariant: concatenating consecutive pages reproduces the text.
        let body: String = (0..50).map(|i| format!("def f{i}():\n    pass\n\n")).collect();
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "many.py", &body);
        let inv = test_inv();

        let full = run(
            &inv,
            SkimRequest {
                source: vec![file.display().to_string()],
                starting_line: None,
                filter: None,
                clear_cache: None,
                format: None,
            },
        )
        .await
        .unwrap();
        let full_text = full.files[0].content.clone();

        let mut assembled = String::new();
        let mut start = 1usize;
        loop {
            let transformed = transform::skim_source(
                &fs::read_to_string(&file).unwrap(),
                Language::Python,
                &FilterSet::empty(),
            )
            .unwrap();
            let page = paginate(&transformed.text, start, 17).unwrap();
            assembled.push_str(&page.content);
            match page.next_starting_line {
                Some(next) => start = next,
                None => break,
            }
        }
        assert_eq!(assembled, full_text);
    }

    #[tokio::test]
    async fn test_starting_line_beyond_total_is_per_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.py", PY_SOURCE);
        let inv = test_inv();

        let response = run(
            &inv,
            SkimRequest {
                source: vec![file.display().to_string()],
                starting_line: Some(10_000),
                filter: None,
                clear_cache: None,
                format: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.failure_count, 1);
        let error = response.files[0].error.as_deref().unwrap();
        assert!(error.contains("exceeds total lines"), "got: {error}");
    }

    #[tokio::test]
    async fn test_file_size_gate_boundary() {
        let dir = tempfile::tempdir().unwrap();
        // Exactly at the limit passes; one byte more fails.
        let line = "# padding comment to fill the file with harmless bytes\n";
        let mut at_limit = line.repeat((MAX_FILE_SIZE as usize / line.len()) + 1);
        at_limit.truncate(MAX_FILE_SIZE as usize);
        let ok_file = write_file(&dir, "ok.py", &at_limit);

        let mut over = at_limit.clone();
        over.push('#');
        let big_file = write_file(&dir, "big.py", &over);

        let inv = test_inv();
        let response = run(
            &inv,
            SkimRequest {
                source: vec![ok_file.display().to_string(), big_file.display().to_string()],
                starting_line: None,
                filter: None,
                clear_cache: None,
                format: None,
            },
        )
        .await
        .unwrap();

        assert!(response.files[0].error.is_none(), "at-limit file must pass");
        let error = response.files[1].error.as_deref().unwrap();
        assert!(error.contains("per-file limit"), "got: {error}");
    }

    #[tokio::test]
    async fn test_batch_results_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["z.py", "a.py", "m.py"];
        let mut sources = Vec::new();
        for name in names {
            sources.push(write_file(&dir, name, "def f():\n    pass\n").display().to_string());
        }
        let inv = test_inv();
        let response = run(
            &inv,
            SkimRequest {
                source: sources.clone(),
                starting_line: None,
                filter: None,
                clear_cache: None,
                format: None,
            },
        )
        .await
        .unwrap();
        let got: Vec<&str> = response.files.iter().map(|f| f.path.as_str()).collect();
        let want: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn test_sigil_format() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.py", PY_SOURCE);
        let inv = test_inv();

        let response = run(
            &inv,
            SkimRequest {
                source: vec![file.display().to_string()],
                starting_line: None,
                filter: None,
                clear_cache: None,
                format: Some(SkimFormat::Sigil),
            },
        )
        .await
        .unwrap();
        let content = &response.files[0].content;
        assert!(content.starts_with("# "), "sigil header: {content}");
        assert!(content.contains("$C"));
        assert!(content.contains("  #bar()"));
    }

    #[tokio::test]
    async fn test_unsupported_file_is_per_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "data.csv", "a,b\n1,2\n");
        let py = write_file(&dir, "a.py", PY_SOURCE);
        let inv = test_inv();

        let response = run(
            &inv,
            SkimRequest {
                source: vec![file.display().to_string(), py.display().to_string()],
                starting_line: None,
                filter: None,
                clear_cache: None,
                format: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.success_count, 1);
        assert!(
            response.files[0]
                .error
                .as_deref()
                .unwrap()
                .contains("unsupported file type")
        );
    }

    #[test]
    fn test_paginate_empty_text() {
        let page = paginate("", 1, 100).unwrap();
        assert_eq!(page.total_lines, 0);
        assert_eq!(page.returned_lines, 0);
        assert!(!page.truncated);
    }

    #[test]
    fn test_cache_key_includes_filter() {
        let plain = cache_key("/a.py", 5, Language::Python, &FilterSet::empty());
        let filtered = cache_key(
            "/a.py",
            5,
            Language::Python,
            &FilterSet::new(&["x*".to_string()]).unwrap(),
        );
        assert_eq!(plain, "codeskim:/a.py:5:python");
        assert_eq!(filtered, "codeskim:/a.py:5:python:x*");
    }
}
