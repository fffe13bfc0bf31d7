// src/skim/batch.rs
// Bounded worker pool with a hard batch memory budget

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tracing::warn;

use super::{FileResult, SkimParams, process_one};
use crate::registry::ToolInvocation;

/// Per-file size gate: files larger than this are rejected.
pub const MAX_FILE_SIZE: u64 = 500 * 1024;

/// Upper bound on estimated memory across all in-flight workers.
pub const MAX_BATCH_MEMORY: u64 = 4 * 1024 * 1024 * 1024;

/// Estimated working memory per file: source bytes, AST, and output.
pub const MEMORY_FACTOR: u64 = 3;

const MAX_WORKERS: usize = 10;

/// In-flight allocation table. Check-and-allocate is one critical section so
/// the budget is a hard upper limit, not a race-loose average.
pub struct MemoryLedger {
    allocations: Mutex<HashMap<usize, u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            allocations: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve `bytes` for worker `slot`. Returns false when the reservation
    /// would push the batch over [`MAX_BATCH_MEMORY`].
    pub fn try_allocate(&self, slot: usize, bytes: u64) -> bool {
        let Ok(mut allocations) = self.allocations.lock() else {
            return false;
        };
        let in_use: u64 = allocations.values().sum();
        if in_use.saturating_add(bytes) > MAX_BATCH_MEMORY {
            return false;
        }
        allocations.insert(slot, bytes);
        true
    }

    pub fn release(&self, slot: usize) {
        if let Ok(mut allocations) = self.allocations.lock() {
            allocations.remove(&slot);
        }
    }

    /// Estimated bytes a file of `size` needs while being processed.
    pub fn estimate(size: u64) -> u64 {
        size.saturating_mul(MEMORY_FACTOR)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Process a batch. A single file runs inline; larger batches fan out over
/// `min(N, 10)` workers. Results keep the input-path order regardless of
/// completion order.
pub async fn process_files(
    inv: &ToolInvocation,
    paths: Vec<PathBuf>,
    params: Arc<SkimParams>,
) -> Vec<FileResult> {
    if paths.len() == 1 {
        let path = &paths[0];
        return vec![process_one(inv, path, &params, None)];
    }

    let ledger = Arc::new(MemoryLedger::new());
    let semaphore = Arc::new(Semaphore::new(paths.len().min(MAX_WORKERS)));
    let mut handles = Vec::with_capacity(paths.len());

    for (slot, path) in paths.iter().cloned().enumerate() {
        let inv = inv.clone();
        let params = params.clone();
        let ledger = ledger.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = tokio::task::spawn_blocking(move || {
                process_one(&inv, &path, &params, Some((ledger.as_ref(), slot)))
            })
            .await;
            (slot, result)
        }));
    }

    let mut results: Vec<Option<FileResult>> = (0..paths.len()).map(|_| None).collect();
    for outcome in futures::future::join_all(handles).await {
        match outcome {
            Ok((slot, Ok(result))) => results[slot] = Some(result),
            Ok((slot, Err(e))) => {
                warn!(error = %e, "skim worker panicked");
                results[slot] = Some(FileResult::failed(
                    paths[slot].display().to_string(),
                    format!("internal worker failure: {e}"),
                ));
            }
            Err(e) => warn!(error = %e, "skim task join failed"),
        }
    }

    results
        .into_iter()
        .enumerate()
        .map(|(slot, result)| {
            result.unwrap_or_else(|| {
                FileResult::failed(
                    paths[slot].display().to_string(),
                    "worker produced no result".to_string(),
                )
            })
        })
        .collect()
}
