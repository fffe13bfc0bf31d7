// src/collab/store.rs
// Filesystem-backed session store with advisory locking and atomic writes

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::*;
use crate::error::{DevToolsError, Result};
use crate::state::{create_private_dir, restrict_file_mode};

/// Wait defaults and bounds (seconds).
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 600;
pub const MAX_WAIT_TIMEOUT_SECS: u64 = 3_600;

static PARTICIPANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9._-]*$").unwrap_or_else(|_| unreachable!("static regex"))
});

/// Trim, lowercase, and validate a participant name.
pub fn normalize_participant(name: &str) -> Result<String> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() || normalized.len() > MAX_PARTICIPANT_LEN {
        return Err(DevToolsError::InvalidInput(format!(
            "participant name must be 1-{MAX_PARTICIPANT_LEN} characters"
        )));
    }
    if !PARTICIPANT_RE.is_match(&normalized) {
        return Err(DevToolsError::InvalidInput(format!(
            "invalid participant name {name:?}: use lowercase letters, digits, '.', '_', '-'"
        )));
    }
    Ok(normalized)
}

/// Resolve the acting participant: an explicit name must validate; otherwise
/// derive one from the transport's workspace root, falling back to "agent".
pub fn resolve_participant(explicit: Option<&str>, workspace_root: Option<&str>) -> Result<String> {
    if let Some(name) = explicit {
        return normalize_participant(name);
    }
    if let Some(root) = workspace_root {
        let basename = Path::new(root.trim_end_matches('/'))
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().replace(' ', "-"));
        if let Some(candidate) = basename
            && PARTICIPANT_RE.is_match(&candidate)
            && candidate.len() <= MAX_PARTICIPANT_LEN
        {
            return Ok(candidate);
        }
    }
    Ok("agent".to_string())
}

fn validate_session_id(id: &str) -> Result<Uuid> {
    // UUID parsing doubles as a path-traversal guard for the directory name.
    Uuid::parse_str(id)
        .map_err(|_| DevToolsError::InvalidInput(format!("invalid session id: {id:?}")))
}

fn cap_length(value: &str, max: usize, what: &str) -> Result<()> {
    if value.len() > max {
        return Err(DevToolsError::InvalidInput(format!(
            "{what} exceeds {max} characters"
        )));
    }
    Ok(())
}

/// Advisory lock on `session.json.lock`. Shared for reads, exclusive for
/// mutations; released on drop.
struct SessionLock {
    file: fs::File,
}

impl SessionLock {
    fn exclusive(lock_path: &Path) -> Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    fn shared(lock_path: &Path) -> Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;
        file.lock_shared()?;
        Ok(Self { file })
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Cross-agent collaboration mailbox. Safe across processes (advisory file
/// locks + atomic renames) and within one process (a local async mutex per
/// session keeps two tasks from fighting over the advisory lock).
pub struct Mailbox {
    base_dir: PathBuf,
    local_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Mailbox {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            local_locks: Mutex::new(HashMap::new()),
        }
    }

    fn sessions_dir(&self) -> PathBuf {
        self.base_dir.join("sessions")
    }

    fn session_dir(&self, id: &str) -> PathBuf {
        self.sessions_dir().join(id)
    }

    fn session_file(&self, id: &str) -> PathBuf {
        self.session_dir(id).join("session.json")
    }

    fn lock_file(&self, id: &str) -> PathBuf {
        self.session_dir(id).join("session.json.lock")
    }

    fn message_file(&self, id: &str, message_id: u64) -> PathBuf {
        self.session_dir(id).join(format!("msg-{message_id:03}.json"))
    }

    /// Friendly not-found error before any lock file gets created.
    fn ensure_session_exists(&self, id: &str) -> Result<()> {
        if self.session_file(id).is_file() {
            Ok(())
        } else {
            Err(DevToolsError::InvalidInput(format!(
                "session {id} not found"
            )))
        }
    }

    async fn local_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.local_locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // === Operations ===

    pub async fn create_session(&self, topic: &str, participant: &str) -> Result<Session> {
        cap_length(topic, MAX_TOPIC_LEN, "topic")?;
        let participant = normalize_participant(participant)?;

        let id = Uuid::new_v4().to_string();
        let dir = self.session_dir(&id);
        create_private_dir(&dir)?;

        let now = chrono::Utc::now();
        let mut participants = std::collections::BTreeMap::new();
        participants.insert(
            participant.clone(),
            Participant {
                joined_at: now,
                last_read: 0,
            },
        );
        let session = Session {
            id: id.clone(),
            topic: topic.to_string(),
            status: SessionStatus::Active,
            participants,
            created_by: participant,
            created_at: now,
            updated_at: now,
            message_count: 0,
            summary: None,
        };

        let local = self.local_lock(&id).await;
        let _guard = local.lock().await;
        let _file_lock = SessionLock::exclusive(&self.lock_file(&id))?;
        write_json_atomic(&self.session_file(&id), &session)?;
        debug!(session = %id, "collab session created");
        Ok(session)
    }

    pub async fn join_session(
        &self,
        id: &str,
        participant: &str,
    ) -> Result<(Session, Vec<Message>)> {
        validate_session_id(id)?;
        self.ensure_session_exists(id)?;
        let participant = normalize_participant(participant)?;

        let local = self.local_lock(id).await;
        let _guard = local.lock().await;
        let _file_lock = SessionLock::exclusive(&self.lock_file(id))?;

        let mut session = self.read_session_locked(id)?;
        if session.status == SessionStatus::Closed {
            return Err(DevToolsError::InvalidInput(format!(
                "session {id} is closed"
            )));
        }
        if !session.is_participant(&participant) {
            session.participants.insert(
                participant,
                Participant {
                    joined_at: chrono::Utc::now(),
                    last_read: 0,
                },
            );
            session.updated_at = chrono::Utc::now();
            write_json_atomic(&self.session_file(id), &session)?;
        }
        let messages = self.read_message_range(id, 1, session.message_count);
        Ok((session, messages))
    }

    pub async fn post(
        &self,
        id: &str,
        from: &str,
        message_type: MessageType,
        content: &str,
    ) -> Result<Message> {
        validate_session_id(id)?;
        self.ensure_session_exists(id)?;
        cap_length(content, MAX_CONTENT_LEN, "content")?;
        let from = normalize_participant(from)?;

        let local = self.local_lock(id).await;
        let _guard = local.lock().await;
        let _file_lock = SessionLock::exclusive(&self.lock_file(id))?;

        let mut session = self.read_session_locked(id)?;
        if session.status == SessionStatus::Closed {
            return Err(DevToolsError::InvalidInput(format!(
                "session {id} is closed"
            )));
        }
        if !session.is_participant(&from) {
            return Err(DevToolsError::InvalidInput(format!(
                "{from} has not joined session {id}"
            )));
        }

        // The id is derived under the exclusive lock, so the message file
        // exists before any reader can observe the bumped count.
        let message = Message {
            id: session.message_count + 1,
            from,
            message_type,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        };
        write_json_atomic(&self.message_file(id, message.id), &message)?;

        session.message_count = message.id;
        session.updated_at = message.created_at;
        write_json_atomic(&self.session_file(id), &session)?;

        // Best-effort notification; correctness never depends on it.
        debug!(session = %id, message = message.id, "collab message posted");
        Ok(message)
    }

    /// New messages for a participant since their cursor, advancing it.
    /// Callers who never joined may read but the cursor stays untouched.
    pub async fn check(&self, id: &str, participant: &str) -> Result<Vec<Message>> {
        validate_session_id(id)?;
        self.ensure_session_exists(id)?;
        let participant = normalize_participant(participant)?;

        let local = self.local_lock(id).await;
        let _guard = local.lock().await;
        let _file_lock = SessionLock::exclusive(&self.lock_file(id))?;

        let mut session = self.read_session_locked(id)?;
        let count = session.message_count;
        match session.participants.get_mut(&participant) {
            Some(state) => {
                let from = state.last_read + 1;
                let messages = self.read_message_range(id, from, count);
                if state.last_read < count {
                    state.last_read = count;
                    write_json_atomic(&self.session_file(id), &session)?;
                }
                Ok(messages)
            }
            None => Ok(self.read_message_range(id, 1, count)),
        }
    }

    pub async fn read_all(&self, id: &str) -> Result<(Session, Vec<Message>)> {
        validate_session_id(id)?;
        self.ensure_session_exists(id)?;
        let local = self.local_lock(id).await;
        let _guard = local.lock().await;
        let _file_lock = SessionLock::shared(&self.lock_file(id))?;
        let session = self.read_session_locked(id)?;
        let messages = self.read_message_range(id, 1, session.message_count);
        Ok((session, messages))
    }

    pub async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<SessionSummary>> {
        let sessions_dir = self.sessions_dir();
        let entries = match fs::read_dir(&sessions_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };

        let mut summaries = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if Uuid::parse_str(&name).is_err() {
                continue;
            }
            let _file_lock = match SessionLock::shared(&self.lock_file(&name)) {
                Ok(lock) => lock,
                Err(_) => continue,
            };
            match self.read_session_locked(&name) {
                Ok(session) => {
                    if status.is_none_or(|s| s == session.status) {
                        summaries.push(SessionSummary::from(&session));
                    }
                }
                Err(e) => warn!(session = %name, error = %e, "unreadable session skipped"),
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    pub async fn close(&self, id: &str, summary: Option<&str>) -> Result<Session> {
        validate_session_id(id)?;
        self.ensure_session_exists(id)?;
        if let Some(summary) = summary {
            cap_length(summary, MAX_SUMMARY_LEN, "summary")?;
        }

        let local = self.local_lock(id).await;
        let _guard = local.lock().await;
        let _file_lock = SessionLock::exclusive(&self.lock_file(id))?;

        let mut session = self.read_session_locked(id)?;
        session.status = SessionStatus::Closed;
        session.summary = summary.map(str::to_string);
        session.updated_at = chrono::Utc::now();
        write_json_atomic(&self.session_file(id), &session)?;
        Ok(session)
    }

    /// Block until the session has messages beyond the baseline recorded at
    /// entry, or the timeout elapses. A participant with unread messages
    /// returns immediately.
    pub async fn wait(
        &self,
        id: &str,
        timeout_secs: Option<u64>,
        poll: Duration,
        participant: Option<&str>,
        ct: &CancellationToken,
    ) -> Result<WaitOutcome> {
        validate_session_id(id)?;
        self.ensure_session_exists(id)?;
        let timeout = Duration::from_secs(
            timeout_secs
                .unwrap_or(DEFAULT_WAIT_TIMEOUT_SECS)
                .min(MAX_WAIT_TIMEOUT_SECS),
        );

        let baseline = {
            let (session, _) = self.read_all(id).await?;
            if let Some(name) = participant {
                let name = normalize_participant(name)?;
                if let Some(state) = session.participants.get(&name)
                    && session.message_count > state.last_read
                {
                    return Ok(WaitOutcome {
                        status: WaitStatus::NewMessages,
                        new_count: session.message_count - state.last_read,
                    });
                }
            }
            session.message_count
        };

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(WaitOutcome {
                    status: WaitStatus::Timeout,
                    new_count: 0,
                });
            }
            tokio::select! {
                _ = ct.cancelled() => return Err(DevToolsError::Cancelled),
                _ = tokio::time::sleep(poll.min(remaining)) => {}
            }
            let (session, _) = self.read_all(id).await?;
            if session.message_count > baseline {
                return Ok(WaitOutcome {
                    status: WaitStatus::NewMessages,
                    new_count: session.message_count - baseline,
                });
            }
        }
    }

    // === Internals (call with the session lock held) ===

    fn read_session_locked(&self, id: &str) -> Result<Session> {
        let raw = fs::read_to_string(self.session_file(id))
            .map_err(|_| DevToolsError::InvalidInput(format!("session {id} not found")))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read messages `from..=to`. Gaps cannot occur under the locking
    /// discipline, but a missing file is logged and skipped rather than
    /// failing the read.
    fn read_message_range(&self, id: &str, from: u64, to: u64) -> Vec<Message> {
        let mut messages = Vec::new();
        for message_id in from..=to {
            let path = self.message_file(id, message_id);
            match fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(message) => messages.push(message),
                    Err(e) => warn!(path = %path.display(), error = %e, "corrupt message skipped"),
                },
                Err(e) => warn!(path = %path.display(), error = %e, "missing message skipped"),
            }
        }
        messages
    }
}

/// Write JSON to a `.tmp-*` sibling, restrict to 0600, fsync, and rename
/// into place so readers never observe a partial file.
fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| DevToolsError::Other(format!("no parent for {}", path.display())))?;
    let tmp = parent.join(format!(
        ".tmp-{}-{}",
        std::process::id(),
        Uuid::new_v4().simple()
    ));
    {
        let file = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&file, value)?;
        file.sync_all()?;
    }
    restrict_file_mode(&tmp)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
