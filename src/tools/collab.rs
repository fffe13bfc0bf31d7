// src/tools/collab.rs
// Cross-agent collaboration tools backed by the shared mailbox

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::collab::{Mailbox, MessageType, SessionStatus, resolve_participant};
use crate::registry::{
    Tool, ToolAnnotations, ToolDefinition, ToolInvocation, decode_args, schema_for,
};

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CollabFunction {
    CreateSession,
    JoinSession,
    PostMessage,
    CheckMessages,
    ReadSession,
    ListSessions,
    CloseSession,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CollabRequest {
    /// Operation to perform
    pub function: CollabFunction,
    /// Session UUID (all functions except create_session and list_sessions)
    pub session_id: Option<String>,
    /// Session topic (create_session)
    pub topic: Option<String>,
    /// Your agent name; auto-detected from the workspace when omitted
    pub name: Option<String>,
    /// Message body (post_message)
    pub content: Option<String>,
    /// Message type (post_message): feature_request, implementation_summary,
    /// question, feedback, bug_report, api_change, general
    pub message_type: Option<MessageType>,
    /// Status filter (list_sessions): active or closed
    pub status: Option<SessionStatus>,
    /// Closing summary (close_session)
    pub summary: Option<String>,
}

pub struct CollabTool {
    mailbox: Arc<Mailbox>,
}

impl CollabTool {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }
}

fn require<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, String> {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| format!("{what} is required"))
}

#[async_trait]
impl Tool for CollabTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "collab",
            description: "Collaborate with other agents through shared sessions: \
                          create_session, join_session, post_message, check_messages, \
                          read_session, list_sessions, close_session. Sessions persist on \
                          disk and are shared across processes."
                .to_string(),
            input_schema: schema_for::<CollabRequest>(),
            annotations: ToolAnnotations {
                read_only: false,
                destructive: false,
                idempotent: false,
                open_world: false,
            },
        }
    }

    async fn execute(
        &self,
        inv: &ToolInvocation,
        args: Map<String, Value>,
    ) -> Result<String, String> {
        let request: CollabRequest = decode_args(args)?;
        let participant =
            resolve_participant(request.name.as_deref(), inv.workspace_root.as_deref())
                .map_err(|e| e.to_string())?;

        let result = match request.function {
            CollabFunction::CreateSession => {
                let topic = require(&request.topic, "topic")?;
                let session = self
                    .mailbox
                    .create_session(topic, &participant)
                    .await
                    .map_err(|e| e.to_string())?;
                json!({ "session": session })
            }
            CollabFunction::JoinSession => {
                let id = require(&request.session_id, "session_id")?;
                let (session, messages) = self
                    .mailbox
                    .join_session(id, &participant)
                    .await
                    .map_err(|e| e.to_string())?;
                json!({ "session": session, "messages": messages })
            }
            CollabFunction::PostMessage => {
                let id = require(&request.session_id, "session_id")?;
                let content = require(&request.content, "content")?;
                let message_type = request.message_type.unwrap_or(MessageType::General);
                let message = self
                    .mailbox
                    .post(id, &participant, message_type, content)
                    .await
                    .map_err(|e| e.to_string())?;
                json!({ "message": message })
            }
            CollabFunction::CheckMessages => {
                let id = require(&request.session_id, "session_id")?;
                let messages = self
                    .mailbox
                    .check(id, &participant)
                    .await
                    .map_err(|e| e.to_string())?;
                json!({ "has_new": !messages.is_empty(), "new_messages": messages })
            }
            CollabFunction::ReadSession => {
                let id = require(&request.session_id, "session_id")?;
                let (session, messages) = self
                    .mailbox
                    .read_all(id)
                    .await
                    .map_err(|e| e.to_string())?;
                json!({ "session": session, "messages": messages })
            }
            CollabFunction::ListSessions => {
                let sessions = self
                    .mailbox
                    .list_sessions(request.status)
                    .await
                    .map_err(|e| e.to_string())?;
                json!({ "sessions": sessions })
            }
            CollabFunction::CloseSession => {
                let id = require(&request.session_id, "session_id")?;
                let session = self
                    .mailbox
                    .close(id, request.summary.as_deref())
                    .await
                    .map_err(|e| e.to_string())?;
                json!({ "session": session })
            }
        };
        serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
    }

    fn extended_help(&self) -> Option<String> {
        Some(
            "Examples:\n\
             {\"function\": \"create_session\", \"topic\": \"Add streaming\", \"name\": \"alpha\"}\n\
             {\"function\": \"join_session\", \"session_id\": \"<uuid>\", \"name\": \"beta\"}\n\
             {\"function\": \"post_message\", \"session_id\": \"<uuid>\", \"name\": \"beta\", \
             \"content\": \"ready for review\", \"message_type\": \"implementation_summary\"}\n\
             {\"function\": \"check_messages\", \"session_id\": \"<uuid>\", \"name\": \"alpha\"}\n\
             Use collab_wait to block until a session receives new messages."
                .to_string(),
        )
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CollabWaitRequest {
    /// Session UUID to watch
    pub session_id: String,
    /// Give up after this many seconds (default 600, max 3600)
    pub timeout_seconds: Option<u64>,
    /// Seconds between polls (default from COLLAB_POLL_INTERVAL, clamped 5-300)
    pub poll_seconds: Option<u64>,
    /// Your agent name; unread messages for you return immediately
    pub name: Option<String>,
}

pub struct CollabWaitTool {
    mailbox: Arc<Mailbox>,
}

impl CollabWaitTool {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }
}

#[async_trait]
impl Tool for CollabWaitTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "collab_wait",
            description: "Block until a collaboration session receives new messages or the \
                          timeout elapses. Returns {status: new_messages|timeout, new_count}."
                .to_string(),
            input_schema: schema_for::<CollabWaitRequest>(),
            annotations: ToolAnnotations::read_only(),
        }
    }

    async fn execute(
        &self,
        inv: &ToolInvocation,
        args: Map<String, Value>,
    ) -> Result<String, String> {
        let request: CollabWaitRequest = decode_args(args)?;
        let poll = request
            .poll_seconds
            .map(|s| {
                std::time::Duration::from_secs(
                    s.clamp(crate::config::MIN_POLL_SECS, crate::config::MAX_POLL_SECS),
                )
            })
            .unwrap_or(inv.config.collab_poll_interval);

        let outcome = self
            .mailbox
            .wait(
                &request.session_id,
                request.timeout_seconds,
                poll,
                request.name.as_deref(),
                &inv.ct,
            )
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&outcome).map_err(|e| e.to_string())
    }
}
