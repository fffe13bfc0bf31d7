// src/collab/types.rs
// On-disk session and message schemas. These are an external contract:
// other processes sharing the base directory read the same JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Length caps enforced at the API boundary.
pub const MAX_TOPIC_LEN: usize = 500;
pub const MAX_CONTENT_LEN: usize = 100_000;
pub const MAX_SUMMARY_LEN: usize = 2_000;
pub const MAX_PARTICIPANT_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    FeatureRequest,
    ImplementationSummary,
    Question,
    Feedback,
    BugReport,
    ApiChange,
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub joined_at: DateTime<Utc>,
    /// Highest message id this participant has read. Never exceeds the
    /// session's `message_count`.
    pub last_read: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub topic: String,
    pub status: SessionStatus,
    /// Participant name -> read state. BTreeMap keeps the on-disk order stable.
    pub participants: BTreeMap<String, Participant>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Session {
    pub fn is_participant(&self, name: &str) -> bool {
        self.participants.contains_key(name)
    }
}

/// Immutable once written; ids are contiguous from 1 to `message_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub from: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Listing entry, sorted by `updated_at` descending.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub topic: String,
    pub status: SessionStatus,
    pub participants: Vec<String>,
    pub message_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            topic: session.topic.clone(),
            status: session.status,
            participants: session.participants.keys().cloned().collect(),
            message_count: session.message_count,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStatus {
    NewMessages,
    Timeout,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitOutcome {
    pub status: WaitStatus,
    pub new_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_snake_case() {
        let json = serde_json::to_string(&MessageType::BugReport).unwrap();
        assert_eq!(json, "\"bug_report\"");
        let back: MessageType = serde_json::from_str("\"api_change\"").unwrap();
        assert_eq!(back, MessageType::ApiChange);
    }

    #[test]
    fn test_status_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Active).unwrap(),
            "\"active\""
        );
    }

    #[test]
    fn test_message_type_field_renamed() {
        let message = Message {
            id: 1,
            from: "alpha".to_string(),
            message_type: MessageType::Question,
            content: "hi".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "question");
    }
}
