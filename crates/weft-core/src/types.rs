// ABOUTME: Domain types for the reducer: messages, timeline blocks, actions, approvals
// ABOUTME: Serializable so frozen snapshots can be handed to a renderer as-is

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use weft_proto::ActivityKind;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle shared by thinking blocks, plans, and actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Completed,
    Failed,
}

impl Status {
    pub fn is_active(self) -> bool {
        self == Status::Active
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub is_streaming: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_snapshot: Option<Timeline>,
}

impl Message {
    pub fn user(content: String) -> Self {
        Self {
            id: new_id("user"),
            role: Role::User,
            content,
            is_streaming: false,
            timestamp: Utc::now(),
            timeline_snapshot: None,
        }
    }

    pub fn assistant(content: String) -> Self {
        Self {
            id: new_id("assistant"),
            role: Role::Assistant,
            content,
            is_streaming: false,
            timestamp: Utc::now(),
            timeline_snapshot: None,
        }
    }

    /// Empty assistant message that chunks will be appended to
    pub fn streaming() -> Self {
        Self {
            id: new_id("stream"),
            is_streaming: true,
            ..Self::assistant(String::new())
        }
    }
}

/// The model's reasoning phase; at most one per turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub content: String,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
}

/// The announced plan; later planning events replace it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBlock {
    pub raw: String,
    pub steps: Vec<String>,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
}

/// What produced an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Tool,
    Decision,
    Reading,
    Searching,
    Reviewing,
    Analyzing,
    Executing,
    Working,
    Summarizing,
}

impl From<ActivityKind> for ActionKind {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Decision => ActionKind::Decision,
            ActivityKind::Reading => ActionKind::Reading,
            ActivityKind::Searching => ActionKind::Searching,
            ActivityKind::Reviewing => ActionKind::Reviewing,
            ActivityKind::Analyzing => ActionKind::Analyzing,
            ActivityKind::Executing => ActionKind::Executing,
            ActivityKind::Working => ActionKind::Working,
        }
    }
}

/// One unit of agent activity with a status lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_output: Option<String>,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl Action {
    pub fn new(kind: ActionKind, label: String) -> Self {
        Self {
            id: new_id("action"),
            kind,
            label,
            detail: None,
            result: None,
            tool_name: None,
            terminal_output: None,
            status: Status::Active,
            timestamp: Utc::now(),
            duration_ms: None,
            progress: None,
        }
    }

    /// Whether terminal output should stream into this action
    pub fn runs_command(&self) -> bool {
        match self.kind {
            ActionKind::Executing => true,
            ActionKind::Tool => self.tool_name.as_deref().is_some_and(is_command_tool),
            _ => false,
        }
    }
}

fn is_command_tool(name: &str) -> bool {
    const MARKERS: [&str; 5] = ["command", "terminal", "shell", "bash", "exec"];
    let name = name.to_ascii_lowercase();
    MARKERS.iter().any(|m| name.contains(m))
}

/// Closing summary of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub summary: String,
}

/// Structured record of one turn's agent activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanBlock>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub summarizing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TurnResult>,
}

/// A tool call waiting on the user's go-ahead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}
