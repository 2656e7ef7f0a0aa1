// ABOUTME: Canonical event union produced by the decoder
// ABOUTME: TurnId, EventKind, activity kinds, tool outcomes, and metadata status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier the backend assigns to each conversational request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(String);

impl TurnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TurnId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TurnId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The closed set of event names this client understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StreamStart,
    StreamChunk,
    StreamEnd,
    StreamError,
    ToolStart,
    ToolEnd,
    ToolProgress,
    Planning,
    Summarizing,
    ThinkingStart,
    ThinkingUpdate,
    ThinkingEnd,
    Decision,
    Reading,
    Searching,
    Reviewing,
    Analyzing,
    Executing,
    Working,
    TerminalOutput,
    Metadata,
    BotResponse,
}

impl EventKind {
    /// Look up a wire name. Snake-case spellings are accepted alongside kebab-case.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim().replace('_', "-").as_str() {
            "stream-start" => Self::StreamStart,
            "stream-chunk" => Self::StreamChunk,
            "stream-end" => Self::StreamEnd,
            "stream-error" => Self::StreamError,
            "tool-start" => Self::ToolStart,
            "tool-end" => Self::ToolEnd,
            "tool-progress" => Self::ToolProgress,
            "planning" => Self::Planning,
            "summarizing" => Self::Summarizing,
            "thinking-start" => Self::ThinkingStart,
            "thinking-update" => Self::ThinkingUpdate,
            "thinking-end" => Self::ThinkingEnd,
            "decision" => Self::Decision,
            "reading" => Self::Reading,
            "searching" => Self::Searching,
            "reviewing" => Self::Reviewing,
            "analyzing" => Self::Analyzing,
            "executing" => Self::Executing,
            "working" => Self::Working,
            "terminal-output" => Self::TerminalOutput,
            "metadata" => Self::Metadata,
            "bot-response" => Self::BotResponse,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StreamStart => "stream-start",
            Self::StreamChunk => "stream-chunk",
            Self::StreamEnd => "stream-end",
            Self::StreamError => "stream-error",
            Self::ToolStart => "tool-start",
            Self::ToolEnd => "tool-end",
            Self::ToolProgress => "tool-progress",
            Self::Planning => "planning",
            Self::Summarizing => "summarizing",
            Self::ThinkingStart => "thinking-start",
            Self::ThinkingUpdate => "thinking-update",
            Self::ThinkingEnd => "thinking-end",
            Self::Decision => "decision",
            Self::Reading => "reading",
            Self::Searching => "searching",
            Self::Reviewing => "reviewing",
            Self::Analyzing => "analyzing",
            Self::Executing => "executing",
            Self::Working => "working",
            Self::TerminalOutput => "terminal-output",
            Self::Metadata => "metadata",
            Self::BotResponse => "bot-response",
        }
    }
}

/// Narrated agent phases that all become timeline actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Decision,
    Reading,
    Searching,
    Reviewing,
    Analyzing,
    Executing,
    Working,
}

impl ActivityKind {
    /// Label shown when the backend sends none
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Decision => "Deciding",
            Self::Reading => "Reading",
            Self::Searching => "Searching",
            Self::Reviewing => "Reviewing",
            Self::Analyzing => "Analyzing",
            Self::Executing => "Executing",
            Self::Working => "Working",
        }
    }
}

/// How a tool invocation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutcome {
    Completed,
    Failed,
}

/// Interrupt state carried by a metadata event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStatus {
    InterruptWaiting,
    InterruptApproved,
    Other(String),
}

impl MetadataStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "interrupt_waiting" => Self::InterruptWaiting,
            "interrupt_approved" => Self::InterruptApproved,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Payload of a metadata event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub status: Option<MetadataStatus>,
    pub tool_name: Option<String>,
    pub description: Option<String>,
    pub thread_id: Option<String>,
}

/// A decoded, normalized protocol event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StreamStart {
        turn_id: TurnId,
    },
    StreamChunk {
        turn_id: Option<TurnId>,
        delta: String,
        accumulated: Option<String>,
    },
    StreamEnd {
        turn_id: Option<TurnId>,
        content: Option<String>,
    },
    StreamError {
        turn_id: Option<TurnId>,
        error: String,
    },
    ToolStart {
        tool_id: Option<String>,
        tool_name: String,
        detail: Option<String>,
    },
    ToolEnd {
        tool_id: Option<String>,
        tool_name: Option<String>,
        outcome: ToolOutcome,
        result: Option<String>,
        duration_ms: Option<u64>,
    },
    ToolProgress {
        tool_id: Option<String>,
        tool_name: Option<String>,
        detail: Option<String>,
        progress: Option<f64>,
    },
    Planning {
        content: String,
    },
    Summarizing,
    ThinkingStart {
        content: Option<String>,
    },
    ThinkingUpdate {
        content: String,
    },
    ThinkingEnd {
        content: Option<String>,
    },
    Activity {
        kind: ActivityKind,
        label: Option<String>,
        detail: Option<String>,
    },
    TerminalOutput {
        output: String,
    },
    Metadata(Metadata),
    /// Non-streaming reply from backends that predate stream events
    BotResponse {
        content: String,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StreamStart { .. } => EventKind::StreamStart,
            Self::StreamChunk { .. } => EventKind::StreamChunk,
            Self::StreamEnd { .. } => EventKind::StreamEnd,
            Self::StreamError { .. } => EventKind::StreamError,
            Self::ToolStart { .. } => EventKind::ToolStart,
            Self::ToolEnd { .. } => EventKind::ToolEnd,
            Self::ToolProgress { .. } => EventKind::ToolProgress,
            Self::Planning { .. } => EventKind::Planning,
            Self::Summarizing => EventKind::Summarizing,
            Self::ThinkingStart { .. } => EventKind::ThinkingStart,
            Self::ThinkingUpdate { .. } => EventKind::ThinkingUpdate,
            Self::ThinkingEnd { .. } => EventKind::ThinkingEnd,
            Self::Activity { kind, .. } => match kind {
                ActivityKind::Decision => EventKind::Decision,
                ActivityKind::Reading => EventKind::Reading,
                ActivityKind::Searching => EventKind::Searching,
                ActivityKind::Reviewing => EventKind::Reviewing,
                ActivityKind::Analyzing => EventKind::Analyzing,
                ActivityKind::Executing => EventKind::Executing,
                ActivityKind::Working => EventKind::Working,
            },
            Self::TerminalOutput { .. } => EventKind::TerminalOutput,
            Self::Metadata(_) => EventKind::Metadata,
            Self::BotResponse { .. } => EventKind::BotResponse,
        }
    }

    /// Turn id carried by stream lifecycle events, if any
    pub fn turn_id(&self) -> Option<&TurnId> {
        match self {
            Self::StreamStart { turn_id } => Some(turn_id),
            Self::StreamChunk { turn_id, .. }
            | Self::StreamEnd { turn_id, .. }
            | Self::StreamError { turn_id, .. } => turn_id.as_ref(),
            _ => None,
        }
    }
}
