// ABOUTME: Outbound commands sent from the client back to the backend
// ABOUTME: user-input, cancel-request, and user-consent with their wire shapes

use serde::{Deserialize, Serialize};

use crate::event::TurnId;

/// Answer to a pending tool approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consent {
    Granted,
    Denied,
}

/// `metaData` block attached to a user-input command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMetadata {
    pub mode: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Commands emitted toward the backend, serialized as `{command, payload}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "kebab-case")]
pub enum OutboundCommand {
    UserInput {
        message: String,
        #[serde(rename = "metaData")]
        meta_data: InputMetadata,
    },
    CancelRequest {
        #[serde(rename = "requestId")]
        request_id: TurnId,
        #[serde(rename = "threadId", default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },
    UserConsent {
        message: Consent,
    },
}

impl OutboundCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserInput { .. } => "user-input",
            Self::CancelRequest { .. } => "cancel-request",
            Self::UserConsent { .. } => "user-consent",
        }
    }
}
