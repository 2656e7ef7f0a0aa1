// ABOUTME: Error types for weft-core
// ABOUTME: Caller-facing refusals; inbound protocol faults never surface here

use thiserror::Error;
use weft_proto::ProtoError;

/// Errors returned to callers of the chat state and session
#[derive(Debug, Error)]
pub enum WeftError {
    #[error("A request is already in flight")]
    AlreadyStreaming,

    #[error("Waiting for tool approval{}", .0.as_deref().map(|t| format!(": {t}")).unwrap_or_default())]
    ApprovalPending(Option<String>),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Outbound channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Proto(#[from] ProtoError),
}
