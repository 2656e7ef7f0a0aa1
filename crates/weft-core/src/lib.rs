// ABOUTME: Streaming turn reducer for an agent chat client
// ABOUTME: Folds protocol events into a transcript and a per-turn activity timeline

pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod timeline;
pub mod types;

pub use config::{ChatConfig, ChunkMode, Config, StreamingConfig};
pub use error::WeftError;
pub use session::{ChatSession, NoOpObserver, StateObserver, UserRequest};
pub use state::{reduce, ChatState, ChatView, STOPPED_SUMMARY};
pub use timeline::parse_steps;
pub use types::{
    Action, ActionKind, Message, PendingApproval, PlanBlock, Role, Status, ThinkingBlock,
    Timeline, TurnResult,
};
