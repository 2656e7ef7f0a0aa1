// ABOUTME: Chat state reducer: turn correlation, message accumulation, approval gate
// ABOUTME: Single owner of all turn state; every mutation happens in handle_event or a user operation

use serde::Serialize;
use tracing::{debug, info};
use weft_proto::{Consent, Event, InputMetadata, Metadata, MetadataStatus, OutboundCommand, TurnId};

use crate::config::{ChunkMode, StreamingConfig};
use crate::error::WeftError;
use crate::types::{new_id, Message, PendingApproval, Role, Timeline};

/// Summary recorded on a timeline the user stopped
pub const STOPPED_SUMMARY: &str = "Stopped by user";

/// Everything the reducer knows about the conversation
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    streaming_config: StreamingConfig,
    current_turn: Option<TurnId>,
    /// Last finalized turn, so its late errors are not mistaken for a refused request
    closed_turn: Option<TurnId>,
    messages: Vec<Message>,
    streaming: Option<Message>,
    timeline: Timeline,
    pending_approval: Option<PendingApproval>,
    is_loading: bool,
    thread_id: Option<String>,
}

/// Borrowed view handed to renderers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView<'a> {
    pub messages: &'a [Message],
    pub streaming_message: Option<&'a Message>,
    pub timeline: &'a Timeline,
    pub is_streaming: bool,
    pub is_loading: bool,
    pub pending_approval: Option<&'a PendingApproval>,
}

/// Fold one event into `state`
pub fn reduce(mut state: ChatState, event: Event) -> ChatState {
    state.handle_event(event);
    state
}

impl ChatState {
    pub fn new(streaming_config: StreamingConfig) -> Self {
        Self {
            streaming_config,
            ..Self::default()
        }
    }

    pub fn with_thread_id(mut self, thread_id: Option<String>) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The assistant message currently being streamed
    pub fn streaming_message(&self) -> Option<&Message> {
        self.streaming.as_ref()
    }

    /// The live timeline of the in-flight turn
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn current_turn(&self) -> Option<&TurnId> {
        self.current_turn.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.current_turn.is_some()
    }

    /// True from send until the reply is finished, failed, or stopped
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn pending_approval(&self) -> Option<&PendingApproval> {
        self.pending_approval.as_ref()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn view(&self) -> ChatView<'_> {
        ChatView {
            messages: &self.messages,
            streaming_message: self.streaming.as_ref(),
            timeline: &self.timeline,
            is_streaming: self.is_streaming(),
            is_loading: self.is_loading,
            pending_approval: self.pending_approval.as_ref(),
        }
    }

    /// Handle one decoded inbound event
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::StreamStart { turn_id } => self.start_turn(turn_id),
            Event::StreamChunk {
                turn_id,
                delta,
                accumulated,
            } => {
                if self.accepts("stream-chunk", turn_id.as_ref()) {
                    self.append_chunk(delta, accumulated);
                }
            }
            Event::StreamEnd { turn_id, content } => {
                if self.accepts("stream-end", turn_id.as_ref()) {
                    self.timeline.settle();
                    let content = content
                        .or_else(|| self.streaming.as_ref().map(|m| m.content.clone()))
                        .unwrap_or_default();
                    self.finalize(content);
                }
            }
            Event::StreamError { turn_id, error } => {
                if self.current_turn.is_none() && self.is_loading {
                    self.fail_request(turn_id.as_ref(), error);
                } else if self.accepts("stream-error", turn_id.as_ref()) {
                    self.timeline.fail_active();
                    self.finalize(error);
                }
            }
            Event::Metadata(metadata) => {
                if self.turn_open("metadata") {
                    self.apply_metadata(metadata);
                }
            }
            Event::BotResponse { content } => {
                if self.current_turn.is_some() {
                    debug!("dropping legacy bot-response while a turn is streaming");
                    return;
                }
                self.messages.push(Message::assistant(content));
                self.is_loading = false;
            }
            event => {
                if self.turn_open(event.kind().as_str()) {
                    self.timeline.apply(&event);
                }
            }
        }
    }

    /// Record a user message and build the command that submits it
    pub fn send_message(
        &mut self,
        message: &str,
        mut meta: InputMetadata,
    ) -> Result<OutboundCommand, WeftError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(WeftError::EmptyMessage);
        }
        if let Some(approval) = &self.pending_approval {
            return Err(WeftError::ApprovalPending(approval.tool_name.clone()));
        }
        if self.is_loading || self.current_turn.is_some() {
            return Err(WeftError::AlreadyStreaming);
        }

        if meta.thread_id.is_some() {
            self.thread_id = meta.thread_id.clone();
        } else {
            meta.thread_id = self.thread_id.clone();
        }

        self.messages.push(Message::user(message.to_string()));
        self.is_loading = true;

        Ok(OutboundCommand::UserInput {
            message: message.to_string(),
            meta_data: meta,
        })
    }

    /// Stop the in-flight turn. Returns the cancel command, or `None` when idle.
    pub fn cancel_current_request(&mut self) -> Option<OutboundCommand> {
        let turn_id = self.current_turn.clone()?;
        info!(turn = %turn_id, "cancelling turn");

        self.pending_approval = None;
        self.timeline.stop(STOPPED_SUMMARY);
        let partial = self
            .streaming
            .as_ref()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.finalize(partial);

        Some(OutboundCommand::CancelRequest {
            request_id: turn_id,
            thread_id: self.thread_id.clone(),
        })
    }

    /// Answer the pending approval. Returns `None` when nothing is pending.
    pub fn respond_to_approval(&mut self, consent: Consent) -> Option<OutboundCommand> {
        let approval = self.pending_approval.take()?;
        debug!(tool = ?approval.tool_name, ?consent, "approval answered");
        Some(OutboundCommand::UserConsent { message: consent })
    }

    /// Drop completed messages; an in-flight turn keeps streaming
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    fn start_turn(&mut self, turn_id: TurnId) {
        if !self.streaming_config.enabled {
            debug!(turn = %turn_id, "streaming disabled, ignoring stream-start");
            return;
        }
        if let Some(previous) = &self.current_turn {
            debug!(previous = %previous, turn = %turn_id, "stream-start supersedes open turn");
        }

        self.current_turn = Some(turn_id);
        self.pending_approval = None;
        self.timeline = Timeline::default();
        self.streaming = Some(Message::streaming());
        self.is_loading = true;
    }

    fn append_chunk(&mut self, delta: String, accumulated: Option<String>) {
        let Some(message) = self.streaming.as_mut() else {
            return;
        };
        match (self.streaming_config.chunk_mode, accumulated) {
            (ChunkMode::Cumulative, Some(accumulated)) => {
                if accumulated.len() >= message.content.len() {
                    message.content = accumulated;
                } else {
                    debug!("ignoring accumulated text shorter than streamed content");
                }
            }
            _ => message.content.push_str(&delta),
        }
    }

    /// Close the streaming message with `content` and the frozen timeline
    fn finalize(&mut self, content: String) {
        let mut message = self.streaming.take().unwrap_or_else(Message::streaming);
        message.id = new_id("assistant");
        message.content = content;
        message.is_streaming = false;
        message.timeline_snapshot = Some(std::mem::take(&mut self.timeline));

        self.messages.push(message);
        self.closed_turn = self.current_turn.take();
        self.pending_approval = None;
        self.is_loading = false;
    }

    /// The backend refused a sent message before opening a turn
    fn fail_request(&mut self, turn_id: Option<&TurnId>, error: String) {
        if turn_id.is_some() && turn_id == self.closed_turn.as_ref() {
            debug!(turn = ?turn_id, "dropping error for a closed turn");
            return;
        }
        info!(%error, "request failed before streaming started");
        self.messages.push(Message::assistant(error));
        self.is_loading = false;
    }

    /// Undo a send whose command never left
    pub(crate) fn abandon_send(&mut self) {
        if self.messages.last().is_some_and(|m| m.role == Role::User) {
            self.messages.pop();
        }
        self.is_loading = false;
    }

    /// Put back an approval whose answer could not be delivered
    pub(crate) fn restore_approval(&mut self, approval: PendingApproval) {
        if self.current_turn.is_some() {
            self.pending_approval = Some(approval);
        }
    }

    fn apply_metadata(&mut self, metadata: Metadata) {
        if metadata.thread_id.is_some() {
            self.thread_id = metadata.thread_id;
        }
        match metadata.status {
            Some(MetadataStatus::InterruptWaiting) => {
                self.pending_approval = Some(PendingApproval {
                    tool_name: metadata.tool_name,
                    description: metadata.description,
                });
            }
            Some(MetadataStatus::InterruptApproved) => self.pending_approval = None,
            Some(MetadataStatus::Other(_)) | None => {}
        }
    }

    /// Whether a lifecycle event belongs to the open turn
    fn accepts(&self, kind: &str, turn_id: Option<&TurnId>) -> bool {
        match (&self.current_turn, turn_id) {
            (None, _) => {
                debug!(kind, ?turn_id, "no open turn, dropping event");
                false
            }
            (Some(current), Some(id)) if current != id => {
                debug!(kind, current = %current, stale = %id, "dropping stale event");
                false
            }
            _ => true,
        }
    }

    fn turn_open(&self, kind: &str) -> bool {
        if self.current_turn.is_none() {
            debug!(kind, "no open turn, dropping event");
            return false;
        }
        true
    }
}
