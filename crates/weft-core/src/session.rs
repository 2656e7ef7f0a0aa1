// ABOUTME: Async session driver around ChatState
// ABOUTME: Pumps inbound envelopes and user requests from channels, forwards outbound commands

use tokio::sync::mpsc;
use tracing::{debug, warn};
use weft_proto::{decode, Consent, Envelope, InputMetadata, OutboundCommand};

use crate::config::{ChatConfig, Config};
use crate::error::WeftError;
use crate::state::ChatState;
use crate::types::PendingApproval;

/// Callback for state changes (for UI updates)
pub trait StateObserver: Send + Sync {
    fn on_messages_changed(&self, count: usize);
    fn on_streaming_changed(&self, is_streaming: bool);
    fn on_approval_changed(&self, approval: Option<&PendingApproval>);
    fn on_command_sent(&self, command: &OutboundCommand);
}

/// Observer for callers that only read the final state
pub struct NoOpObserver;

impl StateObserver for NoOpObserver {
    fn on_messages_changed(&self, _count: usize) {}
    fn on_streaming_changed(&self, _is_streaming: bool) {}
    fn on_approval_changed(&self, _approval: Option<&PendingApproval>) {}
    fn on_command_sent(&self, _command: &OutboundCommand) {}
}

/// User-side operations delivered to a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRequest {
    Send {
        message: String,
        context: Vec<String>,
    },
    Cancel,
    Approve,
    Deny,
    Clear,
}

/// Observable parts of the state compared before and after each mutation
#[derive(PartialEq)]
struct Watched {
    messages: usize,
    streaming: bool,
    approval: Option<PendingApproval>,
}

impl Watched {
    fn of(state: &ChatState) -> Self {
        Self {
            messages: state.messages().len(),
            streaming: state.is_streaming(),
            approval: state.pending_approval().cloned(),
        }
    }
}

/// Owns one conversation's reducer and its outbound channel
pub struct ChatSession {
    state: ChatState,
    chat: ChatConfig,
    outbound: mpsc::Sender<OutboundCommand>,
    observer: Box<dyn StateObserver>,
}

impl ChatSession {
    pub fn new(config: &Config, outbound: mpsc::Sender<OutboundCommand>) -> Self {
        Self {
            state: ChatState::new(config.streaming.clone())
                .with_thread_id(config.chat.thread_id.clone()),
            chat: config.chat.clone(),
            outbound,
            observer: Box::new(NoOpObserver),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn StateObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn into_state(self) -> ChatState {
        self.state
    }

    /// Decode and apply one envelope. Malformed envelopes are logged and skipped.
    pub fn handle_envelope(&mut self, envelope: &Envelope) {
        match decode(envelope) {
            Ok(Some(event)) => {
                let before = Watched::of(&self.state);
                self.state.handle_event(event);
                self.notify(before);
            }
            Ok(None) => debug!(name = ?envelope.name(), "ignoring unknown event"),
            Err(e) => warn!("Dropping malformed envelope: {}", e),
        }
    }

    /// Parse and apply one raw JSON envelope
    pub fn handle_raw(&mut self, raw: &str) -> Result<(), WeftError> {
        let envelope = Envelope::from_json(raw)?;
        if let Some(event) = decode(&envelope)? {
            let before = Watched::of(&self.state);
            self.state.handle_event(event);
            self.notify(before);
        }
        Ok(())
    }

    /// Submit a user message with the configured mode and alias
    pub async fn send_message(
        &mut self,
        message: &str,
        context: Vec<String>,
    ) -> Result<(), WeftError> {
        let meta = InputMetadata {
            mode: self.chat.mode.clone(),
            context,
            alias: self.chat.alias.clone(),
            thread_id: None,
        };
        let before = Watched::of(&self.state);
        let command = self.state.send_message(message, meta)?;
        if let Err(e) = self.dispatch(command).await {
            self.state.abandon_send();
            return Err(e);
        }
        self.notify(before);
        Ok(())
    }

    /// Stop the in-flight turn; returns whether anything was cancelled.
    ///
    /// The turn is stopped locally even when the backend can no longer be told.
    pub async fn cancel(&mut self) -> Result<bool, WeftError> {
        let before = Watched::of(&self.state);
        let Some(command) = self.state.cancel_current_request() else {
            return Ok(false);
        };
        let sent = self.dispatch(command).await;
        self.notify(before);
        sent.map(|()| true)
    }

    /// Answer the pending approval; returns whether one was pending
    pub async fn respond_to_approval(&mut self, consent: Consent) -> Result<bool, WeftError> {
        let before = Watched::of(&self.state);
        let Some(approval) = self.state.pending_approval().cloned() else {
            return Ok(false);
        };
        let Some(command) = self.state.respond_to_approval(consent) else {
            return Ok(false);
        };
        if let Err(e) = self.dispatch(command).await {
            self.state.restore_approval(approval);
            return Err(e);
        }
        self.notify(before);
        Ok(true)
    }

    pub fn clear_messages(&mut self) {
        let before = Watched::of(&self.state);
        self.state.clear_messages();
        self.notify(before);
    }

    async fn handle_request(&mut self, request: UserRequest) -> Result<(), WeftError> {
        match request {
            UserRequest::Send { message, context } => self.send_message(&message, context).await,
            UserRequest::Cancel => self.cancel().await.map(|_| ()),
            UserRequest::Approve => self.respond_to_approval(Consent::Granted).await.map(|_| ()),
            UserRequest::Deny => self.respond_to_approval(Consent::Denied).await.map(|_| ()),
            UserRequest::Clear => {
                self.clear_messages();
                Ok(())
            }
        }
    }

    /// Run until the inbound channel closes, then hand back the final state.
    ///
    /// User requests are served before queued envelopes so a cancel takes
    /// effect ahead of anything the backend has already sent.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Envelope>,
        mut requests: mpsc::Receiver<UserRequest>,
    ) -> ChatState {
        let mut requests_open = true;
        loop {
            tokio::select! {
                biased;

                request = requests.recv(), if requests_open => match request {
                    Some(request) => {
                        if let Err(e) = self.handle_request(request).await {
                            warn!("User request failed: {}", e);
                        }
                    }
                    None => requests_open = false,
                },
                envelope = inbound.recv() => match envelope {
                    Some(envelope) => self.handle_envelope(&envelope),
                    None => break,
                },
            }
        }
        self.state
    }

    async fn dispatch(&self, command: OutboundCommand) -> Result<(), WeftError> {
        debug!(command = command.name(), "sending command");
        self.outbound
            .send(command.clone())
            .await
            .map_err(|_| WeftError::ChannelClosed)?;
        self.observer.on_command_sent(&command);
        Ok(())
    }

    fn notify(&self, before: Watched) {
        let after = Watched::of(&self.state);
        if after == before {
            return;
        }
        if after.messages != before.messages {
            self.observer.on_messages_changed(after.messages);
        }
        if after.streaming != before.streaming {
            self.observer.on_streaming_changed(after.streaming);
        }
        if after.approval != before.approval {
            self.observer.on_approval_changed(after.approval.as_ref());
        }
    }
}
