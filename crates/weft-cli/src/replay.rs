// ABOUTME: Replays a recorded stream of JSON envelopes through a ChatSession.
// ABOUTME: Optionally sends a message first, cancels mid-stream, or answers approvals.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};
use weft_core::{ChatSession, ChatState, Config};
use weft_proto::{Consent, Envelope, OutboundCommand};

/// What to do while the recording plays
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Message submitted before the first envelope
    pub send: Option<String>,
    /// Context entries attached to `send`
    pub context: Vec<String>,
    /// Cancel the turn once this many envelopes have been applied
    pub cancel_after: Option<usize>,
    /// Automatic answer for every approval request
    pub consent: Option<Consent>,
}

#[derive(Debug)]
pub struct ReplayOutcome {
    pub state: ChatState,
    /// Commands the session emitted, in order
    pub commands: Vec<OutboundCommand>,
    /// Envelopes applied (blank and comment lines excluded)
    pub envelopes: usize,
}

/// Replay newline-delimited JSON envelopes.
///
/// Blank lines and lines starting with `#` are skipped. A line that is not
/// a JSON object aborts the replay; a well-formed envelope the decoder
/// rejects is logged and skipped by the session.
pub async fn replay(config: &Config, script: &str, options: &ReplayOptions) -> Result<ReplayOutcome> {
    let (tx, mut rx) = mpsc::channel(32);
    let collector = tokio::spawn(async move {
        let mut commands = Vec::new();
        while let Some(command) = rx.recv().await {
            commands.push(command);
        }
        commands
    });

    let mut session = ChatSession::new(config, tx);

    if let Some(message) = &options.send {
        session
            .send_message(message, options.context.clone())
            .await
            .context("Failed to send message")?;
    }

    let mut envelopes = 0;
    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let envelope = Envelope::from_json(line)
            .with_context(|| format!("Invalid envelope on line {}", index + 1))?;
        session.handle_envelope(&envelope);
        envelopes += 1;

        if let Some(consent) = options.consent {
            if session.state().pending_approval().is_some() {
                debug!(?consent, line = index + 1, "answering approval");
                session.respond_to_approval(consent).await?;
            }
        }
        if options.cancel_after == Some(envelopes) && session.cancel().await? {
            info!(after = envelopes, "cancelled turn during replay");
        }
    }

    // Dropping the session closes the channel so the collector can finish.
    let state = session.into_state();
    let commands = collector.await.context("Command collector failed")?;

    Ok(ReplayOutcome {
        state,
        commands,
        envelopes,
    })
}
