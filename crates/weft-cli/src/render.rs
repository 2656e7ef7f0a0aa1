// ABOUTME: Plain-text rendering of a chat state for terminal output.
// ABOUTME: Finalized messages show their frozen timeline; the live turn shows the current one.

use std::fmt;

use weft_core::{Action, ChatState, Message, Role, Status, Timeline};

/// Display adapter that writes a transcript of `ChatState`
pub struct Transcript<'a>(pub &'a ChatState);

impl fmt::Display for Transcript<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        for message in state.messages() {
            write_message(f, message, message.timeline_snapshot.as_ref())?;
        }
        if let Some(message) = state.streaming_message() {
            write_message(f, message, Some(state.timeline()))?;
        }
        if let Some(approval) = state.pending_approval() {
            writeln!(
                f,
                "awaiting approval: {}",
                approval.tool_name.as_deref().unwrap_or("tool")
            )?;
            if let Some(description) = &approval.description {
                writeln!(f, "  {description}")?;
            }
        }
        Ok(())
    }
}

fn status_word(status: Status) -> &'static str {
    match status {
        Status::Active => "active",
        Status::Completed => "done",
        Status::Failed => "failed",
    }
}

fn write_message(
    f: &mut fmt::Formatter<'_>,
    message: &Message,
    timeline: Option<&Timeline>,
) -> fmt::Result {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    let marker = if message.is_streaming {
        " (streaming)"
    } else {
        ""
    };
    writeln!(f, "{role}{marker}: {}", message.content)?;
    match timeline {
        Some(timeline) => write_timeline(f, timeline),
        None => Ok(()),
    }
}

fn write_timeline(f: &mut fmt::Formatter<'_>, timeline: &Timeline) -> fmt::Result {
    if let Some(thinking) = &timeline.thinking {
        write!(f, "  thinking [{}]", status_word(thinking.status))?;
        if !thinking.content.is_empty() {
            write!(f, " {}", thinking.content)?;
        }
        writeln!(f)?;
    }
    if let Some(plan) = &timeline.plan {
        writeln!(f, "  plan [{}]", status_word(plan.status))?;
        for (i, step) in plan.steps.iter().enumerate() {
            writeln!(f, "    {}. {}", i + 1, step)?;
        }
    }
    for action in &timeline.actions {
        write_action(f, action)?;
    }
    if timeline.summarizing {
        writeln!(f, "  summarizing...")?;
    }
    if let Some(result) = &timeline.result {
        writeln!(f, "  summary: {}", result.summary)?;
    }
    Ok(())
}

fn write_action(f: &mut fmt::Formatter<'_>, action: &Action) -> fmt::Result {
    write!(f, "  [{}] {}", status_word(action.status), action.label)?;
    if let Some(detail) = &action.detail {
        write!(f, ": {detail}")?;
    }

    let extras: Vec<String> = [
        action.duration_ms.map(|d| format!("{d}ms")),
        action.progress.map(|p| format!("{p}%")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !extras.is_empty() {
        write!(f, " ({})", extras.join(", "))?;
    }
    writeln!(f)?;

    if let Some(result) = &action.result {
        writeln!(f, "      = {result}")?;
    }
    if let Some(output) = &action.terminal_output {
        for line in output.lines() {
            writeln!(f, "      > {line}")?;
        }
    }
    Ok(())
}
