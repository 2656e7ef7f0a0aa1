// ABOUTME: Envelope decoder mapping raw envelopes onto the canonical Event union
// ABOUTME: Normalizes legacy and current payload field names; no business logic

use crate::envelope::Envelope;
use crate::error::ProtoError;
use crate::event::{ActivityKind, Event, EventKind, Metadata, MetadataStatus, ToolOutcome, TurnId};

const TURN_ID: &[&str] = &["requestId", "request_id", "turnId", "turn_id"];
const TOOL_NAME: &[&str] = &["toolName", "tool_name", "name"];
const TOOL_ID: &[&str] = &["toolId", "tool_id", "id"];
const TEXT: &[&str] = &["content", "text", "message", "delta"];
const DURATION: &[&str] = &["duration", "durationMs", "duration_ms"];
const DETAIL: &[&str] = &["detail", "message", "content", "description"];
const ACTIVITY_DETAIL: &[&str] = &[
    "detail", "message", "content", "file", "path", "query", "command",
];

/// Decode one envelope.
///
/// Returns `Ok(None)` for event names outside the known set so newer
/// backends never break older clients.
pub fn decode(envelope: &Envelope) -> Result<Option<Event>, ProtoError> {
    let name = envelope.name().ok_or(ProtoError::MissingKind)?;
    let Some(kind) = EventKind::from_name(name) else {
        return Ok(None);
    };

    let turn_id = || envelope.field(TURN_ID).map(TurnId::from);

    let event = match kind {
        EventKind::StreamStart => Event::StreamStart {
            turn_id: turn_id().ok_or(ProtoError::MissingField {
                kind: kind.as_str(),
                field: "requestId",
            })?,
        },
        EventKind::StreamChunk => Event::StreamChunk {
            turn_id: turn_id(),
            delta: envelope.field(&["content", "delta", "text"]).unwrap_or_default(),
            accumulated: envelope.field(&["accumulated"]),
        },
        EventKind::StreamEnd => Event::StreamEnd {
            turn_id: turn_id(),
            content: envelope.field(TEXT),
        },
        EventKind::StreamError => Event::StreamError {
            turn_id: turn_id(),
            error: envelope
                .field(&["error", "message", "content"])
                .unwrap_or_else(|| "Request failed".to_string()),
        },
        EventKind::ToolStart => {
            let tool_id = envelope.field(TOOL_ID);
            let tool_name = envelope
                .field(TOOL_NAME)
                .or_else(|| tool_id.clone())
                .ok_or(ProtoError::MissingField {
                    kind: kind.as_str(),
                    field: "toolName",
                })?;
            Event::ToolStart {
                tool_id,
                tool_name,
                detail: envelope.field(&["detail", "description", "input", "args"]),
            }
        }
        EventKind::ToolEnd => {
            let error = envelope.field(&["error"]);
            let failed = error.is_some()
                || envelope.flag(&["success"]) == Some(false)
                || matches!(
                    envelope.field(&["status"]).as_deref(),
                    Some("failed" | "error")
                );
            Event::ToolEnd {
                tool_id: envelope.field(TOOL_ID),
                tool_name: envelope.field(TOOL_NAME),
                outcome: if failed {
                    ToolOutcome::Failed
                } else {
                    ToolOutcome::Completed
                },
                result: envelope.field(&["result", "output"]).or(error),
                duration_ms: envelope
                    .number(DURATION)
                    .filter(|d| d.is_finite() && *d >= 0.0)
                    .map(|d| d.round() as u64),
            }
        }
        EventKind::ToolProgress => Event::ToolProgress {
            tool_id: envelope.field(TOOL_ID),
            tool_name: envelope.field(TOOL_NAME),
            detail: envelope.field(DETAIL),
            progress: envelope.number(&["progress", "percent"]),
        },
        EventKind::Planning => Event::Planning {
            content: envelope
                .field(&["content", "plan", "text", "message"])
                .unwrap_or_default(),
        },
        EventKind::Summarizing => Event::Summarizing,
        EventKind::ThinkingStart => Event::ThinkingStart {
            content: envelope.field(&["content", "text", "thinking"]),
        },
        EventKind::ThinkingUpdate => Event::ThinkingUpdate {
            content: envelope
                .field(&["content", "text", "thinking"])
                .unwrap_or_default(),
        },
        EventKind::ThinkingEnd => Event::ThinkingEnd {
            content: envelope.field(&["content", "text", "thinking"]),
        },
        EventKind::Decision => activity(envelope, ActivityKind::Decision),
        EventKind::Reading => activity(envelope, ActivityKind::Reading),
        EventKind::Searching => activity(envelope, ActivityKind::Searching),
        EventKind::Reviewing => activity(envelope, ActivityKind::Reviewing),
        EventKind::Analyzing => activity(envelope, ActivityKind::Analyzing),
        EventKind::Executing => activity(envelope, ActivityKind::Executing),
        EventKind::Working => activity(envelope, ActivityKind::Working),
        EventKind::TerminalOutput => Event::TerminalOutput {
            output: envelope
                .field(&["output", "content", "text", "data"])
                .ok_or(ProtoError::MissingField {
                    kind: kind.as_str(),
                    field: "output",
                })?,
        },
        EventKind::Metadata => Event::Metadata(Metadata {
            status: envelope
                .field(&["status"])
                .map(|s| MetadataStatus::parse(&s)),
            tool_name: envelope.field(&["toolName", "tool_name", "tool"]),
            description: envelope.field(&["description", "message"]),
            thread_id: envelope.field(&["threadId", "thread_id"]),
        }),
        EventKind::BotResponse => Event::BotResponse {
            content: envelope
                .field(&["message", "content", "text"])
                .ok_or(ProtoError::MissingField {
                    kind: kind.as_str(),
                    field: "message",
                })?,
        },
    };

    Ok(Some(event))
}

fn activity(envelope: &Envelope, kind: ActivityKind) -> Event {
    Event::Activity {
        kind,
        label: envelope.field(&["label", "title"]),
        detail: envelope.field(ACTIVITY_DETAIL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_one(command: &str, payload: serde_json::Value) -> Option<Event> {
        decode(&Envelope::new(command, payload)).unwrap()
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        assert_eq!(decode_one("future-event", json!({"x": 1})), None);
    }

    #[test]
    fn test_missing_kind_is_error() {
        let env = Envelope::default();
        assert!(matches!(decode(&env), Err(ProtoError::MissingKind)));
    }

    #[test]
    fn test_stream_start_accepts_numeric_turn_id() {
        let event = decode_one("stream-start", json!({"requestId": 1}));
        assert_eq!(
            event,
            Some(Event::StreamStart {
                turn_id: TurnId::from("1")
            })
        );
    }

    #[test]
    fn test_stream_start_legacy_field_name() {
        let event = decode_one("stream_start", json!({"turn_id": "abc"}));
        assert_eq!(
            event,
            Some(Event::StreamStart {
                turn_id: TurnId::from("abc")
            })
        );
    }

    #[test]
    fn test_stream_start_without_turn_id_is_error() {
        let env = Envelope::new("stream-start", json!({}));
        assert!(matches!(
            decode(&env),
            Err(ProtoError::MissingField { field: "requestId", .. })
        ));
    }

    #[test]
    fn test_stream_chunk_fields() {
        let event = decode_one(
            "stream-chunk",
            json!({"requestId": "r", "content": "lo", "accumulated": "Hello"}),
        );
        assert_eq!(
            event,
            Some(Event::StreamChunk {
                turn_id: Some(TurnId::from("r")),
                delta: "lo".to_string(),
                accumulated: Some("Hello".to_string()),
            })
        );
    }

    #[test]
    fn test_stream_error_default_text() {
        let event = decode_one("stream-error", json!({"requestId": "r"}));
        assert_eq!(
            event,
            Some(Event::StreamError {
                turn_id: Some(TurnId::from("r")),
                error: "Request failed".to_string(),
            })
        );
    }

    #[test]
    fn test_tool_start_falls_back_to_id_for_name() {
        let event = decode_one("tool-start", json!({"id": "t1"}));
        assert_eq!(
            event,
            Some(Event::ToolStart {
                tool_id: Some("t1".to_string()),
                tool_name: "t1".to_string(),
                detail: None,
            })
        );
    }

    #[test]
    fn test_tool_start_without_name_or_id_is_error() {
        let env = Envelope::new("tool-start", json!({}));
        assert!(decode(&env).is_err());
    }

    #[test]
    fn test_tool_end_completed_with_duration() {
        let event = decode_one(
            "tool-end",
            json!({"toolName": "search", "duration": 120, "result": "3 hits"}),
        );
        assert_eq!(
            event,
            Some(Event::ToolEnd {
                tool_id: None,
                tool_name: Some("search".to_string()),
                outcome: ToolOutcome::Completed,
                result: Some("3 hits".to_string()),
                duration_ms: Some(120),
            })
        );
    }

    #[test]
    fn test_tool_end_failure_signals() {
        for payload in [
            json!({"toolName": "x", "status": "failed"}),
            json!({"toolName": "x", "success": false}),
            json!({"toolName": "x", "error": "boom"}),
        ] {
            match decode_one("tool-end", payload) {
                Some(Event::ToolEnd { outcome, .. }) => assert_eq!(outcome, ToolOutcome::Failed),
                other => panic!("Expected ToolEnd, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_tool_end_error_becomes_result() {
        match decode_one("tool-end", json!({"toolName": "x", "error": "boom"})) {
            Some(Event::ToolEnd { result, .. }) => assert_eq!(result.as_deref(), Some("boom")),
            other => panic!("Expected ToolEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_end_negative_duration_dropped() {
        match decode_one("tool-end", json!({"toolName": "x", "duration": -5})) {
            Some(Event::ToolEnd { duration_ms, .. }) => assert_eq!(duration_ms, None),
            other => panic!("Expected ToolEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_activity_detail_from_path() {
        let event = decode_one("reading", json!({"path": "src/lib.rs"}));
        assert_eq!(
            event,
            Some(Event::Activity {
                kind: ActivityKind::Reading,
                label: None,
                detail: Some("src/lib.rs".to_string()),
            })
        );
    }

    #[test]
    fn test_metadata_interrupt_waiting() {
        let event = decode_one(
            "metadata",
            json!({"status": "interrupt_waiting", "toolName": "run_command"}),
        );
        assert_eq!(
            event,
            Some(Event::Metadata(Metadata {
                status: Some(MetadataStatus::InterruptWaiting),
                tool_name: Some("run_command".to_string()),
                description: None,
                thread_id: None,
            }))
        );
    }

    #[test]
    fn test_terminal_output_requires_text() {
        let env = Envelope::new("terminal-output", json!({}));
        assert!(decode(&env).is_err());
        assert_eq!(
            decode_one("terminal-output", json!({"output": "ok\n"})),
            Some(Event::TerminalOutput {
                output: "ok\n".to_string()
            })
        );
    }

    #[test]
    fn test_bot_response() {
        assert_eq!(
            decode_one("bot-response", json!({"message": "hello"})),
            Some(Event::BotResponse {
                content: "hello".to_string()
            })
        );
    }
}
