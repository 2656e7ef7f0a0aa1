// ABOUTME: Error types for weft-proto
// ABOUTME: Malformed envelopes and events missing required payload fields

use thiserror::Error;

/// Errors raised while decoding an inbound envelope
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Invalid envelope JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Envelope has neither a command nor a type")]
    MissingKind,

    #[error("{kind} event is missing required field {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proto_error_display_missing_kind() {
        let err = ProtoError::MissingKind;
        assert!(format!("{}", err).contains("neither a command nor a type"));
    }

    #[test]
    fn test_proto_error_display_missing_field() {
        let err = ProtoError::MissingField {
            kind: "stream-start",
            field: "requestId",
        };
        let display = format!("{}", err);
        assert!(display.contains("stream-start"));
        assert!(display.contains("requestId"));
    }

    #[test]
    fn test_proto_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ProtoError = serde_err.into();
        assert!(matches!(err, ProtoError::InvalidJson(_)));
        assert!(format!("{}", err).contains("Invalid envelope JSON"));
    }
}
