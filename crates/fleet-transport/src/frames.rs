//! Wire shapes exchanged over `/ws` (spec §4.7). Client frames are the
//! handful of control messages a browser can send; server frames are
//! everything the transport fans out, either to one subscriber or to
//! every connected client (lifecycle broadcasts).

use serde::{Deserialize, Serialize};

use fleet_watch::{ByteRange, MessageBatch};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Subscribe { #[serde(rename = "sessionId")] session_id: String },
    Unsubscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    User,
    Completed,
    Errored,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "messages")]
    Messages {
        #[serde(rename = "sessionId")]
        session_id: String,
        messages: Vec<fleet_transcript::ParsedMessage>,
        #[serde(rename = "byteRange")]
        byte_range: ByteRange,
    },
    #[serde(rename = "session:started")]
    SessionStarted {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "projectId")]
        project_id: String,
        cwd: String,
        #[serde(rename = "startedAt")]
        started_at: String,
    },
    #[serde(rename = "session:stopped")]
    SessionStopped {
        #[serde(rename = "sessionId")]
        session_id: String,
        reason: StopReason,
        #[serde(rename = "stoppedAt")]
        stopped_at: String,
    },
    #[serde(rename = "session:error")]
    SessionError {
        #[serde(rename = "sessionId")]
        session_id: String,
        error: String,
        #[serde(rename = "occurredAt")]
        occurred_at: String,
    },
    #[serde(rename = "session:activity")]
    SessionActivity {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "updatedAt")]
        updated_at: String,
    },
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerFrame {
    /// Build a `messages` frame from a freshly-advanced tailer batch.
    pub fn from_batch(batch: MessageBatch) -> Self {
        ServerFrame::Messages {
            session_id: batch.session_id,
            messages: batch.messages,
            byte_range: batch.byte_range,
        }
    }

    pub fn bad_frame(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            code: "bad-frame".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_parses_session_id() {
        let raw = r#"{"type":"subscribe","sessionId":"s1"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        match frame {
            ClientFrame::Subscribe { session_id } => assert_eq!(session_id, "s1"),
            _ => panic!("expected subscribe"),
        }
    }

    #[test]
    fn unsubscribe_frame_has_no_payload() {
        let raw = r#"{"type":"unsubscribe"}"#;
        assert!(matches!(
            serde_json::from_str::<ClientFrame>(raw).unwrap(),
            ClientFrame::Unsubscribe
        ));
    }

    #[test]
    fn messages_frame_serializes_with_tag() {
        let frame = ServerFrame::Messages {
            session_id: "s1".to_string(),
            messages: Vec::new(),
            byte_range: ByteRange { start: 0, end: 10 },
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"messages\""));
        assert!(json.contains("\"byteRange\""));
    }

    #[test]
    fn session_stopped_reason_is_lowercase() {
        let frame = ServerFrame::SessionStopped {
            session_id: "s1".to_string(),
            reason: StopReason::Errored,
            stopped_at: "t".to_string(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"reason\":\"errored\""));
    }
}
