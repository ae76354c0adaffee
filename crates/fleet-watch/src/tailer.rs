//! Per-session byte-offset tailer: reads only the bytes appended since
//! the last `advance()`, carrying a trailing partial line across calls.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::Serialize;

use fleet_transcript::ParsedMessage;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBatch {
    pub session_id: String,
    pub messages: Vec<ParsedMessage>,
    pub byte_range: ByteRange,
}

pub struct Tailer {
    session_id: String,
    path: PathBuf,
    offset_bytes: u64,
    partial: String,
    line_index: usize,
}

impl Tailer {
    /// Create a tailer for `path`, with `offsetBytes` set to the file's
    /// current size — only bytes appended after this point are delivered.
    /// `lineIndex` starts at the number of lines already on disk so that
    /// live `lineIndex` values never collide with the REST baseline's.
    pub fn new(session_id: String, path: PathBuf) -> std::io::Result<Self> {
        let existing = fs::read_to_string(&path).unwrap_or_default();
        let offset_bytes = existing.len() as u64;
        let line_index = existing.split('\n').filter(|l| !l.is_empty()).count();
        Ok(Self {
            session_id,
            path,
            offset_bytes,
            partial: String::new(),
            line_index,
        })
    }

    pub fn offset_bytes(&self) -> u64 {
        self.offset_bytes
    }

    /// Read any bytes appended since the last call, parse complete lines,
    /// and return the resulting batch. Detects truncation (log rotation)
    /// and restarts from the beginning when the file has shrunk.
    pub fn advance(&mut self) -> std::io::Result<MessageBatch> {
        let current_size = fs::metadata(&self.path)?.len();

        if current_size < self.offset_bytes {
            fleet_domain::TraceEvent::TailerTruncated {
                session_id: &self.session_id,
                previous_offset: self.offset_bytes,
            }
            .emit();
            self.offset_bytes = 0;
            self.partial.clear();
            self.line_index = 0;
        }

        let start = self.offset_bytes;
        let to_read = current_size.saturating_sub(start);

        let mut file = fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::with_capacity(to_read as usize);
        file.take(to_read).read_to_end(&mut buf)?;

        let chunk = String::from_utf8_lossy(&buf);
        let combined = format!("{}{}", self.partial, chunk);
        let mut lines: Vec<&str> = combined.split('\n').collect();
        self.partial = lines.pop().unwrap_or_default().to_string();

        let mut messages = Vec::new();
        for line in lines {
            messages.extend(fleet_transcript::parse_line(line, self.line_index));
            self.line_index += 1;
        }

        self.offset_bytes = current_size;

        fleet_domain::TraceEvent::TailerAdvanced {
            session_id: &self.session_id,
            start,
            end: current_size,
            messages: messages.len(),
        }
        .emit();

        Ok(MessageBatch {
            session_id: self.session_id.clone(),
            messages,
            byte_range: ByteRange {
                start,
                end: current_size,
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    fn append(path: &Path, content: &str) {
        let mut f = fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn only_delivers_appends_after_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("550e8400-e29b-41d4-a716-446655440000.jsonl");
        write_file(&path, r#"{"type":"user","uuid":"u0","message":{"content":"old"}}"#);

        let mut tailer = Tailer::new("sess".to_string(), path.clone()).unwrap();
        append(
            &path,
            "\n{\"type\":\"user\",\"uuid\":\"u1\",\"message\":{\"content\":\"new\"}}\n",
        );

        let batch = tailer.advance().unwrap();
        assert_eq!(batch.messages.len(), 1);
        match &batch.messages[0] {
            ParsedMessage::UserPrompt { text, .. } => assert_eq!(text, "new"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn buffers_a_trailing_partial_line_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("550e8400-e29b-41d4-a716-446655440001.jsonl");
        write_file(&path, "");

        let mut tailer = Tailer::new("sess".to_string(), path.clone()).unwrap();
        append(&path, r#"{"type":"user","uuid":"u1","message":{"content":"part"#);
        let batch = tailer.advance().unwrap();
        assert!(batch.messages.is_empty(), "incomplete line must not be parsed yet");

        append(&path, "ial\"}}\n");
        let batch = tailer.advance().unwrap();
        assert_eq!(batch.messages.len(), 1);
    }

    #[test]
    fn detects_truncation_and_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("550e8400-e29b-41d4-a716-446655440002.jsonl");
        write_file(&path, "");

        let mut tailer = Tailer::new("sess".to_string(), path.clone()).unwrap();
        append(&path, "{\"type\":\"user\",\"uuid\":\"u1\",\"message\":{\"content\":\"a\"}}\n");
        tailer.advance().unwrap();
        assert!(tailer.offset_bytes() > 0);

        write_file(&path, "{\"type\":\"user\",\"uuid\":\"u2\",\"message\":{\"content\":\"b\"}}\n");
        let batch = tailer.advance().unwrap();
        assert_eq!(batch.byte_range.start, 0, "truncation resets the read start to 0");
        assert_eq!(batch.messages.len(), 1);
    }
}
