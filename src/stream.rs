// Boundary protocol for the remote chat assistant; the CLI has no chat
// surface, so embedding hosts are the only consumers
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Request body for the remote chat endpoint: one message plus a bounded
/// slice of prior turns. The transport itself lives outside this crate.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ChatHistoryMessage>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatHistoryMessage {
    pub role: String,
    pub content: String,
}

/// A citation surfaced alongside an answer: one of the user's own
/// knowledge points and how closely it matched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Source {
    pub question: String,
    pub answer: String,
    pub similarity: f64,
}

/// Decoded events of the assistant's response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Incremental text to append to the answer.
    Content(String),
    /// A batch of citations, surfaced once.
    Sources(Vec<Source>),
    /// End of stream; nothing follows.
    Done,
}

#[derive(Deserialize)]
struct StreamFrame {
    #[serde(rename = "type")]
    kind: String,
    content: Option<String>,
    sources: Option<Vec<Source>>,
}

/// Push-parser for the SSE-style response stream: `data: <json>` frames
/// separated by blank lines, terminated by `data: [DONE]`.
///
/// Chunks may split frames anywhere; the trailing incomplete frame is kept
/// in the buffer until the next `push` (or `finish`) completes it. Frames
/// that are not data lines or fail to decode are skipped.
#[derive(Default)]
pub struct EventStreamParser {
    buffer: String,
    done: bool,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the response body; returns every event the chunk
    /// completed, in order.
    pub fn push(&mut self, chunk: &str) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.buffer.push_str(chunk);
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..pos + 2).collect();
            self.decode_frame(&frame, &mut events);
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Drain whatever remains once the transport reports end of stream.
    pub fn finish(&mut self) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let frame = std::mem::take(&mut self.buffer);
            self.decode_frame(&frame, &mut events);
        }
        events
    }

    fn decode_frame(&mut self, frame: &str, events: &mut Vec<ChatEvent>) {
        for line in frame.lines() {
            let Some(payload) = line.trim().strip_prefix("data: ") else {
                continue;
            };
            if payload.trim() == "[DONE]" {
                self.done = true;
                events.push(ChatEvent::Done);
                return;
            }
            match serde_json::from_str::<StreamFrame>(payload) {
                Ok(decoded) => match decoded.kind.as_str() {
                    "content" => {
                        if let Some(content) = decoded.content {
                            events.push(ChatEvent::Content(content));
                        }
                    }
                    "sources" => {
                        if let Some(sources) = decoded.sources {
                            events.push(ChatEvent::Sources(sources));
                        }
                    }
                    _ => {}
                },
                Err(e) => log::debug!("skipping malformed stream frame: {}", e),
            }
        }
    }
}
